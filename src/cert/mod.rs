pub mod extensions;
pub mod params;

use std::fmt;
use std::str::FromStr;

use const_oid::ObjectIdentifier;
use der::{Decode, Encode};
use x509_cert::certificate::CertificateInner;

use crate::curve::DomainParameterSet;
use crate::error::{GostCertError, Result};
use crate::key::PublicKey;
use crate::pki;
use params::{ExtensionParam, SubjectIdentity};

/// Public key algorithms known to the issuer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum KeyAlgorithm {
    /// GOST R 34.10-2001 (`ECGOST3410`).
    EcGost3410,
}

impl KeyAlgorithm {
    /// `id-GostR3410-2001`.
    pub fn oid(self) -> ObjectIdentifier {
        match self {
            KeyAlgorithm::EcGost3410 => ObjectIdentifier::new_unwrap("1.2.643.2.2.19"),
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            KeyAlgorithm::EcGost3410 => "ECGOST3410",
        }
    }
}

impl fmt::Display for KeyAlgorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for KeyAlgorithm {
    type Err = GostCertError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_uppercase().as_str() {
            "ECGOST3410" | "ECGOST3410-2001" | "GOST3410-2001" | "1.2.643.2.2.19" => {
                Ok(KeyAlgorithm::EcGost3410)
            }
            _ => Err(GostCertError::ConfigurationError(format!(
                "Unrecognized key algorithm '{s}'"
            ))),
        }
    }
}

/// Represents the supported signature algorithms for certificates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SignatureAlgorithm {
    /// GOST R 34.11-94 digest with GOST R 34.10-2001 signature.
    Gost3411WithEcGost3410,
}

impl SignatureAlgorithm {
    /// `id-GostR3411-94-with-GostR3410-2001`.
    pub fn oid(self) -> ObjectIdentifier {
        match self {
            SignatureAlgorithm::Gost3411WithEcGost3410 => {
                ObjectIdentifier::new_unwrap("1.2.643.2.2.3")
            }
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            SignatureAlgorithm::Gost3411WithEcGost3410 => "GOST3411withECGOST3410",
        }
    }

    /// The key algorithm this signature algorithm operates on.
    pub fn key_algorithm(self) -> KeyAlgorithm {
        match self {
            SignatureAlgorithm::Gost3411WithEcGost3410 => KeyAlgorithm::EcGost3410,
        }
    }

    /// Looks an algorithm up by its OID.
    pub fn from_oid(oid: ObjectIdentifier) -> Result<Self> {
        if oid == SignatureAlgorithm::Gost3411WithEcGost3410.oid() {
            Ok(SignatureAlgorithm::Gost3411WithEcGost3410)
        } else {
            Err(GostCertError::ConfigurationError(format!(
                "Unsupported signature algorithm {oid}"
            )))
        }
    }
}

impl fmt::Display for SignatureAlgorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for SignatureAlgorithm {
    type Err = GostCertError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_uppercase().as_str() {
            "GOST3411WITHECGOST3410" | "GOST3411WITHGOST3410-2001" | "1.2.643.2.2.3" => {
                Ok(SignatureAlgorithm::Gost3411WithEcGost3410)
            }
            _ => Err(GostCertError::ConfigurationError(format!(
                "Unrecognized signature algorithm '{s}'"
            ))),
        }
    }
}

impl From<SignatureAlgorithm> for x509_cert::spki::AlgorithmIdentifierOwned {
    /// GOST signature identifiers carry no parameters.
    fn from(value: SignatureAlgorithm) -> Self {
        x509_cert::spki::AlgorithmIdentifierOwned {
            oid: value.oid(),
            parameters: None,
        }
    }
}

/// The one signature algorithm, key algorithm and domain-parameter set used
/// for a whole issuance cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AlgorithmSuite {
    signature: SignatureAlgorithm,
    key: KeyAlgorithm,
    params: DomainParameterSet,
}

impl AlgorithmSuite {
    /// Binds the three together, failing if they are not compatible.
    pub fn new(
        signature: SignatureAlgorithm,
        key: KeyAlgorithm,
        params: DomainParameterSet,
    ) -> Result<Self> {
        if signature.key_algorithm() != key {
            return Err(GostCertError::ConfigurationError(format!(
                "Signature algorithm {signature} cannot be used with {key} keys"
            )));
        }
        Ok(Self {
            signature,
            key,
            params,
        })
    }

    /// Parses the suite from configured names.
    pub fn from_names(signature: &str, key: &str, params: &str) -> Result<Self> {
        Self::new(signature.parse()?, key.parse()?, params.parse()?)
    }

    pub fn signature_algorithm(&self) -> SignatureAlgorithm {
        self.signature
    }

    pub fn key_algorithm(&self) -> KeyAlgorithm {
        self.key
    }

    pub fn params(&self) -> DomainParameterSet {
        self.params
    }

    /// Fails unless a key under `params` may be used with this suite.
    pub fn check_params(&self, params: DomainParameterSet) -> Result<()> {
        if params != self.params {
            return Err(GostCertError::ConfigurationError(format!(
                "Key uses {params} but {} is bound to {}",
                self.signature, self.params
            )));
        }
        Ok(())
    }
}

impl Default for AlgorithmSuite {
    /// `GOST3411withECGOST3410` over CryptoPro-B.
    fn default() -> Self {
        Self {
            signature: SignatureAlgorithm::Gost3411WithEcGost3410,
            key: KeyAlgorithm::EcGost3410,
            params: DomainParameterSet::CryptoProB,
        }
    }
}

/// Represents an X.509 certificate.
///
/// Certificates are immutable once issued; this type only encodes, decodes and
/// reads them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Certificate {
    /// The inner representation of the certificate.
    pub inner: CertificateInner,
}

impl Certificate {
    /// Encodes the certificate into DER format.
    pub fn to_der(&self) -> Result<Vec<u8>> {
        self.inner
            .to_der()
            .map_err(|e| GostCertError::EncodingError(e.to_string()))
    }

    /// Decodes a DER certificate.
    pub fn from_der(bytes: &[u8]) -> Result<Self> {
        let inner = CertificateInner::from_der(bytes)?;
        Ok(Self { inner })
    }

    /// The serial number as an unsigned integer.
    pub fn serial_number(&self) -> Result<u64> {
        let bytes = self.inner.tbs_certificate.serial_number.as_bytes();
        let significant: Vec<u8> = bytes.iter().copied().skip_while(|b| *b == 0).collect();
        if significant.len() > 8 {
            return Err(GostCertError::DecodingError(
                "Serial number does not fit in 64 bits".to_string(),
            ));
        }
        Ok(significant
            .iter()
            .fold(0u64, |acc, byte| (acc << 8) | u64::from(*byte)))
    }

    /// The subject name as an ordered identity.
    pub fn subject(&self) -> Result<SubjectIdentity> {
        SubjectIdentity::from_x509_name(&self.inner.tbs_certificate.subject)
    }

    /// The issuer name as an ordered identity.
    pub fn issuer(&self) -> Result<SubjectIdentity> {
        SubjectIdentity::from_x509_name(&self.inner.tbs_certificate.issuer)
    }

    /// Extracts the subject public key embedded in the certificate.
    pub fn public_key(&self) -> Result<PublicKey> {
        PublicKey::from_x509spki(&self.inner.tbs_certificate.subject_public_key_info)
    }

    /// The extensions in encoded order.
    pub fn extensions(&self) -> Vec<ExtensionParam> {
        self.inner
            .tbs_certificate
            .extensions
            .iter()
            .flatten()
            .map(ExtensionParam::from)
            .collect()
    }

    /// The signature algorithm the certificate was signed with.
    pub fn signature_algorithm(&self) -> Result<SignatureAlgorithm> {
        SignatureAlgorithm::from_oid(self.inner.signature_algorithm.oid)
    }

    /// Checks the certificate signature against its own embedded public key.
    ///
    /// Returns `Ok(false)` for a signature that does not verify.
    pub fn verify_self_signature(&self) -> Result<bool> {
        let public_key = self.public_key()?;
        let suite = AlgorithmSuite::new(
            self.signature_algorithm()?,
            KeyAlgorithm::EcGost3410,
            public_key.params(),
        )?;
        let tbs = self
            .inner
            .tbs_certificate
            .to_der()
            .map_err(|e| GostCertError::EncodingError(e.to_string()))?;
        let Some(signature) = self.inner.signature.as_bytes() else {
            return Ok(false);
        };
        pki::verify(&tbs, signature, &public_key, &suite)
    }
}
