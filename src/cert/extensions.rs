use const_oid::AssociatedOid;
use der::{Decode, Encode, asn1::OctetString, oid::ObjectIdentifier};
use sha1::{Digest, Sha1};

pub use der::flagset::FlagSet;
use x509_cert::ext::pkix::KeyUsage as X509KeyUsage;
pub use x509_cert::ext::pkix::KeyUsages;

use super::params::ExtensionParam;
use crate::error::{GostCertError, Result};
use crate::key::PublicKey;

/// Trait for converting to and from X.509 extensions.
///
/// # Example
/// ```
/// use gostcert::cert::extensions::{CertificateNumber, ToAndFromX509Extension};
/// let number = CertificateNumber("1".to_string());
/// let encoded = number.to_x509_extension_value().unwrap();
/// let decoded = CertificateNumber::from_x509_extension_value(&encoded).unwrap();
/// assert_eq!(number, decoded);
/// ```
pub trait ToAndFromX509Extension {
    /// The Object Identifier (OID) for the extension.
    const OID: ObjectIdentifier;

    /// Encodes the extension into a DER-encoded byte vector.
    fn to_x509_extension_value(&self) -> Result<Vec<u8>>;

    /// Decodes the extension from a DER-encoded byte slice.
    fn from_x509_extension_value(extension: &[u8]) -> Result<Self>
    where
        Self: Sized;
}

fn encoding_error(err: der::Error) -> GostCertError {
    GostCertError::EncodingError(err.to_string())
}

/// Represents the Key Usage extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KeyUsage(pub FlagSet<KeyUsages>);

impl KeyUsage {
    /// digitalSignature, nonRepudiation, keyEncipherment, dataEncipherment and
    /// keyAgreement: the `0xF8` bit pattern.
    pub fn signing_and_agreement() -> Self {
        Self(
            KeyUsages::DigitalSignature
                | KeyUsages::NonRepudiation
                | KeyUsages::KeyEncipherment
                | KeyUsages::DataEncipherment
                | KeyUsages::KeyAgreement,
        )
    }
}

impl ToAndFromX509Extension for KeyUsage {
    const OID: ObjectIdentifier = <X509KeyUsage as AssociatedOid>::OID;

    fn to_x509_extension_value(&self) -> Result<Vec<u8>> {
        X509KeyUsage::from(self.0).to_der().map_err(encoding_error)
    }

    fn from_x509_extension_value(extension: &[u8]) -> Result<Self> {
        let ku = X509KeyUsage::from_der(extension)?;
        Ok(Self(ku.0))
    }
}

/// Represents the Basic Constraints extension.
///
/// # Fields
/// * `is_ca` - Indicates if the certificate is a CA.
/// * `max_path_length` - The maximum number of intermediate CAs allowed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BasicConstraints {
    pub is_ca: bool,
    pub max_path_length: Option<u8>,
}

impl ToAndFromX509Extension for BasicConstraints {
    const OID: ObjectIdentifier = x509_cert::ext::pkix::BasicConstraints::OID;

    fn to_x509_extension_value(&self) -> Result<Vec<u8>> {
        let bc = x509_cert::ext::pkix::BasicConstraints {
            ca: self.is_ca,
            path_len_constraint: self.max_path_length,
        };
        bc.to_der().map_err(encoding_error)
    }

    fn from_x509_extension_value(der_bytes: &[u8]) -> Result<Self> {
        let bc = x509_cert::ext::pkix::BasicConstraints::from_der(der_bytes)?;
        Ok(Self {
            is_ca: bc.ca,
            max_path_length: bc.path_len_constraint,
        })
    }
}

/// Represents the Subject Key Identifier extension.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubjectKeyIdentifier(pub Vec<u8>);

impl SubjectKeyIdentifier {
    /// SHA-1 over the subjectPublicKey BIT STRING contents.
    pub fn from_public_key(public_key: &PublicKey) -> Result<Self> {
        let spki = public_key.as_spki()?;
        let digest = Sha1::digest(spki.subject_public_key.raw_bytes());
        Ok(Self(digest.to_vec()))
    }
}

impl ToAndFromX509Extension for SubjectKeyIdentifier {
    const OID: ObjectIdentifier = x509_cert::ext::pkix::SubjectKeyIdentifier::OID;

    fn to_x509_extension_value(&self) -> Result<Vec<u8>> {
        let octets = OctetString::new(self.0.clone()).map_err(encoding_error)?;
        x509_cert::ext::pkix::SubjectKeyIdentifier(octets)
            .to_der()
            .map_err(encoding_error)
    }

    fn from_x509_extension_value(extension: &[u8]) -> Result<Self> {
        let ski = x509_cert::ext::pkix::SubjectKeyIdentifier::from_der(extension)?;
        Ok(Self(ski.0.as_bytes().to_vec()))
    }
}

/// Bicrypt key identifier (`1.2.643.3.123.3.1`), a UTF8String.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BicryptIdentifier(pub String);

impl ToAndFromX509Extension for BicryptIdentifier {
    const OID: ObjectIdentifier = ObjectIdentifier::new_unwrap("1.2.643.3.123.3.1");

    fn to_x509_extension_value(&self) -> Result<Vec<u8>> {
        self.0.to_der().map_err(encoding_error)
    }

    fn from_x509_extension_value(extension: &[u8]) -> Result<Self> {
        Ok(Self(String::from_der(extension)?))
    }
}

/// Certificate number (`1.2.643.3.123.3.5`), a UTF8String.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CertificateNumber(pub String);

impl ToAndFromX509Extension for CertificateNumber {
    const OID: ObjectIdentifier = ObjectIdentifier::new_unwrap("1.2.643.3.123.3.5");

    fn to_x509_extension_value(&self) -> Result<Vec<u8>> {
        self.0.to_der().map_err(encoding_error)
    }

    fn from_x509_extension_value(extension: &[u8]) -> Result<Self> {
        Ok(Self(String::from_der(extension)?))
    }
}

/// Parent authority reference (`1.2.643.3.123.3.4`): an OCTET STRING holding
/// the UTF-8 bytes of the reference.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParentAuthority(pub String);

impl ToAndFromX509Extension for ParentAuthority {
    const OID: ObjectIdentifier = ObjectIdentifier::new_unwrap("1.2.643.3.123.3.4");

    fn to_x509_extension_value(&self) -> Result<Vec<u8>> {
        OctetString::new(self.0.as_bytes())
            .and_then(|octets| octets.to_der())
            .map_err(encoding_error)
    }

    fn from_x509_extension_value(extension: &[u8]) -> Result<Self> {
        let octets = OctetString::from_der(extension)?;
        let text = String::from_utf8(octets.as_bytes().to_vec())
            .map_err(|e| GostCertError::DecodingError(e.to_string()))?;
        Ok(Self(text))
    }
}

/// Values of the private extensions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PrivateExtensionValues {
    pub certificate_number: String,
    pub bicrypt_identifier: String,
    pub parent_authority: String,
}

impl Default for PrivateExtensionValues {
    fn default() -> Self {
        Self {
            certificate_number: "1".to_string(),
            bicrypt_identifier: "AXXXXX01sФамXXX".to_string(),
            parent_authority: "1.2.643.3.123.5.4".to_string(),
        }
    }
}

/// Builds the fixed extension list for `public_key`, in certificate order:
/// key usage, bicrypt identifier, certificate number, basic constraints,
/// parent authority, subject key identifier.
pub fn build_extension_set(
    public_key: &PublicKey,
    values: &PrivateExtensionValues,
) -> Result<Vec<ExtensionParam>> {
    let basic_constraints = BasicConstraints {
        is_ca: false,
        max_path_length: None,
    };

    Ok(vec![
        ExtensionParam::from_extension(&KeyUsage::signing_and_agreement(), true)?,
        ExtensionParam::from_extension(
            &BicryptIdentifier(values.bicrypt_identifier.clone()),
            false,
        )?,
        ExtensionParam::from_extension(
            &CertificateNumber(values.certificate_number.clone()),
            false,
        )?,
        ExtensionParam::from_extension(&basic_constraints, false)?,
        ExtensionParam::from_extension(&ParentAuthority(values.parent_authority.clone()), false)?,
        ExtensionParam::from_extension(&SubjectKeyIdentifier::from_public_key(public_key)?, false)?,
    ])
}
