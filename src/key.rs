use std::fmt;

use der::asn1::{AnyRef, BitString, OctetString, OctetStringRef};
use der::{Any, Decode, Encode, Sequence};
use num_bigint::BigUint;
use num_traits::Zero;
use rand_core::{OsRng, RngCore};
use x509_cert::spki::{AlgorithmIdentifierOwned, SubjectPublicKeyInfoOwned};

use crate::cert::KeyAlgorithm;
use crate::curve::{DomainParameterSet, Point};
use crate::error::{GostCertError, Result};

/// `id-GostR3411-94-CryptoProParamSet`, carried next to the curve OID in key parameters.
pub const DIGEST_PARAM_SET: const_oid::ObjectIdentifier =
    const_oid::ObjectIdentifier::new_unwrap("1.2.643.2.2.30.1");

/// `GostR3410-2001-PublicKeyParameters` from RFC 4491.
#[derive(Clone, Debug, Eq, PartialEq, Sequence)]
pub struct GostKeyParameters {
    pub public_key_param_set: const_oid::ObjectIdentifier,
    pub digest_param_set: const_oid::ObjectIdentifier,
}

impl GostKeyParameters {
    pub fn new(params: DomainParameterSet) -> Self {
        Self {
            public_key_param_set: params.oid(),
            digest_param_set: DIGEST_PARAM_SET,
        }
    }
}

/// Draws a scalar uniformly from `[1, q)` using the operating system RNG.
pub(crate) fn random_scalar(q: &BigUint) -> BigUint {
    let bits = q.bits() as usize;
    let len = bits.div_ceil(8);
    let excess = len * 8 - bits;
    let mut buf = vec![0u8; len];
    loop {
        OsRng.fill_bytes(&mut buf);
        buf[0] &= 0xFF >> excess;
        let candidate = BigUint::from_bytes_be(&buf);
        if !candidate.is_zero() && &candidate < q {
            return candidate;
        }
    }
}

fn to_fixed_be(value: &BigUint, len: usize) -> Vec<u8> {
    let bytes = value.to_bytes_be();
    let mut out = vec![0u8; len.saturating_sub(bytes.len())];
    out.extend_from_slice(&bytes);
    out
}

fn to_fixed_le(value: &BigUint, len: usize) -> Vec<u8> {
    let mut bytes = value.to_bytes_le();
    bytes.resize(len, 0);
    bytes
}

/// A GOST R 34.10-2001 private key: the scalar `d` bound to its domain parameters.
#[derive(Clone, PartialEq, Eq)]
pub struct PrivateKey {
    params: DomainParameterSet,
    scalar: BigUint,
}

impl fmt::Debug for PrivateKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PrivateKey")
            .field("params", &self.params)
            .finish_non_exhaustive()
    }
}

impl PrivateKey {
    /// Wraps a scalar, rejecting values outside `[1, q)`.
    pub fn new(params: DomainParameterSet, scalar: BigUint) -> Result<Self> {
        let q = &params.curve().q;
        if scalar.is_zero() || &scalar >= q {
            return Err(GostCertError::KeyGenerationError(format!(
                "Private scalar is outside [1, q) for {params}"
            )));
        }
        Ok(Self { params, scalar })
    }

    /// Reads a big-endian scalar. Leading zero bytes are accepted, which
    /// covers writers that emit a two's-complement sign byte.
    pub fn from_be_bytes(bytes: &[u8], params: DomainParameterSet) -> Result<Self> {
        if bytes.is_empty() {
            return Err(GostCertError::DecodingError(
                "Private key material is empty".to_string(),
            ));
        }
        Self::new(params, BigUint::from_bytes_be(bytes))
    }

    /// The scalar as fixed-width big-endian bytes.
    pub fn to_be_bytes(&self) -> Vec<u8> {
        to_fixed_be(&self.scalar, self.params.coordinate_len())
    }

    pub fn params(&self) -> DomainParameterSet {
        self.params
    }

    pub(crate) fn scalar(&self) -> &BigUint {
        &self.scalar
    }

    /// Derives the matching public key `d·G`.
    pub fn public_key(&self) -> PublicKey {
        match self.params.curve().mul_base(&self.scalar) {
            Point::Affine { x, y } => PublicKey {
                params: self.params,
                x,
                y,
            },
            // d is in [1, q) so d·G is never the identity.
            Point::Infinity => unreachable!("scalar in [1, q) maps to a finite point"),
        }
    }

    /// Encodes the key as a PKCS#8 `PrivateKeyInfo`. The private key field
    /// holds an OCTET STRING with the little-endian scalar.
    pub fn to_pkcs8_der(&self) -> Result<Vec<u8>> {
        let params_der = GostKeyParameters::new(self.params)
            .to_der()
            .map_err(|e| GostCertError::EncodingError(e.to_string()))?;
        let params_any = AnyRef::from_der(&params_der)?;
        let le = to_fixed_le(&self.scalar, self.params.coordinate_len());
        let inner = OctetStringRef::new(&le)
            .and_then(|octets| octets.to_der())
            .map_err(|e| GostCertError::EncodingError(e.to_string()))?;

        let algorithm = pkcs8::AlgorithmIdentifierRef {
            oid: KeyAlgorithm::EcGost3410.oid(),
            parameters: Some(params_any),
        };
        pkcs8::PrivateKeyInfo::new(algorithm, &inner)
            .to_der()
            .map_err(|e| GostCertError::EncodingError(e.to_string()))
    }

    /// Decodes a key written by [`PrivateKey::to_pkcs8_der`].
    pub fn from_pkcs8_der(der_bytes: &[u8]) -> Result<Self> {
        let info = pkcs8::PrivateKeyInfo::from_der(der_bytes)?;
        if info.algorithm.oid != KeyAlgorithm::EcGost3410.oid() {
            return Err(GostCertError::DecodingError(format!(
                "Unsupported private key algorithm {}",
                info.algorithm.oid
            )));
        }
        let params: GostKeyParameters = info
            .algorithm
            .parameters
            .ok_or_else(|| {
                GostCertError::DecodingError("Missing GOST key parameters".to_string())
            })?
            .decode_as()?;
        let set = DomainParameterSet::from_oid(params.public_key_param_set)?;
        let inner = OctetStringRef::from_der(info.private_key)?;
        Self::new(set, BigUint::from_bytes_le(inner.as_bytes()))
    }
}

/// A GOST R 34.10-2001 public key: an affine point on the curve of `params`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PublicKey {
    params: DomainParameterSet,
    x: BigUint,
    y: BigUint,
}

impl PublicKey {
    /// Builds a key from affine coordinates, rejecting points off the curve.
    pub fn from_affine(params: DomainParameterSet, x: BigUint, y: BigUint) -> Result<Self> {
        let point = Point::Affine {
            x: x.clone(),
            y: y.clone(),
        };
        if !params.curve().contains(&point) {
            return Err(GostCertError::DecodingError(format!(
                "Public key point is not on the {params} curve"
            )));
        }
        Ok(Self { params, x, y })
    }

    pub fn params(&self) -> DomainParameterSet {
        self.params
    }

    pub(crate) fn point(&self) -> Point {
        Point::Affine {
            x: self.x.clone(),
            y: self.y.clone(),
        }
    }

    /// `x || y`, each little-endian and fixed width, as carried in certificates.
    pub fn to_raw_bytes(&self) -> Vec<u8> {
        let len = self.params.coordinate_len();
        let mut out = to_fixed_le(&self.x, len);
        out.extend(to_fixed_le(&self.y, len));
        out
    }

    /// Parses the `x || y` little-endian form.
    pub fn from_raw_bytes(bytes: &[u8], params: DomainParameterSet) -> Result<Self> {
        let len = params.coordinate_len();
        if bytes.len() != 2 * len {
            return Err(GostCertError::DecodingError(format!(
                "Public key must be {} bytes, got {}",
                2 * len,
                bytes.len()
            )));
        }
        let (x, y) = bytes.split_at(len);
        Self::from_affine(
            params,
            BigUint::from_bytes_le(x),
            BigUint::from_bytes_le(y),
        )
    }

    /// The `AlgorithmIdentifier` for this key, with its parameter sets.
    pub fn algorithm_identifier(&self) -> Result<AlgorithmIdentifierOwned> {
        let parameters = Any::encode_from(&GostKeyParameters::new(self.params))
            .map_err(|e| GostCertError::EncodingError(e.to_string()))?;
        Ok(AlgorithmIdentifierOwned {
            oid: KeyAlgorithm::EcGost3410.oid(),
            parameters: Some(parameters),
        })
    }

    /// Encodes the key as a `SubjectPublicKeyInfo`.
    pub fn as_spki(&self) -> Result<SubjectPublicKeyInfoOwned> {
        let octets = OctetString::new(self.to_raw_bytes())
            .and_then(|octets| octets.to_der())
            .map_err(|e| GostCertError::EncodingError(e.to_string()))?;
        Ok(SubjectPublicKeyInfoOwned {
            algorithm: self.algorithm_identifier()?,
            subject_public_key: BitString::from_bytes(&octets)
                .map_err(|e| GostCertError::EncodingError(e.to_string()))?,
        })
    }

    /// Decodes a `SubjectPublicKeyInfo` produced by [`PublicKey::as_spki`].
    pub fn from_x509spki(spki: &SubjectPublicKeyInfoOwned) -> Result<Self> {
        if spki.algorithm.oid != KeyAlgorithm::EcGost3410.oid() {
            return Err(GostCertError::CertificateError(format!(
                "Unsupported public key algorithm {}",
                spki.algorithm.oid
            )));
        }
        let params: GostKeyParameters = spki
            .algorithm
            .parameters
            .as_ref()
            .ok_or_else(|| {
                GostCertError::DecodingError("Missing GOST key parameters".to_string())
            })?
            .decode_as()?;
        let set = DomainParameterSet::from_oid(params.public_key_param_set)?;
        let bits = spki.subject_public_key.as_bytes().ok_or_else(|| {
            GostCertError::DecodingError("Public key bit string is not octet aligned".to_string())
        })?;
        let octets = OctetString::from_der(bits)?;
        Self::from_raw_bytes(octets.as_bytes(), set)
    }
}

/// A matched private/public key pair.
#[derive(Clone, Debug)]
pub struct KeyPair {
    private: PrivateKey,
    public: PublicKey,
}

impl KeyPair {
    /// Generates a fresh key pair under `params` from the OS RNG.
    pub fn generate(params: DomainParameterSet) -> Self {
        let scalar = random_scalar(&params.curve().q);
        let private = PrivateKey { params, scalar };
        Self::from_private(private)
    }

    /// Generates a key pair under the parameter set named by `name`.
    pub fn generate_named(name: &str) -> Result<Self> {
        let params: DomainParameterSet = name.parse()?;
        Ok(Self::generate(params))
    }

    /// Rebuilds the pair from a private key alone.
    pub fn from_private(private: PrivateKey) -> Self {
        let public = private.public_key();
        Self { private, public }
    }

    pub fn private_key(&self) -> &PrivateKey {
        &self.private
    }

    pub fn public_key(&self) -> &PublicKey {
        &self.public
    }

    pub fn params(&self) -> DomainParameterSet {
        self.private.params
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generated_keys_are_distinct_and_valid() {
        let first = KeyPair::generate(DomainParameterSet::CryptoProB);
        let second = KeyPair::generate(DomainParameterSet::CryptoProB);
        assert_ne!(first.private_key(), second.private_key());
        let curve = DomainParameterSet::CryptoProB.curve();
        assert!(curve.contains(&first.public_key().point()));
        assert_eq!(first.private_key().public_key(), *first.public_key());
    }

    #[test]
    fn test_generate_named_rejects_unknown_curve() {
        let err = KeyPair::generate_named("P-256").unwrap_err();
        assert!(matches!(err, GostCertError::ConfigurationError(_)));
    }

    #[test]
    fn test_private_key_bytes_restore_same_key() {
        let pair = KeyPair::generate(DomainParameterSet::CryptoProB);
        let bytes = pair.private_key().to_be_bytes();
        assert_eq!(bytes.len(), 32);
        let restored = PrivateKey::from_be_bytes(&bytes, DomainParameterSet::CryptoProB).unwrap();
        assert_eq!(&restored, pair.private_key());

        let mut signed = vec![0u8];
        signed.extend_from_slice(&bytes);
        let restored = PrivateKey::from_be_bytes(&signed, DomainParameterSet::CryptoProB).unwrap();
        assert_eq!(&restored, pair.private_key());
    }

    #[test]
    fn test_private_key_out_of_range_rejected() {
        let q = DomainParameterSet::CryptoProB.curve().q.to_bytes_be();
        assert!(PrivateKey::from_be_bytes(&q, DomainParameterSet::CryptoProB).is_err());
        assert!(PrivateKey::from_be_bytes(&[0, 0], DomainParameterSet::CryptoProB).is_err());
        assert!(PrivateKey::from_be_bytes(&[], DomainParameterSet::CryptoProB).is_err());
    }

    #[test]
    fn test_spki_encoding_carries_parameter_sets() {
        let pair = KeyPair::generate(DomainParameterSet::CryptoProB);
        let spki = pair.public_key().as_spki().unwrap();
        assert_eq!(spki.algorithm.oid, KeyAlgorithm::EcGost3410.oid());
        // OCTET STRING header plus two 32-byte coordinates.
        assert_eq!(spki.subject_public_key.raw_bytes().len(), 66);
        assert_eq!(&spki.subject_public_key.raw_bytes()[..2], &[0x04, 0x40]);

        let decoded = PublicKey::from_x509spki(&spki).unwrap();
        assert_eq!(&decoded, pair.public_key());
        assert_eq!(decoded.params(), DomainParameterSet::CryptoProB);
    }

    #[test]
    fn test_off_curve_point_rejected() {
        let mut raw = KeyPair::generate(DomainParameterSet::CryptoProA)
            .public_key()
            .to_raw_bytes();
        raw[40] ^= 0x01;
        let err = PublicKey::from_raw_bytes(&raw, DomainParameterSet::CryptoProA).unwrap_err();
        assert!(matches!(err, GostCertError::DecodingError(_)));
    }

    #[test]
    fn test_pkcs8_restores_private_key() {
        let pair = KeyPair::generate(DomainParameterSet::CryptoProC);
        let der = pair.private_key().to_pkcs8_der().unwrap();
        let restored = PrivateKey::from_pkcs8_der(&der).unwrap();
        assert_eq!(&restored, pair.private_key());
        assert_eq!(restored.params(), DomainParameterSet::CryptoProC);
    }

    #[test]
    fn test_random_scalar_stays_in_range() {
        let q = &DomainParameterSet::CryptoProB.curve().q;
        for _ in 0..200 {
            let k = random_scalar(q);
            assert!(!k.is_zero());
            assert!(&k < q);
        }
    }
}
