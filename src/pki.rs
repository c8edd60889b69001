//! GOST R 34.10-2001 detached signatures over GOST R 34.11-94 digests.
//!
//! Signatures are `s || r`, each half big-endian and as wide as one curve
//! coordinate.

use gost94::{Digest, Gost94CryptoPro};
use num_bigint::BigUint;
use num_traits::{One, Zero};

use crate::cert::AlgorithmSuite;
use crate::curve::{Curve, DomainParameterSet, Point};
use crate::error::{GostCertError, Result};
use crate::key::{PrivateKey, PublicKey, random_scalar};

/// A decoded `(r, s)` signature pair.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Signature {
    pub r: BigUint,
    pub s: BigUint,
}

impl Signature {
    /// Serializes as `s || r`.
    pub fn to_bytes(&self, params: DomainParameterSet) -> Vec<u8> {
        let len = params.coordinate_len();
        let mut out = fixed_be(&self.s, len);
        out.extend(fixed_be(&self.r, len));
        out
    }

    /// Parses `s || r`. Returns `None` when the length is wrong.
    pub fn from_bytes(bytes: &[u8], params: DomainParameterSet) -> Option<Self> {
        let len = params.coordinate_len();
        if bytes.len() != 2 * len {
            return None;
        }
        let (s, r) = bytes.split_at(len);
        Some(Self {
            r: BigUint::from_bytes_be(r),
            s: BigUint::from_bytes_be(s),
        })
    }
}

/// Byte length of a signature under `params`.
pub fn signature_len(params: DomainParameterSet) -> usize {
    2 * params.coordinate_len()
}

fn fixed_be(value: &BigUint, len: usize) -> Vec<u8> {
    let bytes = value.to_bytes_be();
    let mut out = vec![0u8; len.saturating_sub(bytes.len())];
    out.extend_from_slice(&bytes);
    out
}

/// GOST R 34.11-94 (CryptoPro S-box) digest of `message`.
pub fn digest(message: &[u8]) -> Vec<u8> {
    Gost94CryptoPro::digest(message).to_vec()
}

/// The digest read as a little-endian integer reduced mod `q`; zero maps to one.
fn digest_scalar(hash: &[u8], q: &BigUint) -> BigUint {
    let e = BigUint::from_bytes_le(hash) % q;
    if e.is_zero() { BigUint::one() } else { e }
}

/// Signs with an explicit nonce. Returns `None` if `k` yields `r = 0` or
/// `s = 0`, in which case a new nonce must be drawn.
pub(crate) fn sign_with_nonce(
    curve: &Curve,
    d: &BigUint,
    e: &BigUint,
    k: &BigUint,
) -> Option<Signature> {
    let q = &curve.q;
    let Point::Affine { x, .. } = curve.mul_base(k) else {
        return None;
    };
    let r = x % q;
    if r.is_zero() {
        return None;
    }
    let s = (&r * d + k * e) % q;
    if s.is_zero() {
        return None;
    }
    Some(Signature { r, s })
}

/// Checks `(r, s)` against `e` under `public`.
pub(crate) fn verify_digest(curve: &Curve, public: &Point, e: &BigUint, sig: &Signature) -> bool {
    let q = &curve.q;
    if sig.r.is_zero() || sig.s.is_zero() || &sig.r >= q || &sig.s >= q {
        return false;
    }
    let v = Curve::invert(e, q);
    let z1 = (&sig.s * &v) % q;
    let z2 = ((q - &sig.r) * &v) % q;
    let c = curve.add(&curve.mul_base(&z1), &curve.mul(public, &z2));
    match c {
        Point::Affine { x, .. } => x % q == sig.r,
        Point::Infinity => false,
    }
}

/// Signs `message` with `key` under `suite`.
///
/// Fails if the key was generated under different domain parameters than the
/// suite is bound to.
pub fn sign(message: &[u8], key: &PrivateKey, suite: &AlgorithmSuite) -> Result<Vec<u8>> {
    suite.check_params(key.params())?;
    let curve = key.params().curve();
    let e = digest_scalar(&digest(message), &curve.q);

    // Each retry draws a fresh nonce; the loop ends with overwhelming probability.
    for _ in 0..64 {
        let k = random_scalar(&curve.q);
        if let Some(signature) = sign_with_nonce(curve, key.scalar(), &e, &k) {
            log::debug!(
                "Signed {} byte message with {}",
                message.len(),
                suite.signature_algorithm()
            );
            return Ok(signature.to_bytes(key.params()));
        }
    }
    Err(GostCertError::SignatureError(
        "Could not find a usable nonce".to_string(),
    ))
}

/// Verifies `signature` over `message` with `key` under `suite`.
///
/// A signature that does not match, or is malformed, yields `Ok(false)`.
/// Only a key bound to different domain parameters is an error.
pub fn verify(
    message: &[u8],
    signature: &[u8],
    key: &PublicKey,
    suite: &AlgorithmSuite,
) -> Result<bool> {
    suite.check_params(key.params())?;
    let Some(sig) = Signature::from_bytes(signature, key.params()) else {
        return Ok(false);
    };
    let curve = key.params().curve();
    let e = digest_scalar(&digest(message), &curve.q);
    Ok(verify_digest(curve, &key.point(), &e, &sig))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cert::{KeyAlgorithm, SignatureAlgorithm};
    use crate::key::KeyPair;

    fn big(s: &str) -> BigUint {
        BigUint::parse_bytes(s.as_bytes(), 16).unwrap()
    }

    fn suite_for(params: DomainParameterSet) -> AlgorithmSuite {
        AlgorithmSuite::new(
            SignatureAlgorithm::Gost3411WithEcGost3410,
            KeyAlgorithm::EcGost3410,
            params,
        )
        .unwrap()
    }

    #[test]
    fn test_signature_known_answer() {
        // GOST R 34.10-2001 worked example: fixed d, e and k on the test curve.
        let curve = DomainParameterSet::Test.curve();
        let d = big("7A929ADE789BB9BE10ED359DD39A72C11B60961F49397EEE1D19CE9891EC3B28");
        let e = big("2DFBC1B372D89A1188C09C52E0EEC61FCE52032AB1022E8E67ECE6672B043EE5");
        let k = big("77105C9B20BCD3122823C8CF6FCC7B956DE33814E95B7FE64FED924594DCEAB3");

        let sig = sign_with_nonce(curve, &d, &e, &k).unwrap();
        assert_eq!(
            sig.r,
            big("41AA28D2F1AB148280CD9ED56FEDA41974053554A42767B83AD043FD39DC0493")
        );
        assert_eq!(
            sig.s,
            big("01456C64BA4642A1653C235A98A60249BCD6D3F746B631DF928014F6C5BF9C40")
        );

        let public = curve.mul_base(&d);
        assert!(verify_digest(curve, &public, &e, &sig));
    }

    #[test]
    fn test_sign_verify_round_trip() {
        let pair = KeyPair::generate(DomainParameterSet::CryptoProB);
        let suite = AlgorithmSuite::default();
        let message = b"Mary have nuclear bomb";
        let signature = sign(message, pair.private_key(), &suite).unwrap();
        assert_eq!(signature.len(), 64);
        assert!(verify(message, &signature, pair.public_key(), &suite).unwrap());
    }

    #[test]
    fn test_signatures_are_randomized() {
        let pair = KeyPair::generate(DomainParameterSet::CryptoProB);
        let suite = AlgorithmSuite::default();
        let first = sign(b"same", pair.private_key(), &suite).unwrap();
        let second = sign(b"same", pair.private_key(), &suite).unwrap();
        assert_ne!(first, second);
    }

    #[test]
    fn test_wrong_key_or_message_is_false_not_error() {
        let pair = KeyPair::generate(DomainParameterSet::CryptoProB);
        let other = KeyPair::generate(DomainParameterSet::CryptoProB);
        let suite = AlgorithmSuite::default();
        let signature = sign(b"payload", pair.private_key(), &suite).unwrap();
        assert!(!verify(b"payload", &signature, other.public_key(), &suite).unwrap());
        assert!(!verify(b"payload!", &signature, pair.public_key(), &suite).unwrap());
        assert!(!verify(b"payload", &signature[..63], pair.public_key(), &suite).unwrap());
        assert!(!verify(b"payload", &[0u8; 64], pair.public_key(), &suite).unwrap());
        assert!(!verify(b"payload", &[0xFFu8; 64], pair.public_key(), &suite).unwrap());
    }

    #[test]
    fn test_key_on_other_curve_is_rejected() {
        let pair = KeyPair::generate(DomainParameterSet::CryptoProA);
        let suite = suite_for(DomainParameterSet::CryptoProB);
        let err = sign(b"payload", pair.private_key(), &suite).unwrap_err();
        assert!(matches!(err, GostCertError::ConfigurationError(_)));
        let err = verify(b"payload", &[1u8; 64], pair.public_key(), &suite).unwrap_err();
        assert!(matches!(err, GostCertError::ConfigurationError(_)));
    }

    #[test]
    fn test_every_parameter_set_signs() {
        for params in DomainParameterSet::ALL {
            let pair = KeyPair::generate(params);
            let suite = suite_for(params);
            let signature = sign(b"abc", pair.private_key(), &suite).unwrap();
            assert_eq!(signature.len(), signature_len(params));
            assert!(verify(b"abc", &signature, pair.public_key(), &suite).unwrap(), "{params}");
        }
    }

    #[test]
    fn test_digest_cryptopro_vectors() {
        let vectors: [(&[u8], &str); 3] = [
            (
                b"",
                "981e5f3ca30c841487830f84fb433e13ac1101569b9c13584ac483234cd656c0",
            ),
            (
                b"abc",
                "b285056dbf18d7392d7677369524dd14747459ed8143997e163b2986f92fd42c",
            ),
            (
                b"The quick brown fox jumps over the lazy dog",
                "9004294a361a508c586fe53d1f1b02746765e71b765472786e4770d565830a76",
            ),
        ];
        for (message, expected) in vectors {
            assert_eq!(hex::encode(digest(message)), expected);
        }
    }
}
