use der::Encode;
use rand::Rng;
use x509_cert::certificate::CertificateInner;

use crate::cert::params::{CertificationRequestInfo, SubjectIdentity};
use crate::cert::{AlgorithmSuite, Certificate};
use crate::error::{GostCertError, Result};
use crate::key::KeyPair;
use crate::pki;
use crate::tbs_certificate::TbsCertificate;

/// Exclusive upper bound for generated serial numbers.
pub const DEFAULT_SERIAL_UPPER_BOUND: u64 = i64::MAX as u64;

/// Draws a serial number uniformly from `[1, upper_bound)`.
pub fn generate_serial_number(upper_bound: u64) -> Result<u64> {
    if upper_bound <= 1 {
        return Err(GostCertError::InvalidInput(format!(
            "Serial number upper bound must exceed 1, got {upper_bound}"
        )));
    }
    Ok(rand::rng().random_range(1..upper_bound))
}

/// Which name goes into the issuer field of a self-issued certificate.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub enum IssuerName {
    /// The issuer name equals the subject name.
    #[default]
    SameAsSubject,
    /// A fixed name, such as `CN=XXX`.
    Explicit(SubjectIdentity),
}

/// Represents an entity capable of issuing certificates.
pub trait Issuer {
    /// Returns the distinguished name written as issuer for `subject`.
    fn issuer_name(&self, subject: &SubjectIdentity) -> SubjectIdentity;

    /// Returns the signing key of the issuer.
    fn signing_key(&self) -> &KeyPair;

    /// Returns the algorithm suite the issuer signs with.
    fn suite(&self) -> &AlgorithmSuite;

    /// Extra checks on a request before anything is signed.
    fn check_request(&self, _request: &CertificationRequestInfo) -> Result<()> {
        Ok(())
    }

    /// Issues a certificate for `request`.
    ///
    /// The TBS structure is DER-encoded and those exact bytes are signed with
    /// the issuer key.
    fn issue(&self, request: &CertificationRequestInfo) -> Result<Certificate> {
        let key = self.signing_key();
        let suite = self.suite();
        suite.check_params(key.params())?;
        suite.check_params(request.subject_public_key.params())?;
        request.validity.check()?;
        if request.serial_number == 0 {
            return Err(GostCertError::InvalidInput(
                "Serial number must be positive".to_string(),
            ));
        }
        self.check_request(request)?;

        let tbs_cert = TbsCertificate {
            serial_number: request.serial_number,
            signature_algorithm: suite.signature_algorithm(),
            issuer: self.issuer_name(&request.subject),
            validity: request.validity.clone(),
            subject: request.subject.clone(),
            subject_public_key: request.subject_public_key.clone(),
            extensions: request.extensions.clone(),
        };

        let tbs_cert_inner = tbs_cert.to_tbs_certificate_inner()?;
        let tbs_der = tbs_cert_inner
            .to_der()
            .map_err(|e| GostCertError::EncodingError(e.to_string()))?;
        let signature = pki::sign(&tbs_der, key.private_key(), suite)?;

        let cert_inner = CertificateInner {
            tbs_certificate: tbs_cert_inner,
            signature_algorithm: suite.signature_algorithm().into(),
            signature: der::asn1::BitString::from_bytes(&signature)
                .map_err(|e| GostCertError::EncodingError(e.to_string()))?,
        };

        log::info!(
            "Issued certificate serial {} with {} over {}",
            request.serial_number,
            suite.signature_algorithm(),
            suite.params()
        );
        Ok(Certificate { inner: cert_inner })
    }
}

/// Issues certificates for its own key pair.
pub struct SelfIssuer<'a> {
    key: &'a KeyPair,
    suite: AlgorithmSuite,
    name: IssuerName,
}

impl<'a> SelfIssuer<'a> {
    pub fn new(key: &'a KeyPair, suite: AlgorithmSuite) -> Self {
        Self {
            key,
            suite,
            name: IssuerName::SameAsSubject,
        }
    }

    /// Overrides the issuer name written into certificates.
    pub fn with_issuer_name(mut self, name: IssuerName) -> Self {
        self.name = name;
        self
    }
}

impl Issuer for SelfIssuer<'_> {
    fn issuer_name(&self, subject: &SubjectIdentity) -> SubjectIdentity {
        match &self.name {
            IssuerName::SameAsSubject => subject.clone(),
            IssuerName::Explicit(name) => name.clone(),
        }
    }

    fn signing_key(&self) -> &KeyPair {
        self.key
    }

    fn suite(&self) -> &AlgorithmSuite {
        &self.suite
    }

    /// The certified key must be the signing key, so the certificate verifies
    /// with its own embedded public key.
    fn check_request(&self, request: &CertificationRequestInfo) -> Result<()> {
        if &request.subject_public_key != self.key.public_key() {
            return Err(GostCertError::CertificateError(
                "Self-issued certificate must certify the signing key".to_string(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use time::OffsetDateTime;

    use super::*;
    use crate::cert::extensions::{PrivateExtensionValues, build_extension_set};
    use crate::cert::params::{AttributeKey, Validity};
    use crate::cert::{KeyAlgorithm, SignatureAlgorithm};
    use crate::curve::DomainParameterSet;

    fn test_subject() -> SubjectIdentity {
        SubjectIdentity::new()
            .with(AttributeKey::Country, "RU")
            .with(AttributeKey::Organization, "Test Org")
            .with(AttributeKey::CommonName, "Test Person")
    }

    fn request_for(key: &KeyPair, validity: Validity) -> CertificationRequestInfo {
        CertificationRequestInfo::builder()
            .serial_number(1)
            .subject(test_subject())
            .subject_public_key(key.public_key().clone())
            .validity(validity)
            .extensions(
                build_extension_set(key.public_key(), &PrivateExtensionValues::default()).unwrap(),
            )
            .build()
    }

    #[test]
    fn test_issued_certificate_verifies_with_embedded_key() {
        let key = KeyPair::generate(DomainParameterSet::CryptoProB);
        let issuer = SelfIssuer::new(&key, AlgorithmSuite::default());
        let cert = issuer
            .issue(&request_for(&key, Validity::for_years_from_today(2).unwrap()))
            .unwrap();

        assert!(cert.verify_self_signature().unwrap());
        assert_eq!(&cert.public_key().unwrap(), key.public_key());
        assert_eq!(cert.serial_number().unwrap(), 1);
        assert_eq!(cert.subject().unwrap(), test_subject());
        assert_eq!(cert.issuer().unwrap(), test_subject());
        assert_eq!(
            cert.inner.tbs_certificate.version,
            x509_cert::Version::V3
        );
        assert_eq!(cert.inner.tbs_certificate.extensions.as_ref().unwrap().len(), 6);
    }

    #[test]
    fn test_explicit_issuer_name() {
        let key = KeyPair::generate(DomainParameterSet::CryptoProB);
        let issuer = SelfIssuer::new(&key, AlgorithmSuite::default())
            .with_issuer_name(IssuerName::Explicit(SubjectIdentity::common_name("XXX")));
        let cert = issuer
            .issue(&request_for(&key, Validity::for_days(30).unwrap()))
            .unwrap();
        assert_eq!(cert.issuer().unwrap(), SubjectIdentity::common_name("XXX"));
        assert!(cert.verify_self_signature().unwrap());
    }

    #[test]
    fn test_inverted_validity_is_rejected() {
        let key = KeyPair::generate(DomainParameterSet::CryptoProB);
        let issuer = SelfIssuer::new(&key, AlgorithmSuite::default());
        let now = OffsetDateTime::now_utc();
        for not_after in [now, now - time::Duration::days(1)] {
            let validity = Validity {
                not_before: now,
                not_after,
            };
            let err = issuer.issue(&request_for(&key, validity)).unwrap_err();
            assert!(matches!(err, GostCertError::InvalidInput(_)));
        }
    }

    #[test]
    fn test_subsecond_validity_is_rejected() {
        let key = KeyPair::generate(DomainParameterSet::CryptoProB);
        let issuer = SelfIssuer::new(&key, AlgorithmSuite::default());
        let start = OffsetDateTime::from_unix_timestamp(1_900_000_000).unwrap();
        let validity = Validity {
            not_before: start,
            not_after: start + time::Duration::milliseconds(500),
        };
        let err = issuer.issue(&request_for(&key, validity)).unwrap_err();
        assert!(matches!(err, GostCertError::InvalidInput(_)));
    }

    #[test]
    fn test_zero_serial_is_rejected() {
        let key = KeyPair::generate(DomainParameterSet::CryptoProB);
        let issuer = SelfIssuer::new(&key, AlgorithmSuite::default());
        let mut request = request_for(&key, Validity::for_days(1).unwrap());
        request.serial_number = 0;
        assert!(matches!(
            issuer.issue(&request).unwrap_err(),
            GostCertError::InvalidInput(_)
        ));
    }

    #[test]
    fn test_key_and_suite_mismatch_is_rejected() {
        let key = KeyPair::generate(DomainParameterSet::CryptoProA);
        let issuer = SelfIssuer::new(&key, AlgorithmSuite::default());
        let err = issuer
            .issue(&request_for(&key, Validity::for_days(1).unwrap()))
            .unwrap_err();
        assert!(matches!(err, GostCertError::ConfigurationError(_)));

        let suite = AlgorithmSuite::new(
            SignatureAlgorithm::Gost3411WithEcGost3410,
            KeyAlgorithm::EcGost3410,
            DomainParameterSet::CryptoProA,
        )
        .unwrap();
        assert!(
            SelfIssuer::new(&key, suite)
                .issue(&request_for(&key, Validity::for_days(1).unwrap()))
                .is_ok()
        );
    }

    #[test]
    fn test_foreign_subject_key_is_rejected() {
        let key = KeyPair::generate(DomainParameterSet::CryptoProB);
        let other = KeyPair::generate(DomainParameterSet::CryptoProB);
        let issuer = SelfIssuer::new(&key, AlgorithmSuite::default());
        let err = issuer
            .issue(&request_for(&other, Validity::for_days(1).unwrap()))
            .unwrap_err();
        assert!(matches!(err, GostCertError::CertificateError(_)));
    }

    #[test]
    fn test_serial_numbers_in_range_without_collisions() {
        let mut seen = HashSet::new();
        for _ in 0..10_000 {
            let serial = generate_serial_number(DEFAULT_SERIAL_UPPER_BOUND).unwrap();
            assert!(serial >= 1);
            assert!(serial < DEFAULT_SERIAL_UPPER_BOUND);
            seen.insert(serial);
        }
        assert_eq!(seen.len(), 10_000);

        for _ in 0..1_000 {
            let serial = generate_serial_number(10).unwrap();
            assert!((1..10).contains(&serial));
        }
        assert!(generate_serial_number(1).is_err());
    }
}
