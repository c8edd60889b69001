use gostcert::cert::extensions::{PrivateExtensionValues, build_extension_set};
use gostcert::cert::params::{AttributeKey, CertificationRequestInfo, SubjectIdentity, Validity};
use gostcert::cert::{AlgorithmSuite, Certificate};
use gostcert::issuer::{Issuer, SelfIssuer};
use gostcert::key::KeyPair;

pub fn test_subject() -> SubjectIdentity {
    SubjectIdentity::new()
        .with(AttributeKey::Country, "RU")
        .with(AttributeKey::Organization, "Test Org")
        .with(AttributeKey::CommonName, "Test Person")
}

/// Key pair and certificate with serial 1, valid from today for two years.
pub fn issue_test_certificate() -> (KeyPair, Certificate) {
    let suite = AlgorithmSuite::default();
    let key_pair = KeyPair::generate(suite.params());

    let extensions =
        build_extension_set(key_pair.public_key(), &PrivateExtensionValues::default()).unwrap();
    let request = CertificationRequestInfo::builder()
        .serial_number(1)
        .subject(test_subject())
        .subject_public_key(key_pair.public_key().clone())
        .validity(Validity::for_years_from_today(2).unwrap())
        .extensions(extensions)
        .build();

    let cert = SelfIssuer::new(&key_pair, suite).issue(&request).unwrap();
    (key_pair, cert)
}
