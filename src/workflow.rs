//! The issuance cycle end to end: issue, persist, then sign with what was
//! persisted.

use std::fs;

use crate::armor;
use crate::cert::extensions::build_extension_set;
use crate::cert::params::{CertificationRequestInfo, Validity};
use crate::cert::{AlgorithmSuite, Certificate};
use crate::config::IssuanceConfig;
use crate::error::{GostCertError, Result};
use crate::issuer::{Issuer, SelfIssuer, generate_serial_number};
use crate::key::{KeyPair, PrivateKey};
use crate::pki;
use crate::store::{CertificateStore, Pkcs12File, PrivateKeyStore, RawKeyFile};

/// A freshly generated key pair and the certificate issued for it.
#[derive(Debug, Clone)]
pub struct IssuedCredentials {
    pub key_pair: KeyPair,
    pub certificate: Certificate,
}

/// Generates a key pair and issues a self-signed certificate for it.
///
/// Nothing is written to disk.
pub fn issue(config: &IssuanceConfig) -> Result<IssuedCredentials> {
    config.validate()?;
    let suite = config.suite()?;

    let key_pair = KeyPair::generate(suite.params());
    let subject = config.subject_identity()?;
    let extensions = build_extension_set(key_pair.public_key(), &config.extension_values())?;
    let request = CertificationRequestInfo::builder()
        .serial_number(generate_serial_number(config.serial_upper_bound)?)
        .subject(subject)
        .subject_public_key(key_pair.public_key().clone())
        .validity(Validity::for_years_from_today(config.validity_years)?)
        .extensions(extensions)
        .build();

    let certificate = SelfIssuer::new(&key_pair, suite)
        .with_issuer_name(config.issuer_name())
        .issue(&request)?;

    Ok(IssuedCredentials {
        key_pair,
        certificate,
    })
}

/// Writes the raw key file, the PKCS#12 container and the CMS text.
///
/// The writes are independent. A failure part way leaves an inconsistent set
/// on disk, which [`sign_persisted`] detects.
pub fn persist(config: &IssuanceConfig, issued: &IssuedCredentials) -> Result<()> {
    let output = &config.output;
    fs::create_dir_all(&output.directory)?;

    RawKeyFile::new(output.private_key_path()).store_key(issued.key_pair.private_key())?;
    Pkcs12File::new(output.certificate_container_path(), config.password.as_str())
        .store_certificate(&issued.certificate, issued.key_pair.private_key())?;
    armor::write_cms_file(&output.cms_text_path(), &issued.certificate)?;

    log::info!(
        "Persisted credentials for serial {} under {}",
        issued.certificate.serial_number()?,
        output.directory.display()
    );
    Ok(())
}

/// Loads the certificate from the persisted container.
pub fn load_certificate(config: &IssuanceConfig) -> Result<Certificate> {
    Pkcs12File::new(
        config.output.certificate_container_path(),
        config.password.as_str(),
    )
    .load_certificate()
}

/// Signs `message` with the persisted private key and confirms the signature
/// against the public key of the persisted certificate.
pub fn sign_persisted(config: &IssuanceConfig, message: &[u8]) -> Result<Vec<u8>> {
    let suite = config.suite()?;
    let key = RawKeyFile::new(config.output.private_key_path()).load_key(suite.params())?;
    let certificate = load_certificate(config)?;
    sign_and_confirm(message, &key, &certificate, &suite)
}

/// Signs `message` with `key`, then verifies the result with the key embedded
/// in `certificate`.
///
/// A signature that does not verify means the key and the certificate do not
/// belong together, reported as [`GostCertError::IntegrityFailure`].
pub fn sign_and_confirm(
    message: &[u8],
    key: &PrivateKey,
    certificate: &Certificate,
    suite: &AlgorithmSuite,
) -> Result<Vec<u8>> {
    let public_key = certificate.public_key()?;
    if public_key.params() != key.params() {
        return Err(GostCertError::IntegrityFailure(format!(
            "Private key uses {} but the certificate key uses {}",
            key.params(),
            public_key.params()
        )));
    }

    let signature = pki::sign(message, key, suite)?;
    if !pki::verify(message, &signature, &public_key, suite)? {
        log::warn!("Signature did not verify against the certificate key");
        return Err(GostCertError::IntegrityFailure(
            "Private key does not match the certificate public key".to_string(),
        ));
    }

    log::info!(
        "Signed {} byte message, signature verified against certificate serial {}",
        message.len(),
        certificate.serial_number()?
    );
    Ok(signature)
}

#[cfg(test)]
mod tests {
    use tempfile::tempdir;

    use super::*;
    use crate::config::OutputPaths;

    fn config_in(dir: &std::path::Path) -> IssuanceConfig {
        IssuanceConfig {
            output: OutputPaths::in_directory(dir),
            ..IssuanceConfig::default()
        }
    }

    #[test]
    fn test_issue_builds_self_signed_certificate() {
        let config = IssuanceConfig::default();
        let issued = issue(&config).unwrap();
        let cert = &issued.certificate;

        assert!(cert.verify_self_signature().unwrap());
        assert_eq!(cert.subject().unwrap(), config.subject_identity().unwrap());
        assert_eq!(cert.issuer().unwrap(), cert.subject().unwrap());
        assert!(cert.serial_number().unwrap() >= 1);
        assert_eq!(&cert.public_key().unwrap(), issued.key_pair.public_key());
    }

    #[test]
    fn test_issue_with_explicit_issuer() {
        let config = IssuanceConfig {
            issuer_common_name: Some("XXX".to_string()),
            ..IssuanceConfig::default()
        };
        let issued = issue(&config).unwrap();
        assert_eq!(
            issued.certificate.issuer().unwrap().attributes(),
            &[(crate::cert::params::AttributeKey::CommonName, "XXX".to_string())]
        );
        assert!(issued.certificate.verify_self_signature().unwrap());
    }

    #[test]
    fn test_persist_then_sign() {
        let dir = tempdir().unwrap();
        let config = config_in(dir.path());
        let issued = issue(&config).unwrap();
        persist(&config, &issued).unwrap();

        assert!(config.output.private_key_path().exists());
        assert!(config.output.certificate_container_path().exists());
        assert!(config.output.cms_text_path().exists());

        let signature = sign_persisted(&config, b"Mary have nuclear bomb").unwrap();
        assert_eq!(signature.len(), 64);
        assert_eq!(load_certificate(&config).unwrap(), issued.certificate);
    }

    #[test]
    fn test_mismatched_key_file_is_integrity_failure() {
        let dir = tempdir().unwrap();
        let config = config_in(dir.path());
        let issued = issue(&config).unwrap();
        persist(&config, &issued).unwrap();

        let stranger = KeyPair::generate(config.suite().unwrap().params());
        RawKeyFile::new(config.output.private_key_path())
            .store_key(stranger.private_key())
            .unwrap();

        let err = sign_persisted(&config, b"Mary have nuclear bomb").unwrap_err();
        assert!(matches!(err, GostCertError::IntegrityFailure(_)));
    }

    #[test]
    fn test_key_on_other_curve_is_integrity_failure() {
        let issued = issue(&IssuanceConfig::default()).unwrap();
        let stranger = KeyPair::generate(crate::curve::DomainParameterSet::CryptoProA);
        let err = sign_and_confirm(
            b"payload",
            stranger.private_key(),
            &issued.certificate,
            &AlgorithmSuite::default(),
        )
        .unwrap_err();
        assert!(matches!(err, GostCertError::IntegrityFailure(_)));
    }

    #[test]
    fn test_sign_without_persisted_state_fails() {
        let dir = tempdir().unwrap();
        let config = config_in(dir.path());
        assert!(matches!(
            sign_persisted(&config, b"payload").unwrap_err(),
            GostCertError::IoError(_)
        ));
    }
}
