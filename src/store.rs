//! Persistence of the issued credentials.
//!
//! The raw key file is unencrypted and carries no integrity check. Whatever
//! reads it back must confirm the key against the certificate before trusting
//! it, see [`crate::workflow::sign_persisted`].

use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

use crate::cert::Certificate;
use crate::curve::DomainParameterSet;
use crate::error::{GostCertError, Result};
use crate::key::PrivateKey;

/// Friendly name attached to the PKCS#12 bags.
pub const PKCS12_FRIENDLY_NAME: &str = "gostcert";

/// Load/store contract for private key material.
pub trait PrivateKeyStore {
    fn store_key(&self, key: &PrivateKey) -> Result<()>;

    /// Loads the key, binding it to `params`.
    fn load_key(&self, params: DomainParameterSet) -> Result<PrivateKey>;
}

/// Load/store contract for the certificate container.
pub trait CertificateStore {
    /// Writes `certificate` together with the matching private key.
    fn store_certificate(&self, certificate: &Certificate, key: &PrivateKey) -> Result<()>;

    fn load_certificate(&self) -> Result<Certificate>;
}

/// The private scalar as fixed-width big-endian bytes in a plain file.
#[derive(Debug, Clone)]
pub struct RawKeyFile {
    path: PathBuf,
}

impl RawKeyFile {
    pub fn new<P: AsRef<Path>>(path: P) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl PrivateKeyStore for RawKeyFile {
    fn store_key(&self, key: &PrivateKey) -> Result<()> {
        fs::write(&self.path, key.to_be_bytes())?;
        log::warn!(
            "Private key written unencrypted to {}",
            self.path.display()
        );
        Ok(())
    }

    fn load_key(&self, params: DomainParameterSet) -> Result<PrivateKey> {
        let bytes = fs::read(&self.path)?;
        let width = params.coordinate_len();
        // One extra leading byte is a sign byte and must be zero.
        let digits = match bytes.len() {
            len if len == width + 1 && bytes[0] == 0 => &bytes[1..],
            len if (1..=width).contains(&len) => &bytes[..],
            len => {
                return Err(GostCertError::DecodingError(format!(
                    "Private key file {} holds {len} bytes, expected {width}",
                    self.path.display()
                )));
            }
        };
        let key = PrivateKey::from_be_bytes(digits, params)?;
        log::debug!("Loaded private key from {}", self.path.display());
        Ok(key)
    }
}

/// A passphrase-protected PKCS#12 file holding the certificate and its key.
#[derive(Clone)]
pub struct Pkcs12File {
    path: PathBuf,
    password: String,
}

impl fmt::Debug for Pkcs12File {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Pkcs12File")
            .field("path", &self.path)
            .finish_non_exhaustive()
    }
}

impl Pkcs12File {
    pub fn new<P: AsRef<Path>>(path: P, password: impl Into<String>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
            password: password.into(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read_pfx(&self) -> Result<p12::PFX> {
        let bytes = fs::read(&self.path)?;
        let pfx = p12::PFX::parse(&bytes)
            .map_err(|e| GostCertError::ContainerError(format!("{e:?}")))?;
        if !pfx.verify_mac(&self.password) {
            return Err(GostCertError::ContainerError(format!(
                "MAC check failed for {}: wrong password or corrupted file",
                self.path.display()
            )));
        }
        Ok(pfx)
    }

    /// Reads the private key stored next to the certificate.
    pub fn load_private_key(&self) -> Result<PrivateKey> {
        let pfx = self.read_pfx()?;
        let keys = pfx
            .key_bags(&self.password)
            .map_err(|e| GostCertError::ContainerError(format!("{e:?}")))?;
        let key = keys.first().ok_or_else(|| {
            GostCertError::ContainerError("Container holds no private key".to_string())
        })?;
        PrivateKey::from_pkcs8_der(key)
    }
}

impl CertificateStore for Pkcs12File {
    fn store_certificate(&self, certificate: &Certificate, key: &PrivateKey) -> Result<()> {
        let cert_der = certificate.to_der()?;
        let key_der = key.to_pkcs8_der()?;
        let pfx = p12::PFX::new(
            &cert_der,
            &key_der,
            None,
            &self.password,
            PKCS12_FRIENDLY_NAME,
        )
        .ok_or_else(|| {
            GostCertError::ContainerError("Failed to build PKCS#12 container".to_string())
        })?;
        fs::write(&self.path, pfx.to_der())?;
        log::info!("Wrote PKCS#12 container to {}", self.path.display());
        Ok(())
    }

    fn load_certificate(&self) -> Result<Certificate> {
        let pfx = self.read_pfx()?;
        let certs = pfx
            .cert_x509_bags(&self.password)
            .map_err(|e| GostCertError::ContainerError(format!("{e:?}")))?;
        let cert = certs.first().ok_or_else(|| {
            GostCertError::ContainerError("Container holds no certificate".to_string())
        })?;
        log::debug!("Loaded certificate from {}", self.path.display());
        Certificate::from_der(cert)
    }
}
