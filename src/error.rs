//! use gostcert::error::GostCertError;

use thiserror::Error;

/// Represents errors that can occur in the gostcert library.
///
/// A signature that merely fails to verify is not an error: verification
/// returns `Ok(false)` and callers branch on it.
#[derive(Debug, Error, Clone)]
pub enum GostCertError {
    /// Error during data encoding.
    #[error("Failed to encode data: {0}")]
    EncodingError(String),

    /// Error during data decoding.
    #[error("Failed to decode data: {0}")]
    DecodingError(String),

    /// Malformed caller input, such as an attribute order that does not match
    /// the supplied attributes or an inverted validity window.
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Unrecognized algorithm or domain-parameter identifier, or an
    /// incompatible combination of them.
    #[error("Configuration error: {0}")]
    ConfigurationError(String),

    /// Error during key generation or key reconstruction.
    #[error("Key generation error: {0}")]
    KeyGenerationError(String),

    /// Error related to certificate operations.
    #[error("Certificate error: {0}")]
    CertificateError(String),

    /// Error while producing a signature.
    #[error("Signature error: {0}")]
    SignatureError(String),

    /// Error from the PKCS#12 container.
    #[error("Container error: {0}")]
    ContainerError(String),

    /// Error reading or writing a persisted artifact.
    #[error("IO error: {0}")]
    IoError(String),

    /// The persisted private key does not correspond to the public key in the
    /// persisted certificate. Nothing signed with this pair can be trusted.
    #[error("Integrity failure: {0}")]
    IntegrityFailure(String),
}

/// Result alias used throughout the crate.
pub type Result<T> = std::result::Result<T, GostCertError>;

impl From<der::Error> for GostCertError {
    /// Converts a `der::Error` into a `GostCertError`.
    fn from(err: der::Error) -> Self {
        GostCertError::DecodingError(err.to_string())
    }
}

impl From<std::io::Error> for GostCertError {
    fn from(err: std::io::Error) -> Self {
        GostCertError::IoError(err.to_string())
    }
}
