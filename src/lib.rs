//! # gostcert - Self-Signed GOST Certificates on the RustCrypto Stack
//!
//! gostcert issues self-signed X.509v3 certificates for GOST R 34.10-2001 keys
//! and produces detached `GOST3411withECGOST3410` signatures with the issued
//! key. The X.509 structures come from `x509-cert`/`der`; the curve arithmetic
//! and the signature scheme are implemented here.
//!
//! ## Supported Domain Parameters
//!
//! - **CryptoPro-A, -B, -C**: the CryptoPro signature parameter sets (B is the default)
//! - **CryptoPro-XchA, -XchB**: the exchange sets, sharing the curves of A and C
//! - **Test**: the worked-example curve of GOST R 34.10-2001
//!
//! ## Artifacts
//!
//! - **PKCS#12**: certificate and key in a passphrase-protected container
//! - **Raw key file**: the private scalar, 32 bytes big-endian, unencrypted
//! - **CMS text**: `-----BEGIN CMS-----` + Base64 DER + `-----END CMS-----` on one line
//! - **DER / PEM**: plain certificate encodings
//!
//! ## Quick Start
//!
//! ### Issuing a Certificate and Signing
//!
//! ```rust
//! use gostcert::{
//!     cert::{
//!         AlgorithmSuite,
//!         extensions::{PrivateExtensionValues, build_extension_set},
//!         params::{AttributeKey, CertificationRequestInfo, SubjectIdentity, Validity},
//!     },
//!     issuer::{Issuer, SelfIssuer},
//!     key::KeyPair,
//!     pki,
//! };
//!
//! # fn main() -> Result<(), gostcert::error::GostCertError> {
//! let suite = AlgorithmSuite::default();
//! let key_pair = KeyPair::generate(suite.params());
//!
//! let subject = SubjectIdentity::new()
//!     .with(AttributeKey::Country, "RU")
//!     .with(AttributeKey::Organization, "Test Org")
//!     .with(AttributeKey::CommonName, "Test Person");
//!
//! let request = CertificationRequestInfo::builder()
//!     .serial_number(1)
//!     .subject(subject)
//!     .subject_public_key(key_pair.public_key().clone())
//!     .validity(Validity::for_years_from_today(2)?)
//!     .extensions(build_extension_set(
//!         key_pair.public_key(),
//!         &PrivateExtensionValues::default(),
//!     )?)
//!     .build();
//!
//! let certificate = SelfIssuer::new(&key_pair, suite).issue(&request)?;
//!
//! let message = b"Mary have nuclear bomb";
//! let signature = pki::sign(message, key_pair.private_key(), &suite)?;
//! assert_eq!(signature.len(), 64);
//! assert!(pki::verify(message, &signature, &certificate.public_key()?, &suite)?);
//! # Ok(())
//! # }
//! ```
//!
//! ### Running the Whole Cycle from a Configuration
//!
//! ```rust,no_run
//! use gostcert::{config::IssuanceConfig, workflow};
//!
//! # fn main() -> Result<(), gostcert::error::GostCertError> {
//! let config = IssuanceConfig::default();
//! let issued = workflow::issue(&config)?;
//! workflow::persist(&config, &issued)?;
//!
//! // Fails with `IntegrityFailure` if the key on disk does not match the certificate.
//! let signature = workflow::sign_persisted(&config, b"Mary have nuclear bomb")?;
//! # Ok(())
//! # }
//! ```
//!
//! ## Error Handling
//!
//! A signature that does not verify is `Ok(false)`, never an error. Everything
//! else surfaces as a [`error::GostCertError`]:
//!
//! ```rust
//! use gostcert::{error::GostCertError, key::KeyPair};
//!
//! match KeyPair::generate_named("secp256r1") {
//!     Ok(_) => println!("Key generated"),
//!     Err(GostCertError::ConfigurationError(msg)) => println!("Unknown curve: {}", msg),
//!     Err(e) => println!("Other error: {}", e),
//! }
//! ```
//!
//! ## Module Organization
//!
//! - [`curve`]: Domain parameter sets and elliptic-curve arithmetic
//! - [`key`]: Key generation and key encodings
//! - [`cert`]: Algorithms, subject names, extensions and the certificate type
//! - [`issuer`]: Self-issuance and serial numbers
//! - [`pki`]: Signing and verification
//! - [`store`]: Key file and PKCS#12 persistence
//! - [`armor`]: CMS text and PEM
//! - [`config`]: Issuance configuration
//! - [`workflow`]: Issue, persist and sign end to end
//! - [`tbs_certificate`]: Low-level certificate structure

pub mod armor;
pub mod cert;
pub mod config;
pub mod curve;
pub mod error;
pub mod issuer;
pub mod key;
pub mod pki;
pub mod store;
pub mod tbs_certificate;
pub mod workflow;
