use der::Encode;
use der::asn1::OctetString;
use x509_cert::Version;
use x509_cert::certificate::TbsCertificateInner;
use x509_cert::serial_number::SerialNumber;

use crate::cert::SignatureAlgorithm;
use crate::cert::params::{ExtensionParam, SubjectIdentity, Validity};
use crate::error::{GostCertError, Result};
use crate::key::PublicKey;

/// Represents the "To Be Signed" (TBS) portion of an X.509 certificate.
///
/// # Fields
/// * `serial_number` - The unique identifier for the certificate.
/// * `signature_algorithm` - The algorithm used to sign the certificate.
/// * `issuer` - The distinguished name of the certificate issuer.
/// * `validity` - The validity window.
/// * `subject` - The distinguished name of the certificate subject.
/// * `subject_public_key` - The public key of the certificate subject.
/// * `extensions` - X.509 extensions, encoded in this order.
#[derive(Clone, Debug)]
pub struct TbsCertificate {
    pub serial_number: u64,
    pub signature_algorithm: SignatureAlgorithm,
    pub issuer: SubjectIdentity,
    pub validity: Validity,
    pub subject: SubjectIdentity,
    pub subject_public_key: PublicKey,
    pub extensions: Vec<ExtensionParam>,
}

impl TbsCertificate {
    /// Converts the `TbsCertificate` into a `TbsCertificateInner` for DER encoding.
    pub fn to_tbs_certificate_inner(&self) -> Result<TbsCertificateInner> {
        if self.serial_number == 0 {
            return Err(GostCertError::InvalidInput(
                "Serial number must be positive".to_string(),
            ));
        }

        let extensions = self
            .extensions
            .iter()
            .map(|ext| {
                Ok(x509_cert::ext::Extension {
                    extn_id: ext.oid,
                    critical: ext.critical,
                    extn_value: OctetString::new(ext.value.clone())
                        .map_err(|e| GostCertError::EncodingError(e.to_string()))?,
                })
            })
            .collect::<Result<Vec<_>>>()?;

        let be = self.serial_number.to_be_bytes();
        let first = be.iter().position(|b| *b != 0).unwrap_or(be.len() - 1);
        let serial_number = SerialNumber::new(&be[first..])
            .map_err(|e| GostCertError::EncodingError(e.to_string()))?;

        Ok(TbsCertificateInner {
            version: Version::V3,
            serial_number,
            signature: self.signature_algorithm.into(),
            issuer: self.issuer.as_x509_name()?,
            validity: self.validity.to_x509()?,
            subject: self.subject.as_x509_name()?,
            subject_public_key_info: self.subject_public_key.as_spki()?,
            issuer_unique_id: None,
            subject_unique_id: None,
            extensions: Some(extensions),
        })
    }

    /// Encodes the `TbsCertificate` into DER format: the exact bytes that get signed.
    pub fn to_der(&self) -> Result<Vec<u8>> {
        self.to_tbs_certificate_inner()?
            .to_der()
            .map_err(|e| GostCertError::EncodingError(e.to_string()))
    }
}
