//! Text armor for certificates: the single-line CMS artifact handed to
//! counterparties, plus PEM.

use std::fs;
use std::path::Path;

use base64::{Engine as _, engine::general_purpose};

use crate::cert::Certificate;
use crate::error::{GostCertError, Result};

pub const CMS_BEGIN: &str = "-----BEGIN CMS-----";
pub const CMS_END: &str = "-----END CMS-----";

/// Wraps the certificate DER between the CMS markers. Standard Base64 with
/// padding, no line breaks and no trailing newline.
pub fn to_cms_text(certificate: &Certificate) -> Result<String> {
    let der = certificate.to_der()?;
    Ok(format!(
        "{CMS_BEGIN}{}{CMS_END}",
        general_purpose::STANDARD.encode(der)
    ))
}

/// Parses text produced by [`to_cms_text`]. Surrounding whitespace and line
/// breaks inside the Base64 body are tolerated.
pub fn from_cms_text(text: &str) -> Result<Certificate> {
    let body = text
        .trim()
        .strip_prefix(CMS_BEGIN)
        .and_then(|rest| rest.strip_suffix(CMS_END))
        .ok_or_else(|| GostCertError::DecodingError("Missing CMS markers".to_string()))?;
    let compact: String = body.chars().filter(|c| !c.is_whitespace()).collect();
    let der = general_purpose::STANDARD
        .decode(compact)
        .map_err(|e| GostCertError::DecodingError(e.to_string()))?;
    Certificate::from_der(&der)
}

/// Convert DER-encoded data into a PEM-encoded string with the provided label.
pub fn der_to_pem(der: &[u8], label: &str) -> String {
    let pem = pem::Pem::new(label, der);
    pem::encode_config(&pem, pem::EncodeConfig::new())
}

/// Convert a PEM-encoded string to DER-encoded bytes.
pub fn pem_to_der(pem_str: &str) -> Result<Vec<u8>> {
    let pem = pem::parse(pem_str).map_err(|e| GostCertError::DecodingError(e.to_string()))?;
    Ok(pem.contents().to_vec())
}

/// Reads a certificate in any of the forms this crate writes: CMS text, PEM
/// or raw DER.
pub fn decode_certificate(bytes: &[u8]) -> Result<Certificate> {
    if let Ok(text) = std::str::from_utf8(bytes) {
        let trimmed = text.trim();
        if trimmed.starts_with(CMS_BEGIN) {
            return from_cms_text(trimmed);
        }
        if trimmed.starts_with("-----BEGIN ") {
            return Certificate::from_der(&pem_to_der(trimmed)?);
        }
    }
    Certificate::from_der(bytes)
}

pub fn write_cms_file(path: &Path, certificate: &Certificate) -> Result<()> {
    fs::write(path, to_cms_text(certificate)?)?;
    log::info!("Wrote CMS certificate text to {}", path.display());
    Ok(())
}

pub fn read_cms_file(path: &Path) -> Result<Certificate> {
    from_cms_text(&fs::read_to_string(path)?)
}
