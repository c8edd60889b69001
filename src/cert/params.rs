use std::collections::HashSet;
use std::fmt;
use std::str::FromStr;

use bon::Builder;
use const_oid::ObjectIdentifier;
use der::asn1::{
    GeneralizedTime, Ia5StringRef, PrintableStringRef, SetOfVec, UtcTime, Utf8StringRef,
};
use der::{Any, Encode, Tag, Tagged};
use time::{Date, OffsetDateTime};
use x509_cert::attr::AttributeTypeAndValue;
use x509_cert::name::{Name, RdnSequence, RelativeDistinguishedName};

use super::extensions::ToAndFromX509Extension;
use crate::error::{GostCertError, Result};
use crate::key::PublicKey;

/// ASN.1 string type used to encode an attribute value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StringKind {
    Printable,
    Ia5,
    /// Unicode-capable; used for anything that may hold localized text.
    Utf8,
}

/// Identifies one distinguished-name attribute.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum AttributeKey {
    Country,
    Organization,
    Locality,
    State,
    Street,
    OrganizationalUnit,
    CommonName,
    Surname,
    GivenName,
    EmailAddress,
    Title,
    SerialNumber,
    /// Any attribute outside the well-known set, such as a national identifier.
    Custom(ObjectIdentifier),
}

impl AttributeKey {
    /// Russian taxpayer number (INN).
    pub const INN: AttributeKey =
        AttributeKey::Custom(ObjectIdentifier::new_unwrap("1.2.643.3.131.1.1"));

    /// Russian insurance account number (SNILS).
    pub const SNILS: AttributeKey =
        AttributeKey::Custom(ObjectIdentifier::new_unwrap("1.2.643.100.3"));

    const WELL_KNOWN: [AttributeKey; 12] = [
        AttributeKey::Country,
        AttributeKey::Organization,
        AttributeKey::Locality,
        AttributeKey::State,
        AttributeKey::Street,
        AttributeKey::OrganizationalUnit,
        AttributeKey::CommonName,
        AttributeKey::Surname,
        AttributeKey::GivenName,
        AttributeKey::EmailAddress,
        AttributeKey::Title,
        AttributeKey::SerialNumber,
    ];

    pub fn oid(&self) -> ObjectIdentifier {
        match self {
            AttributeKey::Country => ObjectIdentifier::new_unwrap("2.5.4.6"),
            AttributeKey::Organization => ObjectIdentifier::new_unwrap("2.5.4.10"),
            AttributeKey::Locality => ObjectIdentifier::new_unwrap("2.5.4.7"),
            AttributeKey::State => ObjectIdentifier::new_unwrap("2.5.4.8"),
            AttributeKey::Street => ObjectIdentifier::new_unwrap("2.5.4.9"),
            AttributeKey::OrganizationalUnit => ObjectIdentifier::new_unwrap("2.5.4.11"),
            AttributeKey::CommonName => ObjectIdentifier::new_unwrap("2.5.4.3"),
            AttributeKey::Surname => ObjectIdentifier::new_unwrap("2.5.4.4"),
            AttributeKey::GivenName => ObjectIdentifier::new_unwrap("2.5.4.42"),
            AttributeKey::EmailAddress => ObjectIdentifier::new_unwrap("1.2.840.113549.1.9.1"),
            AttributeKey::Title => ObjectIdentifier::new_unwrap("2.5.4.12"),
            AttributeKey::SerialNumber => ObjectIdentifier::new_unwrap("2.5.4.5"),
            AttributeKey::Custom(oid) => *oid,
        }
    }

    /// Maps an OID to its well-known key, or to `Custom`.
    pub fn from_oid(oid: ObjectIdentifier) -> Self {
        Self::WELL_KNOWN
            .into_iter()
            .find(|key| key.oid() == oid)
            .unwrap_or(AttributeKey::Custom(oid))
    }

    pub fn string_kind(&self) -> StringKind {
        match self {
            AttributeKey::Country | AttributeKey::SerialNumber => StringKind::Printable,
            AttributeKey::EmailAddress => StringKind::Ia5,
            _ => StringKind::Utf8,
        }
    }

    /// Canonical encoding order of the known attributes.
    pub fn canonical_order() -> Vec<AttributeKey> {
        vec![
            AttributeKey::Country,
            AttributeKey::Organization,
            AttributeKey::Locality,
            AttributeKey::State,
            AttributeKey::Street,
            AttributeKey::OrganizationalUnit,
            AttributeKey::CommonName,
            AttributeKey::Surname,
            AttributeKey::GivenName,
            AttributeKey::EmailAddress,
            AttributeKey::Title,
            AttributeKey::INN,
            AttributeKey::SNILS,
            AttributeKey::SerialNumber,
        ]
    }
}

impl fmt::Display for AttributeKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AttributeKey::Country => f.write_str("C"),
            AttributeKey::Organization => f.write_str("O"),
            AttributeKey::Locality => f.write_str("L"),
            AttributeKey::State => f.write_str("ST"),
            AttributeKey::Street => f.write_str("STREET"),
            AttributeKey::OrganizationalUnit => f.write_str("OU"),
            AttributeKey::CommonName => f.write_str("CN"),
            AttributeKey::Surname => f.write_str("SURNAME"),
            AttributeKey::GivenName => f.write_str("GIVENNAME"),
            AttributeKey::EmailAddress => f.write_str("E"),
            AttributeKey::Title => f.write_str("T"),
            AttributeKey::SerialNumber => f.write_str("SERIALNUMBER"),
            key if *key == AttributeKey::INN => f.write_str("INN"),
            key if *key == AttributeKey::SNILS => f.write_str("SNILS"),
            AttributeKey::Custom(oid) => write!(f, "{oid}"),
        }
    }
}

impl FromStr for AttributeKey {
    type Err = GostCertError;

    /// Accepts short names (`C`, `CN`, `INN`, ...) or a dotted OID.
    fn from_str(s: &str) -> Result<Self> {
        let key = match s.trim().to_ascii_uppercase().as_str() {
            "C" | "COUNTRY" => AttributeKey::Country,
            "O" | "ORGANIZATION" => AttributeKey::Organization,
            "L" | "LOCALITY" => AttributeKey::Locality,
            "ST" | "STATE" => AttributeKey::State,
            "STREET" => AttributeKey::Street,
            "OU" => AttributeKey::OrganizationalUnit,
            "CN" => AttributeKey::CommonName,
            "SURNAME" => AttributeKey::Surname,
            "GIVENNAME" | "GN" => AttributeKey::GivenName,
            "E" | "EMAIL" | "EMAILADDRESS" => AttributeKey::EmailAddress,
            "T" | "TITLE" => AttributeKey::Title,
            "SERIALNUMBER" => AttributeKey::SerialNumber,
            "INN" => AttributeKey::INN,
            "SNILS" => AttributeKey::SNILS,
            other => {
                let oid = ObjectIdentifier::new(other).map_err(|_| {
                    GostCertError::InvalidInput(format!("Unknown attribute key '{s}'"))
                })?;
                AttributeKey::from_oid(oid)
            }
        };
        Ok(key)
    }
}

/// The well-known subject fields. Unset fields are left out of the name.
#[derive(Clone, Debug, Builder, Default, PartialEq, Eq)]
pub struct SubjectFields {
    pub country: Option<String>,
    pub organization: Option<String>,
    pub locality: Option<String>,
    pub state: Option<String>,
    pub street: Option<String>,
    pub organizational_unit: Option<String>,
    pub common_name: Option<String>,
    pub surname: Option<String>,
    pub given_name: Option<String>,
    pub email_address: Option<String>,
    pub title: Option<String>,
    /// Serial or version marker; treated as an ordinary attribute.
    pub serial_number: Option<String>,
}

impl SubjectFields {
    /// The set fields as `(key, value)` pairs.
    pub fn entries(&self) -> Vec<(AttributeKey, String)> {
        [
            (AttributeKey::Country, &self.country),
            (AttributeKey::Organization, &self.organization),
            (AttributeKey::Locality, &self.locality),
            (AttributeKey::State, &self.state),
            (AttributeKey::Street, &self.street),
            (AttributeKey::OrganizationalUnit, &self.organizational_unit),
            (AttributeKey::CommonName, &self.common_name),
            (AttributeKey::Surname, &self.surname),
            (AttributeKey::GivenName, &self.given_name),
            (AttributeKey::EmailAddress, &self.email_address),
            (AttributeKey::Title, &self.title),
            (AttributeKey::SerialNumber, &self.serial_number),
        ]
        .into_iter()
        .filter_map(|(key, value)| value.clone().map(|value| (key, value)))
        .collect()
    }
}

/// An ordered distinguished name. Encoding follows insertion order exactly,
/// one attribute per RDN.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct SubjectIdentity {
    attributes: Vec<(AttributeKey, String)>,
}

impl SubjectIdentity {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends an attribute after the ones already present.
    pub fn with(mut self, key: AttributeKey, value: impl Into<String>) -> Self {
        self.attributes.push((key, value.into()));
        self
    }

    /// A name holding only a common name.
    pub fn common_name(value: impl Into<String>) -> Self {
        Self::new().with(AttributeKey::CommonName, value)
    }

    /// Builds a name from fields and custom attributes laid out in `order`.
    ///
    /// `order` must name every supplied attribute exactly once and nothing
    /// else.
    pub fn build(
        fields: &SubjectFields,
        custom: &[(ObjectIdentifier, String)],
        order: &[AttributeKey],
    ) -> Result<Self> {
        let mut supplied = fields.entries();
        supplied.extend(
            custom
                .iter()
                .map(|(oid, value)| (AttributeKey::from_oid(*oid), value.clone())),
        );

        let mut seen = HashSet::new();
        for (key, _) in &supplied {
            if !seen.insert(key.clone()) {
                return Err(GostCertError::InvalidInput(format!(
                    "Attribute {key} was supplied more than once"
                )));
            }
        }

        let mut ordered = HashSet::new();
        for key in order {
            if !ordered.insert(key.clone()) {
                return Err(GostCertError::InvalidInput(format!(
                    "Attribute {key} appears more than once in the order"
                )));
            }
            if !seen.contains(key) {
                return Err(GostCertError::InvalidInput(format!(
                    "Attribute {key} is in the order but has no value"
                )));
            }
        }
        if let Some((key, _)) = supplied.iter().find(|(key, _)| !ordered.contains(key)) {
            return Err(GostCertError::InvalidInput(format!(
                "Attribute {key} has a value but is missing from the order"
            )));
        }

        let attributes = order
            .iter()
            .filter_map(|key| supplied.iter().find(|(k, _)| k == key).cloned())
            .collect();
        Ok(Self { attributes })
    }

    pub fn attributes(&self) -> &[(AttributeKey, String)] {
        &self.attributes
    }

    /// The first value stored under `key`.
    pub fn get(&self, key: &AttributeKey) -> Option<&str> {
        self.attributes
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, value)| value.as_str())
    }

    /// Converts the identity to an X.509 `Name`.
    pub fn as_x509_name(&self) -> Result<Name> {
        let rdns = self
            .attributes
            .iter()
            .map(|(key, value)| {
                let encoded = encode_value(key, value)?;
                let atv = AttributeTypeAndValue {
                    oid: key.oid(),
                    value: encoded,
                };
                let set = SetOfVec::try_from(vec![atv])
                    .map_err(|e| GostCertError::EncodingError(e.to_string()))?;
                Ok(RelativeDistinguishedName(set))
            })
            .collect::<Result<Vec<_>>>()?;
        Ok(RdnSequence(rdns))
    }

    /// DER encoding of the name.
    pub fn to_der(&self) -> Result<Vec<u8>> {
        self.as_x509_name()?
            .to_der()
            .map_err(|e| GostCertError::EncodingError(e.to_string()))
    }

    /// Reads a `Name` back, keeping its order. Unknown OIDs become custom keys.
    pub fn from_x509_name(name: &Name) -> Result<Self> {
        let mut attributes = Vec::new();
        for rdn in name.0.iter() {
            for atv in rdn.0.iter() {
                let value = match atv.value.tag() {
                    Tag::Utf8String | Tag::PrintableString | Tag::Ia5String => {
                        std::str::from_utf8(atv.value.value())
                            .map_err(|e| GostCertError::DecodingError(e.to_string()))?
                    }
                    tag => {
                        return Err(GostCertError::DecodingError(format!(
                            "Attribute {} has unsupported value type {tag}",
                            atv.oid
                        )));
                    }
                };
                attributes.push((AttributeKey::from_oid(atv.oid), value.to_string()));
            }
        }
        Ok(Self { attributes })
    }
}

impl fmt::Display for SubjectIdentity {
    /// `C=RU, O=Test Org, CN=Test Person`, in encoding order.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, (key, value)) in self.attributes.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{key}={value}")?;
        }
        Ok(())
    }
}

fn encode_value(key: &AttributeKey, value: &str) -> Result<Any> {
    let invalid = |e: der::Error| {
        GostCertError::InvalidInput(format!("Attribute {key} cannot hold '{value}': {e}"))
    };
    match key.string_kind() {
        StringKind::Printable => Any::encode_from(&PrintableStringRef::new(value).map_err(invalid)?),
        StringKind::Ia5 => Any::encode_from(&Ia5StringRef::new(value).map_err(invalid)?),
        StringKind::Utf8 => Any::encode_from(&Utf8StringRef::new(value).map_err(invalid)?),
    }
    .map_err(|e| GostCertError::EncodingError(e.to_string()))
}

/// Certificate validity period.
///
/// # Fields
/// * `not_before` - The start of the validity period.
/// * `not_after` - The end of the validity period.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Validity {
    pub not_before: OffsetDateTime,
    pub not_after: OffsetDateTime,
}

impl Validity {
    /// Creates a validity window, rejecting `not_after <= not_before`.
    pub fn new(not_before: OffsetDateTime, not_after: OffsetDateTime) -> Result<Self> {
        let validity = Self {
            not_before,
            not_after,
        };
        validity.check()?;
        Ok(validity)
    }

    /// Creates a validity period starting now for the given number of days.
    pub fn for_days(days: i64) -> Result<Self> {
        let now = OffsetDateTime::now_utc();
        Self::new(now, now + time::Duration::days(days))
    }

    /// From today's UTC midnight to the same calendar date `years` later.
    pub fn for_years_from_today(years: u16) -> Result<Self> {
        let today = OffsetDateTime::now_utc().date();
        let end = add_years(today, years)?;
        Self::new(
            today.midnight().assume_utc(),
            end.midnight().assume_utc(),
        )
    }

    /// Fails when the window is empty or inverted once both ends are cut to
    /// whole seconds, the precision the certificate encodes.
    pub fn check(&self) -> Result<()> {
        if self.not_after.unix_timestamp() <= self.not_before.unix_timestamp() {
            return Err(GostCertError::InvalidInput(format!(
                "Validity notAfter ({}) must be later than notBefore ({})",
                self.not_after, self.not_before
            )));
        }
        Ok(())
    }

    /// Converts to the X.509 form; UTCTime before 2050, GeneralizedTime after.
    pub fn to_x509(&self) -> Result<x509_cert::time::Validity> {
        self.check()?;
        Ok(x509_cert::time::Validity {
            not_before: to_x509_time(self.not_before)?,
            not_after: to_x509_time(self.not_after)?,
        })
    }
}

fn add_years(date: Date, years: u16) -> Result<Date> {
    let target = date.year() + i32::from(years);
    date.replace_year(target)
        .or_else(|_| Date::from_calendar_date(target, date.month(), 28))
        .map_err(|e| GostCertError::InvalidInput(format!("Cannot add {years} years: {e}")))
}

fn to_x509_time(at: OffsetDateTime) -> Result<x509_cert::time::Time> {
    let secs = u64::try_from(at.unix_timestamp()).map_err(|_| {
        GostCertError::InvalidInput(format!("Validity time {at} is before 1970"))
    })?;
    let since_epoch = std::time::Duration::from_secs(secs);
    let time = if at.year() < 2050 {
        x509_cert::time::Time::UtcTime(UtcTime::from_unix_duration(since_epoch)?)
    } else {
        x509_cert::time::Time::GeneralTime(GeneralizedTime::from_unix_duration(since_epoch)?)
    };
    Ok(time)
}

/// Represents an X.509 extension.
///
/// # Fields
/// * `oid` - The object identifier of the extension.
/// * `critical` - Indicates if the extension is critical.
/// * `value` - The DER-encoded value of the extension.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ExtensionParam {
    pub oid: ObjectIdentifier,
    pub critical: bool,
    /// DER-encoded extension value
    pub value: Vec<u8>,
}

impl ExtensionParam {
    /// Creates an `ExtensionParam` from a specific extension.
    pub fn from_extension<E: ToAndFromX509Extension>(extension: &E, critical: bool) -> Result<Self> {
        Ok(Self {
            oid: E::OID,
            critical,
            value: extension.to_x509_extension_value()?,
        })
    }

    /// Decodes an `ExtensionParam` into a specific extension.
    pub fn to_extension<E: ToAndFromX509Extension>(&self) -> Result<E> {
        if self.oid != E::OID {
            return Err(GostCertError::InvalidInput(format!(
                "Extension {} is not {}",
                self.oid,
                E::OID
            )));
        }
        E::from_x509_extension_value(&self.value)
    }
}

impl From<&x509_cert::ext::Extension> for ExtensionParam {
    fn from(ext: &x509_cert::ext::Extension) -> Self {
        Self {
            oid: ext.extn_id,
            critical: ext.critical,
            value: ext.extn_value.as_bytes().to_vec(),
        }
    }
}

/// Everything the issuer needs about the certificate being requested.
#[derive(Clone, Debug, Builder)]
pub struct CertificationRequestInfo {
    pub serial_number: u64,
    pub subject: SubjectIdentity,
    pub subject_public_key: PublicKey,
    pub validity: Validity,
    #[builder(default)]
    pub extensions: Vec<ExtensionParam>,
}
