//! Issuance configuration.
//!
//! Every constant of the pipeline lives here and is passed explicitly to the
//! workflow. Defaults issue for a sample subject under CryptoPro-B.

use std::fs;
use std::path::{Path, PathBuf};

use const_oid::ObjectIdentifier;
use serde::{Deserialize, Serialize};

use crate::cert::AlgorithmSuite;
use crate::cert::extensions::PrivateExtensionValues;
use crate::cert::params::{AttributeKey, SubjectFields, SubjectIdentity};
use crate::error::{GostCertError, Result};
use crate::issuer::{DEFAULT_SERIAL_UPPER_BOUND, IssuerName};

/// All settings of one issuance cycle.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct IssuanceConfig {
    /// Signature algorithm name or OID
    pub signature_algorithm: String,

    /// Key algorithm name or OID
    pub key_algorithm: String,

    /// Domain parameter set name or OID
    pub public_key_param_set: String,

    /// Passphrase of the PKCS#12 container
    pub password: String,

    /// Certificate number, written to its private extension and used as the
    /// subject serial number unless one is configured
    pub certificate_number: u64,

    pub bicrypt_identifier: String,

    pub parent_authority: String,

    /// Validity in whole years from today's UTC midnight
    pub validity_years: u16,

    /// Exclusive upper bound for random serial numbers
    pub serial_upper_bound: u64,

    /// Issuer common name. When unset the issuer name equals the subject.
    pub issuer_common_name: Option<String>,

    /// Where the artifacts are written
    pub output: OutputPaths,

    /// Subject attributes
    pub subject: SubjectConfig,
}

/// File locations of the persisted artifacts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputPaths {
    pub directory: PathBuf,
    pub certificate_container: String,
    pub private_key: String,
    pub cms_text: String,
}

/// Subject attributes as configured. Unset attributes are omitted.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SubjectConfig {
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
    pub inn: Option<String>,
    pub snils: Option<String>,
    pub serial_number: Option<String>,

    /// Encoding order as attribute names or OIDs. Defaults to the canonical
    /// order restricted to the attributes present, custom ones last.
    pub order: Option<Vec<String>>,

    /// Additional attributes under arbitrary OIDs
    pub custom: Vec<CustomAttribute>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CustomAttribute {
    pub oid: String,
    pub value: String,
}

impl Default for IssuanceConfig {
    fn default() -> Self {
        Self {
            signature_algorithm: "GOST3411withECGOST3410".to_string(),
            key_algorithm: "ECGOST3410".to_string(),
            public_key_param_set: "GostR3410-2001-CryptoPro-B".to_string(),
            password: "password".to_string(),
            certificate_number: 1,
            bicrypt_identifier: "AXXXXX01sФамXXX".to_string(),
            parent_authority: "1.2.643.3.123.5.4".to_string(),
            validity_years: 2,
            serial_upper_bound: DEFAULT_SERIAL_UPPER_BOUND,
            issuer_common_name: None,
            output: OutputPaths::default(),
            subject: SubjectConfig::sample(),
        }
    }
}

impl Default for OutputPaths {
    fn default() -> Self {
        Self {
            directory: PathBuf::from("."),
            certificate_container: "certificate.pfx".to_string(),
            private_key: "private.key".to_string(),
            cms_text: "certificate.cms".to_string(),
        }
    }
}

impl OutputPaths {
    /// Places every artifact under `directory` with the default file names.
    pub fn in_directory<P: AsRef<Path>>(directory: P) -> Self {
        Self {
            directory: directory.as_ref().to_path_buf(),
            ..Self::default()
        }
    }

    pub fn certificate_container_path(&self) -> PathBuf {
        self.directory.join(&self.certificate_container)
    }

    pub fn private_key_path(&self) -> PathBuf {
        self.directory.join(&self.private_key)
    }

    pub fn cms_text_path(&self) -> PathBuf {
        self.directory.join(&self.cms_text)
    }
}

impl SubjectConfig {
    /// A placeholder subject: an employee of a Russian legal entity.
    pub fn sample() -> Self {
        Self {
            country: Some("RU".to_string()),
            organization: Some("ООО \"ПАРТНЕР-XXX\"".to_string()),
            locality: Some("Moscow".to_string()),
            state: Some("Moscow".to_string()),
            street: Some("TEST".to_string()),
            organizational_unit: Some("TEST".to_string()),
            common_name: Some("ФамXXX ИмяXXX ОтчXXX".to_string()),
            surname: Some("ФамXXX".to_string()),
            given_name: Some("ИмяXXX ОтчXXX".to_string()),
            email_address: Some("test@test.test".to_string()),
            title: Some("developer".to_string()),
            inn: Some("007705964240".to_string()),
            snils: Some("37709768946".to_string()),
            serial_number: None,
            order: None,
            custom: Vec::new(),
        }
    }
}

impl IssuanceConfig {
    /// Resolves the configured algorithm names into a checked suite.
    pub fn suite(&self) -> Result<AlgorithmSuite> {
        AlgorithmSuite::from_names(
            &self.signature_algorithm,
            &self.key_algorithm,
            &self.public_key_param_set,
        )
    }

    /// Builds the subject name in the configured order.
    pub fn subject_identity(&self) -> Result<SubjectIdentity> {
        let subject = &self.subject;
        let fields = SubjectFields::builder()
            .maybe_country(subject.country.clone())
            .maybe_organization(subject.organization.clone())
            .maybe_locality(subject.locality.clone())
            .maybe_state(subject.state.clone())
            .maybe_street(subject.street.clone())
            .maybe_organizational_unit(subject.organizational_unit.clone())
            .maybe_common_name(subject.common_name.clone())
            .maybe_surname(subject.surname.clone())
            .maybe_given_name(subject.given_name.clone())
            .maybe_email_address(subject.email_address.clone())
            .maybe_title(subject.title.clone())
            .serial_number(
                subject
                    .serial_number
                    .clone()
                    .unwrap_or_else(|| self.certificate_number.to_string()),
            )
            .build();

        let mut custom: Vec<(ObjectIdentifier, String)> = Vec::new();
        if let Some(inn) = &subject.inn {
            custom.push((AttributeKey::INN.oid(), inn.clone()));
        }
        if let Some(snils) = &subject.snils {
            custom.push((AttributeKey::SNILS.oid(), snils.clone()));
        }
        for attribute in &subject.custom {
            let oid = ObjectIdentifier::new(&attribute.oid).map_err(|e| {
                GostCertError::InvalidInput(format!(
                    "Invalid custom attribute OID '{}': {e}",
                    attribute.oid
                ))
            })?;
            custom.push((oid, attribute.value.clone()));
        }

        let order = match &subject.order {
            Some(names) => names
                .iter()
                .map(|name| name.parse::<AttributeKey>())
                .collect::<Result<Vec<_>>>()?,
            None => default_order(&fields, &custom),
        };

        SubjectIdentity::build(&fields, &custom, &order)
    }

    pub fn extension_values(&self) -> PrivateExtensionValues {
        PrivateExtensionValues {
            certificate_number: self.certificate_number.to_string(),
            bicrypt_identifier: self.bicrypt_identifier.clone(),
            parent_authority: self.parent_authority.clone(),
        }
    }

    pub fn issuer_name(&self) -> IssuerName {
        match &self.issuer_common_name {
            Some(cn) => IssuerName::Explicit(SubjectIdentity::common_name(cn.clone())),
            None => IssuerName::SameAsSubject,
        }
    }

    /// Checks every setting that can be checked without touching the disk.
    pub fn validate(&self) -> Result<()> {
        self.suite()?;
        if self.validity_years == 0 {
            return Err(GostCertError::ConfigurationError(
                "Validity must be at least one year".to_string(),
            ));
        }
        if self.serial_upper_bound <= 1 {
            return Err(GostCertError::ConfigurationError(
                "Serial number upper bound must be greater than 1".to_string(),
            ));
        }
        if self.password.is_empty() {
            return Err(GostCertError::ConfigurationError(
                "Container password must not be empty".to_string(),
            ));
        }
        self.subject_identity()?;
        Ok(())
    }
}

/// Canonical order over the supplied keys, then custom keys in supply order.
fn default_order(fields: &SubjectFields, custom: &[(ObjectIdentifier, String)]) -> Vec<AttributeKey> {
    let mut present: Vec<AttributeKey> = fields.entries().into_iter().map(|(key, _)| key).collect();
    present.extend(custom.iter().map(|(oid, _)| AttributeKey::from_oid(*oid)));

    let mut order: Vec<AttributeKey> = AttributeKey::canonical_order()
        .into_iter()
        .filter(|key| present.contains(key))
        .collect();
    for key in present {
        if !order.contains(&key) {
            order.push(key);
        }
    }
    order
}

/// Configuration manager for handling config files
pub struct ConfigManager {
    config_path: PathBuf,
}

impl ConfigManager {
    pub const DEFAULT_FILE_NAME: &'static str = "gostcert.toml";

    /// Create a configuration manager with custom path
    pub fn with_path<P: AsRef<Path>>(path: P) -> Self {
        Self {
            config_path: path.as_ref().to_path_buf(),
        }
    }

    #[must_use]
    pub fn config_path(&self) -> &Path {
        &self.config_path
    }

    /// Load configuration from file, creating default if it doesn't exist
    pub fn load_or_create_default(&self) -> Result<IssuanceConfig> {
        if self.config_path.exists() {
            self.load()
        } else {
            log::info!(
                "Configuration file not found, creating default: {}",
                self.config_path.display()
            );
            let default_config = IssuanceConfig::default();
            self.save(&default_config)?;
            Ok(default_config)
        }
    }

    /// Load and validate configuration from file
    pub fn load(&self) -> Result<IssuanceConfig> {
        log::info!("Loading configuration from: {}", self.config_path.display());

        let content = fs::read_to_string(&self.config_path).map_err(|e| {
            GostCertError::ConfigurationError(format!(
                "Failed to read config file {}: {e}",
                self.config_path.display()
            ))
        })?;

        let config: IssuanceConfig = toml::from_str(&content).map_err(|e| {
            GostCertError::ConfigurationError(format!("Failed to parse config file: {e}"))
        })?;

        config.validate()?;
        Ok(config)
    }

    /// Save configuration to file
    pub fn save(&self, config: &IssuanceConfig) -> Result<()> {
        log::info!("Saving configuration to: {}", self.config_path.display());

        if let Some(parent) = self.config_path.parent() {
            fs::create_dir_all(parent).map_err(|e| {
                GostCertError::ConfigurationError(format!(
                    "Failed to create config directory {}: {e}",
                    parent.display()
                ))
            })?;
        }

        let content = toml::to_string_pretty(config).map_err(|e| {
            GostCertError::ConfigurationError(format!("Failed to serialize config: {e}"))
        })?;

        fs::write(&self.config_path, content).map_err(|e| {
            GostCertError::ConfigurationError(format!(
                "Failed to write config file {}: {e}",
                self.config_path.display()
            ))
        })?;
        Ok(())
    }
}
