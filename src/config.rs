// src/config.rs

//! Worker configuration, loaded from a TOML file.

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::{Span, info, info_span, warn};

use crate::core::scanner::validator::{ContactPresence, OrganizationPolicy, PolicyRule, RequiredFields, Validator};
use crate::core::sink::PersistMode;
use crate::error::ConfigError;

/// Environment variable holding the configuration file path.
pub const CONFIG_ENV: &str = "SECURITYTXT_SCANNER_CONFIG";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub scanner: ScannerConfig,
    pub validation: ValidationConfig,
    pub persistence: PersistenceConfig,
    pub storage: StorageConfig,
    pub alerting: AlertingConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ScannerConfig {
    /// Scanner name, part of every alert identifier.
    pub name: String,
    /// Field written on the HTTP service record.
    pub field: String,
    /// Per-request timeout in seconds.
    pub request_timeout: u64,
    pub user_agent: String,
}

impl Default for ScannerConfig {
    fn default() -> Self {
        Self {
            name: "securitytxt".to_string(),
            field: "securitytxt".to_string(),
            request_timeout: 10,
            user_agent: format!("{}/{}", env!("CARGO_PKG_NAME"), env!("CARGO_PKG_VERSION")),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ValidationStrategy {
    ContactPresence,
    #[default]
    RequiredFields,
    OrganizationPolicy,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ValidationConfig {
    pub strategy: ValidationStrategy,
    /// Fields checked by the `required_fields` strategy.
    pub required_fields: Vec<String>,
    /// Ordered rules checked by the `organization_policy` strategy.
    pub rules: Vec<PolicyRule>,
}

impl Default for ValidationConfig {
    fn default() -> Self {
        Self {
            strategy: ValidationStrategy::default(),
            required_fields: vec!["Contact".to_string(), "Expires".to_string()],
            rules: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct PersistenceConfig {
    pub mode: PersistMode,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Base URL of the datalake API. Results stay in memory when unset.
    pub endpoint: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AlertingConfig {
    /// Tag identifying this pipeline in published alerts.
    pub source: String,
    pub channel_capacity: usize,
}

impl Default for AlertingConfig {
    fn default() -> Self {
        Self { source: "redscan".to_string(), channel_capacity: 64 }
    }
}

impl Config {
    /// Loads the configuration.
    ///
    /// # Arguments
    /// * `path` - File given on the command line, if any.
    ///
    /// # Returns
    /// The parsed configuration. A file named explicitly, by `path` or by
    /// `$SECURITYTXT_SCANNER_CONFIG`, must exist and parse. Only a missing file
    /// at the platform default location falls back to the defaults.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        if let Some(p) = path {
            return Self::read_file(p, true);
        }
        if let Ok(p) = std::env::var(CONFIG_ENV) {
            return Self::read_file(Path::new(&p), true);
        }
        match crate::logging::project_directory() {
            Some(dirs) => Self::read_file(&dirs.config_dir().join("config.toml"), false),
            None => {
                info!("No configuration directory available, using defaults.");
                Ok(Self::default())
            }
        }
    }

    fn read_file(config_path: &Path, required: bool) -> Result<Self, ConfigError> {
        if !required && !config_path.exists() {
            info!(path = %config_path.display(), "No configuration file found, using defaults.");
            return Ok(Self::default());
        }

        let contents = std::fs::read_to_string(config_path).map_err(|source| ConfigError::Read {
            path: config_path.display().to_string(),
            source,
        })?;
        let config = Self::from_toml_str(&contents)?;
        info!(path = %config_path.display(), "Loaded configuration.");
        Ok(config)
    }

    pub fn from_toml_str(contents: &str) -> Result<Self, ConfigError> {
        let config: Config = toml::from_str(contents)?;
        config.check()?;
        Ok(config)
    }

    fn check(&self) -> Result<(), ConfigError> {
        if self.scanner.request_timeout == 0 {
            return Err(invalid("scanner.request_timeout", "must be at least one second"));
        }
        if self.scanner.field.trim().is_empty() {
            return Err(invalid("scanner.field", "must not be empty"));
        }
        match self.validation.strategy {
            ValidationStrategy::OrganizationPolicy if self.validation.rules.is_empty() => {
                Err(invalid("validation.rules", "organization_policy needs at least one rule"))
            }
            ValidationStrategy::RequiredFields if self.validation.required_fields.is_empty() => {
                Err(invalid("validation.required_fields", "required_fields needs at least one field"))
            }
            _ => Ok(()),
        }
    }

    pub fn build_validator(&self) -> Arc<dyn Validator> {
        match self.validation.strategy {
            ValidationStrategy::ContactPresence => Arc::new(ContactPresence),
            ValidationStrategy::RequiredFields => {
                Arc::new(RequiredFields::new(self.validation.required_fields.clone()))
            }
            ValidationStrategy::OrganizationPolicy => {
                Arc::new(OrganizationPolicy::new(self.validation.rules.clone()))
            }
        }
    }
}

fn invalid(field: &str, reason: &str) -> ConfigError {
    ConfigError::Invalid { field: field.to_string(), reason: reason.to_string() }
}

/// Everything a scanner needs, resolved once at startup and handed to each component.
#[derive(Clone)]
pub struct ScannerContext {
    pub scanner_name: String,
    pub field: String,
    pub request_timeout: Duration,
    pub user_agent: String,
    pub validator: Arc<dyn Validator>,
    pub persist_mode: PersistMode,
    pub alert_source: String,
    /// Parent span of every scan run with this context.
    pub span: Span,
}

impl ScannerContext {
    pub fn from_config(config: &Config) -> Result<Self, ConfigError> {
        config.check()?;
        let validator = config.build_validator();
        if config.persistence.mode == PersistMode::RawText {
            warn!("Raw text persistence enabled: valid files are stored verbatim.");
        }
        Ok(Self {
            scanner_name: config.scanner.name.clone(),
            field: config.scanner.field.clone(),
            request_timeout: Duration::from_secs(config.scanner.request_timeout),
            user_agent: config.scanner.user_agent.clone(),
            span: info_span!("scanner", name = %config.scanner.name, validator = validator.name()),
            validator,
            persist_mode: config.persistence.mode,
            alert_source: config.alerting.source.clone(),
        })
    }
}
