//! Configuration for the file store service.
//!
//! Settings are read from an optional `config/filestore` file and then from
//! `FSM_`-prefixed environment variables, which take precedence. The flat
//! [`Settings`] bag is turned into a [`StorageConfig`] that carries exactly one
//! backend's parameters.

use config::{Environment, File};
use serde::Deserialize;
use std::collections::HashMap;
use std::time::Duration;
use thiserror::Error;

/// Default signed URL lifetime: 7 days.
pub const DEFAULT_URL_EXPIRATION_SECS: u64 = 604_800;

/// Default object key template.
pub const DEFAULT_FILE_FORMAT: &str = "{timestamp}-{filename}{ext}";

/// Errors raised while loading configuration or constructing a backend from it
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Missing required configuration: {0}")]
    MissingField(String),

    #[error("Invalid configuration value for {field}: {message}")]
    InvalidValue { field: String, message: String },

    #[error("Failed to create storage client: {0}")]
    Client(String),

    #[error("Failed to load configuration: {0}")]
    Load(#[from] config::ConfigError),
}

/// Raw key/value settings, one field per `FSM_*` variable.
///
/// Numeric and boolean backend keys stay as text here. They are parsed only
/// for the selected backend in [`StorageConfig::from_settings`], so a bad value
/// for an unused backend never fails the load.
#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    /// Backend discriminator (empty, s3, oss, cos, qiniu, github)
    #[serde(default = "default_storage_type")]
    pub storage_type: String,
    /// Object key template
    #[serde(default = "default_file_format")]
    pub file_format: String,
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub log_level: String,
    /// Log output format (pretty, json)
    #[serde(default = "default_log_format")]
    pub log_format: String,

    #[serde(default)]
    pub s3_bucket: String,
    #[serde(default)]
    pub s3_region: String,
    #[serde(default)]
    pub s3_endpoint: String,
    #[serde(default)]
    pub s3_access_key: String,
    #[serde(default)]
    pub s3_secret_key: String,
    #[serde(default)]
    pub s3_session: String,
    /// Force path-style access (MinIO and most self-hosted S3 services)
    #[serde(default)]
    pub s3_force_path_style: String,
    #[serde(default)]
    pub s3_url_expiration: String,

    #[serde(default)]
    pub oss_endpoint: String,
    #[serde(default)]
    pub oss_access_key: String,
    #[serde(default)]
    pub oss_secret_key: String,
    #[serde(default)]
    pub oss_bucket: String,
    #[serde(default)]
    pub oss_domain: String,
    #[serde(default)]
    pub oss_url_expiration: String,

    #[serde(default)]
    pub cos_bucket: String,
    #[serde(default)]
    pub cos_region: String,
    #[serde(default)]
    pub cos_app_id: String,
    #[serde(default)]
    pub cos_access_key: String,
    #[serde(default)]
    pub cos_secret_key: String,
    #[serde(default)]
    pub cos_domain: String,
    #[serde(default)]
    pub cos_use_https: String,
    #[serde(default)]
    pub cos_use_accelerate: String,
    #[serde(default)]
    pub cos_url_expiration: String,

    #[serde(default)]
    pub qiniu_access_key: String,
    #[serde(default)]
    pub qiniu_secret_key: String,
    #[serde(default)]
    pub qiniu_bucket: String,
    #[serde(default)]
    pub qiniu_domain: String,
    /// Storage region: z0 (East China), z1, z2, na0, as0
    #[serde(default = "default_qiniu_region")]
    pub qiniu_region: String,
    #[serde(default)]
    pub qiniu_url_expiration: String,

    #[serde(default)]
    pub github_token: String,
    #[serde(default)]
    pub github_owner: String,
    #[serde(default)]
    pub github_repo: String,
    #[serde(default = "default_github_branch")]
    pub github_branch: String,
    /// Directory inside the repository, e.g. "images/"
    #[serde(default)]
    pub github_path: String,
    #[serde(default)]
    pub github_domain: String,
}

// Default value functions
fn default_storage_type() -> String {
    "empty".to_string()
}

fn default_file_format() -> String {
    DEFAULT_FILE_FORMAT.to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "pretty".to_string()
}

fn default_qiniu_region() -> String {
    "z0".to_string()
}

fn default_github_branch() -> String {
    "main".to_string()
}

impl Settings {
    /// Load settings from the optional config file and the process environment.
    ///
    /// `FSM_S3_BUCKET` maps to `s3_bucket`. Empty variables are treated as unset.
    pub fn load() -> Result<Self, ConfigError> {
        let config = config::Config::builder()
            .add_source(File::with_name("config/filestore").required(false))
            .add_source(Environment::with_prefix("FSM").ignore_empty(true))
            .build()?;

        Ok(config.try_deserialize()?)
    }

    /// Build settings from an explicit variable map instead of the process environment.
    pub fn from_vars(vars: HashMap<String, String>) -> Result<Self, ConfigError> {
        let config = config::Config::builder()
            .add_source(
                Environment::with_prefix("FSM")
                    .ignore_empty(true)
                    .source(Some(vars)),
            )
            .build()?;

        Ok(config.try_deserialize()?)
    }
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            storage_type: default_storage_type(),
            file_format: default_file_format(),
            log_level: default_log_level(),
            log_format: default_log_format(),
            s3_bucket: String::new(),
            s3_region: String::new(),
            s3_endpoint: String::new(),
            s3_access_key: String::new(),
            s3_secret_key: String::new(),
            s3_session: String::new(),
            s3_force_path_style: String::new(),
            s3_url_expiration: String::new(),
            oss_endpoint: String::new(),
            oss_access_key: String::new(),
            oss_secret_key: String::new(),
            oss_bucket: String::new(),
            oss_domain: String::new(),
            oss_url_expiration: String::new(),
            cos_bucket: String::new(),
            cos_region: String::new(),
            cos_app_id: String::new(),
            cos_access_key: String::new(),
            cos_secret_key: String::new(),
            cos_domain: String::new(),
            cos_use_https: String::new(),
            cos_use_accelerate: String::new(),
            cos_url_expiration: String::new(),
            qiniu_access_key: String::new(),
            qiniu_secret_key: String::new(),
            qiniu_bucket: String::new(),
            qiniu_domain: String::new(),
            qiniu_region: default_qiniu_region(),
            qiniu_url_expiration: String::new(),
            github_token: String::new(),
            github_owner: String::new(),
            github_repo: String::new(),
            github_branch: default_github_branch(),
            github_path: String::new(),
            github_domain: String::new(),
        }
    }
}

/// Supported backend kinds
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorageKind {
    Empty,
    S3,
    Oss,
    Cos,
    Qiniu,
    GitHub,
}

impl StorageKind {
    /// Parse a discriminator. Case-insensitive; anything unrecognized is `Empty`.
    pub fn parse(value: &str) -> Self {
        match value.trim().to_lowercase().as_str() {
            "s3" => StorageKind::S3,
            "oss" => StorageKind::Oss,
            "cos" => StorageKind::Cos,
            "qiniu" => StorageKind::Qiniu,
            "github" => StorageKind::GitHub,
            _ => StorageKind::Empty,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            StorageKind::Empty => "empty",
            StorageKind::S3 => "s3",
            StorageKind::Oss => "oss",
            StorageKind::Cos => "cos",
            StorageKind::Qiniu => "qiniu",
            StorageKind::GitHub => "github",
        }
    }
}

/// S3-compatible storage parameters
#[derive(Debug, Clone, Default)]
pub struct S3Config {
    pub bucket: String,
    pub region: String,
    /// Custom endpoint URL (MinIO, R2, LocalStack, ...)
    pub endpoint: Option<String>,
    pub access_key: String,
    pub secret_key: String,
    pub session_token: Option<String>,
    pub force_path_style: bool,
    pub url_expiration_secs: i64,
}

/// Aliyun OSS parameters
#[derive(Debug, Clone, Default)]
pub struct OssConfig {
    pub endpoint: String,
    pub access_key: String,
    pub secret_key: String,
    pub bucket: String,
    /// Custom (CDN) domain serving the bucket root
    pub domain: Option<String>,
    pub url_expiration_secs: i64,
}

/// Tencent COS parameters
#[derive(Debug, Clone, Default)]
pub struct CosConfig {
    pub bucket: String,
    pub region: String,
    pub app_id: String,
    pub secret_id: String,
    pub secret_key: String,
    pub domain: Option<String>,
    pub use_https: bool,
    /// Use the global acceleration domain instead of the regional one
    pub use_accelerate: bool,
    pub url_expiration_secs: i64,
}

/// Qiniu Kodo parameters
#[derive(Debug, Clone, Default)]
pub struct QiniuConfig {
    pub access_key: String,
    pub secret_key: String,
    pub bucket: String,
    /// Required: Qiniu serves objects only through a bound domain
    pub domain: String,
    pub region: String,
    pub url_expiration_secs: i64,
}

/// GitHub-as-storage parameters
#[derive(Debug, Clone, Default)]
pub struct GitHubConfig {
    /// Personal access token
    pub token: String,
    pub owner: String,
    pub repo: String,
    pub branch: String,
    pub path: String,
    pub domain: Option<String>,
}

/// A backend setting whose text could not be parsed
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InvalidSetting {
    pub field: String,
    pub message: String,
}

impl From<InvalidSetting> for ConfigError {
    fn from(setting: InvalidSetting) -> Self {
        ConfigError::InvalidValue {
            field: setting.field,
            message: setting.message,
        }
    }
}

/// The selected backend together with its own parameter set
#[derive(Debug, Clone)]
pub enum BackendConfig {
    Empty,
    S3(S3Config),
    Oss(OssConfig),
    Cos(CosConfig),
    Qiniu(QiniuConfig),
    GitHub(GitHubConfig),
    /// The selected backend has a setting that failed to parse
    Invalid {
        kind: StorageKind,
        setting: InvalidSetting,
    },
}

impl BackendConfig {
    pub fn kind(&self) -> StorageKind {
        match self {
            BackendConfig::Empty => StorageKind::Empty,
            BackendConfig::S3(_) => StorageKind::S3,
            BackendConfig::Oss(_) => StorageKind::Oss,
            BackendConfig::Cos(_) => StorageKind::Cos,
            BackendConfig::Qiniu(_) => StorageKind::Qiniu,
            BackendConfig::GitHub(_) => StorageKind::GitHub,
            BackendConfig::Invalid { kind, .. } => *kind,
        }
    }
}

/// Immutable storage configuration used once to build the active backend
#[derive(Debug, Clone)]
pub struct StorageConfig {
    pub backend: BackendConfig,
    /// Object key template handed to the key formatter
    pub file_format: String,
}

impl StorageConfig {
    /// Convert flat settings into a discriminated configuration.
    ///
    /// Never fails: an unparsable setting of the selected backend yields
    /// [`BackendConfig::Invalid`], which the router turns into the empty backend.
    pub fn from_settings(settings: &Settings) -> Self {
        let kind = StorageKind::parse(&settings.storage_type);
        let backend = backend_config(kind, settings)
            .unwrap_or_else(|setting| BackendConfig::Invalid { kind, setting });

        Self {
            backend,
            file_format: settings.file_format.clone(),
        }
    }
}

fn backend_config(
    kind: StorageKind,
    settings: &Settings,
) -> Result<BackendConfig, InvalidSetting> {
    let backend = match kind {
        StorageKind::Empty => BackendConfig::Empty,
        StorageKind::S3 => BackendConfig::S3(S3Config {
            bucket: settings.s3_bucket.clone(),
            region: settings.s3_region.clone(),
            endpoint: non_empty(&settings.s3_endpoint),
            access_key: settings.s3_access_key.clone(),
            secret_key: settings.s3_secret_key.clone(),
            session_token: non_empty(&settings.s3_session),
            force_path_style: parse_flag(
                "FSM_S3_FORCE_PATH_STYLE",
                &settings.s3_force_path_style,
                false,
            )?,
            url_expiration_secs: parse_expiration(
                "FSM_S3_URL_EXPIRATION",
                &settings.s3_url_expiration,
            )?,
        }),
        StorageKind::Oss => BackendConfig::Oss(OssConfig {
            endpoint: settings.oss_endpoint.clone(),
            access_key: settings.oss_access_key.clone(),
            secret_key: settings.oss_secret_key.clone(),
            bucket: settings.oss_bucket.clone(),
            domain: non_empty(&settings.oss_domain),
            url_expiration_secs: parse_expiration(
                "FSM_OSS_URL_EXPIRATION",
                &settings.oss_url_expiration,
            )?,
        }),
        StorageKind::Cos => BackendConfig::Cos(CosConfig {
            bucket: settings.cos_bucket.clone(),
            region: settings.cos_region.clone(),
            app_id: settings.cos_app_id.clone(),
            secret_id: settings.cos_access_key.clone(),
            secret_key: settings.cos_secret_key.clone(),
            domain: non_empty(&settings.cos_domain),
            use_https: parse_flag("FSM_COS_USE_HTTPS", &settings.cos_use_https, true)?,
            use_accelerate: parse_flag(
                "FSM_COS_USE_ACCELERATE",
                &settings.cos_use_accelerate,
                false,
            )?,
            url_expiration_secs: parse_expiration(
                "FSM_COS_URL_EXPIRATION",
                &settings.cos_url_expiration,
            )?,
        }),
        StorageKind::Qiniu => BackendConfig::Qiniu(QiniuConfig {
            access_key: settings.qiniu_access_key.clone(),
            secret_key: settings.qiniu_secret_key.clone(),
            bucket: settings.qiniu_bucket.clone(),
            domain: settings.qiniu_domain.clone(),
            region: settings.qiniu_region.clone(),
            url_expiration_secs: parse_expiration(
                "FSM_QINIU_URL_EXPIRATION",
                &settings.qiniu_url_expiration,
            )?,
        }),
        StorageKind::GitHub => BackendConfig::GitHub(GitHubConfig {
            token: settings.github_token.clone(),
            owner: settings.github_owner.clone(),
            repo: settings.github_repo.clone(),
            branch: settings.github_branch.clone(),
            path: settings.github_path.clone(),
            domain: non_empty(&settings.github_domain),
        }),
    };
    Ok(backend)
}

/// Seconds; blank means the 7-day default
fn parse_expiration(field: &str, raw: &str) -> Result<i64, InvalidSetting> {
    let raw = raw.trim();
    if raw.is_empty() {
        return Ok(DEFAULT_URL_EXPIRATION_SECS as i64);
    }
    raw.parse::<i64>().map_err(|_| InvalidSetting {
        field: field.to_string(),
        message: format!("expected a number of seconds, got {:?}", raw),
    })
}

/// Accepts 1/0, t/f and true/false in any case; blank means `default`
fn parse_flag(field: &str, raw: &str, default: bool) -> Result<bool, InvalidSetting> {
    match raw.trim().to_lowercase().as_str() {
        "" => Ok(default),
        "1" | "t" | "true" => Ok(true),
        "0" | "f" | "false" => Ok(false),
        other => Err(InvalidSetting {
            field: field.to_string(),
            message: format!("expected true or false, got {:?}", other),
        }),
    }
}

/// Get a URL expiration as Duration, falling back to 7 days for non-positive values
pub fn url_expiration(secs: i64) -> Duration {
    if secs > 0 {
        Duration::from_secs(secs as u64)
    } else {
        Duration::from_secs(DEFAULT_URL_EXPIRATION_SECS)
    }
}

fn non_empty(value: &str) -> Option<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}
