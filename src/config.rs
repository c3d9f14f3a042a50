//! ==============================================================================
//! config.rs - Runtime Configuration Loader
//! ==============================================================================
//!
//! purpose:
//!     defines the schema for `uploader.toml`.
//!     loads configuration from file or falls back to defaults, then applies
//!     environment overrides.
//!
//! structure:
//!     - StoreConfig: database url, credential file, namespace root.
//!     - SourceConfig: which workbook to replay.
//!     - UploadConfig: interval, history cap, run mode.
//!     - LoggingConfig: level and log file.
//!     - StatusConfig: optional local status endpoint.
//!     - GeneratorConfig: sample workbook defaults.
//!     - channels: the channel table (defaults to channels.rs).
//!
//! environment:
//!     UPLOADER_CONFIG                 explicit config file path
//!     FIREBASE_SERVICE_ACCOUNT_PATH   credential file
//!     FIREBASE_DATABASE_URL           database base url
//!     EXCEL_FILE_PATH                 source workbook
//!     LOG_LEVEL                       log verbosity
//!     UPLOAD_MODE                     stream | single | once
//!     UPLOAD_INDEX                    row index for single mode
//!
//! ==============================================================================

use std::path::{Path, PathBuf};
use std::str::FromStr;

use serde::Deserialize;

use crate::channels::{default_channels, ChannelSpec};
use crate::error::ConfigError;

/// Root configuration structure
#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct UploaderConfig {
    pub store: StoreConfig,
    pub source: SourceConfig,
    pub upload: UploadConfig,
    pub logging: LoggingConfig,
    pub status: StatusConfig,
    pub generator: GeneratorConfig,
    #[serde(default = "default_channels")]
    pub channels: Vec<ChannelSpec>,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct StoreConfig {
    pub database_url: String,
    pub credential_path: PathBuf,
    /// top-level namespace holding current / history / metadata
    pub root: String,
    pub timeout_seconds: u64,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct SourceConfig {
    pub path: PathBuf,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct UploadConfig {
    pub interval_seconds: u64,
    pub history_limit: usize,
    /// unset means ask on stdin
    pub mode: Option<Mode>,
    pub single_index: usize,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
    /// appended to in addition to stdout
    pub file: Option<PathBuf>,
}

#[derive(Debug, Deserialize, Clone, Default)]
#[serde(default)]
pub struct StatusConfig {
    /// e.g. "0.0.0.0:3000"; unset disables the endpoint
    pub bind: Option<String>,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct GeneratorConfig {
    pub output: PathBuf,
    pub records: usize,
    pub interval_seconds: u64,
}

#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Mode {
    /// replay forever, wrapping at the end
    Stream,
    /// one row, then exit
    Single,
    /// every row once, then exit
    Once,
}

impl FromStr for Mode {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "stream" | "1" => Ok(Self::Stream),
            "single" | "2" => Ok(Self::Single),
            "once" | "3" => Ok(Self::Once),
            _ => Err(ConfigError::InvalidValue {
                name: "UPLOAD_MODE",
                value: s.to_string(),
            }),
        }
    }
}

impl Default for UploaderConfig {
    fn default() -> Self {
        Self {
            store: StoreConfig::default(),
            source: SourceConfig::default(),
            upload: UploadConfig::default(),
            logging: LoggingConfig::default(),
            status: StatusConfig::default(),
            generator: GeneratorConfig::default(),
            channels: default_channels(),
        }
    }
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            database_url: "https://your-project-id-default-rtdb.firebaseio.com".to_string(),
            credential_path: PathBuf::from("service-account-key.json"),
            root: "cement_plant_data".to_string(),
            timeout_seconds: 10,
        }
    }
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from("cement_plant_data.xlsx"),
        }
    }
}

impl Default for UploadConfig {
    fn default() -> Self {
        Self {
            interval_seconds: 5,
            history_limit: 1000,
            mode: None,
            single_index: 0,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            file: Some(PathBuf::from("data_upload.log")),
        }
    }
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        Self {
            output: PathBuf::from("cement_plant_data1.xlsx"),
            records: 100,
            interval_seconds: 5,
        }
    }
}

impl UploaderConfig {
    /// Load configuration from file
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml(&content).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    pub fn from_toml(content: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(content)
    }

    /// Load from `UPLOADER_CONFIG`, then the usual locations, else defaults.
    /// returns the file that was used, if any.
    pub fn load_or_default() -> Result<(Self, Option<PathBuf>), ConfigError> {
        if let Ok(explicit) = std::env::var("UPLOADER_CONFIG") {
            let path = PathBuf::from(explicit);
            return Self::load(&path).map(|c| (c, Some(path)));
        }

        let paths = [
            PathBuf::from("config").join("uploader.toml"),
            PathBuf::from("..").join("config").join("uploader.toml"),
            PathBuf::from("uploader.toml"),
        ];

        for path in paths {
            if path.exists() {
                return Self::load(&path).map(|c| (c, Some(path)));
            }
        }

        Ok((Self::default(), None))
    }

    /// apply environment overrides from the process environment
    pub fn apply_env(&mut self) -> Result<(), ConfigError> {
        self.apply_overrides(|name| std::env::var(name).ok())
    }

    /// apply overrides from `lookup`; empty values are ignored
    pub fn apply_overrides<F>(&mut self, lookup: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());

        if let Some(v) = get("FIREBASE_SERVICE_ACCOUNT_PATH") {
            self.store.credential_path = PathBuf::from(v);
        }
        if let Some(v) = get("FIREBASE_DATABASE_URL") {
            self.store.database_url = v;
        }
        if let Some(v) = get("EXCEL_FILE_PATH") {
            self.source.path = PathBuf::from(v);
        }
        if let Some(v) = get("LOG_LEVEL") {
            self.logging.level = v;
        }
        if let Some(v) = get("UPLOAD_MODE") {
            self.upload.mode = Some(v.parse()?);
        }
        if let Some(v) = get("UPLOAD_INDEX") {
            self.upload.single_index =
                v.trim().parse().map_err(|_| ConfigError::InvalidValue {
                    name: "UPLOAD_INDEX",
                    value: v.clone(),
                })?;
        }
        Ok(())
    }

    /// presence checks the uploader needs before it starts
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.store.database_url.trim().is_empty() {
            return Err(ConfigError::Missing("store.database_url / FIREBASE_DATABASE_URL"));
        }
        if !self.store.credential_path.exists() {
            return Err(ConfigError::NotFound {
                what: "service account key",
                path: self.store.credential_path.clone(),
            });
        }
        if !self.source.path.exists() {
            return Err(ConfigError::NotFound {
                what: "excel file",
                path: self.source.path.clone(),
            });
        }
        if self.channels.is_empty() {
            return Err(ConfigError::Missing("channels"));
        }
        Ok(())
    }

    pub fn uses_placeholder_url(&self) -> bool {
        self.store.database_url.contains("your-project-id")
    }

    /// Log configuration summary
    pub fn log_summary(&self) {
        tracing::info!("database: {}/{}", self.store.database_url, self.store.root);
        tracing::info!("source: {}", self.source.path.display());
        tracing::info!(
            "interval: {}s | history limit: {} | channels: {}",
            self.upload.interval_seconds,
            self.upload.history_limit,
            self.channels.len()
        );
        if let Some(bind) = &self.status.bind {
            tracing::info!("status endpoint: http://{}/api", bind);
        }
    }
}
