//! error kinds shared by the generator and the uploader.
//!
//! fatal kinds (config, source, generate) bubble up to the binaries through
//! anyhow. row and store errors are logged by the upload loop, which keeps
//! going.

use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to parse config {path}: {source}")]
    Parse {
        path: PathBuf,
        source: toml::de::Error,
    },

    #[error("missing configuration: {0}")]
    Missing(&'static str),

    #[error("{what} not found: {path}")]
    NotFound { what: &'static str, path: PathBuf },

    #[error("invalid value for {name}: {value:?}")]
    InvalidValue { name: &'static str, value: String },

    #[error("invalid credential file {path}: {reason}")]
    Credential { path: PathBuf, reason: String },
}

#[derive(Debug, Error)]
pub enum SourceError {
    #[error("failed to open workbook {path}: {source}")]
    Open {
        path: PathBuf,
        source: calamine::Error,
    },

    #[error("workbook {0} has no worksheets")]
    NoWorksheet(PathBuf),

    #[error("failed to read worksheet of {path}: {source}")]
    Worksheet {
        path: PathBuf,
        source: calamine::Error,
    },

    #[error("worksheet has no header row")]
    MissingHeader,
}

/// a single source row that cannot become a reading
#[derive(Debug, Clone, PartialEq, Error)]
pub enum RowError {
    #[error("row {row}: column {column} holds non-numeric value {value:?}")]
    NotNumeric {
        row: usize,
        column: String,
        value: String,
    },

    #[error("row {row} is empty")]
    Empty { row: usize },
}

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("unexpected response: {0}")]
    Response(String),

    #[error("store unavailable: {0}")]
    Unavailable(String),
}

#[derive(Debug, Error)]
pub enum GenerateError {
    #[error("invalid distribution for channel {channel}: {source}")]
    Distribution {
        channel: String,
        source: rand_distr::NormalError,
    },

    #[error("sample interval must be at least one second")]
    ZeroInterval,

    #[error("sample times run past the supported date range")]
    TimeRange,

    #[error("failed to write workbook: {0}")]
    Workbook(#[from] rust_xlsxwriter::XlsxError),
}

#[derive(Debug, Error)]
pub enum UploadError {
    #[error("invalid record index {index} (source has {len} rows)")]
    InvalidIndex { index: usize, len: usize },

    #[error(transparent)]
    Row(#[from] RowError),

    #[error(transparent)]
    Store(#[from] StoreError),
}
