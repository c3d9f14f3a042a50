use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::{DateTime, Local, NaiveDateTime, TimeZone};
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;

/// format of the Time column, in generated workbooks and in `source_time`
pub const TIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// one timestamped set of channel values
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SensorReading {
    /// when the row was sampled (absent if the source has no Time column)
    pub recorded_at: Option<NaiveDateTime>,

    /// channel name -> value
    pub values: BTreeMap<String, f64>,
}

impl SensorReading {
    pub fn value(&self, channel: &str) -> Option<f64> {
        self.values.get(channel).copied()
    }
}

/// the payload written to `current` and pushed to `history`
///
/// channel values sit at the top level of the json object so the dashboard
/// can read `current/Clinker_Inlet_Temp` directly.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct UploadRecord {
    #[serde(flatten)]
    pub values: BTreeMap<String, f64>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub source_time: Option<String>,

    /// upload wall-clock, rfc 3339
    pub timestamp: String,

    /// upload wall-clock, unix milliseconds
    pub upload_time: u64,
}

impl UploadRecord {
    pub fn new<Tz: TimeZone>(reading: &SensorReading, now: DateTime<Tz>) -> Self
    where
        Tz::Offset: std::fmt::Display,
    {
        Self {
            values: reading.values.clone(),
            source_time: reading
                .recorded_at
                .map(|t| t.format(TIME_FORMAT).to_string()),
            timestamp: now.to_rfc3339(),
            upload_time: now.timestamp_millis().max(0) as u64,
        }
    }

    pub fn now(reading: &SensorReading) -> Self {
        Self::new(reading, Local::now())
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum RunState {
    Active,
    Completed,
}

/// written to `metadata` after every row
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Metadata {
    pub last_update: String,
    pub current_index: usize,
    pub total_records: usize,
    pub update_interval_seconds: u64,
    pub status: RunState,
}

/// what the uploader has done so far, shared with the status endpoint
#[derive(Clone, Default, Debug, Serialize)]
pub struct UploadStatus {
    /// last record that reached `current`
    pub current: Option<UploadRecord>,
    pub metadata: Option<Metadata>,
    pub uploaded: u64,
    pub failed: u64,
    pub skipped: u64,
    /// history keys the uploader is tracking
    pub history_len: usize,
}

pub type SharedStatus = Arc<RwLock<UploadStatus>>;
