//! cement plant telemetry: sample workbook generation and a replaying
//! uploader for the hosted realtime database.

pub mod channels;
pub mod config;
pub mod domain;
pub mod error;
pub mod generator;
pub mod history;
pub mod logging;
pub mod server;
pub mod source;
pub mod store;
pub mod uploader;
