//! ==============================================================================
//! generator.rs - synthetic plant data
//! ==============================================================================
//!
//! purpose:
//!     produces a replayable spreadsheet of sensor readings for demos and
//!     for exercising the uploader without a live plant connection.
//!
//! relationships:
//!     - used by: bin/generate_sample.rs
//!     - reads: channels.rs (per-channel mean / std-dev table)
//!     - output is read back by: source.rs
//!
//! ==============================================================================

use std::collections::BTreeMap;
use std::path::Path;

use chrono::{NaiveDateTime, TimeDelta};
use rand::Rng;
use rand_distr::{Distribution, Normal};
use rust_xlsxwriter::{Format, Workbook};

use crate::channels::ChannelSpec;
use crate::domain::SensorReading;
use crate::error::GenerateError;

/// draw `count` readings, `interval_seconds` apart, starting at `start`
pub fn generate<R: Rng + ?Sized>(
    channels: &[ChannelSpec],
    count: usize,
    start: NaiveDateTime,
    interval_seconds: u64,
    rng: &mut R,
) -> Result<Vec<SensorReading>, GenerateError> {
    let distributions = channels
        .iter()
        .map(|c| {
            Normal::new(c.mean, c.std_dev)
                .map(|d| (c.name.as_str(), d))
                .map_err(|source| GenerateError::Distribution {
                    channel: c.name.clone(),
                    source,
                })
        })
        .collect::<Result<Vec<_>, _>>()?;

    if interval_seconds == 0 {
        return Err(GenerateError::ZeroInterval);
    }
    let step = i64::try_from(interval_seconds).map_err(|_| GenerateError::TimeRange)?;

    let mut readings = Vec::with_capacity(count);
    for i in 0..count {
        let recorded_at = i64::try_from(i)
            .ok()
            .and_then(|i| step.checked_mul(i))
            .and_then(TimeDelta::try_seconds)
            .and_then(|offset| start.checked_add_signed(offset))
            .ok_or(GenerateError::TimeRange)?;

        let values: BTreeMap<String, f64> = distributions
            .iter()
            .map(|(name, dist)| (name.to_string(), dist.sample(&mut *rng)))
            .collect();

        readings.push(SensorReading {
            recorded_at: Some(recorded_at),
            values,
        });
    }

    Ok(readings)
}

/// write readings as a single worksheet: `Time` then one column per channel
pub fn write_workbook(
    path: impl AsRef<Path>,
    channels: &[ChannelSpec],
    readings: &[SensorReading],
) -> Result<(), GenerateError> {
    let mut workbook = Workbook::new();
    let sheet = workbook.add_worksheet();
    let time_format = Format::new().set_num_format("yyyy-mm-dd hh:mm:ss");

    sheet.write_string(0, 0, "Time")?;
    for (col, channel) in channels.iter().enumerate() {
        sheet.write_string(0, col as u16 + 1, &channel.name)?;
    }
    sheet.set_column_width(0, 20)?;

    for (i, reading) in readings.iter().enumerate() {
        let row = i as u32 + 1;
        if let Some(t) = reading.recorded_at {
            sheet.write_datetime_with_format(row, 0, &t, &time_format)?;
        }
        for (col, channel) in channels.iter().enumerate() {
            if let Some(v) = reading.value(&channel.name) {
                sheet.write_number(row, col as u16 + 1, v)?;
            }
        }
    }

    workbook.save(path.as_ref())?;
    Ok(())
}
