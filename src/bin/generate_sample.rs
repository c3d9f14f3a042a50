//! writes a sample plant workbook for the uploader to replay.
//!
//! usage: generate_sample [OUTPUT] [COUNT]
//! defaults come from the `[generator]` section of uploader.toml.

use std::path::PathBuf;

use anyhow::{Context, Result};
use chrono::Local;
use tracing::info;

use plant_uploader::config::UploaderConfig;
use plant_uploader::{generator, logging};

fn main() -> Result<()> {
    let (mut config, _) = UploaderConfig::load_or_default()?;
    config.apply_env()?;
    logging::init(&config.logging.level, None)?;

    let mut args = std::env::args().skip(1);
    let output = args.next().map(PathBuf::from).unwrap_or(config.generator.output);
    let count = match args.next() {
        Some(n) => n.parse().with_context(|| format!("invalid record count {n:?}"))?,
        None => config.generator.records,
    };

    info!("creating sample excel file...");

    let readings = generator::generate(
        &config.channels,
        count,
        Local::now().naive_local(),
        config.generator.interval_seconds,
        &mut rand::rng(),
    )?;
    generator::write_workbook(&output, &config.channels, &readings)
        .with_context(|| format!("writing {}", output.display()))?;

    info!(
        "sample excel file created with {} records: {}",
        readings.len(),
        output.display()
    );
    Ok(())
}
