//! ==============================================================================
//! main.rs - uploader entry point
//! ==============================================================================
//!
//! purpose:
//!     replays a plant data workbook into the firebase realtime database so the
//!     hosted dashboard sees a live-looking feed.
//!
//! responsibilities:
//!     - load configuration (uploader.toml + environment)
//!     - check credential and source files before touching the network
//!     - load the workbook rows
//!     - adopt existing remote history so the cap spans runs
//!     - optionally serve the local status endpoint
//!     - choose a mode (config, env, or the interactive menu) and run it
//!
//! relationships:
//!     - uses: config.rs, logging.rs, source.rs, store/, uploader.rs, server.rs
//!
//!     ┌──────────────┐    rows    ┌────────────┐   rest   ┌─────────────────┐
//!     │ workbook     │ ─────────> │ uploader   │ ───────> │ realtime db     │
//!     │ (.xlsx)      │            │ (5s ticks) │          │ current/history │
//!     └──────────────┘            └─────┬──────┘          └─────────────────┘
//!                                       │ status
//!                                 ┌─────┴──────┐
//!                                 │ /api       │ (optional)
//!                                 └────────────┘
//!
//! ==============================================================================

use std::io::{self, BufRead, Write};

use anyhow::{bail, Result};
use tracing::{error, info, warn};

use plant_uploader::channels::channel_names;
use plant_uploader::config::{Mode, UploaderConfig};
use plant_uploader::store::{Credential, FirebaseStore};
use plant_uploader::uploader::Uploader;
use plant_uploader::{logging, server, source};

#[tokio::main]
async fn main() -> Result<()> {
    // step 1: load configuration
    let (mut config, config_path) = UploaderConfig::load_or_default()?;
    config.apply_env()?;

    logging::init(&config.logging.level, config.logging.file.as_deref())?;

    info!("===========================================================");
    info!("  Cement Plant Real-time Data Uploader");
    info!("===========================================================");
    match &config_path {
        Some(path) => info!("config loaded from {}", path.display()),
        None => warn!("no config file found - using defaults"),
    }

    // step 2: presence checks, fatal before anything else starts
    if let Err(e) = config.validate() {
        error!("{}", e);
        return Err(e.into());
    }
    if config.uses_placeholder_url() {
        warn!("database url is still the placeholder: {}", config.store.database_url);
    }
    config.log_summary();

    // step 3: remote store
    let credential = Credential::from_file(&config.store.credential_path)?;
    let store = FirebaseStore::new(&config.store, credential)?;
    info!("firebase client ready");

    // step 4: source rows
    info!("loading excel data from: {}", config.source.path.display());
    let table = source::load_workbook(&config.source.path)?;
    info!("loaded {} data records", table.len());
    info!("columns: {:?}", table.columns);

    let missing = table.missing_columns(&channel_names(&config.channels));
    if !missing.is_empty() {
        warn!("missing columns: {:?}", missing);
    }
    if table.malformed() > 0 {
        warn!("{} malformed records will be skipped", table.malformed());
    }

    let mut uploader = Uploader::new(store, table.rows, &config.upload);
    if let Err(e) = uploader.sync_history().await {
        warn!("could not read existing history, will re-list after the next upload: {}", e);
    }

    // step 5: status endpoint in background
    if let Some(bind) = config.status.bind.clone() {
        let status = uploader.status();
        tokio::spawn(async move {
            if let Err(e) = server::serve(&bind, status).await {
                error!("status server error: {}", e);
            }
        });
    }

    // step 6: run the chosen mode until done or ctrl-c
    let (mode, index) = match config.upload.mode {
        Some(mode) => (mode, config.upload.single_index),
        None => prompt_mode().await?,
    };

    if mode == Mode::Stream {
        info!("press ctrl+c to stop");
    }

    tokio::select! {
        result = uploader.execute(mode, index) => {
            if let Err(e) = result {
                error!("{}", e);
                return Err(e.into());
            }
        }
        _ = tokio::signal::ctrl_c() => {
            info!("streaming stopped by user");
        }
    }

    Ok(())
}

/// the numbered menu, for when no mode is configured
async fn prompt_mode() -> Result<(Mode, usize)> {
    tokio::task::spawn_blocking(|| {
        let stdin = io::stdin();
        let mut lines = stdin.lock().lines();
        let mut ask = |prompt: &str| -> Result<String> {
            print!("{prompt}");
            io::stdout().flush()?;
            match lines.next() {
                Some(line) => Ok(line?.trim().to_string()),
                None => bail!("stdin closed before a choice was made"),
            }
        };

        println!();
        println!("Choose operation mode:");
        println!("1. Real-time streaming (continuous, 5-second intervals)");
        println!("2. Upload single record (for testing)");
        println!("3. Upload all records once (no looping)");

        let mode: Mode = ask("\nEnter choice (1-3): ")?.parse()?;
        let index = if mode == Mode::Single {
            let answer = ask("Enter record index to upload (0-based): ")?;
            match answer.parse() {
                Ok(i) => i,
                Err(_) => bail!("invalid index provided: {answer:?}"),
            }
        } else {
            0
        };
        Ok((mode, index))
    })
    .await?
}
