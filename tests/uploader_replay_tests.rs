use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use tokio::time::Instant;

use plant_uploader::config::{Mode, UploadConfig};
use plant_uploader::domain::{RunState, SensorReading};
use plant_uploader::error::RowError;
use plant_uploader::source::SourceRow;
use plant_uploader::store::MemoryStore;
use plant_uploader::uploader::Uploader;

fn row(inlet: f64, outlet: f64) -> SourceRow {
    Ok(SensorReading {
        recorded_at: None,
        values: BTreeMap::from([
            ("Clinker_Inlet_Temp".to_string(), inlet),
            ("Clinker_Outlet_Temp".to_string(), outlet),
        ]),
    })
}

fn rows(n: usize) -> Vec<SourceRow> {
    (0..n).map(|i| row(1300.0 + i as f64, 100.0 - i as f64)).collect()
}

fn config(history_limit: usize) -> UploadConfig {
    UploadConfig {
        interval_seconds: 5,
        history_limit,
        ..UploadConfig::default()
    }
}

fn inlet_values(store: &MemoryStore) -> Vec<f64> {
    store
        .history()
        .iter()
        .map(|r| r.values["Clinker_Inlet_Temp"])
        .collect()
}

#[tokio::test(start_paused = true)]
async fn three_rows_end_up_in_current_and_history() {
    let source = vec![row(1290.0, 95.0), row(1310.0, 101.0), row(1325.0, 99.5)];
    let expected = source[2].clone().unwrap();

    let mut uploader = Uploader::new(MemoryStore::new(), source, &config(1000));
    let start = Instant::now();
    uploader.run(false).await;

    // ticks at t=0, 5, 10
    let elapsed = start.elapsed();
    assert!(elapsed >= Duration::from_secs(10) && elapsed < Duration::from_secs(11));

    let store = uploader.store();
    assert_eq!(store.current().unwrap().values, expected.values);
    assert_eq!(inlet_values(store), vec![1290.0, 1310.0, 1325.0]);

    let metadata = store.metadata().unwrap();
    assert_eq!(metadata.status, RunState::Completed);
    assert_eq!(metadata.total_records, 3);
    assert_eq!(metadata.current_index, 3);
    assert_eq!(metadata.update_interval_seconds, 5);
}

#[tokio::test(start_paused = true)]
async fn current_tracks_the_latest_row() {
    let source = rows(6);
    let expected: Vec<_> = source.iter().map(|r| r.clone().unwrap()).collect();
    let mut uploader = Uploader::new(MemoryStore::new(), source, &config(1000));

    for (i, reading) in expected.iter().enumerate() {
        uploader.upload_reading(reading).await.unwrap();
        let current = uploader.store().current().unwrap();
        assert_eq!(current.values, reading.values, "after cycle {}", i + 1);
    }
}

#[tokio::test(start_paused = true)]
async fn history_is_capped_and_evicts_oldest() {
    let mut uploader = Uploader::new(MemoryStore::new(), rows(12), &config(5));
    uploader.run(false).await;

    assert_eq!(uploader.history_len(), 5);
    assert_eq!(
        inlet_values(uploader.store()),
        vec![1307.0, 1308.0, 1309.0, 1310.0, 1311.0]
    );
}

#[tokio::test(start_paused = true)]
async fn history_never_exceeds_cap_between_cycles() {
    let source = rows(20);
    let readings: Vec<_> = source.iter().map(|r| r.clone().unwrap()).collect();
    let mut uploader = Uploader::new(MemoryStore::new(), source, &config(4));

    for reading in &readings {
        uploader.upload_reading(reading).await.unwrap();
        assert!(uploader.store().history().len() <= 4);
    }
}

#[tokio::test(start_paused = true)]
async fn rerunning_the_same_source_duplicates_history() {
    let store = Arc::new(MemoryStore::new());

    for _ in 0..2 {
        let mut uploader = Uploader::new(store.clone(), rows(10), &config(1000));
        uploader.sync_history().await.unwrap();
        uploader.run(false).await;
    }

    assert_eq!(store.history().len(), 20);
    let values = inlet_values(&store);
    assert_eq!(values[..10], values[10..]);
}

#[tokio::test(start_paused = true)]
async fn sync_trims_history_left_by_earlier_runs() {
    let store = Arc::new(MemoryStore::new());
    let mut first = Uploader::new(store.clone(), rows(5), &config(1000));
    first.run(false).await;
    assert_eq!(store.history().len(), 5);

    let mut second = Uploader::new(store.clone(), rows(1), &config(3));
    second.sync_history().await.unwrap();
    assert_eq!(second.history_len(), 3);
    assert_eq!(inlet_values(&store), vec![1302.0, 1303.0, 1304.0]);

    second.run(false).await;
    assert_eq!(inlet_values(&store), vec![1303.0, 1304.0, 1300.0]);
}

#[tokio::test(start_paused = true)]
async fn failed_startup_listing_is_recovered_on_the_next_upload() {
    let store = Arc::new(MemoryStore::new());
    let mut first = Uploader::new(store.clone(), rows(5), &config(1000));
    first.run(false).await;

    let mut second = Uploader::new(store.clone(), rows(2), &config(3));
    store.set_fail_listing(true);
    assert!(second.sync_history().await.is_err());
    assert_eq!(store.history().len(), 5);

    store.set_fail_listing(false);
    second.run(false).await;

    assert_eq!(store.history().len(), 3);
    assert_eq!(inlet_values(&store), vec![1304.0, 1300.0, 1301.0]);
}

#[tokio::test(start_paused = true)]
async fn pushes_with_lost_replies_are_still_trimmed() {
    let source = rows(6);
    let readings: Vec<_> = source.iter().map(|r| r.clone().unwrap()).collect();
    let store = Arc::new(MemoryStore::new());
    let mut uploader = Uploader::new(store.clone(), source, &config(3));

    for (i, reading) in readings.iter().enumerate() {
        store.set_drop_push_reply(i == 1 || i == 2);
        let result = uploader.upload_reading(reading).await;
        assert_eq!(result.is_err(), i == 1 || i == 2, "cycle {}", i + 1);
        assert!(store.history().len() <= 3, "after cycle {}", i + 1);
    }

    assert_eq!(inlet_values(&store), vec![1303.0, 1304.0, 1305.0]);
    assert_eq!(uploader.history_len(), 3);
}

#[tokio::test(start_paused = true)]
async fn store_failures_do_not_stop_the_loop() {
    let mut uploader = Uploader::new(MemoryStore::new(), rows(3), &config(1000));
    uploader.store().set_fail_writes(true);
    uploader.run(false).await;

    assert!(uploader.store().current().is_none());
    assert!(uploader.store().history().is_empty());

    let status = uploader.status();
    let status = status.read().await;
    assert_eq!(status.failed, 3);
    assert_eq!(status.uploaded, 0);
    assert_eq!(status.metadata.as_ref().map(|m| m.status), Some(RunState::Completed));
}

#[tokio::test(start_paused = true)]
async fn recovers_once_the_store_comes_back() {
    let store = Arc::new(MemoryStore::new());
    let mut uploader = Uploader::new(store.clone(), rows(4), &config(1000));

    store.set_fail_writes(true);
    let first = rows(1).remove(0).unwrap();
    assert!(uploader.upload_reading(&first).await.is_err());

    store.set_fail_writes(false);
    uploader.run(false).await;
    assert_eq!(store.history().len(), 4);
}

#[tokio::test(start_paused = true)]
async fn malformed_rows_are_skipped_without_a_tick() {
    let source = vec![
        row(1.0, 1.0),
        Err(RowError::NotNumeric {
            row: 3,
            column: "Clinker_Inlet_Temp".into(),
            value: "n/a".into(),
        }),
        row(3.0, 3.0),
    ];
    let mut uploader = Uploader::new(MemoryStore::new(), source, &config(1000));

    let start = Instant::now();
    uploader.run(false).await;
    let elapsed = start.elapsed();

    assert!(elapsed >= Duration::from_secs(5) && elapsed < Duration::from_secs(6));
    assert_eq!(inlet_values(uploader.store()), vec![1.0, 3.0]);
    assert_eq!(uploader.status().read().await.skipped, 1);
}

#[tokio::test(start_paused = true)]
async fn stream_mode_wraps_around() {
    let mut uploader = Uploader::new(MemoryStore::new(), rows(3), &config(1000));

    // ticks at 0, 5, 10, 15, 20
    let stopped = tokio::time::timeout(Duration::from_secs(22), uploader.run(true)).await;
    assert!(stopped.is_err(), "stream mode should not finish on its own");

    let store = uploader.store();
    assert_eq!(inlet_values(store), vec![1300.0, 1301.0, 1302.0, 1300.0, 1301.0]);
    assert_eq!(store.current().unwrap().values["Clinker_Inlet_Temp"], 1301.0);
    assert_eq!(store.metadata().unwrap().status, RunState::Active);
}

#[tokio::test(start_paused = true)]
async fn source_without_usable_rows_uploads_nothing() {
    let source = vec![Err(RowError::Empty { row: 2 }), Err(RowError::Empty { row: 3 })];
    let mut uploader = Uploader::new(MemoryStore::new(), source, &config(1000));

    uploader.execute(Mode::Stream, 0).await.unwrap();
    assert_eq!(uploader.store().write_count(), 0);
}

#[tokio::test]
async fn single_mode_uses_requested_index() {
    let mut uploader = Uploader::new(MemoryStore::new(), rows(5), &config(1000));
    uploader.execute(Mode::Single, 3).await.unwrap();

    assert_eq!(inlet_values(uploader.store()), vec![1303.0]);
    assert!(uploader.execute(Mode::Single, 5).await.is_err());
}
