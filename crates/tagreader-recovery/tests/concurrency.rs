//! Shared state under concurrent read calls.

mod common;

use std::sync::Arc;
use std::time::Duration;

use common::{Rig, album_card};
use futures::future::join_all;
use tagreader_hardware::mock::MockBehavior;
use tagreader_recovery::{ReaderConfig, ReaderEvent, ReaderLoop, RecoveryLevel};

fn fast_config() -> ReaderConfig {
    ReaderConfig::default()
        .poll_timeout(Duration::from_millis(50))
        .reset_settle(Duration::ZERO)
        .settle_for(RecoveryLevel::L0, Duration::ZERO)
        .settle_for(RecoveryLevel::L1, Duration::ZERO)
        .settle_for(RecoveryLevel::L2, Duration::ZERO)
}

#[tokio::test(start_paused = true)]
async fn test_concurrent_reads_share_one_bus() {
    let rig = Rig::new();
    rig.reader.set_fallback(album_card());

    let tasks: Vec<_> = (0..8)
        .map(|_| {
            let controller = Arc::clone(&rig.controller);
            tokio::spawn(async move { controller.read_default().await })
        })
        .collect();

    for result in join_all(tasks).await {
        let result = result.unwrap();
        assert!(result.is_success());
        assert_eq!(result.attempt(), RecoveryLevel::L0);
    }

    assert_eq!(rig.buses.open_count(), 1);
    assert_eq!(rig.reader.attached_buses(), vec![1; 8]);
}

#[tokio::test(start_paused = true)]
async fn test_concurrent_failures_are_all_counted() {
    let rig = Rig::new();
    rig.reader.set_fallback(MockBehavior::PollFault);

    let tasks: Vec<_> = (0..6)
        .map(|_| {
            let controller = Arc::clone(&rig.controller);
            tokio::spawn(async move { controller.read_default().await })
        })
        .collect();

    let results: Vec<_> = join_all(tasks)
        .await
        .into_iter()
        .map(|result| result.unwrap())
        .collect();

    assert!(results.iter().all(|result| result.is_error()));
    assert_eq!(rig.failures(), 6);
    // Counts 3, 4, 5 and 6 reach the threshold
    let flagged = results
        .iter()
        .filter(|result| result.system_reset_needed())
        .count();
    assert_eq!(flagged, 4);
    assert_eq!(rig.buses.reset_count(), 6);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_parallel_reads_on_worker_threads() {
    let rig = Rig::with_config(fast_config());
    rig.reader.set_fallback(album_card());

    let tasks: Vec<_> = (0..16)
        .map(|_| {
            let controller = Arc::clone(&rig.controller);
            tokio::spawn(async move { controller.read_default().await })
        })
        .collect();

    for result in join_all(tasks).await {
        assert!(result.unwrap().is_success());
    }

    assert_eq!(rig.buses.open_count(), 1);
    assert_eq!(rig.controller.stats().successes, 16);
}

#[tokio::test(start_paused = true)]
async fn test_on_demand_read_alongside_loop() {
    let rig = Rig::new();
    rig.reader.set_fallback(album_card());

    let mut handle = ReaderLoop::new(Arc::clone(&rig.controller)).start();

    let event = handle.recv().await.unwrap();
    assert!(matches!(event, ReaderEvent::CardRead(_)));

    let result = rig.controller.read_default().await;
    assert!(result.is_success());
    assert_eq!(rig.buses.open_count(), 1);

    handle.shutdown().await;
}
