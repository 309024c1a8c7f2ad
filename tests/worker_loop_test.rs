use autoclaim::schedule::FixedClock;
use autoclaim::shuffle::IdentityShuffler;
use autoclaim::{
    ClaimMatchingEngine, ClaimWorker, HealthCache, HealthStatus, InMemoryLedger,
    InMemorySubjectRegistry, Shutdown, Subject, WorkerState,
};
use chrono::{TimeZone, Utc};
use std::sync::Arc;
use std::time::Duration;

// 10:14:20 is 15m40s before the 10:30 boundary.
const DELAY_SECS: u64 = 940;

fn worker(ledger: &InMemoryLedger, enabled: bool) -> (Arc<ClaimWorker>, HealthCache) {
    let registry = InMemorySubjectRegistry::new(vec![Subject::new("org-a", Utc::now())]);
    let health = HealthCache::new();
    let clock = FixedClock(Utc.with_ymd_and_hms(2024, 5, 1, 10, 14, 20).unwrap());
    let worker = ClaimWorker::new(
        Arc::new(registry),
        Arc::new(ledger.clone()),
        ClaimMatchingEngine::new(Arc::new(IdentityShuffler)),
        health.clone(),
    )
    .with_clock(Arc::new(clock))
    .with_enabled(enabled);
    (Arc::new(worker), health)
}

#[tokio::test(start_paused = true)]
async fn test_loop_wakes_on_schedule_until_shutdown() {
    let ledger = InMemoryLedger::new();
    let (worker, health) = worker(&ledger, true);
    let shutdown = Shutdown::new();

    let handle = {
        let worker = worker.clone();
        let shutdown = shutdown.clone();
        tokio::spawn(async move { worker.run(shutdown).await })
    };

    tokio::time::sleep(Duration::from_secs(DELAY_SECS * 2 + 60)).await;
    assert_eq!(ledger.queried_subjects().len(), 3);
    assert_eq!(health.get(), HealthStatus::Healthy);
    assert_eq!(worker.state(), WorkerState::Sleeping);

    shutdown.trigger();
    tokio::time::timeout(Duration::from_secs(1), handle)
        .await
        .expect("shutdown should interrupt the sleep")
        .unwrap();
    assert_eq!(worker.state(), WorkerState::Stopped);
    assert_eq!(ledger.queried_subjects().len(), 3);
}

#[tokio::test(start_paused = true)]
async fn test_failed_pass_does_not_stop_the_loop() {
    let ledger = InMemoryLedger::new();
    ledger.fail_queries_for("org-a");
    let (worker, health) = worker(&ledger, true);
    let shutdown = Shutdown::new();

    let handle = {
        let worker = worker.clone();
        let shutdown = shutdown.clone();
        tokio::spawn(async move { worker.run(shutdown).await })
    };

    tokio::time::sleep(Duration::from_secs(60)).await;
    assert_eq!(health.get(), HealthStatus::Unhealthy);

    ledger.clear_faults();
    tokio::time::sleep(Duration::from_secs(DELAY_SECS)).await;
    assert_eq!(health.get(), HealthStatus::Healthy);
    assert_eq!(ledger.queried_subjects().len(), 2);

    shutdown.trigger();
    handle.await.unwrap();
}

#[tokio::test]
async fn test_disabled_worker_exits_without_work() {
    let ledger = InMemoryLedger::new();
    let (worker, health) = worker(&ledger, false);

    tokio::time::timeout(Duration::from_secs(1), worker.run(Shutdown::new()))
        .await
        .expect("disabled worker should return immediately");

    assert!(ledger.queried_subjects().is_empty());
    assert_eq!(health.get(), HealthStatus::Unknown);
    assert_eq!(worker.state(), WorkerState::Stopped);
}
