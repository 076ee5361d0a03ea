//! Tests for builder modules

use coalescing_scheduler::builders::{build_scheduler, build_spawner, SchedulerBuilder};
use coalescing_scheduler::config::{MailboxBackendConfig, SchedulerConfig, SpawnerConfig};
use coalescing_scheduler::core::{RunState, SchedulerError};
use coalescing_scheduler::runtime::ConfiguredSpawner;
use parking_lot::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

#[test]
fn test_build_spawner_defaults_to_thread() {
    let spawner = build_spawner(&SchedulerConfig::default()).unwrap();
    assert!(matches!(spawner, ConfiguredSpawner::Thread(_)));
}

#[test]
fn test_build_spawner_worker_pool() {
    let cfg = SchedulerConfig::new()
        .with_spawner(SpawnerConfig::WorkerPool)
        .with_worker_count(2);
    match build_spawner(&cfg).unwrap() {
        ConfiguredSpawner::WorkerPool(pool) => {
            assert_eq!(pool.stats().worker_count, 2);
            pool.shutdown();
        }
        other => panic!("unexpected spawner: {other:?}"),
    }
}

#[test]
fn test_build_spawner_rejects_invalid_config() {
    let cfg = SchedulerConfig::new().with_worker_count(0);
    assert!(matches!(
        build_spawner(&cfg),
        Err(SchedulerError::InvalidConfig(_))
    ));
}

#[test]
fn test_build_scheduler_from_config() {
    let cfg = SchedulerConfig::new().with_mailbox(MailboxBackendConfig::Channel);
    let scheduler = build_scheduler::<u8>(&cfg).unwrap();

    assert_eq!(scheduler.run_state(), RunState::Idle);
    assert_eq!(scheduler.pending(), 0);
    assert!(scheduler.action().is_none());
}

#[test]
fn test_builder_wires_action_and_observers() {
    let seen = Arc::new(AtomicUsize::new(0));
    let errors = Arc::new(Mutex::new(Vec::new()));

    let counter = Arc::clone(&seen);
    let sink = Arc::clone(&errors);
    let scheduler = SchedulerBuilder::<u8>::new()
        .action(move |batch: Vec<u8>| -> anyhow::Result<()> {
            counter.fetch_add(batch.len(), Ordering::SeqCst);
            if batch.contains(&0) {
                anyhow::bail!("zero is not allowed");
            }
            Ok(())
        })
        .observer(move |err| sink.lock().push(err.to_string()))
        .build()
        .unwrap();

    scheduler.push_many([1, 2, 3]);
    scheduler.flush(Duration::from_secs(5)).unwrap();
    scheduler.push(0);
    scheduler.flush(Duration::from_secs(5)).unwrap();

    assert_eq!(seen.load(Ordering::SeqCst), 4);
    assert_eq!(
        *errors.lock(),
        vec!["batch action failed: zero is not allowed".to_string()]
    );
}

#[test]
fn test_builder_rejects_invalid_config_with_shared_pool() {
    let pool = Arc::new(
        coalescing_scheduler::runtime::WorkerPool::new(1, 1, "builder", None).unwrap(),
    );
    let result = SchedulerBuilder::<u8>::new()
        .config(SchedulerConfig::new().with_max_queue_depth(0))
        .shared_pool(Arc::clone(&pool))
        .build();

    assert!(matches!(result, Err(SchedulerError::InvalidConfig(_))));
    pool.shutdown();
}
