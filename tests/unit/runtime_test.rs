//! Tests for runtime spawners

use coalescing_scheduler::core::{SchedulerError, Spawn};
use coalescing_scheduler::runtime::ThreadSpawner;
use crossbeam_channel::unbounded;
use std::time::Duration;

#[test]
fn test_thread_spawner_names_threads() {
    let spawner = ThreadSpawner::new("unit-runtime", None);
    let (tx, rx) = unbounded();

    spawner
        .spawn(move || {
            let name = std::thread::current().name().map(str::to_string);
            tx.send(name).unwrap();
        })
        .unwrap();

    let name = rx.recv_timeout(Duration::from_secs(5)).unwrap().unwrap();
    assert!(name.starts_with("unit-runtime-"), "got {name}");
    assert_eq!(spawner.spawned(), 1);
}

#[cfg(feature = "tokio-runtime")]
#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_tokio_spawner_spawn() {
    use coalescing_scheduler::runtime::TokioSpawner;

    let spawner = TokioSpawner::current().unwrap();
    let (tx, rx) = tokio::sync::oneshot::channel();

    spawner
        .spawn(move || {
            tx.send(123).unwrap();
        })
        .unwrap();

    let result = rx.await.expect("oneshot result");
    assert_eq!(result, 123);
}

#[cfg(feature = "tokio-runtime")]
#[test]
fn test_tokio_spawner_requires_runtime() {
    use coalescing_scheduler::runtime::TokioSpawner;

    assert!(matches!(
        TokioSpawner::current(),
        Err(SchedulerError::Infrastructure(_))
    ));
}
