//! Tests for configuration validation

use coalescing_scheduler::config::{MailboxBackendConfig, SchedulerConfig, SpawnerConfig};

#[test]
fn test_default_config_is_valid() {
    let cfg = SchedulerConfig::default();
    assert!(cfg.validate().is_ok());
    assert_eq!(cfg.mailbox, MailboxBackendConfig::Locked);
    assert_eq!(cfg.spawner, SpawnerConfig::Thread);
    assert!(cfg.worker_count > 0);
    assert!(!cfg.auto_reset_on_fault);
}

#[test]
fn test_invalid_worker_count() {
    let cfg = SchedulerConfig::new().with_worker_count(0);
    assert!(cfg.validate().is_err());
}

#[test]
fn test_invalid_queue_depth() {
    let cfg = SchedulerConfig::new().with_max_queue_depth(0);
    assert!(cfg.validate().is_err());
}

#[test]
fn test_invalid_thread_settings() {
    assert!(SchedulerConfig::new()
        .with_thread_name_prefix("  ")
        .validate()
        .is_err());
    assert!(SchedulerConfig::new()
        .with_thread_stack_size(0)
        .validate()
        .is_err());
}

#[test]
fn test_config_from_json() {
    let cfg = SchedulerConfig::from_json_str(
        r#"{"mailbox":"channel","spawner":"worker_pool","worker_count":2,"auto_reset_on_fault":true}"#,
    )
    .unwrap();

    assert_eq!(cfg.mailbox, MailboxBackendConfig::Channel);
    assert_eq!(cfg.spawner, SpawnerConfig::WorkerPool);
    assert_eq!(cfg.worker_count, 2);
    assert!(cfg.auto_reset_on_fault);
    assert_eq!(cfg.max_queue_depth, 1024);
}

#[test]
fn test_config_from_json_rejects_invalid() {
    assert!(SchedulerConfig::from_json_str(r#"{"worker_count":0}"#).is_err());
    assert!(SchedulerConfig::from_json_str(r#"{"mailbox":"postgres"}"#).is_err());
    assert!(SchedulerConfig::from_json_str("not json").is_err());
}

#[test]
fn test_config_serde_roundtrip() {
    let cfg = SchedulerConfig::new()
        .with_spawner(SpawnerConfig::Tokio)
        .with_thread_stack_size(256 * 1024);
    let json = serde_json::to_string(&cfg).unwrap();
    let back: SchedulerConfig = serde_json::from_str(&json).unwrap();
    assert_eq!(back, cfg);
}
