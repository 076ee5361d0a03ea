//! Tests for error types

use coalescing_scheduler::core::{AppResult, SchedulerError};
use std::error::Error as _;

#[test]
fn test_configuration_error() {
    let err = SchedulerError::Configuration("no batch action assigned".to_string());
    assert_eq!(format!("{err}"), "configuration error: no batch action assigned");
    assert!(!err.is_user_action());
}

#[test]
fn test_user_action_error_keeps_context_chain() {
    let inner = anyhow::anyhow!("connection reset").context("bulk insert failed");
    let err = SchedulerError::UserAction(inner);

    assert_eq!(
        format!("{err}"),
        "batch action failed: bulk insert failed: connection reset"
    );
    assert!(err.is_user_action());
    assert!(err.source().is_some());
}

#[test]
fn test_infrastructure_error() {
    let err = SchedulerError::Infrastructure("worker pool is shut down".to_string());
    assert_eq!(format!("{err}"), "infrastructure error: worker pool is shut down");
}

#[test]
fn test_invalid_config_error() {
    let err = SchedulerError::InvalidConfig("worker_count must be greater than 0".to_string());
    assert_eq!(
        format!("{err}"),
        "invalid configuration: worker_count must be greater than 0"
    );
}

#[test]
fn test_timeout_and_halted_errors() {
    assert_eq!(format!("{}", SchedulerError::Timeout), "operation timed out");
    assert_eq!(
        format!("{}", SchedulerError::Halted),
        "run chain halted after an infrastructure fault"
    );
}

#[test]
fn test_app_result_wraps_scheduler_error() {
    fn flush_step() -> Result<u8, SchedulerError> {
        Err(SchedulerError::Timeout)
    }
    fn caller() -> AppResult<u8> {
        let value = flush_step()?;
        Ok(value + 1)
    }

    let err = caller().unwrap_err();
    assert!(matches!(
        err.downcast_ref::<SchedulerError>(),
        Some(SchedulerError::Timeout)
    ));
}
