//! Tests for utility functions

use coalescing_scheduler::util::telemetry::{init_test_tracing, DEFAULT_DIRECTIVE};
use coalescing_scheduler::util::init_tracing;

#[test]
fn test_default_directive_targets_crate() {
    assert!(DEFAULT_DIRECTIVE.starts_with("coalescing_scheduler"));
}

#[test]
fn test_tracing_init_twice_is_harmless() {
    init_test_tracing();
    init_tracing();
    tracing::info!("tracing initialised");
}
