//! Scheduler configuration structures.

use std::env;

use serde::{Deserialize, Serialize};

/// Prefix of environment variables read by [`SchedulerConfig::from_env`].
pub const ENV_PREFIX: &str = "COALESCE_";

/// Mailbox backend selection.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MailboxBackendConfig {
    /// Mutex-guarded buffer swapped out on drain.
    #[default]
    Locked,
    /// Lock-free crossbeam channel.
    Channel,
}

/// Where runs execute.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SpawnerConfig {
    /// A fresh OS thread per run chain.
    #[default]
    Thread,
    /// A fixed pool of OS threads fed through a bounded queue.
    WorkerPool,
    /// Tokio's blocking pool (requires the `tokio-runtime` feature).
    Tokio,
}

/// Scheduler configuration.
///
/// Every field has a default, so `{}` is a valid JSON configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SchedulerConfig {
    /// Mailbox backend.
    pub mailbox: MailboxBackendConfig,
    /// Spawner used to execute runs.
    pub spawner: SpawnerConfig,
    /// Worker threads for [`SpawnerConfig::WorkerPool`] and owned tokio runtimes.
    pub worker_count: usize,
    /// Bounded job queue depth for [`SpawnerConfig::WorkerPool`].
    pub max_queue_depth: usize,
    /// Prefix for worker thread names.
    pub thread_name_prefix: String,
    /// Stack size for spawned threads; platform default when unset.
    pub thread_stack_size: Option<usize>,
    /// Restart a fault-halted chain on the next push instead of waiting for `reset`.
    pub auto_reset_on_fault: bool,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            mailbox: MailboxBackendConfig::default(),
            spawner: SpawnerConfig::default(),
            worker_count: num_cpus::get(),
            max_queue_depth: 1024,
            thread_name_prefix: "coalesce".into(),
            thread_stack_size: None,
            auto_reset_on_fault: false,
        }
    }
}

impl SchedulerConfig {
    /// Default configuration.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the mailbox backend.
    #[must_use]
    pub const fn with_mailbox(mut self, mailbox: MailboxBackendConfig) -> Self {
        self.mailbox = mailbox;
        self
    }

    /// Set the spawner.
    #[must_use]
    pub const fn with_spawner(mut self, spawner: SpawnerConfig) -> Self {
        self.spawner = spawner;
        self
    }

    /// Set the worker count.
    #[must_use]
    pub const fn with_worker_count(mut self, worker_count: usize) -> Self {
        self.worker_count = worker_count;
        self
    }

    /// Set the worker pool queue depth.
    #[must_use]
    pub const fn with_max_queue_depth(mut self, max_queue_depth: usize) -> Self {
        self.max_queue_depth = max_queue_depth;
        self
    }

    /// Set the thread name prefix.
    #[must_use]
    pub fn with_thread_name_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.thread_name_prefix = prefix.into();
        self
    }

    /// Set the thread stack size.
    #[must_use]
    pub const fn with_thread_stack_size(mut self, bytes: usize) -> Self {
        self.thread_stack_size = Some(bytes);
        self
    }

    /// Enable or disable automatic reset of a faulted chain.
    #[must_use]
    pub const fn with_auto_reset_on_fault(mut self, enabled: bool) -> Self {
        self.auto_reset_on_fault = enabled;
        self
    }

    /// Validate configuration values.
    ///
    /// # Errors
    ///
    /// Returns a description of the first invalid field.
    pub fn validate(&self) -> Result<(), String> {
        if self.worker_count == 0 {
            return Err("worker_count must be greater than 0".into());
        }
        if self.max_queue_depth == 0 {
            return Err("max_queue_depth must be greater than 0".into());
        }
        if self.thread_name_prefix.trim().is_empty() {
            return Err("thread_name_prefix must not be empty".into());
        }
        if self.thread_stack_size == Some(0) {
            return Err("thread_stack_size must be greater than 0".into());
        }
        Ok(())
    }

    /// Parse configuration from a JSON string and validate.
    ///
    /// # Errors
    ///
    /// Returns a parse or validation message.
    pub fn from_json_str(input: &str) -> Result<Self, String> {
        let cfg: Self = serde_json::from_str(input).map_err(|e| format!("parse error: {e}"))?;
        cfg.validate()?;
        Ok(cfg)
    }

    /// Build configuration from `COALESCE_*` environment variables, loading a
    /// `.env` file first if one exists. Unset variables keep their defaults.
    ///
    /// Recognised: `COALESCE_MAILBOX`, `COALESCE_SPAWNER`, `COALESCE_WORKER_COUNT`,
    /// `COALESCE_MAX_QUEUE_DEPTH`, `COALESCE_THREAD_NAME_PREFIX`,
    /// `COALESCE_THREAD_STACK_SIZE`, `COALESCE_AUTO_RESET_ON_FAULT`.
    ///
    /// # Errors
    ///
    /// Returns a message naming the variable that failed to parse, or a
    /// validation message.
    pub fn from_env() -> Result<Self, String> {
        let _ = dotenvy::dotenv();
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build configuration from an arbitrary key lookup using the `COALESCE_*` names.
    pub(crate) fn from_lookup<F>(lookup: F) -> Result<Self, String>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |name: &str| lookup(&format!("{ENV_PREFIX}{name}"));
        let mut cfg = Self::default();

        if let Some(raw) = var("MAILBOX") {
            cfg.mailbox = parse_enum("MAILBOX", &raw)?;
        }
        if let Some(raw) = var("SPAWNER") {
            cfg.spawner = parse_enum("SPAWNER", &raw)?;
        }
        if let Some(raw) = var("WORKER_COUNT") {
            cfg.worker_count = parse_number("WORKER_COUNT", &raw)?;
        }
        if let Some(raw) = var("MAX_QUEUE_DEPTH") {
            cfg.max_queue_depth = parse_number("MAX_QUEUE_DEPTH", &raw)?;
        }
        if let Some(raw) = var("THREAD_NAME_PREFIX") {
            cfg.thread_name_prefix = raw;
        }
        if let Some(raw) = var("THREAD_STACK_SIZE") {
            cfg.thread_stack_size = Some(parse_number("THREAD_STACK_SIZE", &raw)?);
        }
        if let Some(raw) = var("AUTO_RESET_ON_FAULT") {
            cfg.auto_reset_on_fault = raw
                .trim()
                .parse()
                .map_err(|e| format!("{ENV_PREFIX}AUTO_RESET_ON_FAULT: {e}"))?;
        }

        cfg.validate()?;
        Ok(cfg)
    }
}

fn parse_enum<E>(name: &str, raw: &str) -> Result<E, String>
where
    E: for<'de> Deserialize<'de>,
{
    let value = serde_json::Value::String(raw.trim().to_ascii_lowercase());
    serde_json::from_value(value).map_err(|e| format!("{ENV_PREFIX}{name}: {e}"))
}

fn parse_number(name: &str, raw: &str) -> Result<usize, String> {
    raw.trim()
        .parse()
        .map_err(|e| format!("{ENV_PREFIX}{name}: {e}"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_lookup_overrides_defaults() {
        let cfg = SchedulerConfig::from_lookup(lookup(&[
            ("COALESCE_MAILBOX", "Channel"),
            ("COALESCE_SPAWNER", "worker_pool"),
            ("COALESCE_WORKER_COUNT", "3"),
            ("COALESCE_AUTO_RESET_ON_FAULT", "true"),
        ]))
        .unwrap();

        assert_eq!(cfg.mailbox, MailboxBackendConfig::Channel);
        assert_eq!(cfg.spawner, SpawnerConfig::WorkerPool);
        assert_eq!(cfg.worker_count, 3);
        assert!(cfg.auto_reset_on_fault);
        assert_eq!(cfg.max_queue_depth, 1024);
    }

    #[test]
    fn test_lookup_rejects_bad_values() {
        let err = SchedulerConfig::from_lookup(lookup(&[("COALESCE_WORKER_COUNT", "many")]))
            .unwrap_err();
        assert!(err.starts_with("COALESCE_WORKER_COUNT"));

        let err = SchedulerConfig::from_lookup(lookup(&[("COALESCE_SPAWNER", "fibers")]))
            .unwrap_err();
        assert!(err.starts_with("COALESCE_SPAWNER"));

        let err = SchedulerConfig::from_lookup(lookup(&[("COALESCE_MAX_QUEUE_DEPTH", "0")]))
            .unwrap_err();
        assert!(err.contains("max_queue_depth"));
    }

    #[test]
    fn test_empty_lookup_yields_defaults() {
        let cfg = SchedulerConfig::from_lookup(|_| None).unwrap();
        assert_eq!(cfg, SchedulerConfig::default());
    }
}
