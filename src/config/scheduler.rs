//! Scheduler configuration structures.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::util::Priority;

/// Prefix of the environment variables read by [`SchedulerConfig::from_env`].
pub const ENV_PREFIX: &str = "JOB_MANAGER_";

/// Scheduler configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SchedulerConfig {
    /// Worker thread name.
    pub name: String,
    /// Upper bound of the pause after the worker wakes from idle, in milliseconds.
    pub idle_delay_ms: u64,
    /// Pause after each background job when no caller is waiting, in milliseconds.
    pub backoff_ms: u64,
    /// How often `WaitUntilReady` re-checks cancellation and its deadline, in milliseconds.
    pub poll_interval_ms: u64,
    /// Queue slots reserved up front.
    pub initial_capacity: usize,
    /// Baseline priority of the worker while nobody waits on it.
    pub worker_priority: Priority,
    /// Worker thread stack size in bytes; platform default when unset.
    pub stack_size: Option<usize>,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            name: "job-manager".into(),
            idle_delay_ms: 500,
            backoff_ms: 50,
            poll_interval_ms: 50,
            initial_capacity: 10,
            worker_priority: Priority::Low,
            stack_size: None,
        }
    }
}

impl SchedulerConfig {
    /// Default configuration.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the worker thread name.
    #[must_use]
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Sets the post-idle delay.
    #[must_use]
    pub const fn with_idle_delay_ms(mut self, ms: u64) -> Self {
        self.idle_delay_ms = ms;
        self
    }

    /// Sets the post-execution backoff.
    #[must_use]
    pub const fn with_backoff_ms(mut self, ms: u64) -> Self {
        self.backoff_ms = ms;
        self
    }

    /// Sets the `WaitUntilReady` poll interval.
    #[must_use]
    pub const fn with_poll_interval_ms(mut self, ms: u64) -> Self {
        self.poll_interval_ms = ms;
        self
    }

    /// Sets the initial queue capacity.
    #[must_use]
    pub const fn with_initial_capacity(mut self, capacity: usize) -> Self {
        self.initial_capacity = capacity;
        self
    }

    /// Sets the worker's baseline priority.
    #[must_use]
    pub const fn with_worker_priority(mut self, priority: Priority) -> Self {
        self.worker_priority = priority;
        self
    }

    /// Sets the worker thread stack size.
    #[must_use]
    pub const fn with_stack_size(mut self, bytes: usize) -> Self {
        self.stack_size = Some(bytes);
        self
    }

    /// Post-idle delay as a `Duration`.
    #[must_use]
    pub const fn idle_delay(&self) -> Duration {
        Duration::from_millis(self.idle_delay_ms)
    }

    /// Post-execution backoff as a `Duration`.
    #[must_use]
    pub const fn backoff(&self) -> Duration {
        Duration::from_millis(self.backoff_ms)
    }

    /// Poll interval as a `Duration`.
    #[must_use]
    pub const fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    /// Validate configuration values.
    ///
    /// # Errors
    ///
    /// Returns a description of the first invalid field.
    pub fn validate(&self) -> Result<(), String> {
        if self.name.trim().is_empty() {
            return Err("name must not be empty".into());
        }
        if self.idle_delay_ms == 0 {
            return Err("idle_delay_ms must be greater than 0".into());
        }
        if self.backoff_ms == 0 {
            return Err("backoff_ms must be greater than 0".into());
        }
        if self.poll_interval_ms == 0 {
            return Err("poll_interval_ms must be greater than 0".into());
        }
        if self.initial_capacity == 0 {
            return Err("initial_capacity must be greater than 0".into());
        }
        if self.stack_size == Some(0) {
            return Err("stack_size must be greater than 0".into());
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

    /// Build configuration from `JOB_MANAGER_*` environment variables over the
    /// defaults, loading a `.env` file first when present.
    ///
    /// Recognised variables: `NAME`, `IDLE_DELAY_MS`, `BACKOFF_MS`,
    /// `POLL_INTERVAL_MS`, `INITIAL_CAPACITY`, `WORKER_PRIORITY`
    /// (`low`/`normal`/`high`/`critical`) and `STACK_SIZE`.
    ///
    /// # Errors
    ///
    /// Returns a message naming the variable that failed to parse, or a
    /// validation message.
    pub fn from_env() -> Result<Self, String> {
        let _ = dotenvy::dotenv();
        Self::from_lookup(|key| std::env::var(format!("{ENV_PREFIX}{key}")).ok())
    }

    /// Same as [`from_env`](Self::from_env) with an explicit variable source
    /// (keys are passed without the prefix).
    ///
    /// # Errors
    ///
    /// See [`from_env`](Self::from_env).
    pub fn from_lookup<F>(lookup: F) -> Result<Self, String>
    where
        F: Fn(&str) -> Option<String>,
    {
        fn parse<T: std::str::FromStr>(key: &str, raw: &str) -> Result<T, String>
        where
            T::Err: std::fmt::Display,
        {
            raw.trim()
                .parse()
                .map_err(|e| format!("{ENV_PREFIX}{key}: {e}"))
        }

        let mut cfg = Self::default();
        if let Some(name) = lookup("NAME") {
            cfg.name = name;
        }
        if let Some(raw) = lookup("IDLE_DELAY_MS") {
            cfg.idle_delay_ms = parse("IDLE_DELAY_MS", &raw)?;
        }
        if let Some(raw) = lookup("BACKOFF_MS") {
            cfg.backoff_ms = parse("BACKOFF_MS", &raw)?;
        }
        if let Some(raw) = lookup("POLL_INTERVAL_MS") {
            cfg.poll_interval_ms = parse("POLL_INTERVAL_MS", &raw)?;
        }
        if let Some(raw) = lookup("INITIAL_CAPACITY") {
            cfg.initial_capacity = parse("INITIAL_CAPACITY", &raw)?;
        }
        if let Some(raw) = lookup("WORKER_PRIORITY") {
            cfg.worker_priority = serde_json::from_value(serde_json::Value::String(
                raw.trim().to_ascii_lowercase(),
            ))
            .map_err(|e| format!("{ENV_PREFIX}WORKER_PRIORITY: {e}"))?;
        }
        if let Some(raw) = lookup("STACK_SIZE") {
            cfg.stack_size = Some(parse("STACK_SIZE", &raw)?);
        }
        cfg.validate()?;
        Ok(cfg)
    }
}
