//! Builder for [`JobScheduler`] instances.

use crate::config::SchedulerConfig;
use crate::core::{IdleHandler, JobScheduler, SchedulerError};

/// Assembles a [`JobScheduler`] from a configuration and optional hooks.
///
/// ```rust,ignore
/// let scheduler = SchedulerBuilder::new(SchedulerConfig::from_env()?)
///     .idle_handler(|idle: Duration| cache.flush_if_idle(idle))
///     .build()?;
/// ```
pub struct SchedulerBuilder {
    config: SchedulerConfig,
    idle_handler: Option<Box<dyn IdleHandler>>,
}

impl SchedulerBuilder {
    /// Starts from `config`.
    #[must_use]
    pub fn new(config: SchedulerConfig) -> Self {
        Self {
            config,
            idle_handler: None,
        }
    }

    /// Configuration the scheduler will use.
    #[must_use]
    pub const fn config(&self) -> &SchedulerConfig {
        &self.config
    }

    /// Installs a hook the worker calls while idle (e.g. to flush caches).
    #[must_use]
    pub fn idle_handler(mut self, handler: impl IdleHandler + 'static) -> Self {
        self.idle_handler = Some(Box::new(handler));
        self
    }

    /// Builds the scheduler. The worker thread starts on first demand.
    ///
    /// # Errors
    ///
    /// Returns [`SchedulerError::InvalidConfig`] if the configuration is invalid.
    pub fn build(self) -> Result<JobScheduler, SchedulerError> {
        JobScheduler::with_idle_handler(self.config, self.idle_handler)
    }
}

impl Default for SchedulerBuilder {
    fn default() -> Self {
        Self::new(SchedulerConfig::default())
    }
}

/// Builds a scheduler with default hooks from a JSON configuration document.
///
/// # Errors
///
/// Returns [`SchedulerError::InvalidConfig`] if the document does not parse or validate.
pub fn build_from_json(input: &str) -> Result<JobScheduler, SchedulerError> {
    let config = SchedulerConfig::from_json_str(input).map_err(SchedulerError::InvalidConfig)?;
    SchedulerBuilder::new(config).build()
}
