//! Tests for builder modules

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use job_manager::builders::scheduler_builder::build_from_json;
use job_manager::builders::SchedulerBuilder;
use job_manager::config::SchedulerConfig;
use job_manager::core::SchedulerError;
use job_manager::util::Priority;

#[test]
fn test_scheduler_builder_defaults() {
    let builder = SchedulerBuilder::default();
    assert_eq!(builder.config(), &SchedulerConfig::default());

    let scheduler = builder.build().unwrap();
    assert_eq!(scheduler.config().name, "job-manager");
    assert_eq!(scheduler.worker_priority(), Priority::Low);
    assert!(!scheduler.is_worker_alive());
}

#[test]
fn test_scheduler_builder_rejects_invalid_config() {
    let err = SchedulerBuilder::new(SchedulerConfig::new().with_poll_interval_ms(0))
        .build()
        .unwrap_err();
    assert!(matches!(err, SchedulerError::InvalidConfig(_)));
}

#[test]
fn test_scheduler_builder_with_idle_handler() {
    let calls = Arc::new(AtomicUsize::new(0));
    let seen = Arc::clone(&calls);
    let scheduler = SchedulerBuilder::new(SchedulerConfig::new().with_name("hooked"))
        .idle_handler(move |_idle: Duration| {
            seen.fetch_add(1, Ordering::SeqCst);
        })
        .build()
        .unwrap();

    assert_eq!(scheduler.config().name, "hooked");
    // Nothing ran yet, so the hook was never called.
    assert_eq!(calls.load(Ordering::SeqCst), 0);
}

#[test]
fn test_build_from_json() {
    let scheduler = build_from_json(r#"{"name": "from-json", "worker_priority": "normal"}"#).unwrap();
    assert_eq!(scheduler.config().name, "from-json");
    assert_eq!(scheduler.worker_priority(), Priority::Normal);

    let err = build_from_json(r#"{"backoff_ms": 0}"#).unwrap_err();
    assert!(matches!(err, SchedulerError::InvalidConfig(_)));
}
