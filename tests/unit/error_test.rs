//! Tests for error types

use std::error::Error as _;
use std::time::Duration;

use job_manager::core::SchedulerError;

#[test]
fn test_error_messages() {
    assert_eq!(
        SchedulerError::InvalidConfig("name must not be empty".into()).to_string(),
        "invalid configuration: name must not be empty"
    );
    assert_eq!(
        SchedulerError::Internal("join failed".into()).to_string(),
        "internal error: join failed"
    );
    assert!(SchedulerError::TimedOut(Duration::from_millis(250))
        .to_string()
        .contains("250ms"));
}

#[test]
fn test_error_classification() {
    assert!(SchedulerError::Cancelled.is_cancelled());
    assert!(!SchedulerError::Cancelled.is_timeout());
    assert!(SchedulerError::TimedOut(Duration::from_secs(1)).is_timeout());
    assert!(!SchedulerError::TimedOut(Duration::from_secs(1)).is_cancelled());
    assert!(!SchedulerError::InvalidJob("x".into()).is_cancelled());
}

#[test]
fn test_spawn_error_from_io() {
    let io = std::io::Error::new(std::io::ErrorKind::WouldBlock, "no threads left");
    let err: SchedulerError = io.into();
    assert!(matches!(err, SchedulerError::Spawn(_)));
    assert!(err.source().is_some());
}

#[test]
fn test_job_error_keeps_cause() {
    let err = SchedulerError::Job(anyhow::anyhow!("disk full").context("writing index"));
    assert_eq!(err.to_string(), "job failed: writing index");
    assert!(err.source().is_some());
}
