//! Tests for the queue, enable gate and error latch

use std::sync::Arc;

use job_manager::core::{
    same_job, AppResult, EnableGate, ErrorLatch, Job, JobQueue, JobStatus, ProgressMonitor,
};

#[derive(Debug)]
struct Tagged {
    family: &'static str,
    key: Option<&'static str>,
}

impl Job for Tagged {
    fn execute(&self, _monitor: Option<&dyn ProgressMonitor>) -> AppResult<JobStatus> {
        Ok(JobStatus::Complete)
    }

    fn cancel(&self) {}

    fn belongs_to(&self, family: &str) -> bool {
        self.family == family
    }

    fn dedup_key(&self) -> Option<&str> {
        self.key
    }
}

fn job(family: &'static str, key: Option<&'static str>) -> Arc<dyn Job> {
    Arc::new(Tagged { family, key })
}

#[test]
fn test_queue_drain_family_keeps_survivor_order() {
    let mut queue = JobQueue::new(4);
    let a1 = job("a", None);
    let b1 = job("b", None);
    let a2 = job("a", None);
    let b2 = job("b", None);
    for j in [&a1, &b1, &a2, &b2] {
        queue.push(Arc::clone(j));
    }

    let removed = queue.drain_family(Some("a"));
    assert_eq!(removed.len(), 2);
    assert!(Arc::ptr_eq(&removed[0], &a1));
    assert!(Arc::ptr_eq(&removed[1], &a2));

    let left: Vec<_> = queue.iter().cloned().collect();
    assert!(Arc::ptr_eq(&left[0], &b1));
    assert!(Arc::ptr_eq(&left[1], &b2));

    assert_eq!(queue.drain_family(None).len(), 2);
    assert!(queue.is_empty());
}

#[test]
fn test_queue_pending_ignores_head() {
    let mut queue = JobQueue::new(2);
    let head = job("a", Some("refresh"));
    queue.push(Arc::clone(&head));

    let twin = job("a", Some("refresh"));
    assert!(same_job(&head, &twin));
    assert!(!queue.contains_pending(&twin));

    queue.push(twin);
    assert!(queue.contains_pending(&head));

    assert!(queue.advance().is_some_and(|first| Arc::ptr_eq(&first, &head)));
    assert!(!queue.contains_pending(&head));
}

#[test]
fn test_jobs_without_key_compare_by_identity() {
    let a = job("a", None);
    let b = job("a", None);
    assert!(same_job(&a, &Arc::clone(&a)));
    assert!(!same_job(&a, &b));
}

#[test]
fn test_gate_nesting() {
    let mut gate = EnableGate::default();
    assert!(gate.is_open());

    gate.disable();
    gate.disable();
    assert_eq!(gate.count(), -1);
    assert!(gate.enable());
    assert!(!gate.is_open());
    assert!(gate.enable());
    assert!(gate.is_open());

    assert!(!gate.enable());
    assert_eq!(gate.count(), 1);
}

#[test]
fn test_latch_first_error_wins() {
    let latch = ErrorLatch::new();
    assert!(latch.get().is_none());

    assert!(latch.record(anyhow::anyhow!("first")));
    assert!(!latch.record(anyhow::anyhow!("second")));
    assert_eq!(latch.get().unwrap().to_string(), "first");

    latch.clear();
    assert!(latch.get().is_none());
    assert!(latch.record(anyhow::anyhow!("third")));
}
