//! Tests for utility functions

use std::thread;

use job_manager::core::ProgressMonitor;
use job_manager::util::{CancelFlag, Priority};

#[test]
fn test_priority_ordering() {
    assert!(Priority::Critical > Priority::High);
    assert!(Priority::High > Priority::Normal);
    assert!(Priority::Normal > Priority::Low);
}

#[test]
fn test_priority_round_trips_through_u8() {
    for p in [Priority::Low, Priority::Normal, Priority::High, Priority::Critical] {
        assert_eq!(Priority::from_u8(p.as_u8()), p);
    }
    assert_eq!(Priority::from_u8(200), Priority::Critical);
}

#[test]
fn test_priority_serde_names() {
    assert_eq!(serde_json::to_string(&Priority::High).unwrap(), "\"high\"");
    let p: Priority = serde_json::from_str("\"low\"").unwrap();
    assert_eq!(p, Priority::Low);
}

#[test]
fn test_current_priority_is_per_thread() {
    Priority::set_current(Priority::Critical);
    let other = thread::spawn(Priority::current).join().unwrap();
    assert_eq!(other, Priority::Normal);
    assert_eq!(Priority::current(), Priority::Critical);
}

#[test]
fn test_cancel_flag_shared_between_clones() {
    let flag = CancelFlag::new();
    let clone = flag.clone();
    assert!(!ProgressMonitor::is_cancelled(&clone));

    flag.cancel();
    assert!(clone.is_cancelled());
    assert!(ProgressMonitor::is_cancelled(&clone));

    clone.reset();
    assert!(!flag.is_cancelled());
}
