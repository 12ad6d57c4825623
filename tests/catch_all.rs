mod common;

use std::any::Any;

use common::{restarts, Harness};
use fuelboard::{
    app::unexpected,
    guard::{Fault, FaultKind},
};

fn payload(message: &str) -> Box<dyn Any + Send> {
    Box::new(String::from(message))
}

#[test]
fn unexpected_panic_reopens_storage_and_waits_for_touch() {
    let mut harness = Harness::new();
    harness.touch_polls = 1;
    let mut session = harness.session();
    assert!(restarts(|| unexpected::escalate(&mut session, payload("boom"))));
    assert_eq!(
        harness.journal.entries(),
        vec![
            "draw:waiting",
            "storage:open",
            "draw:error:1000:qr",
            "close:storage",
            "close:wlan",
            "touch-poll",
            "touch-poll",
            "restart",
        ]
    );
}

#[test]
fn unavailable_storage_wins_over_the_unexpected_fault() {
    let mut harness = Harness::new();
    harness.storage_open = Err(Fault::new(FaultKind::StorageUnavailable, ["no volume"]));
    let mut session = harness.session();
    assert!(restarts(|| unexpected::escalate(&mut session, payload("boom"))));
    assert_eq!(
        harness.journal.entries(),
        vec![
            "draw:waiting",
            "storage:open",
            "draw:error:001:qr",
            "close:storage",
            "close:wlan",
            "restart",
        ]
    );
}

#[test]
fn unreadable_storage_restarts_without_reaching_fault_1000() {
    let mut harness = Harness::new();
    harness.storage_open = Err(Fault::new(FaultKind::StorageUnreadable, ["bad fs"]));
    let mut session = harness.session();
    assert!(restarts(|| unexpected::escalate(&mut session, payload("boom"))));
    let entries = harness.journal.entries();
    assert!(entries.contains(&"draw:error:002:qr".to_string()));
    assert!(!entries.iter().any(|e| e.starts_with("draw:error:1000")));
    assert_eq!(harness.journal.count("touch-poll"), 0);
    assert_eq!(harness.journal.count("restart"), 1);
}
