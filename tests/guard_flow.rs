mod common;

use common::{restarts, Harness, Journal};
use fuelboard::guard::{Closable, Fault, FaultKind, Release};

#[test]
fn ok_signal_is_a_no_op() {
    let harness = Harness::new();
    let mut session = harness.session();
    assert!(!restarts(|| session.check(Ok(()))));
    assert!(harness.journal.entries().is_empty());
}

#[test]
fn user_recoverable_fault_renders_releases_waits_then_restarts() {
    let mut harness = Harness::new();
    harness.touch_polls = 2;
    let mut session = harness.session();

    let fault = Fault::new(FaultKind::ConfigMissing, ["The configuration file is missing."]);
    assert!(restarts(|| session.check(Err(fault))));

    assert_eq!(
        harness.journal.entries(),
        vec![
            "draw:error:101:qr",
            "close:storage",
            "close:wlan",
            "touch-poll",
            "touch-poll",
            "touch-poll",
            "restart",
        ]
    );
}

#[test]
fn fatal_fault_restarts_without_waiting_for_touch() {
    let mut harness = Harness::new();
    harness.touch_polls = 5;
    let mut session = harness.session();

    let fault = Fault::new(FaultKind::StorageUnreadable, ["The data volume could not be read."]);
    assert!(restarts(|| session.check(Err(fault))));

    let entries = harness.journal.entries();
    assert_eq!(harness.journal.count("touch-poll"), 0);
    assert_eq!(
        entries,
        vec!["draw:error:002:qr", "close:storage", "close:wlan", "restart"]
    );
}

#[test]
fn every_fatal_code_skips_touch_and_every_recoverable_code_waits() {
    let kinds = [
        FaultKind::StorageUnavailable,
        FaultKind::StorageUnreadable,
        FaultKind::Offline,
        FaultKind::ClockSync,
        FaultKind::WeatherFetch,
        FaultKind::StationFetch,
        FaultKind::UpdateCheck,
        FaultKind::ConfigMissing,
        FaultKind::ConfigInvalid,
        FaultKind::WlanNotAssociated,
        FaultKind::AssetsMissing,
        FaultKind::StationRejected,
        FaultKind::UpdateDownload,
        FaultKind::UpdateVerify,
        FaultKind::UpdateInstall,
        FaultKind::Unexpected,
    ];
    for kind in kinds {
        let harness = Harness::new();
        let mut session = harness.session();
        assert!(restarts(|| session.escalate(Fault::new(kind, ["x"]))));
        let waited = harness.journal.count("touch-poll") > 0;
        assert_eq!(waited, kind.code().starts_with('1'), "code {}", kind.code());
    }
}

#[test]
fn verify_online_escalates_offline_as_fatal() {
    let mut harness = Harness::new();
    harness.online = false;
    let mut session = harness.session();

    assert!(restarts(|| session.verify_online()));
    let entries = harness.journal.entries();
    assert_eq!(&entries[..2], ["wlan:check", "wlan:online"]);
    assert!(entries.contains(&"draw:error:004:qr".to_string()));
    assert_eq!(harness.journal.count("touch-poll"), 0);
}

struct Recorder {
    name: &'static str,
    journal: Journal,
}

impl Closable for Recorder {
    fn name(&self) -> &str {
        self.name
    }

    fn close(&mut self) {
        self.journal.push(format!("close:{}", self.name));
    }
}

#[test]
fn release_closes_once_in_order_even_when_dropped() {
    let journal = Journal::default();
    let mut first = Recorder {
        name: "storage",
        journal: journal.clone(),
    };
    let mut second = Recorder {
        name: "wlan",
        journal: journal.clone(),
    };
    let logger = common::quiet_logger();
    {
        let mut resources: [&mut dyn Closable; 2] = [&mut first, &mut second];
        let release = Release::new(&mut resources, &logger);
        drop(release);
    }
    {
        let mut resources: [&mut dyn Closable; 2] = [&mut first, &mut second];
        Release::new(&mut resources, &logger).finish();
    }
    assert_eq!(
        journal.entries(),
        vec!["close:storage", "close:wlan", "close:storage", "close:wlan"]
    );
}
