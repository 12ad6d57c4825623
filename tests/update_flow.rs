mod common;

use std::fs;

use common::{quiet_logger, restarts, FakeVersions, Harness};
use fuelboard::update::{InstallLayout, UpdateBootstrap, UpdateCheck, UpdateState};

fn layout(dir: &std::path::Path) -> InstallLayout {
    InstallLayout {
        entry_point: dir.join("fuelboard"),
        installer: dir.join("fuelboard-updater"),
        retired: dir.join("fuelboard_OLD"),
    }
}

fn bootstrap(harness: &Harness, layout: InstallLayout, latest: &'static str, verify_ok: bool) -> UpdateBootstrap {
    UpdateBootstrap::new(
        Box::new(FakeVersions {
            journal: harness.journal.clone(),
            current: "1.0.0",
            latest,
            payload: b"new installer",
            verify_ok,
        }),
        layout,
        quiet_logger(),
    )
}

#[test]
fn equal_versions_stage_nothing() {
    let dir = tempfile::tempdir().unwrap();
    let layout = layout(dir.path());
    fs::write(&layout.entry_point, b"current program").unwrap();

    let harness = Harness::new();
    let mut session = harness.session();
    let mut updates = bootstrap(&harness, layout.clone(), "1.0.0", true);

    let mut outcome = None;
    assert!(!restarts(|| outcome = Some(updates.run(&mut session))));
    assert_eq!(outcome.unwrap().as_str(), "1.0.0");
    assert_eq!(updates.state(), UpdateState::Idle);
    assert_eq!(harness.journal.entries(), vec!["update:check"]);
    assert_eq!(fs::read(&layout.entry_point).unwrap(), b"current program");
    assert!(!layout.installer.exists());
    assert!(!layout.retired.exists());
}

#[test]
fn check_reports_available_version() {
    let dir = tempfile::tempdir().unwrap();
    let harness = Harness::new();
    let mut session = harness.session();
    let mut updates = bootstrap(&harness, layout(dir.path()), "1.1.0", true);

    match updates.check(&mut session) {
        UpdateCheck::Available(pending) => {
            assert_eq!(pending.current().as_str(), "1.0.0");
            assert_eq!(pending.latest().as_str(), "1.1.0");
        }
        UpdateCheck::UpToDate(v) => panic!("expected an update, got {v}"),
    }
    assert_eq!(updates.state(), UpdateState::CheckPending);
}

#[test]
fn verify_failure_leaves_program_files_untouched() {
    let dir = tempfile::tempdir().unwrap();
    let layout = layout(dir.path());
    fs::write(&layout.entry_point, b"current program").unwrap();

    let harness = Harness::new();
    let mut session = harness.session();
    let mut updates = bootstrap(&harness, layout.clone(), "1.1.0", false);

    assert!(restarts(|| {
        updates.run(&mut session);
    }));

    assert_eq!(updates.state(), UpdateState::Verifying);
    assert_eq!(fs::read(&layout.entry_point).unwrap(), b"current program");
    assert!(!layout.retired.exists());

    let entries = harness.journal.entries();
    assert!(entries.contains(&"draw:error:108:qr".to_string()));
    assert!(!entries.iter().any(|e| e == "draw:action:Installing update..."));
    assert!(harness.journal.count("touch-poll") > 0);
}

#[test]
fn verified_installer_becomes_entry_point_then_restarts() {
    let dir = tempfile::tempdir().unwrap();
    let layout = layout(dir.path());
    fs::write(&layout.entry_point, b"current program").unwrap();

    let harness = Harness::new();
    let mut session = harness.session();
    let mut updates = bootstrap(&harness, layout.clone(), "1.1.0", true);

    assert!(restarts(|| {
        updates.run(&mut session);
    }));

    assert_eq!(updates.state(), UpdateState::Staged);
    assert_eq!(fs::read(&layout.entry_point).unwrap(), b"new installer");
    assert_eq!(fs::read(&layout.retired).unwrap(), b"current program");
    assert!(!layout.installer.exists());

    assert_eq!(
        harness.journal.entries(),
        vec![
            "update:check",
            "draw:update:1.0.0->1.1.0",
            "draw:action:Downloading update...",
            "update:download",
            "draw:action:Verifying update...",
            "update:verify",
            "draw:action:Installing update...",
            "restart",
        ]
    );
}
