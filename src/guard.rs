//! Fail-fast escalation. Every fallible outcome in the appliance ends up
//! here; a reported failure never returns to the caller.

use std::{fmt, thread, time::Duration};

use crate::app::Logger;
use crate::collab::{AssetCategory, AssetStore, Presenter};
use crate::DISPLAY_COLS;

const TOUCH_POLL_MS: u64 = 20;

/// Every failure the appliance can report, each with a fixed display code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FaultKind {
    StorageUnavailable,
    StorageUnreadable,
    Offline,
    ClockSync,
    WeatherFetch,
    StationFetch,
    UpdateCheck,
    ConfigMissing,
    ConfigInvalid,
    WlanNotAssociated,
    AssetsMissing,
    StationRejected,
    UpdateDownload,
    UpdateVerify,
    UpdateInstall,
    Unexpected,
}

impl FaultKind {
    pub fn code(&self) -> &'static str {
        match self {
            FaultKind::StorageUnavailable => "001",
            FaultKind::StorageUnreadable => "002",
            FaultKind::Offline => "004",
            FaultKind::ClockSync => "005",
            FaultKind::WeatherFetch => "006",
            FaultKind::StationFetch => "007",
            FaultKind::UpdateCheck => "008",
            FaultKind::ConfigMissing => "101",
            FaultKind::ConfigInvalid => "102",
            FaultKind::WlanNotAssociated => "103",
            FaultKind::AssetsMissing => "104",
            FaultKind::StationRejected => "106",
            FaultKind::UpdateDownload => "107",
            FaultKind::UpdateVerify => "108",
            FaultKind::UpdateInstall => "109",
            FaultKind::Unexpected => "1000",
        }
    }

    /// Whether a person can fix the cause; those faults wait for a touch
    /// before the restart so the diagnostic can be read.
    pub fn user_recoverable(&self) -> bool {
        matches!(
            self,
            FaultKind::ConfigMissing
                | FaultKind::ConfigInvalid
                | FaultKind::WlanNotAssociated
                | FaultKind::AssetsMissing
                | FaultKind::StationRejected
                | FaultKind::UpdateDownload
                | FaultKind::UpdateVerify
                | FaultKind::UpdateInstall
                | FaultKind::Unexpected
        )
    }
}

impl fmt::Display for FaultKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

/// A reported failure: what went wrong and the lines to put on screen.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Fault {
    kind: FaultKind,
    user_recoverable: bool,
    lines: Vec<String>,
}

impl Fault {
    pub fn new<I, S>(kind: FaultKind, lines: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            kind,
            user_recoverable: kind.user_recoverable(),
            lines: lines.into_iter().map(Into::into).collect(),
        }
    }

    /// Single message wrapped to the display width.
    pub fn with_message(kind: FaultKind, message: impl AsRef<str>) -> Self {
        Self::new(kind, wrap_lines(message.as_ref(), DISPLAY_COLS))
    }

    pub fn kind(&self) -> FaultKind {
        self.kind
    }

    pub fn code(&self) -> &'static str {
        self.kind.code()
    }

    pub fn user_recoverable(&self) -> bool {
        self.user_recoverable
    }

    pub fn lines(&self) -> &[String] {
        &self.lines
    }
}

impl fmt::Display for Fault {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.code(), self.lines.join(" "))
    }
}

/// Outcome of a fallible collaborator call. `Ok(())` means nothing to report.
pub type ErrorSignal = std::result::Result<(), Fault>;

/// A resource released on the failure path before the restart.
pub trait Closable {
    fn name(&self) -> &str;
    fn close(&mut self);
}

pub trait TouchInput {
    fn is_touched(&mut self) -> bool;
}

/// Hard device restart. Never returns.
pub trait Restart {
    fn restart(&mut self) -> !;
}

/// Scoped release of the resources handed to the guard. Resources are closed
/// in order exactly once, either by [`Release::finish`] or when the guard is
/// dropped during an unwind out of the renderer.
pub struct Release<'r, 'c> {
    resources: &'r mut [&'c mut dyn Closable],
    logger: &'r Logger,
    done: bool,
}

impl<'r, 'c> Release<'r, 'c> {
    pub fn new(resources: &'r mut [&'c mut dyn Closable], logger: &'r Logger) -> Self {
        Self {
            resources,
            logger,
            done: false,
        }
    }

    pub fn finish(mut self) {
        self.release();
    }

    fn release(&mut self) {
        if self.done {
            return;
        }
        self.done = true;
        for resource in self.resources.iter_mut() {
            self.logger.debug(format!("releasing {}", resource.name()));
            resource.close();
        }
    }
}

impl Drop for Release<'_, '_> {
    fn drop(&mut self) {
        self.release();
    }
}

/// The single failure path: render, release, maybe wait for a touch, restart.
pub struct FailFastGuard {
    touch: Box<dyn TouchInput>,
    restart: Box<dyn Restart>,
    logger: Logger,
    touch_poll: Duration,
}

impl FailFastGuard {
    pub fn new(touch: Box<dyn TouchInput>, restart: Box<dyn Restart>, logger: Logger) -> Self {
        Self {
            touch,
            restart,
            logger,
            touch_poll: Duration::from_millis(TOUCH_POLL_MS),
        }
    }

    /// Return on `Ok`, otherwise never return.
    pub fn handle(
        &mut self,
        signal: ErrorSignal,
        presenter: &mut dyn Presenter,
        assets: &dyn AssetStore,
        resources: &mut [&mut dyn Closable],
    ) {
        if let Err(fault) = signal {
            self.fail(fault, presenter, assets, resources)
        }
    }

    pub fn fail(
        &mut self,
        fault: Fault,
        presenter: &mut dyn Presenter,
        assets: &dyn AssetStore,
        resources: &mut [&mut dyn Closable],
    ) -> ! {
        self.logger.error(format!("fault {fault}"));

        let release = Release::new(resources, &self.logger);
        let qr_code = assets.image(AssetCategory::Error, fault.code());
        presenter.draw_error(&fault, qr_code.as_ref());
        release.finish();

        if fault.user_recoverable() {
            self.logger.info("waiting for touch before restart");
            while !self.touch.is_touched() {
                thread::sleep(self.touch_poll);
            }
        }

        self.logger.warn(format!("restarting after fault {}", fault.code()));
        self.restart.restart()
    }

    /// Restart without a fault, used once an update has been staged.
    pub fn restart(&mut self) -> ! {
        self.logger.info("restarting device");
        self.restart.restart()
    }
}

/// Greedy fixed-width chunking; words are not preserved across the cut.
pub fn wrap_lines(text: &str, width: usize) -> Vec<String> {
    let chars: Vec<char> = text.chars().collect();
    if chars.is_empty() || width == 0 {
        return vec![text.to_string()];
    }
    chars
        .chunks(width)
        .map(|chunk| chunk.iter().collect())
        .collect()
}
