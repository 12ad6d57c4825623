//! Self-update bootstrap. The running program stages the next program's
//! installer as its own entry point and restarts into it.
//!
//! Stages are tokens: a [`Verified`] can only come out of a successful
//! verify on a [`Downloaded`], and only a [`Verified`] can be installed.

use std::{
    fs, io,
    path::{Path, PathBuf},
};

use crate::app::Logger;
use crate::collab::{AssetCategory, VersionId, VersionSource};
use crate::config::Config;
use crate::guard::{Fault, FaultKind};
use crate::session::Session;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum UpdateState {
    #[default]
    Idle,
    CheckPending,
    Downloading,
    Verifying,
    Installing,
    Staged,
}

/// The durable file slots touched by an install.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstallLayout {
    pub entry_point: PathBuf,
    pub installer: PathBuf,
    pub retired: PathBuf,
}

impl InstallLayout {
    pub fn from_config(config: &Config) -> Self {
        Self {
            entry_point: config.entry_point_path(),
            installer: config.installer_path(),
            retired: config.retired_path(),
        }
    }
}

/// Condition for leaving Idle, evaluated on a five-minute fire.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UpdateGate {
    pub enabled: bool,
    pub update_hour: u8,
}

impl UpdateGate {
    pub fn is_open(&self, five_minute_fire: bool, check_allowed: bool, hour: u8) -> bool {
        self.enabled && five_minute_fire && check_allowed && hour == self.update_hour
    }
}

#[derive(Debug)]
pub struct PendingUpdate {
    current: VersionId,
    latest: VersionId,
}

impl PendingUpdate {
    pub fn current(&self) -> &VersionId {
        &self.current
    }

    pub fn latest(&self) -> &VersionId {
        &self.latest
    }
}

#[derive(Debug)]
pub struct Downloaded {
    installer: PathBuf,
}

#[derive(Debug)]
pub struct Verified {
    installer: PathBuf,
}

#[derive(Debug)]
pub struct Staged {
    entry_point: PathBuf,
}

impl Staged {
    pub fn entry_point(&self) -> &Path {
        &self.entry_point
    }
}

#[derive(Debug)]
pub enum UpdateCheck {
    UpToDate(VersionId),
    Available(PendingUpdate),
}

pub struct UpdateBootstrap {
    source: Box<dyn VersionSource>,
    layout: InstallLayout,
    state: UpdateState,
    logger: Logger,
}

impl UpdateBootstrap {
    pub fn new(source: Box<dyn VersionSource>, layout: InstallLayout, logger: Logger) -> Self {
        Self {
            source,
            layout,
            state: UpdateState::Idle,
            logger,
        }
    }

    pub fn state(&self) -> UpdateState {
        self.state
    }

    pub fn layout(&self) -> &InstallLayout {
        &self.layout
    }

    /// Check, then apply when a different version is published. Returns only
    /// when there is nothing to install.
    pub fn run(&mut self, session: &mut Session) -> VersionId {
        match self.check(session) {
            UpdateCheck::UpToDate(version) => version,
            UpdateCheck::Available(pending) => self.apply(session, pending),
        }
    }

    pub fn check(&mut self, session: &mut Session) -> UpdateCheck {
        self.state = UpdateState::CheckPending;
        let current = self.source.current_version();
        let latest = self.source.latest_version();
        let latest = session.require(latest);
        if current == latest {
            self.logger.info(format!("update check: {current} is current"));
            self.state = UpdateState::Idle;
            return UpdateCheck::UpToDate(current);
        }
        self.logger
            .info(format!("update check: {current} -> {latest} available"));
        UpdateCheck::Available(PendingUpdate { current, latest })
    }

    pub fn apply(&mut self, session: &mut Session, pending: PendingUpdate) -> ! {
        let icon = session.image(AssetCategory::Symbol, "update");
        session
            .presenter()
            .draw_update_screen(icon.as_ref(), pending.current(), pending.latest());

        session.presenter().draw_update_action("Downloading update...");
        let downloaded = self.download(session, pending);

        session.presenter().draw_update_action("Verifying update...");
        let verified = self.verify(session, downloaded);

        session.presenter().draw_update_action("Installing update...");
        let staged = self.install(verified);
        let staged = session.require(staged);

        self.state = UpdateState::Staged;
        self.logger.info(format!(
            "installer staged at {}; restarting",
            staged.entry_point().display()
        ));
        session.restart()
    }

    fn download(&mut self, session: &mut Session, pending: PendingUpdate) -> Downloaded {
        self.state = UpdateState::Downloading;
        self.logger.info(format!(
            "downloading installer for {} to {}",
            pending.latest(),
            self.layout.installer.display()
        ));
        let signal = self.source.download(&self.layout.installer);
        session.check(signal);
        Downloaded {
            installer: self.layout.installer.clone(),
        }
    }

    fn verify(&mut self, session: &mut Session, downloaded: Downloaded) -> Verified {
        self.state = UpdateState::Verifying;
        let signal = self.source.verify(&downloaded.installer);
        session.check(signal);
        Verified {
            installer: downloaded.installer,
        }
    }

    fn install(&mut self, verified: Verified) -> Result<Staged, Fault> {
        self.state = UpdateState::Installing;
        stage_installer(&self.layout, &verified.installer).map_err(|err| {
            Fault::with_message(FaultKind::UpdateInstall, format!("Install failed: {err}"))
        })?;
        Ok(Staged {
            entry_point: self.layout.entry_point.clone(),
        })
    }
}

/// Keep the current entry point aside and move the installer onto it.
///
/// The entry point path never disappears: the old program is preserved by a
/// hard link (or a copy where links are unsupported) and the installer then
/// replaces it with a single rename.
pub fn stage_installer(layout: &InstallLayout, installer: &Path) -> io::Result<()> {
    if !installer.is_file() {
        return Err(io::Error::new(
            io::ErrorKind::NotFound,
            format!("installer {} missing", installer.display()),
        ));
    }
    if layout.entry_point.exists() {
        match fs::remove_file(&layout.retired) {
            Ok(()) => {}
            Err(err) if err.kind() == io::ErrorKind::NotFound => {}
            Err(err) => return Err(err),
        }
        if fs::hard_link(&layout.entry_point, &layout.retired).is_err() {
            fs::copy(&layout.entry_point, &layout.retired)?;
        }
    }
    fs::rename(installer, &layout.entry_point)?;
    rustix::fs::sync();
    Ok(())
}
