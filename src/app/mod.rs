use crate::{
    cli::RunOptions,
    collab::{
        touch::NoTouch, DataVolume, FileAssets, HttpVersionSource, OpenMeteo, RestartMode,
        SystemClock, SystemRestart, Tankerkoenig, TextPresenter, TouchPanel, WlanLink,
    },
    config::{Config, DEFAULT_DATA_DIR},
    guard::{FailFastGuard, Fault, FaultKind, TouchInput},
    session::Session,
    update::{InstallLayout, UpdateBootstrap},
    Result,
};
use std::{
    fs,
    panic::{self, AssertUnwindSafe},
    path::PathBuf,
    str::FromStr,
    sync::atomic::AtomicBool,
    time::Duration,
};

pub mod dashboard;
pub mod lifecycle;
mod logger;
pub mod unexpected;

pub use dashboard::Dashboard;
pub use logger::{LogLevel, Logger};

/// GPIO (BCM numbering) wired to the touch controller's pen interrupt.
pub const DEFAULT_TOUCH_PIN: u8 = 17;
pub const DEFAULT_FRAME_FILE: &str = "/run/fuelboard/frame.json";
const WLAN_POLL: Duration = Duration::from_secs(1);

/// Process options for the daemon.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppConfig {
    pub data_dir: PathBuf,
    pub log_level: LogLevel,
    pub log_file: Option<String>,
    pub syslog: bool,
    pub touch_pin: Option<u8>,
    pub restart_mode: RestartMode,
    pub frame_file: Option<PathBuf>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from(DEFAULT_DATA_DIR),
            log_level: LogLevel::default(),
            log_file: None,
            syslog: false,
            touch_pin: Some(DEFAULT_TOUCH_PIN),
            restart_mode: RestartMode::default(),
            frame_file: Some(PathBuf::from(DEFAULT_FRAME_FILE)),
        }
    }
}

impl AppConfig {
    /// CLI first, then `FUELBOARD_DATA_DIR`, then the built-in defaults.
    pub fn from_options(opts: RunOptions) -> Self {
        let defaults = Self::default();
        Self {
            data_dir: opts
                .data_dir
                .or_else(|| std::env::var_os("FUELBOARD_DATA_DIR").map(PathBuf::from))
                .unwrap_or(defaults.data_dir),
            log_level: opts
                .log_level
                .as_deref()
                .and_then(|s| LogLevel::from_str(s).ok())
                .unwrap_or_default(),
            log_file: opts.log_file,
            syslog: opts.syslog,
            touch_pin: if opts.no_touch {
                None
            } else {
                opts.touch_pin.or(defaults.touch_pin)
            },
            restart_mode: opts.restart_mode.unwrap_or(defaults.restart_mode),
            frame_file: opts.frame_file.or(defaults.frame_file),
        }
    }
}

pub struct App {
    config: AppConfig,
    logger: Logger,
}

impl App {
    pub fn new(config: AppConfig) -> Result<Self> {
        let logger = Logger::new(config.log_level, config.log_file.clone(), config.syslog)?;
        Ok(Self { config, logger })
    }

    pub fn from_options(opts: RunOptions) -> Result<Self> {
        Self::new(AppConfig::from_options(opts))
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    /// Entry point for the daemon. Returns only after a ctrl-c; every
    /// failure ends in a restart instead.
    pub fn run(&self) -> Result<()> {
        let running = lifecycle::create_shutdown_flag()?;
        unexpected::install_hook(self.logger.clone());
        self.logger.info(format!(
            "fuelboard {} starting (data={}, restart={})",
            env!("CARGO_PKG_VERSION"),
            self.config.data_dir.display(),
            self.config.restart_mode
        ));

        let mut session = self.build_session();
        let outcome =
            panic::catch_unwind(AssertUnwindSafe(|| self.drive(&mut session, &running)));
        match outcome {
            Ok(()) => {
                lifecycle::shut_down(&mut session);
                Ok(())
            }
            Err(payload) => unexpected::escalate(&mut session, payload),
        }
    }

    fn build_session(&self) -> Session {
        if let Some(parent) = self.config.frame_file.as_ref().and_then(|p| p.parent()) {
            if let Err(err) = fs::create_dir_all(parent) {
                self.logger
                    .warn(format!("frame directory {} unavailable: {err}", parent.display()));
            }
        }
        let presenter = TextPresenter::new(self.config.frame_file.clone(), self.logger.clone());
        let storage = DataVolume::new(&self.config.data_dir, self.logger.clone());
        let assets = FileAssets::new(storage.assets_dir());
        let network = WlanLink::new(self.logger.clone());
        let guard = FailFastGuard::new(
            self.touch_input(),
            Box::new(SystemRestart::new(self.config.restart_mode, self.logger.clone())),
            self.logger.clone(),
        );
        Session::new(
            Box::new(presenter),
            Box::new(assets),
            Box::new(storage),
            Box::new(network),
            guard,
            self.logger.clone(),
        )
    }

    fn touch_input(&self) -> Box<dyn TouchInput> {
        match TouchPanel::new(self.config.touch_pin) {
            Ok(panel) => Box::new(panel),
            Err(err) => {
                self.logger
                    .warn(format!("touch input disabled ({err}); faults wait for power-cycle"));
                Box::new(NoTouch)
            }
        }
    }

    fn drive(&self, session: &mut Session, running: &AtomicBool) {
        let config = lifecycle::open_storage(session);
        lifecycle::join_network(session, &config, WLAN_POLL);

        let mut dashboard = self.dashboard(session, &config);
        dashboard.sync_clock(session);
        dashboard.draw_initial(session, &config);
        dashboard.run(session, running);
    }

    fn dashboard(&self, session: &mut Session, config: &Config) -> Dashboard {
        let timeout = Duration::from_secs(config.request_timeout_secs);
        let weather = OpenMeteo::new(
            config.weather_lat,
            config.weather_long,
            timeout,
            self.logger.clone(),
        );
        let weather = session.require(weather.map_err(client_fault));
        let stations = Tankerkoenig::new(
            config.station_ids.clone(),
            config.fuel_type,
            config.tankerkoenig_api_key.clone(),
            timeout,
            self.logger.clone(),
        );
        let stations = session.require(stations.map_err(client_fault));
        let versions =
            HttpVersionSource::new(config.update_manifest_url.clone(), timeout, self.logger.clone());
        let versions = session.require(versions.map_err(client_fault));

        let updates = UpdateBootstrap::new(
            Box::new(versions),
            InstallLayout::from_config(config),
            self.logger.clone(),
        );
        Dashboard::new(
            Box::new(SystemClock::new(self.logger.clone())),
            Box::new(weather),
            Box::new(stations),
            updates,
            config,
            self.logger.clone(),
        )
    }
}

fn client_fault(err: crate::Error) -> Fault {
    Fault::with_message(FaultKind::Unexpected, format!("HTTP client setup failed: {err}"))
}
