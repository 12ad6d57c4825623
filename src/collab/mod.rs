//! Contracts for everything the control loop talks to but does not own:
//! clock, network, storage, assets, presentation, data sources and the
//! release channel. Host implementations for a Linux board live in the
//! submodules.

use std::{fmt, path::Path, path::PathBuf, time::Duration};

use serde::Serialize;

use crate::config::{Config, FuelType};
use crate::guard::{Closable, ErrorSignal, Fault};
use crate::schedule::Timestamp;

pub mod assets;
pub mod clock;
pub mod network;
pub mod presenter;
pub mod restart;
pub mod station;
pub mod storage;
pub mod touch;
pub mod version;
pub mod weather;

pub use assets::FileAssets;
pub use clock::SystemClock;
pub use network::WlanLink;
pub use presenter::TextPresenter;
pub use restart::{RestartMode, SystemRestart};
pub use station::Tankerkoenig;
pub use storage::DataVolume;
pub use touch::TouchPanel;
pub use version::HttpVersionSource;
pub use weather::OpenMeteo;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum AssetCategory {
    Error,
    Symbol,
    Station,
    Weather,
}

impl AssetCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            AssetCategory::Error => "error",
            AssetCategory::Symbol => "symbol",
            AssetCategory::Station => "station",
            AssetCategory::Weather => "weather",
        }
    }
}

impl fmt::Display for AssetCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Handle to an image asset; the presenter decides how to load it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Image {
    pub category: AssetCategory,
    pub key: String,
    pub path: PathBuf,
}

pub trait AssetStore {
    fn image(&self, category: AssetCategory, key: &str) -> Option<Image>;
}

pub trait Clock {
    fn now(&self) -> Timestamp;
    fn sync(&mut self) -> ErrorSignal;
    fn set_timezone(&mut self);
    fn timezone_set(&self) -> bool;
    fn tz_identifier(&self) -> String;
}

/// What the network session needs from the configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WlanSettings {
    pub ssid: String,
    pub psk: String,
    pub interface: String,
    pub probe: String,
    pub timeout: Duration,
}

impl Default for WlanSettings {
    fn default() -> Self {
        Self::from(&Config::default())
    }
}

impl From<&Config> for WlanSettings {
    fn from(config: &Config) -> Self {
        Self {
            ssid: config.wlan_ssid.clone(),
            psk: config.wlan_psk.clone(),
            interface: config.wlan_interface.clone(),
            probe: config.connectivity_probe.clone(),
            timeout: Duration::from_secs(config.request_timeout_secs),
        }
    }
}

/// Network session. Association is driven by the OS; this side only asks.
pub trait Network: Closable {
    fn connect(&mut self, settings: &WlanSettings);
    fn associated(&mut self) -> bool;
    fn is_associated(&mut self) -> ErrorSignal;
    fn has_internet(&mut self) -> ErrorSignal;
}

pub trait Storage: Closable {
    fn open(&mut self) -> ErrorSignal;
    fn load_config(&mut self) -> Result<Config, Fault>;
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct VersionId(pub String);

impl VersionId {
    pub fn new(raw: impl Into<String>) -> Self {
        Self(raw.into().trim().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for VersionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Release channel for the appliance's own program files.
pub trait VersionSource {
    fn current_version(&self) -> VersionId;
    fn latest_version(&mut self) -> Result<VersionId, Fault>;
    fn download(&mut self, target: &Path) -> ErrorSignal;
    fn verify(&mut self, target: &Path) -> ErrorSignal;
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WeatherReport {
    pub temperature_c: f64,
    pub precipitation_pct: u8,
    pub low_c: f64,
    pub high_c: f64,
    pub icon: String,
}

pub trait WeatherSource {
    fn fetch(&mut self, now: &Timestamp, tz: &str) -> Result<WeatherReport, Fault>;
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StationPrice {
    pub id: String,
    pub open: bool,
    pub price: Option<f64>,
}

pub trait StationSource {
    fn fetch(&mut self) -> Result<Vec<StationPrice>, Fault>;
}

/// Static parts of the dashboard, drawn once after boot.
#[derive(Debug, Clone, PartialEq)]
pub struct MainLayout {
    pub station_icons: Vec<Option<Image>>,
    pub symbol_icons: Vec<Option<Image>>,
    pub station_labels: Vec<String>,
    pub fuel_type: FuelType,
}

/// Screen output. Implementations swallow and log their own errors.
pub trait Presenter {
    fn draw_waiting_screen(&mut self);
    fn draw_waiting_for_wlan(&mut self, icon: Option<&Image>, ssid: &str);
    fn draw_wlan_countdown(&mut self, remaining_secs: u32);
    fn draw_error(&mut self, fault: &Fault, qr_code: Option<&Image>);
    fn draw_update_screen(&mut self, icon: Option<&Image>, current: &VersionId, latest: &VersionId);
    fn draw_update_action(&mut self, action: &str);
    fn draw_main_layout(&mut self, layout: &MainLayout);
    fn draw_date_time(&mut self, now: &Timestamp);
    /// `icon` is `None` when the displayed icon is still current.
    fn draw_weather(&mut self, report: &WeatherReport, icon: Option<&Image>);
    fn draw_stations(&mut self, prices: &[StationPrice]);
    fn draw_offline(&mut self);
}
