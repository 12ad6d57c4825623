use crate::{Error, Result};
use std::path::{Path, PathBuf};

pub mod loader;

pub const DEFAULT_DATA_DIR: &str = "/var/lib/fuelboard";
pub const DEFAULT_WLAN_INTERFACE: &str = "wlan0";
pub const DEFAULT_WLAN_TIMEOUT_SECS: u32 = 30;
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 5;
pub const DEFAULT_CONNECTIVITY_PROBE: &str = "1.1.1.1:53";
pub const DEFAULT_UPDATE_HOUR: u8 = 3;
pub const DEFAULT_UPDATE_MANIFEST_URL: &str =
    "https://updates.fuelboard.invalid/stable/manifest.json";
pub const DEFAULT_INSTALL_DIR: &str = "/opt/fuelboard";
pub const DEFAULT_ENTRY_POINT: &str = "fuelboard";
pub const DEFAULT_INSTALLER: &str = "fuelboard-updater";
pub const DEFAULT_LOOP_DELAY_MS: u64 = 200;
pub const MAX_STATIONS: usize = 3;
pub const MIN_LOOP_DELAY_MS: u64 = 50;
pub const MAX_LOOP_DELAY_MS: u64 = 5_000;
pub const MAX_WLAN_TIMEOUT_SECS: u32 = 300;
pub const MAX_REQUEST_TIMEOUT_SECS: u64 = 60;
pub(crate) const CONFIG_FILE_NAME: &str = "config.toml";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, serde::Serialize)]
#[serde(rename_all = "lowercase")]
pub enum FuelType {
    #[default]
    E5,
    E10,
    Diesel,
}

impl FuelType {
    pub fn as_str(&self) -> &'static str {
        match self {
            FuelType::E5 => "e5",
            FuelType::E10 => "e10",
            FuelType::Diesel => "diesel",
        }
    }
}

impl std::fmt::Display for FuelType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for FuelType {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "e5" => Ok(FuelType::E5),
            "e10" => Ok(FuelType::E10),
            "diesel" => Ok(FuelType::Diesel),
            _ => Err("expected one of e5, e10, diesel".into()),
        }
    }
}

/// Dashboard settings read from the data volume.
#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    pub wlan_ssid: String,
    pub wlan_psk: String,
    pub wlan_interface: String,
    pub wlan_timeout_secs: u32,
    pub request_timeout_secs: u64,
    pub connectivity_probe: String,
    pub weather_lat: f64,
    pub weather_long: f64,
    pub station_ids: Vec<String>,
    pub station_labels: Vec<String>,
    pub fuel_type: FuelType,
    pub tankerkoenig_api_key: String,
    pub automatic_updates: bool,
    pub update_hour: u8,
    pub update_manifest_url: String,
    pub install_dir: PathBuf,
    pub entry_point: String,
    pub installer: String,
    pub loop_delay_ms: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            wlan_ssid: String::new(),
            wlan_psk: String::new(),
            wlan_interface: DEFAULT_WLAN_INTERFACE.to_string(),
            wlan_timeout_secs: DEFAULT_WLAN_TIMEOUT_SECS,
            request_timeout_secs: DEFAULT_REQUEST_TIMEOUT_SECS,
            connectivity_probe: DEFAULT_CONNECTIVITY_PROBE.to_string(),
            weather_lat: 0.0,
            weather_long: 0.0,
            station_ids: Vec::new(),
            station_labels: Vec::new(),
            fuel_type: FuelType::default(),
            tankerkoenig_api_key: String::new(),
            automatic_updates: true,
            update_hour: DEFAULT_UPDATE_HOUR,
            update_manifest_url: DEFAULT_UPDATE_MANIFEST_URL.to_string(),
            install_dir: PathBuf::from(DEFAULT_INSTALL_DIR),
            entry_point: DEFAULT_ENTRY_POINT.to_string(),
            installer: DEFAULT_INSTALLER.to_string(),
            loop_delay_ms: DEFAULT_LOOP_DELAY_MS,
        }
    }
}

impl Config {
    pub fn load_from_path(path: &Path) -> Result<Self> {
        loader::load_from_path(path)
    }

    pub fn save_to_path(&self, path: &Path) -> Result<()> {
        loader::save_to_path(self, path)
    }

    pub fn path_in(data_dir: &Path) -> PathBuf {
        data_dir.join(CONFIG_FILE_NAME)
    }

    pub fn entry_point_path(&self) -> PathBuf {
        self.install_dir.join(&self.entry_point)
    }

    pub fn installer_path(&self) -> PathBuf {
        self.install_dir.join(&self.installer)
    }

    /// Where the replaced entry point is kept for post-mortem inspection.
    pub fn retired_path(&self) -> PathBuf {
        self.install_dir.join(format!("{}_OLD", self.entry_point))
    }
}

pub(crate) fn validate(cfg: &Config) -> Result<()> {
    if cfg.wlan_ssid.trim().is_empty() {
        return Err(Error::InvalidArgs("wlan_ssid must not be empty".into()));
    }
    if cfg.station_ids.is_empty() || cfg.station_ids.len() > MAX_STATIONS {
        return Err(Error::InvalidArgs(format!(
            "station_ids must list between 1 and {MAX_STATIONS} stations"
        )));
    }
    if cfg.station_labels.len() != cfg.station_ids.len() {
        return Err(Error::InvalidArgs(
            "station_labels must have one label per station id".into(),
        ));
    }
    if cfg.tankerkoenig_api_key.trim().is_empty() {
        return Err(Error::InvalidArgs(
            "tankerkoenig_api_key must not be empty".into(),
        ));
    }
    if !(-90.0..=90.0).contains(&cfg.weather_lat) {
        return Err(Error::InvalidArgs(
            "weather_lat must be between -90 and 90".into(),
        ));
    }
    if !(-180.0..=180.0).contains(&cfg.weather_long) {
        return Err(Error::InvalidArgs(
            "weather_long must be between -180 and 180".into(),
        ));
    }
    if cfg.update_hour > 23 {
        return Err(Error::InvalidArgs("update_hour must be 0-23".into()));
    }
    if !(MIN_LOOP_DELAY_MS..=MAX_LOOP_DELAY_MS).contains(&cfg.loop_delay_ms) {
        return Err(Error::InvalidArgs(format!(
            "loop_delay_ms must be between {MIN_LOOP_DELAY_MS} and {MAX_LOOP_DELAY_MS}"
        )));
    }
    if cfg.wlan_timeout_secs > MAX_WLAN_TIMEOUT_SECS {
        return Err(Error::InvalidArgs(format!(
            "wlan_timeout_secs must be at most {MAX_WLAN_TIMEOUT_SECS}"
        )));
    }
    if cfg.request_timeout_secs == 0 || cfg.request_timeout_secs > MAX_REQUEST_TIMEOUT_SECS {
        return Err(Error::InvalidArgs(format!(
            "request_timeout_secs must be between 1 and {MAX_REQUEST_TIMEOUT_SECS}"
        )));
    }
    if cfg.entry_point == cfg.installer {
        return Err(Error::InvalidArgs(
            "entry_point and installer must name different files".into(),
        ));
    }
    Ok(())
}

#[cfg(test)]
pub(crate) fn sample() -> Config {
    Config {
        wlan_ssid: "home".into(),
        wlan_psk: "secret".into(),
        weather_lat: 52.52,
        weather_long: 13.405,
        station_ids: vec!["51d4b55e-a095-1aa0-e100-80009459e03a".into()],
        station_labels: vec!["Aral".into()],
        tankerkoenig_api_key: "00000000-0000-0000-0000-000000000002".into(),
        ..Config::default()
    }
}
