use std::{fs, path::Path};

use crate::{Error, Result};

use super::Config;

pub fn load_from_path(path: &Path) -> Result<Config> {
    let raw = fs::read_to_string(path)?;
    parse(&raw)
}

pub fn save_to_path(config: &Config, path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }

    let contents = format!(
        "# fuelboard config\n\
wlan_ssid = \"{}\"\n\
wlan_psk = \"{}\"\n\
wlan_interface = \"{}\"\n\
wlan_timeout_secs = {}\n\
request_timeout_secs = {}\n\
connectivity_probe = \"{}\"\n\
weather_lat = {}\n\
weather_long = {}\n\
station_ids = {}\n\
station_labels = {}\n\
fuel_type = \"{}\"\n\
tankerkoenig_api_key = \"{}\"\n\
automatic_updates = {}\n\
update_hour = {}\n\
update_manifest_url = \"{}\"\n\
install_dir = \"{}\"\n\
entry_point = \"{}\"\n\
installer = \"{}\"\n\
loop_delay_ms = {}\n",
        config.wlan_ssid,
        config.wlan_psk,
        config.wlan_interface,
        config.wlan_timeout_secs,
        config.request_timeout_secs,
        config.connectivity_probe,
        config.weather_lat,
        config.weather_long,
        format_string_array(&config.station_ids),
        format_string_array(&config.station_labels),
        config.fuel_type,
        config.tankerkoenig_api_key,
        config.automatic_updates,
        config.update_hour,
        config.update_manifest_url,
        config.install_dir.display(),
        config.entry_point,
        config.installer,
        config.loop_delay_ms,
    );
    fs::write(path, contents)?;
    Ok(())
}

pub fn parse(raw: &str) -> Result<Config> {
    let mut cfg = Config::default();

    for (idx, line) in raw.lines().enumerate() {
        let trimmed = line.trim();
        if trimmed.is_empty() || trimmed.starts_with('#') {
            continue;
        }

        let (key, value) = trimmed.split_once('=').ok_or_else(|| {
            Error::InvalidArgs(format!("invalid config line {}: '{}'", idx + 1, line))
        })?;

        let key = key.trim();
        let raw_value = value.trim();
        let value = raw_value.trim_matches('"');
        let line_no = idx + 1;
        match key {
            "wlan_ssid" => cfg.wlan_ssid = value.to_string(),
            "wlan_psk" => cfg.wlan_psk = value.to_string(),
            "wlan_interface" => cfg.wlan_interface = value.to_string(),
            "wlan_timeout_secs" => cfg.wlan_timeout_secs = parse_number(key, value, line_no)?,
            "request_timeout_secs" => {
                cfg.request_timeout_secs = parse_number(key, value, line_no)?;
            }
            "connectivity_probe" => cfg.connectivity_probe = value.to_string(),
            "weather_lat" => cfg.weather_lat = parse_number(key, value, line_no)?,
            "weather_long" => cfg.weather_long = parse_number(key, value, line_no)?,
            "station_ids" => {
                cfg.station_ids = parse_string_array(raw_value).map_err(|e| {
                    Error::InvalidArgs(format!("invalid station_ids on line {line_no}: {e}"))
                })?;
            }
            "station_labels" => {
                cfg.station_labels = parse_string_array(raw_value).map_err(|e| {
                    Error::InvalidArgs(format!("invalid station_labels on line {line_no}: {e}"))
                })?;
            }
            "fuel_type" => {
                cfg.fuel_type = value.parse().map_err(|e: String| {
                    Error::InvalidArgs(format!("invalid fuel_type on line {line_no}: {e}"))
                })?;
            }
            "tankerkoenig_api_key" => cfg.tankerkoenig_api_key = value.to_string(),
            "automatic_updates" => {
                cfg.automatic_updates = parse_bool(value).ok_or_else(|| {
                    Error::InvalidArgs(format!("invalid automatic_updates on line {line_no}"))
                })?;
            }
            "update_hour" => cfg.update_hour = parse_number(key, value, line_no)?,
            "update_manifest_url" => cfg.update_manifest_url = value.to_string(),
            "install_dir" => cfg.install_dir = value.into(),
            "entry_point" => cfg.entry_point = value.to_string(),
            "installer" => cfg.installer = value.to_string(),
            "loop_delay_ms" => cfg.loop_delay_ms = parse_number(key, value, line_no)?,
            other => {
                return Err(Error::InvalidArgs(format!(
                    "unknown config key '{other}' on line {line_no}"
                )));
            }
        }
    }

    super::validate(&cfg)?;
    Ok(cfg)
}

fn parse_number<T: std::str::FromStr>(key: &str, value: &str, line_no: usize) -> Result<T> {
    value
        .parse()
        .map_err(|_| Error::InvalidArgs(format!("invalid {key} value on line {line_no}")))
}

fn parse_bool(value: &str) -> Option<bool> {
    match value.to_ascii_lowercase().as_str() {
        "true" | "yes" | "on" | "1" => Some(true),
        "false" | "no" | "off" | "0" => Some(false),
        _ => None,
    }
}

fn parse_string_array(value: &str) -> std::result::Result<Vec<String>, String> {
    let trimmed = value.trim();
    if !trimmed.starts_with('[') || !trimmed.ends_with(']') {
        return Err("expected array literal (e.g., [\"id-1\", \"id-2\"])".into());
    }
    let inner = &trimmed[1..trimmed.len() - 1];
    if inner.trim().is_empty() {
        return Ok(Vec::new());
    }
    let mut entries = Vec::new();
    for part in inner.split(',') {
        let item = part.trim();
        if item.is_empty() {
            continue;
        }
        let cleaned = if item.len() >= 2
            && ((item.starts_with('"') && item.ends_with('"'))
                || (item.starts_with('\'') && item.ends_with('\'')))
        {
            &item[1..item.len() - 1]
        } else {
            item
        };
        let cleaned = cleaned.trim();
        if cleaned.is_empty() {
            return Err("entries must not be empty".into());
        }
        entries.push(cleaned.to_string());
    }
    Ok(entries)
}

fn format_string_array(values: &[String]) -> String {
    if values.is_empty() {
        return "[]".into();
    }
    let quoted = values
        .iter()
        .map(|value| format!("\"{}\"", value.replace('"', "")))
        .collect::<Vec<_>>()
        .join(", ");
    format!("[{quoted}]")
}
