use std::{
    collections::BTreeMap,
    fs,
    path::{Path, PathBuf},
    time::SystemTime,
};

use crc32fast::Hasher;
use serde::Serialize;

use super::{Image, MainLayout, Presenter, StationPrice, VersionId, WeatherReport};
use crate::app::Logger;
use crate::guard::{wrap_lines, Fault};
use crate::schedule::Timestamp;
use crate::DISPLAY_COLS;

const WEEKDAYS: [&str; 7] = [
    "Monday",
    "Tuesday",
    "Wednesday",
    "Thursday",
    "Friday",
    "Saturday",
    "Sunday",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Screen {
    #[default]
    Blank,
    Waiting,
    Wlan,
    Error,
    Update,
    Dashboard,
    Offline,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Region {
    pub lines: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image: Option<PathBuf>,
}

impl Region {
    fn text<I, S>(lines: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            lines: lines.into_iter().map(Into::into).collect(),
            image: None,
        }
    }

    fn with_image(mut self, image: Option<&Image>) -> Self {
        self.image = image.map(|img| img.path.clone());
        self
    }
}

/// Everything currently on the panel, keyed by region name.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Frame {
    pub screen: Screen,
    pub regions: BTreeMap<String, Region>,
}

#[derive(Serialize)]
struct FrameRecord<'a> {
    written_at: String,
    crc: u32,
    #[serde(flatten)]
    frame: &'a Frame,
}

/// Text rendition of the dashboard. Keeps a model of the panel, logs every
/// changed frame and mirrors it as JSON for an external panel driver.
pub struct TextPresenter {
    frame: Frame,
    frame_path: Option<PathBuf>,
    last_crc: Option<u32>,
    weather_icon: Option<PathBuf>,
    logger: Logger,
}

impl TextPresenter {
    pub fn new(frame_path: Option<PathBuf>, logger: Logger) -> Self {
        Self {
            frame: Frame::default(),
            frame_path,
            last_crc: None,
            weather_icon: None,
            logger,
        }
    }

    pub fn frame(&self) -> &Frame {
        &self.frame
    }

    fn show(&mut self, screen: Screen) {
        if self.frame.screen != screen {
            self.frame.screen = screen;
            self.frame.regions.clear();
            self.weather_icon = None;
        }
    }

    fn set(&mut self, name: &str, region: Region) {
        self.frame.regions.insert(name.to_string(), region);
        self.flush();
    }

    fn flush(&mut self) {
        let body = match serde_json::to_string(&self.frame) {
            Ok(body) => body,
            Err(err) => {
                self.logger.warn(format!("frame encode failed: {err}"));
                return;
            }
        };
        let crc = checksum(&body);
        if self.last_crc == Some(crc) {
            return;
        }
        self.last_crc = Some(crc);
        self.logger.debug(format!("frame {crc:08x}: {body}"));

        if let Some(path) = self.frame_path.clone() {
            let record = FrameRecord {
                written_at: humantime::format_rfc3339_seconds(SystemTime::now()).to_string(),
                crc,
                frame: &self.frame,
            };
            if let Err(err) = write_record(&path, &record) {
                self.logger
                    .warn(format!("frame file {} not written: {err}", path.display()));
            }
        }
    }
}

fn write_record(path: &Path, record: &FrameRecord<'_>) -> crate::Result<()> {
    let encoded = serde_json::to_vec_pretty(record)?;
    let mut tmp = path.as_os_str().to_owned();
    tmp.push(".tmp");
    let tmp = PathBuf::from(tmp);
    fs::write(&tmp, encoded)?;
    fs::rename(&tmp, path)?;
    Ok(())
}

fn checksum(raw: &str) -> u32 {
    let mut hasher = Hasher::new();
    hasher.update(raw.as_bytes());
    hasher.finalize()
}

fn format_price(price: Option<f64>) -> String {
    match price {
        Some(value) => format!("{value:.2}"),
        None => "-.--".to_string(),
    }
}

impl Presenter for TextPresenter {
    fn draw_waiting_screen(&mut self) {
        self.show(Screen::Waiting);
        self.set("message", Region::text(["Please wait..."]));
    }

    fn draw_waiting_for_wlan(&mut self, icon: Option<&Image>, ssid: &str) {
        self.show(Screen::Wlan);
        self.set(
            "message",
            Region::text(["Connecting to WLAN".to_string(), ssid.to_string()]).with_image(icon),
        );
    }

    fn draw_wlan_countdown(&mut self, remaining_secs: u32) {
        self.set("countdown", Region::text([format!("{remaining_secs} s")]));
    }

    fn draw_error(&mut self, fault: &Fault, qr_code: Option<&Image>) {
        self.show(Screen::Error);
        self.frame.regions.clear();
        let mut lines = vec![format!("Error {}", fault.code())];
        for line in fault.lines() {
            lines.extend(wrap_lines(line, DISPLAY_COLS));
        }
        if fault.user_recoverable() {
            lines.push("Touch the screen to restart.".to_string());
        }
        self.set("error", Region::text(lines).with_image(qr_code));
    }

    fn draw_update_screen(&mut self, icon: Option<&Image>, current: &VersionId, latest: &VersionId) {
        self.show(Screen::Update);
        self.set(
            "update",
            Region::text([
                "Updating fuelboard".to_string(),
                format!("{current} -> {latest}"),
            ])
            .with_image(icon),
        );
    }

    fn draw_update_action(&mut self, action: &str) {
        self.set("action", Region::text([action]));
    }

    fn draw_main_layout(&mut self, layout: &MainLayout) {
        self.show(Screen::Dashboard);
        for (idx, label) in layout.station_labels.iter().enumerate() {
            let icon = layout.station_icons.get(idx).and_then(Option::as_ref);
            self.frame.regions.insert(
                format!("station.{idx}.label"),
                Region::text([label.as_str()]).with_image(icon),
            );
        }
        let symbols: Vec<PathBuf> = layout
            .symbol_icons
            .iter()
            .flatten()
            .map(|img| img.path.clone())
            .collect();
        self.frame.regions.insert(
            "symbols".to_string(),
            Region {
                lines: symbols.iter().map(|p| p.display().to_string()).collect(),
                image: None,
            },
        );
        self.set(
            "fuel_type",
            Region::text([layout.fuel_type.as_str().to_ascii_uppercase()]),
        );
    }

    fn draw_date_time(&mut self, now: &Timestamp) {
        let weekday = WEEKDAYS
            .get(usize::from(now.weekday))
            .copied()
            .unwrap_or("?");
        self.set(
            "date_time",
            Region::text([
                weekday.to_string(),
                format!("{:02}.{:02}.{:04}", now.day, now.month, now.year),
                format!("{:02}:{:02}", now.hour, now.minute),
            ]),
        );
    }

    fn draw_weather(&mut self, report: &WeatherReport, icon: Option<&Image>) {
        if let Some(icon) = icon {
            self.weather_icon = Some(icon.path.clone());
        }
        let region = Region {
            lines: vec![
                format!("{:.1} C", report.temperature_c),
                format!("{} %", report.precipitation_pct),
                format!("{:.1} C", report.low_c),
                format!("{:.1} C", report.high_c),
                report.icon.clone(),
            ],
            image: self.weather_icon.clone(),
        };
        self.set("weather", region);
    }

    fn draw_stations(&mut self, prices: &[StationPrice]) {
        for (idx, station) in prices.iter().enumerate() {
            let line = if station.open {
                format_price(station.price)
            } else {
                "closed".to_string()
            };
            self.frame
                .regions
                .insert(format!("station.{idx}.price"), Region::text([line]));
        }
        self.flush();
    }

    fn draw_offline(&mut self) {
        self.show(Screen::Offline);
        self.set("message", Region::text(["offline"]));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app::LogLevel;
    use crate::collab::AssetCategory;
    use crate::guard::FaultKind;

    fn presenter(path: Option<PathBuf>) -> TextPresenter {
        TextPresenter::new(path, Logger::stderr(LogLevel::Error))
    }

    fn image(key: &str) -> Image {
        Image {
            category: AssetCategory::Weather,
            key: key.into(),
            path: PathBuf::from(format!("/assets/weather/{key}.bmp")),
        }
    }

    fn report(icon: &str) -> WeatherReport {
        WeatherReport {
            temperature_c: 11.5,
            precipitation_pct: 40,
            low_c: 7.0,
            high_c: 14.2,
            icon: icon.into(),
        }
    }

    #[test]
    fn weather_keeps_icon_when_none_passed() {
        let mut p = presenter(None);
        p.draw_main_layout(&MainLayout {
            station_icons: Vec::new(),
            symbol_icons: Vec::new(),
            station_labels: vec!["Aral".into()],
            fuel_type: crate::config::FuelType::E10,
        });
        p.draw_weather(&report("cloudy"), Some(&image("cloudy")));
        p.draw_weather(&report("cloudy"), None);
        let region = &p.frame().regions["weather"];
        assert_eq!(
            region.image.as_deref(),
            Some(Path::new("/assets/weather/cloudy.bmp"))
        );
    }

    #[test]
    fn error_screen_wraps_and_prompts_for_touch() {
        let mut p = presenter(None);
        let fault = Fault::new(FaultKind::ConfigMissing, ["x".repeat(50)]);
        p.draw_error(&fault, None);
        let lines = &p.frame().regions["error"].lines;
        assert_eq!(lines[0], "Error 101");
        assert_eq!(lines[1].chars().count(), DISPLAY_COLS);
        assert_eq!(lines.last().unwrap(), "Touch the screen to restart.");
    }

    #[test]
    fn mirrors_changed_frames_only() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("frame.json");
        let mut p = presenter(Some(path.clone()));

        p.draw_waiting_screen();
        let first = fs::read_to_string(&path).unwrap();
        assert!(first.contains("\"screen\": \"waiting\""));

        fs::remove_file(&path).unwrap();
        p.draw_waiting_screen();
        assert!(!path.exists(), "identical frame must not be rewritten");

        p.draw_offline();
        assert!(fs::read_to_string(&path).unwrap().contains("offline"));
    }

    #[test]
    fn closed_station_is_labelled() {
        let mut p = presenter(None);
        p.draw_stations(&[
            StationPrice {
                id: "a".into(),
                open: true,
                price: Some(1.789),
            },
            StationPrice {
                id: "b".into(),
                open: false,
                price: None,
            },
        ]);
        assert_eq!(p.frame().regions["station.0.price"].lines, vec!["1.79"]);
        assert_eq!(p.frame().regions["station.1.price"].lines, vec!["closed"]);
    }
}
