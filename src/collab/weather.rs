use std::time::Duration;

use serde::Deserialize;

use super::{WeatherReport, WeatherSource};
use crate::app::Logger;
use crate::guard::{Fault, FaultKind};
use crate::schedule::Timestamp;

const FORECAST_URL: &str = "https://api.open-meteo.com/v1/forecast";

#[derive(Debug, Deserialize)]
struct Forecast {
    current: Current,
    hourly: Hourly,
    daily: Daily,
}

#[derive(Debug, Deserialize)]
struct Current {
    temperature_2m: f64,
    weather_code: u8,
    is_day: u8,
}

#[derive(Debug, Deserialize)]
struct Hourly {
    precipitation_probability: Vec<Option<u8>>,
}

#[derive(Debug, Deserialize)]
struct Daily {
    temperature_2m_min: Vec<f64>,
    temperature_2m_max: Vec<f64>,
}

/// Open-Meteo forecast client; no API key required.
pub struct OpenMeteo {
    latitude: f64,
    longitude: f64,
    base_url: String,
    client: reqwest::blocking::Client,
    logger: Logger,
}

impl OpenMeteo {
    pub fn new(latitude: f64, longitude: f64, timeout: Duration, logger: Logger) -> crate::Result<Self> {
        let client = reqwest::blocking::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            latitude,
            longitude,
            base_url: FORECAST_URL.to_string(),
            client,
            logger,
        })
    }

    fn request(&self, tz: &str) -> crate::Result<Forecast> {
        let latitude = self.latitude.to_string();
        let longitude = self.longitude.to_string();
        let forecast = self
            .client
            .get(&self.base_url)
            .query(&[
                ("latitude", latitude.as_str()),
                ("longitude", longitude.as_str()),
                ("current", "temperature_2m,weather_code,is_day"),
                ("hourly", "precipitation_probability"),
                ("daily", "temperature_2m_min,temperature_2m_max"),
                ("forecast_days", "1"),
                ("timezone", tz),
            ])
            .send()?
            .error_for_status()?
            .json()?;
        Ok(forecast)
    }
}

fn report_from(forecast: &Forecast, hour: u8) -> crate::Result<WeatherReport> {
    let low_c = forecast
        .daily
        .temperature_2m_min
        .first()
        .copied()
        .ok_or_else(|| crate::Error::Parse("forecast has no daily minimum".into()))?;
    let high_c = forecast
        .daily
        .temperature_2m_max
        .first()
        .copied()
        .ok_or_else(|| crate::Error::Parse("forecast has no daily maximum".into()))?;
    let precipitation_pct = forecast
        .hourly
        .precipitation_probability
        .get(usize::from(hour))
        .copied()
        .flatten()
        .unwrap_or(0)
        .min(100);
    Ok(WeatherReport {
        temperature_c: forecast.current.temperature_2m,
        precipitation_pct,
        low_c,
        high_c,
        icon: icon_name(forecast.current.weather_code, forecast.current.is_day != 0).to_string(),
    })
}

/// Asset key for a WMO weather interpretation code.
pub fn icon_name(code: u8, is_day: bool) -> &'static str {
    match (code, is_day) {
        (0 | 1, true) => "clear-day",
        (0 | 1, false) => "clear-night",
        (2, true) => "partly-cloudy-day",
        (2, false) => "partly-cloudy-night",
        (3, _) => "cloudy",
        (45 | 48, _) => "fog",
        (51..=57, _) => "drizzle",
        (61..=67 | 80..=82, _) => "rain",
        (71..=77 | 85 | 86, _) => "snow",
        (95..=99, _) => "thunderstorm",
        _ => "unknown",
    }
}

impl WeatherSource for OpenMeteo {
    fn fetch(&mut self, now: &Timestamp, tz: &str) -> Result<WeatherReport, Fault> {
        self.request(tz)
            .and_then(|forecast| report_from(&forecast, now.hour))
            .map_err(|err| {
                self.logger.warn(format!("weather fetch failed: {err}"));
                Fault::new(
                    FaultKind::WeatherFetch,
                    [
                        "Could not load the weather forecast.".to_string(),
                        format!("{err}"),
                    ],
                )
            })
    }
}
