use std::path::PathBuf;

use chrono::{DateTime, Datelike, Local, TimeZone, Timelike};

use super::Clock;
use crate::app::Logger;
use crate::guard::{ErrorSignal, Fault, FaultKind};
use crate::schedule::Timestamp;

const TIMESYNC_MARKER: &str = "/run/systemd/timesync/synchronized";
const TIMEZONE_FILE: &str = "/etc/timezone";
/// Anything earlier means the RTC-less board has not been synchronised yet.
const EARLIEST_PLAUSIBLE_YEAR: i32 = 2024;

impl<Tz: TimeZone> From<DateTime<Tz>> for Timestamp {
    fn from(value: DateTime<Tz>) -> Self {
        Timestamp {
            year: value.year(),
            month: value.month() as u8,
            day: value.day() as u8,
            hour: value.hour() as u8,
            minute: value.minute() as u8,
            second: value.second() as u8,
            weekday: value.weekday().num_days_from_monday() as u8,
        }
    }
}

/// Wall clock of the host. NTP itself is run by the OS; `sync` only
/// confirms that it has happened.
pub struct SystemClock {
    logger: Logger,
    sync_marker: PathBuf,
    tz: Option<String>,
}

impl SystemClock {
    pub fn new(logger: Logger) -> Self {
        Self {
            logger,
            sync_marker: PathBuf::from(TIMESYNC_MARKER),
            tz: None,
        }
    }
}

impl Clock for SystemClock {
    fn now(&self) -> Timestamp {
        Local::now().into()
    }

    fn sync(&mut self) -> ErrorSignal {
        if self.sync_marker.exists() {
            return Ok(());
        }
        let year = Local::now().year();
        if year >= EARLIEST_PLAUSIBLE_YEAR {
            self.logger
                .debug("timesync marker absent; clock reading is plausible");
            return Ok(());
        }
        Err(Fault::new(
            FaultKind::ClockSync,
            [
                "Time synchronization failed.".to_string(),
                format!("The clock reads year {year}."),
            ],
        ))
    }

    fn set_timezone(&mut self) {
        let tz = std::env::var("TZ")
            .ok()
            .filter(|tz| !tz.trim().is_empty())
            .or_else(|| {
                std::fs::read_to_string(TIMEZONE_FILE)
                    .ok()
                    .map(|raw| raw.trim().to_string())
                    .filter(|tz| !tz.is_empty())
            });
        match tz {
            Some(tz) => {
                if self.tz.as_deref() != Some(tz.as_str()) {
                    self.logger.info(format!("timezone {tz}"));
                }
                self.tz = Some(tz);
            }
            None => self.logger.warn("timezone unknown; using local offset"),
        }
    }

    fn timezone_set(&self) -> bool {
        self.tz.is_some()
    }

    fn tz_identifier(&self) -> String {
        self.tz.clone().unwrap_or_else(|| "auto".to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{FixedOffset, TimeZone};

    #[test]
    fn timestamp_from_datetime() {
        let offset = FixedOffset::east_opt(3600).unwrap();
        let dt = offset.with_ymd_and_hms(2025, 3, 30, 2, 59, 7).unwrap();
        let ts = Timestamp::from(dt);
        assert_eq!(ts.year, 2025);
        assert_eq!(ts.month, 3);
        assert_eq!(ts.day, 30);
        assert_eq!(ts.hour, 2);
        assert_eq!(ts.minute, 59);
        assert_eq!(ts.second, 7);
        assert_eq!(ts.weekday, 6);
    }

    #[test]
    fn timezone_unset_until_requested() {
        let clock = SystemClock::new(Logger::stderr(crate::app::LogLevel::Error));
        assert!(!clock.timezone_set());
        assert_eq!(clock.tz_identifier(), "auto");
    }
}
