use std::io::Write;
use std::str::FromStr;
use std::sync::{Arc, Mutex};
use std::time::SystemTime;

use humantime::format_rfc3339_millis;
use syslog::{Facility, Formatter3164, LoggerBackend};

use crate::{Error, Result};

/// Log verbosity levels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default)]
pub enum LogLevel {
    Error = 0,
    Warn = 1,
    #[default]
    Info = 2,
    Debug = 3,
    Trace = 4,
}

impl FromStr for LogLevel {
    type Err = ();
    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "error" => Ok(LogLevel::Error),
            "warn" | "warning" => Ok(LogLevel::Warn),
            "info" => Ok(LogLevel::Info),
            "debug" => Ok(LogLevel::Debug),
            "trace" => Ok(LogLevel::Trace),
            _ => Err(()),
        }
    }
}

type SyslogSink = syslog::Logger<LoggerBackend, Formatter3164>;

struct Sinks {
    file: Option<std::fs::File>,
    syslog: Option<SyslogSink>,
}

/// Levelled logger writing to stderr, an optional append-only file and an
/// optional local syslog. Clones share the same sinks.
#[derive(Clone)]
pub struct Logger {
    level: LogLevel,
    sinks: Arc<Mutex<Sinks>>,
}

impl Logger {
    pub fn new(level: LogLevel, file_path: Option<String>, use_syslog: bool) -> Result<Self> {
        let env_level = std::env::var("FUELBOARD_LOG_LEVEL")
            .ok()
            .and_then(|s| LogLevel::from_str(&s).ok());
        let effective_level = env_level.unwrap_or(level);

        let env_file = std::env::var("FUELBOARD_LOG_PATH").ok();
        let file = match file_path.or(env_file) {
            Some(path) => Some(
                std::fs::OpenOptions::new()
                    .create(true)
                    .append(true)
                    .open(path)?,
            ),
            None => None,
        };

        let syslog = if use_syslog {
            let formatter = Formatter3164 {
                facility: Facility::LOG_DAEMON,
                hostname: None,
                process: "fuelboard".into(),
                pid: std::process::id(),
            };
            Some(syslog::unix(formatter).map_err(|e| {
                Error::Io(std::io::Error::other(format!("syslog unavailable: {e}")))
            })?)
        } else {
            None
        };

        Ok(Self {
            level: effective_level,
            sinks: Arc::new(Mutex::new(Sinks { file, syslog })),
        })
    }

    /// Stderr-only logger at the given level.
    pub fn stderr(level: LogLevel) -> Self {
        Self {
            level,
            sinks: Arc::new(Mutex::new(Sinks {
                file: None,
                syslog: None,
            })),
        }
    }

    pub fn level(&self) -> LogLevel {
        self.level
    }

    pub fn log(&self, level: LogLevel, msg: impl AsRef<str>) {
        if level > self.level {
            return;
        }
        let msg = msg.as_ref();
        let ts = format_rfc3339_millis(SystemTime::now());
        let line = format!("[{ts}] [{level:?}] {msg}");
        eprintln!("{line}");
        let Ok(mut sinks) = self.sinks.lock() else {
            return;
        };
        if let Some(file) = sinks.file.as_mut() {
            let _ = writeln!(file, "{line}");
        }
        if let Some(syslog) = sinks.syslog.as_mut() {
            let _ = match level {
                LogLevel::Error => syslog.err(msg),
                LogLevel::Warn => syslog.warning(msg),
                LogLevel::Info => syslog.info(msg),
                LogLevel::Debug | LogLevel::Trace => syslog.debug(msg),
            };
        }
    }

    pub fn error(&self, msg: impl AsRef<str>) {
        self.log(LogLevel::Error, msg);
    }

    pub fn warn(&self, msg: impl AsRef<str>) {
        self.log(LogLevel::Warn, msg);
    }

    pub fn info(&self, msg: impl AsRef<str>) {
        self.log(LogLevel::Info, msg);
    }

    pub fn debug(&self, msg: impl AsRef<str>) {
        self.log(LogLevel::Debug, msg);
    }

    #[allow(dead_code)]
    pub fn trace(&self, msg: impl AsRef<str>) {
        self.log(LogLevel::Trace, msg);
    }
}
