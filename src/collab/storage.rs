use std::{
    fs, io,
    path::{Path, PathBuf},
};

use super::Storage;
use crate::app::Logger;
use crate::config::Config;
use crate::guard::{wrap_lines, Closable, ErrorSignal, Fault, FaultKind};
use crate::{Error, DISPLAY_COLS};

pub const ASSETS_DIR_NAME: &str = "assets";

/// Data volume holding `config.toml` and the image assets; the board's
/// equivalent of the SD card.
pub struct DataVolume {
    root: PathBuf,
    opened: bool,
    logger: Logger,
}

impl DataVolume {
    pub fn new(root: impl Into<PathBuf>, logger: Logger) -> Self {
        Self {
            root: root.into(),
            opened: false,
            logger,
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn config_path(&self) -> PathBuf {
        Config::path_in(&self.root)
    }

    pub fn assets_dir(&self) -> PathBuf {
        self.root.join(ASSETS_DIR_NAME)
    }
}

impl Closable for DataVolume {
    fn name(&self) -> &str {
        "data volume"
    }

    fn close(&mut self) {
        if self.opened {
            self.opened = false;
            rustix::fs::sync();
            self.logger
                .debug(format!("data volume {} flushed", self.root.display()));
        }
    }
}

impl Storage for DataVolume {
    fn open(&mut self) -> ErrorSignal {
        match fs::read_dir(&self.root) {
            Ok(_) => {
                self.opened = true;
                Ok(())
            }
            Err(err) if err.kind() == io::ErrorKind::NotFound => Err(Fault::new(
                FaultKind::StorageUnavailable,
                [
                    "The data volume could not be found.".to_string(),
                    format!("Expected at {}", self.root.display()),
                ],
            )),
            Err(err) => Err(Fault::new(
                FaultKind::StorageUnreadable,
                [
                    "The data volume could not be read.".to_string(),
                    err.to_string(),
                ],
            )),
        }
    }

    fn load_config(&mut self) -> Result<Config, Fault> {
        let path = self.config_path();
        if !path.is_file() {
            return Err(Fault::new(
                FaultKind::ConfigMissing,
                [
                    "The configuration file is missing.".to_string(),
                    format!("Expected {}", path.display()),
                ],
            ));
        }
        if !self.assets_dir().is_dir() {
            return Err(Fault::new(
                FaultKind::AssetsMissing,
                [
                    "The image assets are missing.".to_string(),
                    format!("Expected {}", self.assets_dir().display()),
                ],
            ));
        }
        Config::load_from_path(&path).map_err(|err| match err {
            Error::InvalidArgs(msg) => {
                let mut lines = vec!["The configuration is invalid:".to_string()];
                lines.extend(wrap_lines(&msg, DISPLAY_COLS));
                Fault::new(FaultKind::ConfigInvalid, lines)
            }
            other => Fault::with_message(FaultKind::StorageUnreadable, other.to_string()),
        })
    }
}
