use crate::app::Logger;
use crate::guard::Restart;

/// Exit status used in `exit` mode so the service manager can tell a
/// requested restart apart from a crash.
pub const RESTART_EXIT_CODE: i32 = 75;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RestartMode {
    /// Reboot the board.
    #[default]
    Reboot,
    /// Exit the process and let the service manager start it again.
    Exit,
}

impl RestartMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            RestartMode::Reboot => "reboot",
            RestartMode::Exit => "exit",
        }
    }
}

impl std::fmt::Display for RestartMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for RestartMode {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "reboot" => Ok(RestartMode::Reboot),
            "exit" => Ok(RestartMode::Exit),
            _ => Err("expected 'reboot' or 'exit'".into()),
        }
    }
}

pub struct SystemRestart {
    mode: RestartMode,
    logger: Logger,
}

impl SystemRestart {
    pub fn new(mode: RestartMode, logger: Logger) -> Self {
        Self { mode, logger }
    }
}

impl Restart for SystemRestart {
    fn restart(&mut self) -> ! {
        rustix::fs::sync();
        if self.mode == RestartMode::Reboot {
            reboot_board(&self.logger);
        }
        std::process::exit(RESTART_EXIT_CODE)
    }
}

/// Returns only when the kernel refused the reboot.
#[cfg(target_os = "linux")]
fn reboot_board(logger: &Logger) {
    use rustix::system::{reboot, RebootCommand};

    match reboot(RebootCommand::Restart) {
        Ok(()) => loop {
            // The kernel is tearing the system down.
            std::thread::sleep(std::time::Duration::from_secs(1));
        },
        Err(err) => {
            logger.error(format!("reboot refused ({err}); exiting for the service manager"));
        }
    }
}

#[cfg(not(target_os = "linux"))]
fn reboot_board(logger: &Logger) {
    logger.warn("reboot unsupported on this platform; exiting for the service manager");
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mode_round_trips_through_text() {
        for mode in [RestartMode::Reboot, RestartMode::Exit] {
            assert_eq!(mode.to_string().parse::<RestartMode>(), Ok(mode));
        }
        assert!("halt".parse::<RestartMode>().is_err());
    }
}
