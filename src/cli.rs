use std::path::PathBuf;

use crate::collab::RestartMode;
use crate::{Error, Result};

/// Options for the `run` command; values are `None` when not provided on CLI.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct RunOptions {
    pub data_dir: Option<PathBuf>,
    pub log_level: Option<String>,
    pub log_file: Option<String>,
    pub syslog: bool,
    pub touch_pin: Option<u8>,
    pub no_touch: bool,
    pub restart_mode: Option<RestartMode>,
    pub frame_file: Option<PathBuf>,
}

/// Parsed command-line intent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Run(RunOptions),
    InitConfig { data_dir: Option<PathBuf>, force: bool },
    ShowHelp,
    ShowVersion,
}

impl Command {
    pub fn parse(args: &[String]) -> Result<Self> {
        if args.is_empty() {
            return Ok(Command::Run(RunOptions::default()));
        }

        let mut iter = args.iter();
        match iter.next().map(|s| s.as_str()) {
            Some("run") => Ok(Command::Run(parse_run_options(&mut iter)?)),
            Some("init-config") => parse_init_config(&mut iter),
            Some("--help") | Some("-h") => Ok(Command::ShowHelp),
            Some("--version") | Some("-V") => Ok(Command::ShowVersion),
            Some(flag) if flag.starts_with('-') => {
                // Allow omitting the explicit `run` subcommand: pass the consumed flag plus the
                // remaining args into the run parser.
                let mut flags: Vec<String> = Vec::with_capacity(args.len());
                flags.push(flag.to_string());
                flags.extend(iter.map(|s| s.to_string()));
                let mut iter = flags.iter();
                Ok(Command::Run(parse_run_options(&mut iter)?))
            }
            Some(cmd) => Err(Error::InvalidArgs(format!(
                "unknown command '{cmd}', try --help"
            ))),
            None => Ok(Command::Run(RunOptions::default())),
        }
    }

    pub fn help() -> &'static str {
        concat!(
            "fuelboard - weather and fuel price dashboard\n",
            "\n",
            "USAGE:\n",
            "  fuelboard run [--data-dir <path>] [--log-level <level>] [--log-file <path>] [--syslog]\n",
            "                [--touch-pin <bcm>] [--no-touch] [--restart-mode reboot|exit] [--frame-file <path>]\n",
            "  fuelboard init-config [--data-dir <path>] [--force]\n",
            "  fuelboard --help\n",
            "  fuelboard --version\n",
            "\n",
            "OPTIONS:\n",
            "  --data-dir <path>      Data volume with config.toml and assets (default: /var/lib/fuelboard)\n",
            "  --log-level <level>    error, warn, info, debug or trace (default: info)\n",
            "  --log-file <path>      Append log lines to this file\n",
            "  --syslog               Also log to the local syslog daemon\n",
            "  --touch-pin <bcm>      GPIO wired to the touch controller interrupt (default: 17)\n",
            "  --no-touch             Run without touch input\n",
            "  --restart-mode <mode>  reboot the board or exit for the service manager (default: reboot)\n",
            "  --frame-file <path>    Where the current screen is mirrored as JSON\n",
            "  --force                Overwrite an existing config.toml\n",
            "  -h, --help             Show this help\n",
            "  -V, --version          Show version\n",
        )
    }

    pub fn print_help() {
        println!("{}", Self::help());
    }
}

fn parse_run_options(iter: &mut std::slice::Iter<String>) -> Result<RunOptions> {
    let mut opts = RunOptions::default();

    while let Some(flag) = iter.next() {
        match flag.as_str() {
            "--data-dir" => {
                opts.data_dir = Some(take_value(flag, iter)?.into());
            }
            "--log-level" => {
                opts.log_level = Some(take_value(flag, iter)?);
            }
            "--log-file" => {
                opts.log_file = Some(take_value(flag, iter)?);
            }
            "--syslog" => opts.syslog = true,
            "--touch-pin" => {
                let raw = take_value(flag, iter)?;
                opts.touch_pin = Some(raw.parse().map_err(|_| {
                    Error::InvalidArgs("touch-pin must be a GPIO number (0-255)".to_string())
                })?);
            }
            "--no-touch" => opts.no_touch = true,
            "--restart-mode" => {
                let raw = take_value(flag, iter)?;
                opts.restart_mode = Some(raw.parse().map_err(|e: String| {
                    Error::InvalidArgs(format!("invalid restart-mode: {e}"))
                })?);
            }
            "--frame-file" => {
                opts.frame_file = Some(take_value(flag, iter)?.into());
            }
            other => {
                return Err(Error::InvalidArgs(format!(
                    "unknown flag '{other}', try --help"
                )));
            }
        }
    }

    Ok(opts)
}

fn parse_init_config(iter: &mut std::slice::Iter<String>) -> Result<Command> {
    let mut data_dir = None;
    let mut force = false;
    while let Some(flag) = iter.next() {
        match flag.as_str() {
            "--data-dir" => data_dir = Some(take_value(flag, iter)?.into()),
            "--force" => force = true,
            other => {
                return Err(Error::InvalidArgs(format!(
                    "unknown flag '{other}', try --help"
                )));
            }
        }
    }
    Ok(Command::InitConfig { data_dir, force })
}

fn take_value(flag: &str, iter: &mut std::slice::Iter<String>) -> Result<String> {
    iter.next()
        .cloned()
        .ok_or_else(|| Error::InvalidArgs(format!("expected a value after {flag}")))
}
