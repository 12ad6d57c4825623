use std::{
    fs, io,
    net::{SocketAddr, TcpStream, ToSocketAddrs},
    path::{Path, PathBuf},
    process,
};

use super::{Network, WlanSettings};
use crate::app::Logger;
use crate::guard::{Closable, ErrorSignal, Fault, FaultKind};

const SUPPLICANT_DIR: &str = "/etc/wpa_supplicant";

/// WLAN session on a Linux interface. `connect` writes the network block for
/// wpa_supplicant and asks it to reload; association is read back from sysfs.
pub struct WlanLink {
    settings: WlanSettings,
    connected: bool,
    sysfs_root: PathBuf,
    supplicant_dir: PathBuf,
    reload: bool,
    logger: Logger,
}

impl WlanLink {
    pub fn new(logger: Logger) -> Self {
        Self {
            settings: WlanSettings::default(),
            connected: false,
            sysfs_root: PathBuf::from("/sys/class/net"),
            supplicant_dir: PathBuf::from(SUPPLICANT_DIR),
            reload: true,
            logger,
        }
    }

    /// Write supplicant configs under `dir` and skip the reload (tests).
    pub fn with_supplicant_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.supplicant_dir = dir.into();
        self.reload = false;
        self
    }

    /// `wpa_supplicant-<iface>.conf`, as read by `wpa_supplicant@<iface>.service`.
    pub fn supplicant_conf(&self) -> PathBuf {
        self.supplicant_dir
            .join(format!("wpa_supplicant-{}.conf", self.settings.interface))
    }

    fn reload_supplicant(&self) {
        let result = process::Command::new("wpa_cli")
            .args(["-i", &self.settings.interface, "reconfigure"])
            .output();
        match result {
            Ok(out) if out.status.success() => {
                self.logger.debug("wpa_supplicant reconfigured");
            }
            Ok(out) => self.logger.warn(format!(
                "wpa_cli reconfigure failed: {}",
                String::from_utf8_lossy(&out.stderr).trim()
            )),
            Err(err) => self.logger.warn(format!("wpa_cli unavailable: {err}")),
        }
    }

    /// Point the link at a different sysfs tree (tests).
    pub fn with_sysfs_root(mut self, root: impl Into<PathBuf>) -> Self {
        self.sysfs_root = root.into();
        self
    }

    fn operstate(&self) -> Option<String> {
        let path = self
            .sysfs_root
            .join(&self.settings.interface)
            .join("operstate");
        fs::read_to_string(path)
            .ok()
            .map(|raw| raw.trim().to_ascii_lowercase())
    }

    fn probe_addr(&self) -> Option<SocketAddr> {
        self.settings.probe.to_socket_addrs().ok()?.next()
    }
}

impl Closable for WlanLink {
    fn name(&self) -> &str {
        "wlan"
    }

    fn close(&mut self) {
        if std::mem::replace(&mut self.connected, false) {
            self.logger.debug(format!(
                "wlan session to '{}' on {} closed",
                self.settings.ssid, self.settings.interface
            ));
        }
    }
}

impl Network for WlanLink {
    fn connect(&mut self, settings: &WlanSettings) {
        self.settings = settings.clone();
        self.connected = true;
        let conf = self.supplicant_conf();
        match write_supplicant_conf(&conf, &self.settings) {
            Ok(true) => {
                self.logger
                    .info(format!("wrote network block to {}", conf.display()));
                if self.reload {
                    self.reload_supplicant();
                }
            }
            Ok(false) => {}
            Err(err) => self.logger.warn(format!(
                "could not write {}: {err}; using the existing supplicant setup",
                conf.display()
            )),
        }
        self.logger.info(format!(
            "waiting for {} to join '{}'",
            self.settings.interface, self.settings.ssid
        ));
    }

    fn associated(&mut self) -> bool {
        self.operstate().as_deref() == Some("up")
    }

    fn is_associated(&mut self) -> ErrorSignal {
        if self.associated() {
            return Ok(());
        }
        let state = self.operstate().unwrap_or_else(|| "missing".into());
        Err(Fault::new(
            FaultKind::WlanNotAssociated,
            [
                "Could not connect to the WLAN.".to_string(),
                format!(
                    "SSID '{}', {} is {state}.",
                    self.settings.ssid, self.settings.interface
                ),
                "Please check the SSID and password.".to_string(),
            ],
        ))
    }

    fn has_internet(&mut self) -> ErrorSignal {
        let reachable = self
            .probe_addr()
            .map(|addr| TcpStream::connect_timeout(&addr, self.settings.timeout).is_ok())
            .unwrap_or(false);
        if reachable {
            return Ok(());
        }
        Err(Fault::new(
            FaultKind::Offline,
            [
                "The device is not online.".to_string(),
                format!("{} could not be reached.", self.settings.probe),
            ],
        ))
    }
}

/// Supplicant config with a single network. The SSID is hex encoded so any
/// byte is accepted; an empty psk selects an open network.
pub fn network_block(settings: &WlanSettings) -> String {
    let mut conf = String::from("ctrl_interface=DIR=/run/wpa_supplicant GROUP=netdev\n");
    conf.push_str("update_config=0\n\nnetwork={\n");
    conf.push_str(&format!("\tssid={}\n", hex::encode(settings.ssid.as_bytes())));
    if settings.psk.is_empty() {
        conf.push_str("\tkey_mgmt=NONE\n");
    } else {
        conf.push_str(&format!("\tpsk=\"{}\"\n", settings.psk));
    }
    conf.push_str("}\n");
    conf
}

/// Write the network block when it differs from what is on disk. Returns
/// whether the file changed.
pub fn write_supplicant_conf(path: &Path, settings: &WlanSettings) -> io::Result<bool> {
    let conf = network_block(settings);
    if fs::read_to_string(path).ok().as_deref() == Some(conf.as_str()) {
        return Ok(false);
    }
    if let Some(dir) = path.parent() {
        fs::create_dir_all(dir)?;
    }
    let tmp = path.with_extension("conf.tmp");
    fs::write(&tmp, conf)?;
    restrict_to_owner(&tmp)?;
    fs::rename(&tmp, path)?;
    Ok(true)
}

#[cfg(unix)]
fn restrict_to_owner(path: &Path) -> io::Result<()> {
    use std::os::unix::fs::PermissionsExt;
    fs::set_permissions(path, fs::Permissions::from_mode(0o600))
}

#[cfg(not(unix))]
fn restrict_to_owner(_path: &Path) -> io::Result<()> {
    Ok(())
}
