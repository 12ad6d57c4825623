use std::{
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc,
    },
    thread,
    time::Duration,
};

use crate::collab::{AssetCategory, WlanSettings};
use crate::config::Config;
use crate::session::Session;
use crate::{Error, Result};

/// Install a ctrl-c handler that flips the shared running flag instead of exiting immediately.
pub(super) fn create_shutdown_flag() -> Result<Arc<AtomicBool>> {
    let running = Arc::new(AtomicBool::new(true));
    let running_handle = running.clone();

    ctrlc::set_handler(move || {
        running_handle.store(false, Ordering::SeqCst);
    })
    .map_err(|e| Error::Io(std::io::Error::other(e.to_string())))?;

    Ok(running)
}

/// Waiting screen, storage and configuration. Any failure here restarts.
pub fn open_storage(session: &mut Session) -> Config {
    session.presenter().draw_waiting_screen();
    let opened = session.storage().open();
    session.check(opened);
    let config = session.storage().load_config();
    let config = session.require(config);
    session.logger().info(format!(
        "configuration loaded ({} station(s), fuel {})",
        config.station_ids.len(),
        config.fuel_type
    ));
    config
}

/// Start the WLAN session and wait up to `timeout_secs` polls for the
/// association, counting down on screen. Proceeds to the checks either way.
pub fn join_network(session: &mut Session, config: &Config, poll: Duration) {
    let settings = WlanSettings::from(config);
    session.network().connect(&settings);
    let icon = session.image(AssetCategory::Symbol, "wlan");
    session
        .presenter()
        .draw_waiting_for_wlan(icon.as_ref(), &settings.ssid);

    let timeout = config.wlan_timeout_secs;
    for elapsed in 0..=timeout {
        session.presenter().draw_wlan_countdown(timeout - elapsed);
        if session.network().associated() {
            session
                .logger()
                .info(format!("wlan associated after {elapsed} s"));
            break;
        }
        if elapsed < timeout {
            thread::sleep(poll);
        }
    }

    session.verify_online();
}

/// Orderly stop outside the failure path.
pub fn shut_down(session: &mut Session) {
    session.logger().info("shutdown requested; going offline");
    session.presenter().draw_offline();
    session.close_all();
}
