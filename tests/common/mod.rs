#![allow(dead_code)]

use std::{
    cell::{Cell, RefCell},
    collections::VecDeque,
    panic::{self, AssertUnwindSafe},
    path::{Path, PathBuf},
    rc::Rc,
};

use fuelboard::{
    app::{LogLevel, Logger},
    collab::{
        AssetCategory, AssetStore, Clock, Image, MainLayout, Network, Presenter, StationPrice,
        StationSource, Storage, VersionId, VersionSource, WeatherReport, WeatherSource,
        WlanSettings,
    },
    config::Config,
    guard::{Closable, ErrorSignal, FailFastGuard, Fault, Restart, TouchInput},
    schedule::Timestamp,
    session::Session,
};

/// Ordered record of every side effect the fakes observe.
#[derive(Clone, Default)]
pub struct Journal(Rc<RefCell<Vec<String>>>);

impl Journal {
    pub fn push(&self, entry: impl Into<String>) {
        self.0.borrow_mut().push(entry.into());
    }

    pub fn entries(&self) -> Vec<String> {
        self.0.borrow().clone()
    }

    pub fn count(&self, prefix: &str) -> usize {
        self.0
            .borrow()
            .iter()
            .filter(|e| e.starts_with(prefix))
            .count()
    }

    pub fn position(&self, entry: &str) -> Option<usize> {
        self.0.borrow().iter().position(|e| e == entry)
    }

    pub fn clear(&self) {
        self.0.borrow_mut().clear();
    }
}

/// Payload thrown by [`FakeRestart`] so tests can observe the `!` branch.
#[derive(Debug)]
pub struct Restarted;

pub struct FakeRestart(pub Journal);

impl Restart for FakeRestart {
    fn restart(&mut self) -> ! {
        self.0.push("restart");
        panic::panic_any(Restarted)
    }
}

/// Reports a touch after `polls` unsuccessful polls.
pub struct FakeTouch {
    pub journal: Journal,
    pub polls: usize,
}

impl TouchInput for FakeTouch {
    fn is_touched(&mut self) -> bool {
        self.journal.push("touch-poll");
        if self.polls == 0 {
            true
        } else {
            self.polls -= 1;
            false
        }
    }
}

pub struct FakePresenter(pub Journal);

impl Presenter for FakePresenter {
    fn draw_waiting_screen(&mut self) {
        self.0.push("draw:waiting");
    }

    fn draw_waiting_for_wlan(&mut self, _icon: Option<&Image>, ssid: &str) {
        self.0.push(format!("draw:wlan:{ssid}"));
    }

    fn draw_wlan_countdown(&mut self, remaining_secs: u32) {
        self.0.push(format!("draw:countdown:{remaining_secs}"));
    }

    fn draw_error(&mut self, fault: &Fault, qr_code: Option<&Image>) {
        let qr = if qr_code.is_some() { "qr" } else { "no-qr" };
        self.0.push(format!("draw:error:{}:{qr}", fault.code()));
    }

    fn draw_update_screen(&mut self, _icon: Option<&Image>, current: &VersionId, latest: &VersionId) {
        self.0.push(format!("draw:update:{current}->{latest}"));
    }

    fn draw_update_action(&mut self, action: &str) {
        self.0.push(format!("draw:action:{action}"));
    }

    fn draw_main_layout(&mut self, layout: &MainLayout) {
        self.0
            .push(format!("draw:layout:{}", layout.station_labels.join(",")));
    }

    fn draw_date_time(&mut self, now: &Timestamp) {
        self.0
            .push(format!("draw:time:{:02}:{:02}", now.hour, now.minute));
    }

    fn draw_weather(&mut self, report: &WeatherReport, icon: Option<&Image>) {
        let icon = icon.map(|img| img.key.as_str()).unwrap_or("-");
        self.0.push(format!("draw:weather:{}:{icon}", report.icon));
    }

    fn draw_stations(&mut self, prices: &[StationPrice]) {
        self.0.push(format!("draw:stations:{}", prices.len()));
    }

    fn draw_offline(&mut self) {
        self.0.push("draw:offline");
    }
}

/// Every requested image exists.
pub struct FakeAssets;

impl AssetStore for FakeAssets {
    fn image(&self, category: AssetCategory, key: &str) -> Option<Image> {
        Some(Image {
            category,
            key: key.to_string(),
            path: PathBuf::from(format!("/assets/{category}/{key}.bmp")),
        })
    }
}

pub struct FakeStorage {
    pub journal: Journal,
    pub open_result: ErrorSignal,
    pub config: Result<Config, Fault>,
}

impl Closable for FakeStorage {
    fn name(&self) -> &str {
        "storage"
    }

    fn close(&mut self) {
        self.journal.push("close:storage");
    }
}

impl Storage for FakeStorage {
    fn open(&mut self) -> ErrorSignal {
        self.journal.push("storage:open");
        self.open_result.clone()
    }

    fn load_config(&mut self) -> Result<Config, Fault> {
        self.journal.push("storage:load");
        self.config.clone()
    }
}

pub struct FakeNetwork {
    pub journal: Journal,
    /// Polls of `associated` answered `false` before the link comes up.
    pub associate_after: Cell<usize>,
    pub online: bool,
}

impl Closable for FakeNetwork {
    fn name(&self) -> &str {
        "wlan"
    }

    fn close(&mut self) {
        self.journal.push("close:wlan");
    }
}

impl Network for FakeNetwork {
    fn connect(&mut self, settings: &WlanSettings) {
        self.journal.push(format!("wlan:connect:{}", settings.ssid));
    }

    fn associated(&mut self) -> bool {
        let left = self.associate_after.get();
        if left == 0 {
            true
        } else {
            self.associate_after.set(left - 1);
            false
        }
    }

    fn is_associated(&mut self) -> ErrorSignal {
        self.journal.push("wlan:check");
        if self.associate_after.get() == 0 {
            Ok(())
        } else {
            Err(Fault::new(
                fuelboard::guard::FaultKind::WlanNotAssociated,
                ["not associated"],
            ))
        }
    }

    fn has_internet(&mut self) -> ErrorSignal {
        self.journal.push("wlan:online");
        if self.online {
            Ok(())
        } else {
            Err(Fault::new(fuelboard::guard::FaultKind::Offline, ["offline"]))
        }
    }
}

/// Clock whose reading the test moves by hand.
pub struct FakeClock {
    pub journal: Journal,
    pub now: Rc<Cell<Timestamp>>,
    pub timezone_set: bool,
}

impl Clock for FakeClock {
    fn now(&self) -> Timestamp {
        self.now.get()
    }

    fn sync(&mut self) -> ErrorSignal {
        self.journal.push("clock:sync");
        Ok(())
    }

    fn set_timezone(&mut self) {
        self.journal.push("clock:tz");
        self.timezone_set = true;
    }

    fn timezone_set(&self) -> bool {
        self.timezone_set
    }

    fn tz_identifier(&self) -> String {
        "Europe/Berlin".to_string()
    }
}

/// Weather source returning a scripted sequence of icon names; the last one repeats.
pub struct FakeWeather {
    pub journal: Journal,
    pub icons: VecDeque<String>,
}

impl WeatherSource for FakeWeather {
    fn fetch(&mut self, _now: &Timestamp, _tz: &str) -> Result<WeatherReport, Fault> {
        self.journal.push("weather:fetch");
        let icon = if self.icons.len() > 1 {
            self.icons.pop_front().unwrap_or_default()
        } else {
            self.icons.front().cloned().unwrap_or_default()
        };
        Ok(WeatherReport {
            temperature_c: 10.0,
            precipitation_pct: 20,
            low_c: 5.0,
            high_c: 14.0,
            icon,
        })
    }
}

pub struct FakeStations(pub Journal);

impl StationSource for FakeStations {
    fn fetch(&mut self) -> Result<Vec<StationPrice>, Fault> {
        self.0.push("stations:fetch");
        Ok(vec![StationPrice {
            id: "a".into(),
            open: true,
            price: Some(1.799),
        }])
    }
}

/// Release channel backed by local files.
pub struct FakeVersions {
    pub journal: Journal,
    pub current: &'static str,
    pub latest: &'static str,
    pub payload: &'static [u8],
    pub verify_ok: bool,
}

impl VersionSource for FakeVersions {
    fn current_version(&self) -> VersionId {
        VersionId::new(self.current)
    }

    fn latest_version(&mut self) -> Result<VersionId, Fault> {
        self.journal.push("update:check");
        Ok(VersionId::new(self.latest))
    }

    fn download(&mut self, target: &Path) -> ErrorSignal {
        self.journal.push("update:download");
        std::fs::write(target, self.payload).map_err(|err| {
            Fault::with_message(fuelboard::guard::FaultKind::UpdateDownload, err.to_string())
        })
    }

    fn verify(&mut self, _target: &Path) -> ErrorSignal {
        self.journal.push("update:verify");
        if self.verify_ok {
            Ok(())
        } else {
            Err(Fault::new(
                fuelboard::guard::FaultKind::UpdateVerify,
                ["checksum mismatch"],
            ))
        }
    }
}

pub fn quiet_logger() -> Logger {
    Logger::stderr(LogLevel::Error)
}

pub fn config() -> Config {
    Config {
        wlan_ssid: "home".into(),
        wlan_psk: "secret".into(),
        wlan_timeout_secs: 3,
        weather_lat: 52.52,
        weather_long: 13.405,
        station_ids: vec!["a".into()],
        station_labels: vec!["Aral".into()],
        tankerkoenig_api_key: "key".into(),
        ..Config::default()
    }
}

pub struct Harness {
    pub journal: Journal,
    pub touch_polls: usize,
    pub storage_open: ErrorSignal,
    pub config: Result<Config, Fault>,
    pub associate_after: usize,
    pub online: bool,
}

impl Harness {
    pub fn new() -> Self {
        Self {
            journal: Journal::default(),
            touch_polls: 0,
            storage_open: Ok(()),
            config: Ok(config()),
            associate_after: 0,
            online: true,
        }
    }

    pub fn session(&self) -> Session {
        let j = &self.journal;
        let guard = FailFastGuard::new(
            Box::new(FakeTouch {
                journal: j.clone(),
                polls: self.touch_polls,
            }),
            Box::new(FakeRestart(j.clone())),
            quiet_logger(),
        );
        Session::new(
            Box::new(FakePresenter(j.clone())),
            Box::new(FakeAssets),
            Box::new(FakeStorage {
                journal: j.clone(),
                open_result: self.storage_open.clone(),
                config: self.config.clone(),
            }),
            Box::new(FakeNetwork {
                journal: j.clone(),
                associate_after: Cell::new(self.associate_after),
                online: self.online,
            }),
            guard,
            quiet_logger(),
        )
    }
}

/// Run `f`, returning `true` when it ended in a (fake) restart.
pub fn restarts<F: FnOnce()>(f: F) -> bool {
    match panic::catch_unwind(AssertUnwindSafe(f)) {
        Ok(()) => false,
        Err(payload) => {
            if payload.is::<Restarted>() {
                true
            } else {
                panic::resume_unwind(payload)
            }
        }
    }
}
