use std::{
    sync::atomic::{AtomicBool, Ordering},
    thread,
    time::Duration,
};

use crate::app::Logger;
use crate::collab::{AssetCategory, Clock, MainLayout, StationSource, WeatherSource};
use crate::config::Config;
use crate::schedule::{CadenceEvents, CadenceScheduler, Timestamp};
use crate::session::Session;
use crate::update::{UpdateBootstrap, UpdateGate};

const SYMBOL_KEYS: [&str; 4] = [
    "thermometer",
    "raindrop",
    "lowest-temperature",
    "highest-temperature",
];

/// The running dashboard: clock, data sources and the update bootstrap,
/// driven one tick at a time by the cadence scheduler.
pub struct Dashboard {
    clock: Box<dyn Clock>,
    weather: Box<dyn WeatherSource>,
    stations: Box<dyn StationSource>,
    updates: UpdateBootstrap,
    scheduler: CadenceScheduler,
    gate: UpdateGate,
    weather_icon: Option<String>,
    loop_delay: Duration,
    logger: Logger,
}

impl Dashboard {
    pub fn new(
        clock: Box<dyn Clock>,
        weather: Box<dyn WeatherSource>,
        stations: Box<dyn StationSource>,
        updates: UpdateBootstrap,
        config: &Config,
        logger: Logger,
    ) -> Self {
        Self {
            clock,
            weather,
            stations,
            updates,
            scheduler: CadenceScheduler::new(),
            gate: UpdateGate {
                enabled: config.automatic_updates,
                update_hour: config.update_hour,
            },
            weather_icon: None,
            loop_delay: Duration::from_millis(config.loop_delay_ms),
            logger,
        }
    }

    pub fn scheduler(&self) -> &CadenceScheduler {
        &self.scheduler
    }

    pub fn updates(&self) -> &UpdateBootstrap {
        &self.updates
    }

    /// Clock sync through the guard, then the timezone.
    pub fn sync_clock(&mut self, session: &mut Session) {
        let synced = self.clock.sync();
        session.check(synced);
        self.clock.set_timezone();
    }

    /// Static layout plus the first full set of data.
    pub fn draw_initial(&mut self, session: &mut Session, config: &Config) {
        let station_icons = config
            .station_labels
            .iter()
            .map(|label| {
                let initial: String = label.chars().take(1).collect();
                session.image(AssetCategory::Station, &initial)
            })
            .collect();
        let symbol_icons = SYMBOL_KEYS
            .iter()
            .map(|key| session.image(AssetCategory::Symbol, key))
            .collect();
        session.presenter().draw_main_layout(&MainLayout {
            station_icons,
            symbol_icons,
            station_labels: config.station_labels.clone(),
            fuel_type: config.fuel_type,
        });

        let now = self.clock.now();
        session.presenter().draw_date_time(&now);
        self.refresh_weather(session, &now);
        self.refresh_stations(session);
    }

    /// One pass of the control loop.
    pub fn tick(&mut self, session: &mut Session) -> CadenceEvents {
        let now = self.clock.now();
        let events = self.scheduler.advance(&now);

        if events.daily_reset {
            self.logger.debug(format!("new day {:02}.{:02}", now.day, now.month));
        }

        if events.hourly_tick {
            session.verify_online();
            self.sync_clock(session);
        }

        if events.minute_tick {
            session.presenter().draw_date_time(&now);
        }

        if events.five_minute_fire {
            session.verify_online();
            if !self.clock.timezone_set() {
                self.clock.set_timezone();
            }
            if self
                .gate
                .is_open(true, self.scheduler.update_check_allowed(), now.hour)
            {
                self.scheduler.take_update_check();
                let version = self.updates.run(session);
                self.logger.info(format!("running {version}, no update staged"));
            }
            self.refresh_weather(session, &now);
            self.refresh_stations(session);
        }

        events
    }

    /// Tick until `running` is cleared.
    pub fn run(&mut self, session: &mut Session, running: &AtomicBool) {
        self.logger.info(format!(
            "dashboard loop started ({} ms per tick)",
            self.loop_delay.as_millis()
        ));
        while running.load(Ordering::SeqCst) {
            self.tick(session);
            thread::sleep(self.loop_delay);
        }
    }

    fn refresh_weather(&mut self, session: &mut Session, now: &Timestamp) {
        let tz = self.clock.tz_identifier();
        let fetched = self.weather.fetch(now, &tz);
        let report = session.require(fetched);
        if self.weather_icon.as_deref() == Some(report.icon.as_str()) {
            session.presenter().draw_weather(&report, None);
            return;
        }
        let icon = session.image(AssetCategory::Weather, &report.icon);
        session.presenter().draw_weather(&report, icon.as_ref());
        self.weather_icon = Some(report.icon);
    }

    fn refresh_stations(&mut self, session: &mut Session) {
        let fetched = self.stations.fetch();
        let prices = session.require(fetched);
        session.presenter().draw_stations(&prices);
    }
}
