//! Time-gated cadence: turns successive clock readings into day, hour,
//! minute and five-minute edge events.
//!
//! The five-minute refresh is two-phase. Fuel stations report their
//! open/closed state accurately only one minute after each five-minute
//! boundary, so the refresh fires at XX:01, XX:06, XX:11 and so on, and only
//! after the window has been armed by a tick outside the firing minute.

/// Immutable local-time snapshot taken once per loop tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Timestamp {
    pub year: i32,
    pub month: u8,
    pub day: u8,
    pub hour: u8,
    pub minute: u8,
    pub second: u8,
    /// 0 = Monday.
    pub weekday: u8,
}

impl Timestamp {
    /// Build a snapshot from the fields the scheduler looks at; the calendar
    /// fields are left at neutral values.
    pub fn at(day: u8, hour: u8, minute: u8, second: u8) -> Self {
        Self {
            year: 1970,
            month: 1,
            day,
            hour,
            minute,
            second,
            weekday: 0,
        }
    }

    /// `(minute - 1) mod 5`, Euclidean so that minute 0 lands on phase 4.
    pub fn window_phase(&self) -> u8 {
        (i16::from(self.minute) - 1).rem_euclid(5) as u8
    }
}

/// One logical event emitted by [`advance`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CadenceEvent {
    DailyReset,
    HourlyTick,
    MinuteTick,
    FiveMinuteWindowOpen,
    FiveMinuteFire,
}

/// Events produced by a single tick. Each kind appears at most once.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CadenceEvents {
    pub daily_reset: bool,
    pub hourly_tick: bool,
    pub minute_tick: bool,
    pub window_open: bool,
    pub five_minute_fire: bool,
}

impl CadenceEvents {
    pub fn contains(&self, event: CadenceEvent) -> bool {
        match event {
            CadenceEvent::DailyReset => self.daily_reset,
            CadenceEvent::HourlyTick => self.hourly_tick,
            CadenceEvent::MinuteTick => self.minute_tick,
            CadenceEvent::FiveMinuteWindowOpen => self.window_open,
            CadenceEvent::FiveMinuteFire => self.five_minute_fire,
        }
    }

    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    pub fn to_vec(&self) -> Vec<CadenceEvent> {
        [
            CadenceEvent::DailyReset,
            CadenceEvent::HourlyTick,
            CadenceEvent::MinuteTick,
            CadenceEvent::FiveMinuteWindowOpen,
            CadenceEvent::FiveMinuteFire,
        ]
        .into_iter()
        .filter(|event| self.contains(*event))
        .collect()
    }
}

/// Scheduler memory between ticks. `None` is the boot sentinel and never
/// equals a real clock field.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CadenceState {
    pub previous_day: Option<u8>,
    pub previous_hour: Option<u8>,
    pub previous_minute: Option<u8>,
    pub data_window_open: bool,
    pub update_check_allowed: bool,
}

/// Process one tick. The state goes in by value and comes back updated.
pub fn advance(mut state: CadenceState, now: &Timestamp) -> (CadenceState, CadenceEvents) {
    let mut events = CadenceEvents::default();

    if state.previous_day != Some(now.day) {
        state.previous_day = Some(now.day);
        state.update_check_allowed = true;
        events.daily_reset = true;
    }

    if state.previous_hour != Some(now.hour) {
        state.previous_hour = Some(now.hour);
        events.hourly_tick = true;
    }

    if state.previous_minute != Some(now.minute) {
        state.previous_minute = Some(now.minute);
        events.minute_tick = true;
    }

    let phase = now.window_phase();
    if phase != 0 {
        if !state.data_window_open {
            state.data_window_open = true;
            events.window_open = true;
        }
    } else if now.second >= 1 && state.data_window_open {
        state.data_window_open = false;
        events.five_minute_fire = true;
    }

    (state, events)
}

/// Owner of the cadence state for the control loop.
#[derive(Debug, Default)]
pub struct CadenceScheduler {
    state: CadenceState,
}

impl CadenceScheduler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn advance(&mut self, now: &Timestamp) -> CadenceEvents {
        let (state, events) = advance(self.state, now);
        self.state = state;
        events
    }

    pub fn state(&self) -> &CadenceState {
        &self.state
    }

    pub fn update_check_allowed(&self) -> bool {
        self.state.update_check_allowed
    }

    /// Consume today's update-check permission.
    pub fn take_update_check(&mut self) -> bool {
        std::mem::replace(&mut self.state.update_check_allowed, false)
    }
}
