#[cfg(target_os = "linux")]
use std::time::{Duration, Instant};

use crate::guard::TouchInput;
use crate::{Error, Result};

/// Touch controller pen-interrupt line (XPT2046 style, active low) read as a
/// GPIO input. Stubbed on non-Linux platforms.
#[cfg(target_os = "linux")]
pub struct TouchPanel {
    pin: rppal::gpio::InputPin,
    last: Option<Instant>,
    debounce: Duration,
}

#[cfg(target_os = "linux")]
impl TouchPanel {
    pub fn new(pin: Option<u8>) -> Result<Self> {
        let pin = match pin {
            Some(p) => p,
            None => return Err(Error::InvalidArgs("no touch irq pin configured".into())),
        };
        let gpio = rppal::gpio::Gpio::new().map_err(|e| Error::Io(std::io::Error::other(e)))?;
        let input = gpio
            .get(pin)
            .map_err(|e| Error::Io(std::io::Error::other(e)))?
            .into_input_pullup();
        Ok(Self {
            pin: input,
            last: None,
            debounce: Duration::from_millis(150),
        })
    }
}

#[cfg(target_os = "linux")]
impl TouchInput for TouchPanel {
    fn is_touched(&mut self) -> bool {
        let now = Instant::now();
        let settled = self
            .last
            .map(|last| now.duration_since(last) > self.debounce)
            .unwrap_or(true);
        if self.pin.is_low() && settled {
            self.last = Some(now);
            true
        } else {
            false
        }
    }
}

#[cfg(not(target_os = "linux"))]
pub struct TouchPanel;

#[cfg(not(target_os = "linux"))]
impl TouchPanel {
    pub fn new(_pin: Option<u8>) -> Result<Self> {
        Err(Error::InvalidArgs(
            "touch input unsupported on this platform".into(),
        ))
    }
}

#[cfg(not(target_os = "linux"))]
impl TouchInput for TouchPanel {
    fn is_touched(&mut self) -> bool {
        false
    }
}

/// Used when no touch controller is available: acknowledgement never comes,
/// so user-recoverable faults hold the diagnostic on screen until power-cycle.
pub struct NoTouch;

impl TouchInput for NoTouch {
    fn is_touched(&mut self) -> bool {
        false
    }
}
