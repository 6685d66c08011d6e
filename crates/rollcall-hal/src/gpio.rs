//! Sysfs GPIO output pins and the indicator/buzzer signaler.

use std::io;
use std::path::{Path, PathBuf};
use std::thread;
use std::time::Duration;

use thiserror::Error;

use rollcall_core::{SignalKind, SignalSink};

const SYSFS_GPIO_BASE: &str = "/sys/class/gpio";

/// Cue hold times, carried over from the original device behavior.
const ACCEPT_HOLD: Duration = Duration::from_secs(1);
const REJECT_HOLD: Duration = Duration::from_secs(1);
const SESSION_END_HOLD: Duration = Duration::from_secs(2);
const BUZZ: Duration = Duration::from_millis(500);

/// GPIO adapter errors.
#[derive(Debug, Error)]
pub enum GpioError {
    #[error("failed to export GPIO {pin}: {source}")]
    Export { pin: u32, source: io::Error },
    #[error("failed to configure GPIO {pin} as output: {source}")]
    Direction { pin: u32, source: io::Error },
    #[error("failed to write GPIO {pin}: {source}")]
    Write { pin: u32, source: io::Error },
}

/// An exported sysfs GPIO output pin.
///
/// Exported and driven low on construction; driven low and unexported on
/// drop, so every exit path releases the hardware.
#[derive(Debug)]
pub struct Pin {
    number: u32,
    base: PathBuf,
}

impl Pin {
    /// Exports a pin under `/sys/class/gpio` and configures it as output.
    pub fn export(number: u32) -> Result<Self, GpioError> {
        Self::export_at(Path::new(SYSFS_GPIO_BASE), number)
    }

    /// Exports a pin under an alternate sysfs root.
    pub fn export_at(base: &Path, number: u32) -> Result<Self, GpioError> {
        match std::fs::write(base.join("export"), number.to_string()) {
            Ok(()) => {}
            // A leftover export from a previous run is fine to reuse.
            Err(e) if e.kind() == io::ErrorKind::ResourceBusy => {
                tracing::debug!(pin = number, "GPIO already exported, reusing");
            }
            Err(source) => return Err(GpioError::Export { pin: number, source }),
        }

        let pin = Self {
            number,
            base: base.to_path_buf(),
        };
        std::fs::write(pin.pin_path("direction"), "out")
            .map_err(|source| GpioError::Direction { pin: number, source })?;
        pin.set_low()?;
        Ok(pin)
    }

    fn pin_path(&self, file: &str) -> PathBuf {
        self.base.join(format!("gpio{}", self.number)).join(file)
    }

    pub fn set_high(&self) -> Result<(), GpioError> {
        self.write_value("1")
    }

    pub fn set_low(&self) -> Result<(), GpioError> {
        self.write_value("0")
    }

    fn write_value(&self, value: &str) -> Result<(), GpioError> {
        std::fs::write(self.pin_path("value"), value).map_err(|source| GpioError::Write {
            pin: self.number,
            source,
        })
    }
}

impl Drop for Pin {
    fn drop(&mut self) {
        // Best effort: leave the pin low and released.
        let _ = self.set_low();
        if let Err(e) = std::fs::write(self.base.join("unexport"), self.number.to_string()) {
            tracing::debug!(pin = self.number, error = %e, "GPIO unexport failed");
        }
    }
}

/// BCM pin assignments for the indicator hardware.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SignalPins {
    pub green_led: u32,
    pub red_led: u32,
    pub buzzer: u32,
}

impl Default for SignalPins {
    /// The original device wiring.
    fn default() -> Self {
        Self {
            green_led: 20,
            red_led: 21,
            buzzer: 18,
        }
    }
}

/// Which LED a cue lights.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Led {
    Green,
    Red,
}

/// A resolved cue: which LED, how long, and whether to buzz.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Cue {
    led: Led,
    hold: Duration,
    buzz: bool,
}

/// Maps a signal kind onto the indicator hardware.
///
/// Green for on-time, red for everything else; accepts get a short buzz.
const fn cue_for(kind: SignalKind) -> Cue {
    match kind {
        SignalKind::AcceptedOnTime => Cue {
            led: Led::Green,
            hold: ACCEPT_HOLD,
            buzz: true,
        },
        SignalKind::AcceptedLate => Cue {
            led: Led::Red,
            hold: ACCEPT_HOLD,
            buzz: true,
        },
        SignalKind::RejectedUnregistered | SignalKind::RejectedDuplicate => Cue {
            led: Led::Red,
            hold: REJECT_HOLD,
            buzz: false,
        },
        SignalKind::SessionEnded => Cue {
            led: Led::Red,
            hold: SESSION_END_HOLD,
            buzz: false,
        },
    }
}

/// Indicator lights and buzzer on GPIO.
///
/// Cues block for their hold duration; that sleep is bounded and counts
/// as session wall-clock time, which is what the session loop expects.
#[derive(Debug)]
pub struct GpioSignaler {
    green: Pin,
    red: Pin,
    buzzer: Pin,
}

impl GpioSignaler {
    /// Exports the three pins under `/sys/class/gpio`.
    pub fn open(pins: SignalPins) -> Result<Self, GpioError> {
        Self::open_at(Path::new(SYSFS_GPIO_BASE), pins)
    }

    /// Exports the three pins under an alternate sysfs root.
    pub fn open_at(base: &Path, pins: SignalPins) -> Result<Self, GpioError> {
        Ok(Self {
            green: Pin::export_at(base, pins.green_led)?,
            red: Pin::export_at(base, pins.red_led)?,
            buzzer: Pin::export_at(base, pins.buzzer)?,
        })
    }

    fn led(&self, which: Led) -> &Pin {
        match which {
            Led::Green => &self.green,
            Led::Red => &self.red,
        }
    }

    fn present(&self, cue: Cue) -> Result<(), GpioError> {
        let led = self.led(cue.led);
        led.set_high()?;
        if cue.buzz {
            self.buzzer.set_high()?;
            thread::sleep(BUZZ);
            self.buzzer.set_low()?;
            thread::sleep(cue.hold.saturating_sub(BUZZ));
        } else {
            thread::sleep(cue.hold);
        }
        led.set_low()
    }
}

impl SignalSink for GpioSignaler {
    fn signal(&mut self, kind: SignalKind) {
        if let Err(e) = self.present(cue_for(kind)) {
            // Fire-and-forget: a dead LED must not end the session.
            tracing::warn!(cue = %kind, error = %e, "indicator cue failed");
        }
    }
}
