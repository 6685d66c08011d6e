//! Shared helpers for wiring hardware adapters from config.

use std::time::Duration;

use anyhow::{Context, Result, bail};

use rollcall_core::{CardReader, CardUid, SignalKind, SignalSink};
use rollcall_hal::{ConsoleSignaler, GpioSignaler, LineReader, SignalPins};

use crate::{Config, SignalBackend};

/// How long registration commands wait for a tap before giving up.
const SCAN_WAIT: Duration = Duration::from_secs(30);
const SCAN_POLL: Duration = Duration::from_millis(500);

/// The configured signal backend behind one concrete type.
#[derive(Debug)]
pub enum Signaler {
    Gpio(GpioSignaler),
    Console(ConsoleSignaler),
}

impl SignalSink for Signaler {
    fn signal(&mut self, kind: SignalKind) {
        match self {
            Self::Gpio(inner) => inner.signal(kind),
            Self::Console(inner) => inner.signal(kind),
        }
    }
}

/// Opens the configured signal backend.
pub fn build_signaler(config: &Config) -> Result<Signaler> {
    match config.signals.backend {
        SignalBackend::Console => Ok(Signaler::Console(ConsoleSignaler)),
        SignalBackend::Gpio => {
            let pins = SignalPins {
                green_led: config.signals.green_pin,
                red_led: config.signals.red_pin,
                buzzer: config.signals.buzzer_pin,
            };
            let signaler =
                GpioSignaler::open(pins).context("failed to open GPIO indicator pins")?;
            Ok(Signaler::Gpio(signaler))
        }
    }
}

/// Opens the configured card reader (device file or stdin).
pub fn build_reader(config: &Config) -> Result<LineReader> {
    match &config.reader_device {
        Some(device) => LineReader::from_device(device)
            .with_context(|| format!("failed to open reader device {}", device.display())),
        None => Ok(LineReader::stdin()),
    }
}

/// Resolves a card UID: the `--uid` flag if given, otherwise one scan.
pub fn resolve_uid(uid_flag: Option<&str>, config: &Config) -> Result<CardUid> {
    if let Some(uid) = uid_flag {
        return CardUid::new(uid).context("invalid --uid value");
    }

    let mut reader = build_reader(config)?;
    eprintln!("Scan a card...");
    let mut waited = Duration::ZERO;
    while waited < SCAN_WAIT {
        if let Some(uid) = reader
            .read_next(SCAN_POLL)
            .context("card reader failed")?
        {
            return Ok(uid);
        }
        waited += SCAN_POLL;
    }
    bail!("no card presented within {}s", SCAN_WAIT.as_secs());
}
