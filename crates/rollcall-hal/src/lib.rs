//! Hardware adapters for the attendance system.
//!
//! Implements the core collaborator traits against real peripherals:
//! - sysfs GPIO indicator lights and buzzer ([`GpioSignaler`])
//! - a line-oriented UID reader over a serial device or stdin
//!   ([`LineReader`])
//! - a console signaler for development hosts without GPIO
//!   ([`ConsoleSignaler`])
//!
//! Pins and reader threads are owned values with scoped lifecycles: GPIO
//! pins unexport on drop, never shared as ambient singletons.

mod console;
mod gpio;
mod reader;

pub use console::ConsoleSignaler;
pub use gpio::{GpioError, GpioSignaler, Pin, SignalPins};
pub use reader::{LineReader, ReaderError};
