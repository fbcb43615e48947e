//! Hardware-independent core library for eeprom-bringup
//!
//! This crate contains all platform-agnostic logic for verifying I2C EEPROMs
//! during board bring-up: part descriptors, block-address resolution, the
//! page-chunked transfer engine, the diagnostic self-test, board selection, and
//! an in-memory simulated EEPROM that speaks `embedded-hal` I2C.
//!
//! It is `#![no_std]` with `extern crate alloc` so it compiles on both
//! embedded targets (ESP32-S3) and desktop hosts (for the simulator and tests).

#![no_std]

extern crate alloc;

pub mod address;
pub mod board;
pub mod bus;
pub mod chunks;
pub mod descriptor;
pub mod engine;
pub mod error;
pub mod self_test;
pub mod sim;

pub use address::{OffsetWidth, ResolvedAddress};
pub use board::{Board, ConfigError, DiagConfig, Platform};
pub use bus::{BusError, BusTransfer, scan_bus};
pub use descriptor::{AT24C08, AT24C64, DeviceDescriptor, M24C08, M24C64, Part};
pub use engine::{Eeprom, WRITE_CYCLE_TIME_MS};
pub use error::{BlockFailure, EepromError, EepromResult};
pub use self_test::{MonotonicClock, SelfTest, SelfTestReport};
pub use sim::SimulatedEeprom;
