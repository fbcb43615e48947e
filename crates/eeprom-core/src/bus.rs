//! Bus-transfer capability consumed by the engine
//!
//! The engine only needs "write these bytes at (device, offset)" and "read
//! into this buffer from (device, offset)". [`BusTransfer`] is that seam, and
//! every `embedded_hal::i2c::I2c` bus gets it for free through the blanket
//! implementation below.

use core::fmt::Debug;

use embedded_hal::i2c::{Error as _, ErrorKind, I2c};
use heapless::Vec;
use log::{debug, info};
use thiserror_no_std::Error;

use crate::address::ResolvedAddress;
use crate::descriptor::MAX_PAGE_SIZE;

/// Lowest non-reserved 7-bit address.
const SCAN_FIRST: u8 = 0x08;
/// Highest non-reserved 7-bit address.
const SCAN_LAST: u8 = 0x77;
const SCAN_SLOTS: usize = (SCAN_LAST - SCAN_FIRST + 1) as usize;

/// Addressed byte transfers over a memory bus.
pub trait BusTransfer {
    type Error: Debug;

    /// Write `data` starting at `target`.
    fn write_at(&mut self, target: ResolvedAddress, data: &[u8]) -> Result<(), Self::Error>;

    /// Fill `buf` starting at `target`.
    fn read_at(&mut self, target: ResolvedAddress, buf: &mut [u8]) -> Result<(), Self::Error>;
}

/// Errors from the I2C bus adapter
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum BusError {
    /// The underlying I2C bus reported an error
    #[error("I2C error: {0:?}")]
    I2c(ErrorKind),

    /// Write payload larger than one page plus offset
    #[error("Payload too large for one transfer ({len} bytes, max: {max})")]
    PayloadTooLarge {
        /// Requested payload length
        len: usize,
        /// Largest payload one transfer can stage
        max: usize,
    },
}

impl<I: I2c> BusTransfer for I {
    type Error = BusError;

    fn write_at(&mut self, target: ResolvedAddress, data: &[u8]) -> Result<(), BusError> {
        let too_large = BusError::PayloadTooLarge {
            len: data.len(),
            max: MAX_PAGE_SIZE,
        };
        if data.len() > MAX_PAGE_SIZE {
            return Err(too_large);
        }

        // Offset and data must go out in one transaction
        let mut frame: Vec<u8, { MAX_PAGE_SIZE + 2 }> = Vec::new();
        frame
            .extend_from_slice(&target.offset_bytes())
            .map_err(|_| too_large)?;
        frame.extend_from_slice(data).map_err(|_| too_large)?;

        self.write(target.bus_address, &frame)
            .map_err(|e| BusError::I2c(e.kind()))
    }

    fn read_at(&mut self, target: ResolvedAddress, buf: &mut [u8]) -> Result<(), BusError> {
        self.write_read(target.bus_address, &target.offset_bytes(), buf)
            .map_err(|e| BusError::I2c(e.kind()))
    }
}

/// Try every non-reserved 7-bit address with a one-byte read.
///
/// Returns the addresses that acknowledged, in ascending order.
pub fn scan_bus<I: I2c>(i2c: &mut I) -> Vec<u8, SCAN_SLOTS> {
    info!("Scanning I2C bus for devices...");

    let mut found = Vec::new();
    let mut scratch = [0u8; 1];
    for address in SCAN_FIRST..=SCAN_LAST {
        if i2c.read(address, &mut scratch).is_ok() {
            info!(" - Address: 0x{:02X}", address);
            // Capacity equals the number of scanned addresses
            let _ = found.push(address);
        } else {
            debug!("No response at 0x{:02X}", address);
        }
    }

    if found.is_empty() {
        info!("No I2C devices found.");
    }

    found
}
