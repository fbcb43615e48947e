//! EEPROM addressing and transfer engine
//!
//! [`Eeprom`] maps a linear logical address space onto a part described by a
//! [`DeviceDescriptor`] and performs byte and block transfers through an
//! injected [`BusTransfer`] capability.
//!
//! # Example
//!
//! ```
//! use eeprom_core::sim::{SimulatedEeprom, VirtualTime};
//! use eeprom_core::{Eeprom, M24C08};
//!
//! let time = VirtualTime::new();
//! let mut eeprom = Eeprom::new(SimulatedEeprom::new(M24C08), time.delay(), M24C08);
//!
//! eeprom.write_byte(1023, 0xAA).unwrap();
//! assert_eq!(eeprom.read_byte(1023).unwrap(), 0xAA);
//! ```

use alloc::vec;
use alloc::vec::Vec;

use embedded_hal::delay::DelayNs;
use log::{debug, error};

use crate::address::ResolvedAddress;
use crate::bus::BusTransfer;
use crate::chunks::PageChunks;
use crate::descriptor::DeviceDescriptor;
use crate::error::{EepromError, EepromResult};

/// Settle time after every write before the part accepts the next command.
pub const WRITE_CYCLE_TIME_MS: u32 = 5;

/// Block-addressed I2C EEPROM.
///
/// Owns the bus capability and delay for its lifetime; [`Eeprom::release`]
/// hands them back. Not synchronized: one engine per bus, and no other bus
/// traffic during a block operation.
pub struct Eeprom<B, D> {
    bus: B,
    delay: D,
    descriptor: DeviceDescriptor,
}

impl<B, D> Eeprom<B, D>
where
    B: BusTransfer,
    D: DelayNs,
{
    pub fn new(bus: B, delay: D, descriptor: DeviceDescriptor) -> Self {
        Self {
            bus,
            delay,
            descriptor,
        }
    }

    pub fn descriptor(&self) -> &DeviceDescriptor {
        &self.descriptor
    }

    /// Give back the bus and delay.
    pub fn release(self) -> (B, D) {
        (self.bus, self.delay)
    }

    /// Translate a logical address into a bus target.
    pub fn resolve_address(&self, logical: u32) -> ResolvedAddress {
        ResolvedAddress::resolve(&self.descriptor, logical)
    }

    fn check_range(&self, logical: u32) -> EepromResult<()> {
        if self.descriptor.contains(logical) {
            Ok(())
        } else {
            Err(EepromError::AddressOutOfRange {
                address: logical,
                capacity: self.descriptor.capacity_bytes,
            })
        }
    }

    /// Write one byte and wait out the write cycle.
    pub fn write_byte(&mut self, logical: u32, value: u8) -> EepromResult<()> {
        self.check_range(logical)?;

        let target = self.resolve_address(logical);
        debug!("[WRITE] {}, data 0x{:02X}", target, value);

        self.bus.write_at(target, &[value]).map_err(|e| {
            error!("Write error at address 0x{:04X}: {:?}", logical, e);
            EepromError::BusTransfer {
                bus_address: target.bus_address,
                offset: target.offset,
            }
        })?;

        self.delay.delay_ms(WRITE_CYCLE_TIME_MS);

        Ok(())
    }

    /// Read one byte. Reads need no settle time.
    pub fn read_byte(&mut self, logical: u32) -> EepromResult<u8> {
        self.check_range(logical)?;

        let target = self.resolve_address(logical);
        debug!("[READ] {}", target);

        let mut buf = [0u8; 1];
        self.bus.read_at(target, &mut buf).map_err(|e| {
            error!("Read error at address 0x{:04X}: {:?}", logical, e);
            EepromError::BusTransfer {
                bus_address: target.bus_address,
                offset: target.offset,
            }
        })?;

        Ok(buf[0])
    }

    /// Write `data` starting at `start`, one byte at a time, in page-sized
    /// chunks.
    ///
    /// Stops at the first failing byte. Bytes before it stay written.
    pub fn write_block(&mut self, start: u32, data: &[u8]) -> EepromResult<()> {
        for (chunk_start, chunk) in PageChunks::new(start, data, self.descriptor.page_size_bytes) {
            for (i, &byte) in chunk.iter().enumerate() {
                let logical = chunk_start.saturating_add(i as u32);
                self.write_byte(logical, byte)
                    .map_err(|e| e.in_block(start, logical))?;
            }
        }

        Ok(())
    }

    /// Write `data` starting at `start` using one bus transfer per physical
    /// page.
    ///
    /// The whole range is checked before anything is written.
    pub fn write_block_paged(&mut self, start: u32, data: &[u8]) -> EepromResult<()> {
        if data.is_empty() {
            return Ok(());
        }

        let limit = self
            .descriptor
            .capacity_bytes
            .min(self.descriptor.addressable_bytes());
        let end = u64::from(start) + data.len() as u64;
        if end > u64::from(limit) {
            let failed_at = start.max(limit);
            return Err(EepromError::AddressOutOfRange {
                address: failed_at,
                capacity: self.descriptor.capacity_bytes,
            }
            .in_block(start, failed_at));
        }

        for (chunk_start, chunk) in
            PageChunks::aligned(start, data, self.descriptor.page_size_bytes)
        {
            let target = self.resolve_address(chunk_start);
            debug!("[PAGE WRITE] {}, {} bytes", target, chunk.len());

            self.bus.write_at(target, chunk).map_err(|e| {
                error!("Page write error at address 0x{:04X}: {:?}", chunk_start, e);
                EepromError::BusTransfer {
                    bus_address: target.bus_address,
                    offset: target.offset,
                }
                .in_block(start, chunk_start)
            })?;

            self.delay.delay_ms(WRITE_CYCLE_TIME_MS);
        }

        Ok(())
    }

    /// Read `len` bytes starting at `start`. All or nothing.
    pub fn read_block(&mut self, start: u32, len: usize) -> EepromResult<Vec<u8>> {
        let mut buf = vec![0u8; len];
        self.read_block_into(start, &mut buf)?;
        Ok(buf)
    }

    /// Fill `buf` from `start` onwards. On error the contents of `buf` are
    /// unspecified.
    pub fn read_block_into(&mut self, start: u32, buf: &mut [u8]) -> EepromResult<()> {
        for (i, slot) in buf.iter_mut().enumerate() {
            let logical = start.saturating_add(i as u32);
            *slot = self
                .read_byte(logical)
                .map_err(|e| e.in_block(start, logical))?;
        }

        Ok(())
    }
}
