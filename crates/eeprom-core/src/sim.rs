//! Simulated 24Cxx EEPROM on an `embedded-hal` I2C bus
//!
//! Behaves like a real part from the bus side: it answers only on the
//! addresses its descriptor covers, takes the memory offset from the first
//! written bytes, rolls writes over within a page, and auto-increments reads.
//! Faults can be injected per logical address.
//!
//! [`VirtualTime`] provides a delay and clock pair that advance a shared
//! counter instead of sleeping, so write-cycle waits cost nothing on the host.

use alloc::collections::BTreeSet;
use alloc::rc::Rc;
use alloc::vec;
use alloc::vec::Vec;
use core::cell::Cell;

use embedded_hal::delay::DelayNs;
use embedded_hal::i2c::{ErrorKind, ErrorType, I2c, NoAcknowledgeSource, Operation};

use crate::address::OffsetWidth;
use crate::descriptor::DeviceDescriptor;
use crate::self_test::MonotonicClock;

/// Content of an erased cell.
pub const ERASED: u8 = 0xFF;

/// In-memory EEPROM answering on a simulated I2C bus.
#[derive(Debug, Clone)]
pub struct SimulatedEeprom {
    descriptor: DeviceDescriptor,
    memory: Vec<u8>,
    pointer: u32,
    failing_writes: BTreeSet<u32>,
    failing_reads: BTreeSet<u32>,
    write_transactions: usize,
}

impl SimulatedEeprom {
    /// A blank part: every cell reads [`ERASED`].
    pub fn new(descriptor: DeviceDescriptor) -> Self {
        Self {
            descriptor,
            memory: vec![ERASED; descriptor.capacity_bytes as usize],
            pointer: 0,
            failing_writes: BTreeSet::new(),
            failing_reads: BTreeSet::new(),
            write_transactions: 0,
        }
    }

    pub fn descriptor(&self) -> &DeviceDescriptor {
        &self.descriptor
    }

    /// NACK any write whose data touches `logical`.
    pub fn fail_writes_at(&mut self, logical: u32) {
        self.failing_writes.insert(logical);
    }

    /// NACK any read that reaches `logical`.
    pub fn fail_reads_at(&mut self, logical: u32) {
        self.failing_reads.insert(logical);
    }

    pub fn clear_faults(&mut self) {
        self.failing_writes.clear();
        self.failing_reads.clear();
    }

    /// Number of committed write transactions carrying data.
    pub fn write_transactions(&self) -> usize {
        self.write_transactions
    }

    /// Cell content without going through the bus.
    pub fn peek(&self, logical: u32) -> u8 {
        self.memory[logical as usize]
    }

    pub fn memory(&self) -> &[u8] {
        &self.memory
    }

    fn capacity(&self) -> u32 {
        self.descriptor.capacity_bytes
    }

    /// Combine the block bits of the device address with the written offset.
    fn set_pointer(&mut self, block: u8, offset_bytes: &[u8]) {
        let logical = match self.descriptor.offset_width() {
            OffsetWidth::OneByte => (u32::from(block) << 8) | u32::from(offset_bytes[0]),
            OffsetWidth::TwoBytes => {
                u32::from(u16::from_be_bytes([offset_bytes[0], offset_bytes[1]]))
            }
        };
        // Parts ignore address bits above their capacity
        self.pointer = logical % self.capacity();
    }

    fn write_data(&mut self, data: &[u8]) -> Result<(), ErrorKind> {
        let page = u32::from(self.descriptor.page_size_bytes).max(1);
        let pointer = self.pointer;
        let page_base = pointer - pointer % page;
        let page_addr = |i: usize| page_base + (pointer - page_base + i as u32) % page;

        // A NACK aborts the transfer before the page buffer is committed
        if (0..data.len()).any(|i| self.failing_writes.contains(&page_addr(i))) {
            return Err(ErrorKind::NoAcknowledge(NoAcknowledgeSource::Data));
        }

        let mut last = pointer;
        for (i, &byte) in data.iter().enumerate() {
            last = page_addr(i);
            self.memory[last as usize] = byte;
        }
        self.pointer = page_base + (last - page_base + 1) % page;
        self.write_transactions += 1;

        Ok(())
    }

    fn read_data(&mut self, buf: &mut [u8]) -> Result<(), ErrorKind> {
        for slot in buf.iter_mut() {
            if self.failing_reads.contains(&self.pointer) {
                return Err(ErrorKind::NoAcknowledge(NoAcknowledgeSource::Data));
            }
            *slot = self.memory[self.pointer as usize];
            self.pointer = (self.pointer + 1) % self.capacity();
        }

        Ok(())
    }
}

impl ErrorType for SimulatedEeprom {
    type Error = ErrorKind;
}

impl I2c for SimulatedEeprom {
    fn transaction(
        &mut self,
        address: u8,
        operations: &mut [Operation<'_>],
    ) -> Result<(), Self::Error> {
        if !self.descriptor.bus_addresses().contains(&address) {
            return Err(ErrorKind::NoAcknowledge(NoAcknowledgeSource::Address));
        }
        let block = address & self.descriptor.block_mask();
        let width = self.descriptor.offset_width().byte_count();

        for operation in operations {
            match operation {
                // Address-only ping
                Operation::Write([]) => {}
                Operation::Write(bytes) if bytes.len() < width => {
                    return Err(ErrorKind::Other);
                }
                Operation::Write(bytes) => {
                    let (offset, data) = bytes.split_at(width);
                    self.set_pointer(block, offset);
                    if !data.is_empty() {
                        self.write_data(data)?;
                    }
                }
                Operation::Read(buf) => self.read_data(buf)?,
            }
        }

        Ok(())
    }
}

/// Shared virtual time base, in nanoseconds.
#[derive(Debug, Clone, Default)]
pub struct VirtualTime {
    nanos: Rc<Cell<u64>>,
}

impl VirtualTime {
    pub fn new() -> Self {
        Self::default()
    }

    /// A delay that advances this time base instead of blocking.
    pub fn delay(&self) -> VirtualDelay {
        VirtualDelay {
            nanos: Rc::clone(&self.nanos),
        }
    }

    /// A clock reading this time base.
    pub fn clock(&self) -> VirtualClock {
        VirtualClock {
            nanos: Rc::clone(&self.nanos),
        }
    }

    pub fn elapsed_ms(&self) -> u64 {
        self.nanos.get() / 1_000_000
    }
}

#[derive(Debug, Clone)]
pub struct VirtualDelay {
    nanos: Rc<Cell<u64>>,
}

impl DelayNs for VirtualDelay {
    fn delay_ns(&mut self, ns: u32) {
        self.nanos.set(self.nanos.get() + u64::from(ns));
    }
}

#[derive(Debug, Clone)]
pub struct VirtualClock {
    nanos: Rc<Cell<u64>>,
}

impl MonotonicClock for VirtualClock {
    fn now_ms(&mut self) -> u64 {
        self.nanos.get() / 1_000_000
    }
}
