//! Bring-up self-test for a freshly soldered EEPROM
//!
//! Two checks, in order:
//!
//! 1. **Sentinel**: write `0xAA` to the highest valid address and read it back.
//!    Catches parts whose upper block bits are not wired or decoded.
//! 2. **Block**: write a counting pattern (100 bytes, 200 for parts of 2 KiB or
//!    more) at the midpoint and read it back. The round trip is timed.
//!
//! Failures never abort the run; both checks always execute and the outcome of
//! each is recorded in the [`SelfTestReport`].

use alloc::vec::Vec;

use embedded_hal::delay::DelayNs;
use log::{error, info, warn};

use crate::bus::BusTransfer;
use crate::engine::Eeprom;
use crate::error::EepromError;

/// Byte written to the highest address.
pub const SENTINEL: u8 = 0xAA;

/// Millisecond time source used to time the block round trip.
pub trait MonotonicClock {
    fn now_ms(&mut self) -> u64;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SentinelOutcome {
    Passed,
    Mismatch { expected: u8, actual: u8 },
    WriteFailed(EepromError),
    ReadFailed(EepromError),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlockOutcome {
    Passed,
    /// Read back differs; `first_difference` is a logical address
    DataMismatch { first_difference: u32 },
    WriteFailed(EepromError),
    ReadFailed(EepromError),
}

/// Result of one self-test run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SelfTestReport {
    pub sentinel_address: u32,
    pub sentinel: SentinelOutcome,
    pub block_start: u32,
    pub block_len: usize,
    pub block: BlockOutcome,
    /// Wall-clock time of the block write and read back
    pub elapsed_ms: u64,
}

impl SelfTestReport {
    pub fn passed(&self) -> bool {
        self.sentinel == SentinelOutcome::Passed && self.block == BlockOutcome::Passed
    }
}

/// Self-test runner.
pub struct SelfTest {
    label: &'static str,
}

impl SelfTest {
    /// `label` names the part in log output.
    pub const fn new(label: &'static str) -> Self {
        Self { label }
    }

    pub fn run<B, D, C>(&self, eeprom: &mut Eeprom<B, D>, clock: &mut C) -> SelfTestReport
    where
        B: BusTransfer,
        D: DelayNs,
        C: MonotonicClock,
    {
        info!("--- Testing {} ---", self.label);

        let descriptor = *eeprom.descriptor();
        let sentinel_address = descriptor.capacity_bytes.saturating_sub(1);
        let sentinel = Self::sentinel(eeprom, sentinel_address);

        let block_len = descriptor.self_test_block_len();
        let block_start = descriptor.capacity_bytes / 2;
        let pattern: Vec<u8> = (0..block_len).map(|i| (i % 256) as u8).collect();

        info!(
            "Testing write/read of {} bytes at address 0x{:04X}",
            block_len, block_start
        );
        let t0 = clock.now_ms();
        let block = Self::block(eeprom, block_start, &pattern);
        let elapsed_ms = clock.now_ms().saturating_sub(t0);
        info!("Test duration: {} ms", elapsed_ms);

        SelfTestReport {
            sentinel_address,
            sentinel,
            block_start,
            block_len,
            block,
            elapsed_ms,
        }
    }

    fn sentinel<B: BusTransfer, D: DelayNs>(
        eeprom: &mut Eeprom<B, D>,
        address: u32,
    ) -> SentinelOutcome {
        info!("Testing highest valid address: 0x{:04X}", address);

        if let Err(e) = eeprom.write_byte(address, SENTINEL) {
            error!("Write to max address failed: {}", e);
            return SentinelOutcome::WriteFailed(e);
        }
        info!("Write to max address succeeded.");

        match eeprom.read_byte(address) {
            Ok(SENTINEL) => {
                info!("Read matches written value: 0x{:02X}", SENTINEL);
                SentinelOutcome::Passed
            }
            Ok(actual) => {
                warn!("Mismatch: read 0x{:02X}", actual);
                SentinelOutcome::Mismatch {
                    expected: SENTINEL,
                    actual,
                }
            }
            Err(e) => {
                error!("Read from max address failed: {}", e);
                SentinelOutcome::ReadFailed(e)
            }
        }
    }

    fn block<B: BusTransfer, D: DelayNs>(
        eeprom: &mut Eeprom<B, D>,
        start: u32,
        pattern: &[u8],
    ) -> BlockOutcome {
        if let Err(e) = eeprom.write_block(start, pattern) {
            error!("Write failed: {}", e);
            return BlockOutcome::WriteFailed(e);
        }

        let read_back = match eeprom.read_block(start, pattern.len()) {
            Ok(data) => data,
            Err(e) => {
                error!("Read failed: {}", e);
                return BlockOutcome::ReadFailed(e);
            }
        };

        match pattern.iter().zip(&read_back).position(|(a, b)| a != b) {
            None => {
                info!("Data matches. Test passed.");
                BlockOutcome::Passed
            }
            Some(i) => {
                warn!("Data mismatch at offset {}", i);
                BlockOutcome::DataMismatch {
                    first_difference: start + i as u32,
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::address::ResolvedAddress;
    use crate::descriptor::{AT24C64, DeviceDescriptor, M24C08};
    use crate::error::BlockFailure;
    use crate::sim::{SimulatedEeprom, VirtualTime};

    fn run(sim: SimulatedEeprom, descriptor: DeviceDescriptor) -> SelfTestReport {
        let time = VirtualTime::new();
        let mut eeprom = Eeprom::new(sim, time.delay(), descriptor);
        SelfTest::new("test part").run(&mut eeprom, &mut time.clock())
    }

    /// Bus with data line bit 0 stuck high on reads from one device.
    struct StuckBitBus {
        inner: SimulatedEeprom,
        bad_device: u8,
    }

    impl BusTransfer for StuckBitBus {
        type Error = <SimulatedEeprom as BusTransfer>::Error;

        fn write_at(&mut self, target: ResolvedAddress, data: &[u8]) -> Result<(), Self::Error> {
            self.inner.write_at(target, data)
        }

        fn read_at(&mut self, target: ResolvedAddress, buf: &mut [u8]) -> Result<(), Self::Error> {
            self.inner.read_at(target, buf)?;
            if target.bus_address == self.bad_device {
                buf.iter_mut().for_each(|b| *b |= 0x01);
            }
            Ok(())
        }
    }

    #[test]
    fn test_small_part_passes() {
        let report = run(SimulatedEeprom::new(M24C08), M24C08);

        assert!(report.passed());
        assert_eq!(report.sentinel_address, 1023);
        assert_eq!(report.block_start, 512);
        assert_eq!(report.block_len, 100);
        // Only the block writes are timed, each waits one write cycle
        assert_eq!(report.elapsed_ms, 500);
    }

    #[test]
    fn test_large_part_uses_longer_block() {
        let report = run(SimulatedEeprom::new(AT24C64), AT24C64);

        assert!(report.passed());
        assert_eq!(report.sentinel_address, 8191);
        assert_eq!(report.block_start, 4096);
        assert_eq!(report.block_len, 200);
    }

    #[test]
    fn test_block_write_failure_reported() {
        let mut sim = SimulatedEeprom::new(M24C08);
        sim.fail_writes_at(520);
        let report = run(sim, M24C08);

        assert!(!report.passed());
        assert_eq!(report.sentinel, SentinelOutcome::Passed);
        assert_eq!(
            report.block,
            BlockOutcome::WriteFailed(EepromError::BlockOperation {
                start: 512,
                failed_at: 520,
                kind: BlockFailure::BusTransfer,
            })
        );
    }

    #[test]
    fn test_sentinel_read_failure_does_not_stop_block_test() {
        let mut sim = SimulatedEeprom::new(M24C08);
        sim.fail_reads_at(1023);
        let report = run(sim, M24C08);

        assert!(matches!(report.sentinel, SentinelOutcome::ReadFailed(_)));
        assert_eq!(report.block, BlockOutcome::Passed);
        assert!(!report.passed());
    }

    #[test]
    fn test_corrupted_reads_are_mismatches() {
        let time = VirtualTime::new();
        let bus = StuckBitBus {
            inner: SimulatedEeprom::new(M24C08),
            // Block 2 holds the midpoint
            bad_device: 0x56,
        };
        let mut eeprom = Eeprom::new(bus, time.delay(), M24C08);
        let report = SelfTest::new("stuck bit").run(&mut eeprom, &mut time.clock());

        assert_eq!(report.sentinel, SentinelOutcome::Passed);
        // Pattern byte 0 is 0x00 and reads back as 0x01
        assert_eq!(
            report.block,
            BlockOutcome::DataMismatch {
                first_difference: 512
            }
        );
    }
}
