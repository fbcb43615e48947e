//! Logical address to bus target translation
//!
//! Small 24Cxx parts address more than 256 bytes with a single offset byte by
//! folding the high address bits into the low bits of the I2C device address.
//! Larger parts without block bits take the whole address as a two-byte
//! offset instead.

use core::fmt;

use heapless::Vec;

use crate::descriptor::DeviceDescriptor;

/// Number of bytes the memory offset occupies on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OffsetWidth {
    OneByte,
    /// Big-endian
    TwoBytes,
}

impl OffsetWidth {
    pub const fn byte_count(self) -> usize {
        match self {
            Self::OneByte => 1,
            Self::TwoBytes => 2,
        }
    }
}

/// Where a logical address lands on the bus.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResolvedAddress {
    pub bus_address: u8,
    pub offset: u16,
    pub width: OffsetWidth,
}

impl ResolvedAddress {
    /// Resolve `logical` against `descriptor`.
    ///
    /// Pure: no range check happens here, callers reject out-of-range
    /// addresses before touching the bus.
    pub const fn resolve(descriptor: &DeviceDescriptor, logical: u32) -> Self {
        let block = ((logical >> 8) as u8) & descriptor.block_mask();
        let width = descriptor.offset_width();
        let offset = match width {
            OffsetWidth::OneByte => (logical & 0xFF) as u16,
            OffsetWidth::TwoBytes => (logical & 0xFFFF) as u16,
        };

        Self {
            bus_address: descriptor.base_bus_address | block,
            offset,
            width,
        }
    }

    /// Offset bytes as they go out on the wire.
    pub fn offset_bytes(&self) -> Vec<u8, 2> {
        let mut bytes = Vec::new();
        match self.width {
            OffsetWidth::OneByte => {
                let _ = bytes.push(self.offset as u8);
            }
            OffsetWidth::TwoBytes => {
                let _ = bytes.extend_from_slice(&self.offset.to_be_bytes());
            }
        }
        bytes
    }
}

impl fmt::Display for ResolvedAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.width {
            OffsetWidth::OneByte => {
                write!(f, "dev 0x{:02X} off 0x{:02X}", self.bus_address, self.offset)
            }
            OffsetWidth::TwoBytes => {
                write!(f, "dev 0x{:02X} off 0x{:04X}", self.bus_address, self.offset)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::descriptor::{AT24C08, M24C08, M24C64};

    #[test]
    fn test_block_addressing_full_range() {
        for logical in 0..1024u32 {
            let resolved = ResolvedAddress::resolve(&M24C08, logical);
            assert_eq!(resolved.bus_address, 0x54 | ((logical >> 8) & 0x7) as u8);
            assert_eq!(resolved.offset, (logical & 0xFF) as u16);
            assert_eq!(resolved.width, OffsetWidth::OneByte);
        }
    }

    #[test]
    fn test_highest_address() {
        let resolved = ResolvedAddress::resolve(&M24C08, 1023);
        assert_eq!(resolved.bus_address, 0x57);
        assert_eq!(resolved.offset, 0xFF);

        let resolved = ResolvedAddress::resolve(&AT24C08, 0x2A5);
        assert_eq!(resolved.bus_address, 0x52);
        assert_eq!(resolved.offset, 0xA5);
    }

    #[test]
    fn test_wide_offset_does_not_alias() {
        let low = ResolvedAddress::resolve(&M24C64, 0x0012);
        let high = ResolvedAddress::resolve(&M24C64, 0x1F12);

        assert_eq!(low.bus_address, 0x50);
        assert_eq!(high.bus_address, 0x50);
        assert_ne!(low.offset, high.offset);
        assert_eq!(high.offset, 0x1F12);
        assert_eq!(high.offset_bytes().as_slice(), &[0x1F, 0x12]);
    }

    #[test]
    fn test_oversized_block_bits_do_not_panic() {
        let descriptor = DeviceDescriptor::new(0x50, 1024, 16, 16);
        let resolved = ResolvedAddress::resolve(&descriptor, 0x300);
        assert_eq!(resolved.bus_address, 0x53);
        assert_eq!(resolved.offset, 0x00);
    }

    #[test]
    fn test_offset_bytes_single() {
        let resolved = ResolvedAddress::resolve(&M24C08, 0x3C4);
        assert_eq!(resolved.offset_bytes().as_slice(), &[0xC4]);
    }
}
