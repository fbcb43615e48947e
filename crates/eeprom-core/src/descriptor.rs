//! Device descriptors for supported I2C EEPROM parts
//!
//! A [`DeviceDescriptor`] fixes everything the engine needs to know about a
//! part: where it sits on the bus, how large it is, how many bytes it commits
//! per internal write cycle, and how many low bus-address bits select a
//! 256-byte block.

use core::fmt;
use core::ops::RangeInclusive;
use core::str::FromStr;

use crate::address::OffsetWidth;
use crate::board::ConfigError;

/// Largest page size the bus staging buffer can carry in one transfer.
pub const MAX_PAGE_SIZE: usize = 64;

/// Immutable configuration of one EEPROM part.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DeviceDescriptor {
    /// 7-bit bus address used for block 0
    pub base_bus_address: u8,
    /// Total addressable bytes
    pub capacity_bytes: u32,
    /// Bytes committed in one internal write cycle
    pub page_size_bytes: u16,
    /// Low bus-address bits overridden by the block index
    pub block_address_bits: u8,
}

impl DeviceDescriptor {
    pub const fn new(
        base_bus_address: u8,
        capacity_bytes: u32,
        page_size_bytes: u16,
        block_address_bits: u8,
    ) -> Self {
        Self {
            base_bus_address,
            capacity_bytes,
            page_size_bytes,
            block_address_bits,
        }
    }

    /// Mask applied to `logical >> 8` to get the block index.
    ///
    /// A 7-bit bus address has at most 7 bits to give, wider settings are
    /// clamped.
    pub const fn block_mask(&self) -> u8 {
        let bits = if self.block_address_bits > 7 {
            7
        } else {
            self.block_address_bits
        };
        (1u8 << bits) - 1
    }

    /// Width of the in-transaction memory offset.
    ///
    /// Block-addressed parts and parts of at most 256 bytes take a single
    /// offset byte. Everything else takes the full address as two big-endian
    /// bytes, which limits those parts to 64 KiB.
    pub const fn offset_width(&self) -> OffsetWidth {
        if self.block_address_bits > 0 || self.capacity_bytes <= 256 {
            OffsetWidth::OneByte
        } else {
            OffsetWidth::TwoBytes
        }
    }

    /// Bus addresses the part answers on.
    pub const fn bus_addresses(&self) -> RangeInclusive<u8> {
        self.base_bus_address..=(self.base_bus_address | self.block_mask())
    }

    /// Bytes reachable through the bus address and offset, independent of
    /// capacity.
    pub const fn addressable_bytes(&self) -> u32 {
        match self.offset_width() {
            OffsetWidth::OneByte => 256 << (self.block_mask().count_ones()),
            OffsetWidth::TwoBytes => 1 << 16,
        }
    }

    /// Whether `logical` is inside the part and reachable without aliasing
    /// another address.
    pub const fn contains(&self, logical: u32) -> bool {
        logical < self.capacity_bytes && logical < self.addressable_bytes()
    }

    /// Size of the block test used by the self-test procedure.
    pub const fn self_test_block_len(&self) -> usize {
        if self.capacity_bytes < 2048 { 100 } else { 200 }
    }
}

/// ST M24C08, 8 Kbit, chip-enable strapped to 0x54.
pub const M24C08: DeviceDescriptor = DeviceDescriptor::new(0x54, 1024, 16, 3);

/// Microchip AT24C08C, 8 Kbit.
pub const AT24C08: DeviceDescriptor = DeviceDescriptor::new(0x50, 1024, 16, 3);

/// ST M24C64, 64 Kbit.
pub const M24C64: DeviceDescriptor = DeviceDescriptor::new(0x50, 8192, 32, 0);

/// Microchip AT24C64D, 64 Kbit.
pub const AT24C64: DeviceDescriptor = DeviceDescriptor::new(0x50, 8192, 32, 0);

/// Supported part numbers, in menu order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Part {
    /// M24C08-RMN6TP
    M24C08,
    /// AT24C08C-SSHM-T
    AT24C08,
    /// M24C64-WMN6TP
    M24C64,
    /// AT24C64D-SSHM-T
    AT24C64,
}

impl Part {
    pub const ALL: [Part; 4] = [Part::M24C08, Part::AT24C08, Part::M24C64, Part::AT24C64];

    pub const fn descriptor(self) -> DeviceDescriptor {
        match self {
            Self::M24C08 => M24C08,
            Self::AT24C08 => AT24C08,
            Self::M24C64 => M24C64,
            Self::AT24C64 => AT24C64,
        }
    }

    /// Short name used on the command line and in logs
    pub const fn name(self) -> &'static str {
        match self {
            Self::M24C08 => "M24C08",
            Self::AT24C08 => "AT24C08",
            Self::M24C64 => "M24C64",
            Self::AT24C64 => "AT24C64",
        }
    }

    /// Full ordering code printed in the selection menu
    pub const fn ordering_code(self) -> &'static str {
        match self {
            Self::M24C08 => "M24C08-RMN6TP",
            Self::AT24C08 => "AT24C08C-SSHM-T",
            Self::M24C64 => "M24C64-WMN6TP",
            Self::AT24C64 => "AT24C64D-SSHM-T",
        }
    }

    /// Map a 1-based menu choice to a part.
    pub fn from_menu_choice(choice: &str) -> Result<Self, ConfigError> {
        match choice.trim() {
            "1" => Ok(Self::M24C08),
            "2" => Ok(Self::AT24C08),
            "3" => Ok(Self::M24C64),
            "4" => Ok(Self::AT24C64),
            _ => Err(ConfigError::InvalidChoice),
        }
    }
}

impl FromStr for Part {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        Self::ALL
            .into_iter()
            .find(|part| {
                part.name().eq_ignore_ascii_case(s) || part.ordering_code().eq_ignore_ascii_case(s)
            })
            .ok_or(ConfigError::UnknownPart)
    }
}

impl fmt::Display for Part {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
