//! Error types returned by the EEPROM engine

use thiserror_no_std::Error;

/// Why a constituent byte of a block operation failed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlockFailure {
    AddressOutOfRange,
    BusTransfer,
}

/// Error types for EEPROM operations
///
/// All of these are recoverable: the engine never panics on a failed transfer,
/// the caller decides whether to retry or abort.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum EepromError {
    /// Logical address outside `[0, capacity)`
    #[error("Address 0x{address:04X} out of range (capacity: {capacity})")]
    AddressOutOfRange {
        /// The rejected address
        address: u32,
        /// Capacity of the part in bytes
        capacity: u32,
    },

    /// The bus reported an error (NACK, arbitration loss, timeout)
    #[error("Bus transfer failed at device 0x{bus_address:02X}, offset 0x{offset:04X}")]
    BusTransfer {
        /// 7-bit device address the transfer targeted
        bus_address: u8,
        /// Memory offset within that device
        offset: u16,
    },

    /// A byte inside a multi-byte write or read failed
    #[error("Block operation starting at 0x{start:04X} failed at 0x{failed_at:04X}")]
    BlockOperation {
        /// First logical address of the block
        start: u32,
        /// Logical address of the byte that failed
        failed_at: u32,
        /// Failure of the constituent operation
        kind: BlockFailure,
    },
}

impl EepromError {
    /// Wrap a constituent failure as a block failure.
    pub(crate) fn in_block(self, start: u32, failed_at: u32) -> Self {
        let kind = match self {
            Self::AddressOutOfRange { .. } => BlockFailure::AddressOutOfRange,
            Self::BusTransfer { .. } => BlockFailure::BusTransfer,
            Self::BlockOperation { kind, .. } => kind,
        };

        Self::BlockOperation {
            start,
            failed_at,
            kind,
        }
    }
}

/// Result type for EEPROM operations
pub type EepromResult<T> = Result<T, EepromError>;
