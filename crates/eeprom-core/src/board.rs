//! Board and run configuration
//!
//! Each supported board fixes the I2C pins and bus frequency used to reach
//! the EEPROM socket. ESP32 boards come in two layouts that cannot be told
//! apart at runtime, so they are picked from a menu; RP2040 has only one.

use core::str::FromStr;

use thiserror_no_std::Error;

use crate::descriptor::Part;

/// Bus frequency used on every board.
pub const I2C_FREQUENCY_HZ: u32 = 400_000;

/// Configuration errors. These are the only fatal errors: they are reported
/// once at startup and stop the run.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum ConfigError {
    /// Platform has no known board layout
    #[error("Unsupported platform")]
    UnsupportedPlatform,

    /// Menu input did not match any entry
    #[error("Invalid choice")]
    InvalidChoice,

    /// Part name did not match any supported part
    #[error("Unknown EEPROM part")]
    UnknownPart,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Platform {
    Esp32,
    Rp2,
}

impl FromStr for Platform {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "esp32" => Ok(Self::Esp32),
            "rp2" => Ok(Self::Rp2),
            _ => Err(ConfigError::UnsupportedPlatform),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Board {
    /// ESP32-S3 Nano form factor
    Esp32Nano,
    /// Other ESP32 dev boards
    Esp32NonNano,
    Rp2040,
}

impl Board {
    /// Resolve the board for `platform`. ESP32 needs the 1-based menu
    /// `choice`; RP2 ignores it.
    pub fn for_platform(platform: Platform, choice: Option<&str>) -> Result<Self, ConfigError> {
        match platform {
            Platform::Rp2 => Ok(Self::Rp2040),
            Platform::Esp32 => match choice.map(str::trim) {
                Some("1") => Ok(Self::Esp32Nano),
                Some("2") => Ok(Self::Esp32NonNano),
                _ => Err(ConfigError::InvalidChoice),
            },
        }
    }

    pub const fn platform(self) -> Platform {
        match self {
            Self::Esp32Nano | Self::Esp32NonNano => Platform::Esp32,
            Self::Rp2040 => Platform::Rp2,
        }
    }

    /// GPIO number of SDA
    pub const fn sda_pin(self) -> u8 {
        match self {
            Self::Esp32Nano => 11,
            Self::Esp32NonNano => 4,
            Self::Rp2040 => 20,
        }
    }

    /// GPIO number of SCL
    pub const fn scl_pin(self) -> u8 {
        match self {
            Self::Esp32Nano => 12,
            Self::Esp32NonNano => 5,
            Self::Rp2040 => 21,
        }
    }

    pub const fn frequency_hz(self) -> u32 {
        I2C_FREQUENCY_HZ
    }

    pub const fn label(self) -> &'static str {
        match self {
            Self::Esp32Nano => "NANO",
            Self::Esp32NonNano => "NON_NANO",
            Self::Rp2040 => "RP2040",
        }
    }
}

/// Everything a self-test run needs to know up front.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DiagConfig {
    pub board: Board,
    pub part: Part,
}

impl DiagConfig {
    /// Build a configuration from textual inputs, as given on a console or at
    /// build time.
    pub fn from_inputs(
        platform: &str,
        board_choice: Option<&str>,
        part: &str,
    ) -> Result<Self, ConfigError> {
        let platform: Platform = platform.parse()?;
        let board = Board::for_platform(platform, board_choice)?;
        let part = Part::from_menu_choice(part).or_else(|_| part.parse())?;

        Ok(Self { board, part })
    }
}
