//! Bakes the EEPROM part selection into the firmware.
//!
//! `EEPROM_PART` is taken from the environment, or from a `.env` file next to
//! this crate's manifest. There is no console on the board to show a menu, so
//! the choice has to be made at build time.

const DEFAULT_PART: &str = "M24C08";

fn main() {
    println!("cargo:rerun-if-changed=.env");
    println!("cargo:rerun-if-env-changed=EEPROM_PART");

    // A missing .env is fine, the variable may come from the environment
    let _ = dotenvy::dotenv();

    let part = match std::env::var("EEPROM_PART") {
        Ok(part) if !part.trim().is_empty() => part,
        _ => {
            println!("cargo:warning=EEPROM_PART not set, defaulting to {DEFAULT_PART}");
            DEFAULT_PART.to_string()
        }
    };

    println!("cargo:rustc-env=EEPROM_PART={}", part.trim());
}
