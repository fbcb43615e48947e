//! Desktop simulator for the eeprom-bringup self-test.
//!
//! Runs the same scan and self-test the firmware runs, but against a
//! [`SimulatedEeprom`] on a simulated I2C bus, so the procedure can be
//! exercised without hardware. Write-cycle delays really sleep, so the
//! reported duration is in the same ballpark as on a real part.
//!
//! # Usage
//!
//! ```text
//! eeprom-simulator [PART] [--platform esp32|rp2] [--board N] [--fail-at ADDR] [--fail-read-at ADDR]
//! ```
//!
//! | Argument             | Effect                                         |
//! |----------------------|------------------------------------------------|
//! | `PART`               | Part name or menu number; prompts when omitted |
//! | `--platform NAME`    | Board family, `esp32` (default) or `rp2`       |
//! | `--board N`          | ESP32 board menu number; prompts when omitted  |
//! | `--fail-at ADDR`     | NACK writes touching logical address `ADDR`    |
//! | `--fail-read-at ADDR`| NACK reads reaching logical address `ADDR`     |
//!
//! `ADDR` is decimal or `0x`-prefixed hex. Set `RUST_LOG=debug` to see every
//! byte transfer.

use std::io::{self, BufRead, Write};
use std::process::ExitCode;
use std::thread;
use std::time::{Duration, Instant};

use embedded_hal::delay::DelayNs;
use log::{error, info, warn};

use eeprom_core::descriptor::Part;
use eeprom_core::self_test::{BlockOutcome, SentinelOutcome};
use eeprom_core::{
    Board, ConfigError, DiagConfig, Eeprom, MonotonicClock, Platform, SelfTest, SimulatedEeprom,
    scan_bus,
};

// ---------------------------------------------------------------------------
// Host time
// ---------------------------------------------------------------------------

/// Blocking delay backed by `thread::sleep`.
struct StdDelay;

impl DelayNs for StdDelay {
    fn delay_ns(&mut self, ns: u32) {
        thread::sleep(Duration::from_nanos(u64::from(ns)));
    }
}

/// Milliseconds since the simulator started.
struct StdClock {
    origin: Instant,
}

impl MonotonicClock for StdClock {
    fn now_ms(&mut self) -> u64 {
        self.origin.elapsed().as_millis() as u64
    }
}

// ---------------------------------------------------------------------------
// Command line
// ---------------------------------------------------------------------------

#[derive(Debug, Default)]
struct Options {
    part: Option<String>,
    platform: Option<String>,
    board: Option<String>,
    fail_writes_at: Vec<u32>,
    fail_reads_at: Vec<u32>,
}

fn parse_address(text: &str) -> Option<u32> {
    match text.strip_prefix("0x").or_else(|| text.strip_prefix("0X")) {
        Some(hex) => u32::from_str_radix(hex, 16).ok(),
        None => text.parse().ok(),
    }
}

fn parse_options(args: impl Iterator<Item = String>) -> Result<Options, String> {
    let mut options = Options::default();
    let mut args = args.peekable();

    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--fail-at" | "--fail-read-at" => {
                let value = args
                    .next()
                    .ok_or_else(|| format!("{arg} needs an address"))?;
                let address =
                    parse_address(&value).ok_or_else(|| format!("invalid address: {value}"))?;
                if arg == "--fail-at" {
                    options.fail_writes_at.push(address);
                } else {
                    options.fail_reads_at.push(address);
                }
            }
            "--platform" | "--board" => {
                let value = args.next().ok_or_else(|| format!("{arg} needs a value"))?;
                if arg == "--platform" {
                    options.platform = Some(value);
                } else {
                    options.board = Some(value);
                }
            }
            flag if flag.starts_with("--") => return Err(format!("unknown option: {flag}")),
            _ if options.part.is_none() => options.part = Some(arg),
            _ => return Err(format!("unexpected argument: {arg}")),
        }
    }

    Ok(options)
}

/// Show the part menu until a valid entry is typed.
fn prompt_part() -> io::Result<Part> {
    let stdin = io::stdin();
    println!("\nSelect EEPROM to test:");
    for (i, part) in Part::ALL.iter().enumerate() {
        println!("{}. {}", i + 1, part.ordering_code());
    }

    loop {
        print!("Enter a number (1-4): ");
        io::stdout().flush()?;

        let mut line = String::new();
        if stdin.lock().read_line(&mut line)? == 0 {
            return Err(io::Error::new(io::ErrorKind::UnexpectedEof, "no selection"));
        }
        match Part::from_menu_choice(&line) {
            Ok(part) => return Ok(part),
            Err(_) => println!("Invalid choice. Try again."),
        }
    }
}

/// Show the ESP32 board menu until a valid entry is typed.
fn prompt_board() -> io::Result<Board> {
    let stdin = io::stdin();
    println!("\nSelect ESP32 board:");
    for (i, board) in [Board::Esp32Nano, Board::Esp32NonNano].iter().enumerate() {
        println!(
            "{}. {} (SDA={}, SCL={}, freq={}kHz)",
            i + 1,
            board.label(),
            board.sda_pin(),
            board.scl_pin(),
            board.frequency_hz() / 1000
        );
    }

    loop {
        print!("Enter a number (1-2): ");
        io::stdout().flush()?;

        let mut line = String::new();
        if stdin.lock().read_line(&mut line)? == 0 {
            return Err(io::Error::new(io::ErrorKind::UnexpectedEof, "no selection"));
        }
        match Board::for_platform(Platform::Esp32, Some(&line)) {
            Ok(board) => return Ok(board),
            Err(_) => println!("Invalid choice. Try again."),
        }
    }
}

/// Pick the board. An unknown platform is fatal; ESP32 without `--board`
/// falls back to the menu.
fn resolve_board(options: &Options) -> Result<Board, String> {
    let name = options.platform.as_deref().unwrap_or("esp32");
    let platform: Platform = name.parse().map_err(|e: ConfigError| format!("{e}: {name}"))?;

    match (platform, options.board.as_deref()) {
        (Platform::Esp32, None) => prompt_board().map_err(|e| e.to_string()),
        (_, choice) => Board::for_platform(platform, choice)
            .map_err(|e| format!("{e}: {}", choice.unwrap_or_default())),
    }
}

fn resolve_part(options: &Options) -> Result<Part, String> {
    match &options.part {
        Some(text) => Part::from_menu_choice(text)
            .or_else(|_| text.parse())
            .map_err(|e: ConfigError| format!("{e}: {text}")),
        None => prompt_part().map_err(|e| e.to_string()),
    }
}

/// Board first, so an unsupported platform stops the run before any prompt
/// for the part.
fn resolve_config(options: &Options) -> Result<DiagConfig, String> {
    let board = resolve_board(options)?;
    let part = resolve_part(options)?;
    Ok(DiagConfig { board, part })
}

// ---------------------------------------------------------------------------
// Main
// ---------------------------------------------------------------------------

fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let options = match parse_options(std::env::args().skip(1)) {
        Ok(options) => options,
        Err(message) => {
            error!("{message}");
            return ExitCode::from(2);
        }
    };

    let DiagConfig { board, part } = match resolve_config(&options) {
        Ok(config) => config,
        Err(message) => {
            error!("{message}");
            return ExitCode::from(2);
        }
    };

    info!(
        "Board {} (SDA={}, SCL={}, freq={}kHz)",
        board.label(),
        board.sda_pin(),
        board.scl_pin(),
        board.frequency_hz() / 1000
    );
    let descriptor = part.descriptor();
    info!(
        "Simulating {} at 0x{:02X} ({} bytes, {}-byte pages)",
        part.ordering_code(),
        descriptor.base_bus_address,
        descriptor.capacity_bytes,
        descriptor.page_size_bytes
    );

    let mut sim = SimulatedEeprom::new(descriptor);
    for &address in &options.fail_writes_at {
        warn!("Injecting write fault at 0x{:04X}", address);
        sim.fail_writes_at(address);
    }
    for &address in &options.fail_reads_at {
        warn!("Injecting read fault at 0x{:04X}", address);
        sim.fail_reads_at(address);
    }

    let found = scan_bus(&mut sim);
    if !descriptor.bus_addresses().all(|a| found.contains(&a)) {
        warn!("{} does not answer on all of its bus addresses", part);
    }

    let mut eeprom = Eeprom::new(sim, StdDelay, descriptor);
    let mut clock = StdClock {
        origin: Instant::now(),
    };
    let report = SelfTest::new(part.name()).run(&mut eeprom, &mut clock);

    println!();
    println!("Board:    {}", board.label());
    println!("Part:     {}", part.ordering_code());
    println!(
        "Sentinel: {} @ 0x{:04X}",
        match report.sentinel {
            SentinelOutcome::Passed => "pass",
            SentinelOutcome::Mismatch { .. } => "MISMATCH",
            SentinelOutcome::WriteFailed(_) | SentinelOutcome::ReadFailed(_) => "FAIL",
        },
        report.sentinel_address
    );
    println!(
        "Block:    {} ({} bytes @ 0x{:04X}, {} ms)",
        match report.block {
            BlockOutcome::Passed => "pass",
            BlockOutcome::DataMismatch { .. } => "MISMATCH",
            BlockOutcome::WriteFailed(_) | BlockOutcome::ReadFailed(_) => "FAIL",
        },
        report.block_len,
        report.block_start,
        report.elapsed_ms
    );

    if report.passed() {
        println!("Result:   PASS");
        ExitCode::SUCCESS
    } else {
        println!("Result:   FAIL");
        ExitCode::FAILURE
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(list: &[&str]) -> impl Iterator<Item = String> {
        list.iter().map(|s| s.to_string()).collect::<Vec<_>>().into_iter()
    }

    #[test]
    fn test_parse_address() {
        assert_eq!(parse_address("1023"), Some(1023));
        assert_eq!(parse_address("0x3FF"), Some(1023));
        assert_eq!(parse_address("zz"), None);
    }

    #[test]
    fn test_parse_options() {
        let options = parse_options(args(&["m24c08", "--fail-at", "0x208"])).unwrap();
        assert_eq!(options.part.as_deref(), Some("m24c08"));
        assert_eq!(options.fail_writes_at, [0x208]);
        assert!(options.fail_reads_at.is_empty());

        let options = parse_options(args(&["--platform", "rp2", "--board", "2"])).unwrap();
        assert_eq!(options.platform.as_deref(), Some("rp2"));
        assert_eq!(options.board.as_deref(), Some("2"));
        assert!(options.part.is_none());

        assert!(parse_options(args(&["--platform"])).is_err());
        assert!(parse_options(args(&["--fail-at"])).is_err());
        assert!(parse_options(args(&["--verbose"])).is_err());
        assert!(parse_options(args(&["1", "2"])).is_err());
    }

    #[test]
    fn test_resolve_part_from_argument() {
        let options = Options {
            part: Some("4".into()),
            ..Options::default()
        };
        assert_eq!(resolve_part(&options), Ok(Part::AT24C64));

        let options = Options {
            part: Some("at24c08".into()),
            ..Options::default()
        };
        assert_eq!(resolve_part(&options), Ok(Part::AT24C08));

        let options = Options {
            part: Some("24LC256".into()),
            ..Options::default()
        };
        assert!(resolve_part(&options).is_err());
    }

    #[test]
    fn test_resolve_board_from_arguments() {
        let options = Options {
            platform: Some("rp2".into()),
            ..Options::default()
        };
        assert_eq!(resolve_board(&options), Ok(Board::Rp2040));

        let options = Options {
            board: Some("1".into()),
            ..Options::default()
        };
        assert_eq!(resolve_board(&options), Ok(Board::Esp32Nano));

        let options = Options {
            platform: Some("esp32".into()),
            board: Some("2".into()),
            ..Options::default()
        };
        assert_eq!(resolve_board(&options), Ok(Board::Esp32NonNano));
    }

    #[test]
    fn test_resolve_board_rejects_bad_input() {
        let options = Options {
            platform: Some("linux".into()),
            board: Some("1".into()),
            ..Options::default()
        };
        assert_eq!(
            resolve_board(&options),
            Err("Unsupported platform: linux".to_string())
        );

        let options = Options {
            board: Some("7".into()),
            ..Options::default()
        };
        assert_eq!(resolve_board(&options), Err("Invalid choice: 7".to_string()));
    }

    #[test]
    fn test_resolve_config() {
        let options = Options {
            part: Some("3".into()),
            platform: Some("rp2".into()),
            ..Options::default()
        };
        assert_eq!(
            resolve_config(&options),
            Ok(DiagConfig {
                board: Board::Rp2040,
                part: Part::M24C64,
            })
        );

        // Rejected before the part is looked at
        let options = Options {
            part: Some("24LC256".into()),
            platform: Some("stm32".into()),
            ..Options::default()
        };
        assert_eq!(
            resolve_config(&options),
            Err("Unsupported platform: stm32".to_string())
        );
    }
}
