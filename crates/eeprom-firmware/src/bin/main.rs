#![no_std]
#![no_main]
#![deny(
    clippy::mem_forget,
    reason = "mem::forget is generally not safe to do with esp_hal types, especially those \
    holding buffers for the duration of a data transfer."
)]
#![deny(clippy::large_stack_frames)]

use esp_hal::clock::CpuClock;
use esp_hal::delay::Delay;
use esp_hal::i2c::master::{Config as I2cConfig, I2c};
use esp_hal::time::{Instant, Rate};
use log::{error, info, warn};

use eeprom_core::{DiagConfig, Eeprom, MonotonicClock, SelfTest, scan_bus};

/// Part in the socket, fixed at build time by `build.rs`.
const EEPROM_PART: &str = env!("EEPROM_PART");

/// ESP32 board menu entry matching the enabled pin layout feature.
#[cfg(feature = "board-nano")]
const BOARD_CHOICE: &str = "1";
#[cfg(not(feature = "board-nano"))]
const BOARD_CHOICE: &str = "2";

#[panic_handler]
fn panic(info: &core::panic::PanicInfo) -> ! {
    rtt_target::rprintln!("PANIC: {}", info);
    loop {}
}

extern crate alloc;

// This creates a default app-descriptor required by the esp-idf bootloader.
// For more information see: <https://docs.espressif.com/projects/esp-idf/en/stable/esp32/api-reference/system/app_image_format.html#application-description>
esp_bootloader_esp_idf::esp_app_desc!();

/// Milliseconds since boot from the system timer.
struct SystemClock;

impl MonotonicClock for SystemClock {
    fn now_ms(&mut self) -> u64 {
        Instant::now().duration_since_epoch().as_millis()
    }
}

/// Stop after a configuration error. Nothing else can run without a part.
fn halt(delay: &Delay) -> ! {
    loop {
        delay.delay_millis(1000);
    }
}

#[esp_hal::main]
fn main() -> ! {
    rtt_target::rtt_init_log!();

    let config = esp_hal::Config::default().with_cpu_clock(CpuClock::max());
    let peripherals = esp_hal::init(config);

    esp_alloc::heap_allocator!(#[esp_hal::ram(reclaimed)] size: 73744);

    let delay = Delay::new();

    let DiagConfig { board, part } =
        match DiagConfig::from_inputs("esp32", Some(BOARD_CHOICE), EEPROM_PART) {
            Ok(config) => config,
            Err(e) => {
                error!("{}: {:?}. Rebuild with a supported EEPROM_PART.", e, EEPROM_PART);
                halt(&delay);
            }
        };

    info!(
        "ESP32 board {} (SDA={}, SCL={}, freq={}kHz)",
        board.label(),
        board.sda_pin(),
        board.scl_pin(),
        board.frequency_hz() / 1000
    );

    let i2c_config = I2cConfig::default().with_frequency(Rate::from_hz(board.frequency_hz()));
    let i2c = match I2c::new(peripherals.I2C0, i2c_config) {
        Ok(i2c) => i2c,
        Err(e) => {
            error!("I2C initialization failed: {:?}", e);
            halt(&delay);
        }
    };

    #[cfg(feature = "board-nano")]
    let mut i2c = i2c.with_sda(peripherals.GPIO11).with_scl(peripherals.GPIO12);
    #[cfg(not(feature = "board-nano"))]
    let mut i2c = i2c.with_sda(peripherals.GPIO4).with_scl(peripherals.GPIO5);

    let descriptor = part.descriptor();
    let found = scan_bus(&mut i2c);
    if !found.contains(&descriptor.base_bus_address) {
        warn!(
            "{} expected at 0x{:02X} but did not answer the scan",
            part.ordering_code(),
            descriptor.base_bus_address
        );
    }

    let mut eeprom = Eeprom::new(i2c, Delay::new(), descriptor);
    let report = SelfTest::new(part.ordering_code()).run(&mut eeprom, &mut SystemClock);

    if report.passed() {
        info!("{}: PASS ({} ms)", part.ordering_code(), report.elapsed_ms);
    } else {
        error!("{}: FAIL {:?}", part.ordering_code(), report);
    }

    loop {
        delay.delay_millis(1000);
    }
}
