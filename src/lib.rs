// Copyright 2024, F. Stan
//
// Licensed under the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>,
// This file may not be copied, modified, or distributed
// except according to those terms.

//! ENS160 driver implementing the ENS160 I2C multi-gas sensor operations
//!
//! Registers and operations taken from the [datasheet](https://www.sciosense.com/wp-content/uploads/2023/12/ENS160-Datasheet.pdf)
//!
//! Every register access goes through a retrying transport: transient bus
//! faults (arbitration loss, NACK, timeout) are retried a bounded number of
//! times, permanent ones (no device at the address) fail at once. The bus
//! itself is anything implementing [`transport::RegisterBus`]; Linux i2c-dev
//! devices are supported out of the box through `i2cdev`.
//!
//! The driver does not log to any sink of its own. Retries and mode changes
//! are reported through the `log` facade if the application installs a logger.
//!
//! ## Basic Example
//!
//! Obtaining AQI, eCO2 and TVOC
//!
//!```no_run
//!use ens160_i2c::ens160::{Ens160, DEFAULT_ADDRESS};
//!use ens160_i2c::registers::OperatingMode;
//!use std::thread;
//!use std::time::Duration;
//!
//!fn main() -> Result<(), Box<dyn std::error::Error>> {
//!    // Open the I2C device
//!    let mut ens = Ens160::open("/dev/i2c-1", DEFAULT_ADDRESS)?;
//!    if !ens.init()?.is_match() {
//!        println!("Not an ENS160, going on anyway");
//!    }
//!    println!("Firmware version {}", ens.get_fw_version()?);
//!
//!    ens.set_rh_compensation(55.0)?;
//!    ens.set_temp_compensation_fahrenheit(72.5)?;
//!    ens.set_operating_mode(OperatingMode::Standard)?;
//!
//!    loop {
//!        match ens.get_measurement() {
//!            Ok(Some(m)) => {
//!                println!("AQI={} eCO2={} ppm TVOC={} ppb", m.aqi, m.eco2, m.tvoc);
//!            }
//!            Ok(None) => thread::sleep(Duration::from_secs(1)),
//!            Err(e) => {
//!                println!("Error obtaining measurements. More details: {}", e);
//!                thread::sleep(Duration::from_secs(10));
//!            }
//!        }
//!    }
//!}
//!```
//!

pub mod config;
/// Driver facade implementing the ENS160 operations
pub mod ens160;
pub mod error;
pub mod protocol;
pub mod registers;
pub mod transport;

pub use config::Config;
pub use ens160::Ens160;
pub use error::{BusFault, Ens160Error, Ens160Result, FaultKind, TransportError};
pub use protocol::{DriverState, IdentityCheck};
pub use registers::{DeviceStatus, FirmwareVersion, Measurement, OperatingMode};
pub use transport::{I2cdevBus, RegisterBus, RetryPolicy};
