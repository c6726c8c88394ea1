// Copyright 2024, F. Stan
//
// Licensed under the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>,
// This file may not be copied, modified, or distributed
// except according to those terms.

use i2cdev::linux::{LinuxI2CDevice, LinuxI2CError};
use std::path::Path;

use crate::config::Config;
use crate::error::Ens160Result;
use crate::protocol::{DriverState, IdentityCheck, Protocol};
use crate::registers::{
    Compensation, DeviceStatus, FirmwareVersion, Measurement, OperatingMode, EXPECTED_PART_ID,
    GPR_LEN,
};
use crate::transport::{I2cdevBus, RegisterBus};

/// I2C address with ADDR pulled high
pub const DEFAULT_ADDRESS: u16 = 0x53;
/// I2C address with ADDR pulled low
pub const ALTERNATE_ADDRESS: u16 = 0x52;

/// ENS160 struct, wraps the register protocol over a bus
/// and has implemented the ENS160 operations.
///
/// Every call blocks until the transfer, retries included, is done.
/// Share it between threads only behind your own lock.
///
pub struct Ens160<B> {
    protocol: Protocol<B>,
}

/// Linux i2c-dev constructor
impl Ens160<I2cdevBus<LinuxI2CDevice>> {
    /// Opens the ENS160 on the I2C bus at `path` (e.g. `/dev/i2c-1`)
    /// with the default configuration.
    /// If fails, return an LinuxI2CError from i2cdev
    ///
    pub fn open<P: AsRef<Path>>(path: P, address: u16) -> Result<Self, LinuxI2CError> {
        let device = LinuxI2CDevice::new(path, address)?;
        Ok(Ens160::new(I2cdevBus::new(device)))
    }
}

/// Implementation of ENS160 related
/// operations
///
impl<B: RegisterBus> Ens160<B> {
    /// Part id every ENS160 reports
    pub const PART_ID: u16 = EXPECTED_PART_ID;

    pub fn new(bus: B) -> Self {
        Ens160::with_config(bus, Config::default())
    }

    pub fn with_config(bus: B, config: Config) -> Self {
        Ens160 {
            protocol: Protocol::new(bus, config),
        }
    }

    pub fn state(&self) -> DriverState {
        self.protocol.state()
    }

    pub fn config(&self) -> &Config {
        self.protocol.config()
    }

    /// Borrow the bus, e.g. to inspect a test double.
    pub fn bus(&self) -> &B {
        self.protocol.transport().bus()
    }

    pub fn bus_mut(&mut self) -> &mut B {
        self.protocol.transport_mut().bus_mut()
    }

    /// Gives the bus back.
    pub fn release(self) -> B {
        self.protocol.into_bus()
    }

    /// Checks the part id and sets idle mode.
    /// A different part id is not an error: it comes back as
    /// `IdentityCheck::Mismatch` and the device is still put in idle,
    /// so the caller can decide whether to go on.
    ///
    pub fn init(&mut self) -> Ens160Result<IdentityCheck, B::Error> {
        self.protocol.init(Self::PART_ID)
    }

    /// Resets the device. Call `init` (or set idle mode) afterwards.
    pub fn reset(&mut self) -> Ens160Result<(), B::Error> {
        self.protocol.reset()
    }

    /// Gets the part id, expecting 0x0160.
    pub fn get_part_id(&mut self) -> Ens160Result<u16, B::Error> {
        self.protocol.part_id()
    }

    /// Gets the firmware version. Only works in idle mode.
    pub fn get_fw_version(&mut self) -> Ens160Result<FirmwareVersion, B::Error> {
        self.protocol.fw_version()
    }

    /// Sets the operating mode.
    /// Standard mode needs idle mode first after power-up or reset,
    /// otherwise returns `InvalidState` without touching the bus.
    ///
    pub fn set_operating_mode(&mut self, mode: OperatingMode) -> Ens160Result<(), B::Error> {
        self.protocol.set_operating_mode(mode)
    }

    pub fn get_operating_mode(&mut self) -> Ens160Result<OperatingMode, B::Error> {
        self.protocol.get_operating_mode()
    }

    pub fn get_device_status(&mut self) -> Ens160Result<DeviceStatus, B::Error> {
        self.protocol.device_status()
    }

    /// Sets relative humidity compensation, 0 to 100 %.
    /// Set compensation before reading data, otherwise you get zeros.
    pub fn set_rh_compensation(&mut self, percent: f32) -> Ens160Result<(), B::Error> {
        self.protocol.set_rh_compensation(percent)
    }

    /// Sets temperature compensation, -40 to 85 Celsius.
    pub fn set_temp_compensation_celsius(&mut self, celsius: f32) -> Ens160Result<(), B::Error> {
        self.protocol.set_temp_compensation_celsius(celsius)
    }

    pub fn set_temp_compensation_fahrenheit(
        &mut self,
        fahrenheit: f32,
    ) -> Ens160Result<(), B::Error> {
        self.protocol.set_temp_compensation_fahrenheit(fahrenheit)
    }

    pub fn set_temp_compensation_kelvin(&mut self, kelvin: f32) -> Ens160Result<(), B::Error> {
        self.protocol.set_temp_compensation_kelvin(kelvin)
    }

    /// Gets the compensation values the device is using.
    pub fn get_compensation(&mut self) -> Ens160Result<Compensation, B::Error> {
        self.protocol.compensation()
    }

    /// Gets the Air Quality Index 1 to 5, 1 being great and 5 being worst.
    /// Check `new_data` in the status first, this does not.
    pub fn get_aqi(&mut self) -> Ens160Result<u8, B::Error> {
        self.protocol.aqi()
    }

    /// Gets eCO2 in ppm.
    pub fn get_eco2(&mut self) -> Ens160Result<u16, B::Error> {
        self.protocol.eco2()
    }

    /// Gets the Total Volatile Organic Compounds in ppb.
    pub fn get_tvoc(&mut self) -> Ens160Result<u16, B::Error> {
        self.protocol.tvoc()
    }

    /// Gets AQI, TVOC and eCO2 together if the device flags new data,
    /// `None` otherwise.
    pub fn get_measurement(&mut self) -> Ens160Result<Option<Measurement>, B::Error> {
        self.protocol.read_measurement()
    }

    pub fn get_gpr(&mut self) -> Ens160Result<[u8; GPR_LEN], B::Error> {
        self.protocol.gpr()
    }

    pub fn clear_gpr_read_flag(&mut self) -> Ens160Result<(), B::Error> {
        self.protocol.clear_gpr_read_flag()
    }
}
