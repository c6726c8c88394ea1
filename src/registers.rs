// Copyright 2024, F. Stan
//
// Licensed under the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>,
// This file may not be copied, modified, or distributed
// except according to those terms.

//! ENS160 register map and the encode/decode rules for each register.
//!
//! Addresses and layouts from the
//! [datasheet](https://www.sciosense.com/wp-content/uploads/2023/12/ENS160-Datasheet.pdf).
//! Multi-byte words are little-endian.

use bitflags::bitflags;
use std::fmt;

/// Part id reported by every ENS160 in `PART_ID`.
pub const EXPECTED_PART_ID: u16 = 0x0160;

/// Length of the general purpose read and write blocks.
pub const GPR_LEN: usize = 8;

/// Offset of the firmware version inside the general purpose read block.
pub const GPR_FW_VERSION_OFFSET: usize = 4;

/// Lowest accepted compensation temperature, Celsius.
pub const TEMP_MIN_CELSIUS: f32 = -40.0;
/// Highest accepted compensation temperature, Celsius.
pub const TEMP_MAX_CELSIUS: f32 = 85.0;
pub const TEMP_MIN_KELVIN: f32 = 233.15;
pub const TEMP_MAX_KELVIN: f32 = 358.15;
pub const TEMP_MIN_FAHRENHEIT: f32 = -40.0;
pub const TEMP_MAX_FAHRENHEIT: f32 = 185.0;
pub const RH_MIN_PERCENT: f32 = 0.0;
pub const RH_MAX_PERCENT: f32 = 100.0;

const KELVIN_OFFSET: f32 = 273.15;
const TEMP_SCALE: f32 = 64.0;
const RH_SCALE: f32 = 512.0;
const AQI_MASK: u8 = 0x07;

/// ENS160 registers
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum Register {
    /// Device identity, 0x0160
    PartId = 0x00,
    OpMode = 0x10,
    /// Interrupt pin configuration
    Config = 0x11,
    /// Additional system commands, only accepted in idle mode
    Command = 0x12,
    /// Host ambient temperature
    TempIn = 0x13,
    /// Host relative humidity
    RhIn = 0x15,
    DeviceStatus = 0x20,
    DataAqi = 0x21,
    DataTvoc = 0x22,
    DataEco2 = 0x24,
    /// Temperature used in the calculations
    DataT = 0x30,
    /// Relative humidity used in the calculations
    DataRh = 0x32,
    /// Data integrity field
    DataMisr = 0x38,
    GprWrite = 0x40,
    GprRead = 0x48,
}

impl Register {
    pub const fn address(self) -> u8 {
        self as u8
    }

    /// Number of bytes the register occupies.
    pub const fn width(self) -> usize {
        match self {
            Register::PartId => 2,
            Register::OpMode => 1,
            Register::Config => 1,
            Register::Command => 1,
            Register::TempIn => 2,
            Register::RhIn => 2,
            Register::DeviceStatus => 1,
            Register::DataAqi => 1,
            Register::DataTvoc => 2,
            Register::DataEco2 => 2,
            Register::DataT => 2,
            Register::DataRh => 2,
            Register::DataMisr => 1,
            Register::GprWrite => GPR_LEN,
            Register::GprRead => GPR_LEN,
        }
    }
}

/// Operating modes written to and read from `OP_MODE`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OperatingMode {
    /// Low power, only answers an `OP_MODE` write
    DeepSleep,
    /// Low power, accepts commands
    Idle,
    /// Gas sensing
    Standard,
    /// Resets the device. Write only, the device comes back in deep sleep.
    Reset,
    /// Undocumented value read back from the device
    Reserved(u8),
}

impl OperatingMode {
    pub const fn from_byte(byte: u8) -> Self {
        match byte {
            0x00 => OperatingMode::DeepSleep,
            0x01 => OperatingMode::Idle,
            0x02 => OperatingMode::Standard,
            0xF0 => OperatingMode::Reset,
            other => OperatingMode::Reserved(other),
        }
    }

    pub const fn to_byte(self) -> u8 {
        match self {
            OperatingMode::DeepSleep => 0x00,
            OperatingMode::Idle => 0x01,
            OperatingMode::Standard => 0x02,
            OperatingMode::Reset => 0xF0,
            OperatingMode::Reserved(byte) => byte,
        }
    }
}

/// Opcodes for the `COMMAND` register.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum Command {
    Nop = 0x00,
    /// Places the firmware version in GPR_READ 4..7
    GetAppVersion = 0x0E,
    /// Clears the general purpose read registers
    ClearGpr = 0xCC,
}

impl Command {
    pub const fn opcode(self) -> u8 {
        self as u8
    }
}

bitflags! {
    /// Raw bits of `DEVICE_STATUS`.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct StatusFlags: u8 {
        /// NEWGPR, bit 0: new data in the general purpose read registers
        const NEW_GPR = 0b0000_0001;
        /// NEWDAT, bit 1: new data in the data registers
        const NEW_DATA = 0b0000_0010;
        /// VALIDITY FLAG, bits 3..2
        const VALIDITY = 0b0000_1100;
        /// STATER, bit 6: an error was detected, e.g. invalid operating mode
        const ERROR = 0b0100_0000;
        /// STATAS, bit 7: an operating mode is running
        const OPERATING = 0b1000_0000;
    }
}

/// Value of the two-bit validity field of `DEVICE_STATUS`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Validity {
    NormalOperation = 0,
    /// First 3 minutes after power-on
    WarmUp = 1,
    /// First full hour of operation after initial power-on
    InitialStartUp = 2,
    /// Signals out of range, data is not usable
    InvalidOutput = 3,
}

impl Validity {
    const SHIFT: u32 = 2;

    fn from_flags(flags: StatusFlags) -> Self {
        match (flags & StatusFlags::VALIDITY).bits() >> Self::SHIFT {
            0 => Validity::NormalOperation,
            1 => Validity::WarmUp,
            2 => Validity::InitialStartUp,
            _ => Validity::InvalidOutput,
        }
    }

    fn bits(self) -> u8 {
        (self as u8) << Self::SHIFT
    }
}

/// Decoded snapshot of `DEVICE_STATUS`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DeviceStatus {
    pub operating: bool,
    pub error: bool,
    pub validity: Validity,
    pub new_data: bool,
    pub new_gpr: bool,
}

impl DeviceStatus {
    pub fn from_byte(byte: u8) -> Self {
        let flags = StatusFlags::from_bits_retain(byte);
        DeviceStatus {
            operating: flags.contains(StatusFlags::OPERATING),
            error: flags.contains(StatusFlags::ERROR),
            validity: Validity::from_flags(flags),
            new_data: flags.contains(StatusFlags::NEW_DATA),
            new_gpr: flags.contains(StatusFlags::NEW_GPR),
        }
    }

    pub fn to_byte(self) -> u8 {
        let mut flags = StatusFlags::from_bits_retain(self.validity.bits());
        flags.set(StatusFlags::OPERATING, self.operating);
        flags.set(StatusFlags::ERROR, self.error);
        flags.set(StatusFlags::NEW_DATA, self.new_data);
        flags.set(StatusFlags::NEW_GPR, self.new_gpr);
        flags.bits()
    }
}

/// Firmware (application) version from the `GET_APPVER` command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FirmwareVersion {
    pub major: u8,
    pub minor: u8,
    pub release: u8,
}

impl fmt::Display for FirmwareVersion {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}.{}.{}", self.major, self.minor, self.release)
    }
}

/// One set of gas readings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Measurement {
    /// Air Quality Index (UBA), 1 (excellent) to 5 (unhealthy)
    pub aqi: u8,
    /// Total volatile organic compounds [ppb]
    pub tvoc: u16,
    /// Equivalent CO2 [ppm]
    pub eco2: u16,
}

impl Measurement {
    /// Length of the `DATA_AQI`..`DATA_ECO2` span read in one transfer.
    pub const BLOCK_LEN: usize = 5;

    pub fn from_block(block: [u8; Self::BLOCK_LEN]) -> Self {
        Measurement {
            aqi: decode_aqi(block[0]),
            tvoc: decode_word([block[1], block[2]]),
            eco2: decode_word([block[3], block[4]]),
        }
    }
}

/// Compensation values the device is currently using.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Compensation {
    /// Temperature [°C]
    pub temperature: f32,
    /// Relative humidity [%RH]
    pub humidity: f32,
}

pub fn decode_word(bytes: [u8; 2]) -> u16 {
    u16::from_le_bytes(bytes)
}

pub fn decode_aqi(byte: u8) -> u8 {
    byte & AQI_MASK
}

/// Fixed point temperature word: round(K × 64).
pub fn encode_temperature_kelvin(kelvin: f32) -> [u8; 2] {
    ((kelvin * TEMP_SCALE).round() as u16).to_le_bytes()
}

/// Fixed point temperature word: round((°C + 273.15) × 64).
pub fn encode_temperature_celsius(celsius: f32) -> [u8; 2] {
    encode_temperature_kelvin(celsius + KELVIN_OFFSET)
}

pub fn decode_temperature_celsius(bytes: [u8; 2]) -> f32 {
    decode_word(bytes) as f32 / TEMP_SCALE - KELVIN_OFFSET
}

pub fn fahrenheit_to_celsius(fahrenheit: f32) -> f32 {
    (fahrenheit - 32.0) * 5.0 / 9.0
}

/// Fixed point humidity word: round(%RH × 512).
pub fn encode_humidity(percent: f32) -> [u8; 2] {
    ((percent * RH_SCALE).round() as u16).to_le_bytes()
}

pub fn decode_humidity(bytes: [u8; 2]) -> f32 {
    decode_word(bytes) as f32 / RH_SCALE
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_bits_one_at_a_time() {
        let idle = DeviceStatus {
            operating: false,
            error: false,
            validity: Validity::NormalOperation,
            new_data: false,
            new_gpr: false,
        };
        assert_eq!(DeviceStatus::from_byte(0), idle);
        assert_eq!(
            DeviceStatus::from_byte(0b0000_0001),
            DeviceStatus { new_gpr: true, ..idle }
        );
        assert_eq!(
            DeviceStatus::from_byte(0b0000_0010),
            DeviceStatus { new_data: true, ..idle }
        );
        assert_eq!(
            DeviceStatus::from_byte(0b0000_0100),
            DeviceStatus { validity: Validity::WarmUp, ..idle }
        );
        assert_eq!(
            DeviceStatus::from_byte(0b0000_1000),
            DeviceStatus { validity: Validity::InitialStartUp, ..idle }
        );
        assert_eq!(
            DeviceStatus::from_byte(0b0000_1100),
            DeviceStatus { validity: Validity::InvalidOutput, ..idle }
        );
        assert_eq!(
            DeviceStatus::from_byte(0b0100_0000),
            DeviceStatus { error: true, ..idle }
        );
        assert_eq!(
            DeviceStatus::from_byte(0b1000_0000),
            DeviceStatus { operating: true, ..idle }
        );
    }

    #[test]
    fn status_byte_round_trip() {
        // bits 4 and 5 are reserved and not kept
        for byte in [0x00u8, 0x83, 0x8E, 0x42, 0xCF] {
            assert_eq!(DeviceStatus::from_byte(byte).to_byte(), byte);
        }
    }

    #[test]
    fn operating_mode_bytes() {
        assert_eq!(OperatingMode::from_byte(0x00), OperatingMode::DeepSleep);
        assert_eq!(OperatingMode::from_byte(0x01), OperatingMode::Idle);
        assert_eq!(OperatingMode::from_byte(0x02), OperatingMode::Standard);
        assert_eq!(OperatingMode::from_byte(0xF0), OperatingMode::Reset);
        assert_eq!(OperatingMode::from_byte(0x07), OperatingMode::Reserved(0x07));
        assert_eq!(OperatingMode::Reserved(0x07).to_byte(), 0x07);
    }

    #[test]
    fn register_widths() {
        assert_eq!(Register::PartId.width(), 2);
        assert_eq!(Register::DeviceStatus.width(), 1);
        assert_eq!(Register::GprRead.width(), GPR_LEN);
        assert_eq!(Register::DataEco2.address(), 0x24);
    }

    #[test]
    fn temperature_encoding() {
        // (25 + 273.15) * 64 = 19081.6
        assert_eq!(encode_temperature_celsius(25.0), 19082u16.to_le_bytes());
        assert_eq!(encode_temperature_kelvin(298.15), encode_temperature_celsius(25.0));
        let celsius = decode_temperature_celsius(encode_temperature_celsius(21.5));
        assert!((celsius - 21.5).abs() <= 1.0 / 128.0);
    }

    #[test]
    fn fahrenheit_conversion() {
        assert!((fahrenheit_to_celsius(212.0) - 100.0).abs() < 1e-4);
        assert!((fahrenheit_to_celsius(-40.0) + 40.0).abs() < 1e-4);
    }

    #[test]
    fn humidity_round_trip_within_half_lsb() {
        let mut percent = RH_MIN_PERCENT;
        while percent <= RH_MAX_PERCENT {
            let decoded = decode_humidity(encode_humidity(percent));
            assert!((decoded - percent).abs() <= 0.5 / 512.0 + 1e-4, "{percent}");
            percent += 0.37;
        }
        assert_eq!(encode_humidity(100.0), 51200u16.to_le_bytes());
        assert_eq!(encode_humidity(50.0), [0x00, 0x64]);
    }

    #[test]
    fn measurement_block() {
        let m = Measurement::from_block([0xF2, 0x10, 0x02, 0x90, 0x01]);
        assert_eq!(m, Measurement { aqi: 2, tvoc: 0x0210, eco2: 400 });
    }

    #[test]
    fn firmware_version_display() {
        let v = FirmwareVersion { major: 5, minor: 4, release: 6 };
        assert_eq!(v.to_string(), "5.4.6");
    }
}
