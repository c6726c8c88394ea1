// Copyright 2024, F. Stan
//
// Licensed under the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>,
// This file may not be copied, modified, or distributed
// except according to those terms.

//! ENS160 operating mode state machine and register sequencing.

use log::{debug, warn};
use std::thread;

use crate::config::Config;
use crate::error::{Ens160Error, Ens160Result};
use crate::registers::{
    decode_aqi, decode_humidity, decode_temperature_celsius, decode_word, encode_humidity,
    encode_temperature_celsius, encode_temperature_kelvin, fahrenheit_to_celsius, Command,
    Compensation, DeviceStatus, FirmwareVersion, Measurement, OperatingMode, Register,
    GPR_FW_VERSION_OFFSET, GPR_LEN, RH_MAX_PERCENT, RH_MIN_PERCENT, TEMP_MAX_CELSIUS,
    TEMP_MAX_FAHRENHEIT, TEMP_MAX_KELVIN, TEMP_MIN_CELSIUS, TEMP_MIN_FAHRENHEIT, TEMP_MIN_KELVIN,
};
use crate::transport::{RegisterBus, Transport};

/// What the driver last knew the device to be doing.
///
/// A failed call leaves the state where it was; nothing stays latched
/// across calls.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DriverState {
    /// Power-up or after a reset, idle mode not yet entered
    Uninitialized,
    DeepSleep,
    Idle,
    Standard,
}

impl DriverState {
    fn entered_by(mode: OperatingMode) -> Option<DriverState> {
        match mode {
            OperatingMode::DeepSleep => Some(DriverState::DeepSleep),
            OperatingMode::Idle => Some(DriverState::Idle),
            OperatingMode::Standard => Some(DriverState::Standard),
            OperatingMode::Reset => Some(DriverState::Uninitialized),
            OperatingMode::Reserved(_) => None,
        }
    }
}

/// Outcome of the part id check done by `init`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IdentityCheck {
    Match,
    /// Something answered, but not with the ENS160 part id
    Mismatch { expected: u16, found: u16 },
}

impl IdentityCheck {
    pub fn is_match(&self) -> bool {
        matches!(self, IdentityCheck::Match)
    }
}

fn check_range<E>(quantity: &'static str, value: f32, min: f32, max: f32) -> Ens160Result<(), E> {
    if (min..=max).contains(&value) {
        Ok(())
    } else {
        Err(Ens160Error::InvalidArgument {
            quantity,
            value,
            min,
            max,
        })
    }
}

/// Register-level protocol for one ENS160.
pub struct Protocol<B> {
    transport: Transport<B>,
    state: DriverState,
    config: Config,
}

impl<B: RegisterBus> Protocol<B> {
    pub fn new(bus: B, config: Config) -> Self {
        Protocol {
            transport: Transport::new(bus, config.retry),
            state: DriverState::Uninitialized,
            config,
        }
    }

    pub fn state(&self) -> DriverState {
        self.state
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn transport(&self) -> &Transport<B> {
        &self.transport
    }

    pub fn transport_mut(&mut self) -> &mut Transport<B> {
        &mut self.transport
    }

    pub fn into_bus(self) -> B {
        self.transport.into_inner()
    }

    /// Checks the part id against `expected` and brings the device to idle.
    ///
    /// A wrong part id is reported in the result, the device is still put in idle.
    pub fn init(&mut self, expected: u16) -> Ens160Result<IdentityCheck, B::Error> {
        let found = self.part_id()?;
        let check = if found == expected {
            IdentityCheck::Match
        } else {
            warn!("unexpected part id {found:#06x}, expected {expected:#06x}");
            IdentityCheck::Mismatch { expected, found }
        };
        self.set_operating_mode(OperatingMode::Idle)?;
        thread::sleep(self.config.boot_settle);
        Ok(check)
    }

    pub fn part_id(&mut self) -> Ens160Result<u16, B::Error> {
        Ok(decode_word(self.transport.read(Register::PartId)?))
    }

    /// Writes `OP_MODE`.
    ///
    /// Standard mode is refused until idle has been entered since power-up
    /// or reset. Deep sleep entered before that keeps the state
    /// uninitialized. Warm-up is not waited for; it shows in the status
    /// validity.
    pub fn set_operating_mode(&mut self, mode: OperatingMode) -> Ens160Result<(), B::Error> {
        let next = match (self.state, DriverState::entered_by(mode)) {
            (_, None) => return Err(Ens160Error::InvalidMode(mode)),
            (DriverState::Uninitialized, Some(DriverState::Standard)) => {
                return Err(Ens160Error::InvalidState {
                    state: self.state,
                    operation: "enter standard mode",
                })
            }
            (DriverState::Uninitialized, Some(DriverState::DeepSleep)) => {
                DriverState::Uninitialized
            }
            (_, Some(next)) => next,
        };
        self.transport.write(Register::OpMode, &[mode.to_byte()])?;
        debug!("operating mode {:?} -> {mode:?}", self.state);
        self.state = next;
        Ok(())
    }

    /// Reads `OP_MODE` back and refreshes the known state from it.
    ///
    /// Deep sleep read back after power-up or reset keeps the state
    /// uninitialized, since idle still has to be entered first.
    pub fn get_operating_mode(&mut self) -> Ens160Result<OperatingMode, B::Error> {
        let mode = OperatingMode::from_byte(self.transport.read_byte(Register::OpMode)?);
        match (self.state, mode) {
            (DriverState::Uninitialized, OperatingMode::DeepSleep) => {}
            (_, OperatingMode::DeepSleep) => self.state = DriverState::DeepSleep,
            (_, OperatingMode::Idle) => self.state = DriverState::Idle,
            (_, OperatingMode::Standard) => self.state = DriverState::Standard,
            (_, OperatingMode::Reset) | (_, OperatingMode::Reserved(_)) => {}
        }
        Ok(mode)
    }

    pub fn device_status(&mut self) -> Ens160Result<DeviceStatus, B::Error> {
        Ok(DeviceStatus::from_byte(
            self.transport.read_byte(Register::DeviceStatus)?,
        ))
    }

    pub fn aqi(&mut self) -> Ens160Result<u8, B::Error> {
        Ok(decode_aqi(self.transport.read_byte(Register::DataAqi)?))
    }

    pub fn tvoc(&mut self) -> Ens160Result<u16, B::Error> {
        Ok(decode_word(self.transport.read(Register::DataTvoc)?))
    }

    pub fn eco2(&mut self) -> Ens160Result<u16, B::Error> {
        Ok(decode_word(self.transport.read(Register::DataEco2)?))
    }

    /// Reads the status and, only if it flags new data, all three
    /// readings in a single transfer.
    pub fn read_measurement(&mut self) -> Ens160Result<Option<Measurement>, B::Error> {
        if !self.device_status()?.new_data {
            return Ok(None);
        }
        let block = self.transport.read(Register::DataAqi)?;
        Ok(Some(Measurement::from_block(block)))
    }

    pub fn set_rh_compensation(&mut self, percent: f32) -> Ens160Result<(), B::Error> {
        check_range::<B::Error>("humidity", percent, RH_MIN_PERCENT, RH_MAX_PERCENT)?;
        self.transport.write(Register::RhIn, &encode_humidity(percent))?;
        Ok(())
    }

    pub fn set_temp_compensation_kelvin(&mut self, kelvin: f32) -> Ens160Result<(), B::Error> {
        check_range::<B::Error>("temperature (K)", kelvin, TEMP_MIN_KELVIN, TEMP_MAX_KELVIN)?;
        self.transport
            .write(Register::TempIn, &encode_temperature_kelvin(kelvin))?;
        Ok(())
    }

    pub fn set_temp_compensation_celsius(&mut self, celsius: f32) -> Ens160Result<(), B::Error> {
        check_range::<B::Error>(
            "temperature (°C)",
            celsius,
            TEMP_MIN_CELSIUS,
            TEMP_MAX_CELSIUS,
        )?;
        self.transport
            .write(Register::TempIn, &encode_temperature_celsius(celsius))?;
        Ok(())
    }

    /// Checked in Fahrenheit, so errors carry the value as given.
    pub fn set_temp_compensation_fahrenheit(
        &mut self,
        fahrenheit: f32,
    ) -> Ens160Result<(), B::Error> {
        check_range::<B::Error>(
            "temperature (°F)",
            fahrenheit,
            TEMP_MIN_FAHRENHEIT,
            TEMP_MAX_FAHRENHEIT,
        )?;
        let celsius = fahrenheit_to_celsius(fahrenheit);
        self.transport
            .write(Register::TempIn, &encode_temperature_celsius(celsius))?;
        Ok(())
    }

    /// Temperature and humidity the device is compensating with.
    pub fn compensation(&mut self) -> Ens160Result<Compensation, B::Error> {
        // DATA_T and DATA_RH are adjacent
        let [t0, t1, rh0, rh1] = self.transport.read::<4>(Register::DataT)?;
        Ok(Compensation {
            temperature: decode_temperature_celsius([t0, t1]),
            humidity: decode_humidity([rh0, rh1]),
        })
    }

    pub fn gpr(&mut self) -> Ens160Result<[u8; GPR_LEN], B::Error> {
        Ok(self.transport.read(Register::GprRead)?)
    }

    /// Clears NEWGPR by reading the general purpose registers. The CLRGPR
    /// command does not reliably clear it.
    pub fn clear_gpr_read_flag(&mut self) -> Ens160Result<(), B::Error> {
        self.gpr()?;
        Ok(())
    }

    /// Asks for the firmware version and waits for it in the general purpose registers.
    /// Commands are only accepted in idle mode.
    pub fn fw_version(&mut self) -> Ens160Result<FirmwareVersion, B::Error> {
        if self.state != DriverState::Idle {
            return Err(Ens160Error::InvalidState {
                state: self.state,
                operation: "read the firmware version",
            });
        }
        self.clear_gpr_read_flag()?;
        self.command(Command::GetAppVersion)?;
        let gpr = self.gpr()?;
        let version = &gpr[GPR_FW_VERSION_OFFSET..];
        Ok(FirmwareVersion {
            major: version[0],
            minor: version[1],
            release: version[2],
        })
    }

    /// Writes `command` and polls the status until the response is flagged.
    fn command(&mut self, command: Command) -> Ens160Result<(), B::Error> {
        self.transport.write(Register::Command, &[command.opcode()])?;
        for _ in 0..self.config.command_poll_attempts {
            if self.device_status()?.new_gpr {
                return Ok(());
            }
            thread::sleep(self.config.command_poll_interval);
        }
        Err(Ens160Error::CommandTimeout(command))
    }

    /// Resets the device and waits for it to come back in deep sleep.
    ///
    /// Idle has to be entered again before standard mode.
    pub fn reset(&mut self) -> Ens160Result<(), B::Error> {
        self.set_operating_mode(OperatingMode::Reset)?;
        for _ in 0..self.config.reset_poll_attempts {
            let mode = OperatingMode::from_byte(self.transport.read_byte(Register::OpMode)?);
            if mode == OperatingMode::DeepSleep {
                self.clear_gpr_read_flag()?;
                self.state = DriverState::Uninitialized;
                return Ok(());
            }
            thread::sleep(self.config.reset_poll_interval);
        }
        Err(Ens160Error::ResetTimeout)
    }
}
