// Copyright 2024, F. Stan
//
// Licensed under the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>,
// This file may not be copied, modified, or distributed
// except according to those terms.

//! Register access with bounded retries.
//!
//! [`RegisterBus`] is the single-attempt primitive the host supplies.
//! [`Transport`] wraps it and repeats transfers that failed with a
//! transient fault, sleeping between attempts.

use i2cdev::core::I2CDevice;
use log::{debug, warn};
use std::time::Duration;
use std::thread;

use crate::error::{BusFault, FaultKind, TransportError};
use crate::registers::Register;

/// Single-attempt register access on one device.
pub trait RegisterBus {
    type Error: BusFault;

    /// Reads `buf.len()` consecutive bytes starting at `register`.
    fn read_registers(&mut self, register: u8, buf: &mut [u8]) -> Result<(), Self::Error>;

    /// Writes `data` to consecutive registers starting at `register`.
    fn write_registers(&mut self, register: u8, data: &[u8]) -> Result<(), Self::Error>;
}

/// [`RegisterBus`] over any `i2cdev` device.
///
/// A read sets the register pointer with a one byte write and then reads,
/// a write sends the register address followed by the data in one frame.
pub struct I2cdevBus<D> {
    device: D,
}

impl<D: I2CDevice> I2cdevBus<D> {
    pub fn new(device: D) -> Self {
        I2cdevBus { device }
    }

    pub fn device(&self) -> &D {
        &self.device
    }

    pub fn device_mut(&mut self) -> &mut D {
        &mut self.device
    }

    pub fn into_inner(self) -> D {
        self.device
    }
}

impl<D> RegisterBus for I2cdevBus<D>
where
    D: I2CDevice,
    D::Error: BusFault,
{
    type Error = D::Error;

    fn read_registers(&mut self, register: u8, buf: &mut [u8]) -> Result<(), Self::Error> {
        self.device.write(&[register])?;
        self.device.read(buf)
    }

    fn write_registers(&mut self, register: u8, data: &[u8]) -> Result<(), Self::Error> {
        let mut frame = Vec::with_capacity(data.len() + 1);
        frame.push(register);
        frame.extend_from_slice(data);
        self.device.write(&frame)
    }
}

/// Growth of the delay between attempts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Backoff {
    Fixed,
    /// Doubles per retry, capped at 16 times the base delay
    Exponential,
}

/// How often and how patiently a failed transfer is repeated.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Retries after the first attempt
    pub retries: u32,
    /// Delay before the first retry
    pub delay: Duration,
    pub backoff: Backoff,
}

impl RetryPolicy {
    const MAX_BACKOFF_FACTOR: u32 = 16;

    pub const fn new(retries: u32, delay: Duration) -> Self {
        RetryPolicy {
            retries,
            delay,
            backoff: Backoff::Fixed,
        }
    }

    /// No retries, fail on the first fault.
    pub const fn none() -> Self {
        RetryPolicy::new(0, Duration::ZERO)
    }

    pub fn with_backoff(mut self, backoff: Backoff) -> Self {
        self.backoff = backoff;
        self
    }

    /// Total number of attempts a transfer gets.
    pub const fn attempts(&self) -> u32 {
        self.retries.saturating_add(1)
    }

    /// Delay before retry number `retry` (0-based).
    pub fn delay_for(&self, retry: u32) -> Duration {
        match self.backoff {
            Backoff::Fixed => self.delay,
            Backoff::Exponential => {
                let factor = 1u32
                    .checked_shl(retry)
                    .unwrap_or(u32::MAX)
                    .min(Self::MAX_BACKOFF_FACTOR);
                self.delay.saturating_mul(factor)
            }
        }
    }
}

impl Default for RetryPolicy {
    /// 5 retries, 10 ms apart.
    fn default() -> Self {
        RetryPolicy::new(5, Duration::from_millis(10))
    }
}

/// Retrying register transport.
///
/// Every read or write is atomic from the caller's point of view: a failed
/// attempt's partial data is dropped and the whole transfer is issued again.
pub struct Transport<B> {
    bus: B,
    policy: RetryPolicy,
}

impl<B: RegisterBus> Transport<B> {
    pub fn new(bus: B, policy: RetryPolicy) -> Self {
        Transport { bus, policy }
    }

    pub fn policy(&self) -> &RetryPolicy {
        &self.policy
    }

    pub fn bus(&self) -> &B {
        &self.bus
    }

    pub fn bus_mut(&mut self) -> &mut B {
        &mut self.bus
    }

    pub fn into_inner(self) -> B {
        self.bus
    }

    /// Reads `N` bytes starting at `register`. `N` may run on into the
    /// following registers but never stops inside `register`.
    pub fn read<const N: usize>(
        &mut self,
        register: Register,
    ) -> Result<[u8; N], TransportError<B::Error>> {
        debug_assert!(N >= register.width(), "partial read of {register:?}");
        self.retry("read", register, |bus| {
            let mut buf = [0u8; N];
            bus.read_registers(register.address(), &mut buf)?;
            Ok(buf)
        })
    }

    pub fn read_byte(&mut self, register: Register) -> Result<u8, TransportError<B::Error>> {
        let [byte] = self.read::<1>(register)?;
        Ok(byte)
    }

    /// Writes exactly `register.width()` bytes of `data` to `register`.
    pub fn write(
        &mut self,
        register: Register,
        data: &[u8],
    ) -> Result<(), TransportError<B::Error>> {
        debug_assert_eq!(data.len(), register.width(), "write to {register:?}");
        self.retry("write", register, |bus| {
            bus.write_registers(register.address(), data)
        })
    }

    fn retry<T>(
        &mut self,
        operation: &'static str,
        register: Register,
        mut attempt: impl FnMut(&mut B) -> Result<T, B::Error>,
    ) -> Result<T, TransportError<B::Error>> {
        let mut retry = 0;
        loop {
            let err = match attempt(&mut self.bus) {
                Ok(value) => return Ok(value),
                Err(err) => err,
            };
            match err.fault_kind() {
                FaultKind::Permanent => {
                    warn!("{operation} {register:?}: permanent bus fault: {err}");
                    return Err(TransportError::Permanent(err));
                }
                FaultKind::Transient if retry >= self.policy.retries => {
                    warn!(
                        "{operation} {register:?}: giving up after {} attempts: {err}",
                        retry + 1
                    );
                    return Err(TransportError::Exhausted {
                        attempts: retry + 1,
                        source: err,
                    });
                }
                FaultKind::Transient => {
                    let delay = self.policy.delay_for(retry);
                    debug!(
                        "{operation} {register:?}: transient fault ({err}), retry {} in {delay:?}",
                        retry + 1
                    );
                    thread::sleep(delay);
                    retry += 1;
                }
            }
        }
    }
}
