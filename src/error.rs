// Copyright 2024, F. Stan
//
// Licensed under the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>,
// This file may not be copied, modified, or distributed
// except according to those terms.

use i2cdev::linux::LinuxI2CError;
use std::error::Error;
use std::io;

use crate::protocol::DriverState;
use crate::registers::{Command, OperatingMode};

// Linux errno values reported by i2c-dev adapters.
const EIO: i32 = 5;
const ENXIO: i32 = 6;
const EAGAIN: i32 = 11;
const EBUSY: i32 = 16;
const ENODEV: i32 = 19;
const ETIMEDOUT: i32 = 110;
const EREMOTEIO: i32 = 121;

/// Whether a failed bus attempt is worth repeating.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FaultKind {
    /// Arbitration loss, NACK, timeout: expected to clear on an immediate retry.
    Transient,
    /// Wrong address, device absent, unsupported transfer: retrying cannot help.
    Permanent,
}

/// Classification of raw bus errors.
///
/// Every error type produced by a [`RegisterBus`](crate::transport::RegisterBus)
/// must say whether it is transient or permanent, so the transport knows
/// when to retry.
pub trait BusFault: Error + 'static {
    fn fault_kind(&self) -> FaultKind;
}

/// Classify a Linux errno coming back from an i2c-dev ioctl.
///
/// `ENXIO` and `ENODEV` mean nothing answered the address at all and are
/// permanent, as is anything not listed.
pub fn classify_errno(errno: i32) -> FaultKind {
    match errno {
        EIO | EAGAIN | EBUSY | ETIMEDOUT | EREMOTEIO => FaultKind::Transient,
        ENXIO | ENODEV => FaultKind::Permanent,
        _ => FaultKind::Permanent,
    }
}

impl BusFault for io::Error {
    fn fault_kind(&self) -> FaultKind {
        match self.raw_os_error() {
            Some(errno) => classify_errno(errno),
            None => match self.kind() {
                io::ErrorKind::TimedOut | io::ErrorKind::WouldBlock | io::ErrorKind::Interrupted => {
                    FaultKind::Transient
                }
                _ => FaultKind::Permanent,
            },
        }
    }
}

impl BusFault for LinuxI2CError {
    fn fault_kind(&self) -> FaultKind {
        match self {
            LinuxI2CError::Errno(errno) => classify_errno(*errno),
            LinuxI2CError::Io(e) => e.fault_kind(),
        }
    }
}

/// Failure of a register transfer after the retry policy has been applied.
#[derive(Debug, thiserror::Error)]
pub enum TransportError<E> {
    /// Every attempt failed with a transient fault. `source` is the fault of the last attempt.
    #[error("bus transfer failed after {attempts} attempts: {source}")]
    Exhausted {
        attempts: u32,
        #[source]
        source: E,
    },
    /// The bus reported a fault that retrying cannot fix.
    #[error("permanent bus fault: {0}")]
    Permanent(#[source] E),
}

impl<E> TransportError<E> {
    /// The underlying error of the last attempt.
    pub fn cause(&self) -> &E {
        match self {
            TransportError::Exhausted { source, .. } => source,
            TransportError::Permanent(source) => source,
        }
    }

    pub fn into_cause(self) -> E {
        match self {
            TransportError::Exhausted { source, .. } => source,
            TransportError::Permanent(source) => source,
        }
    }
}

/// Result of a driver operation.
pub type Ens160Result<T, E> = Result<T, Ens160Error<E>>;

///
/// ENS160 error enum. Transport errors come up unchanged from the bus layer;
/// the other variants are detected before any bus access, except the two
/// timeouts which come from bounded polling handshakes.
///
#[derive(Debug, thiserror::Error)]
pub enum Ens160Error<E> {
    /// Register access failed (retries exhausted or permanent fault)
    #[error(transparent)]
    Transport(#[from] TransportError<E>),
    /// Operation not allowed from the currently known state
    #[error("cannot {operation} while driver is {state:?}")]
    InvalidState {
        state: DriverState,
        operation: &'static str,
    },
    /// Compensation value outside the sensor's physical envelope
    #[error("{quantity} compensation {value} is outside {min}..={max}")]
    InvalidArgument {
        quantity: &'static str,
        value: f32,
        min: f32,
        max: f32,
    },
    /// Mode that cannot be written to the device
    #[error("operating mode {0:?} cannot be written")]
    InvalidMode(OperatingMode),
    /// The device never flagged the command response as ready
    #[error("no response to command {0:?}")]
    CommandTimeout(Command),
    /// The device did not come back to deep sleep after a reset
    #[error("device did not finish reset")]
    ResetTimeout,
}

impl<E> Ens160Error<E> {
    /// The bus error behind this failure, if it came from the transport.
    pub fn bus_cause(&self) -> Option<&E> {
        match self {
            Ens160Error::Transport(e) => Some(e.cause()),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn errno_classification() {
        assert_eq!(classify_errno(EAGAIN), FaultKind::Transient);
        assert_eq!(classify_errno(EREMOTEIO), FaultKind::Transient);
        assert_eq!(classify_errno(ETIMEDOUT), FaultKind::Transient);
        assert_eq!(classify_errno(ENXIO), FaultKind::Permanent);
        assert_eq!(classify_errno(ENODEV), FaultKind::Permanent);
        // EINVAL
        assert_eq!(classify_errno(22), FaultKind::Permanent);
    }

    #[test]
    fn io_error_classification() {
        assert_eq!(
            io::Error::from_raw_os_error(EREMOTEIO).fault_kind(),
            FaultKind::Transient
        );
        assert_eq!(
            io::Error::from_raw_os_error(ENXIO).fault_kind(),
            FaultKind::Permanent
        );
        assert_eq!(
            io::Error::new(io::ErrorKind::TimedOut, "slow").fault_kind(),
            FaultKind::Transient
        );
        assert_eq!(
            io::Error::new(io::ErrorKind::InvalidInput, "bad").fault_kind(),
            FaultKind::Permanent
        );
    }

    #[test]
    fn linux_error_classification() {
        assert_eq!(LinuxI2CError::Errno(EAGAIN).fault_kind(), FaultKind::Transient);
        assert_eq!(LinuxI2CError::Errno(ENODEV).fault_kind(), FaultKind::Permanent);
    }

    #[test]
    fn transport_error_keeps_cause() {
        let err = TransportError::Exhausted {
            attempts: 6,
            source: io::Error::from_raw_os_error(EAGAIN),
        };
        assert_eq!(err.cause().raw_os_error(), Some(EAGAIN));
        assert!(err.to_string().contains("6 attempts"));

        let err: Ens160Error<io::Error> =
            TransportError::Permanent(io::Error::from_raw_os_error(ENXIO)).into();
        assert_eq!(err.bus_cause().and_then(|e| e.raw_os_error()), Some(ENXIO));
    }
}
