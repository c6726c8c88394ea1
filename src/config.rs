// Copyright 2024, F. Stan
//
// Licensed under the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>,
// This file may not be copied, modified, or distributed
// except according to those terms.

use std::time::Duration;

use crate::transport::RetryPolicy;

/// Driver tunables: the bus retry policy and the timing of the
/// handshakes that poll the device.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Config {
    pub retry: RetryPolicy,
    /// Wait after the idle mode write in `init`
    pub boot_settle: Duration,
    pub reset_poll_interval: Duration,
    /// Mode reads before a reset is declared failed
    pub reset_poll_attempts: u32,
    pub command_poll_interval: Duration,
    /// Status reads before a command response is declared missing
    pub command_poll_attempts: u32,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            retry: RetryPolicy::default(),
            boot_settle: Duration::from_millis(10),
            reset_poll_interval: Duration::from_millis(10),
            reset_poll_attempts: 25,
            command_poll_interval: Duration::from_millis(1),
            command_poll_attempts: 250,
        }
    }
}

impl Config {
    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    pub fn with_boot_settle(mut self, settle: Duration) -> Self {
        self.boot_settle = settle;
        self
    }

    pub fn with_reset_poll(mut self, interval: Duration, attempts: u32) -> Self {
        self.reset_poll_interval = interval;
        self.reset_poll_attempts = attempts;
        self
    }

    pub fn with_command_poll(mut self, interval: Duration, attempts: u32) -> Self {
        self.command_poll_interval = interval;
        self.command_poll_attempts = attempts;
        self
    }

    /// No sleeping anywhere; for simulated buses.
    pub fn without_delays(self) -> Self {
        let retry = RetryPolicy {
            delay: Duration::ZERO,
            ..self.retry
        };
        self.with_retry(retry)
            .with_boot_settle(Duration::ZERO)
            .with_reset_poll(Duration::ZERO, self.reset_poll_attempts)
            .with_command_poll(Duration::ZERO, self.command_poll_attempts)
    }
}
