//! Simulated ENS160 register file with scripted bus faults.

use ens160_i2c::{BusFault, FaultKind, RegisterBus};
use std::collections::VecDeque;

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum Fault {
    #[error("arbitration lost")]
    ArbitrationLost,
    #[error("no acknowledge")]
    Nack,
    #[error("no device at address")]
    Absent,
}

impl BusFault for Fault {
    fn fault_kind(&self) -> FaultKind {
        match self {
            Fault::ArbitrationLost | Fault::Nack => FaultKind::Transient,
            Fault::Absent => FaultKind::Permanent,
        }
    }
}

const OP_MODE: usize = 0x10;
const COMMAND: u8 = 0x12;
const DEVICE_STATUS: usize = 0x20;
const GPR_READ: usize = 0x48;
const NEW_GPR: u8 = 0x01;

pub struct FakeEns160 {
    regs: [u8; 256],
    faults: VecDeque<Fault>,
    /// Bus attempts, failed ones included
    pub attempts: usize,
    /// Successful writes
    pub writes: Vec<(u8, Vec<u8>)>,
    pub firmware: [u8; 3],
    /// Ignore COMMAND writes, as a device that never answers
    pub deaf: bool,
    /// Stay in reset after a reset write
    pub stuck_in_reset: bool,
}

impl FakeEns160 {
    pub fn new() -> Self {
        let mut fake = FakeEns160 {
            regs: [0; 256],
            faults: VecDeque::new(),
            attempts: 0,
            writes: Vec::new(),
            firmware: [5, 4, 6],
            deaf: false,
            stuck_in_reset: false,
        };
        fake.set(0x00, &[0x60, 0x01]);
        fake
    }

    pub fn with_part_id(part_id: u16) -> Self {
        let mut fake = FakeEns160::new();
        fake.set(0x00, &part_id.to_le_bytes());
        fake
    }

    pub fn fail_next(&mut self, faults: &[Fault]) {
        self.faults.extend(faults.iter().copied());
    }

    pub fn set(&mut self, register: u8, data: &[u8]) {
        let start = register as usize;
        self.regs[start..start + data.len()].copy_from_slice(data);
    }

    pub fn reg(&self, register: u8) -> u8 {
        self.regs[register as usize]
    }

    pub fn last_write(&self, register: u8) -> Option<&[u8]> {
        self.writes
            .iter()
            .rev()
            .find(|(r, _)| *r == register)
            .map(|(_, data)| data.as_slice())
    }
}

impl RegisterBus for FakeEns160 {
    type Error = Fault;

    fn read_registers(&mut self, register: u8, buf: &mut [u8]) -> Result<(), Fault> {
        self.attempts += 1;
        if let Some(fault) = self.faults.pop_front() {
            // half a transfer landed before the fault
            buf.fill(0xA5);
            return Err(fault);
        }
        let start = register as usize;
        buf.copy_from_slice(&self.regs[start..start + buf.len()]);
        if start == GPR_READ {
            self.regs[DEVICE_STATUS] &= !NEW_GPR;
        }
        Ok(())
    }

    fn write_registers(&mut self, register: u8, data: &[u8]) -> Result<(), Fault> {
        self.attempts += 1;
        if let Some(fault) = self.faults.pop_front() {
            return Err(fault);
        }
        self.writes.push((register, data.to_vec()));
        match (register as usize, data) {
            (OP_MODE, [0xF0]) => {
                self.regs[OP_MODE] = if self.stuck_in_reset { 0xF0 } else { 0x00 };
            }
            (_, [0x0E]) if register == COMMAND => {
                if !self.deaf {
                    let fw = self.firmware;
                    self.set(GPR_READ as u8 + 4, &fw);
                    self.regs[DEVICE_STATUS] |= NEW_GPR;
                }
            }
            _ => self.set(register, data),
        }
        Ok(())
    }
}
