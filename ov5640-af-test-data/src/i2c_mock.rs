// SPDX-License-Identifier: Apache-2.0
// Copyright © 2021 Will Ross
use std::cell::{Ref, RefCell};
use std::collections::BTreeMap;
use std::rc::Rc;

use embedded_hal::blocking::{delay, i2c};

/// The default 7-bit I²C address of the OV5640 (0x78 >> 1).
pub const OV5640_ADDRESS: u8 = 0x3C;

const SYSTEM_RESET_00: u16 = 0x3000;
const CMD_MAIN: u16 = 0x3022;
const CMD_ACK: u16 = 0x3023;
const CMD_PARA0: u16 = 0x3024;
const CMD_PARA4: u16 = 0x3028;
const FW_STATUS: u16 = 0x3029;

const STATUS_FIRMWARE_BAD: u8 = 0x7F;
const STATUS_STARTUP: u8 = 0x7E;
const STATUS_IDLE: u8 = 0x70;
const STATUS_FOCUSED: u8 = 0x10;

const OPCODE_TRIGGER_AUTOFOCUS: u8 = 0x03;
const OPCODE_CONTINUOUS_AUTOFOCUS: u8 = 0x04;
const OPCODE_RELEASE_FOCUS: u8 = 0x08;
const OPCODE_SET_VCM_STEP: u8 = 0x1A;
const OPCODE_GET_VCM_STEP: u8 = 0x1B;

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum MockError {
    /// An unknown I2C address was given.
    UnknownI2cAddress(u8),

    /// The requested operation is not allowed.
    ///
    /// This covers writes that are too short to carry both a register address and a value, and
    /// write-reads that do not write exactly a two byte register address.
    IllegalOperation,

    /// The device did not acknowledge an access to the given register.
    Nack(u16),
}

impl std::fmt::Display for MockError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:?}", self)
    }
}

impl std::error::Error for MockError {}

/// Everything that happened on the mock bus, in order.
///
/// Delays are recorded here as well (by [`MockDelay`]) so that tests can check how sleeps and
/// bus traffic interleave.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum BusEvent {
    Write { register: u16, data: Vec<u8> },
    Read { register: u16, length: usize },
    Delay { ms: u32 },
}

/// How the simulated autofocus coprocessor acknowledges commands.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum AckBehavior {
    /// The acknowledge register reads back nonzero this many times before clearing.
    ClearAfter(usize),

    /// The acknowledge register is never cleared.
    Stuck,
}

#[derive(Debug)]
struct BusState {
    registers: BTreeMap<u16, u8>,
    events: Vec<BusEvent>,
    failing_register: Option<u16>,
    ack_behavior: AckBehavior,
    failing_commands: Vec<u8>,
    pending_command: Option<(u8, usize)>,
    zone_scores: [u8; 5],
    vcm_step: u8,
    firmware_boots: bool,
    boot_reads: usize,
    pending_boot: Option<usize>,
}

impl BusState {
    fn register(&self, register: u16) -> u8 {
        self.registers.get(&register).copied().unwrap_or(0)
    }

    fn check_access(&self, start: u16, length: usize) -> Result<(), MockError> {
        match self.failing_register {
            Some(failing)
                if (0..length).any(|offset| start.wrapping_add(offset as u16) == failing) =>
            {
                Err(MockError::Nack(failing))
            }
            _ => Ok(()),
        }
    }

    /// React to a single register write the way the coprocessor would.
    fn written(&mut self, register: u16, value: u8) {
        match register {
            CMD_MAIN => {
                if self.ack_behavior == AckBehavior::Stuck || self.failing_commands.contains(&value)
                {
                    self.pending_command = None;
                } else if let AckBehavior::ClearAfter(reads) = self.ack_behavior {
                    self.pending_command = Some((value, reads));
                }
            }
            SYSTEM_RESET_00 if value == 0x20 => {
                self.registers.insert(FW_STATUS, STATUS_STARTUP);
                self.pending_boot = None;
            }
            SYSTEM_RESET_00 if value == 0x00 => {
                if self.register(FW_STATUS) == STATUS_FIRMWARE_BAD && self.firmware_boots {
                    self.pending_boot = Some(self.boot_reads);
                }
            }
            _ => (),
        }
    }

    fn complete_command(&mut self, opcode: u8) {
        match opcode {
            OPCODE_TRIGGER_AUTOFOCUS | OPCODE_CONTINUOUS_AUTOFOCUS => {
                for (offset, score) in self.zone_scores.iter().enumerate() {
                    self.registers.insert(CMD_PARA0 + offset as u16, *score);
                }
                self.registers.insert(FW_STATUS, STATUS_FOCUSED);
            }
            OPCODE_RELEASE_FOCUS => {
                for register in CMD_PARA0..=CMD_PARA4 {
                    self.registers.insert(register, 0);
                }
                self.registers.insert(FW_STATUS, STATUS_IDLE);
            }
            OPCODE_GET_VCM_STEP => {
                self.registers.insert(CMD_PARA4, self.vcm_step);
            }
            OPCODE_SET_VCM_STEP => {
                self.vcm_step = self.register(CMD_PARA4);
            }
            _ => (),
        }
        self.registers.insert(CMD_ACK, 0);
    }

    /// Advance any pending coprocessor work that is observed by reading `register`.
    fn observed(&mut self, register: u16) {
        match register {
            CMD_ACK => {
                if let Some((opcode, remaining)) = self.pending_command {
                    if remaining == 0 {
                        self.pending_command = None;
                        self.complete_command(opcode);
                    } else {
                        self.pending_command = Some((opcode, remaining - 1));
                    }
                }
            }
            FW_STATUS => {
                if let Some(remaining) = self.pending_boot {
                    if remaining == 0 {
                        self.pending_boot = None;
                        self.registers.insert(FW_STATUS, STATUS_IDLE);
                    } else {
                        self.pending_boot = Some(remaining - 1);
                    }
                }
            }
            _ => (),
        }
    }
}

/// An in-memory OV5640 register file with a simulated autofocus coprocessor.
///
/// Clones share the same state, so a test can keep a clone around to inspect the bus after the
/// original has been moved into a driver.
#[derive(Clone, Debug)]
pub struct MockBus {
    i2c_address: u8,
    state: Rc<RefCell<BusState>>,
}

impl MockBus {
    pub fn new(i2c_address: u8) -> Self {
        Self {
            i2c_address,
            state: Rc::new(RefCell::new(BusState {
                registers: BTreeMap::new(),
                events: Vec::new(),
                failing_register: None,
                ack_behavior: AckBehavior::ClearAfter(2),
                failing_commands: Vec::new(),
                pending_command: None,
                zone_scores: [0x01; 5],
                vcm_step: 0,
                firmware_boots: true,
                boot_reads: 3,
                pending_boot: None,
            })),
        }
    }

    /// A [`MockDelay`] that records its delays into this bus's event log.
    pub fn delay(&self) -> MockDelay {
        MockDelay {
            state: Rc::clone(&self.state),
        }
    }

    pub fn register(&self, register: u16) -> u8 {
        self.state.borrow().register(register)
    }

    pub fn set_register(&self, register: u16, value: u8) {
        self.state.borrow_mut().registers.insert(register, value);
    }

    /// Read back `length` bytes of device memory starting at `start`.
    pub fn memory(&self, start: u16, length: usize) -> Vec<u8> {
        let state = self.state.borrow();
        (0..length)
            .map(|offset| state.register(start.wrapping_add(offset as u16)))
            .collect()
    }

    pub fn set_ack_behavior(&self, behavior: AckBehavior) {
        self.state.borrow_mut().ack_behavior = behavior;
    }

    /// Never acknowledge the given command opcode.
    pub fn fail_command(&self, opcode: u8) {
        self.state.borrow_mut().failing_commands.push(opcode);
    }

    pub fn set_zone_scores(&self, scores: [u8; 5]) {
        self.state.borrow_mut().zone_scores = scores;
    }

    pub fn vcm_step(&self) -> u8 {
        self.state.borrow().vcm_step
    }

    pub fn set_vcm_step(&self, step: u8) {
        self.state.borrow_mut().vcm_step = step;
    }

    /// Control whether the coprocessor reaches the idle state after a firmware upload.
    pub fn set_firmware_boots(&self, boots: bool) {
        self.state.borrow_mut().firmware_boots = boots;
    }

    /// The number of status reads after finalization before the coprocessor reports idle.
    pub fn set_boot_reads(&self, reads: usize) {
        self.state.borrow_mut().boot_reads = reads;
    }

    /// NACK every access touching the given register.
    pub fn fail_on_register(&self, register: u16) {
        self.state.borrow_mut().failing_register = Some(register);
    }

    pub fn clear_failures(&self) {
        let mut state = self.state.borrow_mut();
        state.failing_register = None;
        state.failing_commands.clear();
    }

    pub fn events(&self) -> Ref<Vec<BusEvent>> {
        Ref::map(self.state.borrow(), |state| &state.events)
    }

    pub fn clear_events(&self) {
        self.state.borrow_mut().events.clear()
    }

    /// All writes, in order, as (register, payload) pairs.
    pub fn writes(&self) -> Vec<(u16, Vec<u8>)> {
        self.events()
            .iter()
            .filter_map(|event| match event {
                BusEvent::Write { register, data } => Some((*register, data.clone())),
                _ => None,
            })
            .collect()
    }

    /// How many times the given register has been read.
    pub fn reads_of(&self, register: u16) -> usize {
        self.events()
            .iter()
            .filter(|event| matches!(event, BusEvent::Read { register: r, .. } if *r == register))
            .count()
    }

    pub fn total_delay_ms(&self) -> u32 {
        self.events()
            .iter()
            .map(|event| match event {
                BusEvent::Delay { ms } => *ms,
                _ => 0,
            })
            .sum()
    }
}

impl i2c::Write for MockBus {
    type Error = MockError;

    fn write(&mut self, i2c_address: u8, bytes: &[u8]) -> Result<(), Self::Error> {
        if i2c_address != self.i2c_address {
            return Err(MockError::UnknownI2cAddress(i2c_address));
        }
        // Every write carries a two byte register address and at least one value.
        if bytes.len() < 3 {
            return Err(MockError::IllegalOperation);
        }
        let register = u16::from_be_bytes([bytes[0], bytes[1]]);
        let payload = &bytes[2..];
        let mut state = self.state.borrow_mut();
        state.check_access(register, payload.len())?;
        for (offset, value) in payload.iter().enumerate() {
            state
                .registers
                .insert(register.wrapping_add(offset as u16), *value);
        }
        state.events.push(BusEvent::Write {
            register,
            data: payload.to_vec(),
        });
        if payload.len() == 1 {
            state.written(register, payload[0]);
        }
        Ok(())
    }
}

impl i2c::WriteRead for MockBus {
    type Error = MockError;

    fn write_read(
        &mut self,
        i2c_address: u8,
        write_buffer: &[u8],
        out_buffer: &mut [u8],
    ) -> Result<(), Self::Error> {
        if i2c_address != self.i2c_address {
            return Err(MockError::UnknownI2cAddress(i2c_address));
        }
        if write_buffer.len() != 2 || out_buffer.is_empty() {
            return Err(MockError::IllegalOperation);
        }
        let register = u16::from_be_bytes([write_buffer[0], write_buffer[1]]);
        let mut state = self.state.borrow_mut();
        state.check_access(register, out_buffer.len())?;
        state.events.push(BusEvent::Read {
            register,
            length: out_buffer.len(),
        });
        state.observed(register);
        for (offset, byte) in out_buffer.iter_mut().enumerate() {
            *byte = state.register(register.wrapping_add(offset as u16));
        }
        Ok(())
    }
}

/// A delay provider that doesn't actually wait, it just records how long it was asked to.
#[derive(Clone, Debug)]
pub struct MockDelay {
    state: Rc<RefCell<BusState>>,
}

impl MockDelay {
    fn record(&mut self, ms: u32) {
        self.state.borrow_mut().events.push(BusEvent::Delay { ms });
    }
}

impl delay::DelayMs<u8> for MockDelay {
    fn delay_ms(&mut self, ms: u8) {
        self.record(ms.into());
    }
}

impl delay::DelayMs<u16> for MockDelay {
    fn delay_ms(&mut self, ms: u16) {
        self.record(ms.into());
    }
}

impl delay::DelayMs<u32> for MockDelay {
    fn delay_ms(&mut self, ms: u32) {
        self.record(ms);
    }
}
