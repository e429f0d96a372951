// SPDX-License-Identifier: Apache-2.0
// Copyright © 2021 Will Ross
//! Raw register access over the camera's I²C (SCCB) bus.
//!
//! Registers have 16-bit addresses and 8-bit values. Nothing here retries or caches, every call is
//! exactly one bus transaction (except [`write_program`], which is one transaction per write
//! step).

use arrayvec::ArrayVec;
use embedded_hal::blocking::delay::DelayMs;
use embedded_hal::blocking::i2c;

use crate::error::{Error, LibraryError};
use crate::register::REG_DLY;

/// The most data bytes [`write_burst`] will send in one transaction.
pub const MAX_BURST_LENGTH: usize = 254;

/// Read a single register.
pub fn read_register<I2C>(
    bus: &mut I2C,
    i2c_address: u8,
    register: impl Into<u16>,
) -> Result<u8, Error<I2C>>
where
    I2C: i2c::WriteRead + i2c::Write,
{
    let register_address_bytes = register.into().to_be_bytes();
    let mut value = [0u8];
    bus.write_read(i2c_address, &register_address_bytes, &mut value)
        .map_err(Error::I2cWriteReadError)?;
    Ok(value[0])
}

/// Write a single register.
pub fn write_register<I2C>(
    bus: &mut I2C,
    i2c_address: u8,
    register: impl Into<u16>,
    value: u8,
) -> Result<(), Error<I2C>>
where
    I2C: i2c::WriteRead + i2c::Write,
{
    let [high, low] = register.into().to_be_bytes();
    bus.write(i2c_address, &[high, low, value])
        .map_err(Error::I2cWriteError)
}

/// Write a run of consecutive registers, starting at `start`, in a single transaction.
pub fn write_burst<I2C>(
    bus: &mut I2C,
    i2c_address: u8,
    start: u16,
    data: &[u8],
) -> Result<(), Error<I2C>>
where
    I2C: i2c::WriteRead + i2c::Write,
{
    let mut combined: ArrayVec<u8, { MAX_BURST_LENGTH + 2 }> = ArrayVec::new();
    combined.extend(start.to_be_bytes());
    combined
        .try_extend_from_slice(data)
        .map_err(|_| LibraryError::InvalidArgument("Burst writes are limited to 254 bytes"))?;
    bus.write(i2c_address, &combined).map_err(Error::I2cWriteError)
}

/// One step of a [`RegisterProgram`].
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum ProgramStep {
    Write { register: u16, value: u8 },
    Delay { ms: u8 },
}

impl From<(u16, u8)> for ProgramStep {
    fn from((register, value): (u16, u8)) -> Self {
        if register == REG_DLY {
            Self::Delay { ms: value }
        } else {
            Self::Write { register, value }
        }
    }
}

/// An ordered list of register writes, with [`REG_DLY`] entries standing in for delays.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct RegisterProgram<'a>(&'a [(u16, u8)]);

impl<'a> RegisterProgram<'a> {
    pub const fn new(entries: &'a [(u16, u8)]) -> Self {
        Self(entries)
    }

    pub fn steps(&self) -> impl Iterator<Item = ProgramStep> + 'a {
        self.0.iter().copied().map(ProgramStep::from)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// Run a register program.
///
/// The first bus error stops the program, leaving the steps before it applied. Programs are meant
/// to be re-run from the start, not resumed.
pub fn write_program<I2C, D>(
    bus: &mut I2C,
    i2c_address: u8,
    delay: &mut D,
    program: RegisterProgram,
) -> Result<(), Error<I2C>>
where
    I2C: i2c::WriteRead + i2c::Write,
    D: DelayMs<u16>,
{
    for step in program.steps() {
        match step {
            ProgramStep::Delay { ms } => delay.delay_ms(ms.into()),
            ProgramStep::Write { register, value } => {
                write_register(bus, i2c_address, register, value)?
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod test {
    extern crate std;

    use std::vec;

    use ov5640_af_test_data::{BusEvent, MockBus, OV5640_ADDRESS};

    use super::*;
    use crate::register::SensorRegister;

    #[test]
    fn read_register() {
        let mut bus = MockBus::new(OV5640_ADDRESS);
        bus.set_register(0x350B, 0x2A);
        let value = super::read_register(&mut bus, OV5640_ADDRESS, SensorRegister::Gain).unwrap();
        assert_eq!(value, 0x2A);
        assert_eq!(
            *bus.events(),
            vec![BusEvent::Read {
                register: 0x350B,
                length: 1
            }],
            "Only one operation should be performed to read a register"
        );
    }

    #[test]
    fn write_register_frame() {
        let mut bus = MockBus::new(OV5640_ADDRESS);
        super::write_register(&mut bus, OV5640_ADDRESS, 0x3406u16, 0x01).unwrap();
        assert_eq!(bus.writes(), vec![(0x3406, vec![0x01])]);
    }

    #[test]
    fn bus_errors_propagate() {
        let mut bus = MockBus::new(OV5640_ADDRESS);
        bus.fail_on_register(0x3406);
        let res = super::write_register(&mut bus, OV5640_ADDRESS, 0x3406u16, 0x01);
        assert!(matches!(res, Err(Error::I2cWriteError(_))));
        let res = super::read_register(&mut bus, OV5640_ADDRESS, 0x3406u16);
        assert!(matches!(res, Err(Error::I2cWriteReadError(_))));
    }

    #[test]
    fn burst_limit() {
        let mut bus = MockBus::new(OV5640_ADDRESS);
        let data = [0xAAu8; MAX_BURST_LENGTH + 1];
        let res = write_burst(&mut bus, OV5640_ADDRESS, 0x8000, &data);
        assert!(matches!(
            res,
            Err(Error::LibraryError(LibraryError::InvalidArgument(_)))
        ));
        assert!(bus.events().is_empty());
        write_burst(&mut bus, OV5640_ADDRESS, 0x8000, &data[..MAX_BURST_LENGTH]).unwrap();
        assert_eq!(bus.writes().len(), 1);
        assert_eq!(bus.memory(0x8000, MAX_BURST_LENGTH), &data[..MAX_BURST_LENGTH]);
    }

    #[test]
    fn program_steps() {
        let program = RegisterProgram::new(&[(0x3000, 0x20), (REG_DLY, 10), (0x3029, 0x7F)]);
        let steps: std::vec::Vec<_> = program.steps().collect();
        assert_eq!(
            steps,
            vec![
                ProgramStep::Write {
                    register: 0x3000,
                    value: 0x20
                },
                ProgramStep::Delay { ms: 10 },
                ProgramStep::Write {
                    register: 0x3029,
                    value: 0x7F
                },
            ]
        );
        assert_eq!(program.len(), 3);
    }

    #[test]
    fn program_delays_are_not_written() {
        let mut bus = MockBus::new(OV5640_ADDRESS);
        let mut delay = bus.delay();
        let program = RegisterProgram::new(&[
            (REG_DLY, 5),
            (0x3212, 0x03),
            (REG_DLY, 0),
            (REG_DLY, 255),
            (0x3212, 0x13),
        ]);
        write_program(&mut bus, OV5640_ADDRESS, &mut delay, program).unwrap();
        assert_eq!(
            *bus.events(),
            vec![
                BusEvent::Delay { ms: 5 },
                BusEvent::Write {
                    register: 0x3212,
                    data: vec![0x03]
                },
                BusEvent::Delay { ms: 0 },
                BusEvent::Delay { ms: 255 },
                BusEvent::Write {
                    register: 0x3212,
                    data: vec![0x13]
                },
            ]
        );
        assert!(bus.writes().iter().all(|(register, _)| *register != REG_DLY));
    }

    #[test]
    fn program_stops_at_first_failure() {
        let mut bus = MockBus::new(OV5640_ADDRESS);
        let mut delay = bus.delay();
        bus.fail_on_register(0x3025);
        let program = RegisterProgram::new(&[
            (0x3024, 0x00),
            (0x3025, 0x00),
            (REG_DLY, 10),
            (0x3026, 0x00),
        ]);
        let res = write_program(&mut bus, OV5640_ADDRESS, &mut delay, program);
        assert!(matches!(res, Err(Error::I2cWriteError(_))));
        assert_eq!(bus.writes(), vec![(0x3024, vec![0x00])]);
        assert_eq!(bus.total_delay_ms(), 0);
    }
}
