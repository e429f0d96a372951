// SPDX-License-Identifier: Apache-2.0
// Copyright © 2021 Will Ross
//! The command protocol for the autofocus coprocessor.
//!
//! Commands are asynchronous. The host writes any parameters, sets [`CommandRegister::Ack`],
//! writes the opcode to [`CommandRegister::Main`], then polls `Ack` until the coprocessor clears
//! it. A command that is never acknowledged is a *soft* failure, reported as `false` (or `None`,
//! or all-zero [`FocusZones`]) instead of an error, since a missed focus cycle is routine. Bus
//! errors are still returned as errors.

use embedded_hal::blocking::delay::DelayMs;
use embedded_hal::blocking::i2c;
use log::{debug, warn};

use crate::bus::{read_register, write_register};
use crate::error::{Error, LibraryError};
use crate::register::{AutofocusCommand, CommandRegister, FirmwareStatus, ACK_PENDING};
use crate::util::{poll, POLL_ATTEMPTS, POLL_INTERVAL_MS};

/// The results of an autofocus operation, one per focus zone.
///
/// A zero means the zone is not in focus. A failed autofocus command leaves every zone at zero.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub struct FocusZones([u8; 5]);

impl FocusZones {
    pub fn new(scores: [u8; 5]) -> Self {
        Self(scores)
    }

    /// Whether at least one zone is in focus.
    pub fn is_focused(&self) -> bool {
        self.0.iter().any(|score| *score != 0)
    }

    pub fn scores(&self) -> [u8; 5] {
        self.0
    }
}

impl From<FocusZones> for [u8; 5] {
    fn from(zones: FocusZones) -> Self {
        zones.0
    }
}

/// Send a command to the autofocus coprocessor and wait for it to be acknowledged.
///
/// `parameters` are written, in order, before the command is started. Returns `Ok(false)` if the
/// command was not acknowledged within about a second.
pub fn send_command<I2C, D>(
    bus: &mut I2C,
    i2c_address: u8,
    delay: &mut D,
    command: AutofocusCommand,
    parameters: &[(CommandRegister, u8)],
) -> Result<bool, Error<I2C>>
where
    I2C: i2c::WriteRead + i2c::Write,
    D: DelayMs<u16>,
{
    for (register, value) in parameters {
        write_register(bus, i2c_address, *register, *value)?;
    }
    write_register(bus, i2c_address, CommandRegister::Ack, ACK_PENDING)?;
    write_register(bus, i2c_address, CommandRegister::Main, u8::from(command))?;
    let acknowledged = poll(delay, POLL_ATTEMPTS, POLL_INTERVAL_MS, || {
        let ack = read_register(bus, i2c_address, CommandRegister::Ack)?;
        Ok::<_, Error<I2C>>(ack == 0)
    })?;
    if !acknowledged {
        debug!("Autofocus command {:?} was not acknowledged", command);
    }
    Ok(acknowledged)
}

/// Read the status the coprocessor reports, or `None` for an unrecognized status code.
pub fn status<I2C>(bus: &mut I2C, i2c_address: u8) -> Result<Option<FirmwareStatus>, Error<I2C>>
where
    I2C: i2c::WriteRead + i2c::Write,
{
    let raw = read_register(bus, i2c_address, CommandRegister::FirmwareStatus)?;
    Ok(FirmwareStatus::try_from(raw).ok())
}

/// Release the lens and run a single-shot autofocus.
///
/// If releasing the focus fails, the autofocus is not attempted.
pub fn autofocus<I2C, D>(
    bus: &mut I2C,
    i2c_address: u8,
    delay: &mut D,
) -> Result<FocusZones, Error<I2C>>
where
    I2C: i2c::WriteRead + i2c::Write,
    D: DelayMs<u16>,
{
    if !send_command(bus, i2c_address, delay, AutofocusCommand::ReleaseFocus, &[])? {
        warn!("Unable to release focus, skipping autofocus");
        return Ok(FocusZones::default());
    }
    if !send_command(
        bus,
        i2c_address,
        delay,
        AutofocusCommand::TriggerSingleShot,
        &[],
    )? {
        warn!("Autofocus was not acknowledged");
        return Ok(FocusZones::default());
    }
    let mut scores = [0u8; 5];
    for (score, register) in scores.iter_mut().zip(CommandRegister::PARAMETERS) {
        *score = read_register(bus, i2c_address, register)?;
    }
    let zones = FocusZones(scores);
    debug!("Focus zones: {:?}", zones.scores());
    Ok(zones)
}

/// Read the position of the voice coil motor, or `None` if the coprocessor didn't respond.
pub fn vcm_step<I2C, D>(
    bus: &mut I2C,
    i2c_address: u8,
    delay: &mut D,
) -> Result<Option<u8>, Error<I2C>>
where
    I2C: i2c::WriteRead + i2c::Write,
    D: DelayMs<u16>,
{
    if send_command(bus, i2c_address, delay, AutofocusCommand::GetVcmStep, &[])? {
        read_register(bus, i2c_address, CommandRegister::Para4).map(Some)
    } else {
        Ok(None)
    }
}

/// Move the voice coil motor to `step`, which must be in `0..=255`.
///
/// The range is checked before anything is sent.
pub fn set_vcm_step<I2C, D>(
    bus: &mut I2C,
    i2c_address: u8,
    delay: &mut D,
    step: i32,
) -> Result<bool, Error<I2C>>
where
    I2C: i2c::WriteRead + i2c::Write,
    D: DelayMs<u16>,
{
    let step = u8::try_from(step)
        .map_err(|_| LibraryError::InvalidArgument("VCM step must be 0 to 255"))?;
    send_command(
        bus,
        i2c_address,
        delay,
        AutofocusCommand::SetVcmStep,
        &[(CommandRegister::Para3, 0x00), (CommandRegister::Para4, step)],
    )
}
