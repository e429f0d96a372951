// SPDX-License-Identifier: Apache-2.0
// Copyright © 2021 Will Ross
//! Register addresses and protocol constants for the OV5640 and its autofocus coprocessor.

use num_enum::{IntoPrimitive, TryFromPrimitive};

/// Registers used to talk to the autofocus coprocessor.
// NOTE: To make it easier to compare against the datasheet, discriminant values should *always* be
// explicitly written out.
#[derive(Clone, Copy, Debug, Eq, PartialEq, PartialOrd, Ord, IntoPrimitive, TryFromPrimitive)]
#[repr(u16)]
pub enum CommandRegister {
    /// Writing an opcode here starts a command.
    Main = 0x3022,

    /// Set by the host before a command, cleared by the coprocessor once it has been consumed.
    Ack = 0x3023,

    Para0 = 0x3024,

    Para1 = 0x3025,

    Para2 = 0x3026,

    /// The high byte of the VCM step for [`AutofocusCommand::SetVcmStep`].
    Para3 = 0x3027,

    /// The low byte of the VCM step for both VCM step commands.
    Para4 = 0x3028,

    /// The coprocessor's [`FirmwareStatus`].
    FirmwareStatus = 0x3029,
}

impl CommandRegister {
    /// The parameter registers, which double as the per-zone focus results.
    pub const PARAMETERS: [CommandRegister; 5] = [
        CommandRegister::Para0,
        CommandRegister::Para1,
        CommandRegister::Para2,
        CommandRegister::Para3,
        CommandRegister::Para4,
    ];
}

/// Sensor (non-coprocessor) registers this driver uses.
#[derive(Clone, Copy, Debug, Eq, PartialEq, PartialOrd, Ord, IntoPrimitive, TryFromPrimitive)]
#[repr(u16)]
pub enum SensorRegister {
    /// System reset 00. Bit 5 holds the autofocus coprocessor (MCU) in reset.
    SystemReset00 = 0x3000,

    /// Group hold control, used to latch the white balance gains at once.
    GroupAccess = 0x3212,

    /// AWB red gain [11:8].
    AwbRedGainHigh = 0x3400,

    AwbRedGainLow = 0x3401,

    AwbGreenGainHigh = 0x3402,

    AwbGreenGainLow = 0x3403,

    AwbBlueGainHigh = 0x3404,

    AwbBlueGainLow = 0x3405,

    /// Bit 0 set means the AWB gains are manual.
    AwbManual = 0x3406,

    /// Exposure [19:12] (as laid out by this driver).
    ExposureHigh = 0x3500,

    /// Exposure [11:4].
    ExposureMid = 0x3501,

    /// Exposure [3:0] in the upper nibble.
    ExposureLow = 0x3502,

    /// AEC/AGC manual mode. Bit 0 is manual exposure, bit 1 is manual gain.
    AecManual = 0x3503,

    /// Real gain [7:0].
    Gain = 0x350B,

    /// Timing control 20. Bits [2:1] flip the image vertically.
    TimingControl20 = 0x3820,

    /// Timing control 21. Bits [2:1] mirror the image horizontally.
    TimingControl21 = 0x3821,
}

impl SensorRegister {
    /// The six white balance registers, in the order `get_autosettings` reports them.
    pub const WHITE_BALANCE: [SensorRegister; 6] = [
        SensorRegister::AwbRedGainHigh,
        SensorRegister::AwbRedGainLow,
        SensorRegister::AwbGreenGainHigh,
        SensorRegister::AwbGreenGainLow,
        SensorRegister::AwbBlueGainHigh,
        SensorRegister::AwbBlueGainLow,
    ];
}

/// Commands understood by the autofocus firmware.
#[derive(Clone, Copy, Debug, Eq, PartialEq, IntoPrimitive, TryFromPrimitive)]
#[repr(u8)]
pub enum AutofocusCommand {
    TriggerSingleShot = 0x03,
    TriggerContinuous = 0x04,
    ReleaseFocus = 0x08,
    SetVcmStep = 0x1A,
    GetVcmStep = 0x1B,
}

/// The state the autofocus firmware reports in [`CommandRegister::FirmwareStatus`].
#[derive(Clone, Copy, Debug, Eq, PartialEq, IntoPrimitive, TryFromPrimitive)]
#[repr(u8)]
pub enum FirmwareStatus {
    Focusing = 0x00,
    Focused = 0x10,
    Idle = 0x70,
    Startup = 0x7E,
    /// Also written by the host at the end of a firmware upload, see the finalization program.
    FirmwareBad = 0x7F,
}

/// Register address used in register programs to mean "sleep for `value` milliseconds".
pub const REG_DLY: u16 = 0xFFFF;

/// Writing this to [`SensorRegister::SystemReset00`] resets the coprocessor.
pub(crate) const MCU_RESET: u8 = 0x20;

/// Written to [`CommandRegister::Ack`] before sending a command.
pub(crate) const ACK_PENDING: u8 = 0x01;

/// Bit masks within [`SensorRegister::AecManual`].
pub(crate) const AEC_MANUAL_EXPOSURE: u8 = 0x01;
pub(crate) const AEC_MANUAL_GAIN: u8 = 0x02;

/// Bit mask within [`SensorRegister::AwbManual`].
pub(crate) const AWB_MANUAL: u8 = 0x01;

/// Bit mask for both the flip and mirror bits within the timing control registers.
pub(crate) const TIMING_FLIP_MIRROR: u8 = 0x06;

/// Group hold sequence for [`SensorRegister::GroupAccess`]: start group 3, end group 3, then
/// quick launch group 3.
pub(crate) const GROUP_HOLD_START: u8 = 0x03;
pub(crate) const GROUP_HOLD_END: u8 = 0x13;
pub(crate) const GROUP_HOLD_LAUNCH: u8 = 0xA3;
