// SPDX-License-Identifier: Apache-2.0
// Copyright © 2021 Will Ross

use arrayvec::ArrayVec;
use embedded_hal::blocking::delay::DelayMs;
use embedded_hal::blocking::i2c;
use log::{debug, info, warn};
use paste::paste;

use crate::autofocus::{self, FocusZones};
use crate::bus::{read_register, write_program, write_register, RegisterProgram};
use crate::config::Config;
use crate::error::{Error, LibraryError};
use crate::firmware::load_firmware;
use crate::register::*;
use crate::resolution::{FrameSize, Resolution, ResolutionSelector, RESOLUTIONS};
use crate::sensor::{ImageSensor, PixelFormat};

/// How long to let the sensor settle after changing the pixel format or frame size.
const CAPTURE_SETTLE_MS: u16 = 100;

/// Exposure values are 20 bits wide.
const EXPOSURE_LIMIT: u32 = 1 << 20;

/// DRY macro for the getter/setter pairs in `Ov5640` that toggle bits in a register.
///
/// Setters read the register first, and only write it back if the bits need to change.
macro_rules! register_flag {
    { $field:ident, $register:expr, $mask:expr, $doc:literal } => {
    paste! {
        #[doc = $doc]
        pub fn $field(&mut self) -> Result<bool, Error<I2C>> {
            Ok(self.register($register)? & $mask != 0)
        }

        #[doc = $doc]
        pub fn [< set_ $field >](&mut self, new_value: bool) -> Result<(), Error<I2C>> {
            let current = self.register($register)?;
            let updated = if new_value {
                current | $mask
            } else {
                current & !$mask
            };
            if updated != current {
                self.set_register($register, updated)
            } else {
                Ok(())
            }
        }
    }};
}

/// What the capture peripheral is currently producing.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum PipelineMode {
    /// Frames for [`Ov5640::continuous_capture`], in the configured preview format.
    Preview {
        format: PixelFormat,
        frame_size: FrameSize,
    },

    /// JPEG frames at the selected resolution.
    JpegCapture { frame_size: FrameSize },
}

/// A snapshot of the exposure, gain and white balance registers.
///
/// The values are in the same encoding the setters take, so a snapshot taken while the sensor is
/// in automatic mode can be used to lock those settings.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub struct AutoSettings {
    pub gain: u8,

    /// 20-bit exposure value.
    pub exposure: u32,

    /// The red, green and blue gains, high byte first for each.
    pub white_balance: [u8; 6],
}

/// An OV5640 camera module, with its autofocus coprocessor.
///
/// The driver owns the I²C bus, a delay provider (for settle times and polling), and the capture
/// peripheral that moves pixel data. Everything is blocking; operations that wait on the
/// coprocessor can take up to about a second.
#[derive(Debug)]
pub struct Ov5640<I2C, D, S> {
    /// The I²C bus the sensor is accessible on.
    bus: I2C,

    /// The I²C address the sensor is accessible at.
    address: u8,

    delay: D,

    sensor: S,

    config: Config,

    /// Index into [`RESOLUTIONS`] used for JPEG captures.
    resolution: usize,

    mode: PipelineMode,
}

impl<I2C, D, S> Ov5640<I2C, D, S>
where
    I2C: i2c::WriteRead + i2c::Write,
    D: DelayMs<u16>,
    S: ImageSensor,
{
    /// Create a driver, apply the image orientation from `config` and start the preview.
    ///
    /// The autofocus firmware is not loaded, see [`init_autofocus`][Self::init_autofocus].
    pub fn new(bus: I2C, delay: D, sensor: S, config: Config) -> Result<Self, Error<I2C>> {
        let resolution = ResolutionSelector::Index(config.resolution).index()?;
        let mut camera = Self {
            bus,
            address: config.address,
            delay,
            sensor,
            config,
            resolution,
            mode: PipelineMode::Preview {
                format: config.preview_format,
                frame_size: config.preview_frame_size,
            },
        };
        camera.set_vertical_flip(config.vertical_flip)?;
        camera.set_horizontal_mirror(config.horizontal_mirror)?;
        camera.start_preview()?;
        debug!("Created OV5640 driver for a {}", camera.sensor.model());
        Ok(camera)
    }

    /// Give back the bus, delay provider and capture peripheral.
    pub fn release(self) -> (I2C, D, S) {
        (self.bus, self.delay, self.sensor)
    }

    pub fn address(&self) -> u8 {
        self.address
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn sensor(&self) -> &S {
        &self.sensor
    }

    pub fn sensor_mut(&mut self) -> &mut S {
        &mut self.sensor
    }

    pub fn pipeline_mode(&self) -> PipelineMode {
        self.mode
    }

    /// Read a sensor register directly.
    pub fn register(&mut self, register: impl Into<u16>) -> Result<u8, Error<I2C>> {
        read_register(&mut self.bus, self.address, register)
    }

    /// Write a sensor register directly.
    pub fn set_register(&mut self, register: impl Into<u16>, value: u8) -> Result<(), Error<I2C>> {
        write_register(&mut self.bus, self.address, register, value)
    }

    /// Write a list of registers, see [`RegisterProgram`].
    pub fn write_program(&mut self, program: RegisterProgram) -> Result<(), Error<I2C>> {
        write_program(&mut self.bus, self.address, &mut self.delay, program)
    }

    // Autofocus

    /// Upload the autofocus firmware and wait for the coprocessor to start.
    ///
    /// Fails with [`LibraryError::UnsupportedDevice`] (without touching the bus) if the sensor
    /// doesn't have an autofocus coprocessor. A [`LibraryError::FirmwareLoadTimeout`] leaves the
    /// camera usable for fixed-focus captures.
    pub fn init_autofocus(&mut self, firmware: &[u8]) -> Result<(), Error<I2C>> {
        load_firmware(
            &mut self.bus,
            self.address,
            &mut self.delay,
            self.sensor.model(),
            firmware,
        )
    }

    /// The current state of the autofocus coprocessor, or `None` if it reports something
    /// unrecognized.
    pub fn autofocus_status(&mut self) -> Result<Option<FirmwareStatus>, Error<I2C>> {
        autofocus::status(&mut self.bus, self.address)
    }

    /// Send a raw command to the autofocus coprocessor, returning whether it was acknowledged.
    pub fn send_autofocus_command(
        &mut self,
        command: AutofocusCommand,
        parameters: &[(CommandRegister, u8)],
    ) -> Result<bool, Error<I2C>> {
        autofocus::send_command(
            &mut self.bus,
            self.address,
            &mut self.delay,
            command,
            parameters,
        )
    }

    /// Focus once. If every zone in the result is zero, the autofocus failed.
    pub fn autofocus(&mut self) -> Result<FocusZones, Error<I2C>> {
        autofocus::autofocus(&mut self.bus, self.address, &mut self.delay)
    }

    /// Have the coprocessor keep refocusing on its own.
    pub fn autofocus_continuous(&mut self) -> Result<bool, Error<I2C>> {
        self.send_autofocus_command(AutofocusCommand::TriggerContinuous, &[])
    }

    pub fn release_focus(&mut self) -> Result<bool, Error<I2C>> {
        self.send_autofocus_command(AutofocusCommand::ReleaseFocus, &[])
    }

    /// The lens position, or `None` if the coprocessor didn't respond.
    pub fn vcm_step(&mut self) -> Result<Option<u8>, Error<I2C>> {
        autofocus::vcm_step(&mut self.bus, self.address, &mut self.delay)
    }

    /// Move the lens to `step` (0 to 255).
    pub fn set_vcm_step(&mut self, step: i32) -> Result<bool, Error<I2C>> {
        autofocus::set_vcm_step(&mut self.bus, self.address, &mut self.delay, step)
    }

    // Pipeline

    /// Select the resolution used for JPEG captures, by name or by (wrapping) index.
    ///
    /// Unknown names fail with [`LibraryError::InvalidResolution`] and leave the selection as it
    /// was.
    pub fn select_resolution<'a>(
        &mut self,
        selector: impl Into<ResolutionSelector<'a>>,
    ) -> Result<(), LibraryError> {
        self.resolution = selector.into().index()?;
        debug!("Selected resolution {}", self.resolution().name());
        Ok(())
    }

    /// The resolution used for JPEG captures.
    pub fn resolution(&self) -> &'static Resolution {
        &RESOLUTIONS[self.resolution]
    }

    fn reconfigure(&mut self, mode: PipelineMode) -> Result<(), Error<I2C>> {
        match mode {
            PipelineMode::Preview { format, frame_size } => {
                self.sensor.reconfigure(format, frame_size)?
            }
            PipelineMode::JpegCapture { frame_size } => {
                self.sensor.reconfigure(PixelFormat::Jpeg, frame_size)?
            }
        }
        self.mode = mode;
        self.delay.delay_ms(CAPTURE_SETTLE_MS);
        Ok(())
    }

    /// Switch the capture peripheral to the preview format and frame size.
    pub fn start_preview(&mut self) -> Result<(), Error<I2C>> {
        self.reconfigure(PipelineMode::Preview {
            format: self.config.preview_format,
            frame_size: self.config.preview_frame_size,
        })
    }

    /// Capture a single JPEG at the selected resolution.
    ///
    /// The sensor is always reconfigured first. `None` means no frame could be captured, which is
    /// expected to happen occasionally.
    pub fn capture_jpeg(&mut self) -> Result<Option<&[u8]>, Error<I2C>> {
        let frame_size = self.resolution().frame_size();
        self.reconfigure(PipelineMode::JpegCapture { frame_size })?;
        let jpeg = self.sensor.take();
        match jpeg {
            Some(data) => info!(
                "Captured {} bytes of JPEG data at {}",
                data.len(),
                RESOLUTIONS[self.resolution].name()
            ),
            None => warn!("JPEG capture failed"),
        }
        Ok(jpeg)
    }

    /// Grab the most recent preview frame.
    ///
    /// If the last capture was a JPEG, the preview is restarted first. The frame is only valid
    /// until the next capture.
    pub fn continuous_capture(&mut self) -> Result<Option<&[u8]>, Error<I2C>> {
        if let PipelineMode::JpegCapture { .. } = self.mode {
            self.start_preview()?;
        }
        Ok(self.sensor.take())
    }

    // Exposure, gain and white balance

    register_flag! {
        manual_exposure,
        SensorRegister::AecManual,
        AEC_MANUAL_EXPOSURE,
        "Whether the exposure is set manually instead of by the AEC."
    }

    register_flag! {
        manual_gain,
        SensorRegister::AecManual,
        AEC_MANUAL_GAIN,
        "Whether the gain is set manually instead of by the AGC."
    }

    register_flag! {
        manual_white_balance,
        SensorRegister::AwbManual,
        AWB_MANUAL,
        "Whether the white balance gains are set manually instead of by the AWB."
    }

    register_flag! {
        vertical_flip,
        SensorRegister::TimingControl20,
        TIMING_FLIP_MIRROR,
        "Whether the image is flipped vertically."
    }

    register_flag! {
        horizontal_mirror,
        SensorRegister::TimingControl21,
        TIMING_FLIP_MIRROR,
        "Whether the image is mirrored horizontally."
    }

    /// Set a manual exposure, or `None` to return to automatic exposure.
    ///
    /// Manual values must fit in 20 bits, and are checked before anything is written.
    pub fn set_exposure(&mut self, exposure: Option<u32>) -> Result<(), Error<I2C>> {
        let exposure = match exposure {
            None => return self.set_manual_exposure(false),
            Some(exposure) if exposure >= EXPOSURE_LIMIT => {
                return Err(LibraryError::InvalidArgument("Exposure must fit in 20 bits").into())
            }
            Some(exposure) => exposure,
        };
        self.set_manual_exposure(true)?;
        self.set_register(SensorRegister::ExposureHigh, (exposure >> 12) as u8)?;
        self.set_register(SensorRegister::ExposureMid, (exposure >> 4) as u8)?;
        self.set_register(SensorRegister::ExposureLow, (exposure << 4) as u8)
    }

    /// Set a manual gain, or `None` to return to automatic gain control.
    pub fn set_gain(&mut self, gain: Option<u8>) -> Result<(), Error<I2C>> {
        match gain {
            None => self.set_manual_gain(false),
            Some(gain) => {
                self.set_manual_gain(true)?;
                self.set_register(SensorRegister::Gain, gain)
            }
        }
    }

    /// Set manual white balance gains, or `None` to return to automatic white balance.
    ///
    /// Manual gains are the six values for registers 0x3400 to 0x3405 (like
    /// [`AutoSettings::white_balance`]), and are latched together using a group hold. If a write
    /// fails the group is closed without being launched, so the partial update is not applied.
    pub fn set_white_balance(&mut self, gains: Option<&[u8]>) -> Result<(), Error<I2C>> {
        let gains = match gains {
            None => return self.set_manual_white_balance(false),
            Some(gains) if gains.len() != SensorRegister::WHITE_BALANCE.len() => {
                return Err(LibraryError::InvalidArgument(
                    "White balance needs exactly six values (0x3400 to 0x3405)",
                )
                .into())
            }
            Some(gains) => gains,
        };
        let mut program: ArrayVec<(u16, u8), 10> = ArrayVec::new();
        program.push((SensorRegister::GroupAccess.into(), GROUP_HOLD_START));
        program.push((SensorRegister::AwbManual.into(), AWB_MANUAL));
        program.extend(
            SensorRegister::WHITE_BALANCE
                .iter()
                .map(|register| u16::from(*register))
                .zip(gains.iter().copied()),
        );
        program.push((SensorRegister::GroupAccess.into(), GROUP_HOLD_END));
        program.push((SensorRegister::GroupAccess.into(), GROUP_HOLD_LAUNCH));
        self.write_program(RegisterProgram::new(&program)).map_err(|err| {
            // Leave group hold so later writes aren't latched behind the partial group.
            if self
                .set_register(SensorRegister::GroupAccess, GROUP_HOLD_END)
                .is_err()
            {
                warn!("Unable to close white balance group hold");
            }
            err
        })
    }

    /// Read the current gain, exposure and white balance values.
    pub fn get_autosettings(&mut self) -> Result<AutoSettings, Error<I2C>> {
        let high = u32::from(self.register(SensorRegister::ExposureHigh)?);
        let mid = u32::from(self.register(SensorRegister::ExposureMid)?);
        let low = u32::from(self.register(SensorRegister::ExposureLow)?);
        let mut white_balance = [0u8; 6];
        for (value, register) in white_balance.iter_mut().zip(SensorRegister::WHITE_BALANCE) {
            *value = self.register(register)?;
        }
        let gain = self.register(SensorRegister::Gain)?;
        Ok(AutoSettings {
            gain,
            exposure: (high << 12) + (mid << 4) + (low >> 4),
            white_balance,
        })
    }
}
