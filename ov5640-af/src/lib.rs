// SPDX-License-Identifier: Apache-2.0
// Copyright © 2021 Will Ross
//! A pure-Rust driver for the OV5640 image sensor and its autofocus coprocessor, accessed over
//! I²C (SCCB).
//!
//! The OV5640 modules with a voice coil motor have a small microcontroller inside the sensor that
//! runs the autofocus algorithm. It has no firmware of its own, so before it can be used the
//! firmware has to be uploaded over I²C. After that it is driven by a simple command protocol:
//! write a command, wait for it to be acknowledged, read back the results. This crate handles the
//! firmware upload, the command protocol, and the handful of sensor registers needed to control
//! exposure, gain, white balance and orientation.
//!
//! Moving pixel data around (the parallel camera interface, DMA, frame buffers) is very platform
//! specific, so this crate leaves it to an implementation of [`ImageSensor`] and only tells it
//! which format and frame size to use.
//!
//! This library uses the [`embedded-hal`][embedded-hal] I²C and delay traits, and is `no_std`
//! compatible.
//!
//! [embedded-hal]: https://docs.rs/embedded-hal/*/embedded_hal/blocking/i2c/index.html
//!
//! # Example
//! ```no_run
//! use linux_embedded_hal::{Delay, I2cdev};
//! use ov5640_af::{Config, ImageSensor, Ov5640};
//! # use ov5640_af::{FrameSize, LibraryError, PixelFormat, SensorModel};
//! # struct Peripheral(Vec<u8>);
//! # impl ImageSensor for Peripheral {
//! #     fn model(&self) -> SensorModel { SensorModel::Ov5640 }
//! #     fn reconfigure(&mut self, _: PixelFormat, _: FrameSize) -> Result<(), LibraryError> {
//! #         Ok(())
//! #     }
//! #     fn take(&mut self) -> Option<&[u8]> { Some(&self.0) }
//! # }
//! # let peripheral = Peripheral(Vec::new());
//!
//! let i2c_bus = I2cdev::new("/dev/i2c-1").expect("/dev/i2c-1 needs to be an I2C controller");
//! // Default address for the OV5640 is 0x3C
//! let mut camera = Ov5640::new(i2c_bus, Delay, peripheral, Config::default())?;
//! let firmware = std::fs::read("ov5640_autofocus.bin").expect("The firmware should be readable");
//! camera.init_autofocus(&firmware)?;
//! camera.select_resolution("1280x720")?;
//! let zones = camera.autofocus()?;
//! println!("Focused zones: {:?}", zones.scores());
//! if let Some(jpeg) = camera.capture_jpeg()? {
//!     std::fs::write("doorbell.jpg", jpeg).expect("The image should be writable");
//! }
//! # Ok::<(), ov5640_af::Error<I2cdev>>(())
//! ```
//! This opens I²C bus #1 on Linux, uploads the autofocus firmware, then focuses and captures a
//! single 1280x720 JPEG. `peripheral` stands in for whatever is providing the frames.
//!
//! # Soft Failures
//! The autofocus coprocessor sometimes just doesn't answer, and the capture peripheral sometimes
//! doesn't deliver a frame. Neither is treated as an error: commands report whether they were
//! acknowledged, [`Ov5640::autofocus`] returns all-zero [`FocusZones`], and
//! [`Ov5640::capture_jpeg`] returns `None`. Errors are reserved for I²C failures and invalid
//! arguments. The [`doorbell`] module builds on this to run a focus-capture-send cycle that only
//! stops for bus errors.

#![no_std]

pub mod autofocus;
pub mod bus;
pub mod config;
pub mod doorbell;
#[doc(hidden)]
pub mod driver;
#[doc(hidden)]
pub mod error;
pub mod firmware;
pub mod register;
pub mod resolution;
pub mod sensor;
#[cfg(test)]
mod test;
mod util;

pub use autofocus::FocusZones;
pub use bus::{ProgramStep, RegisterProgram};
pub use config::{Config, DoorbellConfig};
pub use doorbell::{capture_cycle, CycleOutcome, FrameSink, MotionTrigger};
pub use driver::{AutoSettings, Ov5640, PipelineMode};
pub use error::{Error, LibraryError};
pub use register::*;
pub use resolution::{FrameSize, Resolution, ResolutionSelector, RESOLUTIONS};
pub use sensor::{ImageSensor, PixelFormat, SensorModel};
