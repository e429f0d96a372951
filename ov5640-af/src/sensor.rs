// SPDX-License-Identifier: Apache-2.0
// Copyright © 2021 Will Ross
//! The boundary between this driver and the camera capture peripheral.
//!
//! Register access to the sensor is done by this crate directly, but moving pixel data (the
//! parallel camera interface, DMA, frame buffers) is left to the platform. That side of things is
//! described by [`ImageSensor`].

use core::fmt;

use crate::error::LibraryError;
use crate::resolution::FrameSize;

/// The image sensor models a capture peripheral may report.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum SensorModel {
    Ov2640,
    Ov3660,
    Ov5640,
    /// Something else, identified by its product ID.
    Other(u16),
}

impl SensorModel {
    /// Only the OV5640 has the autofocus coprocessor (and the voice coil motor it drives).
    pub fn supports_autofocus(&self) -> bool {
        matches!(self, SensorModel::Ov5640)
    }
}

impl fmt::Display for SensorModel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SensorModel::Ov2640 => write!(f, "OV2640"),
            SensorModel::Ov3660 => write!(f, "OV3660"),
            SensorModel::Ov5640 => write!(f, "OV5640"),
            SensorModel::Other(pid) => write!(f, "unknown sensor {:#06x}", pid),
        }
    }
}

/// The encoding of pixel data produced by the sensor.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum PixelFormat {
    Rgb565,
    Yuv422,
    Grayscale,
    Jpeg,
}

/// A camera capture peripheral with an image sensor attached.
///
/// Implementations own the frame buffers. A frame returned by [`take`][ImageSensor::take] is only
/// valid until the next call to `take` or `reconfigure`, which the borrow on `self` enforces.
pub trait ImageSensor {
    /// The sensor model that was detected when the peripheral was brought up.
    fn model(&self) -> SensorModel;

    /// Change the pixel format and frame size the sensor produces.
    fn reconfigure(
        &mut self,
        pixel_format: PixelFormat,
        frame_size: FrameSize,
    ) -> Result<(), LibraryError>;

    /// Grab a single frame, or `None` if no frame could be captured.
    fn take(&mut self) -> Option<&[u8]>;
}
