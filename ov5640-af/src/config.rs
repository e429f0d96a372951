// SPDX-License-Identifier: Apache-2.0
// Copyright © 2021 Will Ross
use crate::resolution::FrameSize;
use crate::sensor::PixelFormat;

/// The default 7-bit I²C address of the OV5640.
pub const DEFAULT_ADDRESS: u8 = 0x3C;

/// Settings applied when an [`Ov5640`][crate::Ov5640] is created.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct Config {
    /// 7-bit I²C address of the sensor.
    pub address: u8,

    /// Pixel format used outside of JPEG captures.
    pub preview_format: PixelFormat,

    /// Frame size used outside of JPEG captures.
    pub preview_frame_size: FrameSize,

    /// Initial index into [`RESOLUTIONS`][crate::RESOLUTIONS] for JPEG captures. Wrapped like any
    /// other index.
    pub resolution: i32,

    pub vertical_flip: bool,

    pub horizontal_mirror: bool,
}

impl Config {
    pub fn with_address(mut self, address: u8) -> Self {
        self.address = address;
        self
    }

    pub fn with_preview(mut self, format: PixelFormat, frame_size: FrameSize) -> Self {
        self.preview_format = format;
        self.preview_frame_size = frame_size;
        self
    }

    pub fn with_resolution(mut self, index: i32) -> Self {
        self.resolution = index;
        self
    }

    pub fn with_vertical_flip(mut self, flip: bool) -> Self {
        self.vertical_flip = flip;
        self
    }

    pub fn with_horizontal_mirror(mut self, mirror: bool) -> Self {
        self.horizontal_mirror = mirror;
        self
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            address: DEFAULT_ADDRESS,
            preview_format: PixelFormat::Rgb565,
            preview_frame_size: FrameSize::Hqvga,
            // 800x600
            resolution: 2,
            // The module is mounted upside down on most boards
            vertical_flip: true,
            horizontal_mirror: false,
        }
    }
}

/// Settings for [`capture_cycle`][crate::doorbell::capture_cycle].
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct DoorbellConfig<'a> {
    /// The channel (feed) name frames are sent to.
    pub channel: &'a str,
}

impl<'a> DoorbellConfig<'a> {
    pub fn with_channel(self, channel: &'a str) -> Self {
        Self { channel }
    }
}

impl Default for DoorbellConfig<'_> {
    fn default() -> Self {
        Self { channel: "camera" }
    }
}
