// SPDX-License-Identifier: Apache-2.0
// Copyright © 2021 Will Ross

use crate::error::LibraryError;

/// Output frame sizes understood by the capture peripheral.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum FrameSize {
    /// 160x120
    Qqvga,
    /// 240x176
    Hqvga,
    /// 240x240
    R240x240,
    /// 320x240
    Qvga,
    /// 640x480
    Vga,
    /// 800x600
    Svga,
    /// 1024x768
    Xga,
    /// 1280x720
    Hd,
    /// 1280x1024
    Sxga,
    /// 1600x1200
    Uxga,
    /// 1920x1080
    Fhd,
    /// 2048x1536
    Qxga,
    /// 2560x1440
    Qhd,
    /// 2560x1600
    Wqxga,
    /// 2560x1920
    Qsxga,
}

impl FrameSize {
    /// The (width, height) of this frame size in pixels.
    pub fn dimensions(&self) -> (u16, u16) {
        match self {
            Self::Qqvga => (160, 120),
            Self::Hqvga => (240, 176),
            Self::R240x240 => (240, 240),
            Self::Qvga => (320, 240),
            Self::Vga => (640, 480),
            Self::Svga => (800, 600),
            Self::Xga => (1024, 768),
            Self::Hd => (1280, 720),
            Self::Sxga => (1280, 1024),
            Self::Uxga => (1600, 1200),
            Self::Fhd => (1920, 1080),
            Self::Qxga => (2048, 1536),
            Self::Qhd => (2560, 1440),
            Self::Wqxga => (2560, 1600),
            Self::Qsxga => (2560, 1920),
        }
    }
}

/// An entry in the resolution table.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct Resolution {
    name: &'static str,
    frame_size: FrameSize,
}

impl Resolution {
    const fn new(name: &'static str, frame_size: FrameSize) -> Self {
        Self { name, frame_size }
    }

    /// The name of this resolution, like "800x600".
    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn frame_size(&self) -> FrameSize {
        self.frame_size
    }

    pub fn width(&self) -> u16 {
        self.frame_size.dimensions().0
    }

    pub fn height(&self) -> u16 {
        self.frame_size.dimensions().1
    }
}

/// The resolutions that can be used for JPEG captures, smallest first.
pub const RESOLUTIONS: [Resolution; 12] = [
    Resolution::new("320x240", FrameSize::Qvga),
    Resolution::new("640x480", FrameSize::Vga),
    Resolution::new("800x600", FrameSize::Svga),
    Resolution::new("1024x768", FrameSize::Xga),
    Resolution::new("1280x720", FrameSize::Hd),
    Resolution::new("1280x1024", FrameSize::Sxga),
    Resolution::new("1600x1200", FrameSize::Uxga),
    Resolution::new("1920x1080", FrameSize::Fhd),
    Resolution::new("2048x1536", FrameSize::Qxga),
    Resolution::new("2560x1440", FrameSize::Qhd),
    Resolution::new("2560x1600", FrameSize::Wqxga),
    Resolution::new("2560x1920", FrameSize::Qsxga),
];

/// Ways of picking an entry out of [`RESOLUTIONS`].
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum ResolutionSelector<'a> {
    /// Must exactly match the name of an entry.
    Name(&'a str),

    /// Any index is accepted, it wraps around the table (negative indices count from the end).
    Index(i32),
}

impl<'a> ResolutionSelector<'a> {
    /// Resolve this selector to an index into [`RESOLUTIONS`].
    pub fn index(&self) -> Result<usize, LibraryError> {
        match self {
            Self::Name(name) => RESOLUTIONS
                .iter()
                .position(|resolution| resolution.name == *name)
                .ok_or(LibraryError::InvalidResolution),
            Self::Index(index) => Ok(index.rem_euclid(RESOLUTIONS.len() as i32) as usize),
        }
    }
}

impl<'a> From<&'a str> for ResolutionSelector<'a> {
    fn from(name: &'a str) -> Self {
        Self::Name(name)
    }
}

impl From<i32> for ResolutionSelector<'_> {
    fn from(index: i32) -> Self {
        Self::Index(index)
    }
}
