// SPDX-License-Identifier: Apache-2.0
// Copyright © 2021 Will Ross
#[cfg(feature = "std")]
extern crate std;

use core::fmt;

use embedded_hal::blocking::i2c;

use crate::sensor::SensorModel;

/// Errors that don't involve I²C.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LibraryError {
    /// A caller supplied value is outside of what the operation accepts.
    InvalidArgument(&'static str),

    /// The given resolution name is not in the resolution table.
    InvalidResolution,

    /// The attached sensor does not have an autofocus coprocessor.
    UnsupportedDevice(SensorModel),

    /// The autofocus coprocessor never reported it was ready after loading its firmware.
    FirmwareLoadTimeout,

    /// The capture peripheral rejected a request.
    SensorFault(&'static str),
}

impl fmt::Display for LibraryError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LibraryError::InvalidArgument(msg) => write!(f, "{}", msg),
            LibraryError::InvalidResolution => write!(f, "Invalid resolution"),
            LibraryError::UnsupportedDevice(model) => {
                write!(f, "Autofocus not supported on {}", model)
            }
            LibraryError::FirmwareLoadTimeout => {
                write!(f, "Timed out after trying to load autofocus firmware")
            }
            LibraryError::SensorFault(msg) => write!(f, "{}", msg),
        }
    }
}

#[cfg(feature = "std")]
impl std::error::Error for LibraryError {}

pub enum Error<I2C>
where
    I2C: i2c::WriteRead + i2c::Write,
{
    /// Errors from writing to the camera over I²C.
    I2cWriteError(<I2C as i2c::Write>::Error),

    /// Errors from reading registers from the camera over I²C.
    I2cWriteReadError(<I2C as i2c::WriteRead>::Error),

    /// Errors originating from within this library.
    LibraryError(LibraryError),
}

impl<I2C> Error<I2C>
where
    I2C: i2c::WriteRead + i2c::Write,
{
    /// Whether this error came from the bus (as opposed to being raised by the library).
    pub fn is_bus_error(&self) -> bool {
        !matches!(self, Error::LibraryError(_))
    }
}

// Custom Debug implementation so that I2C doesn't need to implement Debug (like the one from
// linux-embedded-hal).
impl<I2C> fmt::Debug for Error<I2C>
where
    I2C: i2c::WriteRead + i2c::Write,
    <I2C as i2c::WriteRead>::Error: fmt::Debug,
    <I2C as i2c::Write>::Error: fmt::Debug,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::I2cWriteError(i2c_error) => f
                .debug_tuple("Error::I2cWriteError")
                .field(i2c_error)
                .finish(),
            Error::I2cWriteReadError(i2c_error) => f
                .debug_tuple("Error::I2cWriteReadError")
                .field(i2c_error)
                .finish(),
            Error::LibraryError(err) => f.debug_tuple("Error::LibraryError").field(err).finish(),
        }
    }
}

impl<I2C> fmt::Display for Error<I2C>
where
    I2C: i2c::WriteRead + i2c::Write,
    <I2C as i2c::WriteRead>::Error: fmt::Debug,
    <I2C as i2c::Write>::Error: fmt::Debug,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::I2cWriteError(i2c_error) => write!(f, "I2C Write Error: {:?}", i2c_error),
            Error::I2cWriteReadError(i2c_error) => {
                write!(f, "I2C Write-Read Error: {:?}", i2c_error)
            }
            Error::LibraryError(err) => write!(f, "Library Error: {}", err),
        }
    }
}

#[cfg(feature = "std")]
impl<I2C> std::error::Error for Error<I2C>
where
    I2C: i2c::WriteRead + i2c::Write,
    <I2C as i2c::WriteRead>::Error: std::error::Error + 'static,
    <I2C as i2c::Write>::Error: std::error::Error + 'static,
{
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::I2cWriteError(i2c_error) => Some(i2c_error),
            Error::I2cWriteReadError(i2c_error) => Some(i2c_error),
            Error::LibraryError(lib_err) => Some(lib_err),
        }
    }
}

impl<I2C> From<LibraryError> for Error<I2C>
where
    I2C: i2c::WriteRead + i2c::Write,
{
    fn from(lib_err: LibraryError) -> Self {
        Self::LibraryError(lib_err)
    }
}
