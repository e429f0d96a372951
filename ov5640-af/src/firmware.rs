// SPDX-License-Identifier: Apache-2.0
// Copyright © 2021 Will Ross
//! Uploading firmware to the autofocus coprocessor.
//!
//! The firmware image itself is opaque, it is copied byte-for-byte into the coprocessor's program
//! memory starting at [`FIRMWARE_BASE_ADDRESS`]. Where the image comes from (a file, a blob in
//! flash) is up to the caller.

use core::iter::Enumerate;
use core::slice::Chunks;

use embedded_hal::blocking::delay::DelayMs;
use embedded_hal::blocking::i2c;
use log::{debug, info, warn};

use crate::bus::{
    read_register, write_burst, write_program, write_register, RegisterProgram, MAX_BURST_LENGTH,
};
use crate::error::{Error, LibraryError};
use crate::register::{CommandRegister, FirmwareStatus, SensorRegister, MCU_RESET};
use crate::sensor::SensorModel;
use crate::util::{poll, POLL_ATTEMPTS, POLL_INTERVAL_MS};

/// Where the first byte of firmware is written.
pub const FIRMWARE_BASE_ADDRESS: u16 = 0x8000;

/// The largest firmware image that fits between [`FIRMWARE_BASE_ADDRESS`] and the end of the
/// register address space.
pub const MAX_FIRMWARE_LENGTH: usize = 0x8000;

/// How many bytes of firmware are sent per bus transaction.
pub const CHUNK_SIZE: usize = MAX_BURST_LENGTH;

/// How long to let the coprocessor sit in reset before uploading.
const RESET_SETTLE_MS: u16 = 10;

/// Written after the firmware image to clear the command registers and start the coprocessor.
pub const FINALIZE_FIRMWARE_LOAD: RegisterProgram<'static> = RegisterProgram::new(&[
    (CommandRegister::Main as u16, 0x00),
    (CommandRegister::Ack as u16, 0x00),
    (CommandRegister::Para0 as u16, 0x00),
    (CommandRegister::Para1 as u16, 0x00),
    (CommandRegister::Para2 as u16, 0x00),
    (CommandRegister::Para3 as u16, 0x00),
    (CommandRegister::Para4 as u16, 0x00),
    (CommandRegister::FirmwareStatus as u16, FirmwareStatus::FirmwareBad as u8),
    (SensorRegister::SystemReset00 as u16, 0x00),
]);

/// Splits a firmware image into (load address, payload) pairs of at most [`CHUNK_SIZE`] bytes.
#[derive(Clone, Debug)]
pub struct FirmwareChunks<'a> {
    chunks: Enumerate<Chunks<'a, u8>>,
}

impl<'a> FirmwareChunks<'a> {
    /// Images longer than [`MAX_FIRMWARE_LENGTH`] are rejected, as their load addresses would run
    /// past the end of the register address space.
    pub fn new(firmware: &'a [u8]) -> Result<Self, LibraryError> {
        if firmware.len() > MAX_FIRMWARE_LENGTH {
            return Err(LibraryError::InvalidArgument("Firmware image is larger than 32KiB"));
        }
        Ok(Self {
            chunks: firmware.chunks(CHUNK_SIZE).enumerate(),
        })
    }
}

impl<'a> Iterator for FirmwareChunks<'a> {
    type Item = (u16, &'a [u8]);

    fn next(&mut self) -> Option<Self::Item> {
        self.chunks.next().map(|(index, chunk)| {
            let offset = index * CHUNK_SIZE;
            (FIRMWARE_BASE_ADDRESS + offset as u16, chunk)
        })
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.chunks.size_hint()
    }
}

impl ExactSizeIterator for FirmwareChunks<'_> {}

/// Reset the autofocus coprocessor, upload `firmware` to it, and wait for it to start.
///
/// Nothing is sent on the bus if `model` has no autofocus coprocessor or if the image is too
/// large. If the coprocessor hasn't reported [`FirmwareStatus::Idle`] after about a second,
/// [`LibraryError::FirmwareLoadTimeout`] is returned. The sensor is still usable for fixed-focus
/// captures at that point.
pub fn load_firmware<I2C, D>(
    bus: &mut I2C,
    i2c_address: u8,
    delay: &mut D,
    model: SensorModel,
    firmware: &[u8],
) -> Result<(), Error<I2C>>
where
    I2C: i2c::WriteRead + i2c::Write,
    D: DelayMs<u16>,
{
    if !model.supports_autofocus() {
        return Err(LibraryError::UnsupportedDevice(model).into());
    }
    let chunks = FirmwareChunks::new(firmware)?;
    write_register(bus, i2c_address, SensorRegister::SystemReset00, MCU_RESET)?;
    delay.delay_ms(RESET_SETTLE_MS);
    let chunk_count = chunks.len();
    for (address, payload) in chunks {
        write_burst(bus, i2c_address, address, payload)?;
    }
    debug!(
        "Wrote {} bytes of autofocus firmware in {} chunks",
        firmware.len(),
        chunk_count
    );
    write_program(bus, i2c_address, delay, FINALIZE_FIRMWARE_LOAD)?;
    let idle = u8::from(FirmwareStatus::Idle);
    let started = poll(delay, POLL_ATTEMPTS, POLL_INTERVAL_MS, || {
        let status = read_register(bus, i2c_address, CommandRegister::FirmwareStatus)?;
        Ok::<_, Error<I2C>>(status == idle)
    })?;
    if started {
        info!("Autofocus firmware loaded");
        Ok(())
    } else {
        warn!("Autofocus coprocessor never became idle after loading firmware");
        Err(LibraryError::FirmwareLoadTimeout.into())
    }
}

#[cfg(test)]
mod test {
    extern crate std;

    use std::vec;
    use std::vec::Vec;

    use ov5640_af_test_data::{sample_firmware, BusEvent, MockBus, OV5640_ADDRESS};

    use super::*;

    #[test]
    fn chunk_counts() {
        for length in (0..=1024).chain([CHUNK_SIZE * 10, MAX_FIRMWARE_LENGTH]) {
            let firmware = sample_firmware(length);
            let chunks: Vec<_> = FirmwareChunks::new(&firmware).unwrap().collect();
            let expected_count = (length + CHUNK_SIZE - 1) / CHUNK_SIZE;
            assert_eq!(chunks.len(), expected_count, "chunk count for {} bytes", length);
            if let Some((_, last)) = chunks.last() {
                let expected_last = match length % CHUNK_SIZE {
                    0 => CHUNK_SIZE,
                    remainder => remainder,
                };
                assert_eq!(last.len(), expected_last);
            }
            let rejoined: Vec<u8> = chunks
                .iter()
                .flat_map(|(_, payload)| payload.iter().copied())
                .collect();
            assert_eq!(rejoined, firmware);
        }
    }

    #[test]
    fn chunk_addresses() {
        let firmware = sample_firmware(600);
        let chunks: Vec<_> = FirmwareChunks::new(&firmware)
            .unwrap()
            .map(|(address, payload)| (address, payload.len()))
            .collect();
        assert_eq!(chunks, vec![(0x8000, 254), (0x80FE, 254), (0x81FC, 92)]);
    }

    #[test]
    fn chunks_stay_in_program_memory() {
        let firmware = sample_firmware(MAX_FIRMWARE_LENGTH);
        let (address, payload) = FirmwareChunks::new(&firmware).unwrap().last().unwrap();
        assert_eq!(usize::from(address) + payload.len(), 0x10000);
        for length in [MAX_FIRMWARE_LENGTH + 1, 70000] {
            let oversized = sample_firmware(length);
            let res = FirmwareChunks::new(&oversized);
            assert!(matches!(res, Err(LibraryError::InvalidArgument(_))));
        }
    }

    #[test]
    fn load_600_bytes() {
        let mut bus = MockBus::new(OV5640_ADDRESS);
        let mut delay = bus.delay();
        let firmware = sample_firmware(600);
        load_firmware(
            &mut bus,
            OV5640_ADDRESS,
            &mut delay,
            SensorModel::Ov5640,
            &firmware,
        )
        .unwrap();
        let events = bus.events().clone();
        assert_eq!(
            events[0],
            BusEvent::Write {
                register: 0x3000,
                data: vec![0x20]
            }
        );
        assert_eq!(events[1], BusEvent::Delay { ms: 10 });
        let bursts: Vec<_> = bus
            .writes()
            .into_iter()
            .filter(|(_, data)| data.len() > 1)
            .map(|(register, data)| (register, data.len()))
            .collect();
        assert_eq!(bursts, vec![(0x8000, 254), (0x80FE, 254), (0x81FC, 92)]);
        assert_eq!(bus.memory(0x8000, 600), firmware);
        let finalize: Vec<_> = bus.writes().into_iter().skip(4).collect();
        assert_eq!(
            finalize,
            vec![
                (0x3022, vec![0x00]),
                (0x3023, vec![0x00]),
                (0x3024, vec![0x00]),
                (0x3025, vec![0x00]),
                (0x3026, vec![0x00]),
                (0x3027, vec![0x00]),
                (0x3028, vec![0x00]),
                (0x3029, vec![0x7F]),
                (0x3000, vec![0x00]),
            ]
        );
        assert_eq!(bus.register(0x3029), 0x70);
    }

    #[test]
    fn unsupported_sensor() {
        let mut bus = MockBus::new(OV5640_ADDRESS);
        let mut delay = bus.delay();
        for model in [
            SensorModel::Ov2640,
            SensorModel::Ov3660,
            SensorModel::Other(0x1234),
        ] {
            let res = load_firmware(
                &mut bus,
                OV5640_ADDRESS,
                &mut delay,
                model,
                &sample_firmware(600),
            );
            assert!(matches!(
                res,
                Err(Error::LibraryError(LibraryError::UnsupportedDevice(m))) if m == model
            ));
        }
        assert!(bus.events().is_empty());
    }

    #[test]
    fn oversized_firmware() {
        let mut bus = MockBus::new(OV5640_ADDRESS);
        let mut delay = bus.delay();
        let res = load_firmware(
            &mut bus,
            OV5640_ADDRESS,
            &mut delay,
            SensorModel::Ov5640,
            &sample_firmware(MAX_FIRMWARE_LENGTH + 1),
        );
        assert!(matches!(
            res,
            Err(Error::LibraryError(LibraryError::InvalidArgument(_)))
        ));
        assert!(bus.events().is_empty());
    }

    #[test]
    fn firmware_timeout() {
        let mut bus = MockBus::new(OV5640_ADDRESS);
        let mut delay = bus.delay();
        bus.set_firmware_boots(false);
        let res = load_firmware(
            &mut bus,
            OV5640_ADDRESS,
            &mut delay,
            SensorModel::Ov5640,
            &sample_firmware(300),
        );
        assert!(matches!(
            res,
            Err(Error::LibraryError(LibraryError::FirmwareLoadTimeout))
        ));
        assert_eq!(bus.reads_of(0x3029), 100);
        // Reset settle plus 100 polling intervals
        assert_eq!(bus.total_delay_ms(), 10 + 1000);
    }

    #[test]
    fn slow_boot() {
        let mut bus = MockBus::new(OV5640_ADDRESS);
        let mut delay = bus.delay();
        bus.set_boot_reads(3);
        load_firmware(
            &mut bus,
            OV5640_ADDRESS,
            &mut delay,
            SensorModel::Ov5640,
            &sample_firmware(10),
        )
        .unwrap();
        assert_eq!(bus.reads_of(0x3029), 4);
        assert_eq!(bus.total_delay_ms(), 10 + 30);
    }

    #[test]
    fn bus_failure_during_upload() {
        let mut bus = MockBus::new(OV5640_ADDRESS);
        let mut delay = bus.delay();
        bus.fail_on_register(0x8100);
        let res = load_firmware(
            &mut bus,
            OV5640_ADDRESS,
            &mut delay,
            SensorModel::Ov5640,
            &sample_firmware(600),
        );
        assert!(matches!(res, Err(Error::I2cWriteError(_))));
        // The reset and first chunk made it out, nothing after the failed chunk did.
        assert_eq!(bus.writes().len(), 2);
    }
}
