// SPDX-License-Identifier: Apache-2.0
// Copyright © 2021 Will Ross
//! Glue for using the camera as a doorbell.
//!
//! A doorbell cycle is: focus, capture a JPEG, hand it off to be sent somewhere. How the frame is
//! encoded and where it ends up is up to the [`FrameSink`]. When to run a cycle (on a timer, or
//! when a [`MotionTrigger`] fires) is up to the caller.

use core::fmt;

use embedded_hal::blocking::delay::DelayMs;
use embedded_hal::blocking::i2c;
use embedded_hal::digital::v2::InputPin;
use log::{debug, info, warn};

use crate::config::DoorbellConfig;
use crate::driver::Ov5640;
use crate::error::Error;
use crate::sensor::ImageSensor;

/// Somewhere to send captured JPEGs, like a feed on an IoT service.
pub trait FrameSink {
    type Error: fmt::Debug;

    /// Send a JPEG to the named channel. Any transport encoding (like base64) is up to the
    /// implementation.
    fn send(&mut self, channel: &str, jpeg: &[u8]) -> Result<(), Self::Error>;
}

/// How a single doorbell cycle went.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum CycleOutcome {
    /// A JPEG of this many bytes was sent.
    Sent { bytes: usize },

    /// No frame could be captured. Try again next cycle.
    CaptureFailed,

    /// A frame was captured, but the sink rejected it.
    SendFailed,
}

/// Run one doorbell cycle.
///
/// Autofocus is skipped on sensors without an autofocus coprocessor, and a failed autofocus
/// doesn't stop the capture. Only bus errors are returned as errors, everything else is reported
/// through the [`CycleOutcome`].
pub fn capture_cycle<I2C, D, S, F>(
    camera: &mut Ov5640<I2C, D, S>,
    sink: &mut F,
    config: &DoorbellConfig,
) -> Result<CycleOutcome, Error<I2C>>
where
    I2C: i2c::WriteRead + i2c::Write,
    D: DelayMs<u16>,
    S: ImageSensor,
    F: FrameSink,
{
    if camera.sensor().model().supports_autofocus() {
        let zones = camera.autofocus()?;
        if zones.is_focused() {
            debug!("Zones focused: {:?}", zones.scores());
        } else {
            warn!("Autofocus failed, capturing anyway");
        }
    }
    let jpeg = match camera.capture_jpeg()? {
        Some(jpeg) => jpeg,
        None => {
            warn!("JPEG frame capture failed, waiting for next trigger");
            return Ok(CycleOutcome::CaptureFailed);
        }
    };
    let bytes = jpeg.len();
    match sink.send(config.channel, jpeg) {
        Ok(()) => {
            info!("Sent {} byte image to {}", bytes, config.channel);
            Ok(CycleOutcome::Sent { bytes })
        }
        Err(err) => {
            warn!("Unable to send image to {}: {:?}", config.channel, err);
            Ok(CycleOutcome::SendFailed)
        }
    }
}

/// Turns a PIR motion sensor output into single trigger events.
///
/// A trigger is reported once per low-to-high transition, no matter how long the sensor output
/// stays high.
#[derive(Debug)]
pub struct MotionTrigger<P> {
    pin: P,
    last_level: bool,
}

impl<P> MotionTrigger<P>
where
    P: InputPin,
{
    pub fn new(pin: P) -> Self {
        Self {
            pin,
            last_level: false,
        }
    }

    /// Sample the input, returning `true` if motion started since the last sample.
    pub fn poll(&mut self) -> Result<bool, P::Error> {
        let level = self.pin.is_high()?;
        let triggered = level && !self.last_level;
        self.last_level = level;
        if triggered {
            debug!("Motion detected");
        }
        Ok(triggered)
    }

    pub fn release(self) -> P {
        self.pin
    }
}

#[cfg(test)]
mod test {
    extern crate std;

    use std::vec;
    use std::vec::Vec;

    use super::*;
    use crate::sensor::SensorModel;
    use crate::test::*;

    /// Records everything sent to it, optionally refusing it all.
    #[derive(Default)]
    struct RecordingSink {
        sent: Vec<(std::string::String, Vec<u8>)>,
        offline: bool,
    }

    impl FrameSink for RecordingSink {
        type Error = &'static str;

        fn send(&mut self, channel: &str, jpeg: &[u8]) -> Result<(), Self::Error> {
            if self.offline {
                return Err("Feed not available");
            }
            self.sent.push((channel.into(), jpeg.to_vec()));
            Ok(())
        }
    }

    fn opcodes(bus: &ov5640_af_test_data::MockBus) -> Vec<u8> {
        bus.writes()
            .into_iter()
            .filter(|(register, _)| *register == 0x3022)
            .map(|(_, data)| data[0])
            .collect()
    }

    #[test]
    fn cycle_sends_frame() {
        let (mut camera, bus) = create_camera(SensorModel::Ov5640);
        let mut sink = RecordingSink::default();
        let outcome = capture_cycle(&mut camera, &mut sink, &DoorbellConfig::default()).unwrap();
        assert_eq!(
            outcome,
            CycleOutcome::Sent {
                bytes: FAKE_JPEG.len()
            }
        );
        assert_eq!(sink.sent, vec![(std::string::String::from("camera"), FAKE_JPEG.to_vec())]);
        assert_eq!(opcodes(&bus), vec![0x08, 0x03]);
    }

    #[test]
    fn cycle_continues_without_focus() {
        let (mut camera, bus) = create_camera(SensorModel::Ov5640);
        bus.fail_command(0x08);
        let mut sink = RecordingSink::default();
        let config = DoorbellConfig::default().with_channel("featheresp32s3");
        let outcome = capture_cycle(&mut camera, &mut sink, &config).unwrap();
        assert!(matches!(outcome, CycleOutcome::Sent { .. }));
        assert_eq!(sink.sent[0].0, "featheresp32s3");
    }

    #[test]
    fn cycle_skips_autofocus_without_coprocessor() {
        let (mut camera, bus) = create_camera(SensorModel::Ov2640);
        let mut sink = RecordingSink::default();
        capture_cycle(&mut camera, &mut sink, &DoorbellConfig::default()).unwrap();
        assert!(opcodes(&bus).is_empty());
        assert_eq!(sink.sent.len(), 1);
    }

    #[test]
    fn cycle_capture_failure() {
        let (mut camera, _bus) = create_camera(SensorModel::Ov5640);
        camera.sensor_mut().frame = None;
        let mut sink = RecordingSink::default();
        let outcome = capture_cycle(&mut camera, &mut sink, &DoorbellConfig::default()).unwrap();
        assert_eq!(outcome, CycleOutcome::CaptureFailed);
        assert!(sink.sent.is_empty());
    }

    #[test]
    fn cycle_send_failure() {
        let (mut camera, _bus) = create_camera(SensorModel::Ov5640);
        let mut sink = RecordingSink {
            offline: true,
            ..RecordingSink::default()
        };
        let outcome = capture_cycle(&mut camera, &mut sink, &DoorbellConfig::default()).unwrap();
        assert_eq!(outcome, CycleOutcome::SendFailed);
    }

    #[test]
    fn cycle_bus_failure() {
        let (mut camera, bus) = create_camera(SensorModel::Ov5640);
        bus.fail_on_register(0x3023);
        let mut sink = RecordingSink::default();
        let res = capture_cycle(&mut camera, &mut sink, &DoorbellConfig::default());
        assert!(matches!(res, Err(Error::I2cWriteError(_))));
        assert!(sink.sent.is_empty());
    }

    #[test]
    fn rising_edges_only() {
        let pin = MockPin::new(&[false, true, true, true, false, true, false, false]);
        let mut trigger = MotionTrigger::new(pin);
        let triggers: Vec<bool> = (0..8).map(|_| trigger.poll().unwrap()).collect();
        assert_eq!(
            triggers,
            vec![false, true, false, false, false, true, false, false]
        );
    }

    #[test]
    fn high_at_start_triggers() {
        let mut trigger = MotionTrigger::new(MockPin::new(&[true]));
        assert!(trigger.poll().unwrap());
        assert!(!trigger.poll().unwrap());
        let _pin = trigger.release();
    }
}
