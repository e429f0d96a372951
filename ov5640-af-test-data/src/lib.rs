// SPDX-License-Identifier: Apache-2.0
// Copyright © 2021 Will Ross
mod firmware_data;
mod i2c_mock;

pub use firmware_data::sample_firmware;
pub use i2c_mock::{AckBehavior, BusEvent, MockBus, MockDelay, MockError, OV5640_ADDRESS};
