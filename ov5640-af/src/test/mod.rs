
pub(crate) use peripherals::{create_camera, MockPin, MockSensor, FAKE_JPEG};
