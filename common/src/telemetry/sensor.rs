use std::fmt;

use serde::Deserialize;

/// One successful measurement, valid for the current cycle only.
#[derive(Clone, Copy, Debug, Default, Deserialize, PartialEq)]
pub struct Reading {
    /// Air temperature in °C.
    pub temperature: f32,
    /// Relative humidity in %.
    pub humidity: f32,
}

/// Why a measurement failed.
///
/// Codes are stable because they are published as a field right next to the
/// data they explain; 0 is reserved for "no error".
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum SensorError {
    /// Bus-level failure carrying the platform error code.
    Bus(i32),
    /// Response payload failed its CRC check.
    Crc,
    /// Sensor did not answer within the measurement window.
    NotReady,
}

impl SensorError {
    pub fn code(&self) -> i64 {
        match self {
            // Platform bus codes are nonzero by construction.
            SensorError::Bus(code) => *code as i64,
            SensorError::Crc => 1,
            SensorError::NotReady => 2,
        }
    }
}

impl fmt::Display for SensorError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SensorError::Bus(code) => write!(f, "bus error {code}"),
            SensorError::Crc => write!(f, "checksum mismatch"),
            SensorError::NotReady => write!(f, "sensor not ready"),
        }
    }
}

impl std::error::Error for SensorError {}

pub type SensorControllerPointer = Box<dyn SensorController + Send>;

/// Where readings come from. The firmware implements this over I2C, the
/// host runner over a canned fixture.
pub trait SensorController {
    /// Trigger one measurement.
    fn sample(&mut self) -> Result<Reading, SensorError>;

    /// Raw status word from the most recent transaction with the sensor.
    fn status(&self) -> u16;
}

/// Fixture-backed controller for the host runner and tests. Cycles through
/// the canned readings forever.
#[derive(Deserialize)]
pub struct DummySensorController {
    readings: Vec<Reading>,
    status: u16,
    #[serde(skip)]
    cursor: usize,
}

impl DummySensorController {
    pub fn new() -> Result<Self, serde_json::Error> {
        let json_data = std::include_str!("./dummysensor.json");

        serde_json::from_str::<Self>(json_data)
    }
}

impl SensorController for DummySensorController {
    fn sample(&mut self) -> Result<Reading, SensorError> {
        let reading = self.readings[self.cursor % self.readings.len()];
        self.cursor += 1;
        Ok(reading)
    }

    fn status(&self) -> u16 {
        self.status
    }
}

#[test]
fn test_dummy_sensor_controller() {
    let mut controller = DummySensorController::new().unwrap();

    let first = controller.sample().unwrap();
    assert_eq!(first.temperature, 21.4);
    assert_eq!(first.humidity, 48.2);
    assert_eq!(controller.status(), 0x8010);

    // Wraps around instead of running dry.
    for _ in 0..16 {
        controller.sample().unwrap();
    }
}
