mod dewpoint;
mod point;
mod sampler;
mod sensor;

pub use dewpoint::{dew_point, saturation_vapor_pressure};
pub use point::{DataPoint, FieldValue};
pub use sampler::{CycleOutcome, PointWriter, Sampler};
pub use sensor::{
    DummySensorController, Reading, SensorController, SensorControllerPointer, SensorError,
};

/// Measurement name shared by every sample the node emits.
pub const MEASUREMENT_NAME: &str = "temp_sensor";
