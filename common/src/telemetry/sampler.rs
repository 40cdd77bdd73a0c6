use chrono::Utc;
use log::{error, info};

use super::{dew_point, DataPoint, SensorController};

/// Publish seam for one encoded sample. The firmware posts the point to
/// InfluxDB; the host runner logs the line instead.
pub trait PointWriter {
    fn write_point(&mut self, point: &DataPoint) -> Result<(), Box<dyn std::error::Error>>;
}

/// Outcome of one cycle, for logging and assertions. Never an error:
/// every failure is absorbed and the caller only schedules the next cycle.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct CycleOutcome {
    /// Sensor error code for this cycle; 0 means the read succeeded.
    pub sensor_error: i64,
    /// Whether the writer accepted the point.
    pub published: bool,
}

/// The node's one periodic job: refresh the point from the sensor and hand
/// it to the writer. Owns the point for the process lifetime; tags set at
/// startup ride on every cycle.
pub struct Sampler {
    point: DataPoint,
}

impl Sampler {
    pub fn new(measurement: &str) -> Self {
        Self {
            point: DataPoint::new(measurement),
        }
    }

    /// Identifying tag, set once at startup.
    pub fn add_tag(&mut self, key: &str, value: &str) {
        self.point.add_tag(key, value);
    }

    /// The point as left behind by the most recent cycle.
    pub fn point(&self) -> &DataPoint {
        &self.point
    }

    /// One steady-state iteration: clear, read, derive, stamp, publish.
    pub fn run_cycle(
        &mut self,
        sensor: &mut dyn SensorController,
        writer: &mut dyn PointWriter,
    ) -> CycleOutcome {
        self.point.clear_fields();

        let sensor_error = match sensor.sample() {
            Ok(reading) => {
                self.point.add_field("temperature", reading.temperature);
                self.point.add_field("humidity", reading.humidity);
                // Derived only from a good reading. A dew point backed by
                // stale inputs would be indistinguishable from a real one.
                self.point.add_field(
                    "dew_point",
                    dew_point(reading.temperature as f64, reading.humidity as f64),
                );
                0
            }
            Err(err) => {
                error!("Sensor read failed: {err}");
                err.code()
            }
        };

        self.point.add_field("status", sensor.status());
        self.point.add_field("error", sensor_error);
        self.point.set_timestamp(Utc::now());

        info!("Writing: {}", self.point);

        let published = match writer.write_point(&self.point) {
            Ok(()) => true,
            Err(err) => {
                error!("Write failed: {err}");
                false
            }
        };

        CycleOutcome {
            sensor_error,
            published,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::telemetry::{FieldValue, Reading, SensorError};

    /// Plays back a script of read results.
    struct ScriptedSensor {
        script: Vec<Result<Reading, SensorError>>,
        status: u16,
    }

    impl SensorController for ScriptedSensor {
        fn sample(&mut self) -> Result<Reading, SensorError> {
            self.script.remove(0)
        }

        fn status(&self) -> u16 {
            self.status
        }
    }

    /// Records every line it is handed, failing on request.
    #[derive(Default)]
    struct RecordingWriter {
        lines: Vec<String>,
        fail: bool,
    }

    impl PointWriter for RecordingWriter {
        fn write_point(&mut self, point: &DataPoint) -> Result<(), Box<dyn std::error::Error>> {
            if self.fail {
                return Err("connection refused".into());
            }
            self.lines.push(point.to_line_protocol());
            Ok(())
        }
    }

    fn reading(temperature: f32, humidity: f32) -> Result<Reading, SensorError> {
        Ok(Reading {
            temperature,
            humidity,
        })
    }

    #[test]
    fn good_read_records_all_fields() {
        let mut sensor = ScriptedSensor {
            script: vec![reading(20.0, 50.0)],
            status: 0x8010,
        };
        let mut writer = RecordingWriter::default();
        let mut sampler = Sampler::new("temp_sensor");

        let outcome = sampler.run_cycle(&mut sensor, &mut writer);

        assert_eq!(outcome.sensor_error, 0);
        assert!(outcome.published);
        let point = sampler.point();
        assert_eq!(point.field("temperature"), Some(&FieldValue::Float(20.0)));
        assert_eq!(point.field("humidity"), Some(&FieldValue::Float(50.0)));
        assert_eq!(point.field("status"), Some(&FieldValue::Integer(0x8010)));
        assert_eq!(point.field("error"), Some(&FieldValue::Integer(0)));
        match point.field("dew_point") {
            Some(FieldValue::Float(dp)) => assert!((dp - 9.2506).abs() < 1e-3),
            other => panic!("missing dew point: {other:?}"),
        }
    }

    #[test]
    fn failed_read_omits_measured_and_derived_fields() {
        let mut sensor = ScriptedSensor {
            script: vec![Err(SensorError::Crc)],
            status: 0x0000,
        };
        let mut writer = RecordingWriter::default();
        let mut sampler = Sampler::new("temp_sensor");

        let outcome = sampler.run_cycle(&mut sensor, &mut writer);

        assert_eq!(outcome.sensor_error, 1);
        let point = sampler.point();
        assert!(!point.has_field("temperature"));
        assert!(!point.has_field("humidity"));
        assert!(!point.has_field("dew_point"));
        // Codes are reported even on failure.
        assert_eq!(point.field("status"), Some(&FieldValue::Integer(0)));
        assert_eq!(point.field("error"), Some(&FieldValue::Integer(1)));
    }

    #[test]
    fn no_field_leaks_between_cycles() {
        let mut sensor = ScriptedSensor {
            script: vec![reading(20.0, 50.0), Err(SensorError::Bus(-1))],
            status: 0x8010,
        };
        let mut writer = RecordingWriter::default();
        let mut sampler = Sampler::new("temp_sensor");

        sampler.run_cycle(&mut sensor, &mut writer);
        assert!(sampler.point().has_field("temperature"));

        let outcome = sampler.run_cycle(&mut sensor, &mut writer);
        assert_eq!(outcome.sensor_error, -1);
        // The previous cycle's reading must not survive into this point.
        assert!(!sampler.point().has_field("temperature"));
        assert!(!sampler.point().has_field("humidity"));
        assert!(!sampler.point().has_field("dew_point"));
        assert_eq!(sampler.point().field_count(), 2);
    }

    #[test]
    fn tags_persist_on_every_published_point() {
        let mut sensor = ScriptedSensor {
            script: vec![reading(20.0, 50.0), reading(21.0, 51.0)],
            status: 0x8010,
        };
        let mut writer = RecordingWriter::default();
        let mut sampler = Sampler::new("temp_sensor");
        sampler.add_tag("ip", "192.168.1.23");
        sampler.add_tag("mac", "aa:bb:cc:dd:ee:ff");

        sampler.run_cycle(&mut sensor, &mut writer);
        sampler.run_cycle(&mut sensor, &mut writer);

        assert_eq!(writer.lines.len(), 2);
        for line in &writer.lines {
            assert!(line.starts_with("temp_sensor,ip=192.168.1.23,mac=aa:bb:cc:dd:ee:ff "));
        }
    }

    #[test]
    fn failed_write_is_absorbed_and_next_cycle_runs() {
        let mut sensor = ScriptedSensor {
            script: vec![reading(20.0, 50.0), reading(21.0, 51.0)],
            status: 0x8010,
        };
        let mut writer = RecordingWriter {
            lines: Vec::new(),
            fail: true,
        };
        let mut sampler = Sampler::new("temp_sensor");

        let outcome = sampler.run_cycle(&mut sensor, &mut writer);
        assert!(!outcome.published);
        assert_eq!(outcome.sensor_error, 0);

        // The dropped sample leaves no residue; the next cycle publishes.
        writer.fail = false;
        let outcome = sampler.run_cycle(&mut sensor, &mut writer);
        assert!(outcome.published);
        assert_eq!(writer.lines.len(), 1);
    }
}
