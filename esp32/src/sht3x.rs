use esp_idf_svc::hal::delay::{FreeRtos, BLOCK};
use esp_idf_svc::hal::i2c::I2cDriver;
use log::debug;

use sensor_node_common::telemetry::{Reading, SensorController, SensorError};

const CMD_SOFT_RESET: [u8; 2] = [0x30, 0xA2];
const CMD_CLEAR_STATUS: [u8; 2] = [0x30, 0x41];
const CMD_MEASURE_HIGH_REP: [u8; 2] = [0x24, 0x00];
const CMD_READ_STATUS: [u8; 2] = [0xF3, 0x2D];

/// High-repeatability single-shot conversion takes at most 15 ms.
const MEASUREMENT_DELAY_MS: u32 = 15;

/// SHT3x over I2C, single-shot mode, default address 0x44.
pub struct Sht3x<'d> {
    i2c: I2cDriver<'d>,
    address: u8,
    status: u16,
}

impl<'d> Sht3x<'d> {
    pub fn new(i2c: I2cDriver<'d>, address: u8) -> Result<Self, SensorError> {
        let mut sensor = Self {
            i2c,
            address,
            status: 0,
        };
        sensor.command(&CMD_SOFT_RESET)?;
        FreeRtos::delay_ms(2);
        sensor.command(&CMD_CLEAR_STATUS)?;
        Ok(sensor)
    }

    fn command(&mut self, command: &[u8; 2]) -> Result<(), SensorError> {
        self.i2c
            .write(self.address, command, BLOCK)
            .map_err(|err| SensorError::Bus(err.code()))
    }

    fn read_status(&mut self) -> Result<u16, SensorError> {
        self.command(&CMD_READ_STATUS)?;
        let mut buf = [0u8; 3];
        self.i2c
            .read(self.address, &mut buf, BLOCK)
            .map_err(|err| SensorError::Bus(err.code()))?;
        if crc8(&buf[0..2]) != buf[2] {
            return Err(SensorError::Crc);
        }
        Ok(u16::from_be_bytes([buf[0], buf[1]]))
    }
}

impl SensorController for Sht3x<'_> {
    fn sample(&mut self) -> Result<Reading, SensorError> {
        self.command(&CMD_MEASURE_HIGH_REP)?;
        FreeRtos::delay_ms(MEASUREMENT_DELAY_MS);

        let mut buf = [0u8; 6];
        self.i2c
            .read(self.address, &mut buf, BLOCK)
            .map_err(|err| SensorError::Bus(err.code()))?;
        if crc8(&buf[0..2]) != buf[2] || crc8(&buf[3..5]) != buf[5] {
            return Err(SensorError::Crc);
        }

        let raw_temperature = u16::from_be_bytes([buf[0], buf[1]]);
        let raw_humidity = u16::from_be_bytes([buf[3], buf[4]]);

        // Conversion per datasheet §4.13.
        let reading = Reading {
            temperature: -45.0 + 175.0 * raw_temperature as f32 / 65535.0,
            humidity: 100.0 * raw_humidity as f32 / 65535.0,
        };

        // A stale status word is better than losing a good reading.
        match self.read_status() {
            Ok(status) => self.status = status,
            Err(err) => debug!("Status read failed: {err}"),
        }

        Ok(reading)
    }

    fn status(&self) -> u16 {
        self.status
    }
}

/// CRC-8 over each 2-byte word: polynomial 0x31, init 0xFF, no final xor.
fn crc8(data: &[u8]) -> u8 {
    let mut crc: u8 = 0xFF;
    for byte in data {
        crc ^= byte;
        for _ in 0..8 {
            crc = if crc & 0x80 != 0 {
                (crc << 1) ^ 0x31
            } else {
                crc << 1
            };
        }
    }
    crc
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn crc_matches_datasheet_example() {
        // Datasheet: CRC(0xBEEF) = 0x92.
        assert_eq!(crc8(&[0xBE, 0xEF]), 0x92);
    }
}
