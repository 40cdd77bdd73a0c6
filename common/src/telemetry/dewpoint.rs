//! Magnus-form dew-point approximation (Arden Buck constants).

const A: f64 = 6.1121;
const B: f64 = 18.678;
const C: f64 = 257.14;
const D: f64 = 234.5;

/// Saturation vapor pressure in hPa at `temperature` °C.
pub fn saturation_vapor_pressure(temperature: f64) -> f64 {
    A * ((B - temperature / D) * (temperature / (C + temperature))).exp()
}

/// Dew point in °C from air temperature in °C and relative humidity in %.
///
/// Valid for humidity in (0, 100]; at 0 % the logarithm diverges, which
/// callers rule out by only deriving from a successful sensor read.
pub fn dew_point(temperature: f64, humidity: f64) -> f64 {
    let gamma = (humidity / 100.0
        * ((B - temperature / D) * (temperature / (C + temperature))).exp())
    .ln();
    C * gamma / (B - gamma)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assert_close(actual: f64, expected: f64) {
        assert!(
            (actual - expected).abs() < 1e-3,
            "expected {expected}, got {actual}"
        );
    }

    #[test]
    fn room_conditions() {
        assert_close(dew_point(20.0, 50.0), 9.2506);
    }

    #[test]
    fn reference_values() {
        assert_close(dew_point(25.0, 60.0), 16.6327);
        assert_close(dew_point(-5.0, 80.0), -7.9250);
        assert_close(dew_point(15.0, 35.0), -0.3278);
    }

    #[test]
    fn saturated_air_at_zero() {
        // At 100 % the enhancement term vanishes at 0 °C and the dew point
        // equals the air temperature exactly.
        assert_close(dew_point(0.0, 100.0), 0.0);
    }

    #[test]
    fn dew_point_never_exceeds_temperature() {
        for t in [-10.0, 0.0, 15.0, 30.0] {
            for rh in [10.0, 50.0, 90.0, 100.0] {
                assert!(dew_point(t, rh) <= t + 1e-9);
            }
        }
    }

    #[test]
    fn vapor_pressure_at_zero_is_base_constant() {
        assert_close(saturation_vapor_pressure(0.0), 6.1121);
    }
}
