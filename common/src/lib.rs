pub mod telemetry;

use std::time::Duration;

/// Everything the node needs to know at boot: radio credentials, the
/// publish target and the sensor wiring. Populated once at process start
/// (from compile-time constants on the device, from defaults on the host)
/// and read-only afterwards.
#[derive(Clone, Debug, PartialEq)]
pub struct NodeConfig {
    /// Base URL of the InfluxDB v2 endpoint, e.g. `https://influx.example:8086`.
    pub influx_url: String,
    pub influx_org: String,
    pub influx_bucket: String,
    pub influx_token: String,

    pub wifi_ssid: String,
    pub wifi_psk: String,

    /// POSIX TZ string applied before certificate validation and
    /// timestamping, e.g. `CET-1CEST,M3.5.0,M10.5.0/3`.
    pub timezone: String,
    pub sntp_servers: Vec<String>,

    /// 7-bit I2C address of the sensor.
    pub sensor_address: u8,

    /// Floor between steady-state cycles; the iteration body adds on top.
    pub sample_interval: Duration,

    pub wifi_retry: RetryPolicy,
}

/// Delay between association attempts and how many to make.
///
/// `max_attempts: None` waits forever. That is the default, since the node
/// has nothing else to do before the network is up, but a bound is one
/// constant away for deployments that prefer a watchdog reset.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct RetryPolicy {
    pub delay: Duration,
    pub max_attempts: Option<u32>,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            delay: Duration::from_millis(500),
            max_attempts: None,
        }
    }
}

impl Default for NodeConfig {
    fn default() -> Self {
        Self {
            influx_url: "http://localhost:8086".to_string(),
            influx_org: "home".to_string(),
            influx_bucket: "sensors".to_string(),
            influx_token: String::new(),
            wifi_ssid: String::new(),
            wifi_psk: String::new(),
            timezone: "UTC0".to_string(),
            sntp_servers: vec![
                "pool.ntp.org".to_string(),
                "time.nist.gov".to_string(),
            ],
            sensor_address: 0x44,
            sample_interval: Duration::from_millis(1000),
            wifi_retry: RetryPolicy::default(),
        }
    }
}
