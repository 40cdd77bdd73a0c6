use std::time::{SystemTime, UNIX_EPOCH};

mod influx;
mod sht3x;
mod wifi;

use esp_idf_svc::eventloop::EspSystemEventLoop;
use esp_idf_svc::hal::delay::FreeRtos;
use esp_idf_svc::hal::i2c::{config::Config as I2cConfig, I2cDriver};
use esp_idf_svc::hal::prelude::*;
use esp_idf_svc::nvs::EspDefaultNvsPartition;
use esp_idf_svc::sntp::{EspSntp, SntpConf, SyncStatus};
use esp_idf_svc::wifi::{BlockingWifi, EspWifi, WifiDeviceId};

use log::{info, warn};

use sensor_node_common::telemetry::{Sampler, MEASUREMENT_NAME};
use sensor_node_common::NodeConfig;

const WIFI_SSID: &str = env!("WIFI_SSID");
const WIFI_PASS: &str = env!("WIFI_PASS");
const INFLUX_URL: &str = env!("INFLUX_URL");
const INFLUX_ORG: &str = env!("INFLUX_ORG");
const INFLUX_BUCKET: &str = env!("INFLUX_BUCKET");
const INFLUX_TOKEN: &str = env!("INFLUX_TOKEN");
/// Set with `export TZ_SPEC=value`; defaults to central Europe.
const TZ_SPEC: Option<&str> = option_env!("TZ_SPEC");

fn node_config() -> NodeConfig {
    NodeConfig {
        influx_url: INFLUX_URL.to_string(),
        influx_org: INFLUX_ORG.to_string(),
        influx_bucket: INFLUX_BUCKET.to_string(),
        influx_token: INFLUX_TOKEN.to_string(),
        wifi_ssid: WIFI_SSID.to_string(),
        wifi_psk: WIFI_PASS.to_string(),
        timezone: TZ_SPEC.unwrap_or("CET-1CEST,M3.5.0,M10.5.0/3").to_string(),
        ..NodeConfig::default()
    }
}

fn format_mac(mac: &[u8; 6]) -> String {
    mac.iter()
        .map(|byte| format!("{byte:02x}"))
        .collect::<Vec<_>>()
        .join(":")
}

fn main() -> anyhow::Result<()> {
    // It is necessary to call this function once. Otherwise some patches to the runtime
    // implemented by esp-idf-sys might not link properly. See https://github.com/esp-rs/esp-idf-template/issues/71
    esp_idf_svc::sys::link_patches();

    // Bind the log crate to the ESP Logging facilities
    esp_idf_svc::log::EspLogger::initialize_default();

    let config = node_config();

    let peripherals = Peripherals::take()?;
    let sys_loop = EspSystemEventLoop::take()?;
    let nvs = EspDefaultNvsPartition::take()?;

    // Sensor bus first; the network can wait, the sensor cannot.
    let i2c = I2cDriver::new(
        peripherals.i2c0,
        peripherals.pins.gpio21,
        peripherals.pins.gpio22,
        &I2cConfig::new().baudrate(100.kHz().into()),
    )?;
    let mut sensor = sht3x::Sht3x::new(i2c, config.sensor_address)?;

    let mut wifi = BlockingWifi::wrap(
        EspWifi::new(peripherals.modem, sys_loop.clone(), Some(nvs))?,
        sys_loop,
    )?;
    wifi::configure(&mut wifi, &config)?;
    wifi::connect(&mut wifi, &config.wifi_retry)?;

    let ip_info = wifi.wifi().sta_netif().get_ip_info()?;
    info!("Wifi DHCP info: {ip_info:?}");
    let mac = wifi.wifi().driver().get_mac(WifiDeviceId::Sta)?;

    let mut sampler = Sampler::new(MEASUREMENT_NAME);
    sampler.add_tag("ip", &ip_info.ip.to_string());
    sampler.add_tag("mac", &format_mac(&mac));

    // Certificate validation and timestamping need wall-clock time before
    // the first write.
    std::env::set_var("TZ", &config.timezone);
    let mut sntp_conf = SntpConf::default();
    for (slot, server) in sntp_conf
        .servers
        .iter_mut()
        .zip(config.sntp_servers.iter())
    {
        *slot = server.as_str();
    }
    let sntp = EspSntp::new(&sntp_conf)?;
    info!("Waiting for time sync...");
    while sntp.get_sync_status() != SyncStatus::Completed {
        FreeRtos::delay_ms(500);
    }
    info!(
        "Time synchronized: {} s since epoch",
        SystemTime::now().duration_since(UNIX_EPOCH)?.as_secs()
    );

    let mut writer = influx::InfluxWriter::new(&config)?;
    if let Err(err) = writer.health_check() {
        warn!("InfluxDB not reachable: {err}");
    }

    info!("Entering main loop...");

    loop {
        // Association loss is only worth a warning; the cycle below runs
        // and logs either way, and the write fails on its own if the
        // network is really gone.
        match wifi.is_up() {
            Ok(true) => {}
            Ok(false) => warn!("Wifi association lost"),
            Err(err) => warn!("Wifi health check error: {err}"),
        }

        sampler.run_cycle(&mut sensor, &mut writer);

        FreeRtos::delay_ms(config.sample_interval.as_millis() as u32);
    }
}
