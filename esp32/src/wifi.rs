use embedded_svc::wifi::{AuthMethod, ClientConfiguration, Configuration};
use esp_idf_svc::wifi::{BlockingWifi, EspWifi};
use log::{info, warn};

use sensor_node_common::{NodeConfig, RetryPolicy};

type Wifi = BlockingWifi<EspWifi<'static>>;

pub fn configure(wifi: &mut Wifi, config: &NodeConfig) -> anyhow::Result<()> {
    let wifi_configuration: Configuration = Configuration::Client(ClientConfiguration {
        ssid: config.wifi_ssid.as_str().try_into().unwrap(),
        bssid: None,
        auth_method: AuthMethod::WPA2Personal,
        password: config.wifi_psk.as_str().try_into().unwrap(),
        channel: None,
        ..Default::default()
    });

    wifi.set_configuration(&wifi_configuration)?;

    wifi.start()?;
    info!("Wifi started");

    Ok(())
}

/// Block until the station associates and the netif is up, honoring the
/// retry policy. With the default unbounded policy this never returns an
/// association error.
pub fn connect(wifi: &mut Wifi, retry: &RetryPolicy) -> anyhow::Result<()> {
    let mut attempts = 0u32;
    loop {
        attempts += 1;
        match wifi.connect() {
            Ok(()) => break,
            Err(err) => {
                warn!("Association attempt {attempts} failed: {err}");
                if let Some(max) = retry.max_attempts {
                    if attempts >= max {
                        anyhow::bail!("association gave up after {attempts} attempts");
                    }
                }
                std::thread::sleep(retry.delay);
            }
        }
    }
    info!("Wifi connected");

    wifi.wait_netif_up()?;
    info!("Wifi netif up");

    Ok(())
}
