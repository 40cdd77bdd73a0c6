use embedded_svc::http::client::Client as HttpClient;
use embedded_svc::http::Method;
use embedded_svc::io::Write as _;
use embedded_svc::utils::io;
use esp_idf_svc::http::client::{Configuration as HttpConfiguration, EspHttpConnection};
use log::info;

use sensor_node_common::telemetry::{DataPoint, PointWriter};
use sensor_node_common::NodeConfig;

/// InfluxDB v2 write API over the platform HTTP client. TLS and the trust
/// chain come from the certificate bundle attached to the connection.
pub struct InfluxWriter {
    client: HttpClient<EspHttpConnection>,
    write_url: String,
    health_url: String,
    auth: String,
}

impl InfluxWriter {
    pub fn new(config: &NodeConfig) -> anyhow::Result<Self> {
        let connection = EspHttpConnection::new(&HttpConfiguration {
            crt_bundle_attach: Some(esp_idf_svc::sys::esp_crt_bundle_attach),
            ..Default::default()
        })?;

        Ok(Self {
            client: HttpClient::wrap(connection),
            write_url: format!(
                "{}/api/v2/write?org={}&bucket={}&precision=ns",
                config.influx_url, config.influx_org, config.influx_bucket
            ),
            health_url: format!("{}/health", config.influx_url),
            auth: format!("Token {}", config.influx_token),
        })
    }

    /// Startup reachability probe. A failure here is reported by the
    /// caller, never fatal; the loop starts regardless.
    pub fn health_check(&mut self) -> anyhow::Result<()> {
        let headers = [("accept", "application/json")];
        let request = self.client.request(Method::Get, &self.health_url, &headers)?;
        let mut response = request.submit()?;

        let status = response.status();
        let mut buf = [0u8; 256];
        let bytes_read = io::try_read_full(&mut response, &mut buf).map_err(|e| e.0)?;
        if !(200..300).contains(&status) {
            anyhow::bail!("health probe returned {status}");
        }
        info!(
            "Connected to InfluxDB at {}: {}",
            self.health_url,
            String::from_utf8_lossy(&buf[..bytes_read]).trim_end()
        );

        Ok(())
    }

    fn post_line(&mut self, line: &str) -> anyhow::Result<()> {
        let headers = [
            ("authorization", self.auth.as_str()),
            ("content-type", "text/plain; charset=utf-8"),
        ];
        let mut request = self.client.request(Method::Post, &self.write_url, &headers)?;
        request.write_all(line.as_bytes())?;
        request.flush()?;

        let mut response = request.submit()?;
        let status = response.status();
        if !(200..300).contains(&status) {
            let mut buf = [0u8; 256];
            let bytes_read = io::try_read_full(&mut response, &mut buf).map_err(|e| e.0)?;
            anyhow::bail!(
                "write returned {status}: {}",
                String::from_utf8_lossy(&buf[..bytes_read]).trim_end()
            );
        }

        Ok(())
    }
}

impl PointWriter for InfluxWriter {
    fn write_point(&mut self, point: &DataPoint) -> Result<(), Box<dyn std::error::Error>> {
        self.post_line(&point.to_line_protocol())
            .map_err(Into::into)
    }
}
