use log::info;

use sensor_node_common::telemetry::{
    DataPoint, DummySensorController, PointWriter, Sampler, SensorControllerPointer,
    MEASUREMENT_NAME,
};
use sensor_node_common::NodeConfig;

/// Stands in for the database on the desktop: accepts every point and
/// prints its line-protocol form.
struct ConsoleWriter;

impl PointWriter for ConsoleWriter {
    fn write_point(&mut self, point: &DataPoint) -> Result<(), Box<dyn std::error::Error>> {
        println!("{point}");
        Ok(())
    }
}

/// Our App struct that holds the sampler and its collaborators.
///
/// On the device the same cycle runs against the real sensor and the real
/// database; here it runs against the canned fixture and the console, which
/// is enough to watch the loop behave.
struct App {
    sampler: Sampler,
    sensor: SensorControllerPointer,
    writer: ConsoleWriter,
    config: NodeConfig,
}

impl App {
    /// Create a new App struct with the dummy sensor behind the
    /// controller seam.
    fn new() -> anyhow::Result<Self> {
        let config = NodeConfig::default();

        let sensor: SensorControllerPointer = Box::new(DummySensorController::new()?);

        let mut sampler = Sampler::new(MEASUREMENT_NAME);

        // The device tags its points with its network identity; the host
        // runner has none, so it labels itself instead.
        sampler.add_tag("ip", "127.0.0.1");
        sampler.add_tag("mac", "00:00:00:00:00:00");

        Ok(Self {
            sampler,
            sensor,
            writer: ConsoleWriter,
            config,
        })
    }

    /// Run the sampling cycle forever on the configured cadence.
    fn run(&mut self) -> anyhow::Result<()> {
        info!(
            "Sampling every {:?}, starting at {}",
            self.config.sample_interval,
            chrono::Local::now().format("%Y-%m-%d %H:%M:%S")
        );

        loop {
            self.sampler
                .run_cycle(&mut *self.sensor, &mut self.writer);

            std::thread::sleep(self.config.sample_interval);
        }
    }
}

/// A minimal main function that initializes the App and runs it.
fn main() -> anyhow::Result<()> {
    env_logger::init();

    let mut app = App::new()?;

    app.run()
}
