use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use std::time::Duration;
use wmbus_radio::logging::init_logger;
use wmbus_radio::{Radio, RadioConfig, Transceiver};

#[derive(Parser)]
#[command(name = "wmbus-radio")]
#[command(about = "wM-Bus Mode T/C frame listener")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Receive frames and print them to stdout
    Listen {
        /// JSON radio configuration file
        config: PathBuf,
        /// Print frames in rtlwmbus format instead of plain hex
        #[arg(long)]
        rtlwmbus: bool,
    },
    /// Validate a configuration file and exit
    CheckConfig {
        config: PathBuf,
    },
}

fn load_config(path: &Path) -> Result<RadioConfig> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("reading {}", path.display()))?;
    let config: RadioConfig =
        serde_json::from_str(&text).context("parsing radio configuration")?;
    config.validate()?;
    Ok(config)
}

#[cfg(feature = "raspberry-pi")]
fn build_transceiver(config: &RadioConfig) -> Result<Box<dyn Transceiver>> {
    use wmbus_radio::radio::hal::raspberry_pi::{RaspberryPiHal, SpiPins};
    use wmbus_radio::RadioModel;
    use wmbus_radio::{Cc1101, Sx1276};

    match config.model {
        RadioModel::Cc1101 => {
            // Presence enforced by validate()
            let gdo0 = config.gdo0_pin.context("gdo0_pin missing")?;
            let gdo2 = config.gdo2_pin.context("gdo2_pin missing")?;
            let pins = SpiPins {
                inputs: vec![gdo0, gdo2],
                reset: None,
            };
            let hal = RaspberryPiHal::new(config.spi_bus, &pins)?;
            let mut radio = Cc1101::new(hal, gdo0, gdo2);
            radio.set_frequency(config.frequency_mhz);
            radio.set_polling_interval(Duration::from_millis(config.polling_interval_ms));
            Ok(Box::new(radio))
        }
        RadioModel::Sx1276 => {
            let irq = config.irq_pin.context("irq_pin missing")?;
            let reset = config.reset_pin.context("reset_pin missing")?;
            let pins = SpiPins {
                inputs: vec![irq],
                reset: Some(reset),
            };
            let hal = RaspberryPiHal::new(config.spi_bus, &pins)?;
            let mut radio = Sx1276::new(hal, irq, reset);
            radio.set_frequency(config.frequency_mhz);
            let signal = radio
                .irq_signal()
                .context("interrupt signal unavailable")?;
            radio.hal_mut().attach_irq_signal(irq, signal)?;
            Ok(Box::new(radio))
        }
    }
}

#[cfg(not(feature = "raspberry-pi"))]
fn build_transceiver(_config: &RadioConfig) -> Result<Box<dyn Transceiver>> {
    anyhow::bail!(
        "this build has no hardware HAL; rebuild with --features raspberry-pi"
    )
}

fn listen(config: &RadioConfig, rtlwmbus: bool) -> Result<()> {
    let transceiver = build_transceiver(config)?;
    let mut radio = Radio::start(transceiver)?;

    radio.add_frame_handler(move |frame| {
        if rtlwmbus {
            println!("{}", frame.as_rtlwmbus());
        } else {
            println!("{}", frame.as_hex());
        }
        frame.mark_as_handled();
    });

    loop {
        radio.poll_once();
        std::thread::sleep(Duration::from_millis(10));
    }
}

fn main() -> Result<()> {
    init_logger();

    let cli = Cli::parse();
    match cli.command {
        Commands::Listen { config, rtlwmbus } => {
            let config = load_config(&config)?;
            listen(&config, rtlwmbus)
        }
        Commands::CheckConfig { config } => {
            let config = load_config(&config)?;
            println!(
                "Configuration OK: {} at {:.2} MHz",
                config.model.as_str(),
                config.frequency_mhz
            );
            Ok(())
        }
    }
}
