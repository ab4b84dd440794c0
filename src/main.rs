//! velocurve - real-time MIDI velocity curves and channel routing

use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;
use velocurve::config::{self, Overrides, VelocurveConfig};
use velocurve::engine::{check_exits, log_snapshot, Engine};
use velocurve::midi::{self, MidiOutputSink};

mod cli;

use cli::{Cli, Commands};

fn main() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Run {
            config: config_path,
            overrides,
        } => run(config_path, overrides.into())?,

        Commands::Ports => {
            init_tracing(false);

            println!("Input ports:");
            match midi::list_input_ports() {
                Ok(ports) if ports.is_empty() => println!("  (none)"),
                Ok(ports) => ports.iter().for_each(|p| println!("  - {}", p)),
                Err(e) => println!("  Error listing ports: {}", e),
            }

            println!("\nOutput ports:");
            match midi::list_output_ports() {
                Ok(ports) if ports.is_empty() => println!("  (none)"),
                Ok(ports) => ports.iter().for_each(|p| println!("  - {}", p)),
                Err(e) => println!("  Error listing ports: {}", e),
            }
        }

        Commands::Check {
            config: config_path,
        } => {
            println!("Checking configuration at {:?}...", config_path);

            match config::load_config(&config_path) {
                Ok(cfg) => {
                    println!("Configuration is valid!");
                    println!("  Input: {}", cfg.devices.input);
                    println!("  Output: {}", cfg.devices.output);
                    println!(
                        "  Control: {}",
                        cfg.devices.control.as_deref().unwrap_or("(none)")
                    );
                    println!("  Curve: {:?}", cfg.curve.kind);
                    println!("  Exponent: {}", cfg.curve.exponent);
                    println!("  Threshold: {}", cfg.curve.threshold);
                    println!("  Channel mechanism: {}", cfg.channel_control().name());
                    println!("  Initial channel: {}", cfg.channel.initial);
                    println!("  Filtered control: {}", cfg.filter_control);
                }
                Err(e) => {
                    println!("Configuration is invalid: {:#}", e);
                    std::process::exit(1);
                }
            }
        }

        Commands::Init => {
            let example_config = include_str!("../velocurve.example.yaml");

            let path = "velocurve.yaml";
            if std::path::Path::new(path).exists() {
                println!("velocurve.yaml already exists. Not overwriting.");
            } else {
                std::fs::write(path, example_config)?;
                println!("Created velocurve.yaml with example configuration.");
            }
        }
    }

    Ok(())
}

fn run(config_path: Option<PathBuf>, overrides: Overrides) -> Result<()> {
    let mut cfg = match &config_path {
        Some(path) => config::read_config(path)?,
        None => VelocurveConfig::default(),
    };
    overrides.apply(&mut cfg);
    init_tracing(cfg.debug);
    cfg.validate().context("Invalid configuration")?;

    let output = MidiOutputSink::open(&cfg.devices.output)?;
    let (input_conn, input) = midi::open_input(&cfg.devices.input)?;
    info!(
        input = input_conn.port_name(),
        output = output.port_name(),
        curve = cfg.curve.to_curve().name(),
        "devices ready"
    );
    let mut engine = Engine::new(cfg.engine_config()?, input, output)?;

    // Held until shutdown; dropping it closes the control port
    let mut _control_conn = None;
    if let Some(name) = &cfg.devices.control {
        match midi::open_input(name) {
            Ok((conn, stream)) => {
                info!(control = conn.port_name(), "channel control port ready");
                engine = engine.with_control_input(stream)?;
                _control_conn = Some(conn);
            }
            Err(e) => warn!(error = %e, "control port not available"),
        }
    }

    let stop = engine.stop_handle();
    ctrlc::set_handler(move || stop.stop()).context("Failed to install signal handler")?;

    engine.start()?;
    info!("routing, press Ctrl-C to stop");

    let exits = engine.join();
    log_snapshot(&engine.stats());
    check_exits(&exits)
}

fn init_tracing(debug: bool) {
    let default_level = if debug { "debug" } else { "info" };
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .try_init();
}
