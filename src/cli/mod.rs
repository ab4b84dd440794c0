//! CLI interface for velocurve

use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;
use velocurve::config::{CurveKind, Overrides};

/// Reshape MIDI velocities and route channels in real time
#[derive(Parser)]
#[command(name = "velocurve")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Route MIDI from the input device to the output device
    Run {
        /// Configuration file path (YAML, or JSON with a .json extension)
        #[arg(short, long)]
        config: Option<PathBuf>,

        #[command(flatten)]
        overrides: OverrideArgs,
    },

    /// List available MIDI ports
    Ports,

    /// Validate a configuration file
    Check {
        /// Configuration file path
        #[arg(short, long, default_value = "velocurve.yaml")]
        config: PathBuf,
    },

    /// Generate an example configuration file
    Init,
}

/// Settings that override the configuration file
#[derive(Args, Debug, Default)]
pub struct OverrideArgs {
    /// Fragment of the input port name
    #[arg(long)]
    pub input: Option<String>,

    /// Fragment of the output port name
    #[arg(long)]
    pub output: Option<String>,

    /// Fragment of the channel control port name
    #[arg(long)]
    pub control: Option<String>,

    /// Velocity curve type
    #[arg(long, value_enum)]
    pub curve: Option<CurveKind>,

    /// Bezier deviation (-100..100) or exponential power
    #[arg(long, allow_negative_numbers = true)]
    pub exponent: Option<f64>,

    /// Linear curve multiplier
    #[arg(long)]
    pub sensitivity: Option<f64>,

    /// Velocities at or below this are not adjusted
    #[arg(long)]
    pub threshold: Option<u8>,

    /// Log every velocity adjustment
    #[arg(long)]
    pub debug: bool,
}

impl From<OverrideArgs> for Overrides {
    fn from(args: OverrideArgs) -> Self {
        Overrides {
            input: args.input,
            output: args.output,
            control: args.control,
            curve: args.curve,
            exponent: args.exponent,
            sensitivity: args.sensitivity,
            threshold: args.threshold,
            debug: args.debug,
        }
    }
}
