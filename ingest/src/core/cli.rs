use clap::{Parser, Subcommand};

use std::path::PathBuf;

use super::constants::{ENV_ARGS_MAX_DEPTH, ENV_CONFIG, ENV_DESCRIPTOR_SETS, ENV_OUTPUT_PRETTY};

#[derive(Parser)]
#[command(name = "trace-ingest")]
#[command(version, about = "Trace event and protobuf args ingestion", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,

    /// Path to config file
    #[arg(long, short = 'c', global = true, env = ENV_CONFIG)]
    pub config: Option<PathBuf>,

    /// Maximum protobuf message nesting depth
    #[arg(long, global = true, env = ENV_ARGS_MAX_DEPTH)]
    pub max_depth: Option<usize>,

    /// Serialized FileDescriptorSet files (repeatable, or comma separated)
    #[arg(long = "descriptor-set", short = 'd', global = true, env = ENV_DESCRIPTOR_SETS, value_delimiter = ',')]
    pub descriptor_sets: Vec<PathBuf>,

    /// Pretty-print JSON output
    #[arg(long, global = true, env = ENV_OUTPUT_PRETTY)]
    pub pretty: Option<bool>,
}

#[derive(Subcommand, Clone, Debug)]
pub enum Commands {
    /// Replay a JSON array of trace events and print slices, flow edges and stats
    Replay {
        /// Events file
        events: PathBuf,
    },
    /// Parse one protobuf message into args
    Args {
        /// Fully qualified message type, e.g. .pkg.Message
        #[arg(long = "type", short = 't')]
        type_name: String,

        /// Encoded message file
        input: PathBuf,

        /// Input is hex text instead of raw bytes
        #[arg(long)]
        hex: bool,

        /// Only parse these top-level field numbers
        #[arg(long, value_delimiter = ',')]
        fields: Option<Vec<u32>>,
    },
}

/// Configuration derived from CLI arguments
#[derive(Debug, Clone, Default)]
pub struct CliConfig {
    pub config: Option<PathBuf>,
    pub max_depth: Option<usize>,
    pub descriptor_sets: Vec<PathBuf>,
    pub pretty: Option<bool>,
}

/// Parse CLI arguments and return config with command
pub fn parse() -> (CliConfig, Option<Commands>) {
    let cli = Cli::parse();
    let config = CliConfig {
        config: cli.config,
        max_depth: cli.max_depth,
        descriptor_sets: cli.descriptor_sets,
        pretty: cli.pretty,
    };
    (config, cli.command)
}
