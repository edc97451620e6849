//! Core application

use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use clap::CommandFactory;
use serde::Serialize;

use crate::core::cli::{self, Cli, Commands};
use crate::core::config::AppConfig;
use crate::core::constants::{APP_NAME_LOWER, ENV_LOG};
use crate::domain::args::{ArgsCollector, ArgsError, ProtoToArgsParser};
use crate::domain::descriptors::DescriptorPool;
use crate::domain::import::{TraceEvent, TraceImporter};
use crate::utils::file::read_binary_input;

pub struct CoreApp {
    pub config: AppConfig,
}

impl CoreApp {
    /// Run the application with CLI argument parsing
    pub fn run() -> Result<()> {
        dotenvy::dotenv().ok();
        Self::init_logging();

        tracing::debug!("Application starting");

        let (cli_config, command) = cli::parse();
        tracing::trace!(command = ?command, "Parsed command");

        let Some(command) = command else {
            Cli::command().print_help()?;
            return Ok(());
        };

        let app = Self {
            config: AppConfig::load(&cli_config)?,
        };

        match command {
            Commands::Replay { events } => app.replay(&events),
            Commands::Args {
                type_name,
                input,
                hex,
                fields,
            } => app.parse_args(&type_name, &input, hex, fields.as_deref()),
        }
    }

    fn replay(&self, path: &Path) -> Result<()> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read events file: {}", path.display()))?;
        let events: Vec<TraceEvent> = serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse events file: {}", path.display()))?;

        let mut importer = TraceImporter::new();
        importer.apply_all(&events);
        let summary = importer.summary();

        tracing::debug!(
            events = summary.events,
            slices = summary.slices.len(),
            flows = summary.flows.len(),
            "Replay finished"
        );
        self.print_json(&summary)
    }

    fn parse_args(
        &self,
        type_name: &str,
        input: &Path,
        hex: bool,
        fields: Option<&[u32]>,
    ) -> Result<()> {
        let pool = self.load_descriptor_pool()?;
        let bytes = read_binary_input(input, hex)?;

        let parser = ProtoToArgsParser::new(&pool).with_max_depth(self.config.args.max_depth);
        tracing::debug!(
            type_name,
            bytes = bytes.len(),
            max_depth = parser.max_depth(),
            "Parsing message"
        );
        let mut collector = ArgsCollector::new();
        let status = match parser.parse_message(&bytes, type_name, fields, &mut collector) {
            Err(e @ ArgsError::UnknownMessageType(_)) => return Err(e.into()),
            status => status,
        };
        if let Err(e) = &status {
            tracing::warn!(error = %e, "Some fields could not be parsed");
        }

        self.print_json(&serde_json::json!({
            "type": type_name,
            "args": collector.into_rows(),
            "error": status.err().map(|e| e.to_string()),
        }))
    }

    fn load_descriptor_pool(&self) -> Result<DescriptorPool> {
        let paths = &self.config.args.descriptor_sets;
        if paths.is_empty() {
            anyhow::bail!("No descriptor sets configured (use --descriptor-set or args.descriptor_sets)");
        }

        let mut pool = DescriptorPool::new();
        for path in paths {
            let bytes = fs::read(path)
                .with_context(|| format!("Failed to read descriptor set: {}", path.display()))?;
            pool.add_file_descriptor_set_bytes(&bytes)
                .with_context(|| format!("Invalid descriptor set: {}", path.display()))?;
        }
        tracing::debug!(messages = pool.len(), "Descriptor pool loaded");
        Ok(pool)
    }

    fn print_json(&self, value: &impl Serialize) -> Result<()> {
        let output = if self.config.output.pretty {
            serde_json::to_string_pretty(value)?
        } else {
            serde_json::to_string(value)?
        };
        println!("{}", output);
        Ok(())
    }

    fn init_logging() {
        let default_filter = format!("info,{}=info", APP_NAME_LOWER);

        let filter = std::env::var(ENV_LOG)
            .or_else(|_| std::env::var("RUST_LOG"))
            .unwrap_or(default_filter);

        tracing_subscriber::fmt()
            .with_writer(std::io::stderr)
            .with_target(false)
            .with_thread_ids(false)
            .with_level(true)
            .with_ansi(true)
            .compact()
            .with_env_filter(filter)
            .init();
    }
}
