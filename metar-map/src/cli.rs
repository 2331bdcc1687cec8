use anyhow::Context;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing::warn;

use metar_core::{Config, RenderGate, device_from_config, source_from_config};

use crate::commands;
use crate::logging::Verbosity;

/// Top-level CLI struct.
#[derive(Debug, Parser)]
#[command(name = "metar-map", version, about = "Airport weather on an LED strip")]
pub struct Cli {
    /// Path to the configuration file.
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Verbose output (debug level).
    #[arg(short, long, global = true, conflicts_with = "quiet")]
    pub verbose: bool,

    /// Only log errors.
    #[arg(short, long, global = true)]
    pub quiet: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Scan airports and set lighting according to station status.
    Scan,

    /// Turn off lights, useful before shut-down.
    Stop,

    /// Run the test light sequence, useful on start-up.
    Test {
        /// Time to run the test pattern, in seconds.
        #[arg(short, long, default_value_t = 2)]
        seconds: u64,
    },

    /// Get station weather for debugging, e.g. "KSEA,KPDX".
    Station {
        /// Comma-separated station ids.
        stations: String,
    },

    /// Decode a raw METAR string (argument or stdin), print JSON.
    Parse {
        /// Raw METAR; read from stdin when omitted.
        metar: Option<String>,
    },
}

impl Cli {
    pub fn verbosity(&self) -> Verbosity {
        if self.quiet {
            Verbosity::Quiet
        } else if self.verbose {
            Verbosity::Verbose
        } else {
            Verbosity::Normal
        }
    }

    pub async fn run(self) -> anyhow::Result<()> {
        let config = Config::load(self.config.as_deref())?;

        // Fatal on malformed rules or bindings; duplicates only warn.
        let warnings = config.validate()?;
        for warning in &warnings {
            warn!("{warning}");
        }

        match self.command {
            Command::Scan => {
                let source = source_from_config(&config.source)?;
                let gate = build_gate(&config)?;
                commands::scan(&config, source.as_ref(), &gate).await
            }
            Command::Stop => {
                let gate = build_gate(&config)?;
                commands::stop(&gate)
            }
            Command::Test { seconds } => {
                let gate = build_gate(&config)?;
                commands::test_pattern(&config, &gate, seconds).await
            }
            Command::Station { stations } => {
                let source = source_from_config(&config.source)?;
                commands::station(&config, source.as_ref(), &stations).await
            }
            Command::Parse { metar } => {
                let input = match metar {
                    Some(text) => text,
                    None => std::io::read_to_string(std::io::stdin())
                        .context("Failed to read METAR from stdin")?,
                };
                commands::parse(&input)
            }
        }
    }
}

fn build_gate(config: &Config) -> anyhow::Result<RenderGate> {
    let device = device_from_config(&config.leds)?;
    Ok(RenderGate::new(device, &config.leds, config.fault.color))
}
