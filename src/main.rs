// toolgate - consent pipeline for model-issued tool requests
// Main entry point
//
// Reads a JSON batch of requests, asks for consent on the terminal, executes
// what was approved and prints one JSON result per request on stdout.

use anyhow::{bail, Context, Result};
use clap::Parser;
use serde_json::Value;
use std::io::Read;
use std::path::{Path, PathBuf};
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

use toolgate::config::load_config;
use toolgate::{Config, Pipeline, TerminalInterface};

/// Gate model-issued file and shell requests behind user consent
#[derive(Parser, Debug)]
#[command(name = "toolgate")]
#[command(version, about, long_about = None)]
struct Cli {
    /// JSON file with a request object or an array of requests ("-" for stdin)
    batch: Option<PathBuf>,

    /// Configuration file (default: ~/.config/toolgate/config.toml)
    #[arg(short = 'c', long = "config")]
    config: Option<PathBuf>,

    /// Write results here instead of stdout
    #[arg(short = 'o', long = "output")]
    output: Option<PathBuf>,

    /// Never prompt; requests that need consent are denied
    #[arg(long)]
    non_interactive: bool,

    /// Extra glob of paths to auto-approve (repeatable)
    #[arg(long = "auto-allowed-path", value_name = "GLOB")]
    auto_allowed_paths: Vec<String>,

    /// Extra regex of commands to auto-approve (repeatable)
    #[arg(long = "auto-execute-command", value_name = "REGEX")]
    auto_execute_commands: Vec<String>,

    /// Disable the command tool
    #[arg(long)]
    no_commands: bool,

    /// Send command output without asking
    #[arg(long)]
    auto_send: bool,

    /// Enable a plugin by name (repeatable)
    #[arg(long = "plugin", value_name = "NAME")]
    plugins: Vec<String>,

    /// Debug logging
    #[arg(short, long)]
    verbose: bool,

    /// Print the tool catalog (definitions plus result schemas) and exit
    #[arg(long)]
    list_tools: bool,
}

impl Cli {
    /// Command-line flags override and extend the file configuration
    fn apply_overrides(&self, config: &mut Config) {
        config
            .auto_allowed_paths
            .extend(self.auto_allowed_paths.iter().cloned());
        config
            .auto_execute_commands
            .extend(self.auto_execute_commands.iter().cloned());
        config.no_commands |= self.no_commands;
        config.auto_send |= self.auto_send;
        for name in &self.plugins {
            config.plugins.entry(name.clone()).or_default();
        }
    }
}

fn read_batch(path: &Path) -> Result<Vec<Value>> {
    let contents = if path.as_os_str() == "-" {
        let mut buf = String::new();
        std::io::stdin()
            .read_to_string(&mut buf)
            .context("Failed to read batch from stdin")?;
        buf
    } else {
        std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read batch {}", path.display()))?
    };

    let value: Value = serde_json::from_str(&contents).context("Batch is not valid JSON")?;
    match value {
        Value::Array(items) => Ok(items),
        object @ Value::Object(_) => Ok(vec![object]),
        _ => bail!("Batch must be a JSON object or an array of objects"),
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Logs go to stderr; stdout carries the results
    let default_level = if cli.verbose { "debug" } else { "warn" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();

    let mut config = load_config(cli.config.as_deref())?;
    cli.apply_overrides(&mut config);

    let pipeline = Pipeline::from_config(config).context("Invalid configuration")?;

    if cli.list_tools {
        let catalog = pipeline.registry().catalog();
        println!("{}", serde_json::to_string_pretty(&catalog)?);
        return Ok(());
    }

    let Some(batch_path) = cli.batch.as_ref() else {
        bail!("No batch given; pass a JSON file or '-' for stdin");
    };
    let payloads = read_batch(batch_path)?;
    debug!("Read {} payload(s)", payloads.len());

    // Prompts need stdin, so a batch piped through stdin means no prompts
    let interface = if cli.non_interactive || batch_path.as_os_str() == "-" {
        TerminalInterface::non_interactive()
    } else {
        TerminalInterface::new()
    };

    let results = tokio::select! {
        results = pipeline.process_batch(&payloads, &interface) => results?,
        _ = tokio::signal::ctrl_c() => {
            bail!("Interrupted, batch abandoned");
        }
    };

    let accepted = results.iter().filter(|r| r.accepted).count();
    info!("{} of {} request(s) accepted", accepted, results.len());

    let json = serde_json::to_string_pretty(&results)?;
    match &cli.output {
        Some(path) => std::fs::write(path, json)
            .with_context(|| format!("Failed to write results to {}", path.display()))?,
        None => println!("{}", json),
    }

    Ok(())
}
