use clap::Parser;
use color_eyre::eyre::WrapErr;
use color_eyre::Result;
use env_logger::Env;
use log::info;
use std::path::PathBuf;

use netmapper::config_loader;
use netmapper::discovery::CredentialStore;
use netmapper::orchestrator::Discovery;

/// Discover network topology over SNMP and CLI and lay it out as a diagram
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to the discovery configuration YAML file
    #[arg(short, long)]
    config: PathBuf,

    /// File with one target address per line
    #[arg(short, long)]
    targets: PathBuf,

    /// CLI credential YAML file
    #[arg(long)]
    credentials: Option<PathBuf>,

    /// Output directory for the model, report, connection lists and diagram
    #[arg(short, long, default_value = "netmapper_output")]
    output: PathBuf,

    /// Override the configured worker pool size
    #[arg(short, long)]
    workers: Option<usize>,
}

fn main() -> Result<()> {
    // Initialize error handling
    color_eyre::install()?;

    // Parse command-line arguments
    let args = Args::parse();

    // Initialize logging with default filter level of "info"
    env_logger::Builder::from_env(Env::default().default_filter_or("info")).init();

    info!("Starting NetMapper discovery");
    info!("Configuration file: {:?}", args.config);
    info!("Output directory: {:?}", args.output);

    let mut config = config_loader::load_config(&args.config)?;
    if let Some(workers) = args.workers {
        config.discovery.workers = workers;
        config.validate().wrap_err("Invalid --workers override")?;
    }

    let targets = config_loader::load_targets(&args.targets)?;
    let credentials = match &args.credentials {
        Some(path) => config_loader::load_credentials(path)?,
        None => CredentialStore::default(),
    };

    let line_height = config.layout.label_line_height;
    let discovery = Discovery::with_network(config, credentials)?;
    let outcome = discovery.run(&targets)?;

    outcome
        .write_outputs(&args.output, line_height)
        .wrap_err_with(|| format!("Failed to write results to '{}'", args.output.display()))?;

    info!("Discovery completed: {}", outcome.report.summary());
    Ok(())
}
