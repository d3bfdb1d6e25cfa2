//! `lictrack` - CLI for license-tracker
//!
//! This binary runs the HTTP server and offers a few offline commands over
//! the same license store.

#![warn(missing_debug_implementations)]
#![deny(unsafe_code)]

use anyhow::Context;
use clap::Parser;

use license_tracker::cli::{Cli, Command, ConfigCommand};
use license_tracker::{export, init_logging, server, Config, LicenseStore};

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Initialize logging based on verbosity
    init_logging(cli.verbosity());

    let mut config = Config::load_from(cli.config.clone())?;

    match cli.command {
        Command::Serve(serve_cmd) => {
            serve_cmd.apply_to(&mut config);
            config.validate()?;
            let runtime = tokio::runtime::Runtime::new().context("failed to start runtime")?;
            runtime.block_on(server::run(&config))?;
        }
        Command::List(list_cmd) => handle_list(&config, list_cmd.json)?,
        Command::Export(export_cmd) => {
            let path = export_cmd
                .output
                .unwrap_or_else(|| config.storage.export_file.clone());
            let store = open_store(&config)?;
            let count = store.view(|records| {
                export::export_to(&path, records)?;
                Ok(records.len())
            })?;
            println!("Exported {count} licenses to {}", path.display());
        }
        Command::Stats(stats_cmd) => handle_stats(&config, stats_cmd.json)?,
        Command::Config(config_cmd) => handle_config(&config, config_cmd)?,
    }
    Ok(())
}

fn open_store(config: &Config) -> anyhow::Result<LicenseStore> {
    LicenseStore::open(&config.storage.data_file, config.storage.on_corrupt).with_context(|| {
        format!(
            "failed to open store at {}",
            config.storage.data_file.display()
        )
    })
}

fn handle_list(config: &Config, json: bool) -> anyhow::Result<()> {
    let records = open_store(config)?.list()?;

    if json {
        println!("{}", serde_json::to_string_pretty(&records)?);
        return Ok(());
    }

    if records.is_empty() {
        println!("No licenses stored.");
        return Ok(());
    }

    println!(
        "{:<5} {:<36} {:<24} {:<12} {:<12} {:<6} Level",
        "#", "ID", "Name", "Start", "End", "Active"
    );
    for (index, license) in records.iter().enumerate() {
        println!(
            "{:<5} {:<36} {:<24} {:<12} {:<12} {:<6} {} ({})",
            index,
            license.id,
            license.name,
            license.start_date,
            license.end_date,
            if license.active { "yes" } else { "no" },
            license.level,
            license.level.label()
        );
    }
    Ok(())
}

fn handle_stats(config: &Config, json: bool) -> anyhow::Result<()> {
    let store = open_store(config)?;
    let stats = store.stats()?;

    if json {
        println!("{}", serde_json::to_string_pretty(&stats)?);
    } else {
        println!("lictrack stats");
        println!("--------------");
        println!("Store:         {}", store.path().display());
        println!("Licenses:      {}", stats.total);
        println!("  Active:      {}", stats.active);
        println!("  Inactive:    {}", stats.inactive);
        println!("File size:     {} bytes", stats.file_size_bytes);
    }
    Ok(())
}

fn handle_config(config: &Config, cmd: ConfigCommand) -> anyhow::Result<()> {
    match cmd {
        ConfigCommand::Show { json } => {
            if json {
                println!("{}", serde_json::to_string_pretty(config)?);
            } else {
                println!("Current Configuration");
                println!("=====================");
                println!();
                println!("[Storage]");
                println!("  Data file:          {}", config.storage.data_file.display());
                println!("  Export file:        {}", config.storage.export_file.display());
                println!("  On corrupt:         {:?}", config.storage.on_corrupt);
                println!();
                println!("[Server]");
                println!("  Host:               {}", config.server.host);
                println!("  Port:               {}", config.server.port);
                println!("  Static dir:         {}", config.server.static_dir.display());
            }
        }
        ConfigCommand::Path => {
            println!("{}", Config::default_config_path().display());
        }
        ConfigCommand::Validate { file } => {
            let path = file.unwrap_or_else(Config::default_config_path);
            println!("Validating configuration: {}", path.display());
            Config::load_from(Some(path.clone()))
                .with_context(|| format!("invalid configuration in {}", path.display()))?;
            println!("Configuration is valid.");
        }
    }
    Ok(())
}
