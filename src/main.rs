use anyhow::{bail, Result};
use clap::Parser;
use colored::*;
use log::LevelFilter;
use simplelog::WriteLogger;
use std::fs::File;
use std::str::FromStr;

use syskit::app::App;
use syskit::cli::{Cli, Commands, ConfigCommands, PulseArgs};
use syskit::core::ActionEngine;
use syskit::utils::{truncate_string, AppConfig, LOG_LEVEL_ENV, LOG_PATH_ENV};

#[tokio::main]
async fn main() -> Result<()> {
    init_logging()?;
    let cli = Cli::parse();

    match cli.command {
        None => {
            // No command - run interactive dashboard
            handle_pulse(PulseArgs::default()).await?;
        }
        Some(Commands::Pulse(args)) => {
            handle_pulse(args).await?;
        }
        Some(Commands::Rules { json }) => {
            handle_rules(json)?;
        }
        Some(Commands::Config { command }) => {
            handle_config(command)?;
        }
    }

    Ok(())
}

/// Log to the file named by SYSKIT_LOG_PATH; the terminal belongs to the dashboard
fn init_logging() -> Result<()> {
    if let Ok(log_path) = std::env::var(LOG_PATH_ENV) {
        let log_level = match std::env::var(LOG_LEVEL_ENV) {
            Ok(v) => LevelFilter::from_str(&v)?,
            Err(_) => LevelFilter::Info,
        };

        WriteLogger::init(
            log_level,
            simplelog::Config::default(),
            File::create(log_path)?,
        )?;
    }

    Ok(())
}

async fn handle_pulse(args: PulseArgs) -> Result<()> {
    let mut config = AppConfig::load()?;
    if let Some(interval) = args.interval {
        config.refresh_interval = interval;
    }
    if let Some(limit) = args.limit {
        config.display_limit = limit;
    }

    let problems = config.validate();
    if !problems.is_empty() {
        bail!("Invalid configuration:\n  - {}", problems.join("\n  - "));
    }

    let mut app = App::new(&config, !args.no_actions)?;
    app.run().await
}

fn handle_rules(json: bool) -> Result<()> {
    let config = AppConfig::load()?;

    if json {
        println!("{}", serde_json::to_string_pretty(&config.actions)?);
        return Ok(());
    }

    let engine = ActionEngine::from_config(&config.actions)?;
    if engine.rules().is_empty() {
        println!("No actions configured in {}", AppConfig::config_path()?.display());
        return Ok(());
    }

    println!(
        "{:<28} {:<16} {:>7}  {}",
        "NAME".bold(),
        "PROCESS".bold(),
        "CPU%".bold(),
        "ACTION".bold()
    );
    println!("{}", "-".repeat(72));

    for rule in engine.rules() {
        println!(
            "{} {} {}  {}",
            format!("{:<28}", truncate_string(&rule.name, 28)).white().bold(),
            format!("{:<16}", rule.matcher.pattern()).cyan(),
            format!("{:>7.1}", rule.cpu_threshold).yellow(),
            rule.action
        );
    }

    Ok(())
}

fn handle_config(command: ConfigCommands) -> Result<()> {
    match command {
        ConfigCommands::Path => {
            println!("{}", AppConfig::config_path()?.display());
        }
        ConfigCommands::Show => {
            let config = AppConfig::load()?;
            print!("{}", toml::to_string_pretty(&config)?);
        }
        ConfigCommands::Init { force } => {
            let path = AppConfig::config_path()?;
            if path.exists() && !force {
                bail!("{} already exists (use --force to overwrite)", path.display());
            }
            AppConfig::default().save_to(&path)?;
            println!("{} Wrote default configuration to {}", "✓".green(), path.display());
        }
        ConfigCommands::Validate => {
            let config = AppConfig::load()?;
            let errors = config.validate();

            if errors.is_empty() {
                println!("{} Configuration is valid", "✓".green());
            } else {
                println!("{} Configuration errors:", "✗".red());
                for error in &errors {
                    println!("  - {}", error);
                }
                bail!("{} configuration problem(s) found", errors.len());
            }
        }
    }

    Ok(())
}
