/// CLI argument parsing

use clap::{Parser, Subcommand};

// Build timestamp injected at compile time
pub const VERSION_WITH_BUILD: &str = concat!(env!("CARGO_PKG_VERSION"), " (built: ", env!("BUILD_TIMESTAMP"), ")");

#[derive(Parser)]
#[command(name = "syskit")]
#[command(author, version = VERSION_WITH_BUILD, about = "Live system dashboard with CPU threshold actions", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run the live dashboard (default)
    Pulse(PulseArgs),

    /// List configured threshold actions
    Rules {
        /// Print as JSON
        #[arg(long)]
        json: bool,
    },

    /// Configuration file management
    Config {
        #[command(subcommand)]
        command: ConfigCommands,
    },
}

#[derive(clap::Args, Debug, Default, Clone)]
pub struct PulseArgs {
    /// Refresh interval, e.g. "500ms" or "2s"
    #[arg(short, long)]
    pub interval: Option<String>,

    /// Maximum number of process rows shown
    #[arg(short, long)]
    pub limit: Option<usize>,

    /// Show rules but never run their actions
    #[arg(long)]
    pub no_actions: bool,
}

#[derive(Subcommand)]
pub enum ConfigCommands {
    /// Print the config file location
    Path,

    /// Print the effective configuration
    Show,

    /// Write the default configuration
    Init {
        /// Overwrite an existing file
        #[arg(short, long)]
        force: bool,
    },

    /// Validate configuration
    Validate,
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_no_subcommand_runs_dashboard() {
        let cli = Cli::try_parse_from(["syskit"]).unwrap();
        assert!(cli.command.is_none());
    }

    #[test]
    fn test_pulse_flags() {
        let cli = Cli::try_parse_from(["syskit", "pulse", "-i", "2s", "--limit", "10", "--no-actions"])
            .unwrap();
        let Some(Commands::Pulse(args)) = cli.command else {
            panic!("expected pulse");
        };
        assert_eq!(args.interval.as_deref(), Some("2s"));
        assert_eq!(args.limit, Some(10));
        assert!(args.no_actions);
    }

    #[test]
    fn test_config_init_force() {
        let cli = Cli::try_parse_from(["syskit", "config", "init", "--force"]).unwrap();
        assert!(matches!(
            cli.command,
            Some(Commands::Config {
                command: ConfigCommands::Init { force: true }
            })
        ));
    }
}
