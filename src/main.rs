use anyhow::Result;
use clap::{Parser, Subcommand};

use melanalytics::cli::{self, OutputFormat, ReportArgs};
use melanalytics::web;

#[derive(Debug, Parser)]
#[command(name = "melanalytics")]
#[command(about = "Melanoma detection analytics dashboard")]
struct App {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Serve the browser dashboard
    Web {
        /// Bind address (default from config: 127.0.0.1:8501)
        #[arg(long)]
        addr: Option<String>,
        /// Do not open a browser window
        #[arg(long)]
        no_browser: bool,
    },
    /// Log in, fetch the dashboard once and print it
    Report {
        #[arg(long, env = "MELANALYTICS_USERNAME")]
        username: String,
        #[arg(long, env = "MELANALYTICS_PASSWORD", hide_env_values = true)]
        password: String,
        /// First day of the range (YYYY-MM-DD, default: 30 days before end)
        #[arg(long)]
        start: Option<String>,
        /// Last day of the range (YYYY-MM-DD, default: today)
        #[arg(long)]
        end: Option<String>,
        /// Output format: table (default), json, csv
        #[arg(long, default_value = "table")]
        format: String,
    },
    /// Check configuration and service reachability
    Health,
    /// Manage configuration
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Debug, Subcommand)]
enum ConfigAction {
    /// Show the effective configuration
    Show,
    /// Write a default config to ~/.melanalytics/config.toml
    Init {
        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },
    /// Set a value, e.g. `config set service.base_url http://host:8080`
    Set { key: String, value: String },
    /// Reset the global config to defaults
    Reset,
}

fn main() -> Result<()> {
    let app = App::parse();

    match app.command {
        Commands::Web { addr, no_browser } => {
            let mut cfg = melanalytics::config::load();
            if let Some(addr) = addr {
                cfg.web.addr = addr;
            }
            if no_browser {
                cfg.web.open_browser = false;
            }
            web::serve(&cfg)
        }
        Commands::Report {
            username,
            password,
            start,
            end,
            format,
        } => cli::run_report(&ReportArgs {
            username,
            password,
            start,
            end,
            format: OutputFormat::from_str_opt(Some(&format)),
        }),
        Commands::Health => cli::run_health(),
        Commands::Config { action } => match action {
            ConfigAction::Show => cli::run_config_show(),
            ConfigAction::Init { force } => cli::run_config_init(force),
            ConfigAction::Set { key, value } => cli::run_config_set(&key, &value),
            ConfigAction::Reset => cli::run_config_reset(),
        },
    }
}
