//! CLI command implementations.
//!
//! - `melanalytics report`: one login + fetch-and-render pass in the terminal
//! - `melanalytics health`: config sources, service reachability, fetch log
//! - `melanalytics config show|init|set|reset`: configuration management

use anyhow::Result;
use chrono::Local;
use colored::Colorize;

use crate::analytics::logger;
use crate::client::ApiClient;
use crate::config::{self, AppConfig};
use crate::dashboard::{self, ActivityPanel, DashboardView, StatsPanel};
use crate::daterange;
use crate::metrics::CategoryShare;
use crate::session::Session;

/// Output format for `report`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    Table,
    Json,
    /// Merged daily activity only.
    Csv,
}

impl OutputFormat {
    pub fn from_str_opt(s: Option<&str>) -> Self {
        match s {
            Some("json") => Self::Json,
            Some("csv") => Self::Csv,
            _ => Self::Table,
        }
    }
}

/// Arguments of `melanalytics report`.
#[derive(Debug, Clone)]
pub struct ReportArgs {
    pub username: String,
    pub password: String,
    pub start: Option<String>,
    pub end: Option<String>,
    pub format: OutputFormat,
}

/// Build the service client for a resolved config.
pub fn client_for(cfg: &AppConfig) -> ApiClient {
    let fetch_log = if cfg.logging.enabled {
        logger::fetch_log_path()
    } else {
        None
    };
    ApiClient::from_config(&cfg.service).with_fetch_log(fetch_log)
}

// ---------------------------------------------------------------------------
// melanalytics report
// ---------------------------------------------------------------------------

/// Log in, run one render pass and print the result.
///
/// Validation and login failures stop before any dashboard request. Fetch
/// failures are printed after whatever data did arrive.
pub fn run_report(args: &ReportArgs) -> Result<()> {
    let cfg = config::load();

    let today = Local::now().date_naive();
    let range = daterange::resolve(
        args.start.as_deref(),
        args.end.as_deref(),
        cfg.dashboard.default_range_days,
        today,
    )?;

    let client = client_for(&cfg);
    let mut session = Session::new();
    session.login(&client, &args.username, &args.password)?;

    let view = dashboard::render_pass(&client, &mut session, range)?;

    match args.format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&view)?),
        OutputFormat::Csv => print!("{}", activity_csv(&view)),
        OutputFormat::Table => {
            if let Some(welcome) = session.take_welcome() {
                println!("{}", welcome.green());
                println!();
            }
            print_view_table(&view);
        }
    }

    if let Some(message) = view.combined_error() {
        eprintln!();
        eprintln!("{}", message.red());
        if view.token_rejected() {
            eprintln!("{}", "Session ended; log in again.".yellow());
        }
    }

    Ok(())
}

fn print_view_table(view: &DashboardView) {
    println!("{}", "Melanoma Detection Analytics".bold().cyan());
    println!("{}", format!("{}  ({} days)", view.range, view.range.days_in_range()).dimmed());
    println!("{}", "=".repeat(60));
    println!();

    println!("  {} {}", "Total users:   ".bold(), view.kpi(|s| s.total_users));
    println!("  {} {}", "Total images:  ".bold(), view.kpi(|s| s.total_images));
    println!("  {} {}", "Total analyses:".bold(), view.kpi(|s| s.total_analyses));
    println!(
        "  {} {}",
        "Analysis rate: ".bold(),
        view.stats
            .as_ref()
            .map(|p| p.analysis_rate_display.clone())
            .unwrap_or_else(|| dashboard::NOT_AVAILABLE.to_string())
    );
    println!();

    if let Some(panel) = &view.stats {
        print_distributions(panel);
    }

    match &view.activity {
        Some(panel) => print_activity_table(panel),
        None => println!("{}", "Activity data unavailable.".yellow()),
    }
}

fn print_distributions(panel: &StatsPanel) {
    print_share_table("Body Part Distribution", &panel.body_part_shares, "No body part distribution data available");
    print_share_table("Risk Distribution", &panel.risk_shares, "No risk distribution data available");
}

fn print_share_table(title: &str, shares: &[CategoryShare], empty: &str) {
    println!("{}", title.bold().cyan());
    if shares.is_empty() {
        println!("  {}", empty.dimmed());
        println!();
        return;
    }

    println!("  {:<20} {:>8} {:>8}", "Category", "Count", "Share");
    println!("  {}", "-".repeat(38));
    for (i, share) in shares.iter().enumerate() {
        let line = format!(
            "  {:<20} {:>8} {:>7.1}%",
            truncate(&share.label, 20),
            format_number(share.count),
            share.pct
        );
        if i % 2 == 0 {
            println!("{line}");
        } else {
            println!("{}", line.dimmed());
        }
    }
    println!();
}

fn print_activity_table(panel: &ActivityPanel) {
    println!("{}", "Daily Activity".bold().cyan());
    if panel.is_empty() {
        println!("  {}", "No activity data available for the selected period".dimmed());
        return;
    }

    println!("  {:<12} {:>8} {:>9}", "Date", "Uploads", "Analyses");
    println!("  {}", "-".repeat(31));
    for row in &panel.rows {
        println!(
            "  {:<12} {:>8} {:>9}",
            row.date.format("%Y-%m-%d"),
            format_number(row.uploads),
            format_number(row.analyses),
        );
    }
    if panel.skipped_entries > 0 {
        println!(
            "  {}",
            format!("{} entries without a readable date were skipped", panel.skipped_entries)
                .yellow()
        );
    }
}

/// Merged daily activity as CSV; empty body when activity is unavailable.
fn activity_csv(view: &DashboardView) -> String {
    let mut out = String::from("date,uploads,analyses\n");
    if let Some(panel) = &view.activity {
        for row in &panel.rows {
            out.push_str(&format!(
                "{},{},{}\n",
                row.date.format("%Y-%m-%d"),
                row.uploads,
                row.analyses
            ));
        }
    }
    out
}

// ---------------------------------------------------------------------------
// melanalytics health
// ---------------------------------------------------------------------------

/// Check config sources, service reachability and the fetch log.
pub fn run_health() -> Result<()> {
    println!("{}", "melanalytics Health Check".bold().cyan());
    println!("{}", "=".repeat(40));

    let global_exists = config::global_config_file()
        .map(|p| p.exists())
        .unwrap_or(false);
    let project_exists = config::project_config_file()
        .map(|p| p.exists())
        .unwrap_or(false);
    let cfg = config::load();

    print_health_item(
        "Global config",
        global_exists,
        if global_exists {
            "~/.melanalytics/config.toml found"
        } else {
            "not found (run `melanalytics config init` to create)"
        },
    );
    print_health_item(
        "Project config",
        project_exists,
        if project_exists {
            ".melanalytics.toml found"
        } else {
            "none (optional)"
        },
    );

    let client = client_for(&cfg);
    let reachable = client.is_reachable();
    print_health_item(
        "Analytics service",
        reachable,
        &if reachable {
            format!("reachable at {}", client.base_url())
        } else {
            format!("not reachable at {} (is the server running?)", client.base_url())
        },
    );
    print_health_item(
        "Request timeout",
        true,
        &format!("{}s", cfg.service.timeout_secs),
    );

    let log_path = logger::fetch_log_path();
    let entries = log_path
        .as_deref()
        .map(logger::read_entries)
        .unwrap_or_default();
    print_health_item(
        "Fetch log",
        cfg.logging.enabled,
        &if cfg.logging.enabled {
            format!("{} entries", entries.len())
        } else {
            "disabled (set MELANALYTICS_LOG=1 to enable)".to_string()
        },
    );

    let mut summary: Vec<_> = logger::summarize(&entries).into_iter().collect();
    summary.sort_by(|a, b| a.0.cmp(&b.0));
    for (endpoint, s) in summary {
        let detail = match &s.last_failure {
            Some(kind) => format!(
                "{} calls, {} failed (last: {kind}), avg {}ms",
                s.calls, s.failures, s.avg_latency_ms
            ),
            None => format!("{} calls, avg {}ms", s.calls, s.avg_latency_ms),
        };
        print_health_item(&endpoint, s.failures == 0, &detail);
    }

    Ok(())
}

fn print_health_item(name: &str, ok: bool, detail: &str) {
    let status = if ok {
        "✓".green().bold()
    } else {
        "✗".red().bold()
    };
    println!("  {} {:<25} {}", status, name, detail.dimmed());
}

// ---------------------------------------------------------------------------
// melanalytics config show | init | set | reset
// ---------------------------------------------------------------------------

/// Show the effective (merged) configuration as TOML.
pub fn run_config_show() -> Result<()> {
    let toml_str = config::show_effective_config()?;
    println!("{}", "Effective melanalytics Configuration".bold().cyan());
    println!("{}", "=".repeat(50));
    println!();
    println!("{toml_str}");

    println!("{}", "Sources (highest priority last):".dimmed());
    println!("  {} built-in defaults", "·".dimmed());
    for (label, path) in [
        ("~/.melanalytics/config.toml", config::global_config_file()),
        (".melanalytics.toml", config::project_config_file()),
    ] {
        if path.is_some_and(|p| p.exists()) {
            println!("  {} {}", "✓".green(), label.dimmed());
        } else {
            println!("  {} {}", "·".dimmed(), format!("{label} (not found)").dimmed());
        }
    }
    println!(
        "  {} {}",
        "·".dimmed(),
        "BASE_URL / MELANALYTICS_* environment variables".dimmed()
    );

    Ok(())
}

/// Initialize a default config file at `~/.melanalytics/config.toml`.
pub fn run_config_init(force: bool) -> Result<()> {
    let path = config::init_config(force)?;
    println!(
        "{} Config written to {}",
        "✓".green().bold(),
        path.display()
    );
    Ok(())
}

/// Set a single configuration value in the global config file.
pub fn run_config_set(key: &str, value: &str) -> Result<()> {
    config::set_config_value(key, value)?;
    println!("{} Set {} = {}", "✓".green().bold(), key.bold(), value);
    Ok(())
}

/// Reset configuration to defaults.
pub fn run_config_reset() -> Result<()> {
    let path = config::reset_config()?;
    println!(
        "{} Config reset to defaults at {}",
        "✓".green().bold(),
        path.display()
    );
    Ok(())
}

// ---------------------------------------------------------------------------
// Formatting helpers
// ---------------------------------------------------------------------------

/// Format a count with comma separators.
fn format_number(n: i64) -> String {
    let digits = n.unsigned_abs().to_string();
    let mut grouped = String::new();
    for (i, ch) in digits.chars().rev().enumerate() {
        if i > 0 && i % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(ch);
    }
    if n < 0 {
        grouped.push('-');
    }
    grouped.chars().rev().collect()
}

/// Truncate to `max_len` characters, appending "…" if truncated.
fn truncate(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        s.to_string()
    } else {
        let head: String = s.chars().take(max_len.saturating_sub(1)).collect();
        format!("{head}…")
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
