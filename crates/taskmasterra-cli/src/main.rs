mod version;

use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use tracing::debug;

use taskmasterra_core::config::{
    default_config_path, expand_path, load_config, save_config, Settings,
};
use taskmasterra_core::history::{DocumentStore, FsStore};
use taskmasterra_core::recordkeep::RecordKeeper;
use taskmasterra_core::reminder::{sync_active_tasks, RemindersApp, SystemRunner};
use taskmasterra_core::stats::{analyze_file, render_report, write_report};
use taskmasterra_core::validator::{validate_content, ValidationReport};

#[derive(Parser)]
#[command(
    name = "taskmasterra",
    version = version::FULL,
    about = "Keep a markdown task list tidy: journal worked tasks, archive finished ones"
)]
struct Cli {
    /// Config file (defaults to $TASKMASTERRA_HOME/config.json)
    #[arg(short, long, global = true)]
    config: Option<String>,

    /// Log debug output to stderr
    #[arg(long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Journal touched tasks, archive completed ones and settle the file
    Recordkeep {
        /// Task file
        #[arg(short, long)]
        input: String,
    },
    /// Mirror active (!!) tasks into macOS Reminders
    #[command(alias = "updatecal")]
    Updatereminders {
        #[arg(short, long)]
        input: String,
    },
    /// Summarize task counts, priorities and effort
    Stats {
        #[arg(short, long)]
        input: String,
        /// Write the report here instead of stdout
        #[arg(short, long)]
        output: Option<String>,
        #[arg(long)]
        json: bool,
    },
    /// Check a task file for formatting problems
    Validate {
        #[arg(short, long)]
        input: String,
        #[arg(long)]
        json: bool,
    },
    /// Create or print the configuration
    Config {
        /// Write the default configuration
        #[arg(long, conflicts_with = "show")]
        init: bool,
        /// Print the effective configuration as JSON
        #[arg(long)]
        show: bool,
    },
    /// Print version information
    Version,
}

fn log_filter(verbose: bool) -> tracing_subscriber::EnvFilter {
    let level = if let Ok(v) = std::env::var("RUST_LOG") {
        v
    } else if let Ok(v) = std::env::var("TASKMASTERRA_LOG") {
        match v.as_str() {
            "silent" => "off".to_string(),
            other => other.to_string(),
        }
    } else if verbose {
        "debug".to_string()
    } else {
        "warn".to_string()
    };

    tracing_subscriber::EnvFilter::try_new(level)
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn"))
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    tracing_subscriber::fmt()
        .with_env_filter(log_filter(cli.verbose))
        .with_writer(std::io::stderr)
        .init();

    let config = cli.config.as_deref().map(expand_path).transpose()?;
    match cli.command {
        Command::Recordkeep { input } => recordkeep(&input, config.as_deref()),
        Command::Updatereminders { input } => update_reminders(&input, config.as_deref()),
        Command::Stats {
            input,
            output,
            json,
        } => stats(&input, output.as_deref(), json),
        Command::Validate { input, json } => validate(&input, json),
        Command::Config { init, show } => config_command(init, show, config.as_deref()),
        Command::Version => {
            println!("taskmasterra {}", version::FULL);
            Ok(())
        }
    }
}

fn load_settings(config: Option<&Path>) -> Result<Settings> {
    let settings = load_config(config).context("failed to load config")?;
    settings.validate().context("invalid config")?;
    Ok(settings)
}

fn input_path(raw: &str) -> Result<PathBuf> {
    let path = expand_path(raw).with_context(|| format!("invalid input path '{raw}'"))?;
    if !path.is_file() {
        bail!("File '{}' does not exist", path.display());
    }
    Ok(path)
}

/// Read a task file through the same size-limited store record keeping uses.
fn read_input(raw: &str) -> Result<(PathBuf, String)> {
    let path = expand_path(raw).with_context(|| format!("invalid input path '{raw}'"))?;
    let Some(content) = FsStore::default()
        .read_text(&path)
        .with_context(|| format!("failed to read '{}'", path.display()))?
    else {
        bail!("File '{}' does not exist", path.display());
    };
    Ok((path, content))
}

/// Print lint findings to stderr without stopping the command.
fn report_issues(path: &Path, report: &ValidationReport) {
    if report.is_clean() {
        return;
    }
    eprintln!("Validation issues in {}:", path.display());
    eprint!("{}", report.render());
}

fn recordkeep(input: &str, config: Option<&Path>) -> Result<()> {
    let (path, content) = read_input(input)?;
    report_issues(&path, &validate_content(&content));

    let settings = load_settings(config)?;
    let keeper = RecordKeeper::new(FsStore::from_settings(&settings), &settings);
    let report = keeper
        .run(&path)
        .with_context(|| format!("record keeping failed for '{}'", path.display()))?;

    println!(
        "Journaled {} entries to {}",
        report.journal_entries,
        report.journal_path.display()
    );
    println!(
        "Archived {} entries to {}",
        report.archive_entries,
        report.archive_path.display()
    );
    Ok(())
}

fn update_reminders(input: &str, config: Option<&Path>) -> Result<()> {
    let (path, content) = read_input(input)?;
    report_issues(&path, &validate_content(&content));

    let settings = load_settings(config)?;
    let app = RemindersApp::new(SystemRunner, &settings);
    let report = sync_active_tasks(&content, &app).context("failed to update reminders")?;
    println!(
        "Synced {} active tasks to Reminders list '{}'",
        report.synced.len(),
        app.list_name()
    );
    Ok(())
}

fn stats(input: &str, output: Option<&str>, json: bool) -> Result<()> {
    let path = input_path(input)?;
    let stats = analyze_file(&path)?;
    let body = if json {
        let mut text = serde_json::to_string_pretty(&stats)?;
        text.push('\n');
        text
    } else {
        render_report(&stats)
    };

    match output {
        Some(raw) => {
            let out = expand_path(raw).with_context(|| format!("invalid output path '{raw}'"))?;
            let written = write_report(&out, &body)?;
            println!("Report written to {}", written.display());
        }
        None => print!("{body}"),
    }
    Ok(())
}

fn validate(input: &str, json: bool) -> Result<()> {
    let (path, content) = read_input(input)?;
    let report = validate_content(&content);
    debug!(
        errors = report.errors.len(),
        warnings = report.warnings.len(),
        "validated"
    );

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        print!("{}", report.render());
    }
    if report.has_errors() {
        bail!(
            "{} has {} validation error(s)",
            path.display(),
            report.errors.len()
        );
    }
    Ok(())
}

fn config_command(init: bool, show: bool, config: Option<&Path>) -> Result<()> {
    let path = match config {
        Some(path) => path.to_path_buf(),
        None => default_config_path().context("cannot resolve a home directory for the config")?,
    };
    if init {
        let written = save_config(&path, &Settings::default())?;
        println!("Wrote default config to {}", written.display());
        return Ok(());
    }
    if show {
        let settings = load_settings(Some(&path))?;
        println!("{}", serde_json::to_string_pretty(&settings)?);
        return Ok(());
    }
    bail!("nothing to do: pass --init or --show");
}
