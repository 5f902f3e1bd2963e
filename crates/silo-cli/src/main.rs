mod commands;
mod config;

use std::io::Write;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use tracing_subscriber::filter::LevelFilter;
use tracing_subscriber::EnvFilter;

use silo_core::{Category, NoteStore, PersonId};
use silo_store::FsStore;

use crate::commands::{cmd_add, cmd_list, cmd_show, print_usage};

#[derive(Parser)]
#[command(
    name = "silo",
    version,
    about = "Eternal and transient notes about the people you know",
    override_usage = "silo [OPTIONS] [<person> [<command> <entry>...]]"
)]
struct Cli {
    /// Data directory (default: `data`, or `store.data_dir` from the config)
    #[arg(long)]
    data_dir: Option<PathBuf>,

    /// Path to a TOML config file
    #[arg(long)]
    config: Option<PathBuf>,

    /// Print the resolved configuration and exit
    #[arg(long)]
    show_config: bool,

    /// <person> [<eternal|e|transient|t> <entry>...]
    #[arg(trailing_var_arg = true, allow_hyphen_values = true)]
    args: Vec<String>,
}

/// What the positional arguments ask for.
#[derive(Debug, PartialEq, Eq)]
enum Action {
    List,
    Show(String),
    Add {
        person: String,
        command: String,
        entry: String,
    },
    Usage,
}

impl Action {
    fn from_args(args: &[String]) -> Self {
        match args {
            [] => Self::List,
            [person] => Self::Show(person.clone()),
            [person, command, entry @ ..] if !entry.is_empty() => Self::Add {
                person: person.clone(),
                command: command.clone(),
                entry: entry.join(" "),
            },
            _ => Self::Usage,
        }
    }
}

/// `RUST_LOG`-style directives, falling back to `warn` when none are given.
fn log_filter(directives: &str) -> EnvFilter {
    EnvFilter::builder()
        .with_default_directive(LevelFilter::WARN.into())
        .parse_lossy(directives)
}

/// Dispatch the positional arguments against `store`, writing to `out`.
/// An invalid person name is an error; an unknown command prints the usage.
fn run(args: &[String], store: &mut impl NoteStore, out: &mut impl Write) -> Result<()> {
    match Action::from_args(args) {
        Action::List => cmd_list(&*store, out)?,
        Action::Show(person) => {
            let person: PersonId = person.parse()?;
            cmd_show(&*store, &person, out)?;
        }
        Action::Add {
            person,
            command,
            entry,
        } => {
            let person: PersonId = person.parse()?;
            match command.parse::<Category>() {
                Ok(category) => cmd_add(store, &person, category, &entry, out)?,
                Err(_) => {
                    writeln!(out, "Invalid command.")?;
                    print_usage(out)?;
                }
            }
        }
        Action::Usage => print_usage(out)?,
    }
    Ok(())
}

fn main() -> Result<()> {
    let directives = std::env::var(EnvFilter::DEFAULT_ENV).unwrap_or_default();
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(log_filter(&directives))
        .init();

    let cli = Cli::parse();
    let config = config::load_config(cli.config.as_deref())?;
    let data_dir = cli
        .data_dir
        .clone()
        .unwrap_or_else(|| config.store.data_dir.clone());

    if cli.show_config {
        println!("Config:      {}", config::show_config_path(cli.config.as_deref()));
        println!("Data dir:    {}", data_dir.display());
        println!("Max backups: {}", config.backup.max_backups);
        println!("Lock:        {}", config.lock.enabled);
        return Ok(());
    }

    let mut store = FsStore::open_with(&data_dir, config.store_options())
        .with_context(|| format!("failed to open data dir {}", data_dir.display()))?;
    tracing::debug!(
        people = store.people().len(),
        entries = store.count(),
        "store ready"
    );

    let stdout = std::io::stdout();
    let mut out = stdout.lock();
    run(&cli.args, &mut store, &mut out)?;
    out.flush()?;
    Ok(())
}
