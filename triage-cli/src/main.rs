use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;
use triage_core::{Clock, Point};
use triage_store::{JsonFileSource, MarkdownFileSource, SnapshotPoller, TaskStore};

mod chat;
mod commands;
mod config;
mod state;

use commands::{Engine, NewTask, Ranking};

#[derive(Parser, Debug)]
#[command(
    name = "triage",
    version = concat!(env!("CARGO_PKG_VERSION"), " (", env!("TRIAGE_BUILD_SHA"), ")"),
    about = "Decide what to work on next"
)]
struct Cli {
    /// Task file to use instead of the configured one
    #[arg(long, global = true)]
    store: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Active tasks, ranked
    List {
        #[arg(long, value_enum, default_value_t = Ranking::Slack)]
        heuristic: Ranking,

        /// Limit number of tasks printed (default: 10)
        #[arg(long, default_value_t = 10)]
        limit: usize,
    },

    /// What to do right now, and why
    Next,

    /// Set severity and due date from a daily pace; splits tasks that need it
    Schedule {
        id: String,
        /// "auto" (default), pomodoros per day, or an amount like 2h
        #[arg(default_value = "auto")]
        pace: String,
    },

    /// Record effort spent on a task
    Invest { id: String, amount: String },

    /// Mark a task done
    Done { id: String },

    /// Shift a task's start and due by an amount
    Postpone { id: String, amount: String },

    /// Add a task
    Add {
        description: String,
        #[arg(long)]
        context: Option<String>,
        /// Remaining effort, e.g. 3p or 2h (default: 1p)
        #[arg(long)]
        cost: Option<String>,
        /// YYYY-MM-DD[ HH:MM[:SS]] (default: start + 1 day)
        #[arg(long)]
        due: Option<String>,
        #[arg(long)]
        start: Option<String>,
    },

    /// Merge tasks from a markdown checklist
    Import { file: PathBuf },

    /// Required daily pace vs. dedication
    Workload,

    /// Open tasks grouped by due day
    Agenda,

    /// Config file commands
    Config {
        #[command(subcommand)]
        command: ConfigCommand,
    },

    /// Interactive chat with slash commands (TTY required)
    Chat,

    /// Print the next decision whenever the task source changes
    Watch {
        /// Watch a markdown checklist instead of the task store
        #[arg(long)]
        markdown: Option<PathBuf>,
    },
}

#[derive(Subcommand, Debug)]
enum ConfigCommand {
    /// Write ~/.triage/config.toml with defaults
    Init,
    /// Print the effective config
    Show,
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("triage=info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing();
    let cli = Cli::parse();

    let cfg = config::load_config()?;
    let store_path = match cli.store {
        Some(p) => p,
        None => cfg.store_path()?,
    };

    match cli.command {
        Command::Config { command } => match command {
            ConfigCommand::Init => println!("{}", config::init_config()?),
            ConfigCommand::Show => print!("{}", toml::to_string_pretty(&cfg).context("serialize config")?),
        },

        Command::Chat => {
            let session = chat::ChatSession {
                store: TaskStore::open(&store_path)?,
                engine: Engine::from_config(&cfg)?,
                clock: Box::new(cfg.clock()?),
            };
            chat::run_chat(session, &state::chat_dir()?)?;
        }

        Command::Watch { markdown } => {
            let engine = Engine::from_config(&cfg)?;
            let clock: Arc<dyn Clock> = Arc::new(cfg.clock()?);
            let interval = cfg.poll_interval();
            let poller = match markdown {
                Some(md) => SnapshotPoller::spawn(MarkdownFileSource::new(md, clock.clone()), interval),
                None => SnapshotPoller::spawn(JsonFileSource::new(&store_path), interval),
            };
            watch(poller, &engine, clock.as_ref()).await?;
        }

        command => {
            let engine = Engine::from_config(&cfg)?;
            let now = Point::now(&cfg.clock()?);
            let mut store = TaskStore::open(&store_path)?;
            let (out, dirty) = run_command(command, &mut store, &engine, now)?;
            if dirty {
                store.save()?;
            }
            print!("{out}");
        }
    }

    Ok(())
}

/// One-shot commands. Returns the output and whether the store changed.
fn run_command(command: Command, store: &mut TaskStore, engine: &Engine, now: Point) -> Result<(String, bool)> {
    Ok(match command {
        Command::List { heuristic, limit } => (commands::list(store, engine, now, heuristic, limit), false),
        Command::Next => (commands::next(store, engine, now), false),
        Command::Workload => (commands::workload(store, engine, now), false),
        Command::Agenda => (commands::agenda(store, engine, now), false),
        Command::Schedule { id, pace } => (commands::schedule(store, engine, now, &id, &pace)?, true),
        Command::Invest { id, amount } => (commands::invest(store, &id, &amount)?, true),
        Command::Done { id } => (commands::done(store, &id)?, true),
        Command::Postpone { id, amount } => (commands::postpone(store, &id, &amount)?, true),
        Command::Add {
            description,
            context,
            cost,
            due,
            start,
        } => {
            let new = NewTask {
                description,
                context,
                cost,
                due,
                start,
            };
            (commands::add(store, now, new)?, true)
        }
        Command::Import { file } => {
            let md = std::fs::read_to_string(&file).with_context(|| format!("read {}", file.display()))?;
            (commands::import(store, now, &md)?, true)
        }
        other @ (Command::Config { .. } | Command::Chat | Command::Watch { .. }) => {
            bail!("{other:?} is not a one-shot command")
        }
    })
}

async fn watch(poller: SnapshotPoller, engine: &Engine, clock: &dyn Clock) -> Result<()> {
    let mut rx = poller.subscribe();
    loop {
        let snapshot = rx.borrow_and_update().clone();
        let now = Point::now(clock);
        let store = TaskStore::in_memory(snapshot.to_vec());
        info!(tasks = store.len(), "snapshot");
        println!("[{now}] {}", commands::next(&store, engine, now).trim_end());

        tokio::select! {
            changed = rx.changed() => {
                if changed.is_err() {
                    warn!("poller stopped");
                    return Ok(());
                }
            }
            _ = tokio::signal::ctrl_c() => return Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn parses_list_flags() {
        let cli = Cli::try_parse_from(["triage", "list", "--heuristic", "days", "--limit", "3"]).unwrap();
        match cli.command {
            Command::List { heuristic, limit } => {
                assert_eq!(heuristic, Ranking::Days);
                assert_eq!(limit, 3);
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn schedule_pace_defaults_to_auto() {
        let cli = Cli::try_parse_from(["triage", "--store", "/tmp/t.json", "schedule", "t1"]).unwrap();
        assert_eq!(cli.store, Some(PathBuf::from("/tmp/t.json")));
        match cli.command {
            Command::Schedule { id, pace } => {
                assert_eq!(id, "t1");
                assert_eq!(pace, "auto");
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn mutating_commands_mark_store_dirty() {
        let now: Point = "2026-03-10".parse().unwrap();
        let engine = Engine::new(triage_core::Amount::from_pomodoros(8.0), &Default::default());
        let mut store = TaskStore::in_memory(Vec::new());

        let add = Cli::try_parse_from(["triage", "add", "buy milk", "--context", "home/errands"]).unwrap();
        let (out, dirty) = run_command(add.command, &mut store, &engine, now).unwrap();
        assert!(dirty);
        assert!(out.starts_with("Added [t1] buy milk"));

        let (out, dirty) = run_command(Command::Next, &mut store, &engine, now).unwrap();
        assert!(!dirty);
        assert!(out.contains("buy milk"));
    }
}
