//! Command handlers shared by the CLI subcommands and the chat slash commands.
//!
//! Each handler reads or mutates the store and returns the text to show. None
//! of them print, read the clock, or save; the caller does that.

use std::fmt::Write;

use anyhow::{Context, Result, bail};
use clap::ValueEnum;
use triage_core::{
    Amount, DaysToThresholdHeuristic, GtdAlgorithm, GtdSettings, Heuristic, Point,
    RemainingEffortHeuristic, Scheduler, SlackHeuristic, StartTimeHeuristic, Task, render_agenda,
};
use triage_store::{TaskStore, parse_markdown};

use crate::config::Config;

/// The configured engine: daily dedication plus the cascade and scheduler built from it.
pub struct Engine {
    pub dedication: Amount,
    pub gtd: GtdAlgorithm,
    pub scheduler: Scheduler,
}

impl Engine {
    pub fn new(dedication: Amount, gtd: &GtdSettings) -> Self {
        Self {
            dedication,
            gtd: GtdAlgorithm::from_settings(gtd, dedication),
            scheduler: Scheduler::new(dedication),
        }
    }

    pub fn from_config(cfg: &Config) -> Result<Self> {
        Ok(Self::new(cfg.dedication()?, &cfg.gtd))
    }
}

/// Ranking used by `list`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
pub enum Ranking {
    #[default]
    Slack,
    /// Effort left after keeping one day of slack.
    Effort,
    /// Days until slack drops to 1.
    Days,
    Start,
}

impl Ranking {
    fn heuristic(self, dedication: Amount) -> Box<dyn Heuristic> {
        match self {
            Ranking::Slack => Box::new(SlackHeuristic::new(dedication)),
            Ranking::Effort => Box::new(RemainingEffortHeuristic::new(dedication, 1.0)),
            Ranking::Days => Box::new(DaysToThresholdHeuristic::new(dedication, 1.0)),
            Ranking::Start => Box::new(StartTimeHeuristic),
        }
    }
}

impl std::str::FromStr for Ranking {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        <Ranking as ValueEnum>::from_str(s, true).map_err(|e| anyhow::anyhow!(e))
    }
}

/// Optional fields for `add`.
#[derive(Debug, Clone, Default)]
pub struct NewTask {
    pub description: String,
    pub context: Option<String>,
    pub cost: Option<String>,
    pub due: Option<String>,
    pub start: Option<String>,
}

fn task_line(t: &Task) -> String {
    let mut s = format!("[{}] {} | {} left, due {}", t.id, t.description, t.total_cost, t.due);
    if !t.context.is_empty() {
        let _ = write!(s, " @{}", t.context);
    }
    s
}

fn find<'a>(store: &'a mut TaskStore, id: &str) -> Result<&'a mut Task> {
    store.get_mut(id).with_context(|| format!("no task with id {id}"))
}

fn positive_amount(s: &str) -> Result<Amount> {
    let a: Amount = s.parse()?;
    if a <= Amount::ZERO {
        bail!("amount must be positive, got {a}");
    }
    Ok(a)
}

pub fn list(store: &TaskStore, engine: &Engine, now: Point, ranking: Ranking, limit: usize) -> String {
    let active = store.active(now);
    if active.is_empty() {
        return "No active tasks.\n".to_string();
    }
    let h = ranking.heuristic(engine.dedication);
    let mut out = format!("By {} ({} active):\n", h.label(), active.len());
    for (i, (t, _)) in h.sort(&active, now).into_iter().take(limit).enumerate() {
        let _ = writeln!(out, "{:>2}. {} | {}", i + 1, h.comment(t, now), task_line(t));
    }
    out
}

pub fn next(store: &TaskStore, engine: &Engine, now: Point) -> String {
    let active = store.active(now);
    let decision = engine.gtd.decide(&active, now);
    if decision.tasks.is_empty() {
        return format!("Nothing to do: {}.\n", decision.reason);
    }
    let mut out = format!("Next ({}):\n", decision.reason);
    for t in &decision.tasks {
        let _ = writeln!(out, "- {}", task_line(t));
    }
    out
}

pub fn schedule(store: &mut TaskStore, engine: &Engine, now: Point, id: &str, param: &str) -> Result<String> {
    let task = store.get(id).cloned().with_context(|| format!("no task with id {id}"))?;
    let parts = engine.scheduler.schedule(task, param, store, now);

    let mut out = String::new();
    if let [only] = parts.as_slice() {
        let _ = writeln!(
            out,
            "Scheduled [{}]: severity {:.2}, due {}",
            only.id, only.severity, only.due
        );
    } else {
        let _ = writeln!(out, "Split [{id}] into {} parts:", parts.len());
        for p in &parts {
            let _ = writeln!(out, "- {}", task_line(p));
        }
    }
    store.replace_with(id, parts);
    Ok(out)
}

pub fn invest(store: &mut TaskStore, id: &str, amount: &str) -> Result<String> {
    let amount = positive_amount(amount)?;
    let t = find(store, id)?;
    t.invest(amount);
    Ok(format!(
        "Invested {amount} in [{}]: {} left, {} spent\n",
        t.id, t.total_cost, t.invested_effort
    ))
}

pub fn done(store: &mut TaskStore, id: &str) -> Result<String> {
    let t = find(store, id)?;
    if t.is_done() {
        return Ok(format!("Already done: [{}] {}\n", t.id, t.description));
    }
    t.mark_done();
    Ok(format!("Done: [{}] {}\n", t.id, t.description))
}

pub fn postpone(store: &mut TaskStore, id: &str, amount: &str) -> Result<String> {
    let amount = positive_amount(amount)?;
    let t = find(store, id)?;
    t.postpone(amount);
    Ok(format!("Postponed [{}] by {amount}: starts {}, due {}\n", t.id, t.start, t.due))
}

pub fn add(store: &mut TaskStore, now: Point, new: NewTask) -> Result<String> {
    if new.description.trim().is_empty() {
        bail!("description is empty");
    }
    let start = match &new.start {
        Some(s) => s.parse::<Point>()?,
        None => now,
    };
    let due = new.due.as_deref().map(str::parse::<Point>).transpose()?;
    if due.is_some_and(|d| d < start) {
        bail!("due date is before start");
    }
    let cost = new.cost.as_deref().map(positive_amount).transpose()?;

    let t = store.add(new.description.trim(), start);
    if let Some(d) = due {
        t.due = d;
    }
    if let Some(c) = cost {
        t.total_cost = c;
    }
    if let Some(ctx) = new.context {
        t.context = ctx;
    }
    Ok(format!("Added {}\n", task_line(t)))
}

pub fn import(store: &mut TaskStore, now: Point, markdown: &str) -> Result<String> {
    let tasks = parse_markdown(markdown, now)?;
    let n = tasks.len();
    let summary = store.merge(tasks);
    Ok(format!(
        "Imported {n} tasks ({} added, {} updated)\n",
        summary.added, summary.updated
    ))
}

pub fn workload(store: &TaskStore, engine: &Engine, now: Point) -> String {
    triage_core::workload(&store.pending(), engine.dedication, now).to_string()
}

pub fn agenda(store: &TaskStore, engine: &Engine, now: Point) -> String {
    render_agenda(&store.pending(), engine.dedication, now)
}
