//! Markdown task lists.
//!
//! One task per checkbox line, fields as inline `[key:: value]` pairs:
//!
//! ```text
//! ## Work
//! - [ ] write report [due:: 2026-03-15] [cost:: 6p]
//! - [x] file expenses [id:: t4] [context:: work/admin]
//! ```
//!
//! A heading sets the default context for the lines under it.

use std::sync::LazyLock;

use anyhow::{Context, Result, bail};
use regex::Regex;
use tracing::debug;
use triage_core::{Amount, Point, Task, TaskStatus};

static TASK_LINE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\s*[-*]\s+\[(.)\]\s+(.*)$").expect("valid regex"));
static FIELD: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\[(\w+)::\s*([^\]]*?)\s*\]").expect("valid regex"));
static HEADING: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^#{1,6}\s+(.+?)\s*$").expect("valid regex"));

#[derive(Debug, Default)]
struct Fields {
    id: Option<String>,
    start: Option<Point>,
    due: Option<Point>,
    cost: Option<Amount>,
    invested: Option<Amount>,
    severity: Option<f64>,
    context: Option<String>,
    calm: Option<bool>,
}

impl Fields {
    fn set(&mut self, key: &str, value: &str) -> Result<()> {
        match key {
            "id" => self.id = Some(value.to_string()),
            "start" => self.start = Some(value.parse()?),
            "due" => self.due = Some(value.parse()?),
            "cost" => self.cost = Some(value.parse()?),
            "invested" => self.invested = Some(value.parse()?),
            "severity" => {
                let s: f64 = value.parse().with_context(|| format!("bad severity {value:?}"))?;
                if s.is_nan() || s <= 0.0 {
                    bail!("severity must be positive, got {value}");
                }
                self.severity = Some(s);
            }
            "context" => self.context = Some(value.to_string()),
            "calm" => self.calm = Some(matches!(value, "true" | "yes" | "1")),
            other => debug!(key = other, "ignoring unknown task field"),
        }
        Ok(())
    }
}

/// Parse every checkbox line in `md`. Missing fields default as for a new
/// task created at `now`; tasks without an `id` field get an empty id.
pub fn parse_markdown(md: &str, now: Point) -> Result<Vec<Task>> {
    let mut section_context = String::new();
    let mut out = Vec::new();

    for (lineno, line) in md.lines().enumerate() {
        if let Some(caps) = HEADING.captures(line) {
            section_context = context_from_heading(&caps[1]);
            continue;
        }
        let Some(caps) = TASK_LINE.captures(line) else {
            continue;
        };
        let status_char = caps[1].chars().next().unwrap_or(' ');
        let rest = &caps[2];

        let mut fields = Fields::default();
        for f in FIELD.captures_iter(rest) {
            fields
                .set(&f[1], &f[2])
                .with_context(|| format!("line {}: field {}", lineno + 1, &f[1]))?;
        }

        let description = FIELD
            .replace_all(rest, "")
            .split_whitespace()
            .collect::<Vec<_>>()
            .join(" ");
        if description.is_empty() {
            bail!("line {}: task has no description", lineno + 1);
        }

        let start = fields.start.unwrap_or(now);
        let mut task = Task::new(fields.id.unwrap_or_default(), description, start);
        task.status = TaskStatus::from(status_char);
        task.context = fields.context.unwrap_or_else(|| section_context.clone());
        if let Some(due) = fields.due {
            task.due = due;
        }
        if let Some(cost) = fields.cost {
            task.total_cost = cost;
        }
        if let Some(invested) = fields.invested {
            task.invested_effort = invested;
        }
        if let Some(severity) = fields.severity {
            task.severity = severity;
        }
        if let Some(calm) = fields.calm {
            task.calm = calm;
        }
        out.push(task);
    }

    debug!(count = out.len(), "parsed markdown tasks");
    Ok(out)
}

/// "Deep Work" -> "deep-work".
fn context_from_heading(heading: &str) -> String {
    heading
        .split_whitespace()
        .map(str::to_lowercase)
        .collect::<Vec<_>>()
        .join("-")
}

pub fn to_markdown_line(task: &Task) -> String {
    let mut line = format!(
        "- [{}] {} [start:: {}] [due:: {}] [cost:: {}]",
        task.status.code(),
        task.description,
        task.start,
        task.due,
        task.total_cost
    );
    if task.invested_effort != Amount::ZERO {
        line.push_str(&format!(" [invested:: {}]", task.invested_effort));
    }
    if task.severity != 1.0 {
        line.push_str(&format!(" [severity:: {}]", task.severity));
    }
    if !task.context.is_empty() {
        line.push_str(&format!(" [context:: {}]", task.context));
    }
    if task.calm {
        line.push_str(" [calm:: true]");
    }
    if !task.id.is_empty() {
        line.push_str(&format!(" [id:: {}]", task.id));
    }
    line
}
