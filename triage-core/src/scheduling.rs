//! Scheduling: derive severity and due date from a daily effort budget,
//! splitting tasks that are too big for the requested pace.
//!
//! The task is taken by value and handed back as the first element of the
//! result; extra parts come from a [`TaskFactory`]. The caller persists all of
//! them.

use tracing::{debug, warn};

use crate::task::Task;
use crate::time::{Amount, Point};

/// Creates fresh tasks for split parts.
pub trait TaskFactory {
    fn create(&mut self, description: &str, now: Point) -> Task;
}

/// Parsed scheduling parameter.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Pace {
    Auto,
    /// Effort to spend on this task per day.
    EffortPerDay(Amount),
}

impl Pace {
    /// `""`/`auto` → auto; a bare number is pomodoros per day; any amount
    /// (`2h`, `3p`) is effort per day. Anything else falls back to auto.
    pub fn parse(param: &str) -> Self {
        let param = param.trim();
        if param.is_empty() || param.eq_ignore_ascii_case("auto") {
            return Pace::Auto;
        }
        match param.parse::<Amount>() {
            Ok(effort) if effort > Amount::ZERO => Pace::EffortPerDay(effort),
            Ok(effort) => {
                warn!(%param, %effort, "schedule pace must be positive, using auto");
                Pace::Auto
            }
            Err(e) => {
                warn!(%param, error = %e, "unparseable schedule pace, using auto");
                Pace::Auto
            }
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Scheduler {
    dedication: Amount,
}

impl Scheduler {
    pub fn new(dedication: Amount) -> Self {
        Self { dedication }
    }

    pub fn schedule(
        &self,
        mut task: Task,
        param: &str,
        factory: &mut dyn TaskFactory,
        now: Point,
    ) -> Vec<Task> {
        let p = self.dedication.as_pomodoros();
        match Pace::parse(param) {
            Pace::Auto => {
                self.schedule_auto(&mut task, now);
                vec![task]
            }
            Pace::EffortPerDay(effort) => {
                let severity = p / effort.as_pomodoros();
                if severity >= 1.0 {
                    self.schedule_single(&mut task, severity);
                    vec![task]
                } else {
                    self.split(task, severity, factory, now)
                }
            }
        }
    }

    /// Severity from current slack; due date untouched. Never below 1.
    fn schedule_auto(&self, task: &mut Task, now: Point) {
        let p = self.dedication.as_pomodoros();
        let r = task.total_cost.as_pomodoros();
        let d = task.remaining_time(now).as_days();

        // r == 0 leaves nothing to pace
        let severity = if r > 0.0 {
            ((d * p - r) / (p * r)).max(1.0)
        } else {
            1.0
        };
        debug!(task = %task.id, severity, "auto schedule");
        task.severity = severity;
    }

    fn schedule_single(&self, task: &mut Task, severity: f64) {
        let p = self.dedication.as_pomodoros();
        let r = task.total_cost.as_pomodoros();
        let optimal_days = ((r * (p * severity + 1.0)) / p).ceil();

        task.due = task.start + Amount::from_days(optimal_days);
        task.severity = severity;
        debug!(task = %task.id, severity, optimal_days, due = %task.due, "scheduled");
    }

    fn split(&self, task: Task, severity: f64, factory: &mut dyn TaskFactory, now: Point) -> Vec<Task> {
        let p = self.dedication.as_pomodoros();
        let r = task.total_cost.as_pomodoros();
        let split_count = (1.0 / severity).ceil() as usize;

        let total = Amount::from_pomodoros(r);
        let per_split = Amount::from_pomodoros(r / split_count as f64);
        let description = task.description.clone();

        let mut parts = Vec::with_capacity(split_count);
        for _ in 1..split_count {
            let mut part = factory.create(&description, now);
            part.context = task.context.clone();
            part.start = task.start;
            part.due = task.due;
            part.severity = task.severity;
            part.total_cost = task.total_cost;
            part.invested_effort = task.invested_effort;
            part.status = task.status;
            part.calm = task.calm;
            parts.push(part);
        }
        parts.insert(0, task);

        // The last part absorbs rounding so the parts add up to `total`.
        let mut assigned = Amount::ZERO;
        for (i, part) in parts.iter_mut().enumerate() {
            part.description = format!("{description} {}/{split_count}", i + 1);
            part.total_cost = if i + 1 == split_count {
                total - assigned
            } else {
                per_split
            };
            assigned += part.total_cost;
            self.schedule_single(part, 1.0);
        }

        debug!(parts = split_count, %per_split, "split task");
        parts
    }
}
