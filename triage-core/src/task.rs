//! Task model shared by heuristics, filters and scheduling.

use serde::{Deserialize, Serialize};

use crate::time::{Amount, Point};

/// Single-character status code. Unknown codes are kept as-is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "char", into = "char")]
pub enum TaskStatus {
    /// `' '`
    Open,
    /// `'x'`
    Done,
    Other(char),
}

impl TaskStatus {
    pub fn code(&self) -> char {
        match self {
            TaskStatus::Open => ' ',
            TaskStatus::Done => 'x',
            TaskStatus::Other(c) => *c,
        }
    }
}

impl From<char> for TaskStatus {
    fn from(c: char) -> Self {
        match c {
            ' ' => TaskStatus::Open,
            'x' | 'X' => TaskStatus::Done,
            other => TaskStatus::Other(other),
        }
    }
}

impl From<TaskStatus> for char {
    fn from(s: TaskStatus) -> char {
        s.code()
    }
}

/// Core task type.
///
/// `total_cost` is the effort still remaining; `invested_effort` is what has
/// already been spent. Storage is a separate layer (see `triage-store`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Task {
    pub id: String,
    pub description: String,

    /// Free-form tag used for category matching, e.g. `work/desk`.
    #[serde(default)]
    pub context: String,

    pub start: Point,
    pub due: Point,

    /// Urgency multiplier, > 0.
    pub severity: f64,

    pub total_cost: Amount,
    #[serde(default)]
    pub invested_effort: Amount,

    pub status: TaskStatus,

    /// Exempt from being surfaced as urgent busywork.
    #[serde(default)]
    pub calm: bool,
}

impl Task {
    /// Open task starting at `start`, due a day later, one pomodoro of effort.
    pub fn new(id: impl Into<String>, description: impl Into<String>, start: Point) -> Self {
        Self {
            id: id.into(),
            description: description.into(),
            context: String::new(),
            start,
            due: start + Amount::from_days(1.0),
            severity: 1.0,
            total_cost: Amount::from_pomodoros(1.0),
            invested_effort: Amount::ZERO,
            status: TaskStatus::Open,
            calm: false,
        }
    }

    pub fn with_context(mut self, context: impl Into<String>) -> Self {
        self.context = context.into();
        self
    }

    pub fn with_due(mut self, due: Point) -> Self {
        self.due = due;
        self
    }

    pub fn with_cost(mut self, cost: Amount) -> Self {
        self.total_cost = cost;
        self
    }

    pub fn with_severity(mut self, severity: f64) -> Self {
        self.severity = severity;
        self
    }

    pub fn with_calm(mut self, calm: bool) -> Self {
        self.calm = calm;
        self
    }

    /// Days left until `due`, rounded up to whole days plus half a day of slack.
    ///
    /// Never below 0.5 days, even for overdue tasks.
    pub fn remaining_time(&self, now: Point) -> Amount {
        let days = (self.due - now).as_days().max(0.0);
        Amount::from_days(days.ceil() + 0.5)
    }

    pub fn is_done(&self) -> bool {
        self.status == TaskStatus::Done
    }

    pub fn is_active(&self, now: Point) -> bool {
        self.start <= now
    }

    pub fn is_overdue(&self, now: Point) -> bool {
        self.due < now
    }

    pub fn mark_done(&mut self) {
        self.status = TaskStatus::Done;
    }

    /// Move `amount` of effort from remaining cost to invested effort.
    ///
    /// Remaining cost bottoms out at zero; anything beyond that is still
    /// recorded as invested.
    pub fn invest(&mut self, amount: Amount) {
        self.invested_effort += amount;
        self.total_cost = (self.total_cost - amount).max(Amount::ZERO);
    }

    /// Shift both start and due by `amount`.
    pub fn postpone(&mut self, amount: Amount) {
        self.start = self.start + amount;
        self.due = self.due + amount;
    }
}
