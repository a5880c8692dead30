//! Urgency heuristics.
//!
//! Every heuristic scores a single task against the current time; `sort`
//! ranks a batch (descending unless the heuristic says otherwise). Notation
//! used below: `p` dedication in pomodoros/day, `w` weight (always 1), `s`
//! severity, `r` remaining effort in pomodoros, `d` remaining time in days.
//!
//! Comments carry the unit of the score: slack is a daily pace (`2.22p/day`),
//! remaining effort an amount (`3.2p`), days-to-threshold a count of days
//! (`5 days`), and start time the start point itself.

use serde::{Deserialize, Serialize};

use crate::task::Task;
use crate::time::{Amount, Point};

/// Score used when a task has no computable slack left.
pub const MAX_URGENCY: f64 = 100.0;

/// Reserved weight.
const W: f64 = 1.0;

pub trait Heuristic: Send + Sync {
    /// Short label for justifications, e.g. `slack`.
    fn label(&self) -> String;

    fn evaluate(&self, task: &Task, now: Point) -> f64;

    fn comment(&self, task: &Task, now: Point) -> String;

    /// Whether lower scores rank first.
    fn ascending(&self) -> bool {
        false
    }

    /// Scores and ranks `tasks`. Ties keep their input order.
    fn sort<'a>(&self, tasks: &[&'a Task], now: Point) -> Vec<(&'a Task, f64)> {
        let mut scored: Vec<(&'a Task, f64)> =
            tasks.iter().map(|t| (*t, self.evaluate(t, now))).collect();
        if self.ascending() {
            scored.sort_by(|a, b| a.1.total_cmp(&b.1));
        } else {
            scored.sort_by(|a, b| b.1.total_cmp(&a.1));
        }
        scored
    }
}

fn round2(x: f64) -> f64 {
    (x * 100.0).round() / 100.0
}

/// Inputs every effort-based heuristic shares.
struct Terms {
    p: f64,
    s: f64,
    r: f64,
    d: f64,
}

impl Terms {
    fn of(dedication: Amount, task: &Task, now: Point) -> Self {
        Self {
            p: dedication.as_pomodoros(),
            s: task.severity,
            r: task.total_cost.as_pomodoros(),
            d: task.remaining_time(now).as_days(),
        }
    }
}

/// Ratio of required effort to spare capacity before the deadline.
///
/// Capped at [`MAX_URGENCY`] when less than a day remains or the capacity is
/// exhausted.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SlackHeuristic {
    dedication: Amount,
    days_offset: f64,
}

impl SlackHeuristic {
    pub fn new(dedication: Amount) -> Self {
        Self::with_offset(dedication, 0.0)
    }

    pub fn with_offset(dedication: Amount, days_offset: f64) -> Self {
        Self { dedication, days_offset }
    }
}

impl Heuristic for SlackHeuristic {
    fn label(&self) -> String {
        if self.days_offset == 0.0 {
            "slack".to_string()
        } else {
            format!("slack ({} days ahead)", self.days_offset)
        }
    }

    fn evaluate(&self, task: &Task, now: Point) -> f64 {
        let Terms { p, s, r, d } = Terms::of(self.dedication, task, now);
        let d = d - self.days_offset;
        if d < 1.0 {
            return MAX_URGENCY;
        }

        let denominator = p * d - r;
        if denominator == 0.0 {
            return MAX_URGENCY;
        }
        let h = (p * W * s * r) / denominator;
        if h <= 0.0 { MAX_URGENCY } else { round2(h) }
    }

    fn comment(&self, task: &Task, now: Point) -> String {
        let score = self.evaluate(task, now);
        if score >= MAX_URGENCY {
            "no slack".to_string()
        } else {
            format!("{score:.2}p/day")
        }
    }
}

/// Effort left beyond what the desired slack level can absorb.
///
/// `desired_slack` must be positive.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RemainingEffortHeuristic {
    dedication: Amount,
    desired_slack: f64,
}

impl RemainingEffortHeuristic {
    pub fn new(dedication: Amount, desired_slack: f64) -> Self {
        Self { dedication, desired_slack }
    }
}

impl Heuristic for RemainingEffortHeuristic {
    fn label(&self) -> String {
        format!("remaining effort at slack {}", self.desired_slack)
    }

    fn evaluate(&self, task: &Task, now: Point) -> f64 {
        let Terms { p, s, r, d } = Terms::of(self.dedication, task, now);
        r - (self.desired_slack * d * p) / (p * s * W + self.desired_slack)
    }

    fn comment(&self, task: &Task, now: Point) -> String {
        Amount::from_pomodoros(self.evaluate(task, now)).to_string()
    }
}

/// Days until the task would breach `threshold` slack.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DaysToThresholdHeuristic {
    dedication: Amount,
    threshold: f64,
}

impl DaysToThresholdHeuristic {
    pub fn new(dedication: Amount, threshold: f64) -> Self {
        Self { dedication, threshold }
    }
}

impl Heuristic for DaysToThresholdHeuristic {
    fn label(&self) -> String {
        format!("days to slack {}", self.threshold)
    }

    fn evaluate(&self, task: &Task, now: Point) -> f64 {
        let Terms { p, s, r, d } = Terms::of(self.dedication, task, now);
        d - (r * (p * s * W + self.threshold)) / (self.threshold * p)
    }

    fn comment(&self, task: &Task, now: Point) -> String {
        format!("{} days", self.evaluate(task, now).ceil())
    }
}

/// Chronological order by start time, earliest first.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct StartTimeHeuristic;

impl Heuristic for StartTimeHeuristic {
    fn label(&self) -> String {
        "start time".to_string()
    }

    fn evaluate(&self, task: &Task, _now: Point) -> f64 {
        (task.start.as_epoch_ms() / 1000) as f64
    }

    fn comment(&self, task: &Task, _now: Point) -> String {
        task.start.to_string()
    }

    fn ascending(&self) -> bool {
        true
    }
}

/// Config-level description of a heuristic; dedication is supplied at build time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum HeuristicSpec {
    Slack {
        #[serde(default)]
        days_offset: f64,
    },
    RemainingEffort {
        desired_slack: f64,
    },
    DaysToThreshold {
        threshold: f64,
    },
    StartTime,
}

impl HeuristicSpec {
    pub fn build(&self, dedication: Amount) -> Box<dyn Heuristic> {
        match *self {
            HeuristicSpec::Slack { days_offset } => {
                Box::new(SlackHeuristic::with_offset(dedication, days_offset))
            }
            HeuristicSpec::RemainingEffort { desired_slack } => {
                Box::new(RemainingEffortHeuristic::new(dedication, desired_slack))
            }
            HeuristicSpec::DaysToThreshold { threshold } => {
                Box::new(DaysToThresholdHeuristic::new(dedication, threshold))
            }
            HeuristicSpec::StartTime => Box::new(StartTimeHeuristic),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn at(s: &str) -> Point {
        s.parse().unwrap()
    }

    fn p(n: f64) -> Amount {
        Amount::from_pomodoros(n)
    }

    fn task_due_in(now: Point, days: f64, cost: f64) -> Task {
        Task::new("t", "task", now)
            .with_due(now + Amount::from_days(days))
            .with_cost(p(cost))
    }

    #[test]
    fn slack_scenario_seven_days_of_runway() {
        // A task due in 7 days has 7.5 days remaining; offsetting by half a
        // day gives d = 7: (4*1*1*10) / (4*7 - 10) = 40/18.
        let now = at("2026-03-01");
        let t = task_due_in(now, 7.0, 10.0);
        let h = SlackHeuristic::with_offset(p(4.0), 0.5);
        assert_eq!(h.evaluate(&t, now), 2.22);
        assert_eq!(h.comment(&t, now), "2.22p/day");
    }

    #[test]
    fn slack_caps_when_less_than_a_day_remains() {
        let now = at("2026-03-01");
        let t = task_due_in(now, -3.0, 1.0);
        assert_eq!(SlackHeuristic::new(p(4.0)).evaluate(&t, now), MAX_URGENCY);
        assert_eq!(SlackHeuristic::new(p(4.0)).comment(&t, now), "no slack");
    }

    #[test]
    fn slack_caps_on_zero_or_negative_capacity() {
        let now = at("2026-03-01");
        // d = 2.5, p = 4 -> capacity 10 == r
        let zero = task_due_in(now, 2.0, 10.0);
        assert_eq!(SlackHeuristic::new(p(4.0)).evaluate(&zero, now), MAX_URGENCY);
        // r > capacity -> negative h
        let negative = task_due_in(now, 2.0, 20.0);
        assert_eq!(SlackHeuristic::new(p(4.0)).evaluate(&negative, now), MAX_URGENCY);
    }

    #[test]
    fn slack_is_non_increasing_in_remaining_time() {
        let now = at("2026-03-01");
        for cost in [1.0, 5.0, 10.0, 30.0] {
            for severity in [0.5, 1.0, 3.0] {
                let mut prev = f64::INFINITY;
                for days in 0..60 {
                    let t = task_due_in(now, days as f64, cost).with_severity(severity);
                    let score = SlackHeuristic::new(p(4.0)).evaluate(&t, now);
                    assert!(score <= prev, "cost {cost} sev {severity} day {days}: {score} > {prev}");
                    prev = score;
                }
            }
        }
    }

    #[test]
    fn remaining_effort_formula() {
        let now = at("2026-03-01");
        // d = 3.5, p = 4, s = 1, r = 10, slack 2: 10 - (2*3.5*4)/(4+2)
        let t = task_due_in(now, 3.0, 10.0);
        let h = RemainingEffortHeuristic::new(p(4.0), 2.0);
        let expected = 10.0 - 28.0 / 6.0;
        assert!((h.evaluate(&t, now) - expected).abs() < 1e-9);
        // an amount, not a rate: 5.33p rounds up to 5.4p
        assert_eq!(h.comment(&t, now), "5.4p");
    }

    #[test]
    fn days_to_threshold_formula_and_comment() {
        let now = at("2026-03-01");
        // d = 10.5, p = 4, s = 1, r = 8, threshold 2: 10.5 - 8*6/8 = 4.5
        let t = task_due_in(now, 10.0, 8.0);
        let h = DaysToThresholdHeuristic::new(p(4.0), 2.0);
        assert!((h.evaluate(&t, now) - 4.5).abs() < 1e-9);
        assert_eq!(h.comment(&t, now), "5 days");
    }

    #[test]
    fn start_time_sorts_earliest_first() {
        let now = at("2026-03-10");
        let late = Task::new("late", "b", at("2026-03-05"));
        let early = Task::new("early", "a", at("2026-03-01"));
        let ranked = StartTimeHeuristic.sort(&[&late, &early], now);
        assert_eq!(ranked[0].0.id, "early");
        assert_eq!(ranked[1].0.id, "late");
    }

    #[test]
    fn sort_is_descending_and_stable_for_ties() {
        let now = at("2026-03-01");
        let a = task_due_in(now, 10.0, 2.0).with_context("a");
        let b = task_due_in(now, 10.0, 2.0).with_context("b");
        let urgent = task_due_in(now, 0.0, 2.0).with_context("urgent");
        let c = task_due_in(now, 10.0, 2.0).with_context("c");

        let ranked = SlackHeuristic::new(p(4.0)).sort(&[&a, &b, &urgent, &c], now);
        let order: Vec<&str> = ranked.iter().map(|(t, _)| t.context.as_str()).collect();
        assert_eq!(order, vec!["urgent", "a", "b", "c"]);
    }

    #[test]
    fn spec_builds_from_toml_shape() {
        let spec: HeuristicSpec =
            serde_json::from_str(r#"{"kind":"days_to_threshold","threshold":2.0}"#).unwrap();
        let h = spec.build(p(4.0));
        assert_eq!(h.label(), "days to slack 2");

        let slack: HeuristicSpec = serde_json::from_str(r#"{"kind":"slack"}"#).unwrap();
        assert_eq!(slack, HeuristicSpec::Slack { days_offset: 0.0 });
        assert!(HeuristicSpec::StartTime.build(p(4.0)).ascending());
    }
}
