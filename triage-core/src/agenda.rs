//! Markdown agenda: open tasks grouped by due day, most pressing first.

use std::collections::BTreeMap;
use std::fmt::Write;

use chrono::NaiveDate;

use crate::heuristic::{Heuristic, SlackHeuristic};
use crate::task::Task;
use crate::time::{Amount, Point};

pub fn render_agenda(tasks: &[&Task], dedication: Amount, now: Point) -> String {
    let slack = SlackHeuristic::new(dedication);

    let mut overdue: Vec<&Task> = Vec::new();
    let mut by_day: BTreeMap<NaiveDate, Vec<&Task>> = BTreeMap::new();
    for t in tasks.iter().copied().filter(|t| !t.is_done()) {
        if t.is_overdue(now) {
            overdue.push(t);
        } else {
            by_day.entry(t.due.date()).or_default().push(t);
        }
    }

    let mut out = String::new();
    if !overdue.is_empty() {
        out.push_str("## Overdue\n");
        write_section(&mut out, &slack, &overdue, now);
    }
    for (day, day_tasks) in &by_day {
        let _ = writeln!(out, "## {}", day.format("%Y-%m-%d"));
        write_section(&mut out, &slack, day_tasks, now);
    }
    if out.is_empty() {
        out.push_str("Nothing on the agenda.\n");
    }
    out
}

fn write_section(out: &mut String, slack: &SlackHeuristic, tasks: &[&Task], now: Point) {
    for (t, _) in slack.sort(tasks, now) {
        let _ = write!(
            out,
            "- [{}] {} ({}, slack {})",
            t.status.code(),
            t.description,
            t.total_cost,
            slack.comment(t, now)
        );
        if !t.context.is_empty() {
            let _ = write!(out, " @{}", t.context);
        }
        out.push('\n');
    }
    out.push('\n');
}

#[cfg(test)]
mod tests {
    use super::*;

    fn at(s: &str) -> Point {
        s.parse().unwrap()
    }

    #[test]
    fn groups_by_day_with_overdue_first() {
        let now = at("2026-03-10 09:00:00");
        let start = at("2026-03-01");
        let tasks = vec![
            Task::new("a", "later", start).with_due(at("2026-03-20")),
            Task::new("b", "late", start).with_due(at("2026-03-09")).with_context("home"),
            Task::new("c", "soon", start)
                .with_due(at("2026-03-12"))
                .with_cost(Amount::from_pomodoros(2.0)),
        ];
        let refs: Vec<&Task> = tasks.iter().collect();
        let agenda = render_agenda(&refs, Amount::from_pomodoros(8.0), now);

        let overdue = agenda.find("## Overdue").unwrap();
        let first_day = agenda.find("## 2026-03-12").unwrap();
        let second_day = agenda.find("## 2026-03-20").unwrap();
        assert!(overdue < first_day && first_day < second_day);
        assert!(agenda.contains("- [ ] late (1p, slack no slack) @home"));
        let soon = agenda.lines().find(|l| l.starts_with("- [ ] soon")).unwrap();
        assert!(soon.contains("(2p, slack ") && soon.contains("p/day)"), "{soon}");
    }

    #[test]
    fn empty_agenda_says_so() {
        let now = at("2026-03-10");
        assert_eq!(render_agenda(&[], Amount::from_pomodoros(8.0), now), "Nothing on the agenda.\n");
    }
}
