//! Daily workload: the pace each schedulable task needs to finish on time,
//! summed and compared against the daily dedication.

use std::fmt;

use crate::filter::{TaskFilter, WorkloadAbleFilter};
use crate::task::Task;
use crate::time::{Amount, Point};

#[derive(Debug, Clone, PartialEq)]
pub struct WorkloadEntry<'a> {
    pub task: &'a Task,
    /// Pomodoros per day needed to finish by `due`.
    pub pace: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct WorkloadReport<'a> {
    pub entries: Vec<WorkloadEntry<'a>>,
    pub required_per_day: f64,
    pub dedication: f64,
}

impl WorkloadReport<'_> {
    /// Required pace over dedication; above 1.0 means over-committed.
    pub fn utilization(&self) -> f64 {
        if self.dedication > 0.0 {
            self.required_per_day / self.dedication
        } else {
            0.0
        }
    }
}

pub fn workload<'a>(tasks: &[&'a Task], dedication: Amount, now: Point) -> WorkloadReport<'a> {
    let candidates: Vec<&Task> = tasks.iter().copied().filter(|t| !t.is_done()).collect();
    let mut entries: Vec<WorkloadEntry<'a>> = WorkloadAbleFilter::default()
        .filter(candidates, now)
        .into_iter()
        .map(|task| WorkloadEntry {
            task,
            pace: task.total_cost.as_pomodoros() / task.remaining_time(now).as_days(),
        })
        .collect();
    entries.sort_by(|a, b| b.pace.total_cmp(&a.pace));

    let required_per_day = entries.iter().map(|e| e.pace).sum();
    WorkloadReport {
        entries,
        required_per_day,
        dedication: dedication.as_pomodoros(),
    }
}

impl fmt::Display for WorkloadReport<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "Workload: {:.1}p/day of {:.1}p/day ({:.0}%)",
            self.required_per_day,
            self.dedication,
            self.utilization() * 100.0
        )?;
        for e in &self.entries {
            writeln!(
                f,
                "- {:.2}p/day | {} | {} left, due {}",
                e.pace, e.task.description, e.task.total_cost, e.task.due
            )?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn at(s: &str) -> Point {
        s.parse().unwrap()
    }

    #[test]
    fn sums_pace_of_schedulable_tasks_only() {
        let now = at("2026-03-10");
        let start = now - Amount::from_days(1.0);
        let tasks = vec![
            // d = 3.5
            Task::new("a", "essay", start)
                .with_due(now + Amount::from_days(3.0))
                .with_cost(Amount::from_pomodoros(7.0)),
            // d = 1.5
            Task::new("b", "slides", start)
                .with_due(now + Amount::from_days(1.0))
                .with_cost(Amount::from_pomodoros(6.0)),
            // due now, excluded
            Task::new("c", "call", start).with_due(now),
        ];
        let mut done = Task::new("d", "done", start).with_due(now + Amount::from_days(9.0));
        done.mark_done();

        let mut refs: Vec<&Task> = tasks.iter().collect();
        refs.push(&done);

        let report = workload(&refs, Amount::from_pomodoros(8.0), now);
        let ids: Vec<&str> = report.entries.iter().map(|e| e.task.id.as_str()).collect();
        assert_eq!(ids, vec!["b", "a"]);
        assert!((report.required_per_day - 6.0).abs() < 1e-9);
        assert!((report.utilization() - 0.75).abs() < 1e-9);
        assert!(report.to_string().starts_with("Workload: 6.0p/day of 8.0p/day (75%)"));
    }
}
