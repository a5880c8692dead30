//! Task filters: order-preserving subset selection.

use crate::task::Task;
use crate::time::Point;

pub trait TaskFilter: Send + Sync {
    fn filter<'a>(&self, tasks: Vec<&'a Task>, now: Point) -> Vec<&'a Task>;
}

/// Tasks whose start time has been reached.
#[derive(Debug, Clone, Copy, Default)]
pub struct ActiveTaskFilter;

impl TaskFilter for ActiveTaskFilter {
    fn filter<'a>(&self, tasks: Vec<&'a Task>, now: Point) -> Vec<&'a Task> {
        tasks.into_iter().filter(|t| t.is_active(now)).collect()
    }
}

/// Exact complement of [`ActiveTaskFilter`].
#[derive(Debug, Clone, Copy, Default)]
pub struct InactiveTaskFilter;

impl TaskFilter for InactiveTaskFilter {
    fn filter<'a>(&self, tasks: Vec<&'a Task>, now: Point) -> Vec<&'a Task> {
        tasks.into_iter().filter(|t| !t.is_active(now)).collect()
    }
}

/// Tasks not marked done.
#[derive(Debug, Clone, Copy, Default)]
pub struct OpenTaskFilter;

impl TaskFilter for OpenTaskFilter {
    fn filter<'a>(&self, tasks: Vec<&'a Task>, _now: Point) -> Vec<&'a Task> {
        tasks.into_iter().filter(|t| !t.is_done()).collect()
    }
}

/// Case-sensitive context prefix match, applied after an optional prefilter.
pub struct ContextPrefixTaskFilter {
    prefilter: Option<Box<dyn TaskFilter>>,
    prefix: String,
}

impl ContextPrefixTaskFilter {
    pub fn new(prefix: impl Into<String>) -> Self {
        Self {
            prefilter: None,
            prefix: prefix.into(),
        }
    }

    pub fn with_prefilter(prefilter: Box<dyn TaskFilter>, prefix: impl Into<String>) -> Self {
        Self {
            prefilter: Some(prefilter),
            prefix: prefix.into(),
        }
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }
}

impl TaskFilter for ContextPrefixTaskFilter {
    fn filter<'a>(&self, tasks: Vec<&'a Task>, now: Point) -> Vec<&'a Task> {
        let tasks = match &self.prefilter {
            Some(pre) => pre.filter(tasks, now),
            None => tasks,
        };
        tasks
            .into_iter()
            .filter(|t| t.context.starts_with(&self.prefix))
            .collect()
    }
}

/// Active tasks with at least a day of runway, i.e. the ones that count
/// toward daily workload. Tasks due today are already committed.
#[derive(Debug, Clone, Copy, Default)]
pub struct WorkloadAbleFilter {
    active: ActiveTaskFilter,
}

impl WorkloadAbleFilter {
    pub fn new(active: ActiveTaskFilter) -> Self {
        Self { active }
    }
}

impl TaskFilter for WorkloadAbleFilter {
    fn filter<'a>(&self, tasks: Vec<&'a Task>, now: Point) -> Vec<&'a Task> {
        self.active
            .filter(tasks, now)
            .into_iter()
            .filter(|t| t.remaining_time(now).as_days() >= 1.0)
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::time::Amount;

    fn at(s: &str) -> Point {
        s.parse().unwrap()
    }

    fn fixture(now: Point) -> Vec<Task> {
        vec![
            Task::new("past", "a", now - Amount::from_days(2.0)).with_context("work/desk"),
            Task::new("now", "b", now).with_context("home"),
            Task::new("future", "c", now + Amount::from_days(1.0)).with_context("work/phone"),
            Task::new("past2", "d", now - Amount::from_hours(1)).with_context("Work/desk"),
        ]
    }

    fn ids(tasks: &[&Task]) -> Vec<String> {
        tasks.iter().map(|t| t.id.clone()).collect()
    }

    #[test]
    fn active_and_inactive_partition_the_input() {
        let now = at("2026-03-10 12:00:00");
        let tasks = fixture(now);
        let all: Vec<&Task> = tasks.iter().collect();

        let active = ActiveTaskFilter.filter(all.clone(), now);
        let inactive = InactiveTaskFilter.filter(all.clone(), now);
        assert_eq!(ids(&active), vec!["past", "now", "past2"]);
        assert_eq!(ids(&inactive), vec!["future"]);
        assert_eq!(active.len() + inactive.len(), all.len());
    }

    #[test]
    fn active_filter_is_idempotent() {
        let now = at("2026-03-10 12:00:00");
        let tasks = fixture(now);
        let once = ActiveTaskFilter.filter(tasks.iter().collect(), now);
        let twice = ActiveTaskFilter.filter(once.clone(), now);
        assert_eq!(ids(&once), ids(&twice));
    }

    #[test]
    fn context_prefix_is_case_sensitive_and_composes() {
        let now = at("2026-03-10 12:00:00");
        let tasks = fixture(now);

        let plain = ContextPrefixTaskFilter::new("work");
        assert_eq!(ids(&plain.filter(tasks.iter().collect(), now)), vec!["past", "future"]);

        let active_work = ContextPrefixTaskFilter::with_prefilter(Box::new(ActiveTaskFilter), "work");
        assert_eq!(ids(&active_work.filter(tasks.iter().collect(), now)), vec!["past"]);
    }

    #[test]
    fn open_filter_drops_done_tasks() {
        let now = at("2026-03-10");
        let mut tasks = fixture(now);
        tasks[1].mark_done();
        let open = OpenTaskFilter.filter(tasks.iter().collect(), now);
        assert_eq!(ids(&open), vec!["past", "future", "past2"]);
    }

    #[test]
    fn workload_filter_excludes_tasks_without_a_day_of_runway() {
        let now = at("2026-03-10 12:00:00");
        let tasks = vec![
            Task::new("roomy", "a", now).with_due(now + Amount::from_days(3.0)),
            Task::new("today", "b", now).with_due(now),
            Task::new("late", "c", now - Amount::from_days(3.0)).with_due(now - Amount::from_days(1.0)),
            Task::new("soon", "d", now).with_due(now + Amount::from_hours(2)),
            Task::new("not-started", "e", now + Amount::from_days(1.0))
                .with_due(now + Amount::from_days(5.0)),
        ];
        let picked = WorkloadAbleFilter::default().filter(tasks.iter().collect(), now);
        assert_eq!(ids(&picked), vec!["roomy", "soon"]);
    }
}
