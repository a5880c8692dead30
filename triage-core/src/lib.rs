//! triage-core: time values, task model, and the prioritization and
//! scheduling engine (heuristics, filters, GTD cascade, splitting).
//!
//! Everything here is synchronous and free of I/O. "Now" is always passed in,
//! usually read once from a [`Clock`].

pub mod agenda;
pub mod filter;
pub mod gtd;
pub mod heuristic;
pub mod scheduling;
pub mod task;
pub mod time;
pub mod workload;

pub use agenda::render_agenda;
pub use filter::{
    ActiveTaskFilter, ContextPrefixTaskFilter, InactiveTaskFilter, OpenTaskFilter, TaskFilter,
    WorkloadAbleFilter,
};
pub use gtd::{CategorySpec, Decision, GtdAlgorithm, GtdSettings, PassSpec, Reason};
pub use heuristic::{
    DaysToThresholdHeuristic, Heuristic, HeuristicSpec, MAX_URGENCY, RemainingEffortHeuristic,
    SlackHeuristic, StartTimeHeuristic,
};
pub use scheduling::{Pace, Scheduler, TaskFactory};
pub use task::{Task, TaskStatus};
pub use time::{Amount, Clock, FixedClock, Point, SystemClock};
pub use workload::{WorkloadEntry, WorkloadReport, workload};

/// Active, not-done tasks: the input the GTD cascade expects.
pub fn active_open<'a>(tasks: &'a [Task], now: Point) -> Vec<&'a Task> {
    let open = OpenTaskFilter.filter(tasks.iter().collect(), now);
    ActiveTaskFilter.filter(open, now)
}
