use triage_core::{
    Amount, Clock, FixedClock, GtdAlgorithm, GtdSettings, Heuristic, Point, Reason, Scheduler,
    SlackHeuristic, Task, TaskFactory, active_open,
};

fn at(s: &str) -> Point {
    s.parse().unwrap()
}

fn p(n: f64) -> Amount {
    Amount::from_pomodoros(n)
}

struct Ids(u32);

impl TaskFactory for Ids {
    fn create(&mut self, description: &str, now: Point) -> Task {
        self.0 += 1;
        Task::new(format!("n{}", self.0), description, now)
    }
}

fn ids(tasks: &[&Task]) -> Vec<String> {
    tasks.iter().map(|t| t.id.clone()).collect()
}

#[test]
fn cascade_walks_from_heuristic_pass_to_default() {
    let clock = FixedClock(at("2026-03-10 09:00"));
    let now = clock.now();
    let dedication = p(4.0);
    let gtd = GtdAlgorithm::from_settings(&GtdSettings::default(), dedication);

    let mut tasks = vec![
        // slack 4*6 / (4*2.5 - 6) = 6
        Task::new("a", "draft proposal", at("2026-03-01"))
            .with_due(at("2026-03-12 09:00"))
            .with_cost(p(6.0))
            .with_context("work/desk"),
        // slack 4*3 / (4*1.5 - 3) = 4
        Task::new("b", "fix bike", at("2026-03-01"))
            .with_due(at("2026-03-11 09:00"))
            .with_cost(p(3.0))
            .with_context("home/garage"),
        // no slack at all, but calm
        Task::new("c", "read novel", at("2026-03-01"))
            .with_due(at("2026-03-11 09:00"))
            .with_cost(p(10.0))
            .with_calm(true),
        // not started yet
        Task::new("d", "taxes", at("2026-03-20")).with_due(at("2026-03-21")),
    ];

    let decision = gtd.decide(&active_open(&tasks, now), now);
    assert_eq!(ids(&decision.tasks), vec!["a"]);
    assert_eq!(decision.reason.to_string(), "slack >= 2 (at work)");

    tasks[0].mark_done();
    let decision = gtd.decide(&active_open(&tasks, now), now);
    assert_eq!(ids(&decision.tasks), vec!["b"]);
    assert_eq!(
        decision.reason,
        Reason::Heuristic {
            heuristic: "slack".to_string(),
            threshold: 2.0,
            category: Some("at home".to_string()),
        }
    );

    // only the calm task is left: skipped by every pass, picked by the default
    tasks[1].mark_done();
    let decision = gtd.decide(&active_open(&tasks, now), now);
    assert_eq!(ids(&decision.tasks), vec!["c"]);
    assert!(matches!(decision.reason, Reason::Default { .. }));

    // overdue beats everything once it exists
    tasks[1].status = triage_core::TaskStatus::Open;
    let later = at("2026-03-11 12:00");
    let decision = gtd.decide(&active_open(&tasks, later), later);
    assert_eq!(ids(&decision.tasks), vec!["b"]);
    assert_eq!(decision.reason.to_string(), "overdue (at home)");
}

#[test]
fn slack_of_a_week_out_task() {
    let now = at("2026-03-10");
    let task = Task::new("t", "report", now)
        .with_due(at("2026-03-17"))
        .with_cost(p(10.0));
    // whole days plus the half-day pad, offset back to 7 days
    let h = SlackHeuristic::with_offset(p(4.0), 0.5);
    assert_eq!(h.evaluate(&task, now), 2.22);
    assert_eq!(h.comment(&task, now), "2.22p/day");
}

#[test]
fn schedule_then_decide_uses_the_parts() {
    let now = at("2026-03-01");
    let dedication = p(3.0);
    let scheduler = Scheduler::new(dedication);
    let task = Task::new("t1", "migrate database", now)
        .with_cost(p(10.0))
        .with_context("work/ops");

    let parts = scheduler.schedule(task, "10", &mut Ids(0), now);
    assert_eq!(parts.len(), 4);
    assert_eq!(
        parts.iter().map(|t| t.id.as_str()).collect::<Vec<_>>(),
        vec!["t1", "n1", "n2", "n3"]
    );
    let total: f64 = parts.iter().map(|t| t.total_cost.pomodoros()).sum();
    assert!((total - 10.0).abs() < 1e-9);

    let gtd = GtdAlgorithm::from_settings(&GtdSettings::default(), dedication);
    let decision = gtd.decide(&active_open(&parts, now), now);
    assert!(!decision.tasks.is_empty());
    assert!(decision.tasks.iter().all(|t| t.context == "work/ops"));
}

#[test]
fn empty_collection_is_not_an_error() {
    let now = at("2026-03-10");
    let gtd = GtdAlgorithm::from_settings(&GtdSettings::default(), p(8.0));
    let decision = gtd.decide(&active_open(&[], now), now);
    assert!(decision.tasks.is_empty());
    assert_eq!(decision.reason, Reason::NoTasks);
}
