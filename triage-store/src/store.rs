//! JSON-file task store.
//!
//! The whole collection lives in one pretty-printed JSON array. A missing
//! file is an empty store; writes go through a temp file and a rename.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use tracing::{debug, info};
use triage_core::{Point, Task, TaskFactory, active_open};

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MergeSummary {
    pub added: usize,
    pub updated: usize,
}

#[derive(Debug, Clone, Default)]
pub struct TaskStore {
    path: Option<PathBuf>,
    tasks: Vec<Task>,
    next_id: u64,
}

impl TaskStore {
    /// Store with no backing file; `save` is a no-op.
    pub fn in_memory(tasks: Vec<Task>) -> Self {
        let next_id = next_id_after(&tasks);
        Self {
            path: None,
            tasks,
            next_id,
        }
    }

    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let tasks = load_tasks(&path)?;
        debug!(path = %path.display(), count = tasks.len(), "opened task store");
        let next_id = next_id_after(&tasks);
        Ok(Self {
            path: Some(path),
            tasks,
            next_id,
        })
    }

    pub fn save(&self) -> Result<()> {
        let Some(path) = &self.path else {
            return Ok(());
        };
        if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
            fs::create_dir_all(dir).with_context(|| format!("create {}", dir.display()))?;
        }
        let json = serde_json::to_string_pretty(&self.tasks).context("serialize tasks")?;
        let tmp = path.with_extension("json.tmp");
        fs::write(&tmp, json).with_context(|| format!("write {}", tmp.display()))?;
        fs::rename(&tmp, path).with_context(|| format!("rename {} -> {}", tmp.display(), path.display()))?;
        info!(path = %path.display(), count = self.tasks.len(), "saved task store");
        Ok(())
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    pub fn tasks(&self) -> &[Task] {
        &self.tasks
    }

    pub fn into_tasks(self) -> Vec<Task> {
        self.tasks
    }

    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    /// Not-done tasks, started or not.
    pub fn pending(&self) -> Vec<&Task> {
        self.tasks.iter().filter(|t| !t.is_done()).collect()
    }

    /// Not-done tasks whose start has passed.
    pub fn active(&self, now: Point) -> Vec<&Task> {
        active_open(&self.tasks, now)
    }

    pub fn get(&self, id: &str) -> Option<&Task> {
        self.tasks.iter().find(|t| t.id == id)
    }

    pub fn get_mut(&mut self, id: &str) -> Option<&mut Task> {
        self.tasks.iter_mut().find(|t| t.id == id)
    }

    /// Insert or replace by id. A task without an id replaces the first
    /// stored task with the same description and context, or gets a fresh id.
    pub fn upsert(&mut self, mut task: Task) -> bool {
        if task.id.is_empty() {
            let same = self
                .tasks
                .iter()
                .find(|t| t.description == task.description && t.context == task.context)
                .map(|t| t.id.clone());
            task.id = same.unwrap_or_else(|| self.fresh_id());
        }
        match self.tasks.iter_mut().find(|t| t.id == task.id) {
            Some(existing) => {
                *existing = task;
                false
            }
            None => {
                self.tasks.push(task);
                true
            }
        }
    }

    /// Create and store a default task.
    pub fn add(&mut self, description: &str, now: Point) -> &mut Task {
        let task = self.create(description, now);
        self.tasks.push(task);
        let last = self.tasks.len() - 1;
        &mut self.tasks[last]
    }

    /// Replace the task `id` with `parts`, in place. Returns false if `id` is unknown.
    pub fn replace_with(&mut self, id: &str, parts: Vec<Task>) -> bool {
        let Some(idx) = self.tasks.iter().position(|t| t.id == id) else {
            return false;
        };
        self.tasks.splice(idx..=idx, parts);
        true
    }

    pub fn merge(&mut self, tasks: Vec<Task>) -> MergeSummary {
        let mut summary = MergeSummary::default();
        for t in tasks {
            if self.upsert(t) {
                summary.added += 1;
            } else {
                summary.updated += 1;
            }
        }
        summary
    }

    fn fresh_id(&mut self) -> String {
        let id = format!("t{}", self.next_id);
        self.next_id += 1;
        id
    }
}

impl TaskFactory for TaskStore {
    fn create(&mut self, description: &str, now: Point) -> Task {
        let id = self.fresh_id();
        Task::new(id, description, now)
    }
}

pub fn load_tasks(path: &Path) -> Result<Vec<Task>> {
    if !path.exists() {
        return Ok(Vec::new());
    }
    let s = fs::read_to_string(path).with_context(|| format!("read {}", path.display()))?;
    if s.trim().is_empty() {
        return Ok(Vec::new());
    }
    serde_json::from_str(&s).with_context(|| format!("parse {}", path.display()))
}

fn next_id_after(tasks: &[Task]) -> u64 {
    tasks
        .iter()
        .filter_map(|t| t.id.strip_prefix('t')?.parse::<u64>().ok())
        .max()
        .map_or(1, |n| n + 1)
}

#[cfg(test)]
mod tests {
    use super::*;
    use triage_core::Amount;

    fn now() -> Point {
        "2026-03-10".parse().unwrap()
    }

    #[test]
    fn missing_file_is_empty_store() {
        let dir = tempfile::tempdir().unwrap();
        let store = TaskStore::open(dir.path().join("tasks.json")).unwrap();
        assert!(store.is_empty());
    }

    #[test]
    fn save_then_open_roundtrips() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("tasks.json");

        let mut store = TaskStore::open(&path).unwrap();
        store.add("write essay", now()).total_cost = Amount::from_pomodoros(6.0);
        store.add("call bank", now()).context = "home/phone".to_string();
        store.save().unwrap();

        let back = TaskStore::open(&path).unwrap();
        assert_eq!(back.tasks(), store.tasks());
        assert_eq!(back.get("t1").unwrap().description, "write essay");
        assert_eq!(back.get("t2").unwrap().context, "home/phone");
    }

    #[test]
    fn pending_and_active_views() {
        let later = now() + Amount::from_days(2.0);
        let mut store = TaskStore::in_memory(vec![
            Task::new("t1", "now", now()),
            Task::new("t2", "later", later),
            Task::new("t3", "finished", now()),
        ]);
        store.get_mut("t3").unwrap().mark_done();

        let pending: Vec<&str> = store.pending().iter().map(|t| t.id.as_str()).collect();
        assert_eq!(pending, vec!["t1", "t2"]);
        let active: Vec<&str> = store.active(now()).iter().map(|t| t.id.as_str()).collect();
        assert_eq!(active, vec!["t1"]);
    }

    #[test]
    fn fresh_ids_continue_after_existing_ones() {
        let mut store = TaskStore::in_memory(vec![
            Task::new("t7", "a", now()),
            Task::new("custom", "b", now()),
        ]);
        let created = store.create("c", now());
        assert_eq!(created.id, "t8");
        assert_eq!(store.len(), 2, "create does not insert");
    }

    #[test]
    fn replace_with_splices_in_place() {
        let mut store = TaskStore::in_memory(vec![
            Task::new("t1", "a", now()),
            Task::new("t2", "b", now()),
            Task::new("t3", "c", now()),
        ]);
        let parts = vec![Task::new("t2", "b 1/2", now()), Task::new("t4", "b 2/2", now())];
        assert!(store.replace_with("t2", parts));
        let ids: Vec<&str> = store.tasks().iter().map(|t| t.id.as_str()).collect();
        assert_eq!(ids, vec!["t1", "t2", "t4", "t3"]);
        assert!(!store.replace_with("nope", vec![]));
    }

    #[test]
    fn merge_counts_added_and_updated() {
        let mut store = TaskStore::in_memory(vec![Task::new("t1", "a", now())]);
        let summary = store.merge(vec![
            Task::new("t1", "a (edited)", now()),
            Task::new("", "new", now()),
        ]);
        assert_eq!(summary, MergeSummary { added: 1, updated: 1 });
        assert_eq!(store.get("t1").unwrap().description, "a (edited)");
        assert_eq!(store.get("t2").unwrap().description, "new");
    }

    #[test]
    fn idless_tasks_match_on_description_and_context() {
        let mut store = TaskStore::in_memory(vec![Task::new("t1", "call bank", now()).with_context("home")]);
        let edited = Task::new("", "call bank", now())
            .with_context("home")
            .with_cost(Amount::from_pomodoros(2.0));
        let summary = store.merge(vec![edited, Task::new("", "call bank", now()).with_context("work")]);

        assert_eq!(summary, MergeSummary { added: 1, updated: 1 });
        assert_eq!(store.len(), 2);
        assert_eq!(store.get("t1").unwrap().total_cost, Amount::from_pomodoros(2.0));
        assert_eq!(store.get("t2").unwrap().context, "work");
    }
}
