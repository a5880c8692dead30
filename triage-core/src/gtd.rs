//! GTD decision cascade: "what should I do right now, and why".
//!
//! Evaluated top to bottom, first non-empty result wins:
//! 1. overdue tasks, narrowed to the first category that matches any of them
//! 2. each `(heuristic, threshold)` pass in order, calm tasks dropped, same
//!    category narrowing
//! 3. the default pass over everything, no narrowing, calm tasks included
//!
//! A category list where nothing matches leaves the subset as is. The input is
//! expected to be the active, non-done task set.

use std::fmt;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::filter::{ContextPrefixTaskFilter, TaskFilter};
use crate::heuristic::{Heuristic, HeuristicSpec};
use crate::task::Task;
use crate::time::{Amount, Point};

/// A labelled context filter, e.g. "at the desk".
pub struct Category {
    pub label: String,
    pub filter: Box<dyn TaskFilter>,
}

pub struct Pass {
    pub heuristic: Box<dyn Heuristic>,
    pub threshold: f64,
}

impl Pass {
    fn select<'a>(&self, tasks: &[&'a Task], now: Point) -> Vec<&'a Task> {
        tasks
            .iter()
            .copied()
            .filter(|t| self.heuristic.evaluate(t, now) >= self.threshold)
            .collect()
    }
}

/// Why a decision picked what it picked.
#[derive(Debug, Clone, PartialEq)]
pub enum Reason {
    NoTasks,
    Overdue {
        category: Option<String>,
    },
    Heuristic {
        heuristic: String,
        threshold: f64,
        category: Option<String>,
    },
    Default {
        heuristic: String,
        threshold: f64,
    },
}

impl fmt::Display for Reason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Reason::NoTasks => write!(f, "nothing active right now"),
            Reason::Overdue { category } => {
                write!(f, "overdue")?;
                if let Some(c) = category {
                    write!(f, " ({c})")?;
                }
                Ok(())
            }
            Reason::Heuristic {
                heuristic,
                threshold,
                category,
            } => {
                write!(f, "{heuristic} >= {threshold}")?;
                if let Some(c) = category {
                    write!(f, " ({c})")?;
                }
                Ok(())
            }
            Reason::Default { heuristic, threshold } => {
                write!(f, "{heuristic} >= {threshold}, nothing more pressing")
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Decision<'a> {
    pub tasks: Vec<&'a Task>,
    pub reason: Reason,
}

pub struct GtdAlgorithm {
    categories: Vec<Category>,
    passes: Vec<Pass>,
    default: Pass,
}

impl GtdAlgorithm {
    pub fn new(default_heuristic: Box<dyn Heuristic>, default_threshold: f64) -> Self {
        Self {
            categories: Vec::new(),
            passes: Vec::new(),
            default: Pass {
                heuristic: default_heuristic,
                threshold: default_threshold,
            },
        }
    }

    pub fn with_category(mut self, label: impl Into<String>, filter: Box<dyn TaskFilter>) -> Self {
        self.categories.push(Category {
            label: label.into(),
            filter,
        });
        self
    }

    pub fn with_pass(mut self, heuristic: Box<dyn Heuristic>, threshold: f64) -> Self {
        self.passes.push(Pass { heuristic, threshold });
        self
    }

    pub fn from_settings(settings: &GtdSettings, dedication: Amount) -> Self {
        let mut gtd = Self::new(
            settings.default.heuristic.build(dedication),
            settings.default.threshold,
        );
        for c in &settings.categories {
            gtd = gtd.with_category(c.label.clone(), Box::new(ContextPrefixTaskFilter::new(c.prefix.clone())));
        }
        for p in &settings.passes {
            gtd = gtd.with_pass(p.heuristic.build(dedication), p.threshold);
        }
        gtd
    }

    pub fn decide<'a>(&self, tasks: &[&'a Task], now: Point) -> Decision<'a> {
        if tasks.is_empty() {
            return Decision {
                tasks: Vec::new(),
                reason: Reason::NoTasks,
            };
        }

        let overdue: Vec<&Task> = tasks.iter().copied().filter(|t| t.is_overdue(now)).collect();
        if !overdue.is_empty() {
            let (tasks, category) = self.narrow(overdue, now);
            debug!(count = tasks.len(), ?category, "gtd: overdue pass");
            return Decision {
                tasks,
                reason: Reason::Overdue { category },
            };
        }

        for pass in &self.passes {
            let matched: Vec<&Task> = pass
                .select(tasks, now)
                .into_iter()
                .filter(|t| !t.calm)
                .collect();
            if matched.is_empty() {
                continue;
            }
            let (tasks, category) = self.narrow(matched, now);
            let heuristic = pass.heuristic.label();
            debug!(count = tasks.len(), %heuristic, threshold = pass.threshold, ?category, "gtd: heuristic pass");
            return Decision {
                tasks,
                reason: Reason::Heuristic {
                    heuristic,
                    threshold: pass.threshold,
                    category,
                },
            };
        }

        let tasks = self.default.select(tasks, now);
        debug!(count = tasks.len(), "gtd: default pass");
        Decision {
            tasks,
            reason: Reason::Default {
                heuristic: self.default.heuristic.label(),
                threshold: self.default.threshold,
            },
        }
    }

    /// First category with a non-empty match wins; no match keeps everything.
    fn narrow<'a>(&self, tasks: Vec<&'a Task>, now: Point) -> (Vec<&'a Task>, Option<String>) {
        for c in &self.categories {
            let narrowed = c.filter.filter(tasks.clone(), now);
            if !narrowed.is_empty() {
                return (narrowed, Some(c.label.clone()));
            }
        }
        (tasks, None)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CategorySpec {
    pub label: String,
    pub prefix: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PassSpec {
    pub heuristic: HeuristicSpec,
    pub threshold: f64,
}

/// Serializable cascade layout, as found in `config.toml`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GtdSettings {
    #[serde(default)]
    pub categories: Vec<CategorySpec>,
    #[serde(default)]
    pub passes: Vec<PassSpec>,
    pub default: PassSpec,
}

impl Default for GtdSettings {
    fn default() -> Self {
        Self {
            categories: vec![
                CategorySpec {
                    label: "at work".to_string(),
                    prefix: "work".to_string(),
                },
                CategorySpec {
                    label: "at home".to_string(),
                    prefix: "home".to_string(),
                },
            ],
            passes: vec![
                PassSpec {
                    heuristic: HeuristicSpec::Slack { days_offset: 0.0 },
                    threshold: 2.0,
                },
                PassSpec {
                    heuristic: HeuristicSpec::Slack { days_offset: 0.0 },
                    threshold: 1.0,
                },
                PassSpec {
                    heuristic: HeuristicSpec::RemainingEffort { desired_slack: 1.0 },
                    threshold: 0.0,
                },
            ],
            // Slack scores are never negative, so this keeps every task.
            default: PassSpec {
                heuristic: HeuristicSpec::Slack { days_offset: 0.0 },
                threshold: 0.0,
            },
        }
    }
}
