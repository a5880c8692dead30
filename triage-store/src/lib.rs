//! Persistence for triage tasks: a JSON store, markdown task lists, and a
//! background poller that republishes a source when it changes.

pub mod markdown;
pub mod poller;
pub mod store;

pub use markdown::{parse_markdown, to_markdown_line};
pub use poller::{JsonFileSource, MarkdownFileSource, Snapshot, SnapshotPoller, SnapshotSource};
pub use store::{MergeSummary, TaskStore, load_tasks};
