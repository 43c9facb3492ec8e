pub mod config;
pub mod dedup;
pub mod error;
pub mod merge;
pub mod models;
pub mod scoring;
pub mod storage;

pub use config::AppConfig;
pub use error::{ExitCode, MergeError, Result, ShelfError};
pub use models::*;

pub use dedup::{find_duplicate_groups, DuplicateGroup, GroupKey};
pub use merge::{resolve_merges, ItemStore, MergeDecision, MergeSession, SessionState};
pub use scoring::{completeness_score, suggested_keeper};
pub use storage::{Database, ItemRepository, Repository, SqliteItemRepository};
