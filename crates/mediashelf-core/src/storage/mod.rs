pub mod database;
pub mod queries;
pub mod repositories;

pub use database::{open_database, open_in_memory, ConnectionPool, Database};
pub use queries::CollectionStatsQuery;
pub use repositories::{ItemRepository, Repository, SqliteItemRepository};
