use std::path::Path;
use std::sync::Mutex;

use rusqlite::Connection;
use uuid::Uuid;

use crate::error::{Result, ShelfError};
use crate::merge::ItemStore;
use crate::models::{CollectionItem, CollectionStats, CollectionType};

use super::queries::CollectionStatsQuery;
use super::repositories::{ItemRepository, Repository, SqliteItemRepository};

// ─── Connection pool ────────────────────────────────────────

/// Single shared SQLite connection behind a mutex. The app is driven from
/// one event loop; the mutex only serializes repository borrows.
pub struct ConnectionPool {
    path: Option<String>,
    connection: Mutex<Connection>,
}

impl ConnectionPool {
    pub fn open(path: &Path) -> Result<Self> {
        let conn = Connection::open(path)?;
        apply_pragmas(&conn)?;
        Ok(Self {
            path: Some(path.to_string_lossy().to_string()),
            connection: Mutex::new(conn),
        })
    }

    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        apply_pragmas(&conn)?;
        Ok(Self {
            path: None,
            connection: Mutex::new(conn),
        })
    }

    pub fn get_connection(&self) -> std::sync::MutexGuard<'_, Connection> {
        self.connection.lock().unwrap()
    }

    pub fn path(&self) -> Option<&str> {
        self.path.as_deref()
    }

    pub fn is_in_memory(&self) -> bool {
        self.path.is_none()
    }
}

fn apply_pragmas(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "PRAGMA journal_mode = WAL;
         PRAGMA synchronous = NORMAL;
         PRAGMA foreign_keys = ON;",
    )?;
    Ok(())
}

// ─── Schema ─────────────────────────────────────────────────

fn init_schema(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "
        CREATE TABLE IF NOT EXISTS schema_migrations (
            version    INTEGER PRIMARY KEY,
            applied_at TEXT NOT NULL
        );

        CREATE TABLE IF NOT EXISTS items (
            id                 TEXT PRIMARY KEY,
            title              TEXT NOT NULL,
            year               INTEGER,
            format             TEXT NOT NULL,
            condition          TEXT NOT NULL DEFAULT 'Good',
            collection_type    TEXT NOT NULL DEFAULT 'owned',
            poster_url         TEXT,
            purchase_date      TEXT,
            purchase_price     REAL,
            purchase_location  TEXT,
            personal_rating    INTEGER,
            notes              TEXT,
            technical_specs_id TEXT,
            created_at         TEXT NOT NULL,
            updated_at         TEXT NOT NULL
        );

        CREATE INDEX IF NOT EXISTS idx_items_title           ON items(title);
        CREATE INDEX IF NOT EXISTS idx_items_format          ON items(format);
        CREATE INDEX IF NOT EXISTS idx_items_collection_type ON items(collection_type);
        ",
    )?;

    conn.execute(
        "INSERT OR IGNORE INTO schema_migrations(version, applied_at) VALUES (1, ?1)",
        rusqlite::params![chrono::Utc::now().to_rfc3339()],
    )?;

    Ok(())
}

pub fn open_database(path: &Path) -> Result<ConnectionPool> {
    let pool = ConnectionPool::open(path)?;
    {
        let conn = pool.get_connection();
        init_schema(&conn)?;
    }
    Ok(pool)
}

pub fn open_in_memory() -> Result<ConnectionPool> {
    let pool = ConnectionPool::open_in_memory()?;
    {
        let conn = pool.get_connection();
        init_schema(&conn)?;
    }
    Ok(pool)
}

// ─── Facade ─────────────────────────────────────────────────

/// High-level handle over the collection store.
pub struct Database {
    pool: ConnectionPool,
}

impl Database {
    pub fn open(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let pool = open_database(path)?;
        Ok(Self { pool })
    }

    pub fn open_in_memory() -> Result<Self> {
        let pool = open_in_memory()?;
        Ok(Self { pool })
    }

    pub fn upsert_item(&self, item: &CollectionItem) -> Result<()> {
        let conn = self.pool.get_connection();
        let repo = SqliteItemRepository::new(conn);
        repo.save(item)
    }

    pub fn get_item(&self, id: &Uuid) -> Result<CollectionItem> {
        let conn = self.pool.get_connection();
        let repo = SqliteItemRepository::new(conn);
        repo.find_by_id(id)?
            .ok_or_else(|| ShelfError::ItemNotFound(id.to_string()))
    }

    pub fn find_item(&self, id: &Uuid) -> Result<Option<CollectionItem>> {
        let conn = self.pool.get_connection();
        let repo = SqliteItemRepository::new(conn);
        repo.find_by_id(id)
    }

    /// Delete one item; errors if it does not exist. Merge deletions go
    /// through the `ItemStore` impl instead, which treats a missing row
    /// as already-removed.
    pub fn remove_item(&self, id: &Uuid) -> Result<()> {
        let conn = self.pool.get_connection();
        let repo = SqliteItemRepository::new(conn);
        if !repo.delete(id)? {
            return Err(ShelfError::ItemNotFound(id.to_string()));
        }
        Ok(())
    }

    pub fn list_items(&self, limit: usize, offset: usize) -> Result<Vec<CollectionItem>> {
        let conn = self.pool.get_connection();
        let repo = SqliteItemRepository::new(conn);
        repo.list(limit, offset)
    }

    pub fn list_all_items(&self) -> Result<Vec<CollectionItem>> {
        let conn = self.pool.get_connection();
        let repo = SqliteItemRepository::new(conn);
        repo.list_all()
    }

    pub fn list_by_status(
        &self,
        status: CollectionType,
        limit: usize,
        offset: usize,
    ) -> Result<Vec<CollectionItem>> {
        let conn = self.pool.get_connection();
        let repo = SqliteItemRepository::new(conn);
        repo.list_by_status(status, limit, offset)
    }

    pub fn search_title(
        &self,
        needle: &str,
        limit: usize,
        offset: usize,
    ) -> Result<Vec<CollectionItem>> {
        let conn = self.pool.get_connection();
        let repo = SqliteItemRepository::new(conn);
        repo.search_title(needle, limit, offset)
    }

    pub fn count_items(&self) -> Result<usize> {
        let conn = self.pool.get_connection();
        let repo = SqliteItemRepository::new(conn);
        repo.count()
    }

    /// Move an item to another status (owned → for_sale, etc.).
    pub fn set_status(&self, id: &Uuid, status: CollectionType) -> Result<CollectionItem> {
        let mut item = self.get_item(id)?;
        item.collection_type = status;
        item.updated_at = chrono::Utc::now();
        self.upsert_item(&item)?;
        Ok(item)
    }

    pub fn stats(&self) -> Result<CollectionStats> {
        let conn = self.pool.get_connection();
        let query = CollectionStatsQuery::new(conn);
        query.get_stats()
    }
}

impl ItemStore for Database {
    fn delete_item(&self, id: &Uuid) -> Result<bool> {
        let conn = self.pool.get_connection();
        let repo = SqliteItemRepository::new(conn);
        repo.delete(id)
    }
}

// ─── Tests ──────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dedup;
    use crate::merge::MergeSession;
    use crate::models::{Condition, MediaFormat};

    fn item(title: &str, format: MediaFormat) -> CollectionItem {
        CollectionItem::new(title, format)
    }

    #[test]
    fn test_item_roundtrip_all_fields() {
        let db = Database::open_in_memory().unwrap();

        let mut original = item("Dune (2021)", MediaFormat::Uhd4k);
        original.year = Some(2021);
        original.condition = Condition::LikeNew;
        original.collection_type = CollectionType::ForSale;
        original.poster_url = Some("https://example.com/dune.jpg".into());
        original.purchase_date = chrono::NaiveDate::from_ymd_opt(2023, 11, 24);
        original.purchase_price = Some(29.99);
        original.purchase_location = Some("Local shop".into());
        original.personal_rating = Some(9);
        original.notes = Some("part one".into());
        original.technical_specs_id = Some("bd-321".into());

        db.upsert_item(&original).unwrap();
        let loaded = db.get_item(&original.id).unwrap();

        assert_eq!(loaded.title, original.title);
        assert_eq!(loaded.year, Some(2021));
        assert_eq!(loaded.format, MediaFormat::Uhd4k);
        assert_eq!(loaded.condition, Condition::LikeNew);
        assert_eq!(loaded.collection_type, CollectionType::ForSale);
        assert_eq!(loaded.poster_url, original.poster_url);
        assert_eq!(loaded.purchase_date, original.purchase_date);
        assert_eq!(loaded.purchase_price, Some(29.99));
        assert_eq!(loaded.purchase_location, original.purchase_location);
        assert_eq!(loaded.personal_rating, Some(9));
        assert_eq!(loaded.notes, original.notes);
        assert_eq!(loaded.technical_specs_id, original.technical_specs_id);
    }

    #[test]
    fn test_get_missing_item_errors() {
        let db = Database::open_in_memory().unwrap();
        let err = db.get_item(&Uuid::now_v7()).unwrap_err();
        assert!(matches!(err, ShelfError::ItemNotFound(_)));
    }

    #[test]
    fn test_upsert_rejects_invalid_item() {
        let db = Database::open_in_memory().unwrap();
        let mut bad = item("Alien", MediaFormat::Dvd);
        bad.personal_rating = Some(99);
        assert!(db.upsert_item(&bad).is_err());
        assert_eq!(db.count_items().unwrap(), 0);
    }

    #[test]
    fn test_remove_and_count() {
        let db = Database::open_in_memory().unwrap();
        let a = item("Alien", MediaFormat::Dvd);
        let b = item("Brazil", MediaFormat::Dvd);
        db.upsert_item(&a).unwrap();
        db.upsert_item(&b).unwrap();
        assert_eq!(db.count_items().unwrap(), 2);

        db.remove_item(&a.id).unwrap();
        assert_eq!(db.count_items().unwrap(), 1);
        assert!(db.remove_item(&a.id).is_err());
        assert!(db.find_item(&a.id).unwrap().is_none());
    }

    #[test]
    fn test_status_move_and_listing() {
        let db = Database::open_in_memory().unwrap();
        let a = item("Alien", MediaFormat::BluRay);
        db.upsert_item(&a).unwrap();

        let moved = db.set_status(&a.id, CollectionType::LoanedOut).unwrap();
        assert_eq!(moved.collection_type, CollectionType::LoanedOut);

        let loaned = db.list_by_status(CollectionType::LoanedOut, 10, 0).unwrap();
        assert_eq!(loaned.len(), 1);
        assert!(db.list_by_status(CollectionType::Owned, 10, 0).unwrap().is_empty());
    }

    #[test]
    fn test_search_title() {
        let db = Database::open_in_memory().unwrap();
        db.upsert_item(&item("Blade Runner", MediaFormat::Dvd)).unwrap();
        db.upsert_item(&item("Blade Runner 2049", MediaFormat::Uhd4k)).unwrap();
        db.upsert_item(&item("Brazil", MediaFormat::Dvd)).unwrap();

        assert_eq!(db.search_title("Blade", 10, 0).unwrap().len(), 2);
        assert_eq!(db.search_title("2049", 10, 0).unwrap().len(), 1);
        assert!(db.search_title("Solaris", 10, 0).unwrap().is_empty());
    }

    #[test]
    fn test_status_and_search_respect_offset() {
        let db = Database::open_in_memory().unwrap();
        let items: Vec<_> = (0..4)
            .map(|i| item(&format!("Wave {i}"), MediaFormat::Dvd))
            .collect();
        for it in &items {
            db.upsert_item(it).unwrap();
        }

        let page = db.list_by_status(CollectionType::Owned, 2, 2).unwrap();
        assert_eq!(page.len(), 2);
        assert_eq!(page[0].id, items[2].id);

        let page = db.search_title("Wave", 10, 3).unwrap();
        assert_eq!(page.len(), 1);
        assert_eq!(page[0].id, items[3].id);
    }

    #[test]
    fn test_merge_against_real_store_converges() {
        let db = Database::open_in_memory().unwrap();

        let mut rich = item("Inception", MediaFormat::BluRay);
        rich.personal_rating = Some(9);
        rich.technical_specs_id = Some("bd-42".into());
        let poor = item("Inception", MediaFormat::BluRay);
        let unrelated = item("Memento", MediaFormat::Dvd);

        for it in [&rich, &poor, &unrelated] {
            db.upsert_item(it).unwrap();
        }

        let mut session = MergeSession::new();
        session.load_groups(&db.list_all_items().unwrap()).unwrap();
        assert_eq!(session.groups().len(), 1);

        session.auto_select_best().unwrap();
        let removed = session.merge(&db).unwrap();
        assert_eq!(removed, 1);

        // Refresh: no duplicates remain, keeper and the unrelated item do.
        let remaining = db.list_all_items().unwrap();
        assert_eq!(remaining.len(), 2);
        assert!(dedup::find_duplicate_groups(&remaining).is_empty());
        assert!(db.find_item(&rich.id).unwrap().is_some());
        assert!(db.find_item(&poor.id).unwrap().is_none());
    }

    #[test]
    fn test_open_on_disk() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("shelf").join("mediashelf.db");
        let db = Database::open(&path).unwrap();
        db.upsert_item(&item("Alien", MediaFormat::Dvd)).unwrap();
        drop(db);

        let db = Database::open(&path).unwrap();
        assert_eq!(db.count_items().unwrap(), 1);
    }

    #[test]
    fn test_pool_knows_where_it_lives() {
        let mem = open_in_memory().unwrap();
        assert!(mem.is_in_memory());
        assert!(mem.path().is_none());

        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("shelf.db");
        let disk = open_database(&path).unwrap();
        assert!(!disk.is_in_memory());
        assert!(disk.path().unwrap().ends_with("shelf.db"));
    }

    #[test]
    fn test_list_pagination() {
        let db = Database::open_in_memory().unwrap();
        for i in 0..5 {
            db.upsert_item(&item(&format!("Title {i}"), MediaFormat::Dvd)).unwrap();
        }
        assert_eq!(db.list_items(2, 0).unwrap().len(), 2);
        assert_eq!(db.list_items(10, 3).unwrap().len(), 2);
        assert_eq!(db.list_all_items().unwrap().len(), 5);
    }
}
