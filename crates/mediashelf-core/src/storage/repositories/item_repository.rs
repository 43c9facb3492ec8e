use std::str::FromStr;
use std::sync::MutexGuard;

use chrono::{DateTime, NaiveDate, Utc};
use rusqlite::{params, Connection};
use uuid::Uuid;

use crate::error::Result;
use crate::models::{CollectionItem, CollectionType, Condition, MediaFormat};

use super::Repository;

const ITEM_COLUMNS: &str = "id, title, year, format, condition, collection_type, poster_url,
        purchase_date, purchase_price, purchase_location, personal_rating,
        notes, technical_specs_id, created_at, updated_at";

pub trait ItemRepository: Repository<Entity = CollectionItem, Id = Uuid> {
    fn list(&self, limit: usize, offset: usize) -> Result<Vec<CollectionItem>>;
    fn list_all(&self) -> Result<Vec<CollectionItem>>;
    fn list_by_status(
        &self,
        status: CollectionType,
        limit: usize,
        offset: usize,
    ) -> Result<Vec<CollectionItem>>;
    fn search_title(&self, needle: &str, limit: usize, offset: usize)
        -> Result<Vec<CollectionItem>>;
    fn count(&self) -> Result<usize>;
}

pub struct SqliteItemRepository<'a> {
    conn: MutexGuard<'a, Connection>,
}

impl<'a> SqliteItemRepository<'a> {
    pub fn new(conn: MutexGuard<'a, Connection>) -> Self {
        Self { conn }
    }

    fn row_to_item(row: &rusqlite::Row) -> rusqlite::Result<CollectionItem> {
        let id_str: String = row.get(0)?;
        let format_str: String = row.get(3)?;
        let condition_str: String = row.get(4)?;
        let status_str: String = row.get(5)?;
        let purchase_date_str: Option<String> = row.get(7)?;
        let created_str: String = row.get(13)?;
        let updated_str: String = row.get(14)?;

        let format = MediaFormat::from_str(&format_str).map_err(|_| {
            rusqlite::Error::FromSqlConversionFailure(
                3,
                rusqlite::types::Type::Text,
                format!("bad media format: {format_str}").into(),
            )
        })?;

        Ok(CollectionItem {
            id: Uuid::parse_str(&id_str).unwrap_or_default(),
            title: row.get(1)?,
            year: row.get(2)?,
            format,
            condition: Condition::from_str(&condition_str).unwrap_or_default(),
            collection_type: CollectionType::from_str(&status_str).unwrap_or_default(),
            poster_url: row.get(6)?,
            purchase_date: purchase_date_str.and_then(|s| NaiveDate::from_str(&s).ok()),
            purchase_price: row.get(8)?,
            purchase_location: row.get(9)?,
            personal_rating: row.get(10)?,
            notes: row.get(11)?,
            technical_specs_id: row.get(12)?,
            created_at: DateTime::parse_from_rfc3339(&created_str)
                .map(|t| t.with_timezone(&Utc))
                .unwrap_or_default(),
            updated_at: DateTime::parse_from_rfc3339(&updated_str)
                .map(|t| t.with_timezone(&Utc))
                .unwrap_or_default(),
        })
    }
}

impl<'a> Repository for SqliteItemRepository<'a> {
    type Entity = CollectionItem;
    type Id = Uuid;

    fn find_by_id(&self, id: &Self::Id) -> Result<Option<Self::Entity>> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {ITEM_COLUMNS} FROM items WHERE id = ?1"
        ))?;

        match stmt.query_row(params![id.to_string()], Self::row_to_item) {
            Ok(item) => Ok(Some(item)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn save(&self, item: &Self::Entity) -> Result<()> {
        item.validate()?;

        self.conn.execute(
            "INSERT OR REPLACE INTO items
                (id, title, year, format, condition, collection_type, poster_url,
                 purchase_date, purchase_price, purchase_location, personal_rating,
                 notes, technical_specs_id, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15)",
            params![
                item.id.to_string(),
                item.title,
                item.year,
                item.format.to_string(),
                item.condition.to_string(),
                item.collection_type.to_string(),
                item.poster_url,
                item.purchase_date.map(|d| d.to_string()),
                item.purchase_price,
                item.purchase_location,
                item.personal_rating,
                item.notes,
                item.technical_specs_id,
                item.created_at.to_rfc3339(),
                item.updated_at.to_rfc3339(),
            ],
        )?;
        Ok(())
    }

    fn delete(&self, id: &Self::Id) -> Result<bool> {
        let deleted = self
            .conn
            .execute("DELETE FROM items WHERE id = ?1", params![id.to_string()])?;
        Ok(deleted > 0)
    }
}

impl<'a> ItemRepository for SqliteItemRepository<'a> {
    fn list(&self, limit: usize, offset: usize) -> Result<Vec<CollectionItem>> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {ITEM_COLUMNS} FROM items
             ORDER BY created_at, id LIMIT ?1 OFFSET ?2"
        ))?;

        let rows = stmt
            .query_map(params![limit as i64, offset as i64], Self::row_to_item)?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(rows)
    }

    fn list_all(&self) -> Result<Vec<CollectionItem>> {
        // Insertion order keeps the grouper's tie-breaks deterministic.
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {ITEM_COLUMNS} FROM items ORDER BY created_at, id"
        ))?;

        let rows = stmt
            .query_map([], Self::row_to_item)?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(rows)
    }

    fn list_by_status(
        &self,
        status: CollectionType,
        limit: usize,
        offset: usize,
    ) -> Result<Vec<CollectionItem>> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {ITEM_COLUMNS} FROM items
             WHERE collection_type = ?1 ORDER BY created_at, id LIMIT ?2 OFFSET ?3"
        ))?;

        let rows = stmt
            .query_map(
                params![status.to_string(), limit as i64, offset as i64],
                Self::row_to_item,
            )?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(rows)
    }

    fn search_title(
        &self,
        needle: &str,
        limit: usize,
        offset: usize,
    ) -> Result<Vec<CollectionItem>> {
        let pattern = format!("%{needle}%");
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {ITEM_COLUMNS} FROM items
             WHERE title LIKE ?1 ORDER BY created_at, id LIMIT ?2 OFFSET ?3"
        ))?;

        let rows = stmt
            .query_map(
                params![pattern, limit as i64, offset as i64],
                Self::row_to_item,
            )?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(rows)
    }

    fn count(&self) -> Result<usize> {
        let count: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM items", [], |row| row.get(0))?;
        Ok(count as usize)
    }
}
