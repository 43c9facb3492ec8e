use std::sync::MutexGuard;

use rusqlite::Connection;

use crate::error::Result;
use crate::models::{CollectionStats, CollectionType, MediaFormat};

pub struct CollectionStatsQuery<'a> {
    conn: MutexGuard<'a, Connection>,
}

impl<'a> CollectionStatsQuery<'a> {
    pub fn new(conn: MutexGuard<'a, Connection>) -> Self {
        Self { conn }
    }

    fn count_where(&self, clause: &str, param: &str) -> Result<usize> {
        let count: i64 = self.conn.query_row(
            &format!("SELECT COUNT(*) FROM items WHERE {clause} = ?1"),
            rusqlite::params![param],
            |row| row.get(0),
        )?;
        Ok(count as usize)
    }

    pub fn get_stats(&self) -> Result<CollectionStats> {
        let total: usize = self
            .conn
            .query_row("SELECT COUNT(*) FROM items", [], |row| {
                row.get::<_, i64>(0).map(|n| n as usize)
            })?;

        let owned = self.count_where("collection_type", &CollectionType::Owned.to_string())?;
        let wishlist = self.count_where("collection_type", &CollectionType::Wishlist.to_string())?;
        let for_sale = self.count_where("collection_type", &CollectionType::ForSale.to_string())?;
        let loaned_out =
            self.count_where("collection_type", &CollectionType::LoanedOut.to_string())?;
        let missing = self.count_where("collection_type", &CollectionType::Missing.to_string())?;

        let dvd = self.count_where("format", &MediaFormat::Dvd.to_string())?;
        let blu_ray = self.count_where("format", &MediaFormat::BluRay.to_string())?;
        let uhd_4k = self.count_where("format", &MediaFormat::Uhd4k.to_string())?;
        let blu_ray_3d = self.count_where("format", &MediaFormat::BluRay3d.to_string())?;

        let with_specs: usize = self.conn.query_row(
            "SELECT COUNT(*) FROM items WHERE technical_specs_id IS NOT NULL",
            [],
            |row| row.get::<_, i64>(0).map(|n| n as usize),
        )?;

        let with_rating: usize = self.conn.query_row(
            "SELECT COUNT(*) FROM items WHERE personal_rating IS NOT NULL",
            [],
            |row| row.get::<_, i64>(0).map(|n| n as usize),
        )?;

        let total_spent: f64 = self.conn.query_row(
            "SELECT COALESCE(SUM(purchase_price), 0.0) FROM items",
            [],
            |row| row.get(0),
        )?;

        Ok(CollectionStats {
            total,
            owned,
            wishlist,
            for_sale,
            loaned_out,
            missing,
            dvd,
            blu_ray,
            uhd_4k,
            blu_ray_3d,
            with_specs,
            with_rating,
            total_spent,
        })
    }

    pub fn count_by_status(&self, status: CollectionType) -> Result<usize> {
        self.count_where("collection_type", &status.to_string())
    }

    pub fn count_by_format(&self, format: MediaFormat) -> Result<usize> {
        self.count_where("format", &format.to_string())
    }
}
