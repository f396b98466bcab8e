use std::path::Path;

use rusqlite::{params, Connection, OptionalExtension};

use crate::error::SusumeError;
use crate::models::{Catalog, CatalogItem};

const SCHEMA_V1: &str = include_str!("../../../migrations/001_initial.sql");

/// SQLite-backed store for the catalog and per-user ratings.
pub struct Storage {
    conn: Connection,
}

impl Storage {
    /// Open (or create) the database at the given path and run migrations.
    pub fn open(path: &Path) -> Result<Self, SusumeError> {
        let conn = Connection::open(path)?;
        conn.execute_batch("PRAGMA journal_mode=WAL; PRAGMA foreign_keys=ON;")?;
        run_migrations(&conn)?;
        Ok(Self { conn })
    }

    /// Open an in-memory database (for tests).
    pub fn open_memory() -> Result<Self, SusumeError> {
        let conn = Connection::open_in_memory()?;
        conn.execute_batch("PRAGMA foreign_keys=ON;")?;
        run_migrations(&conn)?;
        Ok(Self { conn })
    }

    // ── Catalog ─────────────────────────────────────────────────

    /// Insert a catalog item, returning its auto-generated ID.
    pub fn insert_item(&self, item: &CatalogItem) -> Result<i64, SusumeError> {
        let genres_json = serde_json::to_string(&item.genres).unwrap_or_default();
        self.conn.execute(
            "INSERT INTO catalog (name, genres, rating, popularity, kind)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                item.name,
                genres_json,
                item.rating,
                item.popularity as i64,
                item.kind,
            ],
        )?;
        Ok(self.conn.last_insert_rowid())
    }

    /// Get a catalog item by its database ID.
    pub fn get_item(&self, id: i64) -> Result<Option<CatalogItem>, SusumeError> {
        self.conn
            .query_row(
                "SELECT id, name, genres, rating, popularity, kind
                 FROM catalog WHERE id = ?1",
                params![id],
                |row| Ok(row_to_item(row)),
            )
            .optional()
            .map_err(Into::into)
    }

    /// Load the entire catalog in insertion order.
    pub fn load_catalog(&self) -> Result<Catalog, SusumeError> {
        let mut stmt = self.conn.prepare(
            "SELECT id, name, genres, rating, popularity, kind
             FROM catalog ORDER BY id",
        )?;
        let items = stmt
            .query_map([], |row| Ok(row_to_item(row)))?
            .filter_map(|r| r.ok())
            .collect();
        Ok(Catalog::new(items))
    }

    pub fn catalog_len(&self) -> Result<usize, SusumeError> {
        let count: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM catalog", [], |row| row.get(0))?;
        Ok(count as usize)
    }

    // ── Ratings ─────────────────────────────────────────────────

    /// Record a user's rating for a catalog item.
    pub fn insert_rating(&self, user_id: u64, item_id: i64, rating: f64) -> Result<(), SusumeError> {
        self.conn.execute(
            "INSERT INTO ratings (user_id, item_id, rating) VALUES (?1, ?2, ?3)",
            params![user_id as i64, item_id, rating],
        )?;
        Ok(())
    }

    /// Load all rating rows as `(user_id, item_id, rating)`.
    pub fn load_ratings(&self) -> Result<Vec<(u64, i64, f64)>, SusumeError> {
        let mut stmt = self
            .conn
            .prepare("SELECT user_id, item_id, rating FROM ratings ORDER BY id")?;
        let rows = stmt
            .query_map([], |row| {
                Ok((row.get::<_, i64>(0)? as u64, row.get(1)?, row.get(2)?))
            })?
            .filter_map(|r| r.ok())
            .collect();
        Ok(rows)
    }
}

// ── Migrations ──────────────────────────────────────────────────

/// Run schema migrations using `PRAGMA user_version` for version tracking.
fn run_migrations(conn: &Connection) -> Result<(), SusumeError> {
    let version: i32 = conn
        .pragma_query_value(None, "user_version", |row| row.get(0))
        .unwrap_or(0);

    if version < 1 {
        conn.execute_batch(SCHEMA_V1)?;
        conn.pragma_update(None, "user_version", 1)?;
    }
    Ok(())
}

// ── Row mapping ─────────────────────────────────────────────────

fn row_to_item(row: &rusqlite::Row<'_>) -> CatalogItem {
    let genres_str: String = row.get(2).unwrap_or_default();
    let genres: Vec<String> = serde_json::from_str(&genres_str).unwrap_or_default();
    CatalogItem {
        id: row.get(0).unwrap_or(0),
        name: row.get(1).unwrap_or_default(),
        genres,
        rating: row.get(3).unwrap_or(0.0),
        popularity: row.get::<_, i64>(4).unwrap_or(0) as u64,
        kind: row.get(5).unwrap_or_default(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_item() -> CatalogItem {
        CatalogItem {
            id: 0,
            name: "Sousou no Frieren".into(),
            genres: vec!["Adventure".into(), "Fantasy".into()],
            rating: 9.1,
            popularity: 850_000,
            kind: "tv".into(),
        }
    }

    #[test]
    fn test_insert_and_get_item() {
        let db = Storage::open_memory().unwrap();
        let id = db.insert_item(&test_item()).unwrap();
        assert!(id > 0);

        let fetched = db.get_item(id).unwrap().unwrap();
        assert_eq!(fetched.name, "Sousou no Frieren");
        assert_eq!(fetched.genres.len(), 2);
        assert_eq!(fetched.popularity, 850_000);
    }

    #[test]
    fn test_load_catalog_in_insertion_order() {
        let db = Storage::open_memory().unwrap();
        db.insert_item(&test_item()).unwrap();
        let mut second = test_item();
        second.name = "Mushishi".into();
        db.insert_item(&second).unwrap();

        let catalog = db.load_catalog().unwrap();
        assert_eq!(catalog.len(), 2);
        assert_eq!(catalog.get(0).unwrap().name, "Sousou no Frieren");
        assert_eq!(catalog.get(1).unwrap().name, "Mushishi");
        assert_eq!(db.catalog_len().unwrap(), 2);
    }

    #[test]
    fn test_ratings_round_trip() {
        let db = Storage::open_memory().unwrap();
        let item_id = db.insert_item(&test_item()).unwrap();

        db.insert_rating(7, item_id, 9.0).unwrap();
        db.insert_rating(8, item_id, 7.5).unwrap();

        let rows = db.load_ratings().unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0], (7, item_id, 9.0));
    }
}
