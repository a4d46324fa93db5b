//! ProfileStore implementation over a single SQLite database.
//!
//! One row per entity profile, keyed by the name-derived slug. The
//! embedding vector is stored as an opaque blob alongside the record;
//! nearest-neighbour search is a linear scan over all rows of a kind,
//! which is plenty at the scale this pipeline ingests (tens to low
//! thousands of profiles).
//!
//! Writes go through autocommit and are durable before the call returns.
//! Lookups return `Ok(None)` for a miss; any SQLite failure surfaces as
//! `StoreUnavailable` and never masquerades as "not found".

use rusqlite::{Connection, OptionalExtension, params};
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use crate::domain::{ProfileKind, ProfileRecord, normalize_name};
use crate::error::{DealflowError, Result};

/// Maximum records scanned when building a sampling pool.
pub const POOL_SCAN_CAP: usize = 1000;

/// Keyed store of entity profiles with similarity lookup.
#[derive(Debug)]
pub struct ProfileStore {
    db: Connection,
}

impl ProfileStore {
    /// Open or create the store at the given database path.
    pub fn open(db_path: &Path) -> Result<Self> {
        if let Some(parent) = db_path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }
        let db = Connection::open(db_path)
            .map_err(|e| DealflowError::StoreUnavailable(format!("failed to open {}: {e}", db_path.display())))?;
        Self::init_schema(&db)?;
        Ok(Self { db })
    }

    /// In-memory store, used by unit tests.
    pub fn open_in_memory() -> Result<Self> {
        let db = Connection::open_in_memory()?;
        Self::init_schema(&db)?;
        Ok(Self { db })
    }

    fn init_schema(db: &Connection) -> Result<()> {
        db.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS profiles (
                id TEXT PRIMARY KEY,
                kind TEXT NOT NULL,
                name TEXT NOT NULL,
                name_norm TEXT NOT NULL,
                tags TEXT NOT NULL,
                sections_json TEXT NOT NULL,
                source_url TEXT,
                embedding BLOB,
                created_at INTEGER NOT NULL
            );

            CREATE INDEX IF NOT EXISTS idx_profiles_kind ON profiles(kind);
            CREATE INDEX IF NOT EXISTS idx_profiles_name_norm ON profiles(name_norm);
            "#,
        )?;
        Ok(())
    }

    /// Exact lookup: display name, normalized name, or record id. First
    /// match in insertion order wins. No external calls.
    pub fn get_exact(&self, key: &str) -> Result<Option<String>> {
        let norm = normalize_name(key);
        let id = self
            .db
            .query_row(
                "SELECT id FROM profiles WHERE name = ?1 OR name_norm = ?2 OR id = ?1 ORDER BY rowid LIMIT 1",
                params![key, norm],
                |row| row.get::<_, String>(0),
            )
            .optional()?;
        Ok(id)
    }

    /// Fetch a full record by id.
    pub fn get(&self, id: &str) -> Result<Option<ProfileRecord>> {
        let row = self
            .db
            .query_row(
                "SELECT id, kind, name, tags, sections_json, source_url FROM profiles WHERE id = ?1",
                [id],
                Self::row_to_record,
            )
            .optional()?;
        Ok(row)
    }

    /// First record of the given kind whose stored name normalizes to the
    /// same string as `name`. This is the tag-resolution lookup.
    pub fn get_by_normalized_name(&self, name: &str, kind: ProfileKind) -> Result<Option<ProfileRecord>> {
        let norm = normalize_name(name);
        let row = self
            .db
            .query_row(
                "SELECT id, kind, name, tags, sections_json, source_url FROM profiles \
                 WHERE kind = ?1 AND name_norm = ?2 ORDER BY rowid LIMIT 1",
                params![kind.as_str(), norm],
                Self::row_to_record,
            )
            .optional()?;
        Ok(row)
    }

    /// Nearest-neighbour search over records of one kind.
    ///
    /// Returns (id, distance) ascending by distance — smaller is more
    /// similar — with ties broken by insertion order. Records without an
    /// embedding are skipped.
    pub fn find_similar(&self, query: &[f32], kind: ProfileKind, k: usize) -> Result<Vec<(String, f32)>> {
        let mut stmt = self.db.prepare(
            "SELECT id, embedding FROM profiles WHERE kind = ?1 AND embedding IS NOT NULL ORDER BY rowid",
        )?;
        let rows = stmt.query_map([kind.as_str()], |row| {
            let id: String = row.get(0)?;
            let blob: Vec<u8> = row.get(1)?;
            Ok((id, blob))
        })?;

        let mut scored = Vec::new();
        for row in rows {
            let (id, blob) = row?;
            let vector = blob_to_vec(&blob);
            let distance = cosine_distance(query, &vector);
            if distance.is_finite() {
                scored.push((id, distance));
            }
        }
        // stable sort preserves insertion order among equal distances
        scored.sort_by(|a, b| a.1.partial_cmp(&b.1).unwrap_or(std::cmp::Ordering::Equal));
        scored.truncate(k);
        Ok(scored)
    }

    /// Write a profile. With `overwrite = false` an existing record with
    /// the same id is left untouched and its id returned; otherwise the
    /// record (and embedding) atomically replaces any prior value.
    pub fn upsert(&self, record: &ProfileRecord, embedding: Option<&[f32]>, overwrite: bool) -> Result<String> {
        if !overwrite && self.get(&record.id)?.is_some() {
            return Ok(record.id.clone());
        }

        let sections_json = serde_json::to_string(&record.sections)?;
        let blob = embedding.map(vec_to_blob);
        self.db.execute(
            r#"
            INSERT OR REPLACE INTO profiles
            (id, kind, name, name_norm, tags, sections_json, source_url, embedding, created_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
            "#,
            params![
                record.id,
                record.kind.as_str(),
                record.name,
                normalize_name(&record.name),
                record.tags_joined(),
                sections_json,
                record.source_url,
                blob,
                chrono::Utc::now().timestamp(),
            ],
        )?;
        Ok(record.id.clone())
    }

    /// List stored records, optionally filtered by kind, in insertion
    /// order.
    pub fn list(&self, kind: Option<ProfileKind>, limit: usize) -> Result<Vec<ProfileRecord>> {
        let mut records = Vec::new();
        match kind {
            Some(kind) => {
                let mut stmt = self.db.prepare(
                    "SELECT id, kind, name, tags, sections_json, source_url FROM profiles \
                     WHERE kind = ?1 ORDER BY rowid LIMIT ?2",
                )?;
                let rows = stmt.query_map(params![kind.as_str(), limit as i64], Self::row_to_record)?;
                for row in rows {
                    records.push(row?);
                }
            }
            None => {
                let mut stmt = self.db.prepare(
                    "SELECT id, kind, name, tags, sections_json, source_url FROM profiles \
                     ORDER BY rowid LIMIT ?1",
                )?;
                let rows = stmt.query_map(params![limit as i64], Self::row_to_record)?;
                for row in rows {
                    records.push(row?);
                }
            }
        }
        Ok(records)
    }

    /// Display names of stored companies, capped at [`POOL_SCAN_CAP`].
    /// This is the sampling pool for queue refill.
    pub fn company_names(&self) -> Result<Vec<String>> {
        let mut stmt = self
            .db
            .prepare("SELECT name FROM profiles WHERE kind = 'company' ORDER BY rowid LIMIT ?1")?;
        let rows = stmt.query_map(params![POOL_SCAN_CAP as i64], |row| row.get::<_, String>(0))?;
        let mut names = Vec::new();
        for row in rows {
            names.push(row?);
        }
        Ok(names)
    }

    pub fn count(&self, kind: ProfileKind) -> Result<usize> {
        let count: i64 = self.db.query_row(
            "SELECT COUNT(*) FROM profiles WHERE kind = ?1",
            [kind.as_str()],
            |row| row.get(0),
        )?;
        Ok(count as usize)
    }

    fn row_to_record(row: &rusqlite::Row<'_>) -> rusqlite::Result<ProfileRecord> {
        let kind_str: String = row.get(1)?;
        let tags_str: String = row.get(3)?;
        let sections_json: String = row.get(4)?;
        let sections: BTreeMap<String, String> = serde_json::from_str(&sections_json).unwrap_or_default();
        Ok(ProfileRecord {
            id: row.get(0)?,
            kind: ProfileKind::parse(&kind_str).unwrap_or(ProfileKind::Company),
            name: row.get(2)?,
            tags: ProfileRecord::split_tags(&tags_str),
            sections,
            source_url: row.get(5)?,
        })
    }
}

/// Cosine distance mapped onto [0, 1]: 0 = identical direction,
/// 0.5 = orthogonal (or undefined for a zero vector), 1 = opposite.
pub fn cosine_distance(a: &[f32], b: &[f32]) -> f32 {
    if a.is_empty() || b.is_empty() || a.len() != b.len() {
        return 1.0;
    }
    let dot: f32 = a.iter().zip(b).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.5;
    }
    let cos = (dot / (norm_a * norm_b)).clamp(-1.0, 1.0);
    (1.0 - cos) / 2.0
}

fn vec_to_blob(vector: &[f32]) -> Vec<u8> {
    let mut blob = Vec::with_capacity(vector.len() * 4);
    for v in vector {
        blob.extend_from_slice(&v.to_le_bytes());
    }
    blob
}

fn blob_to_vec(blob: &[u8]) -> Vec<f32> {
    blob.chunks_exact(4)
        .map(|chunk| f32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]))
        .collect()
}
