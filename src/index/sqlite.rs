// src/index/sqlite.rs

//! SQLite-backed provider index
//!
//! Persists provider records in three tables: providers, their typed
//! dependency atoms (provides and requires share one table with a role
//! column), and their owned file paths. Rows with a dependency kind this
//! crate does not know are skipped on read rather than rejected, so an
//! index written by a newer schema still loads.

use super::{ProviderIndex, ProviderRecord};
use crate::deps::{DependKind, DependencyAtom, DependencySet};
use crate::error::Result;
use rusqlite::{Connection, params};
use std::path::Path;

/// Provider index stored in a SQLite database
pub struct SqliteIndex {
    conn: Connection,
}

impl SqliteIndex {
    /// Open or create an index database at the given path
    pub fn open(path: &Path) -> Result<Self> {
        let conn = Connection::open(path)?;
        let index = Self { conn };
        index.init_schema()?;
        Ok(index)
    }

    /// Open a transient in-memory index
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        let index = Self { conn };
        index.init_schema()?;
        Ok(index)
    }

    fn init_schema(&self) -> Result<()> {
        self.conn.execute_batch(
            "CREATE TABLE IF NOT EXISTS providers (
                id INTEGER PRIMARY KEY,
                name TEXT NOT NULL UNIQUE
            );
            CREATE TABLE IF NOT EXISTS provider_deps (
                provider_id INTEGER NOT NULL REFERENCES providers(id) ON DELETE CASCADE,
                role TEXT NOT NULL CHECK (role IN ('provides', 'requires')),
                kind TEXT NOT NULL,
                name TEXT NOT NULL
            );
            CREATE TABLE IF NOT EXISTS provider_paths (
                provider_id INTEGER NOT NULL REFERENCES providers(id) ON DELETE CASCADE,
                path TEXT NOT NULL
            );
            CREATE INDEX IF NOT EXISTS idx_provider_deps_lookup
                ON provider_deps(role, kind, name);
            CREATE INDEX IF NOT EXISTS idx_provider_paths_path
                ON provider_paths(path);",
        )?;
        Ok(())
    }

    /// Insert or replace a provider record
    pub fn insert_provider(&mut self, record: &ProviderRecord) -> Result<()> {
        let tx = self.conn.transaction()?;
        tx.execute(
            "INSERT INTO providers (name) VALUES (?1)
             ON CONFLICT(name) DO NOTHING",
            params![record.id],
        )?;
        let provider_id: i64 = tx.query_row(
            "SELECT id FROM providers WHERE name = ?1",
            params![record.id],
            |row| row.get(0),
        )?;
        tx.execute(
            "DELETE FROM provider_deps WHERE provider_id = ?1",
            params![provider_id],
        )?;
        for (role, set) in [("provides", &record.provides), ("requires", &record.requires)] {
            for atom in set.iter() {
                tx.execute(
                    "INSERT INTO provider_deps (provider_id, role, kind, name)
                     VALUES (?1, ?2, ?3, ?4)",
                    params![provider_id, role, atom.kind.prefix(), atom.name],
                )?;
            }
        }
        tx.commit()?;
        Ok(())
    }

    /// Record that a provider owns a file path
    pub fn add_path(&self, provider: &str, path: &str) -> Result<()> {
        self.conn.execute(
            "INSERT INTO provider_paths (provider_id, path)
             SELECT id, ?2 FROM providers WHERE name = ?1",
            params![provider, path],
        )?;
        Ok(())
    }

    fn load_deps(&self, provider_id: i64, role: &str) -> Result<DependencySet> {
        let mut stmt = self.conn.prepare(
            "SELECT kind, name FROM provider_deps
             WHERE provider_id = ?1 AND role = ?2",
        )?;
        let rows = stmt.query_map(params![provider_id, role], |row| {
            Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?))
        })?;
        let mut set = DependencySet::new();
        for row in rows {
            let (kind, name) = row?;
            if let Some(kind) = DependKind::from_prefix(&kind) {
                set.add(DependencyAtom::new(kind, name));
            }
        }
        Ok(set)
    }
}

impl ProviderIndex for SqliteIndex {
    fn has_provider(&self, id: &str) -> Result<bool> {
        let count: i64 = self.conn.query_row(
            "SELECT COUNT(*) FROM providers WHERE name = ?1",
            params![id],
            |row| row.get(0),
        )?;
        Ok(count > 0)
    }

    fn providers_for_path(&self, path: &str) -> Result<Vec<String>> {
        let mut stmt = self.conn.prepare(
            "SELECT DISTINCT p.name FROM providers p
             JOIN provider_paths pp ON pp.provider_id = p.id
             WHERE pp.path = ?1 ORDER BY p.name",
        )?;
        let rows = stmt.query_map(params![path], |row| row.get::<_, String>(0))?;
        let mut providers = Vec::new();
        for row in rows {
            providers.push(row?);
        }
        Ok(providers)
    }

    fn record(&self, id: &str) -> Result<Option<ProviderRecord>> {
        let provider_id: Option<i64> = self
            .conn
            .query_row(
                "SELECT id FROM providers WHERE name = ?1",
                params![id],
                |row| row.get(0),
            )
            .ok();
        let Some(provider_id) = provider_id else {
            return Ok(None);
        };
        Ok(Some(ProviderRecord {
            id: id.to_string(),
            provides: self.load_deps(provider_id, "provides")?,
            requires: self.load_deps(provider_id, "requires")?,
        }))
    }

    fn providers_matching(&self, dep_sets: &[DependencySet]) -> Result<Vec<Vec<String>>> {
        let mut stmt = self.conn.prepare(
            "SELECT DISTINCT p.name FROM providers p
             JOIN provider_deps pd ON pd.provider_id = p.id
             WHERE pd.role = 'provides' AND pd.kind = ?1 AND pd.name = ?2
             ORDER BY p.name",
        )?;
        let mut results = Vec::with_capacity(dep_sets.len());
        for dep_set in dep_sets {
            let mut matching = Vec::new();
            for atom in dep_set.iter() {
                let rows =
                    stmt.query_map(params![atom.kind.prefix(), atom.name], |row| {
                        row.get::<_, String>(0)
                    })?;
                for row in rows {
                    matching.push(row?);
                }
            }
            matching.sort();
            matching.dedup();
            results.push(matching);
        }
        Ok(results)
    }
}
