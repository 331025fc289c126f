use rusqlite::{params, Connection, OptionalExtension};
use std::path::{Path, PathBuf};

use crate::error::ClientError;
use crate::models::ConfigItem;

/// Local sqlite store for settings and the saved session cookie.
pub struct Database {
    conn: Connection,
}

pub fn default_path() -> PathBuf {
    if let Ok(path) = std::env::var("TASKFLOW_DB") {
        return PathBuf::from(path);
    }
    let home_dir = std::env::var("HOME").unwrap_or_else(|_| ".".to_string());
    PathBuf::from(home_dir).join(".taskflow.db")
}

impl Database {
    pub fn new() -> Result<Self, ClientError> {
        Self::open(&default_path())
    }

    pub fn open(path: &Path) -> Result<Self, ClientError> {
        Self::init(Connection::open(path)?)
    }

    pub fn in_memory() -> Result<Self, ClientError> {
        Self::init(Connection::open_in_memory()?)
    }

    fn init(conn: Connection) -> Result<Self, ClientError> {
        conn.execute(
            "CREATE TABLE IF NOT EXISTS configs (
                key_name TEXT PRIMARY KEY,
                value TEXT NOT NULL,
                description TEXT,
                created_at DATETIME DEFAULT CURRENT_TIMESTAMP,
                updated_at DATETIME DEFAULT CURRENT_TIMESTAMP
            )",
            [],
        )?;

        // One cookie header per backend origin
        conn.execute(
            "CREATE TABLE IF NOT EXISTS cookies (
                origin TEXT PRIMARY KEY,
                header TEXT NOT NULL,
                updated_at DATETIME DEFAULT CURRENT_TIMESTAMP
            )",
            [],
        )?;

        Ok(Database { conn })
    }

    pub fn set_config(&self, key: &str, value: &str, description: Option<&str>) -> Result<(), ClientError> {
        self.conn.execute(
            "INSERT INTO configs (key_name, value, description) VALUES (?1, ?2, ?3)
             ON CONFLICT(key_name) DO UPDATE SET
                value = excluded.value,
                description = COALESCE(excluded.description, configs.description),
                updated_at = CURRENT_TIMESTAMP",
            params![key, value, description],
        )?;
        Ok(())
    }

    pub fn get_config(&self, key: &str) -> Result<Option<String>, ClientError> {
        let value = self
            .conn
            .query_row(
                "SELECT value FROM configs WHERE key_name = ?1",
                [key],
                |row| row.get::<_, String>(0),
            )
            .optional()?;
        Ok(value)
    }

    pub fn get_all_configs(&self) -> Result<Vec<ConfigItem>, ClientError> {
        let mut stmt = self.conn.prepare(
            "SELECT key_name, value, description, created_at, updated_at FROM configs ORDER BY key_name",
        )?;
        let rows = stmt.query_map([], |row| {
            Ok(ConfigItem {
                key_name: row.get(0)?,
                value: row.get(1)?,
                description: row.get(2)?,
                created_at: row.get(3)?,
                updated_at: row.get(4)?,
            })
        })?;

        let mut configs = Vec::new();
        for row in rows {
            configs.push(row?);
        }
        Ok(configs)
    }

    /// Returns whether a row was removed.
    pub fn delete_config(&self, key: &str) -> Result<bool, ClientError> {
        let rows_affected = self
            .conn
            .execute("DELETE FROM configs WHERE key_name = ?1", [key])?;
        Ok(rows_affected > 0)
    }

    pub fn load_cookies(&self, origin: &str) -> Result<Option<String>, ClientError> {
        let header = self
            .conn
            .query_row(
                "SELECT header FROM cookies WHERE origin = ?1",
                [origin],
                |row| row.get::<_, String>(0),
            )
            .optional()?;
        Ok(header)
    }

    /// Stores the jar's current header, or forgets the origin when there is none.
    pub fn save_cookies(&self, origin: &str, header: Option<&str>) -> Result<(), ClientError> {
        match header {
            Some(header) if !header.is_empty() => {
                self.conn.execute(
                    "INSERT INTO cookies (origin, header) VALUES (?1, ?2)
                     ON CONFLICT(origin) DO UPDATE SET
                        header = excluded.header,
                        updated_at = CURRENT_TIMESTAMP",
                    params![origin, header],
                )?;
            }
            _ => self.clear_cookies(origin)?,
        }
        Ok(())
    }

    pub fn clear_cookies(&self, origin: &str) -> Result<(), ClientError> {
        self.conn
            .execute("DELETE FROM cookies WHERE origin = ?1", [origin])?;
        Ok(())
    }
}
