//! Register Store
//!
//! Lifecycle of one register access:
//!
//! ```rust,ignore
//! let mut handle = RegisterStore::open(&path).await?;   // BEGIN IMMEDIATE
//! let keys = handle.key_column(Sheet::Tasks).await?;
//! handle.append_row(Sheet::Tasks, &values).await?;
//! handle.save().await?;                                 // COMMIT, close
//! ```
//!
//! All appends made through a handle become visible to other readers only
//! when `save()` commits, so a failed run never leaves a partially written
//! register. Dropping or closing an unsaved handle discards its changes.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde_json::{json, Map, Value};
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqliteRow};
use sqlx::{ConnectOptions, Connection, Row, SqliteConnection, ValueRef};
use tracing::debug;

use super::models::{CellValue, RegisterRow};
use super::schema::Sheet;
use crate::{Error, Result};

/// How long a writer waits for another writer's lock before failing
pub const BUSY_TIMEOUT_MS: u64 = 5000;

/// Entry point for opening register files
pub struct RegisterStore;

impl RegisterStore {
    /// Open an existing register for one write transaction
    ///
    /// Never creates the file. Fails if any required sheet is missing.
    pub async fn open(path: &Path) -> Result<RegisterHandle> {
        let mut handle = Self::connect(path, false).await?;
        sqlx::query("BEGIN IMMEDIATE")
            .execute(&mut handle.conn)
            .await?;
        handle.in_transaction = true;
        debug!(path = %path.display(), "Register opened for writing");
        Ok(handle)
    }

    /// Open an existing register for reading only
    pub async fn open_read_only(path: &Path) -> Result<RegisterHandle> {
        Self::connect(path, true).await
    }

    async fn connect(path: &Path, read_only: bool) -> Result<RegisterHandle> {
        if !path.exists() {
            return Err(Error::RegisterNotFound(path.to_path_buf()));
        }

        let mut options = SqliteConnectOptions::new()
            .filename(path)
            .create_if_missing(false)
            .read_only(read_only)
            .busy_timeout(Duration::from_millis(BUSY_TIMEOUT_MS));
        if !read_only {
            // Single-file register: no -wal/-shm side files
            options = options.journal_mode(SqliteJournalMode::Delete);
        }

        let mut conn = options.connect().await?;

        let tables: Vec<String> = sqlx::query_scalar(
            "SELECT name FROM sqlite_master WHERE type = 'table' AND name NOT LIKE 'sqlite_%'",
        )
        .fetch_all(&mut conn)
        .await?;

        for sheet in Sheet::ALL {
            if !sheet.is_optional() && !tables.iter().any(|t| t == sheet.table_name()) {
                return Err(Error::Internal(format!(
                    "Register {} has no '{}' sheet",
                    path.display(),
                    sheet
                )));
            }
        }

        let has_milestones = tables.iter().any(|t| t == Sheet::Milestones.table_name());

        Ok(RegisterHandle {
            path: path.to_path_buf(),
            conn,
            read_only,
            in_transaction: false,
            has_milestones,
        })
    }
}

/// An open register
pub struct RegisterHandle {
    path: PathBuf,
    conn: SqliteConnection,
    read_only: bool,
    in_transaction: bool,
    has_milestones: bool,
}

impl RegisterHandle {
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn has_sheet(&self, sheet: Sheet) -> bool {
        !sheet.is_optional() || self.has_milestones
    }

    /// All data rows of a sheet in physical order
    ///
    /// Rows with a blank primary key are treated as empty and skipped.
    /// An optional sheet that does not exist yields no rows.
    pub async fn rows(&mut self, sheet: Sheet) -> Result<Vec<RegisterRow>> {
        if !self.has_sheet(sheet) {
            return Ok(Vec::new());
        }

        let columns = sheet.columns();
        let select: Vec<&str> = columns.iter().map(|c| c.name).collect();
        let sql = format!(
            "SELECT {} FROM {} ORDER BY row_id",
            select.join(", "),
            sheet.table_name()
        );

        let rows = sqlx::query(&sql).fetch_all(&mut self.conn).await?;
        let key_header = sheet.primary_key().header;

        Ok(rows
            .iter()
            .map(|row| {
                let mut values = Map::new();
                for (i, column) in columns.iter().enumerate() {
                    values.insert(column.header.to_string(), cell_to_json(row, i));
                }
                RegisterRow::new(values)
            })
            .filter(|row| row.text(key_header).is_some())
            .collect())
    }

    /// Non-blank primary key values of a sheet
    pub async fn key_column(&mut self, sheet: Sheet) -> Result<Vec<String>> {
        if !self.has_sheet(sheet) {
            return Ok(Vec::new());
        }

        let key = sheet.primary_key().name;
        let sql = format!(
            "SELECT CAST({key} AS TEXT) FROM {table} WHERE {key} IS NOT NULL AND TRIM({key}) <> '' ORDER BY row_id",
            key = key,
            table = sheet.table_name()
        );

        Ok(sqlx::query_scalar(&sql).fetch_all(&mut self.conn).await?)
    }

    /// Append one row; unspecified columns stay empty
    pub async fn append_row(&mut self, sheet: Sheet, values: &[(&str, CellValue)]) -> Result<()> {
        if self.read_only || !self.in_transaction {
            return Err(Error::InvalidInput(format!(
                "Register {} is not open for writing",
                self.path.display()
            )));
        }
        if !sheet.is_writable() {
            return Err(Error::InvalidInput(format!("Sheet '{}' is read-only", sheet)));
        }

        let mut names = Vec::with_capacity(values.len());
        for (header, _) in values {
            let column = sheet.column(header).ok_or_else(|| {
                Error::InvalidInput(format!("Sheet '{}' has no column '{}'", sheet, header))
            })?;
            names.push(column.name);
        }

        let placeholders = vec!["?"; names.len()].join(", ");
        let sql = format!(
            "INSERT INTO {} ({}) VALUES ({})",
            sheet.table_name(),
            names.join(", "),
            placeholders
        );

        let mut query = sqlx::query(&sql);
        for (_, value) in values {
            query = match value {
                CellValue::Text(text) => query.bind(text.clone()),
                CellValue::Integer(number) => query.bind(*number),
                CellValue::Empty => query.bind(None::<String>),
            };
        }
        query.execute(&mut self.conn).await?;

        Ok(())
    }

    /// Commit every append made through this handle and close it
    pub async fn save(mut self) -> Result<()> {
        if self.read_only || !self.in_transaction {
            return Err(Error::InvalidInput(format!(
                "Register {} is not open for writing",
                self.path.display()
            )));
        }

        sqlx::query("COMMIT").execute(&mut self.conn).await?;
        debug!(path = %self.path.display(), "Register saved");
        self.conn.close().await?;
        Ok(())
    }

    /// Close without saving; pending appends are discarded
    pub async fn close(mut self) -> Result<()> {
        if self.in_transaction {
            sqlx::query("ROLLBACK").execute(&mut self.conn).await?;
        }
        self.conn.close().await?;
        Ok(())
    }
}

/// Convert one SQLite cell to JSON
fn cell_to_json(row: &SqliteRow, index: usize) -> Value {
    row.try_get_raw(index)
        .ok()
        .and_then(|raw| {
            if raw.is_null() {
                Some(Value::Null)
            } else {
                row.try_get::<String, _>(index)
                    .ok()
                    .map(Value::String)
                    .or_else(|| row.try_get::<i64, _>(index).ok().map(|v| json!(v)))
                    .or_else(|| row.try_get::<f64, _>(index).ok().map(|v| json!(v)))
            }
        })
        .unwrap_or(Value::Null)
}
