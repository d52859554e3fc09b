//! Storage layer for myhours.
//!
//! Provides persistence for records, categories and settings using `rusqlite`.
//!
//! # Thread Safety
//!
//! The [`Database`] type wraps a `rusqlite::Connection`, which is `Send` but not `Sync`.
//! A `Database` instance can be moved between threads but cannot be shared
//! across threads without external synchronization.
//!
//! # Schema
//!
//! ## Timestamp Format
//!
//! Timestamps are stored as TEXT in RFC 3339 UTC with fixed millisecond
//! precision (e.g., `2024-08-19T08:00:00.000Z`), so lexicographic ordering
//! matches chronological ordering.
//!
//! ## Active Records
//!
//! A record with a NULL `end` is still running. At most one such record
//! exists at a time; [`Database::start_record`] refuses to start a second one.
//! Range queries only return finished records.

use std::path::Path;

use chrono::{DateTime, SecondsFormat, TimeDelta, Utc};
use mh_core::{Category, Record, Setting, Settings, ValidationError};
use rusqlite::{Connection, OptionalExtension, params};
use thiserror::Error;
use tracing::{debug, warn};

/// Database errors.
#[derive(Debug, Error)]
pub enum DbError {
    /// An error from the underlying database.
    #[error("sqlite error: {0}")]
    Sqlite(#[from] rusqlite::Error),
    /// Failed to parse a stored timestamp.
    #[error("invalid timestamp for record {record_id}: {timestamp}")]
    TimestampParse {
        record_id: i64,
        timestamp: String,
        #[source]
        source: chrono::ParseError,
    },
    /// A record is already running.
    #[error("record {id} is already active")]
    ActiveRecordExists { id: i64 },
    /// No record is running.
    #[error("no active record")]
    NoActiveRecord,
    /// No record has the given ID.
    #[error("record {0} not found")]
    RecordNotFound(i64),
    /// No category has the given ID.
    #[error("category {0} not found")]
    UnknownCategory(i64),
    /// A record failed validation.
    #[error("invalid record: {0}")]
    Invalid(#[from] ValidationError),
    /// A record in an import batch failed validation.
    #[error("invalid record at position {index}: {source}")]
    InvalidRecord {
        index: usize,
        #[source]
        source: ValidationError,
    },
    /// A stored or requested setting value cannot be used.
    #[error("invalid value for setting {key}: {value:?}")]
    InvalidSetting { key: String, value: String },
}

/// Database connection wrapper.
///
/// See the [module documentation](self) for thread safety considerations.
pub struct Database {
    conn: Connection,
}

const SELECT_RECORD: &str = r#"SELECT id, start, "end", category, notes FROM records"#;

impl Database {
    /// Opens a database at the given path, creating it if necessary.
    ///
    /// The database schema is automatically initialized on first open.
    pub fn open(path: &Path) -> Result<Self, DbError> {
        let conn = Connection::open(path)?;
        let db = Self { conn };
        db.init()?;
        Ok(db)
    }

    /// Opens an in-memory database.
    ///
    /// Useful for testing. The database is destroyed when the connection closes.
    pub fn open_in_memory() -> Result<Self, DbError> {
        let conn = Connection::open_in_memory()?;
        let db = Self { conn };
        db.init()?;
        Ok(db)
    }

    /// Initializes the database schema and default rows.
    ///
    /// This is idempotent - safe to call on an already-initialized database.
    fn init(&self) -> Result<(), DbError> {
        self.conn.execute_batch("PRAGMA foreign_keys = ON;")?;
        self.conn.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS categories (
                id INTEGER PRIMARY KEY,
                name TEXT NOT NULL UNIQUE
            );

            INSERT OR IGNORE INTO categories (id, name) VALUES (1, 'Work');

            -- start/end: RFC 3339 UTC with milliseconds (e.g., '2024-08-19T08:00:00.000Z')
            -- end: NULL while the record is active
            CREATE TABLE IF NOT EXISTS records (
                id INTEGER PRIMARY KEY,
                start TEXT NOT NULL,
                "end" TEXT,
                category INTEGER NOT NULL,
                notes TEXT,
                FOREIGN KEY (category) REFERENCES categories(id)
            );

            CREATE INDEX IF NOT EXISTS idx_records_start ON records(start);
            CREATE INDEX IF NOT EXISTS idx_records_category ON records(category);

            CREATE TABLE IF NOT EXISTS configuration (
                key TEXT PRIMARY KEY,
                value TEXT NOT NULL
            );

            INSERT OR IGNORE INTO configuration (key, value) VALUES ('default_category', '1');
            "#,
        )?;
        Ok(())
    }

    // ========== Records ==========

    /// Lists finished records starting within `[from, before)`, ordered by start.
    pub fn records(
        &self,
        from: DateTime<Utc>,
        before: DateTime<Utc>,
    ) -> Result<Vec<Record>, DbError> {
        self.query_records(from, before, None)
    }

    /// Lists finished records of one category starting within `[from, before)`,
    /// ordered by start.
    pub fn records_in_category(
        &self,
        from: DateTime<Utc>,
        before: DateTime<Utc>,
        category_id: i64,
    ) -> Result<Vec<Record>, DbError> {
        self.query_records(from, before, Some(category_id))
    }

    fn query_records(
        &self,
        from: DateTime<Utc>,
        before: DateTime<Utc>,
        category_id: Option<i64>,
    ) -> Result<Vec<Record>, DbError> {
        if before <= from {
            return Ok(Vec::new());
        }
        let mut stmt = self.conn.prepare(&format!(
            r#"
            {SELECT_RECORD}
            WHERE start >= ?1 AND start < ?2 AND "end" IS NOT NULL
              AND (?3 IS NULL OR category = ?3)
            ORDER BY start ASC, id ASC
            "#
        ))?;
        let rows = stmt.query_map(
            params![format_timestamp(from), format_timestamp(before), category_id],
            RecordRow::from_row,
        )?;
        let mut records = Vec::new();
        for row in rows {
            records.push(row?.into_record()?);
        }
        debug!(%from, %before, ?category_id, count = records.len(), "Loaded records");
        Ok(records)
    }

    /// Gets a record by ID.
    pub fn record(&self, id: i64) -> Result<Option<Record>, DbError> {
        self.conn
            .query_row(
                &format!("{SELECT_RECORD} WHERE id = ?1"),
                [id],
                RecordRow::from_row,
            )
            .optional()?
            .map(RecordRow::into_record)
            .transpose()
    }

    /// Gets the running record, if any.
    pub fn active_record(&self) -> Result<Option<Record>, DbError> {
        self.conn
            .query_row(
                &format!(r#"{SELECT_RECORD} WHERE "end" IS NULL ORDER BY id DESC LIMIT 1"#),
                [],
                RecordRow::from_row,
            )
            .optional()?
            .map(RecordRow::into_record)
            .transpose()
    }

    /// Starts a new record and returns its ID.
    ///
    /// Fails if another record is still active.
    pub fn start_record(
        &mut self,
        start: DateTime<Utc>,
        category_id: i64,
        notes: &str,
    ) -> Result<i64, DbError> {
        if let Some(active) = self.active_record()? {
            return Err(DbError::ActiveRecordExists { id: active.id });
        }
        self.ensure_category(category_id)?;
        self.conn.execute(
            "INSERT INTO records (start, category, notes) VALUES (?1, ?2, ?3)",
            params![format_timestamp(start), category_id, non_empty(notes)],
        )?;
        let id = self.conn.last_insert_rowid();
        debug!(id, %start, category_id, "Started record");
        Ok(id)
    }

    /// Replaces the details of an existing record.
    pub fn update_record(
        &mut self,
        id: i64,
        category_id: i64,
        start: DateTime<Utc>,
        end: Option<DateTime<Utc>>,
        notes: &str,
    ) -> Result<(), DbError> {
        let record = match end {
            Some(end) => Record::finished_at(start, end, category_id, notes),
            None => Record::started_at(start, category_id, notes),
        };
        record.validate()?;
        self.ensure_category(category_id)?;
        let updated = self.conn.execute(
            r#"UPDATE records SET category = ?2, start = ?3, "end" = ?4, notes = ?5 WHERE id = ?1"#,
            params![
                id,
                category_id,
                format_timestamp(start),
                end.map(format_timestamp),
                non_empty(notes),
            ],
        )?;
        if updated == 0 {
            return Err(DbError::RecordNotFound(id));
        }
        Ok(())
    }

    /// Finishes the running record at `end`, optionally replacing its notes.
    pub fn finish_active_record(
        &mut self,
        end: DateTime<Utc>,
        notes: Option<&str>,
    ) -> Result<Record, DbError> {
        let active = self.active_record()?.ok_or(DbError::NoActiveRecord)?;
        let notes = notes.unwrap_or(&active.notes);
        let finished = Record {
            id: active.id,
            ..Record::finished_at(active.start, end, active.category_id, notes)
        };
        self.update_record(
            finished.id,
            finished.category_id,
            finished.start,
            finished.end,
            &finished.notes,
        )?;
        debug!(id = finished.id, duration = %finished.duration, "Finished record");
        Ok(finished)
    }

    /// Inserts finished records, all or nothing.
    ///
    /// Every record is validated before anything is written. Returns the IDs
    /// of the created records in input order.
    pub fn import_records(&mut self, records: &[Record]) -> Result<Vec<i64>, DbError> {
        for (index, record) in records.iter().enumerate() {
            if !record.finished() {
                return Err(DbError::InvalidRecord {
                    index,
                    source: ValidationError::Unfinished,
                });
            }
            record
                .validate()
                .map_err(|source| DbError::InvalidRecord { index, source })?;
        }

        let tx = self.conn.transaction()?;
        let mut ids = Vec::with_capacity(records.len());
        {
            let mut stmt = tx.prepare(
                r#"INSERT INTO records (start, "end", category, notes) VALUES (?1, ?2, ?3, ?4)"#,
            )?;
            for record in records {
                stmt.execute(params![
                    format_timestamp(record.start),
                    record.end.map(format_timestamp),
                    record.category_id,
                    non_empty(&record.notes),
                ])?;
                ids.push(tx.last_insert_rowid());
            }
        }
        tx.commit()?;
        debug!(count = ids.len(), "Imported records");
        Ok(ids)
    }

    // ========== Categories ==========

    /// Lists categories ordered by ID.
    pub fn categories(&self) -> Result<Vec<Category>, DbError> {
        let mut stmt = self
            .conn
            .prepare("SELECT id, name FROM categories ORDER BY id ASC")?;
        let rows = stmt.query_map([], |row| {
            Ok(Category {
                id: row.get(0)?,
                name: row.get(1)?,
            })
        })?;
        let mut categories = Vec::new();
        for row in rows {
            categories.push(row?);
        }
        Ok(categories)
    }

    /// Creates a category and returns its ID.
    pub fn add_category(&mut self, name: &str) -> Result<i64, DbError> {
        self.conn
            .execute("INSERT INTO categories (name) VALUES (?1)", [name])?;
        Ok(self.conn.last_insert_rowid())
    }

    fn ensure_category(&self, id: i64) -> Result<(), DbError> {
        let exists: bool = self.conn.query_row(
            "SELECT EXISTS(SELECT 1 FROM categories WHERE id = ?1)",
            [id],
            |row| row.get(0),
        )?;
        if exists {
            Ok(())
        } else {
            Err(DbError::UnknownCategory(id))
        }
    }

    // ========== Settings ==========

    /// Reads all settings. Unknown keys are logged and skipped.
    pub fn settings(&self) -> Result<Settings, DbError> {
        let mut stmt = self.conn.prepare("SELECT key, value FROM configuration")?;
        let rows = stmt.query_map([], |row| {
            Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?))
        })?;
        let mut settings = Settings::default();
        for row in rows {
            let (key, value) = row?;
            match key.parse::<Setting>() {
                Ok(Setting::DefaultCategory) => {
                    settings.default_category_id = parse_category_id(&key, &value)?;
                }
                Err(_) => warn!(%key, "Unsupported configuration key"),
            }
        }
        Ok(settings)
    }

    /// Stores a setting value.
    pub fn update_setting(&mut self, setting: Setting, value: &str) -> Result<(), DbError> {
        match setting {
            Setting::DefaultCategory => {
                let id = parse_category_id(setting.as_str(), value)?;
                self.ensure_category(id)?;
            }
        }
        self.conn.execute(
            "
            INSERT INTO configuration (key, value) VALUES (?1, ?2)
            ON CONFLICT(key) DO UPDATE SET value = excluded.value
            ",
            params![setting.as_str(), value],
        )?;
        debug!(%setting, value, "Updated setting");
        Ok(())
    }
}

/// Raw `records` row before timestamp parsing.
struct RecordRow {
    id: i64,
    start: String,
    end: Option<String>,
    category_id: i64,
    notes: Option<String>,
}

impl RecordRow {
    fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            start: row.get(1)?,
            end: row.get(2)?,
            category_id: row.get(3)?,
            notes: row.get(4)?,
        })
    }

    fn into_record(self) -> Result<Record, DbError> {
        let start = parse_timestamp(&self.start, self.id)?;
        let end = self
            .end
            .as_deref()
            .map(|end| parse_timestamp(end, self.id))
            .transpose()?;
        Ok(Record {
            id: self.id,
            start,
            end,
            duration: end.map_or_else(TimeDelta::zero, |end| end - start),
            category_id: self.category_id,
            notes: self.notes.unwrap_or_default(),
        })
    }
}

fn parse_timestamp(timestamp: &str, record_id: i64) -> Result<DateTime<Utc>, DbError> {
    DateTime::parse_from_rfc3339(timestamp)
        .map(|parsed| parsed.with_timezone(&Utc))
        .map_err(|source| DbError::TimestampParse {
            record_id,
            timestamp: timestamp.to_string(),
            source,
        })
}

fn format_timestamp(timestamp: DateTime<Utc>) -> String {
    timestamp.to_rfc3339_opts(SecondsFormat::Millis, true)
}

fn parse_category_id(key: &str, value: &str) -> Result<i64, DbError> {
    value.trim().parse().map_err(|_| DbError::InvalidSetting {
        key: key.to_string(),
        value: value.to_string(),
    })
}

fn non_empty(notes: &str) -> Option<&str> {
    Some(notes).filter(|notes| !notes.is_empty())
}
