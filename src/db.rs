//! Database module for the expenses service
//!
//! Provides persistence for financial records and, when the SQLite session
//! backend is selected, for USSD session values.

mod schema;

use schema::{RECORD_COLUMNS, SCHEMA};

use crate::records::{
    BalanceSummary, NewRecord, Record, RecordFilters, RecordPage, RecordType, RecordUpdate,
    SortField,
};
use chrono::{DateTime, SecondsFormat, Utc};
use rusqlite::types::Type;
use rusqlite::{params, params_from_iter, Connection, OptionalExtension};
use rust_decimal::Decimal;
use std::path::Path;
use std::str::FromStr;
use std::sync::{Arc, Mutex, MutexGuard};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum DbError {
    #[error("Database error: {0}")]
    Sqlite(#[from] rusqlite::Error),
    #[error("Database connection lock poisoned")]
    LockPoisoned,
}

pub type DbResult<T> = Result<T, DbError>;

/// Thread-safe database handle
#[derive(Clone)]
pub struct Database {
    conn: Arc<Mutex<Connection>>,
}

impl Database {
    /// Open or create database at the given path
    pub fn open<P: AsRef<Path>>(path: P) -> DbResult<Self> {
        let conn = Connection::open(path)?;
        let db = Self {
            conn: Arc::new(Mutex::new(conn)),
        };
        db.run_migrations()?;
        Ok(db)
    }

    /// Open an in-memory database (for testing and the `memory` session backend)
    pub fn open_in_memory() -> DbResult<Self> {
        let conn = Connection::open_in_memory()?;
        let db = Self {
            conn: Arc::new(Mutex::new(conn)),
        };
        db.run_migrations()?;
        Ok(db)
    }

    fn conn(&self) -> DbResult<MutexGuard<'_, Connection>> {
        self.conn.lock().map_err(|_| DbError::LockPoisoned)
    }

    fn run_migrations(&self) -> DbResult<()> {
        let conn = self.conn()?;
        conn.execute_batch(SCHEMA)?;
        Ok(())
    }

    // ==================== Record Operations ====================

    /// Insert a new record. Validation happens in the record service.
    pub fn create_record(&self, new: &NewRecord) -> DbResult<Record> {
        let conn = self.conn()?;
        let now = Utc::now();
        let record = Record {
            id: uuid::Uuid::new_v4().to_string(),
            record_type: new.record_type,
            category: new.category.clone(),
            amount: new.amount,
            description: new.description.clone(),
            created_at: now,
            updated_at: now,
        };

        conn.execute(
            "INSERT INTO records (id, record_type, category, amount, description, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?6)",
            params![
                record.id,
                record.record_type.as_str(),
                record.category,
                record.amount.to_string(),
                record.description,
                format_datetime(&now),
            ],
        )?;

        Ok(record)
    }

    /// Get a record by ID
    pub fn get_record(&self, id: &str) -> DbResult<Option<Record>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(&format!(
            "SELECT {RECORD_COLUMNS} FROM records WHERE id = ?1"
        ))?;

        stmt.query_row(params![id], parse_record_row)
            .optional()
            .map_err(DbError::from)
    }

    /// List one page of records matching the filters, plus the filtered total
    pub fn list_records(&self, filters: &RecordFilters) -> DbResult<RecordPage> {
        let conn = self.conn()?;
        let (where_clause, args) = build_where(filters.record_type, filters.category.as_deref());

        let total_count: i64 = conn.query_row(
            &format!("SELECT COUNT(*) FROM records{where_clause}"),
            params_from_iter(args.iter()),
            |row| row.get(0),
        )?;

        let order_column = match filters.sort_by {
            SortField::CreatedAt => "created_at",
            SortField::UpdatedAt => "updated_at",
            SortField::Amount => "CAST(amount AS REAL)",
        };
        let direction = if filters.sort_descending { "DESC" } else { "ASC" };

        let mut stmt = conn.prepare(&format!(
            "SELECT {RECORD_COLUMNS} FROM records{where_clause}
             ORDER BY {order_column} {direction}, rowid {direction}
             LIMIT {limit} OFFSET {offset}",
            limit = filters.effective_page_size(),
            offset = filters.offset(),
        ))?;

        let records = stmt
            .query_map(params_from_iter(args.iter()), parse_record_row)?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(RecordPage {
            records,
            total_count: u64::try_from(total_count).unwrap_or_default(),
        })
    }

    /// Sum income and expense over the records matching the type/category filters
    pub fn balance(
        &self,
        record_type: Option<RecordType>,
        category: Option<&str>,
    ) -> DbResult<BalanceSummary> {
        let conn = self.conn()?;
        let (where_clause, args) = build_where(record_type, category);
        let mut stmt = conn.prepare(&format!(
            "SELECT record_type, amount FROM records{where_clause}"
        ))?;

        let rows = stmt.query_map(params_from_iter(args.iter()), |row| {
            Ok((
                parse_record_type(row, 0)?,
                parse_amount(row, 1)?,
            ))
        })?;

        let mut summary = BalanceSummary::default();
        for row in rows {
            let (record_type, amount) = row?;
            summary.add(record_type, amount);
        }
        Ok(summary)
    }

    /// Update type, category and description. Returns `None` when the record is absent.
    pub fn update_record(&self, id: &str, update: &RecordUpdate) -> DbResult<Option<Record>> {
        {
            let conn = self.conn()?;
            let now = Utc::now();
            let updated = conn.execute(
                "UPDATE records
                 SET record_type = ?1, category = ?2, description = COALESCE(?3, description), updated_at = ?4
                 WHERE id = ?5",
                params![
                    update.record_type.as_str(),
                    update.category,
                    update.description,
                    format_datetime(&now),
                    id,
                ],
            )?;

            if updated == 0 {
                return Ok(None);
            }
        }
        self.get_record(id)
    }

    /// Delete a record. Returns false when nothing was deleted.
    pub fn delete_record(&self, id: &str) -> DbResult<bool> {
        let conn = self.conn()?;
        let deleted = conn.execute("DELETE FROM records WHERE id = ?1", params![id])?;
        Ok(deleted > 0)
    }

    // ==================== Session Operations ====================

    /// Fetch a live session value. Expired rows are removed and reported as absent.
    pub fn get_session_value(&self, key: &str, now: DateTime<Utc>) -> DbResult<Option<String>> {
        let conn = self.conn()?;
        let row: Option<(String, String)> = conn
            .query_row(
                "SELECT value, expires_at FROM ussd_sessions WHERE key = ?1",
                params![key],
                |row| Ok((row.get(0)?, row.get(1)?)),
            )
            .optional()?;

        match row {
            Some((value, expires_at)) if parse_datetime(&expires_at) > now => Ok(Some(value)),
            Some(_) => {
                conn.execute("DELETE FROM ussd_sessions WHERE key = ?1", params![key])?;
                Ok(None)
            }
            None => Ok(None),
        }
    }

    /// Insert or replace a session value with a fresh expiry, then sweep every
    /// session that has expired as of `now`
    pub fn put_session_value(
        &self,
        key: &str,
        value: &str,
        expires_at: DateTime<Utc>,
        now: DateTime<Utc>,
    ) -> DbResult<()> {
        let conn = self.conn()?;
        conn.execute(
            "INSERT INTO ussd_sessions (key, value, expires_at) VALUES (?1, ?2, ?3)
             ON CONFLICT(key) DO UPDATE SET value = excluded.value, expires_at = excluded.expires_at",
            params![key, value, format_datetime(&expires_at)],
        )?;
        conn.execute(
            "DELETE FROM ussd_sessions WHERE expires_at <= ?1",
            params![format_datetime(&now)],
        )?;
        Ok(())
    }

    pub fn delete_session_value(&self, key: &str) -> DbResult<()> {
        let conn = self.conn()?;
        conn.execute("DELETE FROM ussd_sessions WHERE key = ?1", params![key])?;
        Ok(())
    }

    /// Rows in the session table, live or not
    #[cfg(test)]
    pub fn session_count(&self) -> DbResult<u64> {
        let conn = self.conn()?;
        let count: i64 = conn.query_row("SELECT COUNT(*) FROM ussd_sessions", [], |row| row.get(0))?;
        Ok(u64::try_from(count).unwrap_or_default())
    }

    /// Drop every session that expired before `now`
    pub fn purge_expired_sessions(&self, now: DateTime<Utc>) -> DbResult<usize> {
        let conn = self.conn()?;
        let purged = conn.execute(
            "DELETE FROM ussd_sessions WHERE expires_at <= ?1",
            params![format_datetime(&now)],
        )?;
        Ok(purged)
    }
}

/// Build a WHERE clause (with leading space) and its positional arguments
fn build_where(record_type: Option<RecordType>, category: Option<&str>) -> (String, Vec<String>) {
    let mut conditions = Vec::new();
    let mut args = Vec::new();

    if let Some(record_type) = record_type {
        args.push(record_type.as_str().to_string());
        conditions.push(format!("record_type = ?{}", args.len()));
    }
    if let Some(category) = category.filter(|c| !c.is_empty()) {
        args.push(category.to_string());
        conditions.push(format!("category = ?{}", args.len()));
    }

    if conditions.is_empty() {
        (String::new(), args)
    } else {
        (format!(" WHERE {}", conditions.join(" AND ")), args)
    }
}

/// Parse a record row selected with `RECORD_COLUMNS`
fn parse_record_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Record> {
    Ok(Record {
        id: row.get(0)?,
        record_type: parse_record_type(row, 1)?,
        category: row.get(2)?,
        amount: parse_amount(row, 3)?,
        description: row.get(4)?,
        created_at: parse_datetime(&row.get::<_, String>(5)?),
        updated_at: parse_datetime(&row.get::<_, String>(6)?),
    })
}

fn parse_record_type(row: &rusqlite::Row<'_>, idx: usize) -> rusqlite::Result<RecordType> {
    let raw: String = row.get(idx)?;
    RecordType::from_str(&raw)
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, e.into()))
}

fn parse_amount(row: &rusqlite::Row<'_>, idx: usize) -> rusqlite::Result<Decimal> {
    let raw: String = row.get(idx)?;
    Decimal::from_str(&raw)
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
}

/// Fixed-width RFC 3339 so lexical order matches chronological order
fn format_datetime(dt: &DateTime<Utc>) -> String {
    dt.to_rfc3339_opts(SecondsFormat::Micros, true)
}

fn parse_datetime(s: &str) -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(s).map_or_else(|_| Utc::now(), |dt| dt.with_timezone(&Utc))
}
