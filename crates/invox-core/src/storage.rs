//! SQLite store for processed invoices.

use std::collections::HashSet;
use std::path::Path;

use rusqlite::{params, Connection, Row};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::error::StoreError;
use crate::models::invoice::InvoiceRecord;

const CREATE_TABLE: &str = "
    CREATE TABLE IF NOT EXISTS invoices (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        file_name TEXT,
        vendor TEXT,
        number TEXT,
        date TEXT,
        total REAL,
        currency TEXT,
        raw_json TEXT,
        created_at DATETIME DEFAULT CURRENT_TIMESTAMP
    );
";

/// Columns added to tables created by older versions.
/// `ALTER TABLE` cannot add a non-constant default, so `created_at` comes
/// back without one there and is filled on insert.
const ADDED_COLUMNS: [(&str, &str); 3] = [
    ("file_name", "TEXT"),
    ("raw_json", "TEXT"),
    ("created_at", "DATETIME"),
];

/// A row of the `invoices` table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredInvoice {
    pub id: i64,
    pub file_name: Option<String>,
    pub vendor: Option<String>,
    pub number: Option<String>,
    pub date: Option<String>,
    pub total: Option<f64>,
    pub currency: Option<String>,
    pub raw_json: Option<String>,
    pub created_at: Option<String>,
}

impl StoredInvoice {
    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get("id")?,
            file_name: row.get("file_name")?,
            vendor: row.get("vendor")?,
            number: row.get("number")?,
            date: row.get("date")?,
            total: row.get("total")?,
            currency: row.get("currency")?,
            raw_json: row.get("raw_json")?,
            created_at: row.get("created_at")?,
        })
    }
}

/// Invoice database handle.
pub struct InvoiceStore {
    conn: Connection,
}

impl InvoiceStore {
    /// Open (creating if needed) the database at `path` and bring its
    /// schema up to date.
    pub fn open(path: &Path) -> Result<Self, StoreError> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        let conn = Connection::open(path)?;
        info!("Opened invoice database {}", path.display());
        Self::with_connection(conn)
    }

    /// Open a private in-memory database.
    pub fn open_in_memory() -> Result<Self, StoreError> {
        Self::with_connection(Connection::open_in_memory()?)
    }

    fn with_connection(conn: Connection) -> Result<Self, StoreError> {
        let store = Self { conn };
        store.ensure_schema()?;
        Ok(store)
    }

    fn ensure_schema(&self) -> Result<(), StoreError> {
        self.conn.execute_batch(CREATE_TABLE)?;

        let existing = self.columns()?;
        for (name, ty) in ADDED_COLUMNS {
            if !existing.contains(name) {
                debug!("Adding missing column invoices.{}", name);
                self.conn
                    .execute(&format!("ALTER TABLE invoices ADD COLUMN {name} {ty}"), [])?;
            }
        }
        Ok(())
    }

    fn columns(&self) -> Result<HashSet<String>, StoreError> {
        let mut stmt = self.conn.prepare("PRAGMA table_info(invoices)")?;
        let names = stmt
            .query_map([], |row| row.get::<_, String>(1))?
            .collect::<rusqlite::Result<HashSet<_>>>()?;
        Ok(names)
    }

    /// Store a processed invoice. Returns the new row id.
    pub fn insert(
        &self,
        file_name: &str,
        record: &InvoiceRecord,
        raw_json: &str,
    ) -> Result<i64, StoreError> {
        self.conn.execute(
            "INSERT INTO invoices (file_name, vendor, number, date, total, currency, raw_json, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, CURRENT_TIMESTAMP)",
            params![
                file_name,
                record.vendor,
                record.number,
                record.date,
                record.total,
                record.currency,
                raw_json,
            ],
        )?;
        let id = self.conn.last_insert_rowid();
        debug!(id, file = file_name, "Stored invoice");
        Ok(id)
    }

    /// Most recent invoices first.
    pub fn list(&self, limit: usize) -> Result<Vec<StoredInvoice>, StoreError> {
        let mut stmt = self.conn.prepare(
            "SELECT id, file_name, vendor, number, date, total, currency, raw_json, created_at
             FROM invoices ORDER BY id DESC LIMIT ?1",
        )?;
        let limit = i64::try_from(limit).unwrap_or(i64::MAX);
        let rows = stmt
            .query_map(params![limit], StoredInvoice::from_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
    }

    pub fn count(&self) -> Result<u64, StoreError> {
        let count: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM invoices", [], |row| row.get(0))?;
        Ok(count.max(0) as u64)
    }
}
