//! SQLite result store.

use crate::domain::config_validation::pool_size;
use crate::domain::error::QuantError;
use crate::ports::config_port::ConfigPort;
use crate::ports::result_port::{validate_table_name, ResultRecord, ResultSink, DEFAULT_TABLE};
use chrono::DateTime;
use r2d2::{Pool, PooledConnection};
use r2d2_sqlite::SqliteConnectionManager;
use rusqlite::params;
use serde_json::Value;

pub struct SqliteAdapter {
    pool: Pool<SqliteConnectionManager>,
    default_table: String,
}

impl SqliteAdapter {
    pub fn from_config(config: &dyn ConfigPort) -> Result<Self, QuantError> {
        let db_path =
            config
                .get_string("sqlite", "path")
                .ok_or_else(|| QuantError::ConfigMissing {
                    section: "sqlite".into(),
                    key: "path".into(),
                })?;
        let table = config
            .get_string("sqlite", "table")
            .unwrap_or_else(|| DEFAULT_TABLE.to_string());
        validate_table_name("sqlite", &table)?;

        let pool_size = pool_size(config, "sqlite")?;

        let manager = SqliteConnectionManager::file(&db_path);
        let pool =
            Pool::builder()
                .max_size(pool_size)
                .build(manager)
                .map_err(|e: r2d2::Error| QuantError::Database {
                    reason: e.to_string(),
                })?;

        Ok(Self {
            pool,
            default_table: table,
        })
    }

    /// Single-connection in-memory store; every pooled connection would
    /// otherwise see its own empty database.
    pub fn in_memory() -> Result<Self, QuantError> {
        let manager = SqliteConnectionManager::memory();
        let pool = Pool::builder()
            .max_size(1)
            .build(manager)
            .map_err(|e: r2d2::Error| QuantError::Database {
                reason: e.to_string(),
            })?;

        Ok(Self {
            pool,
            default_table: DEFAULT_TABLE.to_string(),
        })
    }

    pub fn default_table(&self) -> &str {
        &self.default_table
    }

    pub fn initialize_schema(&self) -> Result<(), QuantError> {
        let conn = self.connection()?;
        Self::ensure_table(&conn, &self.default_table)
    }

    /// All records of `table`, oldest first.
    pub fn records(&self, table: &str) -> Result<Vec<ResultRecord>, QuantError> {
        let table = validate_table_name("sqlite", table)?;
        let conn = self.connection()?;
        Self::ensure_table(&conn, table)?;

        let mut stmt = conn
            .prepare(&format!(
                "SELECT timestamp, payload FROM {table} ORDER BY rowid ASC"
            ))
            .map_err(|e: rusqlite::Error| QuantError::DatabaseQuery {
                reason: e.to_string(),
            })?;

        let rows = stmt
            .query_map([], |row| {
                let timestamp: f64 = row.get(0)?;
                let payload: String = row.get(1)?;
                Ok((timestamp, payload))
            })
            .map_err(|e: rusqlite::Error| QuantError::DatabaseQuery {
                reason: e.to_string(),
            })?;

        let mut records = Vec::new();
        for row in rows {
            let (timestamp, payload) =
                row.map_err(|e: rusqlite::Error| QuantError::DatabaseQuery {
                    reason: e.to_string(),
                })?;
            let timestamp = DateTime::from_timestamp_micros((timestamp * 1_000_000.0).round() as i64)
                .ok_or_else(|| QuantError::DatabaseQuery {
                    reason: format!("timestamp {timestamp} out of range"),
                })?;
            records.push(ResultRecord {
                table: table.to_string(),
                payload: serde_json::from_str(&payload)?,
                timestamp,
            });
        }
        Ok(records)
    }

    fn connection(&self) -> Result<PooledConnection<SqliteConnectionManager>, QuantError> {
        self.pool.get().map_err(|e: r2d2::Error| QuantError::Database {
            reason: e.to_string(),
        })
    }

    fn ensure_table(conn: &rusqlite::Connection, table: &str) -> Result<(), QuantError> {
        conn.execute_batch(&format!(
            "CREATE TABLE IF NOT EXISTS {table} (
                timestamp REAL NOT NULL,
                payload TEXT NOT NULL
            );"
        ))
        .map_err(|e: rusqlite::Error| QuantError::DatabaseQuery {
            reason: e.to_string(),
        })
    }
}

impl ResultSink for SqliteAdapter {
    fn log_result(&self, payload: &Value, table: Option<&str>) -> Result<ResultRecord, QuantError> {
        let table = validate_table_name("sqlite", table.unwrap_or(self.default_table.as_str()))?;
        let record = ResultRecord::new(table, payload.clone());
        let encoded = serde_json::to_string(payload)?;

        let conn = self.connection()?;
        Self::ensure_table(&conn, table)?;
        conn.execute(
            &format!("INSERT INTO {table} (timestamp, payload) VALUES (?1, ?2)"),
            params![record.epoch_seconds(), encoded],
        )
        .map_err(|e: rusqlite::Error| QuantError::DatabaseQuery {
            reason: e.to_string(),
        })?;

        Ok(record)
    }
}
