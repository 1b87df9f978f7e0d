//! PostgreSQL result store. Payloads are kept as JSONB.

use crate::domain::config_validation::pool_size;
use crate::domain::error::QuantError;
use crate::ports::config_port::ConfigPort;
use crate::ports::result_port::{validate_table_name, ResultRecord, ResultSink, DEFAULT_TABLE};
use postgres::types::ToSql;
use postgres::NoTls;
use r2d2::{Pool, PooledConnection};
use r2d2_postgres::PostgresConnectionManager;
use serde_json::Value;

pub struct PostgresAdapter {
    pool: Pool<PostgresConnectionManager<NoTls>>,
    default_table: String,
}

impl PostgresAdapter {
    pub fn from_config(config: &dyn ConfigPort) -> Result<Self, QuantError> {
        // [postgres] connection_string first, then [database] conninfo
        let connection_string = config
            .get_string("postgres", "connection_string")
            .or_else(|| config.get_string("database", "conninfo"))
            .ok_or_else(|| QuantError::ConfigMissing {
                section: "postgres".into(),
                key: "connection_string".into(),
            })?;
        let table = config
            .get_string("postgres", "table")
            .unwrap_or_else(|| DEFAULT_TABLE.to_string());
        validate_table_name("postgres", &table)?;

        let pg_config: postgres::Config =
            connection_string
                .parse()
                .map_err(|e: postgres::Error| QuantError::ConfigInvalid {
                    section: "postgres".into(),
                    key: "connection_string".into(),
                    reason: e.to_string(),
                })?;

        let pool_size = pool_size(config, "postgres")?;
        let manager = PostgresConnectionManager::new(pg_config, NoTls);
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

    pub fn default_table(&self) -> &str {
        &self.default_table
    }

    fn connection(&self) -> Result<PooledConnection<PostgresConnectionManager<NoTls>>, QuantError> {
        self.pool.get().map_err(|e: r2d2::Error| QuantError::Database {
            reason: e.to_string(),
        })
    }
}

impl ResultSink for PostgresAdapter {
    fn log_result(&self, payload: &Value, table: Option<&str>) -> Result<ResultRecord, QuantError> {
        let table = validate_table_name("postgres", table.unwrap_or(self.default_table.as_str()))?;
        let record = ResultRecord::new(table, payload.clone());
        let timestamp = record.epoch_seconds();

        let mut conn = self.connection()?;
        conn.batch_execute(&format!(
            "CREATE TABLE IF NOT EXISTS {table} (
                timestamp DOUBLE PRECISION NOT NULL,
                payload JSONB NOT NULL
            )"
        ))
        .map_err(|e| QuantError::DatabaseQuery {
            reason: e.to_string(),
        })?;

        let params: &[&(dyn ToSql + Sync)] = &[&timestamp, payload];
        conn.execute(
            &format!("INSERT INTO {table} (timestamp, payload) VALUES ($1, $2)"),
            params,
        )
        .map_err(|e| QuantError::DatabaseQuery {
            reason: e.to_string(),
        })?;

        Ok(record)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct MapConfig(Vec<(&'static str, &'static str, &'static str)>);

    impl ConfigPort for MapConfig {
        fn get_string(&self, section: &str, key: &str) -> Option<String> {
            self.0
                .iter()
                .find(|(s, k, _)| *s == section && *k == key)
                .map(|(_, _, v)| v.to_string())
        }
        fn get_int(&self, _section: &str, _key: &str, default: i64) -> i64 {
            default
        }
        fn get_double(&self, _section: &str, _key: &str, default: f64) -> f64 {
            default
        }
        fn get_bool(&self, _section: &str, _key: &str, default: bool) -> bool {
            default
        }
        fn keys(&self, _section: &str) -> Vec<String> {
            Vec::new()
        }
    }

    #[test]
    fn from_config_missing_connection_string() {
        let result = PostgresAdapter::from_config(&MapConfig(vec![]));
        match result {
            Err(QuantError::ConfigMissing { section, key }) => {
                assert_eq!(section, "postgres");
                assert_eq!(key, "connection_string");
            }
            Err(other) => panic!("expected ConfigMissing, got: {other}"),
            Ok(_) => panic!("expected error, got Ok"),
        }
    }

    #[test]
    fn from_config_rejects_bad_table() {
        let config = MapConfig(vec![
            ("postgres", "connection_string", "host=localhost"),
            ("postgres", "table", "drop table"),
        ]);
        assert!(matches!(
            PostgresAdapter::from_config(&config),
            Err(QuantError::ConfigInvalid { .. })
        ));
    }
}
