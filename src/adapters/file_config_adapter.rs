//! INI configuration backed by `configparser`.
//!
//! Section and key names are case-insensitive. Blank values read as absent,
//! so `target_return =` behaves like a missing key. `;` and `#` start
//! comments, which is why matrix rows are separated with `|`.

use crate::domain::config_validation::parse_flag;
use crate::domain::error::QuantError;
use crate::ports::config_port::ConfigPort;
use configparser::ini::Ini;
use std::path::Path;

pub struct FileConfigAdapter {
    ini: Ini,
}

impl FileConfigAdapter {
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, QuantError> {
        let path = path.as_ref();
        let mut ini = Ini::new();
        ini.load(path).map_err(|reason| QuantError::ConfigParse {
            file: path.display().to_string(),
            reason,
        })?;
        Ok(Self { ini })
    }

    pub fn from_string(content: &str) -> Result<Self, QuantError> {
        let mut ini = Ini::new();
        ini.read(content.to_string())
            .map_err(|reason| QuantError::ConfigParse {
                file: "<inline>".into(),
                reason,
            })?;
        Ok(Self { ini })
    }

    fn value(&self, section: &str, key: &str) -> Option<String> {
        self.ini
            .get(section, key)
            .map(|raw| raw.trim().to_string())
            .filter(|raw| !raw.is_empty())
    }
}

impl ConfigPort for FileConfigAdapter {
    fn get_string(&self, section: &str, key: &str) -> Option<String> {
        self.value(section, key)
    }

    fn get_int(&self, section: &str, key: &str, default: i64) -> i64 {
        self.value(section, key)
            .and_then(|raw| raw.parse().ok())
            .unwrap_or(default)
    }

    fn get_double(&self, section: &str, key: &str, default: f64) -> f64 {
        self.value(section, key)
            .and_then(|raw| raw.parse().ok())
            .unwrap_or(default)
    }

    fn get_bool(&self, section: &str, key: &str, default: bool) -> bool {
        self.value(section, key)
            .and_then(|raw| parse_flag(&raw))
            .unwrap_or(default)
    }

    fn keys(&self, section: &str) -> Vec<String> {
        let Some(entries) = self.ini.get_map_ref().get(&section.to_lowercase()) else {
            return Vec::new();
        };
        entries
            .iter()
            .filter(|(_, value)| value.as_deref().is_some_and(|v| !v.trim().is_empty()))
            .map(|(key, _)| key.clone())
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    const RUN_INI: &str = r#"
[Backtest]
Initial_Capital = 25000
prices = data/SPY.csv

[portfolio]
expected_returns = 0.05, 0.07
covariance = 0.1, 0.02 | 0.02, 0.08
allow_short = off
target_return =

[sqlite]
path = results.db
pool_size = 2
"#;

    fn adapter() -> FileConfigAdapter {
        FileConfigAdapter::from_string(RUN_INI).unwrap()
    }

    #[test]
    fn names_are_case_insensitive() {
        let config = adapter();
        assert_eq!(config.get_double("backtest", "initial_capital", 0.0), 25000.0);
        assert_eq!(config.get_string("BACKTEST", "prices").as_deref(), Some("data/SPY.csv"));
    }

    #[test]
    fn blank_value_reads_as_missing() {
        let config = adapter();
        assert_eq!(config.get_string("portfolio", "target_return"), None);
        assert_eq!(config.get_double("portfolio", "target_return", 0.04), 0.04);
        assert!(!config.keys("portfolio").contains(&"target_return".to_string()));
    }

    #[test]
    fn matrix_rows_survive_parsing() {
        assert_eq!(
            adapter().get_string("portfolio", "covariance").as_deref(),
            Some("0.1, 0.02 | 0.02, 0.08")
        );
    }

    #[test]
    fn numeric_getters_fall_back_on_bad_input() {
        let config = FileConfigAdapter::from_string("[sqlite]\npool_size = many\n").unwrap();
        assert_eq!(config.get_int("sqlite", "pool_size", 4), 4);
        assert_eq!(adapter().get_int("sqlite", "pool_size", 4), 2);
        assert_eq!(adapter().get_double("sqlite", "path", 1.5), 1.5);
    }

    #[test]
    fn flags() {
        let config = FileConfigAdapter::from_string(
            "[portfolio]\na = Yes\nb = on\nc = 0\nd = maybe\n",
        )
        .unwrap();
        assert!(config.get_bool("portfolio", "a", false));
        assert!(config.get_bool("portfolio", "b", false));
        assert!(!config.get_bool("portfolio", "c", true));
        assert!(config.get_bool("portfolio", "d", true));
        assert!(!adapter().get_bool("portfolio", "allow_short", true));
    }

    #[test]
    fn keys_of_section() {
        let mut keys = adapter().keys("portfolio");
        keys.sort();
        assert_eq!(keys, vec!["allow_short", "covariance", "expected_returns"]);
        assert!(adapter().keys("grid").is_empty());
    }

    #[test]
    fn loads_from_disk() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(b"[grid]\nlookback = 3, 5\n").unwrap();
        let config = FileConfigAdapter::from_file(file.path()).unwrap();
        assert_eq!(config.get_string("grid", "lookback").as_deref(), Some("3, 5"));
    }

    #[test]
    fn missing_file_is_a_parse_error() {
        match FileConfigAdapter::from_file("/nonexistent/quantlab/run.ini") {
            Err(QuantError::ConfigParse { file, .. }) => assert!(file.ends_with("run.ini")),
            Err(other) => panic!("expected ConfigParse, got {other}"),
            Ok(_) => panic!("expected an error"),
        }
    }
}
