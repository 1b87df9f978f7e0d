//! CSV file price adapter.
//!
//! A symbol names a file under the base directory, with or without its
//! `.csv` extension. The price column is the first header named `price`,
//! `close` or `adj_close` (case-insensitive); a single-column file is read
//! as-is. Rows are taken in file order.

use crate::domain::error::QuantError;
use crate::domain::series::PriceSeries;
use crate::ports::data_port::DataPort;
use std::fs;
use std::path::PathBuf;

const PRICE_COLUMNS: [&str; 3] = ["price", "close", "adj_close"];

pub struct CsvAdapter {
    base_path: PathBuf,
}

impl CsvAdapter {
    pub fn new(base_path: PathBuf) -> Self {
        Self { base_path }
    }

    fn csv_path(&self, symbol: &str) -> PathBuf {
        if symbol.ends_with(".csv") {
            self.base_path.join(symbol)
        } else {
            self.base_path.join(format!("{symbol}.csv"))
        }
    }

    fn price_column(headers: &csv::StringRecord) -> Option<usize> {
        for wanted in PRICE_COLUMNS {
            if let Some(idx) = headers
                .iter()
                .position(|h| h.trim().eq_ignore_ascii_case(wanted))
            {
                return Some(idx);
            }
        }
        (headers.len() == 1).then_some(0)
    }
}

impl DataPort for CsvAdapter {
    fn load_prices(&self, symbol: &str) -> Result<PriceSeries, QuantError> {
        let path = self.csv_path(symbol);
        let content = fs::read_to_string(&path).map_err(|e| QuantError::DataLoad {
            reason: format!("failed to read {}: {}", path.display(), e),
        })?;

        let mut rdr = csv::Reader::from_reader(content.as_bytes());
        let headers = rdr.headers().map_err(|e| QuantError::DataLoad {
            reason: format!("CSV header error in {}: {}", path.display(), e),
        })?;
        let column = Self::price_column(headers).ok_or_else(|| QuantError::DataLoad {
            reason: format!("no price or close column in {}", path.display()),
        })?;

        let mut prices = Vec::new();
        for (row, result) in rdr.records().enumerate() {
            let record = result.map_err(|e| QuantError::DataLoad {
                reason: format!("CSV parse error: {}", e),
            })?;
            let raw = record.get(column).ok_or_else(|| QuantError::DataLoad {
                reason: format!("row {} is missing the price column", row + 1),
            })?;
            let price: f64 = raw.trim().parse().map_err(|e| QuantError::DataLoad {
                reason: format!("invalid price {:?} on row {}: {}", raw, row + 1, e),
            })?;
            prices.push(price);
        }

        PriceSeries::new(prices)
    }
}
