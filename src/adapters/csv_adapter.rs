//! CSV file data adapter.
//!
//! One file per symbol, `<base>/<SYMBOL>.csv`, with the header
//! `date,open,high,low,close,volume` and ISO dates. Rows are returned in
//! file order; `Series::new` rejects files that are not sorted by date.

use crate::domain::error::SigtraderError;
use crate::domain::ohlcv::PriceBar;
use crate::ports::data_port::DataPort;
use chrono::NaiveDate;
use std::fs;
use std::path::{Path, PathBuf};

pub struct CsvAdapter {
    base_path: PathBuf,
}

impl CsvAdapter {
    pub fn new(base_path: PathBuf) -> Self {
        Self { base_path }
    }

    fn csv_path(&self, symbol: &str) -> PathBuf {
        self.base_path.join(format!("{}.csv", symbol))
    }

    /// Reads every bar in `path`, in file order.
    pub fn from_path(path: &Path) -> Result<Vec<PriceBar>, SigtraderError> {
        let content = fs::read_to_string(path).map_err(|e| SigtraderError::DataSource {
            reason: format!("failed to read {}: {}", path.display(), e),
        })?;

        let mut rdr = csv::Reader::from_reader(content.as_bytes());
        let mut bars = Vec::new();

        for (row, result) in rdr.records().enumerate() {
            let record = result.map_err(|e| SigtraderError::DataSource {
                reason: format!("CSV parse error: {}", e),
            })?;
            // header is line 1
            bars.push(parse_record(&record, row + 2)?);
        }

        tracing::debug!(path = %path.display(), bars = bars.len(), "loaded csv");
        Ok(bars)
    }
}

fn field<'r>(
    record: &'r csv::StringRecord,
    index: usize,
    name: &str,
    line: usize,
) -> Result<&'r str, SigtraderError> {
    record
        .get(index)
        .map(str::trim)
        .ok_or_else(|| SigtraderError::DataSource {
            reason: format!("line {}: missing {} column", line, name),
        })
}

fn parse_price(
    record: &csv::StringRecord,
    index: usize,
    name: &str,
    line: usize,
) -> Result<f64, SigtraderError> {
    field(record, index, name, line)?
        .parse()
        .map_err(|e| SigtraderError::DataSource {
            reason: format!("line {}: invalid {} value: {}", line, name, e),
        })
}

// Volumes are sometimes exported as floats; those must be finite and fit i64.
fn parse_volume(raw: &str, line: usize) -> Result<i64, SigtraderError> {
    if let Ok(v) = raw.parse::<i64>() {
        return Ok(v);
    }
    let invalid = |detail: String| SigtraderError::DataSource {
        reason: format!("line {}: invalid volume value: {}", line, detail),
    };
    let v = raw.parse::<f64>().map_err(|e| invalid(e.to_string()))?.round();
    // i64::MAX as f64 rounds up to 2^63, so the upper bound is exclusive
    if !v.is_finite() || v < i64::MIN as f64 || v >= i64::MAX as f64 {
        return Err(invalid(format!("{raw} is out of range")));
    }
    Ok(v as i64)
}

fn parse_record(record: &csv::StringRecord, line: usize) -> Result<PriceBar, SigtraderError> {
    let raw_date = field(record, 0, "date", line)?;
    let date = NaiveDate::parse_from_str(raw_date, "%Y-%m-%d").map_err(|e| {
        SigtraderError::DataSource {
            reason: format!("line {}: invalid date format: {}", line, e),
        }
    })?;

    Ok(PriceBar {
        date,
        open: parse_price(record, 1, "open", line)?,
        high: parse_price(record, 2, "high", line)?,
        low: parse_price(record, 3, "low", line)?,
        close: parse_price(record, 4, "close", line)?,
        volume: parse_volume(field(record, 5, "volume", line)?, line)?,
    })
}

impl DataPort for CsvAdapter {
    fn fetch_ohlcv(
        &self,
        symbol: &str,
        start_date: NaiveDate,
        end_date: NaiveDate,
    ) -> Result<Vec<PriceBar>, SigtraderError> {
        let mut bars = Self::from_path(&self.csv_path(symbol))?;
        bars.retain(|b| b.date >= start_date && b.date <= end_date);
        Ok(bars)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    const HEADER: &str = "date,open,high,low,close,volume\n";

    fn setup_test_data() -> (TempDir, PathBuf) {
        let dir = TempDir::new().unwrap();
        let path = dir.path().to_path_buf();

        let csv_content = "date,open,high,low,close,volume\n\
            2024-01-15,100.0,110.0,90.0,105.0,50000\n\
            2024-01-16,105.0,115.0,100.0,110.0,60000\n\
            2024-01-17,110.0,120.0,105.0,115.0,55000.0\n";

        fs::write(path.join("BHP.csv"), csv_content).unwrap();

        (dir, path)
    }

    fn volume_error(volume: &str) -> String {
        let dir = TempDir::new().unwrap();
        let file = dir.path().join("VOL.csv");
        fs::write(&file, format!("{HEADER}2024-01-15,100,110,90,105,{volume}\n")).unwrap();
        match CsvAdapter::from_path(&file).unwrap_err() {
            SigtraderError::DataSource { reason } => reason,
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn fetch_ohlcv_returns_file_rows() {
        let (_dir, path) = setup_test_data();
        let adapter = CsvAdapter::new(path);

        let start = NaiveDate::from_ymd_opt(2024, 1, 15).unwrap();
        let end = NaiveDate::from_ymd_opt(2024, 1, 17).unwrap();
        let bars = adapter.fetch_ohlcv("BHP", start, end).unwrap();

        assert_eq!(bars.len(), 3);
        assert_eq!(bars[0].date, start);
        assert_eq!(bars[0].open, 100.0);
        assert_eq!(bars[0].high, 110.0);
        assert_eq!(bars[0].low, 90.0);
        assert_eq!(bars[0].close, 105.0);
        assert_eq!(bars[0].volume, 50000);
        assert_eq!(bars[2].volume, 55000);
    }

    #[test]
    fn unordered_rows_keep_file_order() {
        let dir = TempDir::new().unwrap();
        let file = dir.path().join("MIX.csv");
        let content = format!(
            "{HEADER}2024-01-16,105,115,100,110,1\n2024-01-15,100,110,90,105,1\n"
        );
        fs::write(&file, content).unwrap();

        let bars = CsvAdapter::from_path(&file).unwrap();
        assert_eq!(bars[0].date, NaiveDate::from_ymd_opt(2024, 1, 16).unwrap());
        assert_eq!(bars[1].date, NaiveDate::from_ymd_opt(2024, 1, 15).unwrap());
    }

    #[test]
    fn fetch_ohlcv_filters_by_date() {
        let (_dir, path) = setup_test_data();
        let adapter = CsvAdapter::new(path);

        let day = NaiveDate::from_ymd_opt(2024, 1, 16).unwrap();
        let bars = adapter.fetch_ohlcv("BHP", day, day).unwrap();

        assert_eq!(bars.len(), 1);
        assert_eq!(bars[0].date, day);
    }

    #[test]
    fn fetch_ohlcv_missing_file_is_data_error() {
        let (_dir, path) = setup_test_data();
        let adapter = CsvAdapter::new(path);

        let start = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        let end = NaiveDate::from_ymd_opt(2024, 1, 31).unwrap();
        let err = adapter.fetch_ohlcv("XYZ", start, end).unwrap_err();

        assert!(err.is_data_error());
    }

    #[test]
    fn bad_value_reports_line() {
        let dir = TempDir::new().unwrap();
        let file = dir.path().join("BAD.csv");
        let content =
            format!("{HEADER}2024-01-15,100,110,90,105,1\n2024-01-16,abc,110,90,105,1\n");
        fs::write(&file, content).unwrap();

        let err = CsvAdapter::from_path(&file).unwrap_err();
        match err {
            SigtraderError::DataSource { reason } => {
                assert!(reason.contains("line 3"), "{reason}");
                assert!(reason.contains("open"), "{reason}");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn non_finite_or_huge_volume_rejected() {
        for volume in ["nan", "inf", "1e30", "-1e30"] {
            let reason = volume_error(volume);
            assert!(reason.contains("line 2"), "{reason}");
            assert!(reason.contains("invalid volume"), "{reason}");
        }
    }

    #[test]
    fn fractional_volume_rounds() {
        let dir = TempDir::new().unwrap();
        let file = dir.path().join("FRAC.csv");
        fs::write(&file, format!("{HEADER}2024-01-15,100,110,90,105,1234.6\n")).unwrap();
        assert_eq!(CsvAdapter::from_path(&file).unwrap()[0].volume, 1235);
    }
}
