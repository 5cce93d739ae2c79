#![allow(dead_code)]

use chrono::NaiveDate;
use sigtrader::domain::backtest::BacktestResult;
use sigtrader::domain::error::SigtraderError;
use sigtrader::domain::indicator::IndicatorParams;
pub use sigtrader::domain::ohlcv::PriceBar;
use sigtrader::domain::series::Series;
use sigtrader::domain::strategy::StrategyParams;
use sigtrader::ports::data_port::DataPort;
use sigtrader::ports::optimizer_port::OptimizerPort;
use sigtrader::ports::report_port::ReportPort;
use std::collections::HashMap;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

pub struct MockDataPort {
    pub data: HashMap<String, Vec<PriceBar>>,
    pub errors: HashMap<String, String>,
}

impl MockDataPort {
    pub fn new() -> Self {
        Self {
            data: HashMap::new(),
            errors: HashMap::new(),
        }
    }

    pub fn with_bars(mut self, symbol: &str, bars: Vec<PriceBar>) -> Self {
        self.data.insert(symbol.to_string(), bars);
        self
    }

    pub fn with_error(mut self, symbol: &str, reason: &str) -> Self {
        self.errors.insert(symbol.to_string(), reason.to_string());
        self
    }
}

impl DataPort for MockDataPort {
    fn fetch_ohlcv(
        &self,
        symbol: &str,
        start_date: NaiveDate,
        end_date: NaiveDate,
    ) -> Result<Vec<PriceBar>, SigtraderError> {
        if let Some(reason) = self.errors.get(symbol) {
            return Err(SigtraderError::DataSource {
                reason: reason.clone(),
            });
        }
        Ok(self
            .data
            .get(symbol)
            .map(|bars| {
                bars.iter()
                    .filter(|b| b.date >= start_date && b.date <= end_date)
                    .cloned()
                    .collect()
            })
            .unwrap_or_default())
    }
}

/// Returns one parameter set and records the training slice lengths it saw.
pub struct RecordingOptimizer {
    pub params: StrategyParams,
    pub calls: AtomicUsize,
    pub train_lengths: Mutex<Vec<usize>>,
}

impl RecordingOptimizer {
    pub fn new(params: StrategyParams) -> Self {
        Self {
            params,
            calls: AtomicUsize::new(0),
            train_lengths: Mutex::new(Vec::new()),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl OptimizerPort for RecordingOptimizer {
    fn optimize(&self, train: &Series) -> Result<StrategyParams, SigtraderError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.train_lengths.lock().unwrap().push(train.len());
        Ok(self.params)
    }
}

/// Captures what would have been written.
pub struct MockReportPort {
    pub written: Mutex<Vec<(String, usize, usize)>>,
}

impl MockReportPort {
    pub fn new() -> Self {
        Self {
            written: Mutex::new(Vec::new()),
        }
    }
}

impl ReportPort for MockReportPort {
    fn write(&self, result: &BacktestResult, output_path: &str) -> Result<(), SigtraderError> {
        self.written.lock().unwrap().push((
            output_path.to_string(),
            result.curve.len(),
            result.trades.len(),
        ));
        Ok(())
    }
}

pub fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

pub fn make_bar(date: &str, close: f64) -> PriceBar {
    PriceBar {
        date: NaiveDate::parse_from_str(date, "%Y-%m-%d").unwrap(),
        open: close,
        high: close + 1.0,
        low: close - 1.0,
        close,
        volume: 1000,
    }
}

/// Daily bars from 2024-01-01 with the given closes.
pub fn bars_from_closes(closes: &[f64]) -> Vec<PriceBar> {
    let start = date(2024, 1, 1);
    closes
        .iter()
        .enumerate()
        .map(|(i, &close)| PriceBar {
            date: start + chrono::Duration::days(i as i64),
            open: close,
            high: close + 1.0,
            low: close - 1.0,
            close,
            volume: 1000,
        })
        .collect()
}

pub fn series_from_closes(closes: &[f64]) -> Series {
    Series::new(bars_from_closes(closes)).unwrap()
}

/// Trending sine wave; produces a mix of buy and sell signals.
pub fn wave_closes(count: usize) -> Vec<f64> {
    (0..count)
        .map(|i| 100.0 + (i as f64 * 0.25).sin() * 8.0 + i as f64 * 0.1)
        .collect()
}

pub fn small_params() -> StrategyParams {
    StrategyParams {
        indicators: IndicatorParams {
            ma_fast_span: 2,
            ma_slow_span: 3,
            rsi_period: 3,
            atr_period: 3,
        },
        ..StrategyParams::default()
    }
}

pub fn medium_params() -> StrategyParams {
    StrategyParams {
        indicators: IndicatorParams {
            ma_fast_span: 5,
            ma_slow_span: 10,
            rsi_period: 7,
            atr_period: 7,
        },
        ..StrategyParams::default()
    }
}

pub fn write_csv(path: &std::path::Path, bars: &[PriceBar]) {
    let mut content = String::from("date,open,high,low,close,volume\n");
    for b in bars {
        content.push_str(&format!(
            "{},{},{},{},{},{}\n",
            b.date, b.open, b.high, b.low, b.close, b.volume
        ));
    }
    std::fs::write(path, content).unwrap();
}
