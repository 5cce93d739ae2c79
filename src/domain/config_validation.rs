//! Configuration validation.
//!
//! Validates every config field before a run. Keys that are present but do
//! not parse are rejected rather than silently replaced by their default.

use crate::domain::backtest::BacktestConfig;
use crate::domain::error::SigtraderError;
use crate::domain::signal::Thresholds;
use crate::domain::sizing::PositionSizer;
use crate::domain::walk_forward::WalkForwardConfig;
use crate::ports::config_port::ConfigPort;
use chrono::NaiveDate;

pub const STRATEGY_PERIOD_KEYS: [(&str, usize); 4] = [
    ("ma_fast", 20),
    ("ma_slow", 50),
    ("rsi_period", 14),
    ("atr_period", 14),
];

pub fn validate_strategy_config(config: &dyn ConfigPort) -> Result<(), SigtraderError> {
    validate_periods(config)?;
    validate_thresholds(config)?;
    validate_sizing(config)?;
    Ok(())
}

pub fn validate_backtest_config(config: &dyn ConfigPort) -> Result<(), SigtraderError> {
    validate_capital_and_commission(config)?;
    date_range(config)?;
    Ok(())
}

pub fn validate_walk_forward_config(config: &dyn ConfigPort) -> Result<(), SigtraderError> {
    let defaults = WalkForwardConfig::default();
    WalkForwardConfig {
        train_months: read_count(config, "walkforward", "train_months", defaults.train_months)?,
        test_months: read_count(config, "walkforward", "test_months", defaults.test_months)?,
        month_length_bars: read_count(
            config,
            "walkforward",
            "month_length_bars",
            defaults.month_length_bars,
        )?,
    }
    .validate()
}

/// Optional `[backtest] start_date`/`end_date`; start must precede end.
pub fn date_range(
    config: &dyn ConfigPort,
) -> Result<(Option<NaiveDate>, Option<NaiveDate>), SigtraderError> {
    let start = parse_date(config.get_string("backtest", "start_date").as_deref(), "start_date")?;
    let end = parse_date(config.get_string("backtest", "end_date").as_deref(), "end_date")?;

    if let (Some(s), Some(e)) = (start, end) {
        if s >= e {
            return Err(SigtraderError::invalid(
                "backtest",
                "start_date",
                "start_date must be before end_date",
            ));
        }
    }
    Ok((start, end))
}

fn validate_periods(config: &dyn ConfigPort) -> Result<(), SigtraderError> {
    for (key, default) in STRATEGY_PERIOD_KEYS {
        read_count(config, "strategy", key, default)?;
    }
    Ok(())
}

fn validate_thresholds(config: &dyn ConfigPort) -> Result<(), SigtraderError> {
    let defaults = Thresholds::default();
    Thresholds {
        rsi_oversold: read_double(config, "strategy", "rsi_oversold", defaults.rsi_oversold)?,
        rsi_overbought: read_double(config, "strategy", "rsi_overbought", defaults.rsi_overbought)?,
    }
    .validate()
}

fn validate_sizing(config: &dyn ConfigPort) -> Result<(), SigtraderError> {
    let risk = read_double(config, "strategy", "risk_per_trade", 0.02)?;
    let multiplier = read_double(config, "strategy", "atr_multiplier", 1.5)?;
    PositionSizer::new(risk, multiplier).map(|_| ())
}

fn validate_capital_and_commission(config: &dyn ConfigPort) -> Result<(), SigtraderError> {
    let defaults = BacktestConfig::default();
    BacktestConfig {
        initial_capital: read_double(
            config,
            "backtest",
            "initial_capital",
            defaults.initial_capital,
        )?,
        commission_rate: read_double(config, "backtest", "commission", defaults.commission_rate)?,
    }
    .validate()
}

/// `default` when the key is absent; an error when it is present but not a number.
pub(crate) fn read_double(
    config: &dyn ConfigPort,
    section: &str,
    key: &str,
    default: f64,
) -> Result<f64, SigtraderError> {
    match config.get_string(section, key) {
        None => Ok(default),
        Some(raw) => raw.trim().parse::<f64>().map_err(|_| {
            SigtraderError::invalid(section, key, format!("{key} must be a number, got '{raw}'"))
        }),
    }
}

/// A period or count: an integer of at least 1.
pub(crate) fn read_count(
    config: &dyn ConfigPort,
    section: &str,
    key: &str,
    default: usize,
) -> Result<usize, SigtraderError> {
    let Some(raw) = config.get_string(section, key) else {
        return Ok(default);
    };
    let value = raw.trim().parse::<i64>().map_err(|_| {
        SigtraderError::invalid(section, key, format!("{key} must be an integer, got '{raw}'"))
    })?;
    match usize::try_from(value) {
        Ok(count) if count >= 1 => Ok(count),
        _ => Err(SigtraderError::invalid(
            section,
            key,
            format!("{key} must be at least 1"),
        )),
    }
}

fn parse_date(value: Option<&str>, field: &str) -> Result<Option<NaiveDate>, SigtraderError> {
    match value.map(str::trim).filter(|s| !s.is_empty()) {
        None => Ok(None),
        Some(s) => NaiveDate::parse_from_str(s, "%Y-%m-%d")
            .map(Some)
            .map_err(|_| {
                SigtraderError::invalid(
                    "backtest",
                    field,
                    format!("invalid {} format, expected YYYY-MM-DD", field),
                )
            }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::file_config_adapter::FileConfigAdapter;

    fn make_config(content: &str) -> FileConfigAdapter {
        FileConfigAdapter::from_string(content).unwrap()
    }

    fn invalid_key(err: SigtraderError) -> String {
        match err {
            SigtraderError::ConfigInvalid { key, .. } => key,
            other => panic!("expected ConfigInvalid, got {other}"),
        }
    }

    #[test]
    fn empty_config_uses_valid_defaults() {
        let config = make_config("[strategy]\n[backtest]\n[walkforward]\n");
        assert!(validate_strategy_config(&config).is_ok());
        assert!(validate_backtest_config(&config).is_ok());
        assert!(validate_walk_forward_config(&config).is_ok());
    }

    #[test]
    fn valid_full_config_passes() {
        let config = make_config(
            r#"
[strategy]
ma_fast = 20
ma_slow = 50
rsi_period = 14
rsi_oversold = 40
rsi_overbought = 85
atr_period = 14
atr_multiplier = 1.5
risk_per_trade = 0.02

[backtest]
symbol = TLS
initial_capital = 10000
commission = 0.001
start_date = 2020-01-01
end_date = 2024-12-31

[walkforward]
train_months = 24
test_months = 6
month_length_bars = 21
"#,
        );
        assert!(validate_strategy_config(&config).is_ok());
        assert!(validate_backtest_config(&config).is_ok());
        assert!(validate_walk_forward_config(&config).is_ok());
    }

    #[test]
    fn zero_period_fails() {
        let config = make_config("[strategy]\nrsi_period = 0\n");
        let err = validate_strategy_config(&config).unwrap_err();
        assert_eq!(invalid_key(err), "rsi_period");
    }

    #[test]
    fn non_numeric_period_fails() {
        let config = make_config("[strategy]\nma_slow = fifty\n");
        let err = validate_strategy_config(&config).unwrap_err();
        assert_eq!(invalid_key(err), "ma_slow");
    }

    #[test]
    fn threshold_out_of_range_fails() {
        let config = make_config("[strategy]\nrsi_overbought = 120\n");
        let err = validate_strategy_config(&config).unwrap_err();
        assert_eq!(invalid_key(err), "rsi_overbought");
    }

    #[test]
    fn inverted_thresholds_fail() {
        let config = make_config("[strategy]\nrsi_oversold = 70\nrsi_overbought = 30\n");
        assert!(validate_strategy_config(&config).unwrap_err().is_config_error());
    }

    #[test]
    fn risk_per_trade_bounds() {
        let config = make_config("[strategy]\nrisk_per_trade = 0\n");
        assert_eq!(invalid_key(validate_strategy_config(&config).unwrap_err()), "risk_per_trade");

        let config = make_config("[strategy]\nrisk_per_trade = 1.5\n");
        assert_eq!(invalid_key(validate_strategy_config(&config).unwrap_err()), "risk_per_trade");

        let config = make_config("[strategy]\nrisk_per_trade = 1.0\n");
        assert!(validate_strategy_config(&config).is_ok());
    }

    #[test]
    fn atr_multiplier_must_be_positive() {
        let config = make_config("[strategy]\natr_multiplier = -1\n");
        assert_eq!(invalid_key(validate_strategy_config(&config).unwrap_err()), "atr_multiplier");
    }

    #[test]
    fn initial_capital_must_be_positive() {
        let config = make_config("[backtest]\ninitial_capital = 0\n");
        assert_eq!(invalid_key(validate_backtest_config(&config).unwrap_err()), "initial_capital");
    }

    #[test]
    fn commission_out_of_range_fails() {
        let config = make_config("[backtest]\ncommission = -0.001\n");
        assert_eq!(invalid_key(validate_backtest_config(&config).unwrap_err()), "commission");

        let config = make_config("[backtest]\ncommission = 1\n");
        assert_eq!(invalid_key(validate_backtest_config(&config).unwrap_err()), "commission");
    }

    #[test]
    fn overflowing_walk_forward_window_fails() {
        let config = make_config(
            "[walkforward]\ntrain_months = 9223372036854775807\ntest_months = 1\n",
        );
        assert_eq!(
            invalid_key(validate_walk_forward_config(&config).unwrap_err()),
            "train_months"
        );
    }

    #[test]
    fn absent_keys_read_as_defaults() {
        let config = make_config("[strategy]\n");
        assert_eq!(read_count(&config, "strategy", "ma_fast", 20).unwrap(), 20);
        assert_eq!(read_double(&config, "strategy", "atr_multiplier", 1.5).unwrap(), 1.5);
    }

    #[test]
    fn invalid_start_date_format_fails() {
        let config = make_config("[backtest]\nstart_date = 2020/01/01\n");
        assert_eq!(invalid_key(validate_backtest_config(&config).unwrap_err()), "start_date");
    }

    #[test]
    fn start_date_after_end_date_fails() {
        let config = make_config("[backtest]\nstart_date = 2024-12-31\nend_date = 2020-01-01\n");
        assert_eq!(invalid_key(validate_backtest_config(&config).unwrap_err()), "start_date");
    }

    #[test]
    fn single_date_bound_is_allowed() {
        let config = make_config("[backtest]\nstart_date = 2020-01-01\n");
        let (start, end) = date_range(&config).unwrap();
        assert_eq!(start, NaiveDate::from_ymd_opt(2020, 1, 1));
        assert_eq!(end, None);
    }

    #[test]
    fn walk_forward_months_must_be_positive() {
        let config = make_config("[walkforward]\ntest_months = 0\n");
        assert_eq!(invalid_key(validate_walk_forward_config(&config).unwrap_err()), "test_months");

        let config = make_config("[walkforward]\nmonth_length_bars = -3\n");
        assert_eq!(
            invalid_key(validate_walk_forward_config(&config).unwrap_err()),
            "month_length_bars"
        );
    }
}
