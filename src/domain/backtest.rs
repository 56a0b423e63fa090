//! Backtest run parameters.
//!
//! `BacktestConfig` is read from the `[backtest]` section of the INI file.

use chrono::NaiveDate;

use super::error::ContangoError;
use super::fill::ExecutionConfig;
use super::market::CLOSE_PRICE;
use crate::ports::config_port::ConfigPort;

#[derive(Debug, Clone, PartialEq)]
pub struct BacktestConfig {
    pub begin_day: NaiveDate,
    pub end_day: NaiveDate,
    /// Record field orders are priced from.
    pub price_field: String,
    pub execution: ExecutionConfig,
}

impl BacktestConfig {
    pub fn new(begin_day: NaiveDate, end_day: NaiveDate) -> Self {
        BacktestConfig {
            begin_day,
            end_day,
            price_field: CLOSE_PRICE.to_string(),
            execution: ExecutionConfig::default(),
        }
    }

    pub fn with_price_field(mut self, field: &str) -> Self {
        self.price_field = field.to_string();
        self
    }

    pub fn from_config(config: &dyn ConfigPort) -> Result<Self, ContangoError> {
        let begin_day = config.get_date("backtest", "begin_day")?;
        let end_day = config.get_date("backtest", "end_day")?;
        let price_field = config
            .get_string("backtest", "price_field")
            .unwrap_or_else(|| CLOSE_PRICE.to_string());
        Ok(BacktestConfig {
            begin_day,
            end_day,
            price_field,
            execution: ExecutionConfig {
                commission_per_trade: config.get_double("backtest", "commission_per_trade", 0.0),
                commission_pct: config.get_double("backtest", "commission_pct", 0.0),
                slippage_pct: config.get_double("backtest", "slippage_pct", 0.0),
            },
        })
    }
}
