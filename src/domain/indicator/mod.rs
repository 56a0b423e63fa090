//! Streaming technical indicators.
//!
//! An indicator consumes market records one at a time and keeps its own
//! output as a record table. Outputs share the input's timestamps; during
//! warmup the output row is present but its value field is absent.

pub mod bars;
pub mod ema;
pub mod sma;
pub mod stddev;

use std::fmt;

use super::market::{MarketRecord, RecordTable};

pub use bars::BarAggregator;
pub use ema::Ema;
pub use sma::Sma;
pub use stddev::StdDev;

pub trait Indicator {
    fn add_one(&mut self, record: &MarketRecord);

    fn add_many(&mut self, table: &RecordTable) {
        for record in table {
            self.add_one(record);
        }
    }

    fn get_all_data(&self) -> &RecordTable;

    /// Field name the indicator writes its value under.
    fn output_field(&self) -> &str;

    /// Most recent valid value, if any.
    fn last(&self) -> Option<f64> {
        self.get_all_data()
            .last()
            .and_then(|r| r.get(self.output_field()))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum IndicatorType {
    Sma(usize),
    Ema(usize),
    Stddev(usize),
    Bars(u32),
}

impl fmt::Display for IndicatorType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IndicatorType::Sma(period) => write!(f, "SMA({})", period),
            IndicatorType::Ema(period) => write!(f, "EMA({})", period),
            IndicatorType::Stddev(period) => write!(f, "STDDEV({})", period),
            IndicatorType::Bars(minutes) => write!(f, "BARS({}m)", minutes),
        }
    }
}

/// Output row carrying the input's identity and, once warm, `value`.
pub(crate) fn output_row(input: &MarketRecord, field: &str, value: Option<f64>) -> MarketRecord {
    let row = MarketRecord::new(&input.symbol, input.trading_day, input.happen_time);
    match value {
        Some(v) => row.with_field(field, v),
        None => row,
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    use super::*;
    use chrono::NaiveDate;

    pub fn records(field: &str, prices: &[f64]) -> RecordTable {
        let day = NaiveDate::from_ymd_opt(2017, 1, 19).unwrap();
        prices
            .iter()
            .enumerate()
            .map(|(i, &p)| {
                MarketRecord::new("rb1705", day, day.and_hms_opt(9, i as u32, 0).unwrap())
                    .with_field(field, p)
            })
            .collect()
    }
}
