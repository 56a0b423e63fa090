//! Simple Moving Average.
//!
//! SMA(n)[i] = mean of the last n source values. Warmup: first (n-1) rows
//! carry no value.

use std::collections::VecDeque;

use super::{Indicator, IndicatorType, output_row};
use crate::domain::market::{MarketRecord, RecordTable};

#[derive(Debug, Clone)]
pub struct Sma {
    period: usize,
    source: String,
    output: String,
    window: VecDeque<f64>,
    sum: f64,
    data: RecordTable,
}

impl Sma {
    pub fn new(period: usize, source: &str) -> Self {
        Sma {
            period,
            source: source.to_string(),
            output: IndicatorType::Sma(period).to_string(),
            window: VecDeque::with_capacity(period),
            sum: 0.0,
            data: RecordTable::new(),
        }
    }

    pub fn period(&self) -> usize {
        self.period
    }
}

impl Indicator for Sma {
    fn add_one(&mut self, record: &MarketRecord) {
        let value = match record.get(&self.source) {
            Some(price) if self.period > 0 => {
                self.window.push_back(price);
                self.sum += price;
                if self.window.len() > self.period {
                    if let Some(old) = self.window.pop_front() {
                        self.sum -= old;
                    }
                }
                (self.window.len() == self.period).then(|| self.sum / self.period as f64)
            }
            _ => None,
        };
        self.data.push(output_row(record, &self.output, value));
    }

    fn get_all_data(&self) -> &RecordTable {
        &self.data
    }

    fn output_field(&self) -> &str {
        &self.output
    }
}
