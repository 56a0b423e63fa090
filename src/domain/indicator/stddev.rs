//! Rolling standard deviation.
//!
//! Population standard deviation over the last n source values.
//! STDDEV(n)[i] = sqrt(sum((C[i-j] - SMA(n)[i])^2 for j in 0..n-1) / n)
//! Warmup: first (n-1) rows carry no value.

use std::collections::VecDeque;

use super::{Indicator, IndicatorType, output_row};
use crate::domain::market::{MarketRecord, RecordTable};

#[derive(Debug, Clone)]
pub struct StdDev {
    period: usize,
    source: String,
    output: String,
    window: VecDeque<f64>,
    data: RecordTable,
}

impl StdDev {
    pub fn new(period: usize, source: &str) -> Self {
        StdDev {
            period,
            source: source.to_string(),
            output: IndicatorType::Stddev(period).to_string(),
            window: VecDeque::with_capacity(period),
            data: RecordTable::new(),
        }
    }

    fn current(&self) -> f64 {
        let n = self.period as f64;
        let mean = self.window.iter().sum::<f64>() / n;
        let variance = self
            .window
            .iter()
            .map(|v| {
                let diff = v - mean;
                diff * diff
            })
            .sum::<f64>()
            / n;
        variance.sqrt()
    }
}

impl Indicator for StdDev {
    fn add_one(&mut self, record: &MarketRecord) {
        let value = match record.get(&self.source) {
            Some(price) if self.period > 0 => {
                self.window.push_back(price);
                if self.window.len() > self.period {
                    self.window.pop_front();
                }
                (self.window.len() == self.period).then(|| self.current())
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
