//! Exponential Moving Average.
//!
//! k = 2/(n+1), seed with first SMA, then EMA[i] = C[i]*k + EMA[i-1]*(1-k).
//! Warmup: first (n-1) rows carry no value.

use super::{Indicator, IndicatorType, output_row};
use crate::domain::market::{MarketRecord, RecordTable};

#[derive(Debug, Clone)]
pub struct Ema {
    period: usize,
    source: String,
    output: String,
    k: f64,
    seen: usize,
    seed_sum: f64,
    ema: Option<f64>,
    data: RecordTable,
}

impl Ema {
    pub fn new(period: usize, source: &str) -> Self {
        Ema {
            period,
            source: source.to_string(),
            output: IndicatorType::Ema(period).to_string(),
            k: 2.0 / (period as f64 + 1.0),
            seen: 0,
            seed_sum: 0.0,
            ema: None,
            data: RecordTable::new(),
        }
    }
}

impl Indicator for Ema {
    fn add_one(&mut self, record: &MarketRecord) {
        let value = match record.get(&self.source) {
            Some(price) if self.period > 0 => {
                self.seen += 1;
                match self.ema {
                    Some(prev) => self.ema = Some(price * self.k + prev * (1.0 - self.k)),
                    None => {
                        self.seed_sum += price;
                        if self.seen == self.period {
                            self.ema = Some(self.seed_sum / self.period as f64);
                        }
                    }
                }
                self.ema
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
