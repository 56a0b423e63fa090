//! N-minute OHLC bar aggregation.
//!
//! Groups records into buckets of `minutes` minutes by happen time and emits
//! one bar per bucket once the next bucket starts. The bar row is stamped
//! with the bucket's start time and carries open/high/low/close prices from
//! the source field plus the summed volume.

use chrono::{Duration, NaiveDateTime, Timelike};

use super::Indicator;
use crate::domain::market::{
    CLOSE_PRICE, HIGH_PRICE, LOW_PRICE, MarketRecord, OPEN_PRICE, RecordTable, VOLUME,
};

#[derive(Debug, Clone)]
struct PartialBar {
    start: NaiveDateTime,
    row: MarketRecord,
    open: f64,
    high: f64,
    low: f64,
    close: f64,
    volume: f64,
}

impl PartialBar {
    fn finish(self) -> MarketRecord {
        self.row
            .with_field(OPEN_PRICE, self.open)
            .with_field(HIGH_PRICE, self.high)
            .with_field(LOW_PRICE, self.low)
            .with_field(CLOSE_PRICE, self.close)
            .with_field(VOLUME, self.volume)
    }
}

#[derive(Debug, Clone)]
pub struct BarAggregator {
    minutes: u32,
    source: String,
    current: Option<PartialBar>,
    data: RecordTable,
}

impl BarAggregator {
    /// `minutes` of zero is treated as one.
    pub fn new(minutes: u32, source: &str) -> Self {
        BarAggregator {
            minutes: minutes.max(1),
            source: source.to_string(),
            current: None,
            data: RecordTable::new(),
        }
    }

    /// Bar still being built.
    pub fn current(&self) -> Option<MarketRecord> {
        self.current.clone().map(PartialBar::finish)
    }

    /// Emit the in-progress bar, e.g. at the end of a trading day.
    pub fn flush(&mut self) {
        if let Some(bar) = self.current.take() {
            self.data.push(bar.finish());
        }
    }

    fn bucket_start(&self, time: NaiveDateTime) -> NaiveDateTime {
        let minute_of_day = time.hour() * 60 + time.minute();
        let offset = minute_of_day % self.minutes;
        let truncated = time - Duration::minutes(i64::from(offset));
        truncated
            .with_second(0)
            .and_then(|t| t.with_nanosecond(0))
            .unwrap_or(truncated)
    }
}

impl Indicator for BarAggregator {
    fn add_one(&mut self, record: &MarketRecord) {
        let Some(price) = record.get(&self.source) else {
            return;
        };
        let volume = record.get(VOLUME).unwrap_or(0.0);
        let start = self.bucket_start(record.happen_time);

        if let Some(bar) = self.current.as_mut() {
            if bar.start == start {
                bar.high = bar.high.max(price);
                bar.low = bar.low.min(price);
                bar.close = price;
                bar.volume += volume;
                return;
            }
        }
        self.flush();
        self.current = Some(PartialBar {
            start,
            row: MarketRecord::new(&record.symbol, record.trading_day, start),
            open: price,
            high: price,
            low: price,
            close: price,
            volume,
        });
    }

    fn get_all_data(&self) -> &RecordTable {
        &self.data
    }

    fn output_field(&self) -> &str {
        CLOSE_PRICE
    }
}
