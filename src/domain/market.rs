//! Market records and the tabular container shared by the data source,
//! market replay and indicators.

use chrono::{NaiveDate, NaiveDateTime, Timelike};
use std::collections::BTreeMap;

/// Canonical field names used by the shipped adapters.
pub const LAST_PRICE: &str = "lastprice";
pub const OPEN_PRICE: &str = "openprice";
pub const HIGH_PRICE: &str = "highprice";
pub const LOW_PRICE: &str = "lowprice";
pub const CLOSE_PRICE: &str = "closeprice";
pub const VOLUME: &str = "volume";
pub const OPEN_INTEREST: &str = "openinterest";

/// Column every table is indexed by.
pub const HAPPEN_TIME: &str = "happentime";

/// One timestamped row for one symbol.
#[derive(Debug, Clone, PartialEq)]
pub struct MarketRecord {
    pub symbol: String,
    pub trading_day: NaiveDate,
    pub happen_time: NaiveDateTime,
    pub fields: BTreeMap<String, f64>,
}

impl MarketRecord {
    pub fn new(symbol: &str, trading_day: NaiveDate, happen_time: NaiveDateTime) -> Self {
        Self {
            symbol: symbol.to_string(),
            trading_day,
            happen_time,
            fields: BTreeMap::new(),
        }
    }

    pub fn with_field(mut self, name: &str, value: f64) -> Self {
        self.fields.insert(name.to_string(), value);
        self
    }

    pub fn get(&self, field: &str) -> Option<f64> {
        self.fields.get(field).copied()
    }

    /// Minutes since midnight of the happen time.
    pub fn minute_of_day(&self) -> u32 {
        self.happen_time.hour() * 60 + self.happen_time.minute()
    }
}

/// Ordered sequence of records. Insertion order is the table order; callers
/// append in happen-time order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RecordTable {
    rows: Vec<MarketRecord>,
}

impl RecordTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_rows(rows: Vec<MarketRecord>) -> Self {
        Self { rows }
    }

    pub fn push(&mut self, record: MarketRecord) {
        self.rows.push(record);
    }

    pub fn extend(&mut self, other: RecordTable) {
        self.rows.extend(other.rows);
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn clear(&mut self) {
        self.rows.clear();
    }

    pub fn first(&self) -> Option<&MarketRecord> {
        self.rows.first()
    }

    pub fn last(&self) -> Option<&MarketRecord> {
        self.rows.last()
    }

    pub fn get(&self, i: usize) -> Option<&MarketRecord> {
        self.rows.get(i)
    }

    pub fn iter(&self) -> std::slice::Iter<'_, MarketRecord> {
        self.rows.iter()
    }

    pub fn rows(&self) -> &[MarketRecord] {
        &self.rows
    }

    pub fn into_rows(self) -> Vec<MarketRecord> {
        self.rows
    }

    pub fn index(&self) -> Vec<NaiveDateTime> {
        self.rows.iter().map(|r| r.happen_time).collect()
    }

    /// Values of `field`, `None` where a row lacks it.
    pub fn column(&self, field: &str) -> Vec<Option<f64>> {
        self.rows.iter().map(|r| r.get(field)).collect()
    }

    /// Latest value of `field`, looking only at the last row.
    pub fn last_value(&self, field: &str) -> Option<f64> {
        self.rows.last().and_then(|r| r.get(field))
    }

    /// Stable sort by a field; `happentime` sorts by the index.
    pub fn sort_by_field(&mut self, field: &str) {
        if field == HAPPEN_TIME {
            self.rows.sort_by_key(|r| r.happen_time);
        } else {
            self.rows.sort_by(|a, b| {
                let av = a.get(field).unwrap_or(f64::NEG_INFINITY);
                let bv = b.get(field).unwrap_or(f64::NEG_INFINITY);
                av.total_cmp(&bv)
            });
        }
    }
}

impl<'a> IntoIterator for &'a RecordTable {
    type Item = &'a MarketRecord;
    type IntoIter = std::slice::Iter<'a, MarketRecord>;

    fn into_iter(self) -> Self::IntoIter {
        self.rows.iter()
    }
}

impl FromIterator<MarketRecord> for RecordTable {
    fn from_iter<T: IntoIterator<Item = MarketRecord>>(iter: T) -> Self {
        Self {
            rows: iter.into_iter().collect(),
        }
    }
}
