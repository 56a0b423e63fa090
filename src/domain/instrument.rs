//! Published per-trading-day facts about products and instruments.

use chrono::NaiveDate;

/// Product and instrument keys are stored lower-case (`rb`, `rb1705`).
/// Lookups fold their input the same way, so `RB1705` finds `rb1705`.
pub fn normalize_key(key: &str) -> String {
    key.trim().to_ascii_lowercase()
}

/// Products traded on one trading day. Absent for non-trading days.
#[derive(Debug, Clone, PartialEq)]
pub struct TradingDayInfo {
    pub trading_day: NaiveDate,
    pub products: Vec<String>,
}

/// One product on one trading day.
#[derive(Debug, Clone, PartialEq)]
pub struct ProductInfo {
    pub product: String,
    pub trading_day: NaiveDate,
    pub instruments: Vec<String>,
    pub dominant: Option<String>,
    pub sub_dominant: Option<String>,
}

impl ProductInfo {
    /// Instruments in delivery order. Symbols embed the delivery month
    /// (`rb1705`, `rb1710`), so lexicographic order is chronological.
    pub fn sorted_instruments(&self) -> Vec<String> {
        let mut sorted = self.instruments.clone();
        sorted.sort();
        sorted
    }
}

/// One instrument on one trading day, with its ranking metrics.
#[derive(Debug, Clone, PartialEq)]
pub struct InstrumentInfo {
    pub instrument: String,
    pub product: String,
    pub trading_day: NaiveDate,
    pub delivery_month: String,
    pub open_interest: f64,
    pub volume: f64,
}

/// Metric used to rank the instruments of a product.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RankingMetric {
    OpenInterest,
    Volume,
}

impl InstrumentInfo {
    pub fn metric(&self, metric: RankingMetric) -> f64 {
        match metric {
            RankingMetric::OpenInterest => self.open_interest,
            RankingMetric::Volume => self.volume,
        }
    }
}
