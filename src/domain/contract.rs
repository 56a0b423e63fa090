//! Continuous-contract resolution.
//!
//! Maps "the instrument of product P selected by rule R" to a concrete symbol
//! for one trading day. Resolution that finds nothing (no product data, no
//! dominant, rollover step out of range, too few ranked instruments) is
//! `Ok(None)`; only data source failures are errors.

use chrono::NaiveDate;
use std::fmt;
use std::str::FromStr;
use tracing::debug;

use super::error::ContangoError;
use super::instrument::{ProductInfo, RankingMetric, normalize_key};
use crate::ports::data_port::DataPort;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RolloverRule {
    Dominant,
    SubDominant,
    BeforeDominant,
    AfterDominant,
    MostOpenInterest,
    SecondOpenInterest,
    MostVolume,
    SecondVolume,
}

impl RolloverRule {
    pub const ALL: [RolloverRule; 8] = [
        RolloverRule::Dominant,
        RolloverRule::SubDominant,
        RolloverRule::BeforeDominant,
        RolloverRule::AfterDominant,
        RolloverRule::MostOpenInterest,
        RolloverRule::SecondOpenInterest,
        RolloverRule::MostVolume,
        RolloverRule::SecondVolume,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            RolloverRule::Dominant => "dominant",
            RolloverRule::SubDominant => "sub_dominant",
            RolloverRule::BeforeDominant => "before_dominant",
            RolloverRule::AfterDominant => "after_dominant",
            RolloverRule::MostOpenInterest => "most_open_interest",
            RolloverRule::SecondOpenInterest => "second_open_interest",
            RolloverRule::MostVolume => "most_volume",
            RolloverRule::SecondVolume => "second_volume",
        }
    }
}

impl fmt::Display for RolloverRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RolloverRule {
    type Err = ContangoError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_ascii_lowercase().replace('-', "_");
        RolloverRule::ALL
            .into_iter()
            .find(|rule| rule.as_str() == normalized)
            .ok_or_else(|| ContangoError::UnknownRule {
                value: s.to_string(),
            })
    }
}

/// Resolves rollover rules against a data source. Product and instrument
/// arguments are case-insensitive.
pub struct ContractResolver<'a> {
    data: &'a dyn DataPort,
}

impl<'a> ContractResolver<'a> {
    pub fn new(data: &'a dyn DataPort) -> Self {
        Self { data }
    }

    pub fn resolve(
        &self,
        product: &str,
        trading_day: NaiveDate,
        rule: RolloverRule,
    ) -> Result<Option<String>, ContangoError> {
        let product = normalize_key(product);
        let Some(info) = self.data.query_product_info(&product, trading_day)? else {
            debug!(%product, %trading_day, %rule, "no product info");
            return Ok(None);
        };

        let symbol = match rule {
            RolloverRule::Dominant => info.dominant.clone(),
            RolloverRule::SubDominant => info.sub_dominant.clone(),
            RolloverRule::BeforeDominant => step_from_dominant(&info, -1),
            RolloverRule::AfterDominant => step_from_dominant(&info, 1),
            RolloverRule::MostOpenInterest => {
                self.ranked(&info, RankingMetric::OpenInterest, 1)?
            }
            RolloverRule::SecondOpenInterest => {
                self.ranked(&info, RankingMetric::OpenInterest, 2)?
            }
            RolloverRule::MostVolume => self.ranked(&info, RankingMetric::Volume, 1)?,
            RolloverRule::SecondVolume => self.ranked(&info, RankingMetric::Volume, 2)?,
        };

        if symbol.is_none() {
            debug!(%product, %trading_day, %rule, "rule did not resolve");
        }
        Ok(symbol)
    }

    /// Symbol of the product's index series: the product key itself, on days
    /// the product trades.
    pub fn index_symbol(
        &self,
        product: &str,
        trading_day: NaiveDate,
    ) -> Result<Option<String>, ContangoError> {
        let product = normalize_key(product);
        Ok(self
            .data
            .query_product_info(&product, trading_day)?
            .map(|_| product))
    }

    /// `rank` counts from the top: 1 is the largest metric.
    fn ranked(
        &self,
        info: &ProductInfo,
        metric: RankingMetric,
        rank: usize,
    ) -> Result<Option<String>, ContangoError> {
        let mut scored: Vec<(String, f64)> = Vec::with_capacity(info.instruments.len());
        for instrument in &info.instruments {
            if let Some(inst) = self
                .data
                .query_instrument_info(instrument, info.trading_day)?
            {
                scored.push((instrument.clone(), inst.metric(metric)));
            }
        }
        if scored.len() < rank {
            return Ok(None);
        }
        // stable: on ties the later-listed instrument ranks higher
        scored.sort_by(|a, b| a.1.total_cmp(&b.1));
        Ok(Some(scored.swap_remove(scored.len() - rank).0))
    }

    pub fn is_trading_day(&self, trading_day: NaiveDate) -> Result<bool, ContangoError> {
        self.data.is_trading_day(trading_day)
    }

    /// Instruments of `product` traded that day; empty when none.
    pub fn available_instruments(
        &self,
        product: &str,
        trading_day: NaiveDate,
    ) -> Result<Vec<String>, ContangoError> {
        Ok(self
            .data
            .query_product_info(&normalize_key(product), trading_day)?
            .map(|info| info.instruments)
            .unwrap_or_default())
    }

    pub fn delivery_month(
        &self,
        instrument: &str,
        trading_day: NaiveDate,
    ) -> Result<Option<String>, ContangoError> {
        Ok(self
            .data
            .query_instrument_info(&normalize_key(instrument), trading_day)?
            .map(|info| info.delivery_month))
    }

    pub fn product_next_trading_day(
        &self,
        product: &str,
        trading_day: NaiveDate,
    ) -> Result<Option<NaiveDate>, ContangoError> {
        self.data.product_next_trading_day(&normalize_key(product), trading_day)
    }

    pub fn product_last_trading_day(
        &self,
        product: &str,
        trading_day: NaiveDate,
    ) -> Result<Option<NaiveDate>, ContangoError> {
        self.data.product_last_trading_day(&normalize_key(product), trading_day)
    }

    pub fn instrument_next_trading_day(
        &self,
        instrument: &str,
        trading_day: NaiveDate,
    ) -> Result<Option<NaiveDate>, ContangoError> {
        self.data.instrument_next_trading_day(&normalize_key(instrument), trading_day)
    }

    pub fn instrument_last_trading_day(
        &self,
        instrument: &str,
        trading_day: NaiveDate,
    ) -> Result<Option<NaiveDate>, ContangoError> {
        self.data.instrument_last_trading_day(&normalize_key(instrument), trading_day)
    }
}

fn step_from_dominant(info: &ProductInfo, step: isize) -> Option<String> {
    let dominant = info.dominant.as_ref()?;
    let sorted = info.sorted_instruments();
    let at = sorted.iter().position(|s| s == dominant)?;
    let target = at.checked_add_signed(step)?;
    sorted.get(target).cloned()
}
