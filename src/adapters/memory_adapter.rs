//! In-memory data source.
//!
//! Holds published product/instrument facts and market records in ordered
//! maps. Used for seeding small simulations and as the backing store of the
//! unit and integration tests.

use crate::domain::error::ContangoError;
use crate::domain::instrument::{InstrumentInfo, ProductInfo, TradingDayInfo};
use crate::domain::market::{MarketRecord, RecordTable};
use crate::ports::data_port::DataPort;
use chrono::NaiveDate;
use std::collections::{BTreeMap, BTreeSet, HashMap};

#[derive(Debug, Default, Clone)]
pub struct InMemoryDataPort {
    products: BTreeMap<(NaiveDate, String), ProductInfo>,
    instruments: BTreeMap<(NaiveDate, String), InstrumentInfo>,
    records: BTreeMap<(String, NaiveDate), Vec<MarketRecord>>,
    failures: HashMap<String, String>,
}

impl InMemoryDataPort {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert_product(&mut self, info: ProductInfo) {
        self.products
            .insert((info.trading_day, info.product.clone()), info);
    }

    pub fn insert_instrument(&mut self, info: InstrumentInfo) {
        self.instruments
            .insert((info.trading_day, info.instrument.clone()), info);
    }

    /// Appends records; they are grouped by their own symbol and trading day.
    pub fn insert_records(&mut self, records: Vec<MarketRecord>) {
        for record in records {
            self.records
                .entry((record.symbol.clone(), record.trading_day))
                .or_default()
                .push(record);
        }
    }

    /// Any query naming `key` (a product, instrument or symbol) fails with a
    /// database error carrying `reason`.
    pub fn fail_on(&mut self, key: &str, reason: &str) {
        self.failures.insert(key.to_string(), reason.to_string());
    }

    fn check(&self, key: &str) -> Result<(), ContangoError> {
        match self.failures.get(key) {
            Some(reason) => Err(ContangoError::Database {
                reason: reason.clone(),
            }),
            None => Ok(()),
        }
    }

    fn days_of<'a>(
        &'a self,
        keys: impl Iterator<Item = &'a (NaiveDate, String)>,
        name: &'a str,
    ) -> BTreeSet<NaiveDate> {
        keys.filter(|(_, n)| n == name).map(|(d, _)| *d).collect()
    }
}

impl DataPort for InMemoryDataPort {
    fn query_trading_day_info(
        &self,
        trading_day: NaiveDate,
    ) -> Result<Option<TradingDayInfo>, ContangoError> {
        let products: Vec<String> = self
            .products
            .range((trading_day, String::new())..)
            .take_while(|((d, _), _)| *d == trading_day)
            .map(|((_, p), _)| p.clone())
            .collect();
        if products.is_empty() {
            return Ok(None);
        }
        Ok(Some(TradingDayInfo {
            trading_day,
            products,
        }))
    }

    fn query_product_info(
        &self,
        product: &str,
        trading_day: NaiveDate,
    ) -> Result<Option<ProductInfo>, ContangoError> {
        self.check(product)?;
        Ok(self
            .products
            .get(&(trading_day, product.to_string()))
            .cloned())
    }

    fn query_instrument_info(
        &self,
        instrument: &str,
        trading_day: NaiveDate,
    ) -> Result<Option<InstrumentInfo>, ContangoError> {
        self.check(instrument)?;
        Ok(self
            .instruments
            .get(&(trading_day, instrument.to_string()))
            .cloned())
    }

    fn query_records(
        &self,
        symbol: &str,
        trading_day: NaiveDate,
        order_by: &str,
    ) -> Result<RecordTable, ContangoError> {
        self.check(symbol)?;
        let mut table = RecordTable::from_rows(
            self.records
                .get(&(symbol.to_string(), trading_day))
                .cloned()
                .unwrap_or_default(),
        );
        table.sort_by_field(order_by);
        Ok(table)
    }

    fn query_records_range(
        &self,
        symbol: &str,
        begin_day: NaiveDate,
        end_day: NaiveDate,
        order_by: &str,
    ) -> Result<RecordTable, ContangoError> {
        self.check(symbol)?;
        let mut table = RecordTable::new();
        if begin_day >= end_day {
            return Ok(table);
        }
        for ((_, _), rows) in self
            .records
            .range((symbol.to_string(), begin_day)..(symbol.to_string(), end_day))
        {
            for row in rows {
                table.push(row.clone());
            }
        }
        table.sort_by_field(order_by);
        Ok(table)
    }

    fn product_next_trading_day(
        &self,
        product: &str,
        trading_day: NaiveDate,
    ) -> Result<Option<NaiveDate>, ContangoError> {
        self.check(product)?;
        let days = self.days_of(self.products.keys(), product);
        Ok(days.iter().find(|d| **d > trading_day).copied())
    }

    fn product_last_trading_day(
        &self,
        product: &str,
        trading_day: NaiveDate,
    ) -> Result<Option<NaiveDate>, ContangoError> {
        self.check(product)?;
        let days = self.days_of(self.products.keys(), product);
        Ok(days.range(..trading_day).next_back().copied())
    }

    fn instrument_next_trading_day(
        &self,
        instrument: &str,
        trading_day: NaiveDate,
    ) -> Result<Option<NaiveDate>, ContangoError> {
        self.check(instrument)?;
        let days = self.days_of(self.instruments.keys(), instrument);
        Ok(days.iter().find(|d| **d > trading_day).copied())
    }

    fn instrument_last_trading_day(
        &self,
        instrument: &str,
        trading_day: NaiveDate,
    ) -> Result<Option<NaiveDate>, ContangoError> {
        self.check(instrument)?;
        let days = self.days_of(self.instruments.keys(), instrument);
        Ok(days.range(..trading_day).next_back().copied())
    }
}
