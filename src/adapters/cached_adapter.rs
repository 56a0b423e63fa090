//! Memoizing decorator over any data source.
//!
//! Every query result, including "nothing published", is kept for the life
//! of the adapter. Errors are not cached. Valid only for sources whose data
//! does not change during a run.

use crate::domain::error::ContangoError;
use crate::domain::instrument::{InstrumentInfo, ProductInfo, TradingDayInfo};
use crate::domain::market::RecordTable;
use crate::ports::data_port::DataPort;
use chrono::NaiveDate;
use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::hash::Hash;

type DayKey = (String, NaiveDate);
type RangeKey = (String, NaiveDate, NaiveDate, String);

#[derive(Debug, Default)]
struct Memo {
    trading_days: HashMap<NaiveDate, Option<TradingDayInfo>>,
    products: HashMap<DayKey, Option<ProductInfo>>,
    instruments: HashMap<DayKey, Option<InstrumentInfo>>,
    records: HashMap<(String, NaiveDate, String), RecordTable>,
    ranges: HashMap<RangeKey, RecordTable>,
    product_next: HashMap<DayKey, Option<NaiveDate>>,
    product_last: HashMap<DayKey, Option<NaiveDate>>,
    instrument_next: HashMap<DayKey, Option<NaiveDate>>,
    instrument_last: HashMap<DayKey, Option<NaiveDate>>,
}

pub struct CachedDataPort<P> {
    inner: P,
    memo: RefCell<Memo>,
    hits: Cell<u64>,
    misses: Cell<u64>,
}

impl<P: DataPort> CachedDataPort<P> {
    pub fn new(inner: P) -> Self {
        CachedDataPort {
            inner,
            memo: RefCell::new(Memo::default()),
            hits: Cell::new(0),
            misses: Cell::new(0),
        }
    }

    pub fn inner(&self) -> &P {
        &self.inner
    }

    pub fn hits(&self) -> u64 {
        self.hits.get()
    }

    pub fn misses(&self) -> u64 {
        self.misses.get()
    }

    pub fn clear(&self) {
        *self.memo.borrow_mut() = Memo::default();
    }

    fn cached<K, V>(
        &self,
        select: impl Fn(&mut Memo) -> &mut HashMap<K, V>,
        key: K,
        load: impl FnOnce(&P) -> Result<V, ContangoError>,
    ) -> Result<V, ContangoError>
    where
        K: Eq + Hash,
        V: Clone,
    {
        if let Some(value) = select(&mut self.memo.borrow_mut()).get(&key) {
            self.hits.set(self.hits.get() + 1);
            return Ok(value.clone());
        }
        self.misses.set(self.misses.get() + 1);
        let value = load(&self.inner)?;
        select(&mut self.memo.borrow_mut()).insert(key, value.clone());
        Ok(value)
    }
}

impl<P: DataPort> DataPort for CachedDataPort<P> {
    fn query_trading_day_info(
        &self,
        trading_day: NaiveDate,
    ) -> Result<Option<TradingDayInfo>, ContangoError> {
        self.cached(|m| &mut m.trading_days, trading_day, |p| {
            p.query_trading_day_info(trading_day)
        })
    }

    fn query_product_info(
        &self,
        product: &str,
        trading_day: NaiveDate,
    ) -> Result<Option<ProductInfo>, ContangoError> {
        self.cached(
            |m| &mut m.products,
            (product.to_string(), trading_day),
            |p| p.query_product_info(product, trading_day),
        )
    }

    fn query_instrument_info(
        &self,
        instrument: &str,
        trading_day: NaiveDate,
    ) -> Result<Option<InstrumentInfo>, ContangoError> {
        self.cached(
            |m| &mut m.instruments,
            (instrument.to_string(), trading_day),
            |p| p.query_instrument_info(instrument, trading_day),
        )
    }

    fn query_records(
        &self,
        symbol: &str,
        trading_day: NaiveDate,
        order_by: &str,
    ) -> Result<RecordTable, ContangoError> {
        self.cached(
            |m| &mut m.records,
            (symbol.to_string(), trading_day, order_by.to_string()),
            |p| p.query_records(symbol, trading_day, order_by),
        )
    }

    fn query_records_range(
        &self,
        symbol: &str,
        begin_day: NaiveDate,
        end_day: NaiveDate,
        order_by: &str,
    ) -> Result<RecordTable, ContangoError> {
        self.cached(
            |m| &mut m.ranges,
            (symbol.to_string(), begin_day, end_day, order_by.to_string()),
            |p| p.query_records_range(symbol, begin_day, end_day, order_by),
        )
    }

    fn product_next_trading_day(
        &self,
        product: &str,
        trading_day: NaiveDate,
    ) -> Result<Option<NaiveDate>, ContangoError> {
        self.cached(
            |m| &mut m.product_next,
            (product.to_string(), trading_day),
            |p| p.product_next_trading_day(product, trading_day),
        )
    }

    fn product_last_trading_day(
        &self,
        product: &str,
        trading_day: NaiveDate,
    ) -> Result<Option<NaiveDate>, ContangoError> {
        self.cached(
            |m| &mut m.product_last,
            (product.to_string(), trading_day),
            |p| p.product_last_trading_day(product, trading_day),
        )
    }

    fn instrument_next_trading_day(
        &self,
        instrument: &str,
        trading_day: NaiveDate,
    ) -> Result<Option<NaiveDate>, ContangoError> {
        self.cached(
            |m| &mut m.instrument_next,
            (instrument.to_string(), trading_day),
            |p| p.instrument_next_trading_day(instrument, trading_day),
        )
    }

    fn instrument_last_trading_day(
        &self,
        instrument: &str,
        trading_day: NaiveDate,
    ) -> Result<Option<NaiveDate>, ContangoError> {
        self.cached(
            |m| &mut m.instrument_last,
            (instrument.to_string(), trading_day),
            |p| p.instrument_last_trading_day(instrument, trading_day),
        )
    }
}
