//! Historical data source port.
//!
//! Every lookup is keyed by trading day and is side-effect free from the
//! simulation's point of view. "Nothing published" is `Ok(None)` or an empty
//! table; `Err` is reserved for the source itself failing.

use crate::domain::error::ContangoError;
use crate::domain::instrument::{InstrumentInfo, ProductInfo, TradingDayInfo};
use crate::domain::market::RecordTable;
use chrono::NaiveDate;

pub trait DataPort {
    fn query_trading_day_info(
        &self,
        trading_day: NaiveDate,
    ) -> Result<Option<TradingDayInfo>, ContangoError>;

    fn query_product_info(
        &self,
        product: &str,
        trading_day: NaiveDate,
    ) -> Result<Option<ProductInfo>, ContangoError>;

    fn query_instrument_info(
        &self,
        instrument: &str,
        trading_day: NaiveDate,
    ) -> Result<Option<InstrumentInfo>, ContangoError>;

    /// All records of `symbol` on one trading day, ordered by `order_by`.
    fn query_records(
        &self,
        symbol: &str,
        trading_day: NaiveDate,
        order_by: &str,
    ) -> Result<RecordTable, ContangoError>;

    /// Records with `begin_day <= trading day < end_day`, ordered by `order_by`.
    fn query_records_range(
        &self,
        symbol: &str,
        begin_day: NaiveDate,
        end_day: NaiveDate,
        order_by: &str,
    ) -> Result<RecordTable, ContangoError>;

    /// First trading day of `product` strictly after `trading_day`.
    fn product_next_trading_day(
        &self,
        product: &str,
        trading_day: NaiveDate,
    ) -> Result<Option<NaiveDate>, ContangoError>;

    /// Last trading day of `product` strictly before `trading_day`.
    fn product_last_trading_day(
        &self,
        product: &str,
        trading_day: NaiveDate,
    ) -> Result<Option<NaiveDate>, ContangoError>;

    fn instrument_next_trading_day(
        &self,
        instrument: &str,
        trading_day: NaiveDate,
    ) -> Result<Option<NaiveDate>, ContangoError>;

    fn instrument_last_trading_day(
        &self,
        instrument: &str,
        trading_day: NaiveDate,
    ) -> Result<Option<NaiveDate>, ContangoError>;

    fn is_trading_day(&self, trading_day: NaiveDate) -> Result<bool, ContangoError> {
        Ok(self.query_trading_day_info(trading_day)?.is_some())
    }
}
