//! SQLite data adapter.
//!
//! Three tables: `product` (one row per product and trading day, instrument
//! list stored comma-separated), `instrument` (per-instrument metrics) and
//! `market` (one row per record, one nullable column per known field).

use crate::domain::error::ContangoError;
use crate::domain::instrument::{InstrumentInfo, ProductInfo, TradingDayInfo};
use crate::domain::market::{
    CLOSE_PRICE, HAPPEN_TIME, HIGH_PRICE, LAST_PRICE, LOW_PRICE, MarketRecord, OPEN_INTEREST,
    OPEN_PRICE, RecordTable, VOLUME,
};
use crate::ports::config_port::{ConfigPort, get_count};
use crate::ports::data_port::DataPort;
use chrono::{NaiveDate, NaiveDateTime};
use r2d2::{Pool, PooledConnection};
use r2d2_sqlite::SqliteConnectionManager;
use rusqlite::{OptionalExtension, params};

const DAY_FORMAT: &str = "%Y-%m-%d";
const TIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S%.f";

/// Record fields with a column in `market`.
const FIELDS: [&str; 7] = [
    LAST_PRICE,
    OPEN_PRICE,
    HIGH_PRICE,
    LOW_PRICE,
    CLOSE_PRICE,
    VOLUME,
    OPEN_INTEREST,
];

pub struct SqliteAdapter {
    pool: Pool<SqliteConnectionManager>,
}

fn pool_err(e: r2d2::Error) -> ContangoError {
    ContangoError::Database {
        reason: e.to_string(),
    }
}

fn query_err(e: rusqlite::Error) -> ContangoError {
    ContangoError::DatabaseQuery {
        reason: e.to_string(),
    }
}

fn parse_day(raw: &str) -> Result<NaiveDate, ContangoError> {
    NaiveDate::parse_from_str(raw, DAY_FORMAT).map_err(|e: chrono::ParseError| {
        ContangoError::Database {
            reason: format!("bad trading day {raw:?}: {e}"),
        }
    })
}

fn day_str(day: NaiveDate) -> String {
    day.format(DAY_FORMAT).to_string()
}

/// Maps an order-by field onto a column; unknown fields are rejected.
fn order_column(order_by: &str) -> Result<&'static str, ContangoError> {
    if order_by == HAPPEN_TIME {
        return Ok("happen_time");
    }
    FIELDS
        .iter()
        .find(|f| **f == order_by)
        .copied()
        .ok_or_else(|| ContangoError::DatabaseQuery {
            reason: format!("cannot order market records by {order_by:?}"),
        })
}

impl SqliteAdapter {
    pub fn from_config(config: &dyn ConfigPort) -> Result<Self, ContangoError> {
        let db_path =
            config
                .get_string("sqlite", "path")
                .ok_or_else(|| ContangoError::ConfigMissing {
                    section: "sqlite".into(),
                    key: "path".into(),
                })?;

        let pool_size: u32 = get_count(config, "sqlite", "pool_size", 4, 1)?;

        let manager = SqliteConnectionManager::file(&db_path);
        let pool = Pool::builder()
            .max_size(pool_size)
            .build(manager)
            .map_err(pool_err)?;

        Ok(Self { pool })
    }

    pub fn in_memory() -> Result<Self, ContangoError> {
        let manager = SqliteConnectionManager::memory();
        let pool = Pool::builder()
            .max_size(1)
            .build(manager)
            .map_err(pool_err)?;

        Ok(Self { pool })
    }

    fn conn(&self) -> Result<PooledConnection<SqliteConnectionManager>, ContangoError> {
        self.pool.get().map_err(pool_err)
    }

    pub fn initialize_schema(&self) -> Result<(), ContangoError> {
        let conn = self.conn()?;
        conn.execute_batch(
            "CREATE TABLE IF NOT EXISTS product (
                trading_day TEXT NOT NULL,
                product TEXT NOT NULL,
                instruments TEXT NOT NULL,
                dominant TEXT,
                sub_dominant TEXT,
                PRIMARY KEY (trading_day, product)
            );
            CREATE TABLE IF NOT EXISTS instrument (
                trading_day TEXT NOT NULL,
                instrument TEXT NOT NULL,
                product TEXT NOT NULL,
                delivery_month TEXT NOT NULL,
                open_interest REAL NOT NULL,
                volume REAL NOT NULL,
                PRIMARY KEY (trading_day, instrument)
            );
            CREATE TABLE IF NOT EXISTS market (
                symbol TEXT NOT NULL,
                trading_day TEXT NOT NULL,
                happen_time TEXT NOT NULL,
                lastprice REAL,
                openprice REAL,
                highprice REAL,
                lowprice REAL,
                closeprice REAL,
                volume REAL,
                openinterest REAL
            );
            CREATE INDEX IF NOT EXISTS idx_product_name ON product(product, trading_day);
            CREATE INDEX IF NOT EXISTS idx_instrument_name ON instrument(instrument, trading_day);
            CREATE INDEX IF NOT EXISTS idx_market_symbol_day ON market(symbol, trading_day);",
        )
        .map_err(query_err)?;

        Ok(())
    }

    pub fn insert_products(&self, products: &[ProductInfo]) -> Result<(), ContangoError> {
        let mut conn = self.conn()?;
        let tx = conn.transaction().map_err(query_err)?;
        for p in products {
            tx.execute(
                "INSERT OR REPLACE INTO product (trading_day, product, instruments, dominant, sub_dominant)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
                params![
                    day_str(p.trading_day),
                    p.product,
                    p.instruments.join(","),
                    p.dominant,
                    p.sub_dominant
                ],
            )
            .map_err(query_err)?;
        }
        tx.commit().map_err(query_err)?;
        Ok(())
    }

    pub fn insert_instruments(&self, instruments: &[InstrumentInfo]) -> Result<(), ContangoError> {
        let mut conn = self.conn()?;
        let tx = conn.transaction().map_err(query_err)?;
        for i in instruments {
            tx.execute(
                "INSERT OR REPLACE INTO instrument
                 (trading_day, instrument, product, delivery_month, open_interest, volume)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                params![
                    day_str(i.trading_day),
                    i.instrument,
                    i.product,
                    i.delivery_month,
                    i.open_interest,
                    i.volume
                ],
            )
            .map_err(query_err)?;
        }
        tx.commit().map_err(query_err)?;
        Ok(())
    }

    pub fn insert_records(&self, records: &[MarketRecord]) -> Result<(), ContangoError> {
        let mut conn = self.conn()?;
        let tx = conn.transaction().map_err(query_err)?;
        for r in records {
            tx.execute(
                "INSERT INTO market (symbol, trading_day, happen_time, lastprice, openprice,
                                     highprice, lowprice, closeprice, volume, openinterest)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
                params![
                    r.symbol,
                    day_str(r.trading_day),
                    r.happen_time.format(TIME_FORMAT).to_string(),
                    r.get(LAST_PRICE),
                    r.get(OPEN_PRICE),
                    r.get(HIGH_PRICE),
                    r.get(LOW_PRICE),
                    r.get(CLOSE_PRICE),
                    r.get(VOLUME),
                    r.get(OPEN_INTEREST)
                ],
            )
            .map_err(query_err)?;
        }
        tx.commit().map_err(query_err)?;
        Ok(())
    }

    fn select_records(
        &self,
        where_clause: &str,
        args: &[&dyn rusqlite::ToSql],
        order_by: &str,
    ) -> Result<RecordTable, ContangoError> {
        let column = order_column(order_by)?;
        let conn = self.conn()?;
        let query = format!(
            "SELECT symbol, trading_day, happen_time, lastprice, openprice, highprice,
                    lowprice, closeprice, volume, openinterest
             FROM market WHERE {where_clause}
             ORDER BY {column} ASC, rowid ASC"
        );
        let mut stmt = conn.prepare(&query).map_err(query_err)?;
        let rows = stmt
            .query_map(args, |row| {
                let day: String = row.get(1)?;
                let time: String = row.get(2)?;
                let mut values: Vec<Option<f64>> = Vec::with_capacity(FIELDS.len());
                for i in 0..FIELDS.len() {
                    values.push(row.get(3 + i)?);
                }
                Ok((row.get::<_, String>(0)?, day, time, values))
            })
            .map_err(query_err)?;

        let mut table = RecordTable::new();
        for row in rows {
            let (symbol, day, time, values) = row.map_err(query_err)?;
            let happen_time = NaiveDateTime::parse_from_str(&time, TIME_FORMAT).map_err(
                |e: chrono::ParseError| ContangoError::Database {
                    reason: format!("bad happen time {time:?}: {e}"),
                },
            )?;
            let mut record = MarketRecord::new(&symbol, parse_day(&day)?, happen_time);
            for (field, value) in FIELDS.iter().zip(values) {
                if let Some(v) = value {
                    record = record.with_field(field, v);
                }
            }
            table.push(record);
        }
        Ok(table)
    }

    fn neighbour_day(
        &self,
        query: &str,
        key: &str,
        trading_day: NaiveDate,
    ) -> Result<Option<NaiveDate>, ContangoError> {
        let conn = self.conn()?;
        let day: Option<String> = conn
            .query_row(query, params![key, day_str(trading_day)], |row| row.get(0))
            .map_err(query_err)?;
        day.as_deref().map(parse_day).transpose()
    }
}

impl DataPort for SqliteAdapter {
    fn query_trading_day_info(
        &self,
        trading_day: NaiveDate,
    ) -> Result<Option<TradingDayInfo>, ContangoError> {
        let conn = self.conn()?;
        let mut stmt = conn
            .prepare("SELECT product FROM product WHERE trading_day = ?1 ORDER BY product")
            .map_err(query_err)?;
        let rows = stmt
            .query_map(params![day_str(trading_day)], |row| row.get(0))
            .map_err(query_err)?;

        let mut products = Vec::new();
        for row in rows {
            products.push(row.map_err(query_err)?);
        }
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
        let conn = self.conn()?;
        let row: Option<(String, Option<String>, Option<String>)> = conn
            .query_row(
                "SELECT instruments, dominant, sub_dominant FROM product
                 WHERE product = ?1 AND trading_day = ?2",
                params![product, day_str(trading_day)],
                |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?)),
            )
            .optional()
            .map_err(query_err)?;

        Ok(row.map(|(instruments, dominant, sub_dominant)| ProductInfo {
            product: product.to_string(),
            trading_day,
            instruments: instruments
                .split(',')
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(String::from)
                .collect(),
            dominant,
            sub_dominant,
        }))
    }

    fn query_instrument_info(
        &self,
        instrument: &str,
        trading_day: NaiveDate,
    ) -> Result<Option<InstrumentInfo>, ContangoError> {
        let conn = self.conn()?;
        conn.query_row(
            "SELECT product, delivery_month, open_interest, volume FROM instrument
             WHERE instrument = ?1 AND trading_day = ?2",
            params![instrument, day_str(trading_day)],
            |row| {
                Ok(InstrumentInfo {
                    instrument: instrument.to_string(),
                    product: row.get(0)?,
                    trading_day,
                    delivery_month: row.get(1)?,
                    open_interest: row.get(2)?,
                    volume: row.get(3)?,
                })
            },
        )
        .optional()
        .map_err(query_err)
    }

    fn query_records(
        &self,
        symbol: &str,
        trading_day: NaiveDate,
        order_by: &str,
    ) -> Result<RecordTable, ContangoError> {
        let day = day_str(trading_day);
        self.select_records(
            "symbol = ?1 AND trading_day = ?2",
            params![symbol, day],
            order_by,
        )
    }

    fn query_records_range(
        &self,
        symbol: &str,
        begin_day: NaiveDate,
        end_day: NaiveDate,
        order_by: &str,
    ) -> Result<RecordTable, ContangoError> {
        if begin_day >= end_day {
            return Ok(RecordTable::new());
        }
        let begin = day_str(begin_day);
        let end = day_str(end_day);
        self.select_records(
            "symbol = ?1 AND trading_day >= ?2 AND trading_day < ?3",
            params![symbol, begin, end],
            order_by,
        )
    }

    fn product_next_trading_day(
        &self,
        product: &str,
        trading_day: NaiveDate,
    ) -> Result<Option<NaiveDate>, ContangoError> {
        self.neighbour_day(
            "SELECT MIN(trading_day) FROM product WHERE product = ?1 AND trading_day > ?2",
            product,
            trading_day,
        )
    }

    fn product_last_trading_day(
        &self,
        product: &str,
        trading_day: NaiveDate,
    ) -> Result<Option<NaiveDate>, ContangoError> {
        self.neighbour_day(
            "SELECT MAX(trading_day) FROM product WHERE product = ?1 AND trading_day < ?2",
            product,
            trading_day,
        )
    }

    fn instrument_next_trading_day(
        &self,
        instrument: &str,
        trading_day: NaiveDate,
    ) -> Result<Option<NaiveDate>, ContangoError> {
        self.neighbour_day(
            "SELECT MIN(trading_day) FROM instrument WHERE instrument = ?1 AND trading_day > ?2",
            instrument,
            trading_day,
        )
    }

    fn instrument_last_trading_day(
        &self,
        instrument: &str,
        trading_day: NaiveDate,
    ) -> Result<Option<NaiveDate>, ContangoError> {
        self.neighbour_day(
            "SELECT MAX(trading_day) FROM instrument WHERE instrument = ?1 AND trading_day < ?2",
            instrument,
            trading_day,
        )
    }
}
