#![allow(dead_code)]

use chrono::{NaiveDate, NaiveDateTime};
use contango::adapters::memory_adapter::InMemoryDataPort;
use contango::domain::error::ContangoError;
use contango::domain::event::{FillEvent, MarketEvent, OrderEvent, SignalType};
use contango::domain::fill::{ExecutionConfig, FillSimulator, ImmediateFillSimulator};
use contango::domain::instrument::{InstrumentInfo, ProductInfo};
use contango::domain::market::{CLOSE_PRICE, LAST_PRICE, MarketRecord};
use contango::domain::replay::Interest;
use contango::domain::strategy::{InterestRegistrar, Strategy, StrategyContext};
use std::cell::RefCell;
use std::rc::Rc;

pub type Log = Rc<RefCell<Vec<String>>>;

pub fn new_log() -> Log {
    Rc::new(RefCell::new(Vec::new()))
}

/// A day in January 2017.
pub fn d(day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(2017, 1, day).unwrap()
}

pub fn at(day: u32, hour: u32, minute: u32) -> NaiveDateTime {
    d(day).and_hms_opt(hour, minute, 0).unwrap()
}

/// A record carrying the same price in both the last and close fields.
pub fn tick(symbol: &str, day: u32, hour: u32, minute: u32, price: f64) -> MarketRecord {
    MarketRecord::new(symbol, d(day), at(day, hour, minute))
        .with_field(LAST_PRICE, price)
        .with_field(CLOSE_PRICE, price)
}

/// Builder over the in-memory data source.
pub struct MarketFixture {
    port: InMemoryDataPort,
}

impl MarketFixture {
    pub fn new() -> Self {
        Self {
            port: InMemoryDataPort::new(),
        }
    }

    pub fn with_product(
        mut self,
        product: &str,
        day: u32,
        instruments: &[&str],
        dominant: Option<&str>,
        sub_dominant: Option<&str>,
    ) -> Self {
        self.port.insert_product(ProductInfo {
            product: product.to_string(),
            trading_day: d(day),
            instruments: instruments.iter().map(|s| s.to_string()).collect(),
            dominant: dominant.map(str::to_string),
            sub_dominant: sub_dominant.map(str::to_string),
        });
        self
    }

    pub fn with_instrument(
        mut self,
        instrument: &str,
        product: &str,
        day: u32,
        open_interest: f64,
        volume: f64,
    ) -> Self {
        self.port.insert_instrument(InstrumentInfo {
            instrument: instrument.to_string(),
            product: product.to_string(),
            trading_day: d(day),
            delivery_month: instrument.trim_start_matches(char::is_alphabetic).to_string(),
            open_interest,
            volume,
        });
        self
    }

    /// One tick per minute starting at 09:00, one per price.
    pub fn with_minutes(mut self, symbol: &str, day: u32, prices: &[f64]) -> Self {
        let records = prices
            .iter()
            .enumerate()
            .map(|(i, p)| tick(symbol, day, 9 + i as u32 / 60, i as u32 % 60, *p))
            .collect();
        self.port.insert_records(records);
        self
    }

    pub fn with_records(mut self, records: Vec<MarketRecord>) -> Self {
        self.port.insert_records(records);
        self
    }

    pub fn failing_on(mut self, key: &str) -> Self {
        self.port.fail_on(key, "source unavailable");
        self
    }

    pub fn build(self) -> InMemoryDataPort {
        self.port
    }
}

/// Strategy that logs every market event it sees and emits a scripted
/// sequence of signals, one script entry per event.
pub struct Recorder {
    name: String,
    interests: Vec<Interest>,
    script: Vec<Vec<SignalType>>,
    seen: usize,
    log: Log,
}

impl Recorder {
    pub fn new(name: &str, interests: Vec<Interest>, log: Log) -> Self {
        Self {
            name: name.to_string(),
            interests,
            script: Vec::new(),
            seen: 0,
            log,
        }
    }

    pub fn with_script(mut self, script: Vec<Vec<SignalType>>) -> Self {
        self.script = script;
        self
    }
}

impl Strategy for Recorder {
    fn name(&self) -> &str {
        &self.name
    }

    fn on_init(&mut self, registrar: &mut InterestRegistrar<'_, '_>) -> Result<(), ContangoError> {
        for interest in &self.interests {
            registrar.register(interest.clone());
        }
        Ok(())
    }

    fn on_market(
        &mut self,
        event: &MarketEvent,
        ctx: &mut StrategyContext<'_, '_>,
    ) -> Result<(), ContangoError> {
        let rows = ctx.data(event.interest).map_or(0, |t| t.len());
        self.log.borrow_mut().push(format!(
            "market {} {} rows={rows}",
            event.symbol,
            event.datetime.format("%d %H:%M")
        ));
        if let Some(signals) = self.script.get(self.seen) {
            for signal in signals {
                ctx.emit(event, *signal, 1);
            }
        }
        self.seen += 1;
        Ok(())
    }

    fn on_day_end(&mut self, trading_day: NaiveDate) -> Result<(), ContangoError> {
        self.log.borrow_mut().push(format!("day end {trading_day}"));
        Ok(())
    }
}

/// Fills every order in full and logs each order it sees.
pub struct RecordingFills {
    inner: ImmediateFillSimulator,
    log: Log,
}

impl RecordingFills {
    pub fn new(log: Log) -> Self {
        Self {
            inner: ImmediateFillSimulator::new(ExecutionConfig::default()),
            log,
        }
    }
}

impl FillSimulator for RecordingFills {
    fn on_order(&mut self, order: &OrderEvent) -> Result<Vec<FillEvent>, ContangoError> {
        self.log.borrow_mut().push(format!(
            "order {} {} {}",
            order.index, order.action, order.direction
        ));
        self.inner.on_order(order)
    }
}
