//! Market replay.
//!
//! Strategies register interests (a concrete symbol, a product plus a
//! rollover rule, or a product's index series). Symbols and products are
//! folded to lower case on registration. The replay walks trading days from the begin day to the
//! end day inclusive, resolves each interest to a concrete symbol for the
//! day, loads that day's records and releases them in happen-time order,
//! one simulated timestamp per step. Interests sharing a day are merged on
//! one cursor so they always stand at the same timestamp.

use std::collections::{HashMap, VecDeque};
use std::fmt;

use chrono::{NaiveDate, NaiveDateTime};
use tracing::{debug, info};

use super::contract::{ContractResolver, RolloverRule};
use super::error::ContangoError;
use super::event::MarketEvent;
use super::instrument::normalize_key;
use super::market::{HAPPEN_TIME, MarketRecord, RecordTable};
use crate::ports::data_port::DataPort;

/// Opaque handle to a registered interest.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct InterestHandle(pub usize);

impl fmt::Display for InterestHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Interest#{}", self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum InterestTarget {
    Symbol(String),
    Product { product: String, rule: RolloverRule },
    /// The product's index series, stored under the product key.
    Index(String),
}

impl fmt::Display for InterestTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            InterestTarget::Symbol(symbol) => write!(f, "{symbol}"),
            InterestTarget::Product { product, rule } => write!(f, "{product}@{rule}"),
            InterestTarget::Index(product) => write!(f, "{product}@index"),
        }
    }
}

/// What a strategy wants to see.
///
/// `minute_skip` thins the stream: with a value above one, a market event is
/// emitted only for records whose minute-of-day is a multiple of it, once per
/// such minute. Every record still lands in the interest's data table.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Interest {
    pub target: InterestTarget,
    pub minute_skip: u32,
}

impl Interest {
    pub fn symbol(symbol: &str) -> Self {
        Interest {
            target: InterestTarget::Symbol(normalize_key(symbol)),
            minute_skip: 1,
        }
    }

    pub fn product(product: &str, rule: RolloverRule) -> Self {
        Interest {
            target: InterestTarget::Product {
                product: normalize_key(product),
                rule,
            },
            minute_skip: 1,
        }
    }

    pub fn index(product: &str) -> Self {
        Interest {
            target: InterestTarget::Index(normalize_key(product)),
            minute_skip: 1,
        }
    }

    pub fn with_minute_skip(mut self, minute_skip: u32) -> Self {
        self.minute_skip = minute_skip;
        self
    }

    fn normalized(self) -> Self {
        let minute_skip = self.minute_skip;
        let target = match self.target {
            InterestTarget::Symbol(symbol) => InterestTarget::Symbol(normalize_key(&symbol)),
            InterestTarget::Product { product, rule } => InterestTarget::Product {
                product: normalize_key(&product),
                rule,
            },
            InterestTarget::Index(product) => InterestTarget::Index(normalize_key(&product)),
        };
        Interest {
            target,
            minute_skip,
        }
    }

    fn admits(&self, record: &MarketRecord, last_minute: Option<u32>) -> bool {
        if self.minute_skip <= 1 {
            return true;
        }
        let minute = record.minute_of_day();
        minute % self.minute_skip == 0 && last_minute != Some(minute)
    }
}

#[derive(Debug)]
struct Registration {
    interest: Interest,
    strategies: Vec<String>,
    symbol: Option<String>,
    data: RecordTable,
    last_minute: Option<u32>,
}

/// Outcome of one [`MarketReplay::advance`] call.
#[derive(Debug, Clone, PartialEq)]
pub enum ReplayStep {
    /// Market events sharing one simulated timestamp.
    Batch(Vec<MarketEvent>),
    /// The given trading day has been fully released.
    DayEnd(NaiveDate),
    Finished,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ReplayState {
    Pending(NaiveDate),
    InDay(NaiveDate),
    Finished,
}

pub struct MarketReplay<'a> {
    data: &'a dyn DataPort,
    begin_day: NaiveDate,
    end_day: NaiveDate,
    state: ReplayState,
    registrations: Vec<Registration>,
    cursor: VecDeque<MarketRecord>,
    latest: HashMap<String, MarketRecord>,
    current_datetime: Option<NaiveDateTime>,
    days_replayed: usize,
}

impl<'a> MarketReplay<'a> {
    pub fn new(data: &'a dyn DataPort, begin_day: NaiveDate, end_day: NaiveDate) -> Self {
        MarketReplay {
            data,
            begin_day,
            end_day,
            state: ReplayState::Pending(begin_day),
            registrations: Vec::new(),
            cursor: VecDeque::new(),
            latest: HashMap::new(),
            current_datetime: None,
            days_replayed: 0,
        }
    }

    pub fn begin_day(&self) -> NaiveDate {
        self.begin_day
    }

    pub fn end_day(&self) -> NaiveDate {
        self.end_day
    }

    /// Register `strategy` for `interest`. Identical interests share one
    /// registration and therefore one handle.
    pub fn register_interest(&mut self, strategy: &str, interest: Interest) -> InterestHandle {
        let interest = interest.normalized();
        if let Some(pos) = self
            .registrations
            .iter()
            .position(|r| r.interest == interest)
        {
            let reg = &mut self.registrations[pos];
            if !reg.strategies.iter().any(|s| s == strategy) {
                reg.strategies.push(strategy.to_string());
            }
            return InterestHandle(pos);
        }
        debug!(strategy, interest = %interest.target, minute_skip = interest.minute_skip, "interest registered");
        self.registrations.push(Registration {
            interest,
            strategies: vec![strategy.to_string()],
            symbol: None,
            data: RecordTable::new(),
            last_minute: None,
        });
        InterestHandle(self.registrations.len() - 1)
    }

    pub fn interest_count(&self) -> usize {
        self.registrations.len()
    }

    pub fn interest(&self, handle: InterestHandle) -> Option<&Interest> {
        self.registrations.get(handle.0).map(|r| &r.interest)
    }

    /// Strategies subscribed to `handle`, in registration order.
    pub fn strategies(&self, handle: InterestHandle) -> &[String] {
        self.registrations
            .get(handle.0)
            .map(|r| r.strategies.as_slice())
            .unwrap_or(&[])
    }

    /// Concrete symbol the interest resolved to for the current day.
    pub fn symbol(&self, handle: InterestHandle) -> Option<&str> {
        self.registrations
            .get(handle.0)
            .and_then(|r| r.symbol.as_deref())
    }

    /// Records released so far today for the interest.
    pub fn data(&self, handle: InterestHandle) -> Option<&RecordTable> {
        self.registrations.get(handle.0).map(|r| &r.data)
    }

    /// Most recent record released for `symbol`, across all days.
    pub fn latest(&self, symbol: &str) -> Option<&MarketRecord> {
        self.latest.get(symbol)
    }

    pub fn current_trading_day(&self) -> Option<NaiveDate> {
        match self.state {
            ReplayState::InDay(day) => Some(day),
            _ => None,
        }
    }

    pub fn current_datetime(&self) -> Option<NaiveDateTime> {
        self.current_datetime
    }

    pub fn days_replayed(&self) -> usize {
        self.days_replayed
    }

    pub fn is_finished(&self) -> bool {
        self.state == ReplayState::Finished
    }

    /// Move the replay forward by one step.
    ///
    /// Once `Finished` is returned every later call returns it again.
    pub fn advance(&mut self) -> Result<ReplayStep, ContangoError> {
        if self.registrations.is_empty() || self.begin_day > self.end_day {
            self.state = ReplayState::Finished;
        }
        loop {
            match self.state {
                ReplayState::Finished => return Ok(ReplayStep::Finished),
                ReplayState::Pending(from) => match self.next_trading_day(from)? {
                    Some(day) => self.load_day(day)?,
                    None => {
                        info!(days = self.days_replayed, "replay finished");
                        self.state = ReplayState::Finished;
                    }
                },
                ReplayState::InDay(day) => {
                    let Some(head) = self.cursor.front() else {
                        self.state = match day.succ_opt() {
                            Some(next) => ReplayState::Pending(next),
                            None => ReplayState::Finished,
                        };
                        return Ok(ReplayStep::DayEnd(day));
                    };
                    let now = head.happen_time;
                    self.current_datetime = Some(now);
                    let mut events = Vec::new();
                    while self.cursor.front().is_some_and(|r| r.happen_time == now) {
                        if let Some(record) = self.cursor.pop_front() {
                            self.release(record, &mut events);
                        }
                    }
                    if !events.is_empty() {
                        return Ok(ReplayStep::Batch(events));
                    }
                }
            }
        }
    }

    fn next_trading_day(&self, from: NaiveDate) -> Result<Option<NaiveDate>, ContangoError> {
        let mut day = from;
        while day <= self.end_day {
            if self.data.is_trading_day(day)? {
                return Ok(Some(day));
            }
            match day.succ_opt() {
                Some(next) => day = next,
                None => break,
            }
        }
        Ok(None)
    }

    fn load_day(&mut self, day: NaiveDate) -> Result<(), ContangoError> {
        let resolver = ContractResolver::new(self.data);
        let mut symbols: Vec<String> = Vec::new();
        for reg in &mut self.registrations {
            reg.data.clear();
            reg.last_minute = None;
            reg.symbol = match &reg.interest.target {
                InterestTarget::Symbol(symbol) => Some(symbol.clone()),
                InterestTarget::Product { product, rule } => resolver.resolve(product, day, *rule)?,
                InterestTarget::Index(product) => resolver.index_symbol(product, day)?,
            };
            if reg.symbol.is_none() {
                debug!(interest = %reg.interest.target, trading_day = %day, "interest unresolved, no events today");
            }
            if let Some(symbol) = &reg.symbol {
                if !symbols.contains(symbol) {
                    symbols.push(symbol.clone());
                }
            }
        }

        let mut rows = Vec::new();
        for symbol in &symbols {
            rows.extend(self.data.query_records(symbol, day, HAPPEN_TIME)?.into_rows());
        }
        rows.sort_by_key(|r| r.happen_time);

        info!(trading_day = %day, symbols = symbols.len(), records = rows.len(), "trading day loaded");
        self.cursor = rows.into();
        self.days_replayed += 1;
        self.state = ReplayState::InDay(day);
        Ok(())
    }

    fn release(&mut self, record: MarketRecord, events: &mut Vec<MarketEvent>) {
        for (i, reg) in self.registrations.iter_mut().enumerate() {
            if reg.symbol.as_deref() != Some(record.symbol.as_str()) {
                continue;
            }
            reg.data.push(record.clone());
            if reg.interest.admits(&record, reg.last_minute) {
                reg.last_minute = Some(record.minute_of_day());
                events.push(MarketEvent {
                    interest: InterestHandle(i),
                    symbol: record.symbol.clone(),
                    trading_day: record.trading_day,
                    datetime: record.happen_time,
                    record: record.clone(),
                });
            }
        }
        self.latest.insert(record.symbol.clone(), record);
    }
}

impl fmt::Debug for MarketReplay<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MarketReplay")
            .field("begin_day", &self.begin_day)
            .field("end_day", &self.end_day)
            .field("state", &self.state)
            .field("interests", &self.registrations.len())
            .field("pending_records", &self.cursor.len())
            .finish()
    }
}
