//! Simulation events.
//!
//! Every event carries the simulated timestamp and the trading day it belongs
//! to. The two differ: night sessions run past midnight under the next
//! day's trading-day label.

use chrono::{NaiveDate, NaiveDateTime};
use std::fmt;
use std::str::FromStr;

use super::error::ContangoError;
use super::market::MarketRecord;
use super::replay::InterestHandle;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    Market,
    Signal,
    Order,
    Fill,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SignalType {
    Long,
    Short,
}

impl FromStr for SignalType {
    type Err = ContangoError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "long" => Ok(SignalType::Long),
            "short" => Ok(SignalType::Short),
            _ => Err(ContangoError::UnknownSignal { value: s.to_string() }),
        }
    }
}

impl fmt::Display for SignalType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SignalType::Long => write!(f, "LONG"),
            SignalType::Short => write!(f, "SHORT"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ActionType {
    Open,
    Close,
}

impl fmt::Display for ActionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ActionType::Open => write!(f, "OPEN"),
            ActionType::Close => write!(f, "CLOSE"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DirectionType {
    Buy,
    Sell,
}

impl fmt::Display for DirectionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DirectionType::Buy => write!(f, "BUY"),
            DirectionType::Sell => write!(f, "SELL"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OrderType {
    Market,
    Limit,
}

/// New market data for one registered interest.
#[derive(Debug, Clone, PartialEq)]
pub struct MarketEvent {
    pub interest: InterestHandle,
    pub symbol: String,
    pub trading_day: NaiveDate,
    pub datetime: NaiveDateTime,
    pub record: MarketRecord,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SignalEvent {
    pub strategy: String,
    pub symbol: String,
    pub signal_type: SignalType,
    pub quantity: u64,
    pub strength: f64,
    pub trading_day: NaiveDate,
    pub datetime: NaiveDateTime,
}

#[derive(Debug, Clone, PartialEq)]
pub struct OrderEvent {
    pub index: u64,
    pub strategy: String,
    pub symbol: String,
    pub order_type: OrderType,
    pub action: ActionType,
    pub direction: DirectionType,
    pub quantity: u64,
    pub price: f64,
    pub trading_day: NaiveDate,
    pub datetime: NaiveDateTime,
}

#[derive(Debug, Clone, PartialEq)]
pub struct FillEvent {
    pub index: u64,
    pub symbol: String,
    pub action: ActionType,
    pub direction: DirectionType,
    pub quantity: u64,
    pub price: f64,
    pub commission: f64,
    pub trading_day: NaiveDate,
    pub datetime: NaiveDateTime,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Event {
    Market(MarketEvent),
    Signal(SignalEvent),
    Order(OrderEvent),
    Fill(FillEvent),
}

impl Event {
    pub fn kind(&self) -> EventKind {
        match self {
            Event::Market(_) => EventKind::Market,
            Event::Signal(_) => EventKind::Signal,
            Event::Order(_) => EventKind::Order,
            Event::Fill(_) => EventKind::Fill,
        }
    }

    pub fn datetime(&self) -> NaiveDateTime {
        match self {
            Event::Market(e) => e.datetime,
            Event::Signal(e) => e.datetime,
            Event::Order(e) => e.datetime,
            Event::Fill(e) => e.datetime,
        }
    }

    pub fn trading_day(&self) -> NaiveDate {
        match self {
            Event::Market(e) => e.trading_day,
            Event::Signal(e) => e.trading_day,
            Event::Order(e) => e.trading_day,
            Event::Fill(e) => e.trading_day,
        }
    }

    pub fn symbol(&self) -> &str {
        match self {
            Event::Market(e) => &e.symbol,
            Event::Signal(e) => &e.symbol,
            Event::Order(e) => &e.symbol,
            Event::Fill(e) => &e.symbol,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn day() -> NaiveDate {
        NaiveDate::from_ymd_opt(2017, 1, 19).unwrap()
    }

    fn night() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2017, 1, 18)
            .unwrap()
            .and_hms_opt(21, 5, 0)
            .unwrap()
    }

    #[test]
    fn signal_type_parses_case_insensitively() {
        assert_eq!("LONG".parse::<SignalType>().unwrap(), SignalType::Long);
        assert_eq!(" short ".parse::<SignalType>().unwrap(), SignalType::Short);
    }

    #[test]
    fn unknown_signal_is_rejected() {
        let err = "flat".parse::<SignalType>().unwrap_err();
        assert!(matches!(err, ContangoError::UnknownSignal { value } if value == "flat"));
    }

    #[test]
    fn accessors_cover_every_variant() {
        let fill = Event::Fill(FillEvent {
            index: 3,
            symbol: "rb1705".into(),
            action: ActionType::Open,
            direction: DirectionType::Buy,
            quantity: 2,
            price: 3100.0,
            commission: 0.0,
            trading_day: day(),
            datetime: night(),
        });
        assert_eq!(fill.kind(), EventKind::Fill);
        assert_eq!(fill.symbol(), "rb1705");
        // night session belongs to the next trading day
        assert!(fill.datetime().date() < fill.trading_day());
    }

    #[test]
    fn display_labels() {
        assert_eq!(SignalType::Long.to_string(), "LONG");
        assert_eq!(ActionType::Close.to_string(), "CLOSE");
        assert_eq!(DirectionType::Sell.to_string(), "SELL");
    }
}
