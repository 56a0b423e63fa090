//! Per (strategy, symbol) position counters.

use super::event::{ActionType, DirectionType, SignalType};

/// Held quantities plus the number of in-flight orders per action/direction.
///
/// There is no explicit state enum: the counters are the state.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Position {
    pub long: u64,
    pub short: u64,
    pub unfilled_open_buy: u32,
    pub unfilled_open_sell: u32,
    pub unfilled_close_buy: u32,
    pub unfilled_close_sell: u32,
    pub commission: f64,
}

impl Position {
    pub fn is_flat(&self) -> bool {
        self.long == 0 && self.short == 0
    }

    pub fn has_unfilled(&self) -> bool {
        self.unfilled_total() > 0
    }

    pub fn unfilled_total(&self) -> u32 {
        self.unfilled_open_buy
            + self.unfilled_open_sell
            + self.unfilled_close_buy
            + self.unfilled_close_sell
    }

    pub fn unfilled(&self, action: ActionType, direction: DirectionType) -> u32 {
        match (action, direction) {
            (ActionType::Open, DirectionType::Buy) => self.unfilled_open_buy,
            (ActionType::Open, DirectionType::Sell) => self.unfilled_open_sell,
            (ActionType::Close, DirectionType::Buy) => self.unfilled_close_buy,
            (ActionType::Close, DirectionType::Sell) => self.unfilled_close_sell,
        }
    }

    pub(crate) fn unfilled_mut(&mut self, action: ActionType, direction: DirectionType) -> &mut u32 {
        match (action, direction) {
            (ActionType::Open, DirectionType::Buy) => &mut self.unfilled_open_buy,
            (ActionType::Open, DirectionType::Sell) => &mut self.unfilled_open_sell,
            (ActionType::Close, DirectionType::Buy) => &mut self.unfilled_close_buy,
            (ActionType::Close, DirectionType::Sell) => &mut self.unfilled_close_sell,
        }
    }

    /// Order classification for a signal against this snapshot.
    ///
    /// A LONG closes while the short side still has quantity not already
    /// claimed by pending close-buys; otherwise it opens. SHORT mirrors it.
    pub fn classify(&self, signal: SignalType) -> (ActionType, DirectionType) {
        match signal {
            SignalType::Long => {
                if self.short > u64::from(self.unfilled_close_buy) {
                    (ActionType::Close, DirectionType::Buy)
                } else {
                    (ActionType::Open, DirectionType::Buy)
                }
            }
            SignalType::Short => {
                if self.long > u64::from(self.unfilled_close_sell) {
                    (ActionType::Close, DirectionType::Sell)
                } else {
                    (ActionType::Open, DirectionType::Sell)
                }
            }
        }
    }

    /// Net exposure: long minus short.
    pub fn net(&self) -> i64 {
        self.long as i64 - self.short as i64
    }
}
