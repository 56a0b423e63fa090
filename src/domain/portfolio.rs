//! Portfolio and order-state machine.
//!
//! Converts Signal events into Order events against the current position
//! snapshot and settles Fill events back into positions. Positions live in
//! one table keyed by interned `(StrategyId, SymbolId)` handles; every
//! strategy also gets an append-only ledger of its orders and fills.

use std::collections::HashMap;
use tracing::debug;

use super::error::ContangoError;
use super::event::{ActionType, DirectionType, FillEvent, OrderEvent, OrderType, SignalEvent};
use super::ids::{Interner, StrategyId, SymbolId};
use super::market::MarketRecord;
use super::position::Position;

#[derive(Debug, Clone, PartialEq)]
pub enum LedgerEntry {
    Order(OrderEvent),
    Fill(FillEvent),
}

#[derive(Debug, Clone)]
struct InFlightOrder {
    strategy: StrategyId,
    symbol: SymbolId,
    action: ActionType,
    direction: DirectionType,
    quantity: u64,
    filled: u64,
}

#[derive(Debug)]
pub struct Portfolio {
    price_field: String,
    strategies: Interner<StrategyId>,
    symbols: Interner<SymbolId>,
    positions: HashMap<(StrategyId, SymbolId), Position>,
    in_flight: HashMap<u64, InFlightOrder>,
    ledgers: Vec<Vec<LedgerEntry>>,
    next_order_index: u64,
}

impl Portfolio {
    /// `price_field` names the record field orders are priced from.
    pub fn new(price_field: &str) -> Result<Self, ContangoError> {
        if price_field.trim().is_empty() {
            return Err(ContangoError::ConfigMissing {
                section: "backtest".into(),
                key: "price_field".into(),
            });
        }
        Ok(Portfolio {
            price_field: price_field.trim().to_string(),
            strategies: Interner::new(),
            symbols: Interner::new(),
            positions: HashMap::new(),
            in_flight: HashMap::new(),
            ledgers: Vec::new(),
            next_order_index: 0,
        })
    }

    pub fn price_field(&self) -> &str {
        &self.price_field
    }

    pub fn register_strategy(&mut self, name: &str) -> Result<StrategyId, ContangoError> {
        if self.strategies.contains(name) {
            return Err(ContangoError::DuplicateStrategy { name: name.into() });
        }
        let id = self.strategies.intern(name);
        self.ledgers.push(Vec::new());
        Ok(id)
    }

    pub fn strategy_id(&self, name: &str) -> Result<StrategyId, ContangoError> {
        self.strategies
            .get(name)
            .ok_or_else(|| ContangoError::UnregisteredStrategy { name: name.into() })
    }

    /// Classify the signal, record the new in-flight order and return it.
    ///
    /// `latest` is the most recent market record of the signal's symbol.
    pub fn deal_signal(
        &mut self,
        signal: &SignalEvent,
        latest: Option<&MarketRecord>,
    ) -> Result<OrderEvent, ContangoError> {
        let strategy = self.strategy_id(&signal.strategy)?;
        let record = latest.ok_or_else(|| ContangoError::NoMarketData {
            symbol: signal.symbol.clone(),
            trading_day: signal.trading_day,
        })?;
        let price = record
            .get(&self.price_field)
            .ok_or_else(|| ContangoError::MissingPriceField {
                symbol: signal.symbol.clone(),
                field: self.price_field.clone(),
            })?;

        let symbol = self.symbols.intern(&signal.symbol);
        let position = self.positions.entry((strategy, symbol)).or_default();
        let (action, direction) = position.classify(signal.signal_type);
        *position.unfilled_mut(action, direction) += 1;

        let index = self.next_order_index;
        self.next_order_index += 1;

        let order = OrderEvent {
            index,
            strategy: signal.strategy.clone(),
            symbol: signal.symbol.clone(),
            order_type: OrderType::Limit,
            action,
            direction,
            quantity: signal.quantity,
            price,
            trading_day: signal.trading_day,
            datetime: signal.datetime,
        };
        self.in_flight.insert(
            index,
            InFlightOrder {
                strategy,
                symbol,
                action,
                direction,
                quantity: signal.quantity,
                filled: 0,
            },
        );
        self.ledgers[strategy.0 as usize].push(LedgerEntry::Order(order.clone()));
        debug!(
            strategy = %signal.strategy,
            symbol = %signal.symbol,
            index,
            %action,
            %direction,
            price,
            "order created"
        );
        Ok(order)
    }

    /// Settle a fill. The order leaves the unfilled counters once its
    /// cumulative filled quantity reaches the ordered quantity.
    pub fn deal_fill(&mut self, fill: &FillEvent) -> Result<(), ContangoError> {
        let order = self
            .in_flight
            .get(&fill.index)
            .cloned()
            .ok_or(ContangoError::UnknownOrder { index: fill.index })?;
        self.check_fill(fill, &order)?;

        let position = self
            .positions
            .get_mut(&(order.strategy, order.symbol))
            .ok_or(ContangoError::UnknownOrder { index: fill.index })?;

        match (order.action, order.direction) {
            (ActionType::Open, DirectionType::Buy) => position.long += fill.quantity,
            (ActionType::Open, DirectionType::Sell) => position.short += fill.quantity,
            (ActionType::Close, DirectionType::Buy) => {
                position.short = settle_close(
                    position.short,
                    fill,
                    &order,
                    &self.strategies,
                    &self.symbols,
                )?
            }
            (ActionType::Close, DirectionType::Sell) => {
                position.long = settle_close(
                    position.long,
                    fill,
                    &order,
                    &self.strategies,
                    &self.symbols,
                )?
            }
        }
        position.commission += fill.commission;

        let filled = order.filled + fill.quantity;
        if filled == order.quantity {
            let counter = position.unfilled_mut(order.action, order.direction);
            *counter = counter.saturating_sub(1);
            self.in_flight.remove(&fill.index);
        } else if let Some(in_flight) = self.in_flight.get_mut(&fill.index) {
            in_flight.filled = filled;
        }

        self.ledgers[order.strategy.0 as usize].push(LedgerEntry::Fill(fill.clone()));
        Ok(())
    }

    /// A fill must match its order's symbol, action and direction and must
    /// not push the cumulative filled quantity past the ordered quantity.
    fn check_fill(&self, fill: &FillEvent, order: &InFlightOrder) -> Result<(), ContangoError> {
        let symbol = self.symbols.name(order.symbol).unwrap_or_default();
        if fill.symbol != symbol || fill.action != order.action || fill.direction != order.direction {
            return Err(ContangoError::FillMismatch {
                index: fill.index,
                expected: format!("{symbol} {} {}", order.action, order.direction),
                actual: format!("{} {} {}", fill.symbol, fill.action, fill.direction),
            });
        }
        let remaining = order.quantity - order.filled;
        if fill.quantity > remaining {
            return Err(ContangoError::Overfill {
                index: fill.index,
                quantity: fill.quantity,
                filled: order.filled,
                ordered: order.quantity,
            });
        }
        Ok(())
    }

    /// Withdraw an unfilled order.
    pub fn cancel_order(&mut self, index: u64) -> Result<(), ContangoError> {
        let order = self
            .in_flight
            .remove(&index)
            .ok_or(ContangoError::UnknownOrder { index })?;
        if let Some(position) = self.positions.get_mut(&(order.strategy, order.symbol)) {
            let counter = position.unfilled_mut(order.action, order.direction);
            *counter = counter.saturating_sub(1);
        }
        Ok(())
    }

    pub fn position(&self, strategy: &str, symbol: &str) -> Option<&Position> {
        let strategy = self.strategies.get(strategy)?;
        let symbol = self.symbols.get(symbol)?;
        self.positions.get(&(strategy, symbol))
    }

    /// Every position of one strategy, keyed by symbol name.
    pub fn positions_of(&self, strategy: &str) -> Vec<(&str, &Position)> {
        let Some(id) = self.strategies.get(strategy) else {
            return Vec::new();
        };
        let mut out: Vec<(&str, &Position)> = self
            .positions
            .iter()
            .filter(|((s, _), _)| *s == id)
            .filter_map(|((_, sym), pos)| self.symbols.name(*sym).map(|n| (n, pos)))
            .collect();
        out.sort_by(|a, b| a.0.cmp(b.0));
        out
    }

    pub fn ledger(&self, strategy: &str) -> &[LedgerEntry] {
        self.strategies
            .get(strategy)
            .and_then(|id| self.ledgers.get(id.0 as usize))
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    pub fn in_flight_count(&self) -> usize {
        self.in_flight.len()
    }

    pub fn is_in_flight(&self, index: u64) -> bool {
        self.in_flight.contains_key(&index)
    }
}

fn settle_close(
    held: u64,
    fill: &FillEvent,
    order: &InFlightOrder,
    strategies: &Interner<StrategyId>,
    symbols: &Interner<SymbolId>,
) -> Result<u64, ContangoError> {
    held.checked_sub(fill.quantity)
        .ok_or_else(|| ContangoError::PositionUnderflow {
            strategy: strategies.name(order.strategy).unwrap_or_default().to_string(),
            symbol: symbols.name(order.symbol).unwrap_or_default().to_string(),
            index: fill.index,
            quantity: fill.quantity,
            held,
        })
}
