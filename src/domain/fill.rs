//! Fill simulation.
//!
//! Turns Order events into Fill events. The engine routes every order through
//! a [`FillSimulator`]; the default one fills the whole quantity at once at
//! the order price, adjusted for slippage, and charges a commission.

use super::error::ContangoError;
use super::event::{DirectionType, FillEvent, OrderEvent};

/// Slippage and commission parameters.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ExecutionConfig {
    pub commission_per_trade: f64,
    pub commission_pct: f64,
    pub slippage_pct: f64,
}

/// Calculate commission: flat_fee + (trade_value * pct / 100).
pub fn calculate_commission(trade_value: f64, config: &ExecutionConfig) -> f64 {
    config.commission_per_trade + (trade_value * config.commission_pct / 100.0)
}

/// Buys execute above the quoted price, sells below it.
pub fn apply_slippage(price: f64, direction: DirectionType, slippage_pct: f64) -> f64 {
    match direction {
        DirectionType::Buy => price * (1.0 + slippage_pct / 100.0),
        DirectionType::Sell => price * (1.0 - slippage_pct / 100.0),
    }
}

pub trait FillSimulator {
    /// Fills produced in response to `order`. May be empty, in which case
    /// the order stays in flight.
    fn on_order(&mut self, order: &OrderEvent) -> Result<Vec<FillEvent>, ContangoError>;
}

/// Fills each order completely, immediately.
#[derive(Debug, Clone, Default)]
pub struct ImmediateFillSimulator {
    config: ExecutionConfig,
}

impl ImmediateFillSimulator {
    pub fn new(config: ExecutionConfig) -> Self {
        ImmediateFillSimulator { config }
    }

    pub fn config(&self) -> &ExecutionConfig {
        &self.config
    }
}

impl FillSimulator for ImmediateFillSimulator {
    fn on_order(&mut self, order: &OrderEvent) -> Result<Vec<FillEvent>, ContangoError> {
        let price = apply_slippage(order.price, order.direction, self.config.slippage_pct);
        let commission = calculate_commission(price * order.quantity as f64, &self.config);
        Ok(vec![FillEvent {
            index: order.index,
            symbol: order.symbol.clone(),
            action: order.action,
            direction: order.direction,
            quantity: order.quantity,
            price,
            commission,
            trading_day: order.trading_day,
            datetime: order.datetime,
        }])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::event::{ActionType, OrderType};
    use approx::assert_relative_eq;
    use chrono::NaiveDate;

    fn order(direction: DirectionType, quantity: u64, price: f64) -> OrderEvent {
        let day = NaiveDate::from_ymd_opt(2017, 1, 19).unwrap();
        OrderEvent {
            index: 7,
            strategy: "ma".into(),
            symbol: "rb1705".into(),
            order_type: OrderType::Limit,
            action: ActionType::Open,
            direction,
            quantity,
            price,
            trading_day: day,
            datetime: day.and_hms_opt(21, 0, 0).unwrap(),
        }
    }

    #[test]
    fn commission_flat_plus_pct() {
        let config = ExecutionConfig {
            commission_per_trade: 5.0,
            commission_pct: 0.1,
            slippage_pct: 0.0,
        };
        assert_relative_eq!(calculate_commission(10_000.0, &config), 15.0);
    }

    #[test]
    fn slippage_by_direction() {
        assert_relative_eq!(apply_slippage(100.0, DirectionType::Buy, 1.0), 101.0);
        assert_relative_eq!(apply_slippage(100.0, DirectionType::Sell, 1.0), 99.0);
        assert_relative_eq!(apply_slippage(100.0, DirectionType::Sell, 0.0), 100.0);
    }

    #[test]
    fn immediate_fill_covers_whole_order() {
        let mut sim = ImmediateFillSimulator::default();
        let fills = sim.on_order(&order(DirectionType::Buy, 3, 3200.0)).unwrap();
        assert_eq!(fills.len(), 1);
        let fill = &fills[0];
        assert_eq!(fill.index, 7);
        assert_eq!(fill.quantity, 3);
        assert_relative_eq!(fill.price, 3200.0);
        assert_relative_eq!(fill.commission, 0.0);
    }

    #[test]
    fn immediate_fill_applies_costs() {
        let mut sim = ImmediateFillSimulator::new(ExecutionConfig {
            commission_per_trade: 1.0,
            commission_pct: 0.5,
            slippage_pct: 2.0,
        });
        let fills = sim.on_order(&order(DirectionType::Sell, 2, 100.0)).unwrap();
        assert_relative_eq!(fills[0].price, 98.0);
        assert_relative_eq!(fills[0].commission, 1.0 + 196.0 * 0.005);
        assert_eq!(sim.config().slippage_pct, 2.0);
    }
}
