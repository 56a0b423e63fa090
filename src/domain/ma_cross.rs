//! Moving-average crossover strategy.
//!
//! Feeds the configured price field into a fast and a slow SMA. When the
//! fast average crosses above the slow one it goes long, crossing below goes
//! short. A reversal first closes whatever the held side holds; the opening
//! signal is sent on a later event, once the strategy's position is flat with
//! nothing in flight. Averages restart whenever the interest rolls to a new
//! contract.

use tracing::{debug, warn};

use super::contract::RolloverRule;
use super::error::ContangoError;
use super::event::{MarketEvent, SignalType};
use super::indicator::{Indicator, Sma};
use super::replay::{Interest, InterestHandle};
use super::strategy::{InterestRegistrar, Strategy, StrategyContext};
use crate::ports::config_port::{ConfigPort, get_count};

#[derive(Debug, Clone, PartialEq)]
pub struct MaCrossConfig {
    pub name: String,
    pub interest: Interest,
    pub price_field: String,
    pub fast: usize,
    pub slow: usize,
    pub quantity: u64,
}

impl MaCrossConfig {
    /// Read the `[strategy]` section. The target is the first of `product`,
    /// `index` and `symbol` that is set.
    pub fn from_config(config: &dyn ConfigPort, price_field: &str) -> Result<Self, ContangoError> {
        let get = |key: &str| config.get_string("strategy", key);
        let target = match (get("product"), get("index"), get("symbol")) {
            (Some(product), _, _) => {
                let rule = get("rule")
                    .unwrap_or_else(|| RolloverRule::Dominant.to_string())
                    .parse::<RolloverRule>()?;
                Interest::product(&product, rule)
            }
            (None, Some(index), _) => Interest::index(&index),
            (None, None, Some(symbol)) => Interest::symbol(&symbol),
            (None, None, None) => {
                return Err(ContangoError::ConfigMissing {
                    section: "strategy".into(),
                    key: "product".into(),
                });
            }
        };
        let minute_skip: u32 = get_count(config, "strategy", "minute_skip", 1, 0)?;
        Ok(MaCrossConfig {
            name: config
                .get_string("strategy", "name")
                .unwrap_or_else(|| "ma_cross".to_string()),
            interest: target.with_minute_skip(minute_skip),
            price_field: price_field.to_string(),
            fast: get_count(config, "strategy", "fast", 5, 1)?,
            slow: get_count(config, "strategy", "slow", 20, 1)?,
            quantity: get_count(config, "strategy", "quantity", 1, 1)?,
        })
    }
}

#[derive(Debug)]
pub struct MaCrossStrategy {
    config: MaCrossConfig,
    handle: Option<InterestHandle>,
    symbol: Option<String>,
    fast: Sma,
    slow: Sma,
    prev_spread: Option<f64>,
    side: Option<SignalType>,
}

impl MaCrossStrategy {
    pub fn new(config: MaCrossConfig) -> Self {
        let fast = Sma::new(config.fast, &config.price_field);
        let slow = Sma::new(config.slow, &config.price_field);
        MaCrossStrategy {
            config,
            handle: None,
            symbol: None,
            fast,
            slow,
            prev_spread: None,
            side: None,
        }
    }

    pub fn side(&self) -> Option<SignalType> {
        self.side
    }

    fn restart(&mut self, symbol: &str) {
        self.fast = Sma::new(self.config.fast, &self.config.price_field);
        self.slow = Sma::new(self.config.slow, &self.config.price_field);
        self.prev_spread = None;
        self.symbol = Some(symbol.to_string());
    }

    fn go(&mut self, event: &MarketEvent, target: SignalType) {
        if self.side == Some(target) {
            return;
        }
        debug!(strategy = %self.config.name, symbol = %event.symbol, side = %target, "crossover");
        self.side = Some(target);
    }

    /// Move the position one step toward the wanted side: close the opposite
    /// side if anything is held there, otherwise open if nothing is held yet.
    /// Waits while any order of this position is in flight.
    fn rebalance(&self, event: &MarketEvent, ctx: &mut StrategyContext<'_, '_>) {
        let Some(target) = self.side else {
            return;
        };
        let (against, with) = match ctx.position(&event.symbol) {
            Some(pos) if pos.has_unfilled() => return,
            Some(pos) => match target {
                SignalType::Long => (pos.short, pos.long),
                SignalType::Short => (pos.long, pos.short),
            },
            None => (0, 0),
        };
        if against > 0 {
            ctx.emit(event, target, against);
        } else if with == 0 {
            ctx.emit(event, target, self.config.quantity);
        }
    }
}

impl Strategy for MaCrossStrategy {
    fn name(&self) -> &str {
        &self.config.name
    }

    fn on_init(&mut self, registrar: &mut InterestRegistrar<'_, '_>) -> Result<(), ContangoError> {
        self.handle = Some(registrar.register(self.config.interest.clone()));
        Ok(())
    }

    fn on_market(
        &mut self,
        event: &MarketEvent,
        ctx: &mut StrategyContext<'_, '_>,
    ) -> Result<(), ContangoError> {
        if self.handle != Some(event.interest) {
            return Ok(());
        }
        if self.symbol.as_deref() != Some(event.symbol.as_str()) {
            if let Some(previous) = &self.symbol {
                // positions on the previous contract are left to the operator
                warn!(strategy = %self.config.name, from = %previous, to = %event.symbol, "contract rolled");
            }
            self.restart(&event.symbol);
            self.side = None;
        }

        self.fast.add_one(&event.record);
        self.slow.add_one(&event.record);
        if let (Some(fast), Some(slow)) = (self.fast.last(), self.slow.last()) {
            let spread = fast - slow;
            if let Some(prev) = self.prev_spread {
                if prev <= 0.0 && spread > 0.0 {
                    self.go(event, SignalType::Long);
                } else if prev >= 0.0 && spread < 0.0 {
                    self.go(event, SignalType::Short);
                }
            }
            self.prev_spread = Some(spread);
        }
        self.rebalance(event, ctx);
        Ok(())
    }
}
