//! Backtest engine and event loop.
//!
//! The loop drains the event queue completely, then pulls the next step from
//! the market replay. Each market event of a batch is queued and drained on
//! its own, so every signal, order and fill caused by one market event is
//! handled before the next market event is seen. The run ends once the
//! replay is finished and the queue is empty.

use std::collections::HashMap;

use chrono::{NaiveDate, NaiveDateTime};
use tracing::{debug, info};

use super::backtest::BacktestConfig;
use super::error::ContangoError;
use super::event::{Event, FillEvent, MarketEvent, OrderEvent, SignalEvent};
use super::fill::{FillSimulator, ImmediateFillSimulator};
use super::portfolio::{LedgerEntry, Portfolio};
use super::queue::EventQueue;
use super::replay::{MarketReplay, ReplayStep};
use super::strategy::{InterestRegistrar, Strategy, StrategyContext};
use crate::ports::data_port::DataPort;

/// Counters collected over one run.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RunSummary {
    pub trading_days: usize,
    pub market_events: u64,
    pub signals: u64,
    pub orders: u64,
    pub fills: u64,
    pub last_datetime: Option<NaiveDateTime>,
}

pub struct BacktestEngine<'a> {
    replay: MarketReplay<'a>,
    queue: EventQueue,
    portfolio: Portfolio,
    fills: Box<dyn FillSimulator + 'a>,
    strategies: Vec<Box<dyn Strategy + 'a>>,
    strategy_index: HashMap<String, usize>,
    summary: RunSummary,
}

impl<'a> BacktestEngine<'a> {
    pub fn new(data: &'a dyn DataPort, config: &BacktestConfig) -> Result<Self, ContangoError> {
        Ok(BacktestEngine {
            replay: MarketReplay::new(data, config.begin_day, config.end_day),
            queue: EventQueue::new(),
            portfolio: Portfolio::new(&config.price_field)?,
            fills: Box::new(ImmediateFillSimulator::new(config.execution.clone())),
            strategies: Vec::new(),
            strategy_index: HashMap::new(),
            summary: RunSummary::default(),
        })
    }

    pub fn with_fill_simulator(mut self, fills: Box<dyn FillSimulator + 'a>) -> Self {
        self.fills = fills;
        self
    }

    /// Register a strategy and run its `on_init`. Names must be unique.
    pub fn add_strategy(&mut self, mut strategy: Box<dyn Strategy + 'a>) -> Result<(), ContangoError> {
        let name = strategy.name().to_string();
        if self.strategy_index.contains_key(&name) {
            return Err(ContangoError::DuplicateStrategy { name });
        }
        self.portfolio.register_strategy(&name)?;

        let mut registrar = InterestRegistrar::new(&name, &mut self.replay);
        strategy.on_init(&mut registrar)?;
        info!(strategy = %name, interests = registrar.handles().len(), "strategy added");

        self.strategy_index.insert(name, self.strategies.len());
        self.strategies.push(strategy);
        Ok(())
    }

    /// Queue an event ahead of the next run step.
    pub fn push_event(&mut self, event: Event) {
        self.queue.push(event);
    }

    pub fn run(&mut self) -> Result<RunSummary, ContangoError> {
        info!(
            begin = %self.replay.begin_day(),
            end = %self.replay.end_day(),
            strategies = self.strategies.len(),
            "backtest started"
        );
        loop {
            self.drain()?;
            match self.replay.advance()? {
                ReplayStep::Batch(events) => {
                    for event in events {
                        self.queue.push(Event::Market(event));
                        self.drain()?;
                    }
                }
                ReplayStep::DayEnd(day) => {
                    for strategy in &mut self.strategies {
                        strategy.on_day_end(day)?;
                    }
                    self.summary.trading_days += 1;
                    info!(
                        trading_day = %day,
                        orders = self.summary.orders,
                        fills = self.summary.fills,
                        "trading day done"
                    );
                }
                ReplayStep::Finished => break,
            }
        }
        self.drain()?;
        info!(
            trading_days = self.summary.trading_days,
            market_events = self.summary.market_events,
            signals = self.summary.signals,
            orders = self.summary.orders,
            fills = self.summary.fills,
            "backtest finished"
        );
        Ok(self.summary.clone())
    }

    fn drain(&mut self) -> Result<(), ContangoError> {
        while let Some(event) = self.queue.pop_front() {
            self.dispatch(event)?;
        }
        Ok(())
    }

    fn dispatch(&mut self, event: Event) -> Result<(), ContangoError> {
        self.summary.last_datetime = Some(event.datetime());
        match event {
            Event::Market(event) => self.on_market(event),
            Event::Signal(event) => self.on_signal(event),
            Event::Order(event) => self.on_order(event),
            Event::Fill(event) => self.on_fill(event),
        }
    }

    fn on_market(&mut self, event: MarketEvent) -> Result<(), ContangoError> {
        self.summary.market_events += 1;
        let subscribers = self.replay.strategies(event.interest).to_vec();
        for name in &subscribers {
            let index = *self
                .strategy_index
                .get(name)
                .ok_or_else(|| ContangoError::UnregisteredStrategy { name: name.clone() })?;
            let mut ctx = StrategyContext::new(name, &self.replay, &self.portfolio);
            self.strategies[index].on_market(&event, &mut ctx)?;
            for signal in ctx.into_signals() {
                self.queue.push(Event::Signal(signal));
            }
        }
        Ok(())
    }

    fn on_signal(&mut self, event: SignalEvent) -> Result<(), ContangoError> {
        if !self.strategy_index.contains_key(&event.strategy) {
            return Err(ContangoError::UnregisteredStrategy {
                name: event.strategy,
            });
        }
        self.summary.signals += 1;
        debug!(strategy = %event.strategy, symbol = %event.symbol, signal = %event.signal_type, "signal");
        let order = self
            .portfolio
            .deal_signal(&event, self.replay.latest(&event.symbol))?;
        self.queue.push(Event::Order(order));
        Ok(())
    }

    fn on_order(&mut self, event: OrderEvent) -> Result<(), ContangoError> {
        self.summary.orders += 1;
        for fill in self.fills.on_order(&event)? {
            self.queue.push(Event::Fill(fill));
        }
        Ok(())
    }

    fn on_fill(&mut self, event: FillEvent) -> Result<(), ContangoError> {
        self.summary.fills += 1;
        debug!(index = event.index, symbol = %event.symbol, quantity = event.quantity, price = event.price, "fill");
        self.portfolio.deal_fill(&event)
    }

    pub fn portfolio(&self) -> &Portfolio {
        &self.portfolio
    }

    pub fn replay(&self) -> &MarketReplay<'a> {
        &self.replay
    }

    pub fn summary(&self) -> &RunSummary {
        &self.summary
    }

    pub fn current_trading_day(&self) -> Option<NaiveDate> {
        self.replay.current_trading_day()
    }

    pub fn current_datetime(&self) -> Option<NaiveDateTime> {
        self.replay.current_datetime()
    }

    pub fn pending_events(&self) -> usize {
        self.queue.len()
    }

    pub fn ledger(&self, strategy: &str) -> &[LedgerEntry] {
        self.portfolio.ledger(strategy)
    }
}
