//! Strategy trait and the handles the engine passes into its callbacks.

use chrono::{NaiveDate, NaiveDateTime};

use super::error::ContangoError;
use super::event::{MarketEvent, SignalEvent, SignalType};
use super::market::{MarketRecord, RecordTable};
use super::portfolio::Portfolio;
use super::position::Position;
use super::replay::{Interest, InterestHandle, MarketReplay};

/// User-supplied trading logic.
///
/// `on_init` runs once when the strategy is added to the engine and is the
/// only place interests may be registered. `on_market` runs for every market
/// event of an interest the strategy registered; signals emitted through the
/// context are queued after the callback returns.
pub trait Strategy {
    fn name(&self) -> &str;

    fn on_init(&mut self, registrar: &mut InterestRegistrar<'_, '_>) -> Result<(), ContangoError>;

    fn on_market(
        &mut self,
        event: &MarketEvent,
        ctx: &mut StrategyContext<'_, '_>,
    ) -> Result<(), ContangoError>;

    /// Called after the last event of each trading day has been dispatched.
    fn on_day_end(&mut self, _trading_day: NaiveDate) -> Result<(), ContangoError> {
        Ok(())
    }
}

/// Registers interests on behalf of one strategy.
pub struct InterestRegistrar<'r, 'a> {
    strategy: &'r str,
    replay: &'r mut MarketReplay<'a>,
    handles: Vec<InterestHandle>,
}

impl<'r, 'a> InterestRegistrar<'r, 'a> {
    pub(crate) fn new(strategy: &'r str, replay: &'r mut MarketReplay<'a>) -> Self {
        InterestRegistrar {
            strategy,
            replay,
            handles: Vec::new(),
        }
    }

    pub fn register(&mut self, interest: Interest) -> InterestHandle {
        let handle = self.replay.register_interest(self.strategy, interest);
        self.handles.push(handle);
        handle
    }

    pub fn handles(&self) -> &[InterestHandle] {
        &self.handles
    }
}

/// Read access to replay and position state plus a signal sink, valid for
/// one callback.
pub struct StrategyContext<'c, 'a> {
    strategy: &'c str,
    replay: &'c MarketReplay<'a>,
    portfolio: &'c Portfolio,
    signals: Vec<SignalEvent>,
}

impl<'c, 'a> StrategyContext<'c, 'a> {
    pub(crate) fn new(
        strategy: &'c str,
        replay: &'c MarketReplay<'a>,
        portfolio: &'c Portfolio,
    ) -> Self {
        StrategyContext {
            strategy,
            replay,
            portfolio,
            signals: Vec::new(),
        }
    }

    pub fn strategy(&self) -> &str {
        self.strategy
    }

    /// Today's records for an interest, up to and including the current one.
    pub fn data(&self, handle: InterestHandle) -> Option<&RecordTable> {
        self.replay.data(handle)
    }

    pub fn symbol(&self, handle: InterestHandle) -> Option<&str> {
        self.replay.symbol(handle)
    }

    pub fn latest(&self, symbol: &str) -> Option<&MarketRecord> {
        self.replay.latest(symbol)
    }

    pub fn trading_day(&self) -> Option<NaiveDate> {
        self.replay.current_trading_day()
    }

    pub fn datetime(&self) -> Option<NaiveDateTime> {
        self.replay.current_datetime()
    }

    /// This strategy's position in `symbol` as of the last settled fill.
    /// Signals emitted during the current callback are not reflected.
    pub fn position(&self, symbol: &str) -> Option<&Position> {
        self.portfolio.position(self.strategy, symbol)
    }

    /// Emit a signal stamped with the event's simulated time.
    pub fn emit(&mut self, event: &MarketEvent, signal_type: SignalType, quantity: u64) {
        self.emit_with_strength(event, signal_type, quantity, 1.0);
    }

    pub fn emit_with_strength(
        &mut self,
        event: &MarketEvent,
        signal_type: SignalType,
        quantity: u64,
        strength: f64,
    ) {
        self.signals.push(SignalEvent {
            strategy: self.strategy.to_string(),
            symbol: event.symbol.clone(),
            signal_type,
            quantity,
            strength,
            trading_day: event.trading_day,
            datetime: event.datetime,
        });
    }

    pub(crate) fn into_signals(self) -> Vec<SignalEvent> {
        self.signals
    }
}
