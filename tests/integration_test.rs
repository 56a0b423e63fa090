mod common;

use common::*;
use contango::adapters::cached_adapter::CachedDataPort;
use contango::domain::backtest::BacktestConfig;
use contango::domain::contract::{ContractResolver, RolloverRule};
use contango::domain::engine::{BacktestEngine, RunSummary};
use contango::domain::error::ContangoError;
use contango::domain::event::{ActionType, DirectionType, FillEvent, SignalEvent, SignalType};
use contango::domain::ma_cross::{MaCrossConfig, MaCrossStrategy};
use contango::domain::market::CLOSE_PRICE;
use contango::domain::portfolio::{LedgerEntry, Portfolio};
use contango::domain::position::Position;
use contango::domain::replay::Interest;
use contango::ports::data_port::DataPort;

// ===========================================================================
// Event loop ordering
// ===========================================================================

#[test]
fn follow_on_events_finish_before_next_market_event() {
    let port = MarketFixture::new()
        .with_product("ag", 19, &["ag1706"], Some("ag1706"), None)
        .with_minutes("ag1706", 19, &[4100.0, 4101.0])
        .build();
    let log = new_log();

    let recorder = Recorder::new("rec", vec![Interest::symbol("ag1706")], log.clone())
        .with_script(vec![
            vec![SignalType::Long, SignalType::Long],
            vec![SignalType::Short],
        ]);
    let mut engine = BacktestEngine::new(&port, &BacktestConfig::new(d(19), d(19)))
        .unwrap()
        .with_fill_simulator(Box::new(RecordingFills::new(log.clone())));
    engine.add_strategy(Box::new(recorder)).unwrap();
    let summary = engine.run().unwrap();

    // The SHORT only closes if both earlier fills were applied first.
    assert_eq!(
        *log.borrow(),
        vec![
            "market ag1706 19 09:00 rows=1",
            "order 0 OPEN BUY",
            "order 1 OPEN BUY",
            "market ag1706 19 09:01 rows=2",
            "order 2 CLOSE SELL",
            "day end 2017-01-19",
        ]
    );
    assert_eq!(summary.signals, 3);
    assert_eq!(summary.fills, 3);
    assert_eq!(summary.last_datetime, Some(at(19, 9, 1)));

    let pos = engine.portfolio().position("rec", "ag1706").unwrap();
    assert_eq!(pos.long, 1);
    assert_eq!(pos.short, 0);
    assert!(!pos.has_unfilled());
    assert_eq!(engine.pending_events(), 0);
}

#[test]
fn run_with_no_interests_returns_immediately() {
    let port = MarketFixture::new()
        .with_product("ag", 19, &["ag1706"], Some("ag1706"), None)
        .with_minutes("ag1706", 19, &[4100.0])
        .build();
    let log = new_log();
    let mut engine = BacktestEngine::new(&port, &BacktestConfig::new(d(19), d(31))).unwrap();
    engine
        .add_strategy(Box::new(Recorder::new("idle", vec![], log.clone())))
        .unwrap();

    assert_eq!(engine.run().unwrap(), RunSummary::default());
    assert!(log.borrow().is_empty());
}

#[test]
fn strategies_sharing_an_interest_see_the_same_events() {
    let port = MarketFixture::new()
        .with_product("ag", 19, &["ag1706"], Some("ag1706"), None)
        .with_minutes("ag1706", 19, &[4100.0, 4101.0, 4102.0])
        .build();
    let first = new_log();
    let second = new_log();
    let mut engine = BacktestEngine::new(&port, &BacktestConfig::new(d(19), d(19))).unwrap();
    engine
        .add_strategy(Box::new(Recorder::new("a", vec![Interest::symbol("ag1706")], first.clone())))
        .unwrap();
    engine
        .add_strategy(Box::new(Recorder::new("b", vec![Interest::symbol("ag1706")], second.clone())))
        .unwrap();
    engine.run().unwrap();

    assert_eq!(engine.replay().interest_count(), 1);
    assert_eq!(first.borrow().len(), 4);
    assert_eq!(*first.borrow(), *second.borrow());
}

#[test]
fn product_interest_rolls_over_and_skips_non_trading_days() {
    let port = MarketFixture::new()
        .with_product("rb", 19, &["rb1705", "rb1710"], Some("rb1705"), Some("rb1710"))
        .with_product("rb", 20, &["rb1705", "rb1710"], Some("rb1710"), Some("rb1705"))
        .with_product("rb", 23, &["rb1705", "rb1710"], Some("rb1710"), Some("rb1705"))
        .with_minutes("rb1705", 19, &[3000.0, 3001.0])
        .with_minutes("rb1710", 19, &[3100.0])
        .with_minutes("rb1705", 20, &[3002.0])
        .with_minutes("rb1710", 20, &[3101.0])
        .with_minutes("rb1710", 23, &[3102.0])
        .build();
    let log = new_log();
    let mut engine = BacktestEngine::new(&port, &BacktestConfig::new(d(19), d(23))).unwrap();
    engine
        .add_strategy(Box::new(Recorder::new(
            "roll",
            vec![Interest::product("rb", RolloverRule::Dominant)],
            log.clone(),
        )))
        .unwrap();
    let summary = engine.run().unwrap();

    assert_eq!(
        *log.borrow(),
        vec![
            "market rb1705 19 09:00 rows=1",
            "market rb1705 19 09:01 rows=2",
            "day end 2017-01-19",
            "market rb1710 20 09:00 rows=1",
            "day end 2017-01-20",
            "market rb1710 23 09:00 rows=1",
            "day end 2017-01-23",
        ]
    );
    assert_eq!(summary.trading_days, 3);
    assert_eq!(summary.market_events, 4);
    assert_eq!(engine.replay().days_replayed(), 3);
}

#[test]
fn minute_skip_thins_strategy_callbacks() {
    let prices: Vec<f64> = (0..12).map(|i| 4000.0 + f64::from(i)).collect();
    let port = MarketFixture::new()
        .with_product("ag", 19, &["ag1706"], Some("ag1706"), None)
        .with_minutes("ag1706", 19, &prices)
        .build();
    let log = new_log();
    let mut engine = BacktestEngine::new(&port, &BacktestConfig::new(d(19), d(19))).unwrap();
    engine
        .add_strategy(Box::new(Recorder::new(
            "skip",
            vec![Interest::symbol("ag1706").with_minute_skip(5)],
            log.clone(),
        )))
        .unwrap();
    let summary = engine.run().unwrap();

    assert_eq!(
        *log.borrow(),
        vec![
            "market ag1706 19 09:00 rows=1",
            "market ag1706 19 09:05 rows=6",
            "market ag1706 19 09:10 rows=11",
            "day end 2017-01-19",
        ]
    );
    assert_eq!(summary.market_events, 3);
}

#[test]
fn data_source_failure_aborts_the_run() {
    let port = MarketFixture::new()
        .with_product("ag", 19, &["ag1706"], Some("ag1706"), None)
        .failing_on("ag1706")
        .build();
    let mut engine = BacktestEngine::new(&port, &BacktestConfig::new(d(19), d(19))).unwrap();
    engine
        .add_strategy(Box::new(Recorder::new("rec", vec![Interest::symbol("ag1706")], new_log())))
        .unwrap();
    let err = engine.run().unwrap_err();
    assert!(matches!(err, ContangoError::Database { .. }));
}

// ===========================================================================
// Portfolio
// ===========================================================================

fn signal(signal_type: SignalType, quantity: u64) -> SignalEvent {
    SignalEvent {
        strategy: "s".into(),
        symbol: "S".into(),
        signal_type,
        quantity,
        strength: 1.0,
        trading_day: d(19),
        datetime: at(19, 9, 0),
    }
}

#[test]
fn long_fill_then_short_closes() {
    let mut portfolio = Portfolio::new(CLOSE_PRICE).unwrap();
    portfolio.register_strategy("s").unwrap();
    let record = tick("S", 19, 9, 0, 250.0);

    let order = portfolio
        .deal_signal(&signal(SignalType::Long, 5), Some(&record))
        .unwrap();
    assert_eq!((order.action, order.direction), (ActionType::Open, DirectionType::Buy));
    assert_eq!(order.price, 250.0);
    assert_eq!(
        portfolio.position("s", "S").unwrap().unfilled(ActionType::Open, DirectionType::Buy),
        1
    );

    portfolio
        .deal_fill(&FillEvent {
            index: order.index,
            symbol: "S".into(),
            action: order.action,
            direction: order.direction,
            quantity: 5,
            price: 250.0,
            commission: 0.0,
            trading_day: d(19),
            datetime: at(19, 9, 0),
        })
        .unwrap();
    let pos = portfolio.position("s", "S").unwrap();
    assert_eq!(pos.long, 5);
    assert_eq!(pos.unfilled(ActionType::Open, DirectionType::Buy), 0);

    let close = portfolio
        .deal_signal(&signal(SignalType::Short, 5), Some(&record))
        .unwrap();
    assert_eq!((close.action, close.direction), (ActionType::Close, DirectionType::Sell));
    assert!(close.index > order.index);

    let ledger = portfolio.ledger("s");
    assert_eq!(ledger.len(), 3);
    assert!(matches!(ledger[1], LedgerEntry::Fill(_)));
}

#[test]
fn signal_without_market_data_is_fatal() {
    let mut portfolio = Portfolio::new(CLOSE_PRICE).unwrap();
    portfolio.register_strategy("s").unwrap();
    let err = portfolio
        .deal_signal(&signal(SignalType::Long, 1), None)
        .unwrap_err();
    assert!(err.is_protocol_violation());
}

// ===========================================================================
// Contract resolution
// ===========================================================================

fn x_port() -> contango::adapters::memory_adapter::InMemoryDataPort {
    MarketFixture::new()
        .with_product("x", 19, &["x01", "x02", "x03"], Some("x02"), Some("x03"))
        .with_instrument("x01", "x", 19, 100.0, 10.0)
        .with_instrument("x02", "x", 19, 500.0, 30.0)
        .with_instrument("x03", "x", 19, 300.0, 20.0)
        .build()
}

#[test]
fn resolver_open_interest_and_neighbour_rules() {
    let port = x_port();
    let resolver = ContractResolver::new(&port);
    let resolve = |rule| resolver.resolve("x", d(19), rule).unwrap();

    assert_eq!(resolve(RolloverRule::MostOpenInterest).as_deref(), Some("x02"));
    assert_eq!(resolve(RolloverRule::SecondOpenInterest).as_deref(), Some("x03"));
    assert_eq!(resolve(RolloverRule::BeforeDominant).as_deref(), Some("x01"));
    assert_eq!(resolve(RolloverRule::AfterDominant).as_deref(), Some("x03"));
    assert_eq!(resolve(RolloverRule::MostVolume).as_deref(), Some("x02"));
    assert_eq!(resolve(RolloverRule::SecondVolume).as_deref(), Some("x03"));
    assert_eq!(resolve(RolloverRule::Dominant).as_deref(), Some("x02"));
    assert_eq!(resolve(RolloverRule::SubDominant).as_deref(), Some("x03"));
}

#[test]
fn resolver_is_none_on_non_trading_day() {
    let port = x_port();
    let resolver = ContractResolver::new(&port);
    for rule in RolloverRule::ALL {
        assert_eq!(resolver.resolve("x", d(20), rule).unwrap(), None);
    }
}

#[test]
fn cached_source_resolves_identically() {
    let port = x_port();
    let cached = CachedDataPort::new(x_port());
    let direct = ContractResolver::new(&port);
    let memo = ContractResolver::new(&cached);
    for rule in RolloverRule::ALL {
        assert_eq!(
            direct.resolve("x", d(19), rule).unwrap(),
            memo.resolve("x", d(19), rule).unwrap()
        );
    }
    let misses = cached.misses();
    for rule in RolloverRule::ALL {
        memo.resolve("x", d(19), rule).unwrap();
    }
    assert_eq!(cached.misses(), misses);
    assert!(cached.is_trading_day(d(19)).unwrap());
}

// ===========================================================================
// Moving-average crossover end to end
// ===========================================================================

type OrderRow = (ActionType, DirectionType, u64, String);

fn crossover(quantity: u64) -> (RunSummary, Position, Vec<OrderRow>) {
    let prices = [10.0, 10.0, 10.0, 11.0, 12.0, 13.0, 12.0, 11.0, 10.0, 9.0];
    let port = MarketFixture::new()
        .with_product("rb", 19, &["rb1705"], Some("rb1705"), None)
        .with_minutes("rb1705", 19, &prices)
        .build();
    let config = MaCrossConfig {
        name: "cross".into(),
        interest: Interest::product("rb", RolloverRule::Dominant),
        price_field: CLOSE_PRICE.into(),
        fast: 2,
        slow: 3,
        quantity,
    };

    let mut engine = BacktestEngine::new(&port, &BacktestConfig::new(d(19), d(19))).unwrap();
    engine
        .add_strategy(Box::new(MaCrossStrategy::new(config)))
        .unwrap();
    let summary = engine.run().unwrap();
    let pos = engine.portfolio().position("cross", "rb1705").unwrap().clone();
    let orders = engine
        .ledger("cross")
        .iter()
        .filter_map(|e| match e {
            LedgerEntry::Order(o) => Some((
                o.action,
                o.direction,
                o.quantity,
                o.datetime.format("%H:%M").to_string(),
            )),
            LedgerEntry::Fill(_) => None,
        })
        .collect();
    (summary, pos, orders)
}

#[test]
fn ma_cross_goes_long_then_reverses() {
    let (summary, pos, orders) = crossover(1);

    assert_eq!(summary.market_events, 10);
    assert_eq!(summary.signals, 3);
    assert_eq!(summary.orders, 3);
    assert_eq!(summary.fills, 3);

    assert_eq!(pos.long, 0);
    assert_eq!(pos.short, 1);
    assert!(!pos.has_unfilled());

    // the opening short waits one event for the close to settle
    assert_eq!(
        orders,
        vec![
            (ActionType::Open, DirectionType::Buy, 1, "09:03".to_string()),
            (ActionType::Close, DirectionType::Sell, 1, "09:07".to_string()),
            (ActionType::Open, DirectionType::Sell, 1, "09:08".to_string()),
        ]
    );
}

#[test]
fn ma_cross_reverses_multi_lot_position() {
    for quantity in [2, 3] {
        let (summary, pos, orders) = crossover(quantity);
        assert_eq!(summary.fills, 3);
        assert_eq!(pos.long, 0);
        assert_eq!(pos.short, quantity);
        assert!(!pos.has_unfilled());
        let legs: Vec<(ActionType, DirectionType, u64)> =
            orders.into_iter().map(|(a, d, q, _)| (a, d, q)).collect();
        assert_eq!(
            legs,
            vec![
                (ActionType::Open, DirectionType::Buy, quantity),
                (ActionType::Close, DirectionType::Sell, quantity),
                (ActionType::Open, DirectionType::Sell, quantity),
            ]
        );
    }
}
