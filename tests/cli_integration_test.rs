//! CLI integration tests.
//!
//! Tests cover:
//! - Config loading and validation through `run`
//! - Dry-run mode with real INI files on disk
//! - The backtest pipeline over the in-memory source
//! - resolve/info/backtest end to end over a seeded SQLite file

mod common;

use clap::Parser;
use common::*;
use contango::adapters::file_config_adapter::FileConfigAdapter;
use contango::cli::{self, Cli};
use contango::domain::contract::RolloverRule;
use contango::domain::error::ContangoError;
use std::io::Write;
use std::process::ExitCode;

fn write_temp_ini(content: &str) -> tempfile::NamedTempFile {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    file.write_all(content.as_bytes()).unwrap();
    file.flush().unwrap();
    file
}

// ExitCode doesn't implement PartialEq
fn code(c: ExitCode) -> String {
    format!("{c:?}")
}

fn exit(n: u8) -> String {
    code(ExitCode::from(n))
}

fn run(args: &[&str]) -> ExitCode {
    cli::run(Cli::parse_from(std::iter::once("contango").chain(args.iter().copied())))
}

const STRATEGY_INI: &str = r#"
[backtest]
begin_day = 2017-01-19
end_day = 2017-01-20
price_field = closeprice
commission_per_trade = 1.0

[strategy]
name = cross
product = rb
rule = dominant
fast = 2
slow = 3
quantity = 2
"#;

const PRICES: [f64; 10] = [10.0, 10.0, 10.0, 11.0, 12.0, 13.0, 12.0, 11.0, 10.0, 9.0];

mod config_commands {
    use super::*;

    #[test]
    fn validate_accepts_good_config() {
        let file = write_temp_ini(STRATEGY_INI);
        let path = file.path().to_str().unwrap();
        assert_eq!(code(run(&["validate", "--config", path])), code(ExitCode::SUCCESS));
    }

    #[test]
    fn validate_rejects_slow_not_above_fast() {
        let file = write_temp_ini(&STRATEGY_INI.replace("slow = 3", "slow = 2"));
        let path = file.path().to_str().unwrap();
        assert_eq!(code(run(&["validate", "--config", path])), exit(2));
    }

    #[test]
    fn validate_rejects_unknown_rule() {
        let file = write_temp_ini(&STRATEGY_INI.replace("rule = dominant", "rule = nearest"));
        let path = file.path().to_str().unwrap();
        assert_eq!(code(run(&["validate", "--config", path])), exit(2));
    }

    #[test]
    fn missing_config_file_is_config_error() {
        assert_eq!(
            code(run(&["validate", "--config", "/nonexistent/contango.ini"])),
            exit(2)
        );
    }

    #[test]
    fn dry_run_skips_data_source() {
        // no [sqlite] section: opening the source would fail
        let file = write_temp_ini(STRATEGY_INI);
        let path = file.path().to_str().unwrap();
        assert_eq!(
            code(run(&["backtest", "--config", path, "--dry-run"])),
            code(ExitCode::SUCCESS)
        );
    }

    #[test]
    fn backtest_without_sqlite_section_fails() {
        let file = write_temp_ini(STRATEGY_INI);
        let path = file.path().to_str().unwrap();
        assert_eq!(code(run(&["backtest", "--config", path])), exit(2));
    }

    #[test]
    fn parse_day_rejects_garbage() {
        assert!(cli::parse_day("2017-01-19").is_ok());
        assert!(cli::parse_day("19/01/2017").unwrap_err().is_config());
    }
}

mod pipeline {
    use super::*;

    fn port() -> contango::adapters::memory_adapter::InMemoryDataPort {
        MarketFixture::new()
            .with_product("rb", 19, &["rb1705", "rb1710"], Some("rb1705"), Some("rb1710"))
            .with_minutes("rb1705", 19, &PRICES)
            .build()
    }

    #[test]
    fn pipeline_runs_and_writes_ledger() {
        let config = FileConfigAdapter::from_string(STRATEGY_INI).unwrap();
        let dir = tempfile::tempdir().unwrap();
        let ledger = dir.path().join("ledger.csv");

        let summary = cli::run_backtest_pipeline(&port(), &config, Some(&ledger)).unwrap();
        assert_eq!(summary.trading_days, 1);
        assert_eq!(summary.orders, 3);
        assert_eq!(summary.fills, 3);

        let content = std::fs::read_to_string(&ledger).unwrap();
        let lines: Vec<&str> = content.lines().collect();
        assert_eq!(lines.len(), 7);
        assert!(lines[0].starts_with("strategy,kind,index"));
        assert!(lines[1].starts_with("cross,ORDER,0,rb1705,OPEN,BUY"));
        assert!(lines[2].starts_with("cross,FILL,0,rb1705,OPEN,BUY"));
    }

    #[test]
    fn pipeline_without_ledger_path() {
        let config = FileConfigAdapter::from_string(STRATEGY_INI).unwrap();
        let summary = cli::run_backtest_pipeline(&port(), &config, None).unwrap();
        assert_eq!(summary.market_events, 10);
    }

    #[test]
    fn pipeline_surfaces_source_errors() {
        let config = FileConfigAdapter::from_string(STRATEGY_INI).unwrap();
        let mut source = port();
        source.fail_on("rb", "disk gone");
        let err = cli::run_backtest_pipeline(&source, &config, None).unwrap_err();
        assert!(matches!(err, ContangoError::Database { .. }));
    }

    #[test]
    fn resolve_contracts_lists_every_rule() {
        let source = port();
        let all = cli::resolve_contracts(&source, "rb", d(19), None).unwrap();
        assert_eq!(all.len(), RolloverRule::ALL.len());
        assert_eq!(all[0], (RolloverRule::Dominant, Some("rb1705".to_string())));

        let one = cli::resolve_contracts(&source, "rb", d(19), Some("sub_dominant")).unwrap();
        assert_eq!(one, vec![(RolloverRule::SubDominant, Some("rb1710".to_string()))]);

        assert!(cli::resolve_contracts(&source, "rb", d(19), Some("bogus")).is_err());
    }

    #[test]
    fn describe_day_reports_products() {
        let source = port();
        let lines = cli::describe_day(&source, d(19), None).unwrap();
        assert_eq!(lines[0], "2017-01-19: 1 products");
        assert_eq!(lines[1], "rb: dominant rb1705 sub-dominant rb1710");

        let upper = cli::describe_day(&source, d(19), Some("RB")).unwrap();
        assert_eq!(upper[0], "rb: dominant rb1705 sub-dominant rb1710");
        assert_eq!(upper[1], "  rb1705: no metrics");

        let off = cli::describe_day(&source, d(21), None).unwrap();
        assert_eq!(off, vec!["2017-01-21: not a trading day".to_string()]);
    }
}

#[cfg(feature = "sqlite")]
mod sqlite_end_to_end {
    use super::*;
    use contango::adapters::sqlite_adapter::SqliteAdapter;
    use contango::domain::instrument::ProductInfo;

    fn seeded_ini(dir: &tempfile::TempDir) -> String {
        let db = dir.path().join("market.db");
        let ini = format!(
            "[sqlite]\npath = {}\npool_size = 2\n{STRATEGY_INI}",
            db.display()
        );
        let seed = SqliteAdapter::from_config(&FileConfigAdapter::from_string(&ini).unwrap()).unwrap();
        seed.initialize_schema().unwrap();
        seed.insert_products(&[ProductInfo {
            product: "rb".into(),
            trading_day: d(19),
            instruments: vec!["rb1705".into(), "rb1710".into()],
            dominant: Some("rb1705".into()),
            sub_dominant: Some("rb1710".into()),
        }])
        .unwrap();
        let records: Vec<_> = PRICES
            .iter()
            .enumerate()
            .map(|(i, p)| tick("rb1705", 19, 9, i as u32, *p))
            .collect();
        seed.insert_records(&records).unwrap();
        ini
    }

    #[test]
    fn backtest_command_writes_ledger() {
        let dir = tempfile::tempdir().unwrap();
        let file = write_temp_ini(&seeded_ini(&dir));
        let ledger = dir.path().join("out.csv");

        let result = run(&[
            "backtest",
            "--config",
            file.path().to_str().unwrap(),
            "--ledger",
            ledger.to_str().unwrap(),
        ]);
        assert_eq!(code(result), code(ExitCode::SUCCESS));
        assert_eq!(std::fs::read_to_string(&ledger).unwrap().lines().count(), 7);
    }

    #[test]
    fn uncached_source_gives_same_run() {
        let dir = tempfile::tempdir().unwrap();
        let ini = seeded_ini(&dir).replace("[backtest]\n", "[backtest]\ncache = off\n");
        let config = FileConfigAdapter::from_string(&ini).unwrap();
        let source = cli::open_data_port(&config).unwrap();
        let summary = cli::run_backtest_pipeline(source.as_ref(), &config, None).unwrap();
        assert_eq!(summary.fills, 3);
    }

    #[test]
    fn resolve_and_info_commands() {
        let dir = tempfile::tempdir().unwrap();
        let file = write_temp_ini(&seeded_ini(&dir));
        let path = file.path().to_str().unwrap();

        let resolve = run(&["resolve", "--config", path, "--product", "rb", "--day", "2017-01-19"]);
        assert_eq!(code(resolve), code(ExitCode::SUCCESS));

        let bad_rule = run(&[
            "resolve", "--config", path, "--product", "rb", "--day", "2017-01-19", "--rule", "nope",
        ]);
        assert_eq!(code(bad_rule), exit(2));

        let bad_day = run(&["info", "--config", path, "--day", "yesterday"]);
        assert_eq!(code(bad_day), exit(2));

        let info = run(&["info", "--config", path, "--day", "2017-01-19", "--product", "rb"]);
        assert_eq!(code(info), code(ExitCode::SUCCESS));
    }
}
