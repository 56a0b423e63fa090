//! CSV ledger writer.
//!
//! One row per order or fill, strategies in the order given, entries in
//! ledger order.

use crate::domain::error::ContangoError;
use crate::domain::portfolio::LedgerEntry;
use crate::ports::report_port::ReportPort;
use std::io::Write;

const HEADER: [&str; 12] = [
    "strategy",
    "kind",
    "index",
    "symbol",
    "action",
    "direction",
    "quantity",
    "price",
    "commission",
    "trading_day",
    "datetime",
    "order_type",
];

pub struct CsvLedgerWriter;

fn csv_err(e: csv::Error) -> ContangoError {
    ContangoError::Io(std::io::Error::other(e))
}

impl CsvLedgerWriter {
    pub fn new() -> Self {
        CsvLedgerWriter
    }

    /// Write ledgers to any sink, e.g. stdout.
    pub fn write_to<W: Write>(
        &self,
        sink: W,
        ledgers: &[(&str, &[LedgerEntry])],
    ) -> Result<(), ContangoError> {
        let mut wtr = csv::Writer::from_writer(sink);
        wtr.write_record(HEADER).map_err(csv_err)?;
        for (strategy, ledger) in ledgers {
            for entry in ledger.iter() {
                wtr.write_record(row(strategy, entry)).map_err(csv_err)?;
            }
        }
        wtr.flush()?;
        Ok(())
    }
}

impl Default for CsvLedgerWriter {
    fn default() -> Self {
        Self::new()
    }
}

fn row(strategy: &str, entry: &LedgerEntry) -> Vec<String> {
    match entry {
        LedgerEntry::Order(o) => vec![
            strategy.to_string(),
            "ORDER".into(),
            o.index.to_string(),
            o.symbol.clone(),
            o.action.to_string(),
            o.direction.to_string(),
            o.quantity.to_string(),
            o.price.to_string(),
            String::new(),
            o.trading_day.to_string(),
            o.datetime.to_string(),
            format!("{:?}", o.order_type).to_uppercase(),
        ],
        LedgerEntry::Fill(f) => vec![
            strategy.to_string(),
            "FILL".into(),
            f.index.to_string(),
            f.symbol.clone(),
            f.action.to_string(),
            f.direction.to_string(),
            f.quantity.to_string(),
            f.price.to_string(),
            f.commission.to_string(),
            f.trading_day.to_string(),
            f.datetime.to_string(),
            String::new(),
        ],
    }
}

impl ReportPort for CsvLedgerWriter {
    fn write_ledgers(
        &self,
        ledgers: &[(&str, &[LedgerEntry])],
        output_path: &str,
    ) -> Result<(), ContangoError> {
        let file = std::fs::File::create(output_path)?;
        self.write_to(file, ledgers)
    }
}
