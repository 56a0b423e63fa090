//! Run report port.

use crate::domain::error::ContangoError;
use crate::domain::portfolio::LedgerEntry;

/// Port for persisting order/fill ledgers after a run.
pub trait ReportPort {
    /// Write every `(strategy, ledger)` pair to one output.
    fn write_ledgers(
        &self,
        ledgers: &[(&str, &[LedgerEntry])],
        output_path: &str,
    ) -> Result<(), ContangoError>;

    /// Default implementation: a single-strategy call into `write_ledgers`.
    fn write_ledger(
        &self,
        strategy: &str,
        ledger: &[LedgerEntry],
        output_path: &str,
    ) -> Result<(), ContangoError> {
        self.write_ledgers(&[(strategy, ledger)], output_path)
    }
}
