//! Configuration access port trait.

use crate::domain::error::ContangoError;
use chrono::NaiveDate;

pub trait ConfigPort {
    fn get_string(&self, section: &str, key: &str) -> Option<String>;
    fn get_int(&self, section: &str, key: &str, default: i64) -> i64;
    fn get_double(&self, section: &str, key: &str, default: f64) -> f64;
    fn get_bool(&self, section: &str, key: &str, default: bool) -> bool;

    /// Required `YYYY-MM-DD` date.
    fn get_date(&self, section: &str, key: &str) -> Result<NaiveDate, ContangoError> {
        let raw = self
            .get_string(section, key)
            .ok_or_else(|| ContangoError::ConfigMissing {
                section: section.into(),
                key: key.into(),
            })?;
        NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d").map_err(|_| {
            ContangoError::ConfigInvalid {
                section: section.into(),
                key: key.into(),
                reason: "invalid date format (expected YYYY-MM-DD)".into(),
            }
        })
    }
}

/// Integer setting converted to `T`. Values below `min` or outside the range
/// of `T` are invalid rather than clamped.
pub fn get_count<T: TryFrom<i64>>(
    config: &dyn ConfigPort,
    section: &str,
    key: &str,
    default: i64,
    min: i64,
) -> Result<T, ContangoError> {
    let raw = config.get_int(section, key, default);
    let invalid = |reason: String| ContangoError::ConfigInvalid {
        section: section.into(),
        key: key.into(),
        reason,
    };
    if raw < min {
        return Err(invalid(format!("{raw} is below the minimum of {min}")));
    }
    T::try_from(raw).map_err(|_| invalid(format!("{raw} is out of range")))
}
