//! Historical data access port trait.

use crate::domain::error::BacktestError;
use crate::domain::observation::Observation;
use chrono::NaiveDateTime;

/// A chronologically ordered, range-filterable set of observations.
///
/// Implementations load and normalize their dataset once at construction;
/// every method here is pure. Sources are shared read-only across runs.
pub trait DataPort: Sync {
    /// Distinct symbols present in the dataset, sorted.
    fn tickers(&self) -> Vec<String>;

    /// Observations with `start <= timestamp <= end`, ascending by timestamp.
    /// Missing bounds default to the first/last timestamp in the dataset.
    fn range(
        &self,
        start: Option<NaiveDateTime>,
        end: Option<NaiveDateTime>,
    ) -> Result<Vec<Observation>, BacktestError>;

    /// First timestamp, last timestamp and observation count.
    fn span(&self) -> Option<(NaiveDateTime, NaiveDateTime, usize)>;
}

/// Rejects explicitly inverted windows before any data is touched.
pub fn check_range(
    start: Option<NaiveDateTime>,
    end: Option<NaiveDateTime>,
) -> Result<(), BacktestError> {
    match (start, end) {
        (Some(start), Some(end)) if start > end => {
            Err(BacktestError::InvalidDateRange { start, end })
        }
        _ => Ok(()),
    }
}
