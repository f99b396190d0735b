//! Market observation representation.

use chrono::{NaiveDate, NaiveDateTime};

const DATETIME_FORMATS: [&str; 2] = ["%Y-%m-%d %H:%M:%S", "%Y-%m-%d %H:%M"];

/// One row of market data. Only `symbol`, `timestamp` and `close` are
/// interpreted by the engine; the remaining fields are carried through.
#[derive(Debug, Clone, PartialEq)]
pub struct Observation {
    pub symbol: String,
    pub timestamp: NaiveDateTime,
    pub close: f64,
    pub open: Option<f64>,
    pub high: Option<f64>,
    pub low: Option<f64>,
    pub volume: Option<f64>,
}

impl Observation {
    pub fn new(symbol: impl Into<String>, timestamp: NaiveDateTime, close: f64) -> Self {
        Observation {
            symbol: symbol.into(),
            timestamp,
            close,
            open: None,
            high: None,
            low: None,
            volume: None,
        }
    }

    pub fn with_ohlv(mut self, open: f64, high: f64, low: f64, volume: f64) -> Self {
        self.open = Some(open);
        self.high = Some(high);
        self.low = Some(low);
        self.volume = Some(volume);
        self
    }
}

/// Accepts `YYYY-MM-DD HH:MM:SS`, `YYYY-MM-DD HH:MM` or a bare date (midnight).
pub fn parse_timestamp(value: &str) -> Option<NaiveDateTime> {
    let value = value.trim();
    DATETIME_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(value, fmt).ok())
        .or_else(|| {
            NaiveDate::parse_from_str(value, "%Y-%m-%d")
                .ok()
                .and_then(|d| d.and_hms_opt(0, 0, 0))
        })
}
