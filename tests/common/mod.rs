#![allow(dead_code)]

use backtester::domain::error::BacktestError;
pub use backtester::domain::observation::Observation;
use backtester::domain::strategy::{Strategy, TradeContext};
use backtester::domain::trade::TradeRecord;
use backtester::ports::data_port::{check_range, DataPort};
use chrono::{NaiveDate, NaiveDateTime};
use std::io::Write;

/// Data port that returns rows exactly as given, without sorting or
/// de-duplication, so the engine's own ordering guard can be exercised.
pub struct MockDataPort {
    pub rows: Vec<Observation>,
}

impl MockDataPort {
    pub fn new(rows: Vec<Observation>) -> Self {
        Self { rows }
    }
}

impl DataPort for MockDataPort {
    fn tickers(&self) -> Vec<String> {
        let mut tickers: Vec<String> = self.rows.iter().map(|o| o.symbol.clone()).collect();
        tickers.sort();
        tickers.dedup();
        tickers
    }

    fn range(
        &self,
        start: Option<NaiveDateTime>,
        end: Option<NaiveDateTime>,
    ) -> Result<Vec<Observation>, BacktestError> {
        check_range(start, end)?;
        Ok(self
            .rows
            .iter()
            .filter(|o| start.is_none_or(|s| o.timestamp >= s))
            .filter(|o| end.is_none_or(|e| o.timestamp <= e))
            .cloned()
            .collect())
    }

    fn span(&self) -> Option<(NaiveDateTime, NaiveDateTime, usize)> {
        let min = self.rows.iter().map(|o| o.timestamp).min()?;
        let max = self.rows.iter().map(|o| o.timestamp).max()?;
        Some((min, max, self.rows.len()))
    }
}

pub fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

/// Midnight on 2024-01-`day`.
pub fn day(day: u32) -> NaiveDateTime {
    date(2024, 1, day).and_hms_opt(0, 0, 0).unwrap()
}

pub fn hour(day: u32, hour: u32) -> NaiveDateTime {
    date(2024, 1, day).and_hms_opt(hour, 0, 0).unwrap()
}

pub fn obs(symbol: &str, timestamp: NaiveDateTime, close: f64) -> Observation {
    Observation::new(symbol, timestamp, close)
}

/// Hourly closes for `symbol` starting at 2024-01-01 00:00.
pub fn hourly_series(symbol: &str, closes: &[f64]) -> Vec<Observation> {
    closes
        .iter()
        .enumerate()
        .map(|(i, &close)| {
            let ts = day(1) + chrono::Duration::hours(i as i64);
            obs(symbol, ts, close)
        })
        .collect()
}

/// A deterministic wavy price path, always positive.
pub fn wavy_closes(len: usize, base: f64) -> Vec<f64> {
    (0..len)
        .map(|i| base + base * 0.2 * ((i as f64) * 0.7).sin())
        .collect()
}

pub enum Order {
    Buy { ticker: String, amount: f64 },
    Sell { ticker: String, amount: f64 },
}

pub fn buy(ticker: &str, amount: f64) -> Order {
    Order::Buy {
        ticker: ticker.to_string(),
        amount,
    }
}

pub fn sell(ticker: &str, amount: f64) -> Order {
    Order::Sell {
        ticker: ticker.to_string(),
        amount,
    }
}

/// Places the orders scripted for each step, filling at the observed close.
/// Steps past the end of the script do nothing.
pub struct ScriptedStrategy {
    pub script: Vec<Vec<Order>>,
    pub step: usize,
    pub seen: Vec<Observation>,
}

impl ScriptedStrategy {
    pub fn new(script: Vec<Vec<Order>>) -> Self {
        Self {
            script,
            step: 0,
            seen: Vec::new(),
        }
    }
}

impl Strategy for ScriptedStrategy {
    fn name(&self) -> &str {
        "scripted"
    }

    fn on_observation(
        &mut self,
        observation: &Observation,
        ctx: &mut TradeContext<'_>,
    ) -> Result<Vec<TradeRecord>, BacktestError> {
        self.seen.push(observation.clone());
        let orders = self.script.get(self.step).map(Vec::as_slice).unwrap_or(&[]);
        self.step += 1;

        let mut trades = Vec::new();
        for order in orders {
            let trade = match order {
                Order::Buy { ticker, amount } => {
                    ctx.buy(ticker, observation.close, *amount, observation)?
                }
                Order::Sell { ticker, amount } => {
                    ctx.sell(ticker, observation.close, *amount, observation)?
                }
            };
            trades.push(trade);
        }
        Ok(trades)
    }
}

pub fn write_temp_file(content: &str) -> tempfile::NamedTempFile {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    file.write_all(content.as_bytes()).unwrap();
    file.flush().unwrap();
    file
}

/// CryptoDataDownload-style export with its banner line.
pub const CDD_CSV: &str = "\
https://www.CryptoDataDownload.com
unix,date,symbol,open,high,low,close,Volume BTC,Volume USDT
1704067200,2024-01-01 00:00:00,BTC/USDT,42000,42500,41800,42283.58,120.5,5094980
1704070800,2024-01-01 01:00:00,BTC/USDT,42283.58,42600,42200,42475.23,98.1,4166820
1704074400,2024-01-01 02:00:00,BTC/USDT,42475.23,42700,42400,42613.56,88.7,3779822
1704078000,2024-01-01 03:00:00,BTC/USDT,42613.56,42650,42300,42391.14,76.2,3230205
";
