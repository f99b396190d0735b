//! Property tests: ledger invariants under arbitrary order sequences and
//! chronological delivery from the in-memory source.

use backtester::adapters::memory_adapter::MemoryAdapter;
use backtester::domain::error::BacktestError;
use backtester::domain::ledger::{Ledger, BASE};
use backtester::domain::observation::Observation;
use backtester::ports::data_port::DataPort;
use chrono::{Duration, NaiveDate};
use proptest::prelude::*;

#[derive(Debug, Clone)]
enum Op {
    Buy { ticker: usize, amount: f64 },
    Sell { ticker: usize, amount: f64 },
    Mark { ticker: usize, price: f64 },
}

const TICKERS: [&str; 3] = ["AAA", "BBB", "CCC"];

fn op() -> impl Strategy<Value = Op> {
    prop_oneof![
        (0..3usize, 0.001..500.0f64).prop_map(|(ticker, amount)| Op::Buy { ticker, amount }),
        (0..3usize, 0.001..500.0f64).prop_map(|(ticker, amount)| Op::Sell { ticker, amount }),
        (0..3usize, 0.01..1000.0f64).prop_map(|(ticker, price)| Op::Mark { ticker, price }),
    ]
}

proptest! {
    #[test]
    fn balances_never_go_negative_and_failures_change_nothing(
        capital in 0.0..100_000.0f64,
        ops in prop::collection::vec(op(), 1..60),
    ) {
        let mut ledger = Ledger::with_capital(capital, TICKERS).unwrap();
        for op in ops {
            let before = ledger.clone();
            let result = match op {
                Op::Buy { ticker, amount } => {
                    let price = ledger.last_price(TICKERS[ticker]).max(1.0);
                    ledger.apply_buy(TICKERS[ticker], price, amount)
                }
                Op::Sell { ticker, amount } => {
                    let price = ledger.last_price(TICKERS[ticker]).max(1.0);
                    ledger.apply_sell(TICKERS[ticker], price, amount)
                }
                Op::Mark { ticker, price } => {
                    ledger.mark_price(TICKERS[ticker], price);
                    Ok(())
                }
            };
            if let Err(e) = result {
                prop_assert!(e.is_solvency_violation());
                prop_assert_eq!(&ledger, &before);
            }
            prop_assert!(ledger.balances().values().all(|&b| b >= 0.0));
        }
    }

    #[test]
    fn trading_at_the_marked_price_conserves_net_worth(
        capital in 1.0..100_000.0f64,
        price in 0.01..1000.0f64,
        fractions in prop::collection::vec((any::<bool>(), 0.0..1.0f64), 1..40),
    ) {
        let mut ledger = Ledger::with_capital(capital, ["X"]).unwrap();
        ledger.mark_price("X", price);
        for (is_buy, fraction) in fractions {
            let result = if is_buy {
                ledger.apply_buy("X", price, fraction * ledger.base_balance() / price)
            } else {
                ledger.apply_sell("X", price, fraction * ledger.balance("X"))
            };
            // Zero-size or rounding-overshoot orders may be refused; neither moves value.
            if let Err(e) = result {
                prop_assert!(
                    e.is_solvency_violation() || matches!(e, BacktestError::InvalidOrder { .. }),
                    "unexpected error: {:?}", e
                );
            }
            let worth = ledger.net_worth();
            prop_assert!((worth - capital).abs() <= capital * 1e-9);
        }
    }

    #[test]
    fn base_is_never_a_tradable_asset(amount in 0.001..100.0f64, price in 0.01..100.0f64) {
        let mut ledger = Ledger::with_capital(1_000.0, ["X"]).unwrap();
        prop_assert!(ledger.apply_buy(BASE, price, amount).is_err());
        prop_assert!(ledger.apply_sell(BASE, price, amount).is_err());
        prop_assert_eq!(ledger.base_balance(), 1_000.0);
    }

    #[test]
    fn memory_source_ranges_are_chronological_and_unique(
        rows in prop::collection::vec((0..3usize, 0..48i64, 0.01..100.0f64), 0..80),
        bounds in (0..48i64, 0..48i64),
    ) {
        let origin = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap().and_hms_opt(0, 0, 0).unwrap();
        let observations: Vec<Observation> = rows
            .iter()
            .map(|&(t, h, close)| Observation::new(TICKERS[t], origin + Duration::hours(h), close))
            .collect();
        let source = MemoryAdapter::new(observations).unwrap();

        let (lo, hi) = (bounds.0.min(bounds.1), bounds.0.max(bounds.1));
        let (start, end) = (origin + Duration::hours(lo), origin + Duration::hours(hi));
        let window = source.range(Some(start), Some(end)).unwrap();

        prop_assert!(window.windows(2).all(|w| w[0].timestamp <= w[1].timestamp));
        prop_assert!(window
            .windows(2)
            .all(|w| (w[0].timestamp, &w[0].symbol) != (w[1].timestamp, &w[1].symbol)));
        prop_assert!(window.iter().all(|o| o.timestamp >= start && o.timestamp <= end));

        let expected = source
            .observations()
            .iter()
            .filter(|o| o.timestamp >= start && o.timestamp <= end)
            .count();
        prop_assert_eq!(window.len(), expected);
    }
}
