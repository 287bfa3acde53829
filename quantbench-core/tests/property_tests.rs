//! Property tests for engine invariants.
//!
//! Uses proptest to verify:
//! 1. Equity accounting — equity identity holds on every bar
//! 2. Degenerate metrics — 0 or 1 trades always give all-zero metrics
//! 3. No look-ahead — a truncated run is a bit-identical prefix of the full run
//! 4. Preprocessing is idempotent

use chrono::NaiveDate;
use proptest::prelude::*;

use quantbench_core::data::{preprocess, synthetic, InMemoryProvider, MarketData};
use quantbench_core::domain::{Side, Timeframe};
use quantbench_core::engine::{BacktestEngine, EngineConfig};
use quantbench_core::metrics::Metrics;
use quantbench_core::strategy::{Scripted, SmaCrossover};

fn start() -> NaiveDate {
    NaiveDate::from_ymd_opt(2021, 6, 1).unwrap()
}

fn table(closes: &[f64]) -> MarketData {
    MarketData::from_bars(
        "PROP",
        Timeframe::DAILY,
        synthetic::from_closes(start(), Timeframe::DAILY, closes),
    )
    .unwrap()
}

fn engine(commission: f64) -> BacktestEngine<InMemoryProvider> {
    BacktestEngine::new(InMemoryProvider::new(), EngineConfig::new(10_000.0, commission))
}

// ── Strategies (proptest) ────────────────────────────────────────────

fn arb_closes() -> impl Strategy<Value = Vec<f64>> {
    prop::collection::vec(5.0..500.0_f64, 2..80)
}

fn arb_script(max_bar: usize) -> impl Strategy<Value = Vec<(usize, Side)>> {
    prop::collection::vec(
        (0..max_bar, prop_oneof![Just(Side::Buy), Just(Side::Sell)]),
        0..20,
    )
}

// ── 1. Equity accounting ─────────────────────────────────────────────

proptest! {
    #[test]
    fn equity_identity_holds(
        closes in arb_closes(),
        script in arb_script(80),
        commission in 0.0..0.02_f64,
    ) {
        let data = table(&closes);
        let result = engine(commission)
            .run_on_data(&Scripted::new(script), &data, None)
            .unwrap();

        prop_assert_eq!(result.equity_curve.len(), closes.len());

        // Replay the ledger: equity = cash + size × close on every bar.
        let mut cash = 10_000.0;
        let mut size = 0.0;
        let mut trades = result.trades.iter().peekable();
        for (i, &close) in closes.iter().enumerate() {
            while let Some(t) = trades.next_if(|t| t.bar_index == i) {
                cash = t.capital;
                size = if t.side == Side::Buy { t.size } else { 0.0 };
            }
            let expected = cash + size * close;
            let tolerance = 1e-9 * expected.abs().max(1.0);
            prop_assert!((result.equity_curve[i] - expected).abs() <= tolerance);
        }

        let implied = result.initial_capital * (1.0 + result.total_return);
        let tolerance = 1e-9 * result.final_capital.abs().max(1.0);
        prop_assert!((implied - result.final_capital).abs() <= tolerance);
    }

    /// Sides strictly alternate, starting with a buy.
    #[test]
    fn trades_alternate(closes in arb_closes(), script in arb_script(80)) {
        let result = engine(0.0)
            .run_on_data(&Scripted::new(script), &table(&closes), None)
            .unwrap();
        for (k, t) in result.trades.iter().enumerate() {
            let expected = if k % 2 == 0 { Side::Buy } else { Side::Sell };
            prop_assert_eq!(t.side, expected);
        }
    }
}

// ── 2. Degenerate metrics ────────────────────────────────────────────

proptest! {
    #[test]
    fn fewer_than_two_trades_zero_metrics(
        closes in arb_closes(),
        entry in proptest::option::of((0..80usize, prop_oneof![Just(Side::Buy), Just(Side::Sell)])),
    ) {
        let result = engine(0.001)
            .run_on_data(&Scripted::new(entry), &table(&closes), None)
            .unwrap();
        prop_assert!(result.trades.len() <= 1);
        prop_assert_eq!(result.metrics, Metrics::zero());
    }
}

// ── 3. No look-ahead ─────────────────────────────────────────────────

proptest! {
    #![proptest_config(ProptestConfig::with_cases(24))]

    #[test]
    fn truncated_run_is_prefix(seed in any::<u64>(), cut in 25..120usize) {
        let bars = synthetic::random_walk(start(), Timeframe::DAILY, 120, seed);
        let data = MarketData::from_bars("WALK", Timeframe::DAILY, bars).unwrap();
        let strategy = SmaCrossover::new(4, 12).unwrap();
        let e = engine(0.001);

        let full = e.run_on_data(&strategy, &data, None).unwrap();
        let head = e.run_on_data(&strategy, &data.truncated(cut), None).unwrap();

        for i in 0..cut {
            prop_assert_eq!(head.equity_curve[i].to_bits(), full.equity_curve[i].to_bits());
        }
        let prefix: Vec<_> = full.trades.iter().filter(|t| t.bar_index < cut).copied().collect();
        prop_assert_eq!(head.trades, prefix);
    }
}

// ── 4. Preprocessing ─────────────────────────────────────────────────

proptest! {
    #[test]
    fn preprocess_is_idempotent(seed in any::<u64>(), n in 0..60usize, shuffle in any::<u64>()) {
        let mut bars = synthetic::random_walk(start(), Timeframe::DAILY, n, seed);
        // Deterministic rotation stands in for arbitrary input order.
        if !bars.is_empty() {
            let k = (shuffle % bars.len() as u64) as usize;
            bars.rotate_left(k);
        }
        let once = preprocess("P", Timeframe::DAILY, bars).unwrap();
        let twice = preprocess("P", Timeframe::DAILY, once.bars().to_vec()).unwrap();
        prop_assert_eq!(once.bars(), twice.bars());
        prop_assert!(once.bars().windows(2).all(|w| w[0].timestamp < w[1].timestamp));
    }
}
