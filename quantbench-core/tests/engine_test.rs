//! Integration tests for the backtest engine: reference scenarios, error
//! paths, cancellation and the session wrapper.

use chrono::NaiveDate;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use quantbench_core::data::{synthetic, DataFormatError, InMemoryProvider};
use quantbench_core::domain::{Bar, Side, Signal, Timeframe};
use quantbench_core::engine::{BacktestEngine, BacktestError, BacktestSession, EngineConfig};
use quantbench_core::metrics::Metrics;
use quantbench_core::strategy::{Analysis, Scripted, SmaCrossover, Strategy, StrategyParams};

const SYMBOL: &str = "TEST";

fn start() -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, 1, 1).unwrap()
}

fn far_end() -> NaiveDate {
    NaiveDate::from_ymd_opt(2030, 12, 31).unwrap()
}

/// 100 through bar 10, linear up to 110 at bar 20, flat at 110 to bar 29.
fn ramp_closes() -> Vec<f64> {
    (0..30)
        .map(|i| match i {
            0..=10 => 100.0,
            11..=20 => 100.0 + (i - 10) as f64,
            _ => 110.0,
        })
        .collect()
}

fn engine_with(closes: &[f64], config: EngineConfig) -> BacktestEngine<InMemoryProvider> {
    let bars = synthetic::from_closes(start(), Timeframe::DAILY, closes);
    let provider = InMemoryProvider::new().with_series(SYMBOL, Timeframe::DAILY, bars);
    BacktestEngine::new(provider, config)
}

fn round_trip_strategy() -> Scripted {
    Scripted::new([(10, Side::Buy), (20, Side::Sell)])
}

// ── Reference scenarios ──────────────────────────────────────────────

#[test]
fn flat_market_produces_no_trades() {
    let engine = engine_with(&[100.0; 50], EngineConfig::default());
    let strategy = SmaCrossover::new(5, 20).unwrap();
    let result = engine
        .run_backtest(&strategy, SYMBOL, start(), far_end(), Timeframe::DAILY)
        .unwrap();

    assert!(result.trades.is_empty());
    assert_eq!(result.equity_curve.len(), 50);
    assert!(result.equity_curve.iter().all(|&e| e == 10_000.0));
    assert_eq!(result.final_capital, 10_000.0);
    assert_eq!(result.total_return, 0.0);
    assert_eq!(result.metrics, Metrics::zero());
}

#[test]
fn single_profitable_round_trip() {
    let engine = engine_with(&ramp_closes(), EngineConfig::new(10_000.0, 0.0));
    let result = engine
        .run_backtest(&round_trip_strategy(), SYMBOL, start(), far_end(), Timeframe::DAILY)
        .unwrap();

    assert_eq!(result.trades.len(), 2);
    let (buy, sell) = (&result.trades[0], &result.trades[1]);
    assert_eq!((buy.side, buy.bar_index, buy.price), (Side::Buy, 10, 100.0));
    assert_eq!((sell.side, sell.bar_index, sell.price), (Side::Sell, 20, 110.0));
    assert!((buy.size - 100.0).abs() < 1e-9);
    assert!((sell.size - 100.0).abs() < 1e-9);

    assert!((result.final_capital - 11_000.0).abs() < 1e-9);
    assert!((result.total_return - 0.10).abs() < 1e-12);
    assert_eq!(result.metrics.win_rate, 1.0);
    assert_eq!(result.metrics.profit_factor, f64::INFINITY);
    assert!((result.metrics.avg_trade - 1_000.0).abs() < 1e-9);
    assert_eq!(result.closing_trades(), 1);
}

#[test]
fn commission_applied_at_entry_and_exit() {
    let engine = engine_with(&ramp_closes(), EngineConfig::new(10_000.0, 0.01));
    let result = engine
        .run_backtest(&round_trip_strategy(), SYMBOL, start(), far_end(), Timeframe::DAILY)
        .unwrap();

    // Entry: 10,000 - 100 × 100 × 1.01 = -100. Exit: -100 + 100 × 110 × 0.99.
    assert!((result.trades[0].capital + 100.0).abs() < 1e-9);
    assert!((result.final_capital - 10_790.0).abs() < 1e-9);
    assert!((result.total_fees() - 210.0).abs() < 1e-9);
}

#[test]
fn open_position_is_marked_to_market() {
    let engine = engine_with(&ramp_closes(), EngineConfig::new(10_000.0, 0.0));
    let strategy = Scripted::new([(10, Side::Buy)]);
    let result = engine
        .run_backtest(&strategy, SYMBOL, start(), far_end(), Timeframe::DAILY)
        .unwrap();

    assert_eq!(result.trades.len(), 1);
    assert!((result.final_capital - 11_000.0).abs() < 1e-9);
    assert!(result.round_trips().is_empty());
    assert_eq!(result.metrics, Metrics::zero(), "one trade is below the metrics threshold");
}

// ── Invariants ───────────────────────────────────────────────────────

#[test]
fn equity_identity_holds_every_bar() {
    let closes = ramp_closes();
    let engine = engine_with(&closes, EngineConfig::new(10_000.0, 0.002));
    let result = engine
        .run_backtest(&round_trip_strategy(), SYMBOL, start(), far_end(), Timeframe::DAILY)
        .unwrap();

    let buy = result.trades[0];
    let sell = result.trades[1];
    for (i, &eq) in result.equity_curve.iter().enumerate() {
        let expected = if i < buy.bar_index {
            10_000.0
        } else if i < sell.bar_index {
            buy.capital + buy.size * closes[i]
        } else {
            sell.capital
        };
        assert!((eq - expected).abs() < 1e-9, "bar {i}: {eq} != {expected}");
    }
    let implied = result.initial_capital * (1.0 + result.total_return);
    assert!((implied - result.final_capital).abs() < 1e-9);
    assert_eq!(result.returns.len(), result.equity_curve.len() - 1);
}

#[test]
fn start_and_end_span_the_processed_bars() {
    let engine = engine_with(&ramp_closes(), EngineConfig::default());
    let from = NaiveDate::from_ymd_opt(2024, 1, 5).unwrap();
    let to = NaiveDate::from_ymd_opt(2024, 1, 15).unwrap();
    let result = engine
        .run_backtest(&round_trip_strategy(), SYMBOL, from, to, Timeframe::DAILY)
        .unwrap();
    assert_eq!(result.equity_curve.len(), 11);
    assert_eq!(result.start.date(), from);
    assert_eq!(result.end.date(), to);
}

// ── Errors ───────────────────────────────────────────────────────────

#[test]
fn empty_window_is_data_unavailable() {
    let engine = engine_with(&ramp_closes(), EngineConfig::default());
    let before = NaiveDate::from_ymd_opt(2020, 1, 1).unwrap();
    let err = engine
        .run_backtest(&round_trip_strategy(), SYMBOL, before, before, Timeframe::DAILY)
        .unwrap_err();
    assert!(matches!(err, BacktestError::DataUnavailable { .. }));
}

#[test]
fn all_nan_volume_is_missing_columns() {
    let mut bars = synthetic::from_closes(start(), Timeframe::DAILY, &ramp_closes());
    for bar in &mut bars {
        bar.volume = f64::NAN;
    }
    let provider = InMemoryProvider::new().with_series(SYMBOL, Timeframe::DAILY, bars);
    let engine = BacktestEngine::new(provider, EngineConfig::default());
    let err = engine
        .run_backtest(&round_trip_strategy(), SYMBOL, start(), far_end(), Timeframe::DAILY)
        .unwrap_err();
    match err {
        BacktestError::DataFormat(DataFormatError::MissingColumns { missing }) => {
            assert_eq!(missing, vec!["volume".to_string()]);
        }
        other => panic!("expected MissingColumns, got {other:?}"),
    }
}

#[test]
fn infinite_close_is_a_data_format_error() {
    let mut bars = synthetic::from_closes(start(), Timeframe::DAILY, &ramp_closes());
    bars[3].close = f64::INFINITY;
    bars[3].high = f64::INFINITY;
    let provider = InMemoryProvider::new().with_series(SYMBOL, Timeframe::DAILY, bars);
    let engine = BacktestEngine::new(provider, EngineConfig::default());
    let err = engine
        .run_backtest(&round_trip_strategy(), SYMBOL, start(), far_end(), Timeframe::DAILY)
        .unwrap_err();
    assert!(matches!(
        err,
        BacktestError::DataFormat(DataFormatError::InvalidBar { index: 3, .. })
    ));
}

/// Delegates to a scripted strategy and counts window validations.
struct CountingValidation {
    inner: Scripted,
    calls: AtomicUsize,
}

impl Strategy for CountingValidation {
    fn name(&self) -> &str {
        self.inner.name()
    }
    fn params(&self) -> &StrategyParams {
        self.inner.params()
    }
    fn recency_window(&self) -> usize {
        self.inner.recency_window()
    }
    fn validate(&self, bars: &[Bar]) -> Result<(), DataFormatError> {
        self.calls.fetch_add(1, Ordering::Relaxed);
        self.inner.validate(bars)
    }
    fn analyze_window(&self, bars: &[Bar]) -> Analysis {
        self.inner.analyze_window(bars)
    }
    fn signals_in_window(&self, bars: &[Bar]) -> Vec<Signal> {
        self.inner.signals_in_window(bars)
    }
}

#[test]
fn bar_loop_does_not_revalidate_the_window() {
    let engine = engine_with(&ramp_closes(), EngineConfig::new(10_000.0, 0.0));
    let counting = CountingValidation {
        inner: round_trip_strategy(),
        calls: AtomicUsize::new(0),
    };
    let result = engine
        .run_backtest(&counting, SYMBOL, start(), far_end(), Timeframe::DAILY)
        .unwrap();
    let reference = engine
        .run_backtest(&round_trip_strategy(), SYMBOL, start(), far_end(), Timeframe::DAILY)
        .unwrap();

    assert_eq!(counting.calls.load(Ordering::Relaxed), 0);
    assert_eq!(result.trades, reference.trades);
    assert_eq!(result.equity_curve, reference.equity_curve);
}

#[test]
fn unknown_symbol_is_data_unavailable() {
    let engine = engine_with(&ramp_closes(), EngineConfig::default());
    let err = engine
        .run_backtest(&round_trip_strategy(), "NOPE", start(), far_end(), Timeframe::DAILY)
        .unwrap_err();
    assert!(matches!(err, BacktestError::DataUnavailable { .. }));
}

#[test]
fn invalid_config_is_rejected() {
    let engine = engine_with(&ramp_closes(), EngineConfig::new(-5.0, 0.0));
    let err = engine
        .run_backtest(&round_trip_strategy(), SYMBOL, start(), far_end(), Timeframe::DAILY)
        .unwrap_err();
    assert!(matches!(err, BacktestError::InvalidConfig(_)));
}

#[test]
fn raised_cancel_flag_stops_before_first_bar() {
    let engine = engine_with(&ramp_closes(), EngineConfig::default());
    let data = engine
        .load(SYMBOL, start(), far_end(), Timeframe::DAILY)
        .unwrap();
    let cancel = AtomicBool::new(true);
    let err = engine
        .run_on_data(&round_trip_strategy(), &data, Some(&cancel))
        .unwrap_err();
    assert!(matches!(err, BacktestError::Cancelled { bar_index: 0 }));
}

// ── Session and summary ──────────────────────────────────────────────

#[test]
fn session_keeps_latest_result() {
    let engine = engine_with(&ramp_closes(), EngineConfig::new(10_000.0, 0.0));
    let mut session = BacktestSession::new(&engine);
    assert!(session.last().is_none());
    assert!(session.summary().is_none());

    session
        .run(&round_trip_strategy(), SYMBOL, start(), far_end(), Timeframe::DAILY)
        .unwrap();
    let hold_only = Scripted::new([]);
    session
        .run(&hold_only, SYMBOL, start(), far_end(), Timeframe::DAILY)
        .unwrap();
    assert!(session.last().unwrap().trades.is_empty(), "second run overwrites the first");

    // A failed run keeps the previous result.
    assert!(session
        .run(&hold_only, "NOPE", start(), far_end(), Timeframe::DAILY)
        .is_err());
    let taken = session.take_last().unwrap();
    assert_eq!(taken.strategy, hold_only.name());
    assert!(session.last().is_none());
}

#[test]
fn summary_uses_reporting_labels() {
    let engine = engine_with(&ramp_closes(), EngineConfig::new(10_000.0, 0.01));
    let result = engine
        .run_backtest(&round_trip_strategy(), SYMBOL, start(), far_end(), Timeframe::DAILY)
        .unwrap();
    let summary = result.summary();

    assert_eq!(summary.len(), 14);
    assert_eq!(summary.get("Strategy"), Some("scripted"));
    assert_eq!(summary.get("Initial Capital"), Some("$10,000.00"));
    assert_eq!(summary.get("Final Capital"), Some("$10,790.00"));
    assert_eq!(summary.get("Total Return"), Some("7.90%"));
    assert_eq!(summary.get("Total Trades"), Some("1"));
    assert_eq!(summary.get("Period"), Some("2024-01-01 to 2024-01-30"));
    assert!(summary.to_string().contains("Profit Factor"));
}

#[test]
fn result_serializes_to_json() {
    let engine = engine_with(&ramp_closes(), EngineConfig::new(10_000.0, 0.0));
    let result = engine
        .run_backtest(&round_trip_strategy(), SYMBOL, start(), far_end(), Timeframe::DAILY)
        .unwrap();
    let json = result.to_json().unwrap();
    assert!(json.contains("\"symbol\": \"TEST\""));
    assert!(json.contains("\"timeframe\": \"1d\""));
}
