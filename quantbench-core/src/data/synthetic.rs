//! Deterministic synthetic bar series for tests, benchmarks and demos.

use chrono::{NaiveDate, NaiveDateTime};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::domain::{Bar, Timeframe};

const DEFAULT_VOLUME: f64 = 1_000_000.0;

fn origin(start: NaiveDate) -> NaiveDateTime {
    start.and_time(chrono::NaiveTime::MIN)
}

fn stamp(start: NaiveDate, timeframe: Timeframe, i: usize) -> NaiveDateTime {
    origin(start) + timeframe.duration() * i as i32
}

/// Seeded random walk starting at 100 with per-bar returns in ±3%.
///
/// Consecutive bars are one `timeframe` apart with no calendar gaps.
pub fn random_walk(start: NaiveDate, timeframe: Timeframe, n: usize, seed: u64) -> Vec<Bar> {
    let mut rng = StdRng::seed_from_u64(seed);
    let mut price = 100.0_f64;
    (0..n)
        .map(|i| {
            let ret: f64 = rng.gen_range(-0.03..0.03);
            let open = price;
            let close = price * (1.0 + ret);
            let high = open.max(close) * (1.0 + rng.gen_range(0.0..0.01));
            let low = open.min(close) * (1.0 - rng.gen_range(0.0..0.01));
            let volume = rng.gen_range(500_000.0..5_000_000.0);
            price = close;
            Bar::new(stamp(start, timeframe, i), open, high, low, close, volume)
        })
        .collect()
}

/// `n` identical flat bars at `price`.
pub fn constant(start: NaiveDate, timeframe: Timeframe, n: usize, price: f64) -> Vec<Bar> {
    (0..n)
        .map(|i| Bar::flat(stamp(start, timeframe, i), price, DEFAULT_VOLUME))
        .collect()
}

/// Flat bars following an explicit close path.
pub fn from_closes(start: NaiveDate, timeframe: Timeframe, closes: &[f64]) -> Vec<Bar> {
    closes
        .iter()
        .enumerate()
        .map(|(i, &c)| Bar::flat(stamp(start, timeframe, i), c, DEFAULT_VOLUME))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::validate_bars;

    fn start() -> NaiveDate {
        NaiveDate::from_ymd_opt(2023, 1, 2).unwrap()
    }

    #[test]
    fn random_walk_is_deterministic_and_valid() {
        let a = random_walk(start(), Timeframe::DAILY, 200, 42);
        let b = random_walk(start(), Timeframe::DAILY, 200, 42);
        let c = random_walk(start(), Timeframe::DAILY, 200, 43);
        assert_eq!(a, b);
        assert_ne!(a, c);
        assert!(validate_bars(&a).is_ok());
    }

    #[test]
    fn spacing_follows_timeframe() {
        let tf: Timeframe = "15m".parse().unwrap();
        let bars = constant(start(), tf, 3, 10.0);
        assert_eq!(bars[1].timestamp - bars[0].timestamp, chrono::Duration::minutes(15));
        assert!(bars.iter().all(|b| b.close == 10.0 && b.high == 10.0));
    }

    #[test]
    fn explicit_closes_are_kept() {
        let bars = from_closes(start(), Timeframe::DAILY, &[1.0, 2.0, 3.0]);
        let closes: Vec<f64> = bars.iter().map(|b| b.close).collect();
        assert_eq!(closes, vec![1.0, 2.0, 3.0]);
    }
}
