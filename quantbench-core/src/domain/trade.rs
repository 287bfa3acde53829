//! Executed trades and the round trips they form.

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

use super::Side;

/// One executed fill in the backtest ledger.
///
/// `capital_before` and `capital` are the cash balances immediately before
/// and after the fill, so round-trip P/L can be read off the ledger without
/// replaying it.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Trade {
    pub bar_index: usize,
    pub timestamp: NaiveDateTime,
    pub side: Side,
    pub price: f64,
    pub size: f64,
    pub fee: f64,
    pub capital_before: f64,
    pub capital: f64,
}

/// A buy paired with the sell that closed it.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RoundTrip {
    pub entry_bar: usize,
    pub exit_bar: usize,
    pub entry_price: f64,
    pub exit_price: f64,
    pub size: f64,
    /// Cash before the entry fill.
    pub entry_capital: f64,
    /// Cash after the exit minus cash before the entry, commissions included.
    pub pnl: f64,
}

impl RoundTrip {
    pub fn is_winner(&self) -> bool {
        self.pnl > 0.0
    }

    /// P/L relative to the cash committed at entry.
    pub fn return_pct(&self) -> f64 {
        if self.entry_capital.abs() < 1e-15 {
            return 0.0;
        }
        self.pnl / self.entry_capital
    }

    pub fn bars_held(&self) -> usize {
        self.exit_bar.saturating_sub(self.entry_bar)
    }
}

/// Pair each buy with the next sell. A trailing open buy is not a round trip.
pub fn round_trips(trades: &[Trade]) -> Vec<RoundTrip> {
    let mut out = Vec::with_capacity(trades.len() / 2);
    let mut open: Option<&Trade> = None;
    for trade in trades {
        match (trade.side, open) {
            (Side::Buy, None) => open = Some(trade),
            (Side::Sell, Some(entry)) => {
                out.push(RoundTrip {
                    entry_bar: entry.bar_index,
                    exit_bar: trade.bar_index,
                    entry_price: entry.price,
                    exit_price: trade.price,
                    size: entry.size,
                    entry_capital: entry.capital_before,
                    pnl: trade.capital - entry.capital_before,
                });
                open = None;
            }
            // The ledger never emits these; skip rather than mis-pair.
            (Side::Buy, Some(_)) | (Side::Sell, None) => {}
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn trade(bar_index: usize, side: Side, price: f64, before: f64, after: f64) -> Trade {
        Trade {
            bar_index,
            timestamp: NaiveDate::from_ymd_opt(2024, 1, 1)
                .unwrap()
                .and_hms_opt(0, 0, 0)
                .unwrap(),
            side,
            price,
            size: 100.0,
            fee: 0.0,
            capital_before: before,
            capital: after,
        }
    }

    #[test]
    fn pairs_buy_and_sell() {
        let trades = vec![
            trade(2, Side::Buy, 100.0, 10_000.0, 0.0),
            trade(5, Side::Sell, 110.0, 0.0, 11_000.0),
            trade(7, Side::Buy, 110.0, 11_000.0, 0.0),
            trade(9, Side::Sell, 99.0, 0.0, 9_900.0),
            trade(12, Side::Buy, 99.0, 9_900.0, 0.0),
        ];
        let rts = round_trips(&trades);
        assert_eq!(rts.len(), 2, "trailing open buy is not a round trip");
        assert_eq!(rts[0].pnl, 1_000.0);
        assert!(rts[0].is_winner());
        assert_eq!(rts[0].bars_held(), 3);
        assert!((rts[0].return_pct() - 0.1).abs() < 1e-12);
        assert_eq!(rts[1].pnl, -1_100.0);
        assert!(!rts[1].is_winner());
    }

    #[test]
    fn empty_ledger_has_no_round_trips() {
        assert!(round_trips(&[]).is_empty());
    }
}
