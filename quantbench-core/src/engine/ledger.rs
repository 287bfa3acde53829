//! Long-only, all-in position ledger.
//!
//! Flat → Long on buy (the whole cash balance buys `cash / price` units),
//! Long → Flat on sell (the whole position is sold). Buys while long and
//! sells while flat are no-ops. Commission is charged on notional per fill.

use serde::{Deserialize, Serialize};

use crate::domain::{Action, Bar, Side, Trade};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PositionState {
    Flat,
    Long,
}

#[derive(Debug, Clone)]
pub struct Ledger {
    cash: f64,
    size: f64,
    state: PositionState,
    commission: f64,
    trades: Vec<Trade>,
}

impl Ledger {
    pub fn new(initial_capital: f64, commission: f64) -> Self {
        Self {
            cash: initial_capital,
            size: 0.0,
            state: PositionState::Flat,
            commission,
            trades: Vec::new(),
        }
    }

    pub fn state(&self) -> PositionState {
        self.state
    }

    pub fn cash(&self) -> f64 {
        self.cash
    }

    pub fn size(&self) -> f64 {
        self.size
    }

    pub fn trades(&self) -> &[Trade] {
        &self.trades
    }

    pub fn into_trades(self) -> Vec<Trade> {
        self.trades
    }

    /// Cash plus the position marked at `close`.
    pub fn equity(&self, close: f64) -> f64 {
        match self.state {
            PositionState::Flat => self.cash,
            PositionState::Long => self.cash + self.size * close,
        }
    }

    /// Fill `action` at the bar's close. Returns the trade if one executed.
    pub fn apply(&mut self, action: Action, bar_index: usize, bar: &Bar) -> Option<&Trade> {
        let price = bar.close;
        let executed = match (action, self.state) {
            (Action::Buy, PositionState::Flat) if self.cash > 0.0 && price > 0.0 => {
                let size = self.cash / price;
                let fee = size * price * self.commission;
                let before = self.cash;
                self.cash -= size * price + fee;
                self.size = size;
                self.state = PositionState::Long;
                Some((Side::Buy, size, fee, before))
            }
            (Action::Sell, PositionState::Long) => {
                let size = self.size;
                let proceeds = size * price;
                let fee = proceeds * self.commission;
                let before = self.cash;
                self.cash += proceeds - fee;
                self.size = 0.0;
                self.state = PositionState::Flat;
                Some((Side::Sell, size, fee, before))
            }
            _ => None,
        };

        let (side, size, fee, capital_before) = executed?;
        self.trades.push(Trade {
            bar_index,
            timestamp: bar.timestamp,
            side,
            price,
            size,
            fee,
            capital_before,
            capital: self.cash,
        });
        self.trades.last()
    }
}
