//! Open-position state and closed-trade records.

use chrono::NaiveDate;
use serde::Serialize;

/// A long position held by the simulated strategy.
#[derive(Debug, Clone, PartialEq)]
pub struct Position {
    pub entry_price: f64,
    pub entry_date: NaiveDate,
    pub quantity: u64,
    /// Trailing stop; only ever raised.
    pub stop_loss: f64,
    pub initial_stop: f64,
    pub take_profit: f64,
    pub entry_atr: f64,
}

impl Position {
    pub fn unrealized_pnl(&self, price: f64) -> f64 {
        self.quantity as f64 * (price - self.entry_price)
    }

    pub fn should_stop_loss(&self, low: f64) -> bool {
        low <= self.stop_loss
    }

    pub fn should_take_profit(&self, high: f64) -> bool {
        high >= self.take_profit
    }

    /// Raises the stop to `candidate` when that tightens it; returns whether it moved.
    pub fn ratchet_stop(&mut self, candidate: f64) -> bool {
        if candidate.is_finite() && candidate > self.stop_loss {
            self.stop_loss = candidate;
            true
        } else {
            false
        }
    }

    /// Closes the position, producing the immutable trade record.
    pub fn close(
        self,
        exit_price: f64,
        exit_date: NaiveDate,
        reason: ExitReason,
    ) -> BacktestTrade {
        let pnl = self.unrealized_pnl(exit_price);
        let pnl_pct = if self.entry_price > 0.0 {
            (exit_price - self.entry_price) / self.entry_price * 100.0
        } else {
            0.0
        };
        let initial_risk = (self.entry_price - self.initial_stop) * self.quantity as f64;
        let risk_reward = if initial_risk > 0.0 {
            pnl.abs() / initial_risk
        } else {
            0.0
        };

        BacktestTrade {
            entry_date: self.entry_date,
            exit_date,
            entry_price: self.entry_price,
            exit_price,
            quantity: self.quantity,
            pnl,
            pnl_pct,
            risk_reward,
            exit_reason: reason,
        }
    }
}

/// Flat/InPosition state of a single-asset, long-only run.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum PositionState {
    #[default]
    Flat,
    InPosition(Position),
}

impl PositionState {
    pub fn is_flat(&self) -> bool {
        matches!(self, PositionState::Flat)
    }

    pub fn position(&self) -> Option<&Position> {
        match self {
            PositionState::Flat => None,
            PositionState::InPosition(p) => Some(p),
        }
    }

    /// Leaves `Flat` behind and returns the previously open position, if any.
    pub fn take(&mut self) -> Option<Position> {
        match std::mem::take(self) {
            PositionState::Flat => None,
            PositionState::InPosition(p) => Some(p),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ExitReason {
    StopLoss,
    TakeProfit,
    TrendReversal,
    EndOfData,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BacktestTrade {
    pub entry_date: NaiveDate,
    pub exit_date: NaiveDate,
    pub entry_price: f64,
    pub exit_price: f64,
    pub quantity: u64,
    pub pnl: f64,
    pub pnl_pct: f64,
    pub risk_reward: f64,
    pub exit_reason: ExitReason,
}
