//! Backtest summary statistics.

use chrono::NaiveDate;
use serde::Serialize;

use super::position::BacktestTrade;
use super::stats::{annualized_sharpe, safe_ratio, simple_returns};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EquityPoint {
    pub date: NaiveDate,
    pub equity: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BacktestSummary {
    pub total_trades: usize,
    pub winning_trades: usize,
    pub losing_trades: usize,
    pub win_rate: f64,
    pub avg_win: f64,
    pub avg_loss: f64,
    pub largest_win: f64,
    pub largest_loss: f64,
    pub profit_factor: f64,
    pub avg_risk_reward: f64,
    pub total_pnl: f64,
    pub total_return: f64,
    pub final_capital: f64,
    pub sharpe_ratio: f64,
    pub max_drawdown: f64,
}

impl BacktestSummary {
    pub fn compute(
        trades: &[BacktestTrade],
        equity_curve: &[EquityPoint],
        initial_capital: f64,
    ) -> Self {
        let mut winning_trades = 0usize;
        let mut losing_trades = 0usize;
        let mut total_wins = 0.0_f64;
        let mut total_losses = 0.0_f64;
        let mut largest_win = 0.0_f64;
        let mut largest_loss = 0.0_f64;

        for trade in trades {
            let pnl = trade.pnl;
            if pnl > 0.0 {
                winning_trades += 1;
                total_wins += pnl;
                largest_win = largest_win.max(pnl);
            } else if pnl < 0.0 {
                losing_trades += 1;
                total_losses += pnl.abs();
                largest_loss = largest_loss.max(pnl.abs());
            }
        }

        let total_trades = trades.len();
        let total_pnl: f64 = trades.iter().map(|t| t.pnl).sum();
        let final_capital = initial_capital + total_pnl;
        let avg_risk_reward = safe_ratio(
            trades.iter().map(|t| t.risk_reward).sum(),
            total_trades as f64,
        );

        let equity: Vec<f64> = equity_curve.iter().map(|p| p.equity).collect();

        BacktestSummary {
            total_trades,
            winning_trades,
            losing_trades,
            win_rate: safe_ratio(winning_trades as f64, total_trades as f64),
            avg_win: safe_ratio(total_wins, winning_trades as f64),
            avg_loss: safe_ratio(total_losses, losing_trades as f64),
            largest_win,
            largest_loss,
            profit_factor: safe_ratio(total_wins, total_losses),
            avg_risk_reward,
            total_pnl,
            total_return: safe_ratio(total_pnl, initial_capital),
            final_capital,
            sharpe_ratio: annualized_sharpe(&simple_returns(&equity)),
            max_drawdown: trade_drawdown(trades, initial_capital),
        }
    }
}

/// Largest peak-to-trough decline of realised equity, sampled at each trade close.
fn trade_drawdown(trades: &[BacktestTrade], initial_capital: f64) -> f64 {
    let mut equity = initial_capital;
    let mut peak = initial_capital;
    let mut max_dd = 0.0_f64;

    for trade in trades {
        equity += trade.pnl;
        if equity > peak {
            peak = equity;
        } else if peak > 0.0 {
            max_dd = max_dd.max((peak - equity) / peak);
        }
    }

    max_dd
}
