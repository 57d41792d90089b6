//! Strategy identity and per-strategy performance

use std::collections::VecDeque;
use std::fmt;

use serde::{Deserialize, Serialize};

/// Opaque strategy identifier
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StrategyId(String);

impl StrategyId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for StrategyId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for StrategyId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

impl From<String> for StrategyId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

/// Decayed Beta evidence and recent realized PnL for one strategy
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StrategyPerformanceRecord {
    /// Decayed success count (Beta alpha)
    pub wins: f64,
    /// Decayed failure count (Beta beta)
    pub losses: f64,
    /// Undecayed number of recorded outcomes
    pub observations: u64,
    /// Most recent realized PnL, oldest first
    pub recent_pnl: VecDeque<f64>,
    pnl_window: usize,
}

impl StrategyPerformanceRecord {
    /// Fresh record holding only the prior
    pub fn new(prior_wins: f64, prior_losses: f64, pnl_window: usize) -> Self {
        Self {
            wins: prior_wins,
            losses: prior_losses,
            observations: 0,
            recent_pnl: VecDeque::with_capacity(pnl_window),
            pnl_window: pnl_window.max(1),
        }
    }

    /// Count one outcome and remember its PnL
    pub fn record(&mut self, win: bool, pnl: f64) {
        if win {
            self.wins += 1.0;
        } else {
            self.losses += 1.0;
        }
        self.observations += 1;
        if pnl.is_finite() {
            if self.recent_pnl.len() == self.pnl_window {
                self.recent_pnl.pop_front();
            }
            self.recent_pnl.push_back(pnl);
        }
    }

    /// Scale evidence by `factor`, never letting either count drop below `floor`
    pub fn decay(&mut self, factor: f64, floor: f64) {
        self.wins = (self.wins * factor).max(floor);
        self.losses = (self.losses * factor).max(floor);
    }

    /// Posterior mean success probability
    pub fn mean(&self) -> f64 {
        self.wins / (self.wins + self.losses)
    }

    /// Sum of the latest `lookback` PnL observations
    pub fn recent_pnl_sum(&self, lookback: usize) -> f64 {
        self.recent_pnl.iter().rev().take(lookback).sum()
    }

    /// Wins and losses among the recent PnL window
    pub fn recent_counts(&self) -> (usize, usize) {
        self.recent_pnl
            .iter()
            .fold((0, 0), |(wins, losses), &pnl| {
                if pnl > 0.0 {
                    (wins + 1, losses)
                } else if pnl < 0.0 {
                    (wins, losses + 1)
                } else {
                    (wins, losses)
                }
            })
    }
}
