//! Trade direction and the mean-reverting direction policy

use rand::Rng;
use serde::{Deserialize, Serialize};
use std::fmt;

/// One side of the two-asset pool
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Asset {
    A,
    B,
}

impl Asset {
    pub fn other(self) -> Self {
        match self {
            Asset::A => Asset::B,
            Asset::B => Asset::A,
        }
    }
}

/// Which asset the agent sells
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Direction {
    AtoB,
    BtoA,
}

impl Direction {
    /// Asset leaving the agent's wallet
    pub fn source(self) -> Asset {
        match self {
            Direction::AtoB => Asset::A,
            Direction::BtoA => Asset::B,
        }
    }

    /// Asset arriving in the agent's wallet
    pub fn destination(self) -> Asset {
        self.source().other()
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Direction::AtoB => write!(f, "AtoB"),
            Direction::BtoA => write!(f, "BtoA"),
        }
    }
}

/// A freshly sampled trade, consumed immediately by the order submitter
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TradeIntent {
    pub direction: Direction,
    pub amount: u64,
}

/// Picks a direction with probability proportional to holdings.
///
/// The larger the B share of an agent's total holdings, the more likely it
/// sells B for A. This keeps any single agent from draining one side.
#[derive(Debug, Clone, Copy, Default)]
pub struct DirectionPolicy;

impl DirectionPolicy {
    pub fn new() -> Self {
        Self
    }

    /// Probability of choosing `BtoA` for the given balances
    pub fn btoa_probability(&self, balance_a: u64, balance_b: u64) -> f64 {
        let total = balance_a as u128 + balance_b as u128;
        if total == 0 {
            return 0.5;
        }
        balance_b as f64 / total as f64
    }

    pub fn choose<R: Rng + ?Sized>(&self, rng: &mut R, balance_a: u64, balance_b: u64) -> Direction {
        let p_btoa = self.btoa_probability(balance_a, balance_b);
        if rng.gen::<f64>() < p_btoa {
            Direction::BtoA
        } else {
            Direction::AtoB
        }
    }

    /// Coin flip, used before an agent has any trade history
    pub fn choose_uniform<R: Rng + ?Sized>(&self, rng: &mut R) -> Direction {
        if rng.gen_bool(0.5) {
            Direction::BtoA
        } else {
            Direction::AtoB
        }
    }
}
