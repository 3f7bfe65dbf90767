//! Resolution strategy and risk level

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::Error;

/// Algorithm used to reconcile a conflict
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ResolutionStrategy {
    LastWriteWins,
    PriorityUser,
    Merge,
    Automatic,
    Manual,
}

impl ResolutionStrategy {
    /// Every strategy, in catalog order
    pub const ALL: [Self; 5] = [
        Self::LastWriteWins,
        Self::PriorityUser,
        Self::Merge,
        Self::Automatic,
        Self::Manual,
    ];

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::LastWriteWins => "last-write-wins",
            Self::PriorityUser => "priority-user",
            Self::Merge => "merge",
            Self::Automatic => "automatic",
            Self::Manual => "manual",
        }
    }

    pub const fn is_manual(self) -> bool {
        matches!(self, Self::Manual)
    }
}

impl fmt::Display for ResolutionStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ResolutionStrategy {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|strategy| strategy.as_str() == s)
            .ok_or_else(|| Error::InvalidInput(format!("unknown resolution strategy: {s}")))
    }
}

/// Estimated risk of applying a strategy automatically
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RiskLevel {
    Low,
    Medium,
    High,
}

impl RiskLevel {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Low => "low",
            Self::Medium => "medium",
            Self::High => "high",
        }
    }
}

impl fmt::Display for RiskLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strategy_round_trips_through_str() {
        for strategy in ResolutionStrategy::ALL {
            assert_eq!(strategy.as_str().parse::<ResolutionStrategy>().unwrap(), strategy);
        }
        assert!("coin-flip".parse::<ResolutionStrategy>().is_err());
    }

    #[test]
    fn strategy_serializes_kebab_case() {
        let json = serde_json::to_string(&ResolutionStrategy::LastWriteWins).unwrap();
        assert_eq!(json, "\"last-write-wins\"");
    }
}
