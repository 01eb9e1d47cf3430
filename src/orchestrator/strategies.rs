//! Orchestration strategy and result-selection mode enums.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// How backends are dispatched for a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Strategy {
    /// Try backends one at a time in priority order
    #[default]
    Failover,
    /// Fan out to every enabled backend, keep all results
    AllProviders,
    /// Fan out, then merge agreeing results field by field
    Consensus,
    /// Fan out, then pick one result by the selection mode
    BestMatch,
}

impl Strategy {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Failover => "failover",
            Self::AllProviders => "all_providers",
            Self::Consensus => "consensus",
            Self::BestMatch => "best_match",
        }
    }
}

impl fmt::Display for Strategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for Strategy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "failover" => Ok(Self::Failover),
            "all_providers" => Ok(Self::AllProviders),
            "consensus" => Ok(Self::Consensus),
            "best_match" => Ok(Self::BestMatch),
            other => Err(format!(
                "unknown strategy '{other}' (expected failover, all_providers, consensus, or best_match)"
            )),
        }
    }
}

/// How a single winner is chosen among fan-out results.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SelectionMode {
    /// Highest self-reported confidence wins
    #[default]
    HighestConfidence,
    /// Best historical quality score wins
    QualityBased,
    /// Field-level agreement merge
    Consensus,
}

impl SelectionMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::HighestConfidence => "highest_confidence",
            Self::QualityBased => "quality_based",
            Self::Consensus => "consensus",
        }
    }
}

impl fmt::Display for SelectionMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for SelectionMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "highest_confidence" => Ok(Self::HighestConfidence),
            "quality_based" => Ok(Self::QualityBased),
            "consensus" => Ok(Self::Consensus),
            other => Err(format!(
                "unknown selection mode '{other}' (expected highest_confidence, quality_based, or consensus)"
            )),
        }
    }
}
