//! Trading signal entity.
//!
//! A signal is immutable once created; the server may later attach
//! AI-adjusted price levels, which turns it into a "v2" signal.

use crate::decimal::Price;
use crate::error::CoreError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Server-assigned signal identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SignalId(pub i64);

impl SignalId {
    #[inline]
    pub fn new(id: i64) -> Self {
        Self(id)
    }

    #[inline]
    pub fn value(&self) -> i64 {
        self.0
    }
}

impl fmt::Display for SignalId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Trade direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Direction {
    Long,
    Short,
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Long => write!(f, "LONG"),
            Self::Short => write!(f, "SHORT"),
        }
    }
}

impl FromStr for Direction {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "LONG" => Ok(Self::Long),
            "SHORT" => Ok(Self::Short),
            _ => Err(CoreError::UnknownVariant {
                field: "direction",
                value: s.to_string(),
            }),
        }
    }
}

/// Processing lifecycle of a signal: RAW -> PROCESSING -> ENRICHED | FAILED.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SignalStatus {
    Raw,
    Processing,
    Enriched,
    Failed,
}

impl SignalStatus {
    /// Version tag derived from the status.
    pub fn version(&self) -> SignalVersion {
        match self {
            Self::Enriched => SignalVersion::V2,
            Self::Raw | Self::Processing | Self::Failed => SignalVersion::V1,
        }
    }

    /// Whether server-side enrichment has completed for this signal.
    pub fn is_enriched(&self) -> bool {
        matches!(self, Self::Enriched)
    }
}

impl fmt::Display for SignalStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Raw => write!(f, "RAW"),
            Self::Processing => write!(f, "PROCESSING"),
            Self::Enriched => write!(f, "ENRICHED"),
            Self::Failed => write!(f, "FAILED"),
        }
    }
}

impl FromStr for SignalStatus {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "RAW" => Ok(Self::Raw),
            "PROCESSING" => Ok(Self::Processing),
            "ENRICHED" => Ok(Self::Enriched),
            "FAILED" => Ok(Self::Failed),
            _ => Err(CoreError::UnknownVariant {
                field: "status",
                value: s.to_string(),
            }),
        }
    }
}

/// Version tag: v1 = original levels only, v2 = AI-adjusted levels available.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SignalVersion {
    V1,
    V2,
}

impl fmt::Display for SignalVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::V1 => write!(f, "v1"),
            Self::V2 => write!(f, "v2"),
        }
    }
}

/// Entry / stop / target levels of a signal.
///
/// Each field may be absent: the server omits levels it could not compute.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PriceLevels {
    pub entry: Option<Vec<Price>>,
    pub stop_loss: Option<Price>,
    pub take_profits: Option<Vec<Price>>,
}

/// A trading signal as returned by the list endpoint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Signal {
    pub id: SignalId,
    /// Instrument symbol (e.g., "BTCUSDT").
    pub pair: String,
    pub direction: Direction,
    pub status: SignalStatus,
    #[serde(default)]
    pub entry: Option<Vec<Price>>,
    #[serde(default)]
    pub stop_loss: Option<Price>,
    #[serde(default)]
    pub take_profits: Option<Vec<Price>>,
    #[serde(default)]
    pub ai_entry: Option<Vec<Price>>,
    #[serde(default)]
    pub ai_stop_loss: Option<Price>,
    #[serde(default)]
    pub ai_take_profits: Option<Vec<Price>>,
    #[serde(default)]
    pub strategy: Option<String>,
    #[serde(default)]
    pub timeframe: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl Signal {
    pub fn version(&self) -> SignalVersion {
        self.status.version()
    }

    /// Levels as originally published.
    pub fn raw_levels(&self) -> PriceLevels {
        PriceLevels {
            entry: self.entry.clone(),
            stop_loss: self.stop_loss,
            take_profits: self.take_profits.clone(),
        }
    }

    /// AI-adjusted levels (fields absent when the adjustment left them out).
    pub fn adjusted_levels(&self) -> PriceLevels {
        PriceLevels {
            entry: self.ai_entry.clone(),
            stop_loss: self.ai_stop_loss,
            take_profits: self.ai_take_profits.clone(),
        }
    }
}
