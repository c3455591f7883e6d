//! List query filters and the paged list response.

use crate::signal::{Direction, Signal, SignalStatus};
use serde::{Deserialize, Serialize};

/// Which side of the 24h expiry window to list.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AgeFilter {
    Active,
    Expired,
}

/// Filters for `fetchSignals`. Absent fields are not sent.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SignalFilters {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pair: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<SignalStatus>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub direction: Option<Direction>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub strategy: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub limit: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub offset: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub age_filter: Option<AgeFilter>,
}

impl SignalFilters {
    pub fn with_direction(mut self, direction: Option<Direction>) -> Self {
        self.direction = direction;
        self
    }

    pub fn with_age_filter(mut self, age_filter: Option<AgeFilter>) -> Self {
        self.age_filter = age_filter;
        self
    }
}

/// One page of signals plus the total matching count.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SignalPage {
    pub signals: Vec<Signal>,
    pub total: u64,
}
