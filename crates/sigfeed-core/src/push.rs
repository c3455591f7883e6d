//! Background push channel message format.
//!
//! Messages are JSON objects tagged by a `type` field:
//! `{"type": "signals:new", "signal_id": 1, "pair": "BTCUSDT", ...}`.
//! Consumers inspect the tag only; unknown tags are carried as `Other`.

use crate::error::{CoreError, Result};
use serde_json::Value;
use std::fmt;

/// Discriminated tag of a push message.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum PushKind {
    /// `signals:new`
    SignalsNew,
    /// `signals:ai_complete`
    SignalsAiComplete,
    /// Any tag this core does not act on.
    Other(String),
}

impl PushKind {
    pub const SIGNALS_NEW: &'static str = "signals:new";
    pub const SIGNALS_AI_COMPLETE: &'static str = "signals:ai_complete";

    pub fn from_tag(tag: &str) -> Self {
        match tag {
            Self::SIGNALS_NEW => Self::SignalsNew,
            Self::SIGNALS_AI_COMPLETE => Self::SignalsAiComplete,
            other => Self::Other(other.to_string()),
        }
    }

    pub fn as_tag(&self) -> &str {
        match self {
            Self::SignalsNew => Self::SIGNALS_NEW,
            Self::SignalsAiComplete => Self::SIGNALS_AI_COMPLETE,
            Self::Other(tag) => tag,
        }
    }

    /// Whether this message means the signal list may be stale.
    pub fn is_signal_change(&self) -> bool {
        matches!(self, Self::SignalsNew | Self::SignalsAiComplete)
    }
}

impl fmt::Display for PushKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_tag())
    }
}

/// A decoded push message: its tag plus the raw JSON body.
#[derive(Debug, Clone, PartialEq)]
pub struct PushMessage {
    pub kind: PushKind,
    pub payload: Value,
}

impl PushMessage {
    pub fn new(kind: PushKind, payload: Value) -> Self {
        Self { kind, payload }
    }

    /// Decode a text frame.
    pub fn parse(text: &str) -> Result<Self> {
        let payload: Value = serde_json::from_str(text)?;
        Self::from_value(payload)
    }

    pub fn from_value(payload: Value) -> Result<Self> {
        let tag = payload
            .get("type")
            .and_then(Value::as_str)
            .ok_or_else(|| CoreError::InvalidPushMessage("missing string `type` tag".into()))?;
        Ok(Self {
            kind: PushKind::from_tag(tag),
            payload,
        })
    }
}
