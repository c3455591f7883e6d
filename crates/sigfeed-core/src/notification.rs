//! Notification inbox events.

use crate::push::{PushKind, PushMessage};
use crate::signal::{Direction, SignalId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Event variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationKind {
    NewSignal,
    AiAnalysisComplete,
}

/// Rendering identity of an event: (signal id, variant, timestamp in ms).
pub type NotificationKey = (SignalId, NotificationKind, i64);

/// One entry in the notification inbox.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NotificationEvent {
    #[serde(rename = "type")]
    pub kind: NotificationKind,
    pub signal_id: SignalId,
    pub pair: String,
    pub direction: Direction,
    #[serde(default)]
    pub strategy: Option<String>,
    #[serde(default)]
    pub timeframe: Option<String>,
    #[serde(default)]
    pub quality_score: Option<f64>,
    pub timestamp: DateTime<Utc>,
}

/// Body of a `signals:*` push message.
#[derive(Debug, Deserialize)]
struct SignalPushPayload {
    #[serde(alias = "id")]
    signal_id: SignalId,
    pair: String,
    direction: Direction,
    #[serde(default)]
    strategy: Option<String>,
    #[serde(default)]
    timeframe: Option<String>,
    #[serde(default)]
    quality_score: Option<f64>,
    #[serde(default)]
    timestamp: Option<DateTime<Utc>>,
}

impl NotificationEvent {
    pub fn key(&self) -> NotificationKey {
        (self.signal_id, self.kind, self.timestamp.timestamp_millis())
    }

    /// Build an inbox event from a push message.
    ///
    /// Returns `None` for tags that do not produce notifications and for
    /// payloads missing the signal id, pair or direction. A missing
    /// timestamp falls back to `received_at`.
    pub fn from_push(msg: &PushMessage, received_at: DateTime<Utc>) -> Option<Self> {
        let kind = match msg.kind {
            PushKind::SignalsNew => NotificationKind::NewSignal,
            PushKind::SignalsAiComplete => NotificationKind::AiAnalysisComplete,
            PushKind::Other(_) => return None,
        };
        let payload: SignalPushPayload = serde_json::from_value(msg.payload.clone()).ok()?;
        Some(Self {
            kind,
            signal_id: payload.signal_id,
            pair: payload.pair,
            direction: payload.direction,
            strategy: payload.strategy,
            timeframe: payload.timeframe,
            quality_score: payload.quality_score,
            timestamp: payload.timestamp.unwrap_or(received_at),
        })
    }
}
