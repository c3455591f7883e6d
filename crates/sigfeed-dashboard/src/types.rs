//! Dashboard API types.
//!
//! These types are used for JSON serialization in REST and WebSocket APIs.

use serde::{Deserialize, Serialize};
use sigfeed_core::{EnrichmentRecord, Language, SignalFilters, SignalRow};
use sigfeed_inbox::InboxSnapshot;

/// Everything the view layer renders, at one instant.
#[derive(Debug, Clone, Serialize)]
pub struct FeedSnapshot {
    /// Timestamp when snapshot was taken (Unix milliseconds).
    pub timestamp_ms: i64,
    pub rows: Vec<RowView>,
    pub total: u64,
    pub loading: bool,
    pub error: Option<String>,
    pub filters: SignalFilters,
    pub language: Language,
    pub inbox: InboxSnapshot,
}

/// One signal row plus its enrichment state.
#[derive(Debug, Clone, Serialize)]
pub struct RowView {
    #[serde(flatten)]
    pub row: SignalRow,
    /// Absent for signals that are not enriched yet.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub enrichment: Option<EnrichmentView>,
}

/// Per-row enrichment as the UI sees it.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum EnrichmentView {
    Loading,
    /// Fetch failed; the next render pass retries.
    Unavailable,
    Ready {
        record: EnrichmentRecord,
        /// Localized for the active language, else the source notes.
        notes: Vec<String>,
    },
}

/// WebSocket message types (tagged enum for type safety).
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum DashboardMessage {
    /// Full snapshot (sent on connect).
    Snapshot(FeedSnapshot),
    /// Periodic refresh of the full snapshot.
    Update(FeedSnapshot),
}

#[derive(Debug, Clone, Deserialize)]
pub struct LanguageRequest {
    pub language: Language,
}

/// Response to a POST command.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommandAck {
    /// Whether the command changed any state.
    pub changed: bool,
}

#[cfg(test)]
mod tests {
    use super::*;
    use sigfeed_core::{GuardrailResult, SignalId};

    #[test]
    fn test_enrichment_view_tagging() {
        assert_eq!(
            serde_json::to_value(EnrichmentView::Unavailable).unwrap(),
            serde_json::json!({"state": "unavailable"})
        );

        let ready = EnrichmentView::Ready {
            record: EnrichmentRecord {
                signal_id: SignalId::new(1),
                quality_score: 90.0,
                score_breakdown: Default::default(),
                notes: vec!["Clean breakout".into()],
                guardrails: GuardrailResult {
                    passed: true,
                    reasons: vec![],
                },
                source_language: Language::new("en"),
            },
            notes: vec!["Sauberer Ausbruch".into()],
        };
        let json = serde_json::to_value(ready).unwrap();
        assert_eq!(json["state"], "ready");
        assert_eq!(json["notes"][0], "Sauberer Ausbruch");
        assert_eq!(json["record"]["notes"][0], "Clean breakout");
    }
}
