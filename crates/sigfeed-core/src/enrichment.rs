//! Server-computed enrichment attached to a signal after creation.

use crate::language::Language;
use crate::signal::SignalId;
use serde::{Deserialize, Serialize};

/// Fixed set of named sub-scores that make up the quality score.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScoreBreakdown {
    pub trend_alignment: f64,
    pub momentum: f64,
    pub volume: f64,
    pub risk_reward: f64,
    pub market_structure: f64,
}

/// Outcome of the server-side guardrail checks.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GuardrailResult {
    pub passed: bool,
    #[serde(default)]
    pub reasons: Vec<String>,
}

/// Enrichment for one signal.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnrichmentRecord {
    pub signal_id: SignalId,
    pub quality_score: f64,
    #[serde(default)]
    pub score_breakdown: ScoreBreakdown,
    /// Free-text analyst notes, in `source_language`.
    #[serde(default)]
    pub notes: Vec<String>,
    #[serde(default)]
    pub guardrails: GuardrailResult,
    #[serde(default)]
    pub source_language: Language,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_defaults() {
        let json = r#"{"signal_id": 7, "quality_score": 81.5, "notes": ["Strong trend"]}"#;
        let record: EnrichmentRecord = serde_json::from_str(json).unwrap();
        assert_eq!(record.signal_id, SignalId::new(7));
        assert_eq!(record.source_language, Language::default());
        assert!(!record.guardrails.passed);
        assert_eq!(record.score_breakdown.momentum, 0.0);
    }
}
