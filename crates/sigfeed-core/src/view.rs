//! Per-row display derivations.
//!
//! Everything here is pure and recomputed on every render; nothing mutates
//! the underlying `Signal`.

use chrono::{DateTime, Duration, Utc};
use rust_decimal::Decimal;
use serde::ser::SerializeStruct;
use serde::{Serialize, Serializer};

use crate::decimal::Price;
use crate::signal::{Direction, PriceLevels, Signal, SignalId, SignalStatus, SignalVersion};

/// Signals expire this many hours after creation.
pub const EXPIRY_WINDOW_HOURS: i64 = 24;

/// Which adjusted fields differ from the raw ones.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct LevelChanges {
    pub entry: bool,
    pub stop_loss: bool,
    pub take_profits: bool,
}

impl LevelChanges {
    pub fn any(&self) -> bool {
        self.entry || self.stop_loss || self.take_profits
    }
}

/// Time left in the 24h window.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Expiry {
    Expired,
    Remaining { hours: i64, minutes: i64 },
}

impl Expiry {
    pub fn is_expired(&self) -> bool {
        matches!(self, Self::Expired)
    }
}

impl Serialize for Expiry {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Self::Expired => {
                let mut s = serializer.serialize_struct("Expiry", 1)?;
                s.serialize_field("expired", &true)?;
                s.end()
            }
            Self::Remaining { hours, minutes } => {
                let mut s = serializer.serialize_struct("Expiry", 3)?;
                s.serialize_field("expired", &false)?;
                s.serialize_field("hours", hours)?;
                s.serialize_field("minutes", minutes)?;
                s.end()
            }
        }
    }
}

fn present(levels: &Option<Vec<Price>>) -> Option<&Vec<Price>> {
    levels.as_ref().filter(|v| !v.is_empty())
}

/// Levels to display: for v2 signals each adjusted field replaces the raw
/// one independently when present; v1 signals always show raw levels.
pub fn effective_levels(signal: &Signal) -> PriceLevels {
    if signal.version() == SignalVersion::V1 {
        return signal.raw_levels();
    }
    PriceLevels {
        entry: present(&signal.ai_entry)
            .or(signal.entry.as_ref())
            .cloned(),
        stop_loss: signal.ai_stop_loss.or(signal.stop_loss),
        take_profits: present(&signal.ai_take_profits)
            .or(signal.take_profits.as_ref())
            .cloned(),
    }
}

/// Field-by-field comparison of adjusted vs raw levels.
///
/// An absent adjusted field is not a change. v1 signals never report changes.
pub fn level_changes(signal: &Signal) -> LevelChanges {
    if signal.version() == SignalVersion::V1 {
        return LevelChanges::default();
    }
    LevelChanges {
        entry: present(&signal.ai_entry).is_some_and(|adj| Some(adj) != signal.entry.as_ref()),
        stop_loss: signal
            .ai_stop_loss
            .is_some_and(|adj| Some(adj) != signal.stop_loss),
        take_profits: present(&signal.ai_take_profits)
            .is_some_and(|adj| Some(adj) != signal.take_profits.as_ref()),
    }
}

/// Whether the AI adjustment changed any level.
pub fn has_differences(signal: &Signal) -> bool {
    level_changes(signal).any()
}

/// Reward / risk using the first entry and first take-profit.
///
/// Returns `None` when any input is missing or the risk is zero, so callers
/// render "N/A" instead of a numeric artifact.
pub fn risk_reward(
    entry: Option<&[Price]>,
    stop_loss: Option<Price>,
    take_profits: Option<&[Price]>,
) -> Option<Decimal> {
    let entry = *entry?.first()?;
    let stop_loss = stop_loss?;
    let first_tp = *take_profits?.first()?;

    let risk = entry.distance(stop_loss);
    let reward = first_tp.distance(entry);
    reward.checked_div(risk)
}

/// Remaining time in the fixed 24h window, truncated to whole minutes.
pub fn time_until_expiry(created_at: DateTime<Utc>, now: DateTime<Utc>) -> Expiry {
    let expires_at = created_at + Duration::hours(EXPIRY_WINDOW_HOURS);
    if now >= expires_at {
        return Expiry::Expired;
    }
    let remaining = expires_at - now;
    Expiry::Remaining {
        hours: remaining.num_hours(),
        minutes: remaining.num_minutes() % 60,
    }
}

/// Display state of one signal row.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SignalRow {
    pub id: SignalId,
    pub pair: String,
    pub direction: Direction,
    pub status: SignalStatus,
    pub version: SignalVersion,
    pub strategy: Option<String>,
    pub timeframe: Option<String>,
    pub created_at: DateTime<Utc>,
    /// Levels as originally published (shown alongside v2 for comparison).
    pub original: PriceLevels,
    pub effective: PriceLevels,
    pub changes: LevelChanges,
    pub has_differences: bool,
    pub risk_reward: Option<Decimal>,
    pub expiry: Expiry,
}

impl SignalRow {
    /// Derive a row against a shared `now` so all rows tick in lockstep.
    pub fn derive(signal: &Signal, now: DateTime<Utc>) -> Self {
        let effective = effective_levels(signal);
        let changes = level_changes(signal);
        let risk_reward = risk_reward(
            effective.entry.as_deref(),
            effective.stop_loss,
            effective.take_profits.as_deref(),
        );
        Self {
            id: signal.id,
            pair: signal.pair.clone(),
            direction: signal.direction,
            status: signal.status,
            version: signal.version(),
            strategy: signal.strategy.clone(),
            timeframe: signal.timeframe.clone(),
            created_at: signal.created_at,
            original: signal.raw_levels(),
            effective,
            changes,
            has_differences: changes.any(),
            risk_reward,
            expiry: time_until_expiry(signal.created_at, now),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use rust_decimal_macros::dec;

    fn p(d: Decimal) -> Price {
        Price::new(d)
    }

    fn created() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 5, 1, 8, 0, 0).unwrap()
    }

    fn sample_signal(status: SignalStatus) -> Signal {
        Signal {
            id: SignalId::new(1),
            pair: "BTCUSDT".to_string(),
            direction: Direction::Long,
            status,
            entry: Some(vec![p(dec!(100))]),
            stop_loss: Some(p(dec!(95))),
            take_profits: Some(vec![p(dec!(110)), p(dec!(120))]),
            ai_entry: None,
            ai_stop_loss: None,
            ai_take_profits: None,
            strategy: Some("breakout".to_string()),
            timeframe: Some("4h".to_string()),
            created_at: created(),
        }
    }

    #[test]
    fn test_effective_levels_v1_ignores_adjusted() {
        let mut signal = sample_signal(SignalStatus::Processing);
        signal.ai_stop_loss = Some(p(dec!(97)));
        let levels = effective_levels(&signal);
        assert_eq!(levels.stop_loss, Some(p(dec!(95))));
    }

    #[test]
    fn test_effective_levels_v2_per_field_fallback() {
        let mut signal = sample_signal(SignalStatus::Enriched);
        signal.ai_entry = Some(vec![p(dec!(101))]);
        let levels = effective_levels(&signal);
        assert_eq!(levels.entry, Some(vec![p(dec!(101))]));
        // No adjusted stop: raw stop is kept.
        assert_eq!(levels.stop_loss, Some(p(dec!(95))));
        assert_eq!(levels.take_profits, signal.take_profits);
    }

    #[test]
    fn test_effective_levels_empty_adjusted_list_falls_back() {
        let mut signal = sample_signal(SignalStatus::Enriched);
        signal.ai_take_profits = Some(vec![]);
        assert_eq!(effective_levels(&signal).take_profits, signal.take_profits);
        assert!(!has_differences(&signal));
    }

    #[test]
    fn test_has_differences_v1_is_false() {
        let mut signal = sample_signal(SignalStatus::Failed);
        signal.ai_entry = Some(vec![p(dec!(150))]);
        assert!(!has_differences(&signal));
    }

    #[test]
    fn test_has_differences_stop_changed_entry_same() {
        let mut signal = sample_signal(SignalStatus::Enriched);
        signal.ai_entry = Some(vec![p(dec!(100.00))]);
        signal.ai_stop_loss = Some(p(dec!(96)));
        let changes = level_changes(&signal);
        assert!(!changes.entry);
        assert!(changes.stop_loss);
        assert!(has_differences(&signal));
    }

    #[test]
    fn test_has_differences_v2_without_changes() {
        let mut signal = sample_signal(SignalStatus::Enriched);
        signal.ai_entry = signal.entry.clone();
        signal.ai_stop_loss = signal.stop_loss;
        signal.ai_take_profits = signal.take_profits.clone();
        assert!(!has_differences(&signal));
    }

    #[test]
    fn test_has_differences_take_profit_order_matters() {
        let mut signal = sample_signal(SignalStatus::Enriched);
        signal.ai_take_profits = Some(vec![p(dec!(120)), p(dec!(110))]);
        assert!(level_changes(&signal).take_profits);
    }

    #[test]
    fn test_risk_reward_basic() {
        let entry = [p(dec!(100))];
        let tps = [p(dec!(110)), p(dec!(130))];
        let rr = risk_reward(Some(&entry), Some(p(dec!(95))), Some(&tps));
        assert_eq!(rr, Some(dec!(2)));
    }

    #[test]
    fn test_risk_reward_short_side_uses_absolute_values() {
        let entry = [p(dec!(100))];
        let tps = [p(dec!(85))];
        let rr = risk_reward(Some(&entry), Some(p(dec!(105))), Some(&tps));
        assert_eq!(rr, Some(dec!(3)));
    }

    #[test]
    fn test_risk_reward_missing_inputs_is_none() {
        let entry = [p(dec!(100))];
        let tps = [p(dec!(110))];
        assert_eq!(risk_reward(None, Some(p(dec!(100))), Some(&tps)), None);
        assert_eq!(risk_reward(Some(&entry), None, Some(&tps)), None);
        assert_eq!(risk_reward(Some(&entry), Some(p(dec!(100))), None), None);
        assert_eq!(risk_reward(Some(&[]), Some(p(dec!(90))), Some(&tps)), None);
        assert_eq!(risk_reward(Some(&entry), Some(p(dec!(90))), Some(&[])), None);
    }

    #[test]
    fn test_risk_reward_zero_risk_is_none() {
        let entry = [p(dec!(100))];
        let tps = [p(dec!(110))];
        assert_eq!(risk_reward(Some(&entry), Some(p(dec!(100))), Some(&tps)), None);
    }

    #[test]
    fn test_expiry_boundary() {
        let t = created();
        let just_before = t + Duration::hours(24) - Duration::milliseconds(1);
        assert_eq!(
            time_until_expiry(t, just_before),
            Expiry::Remaining {
                hours: 0,
                minutes: 0
            }
        );
        assert_eq!(time_until_expiry(t, t + Duration::hours(24)), Expiry::Expired);
        assert!(time_until_expiry(t, t + Duration::hours(30)).is_expired());
    }

    #[test]
    fn test_expiry_truncates() {
        let t = created();
        let now = t + Duration::minutes(90) + Duration::seconds(59);
        // 22h 29m 01s remaining.
        assert_eq!(
            time_until_expiry(t, now),
            Expiry::Remaining {
                hours: 22,
                minutes: 29
            }
        );
    }

    #[test]
    fn test_expiry_serialization() {
        let expired = serde_json::to_value(Expiry::Expired).unwrap();
        assert_eq!(expired, serde_json::json!({"expired": true}));
        let remaining = serde_json::to_value(Expiry::Remaining {
            hours: 3,
            minutes: 7,
        })
        .unwrap();
        assert_eq!(
            remaining,
            serde_json::json!({"expired": false, "hours": 3, "minutes": 7})
        );
    }

    #[test]
    fn test_signal_row_uses_effective_levels() {
        let mut signal = sample_signal(SignalStatus::Enriched);
        signal.ai_stop_loss = Some(p(dec!(90)));
        let row = SignalRow::derive(&signal, created() + Duration::hours(1));
        assert_eq!(row.version, SignalVersion::V2);
        assert!(row.has_differences);
        assert_eq!(row.original.stop_loss, Some(p(dec!(95))));
        // (110 - 100) / (100 - 90)
        assert_eq!(row.risk_reward, Some(dec!(1)));
        assert_eq!(
            row.expiry,
            Expiry::Remaining {
                hours: 23,
                minutes: 0
            }
        );
    }
}
