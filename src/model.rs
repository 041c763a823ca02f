//! Core domain types
//!
//! Channels, lifecycle stages, and attribution models are closed sets:
//! unknown values are rejected at the boundary with a typed error, never
//! coerced. All timestamps are epoch milliseconds (UTC).

use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::attribution::AttributionSet;
use crate::error::EngineError;

/// Current time as epoch milliseconds.
pub fn now_millis() -> i64 {
    Utc::now().timestamp_millis()
}

/// One day in milliseconds; reporting windows are `days * DAY_MS`.
pub const DAY_MS: i64 = 86_400_000;

// ============================================
// CHANNELS
// ============================================

/// Marketing channel a touchpoint arrived through.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Channel {
    Email,
    Social,
    Paid,
    Referral,
    Organic,
    Direct,
}

impl Channel {
    pub const ALL: [Channel; 6] = [
        Channel::Email,
        Channel::Social,
        Channel::Paid,
        Channel::Referral,
        Channel::Organic,
        Channel::Direct,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Channel::Email => "email",
            Channel::Social => "social",
            Channel::Paid => "paid",
            Channel::Referral => "referral",
            Channel::Organic => "organic",
            Channel::Direct => "direct",
        }
    }

    /// Fixed per-interaction unit cost used by the ROI report.
    /// Not configurable.
    pub fn unit_cost(&self) -> f64 {
        match self {
            Channel::Email => 0.05,
            Channel::Social => 0.10,
            Channel::Paid => 2.0,
            Channel::Referral => 0.02,
            Channel::Organic => 0.0,
            Channel::Direct => 0.01,
        }
    }
}

impl FromStr for Channel {
    type Err = EngineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "email" => Ok(Channel::Email),
            "social" => Ok(Channel::Social),
            "paid" => Ok(Channel::Paid),
            "referral" => Ok(Channel::Referral),
            "organic" => Ok(Channel::Organic),
            "direct" => Ok(Channel::Direct),
            other => Err(EngineError::InvalidChannel(other.to_string())),
        }
    }
}

impl fmt::Display for Channel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ============================================
// LIFECYCLE STAGES
// ============================================

/// Lifecycle stage a contact occupies. The conventional path is linear
/// (awareness through advocacy) but transitions are not constrained to it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    Awareness,
    Consideration,
    Decision,
    Retention,
    Advocacy,
}

impl Stage {
    /// Canonical funnel order.
    pub const ALL: [Stage; 5] = [
        Stage::Awareness,
        Stage::Consideration,
        Stage::Decision,
        Stage::Retention,
        Stage::Advocacy,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Stage::Awareness => "awareness",
            Stage::Consideration => "consideration",
            Stage::Decision => "decision",
            Stage::Retention => "retention",
            Stage::Advocacy => "advocacy",
        }
    }

    /// Rank in the canonical order. The `none` sentinel (no prior stage)
    /// ranks 0, below awareness.
    pub fn rank(stage: Option<Stage>) -> u8 {
        match stage {
            None => 0,
            Some(Stage::Awareness) => 1,
            Some(Stage::Consideration) => 2,
            Some(Stage::Decision) => 3,
            Some(Stage::Retention) => 4,
            Some(Stage::Advocacy) => 5,
        }
    }

    /// Next stage in the conventional path, if any.
    pub fn next(&self) -> Option<Stage> {
        match self {
            Stage::Awareness => Some(Stage::Consideration),
            Stage::Consideration => Some(Stage::Decision),
            Stage::Decision => Some(Stage::Retention),
            Stage::Retention => Some(Stage::Advocacy),
            Stage::Advocacy => None,
        }
    }
}

impl FromStr for Stage {
    type Err = EngineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "awareness" => Ok(Stage::Awareness),
            "consideration" => Ok(Stage::Consideration),
            "decision" => Ok(Stage::Decision),
            "retention" => Ok(Stage::Retention),
            "advocacy" => Ok(Stage::Advocacy),
            other => Err(EngineError::InvalidStage(other.to_string())),
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ============================================
// ATTRIBUTION MODELS
// ============================================

/// Rule for splitting conversion revenue credit across touchpoints.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AttributionModel {
    FirstTouch,
    LastTouch,
    Linear,
    TimeDecay,
    PositionBased,
}

impl AttributionModel {
    pub const ALL: [AttributionModel; 5] = [
        AttributionModel::FirstTouch,
        AttributionModel::LastTouch,
        AttributionModel::Linear,
        AttributionModel::TimeDecay,
        AttributionModel::PositionBased,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            AttributionModel::FirstTouch => "first_touch",
            AttributionModel::LastTouch => "last_touch",
            AttributionModel::Linear => "linear",
            AttributionModel::TimeDecay => "time_decay",
            AttributionModel::PositionBased => "position_based",
        }
    }
}

impl FromStr for AttributionModel {
    type Err = EngineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "first_touch" => Ok(AttributionModel::FirstTouch),
            "last_touch" => Ok(AttributionModel::LastTouch),
            "linear" => Ok(AttributionModel::Linear),
            "time_decay" => Ok(AttributionModel::TimeDecay),
            "position_based" => Ok(AttributionModel::PositionBased),
            other => Err(EngineError::InvalidModel(other.to_string())),
        }
    }
}

impl fmt::Display for AttributionModel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ============================================
// RECORDS
// ============================================

/// A single recorded interaction between a contact and a channel.
/// Append-only, never revised.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Touchpoint {
    pub id: String,
    pub business_id: String,
    pub contact_id: String,
    pub channel: Channel,
    pub campaign_id: Option<String>,
    /// Opaque bag the engine stores but never inspects.
    pub metadata: Option<serde_json::Value>,
    pub timestamp: i64,
}

/// A realized-revenue event. Written exactly once; the attribution split
/// is computed from the touchpoints that existed at write time and frozen.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Conversion {
    pub id: String,
    pub business_id: String,
    pub contact_id: String,
    pub amount: f64,
    pub conversion_type: String,
    pub currency: String,
    /// Channel of the last touchpoint prior to conversion.
    pub source: Channel,
    /// model -> channel -> credited revenue, frozen at write time.
    pub attributions: AttributionSet,
    pub metadata: Option<serde_json::Value>,
    pub converted_at: i64,
    pub timestamp: i64,
}

/// Current-state stage record. At most one row per contact is open
/// (`exited_at` unset); entering a new stage closes the prior one first.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JourneyStage {
    pub id: String,
    pub business_id: String,
    pub contact_id: String,
    pub stage: Stage,
    pub entered_at: i64,
    pub exited_at: Option<i64>,
    /// Touchpoint ids associated with this stage occupancy.
    pub touchpoints: Vec<String>,
    pub triggered_by: Option<String>,
    pub metadata: Option<serde_json::Value>,
}

/// Append-only log of stage moves; the source of truth for funnel and
/// drop-off analysis. `from_stage` is `None` for a contact's first entry.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JourneyTransition {
    pub id: String,
    pub business_id: String,
    pub contact_id: String,
    pub from_stage: Option<Stage>,
    pub to_stage: Stage,
    pub transitioned_at: i64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn channel_round_trips_through_str() {
        for ch in Channel::ALL {
            assert_eq!(ch.as_str().parse::<Channel>().unwrap(), ch);
        }
    }

    #[test]
    fn unknown_channel_rejected() {
        let err = "billboard".parse::<Channel>().unwrap_err();
        assert!(matches!(err, EngineError::InvalidChannel(_)));
    }

    #[test]
    fn unknown_stage_rejected() {
        let err = "churned".parse::<Stage>().unwrap_err();
        assert!(matches!(err, EngineError::InvalidStage(_)));
    }

    #[test]
    fn stage_rank_orders_canonically() {
        assert_eq!(Stage::rank(None), 0);
        let ranks: Vec<u8> = Stage::ALL.iter().map(|s| Stage::rank(Some(*s))).collect();
        assert_eq!(ranks, vec![1, 2, 3, 4, 5]);
    }

    #[test]
    fn stage_next_follows_conventional_path() {
        assert_eq!(Stage::Awareness.next(), Some(Stage::Consideration));
        assert_eq!(Stage::Advocacy.next(), None);
    }

    #[test]
    fn model_names_are_snake_case() {
        assert_eq!(AttributionModel::TimeDecay.as_str(), "time_decay");
        assert_eq!(
            "position_based".parse::<AttributionModel>().unwrap(),
            AttributionModel::PositionBased
        );
    }
}
