use serde::Serialize;

use crate::shared::identity::IdentityId;

/// Why a recognition result looks the way it does.
///
/// Callers that only care about the match treat every non-`Matched` reason
/// as "unknown"; the tag lets them tell an unreachable oracle apart from a
/// genuine miss when they need to.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchReason {
    Matched,
    NoMatch,
    NoIdentities,
    /// The oracle named a token that was not among the references sent.
    UnknownReference,
    OracleFailure,
}

/// Transient outcome of one classification. Folded into an `AnalyzedPhoto`.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct RecognitionResult {
    pub matched_identity_id: Option<IdentityId>,
    pub confidence: f64,
    pub reason: MatchReason,
}

impl RecognitionResult {
    pub fn matched(id: IdentityId, confidence: f64) -> Self {
        Self {
            matched_identity_id: Some(id),
            confidence: clamp_confidence(confidence),
            reason: MatchReason::Matched,
        }
    }

    pub fn no_match(confidence: f64) -> Self {
        Self {
            matched_identity_id: None,
            confidence: clamp_confidence(confidence),
            reason: MatchReason::NoMatch,
        }
    }

    /// The `{None, 0}` fallback.
    pub fn unknown(reason: MatchReason) -> Self {
        Self {
            matched_identity_id: None,
            confidence: 0.0,
            reason,
        }
    }
}

/// Clamps into `[0, 1]`; NaN becomes 0.
pub fn clamp_confidence(value: f64) -> f64 {
    if value.is_nan() {
        0.0
    } else {
        value.clamp(0.0, 1.0)
    }
}
