use crate::codec::domain::encoded_image::EncodedImage;
use crate::recognition::domain::oracle_request::OracleRequest;
use crate::recognition::domain::recognition_oracle::RecognitionOracle;
use crate::recognition::domain::recognition_result::{MatchReason, RecognitionResult};
use crate::recognition::domain::response_parser::{parse_response, OracleAnswer};
use crate::shared::constants::DEFAULT_TEMPERATURE;
use crate::shared::identity::Identity;

/// Classifies a candidate image against a set of reference identities.
///
/// Fails open: every oracle-level problem (transport, status, malformed
/// answer) is logged and turned into the `{None, 0}` fallback, so callers
/// always receive a usable result. Stateless across calls.
pub struct RecognitionClient {
    oracle: Box<dyn RecognitionOracle>,
    temperature: f64,
}

impl RecognitionClient {
    pub fn new(oracle: Box<dyn RecognitionOracle>) -> Self {
        Self {
            oracle,
            temperature: DEFAULT_TEMPERATURE,
        }
    }

    pub fn with_temperature(mut self, temperature: f64) -> Self {
        self.temperature = temperature;
        self
    }

    pub fn classify(&self, candidate: &EncodedImage, references: &[Identity]) -> RecognitionResult {
        if references.is_empty() {
            return RecognitionResult::unknown(MatchReason::NoIdentities);
        }
        if candidate.is_empty() {
            log::warn!("Recognition skipped: candidate image is empty");
            return RecognitionResult::unknown(MatchReason::OracleFailure);
        }

        let request = OracleRequest::build(candidate, references, self.temperature);
        log::debug!(
            "Classifying {candidate} against {} reference(s)",
            references.len()
        );

        let text = match self.oracle.generate(&request) {
            Ok(text) => text,
            Err(e) => {
                log::warn!("Recognition oracle call failed: {e}");
                return RecognitionResult::unknown(MatchReason::OracleFailure);
            }
        };

        match parse_response(&text) {
            Ok(answer) => resolve(answer, references),
            Err(e) => {
                log::warn!("Recognition oracle returned an unusable answer: {e}");
                RecognitionResult::unknown(MatchReason::OracleFailure)
            }
        }
    }
}

/// Only tokens that were part of the request may come back as a match.
fn resolve(answer: OracleAnswer, references: &[Identity]) -> RecognitionResult {
    let Some(token) = answer.matched_id else {
        return RecognitionResult::no_match(answer.confidence);
    };

    match references.iter().find(|r| r.id.as_str() == token) {
        Some(identity) => RecognitionResult::matched(identity.id.clone(), answer.confidence),
        None => {
            log::warn!("Recognition oracle named unknown reference {token:?}");
            RecognitionResult::unknown(MatchReason::UnknownReference)
        }
    }
}
