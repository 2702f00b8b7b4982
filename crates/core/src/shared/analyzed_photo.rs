use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::codec::domain::encoded_image::EncodedImage;
use crate::recognition::domain::recognition_result::RecognitionResult;
use crate::shared::identity::IdentityId;

#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PhotoId(String);

impl PhotoId {
    pub fn generate() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for PhotoId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PhotoStatus {
    Pending,
    Analyzed,
    Error,
}

/// A classified candidate photo. Append-only: fields are never changed after
/// the record leaves the scanner.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct AnalyzedPhoto {
    pub id: PhotoId,
    pub source_name: String,
    pub image: EncodedImage,
    pub matched_identity_id: Option<IdentityId>,
    pub confidence: f64,
    pub timestamp: DateTime<Utc>,
    pub status: PhotoStatus,
}

impl AnalyzedPhoto {
    /// Folds a recognition result into a fresh `analyzed` record.
    pub fn analyzed(
        source_name: impl Into<String>,
        image: EncodedImage,
        result: RecognitionResult,
    ) -> Self {
        Self {
            id: PhotoId::generate(),
            source_name: source_name.into(),
            image,
            matched_identity_id: result.matched_identity_id,
            confidence: result.confidence,
            timestamp: Utc::now(),
            status: PhotoStatus::Analyzed,
        }
    }

    pub fn is_match(&self) -> bool {
        self.matched_identity_id.is_some()
    }
}
