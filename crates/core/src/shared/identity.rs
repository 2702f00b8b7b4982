use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::codec::domain::encoded_image::EncodedImage;

/// Opaque identity token. Also used as the label the oracle answers with.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct IdentityId(String);

impl IdentityId {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn generate() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for IdentityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A registered person with one reference image. Immutable once created.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Identity {
    pub id: IdentityId,
    pub name: String,
    pub reference_image: EncodedImage,
    pub created_at: DateTime<Utc>,
}

impl Identity {
    pub fn new(name: impl Into<String>, reference_image: EncodedImage) -> Self {
        Self {
            id: IdentityId::generate(),
            name: name.into(),
            reference_image,
            created_at: Utc::now(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generated_ids_are_unique() {
        assert_ne!(IdentityId::generate(), IdentityId::generate());
    }

    #[test]
    fn test_id_serializes_as_plain_string() {
        let json = serde_json::to_string(&IdentityId::new("A")).unwrap();
        assert_eq!(json, "\"A\"");
    }

    #[test]
    fn test_new_identity_gets_fresh_id() {
        let image = EncodedImage::from_parts("image/png", "AAAA");
        let a = Identity::new("Ada", image.clone());
        let b = Identity::new("Ada", image);
        assert_ne!(a.id, b.id);
        assert_eq!(a.name, "Ada");
    }
}
