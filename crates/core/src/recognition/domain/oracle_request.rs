use crate::codec::domain::encoded_image::EncodedImage;
use crate::shared::identity::Identity;

pub const MATCHED_ID_FIELD: &str = "matchedId";
pub const CONFIDENCE_FIELD: &str = "confidence";

pub const CANDIDATE_LABEL: &str = "This is the CANDIDATE image.";

pub const INSTRUCTIONS: &str = "You are a precise Face Recognition system.
1. Analyze the face in the CANDIDATE image.
2. Compare it strictly against the Reference images provided.
3. If the candidate matches a reference person, return the Reference ID.
4. If the candidate does not match any reference, return null.
5. Provide a confidence score between 0 and 1.";

/// One ordered element of the request sent to the oracle.
#[derive(Clone, Debug, PartialEq)]
pub enum RequestPart {
    /// Base64 payload without its data-URI wrapper.
    InlineImage { media_type: String, data: String },
    Text(String),
}

impl RequestPart {
    pub fn image(image: &EncodedImage) -> Self {
        Self::InlineImage {
            media_type: image.media_type().to_string(),
            data: image.payload().to_string(),
        }
    }

    pub fn text(text: impl Into<String>) -> Self {
        Self::Text(text.into())
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FieldKind {
    String,
    Number,
}

#[derive(Clone, Debug, PartialEq)]
pub struct SchemaField {
    pub name: &'static str,
    pub kind: FieldKind,
    pub nullable: bool,
    pub description: &'static str,
}

/// Structured-output contract: a JSON object whose fields are all required.
#[derive(Clone, Debug, PartialEq)]
pub struct ResponseSchema {
    pub fields: Vec<SchemaField>,
}

impl ResponseSchema {
    /// `{matchedId: string | null, confidence: number}`.
    pub fn match_result() -> Self {
        Self {
            fields: vec![
                SchemaField {
                    name: MATCHED_ID_FIELD,
                    kind: FieldKind::String,
                    nullable: true,
                    description:
                        "The Reference ID of the matching person, or null if no match found.",
                },
                SchemaField {
                    name: CONFIDENCE_FIELD,
                    kind: FieldKind::Number,
                    nullable: false,
                    description: "Confidence score between 0.0 and 1.0",
                },
            ],
        }
    }

    pub fn required(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.fields.iter().map(|f| f.name)
    }
}

/// A complete classification request: ordered parts plus output contract.
#[derive(Clone, Debug, PartialEq)]
pub struct OracleRequest {
    pub parts: Vec<RequestPart>,
    pub schema: ResponseSchema,
    pub temperature: f64,
}

impl OracleRequest {
    /// Candidate first, then each reference image followed by its label,
    /// then the instruction block.
    pub fn build(candidate: &EncodedImage, references: &[Identity], temperature: f64) -> Self {
        let mut parts = Vec::with_capacity(references.len() * 2 + 3);
        parts.push(RequestPart::image(candidate));
        parts.push(RequestPart::text(CANDIDATE_LABEL));

        for identity in references {
            parts.push(RequestPart::image(&identity.reference_image));
            parts.push(RequestPart::text(reference_label(identity)));
        }

        parts.push(RequestPart::text(INSTRUCTIONS));

        Self {
            parts,
            schema: ResponseSchema::match_result(),
            temperature,
        }
    }

    pub fn image_count(&self) -> usize {
        self.parts
            .iter()
            .filter(|p| matches!(p, RequestPart::InlineImage { .. }))
            .count()
    }
}

fn reference_label(identity: &Identity) -> String {
    format!("Reference ID: {}", identity.id)
}
