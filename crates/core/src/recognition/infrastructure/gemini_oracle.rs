use std::collections::BTreeMap;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::config::settings::Settings;
use crate::recognition::domain::oracle_request::{
    FieldKind, OracleRequest, RequestPart, ResponseSchema,
};
use crate::recognition::domain::recognition_oracle::RecognitionOracle;

/// Longest error body kept in [`OracleError::Status`].
const MAX_ERROR_BODY: usize = 512;

#[derive(Error, Debug)]
pub enum OracleError {
    #[error("API key is missing")]
    MissingApiKey,
    #[error("failed to build HTTP client: {0}")]
    Client(#[source] reqwest::Error),
    #[error("request to {url} failed: {source}")]
    Transport {
        url: String,
        #[source]
        source: reqwest::Error,
    },
    #[error("oracle returned HTTP {status}: {body}")]
    Status { status: u16, body: String },
    #[error("failed to decode oracle response: {0}")]
    Decode(#[source] reqwest::Error),
    #[error("oracle blocked the request: {0}")]
    Blocked(String),
    #[error("oracle returned no text")]
    EmptyResponse,
}

/// Recognition oracle backed by the Gemini `generateContent` REST endpoint.
///
/// One blocking HTTP round trip per classification. The structured-output
/// contract is forwarded as `responseSchema` so the answer text is JSON.
pub struct GeminiOracle {
    http: reqwest::blocking::Client,
    endpoint: String,
    model: String,
    api_key: String,
}

impl GeminiOracle {
    pub fn new(api_key: impl Into<String>, settings: &Settings) -> Result<Self, OracleError> {
        let api_key = api_key.into();
        if api_key.trim().is_empty() {
            return Err(OracleError::MissingApiKey);
        }
        let http = reqwest::blocking::Client::builder()
            .timeout(Duration::from_secs(settings.request_timeout_secs))
            .build()
            .map_err(OracleError::Client)?;
        Ok(Self {
            http,
            endpoint: settings.endpoint.clone(),
            model: settings.model.clone(),
            api_key,
        })
    }

    pub fn url(&self) -> String {
        format!(
            "{}/models/{}:generateContent",
            self.endpoint.trim_end_matches('/'),
            self.model
        )
    }

    fn call(&self, request: &OracleRequest) -> Result<String, OracleError> {
        let url = self.url();
        let body = GenerateContentRequest::from(request);

        let response = self
            .http
            .post(&url)
            .header("x-goog-api-key", &self.api_key)
            .json(&body)
            .send()
            .map_err(|e| OracleError::Transport {
                url: url.clone(),
                source: e,
            })?;

        let status = response.status();
        if !status.is_success() {
            let mut body = response.text().unwrap_or_default();
            truncate(&mut body, MAX_ERROR_BODY);
            return Err(OracleError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let decoded: GenerateContentResponse = response.json().map_err(OracleError::Decode)?;
        decoded.into_text()
    }
}

impl RecognitionOracle for GeminiOracle {
    fn generate(&self, request: &OracleRequest) -> Result<String, Box<dyn std::error::Error>> {
        Ok(self.call(request)?)
    }
}

fn truncate(text: &mut String, max: usize) {
    if text.len() > max {
        let mut cut = max;
        while !text.is_char_boundary(cut) {
            cut -= 1;
        }
        text.truncate(cut);
    }
}

// --- Wire format ---

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentRequest {
    contents: Vec<Content>,
    generation_config: GenerationConfig,
}

#[derive(Serialize)]
struct Content {
    parts: Vec<Part>,
}

#[derive(Serialize)]
#[serde(untagged)]
enum Part {
    InlineData {
        #[serde(rename = "inlineData")]
        inline_data: Blob,
    },
    Text {
        text: String,
    },
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct Blob {
    mime_type: String,
    data: String,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    response_mime_type: &'static str,
    response_schema: Schema,
    temperature: f64,
}

#[derive(Serialize)]
struct Schema {
    #[serde(rename = "type")]
    kind: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    description: Option<&'static str>,
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    nullable: bool,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    properties: BTreeMap<&'static str, Schema>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    required: Vec<&'static str>,
}

impl From<&OracleRequest> for GenerateContentRequest {
    fn from(request: &OracleRequest) -> Self {
        let parts = request
            .parts
            .iter()
            .map(|part| match part {
                RequestPart::InlineImage { media_type, data } => Part::InlineData {
                    inline_data: Blob {
                        mime_type: media_type.clone(),
                        data: data.clone(),
                    },
                },
                RequestPart::Text(text) => Part::Text { text: text.clone() },
            })
            .collect();

        Self {
            contents: vec![Content { parts }],
            generation_config: GenerationConfig {
                response_mime_type: "application/json",
                response_schema: Schema::from(&request.schema),
                temperature: request.temperature,
            },
        }
    }
}

impl From<&ResponseSchema> for Schema {
    fn from(schema: &ResponseSchema) -> Self {
        let properties = schema
            .fields
            .iter()
            .map(|field| {
                let kind = match field.kind {
                    FieldKind::String => "STRING",
                    FieldKind::Number => "NUMBER",
                };
                (
                    field.name,
                    Schema {
                        kind,
                        description: Some(field.description),
                        nullable: field.nullable,
                        properties: BTreeMap::new(),
                        required: Vec::new(),
                    },
                )
            })
            .collect();

        Schema {
            kind: "OBJECT",
            description: None,
            nullable: false,
            properties,
            required: schema.required().collect(),
        }
    }
}

#[derive(Deserialize, Default)]
#[serde(rename_all = "camelCase", default)]
struct GenerateContentResponse {
    candidates: Vec<Candidate>,
    prompt_feedback: Option<PromptFeedback>,
}

#[derive(Deserialize, Default)]
#[serde(default)]
struct Candidate {
    content: Option<CandidateContent>,
}

#[derive(Deserialize, Default)]
#[serde(default)]
struct CandidateContent {
    parts: Vec<CandidatePart>,
}

#[derive(Deserialize, Default)]
#[serde(default)]
struct CandidatePart {
    text: Option<String>,
}

#[derive(Deserialize, Default)]
#[serde(rename_all = "camelCase", default)]
struct PromptFeedback {
    block_reason: Option<String>,
}

impl GenerateContentResponse {
    /// Concatenated text parts of the first candidate.
    fn into_text(self) -> Result<String, OracleError> {
        let Some(candidate) = self.candidates.into_iter().next() else {
            return match self.prompt_feedback.and_then(|f| f.block_reason) {
                Some(reason) => Err(OracleError::Blocked(reason)),
                None => Err(OracleError::EmptyResponse),
            };
        };

        let text: String = candidate
            .content
            .map(|c| c.parts.into_iter().filter_map(|p| p.text).collect())
            .unwrap_or_default();

        if text.trim().is_empty() {
            Err(OracleError::EmptyResponse)
        } else {
            Ok(text)
        }
    }
}
