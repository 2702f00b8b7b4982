use serde_json::{Map, Value};
use thiserror::Error;

use crate::recognition::domain::oracle_request::{CONFIDENCE_FIELD, MATCHED_ID_FIELD};
use crate::shared::constants::NO_MATCH_SENTINELS;

#[derive(Error, Debug)]
pub enum ResponseError {
    #[error("response is empty")]
    Empty,
    #[error("response is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),
    #[error("response is not a JSON object")]
    NotAnObject,
    #[error("missing required field `{0}`")]
    MissingField(&'static str),
    #[error("field `{field}` must be {expected}")]
    WrongType {
        field: &'static str,
        expected: &'static str,
    },
}

/// The oracle's answer after validation, before it is checked against the
/// references that were actually sent.
#[derive(Clone, Debug, PartialEq)]
pub struct OracleAnswer {
    pub matched_id: Option<String>,
    /// Unclamped; range enforcement happens when building the result.
    pub confidence: f64,
}

/// Validates the oracle's textual answer against the match-result contract.
///
/// A Markdown code fence around the JSON is tolerated. Everything else that
/// deviates from `{matchedId: string|null, confidence: number}` is an error.
pub fn parse_response(text: &str) -> Result<OracleAnswer, ResponseError> {
    let body = strip_code_fence(text.trim());
    if body.is_empty() {
        return Err(ResponseError::Empty);
    }

    let value: Value = serde_json::from_str(body)?;
    let object = value.as_object().ok_or(ResponseError::NotAnObject)?;

    let matched_id = match field(object, MATCHED_ID_FIELD)? {
        Value::Null => None,
        Value::String(s) => normalize_match(s),
        _ => {
            return Err(ResponseError::WrongType {
                field: MATCHED_ID_FIELD,
                expected: "a string or null",
            })
        }
    };

    let confidence = field(object, CONFIDENCE_FIELD)?
        .as_f64()
        .ok_or(ResponseError::WrongType {
            field: CONFIDENCE_FIELD,
            expected: "a number",
        })?;

    Ok(OracleAnswer {
        matched_id,
        confidence,
    })
}

fn field<'a>(object: &'a Map<String, Value>, name: &'static str) -> Result<&'a Value, ResponseError> {
    object.get(name).ok_or(ResponseError::MissingField(name))
}

fn normalize_match(raw: &str) -> Option<String> {
    let trimmed = raw.trim();
    let lowered = trimmed.to_ascii_lowercase();
    if NO_MATCH_SENTINELS.contains(&lowered.as_str()) {
        None
    } else {
        Some(trimmed.to_string())
    }
}

fn strip_code_fence(text: &str) -> &str {
    let Some(inner) = text.strip_prefix("```") else {
        return text;
    };
    let inner = inner.strip_suffix("```").unwrap_or(inner);
    // Drop an optional language tag such as `json`.
    match inner.split_once('\n') {
        Some((tag, rest)) if !tag.trim_start().starts_with('{') => rest.trim(),
        _ => inner.trim(),
    }
}
