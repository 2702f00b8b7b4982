use std::fmt;

use serde::{Deserialize, Serialize};

use crate::shared::constants::DEFAULT_MEDIA_TYPE;

/// A self-describing, text-safe image: `data:<media-type>;base64,<payload>`.
///
/// The wrapper is kept as-is even when malformed. Accessors degrade to
/// passthrough/default values instead of failing.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EncodedImage(String);

impl EncodedImage {
    pub fn new(data_uri: impl Into<String>) -> Self {
        Self(data_uri.into())
    }

    /// Builds a data URI from a media type and an already base64-encoded payload.
    pub fn from_parts(media_type: &str, payload: &str) -> Self {
        Self(format!("data:{media_type};base64,{payload}"))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn payload(&self) -> &str {
        strip_payload(&self.0)
    }

    pub fn media_type(&self) -> &str {
        extract_media_type(&self.0)
    }
}

impl fmt::Display for EncodedImage {
    /// Prints the media type and payload size, never the payload itself.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({} bytes)", self.media_type(), self.payload().len())
    }
}

impl From<String> for EncodedImage {
    fn from(value: String) -> Self {
        Self(value)
    }
}

/// Returns the payload after the wrapper's `,` separator.
///
/// Inputs that do not split into exactly two parts are returned unchanged.
pub fn strip_payload(encoded: &str) -> &str {
    let mut parts = encoded.split(',');
    match (parts.next(), parts.next(), parts.next()) {
        (Some(_), Some(payload), None) => payload,
        _ => encoded,
    }
}

/// Returns the declared `type/subtype` of a data URI, or [`DEFAULT_MEDIA_TYPE`].
pub fn extract_media_type(encoded: &str) -> &str {
    parse_media_type(encoded).unwrap_or(DEFAULT_MEDIA_TYPE)
}

fn parse_media_type(encoded: &str) -> Option<&str> {
    let start = encoded.find("data:")? + "data:".len();
    let rest = &encoded[start..];
    if !rest.contains(',') {
        return None;
    }

    let kind_len = rest
        .find(|c: char| !c.is_ascii_alphanumeric())
        .unwrap_or(rest.len());
    if kind_len == 0 || !rest[kind_len..].starts_with('/') {
        return None;
    }
    let subtype = &rest[kind_len + 1..];
    let subtype_len = subtype
        .find(|c: char| !(c.is_ascii_alphanumeric() || matches!(c, '-' | '.' | '+')))
        .unwrap_or(subtype.len());
    if subtype_len == 0 {
        return None;
    }
    Some(&rest[..kind_len + 1 + subtype_len])
}

/// True when a media type names an image (`image/*`).
pub fn is_image_type(media_type: &str) -> bool {
    media_type
        .trim()
        .to_ascii_lowercase()
        .starts_with("image/")
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[test]
    fn test_strip_payload_returns_data_after_separator() {
        assert_eq!(strip_payload("data:image/png;base64,AAAA"), "AAAA");
    }

    #[rstest]
    #[case::no_separator("AAAA")]
    #[case::two_separators("data:image/png;base64,AA,AA")]
    fn test_strip_payload_passthrough_when_malformed(#[case] input: &str) {
        assert_eq!(strip_payload(input), input);
    }

    #[rstest]
    #[case::png("data:image/png;base64,AAAA", "image/png")]
    #[case::svg_plus("data:image/svg+xml;base64,AAAA", "image/svg+xml")]
    #[case::dotted("data:image/vnd.ms-photo;base64,AAAA", "image/vnd.ms-photo")]
    #[case::no_params("data:image/webp,AAAA", "image/webp")]
    #[case::trailing_path("data:image/png/x;base64,AAAA", "image/png")]
    fn test_extract_media_type_parses_declared_type(#[case] input: &str, #[case] expected: &str) {
        assert_eq!(extract_media_type(input), expected);
    }

    #[rstest]
    #[case::empty("")]
    #[case::raw_payload("AAAA")]
    #[case::missing_subtype("data:image;base64,AAAA")]
    #[case::no_separator("data:image/png;base64")]
    #[case::missing_type("data:;base64,AAAA")]
    #[case::empty_subtype("data:image/;base64,AAAA")]
    fn test_extract_media_type_defaults_when_unparseable(#[case] input: &str) {
        assert_eq!(extract_media_type(input), DEFAULT_MEDIA_TYPE);
    }

    #[test]
    fn test_from_parts_round_trips_through_accessors() {
        let image = EncodedImage::from_parts("image/gif", "R0lG");
        assert_eq!(image.as_str(), "data:image/gif;base64,R0lG");
        assert_eq!(image.media_type(), "image/gif");
        assert_eq!(image.payload(), "R0lG");
    }

    #[test]
    fn test_display_hides_payload() {
        let image = EncodedImage::from_parts("image/png", "QUJD");
        assert_eq!(image.to_string(), "image/png (4 bytes)");
    }

    #[rstest]
    #[case("image/png", true)]
    #[case("IMAGE/JPEG", true)]
    #[case(" image/webp", true)]
    #[case("text/plain", false)]
    #[case("application/pdf", false)]
    #[case("", false)]
    fn test_is_image_type(#[case] media_type: &str, #[case] expected: bool) {
        assert_eq!(is_image_type(media_type), expected);
    }
}
