use base64::engine::general_purpose::STANDARD;
use base64::Engine;

use crate::codec::domain::encoded_image::EncodedImage;
use crate::codec::domain::image_encoder::{EncodeError, ImageEncoder};
use crate::codec::domain::source_file::SourceFile;
use crate::shared::constants::DEFAULT_MEDIA_TYPE;

/// Encodes files as base64 data URIs.
///
/// Media type precedence: the file's declared type, then the format sniffed
/// from the leading bytes, then [`DEFAULT_MEDIA_TYPE`].
#[derive(Debug, Default, Clone, Copy)]
pub struct DataUriEncoder;

impl DataUriEncoder {
    pub fn new() -> Self {
        Self
    }
}

impl ImageEncoder for DataUriEncoder {
    fn encode(&self, file: &dyn SourceFile) -> Result<EncodedImage, EncodeError> {
        let bytes = file.read().map_err(|e| EncodeError::Read {
            name: file.name().to_string(),
            source: e,
        })?;
        if bytes.is_empty() {
            return Err(EncodeError::Empty {
                name: file.name().to_string(),
            });
        }

        let media_type = file
            .declared_type()
            .map(str::to_string)
            .or_else(|| sniff_media_type(&bytes))
            .unwrap_or_else(|| DEFAULT_MEDIA_TYPE.to_string());

        Ok(EncodedImage::from_parts(&media_type, &STANDARD.encode(&bytes)))
    }
}

fn sniff_media_type(bytes: &[u8]) -> Option<String> {
    image::guess_format(bytes)
        .ok()
        .map(|format| format.to_mime_type().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::infrastructure::in_memory_file::InMemoryFile;

    const PNG_MAGIC: &[u8] = &[0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A, 0, 0];

    struct UnreadableFile;

    impl SourceFile for UnreadableFile {
        fn name(&self) -> &str {
            "broken.jpg"
        }

        fn declared_type(&self) -> Option<&str> {
            Some("image/jpeg")
        }

        fn read(&self) -> Result<Vec<u8>, std::io::Error> {
            Err(std::io::Error::new(std::io::ErrorKind::Other, "disk gone"))
        }
    }

    #[test]
    fn test_encodes_declared_type_and_base64_payload() {
        let file = InMemoryFile::new("a.jpg", Some("image/jpeg"), b"abc".to_vec());

        let encoded = DataUriEncoder::new().encode(&file).unwrap();

        assert_eq!(encoded.as_str(), "data:image/jpeg;base64,YWJj");
    }

    #[test]
    fn test_sniffs_type_when_undeclared() {
        let file = InMemoryFile::new("blob", None, PNG_MAGIC.to_vec());

        let encoded = DataUriEncoder::new().encode(&file).unwrap();

        assert_eq!(encoded.media_type(), "image/png");
    }

    #[test]
    fn test_defaults_type_when_undeclared_and_unrecognized() {
        let file = InMemoryFile::new("blob", None, b"not an image".to_vec());

        let encoded = DataUriEncoder::new().encode(&file).unwrap();

        assert_eq!(encoded.media_type(), DEFAULT_MEDIA_TYPE);
    }

    #[test]
    fn test_empty_file_is_an_error() {
        let file = InMemoryFile::new("empty.png", Some("image/png"), Vec::new());

        let err = DataUriEncoder::new().encode(&file).unwrap_err();

        assert!(matches!(err, EncodeError::Empty { .. }));
        assert!(err.to_string().contains("empty.png"));
    }

    #[test]
    fn test_read_failure_is_an_error() {
        let err = DataUriEncoder::new().encode(&UnreadableFile).unwrap_err();

        assert!(matches!(err, EncodeError::Read { .. }));
        assert!(err.to_string().contains("disk gone"));
    }
}
