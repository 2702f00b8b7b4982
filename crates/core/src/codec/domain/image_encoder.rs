use thiserror::Error;

use crate::codec::domain::encoded_image::EncodedImage;
use crate::codec::domain::source_file::SourceFile;

#[derive(Error, Debug)]
pub enum EncodeError {
    #[error("failed to read {name}: {source}")]
    Read {
        name: String,
        #[source]
        source: std::io::Error,
    },
    #[error("{name} is empty")]
    Empty { name: String },
}

/// Domain interface for turning a raw file into a transport-ready image.
pub trait ImageEncoder: Send + Sync {
    fn encode(&self, file: &dyn SourceFile) -> Result<EncodedImage, EncodeError>;
}
