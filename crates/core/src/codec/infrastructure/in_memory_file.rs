use crate::codec::domain::source_file::SourceFile;

/// A file whose bytes are already in memory, e.g. an upload body.
#[derive(Clone, Debug)]
pub struct InMemoryFile {
    name: String,
    declared_type: Option<String>,
    bytes: Vec<u8>,
}

impl InMemoryFile {
    pub fn new(name: impl Into<String>, declared_type: Option<&str>, bytes: Vec<u8>) -> Self {
        Self {
            name: name.into(),
            declared_type: declared_type.map(str::to_string),
            bytes,
        }
    }
}

impl SourceFile for InMemoryFile {
    fn name(&self) -> &str {
        &self.name
    }

    fn declared_type(&self) -> Option<&str> {
        self.declared_type.as_deref()
    }

    fn read(&self) -> Result<Vec<u8>, std::io::Error> {
        Ok(self.bytes.clone())
    }
}
