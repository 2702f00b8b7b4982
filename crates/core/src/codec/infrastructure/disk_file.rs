use std::fs;
use std::path::{Path, PathBuf};

use crate::codec::domain::source_file::SourceFile;

/// A file on disk. The declared type comes from the extension only; the
/// bytes are not read until [`SourceFile::read`] is called.
#[derive(Clone, Debug)]
pub struct DiskFile {
    path: PathBuf,
    name: String,
    declared_type: Option<&'static str>,
}

impl DiskFile {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());
        let declared_type = image::ImageFormat::from_path(&path)
            .ok()
            .map(|format| format.to_mime_type());
        Self {
            path,
            name,
            declared_type,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl SourceFile for DiskFile {
    fn name(&self) -> &str {
        &self.name
    }

    fn declared_type(&self) -> Option<&str> {
        self.declared_type
    }

    fn read(&self) -> Result<Vec<u8>, std::io::Error> {
        fs::read(&self.path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use tempfile::TempDir;

    #[rstest]
    #[case::jpeg("portrait.jpg", Some("image/jpeg"))]
    #[case::upper_case("PORTRAIT.PNG", Some("image/png"))]
    #[case::webp("portrait.webp", Some("image/webp"))]
    #[case::text("notes.txt", None)]
    #[case::no_extension("README", None)]
    fn test_declared_type_from_extension(#[case] file_name: &str, #[case] expected: Option<&str>) {
        let file = DiskFile::new(Path::new("/photos").join(file_name));
        assert_eq!(file.declared_type(), expected);
    }

    #[test]
    fn test_name_is_file_name() {
        let file = DiskFile::new("/photos/2024/beach.jpg");
        assert_eq!(file.name(), "beach.jpg");
        assert_eq!(file.path(), Path::new("/photos/2024/beach.jpg"));
    }

    #[test]
    fn test_read_returns_bytes() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("face.png");
        fs::write(&path, b"pixels").unwrap();

        assert_eq!(DiskFile::new(&path).read().unwrap(), b"pixels");
    }

    #[test]
    fn test_read_missing_file_fails() {
        let tmp = TempDir::new().unwrap();
        let file = DiskFile::new(tmp.path().join("gone.png"));
        assert!(file.read().is_err());
    }
}
