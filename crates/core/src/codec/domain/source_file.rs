/// A raw file handed to the pipeline: a name for display, an optional
/// declared media type, and bytes that may only be readable once asked for.
pub trait SourceFile: Send {
    fn name(&self) -> &str;

    /// Media type the file claims to have, e.g. derived from its extension.
    fn declared_type(&self) -> Option<&str>;

    fn read(&self) -> Result<Vec<u8>, std::io::Error>;
}
