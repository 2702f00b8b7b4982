use crate::recognition::domain::oracle_request::OracleRequest;

/// Domain interface for the external recognition service.
///
/// Returns the raw structured answer as text. Interpretation and validation
/// of that text belong to the caller, which treats it as untrusted.
pub trait RecognitionOracle: Send + Sync {
    fn generate(&self, request: &OracleRequest) -> Result<String, Box<dyn std::error::Error>>;
}
