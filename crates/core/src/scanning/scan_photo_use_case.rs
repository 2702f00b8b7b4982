use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Instant;

use thiserror::Error;

use crate::codec::domain::image_encoder::{EncodeError, ImageEncoder};
use crate::codec::domain::source_file::SourceFile;
use crate::recognition::recognition_client::RecognitionClient;
use crate::scanning::domain::identity_source::IdentitySource;
use crate::scanning::scan_logger::ScanLogger;
use crate::shared::analyzed_photo::AnalyzedPhoto;

#[derive(Error, Debug)]
pub enum ScanError {
    #[error(transparent)]
    Encode(#[from] EncodeError),
    #[error("cancelled")]
    Cancelled,
}

/// Single-photo pipeline: encode → snapshot identities → classify → record.
///
/// The cancellation flag is checked before and after each blocking step.
/// An oracle call already in flight runs to completion; its answer is then
/// discarded.
pub struct ScanPhotoUseCase {
    encoder: Box<dyn ImageEncoder>,
    client: RecognitionClient,
    identities: Arc<dyn IdentitySource>,
}

impl ScanPhotoUseCase {
    pub fn new(
        encoder: Box<dyn ImageEncoder>,
        client: RecognitionClient,
        identities: Arc<dyn IdentitySource>,
    ) -> Self {
        Self {
            encoder,
            client,
            identities,
        }
    }

    pub fn execute(
        &self,
        file: &dyn SourceFile,
        cancelled: &AtomicBool,
        logger: &mut dyn ScanLogger,
    ) -> Result<AnalyzedPhoto, ScanError> {
        check(cancelled)?;

        let t = Instant::now();
        let image = self.encoder.encode(file)?;
        logger.timing("encode", elapsed_ms(t));

        check(cancelled)?;

        let references = self.identities.identities();
        logger.metric("identities", references.len() as f64);

        let t = Instant::now();
        let result = self.client.classify(&image, &references);
        logger.timing("classify", elapsed_ms(t));

        check(cancelled)?;

        log::debug!(
            "{}: {:?} (match {:?}, confidence {:.2})",
            file.name(),
            result.reason,
            result.matched_identity_id,
            result.confidence
        );
        Ok(AnalyzedPhoto::analyzed(file.name(), image, result))
    }
}

fn check(cancelled: &AtomicBool) -> Result<(), ScanError> {
    if cancelled.load(Ordering::Relaxed) {
        Err(ScanError::Cancelled)
    } else {
        Ok(())
    }
}

fn elapsed_ms(start: Instant) -> f64 {
    start.elapsed().as_secs_f64() * 1000.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::domain::encoded_image::EncodedImage;
    use crate::codec::infrastructure::data_uri_encoder::DataUriEncoder;
    use crate::codec::infrastructure::in_memory_file::InMemoryFile;
    use crate::recognition::domain::oracle_request::OracleRequest;
    use crate::recognition::domain::recognition_oracle::RecognitionOracle;
    use crate::scanning::scan_logger::{NullScanLogger, StdoutScanLogger};
    use crate::shared::analyzed_photo::PhotoStatus;
    use crate::shared::identity::{Identity, IdentityId};
    use approx::assert_relative_eq;
    use chrono::Utc;
    use std::sync::atomic::AtomicUsize;
    use std::sync::Mutex;

    // --- Stubs ---

    struct FixedOracle {
        reply: String,
        calls: Arc<AtomicUsize>,
        cancel_on_call: Option<Arc<AtomicBool>>,
    }

    impl RecognitionOracle for FixedOracle {
        fn generate(&self, _request: &OracleRequest) -> Result<String, Box<dyn std::error::Error>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if let Some(flag) = &self.cancel_on_call {
                flag.store(true, Ordering::SeqCst);
            }
            Ok(self.reply.clone())
        }
    }

    struct StaticIdentities(Mutex<Vec<Identity>>);

    impl IdentitySource for StaticIdentities {
        fn identities(&self) -> Vec<Identity> {
            self.0.lock().unwrap().clone()
        }
    }

    // --- Helpers ---

    fn identity(id: &str) -> Identity {
        Identity {
            id: IdentityId::new(id),
            name: id.to_string(),
            reference_image: EncodedImage::from_parts("image/png", "REF"),
            created_at: Utc::now(),
        }
    }

    fn use_case(
        reply: &str,
        identities: Vec<Identity>,
        cancel_on_call: Option<Arc<AtomicBool>>,
    ) -> (ScanPhotoUseCase, Arc<AtomicUsize>) {
        let calls = Arc::new(AtomicUsize::new(0));
        let oracle = FixedOracle {
            reply: reply.to_string(),
            calls: calls.clone(),
            cancel_on_call,
        };
        let uc = ScanPhotoUseCase::new(
            Box::new(DataUriEncoder::new()),
            RecognitionClient::new(Box::new(oracle)),
            Arc::new(StaticIdentities(Mutex::new(identities))),
        );
        (uc, calls)
    }

    fn jpeg(name: &str) -> InMemoryFile {
        InMemoryFile::new(name, Some("image/jpeg"), b"jpeg bytes".to_vec())
    }

    // --- Tests ---

    #[test]
    fn test_match_becomes_analyzed_photo() {
        let (uc, calls) = use_case(r#"{"matchedId":"A","confidence":0.92}"#, vec![identity("A")], None);

        let photo = uc
            .execute(&jpeg("one.jpg"), &AtomicBool::new(false), &mut NullScanLogger)
            .unwrap();

        assert_eq!(photo.matched_identity_id, Some(IdentityId::new("A")));
        assert_relative_eq!(photo.confidence, 0.92);
        assert_eq!(photo.status, PhotoStatus::Analyzed);
        assert_eq!(photo.source_name, "one.jpg");
        assert_eq!(photo.image.media_type(), "image/jpeg");
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_no_identities_is_unknown_without_oracle_call() {
        let (uc, calls) = use_case(r#"{"matchedId":"A","confidence":0.92}"#, vec![], None);

        let photo = uc
            .execute(&jpeg("one.jpg"), &AtomicBool::new(false), &mut NullScanLogger)
            .unwrap();

        assert_eq!(photo.matched_identity_id, None);
        assert_eq!(photo.confidence, 0.0);
        assert_eq!(photo.status, PhotoStatus::Analyzed);
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_encode_failure_is_error() {
        let (uc, calls) = use_case("{}", vec![identity("A")], None);
        let empty = InMemoryFile::new("empty.jpg", Some("image/jpeg"), Vec::new());

        let err = uc
            .execute(&empty, &AtomicBool::new(false), &mut NullScanLogger)
            .unwrap_err();

        assert!(matches!(err, ScanError::Encode(EncodeError::Empty { .. })));
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_cancelled_before_start_does_nothing() {
        let (uc, calls) = use_case("{}", vec![identity("A")], None);

        let err = uc
            .execute(&jpeg("one.jpg"), &AtomicBool::new(true), &mut NullScanLogger)
            .unwrap_err();

        assert!(matches!(err, ScanError::Cancelled));
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_cancel_during_classify_discards_answer() {
        let flag = Arc::new(AtomicBool::new(false));
        let (uc, calls) = use_case(
            r#"{"matchedId":"A","confidence":0.9}"#,
            vec![identity("A")],
            Some(flag.clone()),
        );

        let err = uc
            .execute(&jpeg("one.jpg"), &flag, &mut NullScanLogger)
            .unwrap_err();

        assert!(matches!(err, ScanError::Cancelled));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_records_stage_timings() {
        let (uc, _) = use_case(r#"{"matchedId":null,"confidence":0.1}"#, vec![identity("A")], None);
        let mut logger = StdoutScanLogger::new(1);

        uc.execute(&jpeg("one.jpg"), &AtomicBool::new(false), &mut logger)
            .unwrap();

        assert_eq!(logger.timings_for("encode").unwrap().len(), 1);
        assert_eq!(logger.timings_for("classify").unwrap().len(), 1);
        assert_eq!(logger.metrics_for("identities").unwrap(), &[1.0]);
    }
}
