use crate::shared::analyzed_photo::AnalyzedPhoto;

/// Receives each successfully analyzed photo exactly once, in completion order.
pub trait AnalysisSink: Send + Sync {
    fn on_analysis_complete(&self, photo: AnalyzedPhoto);
}
