use std::sync::{PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use crate::codec::domain::encoded_image::EncodedImage;
use crate::codec::domain::image_encoder::{EncodeError, ImageEncoder};
use crate::codec::domain::source_file::SourceFile;
use crate::scanning::domain::analysis_sink::AnalysisSink;
use crate::scanning::domain::identity_source::IdentitySource;
use crate::shared::analyzed_photo::AnalyzedPhoto;
use crate::shared::identity::{Identity, IdentityId};

/// In-memory state of one tagging session: registered identities and the
/// photos analyzed so far.
///
/// Shared as `Arc<SessionStore>` between the scanner (as identity source and
/// analysis sink) and whatever presents results. Nothing is persisted.
#[derive(Default)]
pub struct SessionStore {
    identities: RwLock<Vec<Identity>>,
    photos: RwLock<Vec<AnalyzedPhoto>>,
}

impl SessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_identity(&self, name: impl Into<String>, reference_image: EncodedImage) -> Identity {
        let identity = Identity::new(name, reference_image);
        log::info!("Registered identity {} ({})", identity.name, identity.id);
        write(&self.identities).push(identity.clone());
        identity
    }

    /// Encodes `file` as the reference image and registers it under `name`.
    pub fn register_identity(
        &self,
        name: impl Into<String>,
        file: &dyn SourceFile,
        encoder: &dyn ImageEncoder,
    ) -> Result<Identity, EncodeError> {
        let image = encoder.encode(file)?;
        Ok(self.add_identity(name, image))
    }

    /// Existing photos keep their token; it simply stops resolving.
    pub fn remove_identity(&self, id: &IdentityId) -> bool {
        let mut identities = write(&self.identities);
        let before = identities.len();
        identities.retain(|i| &i.id != id);
        let removed = identities.len() != before;
        if removed {
            log::info!("Removed identity {id}");
        }
        removed
    }

    pub fn identities(&self) -> Vec<Identity> {
        read(&self.identities).clone()
    }

    pub fn identity(&self, id: &IdentityId) -> Option<Identity> {
        read(&self.identities).iter().find(|i| &i.id == id).cloned()
    }

    pub fn identity_count(&self) -> usize {
        read(&self.identities).len()
    }

    pub fn add_photo(&self, photo: AnalyzedPhoto) {
        write(&self.photos).push(photo);
    }

    /// Newest first.
    pub fn photos(&self) -> Vec<AnalyzedPhoto> {
        read(&self.photos).iter().rev().cloned().collect()
    }

    pub fn photo_count(&self) -> usize {
        read(&self.photos).len()
    }
}

impl IdentitySource for SessionStore {
    fn identities(&self) -> Vec<Identity> {
        SessionStore::identities(self)
    }
}

impl AnalysisSink for SessionStore {
    fn on_analysis_complete(&self, photo: AnalyzedPhoto) {
        self.add_photo(photo);
    }
}

fn read<T>(lock: &RwLock<T>) -> RwLockReadGuard<'_, T> {
    lock.read().unwrap_or_else(PoisonError::into_inner)
}

fn write<T>(lock: &RwLock<T>) -> RwLockWriteGuard<'_, T> {
    lock.write().unwrap_or_else(PoisonError::into_inner)
}
