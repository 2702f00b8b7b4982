use std::collections::HashMap;

use serde::Serialize;

use crate::shared::analyzed_photo::AnalyzedPhoto;
use crate::shared::identity::{Identity, IdentityId};

/// Label of the bar that collects photos without a resolvable identity.
pub const UNKNOWN_LABEL: &str = "Unknown";

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
pub struct ScanStatistics {
    pub total: usize,
    pub recognized: usize,
    pub unknown: usize,
}

impl ScanStatistics {
    /// A photo counts as recognized only while its token still names a
    /// registered identity. Tokens of removed identities count as unknown.
    pub fn compute(identities: &[Identity], photos: &[AnalyzedPhoto]) -> Self {
        let recognized = photos
            .iter()
            .filter(|p| resolve(identities, p).is_some())
            .count();
        Self {
            total: photos.len(),
            recognized,
            unknown: photos.len() - recognized,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum PhotoFilter {
    All,
    Unknown,
    Identity(IdentityId),
}

impl PhotoFilter {
    pub fn accepts(&self, identities: &[Identity], photo: &AnalyzedPhoto) -> bool {
        match self {
            PhotoFilter::All => true,
            PhotoFilter::Unknown => resolve(identities, photo).is_none(),
            PhotoFilter::Identity(id) => resolve(identities, photo).is_some_and(|i| &i.id == id),
        }
    }
}

/// Keeps the photos accepted by `filter`, preserving their order.
pub fn filter_photos(
    filter: &PhotoFilter,
    identities: &[Identity],
    photos: &[AnalyzedPhoto],
) -> Vec<AnalyzedPhoto> {
    photos
        .iter()
        .filter(|p| filter.accepts(identities, p))
        .cloned()
        .collect()
}

/// The identity a photo's token currently resolves to, if any.
pub fn resolve<'a>(identities: &'a [Identity], photo: &AnalyzedPhoto) -> Option<&'a Identity> {
    let id = photo.matched_identity_id.as_ref()?;
    identities.iter().find(|i| &i.id == id)
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct ActivityBar {
    /// `None` for the unknown bar.
    pub identity_id: Option<IdentityId>,
    pub label: String,
    pub count: usize,
    /// `count` relative to the largest bar, in `[0, 1]`.
    pub width: f64,
}

/// Photo counts per identity plus one unknown bar, largest first.
///
/// Ties keep registration order with the unknown bar last.
pub fn activity(identities: &[Identity], photos: &[AnalyzedPhoto]) -> Vec<ActivityBar> {
    let mut counts: HashMap<&IdentityId, usize> = HashMap::new();
    let mut unknown = 0;
    for photo in photos {
        match resolve(identities, photo) {
            Some(identity) => *counts.entry(&identity.id).or_default() += 1,
            None => unknown += 1,
        }
    }

    let mut bars: Vec<ActivityBar> = identities
        .iter()
        .map(|i| ActivityBar {
            identity_id: Some(i.id.clone()),
            label: i.name.clone(),
            count: counts.get(&i.id).copied().unwrap_or(0),
            width: 0.0,
        })
        .collect();
    bars.push(ActivityBar {
        identity_id: None,
        label: UNKNOWN_LABEL.to_string(),
        count: unknown,
        width: 0.0,
    });

    bars.sort_by(|a, b| b.count.cmp(&a.count));

    let max = bars.iter().map(|b| b.count).max().unwrap_or(0).max(1) as f64;
    for bar in &mut bars {
        bar.width = bar.count as f64 / max;
    }
    bars
}
