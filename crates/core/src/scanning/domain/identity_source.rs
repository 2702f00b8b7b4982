use crate::shared::identity::Identity;

/// Read-only view of the registered identities.
///
/// Called once per classification so identities added or removed mid-batch
/// affect only items that have not been classified yet.
pub trait IdentitySource: Send + Sync {
    fn identities(&self) -> Vec<Identity>;
}
