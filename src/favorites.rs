use crate::consent::ConsentGate;
use crate::gated::GatedValue;
use crate::models::ConsentCategory;
use crate::storage::{keys, StorageManager};
use std::collections::BTreeSet;

/// Animals the visitor has hearted. Kept per browser profile, not per user.
pub struct FavoritesStore {
    ids: GatedValue<BTreeSet<u32>>,
}

impl FavoritesStore {
    pub fn new(storage: StorageManager, consent: ConsentGate) -> Self {
        Self {
            ids: GatedValue::new(
                keys::FAVORITES,
                ConsentCategory::Functional,
                storage,
                consent,
                BTreeSet::new(),
            ),
        }
    }

    /// Adds `id` if absent, removes it if present. Returns whether it is now a favorite.
    /// The set stays empty until functional storage is allowed.
    pub async fn toggle(&self, id: u32) -> bool {
        if !self.ids.is_granted() {
            log::debug!("Ignoring favorite toggle for {} without consent", id);
            return false;
        }
        let next = self
            .ids
            .update(|ids| {
                if !ids.remove(&id) {
                    ids.insert(id);
                }
            })
            .await;
        next.contains(&id)
    }

    pub fn is_favorite(&self, id: u32) -> bool {
        self.ids.with(|ids| ids.contains(&id))
    }

    pub fn ids(&self) -> BTreeSet<u32> {
        self.ids.get()
    }

    pub fn count(&self) -> usize {
        self.ids.with(|ids| ids.len())
    }

    pub async fn reconcile(&self) {
        self.ids.reconcile().await;
    }
}
