use crate::models::{ConsentCategory, ConsentStatus};
use crate::storage::{keys, StorageManager};
use tokio::sync::watch;

/// Remembers the visitor's cookie choice and answers whether a non-essential
/// category may touch storage. The choice itself is always persisted.
#[derive(Clone)]
pub struct ConsentGate {
    storage: StorageManager,
    status: watch::Sender<ConsentStatus>,
}

impl ConsentGate {
    pub async fn load(storage: StorageManager) -> Self {
        let status = storage.get(keys::CONSENT, ConsentStatus::Pending).await;
        log::debug!("Loaded consent status: {:?}", status);
        let (tx, _) = watch::channel(status);
        Self { storage, status: tx }
    }

    pub fn status(&self) -> ConsentStatus {
        *self.status.borrow()
    }

    pub fn has_consent(&self, category: ConsentCategory) -> bool {
        // Categories are granted together
        match category {
            ConsentCategory::Preferences | ConsentCategory::Functional => {
                self.status() == ConsentStatus::All
            }
        }
    }

    pub fn is_pending(&self) -> bool {
        self.status() == ConsentStatus::Pending
    }

    /// Records the choice only. Gated stores are reconciled by
    /// [`AppState::set_consent`](crate::state::AppState::set_consent), which is
    /// the public entry point.
    pub(crate) async fn set_consent(&self, status: ConsentStatus) {
        log::info!("Consent changed to {:?}", status);
        self.status.send_replace(status);
        match status {
            ConsentStatus::Pending => self.storage.remove(keys::CONSENT).await,
            _ => self.storage.set(keys::CONSENT, &status).await,
        }
    }

    pub fn subscribe(&self) -> watch::Receiver<ConsentStatus> {
        self.status.subscribe()
    }
}
