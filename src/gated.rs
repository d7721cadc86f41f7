//! A value whose persistence is conditional on consent.
//!
//! Two paths touch storage:
//! - [`GatedValue::reconcile`] runs when the consent status changes. It loads the
//!   stored value if the category is granted and falls back otherwise.
//! - [`GatedValue::set`] / [`GatedValue::update`] change the value.
//!
//! Both end in the same apply step: publish to subscribers, then persist when
//! granted or remove the key when not. Nothing else writes the key.

use crate::consent::ConsentGate;
use crate::models::ConsentCategory;
use crate::storage::StorageManager;
use serde::de::DeserializeOwned;
use serde::Serialize;
use tokio::sync::{watch, Mutex};

pub struct GatedValue<T> {
    key: &'static str,
    category: ConsentCategory,
    storage: StorageManager,
    consent: ConsentGate,
    fallback: T,
    value: watch::Sender<T>,
    // Serializes apply steps so the last write wins
    apply_lock: Mutex<()>,
}

impl<T> GatedValue<T>
where
    T: Clone + Serialize + DeserializeOwned + Send + Sync + 'static,
{
    /// Starts at `fallback`; call [`reconcile`](Self::reconcile) to pick up a
    /// stored value.
    pub fn new(
        key: &'static str,
        category: ConsentCategory,
        storage: StorageManager,
        consent: ConsentGate,
        fallback: T,
    ) -> Self {
        let (tx, _) = watch::channel(fallback.clone());
        Self {
            key,
            category,
            storage,
            consent,
            fallback,
            value: tx,
            apply_lock: Mutex::new(()),
        }
    }

    pub fn get(&self) -> T {
        self.value.borrow().clone()
    }

    pub fn with<R>(&self, f: impl FnOnce(&T) -> R) -> R {
        f(&self.value.borrow())
    }

    pub fn fallback(&self) -> &T {
        &self.fallback
    }

    pub fn subscribe(&self) -> watch::Receiver<T> {
        self.value.subscribe()
    }

    pub fn is_granted(&self) -> bool {
        self.consent.has_consent(self.category)
    }

    pub async fn reconcile(&self) {
        let _guard = self.apply_lock.lock().await;
        let next = if self.is_granted() {
            match self.storage.get::<Option<T>>(self.key, None).await {
                Some(stored) => stored,
                None => self.fallback.clone(),
            }
        } else {
            self.fallback.clone()
        };
        log::debug!("Reconciled \"{}\" (granted: {})", self.key, self.is_granted());
        self.value.send_replace(next.clone());
        self.persist(&next).await;
    }

    pub async fn set(&self, value: T) {
        let _guard = self.apply_lock.lock().await;
        self.value.send_replace(value.clone());
        self.persist(&value).await;
    }

    /// Read-modify-write under the apply lock. Returns the new value.
    pub async fn update(&self, f: impl FnOnce(&mut T)) -> T {
        let _guard = self.apply_lock.lock().await;
        let mut next = self.get();
        f(&mut next);
        self.value.send_replace(next.clone());
        self.persist(&next).await;
        next
    }

    async fn persist(&self, value: &T) {
        if self.is_granted() {
            self.storage.set(self.key, value).await;
        } else {
            self.storage.remove(self.key).await;
        }
    }
}
