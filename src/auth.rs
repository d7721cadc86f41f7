//! Mock account directory and current session.
//!
//! The directory lives in local storage and is seeded on first access. Only a
//! salted SHA-256 digest of each password is kept. Session persistence is
//! treated as necessary storage and ignores the consent gate.

use crate::error::AuthError;
use crate::models::{Account, User};
use crate::storage::{keys, StorageManager};
use chrono::Utc;
use sha2::{Digest, Sha256};
use tokio::sync::{watch, Mutex};
use uuid::Uuid;

const SEED_USERS: &[(i64, &str, &str, &str)] = &[
    (1, "Jane Doe", "jane@example.com", "password123"),
    (2, "John Smith", "john@example.com", "password456"),
];

fn hash_password(salt: &str, password: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(salt.as_bytes());
    hasher.update(b":");
    hasher.update(password.as_bytes());
    format!("{:x}", hasher.finalize())
}

fn new_account(id: i64, name: &str, email: &str, password: &str) -> Account {
    let salt = Uuid::new_v4().simple().to_string();
    Account {
        id,
        name: name.to_string(),
        email: email.to_string(),
        password_hash: hash_password(&salt, password),
        salt,
    }
}

fn seed_accounts() -> Vec<Account> {
    SEED_USERS
        .iter()
        .map(|(id, name, email, password)| new_account(*id, name, email, password))
        .collect()
}

pub struct AuthStore {
    storage: StorageManager,
    // None until first access
    directory: Mutex<Option<Vec<Account>>>,
    session: watch::Sender<Option<User>>,
}

impl AuthStore {
    /// Restores any persisted session. The directory is read lazily.
    pub async fn load(storage: StorageManager) -> Self {
        let session: Option<User> = storage.get(keys::SESSION, None).await;
        if let Some(user) = &session {
            log::info!("Restored session for user {}", user.id);
        }
        let (tx, _) = watch::channel(session);
        Self {
            storage,
            directory: Mutex::new(None),
            session: tx,
        }
    }

    pub fn current_user(&self) -> Option<User> {
        self.session.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<Option<User>> {
        self.session.subscribe()
    }

    pub async fn login(&self, email: &str, password: &str) -> Result<User, AuthError> {
        let mut slot = self.directory.lock().await;
        let accounts = self.accounts(&mut slot).await;

        // Exact, case-sensitive match on email
        let user = accounts
            .iter()
            .find(|a| a.email == email && a.password_hash == hash_password(&a.salt, password))
            .map(Account::to_user);
        drop(slot);

        match user {
            Some(user) => {
                log::info!("User {} logged in", user.id);
                self.set_session(Some(user.clone())).await;
                Ok(user)
            }
            None => {
                log::warn!("Failed login attempt for {}", email);
                Err(AuthError::Authentication("Invalid email or password.".to_string()))
            }
        }
    }

    pub async fn signup(&self, name: &str, email: &str, password: &str) -> Result<User, AuthError> {
        if name.trim().is_empty() || email.trim().is_empty() || password.is_empty() {
            return Err(AuthError::Invalid("Name, email and password are required.".to_string()));
        }

        let mut slot = self.directory.lock().await;
        let accounts = self.accounts(&mut slot).await;

        if accounts.iter().any(|a| a.email == email) {
            log::warn!("Signup rejected, email already registered: {}", email);
            return Err(AuthError::Conflict("An account with this email already exists.".to_string()));
        }

        let mut id = Utc::now().timestamp_millis();
        while accounts.iter().any(|a| a.id == id) {
            id += 1;
        }
        let account = new_account(id, name.trim(), email, password);
        let user = account.to_user();
        accounts.push(account);
        self.storage.set(keys::USERS, accounts.as_slice()).await;
        drop(slot);

        log::info!("Created account {} for {}", user.id, user.email);
        self.set_session(Some(user.clone())).await;
        Ok(user)
    }

    pub async fn logout(&self) {
        if let Some(user) = self.current_user() {
            log::info!("User {} logged out", user.id);
        }
        self.set_session(None).await;
    }

    pub async fn directory_len(&self) -> usize {
        let mut slot = self.directory.lock().await;
        self.accounts(&mut slot).await.len()
    }

    async fn set_session(&self, user: Option<User>) {
        match &user {
            Some(u) => self.storage.set(keys::SESSION, u).await,
            None => self.storage.remove(keys::SESSION).await,
        }
        self.session.send_replace(user);
    }

    async fn accounts<'a>(&self, slot: &'a mut Option<Vec<Account>>) -> &'a mut Vec<Account> {
        if slot.is_none() {
            let stored: Option<Vec<Account>> = self.storage.get(keys::USERS, None).await;
            let accounts = match stored {
                Some(accounts) => accounts,
                None => {
                    log::info!("No user directory found, seeding {} accounts", SEED_USERS.len());
                    let seeded = seed_accounts();
                    self.storage.set(keys::USERS, &seeded).await;
                    seeded
                }
            };
            *slot = Some(accounts);
        }
        slot.get_or_insert_with(Vec::new)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn seeded_user_logs_in_without_password_field() {
        let storage = StorageManager::in_memory();
        let auth = AuthStore::load(storage.clone()).await;

        let user = auth.login("jane@example.com", "password123").await.unwrap();
        assert_eq!(user.email, "jane@example.com");
        assert_eq!(auth.current_user(), Some(user.clone()));

        let raw: serde_json::Value = storage.get(keys::SESSION, serde_json::Value::Null).await;
        assert!(raw.get("password").is_none());
        assert_eq!(storage.get::<Option<User>>(keys::SESSION, None).await, Some(user));
    }

    #[tokio::test]
    async fn wrong_password_is_an_authentication_error() {
        let auth = AuthStore::load(StorageManager::in_memory()).await;
        let err = auth.login("jane@example.com", "wrong").await.unwrap_err();
        assert!(matches!(err, AuthError::Authentication(_)));
        assert!(auth.current_user().is_none());
    }

    #[tokio::test]
    async fn email_match_is_case_sensitive() {
        let auth = AuthStore::load(StorageManager::in_memory()).await;
        assert!(auth.login("Jane@Example.com", "password123").await.is_err());
    }

    #[tokio::test]
    async fn duplicate_signup_conflicts_and_leaves_directory_alone() {
        let storage = StorageManager::in_memory();
        let auth = AuthStore::load(storage.clone()).await;
        auth.signup("Ana", "ana@example.com", "pw1").await.unwrap();
        let before = auth.directory_len().await;
        let stored_before: serde_json::Value = storage.get(keys::USERS, serde_json::Value::Null).await;

        let err = auth.signup("Other", "ana@example.com", "pw2").await.unwrap_err();
        assert!(matches!(err, AuthError::Conflict(_)));
        assert_eq!(auth.directory_len().await, before);
        assert_eq!(storage.get(keys::USERS, serde_json::Value::Null).await, stored_before);
    }

    #[tokio::test]
    async fn signup_persists_account_and_starts_session() {
        let storage = StorageManager::in_memory();
        let auth = AuthStore::load(storage.clone()).await;
        let user = auth.signup("Rahim", "rahim@example.com", "secret").await.unwrap();
        assert_eq!(auth.current_user(), Some(user.clone()));

        // A fresh store over the same storage sees the account and the session
        let reloaded = AuthStore::load(storage).await;
        assert_eq!(reloaded.current_user(), Some(user));
        assert!(reloaded.login("rahim@example.com", "secret").await.is_ok());
    }

    #[tokio::test]
    async fn directory_never_holds_plaintext() {
        let storage = StorageManager::in_memory();
        let auth = AuthStore::load(storage.clone()).await;
        auth.signup("Mina", "mina@example.com", "hunter2").await.unwrap();
        let raw: serde_json::Value = storage.get(keys::USERS, serde_json::Value::Null).await;
        assert!(!raw.to_string().contains("hunter2"));
    }

    #[tokio::test]
    async fn logout_removes_session_key() {
        let storage = StorageManager::in_memory();
        let auth = AuthStore::load(storage.clone()).await;
        auth.login("john@example.com", "password456").await.unwrap();
        assert!(storage.contains(keys::SESSION).await);

        auth.logout().await;
        assert!(auth.current_user().is_none());
        assert!(!storage.contains(keys::SESSION).await);
    }
}
