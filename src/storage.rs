use anyhow::Context;
use async_trait::async_trait;
use dashmap::DashMap;
use serde::de::DeserializeOwned;
use serde::Serialize;
use sqlx::{migrate::MigrateDatabase, sqlite::SqlitePoolOptions, Row, Sqlite, SqlitePool};
use std::path::Path;
use std::sync::Arc;

// Every persisted concern lives under its own namespaced key
pub mod keys {
    pub const CONSENT: &str = "pawhaven:consent";
    pub const USERS: &str = "pawhaven:users";
    pub const SESSION: &str = "pawhaven:session";
    pub const THEME: &str = "pawhaven:theme";
    pub const LANGUAGE: &str = "pawhaven:language";
    pub const FAVORITES: &str = "pawhaven:favorites";
    pub const CHAT_HISTORY: &str = "pawhaven:chat_history";
    pub const COMMUNITY_POSTS: &str = "pawhaven:community_posts";
    pub const MEMORIALS: &str = "pawhaven:memorials";
}

const MIGRATIONS_SQL: &str = "
-- Application state (Key-Value, JSON encoded values)
CREATE TABLE IF NOT EXISTS settings (
    key TEXT PRIMARY KEY NOT NULL,
    value TEXT NOT NULL
);
";

/// Raw durable key-value storage. Implementations may fail; the
/// [`StorageManager`] in front of them never lets those failures escape.
#[async_trait]
pub trait KeyValueBackend: Send + Sync {
    async fn read(&self, key: &str) -> anyhow::Result<Option<String>>;
    async fn write(&self, key: &str, value: String) -> anyhow::Result<()>;
    async fn delete(&self, key: &str) -> anyhow::Result<()>;
}

#[derive(Debug)]
pub struct SqliteBackend {
    pool: SqlitePool,
}

impl SqliteBackend {
    /// Opens (creating if needed) the database at `db_path` and runs migrations.
    pub async fn open(db_path: &Path) -> Result<Self, anyhow::Error> {
        // Ensure the parent directory exists
        if let Some(parent) = db_path.parent() {
            tokio::fs::create_dir_all(parent).await.context("Failed to create database directory")?;
        }

        let db_url = format!("sqlite://{}?mode=rwc", db_path.to_string_lossy());
        log::info!("Connecting to database: {}", db_url);

        if !Sqlite::database_exists(&db_url).await.unwrap_or(false) {
            log::info!("Database file not found, creating...");
            Sqlite::create_database(&db_url).await.context("Failed to create database")?;
        }

        let pool = SqlitePoolOptions::new()
            .connect(&db_url)
            .await
            .context("Failed to connect to SQLite database")?;

        Self::run_migrations(&pool).await?;

        Ok(Self { pool })
    }

    async fn run_migrations(pool: &SqlitePool) -> Result<(), anyhow::Error> {
        log::info!("Running database migrations...");
        sqlx::query(MIGRATIONS_SQL)
            .execute(pool)
            .await
            .context("Failed to run database migrations")?;
        log::info!("Database migrations completed.");
        Ok(())
    }
}

#[async_trait]
impl KeyValueBackend for SqliteBackend {
    async fn read(&self, key: &str) -> anyhow::Result<Option<String>> {
        let row = sqlx::query("SELECT value FROM settings WHERE key = ?")
            .bind(key)
            .fetch_optional(&self.pool)
            .await
            .context("Failed to read setting")?;
        match row {
            Some(r) => Ok(Some(r.try_get::<String, _>("value").context("Invalid setting row")?)),
            None => Ok(None),
        }
    }

    async fn write(&self, key: &str, value: String) -> anyhow::Result<()> {
        sqlx::query(
            r#"
            INSERT INTO settings (key, value) VALUES (?, ?)
            ON CONFLICT(key) DO UPDATE SET value = excluded.value
            "#,
        )
        .bind(key)
        .bind(value)
        .execute(&self.pool)
        .await
        .context("Failed to write setting")?;
        Ok(())
    }

    async fn delete(&self, key: &str) -> anyhow::Result<()> {
        sqlx::query("DELETE FROM settings WHERE key = ?")
            .bind(key)
            .execute(&self.pool)
            .await
            .context("Failed to delete setting")?;
        Ok(())
    }
}

/// Process-local backend for ephemeral profiles and tests.
#[derive(Debug, Default)]
pub struct MemoryBackend {
    entries: DashMap<String, String>,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl KeyValueBackend for MemoryBackend {
    async fn read(&self, key: &str) -> anyhow::Result<Option<String>> {
        Ok(self.entries.get(key).map(|v| v.value().clone()))
    }

    async fn write(&self, key: &str, value: String) -> anyhow::Result<()> {
        self.entries.insert(key.to_string(), value);
        Ok(())
    }

    async fn delete(&self, key: &str) -> anyhow::Result<()> {
        self.entries.remove(key);
        Ok(())
    }
}

/// JSON adapter over a [`KeyValueBackend`]. Reads fall back to a default and
/// writes are best effort; every failure is logged and absorbed here.
#[derive(Clone)]
pub struct StorageManager {
    backend: Arc<dyn KeyValueBackend>,
}

impl StorageManager {
    pub fn new(backend: Arc<dyn KeyValueBackend>) -> Self {
        Self { backend }
    }

    pub async fn open_sqlite(db_path: &Path) -> Result<Self, anyhow::Error> {
        let backend = SqliteBackend::open(db_path).await?;
        Ok(Self::new(Arc::new(backend)))
    }

    pub fn in_memory() -> Self {
        Self::new(Arc::new(MemoryBackend::new()))
    }

    pub async fn get<T: DeserializeOwned>(&self, key: &str, default: T) -> T {
        let raw = match self.backend.read(key).await {
            Ok(Some(raw)) => raw,
            Ok(None) => return default,
            Err(e) => {
                log::error!("Error reading storage key \"{}\": {:?}", key, e);
                return default;
            }
        };
        match serde_json::from_str(&raw) {
            Ok(value) => value,
            Err(e) => {
                log::error!("Error parsing storage key \"{}\": {}", key, e);
                default
            }
        }
    }

    pub async fn set<T: Serialize + ?Sized>(&self, key: &str, value: &T) {
        let raw = match serde_json::to_string(value) {
            Ok(raw) => raw,
            Err(e) => {
                log::error!("Error serializing storage key \"{}\": {}", key, e);
                return;
            }
        };
        if let Err(e) = self.backend.write(key, raw).await {
            log::error!("Error setting storage key \"{}\": {:?}", key, e);
        }
    }

    pub async fn remove(&self, key: &str) {
        if let Err(e) = self.backend.delete(key).await {
            log::error!("Error removing storage key \"{}\": {:?}", key, e);
        }
    }

    pub async fn contains(&self, key: &str) -> bool {
        matches!(self.backend.read(key).await, Ok(Some(_)))
    }
}
