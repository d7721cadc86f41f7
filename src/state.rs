use crate::api::{AssistantProvider, GeminiProvider};
use crate::auth::AuthStore;
use crate::catalog::Catalog;
use crate::chat::ChatSession;
use crate::community::{CommunityFeed, MemorialWall};
use crate::config::AppConfig;
use crate::consent::ConsentGate;
use crate::favorites::FavoritesStore;
use crate::forms::FormService;
use crate::models::ConsentStatus;
use crate::preferences::{root_channel, LanguageStore, RootAttributes, RootChannel, ThemeStore};
use crate::storage::StorageManager;
use crate::vets::VetDirectory;
use std::sync::Arc;
use tokio::sync::watch;

// Core application state handed to every command. Constructed once at
// startup and cloned cheaply into background tasks.
#[derive(Clone)]
pub struct AppState {
    pub storage: StorageManager,
    pub consent: ConsentGate,
    pub auth: Arc<AuthStore>,
    pub theme: Arc<ThemeStore>,
    pub language: Arc<LanguageStore>,
    pub favorites: Arc<FavoritesStore>,
    pub chat: Arc<ChatSession>,
    pub catalog: Arc<Catalog>,
    pub community: Arc<CommunityFeed>,
    pub memorials: Arc<MemorialWall>,
    pub vets: Arc<VetDirectory>,
    pub forms: Arc<FormService>,
    root: RootChannel,
}

impl AppState {
    /// Opens the SQLite store at the configured path and wires every service.
    pub async fn new(config: &AppConfig) -> Result<Self, anyhow::Error> {
        let storage = StorageManager::open_sqlite(&config.database_path).await?;
        let api_provider: Arc<dyn AssistantProvider> = Arc::new(GeminiProvider::from_config(config));
        Ok(Self::with_parts(storage, api_provider, config).await)
    }

    pub async fn with_parts(
        storage: StorageManager,
        api_provider: Arc<dyn AssistantProvider>,
        config: &AppConfig,
    ) -> Self {
        let consent = ConsentGate::load(storage.clone()).await;
        let auth = AuthStore::load(storage.clone()).await;
        let root = root_channel(&config.hints);

        let state = Self {
            theme: Arc::new(ThemeStore::new(storage.clone(), consent.clone(), &config.hints, root.clone())),
            language: Arc::new(LanguageStore::new(
                storage.clone(),
                consent.clone(),
                &config.hints,
                root.clone(),
            )),
            favorites: Arc::new(FavoritesStore::new(storage.clone(), consent.clone())),
            chat: Arc::new(ChatSession::new(api_provider, storage.clone(), consent.clone())),
            community: Arc::new(CommunityFeed::new(storage.clone())),
            memorials: Arc::new(MemorialWall::new(storage.clone())),
            catalog: Arc::new(Catalog::default()),
            vets: Arc::new(VetDirectory::default()),
            forms: Arc::new(FormService::new(config.submit_delay)),
            auth: Arc::new(auth),
            consent,
            storage,
            root,
        };
        state.reconcile_gated().await;
        log::info!("Application state ready (consent: {:?})", state.consent.status());
        state
    }

    /// Records the cookie choice and re-runs every gated store's load step.
    pub async fn set_consent(&self, status: ConsentStatus) {
        self.consent.set_consent(status).await;
        self.reconcile_gated().await;
    }

    pub fn root_attributes(&self) -> RootAttributes {
        self.root.borrow().clone()
    }

    /// Root attributes as the rendering layer should apply them.
    pub fn subscribe_root(&self) -> watch::Receiver<RootAttributes> {
        self.root.subscribe()
    }

    async fn reconcile_gated(&self) {
        self.theme.reconcile().await;
        self.language.reconcile().await;
        self.favorites.reconcile().await;
        self.chat.reconcile().await;
    }
}
