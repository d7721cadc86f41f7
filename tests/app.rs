use async_trait::async_trait;
use pawhaven::api::{AssistantProvider, DeltaStream};
use pawhaven::chat::{TurnOutcome, GENERIC_ERROR};
use pawhaven::commands;
use pawhaven::models::{ChatMessage, ConsentStatus, Language, Theme, User};
use pawhaven::preferences::SystemHints;
use pawhaven::storage::{keys, StorageManager};
use pawhaven::{AppConfig, AppState};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

/// First request fails, later ones answer "Hello world" in three fragments.
#[derive(Default)]
struct FlakyAssistant {
    calls: AtomicUsize,
}

#[async_trait]
impl AssistantProvider for FlakyAssistant {
    async fn stream_reply(&self, _history: &[ChatMessage]) -> anyhow::Result<DeltaStream> {
        if self.calls.fetch_add(1, Ordering::SeqCst) == 0 {
            anyhow::bail!("network unreachable");
        }
        let parts = ["Hel", "lo", " world"].map(|p| Ok::<_, anyhow::Error>(p.to_string()));
        Ok(Box::pin(futures::stream::iter(parts)))
    }

    async fn reply(&self, _history: &[ChatMessage]) -> anyhow::Result<String> {
        Ok("### Essential Supplies\n### First Vet Visit\n### Preparing Your Home".to_string())
    }
}

fn test_config() -> AppConfig {
    AppConfig {
        submit_delay: Duration::ZERO,
        hints: SystemHints {
            prefers_dark: false,
            locale: "en-US".to_string(),
        },
        ..AppConfig::default()
    }
}

async fn app(storage: StorageManager) -> AppState {
    AppState::with_parts(storage, Arc::new(FlakyAssistant::default()), &test_config()).await
}

#[tokio::test]
async fn login_session_round_trip() {
    let storage = StorageManager::in_memory();
    let state = app(storage.clone()).await;

    let user = commands::login(&state, "jane@example.com".into(), "password123".into())
        .await
        .unwrap();
    assert_eq!(storage.get::<Option<User>>(keys::SESSION, None).await, Some(user.clone()));

    // Session survives a restart
    let restarted = app(storage.clone()).await;
    assert_eq!(commands::current_user(&restarted), Some(user));

    commands::logout(&restarted).await;
    assert!(!storage.contains(keys::SESSION).await);

    let err = commands::login(&restarted, "jane@example.com".into(), "wrong".into())
        .await
        .unwrap_err();
    assert_eq!(err, "Invalid email or password.");
}

#[tokio::test]
async fn declining_cookies_drops_stored_preferences() {
    let storage = StorageManager::in_memory();
    let state = app(storage.clone()).await;
    assert_eq!(commands::consent_status(&state), ConsentStatus::Pending);

    commands::set_consent(&state, ConsentStatus::All).await;
    commands::set_theme(&state, Theme::Dark).await;
    let attrs = commands::set_language(&state, Language::Bn).await;
    assert!(attrs.dark);
    assert_eq!(attrs.lang, "bn");
    commands::toggle_favorite(&state, 1).await;
    commands::send_chat_message(&state, "Hi".into()).await.unwrap();
    assert!(storage.contains(keys::CHAT_HISTORY).await);

    // A later visit restores everything
    let later = app(storage.clone()).await;
    assert_eq!(later.theme.theme(), Theme::Dark);
    assert_eq!(later.language.language(), Language::Bn);
    assert_eq!(commands::favorite_animals(&later)[0].id, 1);

    commands::set_consent(&later, ConsentStatus::NecessaryOnly).await;
    assert_eq!(later.theme.theme(), Theme::Light);
    assert_eq!(later.language.language(), Language::En);
    assert!(commands::favorite_animals(&later).is_empty());
    for key in [keys::THEME, keys::LANGUAGE, keys::FAVORITES, keys::CHAT_HISTORY] {
        assert!(!storage.contains(key).await, "{key} should be removed");
    }

    // Writes after revocation never reach storage
    commands::toggle_theme(&later).await;
    assert!(!storage.contains(keys::THEME).await);
    assert!(storage.contains(keys::CONSENT).await);
}

#[tokio::test]
async fn chat_failure_then_retry() {
    let state = app(StorageManager::in_memory()).await;

    let outcome = commands::send_chat_message(&state, "Hi".into()).await.unwrap();
    assert_eq!(outcome, TurnOutcome::Failed);
    let history = commands::chat_history(&state).await;
    assert_eq!(history.last().map(|m| m.text.as_str()), Some(GENERIC_ERROR));

    assert_eq!(commands::retry_chat(&state).await, TurnOutcome::Completed);
    let history = commands::chat_history(&state).await;
    assert_eq!(history.len(), 2);
    assert_eq!(history.iter().filter(|m| m.text == "Hi").count(), 1);
    assert_eq!(history[1].text, "Hello world");
    assert!(!history[1].is_error);

    assert!(commands::send_chat_message(&state, "  ".into()).await.is_err());
    commands::clear_chat(&state).await;
    assert!(commands::chat_history(&state).await.is_empty());
}

#[tokio::test]
async fn community_needs_a_logged_in_user() {
    let state = app(StorageManager::in_memory()).await;
    assert!(commands::create_post(&state, "Hello".into()).await.is_err());

    commands::signup(&state, "Tania".into(), "tania@example.com".into(), "pw".into())
        .await
        .unwrap();
    let post = commands::create_post(&state, "Hello".into()).await.unwrap();
    assert_eq!(post.author_name, "Tania");
    assert_eq!(commands::like_post(&state, post.id.to_string()).await, Ok(1));
    assert!(commands::like_post(&state, "not-a-uuid".into()).await.is_err());

    let err = commands::signup(&state, "Again".into(), "tania@example.com".into(), "pw".into())
        .await
        .unwrap_err();
    assert_eq!(err, "An account with this email already exists.");
}

#[tokio::test]
async fn checklist_uses_one_shot_reply() {
    let state = app(StorageManager::in_memory()).await;
    let checklist = commands::new_pet_checklist(&state, "puppy".into()).await.unwrap();
    assert!(checklist.contains("### First Vet Visit"));
    assert!(commands::chat_history(&state).await.is_empty());
}
