// Handlers called by the view layer. Business errors stop here and are turned
// into the message shown to the visitor.

use crate::catalog::AnimalFilter;
use crate::chat::TurnOutcome;
use crate::community::NewMemorial;
use crate::config;
use crate::forms::{AdoptionApplication, Receipt, RescueReport, VolunteerApplication};
use crate::models::{Animal, ChatMessage, ConsentStatus, Language, Memorial, Post, Theme, User, Vet};
use crate::preferences::RootAttributes;
use crate::state::AppState;
use crate::vets::VetQuery;
use uuid::Uuid;

// --- Auth ---

pub async fn login(state: &AppState, email: String, password: String) -> Result<User, String> {
    log::info!("Frontend requested login for {}", email);
    state.auth.login(&email, &password).await.map_err(|e| e.to_string())
}

pub async fn signup(state: &AppState, name: String, email: String, password: String) -> Result<User, String> {
    log::info!("Frontend requested signup for {}", email);
    state
        .auth
        .signup(&name, &email, &password)
        .await
        .map_err(|e| e.to_string())
}

pub async fn logout(state: &AppState) {
    state.auth.logout().await;
}

pub fn current_user(state: &AppState) -> Option<User> {
    state.auth.current_user()
}

// --- Consent and preferences ---

pub fn consent_status(state: &AppState) -> ConsentStatus {
    state.consent.status()
}

pub async fn set_consent(state: &AppState, status: ConsentStatus) {
    state.set_consent(status).await;
}

pub async fn set_theme(state: &AppState, theme: Theme) -> RootAttributes {
    state.theme.set_theme(theme).await;
    state.root_attributes()
}

pub async fn toggle_theme(state: &AppState) -> RootAttributes {
    state.theme.toggle().await;
    state.root_attributes()
}

pub async fn set_language(state: &AppState, language: Language) -> RootAttributes {
    state.language.set_language(language).await;
    state.root_attributes()
}

pub async fn toggle_language(state: &AppState) -> RootAttributes {
    state.language.toggle().await;
    state.root_attributes()
}

// --- Animals and favorites ---

pub fn list_animals(state: &AppState, filter: AnimalFilter) -> Vec<Animal> {
    state.catalog.filter(&filter).into_iter().cloned().collect()
}

pub fn get_animal(state: &AppState, animal_id: u32) -> Result<Animal, String> {
    state
        .catalog
        .get(animal_id)
        .cloned()
        .ok_or_else(|| format!("Animal with ID {} not found", animal_id))
}

pub async fn toggle_favorite(state: &AppState, animal_id: u32) -> bool {
    state.favorites.toggle(animal_id).await
}

pub fn favorite_animals(state: &AppState) -> Vec<Animal> {
    state
        .catalog
        .resolve_favorites(&state.favorites.ids())
        .into_iter()
        .cloned()
        .collect()
}

// --- Assistant chat ---

pub async fn chat_history(state: &AppState) -> Vec<ChatMessage> {
    state.chat.history().await
}

pub async fn send_chat_message(state: &AppState, content: String) -> Result<TurnOutcome, String> {
    if content.trim().is_empty() {
        return Err("Message cannot be empty.".to_string());
    }
    match state.chat.send(&content).await {
        TurnOutcome::Busy => Err("Please wait for the current reply to finish.".to_string()),
        outcome => Ok(outcome),
    }
}

pub async fn retry_chat(state: &AppState) -> TurnOutcome {
    state.chat.retry().await
}

pub async fn clear_chat(state: &AppState) {
    log::warn!("[CMD] Frontend requested to clear the chat");
    state.chat.clear().await;
}

pub async fn new_pet_checklist(state: &AppState, pet: String) -> Result<String, String> {
    let prompt = format!("Create a new pet checklist for a new {}.", pet.trim());
    state.chat.ask_once(&prompt).await.map_err(|e| {
        log::error!("Failed to generate checklist: {:?}", e);
        crate::chat::GENERIC_ERROR.to_string()
    })
}

pub fn set_assistant_api_key(api_key: String) -> Result<(), String> {
    config::set_api_key_in_keyring(api_key.trim()).map_err(|e| {
        log::error!("Failed to store API key: {:?}", e);
        format!("Failed to store API key: {}", e)
    })
}

// --- Community ---

pub async fn list_posts(state: &AppState) -> Vec<Post> {
    state.community.posts().await
}

pub async fn create_post(state: &AppState, content: String) -> Result<Post, String> {
    let user = state.auth.current_user();
    state
        .community
        .create_post(user.as_ref(), &content)
        .await
        .map_err(|e| e.to_string())
}

pub async fn like_post(state: &AppState, post_id: String) -> Result<u32, String> {
    let Ok(post_uuid) = Uuid::parse_str(&post_id) else {
        let err_msg = format!("Invalid post ID format: {}", post_id);
        log::error!("{}", err_msg);
        return Err(err_msg);
    };
    state.community.like_post(post_uuid).await.map_err(|e| e.to_string())
}

pub async fn list_memorials(state: &AppState) -> Vec<Memorial> {
    state.memorials.memorials().await
}

pub async fn add_memorial(state: &AppState, entry: NewMemorial) -> Result<Memorial, String> {
    state.memorials.add_memorial(entry).await.map_err(|e| e.to_string())
}

// --- Vets ---

pub fn search_vets(state: &AppState, query: VetQuery) -> Vec<Vet> {
    state.vets.search(&query).into_iter().cloned().collect()
}

// --- Forms ---

pub async fn submit_adoption(state: &AppState, form: AdoptionApplication) -> Result<Receipt, String> {
    state
        .forms
        .submit_adoption(&state.catalog, &form)
        .await
        .map_err(|e| e.to_string())
}

pub async fn submit_volunteer(state: &AppState, form: VolunteerApplication) -> Result<Receipt, String> {
    state.forms.submit_volunteer(&form).await.map_err(|e| e.to_string())
}

pub async fn submit_rescue_report(state: &AppState, form: RescueReport) -> Result<Receipt, String> {
    state.forms.submit_rescue_report(&form).await.map_err(|e| e.to_string())
}
