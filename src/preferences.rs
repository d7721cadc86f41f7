use crate::consent::ConsentGate;
use crate::gated::GatedValue;
use crate::models::{ConsentCategory, Language, Theme};
use crate::storage::{keys, StorageManager};
use std::sync::Arc;
use tokio::sync::watch;

/// What the host environment tells us before any user choice exists.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SystemHints {
    pub prefers_dark: bool,
    pub locale: String,
}

impl Default for SystemHints {
    fn default() -> Self {
        Self {
            prefers_dark: false,
            locale: "en-US".to_string(),
        }
    }
}

impl SystemHints {
    pub fn theme(&self) -> Theme {
        if self.prefers_dark {
            Theme::Dark
        } else {
            Theme::Light
        }
    }

    pub fn language(&self) -> Language {
        if self.locale.to_ascii_lowercase().starts_with("bn") {
            Language::Bn
        } else {
            Language::En
        }
    }
}

/// Attributes applied to the document root by the rendering layer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RootAttributes {
    pub dark: bool,
    pub lang: &'static str,
}

/// Channel the rendering layer watches for root attribute changes. Theme and
/// language stores built over the same channel each update their half.
pub type RootChannel = Arc<watch::Sender<RootAttributes>>;

pub fn root_channel(hints: &SystemHints) -> RootChannel {
    let (tx, _) = watch::channel(root_attributes(hints.theme(), hints.language()));
    Arc::new(tx)
}

pub struct ThemeStore {
    value: GatedValue<Theme>,
    root: RootChannel,
}

impl ThemeStore {
    pub fn new(storage: StorageManager, consent: ConsentGate, hints: &SystemHints, root: RootChannel) -> Self {
        Self {
            value: GatedValue::new(
                keys::THEME,
                ConsentCategory::Preferences,
                storage,
                consent,
                hints.theme(),
            ),
            root,
        }
    }

    pub fn theme(&self) -> Theme {
        self.value.get()
    }

    pub async fn set_theme(&self, theme: Theme) {
        log::debug!("Theme set to {:?}", theme);
        self.value.set(theme).await;
        self.publish();
    }

    pub async fn toggle(&self) -> Theme {
        let theme = self.value.update(|t| *t = t.toggled()).await;
        self.publish();
        theme
    }

    pub async fn reconcile(&self) {
        self.value.reconcile().await;
        self.publish();
    }

    pub fn subscribe(&self) -> watch::Receiver<Theme> {
        self.value.subscribe()
    }

    fn publish(&self) {
        let dark = self.theme() == Theme::Dark;
        self.root.send_if_modified(|attrs| {
            let changed = attrs.dark != dark;
            attrs.dark = dark;
            changed
        });
    }
}

pub struct LanguageStore {
    value: GatedValue<Language>,
    root: RootChannel,
}

impl LanguageStore {
    pub fn new(storage: StorageManager, consent: ConsentGate, hints: &SystemHints, root: RootChannel) -> Self {
        Self {
            value: GatedValue::new(
                keys::LANGUAGE,
                ConsentCategory::Preferences,
                storage,
                consent,
                hints.language(),
            ),
            root,
        }
    }

    pub fn language(&self) -> Language {
        self.value.get()
    }

    pub async fn set_language(&self, language: Language) {
        log::debug!("Language set to {:?}", language);
        self.value.set(language).await;
        self.publish();
    }

    pub async fn toggle(&self) -> Language {
        let language = self.value.update(|l| *l = l.toggled()).await;
        self.publish();
        language
    }

    pub async fn reconcile(&self) {
        self.value.reconcile().await;
        self.publish();
    }

    pub fn subscribe(&self) -> watch::Receiver<Language> {
        self.value.subscribe()
    }

    fn publish(&self) {
        let lang = self.language().code();
        self.root.send_if_modified(|attrs| {
            let changed = attrs.lang != lang;
            attrs.lang = lang;
            changed
        });
    }
}

pub fn root_attributes(theme: Theme, language: Language) -> RootAttributes {
    RootAttributes {
        dark: theme == Theme::Dark,
        lang: language.code(),
    }
}
