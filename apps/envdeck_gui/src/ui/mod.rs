//! UI layer: app shell, environment panels, dialogs, and toasts.

pub mod app;
pub mod dialogs;
pub mod panels;
pub mod toasts;

pub use app::{ConsoleApp, PersistedConsoleSettings, SETTINGS_STORAGE_KEY};
