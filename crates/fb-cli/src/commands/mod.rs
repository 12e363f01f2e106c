pub mod export;
pub mod list;
pub mod read;
pub mod resume;
pub mod show;

use std::env;
use std::path::Path;

use colored::Colorize;
use fb_api::{ApiConfig, ENV_API_URL, HttpStoryBackend};
use fb_core::{Session, SessionId};
use fb_reader::{SessionStore, load_snapshot, save_snapshot};

/// Load the store file, reporting anything that could not be restored.
fn open_store(path: &Path) -> Result<SessionStore, String> {
    let snapshot = load_snapshot(path).map_err(|e| e.to_string())?;
    let (store, report) = SessionStore::hydrate(snapshot);

    for (id, reason) in &report.unusable {
        eprintln!(
            "  {} session {id} is unusable: {reason}",
            "warning:".yellow().bold()
        );
    }
    for id in &report.duplicates {
        eprintln!(
            "  {} duplicate session {id} ignored",
            "warning:".yellow().bold()
        );
    }
    if let Some(id) = &report.dropped_current {
        eprintln!(
            "  {} current session {id} is no longer available",
            "warning:".yellow().bold()
        );
    }
    Ok(store)
}

/// Write the store file.
fn save_store(path: &Path, store: &SessionStore) -> Result<(), String> {
    save_snapshot(path, &store.snapshot()).map_err(|e| e.to_string())
}

/// Look up a session by id in a freshly opened store.
fn find_session(path: &Path, id: &str) -> Result<Session, String> {
    let store = open_store(path)?;
    store
        .get_session(&SessionId::new(id))
        .cloned()
        .map_err(|e| e.to_string())
}

/// Build the HTTP backend; `--api-url` takes precedence over the environment.
fn backend(api_url: Option<&str>) -> Result<HttpStoryBackend, String> {
    let config = match api_url {
        Some(url) => ApiConfig::from_lookup(|key| match key {
            ENV_API_URL => Some(url.to_string()),
            _ => env::var(key).ok(),
        }),
        None => ApiConfig::from_env(),
    }
    .map_err(|e| e.to_string())?;
    HttpStoryBackend::new(&config).map_err(|e| e.to_string())
}

/// Single-threaded runtime for the interactive reader.
fn runtime() -> Result<tokio::runtime::Runtime, String> {
    tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .map_err(|e| format!("cannot start runtime: {e}"))
}
