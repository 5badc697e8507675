use dirg::config::SyncConfig;
use tracing::{info, warn};

fn local_storage() -> Option<web_sys::Storage> {
    web_sys::window().and_then(|w| w.local_storage().ok().flatten())
}

pub(super) fn local_storage_get_string(key: &str) -> Option<String> {
    local_storage().and_then(|s| s.get_item(key).ok().flatten())
}

/// Sync config override from `localStorage`, falling back to defaults.
pub(super) fn load_sync_config() -> SyncConfig {
    let Some(raw) = local_storage_get_string(super::LOCALSTORAGE_SYNC_CONFIG_KEY) else {
        return SyncConfig::default();
    };
    match SyncConfig::from_json(&raw) {
        Ok(cfg) => {
            info!("Using stored sync config ({})", super::LOCALSTORAGE_SYNC_CONFIG_KEY);
            cfg
        }
        Err(e) => {
            warn!("Ignoring stored sync config: {}", e);
            SyncConfig::default()
        }
    }
}
