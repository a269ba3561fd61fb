mod settings;

pub use settings::{ConfigError, ModelProvider, Settings};

use std::sync::{Arc, Mutex};

lazy_static::lazy_static! {
    static ref SETTINGS: Mutex<Option<Arc<Settings>>> = Mutex::new(None);
}

/// Process-wide settings. The first call loads and validates the environment;
/// every later call returns the same instance.
pub fn get_settings() -> Result<Arc<Settings>, ConfigError> {
    let mut slot = SETTINGS.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
    if let Some(settings) = slot.as_ref() {
        return Ok(Arc::clone(settings));
    }

    let settings = Arc::new(Settings::load()?);
    tracing::debug!(provider = %settings.model_provider, "Loaded settings");
    *slot = Some(Arc::clone(&settings));
    Ok(settings)
}
