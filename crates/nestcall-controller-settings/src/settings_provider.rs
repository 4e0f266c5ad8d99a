use std::sync::Arc;

use arc_swap::ArcSwap;

use crate::{Result, Settings};

/// Loads and holds the runtime settings, allowing a subset of fields to be reloaded
/// without restarting the process.
#[derive(Debug, Clone)]
pub struct SettingsProvider {
    settings: Arc<ArcSwap<Settings>>,
}

impl SettingsProvider {
    pub fn load(file_name: &str) -> Result<Self> {
        Ok(Self::new(Arc::new(Settings::load(file_name)?)))
    }

    pub fn new(settings: Arc<Settings>) -> Self {
        Self {
            settings: Arc::new(ArcSwap::new(settings)),
        }
    }

    /// A snapshot of the current settings. Later reloads do not affect values
    /// already handed out this way.
    pub fn get(&self) -> Arc<Settings> {
        self.settings.load_full()
    }

    /// Reloads `ice`, `recording_queue`, `signaling`, `recorder`, `api`, and
    /// `metrics` from `config_path` — the fields that can safely change without
    /// restarting the HTTP listener. `http` and `logging` require a process restart
    /// and are left untouched.
    pub fn reload(&self, config_path: &str) -> Result<()> {
        let new_settings = Settings::load(config_path)?;
        let mut current = (*self.settings.load_full()).clone();

        current.ice = new_settings.ice;
        current.recording_queue = new_settings.recording_queue;
        current.signaling = new_settings.signaling;
        current.recorder = new_settings.recorder;
        current.api = new_settings.api;
        current.metrics = new_settings.metrics;

        self.settings.store(Arc::new(current));
        Ok(())
    }
}
