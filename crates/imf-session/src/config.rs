use std::sync::Mutex;

use imf_core::types::{Configuration, EnterKeyType, TextInputType};

/// Last configuration pushed by the application. Survives detach and
/// reattach; only a new configuration replaces it.
#[derive(Debug, Default)]
pub struct ConfigCache {
    inner: Mutex<Configuration>,
}

impl ConfigCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn update(&self, config: Configuration) {
        *self.inner.lock().unwrap_or_else(|e| e.into_inner()) = config;
    }

    pub fn get(&self) -> Configuration {
        *self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }

    pub fn enter_key_type(&self) -> EnterKeyType {
        self.get().enter_key_type
    }

    pub fn input_pattern(&self) -> TextInputType {
        self.get().text_input_type
    }
}
