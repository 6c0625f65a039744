//! Registry of alert plugins, keyed by plugin id.

use std::{collections::HashMap, sync::Arc};

use tracing::info;

use crate::plugin::AlertPlugin;

/// Alert plugins available to the host, looked up by id at trigger time.
#[derive(Default)]
pub struct AlertRegistry {
    plugins: HashMap<String, Arc<dyn AlertPlugin>>,
}

impl AlertRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a plugin. A plugin registered under an id that is already
    /// taken replaces the previous one.
    pub fn register(&mut self, plugin: Arc<dyn AlertPlugin>) {
        let id = plugin.id().to_string();
        info!(plugin = %id, name = plugin.name(), "registered alert plugin");
        self.plugins.insert(id, plugin);
    }

    pub fn get(&self, id: &str) -> Option<Arc<dyn AlertPlugin>> {
        self.plugins.get(id).cloned()
    }

    /// Ids of all registered plugins, sorted for stable listings.
    pub fn ids(&self) -> Vec<String> {
        let mut ids: Vec<String> = self.plugins.keys().cloned().collect();
        ids.sort();
        ids
    }
}
