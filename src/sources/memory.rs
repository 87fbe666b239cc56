//! An in-memory template source.

use std::sync::RwLock;

use async_trait::async_trait;

use super::Source;
use crate::error::SourceError;
use rustc_hash::FxHashMap;

/// A mutable map of template bodies, handy for tests and embedded use.
#[derive(Debug, Default)]
pub struct MemorySource {
    templates: RwLock<FxHashMap<String, String>>,
}

impl MemorySource {
    /// An empty source.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds or replaces a template body.
    pub fn insert(&self, path: &str, body: &str) {
        self.templates
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .insert(path.to_string(), body.to_string());
    }

    /// Removes a template body.
    pub fn remove(&self, path: &str) -> bool {
        self.templates
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .remove(path)
            .is_some()
    }
}

#[async_trait]
impl Source for MemorySource {
    async fn read(&self, path: &str) -> Result<Vec<u8>, SourceError> {
        self.templates
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .get(path)
            .map(|body| body.clone().into_bytes())
            .ok_or_else(|| SourceError::NotFound(path.to_string()))
    }
}
