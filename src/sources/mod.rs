//! Template sources: named byte providers and the keyed registry.
//!
//! A [`Source`] resolves a template path to bytes. The [`SourceSet`]
//! registers sources under names and resolves an [`AstKey`] either
//! against one named source or, for the default scope `$`, against the
//! registered search order. Malformed keys are rejected before any
//! fetch happens.

mod file;
mod memory;

pub use file::FileSource;
pub use memory::MemorySource;

use std::sync::Arc;
use std::sync::RwLock;

use async_trait::async_trait;
use rustc_hash::FxHashMap;
use tracing::trace;

use crate::ast::AstKey;
use crate::error::SourceError;

/// The default-scope sentinel: search all sources in registration order.
pub const DEFAULT_SOURCE: &str = "$";

/// A named provider of template bytes.
#[async_trait]
pub trait Source: Send + Sync {
    /// Reads the bytes of `path`.
    async fn read(&self, path: &str) -> Result<Vec<u8>, SourceError>;
}

/// Validates a user-supplied source name.
///
/// `$` alone is the default scope; any other `$`-prefixed name is
/// reserved, and `:` never belongs in a name.
pub(crate) fn validate_source_name(name: &str) -> Result<(), SourceError> {
    if name.is_empty() {
        return Err(SourceError::IllegalAccess(
            "source name may not be empty".to_string(),
        ));
    }
    if name != DEFAULT_SOURCE && name.starts_with('$') {
        return Err(SourceError::IllegalAccess(format!(
            "source name \"{name}\" is reserved"
        )));
    }
    if name.contains(':') {
        return Err(SourceError::IllegalAccess(format!(
            "source name \"{name}\" may not contain ':'"
        )));
    }
    Ok(())
}

/// Validates a template path within a key.
pub(crate) fn validate_path(path: &str) -> Result<(), SourceError> {
    if path.contains(':') {
        return Err(SourceError::IllegalAccess(format!(
            "template path \"{path}\" may not contain ':'"
        )));
    }
    Ok(())
}

/// A name-indexed registry of sources with a search order.
#[derive(Default)]
pub struct SourceSet {
    sources: RwLock<FxHashMap<String, Arc<dyn Source>>>,
    order: RwLock<Vec<String>>,
}

impl SourceSet {
    /// An empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// A registry with a single source registered as `default`.
    pub fn singleton(source: Arc<dyn Source>) -> Self {
        let set = Self::new();
        // A fresh set accepts any legal name.
        let _ = set.register("default", source);
        set
    }

    /// Registers a source and appends it to the search order.
    pub fn register(&self, name: &str, source: Arc<dyn Source>) -> Result<(), SourceError> {
        validate_source_name(name)?;
        if name == DEFAULT_SOURCE {
            return Err(SourceError::IllegalAccess(
                "the default scope cannot be registered directly".to_string(),
            ));
        }
        let mut sources = self
            .sources
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        if !sources.contains_key(name) {
            self.order
                .write()
                .unwrap_or_else(|poisoned| poisoned.into_inner())
                .push(name.to_string());
        }
        sources.insert(name.to_string(), source);
        Ok(())
    }

    /// The registered names in search order.
    pub fn search_order(&self) -> Vec<String> {
        self.order
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }

    fn get(&self, name: &str) -> Option<Arc<dyn Source>> {
        self.sources
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .get(name)
            .cloned()
    }

    /// Resolves a key to `(origin name, bytes)`.
    ///
    /// An explicit source is consulted directly; the default scope walks
    /// the search order, skipping not-found and surfacing any other
    /// failure immediately.
    pub async fn find(&self, key: &AstKey) -> Result<(String, Vec<u8>), SourceError> {
        validate_source_name(&key.source)?;
        validate_path(&key.path)?;

        if key.source != DEFAULT_SOURCE {
            let source = self.get(&key.source).ok_or_else(|| {
                SourceError::IllegalAccess(format!("no source named \"{}\"", key.source))
            })?;
            let bytes = source.read(&key.path).await?;
            return Ok((key.source.clone(), bytes));
        }

        for name in self.search_order() {
            let Some(source) = self.get(&name) else {
                continue;
            };
            match source.read(&key.path).await {
                Ok(bytes) => {
                    trace!(source = %name, path = %key.path, "source hit");
                    return Ok((name, bytes));
                }
                Err(SourceError::NotFound(_)) => continue,
                Err(other) => return Err(other),
            }
        }
        Err(SourceError::NotFound(key.path.clone()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn set_with(sources: &[(&str, &[(&str, &str)])]) -> SourceSet {
        let set = SourceSet::new();
        for (name, templates) in sources {
            let source = MemorySource::new();
            for (path, body) in *templates {
                source.insert(path, body);
            }
            set.register(name, Arc::new(source)).unwrap();
        }
        set
    }

    #[tokio::test]
    async fn explicit_source_is_consulted_directly() {
        let set = set_with(&[("a", &[("t", "from a")]), ("b", &[("t", "from b")])]);
        let (origin, bytes) = set.find(&AstKey::new("b", "t")).await.unwrap();
        assert_eq!(origin, "b");
        assert_eq!(bytes, b"from b");
    }

    #[tokio::test]
    async fn default_scope_walks_registration_order() {
        let set = set_with(&[("a", &[]), ("b", &[("t", "found")])]);
        let (origin, bytes) = set.find(&AstKey::default_scoped("t")).await.unwrap();
        assert_eq!(origin, "b");
        assert_eq!(bytes, b"found");
    }

    #[tokio::test]
    async fn missing_everywhere_is_not_found() {
        let set = set_with(&[("a", &[])]);
        assert!(matches!(
            set.find(&AstKey::default_scoped("ghost")).await,
            Err(SourceError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn unregistered_explicit_source_is_illegal() {
        let set = set_with(&[]);
        assert!(matches!(
            set.find(&AstKey::new("nowhere", "t")).await,
            Err(SourceError::IllegalAccess(_))
        ));
    }

    #[tokio::test]
    async fn reserved_and_malformed_keys_are_rejected() {
        let set = set_with(&[("a", &[("t", "x")])]);
        assert!(matches!(
            set.find(&AstKey::new("$secret", "t")).await,
            Err(SourceError::IllegalAccess(_))
        ));
        assert!(matches!(
            set.find(&AstKey::new("a", "t:u")).await,
            Err(SourceError::IllegalAccess(_))
        ));
        assert!(matches!(
            set.find(&AstKey::new("", "t")).await,
            Err(SourceError::IllegalAccess(_))
        ));
    }

    #[test]
    fn registration_rejects_illegal_names() {
        let set = SourceSet::new();
        let source: Arc<dyn Source> = Arc::new(MemorySource::new());
        assert!(set.register("$", Arc::clone(&source)).is_err());
        assert!(set.register("$x", Arc::clone(&source)).is_err());
        assert!(set.register("a:b", Arc::clone(&source)).is_err());
        assert!(set.register("ok", source).is_ok());
        assert_eq!(set.search_order(), vec!["ok".to_string()]);
    }

    #[test]
    fn reregistration_keeps_one_order_entry() {
        let set = SourceSet::new();
        set.register("a", Arc::new(MemorySource::new())).unwrap();
        set.register("a", Arc::new(MemorySource::new())).unwrap();
        assert_eq!(set.search_order().len(), 1);
    }
}
