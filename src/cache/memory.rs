//! The in-process cache.

use std::sync::RwLock;
use std::sync::RwLockReadGuard;
use std::sync::RwLockWriteGuard;

use async_trait::async_trait;
use rustc_hash::FxHashMap;
use tracing::trace;

use super::{AstCache, SyncAstCache, Touch};
use crate::ast::Ast;
use crate::error::CacheError;

/// An unbounded reader/writer-locked map of documents.
///
/// Implements both cache interfaces; the async methods delegate to the
/// sync ones, and the renderer discovers the sync side through
/// [`AstCache::as_sync`].
#[derive(Debug)]
pub struct MemoryCache {
    store: RwLock<FxHashMap<String, Ast>>,
    enabled: bool,
}

impl Default for MemoryCache {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryCache {
    /// An empty, enabled cache.
    pub fn new() -> Self {
        Self {
            store: RwLock::new(FxHashMap::default()),
            enabled: true,
        }
    }

    /// A cache that stores nothing and misses every retrieve.
    pub fn disabled() -> Self {
        Self {
            store: RwLock::new(FxHashMap::default()),
            enabled: false,
        }
    }

    fn read(&self) -> RwLockReadGuard<'_, FxHashMap<String, Ast>> {
        self.store.read().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn write(&self) -> RwLockWriteGuard<'_, FxHashMap<String, Ast>> {
        self.store.write().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl SyncAstCache for MemoryCache {
    fn insert(&self, mut ast: Ast, replace: bool) -> Result<Ast, CacheError> {
        // Stored documents are canonical.
        ast.cached = true;
        if !self.enabled {
            return Ok(ast);
        }
        let mut store = self.write();
        if !replace && store.contains_key(&ast.name) {
            return Err(CacheError::KeyExists(ast.name));
        }
        trace!(name = %ast.name, replace, "cache insert");
        store.insert(ast.name.clone(), ast.clone());
        Ok(ast)
    }

    fn retrieve(&self, name: &str) -> Option<Ast> {
        if !self.enabled {
            return None;
        }
        self.read().get(name).cloned()
    }

    fn remove(&self, name: &str) -> Option<bool> {
        if !self.enabled {
            return None;
        }
        // No dependency tracker here, so a present entry always removes;
        // `Some(false)` stays reserved for stores that track dependents.
        self.write().remove(name).map(|_| true)
    }

    fn touch(&self, name: &str, touch: Touch) {
        if !self.enabled {
            return;
        }
        if let Some(ast) = self.write().get_mut(name) {
            ast.touch(touch.exec, touch.size);
        }
    }

    fn count(&self) -> usize {
        if !self.enabled {
            return 0;
        }
        self.read().len()
    }
}

#[async_trait]
impl AstCache for MemoryCache {
    async fn insert(&self, ast: Ast, replace: bool) -> Result<Ast, CacheError> {
        SyncAstCache::insert(self, ast, replace)
    }

    async fn retrieve(&self, name: &str) -> Option<Ast> {
        SyncAstCache::retrieve(self, name)
    }

    async fn remove(&self, name: &str) -> Option<bool> {
        SyncAstCache::remove(self, name)
    }

    async fn touch(&self, name: &str, touch: Touch) {
        SyncAstCache::touch(self, name, touch);
    }

    async fn count(&self) -> usize {
        SyncAstCache::count(self)
    }

    fn is_enabled(&self) -> bool {
        self.enabled
    }

    fn as_sync(&self) -> Option<&dyn SyncAstCache> {
        Some(self)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::time::Duration;

    use super::*;
    use crate::ast::AstKey;

    fn doc(name: &str) -> Ast {
        Ast::new(AstKey::default_scoped(name), vec![])
    }

    #[test]
    fn retrieved_documents_are_always_cached() {
        let cache = MemoryCache::new();
        let stored = SyncAstCache::insert(&cache, doc("a"), false).unwrap();
        assert!(stored.cached);
        let retrieved = SyncAstCache::retrieve(&cache, "a").unwrap();
        assert!(retrieved.cached);
    }

    #[test]
    fn non_replacing_insert_collides() {
        let cache = MemoryCache::new();
        SyncAstCache::insert(&cache, doc("a"), false).unwrap();
        assert_eq!(
            SyncAstCache::insert(&cache, doc("a"), false),
            Err(CacheError::KeyExists("a".to_string()))
        );
        assert!(SyncAstCache::insert(&cache, doc("a"), true).is_ok());
        assert_eq!(SyncAstCache::count(&cache), 1);
    }

    #[test]
    fn remove_reports_presence() {
        let cache = MemoryCache::new();
        SyncAstCache::insert(&cache, doc("a"), false).unwrap();
        assert_eq!(SyncAstCache::remove(&cache, "a"), Some(true));
        assert_eq!(SyncAstCache::remove(&cache, "a"), None);
    }

    #[test]
    fn touch_updates_statistics_only() {
        let cache = MemoryCache::new();
        SyncAstCache::insert(&cache, doc("a"), false).unwrap();
        SyncAstCache::touch(
            &cache,
            "a",
            Touch {
                exec: Duration::from_millis(4),
                size: 10,
            },
        );
        SyncAstCache::touch(
            &cache,
            "a",
            Touch {
                exec: Duration::from_millis(8),
                size: 30,
            },
        );
        let stored = SyncAstCache::retrieve(&cache, "a").unwrap();
        assert_eq!(stored.info.touches, 2);
        assert_eq!(stored.info.avg_exec, Duration::from_millis(6));
        assert_eq!(stored.info.avg_size, 20);
        assert!(stored.cached);
        assert!(stored.tree.is_empty());
    }

    #[test]
    fn touching_an_absent_name_is_a_no_op() {
        let cache = MemoryCache::new();
        SyncAstCache::touch(
            &cache,
            "ghost",
            Touch {
                exec: Duration::from_millis(1),
                size: 1,
            },
        );
        assert_eq!(SyncAstCache::count(&cache), 0);
    }

    #[test]
    fn disabled_cache_behaves_as_empty() {
        let cache = MemoryCache::disabled();
        let stored = SyncAstCache::insert(&cache, doc("a"), false).unwrap();
        assert!(stored.cached);
        assert_eq!(SyncAstCache::retrieve(&cache, "a"), None);
        assert_eq!(SyncAstCache::count(&cache), 0);
        assert_eq!(SyncAstCache::remove(&cache, "a"), None);
        assert!(!AstCache::is_enabled(&cache));
    }

    #[tokio::test]
    async fn async_interface_delegates_to_the_store() {
        let cache = MemoryCache::new();
        AstCache::insert(&cache, doc("a"), false).await.unwrap();
        assert!(AstCache::retrieve(&cache, "a").await.is_some());
        assert_eq!(AstCache::count(&cache).await, 1);
        assert!(AstCache::as_sync(&cache).is_some());
    }

    #[test]
    fn concurrent_touches_settle_on_all_updates() {
        let cache = Arc::new(MemoryCache::new());
        SyncAstCache::insert(cache.as_ref(), doc("a"), false).unwrap();
        let handles: Vec<_> = (0..8)
            .map(|_| {
                let cache = Arc::clone(&cache);
                std::thread::spawn(move || {
                    for _ in 0..100 {
                        SyncAstCache::touch(
                            cache.as_ref(),
                            "a",
                            Touch {
                                exec: Duration::from_micros(100),
                                size: 64,
                            },
                        );
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }
        let stored = SyncAstCache::retrieve(cache.as_ref(), "a").unwrap();
        assert_eq!(stored.info.touches, 800);
        assert_eq!(stored.info.avg_size, 64);
    }
}
