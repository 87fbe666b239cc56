//! The document cache: name-to-AST storage with a dual interface.
//!
//! [`AstCache`] is the primary, suspending interface every store
//! implements. Stores that can answer without suspending also implement
//! [`SyncAstCache`] and advertise it through [`AstCache::as_sync`]; the
//! renderer takes a synchronous fast path when it is present.
//!
//! The cache is shared across concurrent renders. Every returned
//! document has `cached == true`; `touch` updates statistics only.

mod memory;

pub use memory::MemoryCache;

use std::time::Duration;

use async_trait::async_trait;

use crate::ast::Ast;
use crate::error::CacheError;

/// Statistics recorded after one successful serialization.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Touch {
    /// Observed serialization time.
    pub exec: Duration,
    /// Output size in bytes.
    pub size: u64,
}

/// The suspending cache interface.
#[async_trait]
pub trait AstCache: Send + Sync {
    /// Stores a document, returning the canonical stored copy. With
    /// `replace` false, a name collision fails with
    /// [`CacheError::KeyExists`].
    async fn insert(&self, ast: Ast, replace: bool) -> Result<Ast, CacheError>;

    /// Retrieves a document by name.
    async fn retrieve(&self, name: &str) -> Option<Ast>;

    /// Removes a document. `None` if absent, `Some(true)` if removed;
    /// `Some(false)` is reserved for entries blocked by outstanding
    /// dependents.
    async fn remove(&self, name: &str) -> Option<bool>;

    /// Records serialization statistics. Must be cheap and lock-brief.
    async fn touch(&self, name: &str, touch: Touch);

    /// The number of stored documents.
    async fn count(&self) -> usize;

    /// False when the cache ignores inserts and reports every retrieve
    /// as a miss.
    fn is_enabled(&self) -> bool;

    /// The synchronous interface, where the implementation offers one.
    fn as_sync(&self) -> Option<&dyn SyncAstCache> {
        None
    }
}

/// The direct-return cache interface for fast-path callers.
///
/// Implementations must be thread-safe; this variant is intended for
/// stores where the lookup itself is not the bottleneck.
pub trait SyncAstCache: Send + Sync {
    /// As [`AstCache::insert`], without suspension.
    fn insert(&self, ast: Ast, replace: bool) -> Result<Ast, CacheError>;
    /// As [`AstCache::retrieve`], without suspension.
    fn retrieve(&self, name: &str) -> Option<Ast>;
    /// As [`AstCache::remove`], without suspension.
    fn remove(&self, name: &str) -> Option<bool>;
    /// As [`AstCache::touch`], without suspension.
    fn touch(&self, name: &str, touch: Touch);
    /// As [`AstCache::count`], without suspension.
    fn count(&self) -> usize;
}
