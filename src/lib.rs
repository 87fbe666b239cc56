//! An asynchronous template engine with tag-directive syntax.
//!
//! Templates are plain text with embedded directives introduced by a
//! configurable tag indicator (`#` by default): atomic calls
//! (`#count(items)`), anonymous output expressions (`#(user.name)`),
//! block constructs with chained continuations
//! (`#if(x): ... #else: ... #endif`), and sub-template splices
//! (`#inline("header")`).
//!
//! The pipeline: the lexer turns template text into a token stream, the
//! parser builds a node tree, the renderer resolves inlined
//! sub-templates across an async dependency graph with cycle detection
//! and caching, and the serializer writes the final bytes with the
//! caller's context data.
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use veneer::{Config, Context, Entities, MemoryCache, MemorySource, Renderer, SourceSet};
//!
//! # async fn demo() -> Result<(), veneer::RenderError> {
//! let source = MemorySource::new();
//! source.insert("hello", "Hello, #(name)!");
//! let sources = SourceSet::new();
//! sources.register("app", Arc::new(source)).unwrap();
//!
//! let renderer = Renderer::new(
//!     Config::default(),
//!     Entities::core(),
//!     Arc::new(MemoryCache::new()),
//!     Arc::new(sources),
//! );
//! let bytes = renderer
//!     .render("hello", &Context::new().with("name", "world"))
//!     .await?;
//! assert_eq!(bytes, b"Hello, world!");
//! # Ok(())
//! # }
//! ```

pub mod ast;
pub mod cache;
pub mod compiler;
pub mod config;
pub mod data;
pub mod entities;
pub mod error;
pub mod render;
pub mod sources;

pub use ast::{Ast, AstInfo, AstKey};
pub use cache::{AstCache, MemoryCache, SyncAstCache, Touch};
pub use config::{Config, InvalidTagIndicator};
pub use data::TemplateData;
pub use entities::{BlockDef, Entities};
pub use error::{
    CacheError, LexError, LexErrorKind, ParseError, ParseErrorKind, RenderError, SourceError,
};
pub use render::{Context, Renderer};
pub use sources::{FileSource, MemorySource, Source, SourceSet, DEFAULT_SOURCE};
