//! The render orchestrator.
//!
//! `render` composes the pipeline: probe the cache (synchronously where
//! the cache allows it), otherwise fetch and compile the template body,
//! arbitrate the document (cache it when self-contained, or resolve its
//! inlined sub-templates recursively with cycle detection), then
//! serialize with the caller's context and record statistics.
//!
//! Lexing and parsing currently run inline on the calling task.
//! TODO: offload lex/parse to `tokio::task::spawn_blocking` so large
//! templates stop stalling the scheduler thread; the contract is
//! unchanged by that move.

mod expression;
mod serialize;

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use futures::future::{try_join_all, BoxFuture};
use futures::FutureExt;
use tracing::{debug, trace};

use crate::ast::{Ast, AstKey};
use crate::cache::{AstCache, Touch};
use crate::compiler::lexer::{is_valid_identifier, Lexer};
use crate::compiler::parser::parse;
use crate::compiler::raw::RawTemplate;
use crate::config::Config;
use crate::data::TemplateData;
use crate::entities::Entities;
use crate::error::{RenderError, SourceError};
use crate::sources::{validate_path, validate_source_name, SourceSet, DEFAULT_SOURCE};

use serialize::Serializer;

/// The caller-supplied render context: the data dictionary bound to
/// `self`, plus free-form user info merged in where representable.
#[derive(Debug, Clone, Default)]
pub struct Context {
    data: BTreeMap<String, TemplateData>,
    user_info: BTreeMap<String, serde_json::Value>,
}

impl Context {
    /// An empty context.
    pub fn new() -> Self {
        Self::default()
    }

    /// A context built from a JSON object.
    pub fn from_json(value: serde_json::Value) -> Option<Self> {
        match TemplateData::from_json(value)? {
            TemplateData::Dictionary(data) => Some(Self {
                data,
                user_info: BTreeMap::new(),
            }),
            _ => None,
        }
    }

    /// Binds a context entry.
    pub fn insert(&mut self, key: &str, value: impl Into<TemplateData>) {
        self.data.insert(key.to_string(), value.into());
    }

    /// Builder form of [`Context::insert`].
    pub fn with(mut self, key: &str, value: impl Into<TemplateData>) -> Self {
        self.insert(key, value);
        self
    }

    /// Attaches a user-info entry. Entries whose keys are not valid
    /// identifiers, or whose values cannot become template data, are
    /// skipped silently at serialization time.
    pub fn insert_user_info(&mut self, key: &str, value: serde_json::Value) {
        self.user_info.insert(key.to_string(), value);
    }

    /// Builder form of [`Context::insert_user_info`].
    pub fn with_user_info(mut self, key: &str, value: serde_json::Value) -> Self {
        self.insert_user_info(key, value);
        self
    }
}

/// The template renderer.
///
/// A renderer is a cheap value parameterized by its shared collaborators;
/// clone one per request if convenient.
#[derive(Clone)]
pub struct Renderer {
    config: Config,
    entities: Arc<Entities>,
    cache: Arc<dyn AstCache>,
    sources: Arc<SourceSet>,
}

impl Renderer {
    /// Creates a renderer over shared collaborators.
    pub fn new(
        config: Config,
        entities: Entities,
        cache: Arc<dyn AstCache>,
        sources: Arc<SourceSet>,
    ) -> Self {
        Self {
            config,
            entities: Arc::new(entities),
            cache,
            sources,
        }
    }

    /// Renders `path` from the default source scope.
    pub async fn render(&self, path: &str, context: &Context) -> Result<Vec<u8>, RenderError> {
        self.render_from(DEFAULT_SOURCE, path, context).await
    }

    /// Renders `path` from the named source.
    pub async fn render_from(
        &self,
        source: &str,
        path: &str,
        context: &Context,
    ) -> Result<Vec<u8>, RenderError> {
        if path.is_empty() {
            return Err(RenderError::NoTemplateExists(
                "no template path provided".to_string(),
            ));
        }
        validate_source_name(source).map_err(map_source_error)?;
        validate_path(path).map_err(map_source_error)?;
        let key = AstKey::new(source, path);

        // Fast path: a synchronously retrievable, fully resolved document
        // with a history of quick serializations renders on this task
        // with no suspension at all.
        if self.cache.is_enabled() {
            if let Some(sync) = self.cache.as_sync() {
                if let Some(ast) = sync.retrieve(path) {
                    if ast.is_resolved() && ast.info.avg_exec < self.config.block_limit {
                        trace!(template = %key, "synchronous fast path");
                        let (buffer, exec) = self.run_serializer(&ast, context)?;
                        sync.touch(
                            &ast.name,
                            Touch {
                                exec,
                                size: buffer.len() as u64,
                            },
                        );
                        return Ok(buffer);
                    }
                }
            }
        }

        let ast = self.fetch(&key).await?;
        let ast = self.arbitrate(ast, Vec::new()).await?;
        let (buffer, exec) = self.run_serializer(&ast, context)?;
        let touch = Touch {
            exec,
            size: buffer.len() as u64,
        };
        if self.cache.is_enabled() {
            match self.cache.as_sync() {
                Some(sync) => sync.touch(&ast.name, touch),
                None => self.cache.touch(&ast.name, touch).await,
            }
        }
        debug!(template = %ast.key, bytes = buffer.len(), "render complete");
        Ok(buffer)
    }

    /// Cache probe, falling back to a source read. Cache retrieval
    /// failures are misses, never render failures.
    async fn fetch(&self, key: &AstKey) -> Result<Ast, RenderError> {
        if self.cache.is_enabled() {
            let hit = match self.cache.as_sync() {
                Some(sync) => sync.retrieve(&key.path),
                None => self.cache.retrieve(&key.path).await,
            };
            if let Some(ast) = hit {
                trace!(template = %key, "cache hit");
                return Ok(ast);
            }
        }
        self.read(key).await
    }

    /// Reads, lexes, and parses a template body. The result is not yet
    /// cached.
    async fn read(&self, key: &AstKey) -> Result<Ast, RenderError> {
        let (origin, bytes) = self.sources.find(key).await.map_err(map_source_error)?;
        let body = String::from_utf8(bytes).map_err(|_| {
            RenderError::Unknown(format!("template \"{key}\" is not valid UTF-8"))
        })?;
        let raw = RawTemplate::new(key.path.clone(), &body);
        let tokens = Lexer::new(raw, &self.entities, self.config.tag_indicator).lex()?;
        let tree = parse(&key.path, tokens, &self.entities)?;
        let ast = Ast::new(AstKey::new(origin, key.path.clone()), tree);
        debug!(template = %ast.key, required = ast.required.len(), "compiled");
        Ok(ast)
    }

    /// Caches a self-contained document, or resolves its inlines
    /// recursively and re-arbitrates the composite.
    ///
    /// `chain` holds the ancestor names of this resolution; a required
    /// name that reappears there is a cycle. The chain, not the root's
    /// aggregate requirements, is what gets checked: diamond dependencies
    /// are legitimate.
    fn arbitrate(&self, ast: Ast, chain: Vec<String>) -> BoxFuture<'_, Result<Ast, RenderError>> {
        async move {
            if ast.is_resolved() {
                if ast.cached {
                    return Ok(ast);
                }
                let mut ast = ast;
                ast.cached = true;
                if !self.cache.is_enabled() {
                    return Ok(ast);
                }
                // Self-authored inserts replace: concurrent renders of
                // the same missing template may race here, and the last
                // writer wins.
                let stored = match self.cache.as_sync() {
                    Some(sync) => sync.insert(ast, true),
                    None => self.cache.insert(ast, true).await,
                }?;
                return Ok(stored);
            }

            let mut extended = chain.clone();
            extended.push(ast.name.clone());
            if let Some(conflict) = ast
                .required
                .iter()
                .find(|name| extended.contains(*name))
            {
                return Err(RenderError::CyclicalReference {
                    name: conflict.clone(),
                    chain: extended,
                });
            }

            let mut required: Vec<String> = ast.required.iter().cloned().collect();
            required.sort();
            trace!(template = %ast.key, ?required, "resolving inlines");
            let subs = try_join_all(required.into_iter().map(|name| {
                let sub_key = AstKey::new(ast.key.source.clone(), name);
                let sub_chain = extended.clone();
                async move {
                    let sub = self.fetch(&sub_key).await?;
                    self.arbitrate(sub, sub_chain).await
                }
            }))
            .await?;

            let mut composite = ast;
            for sub in &subs {
                composite.inline(sub);
            }
            self.arbitrate(composite, chain).await
        }
        .boxed()
    }

    /// Builds the variable table and runs the serializer, returning the
    /// output bytes and the measured execution time.
    fn run_serializer(
        &self,
        ast: &Ast,
        context: &Context,
    ) -> Result<(Vec<u8>, Duration), RenderError> {
        let table = self.variable_table(context);
        let mut buffer = Vec::new();
        let exec = Serializer::new(&self.entities, &ast.name).serialize(ast, table, &mut buffer)?;
        Ok((buffer, exec))
    }

    /// `self` is the context dictionary; user-info entries join it where
    /// their keys are identifiers and their values convert.
    fn variable_table(&self, context: &Context) -> BTreeMap<String, TemplateData> {
        let mut table = BTreeMap::new();
        for (key, value) in &context.user_info {
            if !is_valid_identifier(key) {
                continue;
            }
            if let Some(data) = TemplateData::from_json(value.clone()) {
                table.insert(key.clone(), data);
            }
        }
        table.insert(
            "self".to_string(),
            TemplateData::Dictionary(context.data.clone()),
        );
        table
    }
}

fn map_source_error(error: SourceError) -> RenderError {
    match error {
        SourceError::NotFound(path) => RenderError::NoTemplateExists(path),
        SourceError::IllegalAccess(message) => RenderError::IllegalAccess(message),
        SourceError::Io(message) => RenderError::Unknown(message),
    }
}
