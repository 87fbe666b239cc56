//! Parsed template documents.
//!
//! An [`Ast`] is the unit the cache stores and the renderer resolves: the
//! node tree produced by the parser, the set of sub-template names still
//! to be spliced in, and rolling execution statistics updated on every
//! cache touch.

use std::time::Duration;

use rustc_hash::FxHashSet;

use crate::compiler::syntax::{Constant, Keyword, Operator};

/// Where a template came from: a source registry name and a path.
///
/// The source `"$"` is the default scope and means "search all sources in
/// registration order".
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct AstKey {
    pub source: String,
    pub path: String,
}

impl AstKey {
    /// A key with an explicit source.
    pub fn new(source: impl Into<String>, path: impl Into<String>) -> Self {
        Self {
            source: source.into(),
            path: path.into(),
        }
    }

    /// A key in the default search scope.
    pub fn default_scoped(path: impl Into<String>) -> Self {
        Self::new("$", path)
    }
}

impl std::fmt::Display for AstKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}", self.source, self.path)
    }
}

/// One node of a parsed template.
#[derive(Debug, Clone, PartialEq)]
pub enum Node {
    /// Literal output text.
    Raw(String),
    /// An expression whose value is rendered into the output.
    Expression(Expr),
    /// A block construct with an optional chain of continuations.
    Block(Block),
    /// An unresolved reference to another template's body.
    Inline(String),
}

/// A block construct: the opener plus any chained continuations.
#[derive(Debug, Clone, PartialEq)]
pub struct Block {
    /// The opener name (`if`, `for`, `while`).
    pub name: String,
    pub params: Vec<Parameter>,
    pub body: Vec<Node>,
    /// Chained continuations in source order (`elseif`, `else`).
    pub chain: Vec<ChainLink>,
}

/// One chained continuation of a block.
#[derive(Debug, Clone, PartialEq)]
pub struct ChainLink {
    pub name: String,
    pub params: Vec<Parameter>,
    pub body: Vec<Node>,
}

/// A call argument, optionally labeled.
#[derive(Debug, Clone, PartialEq)]
pub struct Parameter {
    pub label: Option<String>,
    pub value: Expr,
}

impl Parameter {
    /// An unlabeled argument.
    pub fn positional(value: Expr) -> Self {
        Self { label: None, value }
    }
}

/// A parameter expression.
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    Constant(Constant),
    Variable(String),
    Keyword(Keyword),
    Function(String, Vec<Parameter>),
    /// `[a, b, c]`
    Array(Vec<Expr>),
    /// `["k": v]`
    Dictionary(Vec<(String, Expr)>),
    Unary(Operator, Box<Expr>),
    Binary(Operator, Box<Expr>, Box<Expr>),
    /// The `binding in collection` loop header.
    In(Box<Expr>, Box<Expr>),
}

/// Rolling statistics for one document, updated by cache touches.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AstInfo {
    /// Snapshot of the unresolved inline names, sorted.
    pub required: Vec<String>,
    /// Number of successful serializations recorded.
    pub touches: u64,
    /// Rolling average serialization time.
    pub avg_exec: Duration,
    /// Rolling average output size in bytes.
    pub avg_size: u64,
}

/// A parsed template document.
#[derive(Debug, Clone, PartialEq)]
pub struct Ast {
    /// The document name; templates cache under this.
    pub name: String,
    pub key: AstKey,
    pub tree: Vec<Node>,
    /// Names of inlined sub-templates not yet resolved.
    pub required: FxHashSet<String>,
    /// Set once the document is canonical in a cache.
    pub cached: bool,
    pub info: AstInfo,
}

impl Ast {
    /// Creates a document from a parse result, scanning the tree for
    /// unresolved inline references.
    pub fn new(key: AstKey, tree: Vec<Node>) -> Self {
        let required = collect_inlines(&tree);
        let info = AstInfo {
            required: sorted(&required),
            ..AstInfo::default()
        };
        Self {
            name: key.path.clone(),
            key,
            tree,
            required,
            cached: false,
            info,
        }
    }

    /// True when no further fetching is needed to serialize.
    pub fn is_resolved(&self) -> bool {
        self.required.is_empty()
    }

    /// Splices `sub`'s tree into every inline reference to it, wherever
    /// it appears in the node tree. Requirements brought along by `sub`
    /// itself are inherited.
    pub fn inline(&mut self, sub: &Ast) {
        splice_nodes(&mut self.tree, &sub.name, &sub.tree);
        self.required.remove(&sub.name);
        self.required.extend(sub.required.iter().cloned());
        self.info.required = sorted(&self.required);
    }

    /// Records one serialization in the rolling averages. Never mutates
    /// semantic fields.
    pub fn touch(&mut self, exec: Duration, size: u64) {
        self.info.touches += 1;
        let n = self.info.touches as i128;
        let avg_exec = self.info.avg_exec.as_nanos() as i128;
        let next_exec = avg_exec + (exec.as_nanos() as i128 - avg_exec) / n;
        self.info.avg_exec = Duration::from_nanos(next_exec.max(0) as u64);
        let avg_size = self.info.avg_size as i128;
        let next_size = avg_size + (size as i128 - avg_size) / n;
        self.info.avg_size = next_size.max(0) as u64;
    }
}

fn sorted(set: &FxHashSet<String>) -> Vec<String> {
    let mut names: Vec<String> = set.iter().cloned().collect();
    names.sort();
    names
}

/// Collects the inline names referenced anywhere in a tree.
fn collect_inlines(nodes: &[Node]) -> FxHashSet<String> {
    let mut found = FxHashSet::default();
    collect_into(nodes, &mut found);
    found
}

fn collect_into(nodes: &[Node], found: &mut FxHashSet<String>) {
    for node in nodes {
        match node {
            Node::Inline(name) => {
                found.insert(name.clone());
            }
            Node::Block(block) => {
                collect_into(&block.body, found);
                for link in &block.chain {
                    collect_into(&link.body, found);
                }
            }
            _ => {}
        }
    }
}

/// Replaces every `Inline(name)` with a clone of `replacement`, recursing
/// into block bodies.
fn splice_nodes(nodes: &mut Vec<Node>, name: &str, replacement: &[Node]) {
    let mut i = 0;
    while i < nodes.len() {
        let is_reference = matches!(&nodes[i], Node::Inline(n) if n == name);
        if is_reference {
            nodes.splice(i..=i, replacement.iter().cloned());
            i += replacement.len();
            continue;
        }
        if let Node::Block(block) = &mut nodes[i] {
            splice_nodes(&mut block.body, name, replacement);
            for link in &mut block.chain {
                splice_nodes(&mut link.body, name, replacement);
            }
        }
        i += 1;
    }
}
