//! The entity registry: block constructs and callable functions.
//!
//! Registration here drives the lexer's opener/closer sets and the
//! serializer's function dispatch. A block is either a base construct
//! (`if`, `for`, `while`) or a chained continuation that may directly
//! follow named predecessors (`elseif`, `else`).

use std::sync::Arc;

use rustc_hash::{FxHashMap, FxHashSet};

use crate::data::TemplateData;

/// The built-in sub-template splice. Lexes like a function; the parser
/// records it as an unresolved inline reference instead of a call.
pub(crate) const INLINE: &str = "inline";

/// Metadata for one block construct.
#[derive(Debug, Clone)]
pub struct BlockDef {
    name: String,
    /// Whether the block is called with a parameter list. Chained blocks
    /// with an empty call signature (`else`) are terminals.
    has_params: bool,
    /// Block names this block may directly continue; empty for base
    /// blocks, which get an `end`-prefixed closing tag.
    chains_to: Vec<String>,
}

impl BlockDef {
    /// A base block with parameters, closed by `end<name>`.
    pub fn base(name: &str) -> Self {
        Self {
            name: name.to_string(),
            has_params: true,
            chains_to: Vec::new(),
        }
    }

    /// A chained continuation with parameters (`elseif`).
    pub fn chained(name: &str, chains_to: &[&str]) -> Self {
        Self {
            name: name.to_string(),
            has_params: true,
            chains_to: chains_to.iter().map(|s| s.to_string()).collect(),
        }
    }

    /// A terminal chained continuation with no parameters (`else`).
    pub fn chained_terminal(name: &str, chains_to: &[&str]) -> Self {
        Self {
            name: name.to_string(),
            has_params: false,
            chains_to: chains_to.iter().map(|s| s.to_string()).collect(),
        }
    }

    /// The block name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Whether the block takes a parameter list.
    pub fn has_params(&self) -> bool {
        self.has_params
    }

    /// The chain predecessors, empty for base blocks.
    pub fn chains_to(&self) -> &[String] {
        &self.chains_to
    }
}

type FunctionImpl = Arc<dyn Fn(&[TemplateData]) -> Result<TemplateData, String> + Send + Sync>;

/// A registered scalar function.
#[derive(Clone)]
pub struct Function {
    arity: (usize, Option<usize>),
    fun: FunctionImpl,
}

impl Function {
    /// Invokes the function after arity checking.
    pub fn call(&self, args: &[TemplateData]) -> Result<TemplateData, String> {
        let (min, max) = self.arity;
        if args.len() < min || max.map_or(false, |max| args.len() > max) {
            return Err(match max {
                Some(max) if max == min => format!("expected {min} argument(s), got {}", args.len()),
                Some(max) => format!("expected {min}..{max} arguments, got {}", args.len()),
                None => format!("expected at least {min} argument(s), got {}", args.len()),
            });
        }
        (self.fun)(args)
    }
}

impl std::fmt::Debug for Function {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Function").field("arity", &self.arity).finish()
    }
}

/// The registry of blocks and functions known to a renderer.
#[derive(Debug, Clone, Default)]
pub struct Entities {
    blocks: FxHashMap<String, BlockDef>,
    functions: FxHashMap<String, Function>,
}

impl Entities {
    /// An empty registry. The inline splice is always known.
    pub fn new() -> Self {
        Self::default()
    }

    /// The core registry: `if`/`elseif`/`else`, `for`, `while`, and the
    /// basic string/collection functions.
    pub fn core() -> Self {
        let mut entities = Self::new();
        entities.register_block(BlockDef::base("if"));
        entities.register_block(BlockDef::chained("elseif", &["if", "elseif"]));
        entities.register_block(BlockDef::chained_terminal("else", &["if", "elseif"]));
        entities.register_block(BlockDef::base("for"));
        entities.register_block(BlockDef::base("while"));

        entities.register_function("count", 1, Some(1), |args| {
            args[0]
                .len()
                .map(|len| TemplateData::Int(len as i64))
                .ok_or_else(|| format!("cannot count a {}", args[0].type_name()))
        });
        entities.register_function("lowercased", 1, Some(1), |args| match &args[0] {
            TemplateData::String(s) => Ok(TemplateData::String(s.to_lowercase())),
            other => Err(format!("cannot lowercase a {}", other.type_name())),
        });
        entities.register_function("uppercased", 1, Some(1), |args| match &args[0] {
            TemplateData::String(s) => Ok(TemplateData::String(s.to_uppercase())),
            other => Err(format!("cannot uppercase a {}", other.type_name())),
        });
        entities.register_function("contains", 2, Some(2), |args| match (&args[0], &args[1]) {
            (TemplateData::Array(items), needle) => {
                Ok(TemplateData::Bool(items.contains(needle)))
            }
            (TemplateData::String(s), TemplateData::String(needle)) => {
                Ok(TemplateData::Bool(s.contains(needle.as_str())))
            }
            (TemplateData::Dictionary(d), TemplateData::String(key)) => {
                Ok(TemplateData::Bool(d.contains_key(key)))
            }
            (haystack, _) => Err(format!("cannot search a {}", haystack.type_name())),
        });
        entities
    }

    /// Registers a block construct, replacing any previous definition.
    pub fn register_block(&mut self, def: BlockDef) {
        self.blocks.insert(def.name.clone(), def);
    }

    /// Registers a function, replacing any previous definition.
    pub fn register_function<F>(&mut self, name: &str, min: usize, max: Option<usize>, fun: F)
    where
        F: Fn(&[TemplateData]) -> Result<TemplateData, String> + Send + Sync + 'static,
    {
        self.functions.insert(
            name.to_string(),
            Function {
                arity: (min, max),
                fun: Arc::new(fun),
            },
        );
    }

    /// Looks up a block definition.
    pub fn block(&self, name: &str) -> Option<&BlockDef> {
        self.blocks.get(name)
    }

    /// Looks up a function.
    pub fn function(&self, name: &str) -> Option<&Function> {
        self.functions.get(name)
    }

    /// Tag names that may open an invocation: every block, every
    /// function, and the inline splice.
    pub(crate) fn openers(&self) -> FxHashSet<String> {
        let mut openers: FxHashSet<String> = self.blocks.keys().cloned().collect();
        openers.extend(self.functions.keys().cloned());
        openers.insert(INLINE.to_string());
        openers
    }

    /// Tag names that close a body: `end`-tags for base blocks plus the
    /// terminal chained continuations.
    pub(crate) fn closers(&self) -> FxHashSet<String> {
        let mut closers = FxHashSet::default();
        for def in self.blocks.values() {
            if def.chains_to.is_empty() {
                closers.insert(format!("end{}", def.name));
            } else if !def.has_params {
                closers.insert(def.name.clone());
            }
        }
        closers
    }
}
