//! The serializer: a resolved node tree plus a variable table, appended
//! to a byte buffer.
//!
//! Pure tree walk. Raw chunks copy through verbatim, expressions render
//! their evaluated value, block constructs branch and loop. Unresolved
//! inlines are a hard failure here; the orchestrator eliminates them
//! before serialization.

use std::collections::BTreeMap;
use std::time::{Duration, Instant};

use crate::ast::{Ast, Block, Expr, Node, Parameter};
use crate::compiler::syntax::Keyword;
use crate::data::TemplateData;
use crate::entities::Entities;
use crate::error::RenderError;

use super::expression::Scopes;

/// Guard against non-terminating `while` bodies.
const WHILE_LIMIT: usize = 65_536;

/// Serializes one document.
pub(super) struct Serializer<'a> {
    pub(super) entities: &'a Entities,
    pub(super) name: &'a str,
}

impl<'a> Serializer<'a> {
    pub(super) fn new(entities: &'a Entities, name: &'a str) -> Self {
        Self { entities, name }
    }

    /// Walks the tree, appending bytes. Returns the execution duration
    /// for cache statistics. On failure the buffer is indeterminate and
    /// the caller discards it.
    pub(super) fn serialize(
        &self,
        ast: &Ast,
        table: BTreeMap<String, TemplateData>,
        buffer: &mut Vec<u8>,
    ) -> Result<Duration, RenderError> {
        let start = Instant::now();
        let mut scopes = Scopes::new(table);
        self.write_nodes(&ast.tree, &mut scopes, buffer)?;
        Ok(start.elapsed())
    }

    pub(super) fn fail(&self, message: impl Into<String>) -> RenderError {
        RenderError::Serialize {
            name: self.name.to_string(),
            message: message.into(),
        }
    }

    fn write_nodes(
        &self,
        nodes: &[Node],
        scopes: &mut Scopes,
        buffer: &mut Vec<u8>,
    ) -> Result<(), RenderError> {
        for node in nodes {
            match node {
                Node::Raw(text) => buffer.extend_from_slice(text.as_bytes()),
                Node::Expression(expr) => {
                    let value = self.eval(expr, scopes)?;
                    buffer.extend_from_slice(value.to_string().as_bytes());
                }
                Node::Block(block) => self.write_block(block, scopes, buffer)?,
                Node::Inline(name) => {
                    return Err(self.fail(format!("unresolved inline \"{name}\"")));
                }
            }
        }
        Ok(())
    }

    fn write_block(
        &self,
        block: &Block,
        scopes: &mut Scopes,
        buffer: &mut Vec<u8>,
    ) -> Result<(), RenderError> {
        match block.name.as_str() {
            "if" => self.write_conditional(block, scopes, buffer),
            "for" => self.write_for(block, scopes, buffer),
            "while" => self.write_while(block, scopes, buffer),
            other => Err(self.fail(format!("no serializer for block '{other}'"))),
        }
    }

    /// `if`/`elseif`/`else`: the first satisfied branch renders.
    fn write_conditional(
        &self,
        block: &Block,
        scopes: &mut Scopes,
        buffer: &mut Vec<u8>,
    ) -> Result<(), RenderError> {
        if self.condition(&block.name, &block.params, scopes)? {
            return self.write_nodes(&block.body, scopes, buffer);
        }
        for link in &block.chain {
            let satisfied = match link.name.as_str() {
                "elseif" => self.condition(&link.name, &link.params, scopes)?,
                "else" => true,
                other => return Err(self.fail(format!("unexpected chain link '{other}'"))),
            };
            if satisfied {
                return self.write_nodes(&link.body, scopes, buffer);
            }
        }
        Ok(())
    }

    fn condition(
        &self,
        name: &str,
        params: &[Parameter],
        scopes: &mut Scopes,
    ) -> Result<bool, RenderError> {
        let [param] = params else {
            return Err(self.fail(format!("'{name}' takes a single condition")));
        };
        Ok(self.eval(&param.value, scopes)?.is_truthy())
    }

    /// `for`: iterates arrays with `index`/`isFirst`/`isLast` bound, and
    /// dictionaries with `key` bound, in key order.
    fn write_for(
        &self,
        block: &Block,
        scopes: &mut Scopes,
        buffer: &mut Vec<u8>,
    ) -> Result<(), RenderError> {
        let header = match block.params.as_slice() {
            [Parameter {
                label: None,
                value: Expr::In(binding, collection),
            }] => Some((binding, collection)),
            _ => None,
        };
        let Some((binding, collection)) = header else {
            return Err(self.fail("'for' requires a 'binding in collection' header"));
        };
        let binding = match binding.as_ref() {
            Expr::Variable(name) => Some(name.as_str()),
            Expr::Keyword(Keyword::Underscore) => None,
            _ => return Err(self.fail("'for' binding must be a name or '_'")),
        };
        match self.eval(collection, scopes)? {
            TemplateData::Array(items) => {
                let last = items.len().saturating_sub(1);
                for (index, item) in items.into_iter().enumerate() {
                    let mut vars = BTreeMap::new();
                    if let Some(binding) = binding {
                        vars.insert(binding.to_string(), item);
                    }
                    vars.insert("index".to_string(), TemplateData::Int(index as i64));
                    vars.insert("isFirst".to_string(), TemplateData::Bool(index == 0));
                    vars.insert("isLast".to_string(), TemplateData::Bool(index == last));
                    scopes.push(vars);
                    let result = self.write_nodes(&block.body, scopes, buffer);
                    scopes.pop();
                    result?;
                }
                Ok(())
            }
            TemplateData::Dictionary(entries) => {
                for (index, (key, value)) in entries.into_iter().enumerate() {
                    let mut vars = BTreeMap::new();
                    if let Some(binding) = binding {
                        vars.insert(binding.to_string(), value);
                    }
                    vars.insert("key".to_string(), TemplateData::String(key));
                    vars.insert("index".to_string(), TemplateData::Int(index as i64));
                    scopes.push(vars);
                    let result = self.write_nodes(&block.body, scopes, buffer);
                    scopes.pop();
                    result?;
                }
                Ok(())
            }
            other => Err(self.fail(format!("cannot iterate a {}", other.type_name()))),
        }
    }

    /// `while`: the body runs in the enclosing scope so assignments can
    /// advance the condition.
    fn write_while(
        &self,
        block: &Block,
        scopes: &mut Scopes,
        buffer: &mut Vec<u8>,
    ) -> Result<(), RenderError> {
        let mut iterations = 0usize;
        while self.condition(&block.name, &block.params, scopes)? {
            iterations += 1;
            if iterations > WHILE_LIMIT {
                return Err(self.fail(format!("'while' exceeded {WHILE_LIMIT} iterations")));
            }
            self.write_nodes(&block.body, scopes, buffer)?;
        }
        Ok(())
    }
}
