//! Parser for the template language.
//!
//! Consumes the lexer's token stream and produces the node tree: raw
//! text, output expressions, block constructs with chained continuations,
//! and inline splice references. Expressions are parsed by precedence
//! climbing in the `expr` submodule; this module owns token navigation
//! and block structure.

mod errors;
mod expr;
#[cfg(test)]
mod tests;

pub use errors::{ParseError, ParseErrorKind, ParseResult};

use crate::ast::{Block, ChainLink, Expr, Node, Parameter};
use crate::compiler::syntax::{Constant, ParamToken, Token};
use crate::entities::{Entities, INLINE};

/// Parses a token stream into a node tree.
///
/// `name` is the template name, used in error messages.
pub fn parse(name: &str, tokens: Vec<Token>, entities: &Entities) -> ParseResult<Vec<Node>> {
    Parser {
        tokens,
        pos: 0,
        name: name.to_string(),
        entities: entities.clone(),
    }
    .parse_document()
}

/// The parser for one token stream.
pub(super) struct Parser {
    tokens: Vec<Token>,
    pos: usize,
    name: String,
    entities: Entities,
}

impl Parser {
    // =========================================================================
    // Token navigation
    // =========================================================================

    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos)
    }

    fn peek_at(&self, ahead: usize) -> Option<&Token> {
        self.tokens.get(self.pos + ahead)
    }

    fn next(&mut self) -> Option<Token> {
        let token = self.tokens.get(self.pos).cloned();
        if token.is_some() {
            self.pos += 1;
        }
        token
    }

    fn at(&self, token: &Token) -> bool {
        self.peek() == Some(token)
    }

    fn eat(&mut self, token: &Token) -> bool {
        if self.at(token) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    pub(super) fn error(&self, kind: ParseErrorKind) -> ParseError {
        ParseError::new(kind, &self.name)
    }

    fn describe(token: &Token) -> String {
        match token {
            Token::Raw(_) => "raw text".to_string(),
            Token::TagMark => "tag mark".to_string(),
            Token::Tag(Some(name)) => format!("tag '{name}'"),
            Token::Tag(None) => "anonymous tag".to_string(),
            Token::BlockMark => "':'".to_string(),
            Token::ParamsStart => "'('".to_string(),
            Token::ParamsEnd => "')'".to_string(),
            Token::ParamDelimit => "','".to_string(),
            Token::LabelMark => "label ':'".to_string(),
            Token::Param(param) => format!("parameter {param:?}"),
            Token::Whitespace(_) => "whitespace".to_string(),
        }
    }

    pub(super) fn unexpected(&self, token: Option<&Token>) -> ParseError {
        match token {
            Some(token) => self.error(ParseErrorKind::UnexpectedToken(Self::describe(token))),
            None => self.error(ParseErrorKind::UnexpectedEof),
        }
    }

    // =========================================================================
    // Document and block structure
    // =========================================================================

    fn parse_document(mut self) -> ParseResult<Vec<Node>> {
        let mut nodes = Vec::new();
        while let Some(token) = self.peek() {
            match token {
                Token::Raw(_) => {
                    if let Some(Token::Raw(text)) = self.next() {
                        push_raw(&mut nodes, text);
                    }
                }
                Token::TagMark => {
                    self.pos += 1;
                    let node = self.parse_tag(None)?;
                    nodes.push(node);
                }
                other => return Err(self.unexpected(Some(&other.clone()))),
            }
        }
        Ok(nodes)
    }

    /// Parses the invocation behind a tag mark.
    ///
    /// `enclosing` is the block this tag appears inside, if any; closing
    /// and chained tags are handled by the enclosing block's loop, so
    /// seeing one here is an error.
    fn parse_tag(&mut self, enclosing: Option<&str>) -> ParseResult<Node> {
        let tag = match self.next() {
            Some(Token::Tag(tag)) => tag,
            other => return Err(self.unexpected(other.as_ref())),
        };
        let name = match tag {
            None => {
                // Anonymous output expression.
                let params = self.parse_params()?;
                if self.at(&Token::BlockMark) {
                    return Err(self.error(ParseErrorKind::BadAnonymous));
                }
                let mut params = params;
                if params.len() != 1 || params[0].label.is_some() {
                    return Err(self.error(ParseErrorKind::BadAnonymous));
                }
                return Ok(Node::Expression(params.remove(0).value));
            }
            Some(name) => name,
        };

        if name == INLINE {
            return self.parse_inline();
        }

        let is_base_block = self
            .entities
            .block(&name)
            .map(|def| def.chains_to().is_empty());
        if let Some(is_base) = is_base_block {
            if is_base {
                return self.parse_block(name);
            }
            // A chained continuation outside its base block.
            let predecessor = enclosing.unwrap_or("nothing").to_string();
            return Err(self.error(ParseErrorKind::InvalidChain {
                chained: name,
                predecessor,
            }));
        }

        if name.starts_with("end") {
            return Err(self.error(ParseErrorKind::UnexpectedClose(name)));
        }

        // A function call rendered into the output.
        let params = self.parse_params()?;
        if self.at(&Token::BlockMark) {
            return Err(self.error(ParseErrorKind::UnexpectedBlockBody(name)));
        }
        Ok(Node::Expression(Expr::Function(name, params)))
    }

    /// `#inline("path")` records a splice reference.
    fn parse_inline(&mut self) -> ParseResult<Node> {
        let mut params = self.parse_params()?;
        if self.at(&Token::BlockMark) {
            return Err(self.error(ParseErrorKind::UnexpectedBlockBody(INLINE.to_string())));
        }
        if params.len() != 1 || params[0].label.is_some() {
            return Err(self.error(ParseErrorKind::InvalidInline));
        }
        match params.remove(0).value {
            Expr::Constant(Constant::String(path)) => Ok(Node::Inline(path)),
            _ => Err(self.error(ParseErrorKind::InvalidInline)),
        }
    }

    /// A base block: opener parameters, `:`, body, then chained
    /// continuations until the matching `end` tag.
    fn parse_block(&mut self, name: String) -> ParseResult<Node> {
        let params = self.parse_params()?;
        if !self.eat(&Token::BlockMark) {
            return Err(self.error(ParseErrorKind::MissingBlockBody(name)));
        }
        let closer = format!("end{name}");
        let mut block = Block {
            name,
            params,
            body: Vec::new(),
            chain: Vec::new(),
        };

        loop {
            let Some(token) = self.peek() else {
                return Err(self.error(ParseErrorKind::UnclosedBlock(block.name)));
            };
            match token {
                Token::Raw(_) => {
                    if let Some(Token::Raw(text)) = self.next() {
                        push_raw(current_body(&mut block), text);
                    }
                }
                Token::TagMark => {
                    let tag_name = match self.peek_at(1) {
                        Some(Token::Tag(Some(tag_name))) => Some(tag_name.clone()),
                        _ => None,
                    };
                    match tag_name {
                        Some(tag_name) if tag_name == closer => {
                            self.pos += 2;
                            break;
                        }
                        Some(tag_name) if self.is_chain_link(&tag_name) => {
                            self.pos += 2;
                            self.parse_chain_link(&mut block, tag_name)?;
                        }
                        Some(tag_name) if self.is_foreign_closer(&tag_name, &block) => {
                            return Err(self.error(ParseErrorKind::MismatchedClose {
                                expected: closer,
                                found: tag_name,
                            }));
                        }
                        _ => {
                            self.pos += 1;
                            let current = current_link_name(&block).to_string();
                            let node = self.parse_tag(Some(&current))?;
                            current_body(&mut block).push(node);
                        }
                    }
                }
                other => return Err(self.unexpected(Some(&other.clone()))),
            }
        }
        Ok(Node::Block(block))
    }

    /// True if the tag is a chained continuation (of anything).
    fn is_chain_link(&self, name: &str) -> bool {
        self.entities
            .block(name)
            .map_or(false, |def| !def.chains_to().is_empty())
    }

    /// True if the tag closes some other block.
    fn is_foreign_closer(&self, name: &str, block: &Block) -> bool {
        name.starts_with("end")
            && name != format!("end{}", block.name)
            && self.entities.block(&name["end".len()..]).is_some()
    }

    /// Parses one chained continuation and appends it to the block.
    fn parse_chain_link(&mut self, block: &mut Block, name: String) -> ParseResult<()> {
        let def = match self.entities.block(&name) {
            Some(def) => def.clone(),
            None => return Err(self.error(ParseErrorKind::UnexpectedToken(name))),
        };
        let predecessor = current_link_name(block).to_string();
        if !def.chains_to().iter().any(|p| *p == predecessor) {
            return Err(self.error(ParseErrorKind::InvalidChain {
                chained: name,
                predecessor,
            }));
        }
        let params = if def.has_params() {
            self.parse_params()?
        } else {
            Vec::new()
        };
        if !self.eat(&Token::BlockMark) {
            return Err(self.error(ParseErrorKind::MissingBlockBody(name)));
        }
        block.chain.push(ChainLink {
            name,
            params,
            body: Vec::new(),
        });
        Ok(())
    }

    // =========================================================================
    // Parameters
    // =========================================================================

    /// Parses a parenthesized parameter list, labels included.
    pub(super) fn parse_params(&mut self) -> ParseResult<Vec<Parameter>> {
        if !self.eat(&Token::ParamsStart) {
            let found = self.peek().cloned();
            return Err(self.unexpected(found.as_ref()));
        }
        let mut params = Vec::new();
        if self.eat(&Token::ParamsEnd) {
            return Ok(params);
        }
        loop {
            let label = self.parse_label();
            let value = self.parse_expr(0)?;
            params.push(Parameter { label, value });
            if self.eat(&Token::ParamDelimit) {
                continue;
            }
            if self.eat(&Token::ParamsEnd) {
                return Ok(params);
            }
            let found = self.peek().cloned();
            return Err(self.unexpected(found.as_ref()));
        }
    }

    /// Consumes `label:` if the next two tokens form one.
    fn parse_label(&mut self) -> Option<String> {
        let label = match (self.peek(), self.peek_at(1)) {
            (Some(Token::Param(ParamToken::Variable(label))), Some(Token::LabelMark)) => {
                label.clone()
            }
            _ => return None,
        };
        self.pos += 2;
        Some(label)
    }
}

/// The name of the link currently receiving body nodes.
fn current_link_name(block: &Block) -> &str {
    block
        .chain
        .last()
        .map(|link| link.name.as_str())
        .unwrap_or(&block.name)
}

/// The body currently receiving nodes.
fn current_body(block: &mut Block) -> &mut Vec<Node> {
    match block.chain.last_mut() {
        Some(link) => &mut link.body,
        None => &mut block.body,
    }
}

/// Pushes raw text, merging into a trailing raw node.
fn push_raw(nodes: &mut Vec<Node>, text: String) {
    if let Some(Node::Raw(existing)) = nodes.last_mut() {
        existing.push_str(&text);
    } else {
        nodes.push(Node::Raw(text));
    }
}
