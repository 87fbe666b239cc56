//! Lexer for the template language.
//!
//! The lexer walks a [`RawTemplate`] and produces a flat token stream. It
//! is a four-state machine: `Raw` accumulates literal text until a live
//! tag indicator, `Tag` classifies the directive name against the entity
//! registry, `Parameters` tokenizes the parenthesized argument list, and
//! `Body` checks for the `:` that opens a block body.
//!
//! Two situations rewrite the token vector in place rather than emitting
//! forward: an unknown tag name decays the already-emitted tag mark back
//! to literal text, and a unary minus is absorbed into the sign of the
//! numeric literal that follows it.

mod errors;
mod params;

pub use errors::{LexError, LexErrorKind, LexResult};

use rustc_hash::FxHashSet;

use crate::compiler::raw::RawTemplate;
use crate::compiler::syntax::Token;
use crate::entities::Entities;

/// True if `c` can start an identifier.
pub fn is_ident_start(c: char) -> bool {
    c.is_alphabetic() || c == '_'
}

/// True if `c` can continue an identifier.
pub fn is_ident_continue(c: char) -> bool {
    is_ident_start(c) || c.is_ascii_digit()
}

/// True if `ident` is a whole valid identifier.
pub fn is_valid_identifier(ident: &str) -> bool {
    let mut chars = ident.chars();
    match chars.next() {
        Some(first) if is_ident_start(first) => chars.all(is_ident_continue),
        _ => false,
    }
}

/// True if `c` can continue a numeric literal: digits, separators, the
/// radix prefix letters, and hex digits.
fn is_numeric_continue(c: char) -> bool {
    c.is_ascii_digit()
        || c == '_'
        || c == '.'
        || matches!(c, 'b' | 'o' | 'x')
        || c.is_ascii_hexdigit()
}

/// Lexer state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    /// Accumulating literal template text.
    Raw,
    /// Just behind a live tag indicator, classifying the directive name.
    Tag,
    /// Inside a parenthesized parameter list.
    Parameters,
    /// Just behind the closing parenthesis, checking for a block body.
    Body,
}

/// The lexer for one template body.
pub struct Lexer {
    raw: RawTemplate,
    tag_indicator: char,
    openers: FxHashSet<String>,
    closers: FxHashSet<String>,
    state: State,
    /// Parenthesis depth inside `Parameters`.
    depth: usize,
    /// Pending literal text not yet flushed as a `Raw` token.
    buffer: String,
    /// Whether the previous parameter token was separated by whitespace.
    preceding_whitespace: bool,
    tokens: Vec<Token>,
}

impl Lexer {
    /// Creates a lexer over `raw`, resolving tag names against `entities`.
    pub fn new(raw: RawTemplate, entities: &Entities, tag_indicator: char) -> Self {
        Self {
            raw,
            tag_indicator,
            openers: entities.openers(),
            closers: entities.closers(),
            state: State::Raw,
            depth: 0,
            buffer: String::new(),
            preceding_whitespace: false,
            tokens: Vec::new(),
        }
    }

    /// Tokenizes the entire template.
    ///
    /// Returns the token stream, or the first error with position and
    /// partial progress attached.
    pub fn lex(mut self) -> LexResult<Vec<Token>> {
        while !self.raw.is_at_end() {
            match self.state {
                State::Raw => self.lex_raw(),
                State::Tag => self.lex_tag()?,
                State::Parameters => self.lex_parameter()?,
                State::Body => self.lex_body(),
            }
        }
        if self.state == State::Parameters {
            return Err(self.error(LexErrorKind::OpenParameters));
        }
        self.flush_raw();
        Ok(self.tokens)
    }

    /// Builds an error at the current position, capturing partial output.
    pub(super) fn error(&self, kind: LexErrorKind) -> LexError {
        LexError::new(kind, self.raw.name(), self.raw.position(), &self.tokens)
    }

    /// Flushes accumulated literal text as a `Raw` token.
    fn flush_raw(&mut self) {
        if !self.buffer.is_empty() {
            self.tokens.push(Token::Raw(std::mem::take(&mut self.buffer)));
        }
    }

    /// Consumes literal text until a live tag indicator.
    ///
    /// A backslash escapes the indicator; a doubled backslash ahead of the
    /// indicator collapses to one literal backslash and leaves the tag
    /// live. An indicator not followed by an identifier start or `(` is
    /// literal text.
    fn lex_raw(&mut self) {
        while let Some(c) = self.raw.peek() {
            if c == '\\' {
                let next = self.raw.peek_ahead(1);
                if next == Some(self.tag_indicator) {
                    self.raw.pop();
                    if let Some(indicator) = self.raw.pop() {
                        self.buffer.push(indicator);
                    }
                    continue;
                }
                if next == Some('\\') && self.raw.peek_ahead(2) == Some(self.tag_indicator) {
                    self.raw.pop();
                    self.raw.pop();
                    self.buffer.push('\\');
                    continue;
                }
                self.raw.pop();
                self.buffer.push('\\');
                continue;
            }
            if c == self.tag_indicator {
                let live = match self.raw.peek_ahead(1) {
                    Some(next) => is_ident_start(next) || next == '(',
                    None => false,
                };
                if live {
                    self.raw.pop();
                    self.flush_raw();
                    self.tokens.push(Token::TagMark);
                    self.state = State::Tag;
                    return;
                }
                self.raw.pop();
                self.buffer.push(c);
                continue;
            }
            self.raw.pop();
            self.buffer.push(c);
        }
    }

    /// Classifies the directive name behind a live tag indicator.
    fn lex_tag(&mut self) -> LexResult<()> {
        if self.raw.peek() == Some('(') {
            // Anonymous tag.
            self.tokens.push(Token::Tag(None));
            self.depth = 0;
            self.state = State::Parameters;
            return Ok(());
        }

        let ident = self.raw.read_while(is_ident_continue);
        let is_opener = self.openers.contains(&ident);
        let is_closer = self.closers.contains(&ident);

        if !is_opener && !is_closer {
            // Unknown name: decay the emitted tag mark back to literal text.
            if let Some(mark) = self.tokens.last_mut() {
                *mark = Token::Raw(self.tag_indicator.to_string());
            }
            self.tokens.push(Token::Raw(ident));
            self.state = State::Raw;
            return Ok(());
        }

        let has_params = self.raw.peek() == Some('(');
        match (has_params, is_closer) {
            (true, true) => Err(self.error(LexErrorKind::Unknown(format!(
                "closing tag '{ident}' cannot have parameters"
            )))),
            (false, false) => Err(self.error(LexErrorKind::Unknown(format!(
                "tag '{ident}' must be called with parameters"
            )))),
            (true, false) => {
                self.tokens.push(Token::Tag(Some(ident)));
                self.depth = 0;
                self.state = State::Parameters;
                Ok(())
            }
            (false, true) => {
                if is_opener {
                    // A chained terminal like `else` opens a new body.
                    if self.raw.peek() == Some(':') {
                        self.raw.pop();
                        self.tokens.push(Token::Tag(Some(ident)));
                        self.tokens.push(Token::BlockMark);
                        self.state = State::Raw;
                        Ok(())
                    } else {
                        Err(self.error(LexErrorKind::Unknown(format!(
                            "chained tag '{ident}' must open a body with ':'"
                        ))))
                    }
                } else {
                    self.tokens.push(Token::Tag(Some(ident)));
                    self.state = State::Raw;
                    Ok(())
                }
            }
        }
    }

    /// After the final `)`: a `:` opens a block body.
    fn lex_body(&mut self) {
        if self.raw.peek() == Some(':') {
            self.raw.pop();
            self.tokens.push(Token::BlockMark);
        }
        self.state = State::Raw;
    }
}
