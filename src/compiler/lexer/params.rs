//! Parameter-state tokenization.
//!
//! One character is popped per step and dispatched: structural characters
//! first, then the classification cascade from most to least restrictive:
//! operator, numeric, keyword, function, variable.

use super::*;
use crate::compiler::syntax::{Constant, Keyword, Operator, ParamToken};

impl Lexer {
    /// Lexes one step inside a parameter list.
    pub(super) fn lex_parameter(&mut self) -> LexResult<()> {
        let c = match self.raw.pop() {
            Some(c) => c,
            None => return Err(self.error(LexErrorKind::OpenParameters)),
        };

        if c.is_whitespace() {
            let mut run = String::from(c);
            run.push_str(&self.raw.read_while(|c| c.is_whitespace()));
            self.preceding_whitespace = true;
            // Retained only where the parser needs the separation: ahead
            // of a subscript-open, to split `a[0]` from `a [0]`.
            if self.raw.peek() == Some('[') {
                self.tokens.push(Token::Whitespace(run));
            }
            return Ok(());
        }

        let result = self.parameter_token(c);
        self.preceding_whitespace = false;
        result
    }

    fn parameter_token(&mut self, c: char) -> LexResult<()> {
        match c {
            '(' => {
                self.depth += 1;
                self.tokens.push(Token::ParamsStart);
                Ok(())
            }
            ')' => {
                self.tokens.push(Token::ParamsEnd);
                if self.depth > 1 {
                    self.depth -= 1;
                } else {
                    self.depth = 0;
                    self.state = State::Body;
                }
                Ok(())
            }
            ',' => {
                self.tokens.push(Token::ParamDelimit);
                Ok(())
            }
            ':' => self.lex_label_mark(),
            '[' => self.lex_subscript_open(),
            '"' => self.lex_string(),
            '_' if self.raw.peek().map_or(true, |p| !is_ident_continue(p)) => {
                self.tokens
                    .push(Token::Param(ParamToken::Keyword(Keyword::Underscore)));
                Ok(())
            }
            c if c == self.tag_indicator => self.lex_comment(),
            c if Operator::starts_operator(c) => self.lex_operator(c),
            c if c.is_ascii_digit() => self.lex_numeric(c),
            c if is_ident_start(c) => self.lex_ident(c),
            c => Err(self.error(LexErrorKind::InvalidParameterToken(c))),
        }
    }

    /// A `:` is a label mark only between a parameter boundary and the
    /// just-lexed label token (`f(label: v)`, `["key": v]`).
    fn lex_label_mark(&mut self) -> LexResult<()> {
        let labelled = matches!(
            self.tokens.last(),
            Some(Token::Param(
                ParamToken::Variable(_) | ParamToken::Constant(Constant::String(_))
            ))
        );
        let bounded = matches!(
            self.tokens.len().checked_sub(2).and_then(|i| self.tokens.get(i)),
            Some(
                Token::ParamsStart
                    | Token::ParamDelimit
                    | Token::Param(ParamToken::Operator(Operator::SubscriptOpen))
            )
        );
        if labelled && bounded {
            self.tokens.push(Token::LabelMark);
            Ok(())
        } else {
            Err(self.error(LexErrorKind::InvalidParameterToken(':')))
        }
    }

    /// `[]` and `[:]` are the empty collection literals; any other `[` is
    /// the subscript-open operator.
    fn lex_subscript_open(&mut self) -> LexResult<()> {
        if self.raw.peek() == Some(']') {
            self.raw.pop();
            self.tokens
                .push(Token::Param(ParamToken::Constant(Constant::EmptyArray)));
            return Ok(());
        }
        if self.raw.peek() == Some(':') {
            self.raw.pop();
            if self.raw.peek() == Some(']') {
                self.raw.pop();
                self.tokens
                    .push(Token::Param(ParamToken::Constant(Constant::EmptyDict)));
                return Ok(());
            }
            return Err(self.error(LexErrorKind::InvalidParameterToken(':')));
        }
        self.tokens
            .push(Token::Param(ParamToken::Operator(Operator::SubscriptOpen)));
        Ok(())
    }

    /// A string literal; ends at an unescaped `"`, fails at a newline or
    /// end of input.
    fn lex_string(&mut self) -> LexResult<()> {
        let mut value = String::new();
        loop {
            match self.raw.pop() {
                None | Some('\n') => {
                    return Err(self.error(LexErrorKind::UnterminatedString));
                }
                Some('"') => break,
                Some('\\') => match self.raw.pop() {
                    Some('"') => value.push('"'),
                    Some('\\') => value.push('\\'),
                    Some('n') => value.push('\n'),
                    Some('t') => value.push('\t'),
                    Some(other) => {
                        value.push('\\');
                        value.push(other);
                    }
                    None => return Err(self.error(LexErrorKind::UnterminatedString)),
                },
                Some(c) => value.push(c),
            }
        }
        self.tokens
            .push(Token::Param(ParamToken::Constant(Constant::String(value))));
        Ok(())
    }

    /// A tag indicator inside parameters opens a comment running to the
    /// next indicator. Emits nothing.
    fn lex_comment(&mut self) -> LexResult<()> {
        self.raw.read_while_not(&[self.tag_indicator]);
        if self.raw.is_at_end() {
            return Err(self.error(LexErrorKind::OpenComment));
        }
        self.raw.pop();
        Ok(())
    }

    /// Two-character operators win over one-character ones. The scoping
    /// operators reject adjacent whitespace on either side.
    fn lex_operator(&mut self, first: char) -> LexResult<()> {
        let two = self
            .raw
            .peek()
            .and_then(|second| Operator::match_two(first, second));
        let op = match two {
            Some(op) => {
                self.raw.pop();
                op
            }
            None => match Operator::match_one(first) {
                Some(op) => op,
                None => {
                    return Err(self.error(LexErrorKind::InvalidOperator(first.to_string())));
                }
            },
        };
        if op.forbids_whitespace() {
            let trailing = self.raw.peek().map_or(false, |c| c.is_whitespace());
            if self.preceding_whitespace || trailing {
                return Err(self.error(LexErrorKind::InvalidOperator(op.as_str().to_string())));
            }
        }
        self.tokens.push(Token::Param(ParamToken::Operator(op)));
        Ok(())
    }

    /// A numeric literal: maximal run, underscores stripped, radix chosen
    /// by the second character. A directly preceding unary minus is
    /// absorbed into the sign.
    fn lex_numeric(&mut self, first: char) -> LexResult<()> {
        let mut run = String::from(first);
        run.push_str(&self.raw.read_while(is_numeric_continue));
        let cleaned: String = run.chars().filter(|c| *c != '_').collect();
        let mut constant = match classify_numeric(&cleaned) {
            Some(constant) => constant,
            None => return Err(self.error(LexErrorKind::InvalidParameterToken(first))),
        };

        if matches!(
            self.tokens.last(),
            Some(Token::Param(ParamToken::Operator(Operator::Minus)))
        ) {
            // The minus is binary only after a value; a keyword there is
            // not a valid sequence; anything else makes it a sign.
            let before_minus = self
                .tokens
                .len()
                .checked_sub(2)
                .and_then(|i| self.tokens.get(i));
            let absorb = match before_minus {
                Some(token) if token.is_value_param() => false,
                Some(Token::Param(ParamToken::Keyword(_))) => {
                    return Err(self.error(LexErrorKind::Unknown(
                        "keyword cannot precede a signed numeric".to_string(),
                    )));
                }
                _ => true,
            };
            if absorb {
                self.tokens.pop();
                constant = match constant {
                    Constant::Int(i) => Constant::Int(-i),
                    Constant::Double(d) => Constant::Double(-d),
                    other => other,
                };
            }
        }

        self.tokens
            .push(Token::Param(ParamToken::Constant(constant)));
        Ok(())
    }

    /// The tail of the cascade: keyword, then function, then variable.
    fn lex_ident(&mut self, first: char) -> LexResult<()> {
        let mut ident = String::from(first);
        ident.push_str(&self.raw.read_while(is_ident_continue));
        let token = if let Some(keyword) = Keyword::from_ident(&ident) {
            ParamToken::Keyword(keyword)
        } else if self.raw.peek() == Some('(') {
            ParamToken::Function(ident)
        } else {
            ParamToken::Variable(ident)
        };
        self.tokens.push(Token::Param(token));
        Ok(())
    }
}

/// Classifies a cleaned numeric run. Radix forms (`0b`, `0o`, `0x`) need
/// more than the two prefix characters; a bare prefix classifies as
/// nothing and surfaces as a bad token.
fn classify_numeric(cleaned: &str) -> Option<Constant> {
    let second = cleaned.chars().nth(1);
    if cleaned.len() > 2 {
        let radix = match second {
            Some('b') => Some(2),
            Some('o') => Some(8),
            Some('x') => Some(16),
            _ => None,
        };
        if let Some(radix) = radix {
            return i64::from_str_radix(&cleaned[2..], radix)
                .ok()
                .map(Constant::Int);
        }
    }
    if cleaned.contains('.') {
        return cleaned.parse::<f64>().ok().map(Constant::Double);
    }
    cleaned.parse::<i64>().ok().map(Constant::Int)
}
