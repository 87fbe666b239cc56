//! Primary expression parsing: the atoms of expressions.
//!
//! Literals, variables, keywords, function calls, parenthesized groups,
//! prefix operators, and the bracketed collection literals.

use super::*;
use crate::compiler::syntax::Constant;
use crate::entities::INLINE;

impl Parser {
    /// Parses one operand, prefix operators included.
    pub(super) fn parse_primary(&mut self) -> ParseResult<Expr> {
        // Retained whitespace in operand position carries no meaning.
        while matches!(self.peek(), Some(Token::Whitespace(_))) {
            self.pos += 1;
        }
        match self.next() {
            Some(Token::Param(ParamToken::Constant(constant))) => Ok(Expr::Constant(constant)),
            Some(Token::Param(ParamToken::Variable(name))) => Ok(Expr::Variable(name)),
            Some(Token::Param(ParamToken::Keyword(keyword))) => Ok(Expr::Keyword(keyword)),
            Some(Token::Param(ParamToken::Function(name))) => {
                if name == INLINE {
                    return Err(self.error(ParseErrorKind::UnexpectedToken(
                        "'inline' inside an expression".to_string(),
                    )));
                }
                let params = self.parse_params()?;
                Ok(Expr::Function(name, params))
            }
            Some(Token::ParamsStart) => {
                let inner = self.parse_expr(0)?;
                if !self.eat(&Token::ParamsEnd) {
                    let found = self.peek().cloned();
                    return Err(self.unexpected(found.as_ref()));
                }
                Ok(inner)
            }
            Some(Token::Param(ParamToken::Operator(op))) => self.parse_prefix_operator(op),
            other => Err(self.unexpected(other.as_ref())),
        }
    }

    fn parse_prefix_operator(&mut self, op: Operator) -> ParseResult<Expr> {
        match op {
            Operator::Not | Operator::Minus | Operator::Evaluate => {
                let operand = self.parse_expr(UNARY_BINDING)?;
                Ok(Expr::Unary(op, Box::new(operand)))
            }
            Operator::ScopeRoot => match self.next() {
                Some(Token::Param(ParamToken::Variable(name))) => Ok(Expr::Unary(
                    Operator::ScopeRoot,
                    Box::new(Expr::Variable(name)),
                )),
                Some(Token::Param(ParamToken::Keyword(Keyword::SelfRef))) => Ok(Expr::Unary(
                    Operator::ScopeRoot,
                    Box::new(Expr::Keyword(Keyword::SelfRef)),
                )),
                other => Err(self.unexpected(other.as_ref())),
            },
            Operator::SubscriptOpen => self.parse_collection(),
            other => Err(self.error(ParseErrorKind::UnexpectedToken(format!(
                "operator '{other}'"
            )))),
        }
    }

    /// A bracketed collection literal. The empty forms `[]` and `[:]`
    /// arrive as constants from the lexer; here the bracket has content.
    fn parse_collection(&mut self) -> ParseResult<Expr> {
        let is_dict = matches!(
            (self.peek(), self.peek_at(1)),
            (
                Some(Token::Param(
                    ParamToken::Constant(Constant::String(_)) | ParamToken::Variable(_)
                )),
                Some(Token::LabelMark)
            )
        );
        if is_dict {
            self.parse_dictionary()
        } else {
            self.parse_array()
        }
    }

    fn parse_dictionary(&mut self) -> ParseResult<Expr> {
        let mut entries = Vec::new();
        loop {
            let key = match self.next() {
                Some(Token::Param(ParamToken::Constant(Constant::String(key)))) => key,
                Some(Token::Param(ParamToken::Variable(key))) => key,
                other => return Err(self.unexpected(other.as_ref())),
            };
            if !self.eat(&Token::LabelMark) {
                let found = self.peek().cloned();
                return Err(self.unexpected(found.as_ref()));
            }
            let value = self.parse_expr(0)?;
            entries.push((key, value));
            if self.eat(&Token::ParamDelimit) {
                continue;
            }
            if self.eat(&Token::Param(ParamToken::Operator(Operator::SubscriptClose))) {
                return Ok(Expr::Dictionary(entries));
            }
            let found = self.peek().cloned();
            return Err(self.unexpected(found.as_ref()));
        }
    }

    fn parse_array(&mut self) -> ParseResult<Expr> {
        let mut items = Vec::new();
        loop {
            items.push(self.parse_expr(0)?);
            if self.eat(&Token::ParamDelimit) {
                continue;
            }
            if self.eat(&Token::Param(ParamToken::Operator(Operator::SubscriptClose))) {
                return Ok(Expr::Array(items));
            }
            let found = self.peek().cloned();
            return Err(self.unexpected(found.as_ref()));
        }
    }
}
