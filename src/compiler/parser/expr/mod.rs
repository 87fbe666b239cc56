//! Expression parser.
//!
//! A Pratt parser (top-down operator precedence) over parameter tokens.
//! Prefix operands and collection literals live in `primary`; this module
//! drives the infix/postfix loop. Retained whitespace acts as a barrier:
//! a `[` behind it starts a collection literal rather than binding to the
//! preceding value as a subscript.

mod primary;

use super::*;
use crate::compiler::syntax::{Keyword, Operator};

/// Binding power of the `in` loop-header pseudo-operator.
const IN_BINDING: (u8, u8) = (3, 4);
/// Binding power of prefix operators.
pub(super) const UNARY_BINDING: u8 = 19;
/// Left binding power of the postfix scoping operators (`.`, `[`).
const POSTFIX_BINDING: u8 = 21;

/// Left/right binding powers for an infix operator; `None` for operators
/// with no infix role.
fn infix_binding(op: Operator) -> Option<(u8, u8)> {
    use Operator::*;
    match op {
        // Right-associative.
        Assignment | CompoundPlus | CompoundMinus | CompoundMultiply | CompoundDivide
        | CompoundModulo => Some((2, 1)),
        NilCoalesce => Some((5, 6)),
        Or => Some((7, 8)),
        And => Some((9, 10)),
        Equal | Unequal => Some((11, 12)),
        Greater | GreaterOrEqual | Lesser | LesserOrEqual => Some((13, 14)),
        Plus | Minus => Some((15, 16)),
        Multiply | Divide | Modulo => Some((17, 18)),
        _ => None,
    }
}

impl Parser {
    /// Parses one expression with precedence climbing.
    pub(super) fn parse_expr(&mut self, min_bp: u8) -> ParseResult<Expr> {
        let mut lhs = self.parse_primary()?;
        loop {
            // Whitespace is only retained ahead of `[`; it keeps the
            // subscript from binding to the value on its left.
            if matches!(self.peek(), Some(Token::Whitespace(_))) {
                if matches!(
                    self.peek_at(1),
                    Some(Token::Param(ParamToken::Operator(Operator::SubscriptOpen)))
                ) {
                    break;
                }
                self.pos += 1;
                continue;
            }

            match self.peek() {
                Some(Token::Param(ParamToken::Keyword(Keyword::In))) => {
                    let (l_bp, r_bp) = IN_BINDING;
                    if l_bp < min_bp {
                        break;
                    }
                    self.pos += 1;
                    let rhs = self.parse_expr(r_bp)?;
                    lhs = Expr::In(Box::new(lhs), Box::new(rhs));
                }
                Some(Token::Param(ParamToken::Operator(op))) => {
                    let op = *op;
                    match op {
                        Operator::SubscriptOpen => {
                            if POSTFIX_BINDING < min_bp {
                                break;
                            }
                            self.pos += 1;
                            let index = self.parse_expr(0)?;
                            if !self.eat(&Token::Param(ParamToken::Operator(
                                Operator::SubscriptClose,
                            ))) {
                                let found = self.peek().cloned();
                                return Err(self.unexpected(found.as_ref()));
                            }
                            lhs = Expr::Binary(
                                Operator::SubscriptOpen,
                                Box::new(lhs),
                                Box::new(index),
                            );
                        }
                        Operator::ScopeMember => {
                            if POSTFIX_BINDING < min_bp {
                                break;
                            }
                            self.pos += 1;
                            match self.next() {
                                Some(Token::Param(ParamToken::Variable(member))) => {
                                    lhs = Expr::Binary(
                                        Operator::ScopeMember,
                                        Box::new(lhs),
                                        Box::new(Expr::Variable(member)),
                                    );
                                }
                                other => return Err(self.unexpected(other.as_ref())),
                            }
                        }
                        _ => {
                            let Some((l_bp, r_bp)) = infix_binding(op) else {
                                break;
                            };
                            if l_bp < min_bp {
                                break;
                            }
                            self.pos += 1;
                            let rhs = self.parse_expr(r_bp)?;
                            lhs = Expr::Binary(op, Box::new(lhs), Box::new(rhs));
                        }
                    }
                }
                _ => break,
            }
        }
        Ok(lhs)
    }
}
