//! Parameter expression evaluation.
//!
//! Evaluates the parsed expression tree against the scope stack: literal
//! constants, variable lookup with an implicit fall-through to the
//! context dictionary, operators with numeric promotion, short-circuit
//! logic, nil coalescing, and registered function application.
//!
//! Missing variables evaluate to nil rather than failing, which is what
//! makes `??` and truthiness checks on optional data usable.

use std::collections::BTreeMap;

use crate::ast::{Expr, Parameter};
use crate::compiler::syntax::{Constant, Keyword, Operator};
use crate::data::TemplateData;
use crate::error::RenderError;

use super::serialize::Serializer;

/// The scope stack: the base variable table plus one overlay per
/// enclosing loop body.
pub(super) struct Scopes {
    stack: Vec<BTreeMap<String, TemplateData>>,
}

impl Scopes {
    pub(super) fn new(base: BTreeMap<String, TemplateData>) -> Self {
        Self { stack: vec![base] }
    }

    pub(super) fn push(&mut self, vars: BTreeMap<String, TemplateData>) {
        self.stack.push(vars);
    }

    pub(super) fn pop(&mut self) {
        if self.stack.len() > 1 {
            self.stack.pop();
        }
    }

    /// Innermost binding wins; unbound names fall through to the `self`
    /// dictionary in the base table.
    fn lookup(&self, name: &str) -> Option<TemplateData> {
        for scope in self.stack.iter().rev() {
            if let Some(value) = scope.get(name) {
                return Some(value.clone());
            }
        }
        match self.stack.first().and_then(|base| base.get("self")) {
            Some(TemplateData::Dictionary(data)) => data.get(name).cloned(),
            _ => None,
        }
    }

    /// Looks up in the base table only, for `$`-rooted references.
    fn lookup_root(&self, name: &str) -> Option<TemplateData> {
        self.stack.first().and_then(|base| base.get(name)).cloned()
    }

    /// Rebinds an existing name in place, or binds it in the innermost
    /// scope.
    fn assign(&mut self, name: &str, value: TemplateData) {
        for scope in self.stack.iter_mut().rev() {
            if scope.contains_key(name) {
                scope.insert(name.to_string(), value);
                return;
            }
        }
        if let Some(innermost) = self.stack.last_mut() {
            innermost.insert(name.to_string(), value);
        }
    }
}

impl Serializer<'_> {
    /// Evaluates one expression.
    pub(super) fn eval(
        &self,
        expr: &Expr,
        scopes: &mut Scopes,
    ) -> Result<TemplateData, RenderError> {
        match expr {
            Expr::Constant(constant) => Ok(constant_data(constant)),
            Expr::Variable(name) => Ok(scopes.lookup(name).unwrap_or(TemplateData::Nil)),
            Expr::Keyword(keyword) => self.eval_keyword(*keyword, scopes),
            Expr::Function(name, params) => self.eval_function(name, params, scopes),
            Expr::Array(items) => {
                let mut values = Vec::with_capacity(items.len());
                for item in items {
                    values.push(self.eval(item, scopes)?);
                }
                Ok(TemplateData::Array(values))
            }
            Expr::Dictionary(entries) => {
                let mut values = BTreeMap::new();
                for (key, value) in entries {
                    values.insert(key.clone(), self.eval(value, scopes)?);
                }
                Ok(TemplateData::Dictionary(values))
            }
            Expr::Unary(op, operand) => self.eval_unary(*op, operand, scopes),
            Expr::Binary(op, lhs, rhs) => self.eval_binary(*op, lhs, rhs, scopes),
            Expr::In(..) => Err(self.fail("'in' is only valid in a loop header")),
        }
    }

    fn eval_keyword(
        &self,
        keyword: Keyword,
        scopes: &mut Scopes,
    ) -> Result<TemplateData, RenderError> {
        if let Some(b) = keyword.as_bool() {
            return Ok(TemplateData::Bool(b));
        }
        match keyword {
            Keyword::Nil => Ok(TemplateData::Nil),
            Keyword::SelfRef => Ok(scopes.lookup("self").unwrap_or(TemplateData::Nil)),
            other => Err(self.fail(format!("keyword '{other}' is not a value"))),
        }
    }

    fn eval_function(
        &self,
        name: &str,
        params: &[Parameter],
        scopes: &mut Scopes,
    ) -> Result<TemplateData, RenderError> {
        let function = self
            .entities
            .function(name)
            .ok_or_else(|| self.fail(format!("unknown function '{name}'")))?
            .clone();
        let mut args = Vec::with_capacity(params.len());
        for param in params {
            args.push(self.eval(&param.value, scopes)?);
        }
        function
            .call(&args)
            .map_err(|message| self.fail(format!("{name}: {message}")))
    }

    fn eval_unary(
        &self,
        op: Operator,
        operand: &Expr,
        scopes: &mut Scopes,
    ) -> Result<TemplateData, RenderError> {
        match op {
            Operator::Not => {
                let value = self.eval(operand, scopes)?;
                Ok(TemplateData::Bool(!value.is_truthy()))
            }
            Operator::Minus => match self.eval(operand, scopes)? {
                TemplateData::Int(i) => Ok(TemplateData::Int(-i)),
                TemplateData::Double(d) => Ok(TemplateData::Double(-d)),
                other => Err(self.fail(format!("cannot negate a {}", other.type_name()))),
            },
            // Evaluate resolves its operand; indirection beyond that
            // needs definitions, which this engine does not model.
            Operator::Evaluate => self.eval(operand, scopes),
            Operator::ScopeRoot => match operand {
                Expr::Variable(name) => {
                    Ok(scopes.lookup_root(name).unwrap_or(TemplateData::Nil))
                }
                Expr::Keyword(Keyword::SelfRef) => {
                    Ok(scopes.lookup_root("self").unwrap_or(TemplateData::Nil))
                }
                _ => Err(self.fail("'$' must be followed by a name")),
            },
            other => Err(self.fail(format!("'{other}' is not a prefix operator"))),
        }
    }

    fn eval_binary(
        &self,
        op: Operator,
        lhs: &Expr,
        rhs: &Expr,
        scopes: &mut Scopes,
    ) -> Result<TemplateData, RenderError> {
        use Operator::*;
        match op {
            Assignment => {
                let value = self.eval(rhs, scopes)?;
                self.assign_to(lhs, value, scopes)
            }
            CompoundPlus | CompoundMinus | CompoundMultiply | CompoundDivide | CompoundModulo => {
                let current = self.eval(lhs, scopes)?;
                let operand = self.eval(rhs, scopes)?;
                let base = match op {
                    CompoundPlus => Plus,
                    CompoundMinus => Minus,
                    CompoundMultiply => Multiply,
                    CompoundDivide => Divide,
                    _ => Modulo,
                };
                let value = self.arithmetic(base, current, operand)?;
                self.assign_to(lhs, value, scopes)
            }
            And => {
                if !self.eval(lhs, scopes)?.is_truthy() {
                    return Ok(TemplateData::Bool(false));
                }
                Ok(TemplateData::Bool(self.eval(rhs, scopes)?.is_truthy()))
            }
            Or => {
                if self.eval(lhs, scopes)?.is_truthy() {
                    return Ok(TemplateData::Bool(true));
                }
                Ok(TemplateData::Bool(self.eval(rhs, scopes)?.is_truthy()))
            }
            NilCoalesce => {
                let value = self.eval(lhs, scopes)?;
                if value.is_nil() {
                    self.eval(rhs, scopes)
                } else {
                    Ok(value)
                }
            }
            Equal => Ok(TemplateData::Bool(loose_eq(
                &self.eval(lhs, scopes)?,
                &self.eval(rhs, scopes)?,
            ))),
            Unequal => Ok(TemplateData::Bool(!loose_eq(
                &self.eval(lhs, scopes)?,
                &self.eval(rhs, scopes)?,
            ))),
            Greater | GreaterOrEqual | Lesser | LesserOrEqual => {
                let a = self.eval(lhs, scopes)?;
                let b = self.eval(rhs, scopes)?;
                self.compare(op, a, b)
            }
            Plus | Minus | Multiply | Divide | Modulo => {
                let a = self.eval(lhs, scopes)?;
                let b = self.eval(rhs, scopes)?;
                self.arithmetic(op, a, b)
            }
            ScopeMember => {
                let target = self.eval(lhs, scopes)?;
                let Expr::Variable(member) = rhs else {
                    return Err(self.fail("member access needs a name"));
                };
                match target {
                    TemplateData::Dictionary(data) => {
                        Ok(data.get(member).cloned().unwrap_or(TemplateData::Nil))
                    }
                    other => Err(self.fail(format!(
                        "cannot access member '{member}' of a {}",
                        other.type_name()
                    ))),
                }
            }
            SubscriptOpen => {
                let target = self.eval(lhs, scopes)?;
                let index = self.eval(rhs, scopes)?;
                match (target, index) {
                    (TemplateData::Array(items), TemplateData::Int(i)) => Ok(usize::try_from(i)
                        .ok()
                        .and_then(|i| items.get(i).cloned())
                        .unwrap_or(TemplateData::Nil)),
                    (TemplateData::Dictionary(data), TemplateData::String(key)) => {
                        Ok(data.get(&key).cloned().unwrap_or(TemplateData::Nil))
                    }
                    (target, index) => Err(self.fail(format!(
                        "cannot subscript a {} with a {}",
                        target.type_name(),
                        index.type_name()
                    ))),
                }
            }
            other => Err(self.fail(format!("'{other}' is not a binary operator"))),
        }
    }

    fn assign_to(
        &self,
        target: &Expr,
        value: TemplateData,
        scopes: &mut Scopes,
    ) -> Result<TemplateData, RenderError> {
        let Expr::Variable(name) = target else {
            return Err(self.fail("assignment target must be a variable"));
        };
        scopes.assign(name, value);
        Ok(TemplateData::Nil)
    }

    fn compare(
        &self,
        op: Operator,
        a: TemplateData,
        b: TemplateData,
    ) -> Result<TemplateData, RenderError> {
        let ordering = match (&a, &b) {
            (TemplateData::String(x), TemplateData::String(y)) => x.partial_cmp(y),
            _ => {
                let x = numeric(&a)
                    .ok_or_else(|| self.fail(format!("cannot compare a {}", a.type_name())))?;
                let y = numeric(&b)
                    .ok_or_else(|| self.fail(format!("cannot compare a {}", b.type_name())))?;
                x.partial_cmp(&y)
            }
        };
        let Some(ordering) = ordering else {
            return Ok(TemplateData::Bool(false));
        };
        let result = match op {
            Operator::Greater => ordering.is_gt(),
            Operator::GreaterOrEqual => ordering.is_ge(),
            Operator::Lesser => ordering.is_lt(),
            _ => ordering.is_le(),
        };
        Ok(TemplateData::Bool(result))
    }

    fn arithmetic(
        &self,
        op: Operator,
        a: TemplateData,
        b: TemplateData,
    ) -> Result<TemplateData, RenderError> {
        use TemplateData::*;
        if op == Operator::Plus {
            match (&a, &b) {
                (String(x), String(y)) => return Ok(String(format!("{x}{y}"))),
                (Array(x), Array(y)) => {
                    let mut joined = x.clone();
                    joined.extend(y.iter().cloned());
                    return Ok(Array(joined));
                }
                _ => {}
            }
        }
        match (&a, &b) {
            (Int(x), Int(y)) => {
                let (x, y) = (*x, *y);
                let result = match op {
                    Operator::Plus => x.checked_add(y),
                    Operator::Minus => x.checked_sub(y),
                    Operator::Multiply => x.checked_mul(y),
                    Operator::Divide => {
                        if y == 0 {
                            return Err(self.fail("division by zero"));
                        }
                        x.checked_div(y)
                    }
                    _ => {
                        if y == 0 {
                            return Err(self.fail("modulo by zero"));
                        }
                        x.checked_rem(y)
                    }
                };
                result
                    .map(Int)
                    .ok_or_else(|| self.fail("integer overflow"))
            }
            _ => {
                let x = numeric(&a).ok_or_else(|| {
                    self.fail(format!("cannot apply '{op}' to a {}", a.type_name()))
                })?;
                let y = numeric(&b).ok_or_else(|| {
                    self.fail(format!("cannot apply '{op}' to a {}", b.type_name()))
                })?;
                let result = match op {
                    Operator::Plus => x + y,
                    Operator::Minus => x - y,
                    Operator::Multiply => x * y,
                    Operator::Divide => {
                        if y == 0.0 {
                            return Err(self.fail("division by zero"));
                        }
                        x / y
                    }
                    _ => {
                        if y == 0.0 {
                            return Err(self.fail("modulo by zero"));
                        }
                        x % y
                    }
                };
                Ok(Double(result))
            }
        }
    }
}

fn constant_data(constant: &Constant) -> TemplateData {
    match constant {
        Constant::Bool(b) => TemplateData::Bool(*b),
        Constant::Int(i) => TemplateData::Int(*i),
        Constant::Double(d) => TemplateData::Double(*d),
        Constant::String(s) => TemplateData::String(s.clone()),
        Constant::EmptyArray => TemplateData::Array(Vec::new()),
        Constant::EmptyDict => TemplateData::Dictionary(BTreeMap::new()),
    }
}

/// Numeric view with int-to-double promotion.
fn numeric(data: &TemplateData) -> Option<f64> {
    match data {
        TemplateData::Int(i) => Some(*i as f64),
        TemplateData::Double(d) => Some(*d),
        _ => None,
    }
}

/// Equality with numeric promotion across int and double.
fn loose_eq(a: &TemplateData, b: &TemplateData) -> bool {
    match (a, b) {
        (TemplateData::Int(i), TemplateData::Double(d))
        | (TemplateData::Double(d), TemplateData::Int(i)) => *i as f64 == *d,
        _ => a == b,
    }
}
