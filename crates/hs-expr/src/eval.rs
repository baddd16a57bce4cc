//! Expression evaluation against a scope of bindings.
//!
//! The evaluator reduces a parsed [`Expr`] to a [`Value`] using a [`Scope`]
//! of named bindings. Bindings are either constants or user-defined
//! functions (`double(x) = x * 2` in unit scripts); function bodies are
//! evaluated with their parameters layered over the defining scope.
//!
//! Builtins are a fixed allowlist of pure operations over the value types.
//! Nothing in the allowlist can touch the filesystem, environment, network,
//! or clock. The allowlist is advisory: it guards against accidents, not
//! against a hostile expression author.

use std::cmp::Ordering;
use std::sync::Arc;

use rustc_hash::FxHashMap;

use crate::error::EvalError;
use crate::parser::{BinaryOp, Expr, UnaryOp};
use crate::value::Value;

/// Names of the allowlisted builtin functions.
const BUILTIN_NAMES: &[&str] = &[
    "len", "min", "max", "sum", "abs", "round", "int", "float", "str", "bool", "sorted",
    "reversed", "contains", "upper", "lower", "type",
];

/// Returns the names of the allowlisted builtin functions.
#[must_use]
pub const fn builtin_names() -> &'static [&'static str] {
    BUILTIN_NAMES
}

/// A user-defined function: named parameters and a body expression.
#[derive(Debug, Clone, PartialEq)]
pub struct FunctionDef {
    /// The function's name.
    pub name: String,
    /// Parameter names, in declaration order.
    pub params: Vec<String>,
    /// The body expression.
    pub body: Arc<Expr>,
}

impl FunctionDef {
    /// Returns a `name(a, b)`-style signature string.
    #[must_use]
    pub fn signature(&self) -> String {
        format!("{}({})", self.name, self.params.join(", "))
    }
}

/// A named binding: a constant value or a function definition.
#[derive(Debug, Clone, PartialEq)]
pub enum Binding {
    /// A constant value.
    Value(Value),
    /// A user-defined function.
    Function(FunctionDef),
}

/// A set of named bindings for evaluation.
///
/// # Examples
///
/// ```
/// use hs_expr::{evaluate, Scope, Value};
///
/// let mut scope = Scope::new();
/// scope.set("x", Value::Int(5));
/// assert_eq!(evaluate("x + 1", &scope).unwrap(), Value::Int(6));
/// ```
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Scope {
    bindings: FxHashMap<String, Binding>,
}

impl Scope {
    /// Creates an empty scope.
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Binds a name to a constant value, replacing any previous binding.
    pub fn set(&mut self, name: impl Into<String>, value: Value) {
        self.bindings.insert(name.into(), Binding::Value(value));
    }

    /// Binds a function definition under its own name.
    pub fn set_function(&mut self, def: FunctionDef) {
        self.bindings
            .insert(def.name.clone(), Binding::Function(def));
    }

    /// Returns the binding for a name, if present.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&Binding> {
        self.bindings.get(name)
    }

    /// Iterates over all bound names.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.bindings.keys().map(String::as_str)
    }

    /// Returns the number of bindings.
    #[must_use]
    pub fn len(&self) -> usize {
        self.bindings.len()
    }

    /// Returns `true` if the scope has no bindings.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.bindings.is_empty()
    }
}

/// Evaluates expressions with a bounded call depth.
///
/// # Examples
///
/// ```
/// use hs_expr::{Evaluator, Scope, Value};
///
/// let expr = hs_expr::parse("len([1, 2, 3])").unwrap();
/// let value = Evaluator::new().eval(&expr, &Scope::new()).unwrap();
/// assert_eq!(value, Value::Int(3));
/// ```
#[derive(Debug, Clone, Copy)]
pub struct Evaluator {
    max_depth: usize,
}

impl Default for Evaluator {
    fn default() -> Self {
        Self { max_depth: 64 }
    }
}

impl Evaluator {
    /// Creates an evaluator with the default call-depth limit (64).
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates an evaluator with a custom call-depth limit.
    #[inline]
    #[must_use]
    pub const fn with_max_depth(max_depth: usize) -> Self {
        Self { max_depth }
    }

    /// Evaluates an expression against a scope.
    ///
    /// # Errors
    ///
    /// Returns [`EvalError`] for unknown names, type mismatches, division by
    /// zero, arity errors, out-of-range indices, and recursion past the
    /// depth limit.
    pub fn eval(&self, expr: &Expr, scope: &Scope) -> Result<Value, EvalError> {
        let locals = FxHashMap::default();
        self.eval_at(expr, scope, &locals, 0)
    }

    fn eval_at(
        &self,
        expr: &Expr,
        scope: &Scope,
        locals: &FxHashMap<String, Value>,
        depth: usize,
    ) -> Result<Value, EvalError> {
        match expr {
            Expr::Literal(value) => Ok(value.clone()),
            Expr::Ident(name) => self.resolve(name, scope, locals),
            Expr::Unary { op, operand } => {
                let value = self.eval_at(operand, scope, locals, depth)?;
                eval_unary(*op, &value)
            }
            Expr::Binary { op, left, right } => {
                let lhs = self.eval_at(left, scope, locals, depth)?;
                // Short-circuit before touching the right operand.
                match op {
                    BinaryOp::And if !lhs.is_truthy() => return Ok(Value::Bool(false)),
                    BinaryOp::Or if lhs.is_truthy() => return Ok(Value::Bool(true)),
                    _ => {}
                }
                let rhs = self.eval_at(right, scope, locals, depth)?;
                eval_binary(*op, &lhs, &rhs)
            }
            Expr::Index { target, index } => {
                let target = self.eval_at(target, scope, locals, depth)?;
                let index = self.eval_at(index, scope, locals, depth)?;
                eval_index(&target, &index)
            }
            Expr::List(items) => {
                let mut values = Vec::with_capacity(items.len());
                for item in items {
                    values.push(self.eval_at(item, scope, locals, depth)?);
                }
                Ok(Value::List(values))
            }
            Expr::Call { function, args } => {
                let mut values = Vec::with_capacity(args.len());
                for arg in args {
                    values.push(self.eval_at(arg, scope, locals, depth)?);
                }
                self.call(function, &values, scope, depth)
            }
        }
    }

    fn resolve(
        &self,
        name: &str,
        scope: &Scope,
        locals: &FxHashMap<String, Value>,
    ) -> Result<Value, EvalError> {
        if let Some(value) = locals.get(name) {
            return Ok(value.clone());
        }
        match scope.get(name) {
            Some(Binding::Value(value)) => Ok(value.clone()),
            Some(Binding::Function(def)) => Err(EvalError::type_mismatch(format!(
                "function '{}' used as a value",
                def.name
            ))),
            None => Err(EvalError::UnknownIdentifier(name.to_owned())),
        }
    }

    /// Calls a scope function or allowlisted builtin.
    ///
    /// Scope functions shadow builtins of the same name.
    fn call(
        &self,
        function: &str,
        args: &[Value],
        scope: &Scope,
        depth: usize,
    ) -> Result<Value, EvalError> {
        if let Some(Binding::Function(def)) = scope.get(function) {
            if depth + 1 > self.max_depth {
                return Err(EvalError::RecursionLimit(self.max_depth));
            }
            if def.params.len() != args.len() {
                return Err(EvalError::WrongArity {
                    function: function.to_owned(),
                    expected: def.params.len(),
                    got: args.len(),
                });
            }
            let mut frame = FxHashMap::default();
            for (param, arg) in def.params.iter().zip(args) {
                frame.insert(param.clone(), arg.clone());
            }
            return self.eval_at(&def.body, scope, &frame, depth + 1);
        }

        call_builtin(function, args)
    }
}

fn eval_unary(op: UnaryOp, value: &Value) -> Result<Value, EvalError> {
    match op {
        UnaryOp::Not => Ok(Value::Bool(!value.is_truthy())),
        UnaryOp::Neg => match value {
            Value::Int(i) => i
                .checked_neg()
                .map(Value::Int)
                .ok_or_else(|| EvalError::type_mismatch("integer overflow in negation")),
            Value::Float(f) => Ok(Value::Float(-f)),
            other => Err(EvalError::type_mismatch(format!(
                "cannot negate {}",
                other.type_name()
            ))),
        },
    }
}

fn eval_binary(op: BinaryOp, lhs: &Value, rhs: &Value) -> Result<Value, EvalError> {
    match op {
        // Short-circuit cases were handled by the caller; reaching here means
        // the result is the truthiness of the right operand.
        BinaryOp::And | BinaryOp::Or => Ok(Value::Bool(rhs.is_truthy())),
        BinaryOp::Eq => Ok(Value::Bool(lhs.loose_eq(rhs))),
        BinaryOp::Ne => Ok(Value::Bool(!lhs.loose_eq(rhs))),
        BinaryOp::Lt | BinaryOp::Le | BinaryOp::Gt | BinaryOp::Ge => {
            let ordering = lhs.partial_cmp_values(rhs).ok_or_else(|| {
                EvalError::type_mismatch(format!(
                    "cannot compare {} and {}",
                    lhs.type_name(),
                    rhs.type_name()
                ))
            })?;
            let result = match op {
                BinaryOp::Lt => ordering == Ordering::Less,
                BinaryOp::Le => ordering != Ordering::Greater,
                BinaryOp::Gt => ordering == Ordering::Greater,
                _ => ordering != Ordering::Less,
            };
            Ok(Value::Bool(result))
        }
        BinaryOp::Add => eval_add(lhs, rhs),
        BinaryOp::Sub | BinaryOp::Mul | BinaryOp::Div | BinaryOp::Rem => {
            eval_arithmetic(op, lhs, rhs)
        }
    }
}

fn eval_add(lhs: &Value, rhs: &Value) -> Result<Value, EvalError> {
    match (lhs, rhs) {
        (Value::Str(a), Value::Str(b)) => Ok(Value::Str(format!("{a}{b}"))),
        (Value::List(a), Value::List(b)) => {
            let mut out = a.clone();
            out.extend(b.iter().cloned());
            Ok(Value::List(out))
        }
        _ => eval_arithmetic(BinaryOp::Add, lhs, rhs),
    }
}

#[allow(clippy::cast_precision_loss)]
fn eval_arithmetic(op: BinaryOp, lhs: &Value, rhs: &Value) -> Result<Value, EvalError> {
    match (lhs, rhs) {
        (Value::Int(a), Value::Int(b)) => {
            let result = match op {
                BinaryOp::Add => a.checked_add(*b),
                BinaryOp::Sub => a.checked_sub(*b),
                BinaryOp::Mul => a.checked_mul(*b),
                BinaryOp::Div => {
                    if *b == 0 {
                        return Err(EvalError::DivisionByZero);
                    }
                    a.checked_div(*b)
                }
                BinaryOp::Rem => {
                    if *b == 0 {
                        return Err(EvalError::DivisionByZero);
                    }
                    a.checked_rem(*b)
                }
                _ => None,
            };
            result
                .map(Value::Int)
                .ok_or_else(|| EvalError::type_mismatch("integer overflow"))
        }
        (Value::Int(_) | Value::Float(_), Value::Int(_) | Value::Float(_)) => {
            let a = as_f64(lhs);
            let b = as_f64(rhs);
            let result = match op {
                BinaryOp::Add => a + b,
                BinaryOp::Sub => a - b,
                BinaryOp::Mul => a * b,
                BinaryOp::Div => {
                    if b == 0.0 {
                        return Err(EvalError::DivisionByZero);
                    }
                    a / b
                }
                BinaryOp::Rem => {
                    if b == 0.0 {
                        return Err(EvalError::DivisionByZero);
                    }
                    a % b
                }
                _ => {
                    return Err(EvalError::type_mismatch("unsupported float operation"));
                }
            };
            Ok(Value::Float(result))
        }
        _ => Err(EvalError::type_mismatch(format!(
            "cannot apply arithmetic to {} and {}",
            lhs.type_name(),
            rhs.type_name()
        ))),
    }
}

#[allow(clippy::cast_precision_loss)]
fn as_f64(value: &Value) -> f64 {
    match value {
        Value::Int(i) => *i as f64,
        Value::Float(f) => *f,
        _ => 0.0,
    }
}

fn eval_index(target: &Value, index: &Value) -> Result<Value, EvalError> {
    let Value::Int(i) = index else {
        return Err(EvalError::type_mismatch(format!(
            "index must be int, got {}",
            index.type_name()
        )));
    };

    match target {
        Value::List(items) => {
            let idx = usize::try_from(*i).map_err(|_| EvalError::IndexOutOfBounds {
                index: *i,
                len: items.len(),
            })?;
            items
                .get(idx)
                .cloned()
                .ok_or(EvalError::IndexOutOfBounds {
                    index: *i,
                    len: items.len(),
                })
        }
        Value::Str(s) => {
            let len = s.chars().count();
            let idx = usize::try_from(*i)
                .map_err(|_| EvalError::IndexOutOfBounds { index: *i, len })?;
            s.chars()
                .nth(idx)
                .map(|c| Value::Str(c.to_string()))
                .ok_or(EvalError::IndexOutOfBounds { index: *i, len })
        }
        other => Err(EvalError::type_mismatch(format!(
            "cannot index {}",
            other.type_name()
        ))),
    }
}

fn expect_arity(function: &str, expected: usize, args: &[Value]) -> Result<(), EvalError> {
    if args.len() == expected {
        Ok(())
    } else {
        Err(EvalError::WrongArity {
            function: function.to_owned(),
            expected,
            got: args.len(),
        })
    }
}

#[allow(clippy::too_many_lines)]
fn call_builtin(function: &str, args: &[Value]) -> Result<Value, EvalError> {
    match function {
        "len" => {
            expect_arity("len", 1, args)?;
            match &args[0] {
                Value::Str(s) => i64::try_from(s.chars().count())
                    .map(Value::Int)
                    .map_err(|_| EvalError::type_mismatch("length exceeds int range")),
                Value::List(items) => i64::try_from(items.len())
                    .map(Value::Int)
                    .map_err(|_| EvalError::type_mismatch("length exceeds int range")),
                other => Err(EvalError::type_mismatch(format!(
                    "len() expects str or list, got {}",
                    other.type_name()
                ))),
            }
        }
        "min" | "max" => pick_extreme(function, args),
        "sum" => {
            expect_arity("sum", 1, args)?;
            let Value::List(items) = &args[0] else {
                return Err(EvalError::type_mismatch("sum() expects a list"));
            };
            let mut int_total: i64 = 0;
            let mut float_total = 0.0_f64;
            let mut saw_float = false;
            for item in items {
                match item {
                    Value::Int(i) => {
                        int_total = int_total
                            .checked_add(*i)
                            .ok_or_else(|| EvalError::type_mismatch("integer overflow in sum"))?;
                    }
                    Value::Float(f) => {
                        saw_float = true;
                        float_total += f;
                    }
                    other => {
                        return Err(EvalError::type_mismatch(format!(
                            "sum() expects numbers, got {}",
                            other.type_name()
                        )));
                    }
                }
            }
            if saw_float {
                #[allow(clippy::cast_precision_loss)]
                Ok(Value::Float(float_total + int_total as f64))
            } else {
                Ok(Value::Int(int_total))
            }
        }
        "abs" => {
            expect_arity("abs", 1, args)?;
            match &args[0] {
                Value::Int(i) => i
                    .checked_abs()
                    .map(Value::Int)
                    .ok_or_else(|| EvalError::type_mismatch("integer overflow in abs")),
                Value::Float(f) => Ok(Value::Float(f.abs())),
                other => Err(EvalError::type_mismatch(format!(
                    "abs() expects a number, got {}",
                    other.type_name()
                ))),
            }
        }
        "round" => {
            expect_arity("round", 1, args)?;
            match &args[0] {
                Value::Int(i) => Ok(Value::Int(*i)),
                Value::Float(f) if f.is_finite() => {
                    #[allow(clippy::cast_possible_truncation)]
                    Ok(Value::Int(f.round() as i64))
                }
                Value::Float(_) => Err(EvalError::type_mismatch("cannot round a non-finite float")),
                other => Err(EvalError::type_mismatch(format!(
                    "round() expects a number, got {}",
                    other.type_name()
                ))),
            }
        }
        "int" => {
            expect_arity("int", 1, args)?;
            match &args[0] {
                Value::Int(i) => Ok(Value::Int(*i)),
                Value::Float(f) if f.is_finite() => {
                    #[allow(clippy::cast_possible_truncation)]
                    Ok(Value::Int(f.trunc() as i64))
                }
                Value::Float(_) => Err(EvalError::type_mismatch("cannot convert non-finite float")),
                Value::Bool(b) => Ok(Value::Int(i64::from(*b))),
                Value::Str(s) => s.trim().parse().map(Value::Int).map_err(|_| {
                    EvalError::type_mismatch(format!("invalid integer string {s:?}"))
                }),
                other => Err(EvalError::type_mismatch(format!(
                    "int() cannot convert {}",
                    other.type_name()
                ))),
            }
        }
        "float" => {
            expect_arity("float", 1, args)?;
            match &args[0] {
                #[allow(clippy::cast_precision_loss)]
                Value::Int(i) => Ok(Value::Float(*i as f64)),
                Value::Float(f) => Ok(Value::Float(*f)),
                Value::Str(s) => s.trim().parse().map(Value::Float).map_err(|_| {
                    EvalError::type_mismatch(format!("invalid float string {s:?}"))
                }),
                other => Err(EvalError::type_mismatch(format!(
                    "float() cannot convert {}",
                    other.type_name()
                ))),
            }
        }
        "str" => {
            expect_arity("str", 1, args)?;
            Ok(Value::Str(args[0].to_string()))
        }
        "bool" => {
            expect_arity("bool", 1, args)?;
            Ok(Value::Bool(args[0].is_truthy()))
        }
        "sorted" => {
            expect_arity("sorted", 1, args)?;
            let Value::List(items) = &args[0] else {
                return Err(EvalError::type_mismatch("sorted() expects a list"));
            };
            let mut out = items.clone();
            let mut failure = None;
            out.sort_by(|a, b| {
                a.partial_cmp_values(b).unwrap_or_else(|| {
                    failure = Some(EvalError::type_mismatch(format!(
                        "cannot order {} and {}",
                        a.type_name(),
                        b.type_name()
                    )));
                    Ordering::Equal
                })
            });
            match failure {
                Some(err) => Err(err),
                None => Ok(Value::List(out)),
            }
        }
        "reversed" => {
            expect_arity("reversed", 1, args)?;
            match &args[0] {
                Value::List(items) => {
                    let mut out = items.clone();
                    out.reverse();
                    Ok(Value::List(out))
                }
                Value::Str(s) => Ok(Value::Str(s.chars().rev().collect())),
                other => Err(EvalError::type_mismatch(format!(
                    "reversed() expects str or list, got {}",
                    other.type_name()
                ))),
            }
        }
        "contains" => {
            expect_arity("contains", 2, args)?;
            match (&args[0], &args[1]) {
                (Value::List(items), needle) => {
                    Ok(Value::Bool(items.iter().any(|v| v.loose_eq(needle))))
                }
                (Value::Str(haystack), Value::Str(needle)) => {
                    Ok(Value::Bool(haystack.contains(needle.as_str())))
                }
                (a, b) => Err(EvalError::type_mismatch(format!(
                    "contains() expects (list, any) or (str, str), got ({}, {})",
                    a.type_name(),
                    b.type_name()
                ))),
            }
        }
        "upper" => {
            expect_arity("upper", 1, args)?;
            match &args[0] {
                Value::Str(s) => Ok(Value::Str(s.to_uppercase())),
                other => Err(EvalError::type_mismatch(format!(
                    "upper() expects str, got {}",
                    other.type_name()
                ))),
            }
        }
        "lower" => {
            expect_arity("lower", 1, args)?;
            match &args[0] {
                Value::Str(s) => Ok(Value::Str(s.to_lowercase())),
                other => Err(EvalError::type_mismatch(format!(
                    "lower() expects str, got {}",
                    other.type_name()
                ))),
            }
        }
        "type" => {
            expect_arity("type", 1, args)?;
            Ok(Value::Str(args[0].type_name().to_owned()))
        }
        _ => Err(EvalError::UnknownFunction(function.to_owned())),
    }
}

/// Implements `min`/`max` over either one list or two-plus scalars.
fn pick_extreme(function: &str, args: &[Value]) -> Result<Value, EvalError> {
    let candidates: &[Value] = match args {
        [Value::List(items)] => {
            if items.is_empty() {
                return Err(EvalError::type_mismatch(format!(
                    "{function}() of an empty list"
                )));
            }
            items
        }
        [] | [_] => {
            return Err(EvalError::WrongArity {
                function: function.to_owned(),
                expected: 2,
                got: args.len(),
            });
        }
        _ => args,
    };

    let mut best = &candidates[0];
    for candidate in &candidates[1..] {
        let ordering = candidate.partial_cmp_values(best).ok_or_else(|| {
            EvalError::type_mismatch(format!(
                "cannot order {} and {}",
                candidate.type_name(),
                best.type_name()
            ))
        })?;
        let take = if function == "min" {
            ordering == Ordering::Less
        } else {
            ordering == Ordering::Greater
        };
        if take {
            best = candidate;
        }
    }
    Ok(best.clone())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parse;

    fn eval_str(source: &str, scope: &Scope) -> Result<Value, EvalError> {
        Evaluator::new().eval(&parse(source)?, scope)
    }

    #[test]
    fn test_arithmetic() {
        let scope = Scope::new();
        assert_eq!(eval_str("1 + 2 * 3", &scope).unwrap(), Value::Int(7));
        assert_eq!(eval_str("10 / 3", &scope).unwrap(), Value::Int(3));
        assert_eq!(eval_str("10 % 3", &scope).unwrap(), Value::Int(1));
        assert_eq!(eval_str("2.5 + 1", &scope).unwrap(), Value::Float(3.5));
        assert_eq!(eval_str("-(3)", &scope).unwrap(), Value::Int(-3));
    }

    #[test]
    fn test_division_by_zero() {
        let scope = Scope::new();
        assert_eq!(
            eval_str("1 / 0", &scope).unwrap_err(),
            EvalError::DivisionByZero
        );
        assert_eq!(
            eval_str("1 % 0", &scope).unwrap_err(),
            EvalError::DivisionByZero
        );
    }

    #[test]
    fn test_string_concat() {
        let scope = Scope::new();
        assert_eq!(
            eval_str("'foo' + 'bar'", &scope).unwrap(),
            Value::Str("foobar".to_owned())
        );
    }

    #[test]
    fn test_list_concat_and_index() {
        let scope = Scope::new();
        assert_eq!(
            eval_str("([1] + [2, 3])[2]", &scope).unwrap(),
            Value::Int(3)
        );
        assert_eq!(
            eval_str("'abc'[1]", &scope).unwrap(),
            Value::Str("b".to_owned())
        );
    }

    #[test]
    fn test_index_out_of_bounds() {
        let scope = Scope::new();
        assert!(matches!(
            eval_str("[1, 2][5]", &scope).unwrap_err(),
            EvalError::IndexOutOfBounds { index: 5, len: 2 }
        ));
        assert!(matches!(
            eval_str("[1][-1]", &scope).unwrap_err(),
            EvalError::IndexOutOfBounds { .. }
        ));
    }

    #[test]
    fn test_comparisons() {
        let scope = Scope::new();
        assert_eq!(eval_str("1 < 2", &scope).unwrap(), Value::Bool(true));
        assert_eq!(eval_str("2 <= 2", &scope).unwrap(), Value::Bool(true));
        assert_eq!(eval_str("1 == 1.0", &scope).unwrap(), Value::Bool(true));
        assert_eq!(eval_str("'a' < 'b'", &scope).unwrap(), Value::Bool(true));
        assert_eq!(eval_str("1 == 'one'", &scope).unwrap(), Value::Bool(false));
        assert!(eval_str("1 < 'two'", &scope).is_err());
    }

    #[test]
    fn test_logical_short_circuit() {
        let scope = Scope::new();
        // The right side would fail on evaluation; short circuit must skip it.
        assert_eq!(
            eval_str("false && missing", &scope).unwrap(),
            Value::Bool(false)
        );
        assert_eq!(
            eval_str("true || missing", &scope).unwrap(),
            Value::Bool(true)
        );
        assert_eq!(eval_str("!0", &scope).unwrap(), Value::Bool(true));
    }

    #[test]
    fn test_identifier_resolution() {
        let mut scope = Scope::new();
        scope.set("x", Value::Int(9));
        assert_eq!(eval_str("x + 1", &scope).unwrap(), Value::Int(10));
        assert!(matches!(
            eval_str("y", &scope).unwrap_err(),
            EvalError::UnknownIdentifier(name) if name == "y"
        ));
    }

    #[test]
    fn test_builtins() {
        let scope = Scope::new();
        assert_eq!(eval_str("len('abc')", &scope).unwrap(), Value::Int(3));
        assert_eq!(eval_str("len([1, 2])", &scope).unwrap(), Value::Int(2));
        assert_eq!(eval_str("min(3, 1, 2)", &scope).unwrap(), Value::Int(1));
        assert_eq!(eval_str("max([3, 1, 2])", &scope).unwrap(), Value::Int(3));
        assert_eq!(eval_str("sum([1, 2, 3])", &scope).unwrap(), Value::Int(6));
        assert_eq!(eval_str("abs(-4)", &scope).unwrap(), Value::Int(4));
        assert_eq!(eval_str("round(2.6)", &scope).unwrap(), Value::Int(3));
        assert_eq!(eval_str("int('42')", &scope).unwrap(), Value::Int(42));
        assert_eq!(eval_str("float(1)", &scope).unwrap(), Value::Float(1.0));
        assert_eq!(
            eval_str("str(12)", &scope).unwrap(),
            Value::Str("12".to_owned())
        );
        assert_eq!(eval_str("bool([])", &scope).unwrap(), Value::Bool(false));
        assert_eq!(
            eval_str("sorted([3, 1, 2])", &scope).unwrap(),
            Value::List(vec![Value::Int(1), Value::Int(2), Value::Int(3)])
        );
        assert_eq!(
            eval_str("reversed('abc')", &scope).unwrap(),
            Value::Str("cba".to_owned())
        );
        assert_eq!(
            eval_str("contains([1, 2], 2)", &scope).unwrap(),
            Value::Bool(true)
        );
        assert_eq!(
            eval_str("contains('hello', 'ell')", &scope).unwrap(),
            Value::Bool(true)
        );
        assert_eq!(
            eval_str("upper('abc')", &scope).unwrap(),
            Value::Str("ABC".to_owned())
        );
        assert_eq!(
            eval_str("type(1.5)", &scope).unwrap(),
            Value::Str("float".to_owned())
        );
    }

    #[test]
    fn test_unknown_function_is_rejected() {
        let scope = Scope::new();
        assert!(matches!(
            eval_str("open('/etc/passwd')", &scope).unwrap_err(),
            EvalError::UnknownFunction(name) if name == "open"
        ));
    }

    #[test]
    fn test_builtin_arity() {
        let scope = Scope::new();
        assert!(matches!(
            eval_str("len(1, 2)", &scope).unwrap_err(),
            EvalError::WrongArity { .. }
        ));
    }

    #[test]
    fn test_user_function_call() {
        let mut scope = Scope::new();
        scope.set_function(FunctionDef {
            name: "double".to_owned(),
            params: vec!["x".to_owned()],
            body: Arc::new(parse("x * 2").unwrap()),
        });

        assert_eq!(eval_str("double(21)", &scope).unwrap(), Value::Int(42));
        assert!(matches!(
            eval_str("double(1, 2)", &scope).unwrap_err(),
            EvalError::WrongArity { expected: 1, got: 2, .. }
        ));
    }

    #[test]
    fn test_user_function_sees_scope_constants() {
        let mut scope = Scope::new();
        scope.set("base", Value::Int(100));
        scope.set_function(FunctionDef {
            name: "offset".to_owned(),
            params: vec!["x".to_owned()],
            body: Arc::new(parse("base + x").unwrap()),
        });

        assert_eq!(eval_str("offset(5)", &scope).unwrap(), Value::Int(105));
    }

    #[test]
    fn test_function_used_as_value_is_an_error() {
        let mut scope = Scope::new();
        scope.set_function(FunctionDef {
            name: "f".to_owned(),
            params: vec![],
            body: Arc::new(parse("1").unwrap()),
        });
        assert!(matches!(
            eval_str("f + 1", &scope).unwrap_err(),
            EvalError::TypeMismatch(_)
        ));
    }

    #[test]
    fn test_recursion_limit() {
        let mut scope = Scope::new();
        scope.set_function(FunctionDef {
            name: "loop_forever".to_owned(),
            params: vec!["x".to_owned()],
            body: Arc::new(parse("loop_forever(x + 1)").unwrap()),
        });

        assert!(matches!(
            eval_str("loop_forever(0)", &scope).unwrap_err(),
            EvalError::RecursionLimit(64)
        ));
    }

    #[test]
    fn test_nested_calls_below_limit_succeed() {
        let mut scope = Scope::new();
        scope.set_function(FunctionDef {
            name: "inc".to_owned(),
            params: vec!["x".to_owned()],
            body: Arc::new(parse("x + 1").unwrap()),
        });
        assert_eq!(
            eval_str("inc(inc(inc(0)))", &scope).unwrap(),
            Value::Int(3)
        );
    }

    #[test]
    fn test_builtin_names_listed() {
        assert!(builtin_names().contains(&"len"));
        assert!(builtin_names().contains(&"type"));
        assert!(!builtin_names().contains(&"open"));
    }
}
