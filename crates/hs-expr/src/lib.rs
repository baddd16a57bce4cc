//! Restricted expression language for hotswap units and debugging.
//!
//! This crate implements the small expression language that unit scripts and
//! the debug facility evaluate: literals, arithmetic, comparisons, logical
//! operators, list indexing, and calls into a fixed allowlist of builtin
//! functions. There is no way to reach the filesystem, the process table,
//! the network, or the clock from an expression.
//!
//! The allowlist is a convenience sandbox for catching accidents, not a
//! security boundary; do not evaluate expressions from untrusted principals
//! and expect containment.
//!
//! # Overview
//!
//! - [`parse`] turns source text into an [`Expr`] tree
//! - [`Scope`] holds name bindings (constants and user-defined functions)
//! - [`Evaluator`] reduces an [`Expr`] against a [`Scope`] to a [`Value`]
//!
//! # Examples
//!
//! ```
//! use hs_expr::{Evaluator, Scope, Value};
//!
//! let mut scope = Scope::new();
//! scope.set("threshold", Value::Int(10));
//!
//! let expr = hs_expr::parse("min(threshold, 7) * 2").unwrap();
//! let value = Evaluator::new().eval(&expr, &scope).unwrap();
//! assert_eq!(value, Value::Int(14));
//! ```

#![deny(clippy::all)]
#![warn(missing_docs)]

pub mod error;
pub mod eval;
pub mod parser;
pub mod token;
pub mod value;

pub use error::EvalError;
pub use eval::{Binding, Evaluator, FunctionDef, Scope};
pub use parser::{parse, BinaryOp, Expr, UnaryOp};
pub use value::Value;

/// Parses and evaluates an expression in one step.
///
/// # Errors
///
/// Returns [`EvalError`] for syntax errors and for any evaluation failure.
///
/// # Examples
///
/// ```
/// use hs_expr::{evaluate, Scope, Value};
///
/// let value = evaluate("1 + 2 * 3", &Scope::new()).unwrap();
/// assert_eq!(value, Value::Int(7));
/// ```
pub fn evaluate(source: &str, scope: &Scope) -> Result<Value, EvalError> {
    let expr = parse(source)?;
    Evaluator::new().eval(&expr, scope)
}
