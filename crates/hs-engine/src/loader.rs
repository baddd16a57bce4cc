//! The unit loader abstraction and the script loader.
//!
//! A **unit** is one independently loadable piece of code, produced by a
//! [`UnitLoader`] from source text and handled through the opaque
//! [`LoadedUnit`] trait. The reload protocol in [`crate::engine`] only ever
//! talks to these traits, so how code is actually compiled and executed is
//! pluggable.
//!
//! The default implementation is [`ScriptLoader`], which executes the
//! hs-expr script format: one binding per line, either a constant
//! (`threshold = 10 * 2`) or a function (`double(x) = x * 2`), with `#`
//! comments. Constants evaluate eagerly in file order - that is the unit's
//! "top-level code" - so a bad line fails the entire load and no partial
//! namespace escapes.

use std::sync::Arc;

use hs_expr::{parse, Binding, Evaluator, FunctionDef, Scope, Value};

/// A failed unit load: human-readable message plus a diagnostic detail.
#[derive(Debug, Clone, thiserror::Error)]
#[error("{message}")]
pub struct LoadFailure {
    /// One-line description of the failure.
    pub message: String,
    /// Diagnostic detail (offending line, evaluator error).
    pub detail: String,
}

impl LoadFailure {
    /// Creates a failure with identical message and detail.
    #[must_use]
    pub fn new(message: impl Into<String>, detail: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            detail: detail.into(),
        }
    }
}

/// Errors from calling into a loaded unit.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum UnitError {
    /// The unit exports no symbol with this name.
    #[error("unit has no symbol '{0}'")]
    UnknownSymbol(String),

    /// The symbol is a constant and was called with arguments.
    #[error("symbol '{0}' is not callable with arguments")]
    NotCallable(String),

    /// Evaluating the symbol's body failed.
    #[error("evaluation failed: {0}")]
    Eval(#[from] hs_expr::EvalError),
}

/// Description of one exported symbol, for inspection.
#[derive(Debug, Clone, PartialEq)]
pub enum SymbolKind {
    /// A constant with its current value.
    Constant(Value),
    /// A function with its printable signature and parameter names.
    Function {
        /// `name(a, b)`-style signature.
        signature: String,
        /// Parameter names in declaration order.
        params: Vec<String>,
    },
}

/// An opaque, swappable handle to loaded code.
///
/// Exactly one `LoadedUnit` is live per registered module name; the engine
/// swaps the handle atomically on reload. Implementations must be immutable
/// after construction so a handle observed by one thread never changes
/// underneath it.
pub trait LoadedUnit: Send + Sync + std::fmt::Debug {
    /// The module name this unit was loaded under.
    fn name(&self) -> &str;

    /// Exported symbol names, in declaration order.
    fn symbols(&self) -> Vec<String>;

    /// Resolves a constant symbol to its value.
    ///
    /// Returns `None` for functions and unknown names.
    fn get(&self, symbol: &str) -> Option<Value>;

    /// Calls an exported symbol.
    ///
    /// Functions evaluate their body with arguments bound; a constant called
    /// with zero arguments returns its value.
    ///
    /// # Errors
    ///
    /// Returns [`UnitError`] for unknown symbols, constants called with
    /// arguments, and evaluation failures.
    fn call(&self, symbol: &str, args: &[Value]) -> Result<Value, UnitError>;

    /// Describes an exported symbol for inspection.
    fn describe(&self, symbol: &str) -> Option<SymbolKind>;
}

/// Produces a [`LoadedUnit`] from source text.
///
/// Implementations must execute the unit's top-level code into a fresh
/// namespace on every call; nothing may leak between loads of the same
/// source.
pub trait UnitLoader: Send + Sync {
    /// Executes `source` as a unit named `name`.
    ///
    /// # Errors
    ///
    /// Returns [`LoadFailure`] if the source fails to parse or its top-level
    /// code fails to execute. On failure no partial unit is returned.
    fn load(&self, name: &str, source: &str) -> Result<Arc<dyn LoadedUnit>, LoadFailure>;
}

/// A unit produced by [`ScriptLoader`]: an immutable namespace of bindings.
#[derive(Debug)]
pub struct ScriptUnit {
    name: String,
    scope: Scope,
    order: Vec<String>,
    evaluator: Evaluator,
}

impl LoadedUnit for ScriptUnit {
    fn name(&self) -> &str {
        &self.name
    }

    fn symbols(&self) -> Vec<String> {
        self.order.clone()
    }

    fn get(&self, symbol: &str) -> Option<Value> {
        match self.scope.get(symbol) {
            Some(Binding::Value(value)) => Some(value.clone()),
            _ => None,
        }
    }

    fn call(&self, symbol: &str, args: &[Value]) -> Result<Value, UnitError> {
        match self.scope.get(symbol) {
            Some(Binding::Function(def)) => {
                if def.params.len() != args.len() {
                    return Err(UnitError::Eval(hs_expr::EvalError::WrongArity {
                        function: symbol.to_owned(),
                        expected: def.params.len(),
                        got: args.len(),
                    }));
                }
                let call_expr = hs_expr::Expr::Call {
                    function: symbol.to_owned(),
                    args: args
                        .iter()
                        .map(|v| hs_expr::Expr::Literal(v.clone()))
                        .collect(),
                };
                self.evaluator
                    .eval(&call_expr, &self.scope)
                    .map_err(UnitError::Eval)
            }
            Some(Binding::Value(value)) => {
                if args.is_empty() {
                    Ok(value.clone())
                } else {
                    Err(UnitError::NotCallable(symbol.to_owned()))
                }
            }
            None => Err(UnitError::UnknownSymbol(symbol.to_owned())),
        }
    }

    fn describe(&self, symbol: &str) -> Option<SymbolKind> {
        match self.scope.get(symbol)? {
            Binding::Value(value) => Some(SymbolKind::Constant(value.clone())),
            Binding::Function(def) => Some(SymbolKind::Function {
                signature: def.signature(),
                params: def.params.clone(),
            }),
        }
    }
}

/// Loads units written in the hs-expr script format.
///
/// # Script format
///
/// ```text
/// # comments and blank lines are skipped
/// threshold = 10 * 2          # a constant, evaluated at load time
/// double(x) = x * 2           # a function, body parsed at load time
/// limit = threshold + 1       # later bindings see earlier ones
/// ```
///
/// # Examples
///
/// ```
/// use hs_engine::{ScriptLoader, UnitLoader};
/// use hs_expr::Value;
///
/// let unit = ScriptLoader::new().load("m", "f = 1").unwrap();
/// assert_eq!(unit.call("f", &[]).unwrap(), Value::Int(1));
/// ```
#[derive(Debug, Clone, Default)]
pub struct ScriptLoader {
    evaluator: Evaluator,
}

impl ScriptLoader {
    /// Creates a loader with the default evaluator limits.
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Executes a script and returns its namespace as a [`Scope`].
    ///
    /// Useful for evaluating ad-hoc expressions against a unit's bindings
    /// without registering anything.
    ///
    /// # Errors
    ///
    /// Returns [`LoadFailure`] exactly as [`UnitLoader::load`] does.
    pub fn load_scope(&self, source: &str) -> Result<Scope, LoadFailure> {
        self.build_namespace(source).map(|(scope, _)| scope)
    }

    /// Executes a script into a fresh namespace, tracking symbol order.
    fn build_namespace(&self, source: &str) -> Result<(Scope, Vec<String>), LoadFailure> {
        let mut scope = Scope::new();
        let mut order: Vec<String> = Vec::new();

        for (line_no, raw_line) in source.lines().enumerate() {
            let line_no = line_no + 1;
            let line = strip_comment(raw_line).trim();
            if line.is_empty() {
                continue;
            }

            let Some(eq_index) = find_binding_eq(line) else {
                return Err(LoadFailure::new(
                    format!("line {line_no}: expected a 'name = expression' binding"),
                    raw_line.trim().to_owned(),
                ));
            };

            let lhs = line[..eq_index].trim();
            let rhs = line[eq_index + 1..].trim();

            let body = parse(rhs).map_err(|e| {
                LoadFailure::new(format!("line {line_no}: {e}"), raw_line.trim().to_owned())
            })?;

            let target = parse_binding_target(lhs).ok_or_else(|| {
                LoadFailure::new(
                    format!("line {line_no}: invalid binding target '{lhs}'"),
                    raw_line.trim().to_owned(),
                )
            })?;

            match target {
                BindingTarget::Constant(symbol) => {
                    // Top-level code runs here: constants evaluate eagerly
                    // against the bindings established so far.
                    let value = self.evaluator.eval(&body, &scope).map_err(|e| {
                        LoadFailure::new(
                            format!("line {line_no}: {e}"),
                            raw_line.trim().to_owned(),
                        )
                    })?;
                    if scope.get(&symbol).is_none() {
                        order.push(symbol.clone());
                    }
                    scope.set(symbol, value);
                }
                BindingTarget::Function { symbol, params } => {
                    if scope.get(&symbol).is_none() {
                        order.push(symbol.clone());
                    }
                    scope.set_function(FunctionDef {
                        name: symbol,
                        params,
                        body: Arc::new(body),
                    });
                }
            }
        }

        Ok((scope, order))
    }
}

impl UnitLoader for ScriptLoader {
    fn load(&self, name: &str, source: &str) -> Result<Arc<dyn LoadedUnit>, LoadFailure> {
        let (scope, order) = self.build_namespace(source)?;
        Ok(Arc::new(ScriptUnit {
            name: name.to_owned(),
            scope,
            order,
            evaluator: self.evaluator,
        }))
    }
}

enum BindingTarget {
    Constant(String),
    Function { symbol: String, params: Vec<String> },
}

/// Drops a trailing `#` comment (quotes are respected).
fn strip_comment(line: &str) -> &str {
    let bytes = line.as_bytes();
    let mut quote: Option<u8> = None;
    for (i, &b) in bytes.iter().enumerate() {
        match quote {
            Some(q) => {
                if b == q && (i == 0 || bytes[i - 1] != b'\\') {
                    quote = None;
                }
            }
            None => match b {
                b'"' | b'\'' => quote = Some(b),
                b'#' => return &line[..i],
                _ => {}
            },
        }
    }
    line
}

/// Finds the binding `=` in a script line: the first `=` that is not part of
/// `==`, `!=`, `<=`, or `>=`.
fn find_binding_eq(line: &str) -> Option<usize> {
    let bytes = line.as_bytes();
    for (i, &b) in bytes.iter().enumerate() {
        if b != b'=' {
            continue;
        }
        let prev = i.checked_sub(1).map(|j| bytes[j]);
        let next = bytes.get(i + 1);
        if matches!(prev, Some(b'=' | b'!' | b'<' | b'>')) || next == Some(&b'=') {
            continue;
        }
        return Some(i);
    }
    None
}

/// Parses a binding target: `name` or `name(param, param)`.
fn parse_binding_target(lhs: &str) -> Option<BindingTarget> {
    if let Some(open) = lhs.find('(') {
        let symbol = lhs[..open].trim();
        let rest = lhs[open + 1..].trim();
        let inner = rest.strip_suffix(')')?.trim();
        if !is_identifier(symbol) {
            return None;
        }
        let params: Vec<String> = if inner.is_empty() {
            Vec::new()
        } else {
            inner.split(',').map(|p| p.trim().to_owned()).collect()
        };
        if !params.iter().all(|p| is_identifier(p)) {
            return None;
        }
        Some(BindingTarget::Function {
            symbol: symbol.to_owned(),
            params,
        })
    } else if is_identifier(lhs) {
        Some(BindingTarget::Constant(lhs.to_owned()))
    } else {
        None
    }
}

fn is_identifier(s: &str) -> bool {
    let mut chars = s.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_load_constants() {
        let unit = ScriptLoader::new().load("m", "a = 1\nb = a + 2").unwrap();
        assert_eq!(unit.get("a"), Some(Value::Int(1)));
        assert_eq!(unit.get("b"), Some(Value::Int(3)));
        assert_eq!(unit.symbols(), vec!["a", "b"]);
        assert_eq!(unit.name(), "m");
    }

    #[test]
    fn test_load_functions() {
        let source = "factor = 3\nscale(x) = x * factor";
        let unit = ScriptLoader::new().load("m", source).unwrap();
        assert_eq!(
            unit.call("scale", &[Value::Int(5)]).unwrap(),
            Value::Int(15)
        );
    }

    #[test]
    fn test_zero_arg_call_of_constant() {
        let unit = ScriptLoader::new().load("m", "f = 1").unwrap();
        assert_eq!(unit.call("f", &[]).unwrap(), Value::Int(1));
        assert!(matches!(
            unit.call("f", &[Value::Int(1)]).unwrap_err(),
            UnitError::NotCallable(_)
        ));
    }

    #[test]
    fn test_unknown_symbol() {
        let unit = ScriptLoader::new().load("m", "f = 1").unwrap();
        assert!(unit.get("g").is_none());
        assert!(matches!(
            unit.call("g", &[]).unwrap_err(),
            UnitError::UnknownSymbol(name) if name == "g"
        ));
    }

    #[test]
    fn test_comments_and_blank_lines() {
        let source = "# header\n\nf = 1  # trailing\n\ns = '#not a comment'";
        let unit = ScriptLoader::new().load("m", source).unwrap();
        assert_eq!(unit.get("f"), Some(Value::Int(1)));
        assert_eq!(unit.get("s"), Some(Value::Str("#not a comment".to_owned())));
    }

    #[test]
    fn test_load_error_reports_line() {
        let err = ScriptLoader::new()
            .load("m", "a = 1\nb = missing + 1")
            .unwrap_err();
        assert!(err.message.contains("line 2"));
        assert!(err.detail.contains("missing"));
    }

    #[test]
    fn test_load_error_on_bad_syntax() {
        let err = ScriptLoader::new().load("m", "a = 1 +").unwrap_err();
        assert!(err.message.contains("line 1"));
    }

    #[test]
    fn test_load_error_on_missing_binding() {
        let err = ScriptLoader::new().load("m", "1 + 2").unwrap_err();
        assert!(err.message.contains("binding"));
    }

    #[test]
    fn test_binding_eq_skips_comparisons() {
        assert_eq!(find_binding_eq("f(x) = x == 1"), Some(5));
        assert_eq!(find_binding_eq("a == 1"), None);
        assert_eq!(find_binding_eq("a = b != c"), Some(2));
    }

    #[test]
    fn test_rebinding_keeps_first_position() {
        let unit = ScriptLoader::new()
            .load("m", "a = 1\nb = 2\na = 3")
            .unwrap();
        assert_eq!(unit.symbols(), vec!["a", "b"]);
        assert_eq!(unit.get("a"), Some(Value::Int(3)));
    }

    #[test]
    fn test_describe() {
        let unit = ScriptLoader::new()
            .load("m", "k = 7\nadd(a, b) = a + b")
            .unwrap();
        assert_eq!(
            unit.describe("k"),
            Some(SymbolKind::Constant(Value::Int(7)))
        );
        let Some(SymbolKind::Function { signature, params }) = unit.describe("add") else {
            panic!("expected function");
        };
        assert_eq!(signature, "add(a, b)");
        assert_eq!(params, vec!["a", "b"]);
        assert!(unit.describe("nope").is_none());
    }

    #[test]
    fn test_function_recursion_limit_is_contained() {
        let unit = ScriptLoader::new().load("m", "f(x) = f(x + 1)").unwrap();
        assert!(matches!(
            unit.call("f", &[Value::Int(0)]).unwrap_err(),
            UnitError::Eval(hs_expr::EvalError::RecursionLimit(_))
        ));
    }
}
