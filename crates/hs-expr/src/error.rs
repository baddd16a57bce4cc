//! Error types for expression parsing and evaluation.

/// Errors produced by the expression parser and evaluator.
///
/// Every failure mode is a value; the evaluator never panics on malformed
/// input or bad operands.
///
/// # Examples
///
/// ```
/// use hs_expr::{evaluate, EvalError, Scope};
///
/// let err = evaluate("1 +", &Scope::new()).unwrap_err();
/// assert!(matches!(err, EvalError::Syntax { .. }));
///
/// let err = evaluate("nope", &Scope::new()).unwrap_err();
/// assert!(matches!(err, EvalError::UnknownIdentifier(_)));
/// ```
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum EvalError {
    /// The source text is not a well-formed expression.
    #[error("syntax error at offset {position}: {message}")]
    Syntax {
        /// Byte offset of the offending token.
        position: usize,
        /// Description of what went wrong.
        message: String,
    },

    /// An identifier has no binding in scope.
    #[error("unknown identifier '{0}'")]
    UnknownIdentifier(String),

    /// A called function is neither a scope function nor an allowlisted builtin.
    #[error("unknown function '{0}' (not in the builtin allowlist)")]
    UnknownFunction(String),

    /// Operand types do not fit the operation.
    #[error("type mismatch: {0}")]
    TypeMismatch(String),

    /// Integer division or modulo by zero.
    #[error("division by zero")]
    DivisionByZero,

    /// A function was called with the wrong number of arguments.
    #[error("function '{function}' expects {expected} argument(s), got {got}")]
    WrongArity {
        /// The function that was called.
        function: String,
        /// Declared parameter count.
        expected: usize,
        /// Supplied argument count.
        got: usize,
    },

    /// Nested function calls exceeded the evaluation depth limit.
    #[error("recursion limit of {0} exceeded")]
    RecursionLimit(usize),

    /// A list or string index was outside the valid range.
    #[error("index {index} out of bounds for length {len}")]
    IndexOutOfBounds {
        /// The requested index.
        index: i64,
        /// Length of the indexed container.
        len: usize,
    },
}

impl EvalError {
    /// Creates a syntax error.
    #[inline]
    pub fn syntax(position: usize, message: impl Into<String>) -> Self {
        Self::Syntax {
            position,
            message: message.into(),
        }
    }

    /// Creates a type-mismatch error.
    #[inline]
    pub fn type_mismatch(message: impl Into<String>) -> Self {
        Self::TypeMismatch(message.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_syntax_error_display() {
        let err = EvalError::syntax(4, "expected expression");
        assert!(err.to_string().contains("offset 4"));
        assert!(err.to_string().contains("expected expression"));
    }

    #[test]
    fn test_wrong_arity_display() {
        let err = EvalError::WrongArity {
            function: "len".to_owned(),
            expected: 1,
            got: 2,
        };
        assert!(err.to_string().contains("len"));
        assert!(err.to_string().contains("expects 1"));
    }
}
