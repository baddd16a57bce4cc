//! Value, namespace, and call-stack inspection.
//!
//! Inspection never mutates what it looks at: values are described by type
//! and representation, namespaces ([`Scope`]) by their attributes and
//! callables, and the call stack is captured best-effort from the runtime
//! backtrace with a type-only snapshot of the supplied bindings.

use hs_expr::{Binding, Scope, Value};
use serde::Serialize;

/// Marker used when a frame or binding cannot be summarized.
const UNRESOLVED: &str = "<unresolved>";

/// A non-mutating description of a single value.
///
/// # Examples
///
/// ```
/// use hs_debug::inspect_value;
/// use hs_expr::Value;
///
/// let info = inspect_value(&Value::List(vec![Value::Int(1), Value::Str("a".into())]));
/// assert_eq!(info.type_name, "list");
/// assert_eq!(info.len, Some(2));
/// assert_eq!(info.element_types, Some(vec!["int".to_owned(), "str".to_owned()]));
/// ```
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ValueInfo {
    /// The value's type name.
    pub type_name: String,
    /// Source-like representation (strings quoted).
    pub repr: String,
    /// Length for strings and lists.
    pub len: Option<usize>,
    /// Element type names for lists.
    pub element_types: Option<Vec<String>>,
    /// The value's truthiness.
    pub truthy: bool,
}

/// A description of a namespace: its attributes and callable members.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NamespaceInfo {
    /// Constant attributes: name to type name.
    pub attributes: Vec<(String, String)>,
    /// Callable members as printable signatures.
    pub callables: Vec<String>,
}

/// One frame of a captured call stack.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StackFrame {
    /// The frame's function name, or a marker when symbols are missing.
    pub function: String,
    /// Source file, when resolvable.
    pub file: Option<String>,
    /// Source line, when resolvable.
    pub line: Option<u32>,
    /// Type-only snapshot of local bindings (outermost frame only).
    pub locals: Vec<(String, String)>,
}

/// Describes a value without mutating it.
#[must_use]
pub fn inspect_value(value: &Value) -> ValueInfo {
    let (len, element_types) = match value {
        Value::Str(s) => (Some(s.chars().count()), None),
        Value::List(items) => (
            Some(items.len()),
            Some(items.iter().map(|v| v.type_name().to_owned()).collect()),
        ),
        _ => (None, None),
    };

    ValueInfo {
        type_name: value.type_name().to_owned(),
        repr: value.repr(),
        len,
        element_types,
        truthy: value.is_truthy(),
    }
}

/// Describes a namespace's attributes (with types) and callable members
/// (with parameter signatures).
#[must_use]
pub fn inspect_scope(scope: &Scope) -> NamespaceInfo {
    let mut attributes = Vec::new();
    let mut callables = Vec::new();

    let mut names: Vec<&str> = scope.names().collect();
    names.sort_unstable();

    for name in names {
        match scope.get(name) {
            Some(Binding::Value(value)) => {
                attributes.push((name.to_owned(), value.type_name().to_owned()));
            }
            Some(Binding::Function(def)) => callables.push(def.signature()),
            None => {}
        }
    }

    NamespaceInfo {
        attributes,
        callables,
    }
}

/// Captures the active call stack, bounded by `max_depth` frames.
///
/// Frames come from the runtime backtrace; in builds without symbols a
/// frame is reported as unresolved rather than failing. The supplied
/// bindings are summarized type-only into the outermost frame, so values
/// never leak into the capture.
#[must_use]
pub fn capture_call_stack(max_depth: usize, bindings: &Scope) -> Vec<StackFrame> {
    let backtrace = std::backtrace::Backtrace::force_capture();
    let rendered = backtrace.to_string();

    let mut locals: Vec<(String, String)> = bindings
        .names()
        .map(|name| {
            let type_name = match bindings.get(name) {
                Some(Binding::Value(value)) => value.type_name().to_owned(),
                Some(Binding::Function(_)) => "function".to_owned(),
                None => UNRESOLVED.to_owned(),
            };
            (name.to_owned(), type_name)
        })
        .collect();
    locals.sort();

    let mut frames = parse_backtrace(&rendered, max_depth);
    if frames.is_empty() {
        // Symbol-less builds still produce one marker frame.
        frames.push(StackFrame {
            function: UNRESOLVED.to_owned(),
            file: None,
            line: None,
            locals: Vec::new(),
        });
    }
    if let Some(first) = frames.first_mut() {
        first.locals = locals;
    }
    frames
}

/// Parses the std backtrace rendering into frames.
///
/// The format is `N: function` lines, each optionally followed by an
/// `at file:line:column` line.
fn parse_backtrace(rendered: &str, max_depth: usize) -> Vec<StackFrame> {
    let mut frames: Vec<StackFrame> = Vec::new();

    for line in rendered.lines() {
        let trimmed = line.trim();

        if let Some(rest) = trimmed.strip_prefix("at ") {
            // Attach the location to the frame that opened it.
            if let Some(frame) = frames.last_mut() {
                if frame.file.is_none() {
                    let (file, line_no) = split_location(rest);
                    frame.file = Some(file);
                    frame.line = line_no;
                }
            }
            continue;
        }

        let Some((index, function)) = trimmed.split_once(": ") else {
            continue;
        };
        if index.parse::<usize>().is_err() {
            continue;
        }
        if frames.len() >= max_depth {
            break;
        }
        let function = if function.is_empty() {
            UNRESOLVED.to_owned()
        } else {
            function.to_owned()
        };
        frames.push(StackFrame {
            function,
            file: None,
            line: None,
            locals: Vec::new(),
        });
    }

    frames
}

/// Splits `file:line:column` into the file and the line number.
fn split_location(location: &str) -> (String, Option<u32>) {
    let mut parts = location.rsplitn(3, ':');
    let _column = parts.next();
    let line = parts.next().and_then(|l| l.parse().ok());
    let file = parts.next().unwrap_or(location).to_owned();
    match line {
        Some(line) => (file, Some(line)),
        None => (location.to_owned(), None),
    }
}
