//! Debug facility: sessions, call tracing, inspection, and the event log.
//!
//! This crate observes the reload engine's effects without depending on it:
//! it tracks debug sessions, evaluates restricted expressions against
//! caller-supplied bindings, wraps callable invocations to collect
//! [`PerformanceSample`]s, describes values and namespaces, captures
//! bounded call stacks, and writes the append-only event log.
//!
//! # Overview
//!
//! - [`Debugger`] - session state machine, safe evaluation, call tracing,
//!   performance reports, session dumps
//! - [`inspect_value`] / [`inspect_scope`] / [`capture_call_stack`] -
//!   non-mutating inspection
//! - [`EventLog`] - timestamped append-only log with retention pruning
//!
//! The expression sandbox is advisory: it keeps accidents out (no
//! filesystem, process, or network access is reachable from the allowlist)
//! but it is not a security boundary against hostile input.
//!
//! # Example
//!
//! ```
//! use hs_debug::Debugger;
//! use hs_core::DebugConfig;
//! use hs_expr::{Scope, Value};
//!
//! let debugger = Debugger::new(DebugConfig {
//!     log_to_file: false,
//!     ..DebugConfig::default()
//! });
//!
//! let session = debugger.start_session(None).unwrap();
//!
//! // Trace a call and inspect its report.
//! let doubled: Result<i64, String> =
//!     debugger.trace_call("double", "21", || Ok(21 * 2));
//! assert_eq!(doubled.unwrap(), 42);
//! assert_eq!(debugger.performance_report("double").successful_calls, 1);
//!
//! debugger.end_session(&session).unwrap();
//! ```

#![deny(clippy::all)]
#![warn(missing_docs)]

pub mod error;
pub mod inspect;
pub mod log;
pub mod session;
pub mod trace;

pub use error::DebugError;
pub use inspect::{capture_call_stack, inspect_scope, inspect_value, NamespaceInfo, StackFrame, ValueInfo};
pub use log::EventLog;
pub use session::{BreakpointHit, DebugSession, Debugger, SessionStatus};
pub use trace::{AggregateReport, FunctionSummary, PerformanceReport, PerformanceSample};
