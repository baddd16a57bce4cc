//! Debug sessions, breakpoints, watch expressions, and safe evaluation.
//!
//! [`Debugger`] is the facility's front door: it tracks [`DebugSession`]
//! lifecycles (running to ended, never auto-deleted), keeps breakpoint and
//! watch-expression bookkeeping, evaluates restricted expressions, and dumps
//! sessions to JSON for offline inspection.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

use camino::{Utf8Path, Utf8PathBuf};
use chrono::{DateTime, Utc};
use hs_core::{DebugConfig, FxHashMap};
use hs_expr::{Evaluator, Scope, Value};
use parking_lot::Mutex;
use serde::Serialize;
use tracing::{debug, warn};

use crate::error::DebugError;
use crate::inspect::StackFrame;
use crate::log::EventLog;
use crate::trace::PerformanceSample;

/// Lifecycle state of a debug session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionStatus {
    /// The session is active.
    Running,
    /// The session has ended and is retained until dumped or pruned.
    Ended,
}

impl SessionStatus {
    /// Returns `true` if the session is active.
    #[inline]
    #[must_use]
    pub const fn is_running(self) -> bool {
        matches!(self, Self::Running)
    }
}

/// A breakpoint hit recorded during a session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BreakpointHit {
    /// Source file of the breakpoint.
    pub path: Utf8PathBuf,
    /// Line number of the breakpoint.
    pub line: u32,
    /// When the hit was recorded.
    pub hit_at: DateTime<Utc>,
}

/// One debug session's accumulated state.
///
/// Mutated only by the owning [`Debugger`]; callers receive clones.
#[derive(Debug, Clone, Serialize)]
pub struct DebugSession {
    /// Unique session id.
    pub id: String,
    /// Wall-clock start time.
    pub started_at: DateTime<Utc>,
    /// Wall-clock end time, set by `end_session`.
    pub ended_at: Option<DateTime<Utc>>,
    /// Session duration in milliseconds, set by `end_session`.
    pub duration_ms: Option<u64>,
    /// Lifecycle state.
    pub status: SessionStatus,
    /// Breakpoints hit while the session ran.
    pub breakpoints_hit: Vec<BreakpointHit>,
    /// Call-stack snapshots recorded into the session.
    pub call_stacks: Vec<Vec<StackFrame>>,
    /// Named variable observations (name to printable value).
    pub variables: FxHashMap<String, String>,

    #[serde(skip)]
    started_instant: Instant,
}

/// The debug facility.
///
/// Evaluation uses the restricted hs-expr language; the allowlist is a
/// convenience sandbox for catching accidents and is NOT a security
/// boundary.
///
/// # Examples
///
/// ```
/// use hs_debug::Debugger;
/// use hs_core::DebugConfig;
/// use hs_expr::{Scope, Value};
///
/// let debugger = Debugger::new(DebugConfig {
///     log_to_file: false,
///     ..DebugConfig::default()
/// });
///
/// let id = debugger.start_session(None).unwrap();
/// let mut scope = Scope::new();
/// scope.set("x", Value::Int(20));
/// assert_eq!(debugger.evaluate("x * 2", &scope).unwrap(), Value::Int(40));
/// debugger.end_session(&id).unwrap();
/// ```
pub struct Debugger {
    config: DebugConfig,
    sessions: Mutex<FxHashMap<String, DebugSession>>,
    breakpoints: Mutex<FxHashMap<Utf8PathBuf, Vec<u32>>>,
    watch_expressions: Mutex<Vec<String>>,
    pub(crate) performance: Mutex<FxHashMap<String, Vec<PerformanceSample>>>,
    event_log: Option<EventLog>,
    session_counter: AtomicU64,
    evaluator: Evaluator,
}

impl std::fmt::Debug for Debugger {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Debugger")
            .field("sessions", &self.sessions.lock().len())
            .field("log_to_file", &self.config.log_to_file)
            .finish_non_exhaustive()
    }
}

impl Debugger {
    /// Creates a debugger.
    ///
    /// When file logging is enabled, a fresh event log is created under the
    /// configured directory; failure to create it downgrades to
    /// tracing-only logging with a warning.
    #[must_use]
    pub fn new(config: DebugConfig) -> Self {
        let event_log = if config.log_to_file {
            match EventLog::create(&config.log_dir) {
                Ok(log) => Some(log),
                Err(error) => {
                    warn!(dir = %config.log_dir, error = %error, "Event log unavailable");
                    None
                }
            }
        } else {
            None
        };

        Self {
            config,
            sessions: Mutex::new(FxHashMap::default()),
            breakpoints: Mutex::new(FxHashMap::default()),
            watch_expressions: Mutex::new(Vec::new()),
            performance: Mutex::new(FxHashMap::default()),
            event_log,
            session_counter: AtomicU64::new(0),
            evaluator: Evaluator::new(),
        }
    }

    /// Returns the configuration this debugger runs with.
    #[must_use]
    pub const fn config(&self) -> &DebugConfig {
        &self.config
    }

    /// Writes one event line to the log file (if any) and to tracing.
    ///
    /// Hosts use this to funnel their own events (reload notifications,
    /// operator actions) into the same append-only stream.
    pub fn log_event(&self, message: &str) {
        if let Some(log) = &self.event_log {
            log.append(message);
        }
        debug!("{message}");
    }

    /// Starts a session, generating an id when none is supplied.
    ///
    /// # Errors
    ///
    /// Returns [`DebugError::SessionExists`] for a caller-supplied id that
    /// is already tracked (running or ended).
    pub fn start_session(&self, id: Option<&str>) -> Result<String, DebugError> {
        let id = match id {
            Some(id) => id.to_owned(),
            None => {
                let n = self.session_counter.fetch_add(1, Ordering::Relaxed);
                format!("session_{}_{}", n, Utc::now().timestamp_millis())
            }
        };

        let mut sessions = self.sessions.lock();
        if sessions.contains_key(&id) {
            return Err(DebugError::SessionExists(id));
        }

        sessions.insert(
            id.clone(),
            DebugSession {
                id: id.clone(),
                started_at: Utc::now(),
                ended_at: None,
                duration_ms: None,
                status: SessionStatus::Running,
                breakpoints_hit: Vec::new(),
                call_stacks: Vec::new(),
                variables: FxHashMap::default(),
                started_instant: Instant::now(),
            },
        );
        drop(sessions);

        self.log_event(&format!("Session started: {id}"));
        Ok(id)
    }

    /// Ends a running session, recording its duration.
    ///
    /// # Errors
    ///
    /// Returns [`DebugError::UnknownSession`] for unknown ids and
    /// [`DebugError::SessionEnded`] for sessions already ended.
    pub fn end_session(&self, id: &str) -> Result<Duration, DebugError> {
        let mut sessions = self.sessions.lock();
        let session = sessions
            .get_mut(id)
            .ok_or_else(|| DebugError::UnknownSession(id.to_owned()))?;
        if !session.status.is_running() {
            return Err(DebugError::SessionEnded(id.to_owned()));
        }

        let duration = session.started_instant.elapsed();
        session.status = SessionStatus::Ended;
        session.ended_at = Some(Utc::now());
        session.duration_ms = Some(u64::try_from(duration.as_millis()).unwrap_or(u64::MAX));
        drop(sessions);

        self.log_event(&format!(
            "Session ended: {id}, duration: {:.2}s",
            duration.as_secs_f64()
        ));
        Ok(duration)
    }

    /// Returns a clone of a session's current state.
    #[must_use]
    pub fn session(&self, id: &str) -> Option<DebugSession> {
        self.sessions.lock().get(id).cloned()
    }

    /// Returns the ids of all tracked sessions.
    #[must_use]
    pub fn session_ids(&self) -> Vec<String> {
        self.sessions.lock().keys().cloned().collect()
    }

    /// Records a variable observation into a running session.
    ///
    /// # Errors
    ///
    /// Fails with a session error for unknown or ended sessions.
    pub fn record_variable(
        &self,
        id: &str,
        name: impl Into<String>,
        value: &Value,
    ) -> Result<(), DebugError> {
        let mut sessions = self.sessions.lock();
        let session = Self::running_session(&mut sessions, id)?;
        session.variables.insert(name.into(), value.repr());
        Ok(())
    }

    /// Records a breakpoint hit into a running session.
    ///
    /// # Errors
    ///
    /// Fails with a session error for unknown or ended sessions.
    pub fn record_breakpoint_hit(
        &self,
        id: &str,
        path: Utf8PathBuf,
        line: u32,
    ) -> Result<(), DebugError> {
        let mut sessions = self.sessions.lock();
        let session = Self::running_session(&mut sessions, id)?;
        session.breakpoints_hit.push(BreakpointHit {
            path,
            line,
            hit_at: Utc::now(),
        });
        Ok(())
    }

    /// Records a call-stack snapshot into a running session.
    ///
    /// # Errors
    ///
    /// Fails with a session error for unknown or ended sessions.
    pub fn record_call_stack(
        &self,
        id: &str,
        frames: Vec<StackFrame>,
    ) -> Result<(), DebugError> {
        let mut sessions = self.sessions.lock();
        let session = Self::running_session(&mut sessions, id)?;
        session.call_stacks.push(frames);
        Ok(())
    }

    fn running_session<'a>(
        sessions: &'a mut FxHashMap<String, DebugSession>,
        id: &str,
    ) -> Result<&'a mut DebugSession, DebugError> {
        let session = sessions
            .get_mut(id)
            .ok_or_else(|| DebugError::UnknownSession(id.to_owned()))?;
        if !session.status.is_running() {
            return Err(DebugError::SessionEnded(id.to_owned()));
        }
        Ok(session)
    }

    /// Adds a breakpoint (line numbers are deduplicated per file).
    pub fn add_breakpoint(&self, path: Utf8PathBuf, line: u32) {
        let mut breakpoints = self.breakpoints.lock();
        let lines = breakpoints.entry(path.clone()).or_default();
        if !lines.contains(&line) {
            lines.push(line);
            drop(breakpoints);
            self.log_event(&format!("Breakpoint added: {path}:{line}"));
        }
    }

    /// Removes a breakpoint; unknown breakpoints are ignored.
    pub fn remove_breakpoint(&self, path: &Utf8Path, line: u32) {
        let mut breakpoints = self.breakpoints.lock();
        if let Some(lines) = breakpoints.get_mut(path) {
            if let Some(index) = lines.iter().position(|l| *l == line) {
                lines.remove(index);
                drop(breakpoints);
                self.log_event(&format!("Breakpoint removed: {path}:{line}"));
            }
        }
    }

    /// Returns a snapshot of all breakpoints.
    #[must_use]
    pub fn breakpoints(&self) -> FxHashMap<Utf8PathBuf, Vec<u32>> {
        self.breakpoints.lock().clone()
    }

    /// Adds a watch expression after validating its syntax.
    ///
    /// Duplicates are ignored.
    ///
    /// # Errors
    ///
    /// Returns [`DebugError::Evaluation`] if the expression does not parse.
    pub fn add_watch_expression(&self, expression: &str) -> Result<(), DebugError> {
        hs_expr::parse(expression).map_err(|e| evaluation_error(expression, &e))?;

        let mut watches = self.watch_expressions.lock();
        if !watches.iter().any(|w| w == expression) {
            watches.push(expression.to_owned());
            drop(watches);
            self.log_event(&format!("Watch expression added: {expression}"));
        }
        Ok(())
    }

    /// Returns a snapshot of the watch expressions.
    #[must_use]
    pub fn watch_expressions(&self) -> Vec<String> {
        self.watch_expressions.lock().clone()
    }

    /// Evaluates a restricted expression against the supplied bindings.
    ///
    /// Every failure is wrapped into [`DebugError::Evaluation`] with a
    /// single-line reason; the engine's native error is never raised
    /// through this call and binding values are never echoed back.
    ///
    /// # Errors
    ///
    /// Returns [`DebugError::Evaluation`] for any parse or evaluation
    /// failure.
    pub fn evaluate(&self, expression: &str, scope: &Scope) -> Result<Value, DebugError> {
        let result = hs_expr::parse(expression)
            .and_then(|expr| self.evaluator.eval(&expr, scope))
            .map_err(|e| evaluation_error(expression, &e));

        match &result {
            Ok(value) => {
                self.log_event(&format!(
                    "Expression evaluated: {expression} = {}",
                    value.repr()
                ));
            }
            Err(error) => self.log_event(&format!("ERROR: {error}")),
        }
        result
    }

    /// Serializes a session (plus current breakpoints and watch
    /// expressions) to a JSON document for offline inspection.
    ///
    /// With no explicit path the dump lands in the configured log
    /// directory.
    ///
    /// # Errors
    ///
    /// Fails with a session error for unknown ids, or with I/O and
    /// serialization errors from writing the dump.
    pub fn dump_session(
        &self,
        id: &str,
        path: Option<Utf8PathBuf>,
    ) -> Result<Utf8PathBuf, DebugError> {
        let session = self
            .session(id)
            .ok_or_else(|| DebugError::UnknownSession(id.to_owned()))?;

        #[derive(Serialize)]
        struct SessionDump {
            session: DebugSession,
            breakpoints: FxHashMap<Utf8PathBuf, Vec<u32>>,
            watch_expressions: Vec<String>,
            dumped_at: DateTime<Utc>,
        }

        let dump = SessionDump {
            session,
            breakpoints: self.breakpoints(),
            watch_expressions: self.watch_expressions(),
            dumped_at: Utc::now(),
        };

        let path = match path {
            Some(path) => path,
            None => {
                std::fs::create_dir_all(self.config.log_dir.as_std_path())?;
                self.config
                    .log_dir
                    .join(format!("session_{id}_{}.json", Utc::now().timestamp_millis()))
            }
        };

        let contents = serde_json::to_string_pretty(&dump)?;
        std::fs::write(path.as_std_path(), contents)?;
        self.log_event(&format!("Session dumped: {id} -> {path}"));
        Ok(path)
    }
}

/// Builds the redacted evaluation error: expression capped, reason single
/// line, no binding values.
fn evaluation_error(expression: &str, error: &hs_expr::EvalError) -> DebugError {
    const MAX_EXPR: usize = 120;
    let expression = if expression.len() > MAX_EXPR {
        format!("{}...", &expression[..MAX_EXPR])
    } else {
        expression.to_owned()
    };
    let reason = error.to_string().replace('\n', " ");
    DebugError::Evaluation { expression, reason }
}
