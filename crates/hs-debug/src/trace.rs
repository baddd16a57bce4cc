//! Call tracing and performance reporting.
//!
//! [`Debugger::trace_call`] wraps a callable invocation, recording timing
//! and outcome as a [`PerformanceSample`]. Successful calls append to the
//! callable's own bucket; failures append to a distinct `<name>_errors`
//! bucket and the original error is returned unchanged. Samples are
//! append-only and never mutated.

use std::time::Instant;

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::session::Debugger;

/// One traced call: identity, arguments, timing, outcome.
#[derive(Debug, Clone, Serialize)]
pub struct PerformanceSample {
    /// The traced callable's identity.
    pub function: String,
    /// Printable rendering of the call's arguments (opaque to the tracer).
    pub args: String,
    /// Wall-clock start of the call.
    pub started_at: DateTime<Utc>,
    /// Call duration in microseconds.
    pub duration_us: u64,
    /// Whether the call returned successfully.
    pub success: bool,
    /// Error text for failed calls.
    pub error: Option<String>,
}

/// Performance statistics for one traced callable.
///
/// Durations are over successful calls only; failed calls count toward the
/// totals but not the duration statistics.
#[derive(Debug, Clone, Serialize)]
pub struct PerformanceReport {
    /// The callable's identity.
    pub function: String,
    /// Successful plus failed calls.
    pub total_calls: usize,
    /// Calls that returned successfully.
    pub successful_calls: usize,
    /// Calls that returned an error.
    pub failed_calls: usize,
    /// Shortest successful call, in microseconds.
    pub min_duration_us: u64,
    /// Mean successful call, in microseconds.
    pub avg_duration_us: f64,
    /// Longest successful call, in microseconds.
    pub max_duration_us: u64,
    /// Sum over successful calls, in microseconds.
    pub total_duration_us: u64,
    /// The most recent samples (successes and failures interleaved).
    pub recent: Vec<PerformanceSample>,
}

/// Per-function line in the aggregate report.
#[derive(Debug, Clone, Serialize)]
pub struct FunctionSummary {
    /// The callable's identity.
    pub function: String,
    /// Number of recorded calls (successes and failures).
    pub call_count: usize,
    /// Mean successful duration, in microseconds.
    pub avg_duration_us: f64,
    /// Total successful duration, in microseconds.
    pub total_duration_us: u64,
}

/// Summary across every traced callable.
#[derive(Debug, Clone, Serialize)]
pub struct AggregateReport {
    /// Number of traced callables.
    pub total_functions: usize,
    /// One summary per callable, sorted by identity.
    pub functions: Vec<FunctionSummary>,
}

/// Suffix of the bucket receiving failed samples.
const ERROR_BUCKET_SUFFIX: &str = "_errors";

impl Debugger {
    /// Traces one invocation of `call` under the given identity.
    ///
    /// The closure's result is returned unchanged; an error is recorded
    /// (with its display text) and then handed back to the caller.
    ///
    /// # Examples
    ///
    /// ```
    /// use hs_debug::Debugger;
    /// use hs_core::DebugConfig;
    ///
    /// let debugger = Debugger::new(DebugConfig {
    ///     log_to_file: false,
    ///     ..DebugConfig::default()
    /// });
    ///
    /// let result: Result<i64, String> =
    ///     debugger.trace_call("add", "2, 3", || Ok(2 + 3));
    /// assert_eq!(result.unwrap(), 5);
    /// assert_eq!(debugger.performance_report("add").total_calls, 1);
    /// ```
    pub fn trace_call<T, E: std::fmt::Display>(
        &self,
        function: &str,
        args: impl Into<String>,
        call: impl FnOnce() -> Result<T, E>,
    ) -> Result<T, E> {
        let args = args.into();
        self.log_event(&format!("Function call: {function}({args})"));

        let started_at = Utc::now();
        let start = Instant::now();
        let result = call();
        let duration = start.elapsed();
        let duration_us = u64::try_from(duration.as_micros()).unwrap_or(u64::MAX);

        match &result {
            Ok(_) => {
                self.append_sample(
                    function.to_owned(),
                    PerformanceSample {
                        function: function.to_owned(),
                        args,
                        started_at,
                        duration_us,
                        success: true,
                        error: None,
                    },
                );
                self.log_event(&format!(
                    "Function completed: {function}, duration: {:.4}s",
                    duration.as_secs_f64()
                ));
            }
            Err(error) => {
                self.append_sample(
                    format!("{function}{ERROR_BUCKET_SUFFIX}"),
                    PerformanceSample {
                        function: function.to_owned(),
                        args,
                        started_at,
                        duration_us,
                        success: false,
                        error: Some(error.to_string()),
                    },
                );
                self.log_event(&format!("Function error: {function}, error: {error}"));
            }
        }

        result
    }

    fn append_sample(&self, bucket: String, sample: PerformanceSample) {
        self.performance.lock().entry(bucket).or_default().push(sample);
    }

    /// Builds the performance report for one callable identity.
    ///
    /// Merges the success bucket with the `<name>_errors` bucket so failed
    /// calls are visible in the totals. An identity with no recorded calls
    /// yields an all-zero report.
    #[must_use]
    pub fn performance_report(&self, function: &str) -> PerformanceReport {
        let performance = self.performance.lock();
        let successes = performance
            .get(function)
            .map(Vec::as_slice)
            .unwrap_or_default();
        let error_bucket = format!("{function}{ERROR_BUCKET_SUFFIX}");
        let failures = performance
            .get(&error_bucket)
            .map(Vec::as_slice)
            .unwrap_or_default();

        let durations: Vec<u64> = successes.iter().map(|s| s.duration_us).collect();
        let total_duration_us: u64 = durations.iter().sum();
        #[allow(clippy::cast_precision_loss)]
        let avg_duration_us = if durations.is_empty() {
            0.0
        } else {
            total_duration_us as f64 / durations.len() as f64
        };

        let mut recent: Vec<PerformanceSample> =
            successes.iter().chain(failures.iter()).cloned().collect();
        recent.sort_by_key(|s| s.started_at);
        let keep = self.config().max_recent_samples;
        if recent.len() > keep {
            recent.drain(..recent.len() - keep);
        }

        PerformanceReport {
            function: function.to_owned(),
            total_calls: successes.len() + failures.len(),
            successful_calls: successes.len(),
            failed_calls: failures.len(),
            min_duration_us: durations.iter().copied().min().unwrap_or(0),
            avg_duration_us,
            max_duration_us: durations.iter().copied().max().unwrap_or(0),
            total_duration_us,
            recent,
        }
    }

    /// Builds the aggregate report across every traced callable.
    #[must_use]
    pub fn aggregate_report(&self) -> AggregateReport {
        let performance = self.performance.lock();

        let mut names: Vec<String> = performance
            .keys()
            .map(|bucket| {
                bucket
                    .strip_suffix(ERROR_BUCKET_SUFFIX)
                    .unwrap_or(bucket)
                    .to_owned()
            })
            .collect();
        names.sort();
        names.dedup();

        let functions = names
            .into_iter()
            .map(|function| {
                let successes = performance
                    .get(&function)
                    .map(Vec::as_slice)
                    .unwrap_or_default();
                let failures = performance
                    .get(&format!("{function}{ERROR_BUCKET_SUFFIX}"))
                    .map(Vec::as_slice)
                    .unwrap_or_default();
                let total_duration_us: u64 = successes.iter().map(|s| s.duration_us).sum();
                #[allow(clippy::cast_precision_loss)]
                let avg_duration_us = if successes.is_empty() {
                    0.0
                } else {
                    total_duration_us as f64 / successes.len() as f64
                };
                FunctionSummary {
                    function,
                    call_count: successes.len() + failures.len(),
                    avg_duration_us,
                    total_duration_us,
                }
            })
            .collect::<Vec<_>>();

        AggregateReport {
            total_functions: functions.len(),
            functions,
        }
    }
}
