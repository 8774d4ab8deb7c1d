//! The deferred-assertion backend and its in-process implementation.

use std::fmt;
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;
use serde::de::DeserializeOwned;
use serde::Serialize;

use super::collection::PCollection;
use super::config::PipelineConfig;
use super::scope::Scope;
use super::window::WindowedValue;
use crate::assertions::Expect;
use crate::coder::{BincodeCoder, Coder};
use crate::error::{Error, Result};

/// Identifier of a registered check, unique within its backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CheckId(u64);

impl CheckId {
    /// Create an identifier from a raw value.
    #[must_use]
    pub fn new(id: u64) -> Self {
        Self(id)
    }

    /// The raw value.
    #[must_use]
    pub fn as_u64(self) -> u64 {
        self.0
    }
}

impl fmt::Display for CheckId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Handle returned when a check is registered.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CheckHandle {
    id: CheckId,
    description: String,
}

impl CheckHandle {
    /// Create a handle.
    #[must_use]
    pub fn new(id: CheckId, description: impl Into<String>) -> Self {
        Self {
            id,
            description: description.into(),
        }
    }

    /// The check identifier.
    #[must_use]
    pub fn id(&self) -> CheckId {
        self.id
    }

    /// Human-readable description of the check.
    #[must_use]
    pub fn description(&self) -> &str {
        &self.description
    }
}

impl fmt::Display for CheckHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "check {} ({})", self.id, self.description)
    }
}

type Evaluation = Box<dyn FnOnce() -> Result<()> + Send>;

/// A check waiting to be evaluated by a backend.
///
/// The evaluation closure already captures the collection, the scope and the
/// matcher; the remaining fields describe it for reporting.
pub struct PendingCheck {
    description: String,
    scope: Scope,
    expect: Expect,
    evaluate: Evaluation,
}

impl PendingCheck {
    /// Create a pending check.
    pub fn new(
        description: impl Into<String>,
        scope: Scope,
        expect: Expect,
        evaluate: impl FnOnce() -> Result<()> + Send + 'static,
    ) -> Self {
        Self {
            description: description.into(),
            scope,
            expect,
            evaluate: Box::new(evaluate),
        }
    }

    /// Description of the check.
    #[must_use]
    pub fn description(&self) -> &str {
        &self.description
    }

    /// Scope the check applies to.
    #[must_use]
    pub fn scope(&self) -> Scope {
        self.scope
    }

    /// Polarity of the check.
    #[must_use]
    pub fn expect(&self) -> Expect {
        self.expect
    }

    /// Run the check once.
    ///
    /// A panic raised while evaluating is reported as an assertion failure.
    ///
    /// # Errors
    ///
    /// Returns the check's failure.
    pub fn evaluate(self) -> Result<()> {
        let evaluate = self.evaluate;
        panic::catch_unwind(AssertUnwindSafe(evaluate))
            .unwrap_or_else(|payload| Err(Error::assertion_failed(panic_message(&*payload))))
    }
}

impl fmt::Debug for PendingCheck {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PendingCheck")
            .field("description", &self.description)
            .field("scope", &self.scope)
            .field("expect", &self.expect)
            .finish_non_exhaustive()
    }
}

pub(crate) fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "check panicked".to_string()
    }
}

/// A runner that accepts deferred checks.
///
/// This is the seam between the matchers and whatever executes the pipeline.
/// [`TestPipeline`] is the in-process implementation; other runners implement
/// this trait and evaluate each [`PendingCheck`] once the data exists.
pub trait AssertionBackend: Send + Sync {
    /// Register a check for later evaluation.
    fn register(&self, check: PendingCheck) -> CheckHandle;

    /// How many elements failure messages list before truncating.
    fn max_listed_items(&self) -> usize {
        PipelineConfig::default().max_listed_items
    }
}

/// A check that failed during a run.
#[derive(Debug, Clone)]
pub struct CheckFailure {
    /// The failed check.
    pub handle: CheckHandle,
    /// Why it failed.
    pub error: Error,
}

impl fmt::Display for CheckFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.handle, self.error)
    }
}

/// Outcome of evaluating every registered check.
#[derive(Debug, Clone, Default)]
pub struct RunReport {
    /// Checks that passed.
    pub passed: Vec<CheckHandle>,
    /// Checks that failed.
    pub failed: Vec<CheckFailure>,
    /// Checks not evaluated because of `fail_fast`.
    pub skipped: Vec<CheckHandle>,
}

impl RunReport {
    /// Number of checks that were registered.
    #[must_use]
    pub fn total(&self) -> usize {
        self.passed.len() + self.failed.len() + self.skipped.len()
    }

    /// Returns `true` if no check failed.
    #[must_use]
    pub fn is_success(&self) -> bool {
        self.failed.is_empty()
    }

    /// Convert into a result, failing if any check failed.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ChecksFailed`] listing every failure.
    pub fn into_result(self) -> Result<Self> {
        if self.is_success() {
            return Ok(self);
        }
        Err(Error::ChecksFailed {
            failed: self.failed.len(),
            total: self.total(),
            failures: self.failed.iter().map(ToString::to_string).collect(),
        })
    }
}

struct PipelineState {
    config: PipelineConfig,
    checks: Mutex<Vec<(CheckHandle, PendingCheck)>>,
    next_check: AtomicU64,
    next_collection: AtomicU64,
    has_run: AtomicBool,
}

impl AssertionBackend for PipelineState {
    fn register(&self, check: PendingCheck) -> CheckHandle {
        let id = CheckId::new(self.next_check.fetch_add(1, Ordering::SeqCst));
        let handle = CheckHandle::new(id, check.description());
        tracing::debug!(
            check = %id,
            scope = %check.scope(),
            expect = ?check.expect(),
            description = check.description(),
            "registered deferred check"
        );
        if self.has_run.load(Ordering::SeqCst) {
            tracing::warn!(check = %id, "check registered after the pipeline already ran");
        }
        self.checks.lock().push((handle.clone(), check));
        handle
    }

    fn max_listed_items(&self) -> usize {
        self.config.max_listed_items
    }
}

/// In-process pipeline that owns collections and evaluates their checks.
///
/// Collections are created from in-memory data; matchers register checks on
/// them; [`run`](Self::run) evaluates every check once, in registration
/// order.
///
/// Dropping a pipeline that still holds unevaluated checks panics, unless
/// [`PipelineConfig::enforce_run`] is disabled.
///
/// # Example
///
/// ```rust
/// use testkit_pipeline::assertions::{contain_in_any_order, Expect};
/// use testkit_pipeline::pipeline::TestPipeline;
///
/// let pipeline = TestPipeline::new();
/// let numbers = pipeline.create(vec![3, 1, 2]);
/// contain_in_any_order(vec![1, 2, 3]).apply(&numbers, Expect::Positive);
/// pipeline.run().unwrap();
/// ```
pub struct TestPipeline {
    state: Arc<PipelineState>,
}

impl TestPipeline {
    /// Create a pipeline with the default configuration.
    #[must_use]
    pub fn new() -> Self {
        Self::with_config(PipelineConfig::default())
    }

    /// Create a pipeline with the given configuration.
    #[must_use]
    pub fn with_config(config: PipelineConfig) -> Self {
        Self {
            state: Arc::new(PipelineState {
                config,
                checks: Mutex::new(Vec::new()),
                next_check: AtomicU64::new(1),
                next_collection: AtomicU64::new(1),
                has_run: AtomicBool::new(false),
            }),
        }
    }

    /// The pipeline configuration.
    #[must_use]
    pub fn config(&self) -> &PipelineConfig {
        &self.state.config
    }

    /// Create a collection in the global window, encoded with bincode.
    pub fn create<T, I>(&self, values: I) -> PCollection<T>
    where
        I: IntoIterator<Item = T>,
        T: Serialize + DeserializeOwned + Send + Sync + 'static,
    {
        self.create_with_coder(values, BincodeCoder::new())
    }

    /// Create a collection in the global window with an explicit coder.
    pub fn create_with_coder<T, I, C>(&self, values: I, coder: C) -> PCollection<T>
    where
        I: IntoIterator<Item = T>,
        C: Coder<T> + 'static,
        T: Send + Sync + 'static,
    {
        self.create_windowed_with_coder(values.into_iter().map(WindowedValue::new), coder)
    }

    /// Create a collection from values with explicit window and pane metadata.
    pub fn create_windowed<T, I>(&self, values: I) -> PCollection<T>
    where
        I: IntoIterator<Item = WindowedValue<T>>,
        T: Serialize + DeserializeOwned + Send + Sync + 'static,
    {
        self.create_windowed_with_coder(values, BincodeCoder::new())
    }

    /// Create a windowed collection with an explicit coder.
    pub fn create_windowed_with_coder<T, I, C>(&self, values: I, coder: C) -> PCollection<T>
    where
        I: IntoIterator<Item = WindowedValue<T>>,
        C: Coder<T> + 'static,
        T: Send + Sync + 'static,
    {
        let n = self.state.next_collection.fetch_add(1, Ordering::SeqCst);
        let backend: Arc<dyn AssertionBackend> = self.state.clone();
        PCollection::new(
            format!("collection-{n}"),
            values.into_iter().collect(),
            Arc::new(coder),
            backend,
        )
    }

    /// Number of checks registered and not yet evaluated.
    #[must_use]
    pub fn pending_checks(&self) -> usize {
        self.state.checks.lock().len()
    }

    /// Evaluate every registered check and return the report, including failures.
    ///
    /// # Errors
    ///
    /// Returns [`Error::AlreadyRun`] if the pipeline was already evaluated.
    pub fn evaluate(&self) -> Result<RunReport> {
        if self.state.has_run.swap(true, Ordering::SeqCst) {
            return Err(Error::AlreadyRun);
        }

        let checks = std::mem::take(&mut *self.state.checks.lock());
        let fail_fast = self.state.config.fail_fast;
        let mut report = RunReport::default();

        for (handle, check) in checks {
            if fail_fast && !report.failed.is_empty() {
                report.skipped.push(handle);
                continue;
            }
            match check.evaluate() {
                Ok(()) => {
                    tracing::debug!(check = %handle.id(), "check passed");
                    report.passed.push(handle);
                }
                Err(error) => {
                    tracing::warn!(check = %handle.id(), %error, "check failed");
                    report.failed.push(CheckFailure { handle, error });
                }
            }
        }

        tracing::info!(
            passed = report.passed.len(),
            failed = report.failed.len(),
            skipped = report.skipped.len(),
            "pipeline run finished"
        );
        Ok(report)
    }

    /// Evaluate every registered check.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ChecksFailed`] if any check failed, or
    /// [`Error::AlreadyRun`] if the pipeline was already evaluated.
    pub fn run(&self) -> Result<RunReport> {
        self.evaluate()?.into_result()
    }
}

impl Default for TestPipeline {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for TestPipeline {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TestPipeline")
            .field("config", &self.state.config)
            .field("pending_checks", &self.pending_checks())
            .field("has_run", &self.state.has_run.load(Ordering::SeqCst))
            .finish()
    }
}

impl Drop for TestPipeline {
    fn drop(&mut self) {
        // Pending checks hold collections that point back at the state.
        let pending = std::mem::take(&mut *self.state.checks.lock());
        let count = pending.len();
        drop(pending);

        if count > 0 && self.state.config.enforce_run && !std::thread::panicking() {
            panic!("TestPipeline dropped with {count} unevaluated checks; call run()");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn check(result: Result<()>) -> PendingCheck {
        PendingCheck::new("test check", Scope::All, Expect::Positive, move || result)
    }

    #[test]
    fn test_run_reports_passed_and_failed() {
        let pipeline = TestPipeline::new();
        pipeline.state.register(check(Ok(())));
        pipeline
            .state
            .register(check(Err(Error::assertion_failed("boom"))));
        assert_eq!(pipeline.pending_checks(), 2);

        let report = pipeline.evaluate().unwrap();
        assert_eq!(report.passed.len(), 1);
        assert_eq!(report.failed.len(), 1);
        assert_eq!(report.total(), 2);
        assert_eq!(pipeline.pending_checks(), 0);
    }

    #[test]
    fn test_run_twice_fails() {
        let pipeline = TestPipeline::new();
        pipeline.run().unwrap();
        assert_eq!(pipeline.run().unwrap_err(), Error::AlreadyRun);
    }

    #[test]
    fn test_fail_fast_skips_remaining() {
        let pipeline = TestPipeline::with_config(PipelineConfig::default().with_fail_fast(true));
        pipeline
            .state
            .register(check(Err(Error::assertion_failed("first"))));
        pipeline.state.register(check(Ok(())));
        let report = pipeline.evaluate().unwrap();
        assert_eq!(report.failed.len(), 1);
        assert_eq!(report.skipped.len(), 1);
    }

    #[test]
    fn test_run_aggregates_failures() {
        let pipeline = TestPipeline::new();
        pipeline
            .state
            .register(check(Err(Error::assertion_failed("first"))));
        match pipeline.run().unwrap_err() {
            Error::ChecksFailed { failed, total, failures } => {
                assert_eq!((failed, total), (1, 1));
                assert!(failures[0].contains("check #1 (test check)"));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_panicking_check_is_assertion_failure() {
        let pending = PendingCheck::new("panics", Scope::All, Expect::Positive, || {
            panic!("predicate exploded")
        });
        let err = pending.evaluate().unwrap_err();
        assert_eq!(err, Error::assertion_failed("predicate exploded"));
    }

    #[test]
    #[should_panic(expected = "unevaluated checks")]
    fn test_drop_without_run_panics() {
        let pipeline = TestPipeline::new();
        pipeline.state.register(check(Ok(())));
    }

    #[test]
    fn test_drop_without_run_allowed_when_not_enforced() {
        let pipeline =
            TestPipeline::with_config(PipelineConfig::default().with_enforce_run(false));
        pipeline.state.register(check(Ok(())));
    }

    #[test]
    fn test_drop_releases_state_held_by_pending_checks() {
        use crate::assertions::have_size;

        let pipeline =
            TestPipeline::with_config(PipelineConfig::default().with_enforce_run(false));
        let state = Arc::downgrade(&pipeline.state);
        let numbers = pipeline.create(vec![1, 2]);
        have_size(2).apply(&numbers, Expect::Positive);
        drop(numbers);

        drop(pipeline);
        assert!(state.upgrade().is_none());
    }

    #[test]
    fn test_collections_get_distinct_names() {
        let pipeline = TestPipeline::new();
        let a = pipeline.create(vec![1]);
        let b = pipeline.create(vec![2]);
        assert_ne!(a.name(), b.name());
    }
}
