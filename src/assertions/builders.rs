// Allow must_use_candidate for matcher factory functions since returning the matcher
// without using it is the common pattern for test setup
#![allow(clippy::must_use_candidate)]

//! Matchers bound to collections, and the functions that build them.

use std::collections::HashMap;
use std::fmt::{self, Debug};
use std::hash::Hash;
use std::ops::Not;
use std::sync::Arc;

use super::matcher::{
    ContainsValue, ElementsMatcher, HasSize, InAnyOrder, IsEmpty, Listing, MapEquals, SatisfiesChecker,
    Satisfies, SatisfiesSingleValue, SingleValue,
};
use crate::closure::{Checker, Predicate};
use crate::coder::round_trip_all;
use crate::equality::{Equality, HasEquality};
use crate::error::{Error, Result};
use crate::pipeline::{CheckHandle, PCollection, PendingCheck, Scope, Window};

/// Polarity of an assertion.
///
/// `Positive` asserts the matcher's condition ("should"), `Negative` asserts
/// its negation ("should not").
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Expect {
    /// The condition must hold.
    Positive,
    /// The condition must not hold.
    Negative,
}

impl Expect {
    /// Returns `true` for [`Expect::Negative`].
    #[must_use]
    pub fn is_negated(self) -> bool {
        self == Self::Negative
    }
}

impl Not for Expect {
    type Output = Self;

    fn not(self) -> Self {
        match self {
            Self::Positive => Self::Negative,
            Self::Negative => Self::Positive,
        }
    }
}

impl fmt::Display for Expect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Positive => f.write_str("should"),
            Self::Negative => f.write_str("should not"),
        }
    }
}

/// An [`ElementsMatcher`] together with the scope it applies to.
///
/// Built by the functions in this module, optionally narrowed with the
/// `in_*` modifiers, then applied to a collection with an explicit
/// [`Expect`]. Cloning is cheap; one matcher can be applied to several
/// collections.
pub struct PipelineMatcher<T> {
    matcher: Arc<dyn ElementsMatcher<T>>,
    scope: Scope,
    normalize: bool,
}

impl<T> PipelineMatcher<T> {
    /// Wrap a matcher. With `normalize`, elements are round-tripped through
    /// the collection's coder before matching.
    pub fn new(matcher: impl ElementsMatcher<T> + 'static, normalize: bool) -> Self {
        Self {
            matcher: Arc::new(matcher),
            scope: Scope::All,
            normalize,
        }
    }

    /// The scope the matcher applies to.
    pub fn scope(&self) -> Scope {
        self.scope
    }

    /// Whether elements are round-tripped before matching.
    pub fn normalizes(&self) -> bool {
        self.normalize
    }

    /// Restrict to an arbitrary scope.
    #[must_use]
    pub fn in_scope(mut self, scope: Scope) -> Self {
        self.scope = scope;
        self
    }

    /// Restrict to every pane of `window`.
    #[must_use]
    pub fn in_window(self, window: Window) -> Self {
        self.in_scope(Scope::Window(window))
    }

    /// Restrict to the on-time pane of `window`.
    #[must_use]
    pub fn in_on_time_pane(self, window: Window) -> Self {
        self.in_scope(Scope::OnTimePane(window))
    }

    /// Restrict to the early and on-time panes of `window`.
    #[must_use]
    pub fn in_combined_non_late_panes(self, window: Window) -> Self {
        self.in_scope(Scope::CombinedNonLatePanes(window))
    }

    /// Restrict to the final pane of `window`.
    #[must_use]
    pub fn in_final_pane(self, window: Window) -> Self {
        self.in_scope(Scope::FinalPane(window))
    }

    /// Restrict to the only pane of `window`; fails if it fired more than once.
    #[must_use]
    pub fn in_only_pane(self, window: Window) -> Self {
        self.in_scope(Scope::OnlyPane(window))
    }

    /// Restrict to the early panes of `window`.
    #[must_use]
    pub fn in_early_pane(self, window: Window) -> Self {
        self.in_scope(Scope::EarlyPanes(window))
    }

    /// Restrict to the early panes of the global window.
    #[must_use]
    pub fn in_early_global_window_panes(self) -> Self {
        self.in_early_pane(Window::Global)
    }

    /// Describe the matcher, phrased to follow "should".
    pub fn describe(&self, listing: &Listing) -> String {
        self.matcher.describe(listing)
    }
}

impl<T> PipelineMatcher<T>
where
    T: Clone + Debug + Send + Sync + 'static,
{
    /// Register this matcher as a deferred check on `collection`.
    ///
    /// Nothing is evaluated until the collection's backend runs.
    pub fn apply(&self, collection: &PCollection<T>, expect: Expect) -> CheckHandle {
        let listing = Listing::new(collection.backend().max_listed_items());
        let description = format!(
            "{} {expect} {} in {}",
            collection.name(),
            self.matcher.describe(&listing),
            self.scope
        );
        let matcher = self.clone();
        let target = collection.clone();
        collection.register(PendingCheck::new(
            description,
            self.scope,
            expect,
            move || matcher.check(&target, expect),
        ))
    }

    /// Evaluate this matcher against `collection` now.
    ///
    /// # Errors
    ///
    /// Returns [`Error::AssertionFailed`] when the assertion does not hold,
    /// [`Error::Codec`] when normalization fails and [`Error::Scope`] when
    /// the scope cannot be applied.
    pub fn check(&self, collection: &PCollection<T>, expect: Expect) -> Result<()> {
        let selected = collection.select(&self.scope)?;
        let elements = if self.normalize {
            round_trip_all(collection.coder().as_ref(), &selected)?
        } else {
            selected
        };
        let listing = Listing::new(collection.backend().max_listed_items());

        match (expect, self.matcher.verify(&elements, &listing)?) {
            (Expect::Positive, None) | (Expect::Negative, Some(_)) => Ok(()),
            (Expect::Positive, Some(mismatch)) => Err(Error::assertion_failed(format!(
                "{} in {}: {mismatch}",
                collection.name(),
                self.scope,
            ))),
            (Expect::Negative, None) => Err(Error::assertion_failed(format!(
                "{} in {}: expected not to {}, but got {}",
                collection.name(),
                self.scope,
                self.matcher.describe(&listing),
                listing.render(&elements)
            ))),
        }
    }
}

impl<T> Clone for PipelineMatcher<T> {
    fn clone(&self) -> Self {
        Self {
            matcher: Arc::clone(&self.matcher),
            scope: self.scope,
            normalize: self.normalize,
        }
    }
}

impl<T> Debug for PipelineMatcher<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PipelineMatcher")
            .field("matcher", &self.matcher.describe(&Listing::default()))
            .field("scope", &self.scope)
            .field("normalize", &self.normalize)
            .finish()
    }
}

/// Register a matcher on a collection with "should" / "should not" wording.
///
/// # Example
///
/// ```rust
/// use testkit_pipeline::assert_that;
/// use testkit_pipeline::assertions::{be_empty, contain_in_any_order};
/// use testkit_pipeline::pipeline::TestPipeline;
///
/// let pipeline = TestPipeline::new();
/// let words = pipeline.create(vec!["b".to_string(), "a".to_string()]);
///
/// assert_that!(words, should contain_in_any_order(vec!["a".to_string(), "b".to_string()]));
/// assert_that!(words, should not be_empty());
///
/// pipeline.run().unwrap();
/// ```
#[macro_export]
macro_rules! assert_that {
    ($collection:expr, should not $matcher:expr) => {
        $crate::assertions::PipelineMatcher::apply(
            &$matcher,
            &$collection,
            $crate::assertions::Expect::Negative,
        )
    };
    ($collection:expr, should $matcher:expr) => {
        $crate::assertions::PipelineMatcher::apply(
            &$matcher,
            &$collection,
            $crate::assertions::Expect::Positive,
        )
    };
}

// =============================================================================
// Equality-based builders
// =============================================================================

/// The collection holds exactly `expected`, in any order.
///
/// Multiplicity matters: `[1, 1, 2]` does not match `[1, 2, 2]`.
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
/// contain_in_any_order(vec![1, 2]).apply(&numbers, Expect::Negative);
/// pipeline.run().unwrap();
/// ```
pub fn contain_in_any_order<T, I>(expected: I) -> PipelineMatcher<T>
where
    I: IntoIterator<Item = T>,
    T: HasEquality + Clone + Debug + Send + Sync + 'static,
{
    contain_in_any_order_by(expected, T::equality())
}

/// [`contain_in_any_order`] with an explicit equality.
pub fn contain_in_any_order_by<T, I, E>(expected: I, equality: E) -> PipelineMatcher<T>
where
    I: IntoIterator<Item = T>,
    T: Clone + Debug + Send + Sync + 'static,
    E: Equality<T> + Clone + 'static,
{
    PipelineMatcher::new(
        InAnyOrder::new(expected.into_iter().collect(), equality),
        true,
    )
}

/// The collection holds exactly one element, equal to `expected`.
///
/// Under [`Expect::Negative`] the collection must still hold exactly one
/// element, and it must differ from `expected`.
pub fn contain_single_value<T>(expected: T) -> PipelineMatcher<T>
where
    T: HasEquality + Debug + Send + Sync + 'static,
{
    contain_single_value_by(expected, T::equality())
}

/// [`contain_single_value`] with an explicit equality.
pub fn contain_single_value_by<T, E>(expected: T, equality: E) -> PipelineMatcher<T>
where
    T: Debug + Send + Sync + 'static,
    E: Equality<T> + 'static,
{
    PipelineMatcher::new(SingleValue::new(expected, equality), true)
}

/// `expected` is one of the elements. Other elements are not checked.
pub fn contain_value<T>(expected: T) -> PipelineMatcher<T>
where
    T: HasEquality + Debug + Send + Sync + 'static,
{
    contain_value_by(expected, T::equality())
}

/// [`contain_value`] with an explicit equality.
pub fn contain_value_by<T, E>(expected: T, equality: E) -> PipelineMatcher<T>
where
    T: Debug + Send + Sync + 'static,
    E: Equality<T> + 'static,
{
    PipelineMatcher::new(ContainsValue::new(expected, equality), true)
}

/// The key-value pairs form exactly `expected`.
///
/// Keys in the collection are expected to be unique; duplicates are not
/// rejected and the last pair for a key wins.
///
/// # Example
///
/// ```rust
/// use testkit_pipeline::assertions::{equal_map_of, Expect};
/// use testkit_pipeline::pipeline::TestPipeline;
///
/// let pipeline = TestPipeline::new();
/// let counts = pipeline.create(vec![("a".to_string(), 1), ("b".to_string(), 2)]);
/// equal_map_of(vec![("a".to_string(), 1), ("b".to_string(), 2)])
///     .apply(&counts, Expect::Positive);
/// pipeline.run().unwrap();
/// ```
pub fn equal_map_of<K, V, I>(expected: I) -> PipelineMatcher<(K, V)>
where
    I: IntoIterator<Item = (K, V)>,
    K: Eq + Hash + Debug + Send + Sync + 'static,
    V: HasEquality + Debug + Send + Sync + 'static,
{
    equal_map_of_by(expected, V::equality())
}

/// [`equal_map_of`] with an explicit equality for values.
pub fn equal_map_of_by<K, V, I, E>(expected: I, equality: E) -> PipelineMatcher<(K, V)>
where
    I: IntoIterator<Item = (K, V)>,
    K: Eq + Hash + Debug + Send + Sync + 'static,
    V: Debug + Send + Sync + 'static,
    E: Equality<V> + 'static,
{
    let expected: HashMap<K, V> = expected.into_iter().collect();
    PipelineMatcher::new(MapEquals::new(expected, equality), true)
}

// =============================================================================
// Size builders
// =============================================================================

/// The collection has no elements.
pub fn be_empty<T: Debug + 'static>() -> PipelineMatcher<T> {
    PipelineMatcher::new(IsEmpty, false)
}

/// The collection has exactly `size` elements.
pub fn have_size<T: Debug + 'static>(size: usize) -> PipelineMatcher<T> {
    PipelineMatcher::new(HasSize::new(size), false)
}

// =============================================================================
// Predicate builders
// =============================================================================

/// `predicate` holds for the collection's elements as a whole.
///
/// # Example
///
/// ```rust
/// use testkit_pipeline::assertions::{satisfy, Expect};
/// use testkit_pipeline::pipeline::TestPipeline;
///
/// let pipeline = TestPipeline::new();
/// let numbers = pipeline.create(vec![1, 2, 3]);
/// satisfy(|xs: &[i32]| xs.iter().sum::<i32>() == 6).apply(&numbers, Expect::Positive);
/// pipeline.run().unwrap();
/// ```
pub fn satisfy<T, F>(predicate: F) -> PipelineMatcher<T>
where
    T: Debug + 'static,
    F: Fn(&[T]) -> bool + Send + Sync + 'static,
{
    satisfy_predicate(Predicate::new("the supplied predicate", predicate))
}

/// [`satisfy`] with a described [`Predicate`].
pub fn satisfy_predicate<T: Debug + 'static>(predicate: Predicate<[T]>) -> PipelineMatcher<T> {
    PipelineMatcher::new(Satisfies::new(predicate), false)
}

/// `checker` returns `Ok(())` without panicking.
pub fn satisfy_checker<T: Debug + 'static>(checker: Checker<T>) -> PipelineMatcher<T> {
    PipelineMatcher::new(SatisfiesChecker::new(checker), false)
}

/// The collection has exactly one element and `predicate` holds for it.
pub fn satisfy_single_value<T, F>(predicate: F) -> PipelineMatcher<T>
where
    T: Debug + 'static,
    F: Fn(&T) -> bool + Send + Sync + 'static,
{
    satisfy_single_value_predicate(Predicate::new("the supplied predicate", predicate))
}

/// [`satisfy_single_value`] with a described [`Predicate`].
pub fn satisfy_single_value_predicate<T: Debug + 'static>(
    predicate: Predicate<T>,
) -> PipelineMatcher<T> {
    PipelineMatcher::new(SatisfiesSingleValue::new(predicate), false)
}

/// Every element satisfies `predicate`. Holds for an empty collection.
pub fn for_all<T, F>(predicate: F) -> PipelineMatcher<T>
where
    T: Debug + 'static,
    F: Fn(&T) -> bool + Send + Sync + 'static,
{
    satisfy_predicate(Predicate::new(
        "every element matching the predicate",
        move |elements: &[T]| elements.iter().all(&predicate),
    ))
}

/// At least one element satisfies `predicate`.
pub fn exist<T, F>(predicate: F) -> PipelineMatcher<T>
where
    T: Debug + 'static,
    F: Fn(&T) -> bool + Send + Sync + 'static,
{
    satisfy_predicate(Predicate::new(
        "some element matching the predicate",
        move |elements: &[T]| elements.iter().any(&predicate),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::coder::JsonCoder;
    use crate::equality::ApproxEq;
    use crate::pipeline::{PaneInfo, TestPipeline, WindowedValue};

    fn assertion_message(result: Result<()>) -> String {
        match result {
            Err(Error::AssertionFailed(message)) => message,
            other => panic!("expected an assertion failure, got {other:?}"),
        }
    }

    #[test]
    fn test_expect_not() {
        assert_eq!(!Expect::Positive, Expect::Negative);
        assert!(Expect::Negative.is_negated());
        assert_eq!(Expect::Negative.to_string(), "should not");
    }

    #[test]
    fn test_contain_in_any_order_both_polarities() {
        let pipeline = TestPipeline::new();
        let numbers = pipeline.create(vec![3, 1, 2]);

        let all = contain_in_any_order(vec![1, 2, 3]);
        assert!(all.check(&numbers, Expect::Positive).is_ok());
        assert!(all.check(&numbers, Expect::Negative).is_err());

        let partial = contain_in_any_order(vec![1, 2]);
        let message = assertion_message(partial.check(&numbers, Expect::Positive));
        assert!(message.contains("unexpected [3]"));
        assert!(partial.check(&numbers, Expect::Negative).is_ok());
    }

    #[test]
    fn test_single_value_requires_one_element_under_both_polarities() {
        let pipeline = TestPipeline::new();
        let one = pipeline.create(vec![7]);
        let two = pipeline.create(vec![7, 8]);

        assert!(contain_single_value(7).check(&one, Expect::Positive).is_ok());
        assert!(contain_single_value(8).check(&one, Expect::Negative).is_ok());
        assert!(contain_single_value(7).check(&two, Expect::Positive).is_err());
        assert!(contain_single_value(9).check(&two, Expect::Negative).is_err());
    }

    #[test]
    fn test_contain_value() {
        let pipeline = TestPipeline::new();
        let numbers = pipeline.create(vec![1, 2, 3]);
        assert!(contain_value(2).check(&numbers, Expect::Positive).is_ok());
        assert!(contain_value(4).check(&numbers, Expect::Negative).is_ok());
        assert!(contain_value(4).check(&numbers, Expect::Positive).is_err());
    }

    #[test]
    fn test_size_matchers() {
        let pipeline = TestPipeline::new();
        let empty = pipeline.create(Vec::<i32>::new());
        let three = pipeline.create(vec![1, 2, 3]);

        assert!(be_empty().check(&empty, Expect::Positive).is_ok());
        assert!(be_empty().check(&three, Expect::Negative).is_ok());
        assert!(have_size(0).check(&empty, Expect::Positive).is_ok());
        assert!(have_size(1).check(&empty, Expect::Positive).is_err());
        assert!(have_size(3).check(&three, Expect::Positive).is_ok());
        assert!(have_size(2).check(&three, Expect::Negative).is_ok());
    }

    #[test]
    fn test_equal_map_of() {
        let pipeline = TestPipeline::new();
        let pairs = pipeline.create(vec![("a".to_string(), 1), ("b".to_string(), 2)]);

        let full = equal_map_of(vec![("a".to_string(), 1), ("b".to_string(), 2)]);
        assert!(full.check(&pairs, Expect::Positive).is_ok());

        let partial = equal_map_of(vec![("a".to_string(), 1)]);
        let message = assertion_message(partial.check(&pairs, Expect::Positive));
        assert!(message.contains("unexpected keys [\"b\"]"));
        assert!(partial.check(&pairs, Expect::Negative).is_ok());
    }

    #[test]
    fn test_equal_map_of_by_value_equality() {
        let pipeline = TestPipeline::new();
        let pairs = pipeline.create(vec![(1_u8, 0.30000000000000004_f64)]);
        let m = equal_map_of_by(vec![(1_u8, 0.3_f64)], ApproxEq::new(1e-9));
        assert!(m.check(&pairs, Expect::Positive).is_ok());
    }

    #[test]
    fn test_predicate_builders() {
        let pipeline = TestPipeline::new();
        let numbers = pipeline.create(vec![2, 4, 6]);

        assert!(satisfy(|xs: &[i32]| xs.len() == 3).check(&numbers, Expect::Positive).is_ok());
        assert!(for_all(|x: &i32| x % 2 == 0).check(&numbers, Expect::Positive).is_ok());
        assert!(for_all(|x: &i32| *x > 2).check(&numbers, Expect::Negative).is_ok());
        assert!(exist(|x: &i32| *x == 4).check(&numbers, Expect::Positive).is_ok());
        assert!(exist(|x: &i32| *x == 5).check(&numbers, Expect::Negative).is_ok());
        assert!(satisfy_single_value(|x: &i32| *x > 0)
            .check(&numbers, Expect::Positive)
            .is_err());
    }

    #[test]
    fn test_for_all_and_exist_on_empty() {
        let pipeline = TestPipeline::new();
        let empty = pipeline.create(Vec::<i32>::new());
        assert!(for_all(|_: &i32| false).check(&empty, Expect::Positive).is_ok());
        assert!(exist(|_: &i32| true).check(&empty, Expect::Negative).is_ok());
    }

    #[test]
    fn test_satisfy_checker() {
        let pipeline = TestPipeline::new();
        let numbers = pipeline.create(vec![1, 2]);
        let checker = Checker::from_assertions(|xs: &[i32]| assert_eq!(xs.len(), 2));
        assert!(satisfy_checker(checker.clone())
            .check(&numbers, Expect::Positive)
            .is_ok());
        assert!(satisfy_checker(checker)
            .check(&numbers, Expect::Negative)
            .is_err());
    }

    #[test]
    fn test_scope_modifiers() {
        let pipeline = TestPipeline::new();
        let w = Window::interval(0, 60);
        let values = pipeline.create_windowed(vec![
            WindowedValue::new(1).in_window(w).in_pane(PaneInfo::early(0)),
            WindowedValue::new(2).in_window(w).in_pane(PaneInfo::on_time(1, false)),
            WindowedValue::new(3).in_window(w).in_pane(PaneInfo::late(2, true)),
        ]);

        let on_time = contain_in_any_order(vec![2]).in_on_time_pane(w);
        assert_eq!(on_time.scope(), Scope::OnTimePane(w));
        assert!(on_time.check(&values, Expect::Positive).is_ok());
        assert!(contain_in_any_order(vec![1, 2])
            .in_combined_non_late_panes(w)
            .check(&values, Expect::Positive)
            .is_ok());
        assert!(contain_single_value(3)
            .in_final_pane(w)
            .check(&values, Expect::Positive)
            .is_ok());
        assert!(have_size(3)
            .in_window(w)
            .check(&values, Expect::Positive)
            .is_ok());
        assert!(contain_in_any_order(vec![1])
            .in_early_pane(w)
            .check(&values, Expect::Positive)
            .is_ok());
        assert!(be_empty()
            .in_early_global_window_panes()
            .check(&values, Expect::Positive)
            .is_ok());

        let err = have_size(3)
            .in_only_pane(w)
            .check(&values, Expect::Positive)
            .unwrap_err();
        assert!(matches!(err, Error::Scope(_)));
    }

    #[test]
    fn test_normalization_uses_collection_coder() {
        let pipeline = TestPipeline::new();
        let floats = pipeline.create_with_coder(vec![0.1_f32], JsonCoder::new());
        let normalized = crate::coder::round_trip(&JsonCoder::<f32>::new(), &0.1_f32).unwrap();
        assert!(contain_single_value(normalized)
            .check(&floats, Expect::Positive)
            .is_ok());
    }

    #[test]
    fn test_normalization_failure_is_codec_error() {
        let pipeline = TestPipeline::new();
        let floats = pipeline.create_with_coder(vec![f64::NAN], JsonCoder::new());
        let err = contain_value(1.0).check(&floats, Expect::Positive).unwrap_err();
        assert!(matches!(err, Error::Codec { .. }));

        // Size checks do not round-trip.
        assert!(have_size(1).check(&floats, Expect::Positive).is_ok());
        assert_eq!(floats.coder().name(), "json");
    }

    #[test]
    fn test_apply_registers_description() {
        let pipeline = TestPipeline::new();
        let numbers = pipeline.create(vec![1]).with_name("numbers");
        let handle = have_size(1).apply(&numbers, Expect::Negative);
        assert_eq!(
            handle.description(),
            "numbers should not have size 1 in all panes"
        );
        assert_eq!(pipeline.pending_checks(), 1);
        assert!(pipeline.run().is_err());
    }

    #[test]
    fn test_assert_that_macro() {
        let pipeline = TestPipeline::new();
        let numbers = pipeline.create(vec![1, 2, 3]);
        assert_that!(numbers, should contain_in_any_order(vec![3, 2, 1]));
        assert_that!(numbers, should not be_empty());
        assert_that!(numbers, should not contain_value(9));
        let report = pipeline.run().unwrap();
        assert_eq!(report.passed.len(), 3);
    }

    #[test]
    fn test_failure_listing_is_truncated() {
        let pipeline = TestPipeline::with_config(
            crate::pipeline::PipelineConfig::default().with_max_listed_items(2),
        );
        let numbers = pipeline.create(vec![1, 2, 3, 4, 5]);
        let message = assertion_message(be_empty().check(&numbers, Expect::Positive));
        assert!(message.contains("[1, 2, ... and 3 more]"));
    }
}
