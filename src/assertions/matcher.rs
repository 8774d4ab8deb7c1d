//! Element matchers evaluated against the selected contents of a collection.
//!
//! An [`ElementsMatcher`] answers one question about a slice of elements.
//! Polarity, scoping and normalization are handled by
//! [`PipelineMatcher`](super::PipelineMatcher); the matchers here only decide
//! and describe.
//!
//! # Implementing Custom Matchers
//!
//! ```rust
//! use testkit_pipeline::assertions::{ElementsMatcher, Listing, PipelineMatcher};
//! use testkit_pipeline::Result;
//!
//! struct Sorted;
//!
//! impl ElementsMatcher<i32> for Sorted {
//!     fn matches(&self, elements: &[i32]) -> Result<bool> {
//!         Ok(elements.windows(2).all(|w| w[0] <= w[1]))
//!     }
//!
//!     fn describe(&self, _listing: &Listing) -> String {
//!         "be sorted".to_string()
//!     }
//!
//!     fn describe_mismatch(&self, elements: &[i32], listing: &Listing) -> String {
//!         format!("{} is not sorted", listing.render(elements))
//!     }
//! }
//!
//! let m = Sorted;
//! assert!(m.matches(&[1, 2, 3]).unwrap());
//! let _matcher = PipelineMatcher::new(Sorted, false);
//! ```

use std::collections::HashMap;
use std::fmt::{Debug, Display};
use std::hash::Hash;

use crate::closure::{Checker, Predicate};
use crate::equality::{wrap_all, Equality, Wrapped};
use crate::error::{Error, Result};

/// A check over the elements of a collection.
pub trait ElementsMatcher<T>: Send + Sync {
    /// Check the elements.
    ///
    /// # Errors
    ///
    /// Returns an error when the question cannot be answered at all, for
    /// example a single-value check over several elements. Such errors fail
    /// the check under either polarity.
    fn matches(&self, elements: &[T]) -> Result<bool>;

    /// Describe what this matcher expects, phrased to follow "should".
    fn describe(&self, listing: &Listing) -> String;

    /// Describe why the elements didn't match.
    fn describe_mismatch(&self, elements: &[T], listing: &Listing) -> String;

    /// Check the elements once, returning the mismatch description on failure.
    ///
    /// Matchers that run user code override this so the code is invoked a
    /// single time per evaluation.
    ///
    /// # Errors
    ///
    /// Same as [`matches`](Self::matches).
    fn verify(&self, elements: &[T], listing: &Listing) -> Result<Option<String>> {
        if self.matches(elements)? {
            Ok(None)
        } else {
            Ok(Some(self.describe_mismatch(elements, listing)))
        }
    }
}

/// Renders element lists for failure messages, truncating long ones.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Listing {
    max_items: usize,
}

impl Listing {
    /// List at most `max_items` elements.
    #[must_use]
    pub fn new(max_items: usize) -> Self {
        Self { max_items }
    }

    /// Render items as `[a, b, c]`, truncated to the configured length.
    pub fn render<I>(&self, items: I) -> String
    where
        I: IntoIterator,
        I::Item: Debug,
    {
        self.join(items.into_iter().map(|item| format!("{item:?}")))
    }

    /// Render items with their `Display` form.
    pub fn render_display<I>(&self, items: I) -> String
    where
        I: IntoIterator,
        I::Item: Display,
    {
        self.join(items.into_iter().map(|item| item.to_string()))
    }

    fn join(&self, rendered: impl Iterator<Item = String>) -> String {
        let mut shown = Vec::new();
        let mut hidden = 0usize;
        for item in rendered {
            if shown.len() < self.max_items {
                shown.push(item);
            } else {
                hidden += 1;
            }
        }
        if hidden > 0 {
            shown.push(format!("... and {hidden} more"));
        }
        format!("[{}]", shown.join(", "))
    }
}

impl Default for Listing {
    fn default() -> Self {
        Self::new(20)
    }
}

fn exactly_one<T>(elements: &[T]) -> Result<&T> {
    match elements {
        [single] => Ok(single),
        _ => Err(Error::assertion_failed(format!(
            "expected a single value, but the collection has {} elements",
            elements.len()
        ))),
    }
}

/// Multiset comparison under an equality.
pub struct InAnyOrder<T, E> {
    expected: Vec<T>,
    equality: E,
}

impl<T, E> InAnyOrder<T, E> {
    /// Expect exactly `expected`, in any order.
    pub fn new(expected: Vec<T>, equality: E) -> Self {
        Self { expected, equality }
    }
}

impl<T: Clone + Debug, E: Equality<T> + Clone> InAnyOrder<T, E> {
    /// Expected items not found, and found items not expected.
    ///
    /// Pairs elements by maximum bipartite matching, so the result does not
    /// depend on the equality being transitive.
    fn difference(&self, elements: &[T]) -> (Vec<Wrapped<T, E>>, Vec<Wrapped<T, E>>) {
        let expected = wrap_all(self.expected.iter().cloned(), &self.equality);
        let actual = wrap_all(elements.iter().cloned(), &self.equality);

        let candidates: Vec<Vec<usize>> = actual
            .iter()
            .map(|a| (0..expected.len()).filter(|&e| *a == expected[e]).collect())
            .collect();

        // pairing[e] is the actual element matched to expected element e.
        let mut pairing: Vec<Option<usize>> = vec![None; expected.len()];
        let mut paired = vec![false; actual.len()];
        for a in 0..actual.len() {
            let mut visited = vec![false; expected.len()];
            paired[a] = augment(a, &candidates, &mut pairing, &mut visited);
        }

        let missing = expected
            .into_iter()
            .zip(&pairing)
            .filter(|(_, p)| p.is_none())
            .map(|(e, _)| e)
            .collect();
        let unexpected = actual
            .into_iter()
            .zip(&paired)
            .filter(|(_, p)| !**p)
            .map(|(a, _)| a)
            .collect();
        (missing, unexpected)
    }
}

/// Find an augmenting path from actual element `a` (Kuhn's algorithm).
fn augment(
    a: usize,
    candidates: &[Vec<usize>],
    pairing: &mut [Option<usize>],
    visited: &mut [bool],
) -> bool {
    for &e in &candidates[a] {
        if visited[e] {
            continue;
        }
        visited[e] = true;
        let free = match pairing[e] {
            None => true,
            Some(other) => augment(other, candidates, pairing, visited),
        };
        if free {
            pairing[e] = Some(a);
            return true;
        }
    }
    false
}

impl<T, E> ElementsMatcher<T> for InAnyOrder<T, E>
where
    T: Clone + Debug + Send + Sync,
    E: Equality<T> + Clone,
{
    fn matches(&self, elements: &[T]) -> Result<bool> {
        let (missing, unexpected) = self.difference(elements);
        Ok(missing.is_empty() && unexpected.is_empty())
    }

    fn describe(&self, listing: &Listing) -> String {
        format!("contain in any order {}", listing.render(&self.expected))
    }

    fn describe_mismatch(&self, elements: &[T], listing: &Listing) -> String {
        let (missing, unexpected) = self.difference(elements);
        let mut message = format!(
            "expected {} in any order, got {}",
            listing.render(&self.expected),
            listing.render(elements)
        );
        if !missing.is_empty() {
            message.push_str(&format!("; missing {}", listing.render(&missing)));
        }
        if !unexpected.is_empty() {
            message.push_str(&format!("; unexpected {}", listing.render(&unexpected)));
        }
        message
    }
}

/// Exactly one element, equal to the expected value.
pub struct SingleValue<T, E> {
    expected: T,
    equality: E,
}

impl<T, E> SingleValue<T, E> {
    /// Expect a single element equal to `expected`.
    pub fn new(expected: T, equality: E) -> Self {
        Self { expected, equality }
    }
}

impl<T, E> ElementsMatcher<T> for SingleValue<T, E>
where
    T: Debug + Send + Sync,
    E: Equality<T>,
{
    fn matches(&self, elements: &[T]) -> Result<bool> {
        let single = exactly_one(elements)?;
        Ok(self.equality.equivalent(single, &self.expected))
    }

    fn describe(&self, _listing: &Listing) -> String {
        format!("contain single value {:?}", self.expected)
    }

    fn describe_mismatch(&self, elements: &[T], listing: &Listing) -> String {
        format!(
            "expected single value {:?}, got {}",
            self.expected,
            listing.render(elements)
        )
    }
}

/// The expected value is one of the elements.
pub struct ContainsValue<T, E> {
    expected: T,
    equality: E,
}

impl<T, E> ContainsValue<T, E> {
    /// Expect `expected` among the elements.
    pub fn new(expected: T, equality: E) -> Self {
        Self { expected, equality }
    }
}

impl<T, E> ElementsMatcher<T> for ContainsValue<T, E>
where
    T: Debug + Send + Sync,
    E: Equality<T>,
{
    fn matches(&self, elements: &[T]) -> Result<bool> {
        Ok(elements
            .iter()
            .any(|e| self.equality.equivalent(e, &self.expected)))
    }

    fn describe(&self, _listing: &Listing) -> String {
        format!("contain value {:?}", self.expected)
    }

    fn describe_mismatch(&self, elements: &[T], listing: &Listing) -> String {
        format!(
            "{} does not contain {:?}",
            listing.render(elements),
            self.expected
        )
    }
}

/// No elements.
#[derive(Debug, Clone, Copy, Default)]
pub struct IsEmpty;

impl<T: Debug> ElementsMatcher<T> for IsEmpty {
    fn matches(&self, elements: &[T]) -> Result<bool> {
        Ok(elements.is_empty())
    }

    fn describe(&self, _listing: &Listing) -> String {
        "be empty".to_string()
    }

    fn describe_mismatch(&self, elements: &[T], listing: &Listing) -> String {
        format!(
            "expected empty, but had {} elements: {}",
            elements.len(),
            listing.render(elements)
        )
    }
}

/// Exactly `n` elements.
#[derive(Debug, Clone, Copy)]
pub struct HasSize {
    size: usize,
}

impl HasSize {
    /// Expect `size` elements.
    #[must_use]
    pub fn new(size: usize) -> Self {
        Self { size }
    }
}

impl<T: Debug> ElementsMatcher<T> for HasSize {
    fn matches(&self, elements: &[T]) -> Result<bool> {
        Ok(elements.len() == self.size)
    }

    fn describe(&self, _listing: &Listing) -> String {
        format!("have size {}", self.size)
    }

    fn describe_mismatch(&self, elements: &[T], listing: &Listing) -> String {
        format!(
            "expected size {}, but was {} (elements: {})",
            self.size,
            elements.len(),
            listing.render(elements)
        )
    }
}

/// Key-value pairs that form exactly the expected map.
pub struct MapEquals<K, V, E> {
    expected: HashMap<K, V>,
    equality: E,
}

impl<K, V, E> MapEquals<K, V, E> {
    /// Expect the pairs to form `expected`; values compare with `equality`.
    pub fn new(expected: HashMap<K, V>, equality: E) -> Self {
        Self { expected, equality }
    }
}

impl<K: Eq + Hash + Debug, V: Debug, E: Equality<V>> MapEquals<K, V, E> {
    fn actual<'a>(elements: &'a [(K, V)]) -> HashMap<&'a K, &'a V> {
        elements.iter().map(|(k, v)| (k, v)).collect()
    }

    fn render_entries<'a>(
        entries: impl IntoIterator<Item = (&'a K, &'a V)>,
        listing: &Listing,
    ) -> String
    where
        K: 'a,
        V: 'a,
    {
        let mut rendered: Vec<String> = entries
            .into_iter()
            .map(|(k, v)| format!("{k:?} -> {v:?}"))
            .collect();
        rendered.sort();
        listing.render_display(rendered)
    }
}

impl<K, V, E> ElementsMatcher<(K, V)> for MapEquals<K, V, E>
where
    K: Eq + Hash + Debug + Send + Sync,
    V: Debug + Send + Sync,
    E: Equality<V>,
{
    fn matches(&self, elements: &[(K, V)]) -> Result<bool> {
        let actual = Self::actual(elements);
        Ok(actual.len() == self.expected.len()
            && self.expected.iter().all(|(k, v)| {
                actual
                    .get(k)
                    .map_or(false, |a| self.equality.equivalent(a, v))
            }))
    }

    fn describe(&self, listing: &Listing) -> String {
        format!("equal map {}", Self::render_entries(&self.expected, listing))
    }

    fn describe_mismatch(&self, elements: &[(K, V)], listing: &Listing) -> String {
        let actual = Self::actual(elements);
        let mut problems = Vec::new();

        let mut missing: Vec<String> = self
            .expected
            .keys()
            .filter(|k| !actual.contains_key(k))
            .map(|k| format!("{k:?}"))
            .collect();
        missing.sort();
        if !missing.is_empty() {
            problems.push(format!("missing keys [{}]", missing.join(", ")));
        }

        let mut extra: Vec<String> = actual
            .keys()
            .filter(|k| !self.expected.contains_key(**k))
            .map(|k| format!("{k:?}"))
            .collect();
        extra.sort();
        if !extra.is_empty() {
            problems.push(format!("unexpected keys [{}]", extra.join(", ")));
        }

        let mut differing: Vec<String> = self
            .expected
            .iter()
            .filter_map(|(k, v)| {
                let a = actual.get(k)?;
                (!self.equality.equivalent(a, v))
                    .then(|| format!("{k:?}: expected {v:?}, got {a:?}"))
            })
            .collect();
        differing.sort();
        if !differing.is_empty() {
            problems.push(format!("differing values [{}]", differing.join(", ")));
        }

        format!(
            "expected map {}, got {}; {}",
            Self::render_entries(&self.expected, listing),
            Self::render_entries(actual.iter().map(|(k, v)| (*k, *v)), listing),
            problems.join("; ")
        )
    }
}

/// A predicate over all selected elements.
pub struct Satisfies<T> {
    predicate: Predicate<[T]>,
}

impl<T> Satisfies<T> {
    /// Expect `predicate` to hold for the elements.
    pub fn new(predicate: Predicate<[T]>) -> Self {
        Self { predicate }
    }
}

impl<T: Debug + 'static> ElementsMatcher<T> for Satisfies<T> {
    fn matches(&self, elements: &[T]) -> Result<bool> {
        Ok(self.predicate.call(elements))
    }

    fn describe(&self, _listing: &Listing) -> String {
        format!("satisfy {}", self.predicate.description())
    }

    fn describe_mismatch(&self, elements: &[T], listing: &Listing) -> String {
        format!(
            "{} does not satisfy {}",
            listing.render(elements),
            self.predicate.description()
        )
    }
}

/// A predicate over the single selected element.
pub struct SatisfiesSingleValue<T> {
    predicate: Predicate<T>,
}

impl<T> SatisfiesSingleValue<T> {
    /// Expect one element for which `predicate` holds.
    pub fn new(predicate: Predicate<T>) -> Self {
        Self { predicate }
    }
}

impl<T: Debug + 'static> ElementsMatcher<T> for SatisfiesSingleValue<T> {
    fn matches(&self, elements: &[T]) -> Result<bool> {
        let single = exactly_one(elements)?;
        Ok(self.predicate.call(single))
    }

    fn describe(&self, _listing: &Listing) -> String {
        format!("satisfy single value {}", self.predicate.description())
    }

    fn describe_mismatch(&self, elements: &[T], listing: &Listing) -> String {
        format!(
            "single value {} does not satisfy {}",
            listing.render(elements),
            self.predicate.description()
        )
    }
}

/// A [`Checker`] over all selected elements.
///
/// The check passes when the checker returns `Ok(())`. An assertion failure
/// raised by the checker, including a panic, counts as a mismatch; any other
/// error fails the check under either polarity.
pub struct SatisfiesChecker<T> {
    checker: Checker<T>,
}

impl<T> SatisfiesChecker<T> {
    /// Expect `checker` to succeed on the elements.
    pub fn new(checker: Checker<T>) -> Self {
        Self { checker }
    }
}

impl<T: Debug + 'static> ElementsMatcher<T> for SatisfiesChecker<T> {
    fn matches(&self, elements: &[T]) -> Result<bool> {
        match self.checker.invoke(elements) {
            Ok(()) => Ok(true),
            Err(Error::AssertionFailed(_)) => Ok(false),
            Err(other) => Err(other),
        }
    }

    fn describe(&self, _listing: &Listing) -> String {
        "pass the supplied checker".to_string()
    }

    fn describe_mismatch(&self, elements: &[T], listing: &Listing) -> String {
        format!("checker rejected {}", listing.render(elements))
    }

    fn verify(&self, elements: &[T], listing: &Listing) -> Result<Option<String>> {
        match self.checker.invoke(elements) {
            Ok(()) => Ok(None),
            Err(Error::AssertionFailed(reason)) => Ok(Some(format!(
                "{}: {reason}",
                self.describe_mismatch(elements, listing)
            ))),
            Err(other) => Err(other),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::equality::{ApproxEq, FnEq, NativeEq};

    fn listing() -> Listing {
        Listing::default()
    }

    #[test]
    fn test_listing_truncates() {
        assert_eq!(Listing::new(2).render([1, 2, 3, 4]), "[1, 2, ... and 2 more]");
        assert_eq!(Listing::new(5).render(Vec::<i32>::new()), "[]");
    }

    #[test]
    fn test_in_any_order() {
        let m = InAnyOrder::new(vec![1, 2, 3], NativeEq);
        assert!(m.matches(&[3, 1, 2]).unwrap());
        assert!(!m.matches(&[1, 2]).unwrap());
        assert!(!m.matches(&[1, 2, 3, 3]).unwrap());
    }

    #[test]
    fn test_in_any_order_respects_multiplicity() {
        let m = InAnyOrder::new(vec![1, 1, 2], NativeEq);
        assert!(m.matches(&[1, 2, 1]).unwrap());
        assert!(!m.matches(&[1, 2, 2]).unwrap());
    }

    #[test]
    fn test_in_any_order_mismatch_lists_items() {
        let m = InAnyOrder::new(vec![1, 2], NativeEq);
        let message = m.describe_mismatch(&[3, 1], &listing());
        assert!(message.contains("expected [1, 2] in any order"));
        assert!(message.contains("missing [2]"));
        assert!(message.contains("unexpected [3]"));
    }

    #[test]
    fn test_in_any_order_pairs_non_transitive_equality() {
        // 1.1 is close to both expected values; greedy pairing would strand 1.0.
        let m = InAnyOrder::new(vec![1.0_f64, 1.15], ApproxEq::new(0.11));
        assert!(m.matches(&[1.1, 1.0]).unwrap());
        assert!(!m.matches(&[1.1, 1.3]).unwrap());

        let message = m.describe_mismatch(&[1.1, 1.3], &listing());
        assert!(message.contains("missing [1.15]"), "{message}");
        assert!(message.contains("unexpected [1.3]"), "{message}");
    }

    #[test]
    fn test_in_any_order_with_custom_equality() {
        let m = InAnyOrder::new(
            vec!["A".to_string()],
            FnEq::new(|a: &String, b: &String| a.eq_ignore_ascii_case(b)),
        );
        assert!(m.matches(&["a".to_string()]).unwrap());
    }

    #[test]
    fn test_single_value() {
        let m = SingleValue::new(5, NativeEq);
        assert!(m.matches(&[5]).unwrap());
        assert!(!m.matches(&[6]).unwrap());
        assert!(m.matches(&[5, 5]).is_err());
        assert!(m.matches(&[]).is_err());
    }

    #[test]
    fn test_contains_value() {
        let m = ContainsValue::new(2, NativeEq);
        assert!(m.matches(&[1, 2, 3]).unwrap());
        assert!(!m.matches(&[1, 3]).unwrap());
    }

    #[test]
    fn test_is_empty_and_has_size() {
        assert!(ElementsMatcher::<i32>::matches(&IsEmpty, &[]).unwrap());
        assert!(!IsEmpty.matches(&[1]).unwrap());
        assert!(HasSize::new(0).matches(&Vec::<i32>::new()).unwrap());
        assert!(!HasSize::new(1).matches(&Vec::<i32>::new()).unwrap());
        assert!(HasSize::new(2).matches(&[1, 2]).unwrap());
    }

    #[test]
    fn test_map_equals() {
        let expected: HashMap<String, i32> =
            [("a".to_string(), 1), ("b".to_string(), 2)].into_iter().collect();
        let m = MapEquals::new(expected, NativeEq);
        let pairs = vec![("a".to_string(), 1), ("b".to_string(), 2)];
        assert!(m.matches(&pairs).unwrap());

        let missing = vec![("a".to_string(), 1)];
        assert!(!m.matches(&missing).unwrap());
        assert!(m
            .describe_mismatch(&missing, &listing())
            .contains("missing keys [\"b\"]"));

        let differing = vec![("a".to_string(), 1), ("b".to_string(), 3)];
        assert!(!m.matches(&differing).unwrap());
        assert!(m
            .describe_mismatch(&differing, &listing())
            .contains("\"b\": expected 2, got 3"));
    }

    #[test]
    fn test_map_equals_extra_key() {
        let expected: HashMap<String, i32> = [("a".to_string(), 1)].into_iter().collect();
        let m = MapEquals::new(expected, NativeEq);
        let pairs = vec![("a".to_string(), 1), ("z".to_string(), 9)];
        assert!(!m.matches(&pairs).unwrap());
        assert!(m
            .describe_mismatch(&pairs, &listing())
            .contains("unexpected keys [\"z\"]"));
    }

    #[test]
    fn test_map_equals_describe_is_sorted() {
        let expected: HashMap<i32, i32> = [(2, 20), (1, 10)].into_iter().collect();
        let m = MapEquals::new(expected, NativeEq);
        assert_eq!(
            ElementsMatcher::<(i32, i32)>::describe(&m, &listing()),
            "equal map [1 -> 10, 2 -> 20]"
        );
    }

    #[test]
    fn test_satisfies() {
        let m = Satisfies::new(Predicate::new("sums to 6", |xs: &[i32]| {
            xs.iter().sum::<i32>() == 6
        }));
        assert!(m.matches(&[1, 2, 3]).unwrap());
        assert!(!m.matches(&[1, 2]).unwrap());
        assert_eq!(m.describe(&listing()), "satisfy sums to 6");
    }

    #[test]
    fn test_satisfies_single_value() {
        let m = SatisfiesSingleValue::new(Predicate::new("positive", |x: &i32| *x > 0));
        assert!(m.matches(&[1]).unwrap());
        assert!(!m.matches(&[-1]).unwrap());
        assert!(m.matches(&[1, 2]).is_err());
    }

    #[test]
    fn test_satisfies_checker() {
        let m = SatisfiesChecker::new(Checker::from_assertions(|xs: &[i32]| {
            assert!(xs.contains(&7), "no seven");
        }));
        assert!(m.matches(&[7]).unwrap());
        assert!(!m.matches(&[1]).unwrap());
        assert_eq!(m.verify(&[7], &listing()), Ok(None));
        let mismatch = m.verify(&[1], &listing()).unwrap().unwrap();
        assert!(mismatch.contains("checker rejected [1]"));
        assert!(mismatch.contains("no seven"));
    }

    #[test]
    fn test_satisfies_checker_verify_invokes_once() {
        use std::sync::atomic::{AtomicUsize, Ordering};
        use std::sync::Arc;

        let calls = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&calls);
        let m = SatisfiesChecker::new(Checker::new(move |_: &[i32]| {
            counter.fetch_add(1, Ordering::SeqCst);
            Err(Error::assertion_failed("rejected"))
        }));

        let mismatch = m.verify(&[1, 2], &listing()).unwrap();
        assert!(mismatch.unwrap().contains("rejected"));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_satisfies_checker_propagates_setup_errors() {
        let m = SatisfiesChecker::new(Checker::new(|_: &[i32]| Err(Error::closure("gone"))));
        assert_eq!(m.matches(&[1]), Err(Error::closure("gone")));
    }
}
