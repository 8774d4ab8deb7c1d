// Allow must_use_candidate for the constructors; predicates are usually passed
// straight into a matcher
#![allow(clippy::must_use_candidate)]

//! Shipping user functions to the runner.
//!
//! Checks run after the pipeline is built, possibly on another thread or in
//! another process. Functions handed to matchers are therefore wrapped in
//! values that are `Send + Sync + 'static`:
//!
//! - [`Predicate`] - a shareable `Fn(&A) -> bool` with a description
//! - [`Checker`] - a shareable check over a slice of elements; a panic inside
//!   the check becomes an assertion failure
//! - [`CapturedFn`] - a plain function pointer plus explicitly declared,
//!   serde-serializable captured state
//! - [`FnRegistry`] - resolves a serialized [`FnEnvelope`] back into a
//!   [`CapturedFn`] by name
//!
//! # Example
//!
//! ```rust
//! use testkit_pipeline::closure::{CapturedFn, FnRegistry};
//!
//! fn above(threshold: &i64, value: &i64) -> bool {
//!     value > threshold
//! }
//!
//! let mut registry = FnRegistry::new();
//! registry.register("above", above);
//!
//! let envelope = CapturedFn::new("above", 10_i64, above).to_envelope().unwrap();
//! let wire = serde_json::to_string(&envelope).unwrap();
//!
//! let restored = registry.resolve(&serde_json::from_str(&wire).unwrap()).unwrap();
//! assert!(restored.call(&11));
//! assert!(!restored.call(&10));
//! ```

use std::collections::HashMap;
use std::fmt;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::pipeline::panic_message;

/// A predicate that can be shared with the runner.
pub struct Predicate<A: ?Sized> {
    description: String,
    func: Arc<dyn Fn(&A) -> bool + Send + Sync>,
}

impl<A: ?Sized> Predicate<A> {
    /// Wrap a closure with a description used in failure messages.
    pub fn new<F>(description: impl Into<String>, func: F) -> Self
    where
        F: Fn(&A) -> bool + Send + Sync + 'static,
    {
        Self {
            description: description.into(),
            func: Arc::new(func),
        }
    }

    /// Wrap a closure with a generic description.
    pub fn from_fn<F>(func: F) -> Self
    where
        F: Fn(&A) -> bool + Send + Sync + 'static,
    {
        Self::new("<predicate>", func)
    }

    /// Evaluate the predicate.
    pub fn call(&self, value: &A) -> bool {
        (self.func)(value)
    }

    /// The description.
    pub fn description(&self) -> &str {
        &self.description
    }
}

impl<A: ?Sized> Clone for Predicate<A> {
    fn clone(&self) -> Self {
        Self {
            description: self.description.clone(),
            func: Arc::clone(&self.func),
        }
    }
}

impl<A: ?Sized> fmt::Debug for Predicate<A> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Predicate").field(&self.description).finish()
    }
}

impl<A, F> From<F> for Predicate<A>
where
    A: ?Sized,
    F: Fn(&A) -> bool + Send + Sync + 'static,
{
    fn from(func: F) -> Self {
        Self::from_fn(func)
    }
}

/// A side-effecting check over a collection's elements.
///
/// Success means the check returned `Ok(())` without panicking.
pub struct Checker<T> {
    func: Arc<dyn Fn(&[T]) -> Result<()> + Send + Sync>,
}

impl<T> Checker<T> {
    /// Wrap a fallible check.
    pub fn new<F>(func: F) -> Self
    where
        F: Fn(&[T]) -> Result<()> + Send + Sync + 'static,
    {
        Self {
            func: Arc::new(func),
        }
    }

    /// Wrap a check that signals failure by panicking, as `assert!` does.
    pub fn from_assertions<F>(func: F) -> Self
    where
        F: Fn(&[T]) + Send + Sync + 'static,
    {
        Self::new(move |elements| {
            func(elements);
            Ok(())
        })
    }

    /// Run the check.
    ///
    /// # Errors
    ///
    /// Returns the check's error, or [`Error::AssertionFailed`] carrying the
    /// panic message if the check panicked.
    pub fn invoke(&self, elements: &[T]) -> Result<()> {
        panic::catch_unwind(AssertUnwindSafe(|| (self.func)(elements)))
            .unwrap_or_else(|payload| Err(Error::assertion_failed(panic_message(&*payload))))
    }
}

impl<T> Clone for Checker<T> {
    fn clone(&self) -> Self {
        Self {
            func: Arc::clone(&self.func),
        }
    }
}

impl<T> fmt::Debug for Checker<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Checker(..)")
    }
}

/// A function pointer with declared captured state.
///
/// Unlike a closure, the captured state is an ordinary serde value, so the
/// function can be described by its registered name plus the encoded state.
pub struct CapturedFn<S, A: ?Sized> {
    name: String,
    state: S,
    func: fn(&S, &A) -> bool,
}

impl<S, A: ?Sized> CapturedFn<S, A> {
    /// Bind `state` to `func` under `name`.
    pub fn new(name: impl Into<String>, state: S, func: fn(&S, &A) -> bool) -> Self {
        Self {
            name: name.into(),
            state,
            func,
        }
    }

    /// Evaluate the function.
    pub fn call(&self, value: &A) -> bool {
        (self.func)(&self.state, value)
    }

    /// The registered name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The captured state.
    pub fn state(&self) -> &S {
        &self.state
    }
}

impl<S, A> CapturedFn<S, A>
where
    S: Serialize + Send + Sync + 'static,
    A: ?Sized + 'static,
{
    /// Encode the name and state.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Closure`] if the state cannot be serialized.
    pub fn to_envelope(&self) -> Result<FnEnvelope> {
        let state = serde_json::to_value(&self.state)
            .map_err(|e| Error::closure(format!("cannot encode state of {}: {e}", self.name)))?;
        Ok(FnEnvelope {
            name: self.name.clone(),
            state,
        })
    }

    /// Convert into a [`Predicate`] described by the function name.
    pub fn into_predicate(self) -> Predicate<A> {
        let description = self.name.clone();
        Predicate::new(description, move |value: &A| self.call(value))
    }
}

impl<S: Clone, A: ?Sized> Clone for CapturedFn<S, A> {
    fn clone(&self) -> Self {
        Self {
            name: self.name.clone(),
            state: self.state.clone(),
            func: self.func,
        }
    }
}

impl<S: fmt::Debug, A: ?Sized> fmt::Debug for CapturedFn<S, A> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CapturedFn")
            .field("name", &self.name)
            .field("state", &self.state)
            .finish_non_exhaustive()
    }
}

/// Serialized form of a [`CapturedFn`]: its registered name and JSON state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FnEnvelope {
    /// Name the function was registered under.
    pub name: String,
    /// Encoded captured state.
    pub state: serde_json::Value,
}

/// Name-indexed table of functions that envelopes can refer to.
pub struct FnRegistry<S, A: ?Sized> {
    functions: HashMap<String, fn(&S, &A) -> bool>,
}

impl<S, A: ?Sized> FnRegistry<S, A> {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self {
            functions: HashMap::new(),
        }
    }

    /// Register `func` under `name`, replacing any previous entry.
    pub fn register(&mut self, name: impl Into<String>, func: fn(&S, &A) -> bool) -> &mut Self {
        self.functions.insert(name.into(), func);
        self
    }

    /// Returns `true` if `name` is registered.
    pub fn contains(&self, name: &str) -> bool {
        self.functions.contains_key(name)
    }
}

impl<S: DeserializeOwned, A: ?Sized> FnRegistry<S, A> {
    /// Rebuild a function from its envelope.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Closure`] if the name is not registered or the state
    /// does not decode.
    pub fn resolve(&self, envelope: &FnEnvelope) -> Result<CapturedFn<S, A>> {
        let func = self
            .functions
            .get(&envelope.name)
            .copied()
            .ok_or_else(|| Error::closure(format!("no function registered as {}", envelope.name)))?;
        let state = S::deserialize(&envelope.state)
            .map_err(|e| Error::closure(format!("cannot decode state of {}: {e}", envelope.name)))?;
        Ok(CapturedFn::new(envelope.name.clone(), state, func))
    }
}

impl<S, A: ?Sized> Default for FnRegistry<S, A> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn in_range(bounds: &(i32, i32), value: &i32) -> bool {
        (bounds.0..bounds.1).contains(value)
    }

    #[test]
    fn test_predicate() {
        let p = Predicate::new("is even", |x: &i32| x % 2 == 0);
        assert!(p.call(&4));
        assert!(!p.clone().call(&3));
        assert_eq!(p.description(), "is even");
    }

    #[test]
    fn test_predicate_from_closure() {
        let limit = 3;
        let p: Predicate<usize> = (move |x: &usize| *x < limit).into();
        assert!(p.call(&2));
        assert_eq!(p.description(), "<predicate>");
    }

    #[test]
    fn test_checker_forwards_result() {
        let checker = Checker::new(|xs: &[i32]| {
            if xs.is_empty() {
                Err(Error::assertion_failed("empty"))
            } else {
                Ok(())
            }
        });
        assert!(checker.invoke(&[1]).is_ok());
        assert_eq!(checker.invoke(&[]), Err(Error::assertion_failed("empty")));
    }

    #[test]
    fn test_checker_converts_panics() {
        let checker = Checker::from_assertions(|xs: &[i32]| assert_eq!(xs.len(), 2, "two items"));
        let err = checker.invoke(&[1]).unwrap_err();
        assert!(matches!(err, Error::AssertionFailed(ref msg) if msg.contains("two items")));
    }

    #[test]
    fn test_envelope_round_trip() {
        let mut registry = FnRegistry::new();
        registry.register("in_range", in_range);
        let f = CapturedFn::new("in_range", (0, 10), in_range);

        let json = serde_json::to_string(&f.to_envelope().unwrap()).unwrap();
        let envelope: FnEnvelope = serde_json::from_str(&json).unwrap();
        let restored = registry.resolve(&envelope).unwrap();

        assert_eq!(restored.state(), &(0, 10));
        assert!(restored.call(&5));
        assert!(!restored.call(&10));
    }

    #[test]
    fn test_resolve_unknown_name() {
        let registry: FnRegistry<(i32, i32), i32> = FnRegistry::new();
        let envelope = FnEnvelope {
            name: "missing".to_string(),
            state: serde_json::json!([0, 1]),
        };
        assert!(matches!(registry.resolve(&envelope), Err(Error::Closure(_))));
    }

    #[test]
    fn test_resolve_bad_state() {
        let mut registry = FnRegistry::new();
        registry.register("in_range", in_range);
        let envelope = FnEnvelope {
            name: "in_range".to_string(),
            state: serde_json::json!("not a pair"),
        };
        assert!(matches!(registry.resolve(&envelope), Err(Error::Closure(_))));
    }

    #[test]
    fn test_into_predicate() {
        let p = CapturedFn::new("in_range", (1, 3), in_range).into_predicate();
        assert!(p.call(&2));
        assert_eq!(p.description(), "in_range");
    }
}
