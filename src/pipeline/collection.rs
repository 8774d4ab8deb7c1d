//! The collection-under-test.

use std::collections::HashMap;
use std::fmt;
use std::hash::Hash;
use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde::Serialize;

use super::runner::{AssertionBackend, CheckHandle, PendingCheck};
use super::scope::Scope;
use super::window::WindowedValue;
use crate::coder::{BincodeCoder, Coder};
use crate::error::Result;

/// An immutable, windowed collection bound to an assertion backend.
///
/// Cloning is cheap: elements, coder and backend are shared.
pub struct PCollection<T> {
    name: String,
    values: Arc<Vec<WindowedValue<T>>>,
    coder: Arc<dyn Coder<T>>,
    backend: Arc<dyn AssertionBackend>,
}

impl<T> PCollection<T> {
    /// Create a collection on any backend.
    pub fn new(
        name: impl Into<String>,
        values: Vec<WindowedValue<T>>,
        coder: Arc<dyn Coder<T>>,
        backend: Arc<dyn AssertionBackend>,
    ) -> Self {
        Self {
            name: name.into(),
            values: Arc::new(values),
            coder,
            backend,
        }
    }

    /// Name of the collection.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Rename the collection.
    #[must_use]
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Number of elements across all windows and panes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Returns `true` if the collection holds no elements.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// The elements with their window and pane metadata.
    #[must_use]
    pub fn windowed_values(&self) -> &[WindowedValue<T>] {
        &self.values
    }

    /// The coder used for round-trip normalization.
    #[must_use]
    pub fn coder(&self) -> Arc<dyn Coder<T>> {
        Arc::clone(&self.coder)
    }

    /// Replace the coder.
    #[must_use]
    pub fn with_coder(mut self, coder: impl Coder<T> + 'static) -> Self {
        self.coder = Arc::new(coder);
        self
    }

    /// The backend checks are registered with.
    #[must_use]
    pub fn backend(&self) -> Arc<dyn AssertionBackend> {
        Arc::clone(&self.backend)
    }

    /// Register a deferred check with this collection's backend.
    pub fn register(&self, check: PendingCheck) -> CheckHandle {
        self.backend.register(check)
    }

    /// Apply `f` to every element, keeping window and pane metadata.
    ///
    /// The result is encoded with bincode.
    pub fn map<U, F>(&self, f: F) -> PCollection<U>
    where
        F: Fn(&T) -> U,
        U: Serialize + DeserializeOwned + Send + Sync + 'static,
    {
        self.map_with_coder(f, BincodeCoder::new())
    }

    /// Apply `f` to every element and encode the result with `coder`.
    pub fn map_with_coder<U, F, C>(&self, f: F, coder: C) -> PCollection<U>
    where
        F: Fn(&T) -> U,
        C: Coder<U> + 'static,
    {
        let values = self
            .values
            .iter()
            .map(|v| WindowedValue {
                value: f(&v.value),
                timestamp: v.timestamp,
                window: v.window,
                pane: v.pane,
            })
            .collect();
        PCollection {
            name: format!("{}/map", self.name),
            values: Arc::new(values),
            coder: Arc::new(coder),
            backend: Arc::clone(&self.backend),
        }
    }
}

impl<T: Clone> PCollection<T> {
    /// The elements that fall in `scope`.
    ///
    /// # Errors
    ///
    /// Returns the scope's selection error.
    pub fn select(&self, scope: &Scope) -> Result<Vec<T>> {
        scope.select(&self.values)
    }
}

impl<K, V> PCollection<(K, V)>
where
    K: Eq + Hash + Clone,
    V: Clone,
{
    /// View the pairs in `scope` as a map.
    ///
    /// Keys are expected to be unique. Duplicates are not rejected; the last
    /// pair for a key wins.
    ///
    /// # Errors
    ///
    /// Returns the scope's selection error.
    pub fn as_map(&self, scope: &Scope) -> Result<HashMap<K, V>> {
        Ok(self.select(scope)?.into_iter().collect())
    }
}

impl<T> Clone for PCollection<T> {
    fn clone(&self) -> Self {
        Self {
            name: self.name.clone(),
            values: Arc::clone(&self.values),
            coder: Arc::clone(&self.coder),
            backend: Arc::clone(&self.backend),
        }
    }
}

impl<T: fmt::Debug> fmt::Debug for PCollection<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PCollection")
            .field("name", &self.name)
            .field("coder", &self.coder.name())
            .field("values", &self.values)
            .finish_non_exhaustive()
    }
}
