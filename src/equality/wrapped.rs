//! Values paired with an equality capability and a printer.

use std::fmt::{self, Debug, Display};

use super::Equality;

type Printer<T> = fn(&T, &mut fmt::Formatter<'_>) -> fmt::Result;

/// A value that compares through an [`Equality`] instead of its own `PartialEq`.
///
/// Collection elements are wrapped before multiset and membership checks so
/// that the check uses the equality chosen for the assertion. `Display` and
/// `Debug` go through the printer, which defaults to the value's `Debug`
/// implementation (pretty-printed with `{:#}`).
///
/// # Example
///
/// ```rust
/// use testkit_pipeline::equality::{ApproxEq, Wrapped};
///
/// let a = Wrapped::new(1.0_f64, ApproxEq::new(0.1));
/// let b = Wrapped::new(1.05_f64, ApproxEq::new(0.1));
/// assert_eq!(a, b);
/// ```
#[derive(Clone)]
pub struct Wrapped<T, E> {
    value: T,
    equality: E,
    printer: Printer<T>,
}

fn debug_printer<T: Debug>(value: &T, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    if f.alternate() {
        write!(f, "{value:#?}")
    } else {
        write!(f, "{value:?}")
    }
}

impl<T: Debug, E> Wrapped<T, E> {
    /// Wrap a value with the given equality.
    pub fn new(value: T, equality: E) -> Self {
        Self {
            value,
            equality,
            printer: debug_printer::<T>,
        }
    }
}

impl<T, E> Wrapped<T, E> {
    /// Replace the printer used for `Display` and `Debug`.
    #[must_use]
    pub fn with_printer(mut self, printer: Printer<T>) -> Self {
        self.printer = printer;
        self
    }

    /// Borrow the wrapped value.
    pub fn value(&self) -> &T {
        &self.value
    }

    /// Unwrap the value.
    pub fn into_inner(self) -> T {
        self.value
    }
}

impl<T, E: Equality<T>> PartialEq for Wrapped<T, E> {
    fn eq(&self, other: &Self) -> bool {
        self.equality.equivalent(&self.value, &other.value)
    }
}

impl<T, E> Display for Wrapped<T, E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        (self.printer)(&self.value, f)
    }
}

impl<T, E> Debug for Wrapped<T, E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        (self.printer)(&self.value, f)
    }
}

/// Wrap every value with a clone of `equality`.
pub fn wrap_all<T, E, I>(values: I, equality: &E) -> Vec<Wrapped<T, E>>
where
    I: IntoIterator<Item = T>,
    T: Debug,
    E: Clone,
{
    values
        .into_iter()
        .map(|v| Wrapped::new(v, equality.clone()))
        .collect()
}
