//! Equality capabilities for comparing collection elements.
//!
//! Assertions never rely on an implicit notion of equality. Every
//! equality-based matcher takes an [`Equality`] value, either passed
//! explicitly through a `*_by` constructor or taken from the type's
//! [`HasEquality`] registration.
//!
//! - [`NativeEq`] - delegates to [`PartialEq`]
//! - [`ElementWise`] - compares sequences element by element with an inner equality
//! - [`OptionEq`] - compares options with an inner equality
//! - [`ApproxEq`] - absolute-tolerance comparison for floats
//! - [`FnEq`] - equality from a closure
//!
//! # Example
//!
//! ```rust
//! use testkit_pipeline::equality::{ApproxEq, ElementWise, Equality, HasEquality};
//!
//! let eq = <Vec<i32> as HasEquality>::equality();
//! assert!(eq.equivalent(&vec![1, 2, 3], &vec![1, 2, 3]));
//!
//! let approx = ElementWise(ApproxEq::new(1e-6));
//! assert!(approx.equivalent(&[0.1_f64 + 0.2, 1.0][..], &[0.3_f64, 1.0][..]));
//! ```

mod wrapped;

use std::fmt;

pub use wrapped::{wrap_all, Wrapped};

/// An equality predicate over `T`.
///
/// Implementations must behave as an equivalence relation; the multiset
/// comparison in [`contain_in_any_order`](crate::assertions::contain_in_any_order)
/// depends on it.
pub trait Equality<T: ?Sized>: Send + Sync {
    /// Returns `true` if `left` and `right` are considered equal.
    fn equivalent(&self, left: &T, right: &T) -> bool;
}

/// Equality through [`PartialEq`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct NativeEq;

impl<T: PartialEq + ?Sized> Equality<T> for NativeEq {
    fn equivalent(&self, left: &T, right: &T) -> bool {
        left == right
    }
}

/// Element-wise equality for slices, vectors, boxed slices and arrays.
///
/// Two sequences are equal when they have the same length and every pair of
/// elements at the same position is equal under the inner equality.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ElementWise<E>(pub E);

impl<T, E: Equality<T>> Equality<[T]> for ElementWise<E> {
    fn equivalent(&self, left: &[T], right: &[T]) -> bool {
        left.len() == right.len()
            && left
                .iter()
                .zip(right.iter())
                .all(|(l, r)| self.0.equivalent(l, r))
    }
}

impl<T, E: Equality<T>> Equality<Vec<T>> for ElementWise<E> {
    fn equivalent(&self, left: &Vec<T>, right: &Vec<T>) -> bool {
        <Self as Equality<[T]>>::equivalent(self, left, right)
    }
}

impl<T, E: Equality<T>> Equality<Box<[T]>> for ElementWise<E> {
    fn equivalent(&self, left: &Box<[T]>, right: &Box<[T]>) -> bool {
        <Self as Equality<[T]>>::equivalent(self, left, right)
    }
}

impl<T, E: Equality<T>, const N: usize> Equality<[T; N]> for ElementWise<E> {
    fn equivalent(&self, left: &[T; N], right: &[T; N]) -> bool {
        <Self as Equality<[T]>>::equivalent(self, left, right)
    }
}

/// Equality for [`Option`] using an inner equality for `Some` values.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct OptionEq<E>(pub E);

impl<T, E: Equality<T>> Equality<Option<T>> for OptionEq<E> {
    fn equivalent(&self, left: &Option<T>, right: &Option<T>) -> bool {
        match (left, right) {
            (Some(l), Some(r)) => self.0.equivalent(l, r),
            (None, None) => true,
            _ => false,
        }
    }
}

/// Absolute-tolerance equality for floating point values.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ApproxEq {
    epsilon: f64,
}

impl ApproxEq {
    /// Create a comparison that accepts differences up to `epsilon`.
    #[must_use]
    pub fn new(epsilon: f64) -> Self {
        Self {
            epsilon: epsilon.abs(),
        }
    }
}

impl Default for ApproxEq {
    fn default() -> Self {
        Self::new(f64::EPSILON)
    }
}

impl Equality<f64> for ApproxEq {
    fn equivalent(&self, left: &f64, right: &f64) -> bool {
        left == right || (left - right).abs() <= self.epsilon
    }
}

impl Equality<f32> for ApproxEq {
    fn equivalent(&self, left: &f32, right: &f32) -> bool {
        self.equivalent(&f64::from(*left), &f64::from(*right))
    }
}

/// Equality defined by a closure.
///
/// # Example
///
/// ```rust
/// use testkit_pipeline::equality::{Equality, FnEq};
///
/// let case_insensitive = FnEq::new(|a: &String, b: &String| a.eq_ignore_ascii_case(b));
/// assert!(case_insensitive.equivalent(&"Beam".to_string(), &"BEAM".to_string()));
/// ```
#[derive(Clone)]
pub struct FnEq<F>(F);

impl<F> FnEq<F> {
    /// Wrap a comparison closure.
    pub fn new(func: F) -> Self {
        Self(func)
    }
}

impl<F> fmt::Debug for FnEq<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("FnEq(..)")
    }
}

impl<T: ?Sized, F> Equality<T> for FnEq<F>
where
    F: Fn(&T, &T) -> bool + Send + Sync,
{
    fn equivalent(&self, left: &T, right: &T) -> bool {
        (self.0)(left, right)
    }
}

/// Tuples of equalities compare tuples component by component.
macro_rules! tuple_equality {
    ($(($t:ident, $e:ident, $idx:tt)),+) => {
        impl<$($t, $e: Equality<$t>),+> Equality<($($t,)+)> for ($($e,)+) {
            fn equivalent(&self, left: &($($t,)+), right: &($($t,)+)) -> bool {
                $(self.$idx.equivalent(&left.$idx, &right.$idx))&&+
            }
        }

        impl<$($t: HasEquality),+> HasEquality for ($($t,)+) {
            type Equality = ($($t::Equality,)+);
        }
    };
}

tuple_equality!((A, EA, 0), (B, EB, 1));
tuple_equality!((A, EA, 0), (B, EB, 1), (C, EC, 2));
tuple_equality!((A, EA, 0), (B, EB, 1), (C, EC, 2), (D, ED, 3));

/// Default equality registration for a type.
///
/// Matchers without an explicit equality use `T::equality()`. Scalars and
/// strings register [`NativeEq`]; sequences register [`ElementWise`] over
/// their element's registration, so nested containers resolve recursively.
///
/// Register your own types with [`impl_native_equality!`](crate::impl_native_equality)
/// or implement the trait by hand to pick a different capability.
pub trait HasEquality {
    /// The default capability for this type.
    type Equality: Equality<Self> + Default + Clone + 'static;

    /// Construct the default capability.
    #[must_use]
    fn equality() -> Self::Equality {
        Self::Equality::default()
    }
}

/// Register [`NativeEq`] as the default equality of one or more types.
///
/// # Example
///
/// ```rust
/// use testkit_pipeline::impl_native_equality;
///
/// #[derive(Debug, Clone, PartialEq)]
/// struct Order {
///     id: u64,
/// }
///
/// impl_native_equality!(Order);
/// ```
#[macro_export]
macro_rules! impl_native_equality {
    ($($t:ty),+ $(,)?) => {
        $(
            impl $crate::equality::HasEquality for $t {
                type Equality = $crate::equality::NativeEq;
            }
        )+
    };
}

impl_native_equality!(
    (),
    bool,
    char,
    i8,
    i16,
    i32,
    i64,
    i128,
    isize,
    u8,
    u16,
    u32,
    u64,
    u128,
    usize,
    f32,
    f64,
    String,
    &'static str,
);

impl<T: HasEquality> HasEquality for Vec<T> {
    type Equality = ElementWise<T::Equality>;
}

impl<T: HasEquality> HasEquality for Box<[T]> {
    type Equality = ElementWise<T::Equality>;
}

impl<T: HasEquality, const N: usize> HasEquality for [T; N] {
    type Equality = ElementWise<T::Equality>;
}

impl<T: HasEquality> HasEquality for Option<T> {
    type Equality = OptionEq<T::Equality>;
}
