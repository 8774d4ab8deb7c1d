//! Deferred assertions over pipeline collections.
//!
//! A matcher is built with one of the functions below, optionally scoped to
//! a window or pane, and applied to a [`PCollection`](crate::pipeline::PCollection)
//! with an explicit polarity. Application only registers a check; the
//! collection's backend evaluates it when the pipeline runs.
//!
//! | Builder | Holds when |
//! |---------|------------|
//! | [`contain_in_any_order`] | the elements equal the expected multiset |
//! | [`contain_single_value`] | there is exactly one element, equal to the expected value |
//! | [`contain_value`] | the expected value is among the elements |
//! | [`be_empty`] | there are no elements |
//! | [`have_size`] | there are exactly `n` elements |
//! | [`equal_map_of`] | key-value pairs form exactly the expected map |
//! | [`satisfy`] | a predicate over all elements holds |
//! | [`satisfy_single_value`] | there is exactly one element and a predicate holds for it |
//! | [`for_all`] | every element satisfies a predicate |
//! | [`exist`] | some element satisfies a predicate |
//!
//! Equality-based builders round-trip the elements through the collection's
//! coder first, so comparisons see values the way a runner would after
//! shipping them. Each has a `*_by` variant taking an explicit
//! [`Equality`](crate::equality::Equality).
//!
//! # Example
//!
//! ```rust
//! use testkit_pipeline::assert_that;
//! use testkit_pipeline::assertions::{contain_in_any_order, have_size};
//! use testkit_pipeline::pipeline::{PaneInfo, TestPipeline, Window, WindowedValue};
//!
//! let pipeline = TestPipeline::new();
//! let window = Window::interval(0, 60);
//! let clicks = pipeline.create_windowed(vec![
//!     WindowedValue::new("home".to_string()).in_window(window).in_pane(PaneInfo::early(0)),
//!     WindowedValue::new("cart".to_string()).in_window(window).in_pane(PaneInfo::on_time(1, true)),
//! ]);
//!
//! assert_that!(clicks, should have_size(2).in_window(window));
//! assert_that!(clicks, should contain_in_any_order(vec!["cart".to_string()]).in_on_time_pane(window));
//!
//! pipeline.run().unwrap();
//! ```

mod builders;
pub mod matcher;

pub use builders::{
    be_empty, contain_in_any_order, contain_in_any_order_by, contain_single_value,
    contain_single_value_by, contain_value, contain_value_by, equal_map_of, equal_map_of_by, exist,
    for_all, have_size, satisfy, satisfy_checker, satisfy_predicate, satisfy_single_value,
    satisfy_single_value_predicate, Expect, PipelineMatcher,
};
pub use matcher::{
    ContainsValue, ElementsMatcher, HasSize, InAnyOrder, IsEmpty, Listing, MapEquals, Satisfies,
    SatisfiesChecker, SatisfiesSingleValue, SingleValue,
};
