//! # testkit-pipeline
//!
//! > Deferred assertions for testing data-processing pipelines
//!
//! **testkit-pipeline** lets a test describe what a distributed collection
//! should contain while the pipeline is still being built. Checks are
//! registered with the runner and evaluated once the data exists.
//!
//! ## Quick Start
//!
//! ```rust
//! use testkit_pipeline::prelude::*;
//!
//! let pipeline = TestPipeline::new();
//! let words = pipeline.create(vec!["b".to_string(), "a".to_string(), "b".to_string()]);
//! let lengths = words.map(String::len);
//!
//! assert_that!(words, should contain_in_any_order(vec![
//!     "a".to_string(),
//!     "b".to_string(),
//!     "b".to_string(),
//! ]));
//! assert_that!(lengths, should for_all(|n: &usize| *n == 1));
//! assert_that!(lengths, should not be_empty());
//!
//! pipeline.run().unwrap();
//! ```
//!
//! ## Features
//!
//! - **Collection matchers** - multiset, single value, map and predicate checks
//! - **Window scoping** - restrict any check to a window or pane
//! - **Equality capabilities** - pluggable comparison, element-wise for arrays
//! - **Coder normalization** - compare values after a serialization round-trip
//! - **Shippable functions** - predicates and checkers that cross to the runner

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod assertions;
pub mod closure;
pub mod coder;
pub mod equality;
pub mod error;
pub mod pipeline;

/// Prelude for convenient imports
///
/// ```rust
/// use testkit_pipeline::prelude::*;
/// ```
pub mod prelude {
    pub use crate::assert_that;
    pub use crate::assertions::{
        be_empty, contain_in_any_order, contain_in_any_order_by, contain_single_value,
        contain_single_value_by, contain_value, contain_value_by, equal_map_of, equal_map_of_by,
        exist, for_all, have_size, satisfy, satisfy_checker, satisfy_single_value, Expect,
        PipelineMatcher,
    };
    pub use crate::closure::{Checker, Predicate};
    pub use crate::coder::{BincodeCoder, Coder, JsonCoder};
    pub use crate::equality::{Equality, HasEquality};
    pub use crate::error::{Error, Result};
    pub use crate::pipeline::{
        PCollection, PaneInfo, PipelineConfig, Scope, TestPipeline, Window, WindowedValue,
    };
}

// Re-exports
pub use error::{Error, Result};

// Re-export the test macro when macros feature is enabled
#[cfg(feature = "macros")]
pub use testkit_pipeline_macros::test;
