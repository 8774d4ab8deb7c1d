//! In-process pipeline that collections and deferred checks live on.
//!
//! This module provides the pieces the matchers are applied to:
//!
//! - [`TestPipeline`] - creates collections and evaluates their checks on [`run`](TestPipeline::run)
//! - [`PCollection`] - the collection-under-test
//! - [`AssertionBackend`] - the registration seam other runners implement
//! - [`Window`], [`PaneInfo`], [`WindowedValue`] - per-element window and pane metadata
//! - [`Scope`] - which windows and panes a check looks at
//! - [`PipelineConfig`] - run behavior
//!
//! # Example
//!
//! ```rust
//! use testkit_pipeline::pipeline::{PaneInfo, TestPipeline, Window, WindowedValue};
//!
//! let pipeline = TestPipeline::new();
//! let window = Window::interval(0, 60_000);
//! let scores = pipeline.create_windowed(vec![
//!     WindowedValue::new(3).at(1_000).in_window(window).in_pane(PaneInfo::early(0)),
//!     WindowedValue::new(5).at(2_000).in_window(window).in_pane(PaneInfo::on_time(1, true)),
//! ]);
//! assert_eq!(scores.len(), 2);
//! pipeline.run().unwrap();
//! ```

mod collection;
mod config;
mod runner;
mod scope;
mod window;

pub use collection::PCollection;
pub use config::PipelineConfig;
pub use runner::{
    AssertionBackend, CheckFailure, CheckHandle, CheckId, PendingCheck, RunReport, TestPipeline,
};
pub use scope::Scope;
pub use window::{PaneInfo, PaneTiming, Window, WindowedValue};

pub(crate) use runner::panic_message;
