//! Window and pane restrictions for deferred checks.

use std::collections::BTreeSet;
use std::fmt;

use super::window::{PaneTiming, Window, WindowedValue};
use crate::error::{Error, Result};

/// Which subset of a collection a check applies to.
///
/// A scope only narrows the elements handed to a matcher; it never changes
/// the predicate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Scope {
    /// Every element of every window and pane.
    #[default]
    All,
    /// Every pane of one window.
    Window(Window),
    /// The on-time pane of one window.
    OnTimePane(Window),
    /// All early and on-time panes of one window.
    CombinedNonLatePanes(Window),
    /// The pane marked as last in one window.
    FinalPane(Window),
    /// The single pane of one window; more than one pane is an error.
    OnlyPane(Window),
    /// The early panes of one window.
    EarlyPanes(Window),
}

impl Scope {
    /// The window this scope is restricted to, if any.
    #[must_use]
    pub fn window(&self) -> Option<Window> {
        match *self {
            Self::All => None,
            Self::Window(w)
            | Self::OnTimePane(w)
            | Self::CombinedNonLatePanes(w)
            | Self::FinalPane(w)
            | Self::OnlyPane(w)
            | Self::EarlyPanes(w) => Some(w),
        }
    }

    /// Select the elements of `values` that fall in this scope.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Scope`] for [`Scope::OnlyPane`] when the window was
    /// emitted in more than one pane, or in none.
    pub fn select<T: Clone>(&self, values: &[WindowedValue<T>]) -> Result<Vec<T>> {
        let in_window = |v: &&WindowedValue<T>| self.window().map_or(true, |w| v.window == w);

        let selected: Vec<&WindowedValue<T>> = match self {
            Self::All | Self::Window(_) => values.iter().filter(in_window).collect(),
            Self::OnTimePane(_) => values
                .iter()
                .filter(in_window)
                .filter(|v| v.pane.timing == PaneTiming::OnTime)
                .collect(),
            Self::CombinedNonLatePanes(_) => values
                .iter()
                .filter(in_window)
                .filter(|v| v.pane.timing != PaneTiming::Late)
                .collect(),
            Self::FinalPane(_) => values
                .iter()
                .filter(in_window)
                .filter(|v| v.pane.is_last)
                .collect(),
            Self::EarlyPanes(_) => values
                .iter()
                .filter(in_window)
                .filter(|v| v.pane.timing == PaneTiming::Early)
                .collect(),
            Self::OnlyPane(w) => {
                let in_scope: Vec<_> = values.iter().filter(in_window).collect();
                let panes: BTreeSet<u64> = in_scope.iter().map(|v| v.pane.index).collect();
                if in_scope.is_empty() {
                    return Err(Error::Scope(format!(
                        "expected a single pane in window {w}, but the window has no panes"
                    )));
                }
                let single = in_scope.iter().all(|v| v.pane.is_first && v.pane.is_last);
                if panes.len() > 1 || !single {
                    return Err(Error::Scope(format!(
                        "expected a single pane in window {w}, found pane indexes {panes:?}"
                    )));
                }
                in_scope
            }
        };

        Ok(selected.into_iter().map(|v| v.value.clone()).collect())
    }
}

impl fmt::Display for Scope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::All => f.write_str("all panes"),
            Self::Window(w) => write!(f, "window {w}"),
            Self::OnTimePane(w) => write!(f, "on-time pane of window {w}"),
            Self::CombinedNonLatePanes(w) => write!(f, "combined non-late panes of window {w}"),
            Self::FinalPane(w) => write!(f, "final pane of window {w}"),
            Self::OnlyPane(w) => write!(f, "only pane of window {w}"),
            Self::EarlyPanes(w) => write!(f, "early panes of window {w}"),
        }
    }
}
