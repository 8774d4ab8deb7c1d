//! Window and pane metadata attached to collection elements.

use std::fmt;

use serde::{Deserialize, Serialize};

/// A window an element was assigned to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Window {
    /// The single window spanning all time.
    Global,
    /// A half-open interval `[start, end)` in milliseconds.
    Interval {
        /// Inclusive start.
        start: i64,
        /// Exclusive end.
        end: i64,
    },
}

impl Window {
    /// Create an interval window.
    #[must_use]
    pub fn interval(start: i64, end: i64) -> Self {
        Self::Interval { start, end }
    }

    /// Returns `true` if `timestamp` falls inside this window.
    #[must_use]
    pub fn contains(&self, timestamp: i64) -> bool {
        match *self {
            Self::Global => true,
            Self::Interval { start, end } => start <= timestamp && timestamp < end,
        }
    }
}

impl Default for Window {
    fn default() -> Self {
        Self::Global
    }
}

impl fmt::Display for Window {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Global => f.write_str("GlobalWindow"),
            Self::Interval { start, end } => write!(f, "[{start}, {end})"),
        }
    }
}

/// When a pane fired relative to the watermark.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PaneTiming {
    /// Fired before the watermark passed the end of the window.
    Early,
    /// Fired when the watermark passed the end of the window.
    OnTime,
    /// Fired after the watermark, for late data.
    Late,
    /// Timing was not recorded.
    Unknown,
}

/// Describes which firing of a window produced an element.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PaneInfo {
    /// Timing of the firing.
    pub timing: PaneTiming,
    /// Zero-based index of the firing within its window.
    pub index: u64,
    /// First firing of the window.
    pub is_first: bool,
    /// Last firing of the window.
    pub is_last: bool,
}

impl PaneInfo {
    /// The only pane of a window that fired exactly once, on time.
    pub const ON_TIME_AND_ONLY_FIRING: Self = Self {
        timing: PaneTiming::OnTime,
        index: 0,
        is_first: true,
        is_last: true,
    };

    /// Create pane metadata.
    #[must_use]
    pub fn new(timing: PaneTiming, index: u64, is_first: bool, is_last: bool) -> Self {
        Self {
            timing,
            index,
            is_first,
            is_last,
        }
    }

    /// An early firing.
    #[must_use]
    pub fn early(index: u64) -> Self {
        Self::new(PaneTiming::Early, index, index == 0, false)
    }

    /// An on-time firing. Pass `is_last = false` when late panes follow.
    #[must_use]
    pub fn on_time(index: u64, is_last: bool) -> Self {
        Self::new(PaneTiming::OnTime, index, index == 0, is_last)
    }

    /// A late firing.
    #[must_use]
    pub fn late(index: u64, is_last: bool) -> Self {
        Self::new(PaneTiming::Late, index, false, is_last)
    }
}

impl Default for PaneInfo {
    fn default() -> Self {
        Self::ON_TIME_AND_ONLY_FIRING
    }
}

/// An element together with its timestamp, window and pane.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WindowedValue<T> {
    /// The element.
    pub value: T,
    /// Event time in milliseconds.
    pub timestamp: i64,
    /// Window the element was assigned to.
    pub window: Window,
    /// Pane that emitted the element.
    pub pane: PaneInfo,
}

impl<T> WindowedValue<T> {
    /// An element in the global window's only, on-time pane.
    pub fn new(value: T) -> Self {
        Self {
            value,
            timestamp: 0,
            window: Window::Global,
            pane: PaneInfo::default(),
        }
    }

    /// Set the event timestamp.
    #[must_use]
    pub fn at(mut self, timestamp: i64) -> Self {
        self.timestamp = timestamp;
        self
    }

    /// Set the window.
    #[must_use]
    pub fn in_window(mut self, window: Window) -> Self {
        self.window = window;
        self
    }

    /// Set the pane.
    #[must_use]
    pub fn in_pane(mut self, pane: PaneInfo) -> Self {
        self.pane = pane;
        self
    }

    /// Apply `f` to the element, keeping its metadata.
    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> WindowedValue<U> {
        WindowedValue {
            value: f(self.value),
            timestamp: self.timestamp,
            window: self.window,
            pane: self.pane,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_interval_contains() {
        let w = Window::interval(0, 10);
        assert!(w.contains(0));
        assert!(w.contains(9));
        assert!(!w.contains(10));
        assert!(Window::Global.contains(i64::MIN));
    }

    #[test]
    fn test_pane_constructors() {
        assert!(PaneInfo::early(0).is_first);
        assert!(!PaneInfo::early(1).is_first);
        assert_eq!(PaneInfo::on_time(2, true).timing, PaneTiming::OnTime);
        assert!(PaneInfo::late(3, true).is_last);
    }

    #[test]
    fn test_windowed_value_builder() {
        let v = WindowedValue::new(5)
            .at(1_500)
            .in_window(Window::interval(1_000, 2_000))
            .in_pane(PaneInfo::early(0))
            .map(|x| x * 2);
        assert_eq!(v.value, 10);
        assert_eq!(v.timestamp, 1_500);
        assert_eq!(v.window, Window::interval(1_000, 2_000));
        assert_eq!(v.pane.timing, PaneTiming::Early);
    }

    #[test]
    fn test_window_display() {
        assert_eq!(Window::Global.to_string(), "GlobalWindow");
        assert_eq!(Window::interval(0, 60).to_string(), "[0, 60)");
    }
}
