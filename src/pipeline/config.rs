//! Test pipeline configuration.

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

const ENV_FAIL_FAST: &str = "TESTKIT_PIPELINE_FAIL_FAST";
const ENV_ENFORCE_RUN: &str = "TESTKIT_PIPELINE_ENFORCE_RUN";
const ENV_MAX_LISTED_ITEMS: &str = "TESTKIT_PIPELINE_MAX_LISTED_ITEMS";

/// Configuration for a [`TestPipeline`](super::TestPipeline).
///
/// # Example
///
/// ```rust
/// use testkit_pipeline::pipeline::PipelineConfig;
///
/// let config = PipelineConfig::default()
///     .with_fail_fast(true)
///     .with_max_listed_items(5);
/// assert!(config.fail_fast);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Stop evaluating checks after the first failure.
    pub fail_fast: bool,
    /// Panic when a pipeline with unevaluated checks is dropped.
    pub enforce_run: bool,
    /// Maximum number of elements listed in a failure message.
    pub max_listed_items: usize,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            fail_fast: false,
            enforce_run: true,
            max_listed_items: 20,
        }
    }
}

impl PipelineConfig {
    /// Set whether to stop at the first failing check.
    #[must_use]
    pub fn with_fail_fast(mut self, fail_fast: bool) -> Self {
        self.fail_fast = fail_fast;
        self
    }

    /// Set whether dropping an unrun pipeline panics.
    #[must_use]
    pub fn with_enforce_run(mut self, enforce_run: bool) -> Self {
        self.enforce_run = enforce_run;
        self
    }

    /// Set how many elements failure messages list before truncating.
    #[must_use]
    pub fn with_max_listed_items(mut self, max: usize) -> Self {
        self.max_listed_items = max;
        self
    }

    /// Parse a configuration from JSON. Missing fields keep their defaults.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] if the JSON is malformed.
    pub fn from_json(json: &str) -> Result<Self> {
        serde_json::from_str(json).map_err(|e| Error::config(e.to_string()))
    }

    /// Defaults overlaid with `TESTKIT_PIPELINE_*` environment variables.
    ///
    /// Unparseable values are ignored with a warning.
    #[must_use]
    pub fn from_env() -> Self {
        Self::default().overlay(|key| std::env::var(key).ok())
    }

    fn overlay(mut self, lookup: impl Fn(&str) -> Option<String>) -> Self {
        if let Some(v) = parse_var(&lookup, ENV_FAIL_FAST, parse_bool) {
            self.fail_fast = v;
        }
        if let Some(v) = parse_var(&lookup, ENV_ENFORCE_RUN, parse_bool) {
            self.enforce_run = v;
        }
        if let Some(v) = parse_var(&lookup, ENV_MAX_LISTED_ITEMS, |s| s.parse().ok()) {
            self.max_listed_items = v;
        }
        self
    }
}

fn parse_var<T>(
    lookup: &impl Fn(&str) -> Option<String>,
    key: &str,
    parse: impl Fn(&str) -> Option<T>,
) -> Option<T> {
    let raw = lookup(key)?;
    let parsed = parse(raw.trim());
    if parsed.is_none() {
        tracing::warn!(key, value = %raw, "ignoring unparseable configuration value");
    }
    parsed
}

fn parse_bool(s: &str) -> Option<bool> {
    match s.to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_defaults() {
        let config = PipelineConfig::default();
        assert!(!config.fail_fast);
        assert!(config.enforce_run);
        assert_eq!(config.max_listed_items, 20);
    }

    #[test]
    fn test_from_json_keeps_defaults() {
        let config = PipelineConfig::from_json(r#"{"fail_fast": true}"#).unwrap();
        assert!(config.fail_fast);
        assert!(config.enforce_run);
        assert!(matches!(PipelineConfig::from_json("{"), Err(Error::Config(_))));
        assert!(matches!(
            PipelineConfig::from_json(r#"{"max_listed_items": "many"}"#),
            Err(Error::Config(_))
        ));
    }

    #[test]
    fn test_overlay() {
        let vars: HashMap<&str, &str> = [
            (ENV_FAIL_FAST, "yes"),
            (ENV_ENFORCE_RUN, "off"),
            (ENV_MAX_LISTED_ITEMS, "not-a-number"),
        ]
        .into_iter()
        .collect();
        let config =
            PipelineConfig::default().overlay(|key| vars.get(key).map(ToString::to_string));
        assert!(config.fail_fast);
        assert!(!config.enforce_run);
        assert_eq!(config.max_listed_items, 20);
    }
}
