#![forbid(unsafe_code)]

//! Engine configuration.
//!
//! Defaults suit production use. Environment overrides:
//!
//! | Variable | Field | Values |
//! |----------|-------|--------|
//! | `PROPFLOW_BINDING_LOOPS` | `report_binding_loops` | flag |
//! | `PROPFLOW_DEFER_ERRORS` | `defer_error_reporting` | flag |
//! | `PROPFLOW_FAST_PATH` | `accessor_fast_path` | flag |
//! | `PROPFLOW_EVIDENCE_LOG` | `evidence` | file path, or `-` for stdout |
//! | `PROPFLOW_DIAGNOSTIC_CAPACITY` | `diagnostic_capacity` | positive integer |
//!
//! Flags accept `1`, `true`, `yes`, `on` (any case) as true; anything else
//! is false. An unparsable capacity keeps the default.

use propflow_core::graph::DEFAULT_MAX_ALIAS_DEPTH;

use crate::diagnostics::DEFAULT_RECORD_CAPACITY;
use crate::evidence_sink::EvidenceSinkConfig;

/// Runtime options shared by every binding created through one context.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineConfig {
    /// Emit a diagnostic when a binding re-enters its own update.
    pub report_binding_loops: bool,
    /// Hold errors in the binding until `report_pending` instead of
    /// forwarding them to the diagnostics sink immediately.
    pub defer_error_reporting: bool,
    /// Bypass interceptors on write-back when none is installed at enable time.
    pub accessor_fast_path: bool,
    /// Upper bound on alias-chain hops when resolving a binding target.
    pub max_alias_depth: usize,
    /// Diagnostic records kept in memory before the oldest is evicted.
    pub diagnostic_capacity: usize,
    /// Where diagnostic records are mirrored as JSONL.
    pub evidence: EvidenceSinkConfig,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            report_binding_loops: true,
            defer_error_reporting: false,
            accessor_fast_path: true,
            max_alias_depth: DEFAULT_MAX_ALIAS_DEPTH,
            diagnostic_capacity: DEFAULT_RECORD_CAPACITY,
            evidence: EvidenceSinkConfig::default(),
        }
    }
}

#[inline]
fn env_flag(value: &str) -> bool {
    matches!(value.trim().to_ascii_lowercase().as_str(), "1" | "true" | "yes" | "on")
}

impl EngineConfig {
    /// Defaults with environment overrides applied.
    #[must_use]
    pub fn from_env() -> Self {
        Self::from_env_with(|key| std::env::var(key).ok())
    }

    /// Defaults with overrides read through `get_env`.
    #[must_use]
    pub fn from_env_with<F>(get_env: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();
        if let Some(v) = get_env("PROPFLOW_BINDING_LOOPS") {
            config.report_binding_loops = env_flag(&v);
        }
        if let Some(v) = get_env("PROPFLOW_DEFER_ERRORS") {
            config.defer_error_reporting = env_flag(&v);
        }
        if let Some(v) = get_env("PROPFLOW_FAST_PATH") {
            config.accessor_fast_path = env_flag(&v);
        }
        if let Some(n) = get_env("PROPFLOW_DIAGNOSTIC_CAPACITY").and_then(|v| v.trim().parse::<usize>().ok()) {
            config.diagnostic_capacity = n.max(1);
        }
        match get_env("PROPFLOW_EVIDENCE_LOG").as_deref().map(str::trim) {
            None | Some("") => {}
            Some("-") => config.evidence = EvidenceSinkConfig::enabled_stdout(),
            Some(path) => config.evidence = EvidenceSinkConfig::enabled_file(path),
        }
        config
    }

    /// Enable or disable binding-loop diagnostics.
    #[must_use]
    pub fn with_report_binding_loops(mut self, enabled: bool) -> Self {
        self.report_binding_loops = enabled;
        self
    }

    /// Keep errors in the binding until they are flushed or superseded.
    #[must_use]
    pub fn with_defer_error_reporting(mut self, enabled: bool) -> Self {
        self.defer_error_reporting = enabled;
        self
    }

    /// Allow write-back to bypass interceptors when none is installed.
    #[must_use]
    pub fn with_accessor_fast_path(mut self, enabled: bool) -> Self {
        self.accessor_fast_path = enabled;
        self
    }

    /// Set the alias-chain bound (at least 1).
    #[must_use]
    pub fn with_max_alias_depth(mut self, depth: usize) -> Self {
        self.max_alias_depth = depth.max(1);
        self
    }

    /// Set the in-memory diagnostic record bound (at least 1).
    #[must_use]
    pub fn with_diagnostic_capacity(mut self, capacity: usize) -> Self {
        self.diagnostic_capacity = capacity.max(1);
        self
    }

    /// Set the evidence sink configuration.
    #[must_use]
    pub fn with_evidence(mut self, evidence: EvidenceSinkConfig) -> Self {
        self.evidence = evidence;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::evidence_sink::EvidenceSinkDestination;
    use std::collections::HashMap;

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs.iter().map(|(k, v)| ((*k).into(), (*v).into())).collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn defaults() {
        let config = EngineConfig::default();
        assert!(config.report_binding_loops);
        assert!(!config.defer_error_reporting);
        assert!(config.accessor_fast_path);
        assert_eq!(config.max_alias_depth, 16);
        assert_eq!(config.diagnostic_capacity, DEFAULT_RECORD_CAPACITY);
        assert!(!config.evidence.enabled);
    }

    #[test]
    fn empty_env_keeps_defaults() {
        assert_eq!(EngineConfig::from_env_with(env(&[])), EngineConfig::default());
    }

    #[test]
    fn flags_parse_truthy_values() {
        let config = EngineConfig::from_env_with(env(&[
            ("PROPFLOW_BINDING_LOOPS", "off"),
            ("PROPFLOW_DEFER_ERRORS", " YES "),
            ("PROPFLOW_FAST_PATH", "0"),
        ]));
        assert!(!config.report_binding_loops);
        assert!(config.defer_error_reporting);
        assert!(!config.accessor_fast_path);
    }

    #[test]
    fn evidence_destinations() {
        let stdout = EngineConfig::from_env_with(env(&[("PROPFLOW_EVIDENCE_LOG", "-")]));
        assert!(stdout.evidence.enabled);
        assert_eq!(stdout.evidence.destination, EvidenceSinkDestination::Stdout);

        let file = EngineConfig::from_env_with(env(&[("PROPFLOW_EVIDENCE_LOG", "/tmp/b.jsonl")]));
        assert_eq!(file.evidence.destination, EvidenceSinkDestination::file("/tmp/b.jsonl"));
    }

    #[test]
    fn diagnostic_capacity_from_env() {
        let config = EngineConfig::from_env_with(env(&[("PROPFLOW_DIAGNOSTIC_CAPACITY", " 64 ")]));
        assert_eq!(config.diagnostic_capacity, 64);
        let bad = EngineConfig::from_env_with(env(&[("PROPFLOW_DIAGNOSTIC_CAPACITY", "lots")]));
        assert_eq!(bad.diagnostic_capacity, DEFAULT_RECORD_CAPACITY);
        let zero = EngineConfig::from_env_with(env(&[("PROPFLOW_DIAGNOSTIC_CAPACITY", "0")]));
        assert_eq!(zero.diagnostic_capacity, 1);
    }

    #[test]
    fn alias_depth_has_floor() {
        assert_eq!(EngineConfig::default().with_max_alias_depth(0).max_alias_depth, 1);
    }
}
