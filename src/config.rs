//! Run configuration from the environment.
//!
//! | Variable | Default |
//! |----------|---------|
//! | `FLOW_VARIANT_UNITS` | required; comma list or `all` |
//! | `FLOW_CONNECTIVITY` | `499` |
//! | `FLOW_PERFECT` | `false` |
//! | `FLOW_SUFFIX` | empty |
//! | `FLOW_OUTPUT_DIR` | `.` |
//! | `FLOW_WORKERS` | `0` (direct) |
//! | `FLOW_TASK_TIMEOUT_SECS` | `3600` |
//! | `FLOW_TASK_RETRIES` | `1` |
//! | `FLOW_BARRIER_TIMEOUT_SECS` | `0` (wait for every task) |
//! | `FLOW_RENDERER` | `graphviz` |

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::coherence::CoherenceProvider;
use crate::dispatch::{DirectDispatcher, Dispatcher, PoolConfig, PoolDispatcher};
use crate::render::{DiagramRenderer, DotRenderer, GraphvizRenderer};
use crate::runner::{FlowRequest, UnitSelection};
use crate::selector::BestParentSelector;
use crate::types::{Threshold, VariantUnit};

/// Default connectivity threshold.
pub const DEFAULT_CONNECTIVITY: &str = "499";

/// Error type for configuration.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    /// A required variable is unset.
    #[error("{0} is not set")]
    Missing(&'static str),
    /// A variable could not be parsed.
    #[error("Invalid value for {name}: {value:?} ({reason})")]
    Invalid {
        /// Variable name.
        name: &'static str,
        /// Raw value.
        value: String,
        /// What is wrong with it.
        reason: &'static str,
    },
}

impl ConfigError {
    pub(crate) fn invalid(name: &'static str, value: &str, reason: &'static str) -> Self {
        Self::Invalid {
            name,
            value: value.to_string(),
            reason,
        }
    }
}

/// Which diagram renderer to use.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RendererKind {
    /// Graphviz `dot -Tsvg`.
    #[default]
    Graphviz,
    /// DOT source only.
    Dot,
}

/// Configuration of a textual flow run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FlowConfig {
    /// Units to process.
    pub units: UnitSelection,
    /// Connectivity thresholds.
    pub thresholds: Vec<Threshold>,
    /// Strict orphan checking.
    pub perfect_only: bool,
    /// Artifact name suffix.
    pub suffix: String,
    /// Output directory.
    pub output_dir: PathBuf,
    /// Worker count; 0 runs selection directly on the controller.
    pub workers: usize,
    /// Per-task timeout in seconds.
    pub task_timeout_secs: u64,
    /// Re-queues of a timed-out task.
    pub task_retries: u32,
    /// Per-unit barrier timeout in seconds; 0 disables it.
    pub barrier_timeout_secs: u64,
    /// Renderer.
    pub renderer: RendererKind,
}

impl FlowConfig {
    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Load configuration through `lookup`.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let units = lookup("FLOW_VARIANT_UNITS").ok_or(ConfigError::Missing("FLOW_VARIANT_UNITS"))?;
        let connectivity = lookup("FLOW_CONNECTIVITY").unwrap_or_else(|| DEFAULT_CONNECTIVITY.to_string());

        let renderer = match lookup("FLOW_RENDERER").as_deref().map(str::trim) {
            None | Some("") | Some("graphviz") => RendererKind::Graphviz,
            Some("dot") => RendererKind::Dot,
            Some(other) => return Err(ConfigError::invalid("FLOW_RENDERER", other, "expected graphviz or dot")),
        };

        Ok(Self {
            units: parse_units(&units)?,
            thresholds: parse_thresholds(&connectivity)?,
            perfect_only: parse_bool("FLOW_PERFECT", lookup("FLOW_PERFECT"))?,
            suffix: lookup("FLOW_SUFFIX").unwrap_or_default(),
            output_dir: lookup("FLOW_OUTPUT_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from(".")),
            workers: parse_number("FLOW_WORKERS", lookup("FLOW_WORKERS"), 0)?,
            task_timeout_secs: parse_number("FLOW_TASK_TIMEOUT_SECS", lookup("FLOW_TASK_TIMEOUT_SECS"), 3600)?,
            task_retries: parse_number("FLOW_TASK_RETRIES", lookup("FLOW_TASK_RETRIES"), 1)?,
            barrier_timeout_secs: parse_number("FLOW_BARRIER_TIMEOUT_SECS", lookup("FLOW_BARRIER_TIMEOUT_SECS"), 0)?,
            renderer,
        })
    }

    /// The run request described by this configuration.
    pub fn request(&self) -> FlowRequest {
        FlowRequest::new(self.units.clone(), self.thresholds.clone())
            .with_perfect_only(self.perfect_only)
            .with_suffix(self.suffix.clone())
    }

    /// Pool settings, or `None` for direct mode.
    pub fn pool_config(&self) -> Option<PoolConfig> {
        if self.workers == 0 {
            return None;
        }
        Some(PoolConfig {
            workers: self.workers,
            task_timeout: Duration::from_secs(self.task_timeout_secs),
            max_retries: self.task_retries,
            barrier_timeout: (self.barrier_timeout_secs > 0)
                .then(|| Duration::from_secs(self.barrier_timeout_secs)),
        })
    }

    /// Build the configured dispatcher. Pool mode must be called inside a
    /// tokio runtime.
    pub fn dispatcher<P: CoherenceProvider + 'static>(&self, provider: Arc<P>) -> Box<dyn Dispatcher> {
        let selector = BestParentSelector::new(provider);
        match self.pool_config() {
            Some(config) => Box::new(PoolDispatcher::start(selector, config)),
            None => Box::new(DirectDispatcher::new(selector)),
        }
    }

    /// Build the configured renderer.
    pub fn renderer(&self) -> Box<dyn DiagramRenderer> {
        match self.renderer {
            RendererKind::Graphviz => Box::new(GraphvizRenderer::new()),
            RendererKind::Dot => Box::new(DotRenderer),
        }
    }
}

/// Parse a comma-separated threshold list.
///
/// Rejects empty lists, zero, and non-numeric entries.
pub fn parse_thresholds(raw: &str) -> Result<Vec<Threshold>, ConfigError> {
    let mut thresholds = Vec::new();
    for part in raw.split(',').map(str::trim).filter(|p| !p.is_empty()) {
        let value: u32 = part
            .parse()
            .map_err(|_| ConfigError::invalid("FLOW_CONNECTIVITY", part, "not a number"))?;
        let threshold =
            Threshold::new(value).ok_or_else(|| ConfigError::invalid("FLOW_CONNECTIVITY", part, "must be positive"))?;
        thresholds.push(threshold);
    }

    match thresholds.len() {
        0 => Err(ConfigError::invalid("FLOW_CONNECTIVITY", raw, "no thresholds")),
        1 => {
            tracing::info!("Have you considered calculating multiple connectivity values at once?");
            Ok(thresholds)
        }
        _ => Ok(thresholds),
    }
}

/// Parse a unit selector: `all` or a comma-separated list.
pub fn parse_units(raw: &str) -> Result<UnitSelection, ConfigError> {
    if raw.trim().eq_ignore_ascii_case("all") {
        return Ok(UnitSelection::All);
    }

    let units: Vec<VariantUnit> = raw
        .split(',')
        .map(str::trim)
        .filter(|u| !u.is_empty())
        .map(VariantUnit::from)
        .collect();
    if units.is_empty() {
        return Err(ConfigError::invalid("FLOW_VARIANT_UNITS", raw, "no variant units"));
    }
    Ok(UnitSelection::Named(units))
}

fn parse_bool(name: &'static str, raw: Option<String>) -> Result<bool, ConfigError> {
    match raw.as_deref().map(|s| s.trim().to_ascii_lowercase()).as_deref() {
        None | Some("") => Ok(false),
        Some("1" | "true" | "yes" | "on") => Ok(true),
        Some("0" | "false" | "no" | "off") => Ok(false),
        Some(other) => Err(ConfigError::invalid(name, other, "expected a boolean")),
    }
}

pub(crate) fn parse_number<T: std::str::FromStr>(name: &'static str, raw: Option<String>, default: T) -> Result<T, ConfigError> {
    match raw.as_deref().map(str::trim) {
        None | Some("") => Ok(default),
        Some(value) => value
            .parse()
            .map_err(|_| ConfigError::invalid(name, value, "not a number")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config(vars: &[(&str, &str)]) -> Result<FlowConfig, ConfigError> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        FlowConfig::from_lookup(|name| vars.get(name).cloned())
    }

    #[test]
    fn test_defaults() {
        let cfg = config(&[("FLOW_VARIANT_UNITS", "B04K1V1/2")]).unwrap();

        assert_eq!(cfg.thresholds, vec![Threshold::new(499).unwrap()]);
        assert_eq!(cfg.units, UnitSelection::Named(vec![VariantUnit::from("B04K1V1/2")]));
        assert!(!cfg.perfect_only);
        assert_eq!(cfg.output_dir, PathBuf::from("."));
        assert_eq!(cfg.renderer, RendererKind::Graphviz);
        assert!(cfg.pool_config().is_none());
    }

    #[test]
    fn test_units_required() {
        assert_eq!(config(&[]).unwrap_err(), ConfigError::Missing("FLOW_VARIANT_UNITS"));
    }

    #[test]
    fn test_pool_settings() {
        let cfg = config(&[
            ("FLOW_VARIANT_UNITS", "all"),
            ("FLOW_CONNECTIVITY", "5, 10,499"),
            ("FLOW_WORKERS", "4"),
            ("FLOW_TASK_TIMEOUT_SECS", "30"),
            ("FLOW_BARRIER_TIMEOUT_SECS", "600"),
            ("FLOW_PERFECT", "true"),
            ("FLOW_RENDERER", "dot"),
        ])
        .unwrap();

        assert_eq!(cfg.units, UnitSelection::All);
        assert_eq!(cfg.thresholds.len(), 3);
        assert!(cfg.perfect_only);
        assert_eq!(cfg.renderer, RendererKind::Dot);

        let pool = cfg.pool_config().unwrap();
        assert_eq!(pool.workers, 4);
        assert_eq!(pool.task_timeout, Duration::from_secs(30));
        assert_eq!(pool.max_retries, 1);
        assert_eq!(pool.barrier_timeout, Some(Duration::from_secs(600)));
        assert!(cfg.request().perfect_only);
    }

    #[test]
    fn test_threshold_parsing_rejects_bad_values() {
        assert!(parse_thresholds("").is_err());
        assert!(parse_thresholds(" , ").is_err());
        assert!(parse_thresholds("0").is_err());
        assert!(parse_thresholds("3,x").is_err());
        assert!(parse_thresholds("-1").is_err());
    }

    #[test]
    fn test_units_parsing() {
        assert_eq!(parse_units("ALL").unwrap(), UnitSelection::All);
        assert_eq!(
            parse_units("1:1, 2:3").unwrap(),
            UnitSelection::Named(vec![VariantUnit::from("1:1"), VariantUnit::from("2:3")])
        );
        assert!(parse_units(" ,").is_err());
    }

    #[test]
    fn test_invalid_values() {
        assert!(config(&[("FLOW_VARIANT_UNITS", "all"), ("FLOW_WORKERS", "many")]).is_err());
        assert!(config(&[("FLOW_VARIANT_UNITS", "all"), ("FLOW_PERFECT", "maybe")]).is_err());
        assert!(config(&[("FLOW_VARIANT_UNITS", "all"), ("FLOW_RENDERER", "png")]).is_err());
    }
}
