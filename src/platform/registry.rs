//! Explicit platform registry and factory.
//!
//! Platforms register a [`PlatformBinding`] at construction time; no
//! filesystem scanning or reflective lookup. Identifiers are kept in a
//! `BTreeMap` so enumeration order is deterministic.

use std::collections::BTreeMap;

use tracing::{debug, info, warn};

use super::{Crawler, Parser, PlatformBinding};
use crate::config::{general_defaults, PlatformConfig};
use crate::error::ScrapeError;

pub struct PlatformRegistry {
    bindings: BTreeMap<String, PlatformBinding>,
}

impl PlatformRegistry {
    /// An empty registry. Useful for tests that register synthetic platforms.
    pub fn new() -> Self {
        Self {
            bindings: BTreeMap::new(),
        }
    }

    /// Registry pre-loaded with the built-in platforms.
    pub fn with_builtin() -> Self {
        let mut registry = Self::new();
        registry.register(super::workday::binding());
        registry
    }

    /// Register a platform. A repeated identifier replaces the previous
    /// binding, latest wins.
    pub fn register(&mut self, binding: PlatformBinding) {
        let identifier = binding.identifier.to_lowercase();
        if self.bindings.insert(identifier.clone(), binding).is_some() {
            warn!(platform = %identifier, "platform binding replaced");
        } else {
            info!(platform = %identifier, "registered platform");
        }
    }

    /// Sorted identifiers of every registered platform.
    pub fn supported_platforms(&self) -> Vec<&str> {
        self.bindings.keys().map(String::as_str).collect()
    }

    pub fn is_supported(&self, platform: &str) -> bool {
        self.bindings.contains_key(&platform.to_lowercase())
    }

    fn binding(&self, platform: &str) -> Result<&PlatformBinding, ScrapeError> {
        self.bindings
            .get(&platform.to_lowercase())
            .ok_or_else(|| ScrapeError::UnsupportedPlatform(platform.to_string()))
    }

    /// Assemble the merged config map for a platform.
    ///
    /// Precedence, lowest to highest: general defaults, the platform's own
    /// config, run-supplied overrides.
    pub fn merged_config(
        &self,
        platform: &str,
        run_overrides: &PlatformConfig,
    ) -> Result<PlatformConfig, ScrapeError> {
        let binding = self.binding(platform)?;
        let mut merged = general_defaults();
        merged.extend((binding.config)());
        merged.extend(run_overrides.clone());
        debug!(
            platform = %binding.identifier,
            keys = merged.len(),
            "merged platform config"
        );
        Ok(merged)
    }

    /// Instantiate the platform's crawler with its merged config.
    pub fn create_crawler(
        &self,
        platform: &str,
        run_overrides: &PlatformConfig,
    ) -> Result<Box<dyn Crawler>, ScrapeError> {
        let binding = self.binding(platform)?;
        let merged = self.merged_config(platform, run_overrides)?;
        (binding.crawler)(merged).map_err(|reason| ScrapeError::PlatformContract {
            platform: binding.identifier.to_string(),
            contract: "Crawler",
            reason,
        })
    }

    /// Instantiate the platform's parser.
    pub fn create_parser(&self, platform: &str) -> Result<Box<dyn Parser>, ScrapeError> {
        let binding = self.binding(platform)?;
        Ok((binding.parser)())
    }
}

impl Default for PlatformRegistry {
    fn default() -> Self {
        Self::with_builtin()
    }
}
