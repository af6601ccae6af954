//! Aggregator configuration, loaded from TOML.
//!
//! Every section is optional. Durations are integer milliseconds under `*_ms` keys.
//!
//! ```toml
//! [log]
//! format = "json"
//! filter = "info,storefront_resilience=debug"
//!
//! [cache]
//! capacity = 50000
//!
//! [services.inventory]
//! base_url = "http://inventory.internal:8080"
//! cache_ttl_ms = 30000
//! max_staleness_ms = 300000
//!
//! [policies.inventory]
//! timeout_ms = 500
//! max_attempts = 3
//! max_concurrent_calls = 50
//! ```

use crate::telemetry::LogConfig;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Duration;
use storefront_resilience::{PipelineError, PolicyConfig, PolicyName, ResiliencePipeline};
use thiserror::Error;

/// Errors raised while loading configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("invalid config: {0}")]
    Invalid(String),

    #[error(transparent)]
    Pipeline(#[from] PipelineError),

    #[error("failed to build HTTP client: {0}")]
    Http(#[from] reqwest::Error),
}

/// The three downstream services.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Downstream {
    Merchandise,
    Price,
    Inventory,
}

impl Downstream {
    pub const ALL: [Downstream; 3] = [
        Downstream::Merchandise,
        Downstream::Price,
        Downstream::Inventory,
    ];

    /// Policy name and cache key domain.
    pub fn name(self) -> &'static str {
        match self {
            Downstream::Merchandise => "merchandise",
            Downstream::Price => "price",
            Downstream::Inventory => "inventory",
        }
    }

    pub fn default_cache_ttl(self) -> Duration {
        match self {
            Downstream::Merchandise => Duration::from_secs(15 * 60),
            Downstream::Price => Duration::from_secs(2 * 60),
            Downstream::Inventory => Duration::from_secs(30),
        }
    }

    pub fn default_policy(self) -> PolicyConfig {
        let timeout = match self {
            Downstream::Merchandise => Duration::from_millis(2000),
            Downstream::Price => Duration::from_millis(1000),
            Downstream::Inventory => Duration::from_millis(500),
        };
        PolicyConfig {
            timeout,
            ..PolicyConfig::default()
        }
    }
}

/// Where a downstream service lives and how long its answers are cached.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ServiceConfig {
    pub base_url: String,
    /// Unset: the service's default TTL.
    #[serde(rename = "cache_ttl_ms", with = "storefront_resilience::serde_millis::option")]
    pub cache_ttl: Option<Duration>,
    /// How long past expiry a cached answer may still be served after a failure.
    /// Only used by the inventory client.
    #[serde(rename = "max_staleness_ms", with = "storefront_resilience::serde_millis")]
    pub max_staleness: Duration,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:8080".to_string(),
            cache_ttl: None,
            max_staleness: Duration::from_secs(5 * 60),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ServicesConfig {
    pub merchandise: ServiceConfig,
    pub price: ServiceConfig,
    pub inventory: ServiceConfig,
}

impl ServicesConfig {
    pub fn get(&self, downstream: Downstream) -> &ServiceConfig {
        match downstream {
            Downstream::Merchandise => &self.merchandise,
            Downstream::Price => &self.price,
            Downstream::Inventory => &self.inventory,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CacheConfig {
    /// Maximum entries held by the in-process store.
    pub capacity: usize,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self { capacity: 10_000 }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct AggregatorConfig {
    pub log: LogConfig,
    pub cache: CacheConfig,
    pub services: ServicesConfig,
    /// Resilience policies by name. The three downstream policies are always present;
    /// a section here replaces the built-in defaults for that name.
    pub policies: HashMap<String, PolicyConfig>,
}

impl Default for AggregatorConfig {
    fn default() -> Self {
        let mut config = Self {
            log: LogConfig::default(),
            cache: CacheConfig::default(),
            services: ServicesConfig::default(),
            policies: HashMap::new(),
        };
        config.fill_default_policies();
        config
    }
}

impl AggregatorConfig {
    /// Parses and validates a TOML document.
    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        let mut config: AggregatorConfig = toml::from_str(content)?;
        config.fill_default_policies();
        config.validate()?;
        Ok(config)
    }

    /// Reads, parses and validates a TOML file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&content)
    }

    fn fill_default_policies(&mut self) {
        for downstream in Downstream::ALL {
            self.policies
                .entry(downstream.name().to_string())
                .or_insert_with(|| downstream.default_policy());
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        for downstream in Downstream::ALL {
            let service = self.services.get(downstream);
            if service.base_url.trim().is_empty() {
                return Err(ConfigError::Invalid(format!(
                    "services.{}.base_url must not be empty",
                    downstream.name()
                )));
            }
            if service.cache_ttl.is_some_and(|ttl| ttl.is_zero()) {
                return Err(ConfigError::Invalid(format!(
                    "services.{}.cache_ttl_ms must be greater than zero",
                    downstream.name()
                )));
            }
            if !self.policies.contains_key(downstream.name()) {
                return Err(PipelineError::UnknownPolicy(PolicyName::new(downstream.name())).into());
            }
        }
        if self.cache.capacity == 0 {
            return Err(ConfigError::Invalid(
                "cache.capacity must be at least 1".to_string(),
            ));
        }
        for (name, policy) in &self.policies {
            policy.validate(&PolicyName::new(name))?;
        }
        Ok(())
    }

    /// TTL of cached answers from `downstream`.
    pub fn cache_ttl(&self, downstream: Downstream) -> Duration {
        self.services
            .get(downstream)
            .cache_ttl
            .unwrap_or_else(|| downstream.default_cache_ttl())
    }

    /// Builds the policy registry.
    pub fn pipeline(&self) -> Result<ResiliencePipeline, ConfigError> {
        let pipeline = ResiliencePipeline::builder()
            .on_state_transition(|policy, from, to| {
                tracing::warn!(%policy, %from, %to, "circuit breaker state transition");
            });
        let pipeline = self
            .policies
            .iter()
            .fold(pipeline, |builder, (name, policy)| {
                builder.policy(name.as_str(), policy.clone())
            })
            .build()?;
        Ok(pipeline)
    }
}
