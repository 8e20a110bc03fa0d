//! Configuration sources and capacity resolution.
//!
//! The maximum number of active scopes is read from the first configured
//! source that defines any of [`MAX_ACTIVE_SCOPES_KEYS`], checked in order,
//! with [`DEFAULT_MAX_ACTIVE_SCOPES`] as the final fallback. A value that is
//! present but not a positive integer is a startup error, never silently
//! ignored.

use std::collections::HashMap;
use std::env;
use std::num::NonZeroUsize;

use parking_lot::RwLock;
#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::{CacheError, CacheResult};

/// Capacity used when no source defines one.
pub const DEFAULT_MAX_ACTIVE_SCOPES: usize = 25;

/// Setting names consulted for the capacity, highest priority first.
pub const MAX_ACTIVE_SCOPES_KEYS: [&str; 3] = [
    "scope_cache.max_active_scopes",
    "session.max_active_views",
    "session.max_logical_views",
];

/// A configuration value that can be various types
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(untagged))]
pub enum ConfigValue {
    Boolean(bool),
    Integer(i64),
    Float(f64),
    String(String),
    Array(Vec<ConfigValue>),
    Object(HashMap<String, ConfigValue>),
}

impl ConfigValue {
    /// Parses a raw string the way environment values are parsed.
    pub fn parse(raw: &str) -> Self {
        if let Ok(int_val) = raw.parse::<i64>() {
            ConfigValue::Integer(int_val)
        } else if let Ok(float_val) = raw.parse::<f64>() {
            ConfigValue::Float(float_val)
        } else if let Ok(bool_val) = raw.parse::<bool>() {
            ConfigValue::Boolean(bool_val)
        } else {
            ConfigValue::String(raw.to_string())
        }
    }

    /// Try to convert to string
    pub fn as_string(&self) -> CacheResult<&str> {
        match self {
            ConfigValue::String(s) => Ok(s),
            _ => Err(CacheError::Config("config value is not a string".to_string())),
        }
    }

    /// Try to convert to integer. Integral strings are accepted.
    pub fn as_i64(&self) -> CacheResult<i64> {
        match self {
            ConfigValue::Integer(i) => Ok(*i),
            ConfigValue::String(s) => s
                .trim()
                .parse::<i64>()
                .map_err(|_| CacheError::Config(format!("config value {s:?} is not an integer"))),
            _ => Err(CacheError::Config("config value is not an integer".to_string())),
        }
    }

    /// Try to convert to boolean
    pub fn as_bool(&self) -> CacheResult<bool> {
        match self {
            ConfigValue::Boolean(b) => Ok(*b),
            _ => Err(CacheError::Config("config value is not a boolean".to_string())),
        }
    }
}

/// Trait for configuration sources
pub trait ConfigSource: Send + Sync + std::fmt::Debug {
    /// Get a configuration value by key
    fn get(&self, key: &str) -> Option<ConfigValue>;

    /// List all available keys
    fn keys(&self) -> Vec<String>;
}

/// Environment variable configuration source.
///
/// Keys are upper-cased and dots become underscores, so
/// `scope_cache.max_active_scopes` is read from
/// `SCOPE_CACHE_MAX_ACTIVE_SCOPES` (or `<PREFIX>_SCOPE_CACHE_MAX_ACTIVE_SCOPES`).
#[derive(Debug, Default)]
pub struct EnvironmentConfigSource {
    /// Prefix to filter environment variables
    prefix: Option<String>,
}

impl EnvironmentConfigSource {
    pub fn new() -> Self {
        Self { prefix: None }
    }

    pub fn with_prefix(prefix: impl Into<String>) -> Self {
        Self {
            prefix: Some(prefix.into()),
        }
    }

    /// Environment variable name for `key`.
    pub fn variable_name(&self, key: &str) -> String {
        let key = key.replace('.', "_").to_uppercase();
        match &self.prefix {
            Some(prefix) => format!("{}_{}", prefix.to_uppercase(), key),
            None => key,
        }
    }
}

impl ConfigSource for EnvironmentConfigSource {
    fn get(&self, key: &str) -> Option<ConfigValue> {
        env::var(self.variable_name(key))
            .ok()
            .map(|value| ConfigValue::parse(&value))
    }

    fn keys(&self) -> Vec<String> {
        env::vars()
            .filter_map(|(key, _)| match &self.prefix {
                Some(prefix) => {
                    let prefix_upper = format!("{}_", prefix.to_uppercase());
                    key.strip_prefix(&prefix_upper).map(str::to_lowercase)
                }
                None => Some(key.to_lowercase()),
            })
            .collect()
    }
}

/// In-memory configuration source, for hosts that hand settings over
/// directly and for tests.
#[derive(Debug, Default)]
pub struct MemoryConfigSource {
    values: RwLock<HashMap<String, ConfigValue>>,
}

impl MemoryConfigSource {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style [`set`](MemoryConfigSource::set).
    pub fn with(self, key: impl Into<String>, value: ConfigValue) -> Self {
        self.set(key, value);
        self
    }

    pub fn set(&self, key: impl Into<String>, value: ConfigValue) {
        self.values.write().insert(key.into(), value);
    }

    pub fn remove(&self, key: &str) -> Option<ConfigValue> {
        self.values.write().remove(key)
    }
}

impl ConfigSource for MemoryConfigSource {
    fn get(&self, key: &str) -> Option<ConfigValue> {
        self.values.read().get(key).cloned()
    }

    fn keys(&self) -> Vec<String> {
        self.values.read().keys().cloned().collect()
    }
}

/// JSON file configuration source
#[cfg(feature = "config")]
#[derive(Debug)]
pub struct JsonConfigSource {
    /// File path to JSON configuration
    file_path: String,
    /// Cached parsed configuration
    config: RwLock<Option<HashMap<String, ConfigValue>>>,
}

#[cfg(feature = "config")]
impl JsonConfigSource {
    pub fn new(file_path: impl Into<String>) -> Self {
        Self {
            file_path: file_path.into(),
            config: RwLock::new(None),
        }
    }

    /// Reload configuration from file
    pub fn reload(&self) -> CacheResult<()> {
        let content = std::fs::read_to_string(&self.file_path)
            .map_err(|e| CacheError::Config(format!("cannot read {}: {e}", self.file_path)))?;

        let parsed: HashMap<String, ConfigValue> = serde_json::from_str(&content)
            .map_err(|e| CacheError::Config(format!("invalid JSON in {}: {e}", self.file_path)))?;

        *self.config.write() = Some(parsed);
        Ok(())
    }
}

#[cfg(feature = "config")]
impl ConfigSource for JsonConfigSource {
    fn get(&self, key: &str) -> Option<ConfigValue> {
        if self.config.read().is_none() {
            if let Err(error) = self.reload() {
                tracing::warn!(%error, "JSON configuration source unavailable");
                return None;
            }
        }

        self.config.read().as_ref()?.get(key).cloned()
    }

    fn keys(&self) -> Vec<String> {
        self.config
            .read()
            .as_ref()
            .map(|cfg| cfg.keys().cloned().collect())
            .unwrap_or_default()
    }
}

/// Configuration provider checking its sources in priority order.
pub struct ConfigProvider {
    /// Configuration sources in priority order
    sources: Vec<Box<dyn ConfigSource>>,
    /// Cached configuration values
    cache: RwLock<HashMap<String, ConfigValue>>,
}

impl std::fmt::Debug for ConfigProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConfigProvider")
            .field("sources", &self.sources)
            .field("cached", &self.cache.read().len())
            .finish()
    }
}

impl ConfigProvider {
    /// Create a provider with no sources
    pub fn new() -> Self {
        Self {
            sources: Vec::new(),
            cache: RwLock::new(HashMap::new()),
        }
    }

    /// Add a configuration source (higher priority sources should be added first)
    pub fn add_source(&mut self, source: Box<dyn ConfigSource>) {
        self.sources.push(source);
    }

    /// Builder-style [`add_source`](ConfigProvider::add_source).
    pub fn with_source(mut self, source: impl ConfigSource + 'static) -> Self {
        self.add_source(Box::new(source));
        self
    }

    /// Get a configuration value, checking sources in priority order
    pub fn get(&self, key: &str) -> Option<ConfigValue> {
        if let Some(value) = self.cache.read().get(key) {
            return Some(value.clone());
        }

        let value = self.sources.iter().find_map(|source| source.get(key))?;
        self.cache.write().insert(key.to_string(), value.clone());
        Some(value)
    }

    /// First of `keys` defined by any source, with the key that matched.
    pub fn first_of<'k>(&self, keys: &[&'k str]) -> Option<(&'k str, ConfigValue)> {
        keys.iter().find_map(|key| self.get(key).map(|value| (*key, value)))
    }

    /// Get an integer configuration value
    pub fn get_i64(&self, key: &str) -> CacheResult<i64> {
        self.get(key)
            .ok_or_else(|| CacheError::Config(format!("configuration key {key} not found")))?
            .as_i64()
    }

    /// Get an integer configuration value with default
    pub fn get_i64_or(&self, key: &str, default: i64) -> i64 {
        self.get_i64(key).unwrap_or(default)
    }

    /// Get a string configuration value
    pub fn get_string(&self, key: &str) -> CacheResult<String> {
        self.get(key)
            .ok_or_else(|| CacheError::Config(format!("configuration key {key} not found")))?
            .as_string()
            .map(str::to_string)
    }

    /// Get a string configuration value with default
    pub fn get_string_or(&self, key: &str, default: &str) -> String {
        self.get_string(key).unwrap_or_else(|_| default.to_string())
    }

    /// Get a boolean configuration value with default
    pub fn get_bool_or(&self, key: &str, default: bool) -> bool {
        self.get(key)
            .and_then(|value| value.as_bool().ok())
            .unwrap_or(default)
    }

    /// Clear the configuration cache (forces reload from sources)
    pub fn invalidate_cache(&self) {
        self.cache.write().clear();
    }

    /// Get all configuration keys from all sources
    pub fn all_keys(&self) -> Vec<String> {
        let mut keys: Vec<String> = self.sources.iter().flat_map(|source| source.keys()).collect();
        keys.sort();
        keys.dedup();
        keys
    }
}

impl Default for ConfigProvider {
    fn default() -> Self {
        // Environment variables as default source
        Self::new().with_source(EnvironmentConfigSource::new())
    }
}

/// Resolved cache configuration.
///
/// # Examples
///
/// ```
/// use ferrous_scopes::{CacheConfig, ConfigProvider, ConfigValue, MemoryConfigSource};
///
/// let provider = ConfigProvider::new().with_source(
///     MemoryConfigSource::new().with("session.max_logical_views", ConfigValue::Integer(15)),
/// );
/// assert_eq!(CacheConfig::load(&provider).unwrap().max_active_scopes.get(), 15);
///
/// let empty = ConfigProvider::new();
/// assert_eq!(CacheConfig::load(&empty).unwrap().max_active_scopes.get(), 25);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CacheConfig {
    /// Maximum number of simultaneously active scopes per directory
    pub max_active_scopes: NonZeroUsize,
}

impl CacheConfig {
    /// Configuration with an explicit capacity.
    pub fn with_max_active_scopes(max_active_scopes: usize) -> CacheResult<Self> {
        NonZeroUsize::new(max_active_scopes)
            .map(|max_active_scopes| Self { max_active_scopes })
            .ok_or_else(|| {
                CacheError::CapacityMisconfigured("max_active_scopes must be at least 1, got 0".to_string())
            })
    }

    /// Resolves the configuration from `provider`.
    ///
    /// Fails with [`CacheError::CapacityMisconfigured`] when the first
    /// defined capacity key holds anything but a positive integer.
    pub fn load(provider: &ConfigProvider) -> CacheResult<Self> {
        let Some((key, value)) = provider.first_of(&MAX_ACTIVE_SCOPES_KEYS) else {
            tracing::debug!(
                max_active_scopes = DEFAULT_MAX_ACTIVE_SCOPES,
                "no capacity configured, using default"
            );
            return Ok(Self::default());
        };

        let max = value
            .as_i64()
            .map_err(|_| CacheError::CapacityMisconfigured(format!("{key} is not an integer: {value:?}")))?;
        let max = usize::try_from(max)
            .ok()
            .and_then(NonZeroUsize::new)
            .ok_or_else(|| CacheError::CapacityMisconfigured(format!("{key} must be positive, got {max}")))?;

        tracing::debug!(key, max_active_scopes = max.get(), "capacity resolved from configuration");
        Ok(Self { max_active_scopes: max })
    }
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            max_active_scopes: NonZeroUsize::new(DEFAULT_MAX_ACTIVE_SCOPES)
                .unwrap_or(NonZeroUsize::MIN),
        }
    }
}
