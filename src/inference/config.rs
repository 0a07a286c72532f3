//! Configuration for schema profiling

use serde::{Deserialize, Serialize};

/// Default number of rows inspected per run
pub const DEFAULT_SAMPLE_SIZE: usize = 1000;

/// Configuration for schema profiling
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProfilerConfig {
    /// Maximum number of leading rows to sample (0 = all)
    pub sample_size: usize,

    /// Mark a column nullable when some sampled rows lack the key entirely
    pub missing_keys_nullable: bool,
}

impl Default for ProfilerConfig {
    fn default() -> Self {
        Self {
            sample_size: DEFAULT_SAMPLE_SIZE,
            missing_keys_nullable: true,
        }
    }
}

impl ProfilerConfig {
    /// Create a new configuration with defaults
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a builder for custom configuration
    pub fn builder() -> ProfilerConfigBuilder {
        ProfilerConfigBuilder::default()
    }

    /// Number of rows to inspect out of `available`
    pub fn sample_len(&self, available: usize) -> usize {
        if self.sample_size == 0 {
            available
        } else {
            available.min(self.sample_size)
        }
    }
}

/// Builder for ProfilerConfig
#[derive(Debug, Default)]
pub struct ProfilerConfigBuilder {
    config: ProfilerConfig,
}

impl ProfilerConfigBuilder {
    /// Set the sample size (0 = all rows)
    pub fn sample_size(mut self, size: usize) -> Self {
        self.config.sample_size = size;
        self
    }

    /// Set whether absent keys make a column nullable
    pub fn missing_keys_nullable(mut self, nullable: bool) -> Self {
        self.config.missing_keys_nullable = nullable;
        self
    }

    /// Build the configuration
    pub fn build(self) -> ProfilerConfig {
        self.config
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = ProfilerConfig::default();
        assert_eq!(config.sample_size, 1000);
        assert!(config.missing_keys_nullable);
    }

    #[test]
    fn test_sample_len() {
        let config = ProfilerConfig::builder().sample_size(10).build();
        assert_eq!(config.sample_len(3), 3);
        assert_eq!(config.sample_len(50), 10);

        let all = ProfilerConfig::builder().sample_size(0).build();
        assert_eq!(all.sample_len(5000), 5000);
    }
}
