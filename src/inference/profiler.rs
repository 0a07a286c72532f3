//! Schema profiler over sampled rows

use std::collections::HashMap;

use tracing::debug;

use super::config::ProfilerConfig;
use super::error::ProfileError;
use super::profile::ColumnProfile;
use super::types::InferredColumn;
use crate::dialect::Dialect;
use crate::models::Row;

/// Infers column types from the leading rows of an extraction
#[derive(Debug, Clone, Default)]
pub struct SchemaProfiler {
    config: ProfilerConfig,
}

impl SchemaProfiler {
    /// Create a profiler with default configuration
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a profiler with custom configuration
    pub fn with_config(config: ProfilerConfig) -> Self {
        Self { config }
    }

    /// Get the configuration
    pub fn config(&self) -> &ProfilerConfig {
        &self.config
    }

    /// Build per-column profiles in first-seen key order
    pub fn column_profiles(&self, rows: &[Row]) -> Result<Vec<ColumnProfile>, ProfileError> {
        if rows.is_empty() {
            return Err(ProfileError::NoRows);
        }

        let sample = &rows[..self.config.sample_len(rows.len())];
        let mut profiles: Vec<ColumnProfile> = Vec::new();
        let mut index: HashMap<String, usize> = HashMap::new();

        for row in sample {
            for (key, value) in row {
                let slot = match index.get(key) {
                    Some(&slot) => slot,
                    None => {
                        index.insert(key.clone(), profiles.len());
                        profiles.push(ColumnProfile::new(key.clone()));
                        profiles.len() - 1
                    }
                };
                profiles[slot].observe(value);
            }
        }

        if self.config.missing_keys_nullable {
            for profile in &mut profiles {
                if profile.occurrences < sample.len() {
                    profile.nullable = true;
                }
            }
        }

        debug!(
            sampled = sample.len(),
            total = rows.len(),
            columns = profiles.len(),
            "Profiled rows"
        );

        Ok(profiles)
    }

    /// Profile rows and resolve each column to the dialect's native type
    pub fn profile(
        &self,
        rows: &[Row],
        dialect: &dyn Dialect,
    ) -> Result<Vec<InferredColumn>, ProfileError> {
        let columns = self
            .column_profiles(rows)?
            .into_iter()
            .map(|profile| {
                let portable_type = profile.resolve();
                InferredColumn {
                    sql_type: dialect.native_type(&portable_type),
                    name: profile.name,
                    portable_type,
                    nullable: profile.nullable,
                }
            })
            .collect();
        Ok(columns)
    }
}

/// Profile rows with the default configuration
pub fn profile_schema(
    rows: &[Row],
    dialect: &dyn Dialect,
) -> Result<Vec<InferredColumn>, ProfileError> {
    SchemaProfiler::new().profile(rows, dialect)
}
