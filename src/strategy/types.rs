//! Strategy names and per-strategy result metrics

use serde::{Serialize, Serializer};

use super::error::StrategyError;

/// Row errors kept per row strategy
pub const MAX_ROW_ERRORS: usize = 10;

/// One named step of the loading pipeline
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Strategy {
    CheckExists,
    CreateTable,
    DropTable,
    TruncateTable,
    AlterAddColumns,
    AppendData,
    UpsertData,
}

impl Strategy {
    /// All strategies
    pub fn all() -> Vec<Self> {
        vec![
            Self::CheckExists,
            Self::CreateTable,
            Self::DropTable,
            Self::TruncateTable,
            Self::AlterAddColumns,
            Self::AppendData,
            Self::UpsertData,
        ]
    }

    /// Get strategy name
    pub fn name(&self) -> &'static str {
        match self {
            Self::CheckExists => "check_exists",
            Self::CreateTable => "create_table",
            Self::DropTable => "drop_table",
            Self::TruncateTable => "truncate_table",
            Self::AlterAddColumns => "alter_add_columns",
            Self::AppendData => "append_data",
            Self::UpsertData => "upsert_data",
        }
    }

    /// Whether the strategy writes source rows and reports a [`RowSummary`]
    pub fn is_row_strategy(&self) -> bool {
        matches!(self, Self::AppendData | Self::UpsertData)
    }
}

impl std::fmt::Display for Strategy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

impl std::str::FromStr for Strategy {
    type Err = StrategyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::all()
            .into_iter()
            .find(|strategy| strategy.name() == s.trim())
            .ok_or_else(|| StrategyError::UnknownStrategy(s.to_string()))
    }
}

impl Serialize for Strategy {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.name())
    }
}

/// Counts for a row-by-row write
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RowSummary {
    pub succeeded: u64,
    pub failed: u64,
    pub total: u64,
    /// First [`MAX_ROW_ERRORS`] failure messages, as `Row <n>: <error>`
    pub errors: Vec<String>,
}

impl RowSummary {
    /// Empty summary expecting `total` rows
    pub fn new(total: usize) -> Self {
        Self {
            total: total as u64,
            ..Self::default()
        }
    }

    pub fn record_success(&mut self) {
        self.succeeded += 1;
    }

    /// Count a failure for the zero-based row `index`
    pub fn record_failure(&mut self, index: usize, error: impl std::fmt::Display) {
        self.failed += 1;
        if self.errors.len() < MAX_ROW_ERRORS {
            self.errors.push(format!("Row {}: {}", index + 1, error));
        }
    }
}

/// Strategy-specific result fields
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum StrategyMetrics {
    Exists {
        exists: bool,
        cached: bool,
    },
    Created {
        created: bool,
        #[serde(skip_serializing_if = "Option::is_none")]
        reason: Option<String>,
        columns: usize,
    },
    Dropped {
        dropped: bool,
    },
    Truncated {
        truncated: bool,
    },
    ColumnsAdded {
        added: Vec<String>,
        #[serde(skip_serializing_if = "Option::is_none")]
        reason: Option<String>,
    },
    Rows(RowSummary),
}

/// Result of one completed strategy
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StrategyOutcome {
    pub strategy: Strategy,
    pub success: bool,
    #[serde(flatten)]
    pub metrics: StrategyMetrics,
}

impl StrategyOutcome {
    pub fn new(strategy: Strategy, metrics: StrategyMetrics) -> Self {
        Self {
            strategy,
            success: true,
            metrics,
        }
    }

    /// Row counts, for row strategies
    pub fn rows(&self) -> Option<&RowSummary> {
        match &self.metrics {
            StrategyMetrics::Rows(summary) => Some(summary),
            _ => None,
        }
    }
}
