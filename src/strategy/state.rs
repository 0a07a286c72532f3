//! Per-run executor state

use crate::inference::InferredColumn;

/// What the executor currently believes about the target table
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum TableExistence {
    #[default]
    Unknown,
    Exists,
    Missing,
}

impl TableExistence {
    pub fn is_known(&self) -> bool {
        !matches!(self, Self::Unknown)
    }
}

/// Cached facts shared by the strategies of one run
#[derive(Debug, Clone, Default)]
pub struct RunState {
    pub table_exists: TableExistence,
    /// Profiled once, on first use
    pub source_schema: Option<Vec<InferredColumn>>,
}

impl RunState {
    /// Record the answer of an existence query
    pub fn observe_existence(&mut self, exists: bool) {
        self.table_exists = if exists {
            TableExistence::Exists
        } else {
            TableExistence::Missing
        };
    }

    /// Cached existence, if checked
    pub fn cached_existence(&self) -> Option<bool> {
        match self.table_exists {
            TableExistence::Unknown => None,
            TableExistence::Exists => Some(true),
            TableExistence::Missing => Some(false),
        }
    }

    /// The table was created by this run
    pub fn table_created(&mut self) {
        self.table_exists = TableExistence::Exists;
    }

    /// The table was dropped by this run
    pub fn table_dropped(&mut self) {
        self.table_exists = TableExistence::Missing;
    }
}
