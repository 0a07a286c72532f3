//! Loading strategies
//!
//! A task names an ordered list of strategies (`check_exists`,
//! `create_table`, `append_data`, ...). [`StrategyExecutor`] runs them
//! against one target table, failing fast on the first error. Row
//! strategies never fail on individual rows; they count failures in a
//! [`RowSummary`].

mod error;
mod executor;
mod state;
mod types;

pub use error::{PipelineHalted, StrategyError, StrategyResult};
pub use executor::StrategyExecutor;
pub use state::{RunState, TableExistence};
pub use types::{MAX_ROW_ERRORS, RowSummary, Strategy, StrategyMetrics, StrategyOutcome};
