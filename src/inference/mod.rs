//! Schema profiling for extracted rows
//!
//! Infers a portable column-type model from a sample of rows so a target
//! table can be created before any data is loaded.
//!
//! ## Resolution order
//!
//! For each column the first matching rule wins:
//!
//! 1. objects or arrays: JSON
//! 2. ISO-8601 timestamp strings: timestamp
//! 3. calendar dates (`YYYY-MM-DD`): date
//! 4. numbers: decimal when any value has a fractional part, otherwise an
//!    integer sized by magnitude
//! 5. booleans
//! 6. anything else: string sized from the longest value
//!
//! ## Example
//!
//! ```rust
//! use data_transfer_sdk::dialect::DialectKind;
//! use data_transfer_sdk::inference::profile_schema;
//! use serde_json::json;
//!
//! let rows: Vec<_> = [json!({"id": 1, "name": "a"}), json!({"id": 2, "name": null})]
//!     .into_iter()
//!     .filter_map(|v| v.as_object().cloned())
//!     .collect();
//!
//! let schema = profile_schema(&rows, DialectKind::Postgres.dialect()).unwrap();
//! assert_eq!(schema[0].sql_type, "SMALLINT");
//! assert!(schema[1].nullable);
//! ```

mod config;
mod error;
mod formats;
mod profile;
mod profiler;
mod types;

pub use config::{ProfilerConfig, ProfilerConfigBuilder};
pub use error::ProfileError;
pub use formats::{is_date, is_timestamp};
pub use profile::ColumnProfile;
pub use profiler::{SchemaProfiler, profile_schema};
pub use types::{InferredColumn, IntegerWidth, PortableType, TypeTag};
