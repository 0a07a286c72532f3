//! CLI command implementations

pub mod profile;
pub mod run;
pub mod test;

use crate::cli::error::CliError;
use crate::connectors::{Connector, ConnectorKind, ConnectorRegistry};
use std::sync::Arc;

/// Resolve a connector token against the built-in registry
pub(crate) fn resolve_connector(
    registry: &ConnectorRegistry,
    token: &str,
) -> Result<(ConnectorKind, Arc<dyn Connector>), CliError> {
    Ok(registry.resolve(token)?)
}
