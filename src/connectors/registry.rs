//! Lookup of connector adapters by kind token

use std::collections::BTreeMap;
use std::sync::Arc;

use super::error::ConnectorError;
use super::{Connector, ConnectorKind};

/// Adapters available to a task runner, keyed by kind
#[derive(Clone, Default)]
pub struct ConnectorRegistry {
    connectors: BTreeMap<ConnectorKind, Arc<dyn Connector>>,
}

impl ConnectorRegistry {
    /// Empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry holding every adapter compiled into this build
    pub fn with_defaults() -> Self {
        #[allow(unused_mut)]
        let mut registry = Self::new().with(super::JsonConnector);

        #[cfg(feature = "postgres")]
        {
            registry = registry
                .with(super::PostgresConnector::new(ConnectorKind::Postgres))
                .with(super::PostgresConnector::new(ConnectorKind::CockroachDb))
                .with(super::PostgresConnector::new(ConnectorKind::Vertica));
        }
        #[cfg(feature = "mysql")]
        {
            registry = registry.with(super::MySqlConnector);
        }
        #[cfg(feature = "mssql")]
        {
            registry = registry.with(super::SqlServerConnector);
        }
        #[cfg(feature = "oracle")]
        {
            registry = registry.with(super::OracleConnector);
        }
        #[cfg(feature = "duckdb-backend")]
        {
            registry = registry.with(super::DuckDbConnector);
        }
        #[cfg(feature = "saas")]
        {
            registry = registry
                .with(super::ServiceNowConnector::new())
                .with(super::SalesforceConnector::new());
        }
        #[cfg(feature = "flat-files")]
        {
            registry = registry.with(super::CsvConnector);
        }

        registry
    }

    /// Register (or replace) the adapter for its kind
    pub fn register(&mut self, connector: Arc<dyn Connector>) {
        self.connectors.insert(connector.kind(), connector);
    }

    /// Builder-style [`ConnectorRegistry::register`]
    pub fn with(mut self, connector: impl Connector + 'static) -> Self {
        self.register(Arc::new(connector));
        self
    }

    /// Adapter for `kind`, if registered
    pub fn get(&self, kind: ConnectorKind) -> Option<Arc<dyn Connector>> {
        self.connectors.get(&kind).cloned()
    }

    /// Kinds with a registered adapter
    pub fn kinds(&self) -> Vec<ConnectorKind> {
        self.connectors.keys().copied().collect()
    }

    /// Adapter for `kind`, or an error naming the missing cargo feature
    pub fn require(&self, kind: ConnectorKind) -> Result<Arc<dyn Connector>, ConnectorError> {
        self.get(kind).ok_or_else(|| {
            ConnectorError::Unsupported(match kind.feature() {
                Some(feature) => format!(
                    "connector '{kind}' is not available in this build (enable the '{feature}' feature)"
                ),
                None => format!("connector '{kind}' is not registered"),
            })
        })
    }

    /// Parse a kind token and return its adapter
    pub fn resolve(
        &self,
        token: &str,
    ) -> Result<(ConnectorKind, Arc<dyn Connector>), ConnectorError> {
        let kind: ConnectorKind = token.parse().map_err(ConnectorError::Config)?;
        Ok((kind, self.require(kind)?))
    }
}

impl std::fmt::Debug for ConnectorRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConnectorRegistry")
            .field("kinds", &self.kinds())
            .finish()
    }
}
