//! Per-deployment connector enablement

use std::collections::BTreeSet;

use async_trait::async_trait;

use crate::connectors::ConnectorKind;

/// Decides whether a connector kind may be used
#[async_trait]
pub trait ConnectorGate: Send + Sync {
    async fn is_enabled(&self, kind: ConnectorKind) -> bool;
}

/// Fixed allow-list; `None` allows every kind
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StaticConnectorGate {
    allowed: Option<BTreeSet<ConnectorKind>>,
}

impl StaticConnectorGate {
    /// Allow every connector kind
    pub fn allow_all() -> Self {
        Self { allowed: None }
    }

    /// Allow only the listed kinds
    pub fn only(kinds: impl IntoIterator<Item = ConnectorKind>) -> Self {
        Self {
            allowed: Some(kinds.into_iter().collect()),
        }
    }
}

#[async_trait]
impl ConnectorGate for StaticConnectorGate {
    async fn is_enabled(&self, kind: ConnectorKind) -> bool {
        self.allowed
            .as_ref()
            .is_none_or(|allowed| allowed.contains(&kind))
    }
}
