//! Error types for connector operations

use thiserror::Error;

/// Errors raised by connector adapters and connection handles
#[derive(Error, Debug)]
pub enum ConnectorError {
    /// Connection settings are missing or malformed
    #[error("Invalid connection settings: {0}")]
    Config(String),

    /// Operation or connector kind not available
    #[error("Unsupported: {0}")]
    Unsupported(String),

    /// Could not reach or authenticate with the system
    #[error("Connection failed: {0}")]
    Connection(String),

    /// Query or statement rejected by the system
    #[error("Query failed: {0}")]
    Query(String),

    /// Non-success HTTP response from a SaaS API
    #[error("HTTP {status}: {body}")]
    Http { status: u16, body: String },

    /// Operation exceeded its time limit
    #[error("Timed out after {0} seconds")]
    Timeout(u64),

    /// Parameter count does not match the statement placeholders
    #[error("Statement references parameter ${0}, which was not supplied")]
    Bind(usize),

    /// Extraction request lacks a required field
    #[error("Missing {0}")]
    MissingParameter(&'static str),

    /// Response or file could not be parsed
    #[error("Parse error: {0}")]
    Parse(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON parsing error
    #[error("JSON parsing error: {0}")]
    Json(#[from] serde_json::Error),
}

impl ConnectorError {
    /// Get a user-friendly error message for CLI output
    pub fn user_message(&self) -> String {
        match self {
            ConnectorError::Config(msg) => format!(
                "Invalid connection settings: {msg}\n\nHint: Check host, port, database and credentials in the connection config."
            ),
            ConnectorError::Unsupported(msg) => format!(
                "{msg}\n\nHint: Rebuild with the connector's cargo feature enabled."
            ),
            ConnectorError::Connection(msg) => format!(
                "Connection failed: {msg}\n\nHint: Check network access and credentials."
            ),
            ConnectorError::Timeout(secs) => format!(
                "Timed out after {secs} seconds.\n\nHint: Check that the host is reachable from this worker."
            ),
            _ => self.to_string(),
        }
    }

    /// Whether the error means the system could not be reached
    pub fn is_connectivity(&self) -> bool {
        matches!(
            self,
            ConnectorError::Connection(_) | ConnectorError::Timeout(_) | ConnectorError::Http { .. }
        )
    }
}

/// Result type for connector operations
pub type ConnectorResult<T> = Result<T, ConnectorError>;

#[cfg(feature = "postgres")]
impl From<tokio_postgres::Error> for ConnectorError {
    fn from(err: tokio_postgres::Error) -> Self {
        match err.as_db_error() {
            Some(db) => ConnectorError::Query(format!("{} ({})", db.message(), db.code().code())),
            None if err.is_closed() => ConnectorError::Connection(err.to_string()),
            None => ConnectorError::Query(err.to_string()),
        }
    }
}

#[cfg(feature = "postgres")]
impl From<deadpool_postgres::PoolError> for ConnectorError {
    fn from(err: deadpool_postgres::PoolError) -> Self {
        ConnectorError::Connection(err.to_string())
    }
}

#[cfg(feature = "mysql")]
impl From<mysql_async::Error> for ConnectorError {
    fn from(err: mysql_async::Error) -> Self {
        match err {
            mysql_async::Error::Server(e) => ConnectorError::Query(e.to_string()),
            mysql_async::Error::Io(e) => ConnectorError::Connection(e.to_string()),
            mysql_async::Error::Url(e) => ConnectorError::Config(e.to_string()),
            other => ConnectorError::Query(other.to_string()),
        }
    }
}

#[cfg(feature = "mssql")]
impl From<tiberius::error::Error> for ConnectorError {
    fn from(err: tiberius::error::Error) -> Self {
        match err {
            tiberius::error::Error::Server(e) => ConnectorError::Query(e.to_string()),
            tiberius::error::Error::Io { message, .. } => ConnectorError::Connection(message),
            other => ConnectorError::Query(other.to_string()),
        }
    }
}

#[cfg(feature = "oracle")]
impl From<oracle::Error> for ConnectorError {
    fn from(err: oracle::Error) -> Self {
        ConnectorError::Query(err.to_string())
    }
}

#[cfg(feature = "duckdb-backend")]
impl From<duckdb::Error> for ConnectorError {
    fn from(err: duckdb::Error) -> Self {
        ConnectorError::Query(err.to_string())
    }
}

#[cfg(feature = "saas")]
impl From<reqwest::Error> for ConnectorError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            ConnectorError::Connection(format!("request timed out: {err}"))
        } else if err.is_connect() {
            ConnectorError::Connection(err.to_string())
        } else {
            ConnectorError::Query(err.to_string())
        }
    }
}

#[cfg(feature = "flat-files")]
impl From<csv::Error> for ConnectorError {
    fn from(err: csv::Error) -> Self {
        ConnectorError::Parse(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display() {
        let err = ConnectorError::Http {
            status: 401,
            body: "bad credentials".to_string(),
        };
        assert_eq!(err.to_string(), "HTTP 401: bad credentials");
        assert!(err.is_connectivity());
        assert_eq!(
            ConnectorError::Bind(3).to_string(),
            "Statement references parameter $3, which was not supplied"
        );
    }

    #[test]
    fn test_user_message_hint() {
        let err = ConnectorError::Config("missing host".to_string());
        assert!(err.user_message().contains("Hint:"));
        assert!(!ConnectorError::Query("x".to_string()).is_connectivity());
    }
}
