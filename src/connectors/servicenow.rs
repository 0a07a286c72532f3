//! ServiceNow Table API

use std::time::Duration;

use async_trait::async_trait;
use once_cell::sync::Lazy;
use regex::Regex;
use reqwest::Client;
use serde::Deserialize;
use serde_json::Value;
use tracing::{debug, info};

use super::error::{ConnectorError, ConnectorResult};
use super::settings::{ServiceNowSettings, parse_settings};
use super::{
    CONNECT_TIMEOUT, ConnectionHandle, Connector, ConnectorKind, ExtractRequest, QueryResult,
    TestConnectionResult,
};
use crate::models::{ConnectionConfig, Row};

/// Records requested per page
const PAGE_SIZE: usize = 1000;

/// Upper bound on a single API request
const REQUEST_TIMEOUT: Duration = Duration::from_secs(60);

static TABLE_NAME: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Za-z0-9_]+$").expect("Invalid regex"));

/// Adapter for ServiceNow instances
#[derive(Debug, Clone)]
pub struct ServiceNowConnector {
    client: Client,
}

impl ServiceNowConnector {
    /// Create a connector with its own HTTP client
    pub fn new() -> Self {
        let client = Client::builder()
            .connect_timeout(CONNECT_TIMEOUT)
            .timeout(REQUEST_TIMEOUT)
            .build()
            .unwrap_or_default();
        Self { client }
    }
}

impl Default for ServiceNowConnector {
    fn default() -> Self {
        Self::new()
    }
}

/// `table` or `table?encoded_query`
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct TableQuery {
    pub table: String,
    pub query: Option<String>,
}

impl TableQuery {
    pub(crate) fn parse(spec: &str) -> ConnectorResult<Self> {
        let spec = spec.trim();
        let (table, query) = match spec.split_once('?') {
            Some((table, query)) => (table.trim(), Some(query.trim())),
            None => (spec, None),
        };
        if !TABLE_NAME.is_match(table) {
            return Err(ConnectorError::Config(format!(
                "'{table}' is not a valid ServiceNow table name"
            )));
        }
        let query = query
            .map(|q| q.strip_prefix("sysparm_query=").unwrap_or(q))
            .filter(|q| !q.is_empty())
            .map(str::to_string);
        Ok(Self {
            table: table.to_string(),
            query,
        })
    }
}

#[derive(Debug, Deserialize)]
struct TablePage {
    #[serde(default)]
    result: Vec<Row>,
}

/// Fetch every record a table query selects, one page at a time
async fn fetch_table(
    client: &Client,
    settings: &ServiceNowSettings,
    spec: &TableQuery,
    limit: Option<usize>,
) -> ConnectorResult<Vec<Row>> {
    let url = format!("{}/api/now/table/{}", settings.base_url(), spec.table);
    let page_size = limit.unwrap_or(PAGE_SIZE).min(PAGE_SIZE);
    let mut rows = Vec::new();
    let mut offset = 0usize;

    loop {
        let mut params = vec![
            ("sysparm_limit", page_size.to_string()),
            ("sysparm_offset", offset.to_string()),
        ];
        if let Some(query) = &spec.query {
            params.push(("sysparm_query", query.clone()));
        }

        let response = client
            .get(&url)
            .basic_auth(&settings.username, Some(&settings.password))
            .header(reqwest::header::ACCEPT, "application/json")
            .query(&params)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ConnectorError::Http {
                status: status.as_u16(),
                body,
            });
        }

        let page: TablePage = response.json().await?;
        let fetched = page.result.len();
        debug!(table = %spec.table, offset, fetched, "Fetched ServiceNow page");
        rows.extend(page.result);
        offset += fetched;

        let limit_reached = limit.is_some_and(|l| rows.len() >= l);
        if fetched < page_size || limit_reached {
            break;
        }
    }

    Ok(rows)
}

#[async_trait]
impl Connector for ServiceNowConnector {
    fn kind(&self) -> ConnectorKind {
        ConnectorKind::ServiceNow
    }

    async fn test_connection(&self, config: &ConnectionConfig) -> TestConnectionResult {
        let settings: ServiceNowSettings = match parse_settings(config) {
            Ok(settings) => settings,
            Err(e) => return TestConnectionResult::failed("Invalid ServiceNow settings", e),
        };
        let first_row = TableQuery {
            table: "sys_user".to_string(),
            query: None,
        };
        let attempt = tokio::time::timeout(
            CONNECT_TIMEOUT,
            fetch_table(&self.client, &settings, &first_row, Some(1)),
        )
        .await;

        match attempt {
            Ok(Ok(_)) => TestConnectionResult::ok("Connected to ServiceNow")
                .with_detail("instance", settings.base_url()),
            Ok(Err(ConnectorError::Http { status, body })) => TestConnectionResult::failed(
                "ServiceNow rejected the request",
                format!("HTTP {status}"),
            )
            .with_detail("status", status)
            .with_detail("body", body),
            Ok(Err(e)) => TestConnectionResult::failed("Could not reach ServiceNow", e),
            Err(_) => TestConnectionResult::timed_out().with_detail("instance", settings.base_url()),
        }
    }

    async fn extract_data(
        &self,
        config: &ConnectionConfig,
        request: &ExtractRequest,
    ) -> ConnectorResult<Vec<Row>> {
        let settings: ServiceNowSettings = parse_settings(config)?;
        let spec = TableQuery::parse(request.require_query()?)?;
        let rows = fetch_table(&self.client, &settings, &spec, None).await?;
        info!(connector = "servicenow", table = %spec.table, rows = rows.len(), "Extracted records");
        Ok(rows)
    }

    async fn get_connection(
        &self,
        config: &ConnectionConfig,
    ) -> ConnectorResult<Box<dyn ConnectionHandle>> {
        let settings: ServiceNowSettings = parse_settings(config)?;
        Ok(Box::new(ServiceNowHandle {
            client: self.client.clone(),
            settings,
        }))
    }
}

/// Stateless handle; each query is an authenticated table read
struct ServiceNowHandle {
    client: Client,
    settings: ServiceNowSettings,
}

#[async_trait]
impl ConnectionHandle for ServiceNowHandle {
    async fn query(&self, sql: &str, params: &[Value]) -> ConnectorResult<QueryResult> {
        if !params.is_empty() {
            return Err(ConnectorError::Unsupported(
                "ServiceNow table queries do not take parameters".to_string(),
            ));
        }
        let spec = TableQuery::parse(sql)?;
        let rows = fetch_table(&self.client, &self.settings, &spec, None).await?;
        Ok(QueryResult::with_rows(rows))
    }

    async fn close(&self) -> ConnectorResult<()> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_table_query() {
        let spec = TableQuery::parse("incident?active=true^priority=1").unwrap();
        assert_eq!(spec.table, "incident");
        assert_eq!(spec.query.as_deref(), Some("active=true^priority=1"));

        let bare = TableQuery::parse(" sys_user ").unwrap();
        assert_eq!(bare.table, "sys_user");
        assert!(bare.query.is_none());

        let prefixed = TableQuery::parse("incident?sysparm_query=active=true").unwrap();
        assert_eq!(prefixed.query.as_deref(), Some("active=true"));
    }

    #[test]
    fn test_rejects_path_like_tables() {
        assert!(TableQuery::parse("../admin").is_err());
        assert!(TableQuery::parse("").is_err());
        assert!(TableQuery::parse("incident; drop").is_err());
    }

    /// Address that accepts connections and never answers
    async fn silent_server() -> std::net::SocketAddr {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            let mut held = Vec::new();
            while let Ok((socket, _)) = listener.accept().await {
                held.push(socket);
            }
        });
        addr
    }

    #[tokio::test]
    async fn test_unresponsive_instance_times_out() {
        let addr = silent_server().await;
        let config = ConnectionConfig::new()
            .with("instance", format!("http://{addr}"))
            .with("username", "admin")
            .with("password", "secret");

        let result = tokio::time::timeout(
            CONNECT_TIMEOUT + Duration::from_secs(5),
            ServiceNowConnector::new().test_connection(&config),
        )
        .await
        .expect("connection test exceeded its bound");

        assert!(!result.success);
        assert_eq!(result.details["timeoutSeconds"], CONNECT_TIMEOUT.as_secs());
    }

    #[tokio::test]
    async fn test_invalid_settings_fail_the_test() {
        let connector = ServiceNowConnector::new();
        let result = connector
            .test_connection(&ConnectionConfig::default())
            .await;
        assert!(!result.success);
    }
}
