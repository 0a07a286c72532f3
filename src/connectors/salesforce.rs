//! Salesforce: SOAP login, REST query

use std::time::Duration;

use async_trait::async_trait;
use quick_xml::Reader;
use quick_xml::escape::escape;
use quick_xml::events::Event;
use reqwest::Client;
use serde::Deserialize;
use serde_json::Value;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use super::error::{ConnectorError, ConnectorResult};
use super::settings::{SalesforceSettings, parse_settings};
use super::{
    CONNECT_TIMEOUT, ConnectionHandle, Connector, ConnectorKind, ExtractRequest, QueryResult,
    TestConnectionResult,
};
use crate::models::{ConnectionConfig, Row};

/// API version used for both SOAP and REST calls
pub const API_VERSION: &str = "59.0";

const REQUEST_TIMEOUT: Duration = Duration::from_secs(120);

/// Adapter for Salesforce orgs
#[derive(Debug, Clone)]
pub struct SalesforceConnector {
    client: Client,
}

impl SalesforceConnector {
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

impl Default for SalesforceConnector {
    fn default() -> Self {
        Self::new()
    }
}

/// An authenticated API session
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Session {
    pub session_id: String,
    /// SOAP endpoint returned by login; logout goes here
    pub server_url: String,
    /// `https://<instance>` prefix for REST calls
    pub instance_url: String,
}

impl Session {
    pub(crate) fn from_server_url(session_id: String, server_url: String) -> Self {
        let instance_url = match server_url.find("/services/") {
            Some(idx) => server_url[..idx].to_string(),
            None => server_url.trim_end_matches('/').to_string(),
        };
        Self {
            session_id,
            server_url,
            instance_url,
        }
    }
}

fn login_envelope(username: &str, password: &str) -> String {
    format!(
        r#"<?xml version="1.0" encoding="utf-8"?>
<env:Envelope xmlns:xsd="http://www.w3.org/2001/XMLSchema" xmlns:xsi="http://www.w3.org/2001/XMLSchema-instance" xmlns:env="http://schemas.xmlsoap.org/soap/envelope/">
  <env:Body>
    <n1:login xmlns:n1="urn:partner.soap.sforce.com">
      <n1:username>{}</n1:username>
      <n1:password>{}</n1:password>
    </n1:login>
  </env:Body>
</env:Envelope>"#,
        escape(username),
        escape(password)
    )
}

fn logout_envelope(session_id: &str) -> String {
    format!(
        r#"<?xml version="1.0" encoding="utf-8"?>
<env:Envelope xmlns:env="http://schemas.xmlsoap.org/soap/envelope/" xmlns:n1="urn:partner.soap.sforce.com">
  <env:Header>
    <n1:SessionHeader>
      <n1:sessionId>{}</n1:sessionId>
    </n1:SessionHeader>
  </env:Header>
  <env:Body>
    <n1:logout/>
  </env:Body>
</env:Envelope>"#,
        escape(session_id)
    )
}

/// Text of the first element with each wanted local name
pub(crate) fn soap_fields(xml: &str, wanted: &[&str]) -> ConnectorResult<Vec<Option<String>>> {
    let mut reader = Reader::from_str(xml);
    reader.config_mut().trim_text(true);

    let mut found: Vec<Option<String>> = vec![None; wanted.len()];
    let mut current: Option<usize> = None;

    loop {
        match reader.read_event() {
            Ok(Event::Start(ref e)) => {
                let local_name = String::from_utf8_lossy(e.local_name().as_ref()).to_string();
                current = wanted.iter().position(|w| *w == local_name);
            }
            Ok(Event::Text(ref e)) => {
                if let Some(idx) = current.filter(|&idx| found[idx].is_none()) {
                    let text = e
                        .unescape()
                        .map_err(|err| ConnectorError::Parse(err.to_string()))?;
                    found[idx] = Some(text.into_owned());
                }
            }
            Ok(Event::End(_)) => current = None,
            Ok(Event::Eof) => break,
            Err(e) => {
                return Err(ConnectorError::Parse(format!(
                    "SOAP response error at position {}: {}",
                    reader.error_position(),
                    e
                )));
            }
            _ => {}
        }
    }
    Ok(found)
}

/// Parse a login response into a session, surfacing SOAP faults
pub(crate) fn parse_login_response(xml: &str) -> ConnectorResult<Session> {
    let mut fields = soap_fields(xml, &["sessionId", "serverUrl", "faultstring"])?.into_iter();
    let session_id = fields.next().flatten();
    let server_url = fields.next().flatten();
    let fault = fields.next().flatten();

    if let Some(fault) = fault {
        return Err(ConnectorError::Connection(format!("Salesforce login failed: {fault}")));
    }
    match (session_id, server_url) {
        (Some(session_id), Some(server_url)) => {
            Ok(Session::from_server_url(session_id, server_url))
        }
        _ => Err(ConnectorError::Parse(
            "login response lacks sessionId or serverUrl".to_string(),
        )),
    }
}

async fn login(client: &Client, settings: &SalesforceSettings) -> ConnectorResult<Session> {
    let url = format!(
        "{}/services/Soap/u/{API_VERSION}",
        settings.login_url.trim_end_matches('/')
    );
    let response = client
        .post(&url)
        .header(reqwest::header::CONTENT_TYPE, "text/xml; charset=UTF-8")
        .header("SOAPAction", "login")
        .body(login_envelope(&settings.username, &settings.login_password()))
        .send()
        .await?;

    let status = response.status();
    let body = response.text().await?;
    // Faults come back as HTTP 500 with a SOAP body
    match parse_login_response(&body) {
        Ok(session) => {
            debug!(instance = %session.instance_url, "Salesforce login succeeded");
            Ok(session)
        }
        Err(_) if !status.is_success() => Err(ConnectorError::Http {
            status: status.as_u16(),
            body,
        }),
        Err(e) => Err(e),
    }
}

async fn logout(client: &Client, session: &Session) -> ConnectorResult<()> {
    let response = client
        .post(&session.server_url)
        .header(reqwest::header::CONTENT_TYPE, "text/xml; charset=UTF-8")
        .header("SOAPAction", "logout")
        .body(logout_envelope(&session.session_id))
        .send()
        .await?;
    let status = response.status();
    if !status.is_success() {
        return Err(ConnectorError::Http {
            status: status.as_u16(),
            body: response.text().await.unwrap_or_default(),
        });
    }
    Ok(())
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct QueryPage {
    #[serde(default)]
    records: Vec<Row>,
    #[serde(default)]
    next_records_url: Option<String>,
}

/// Drop the `attributes` metadata Salesforce attaches to every record
pub(crate) fn strip_attributes(mut record: Row) -> Row {
    record.remove("attributes");
    for value in record.values_mut() {
        if let Value::Object(nested) = value {
            nested.remove("attributes");
        }
    }
    record
}

async fn run_soql(client: &Client, session: &Session, soql: &str) -> ConnectorResult<Vec<Row>> {
    let mut url = format!("{}/services/data/v{API_VERSION}/query", session.instance_url);
    let mut params = vec![("q", soql.to_string())];
    let mut rows = Vec::new();

    loop {
        let response = client
            .get(&url)
            .bearer_auth(&session.session_id)
            .query(&params)
            .send()
            .await?;
        let status = response.status();
        if !status.is_success() {
            return Err(ConnectorError::Http {
                status: status.as_u16(),
                body: response.text().await.unwrap_or_default(),
            });
        }

        let page: QueryPage = response.json().await?;
        debug!(records = page.records.len(), "Fetched Salesforce page");
        rows.extend(page.records.into_iter().map(strip_attributes));

        match page.next_records_url {
            Some(next) => {
                url = format!("{}{}", session.instance_url, next);
                params.clear();
            }
            None => break,
        }
    }
    Ok(rows)
}

#[async_trait]
impl Connector for SalesforceConnector {
    fn kind(&self) -> ConnectorKind {
        ConnectorKind::Salesforce
    }

    async fn test_connection(&self, config: &ConnectionConfig) -> TestConnectionResult {
        let settings: SalesforceSettings = match parse_settings(config) {
            Ok(settings) => settings,
            Err(e) => return TestConnectionResult::failed("Invalid Salesforce settings", e),
        };
        let attempt = tokio::time::timeout(CONNECT_TIMEOUT, async {
            let session = login(&self.client, &settings).await?;
            if let Err(e) = logout(&self.client, &session).await {
                warn!(error = %e, "Salesforce logout failed");
            }
            Ok::<Session, ConnectorError>(session)
        })
        .await;

        match attempt {
            Ok(Ok(session)) => TestConnectionResult::ok("Logged in to Salesforce")
                .with_detail("instanceUrl", session.instance_url),
            Ok(Err(e)) => TestConnectionResult::failed("Salesforce login failed", e),
            Err(_) => {
                TestConnectionResult::timed_out().with_detail("loginUrl", settings.login_url.clone())
            }
        }
    }

    async fn extract_data(
        &self,
        config: &ConnectionConfig,
        request: &ExtractRequest,
    ) -> ConnectorResult<Vec<Row>> {
        let settings: SalesforceSettings = parse_settings(config)?;
        let soql = request.require_query()?;
        let session = login(&self.client, &settings).await?;

        let result = run_soql(&self.client, &session, soql).await;
        if let Err(e) = logout(&self.client, &session).await {
            warn!(error = %e, "Salesforce logout failed");
        }

        let rows = result?;
        info!(connector = "salesforce", rows = rows.len(), "Extracted records");
        Ok(rows)
    }

    async fn get_connection(
        &self,
        config: &ConnectionConfig,
    ) -> ConnectorResult<Box<dyn ConnectionHandle>> {
        let settings: SalesforceSettings = parse_settings(config)?;
        let session = login(&self.client, &settings).await?;
        Ok(Box::new(SalesforceHandle {
            client: self.client.clone(),
            session: Mutex::new(Some(session)),
        }))
    }
}

struct SalesforceHandle {
    client: Client,
    session: Mutex<Option<Session>>,
}

#[async_trait]
impl ConnectionHandle for SalesforceHandle {
    async fn query(&self, sql: &str, params: &[Value]) -> ConnectorResult<QueryResult> {
        if !params.is_empty() {
            return Err(ConnectorError::Unsupported(
                "SOQL queries do not take parameters".to_string(),
            ));
        }
        let guard = self.session.lock().await;
        let session = guard
            .as_ref()
            .ok_or_else(|| ConnectorError::Connection("session already closed".to_string()))?;
        let rows = run_soql(&self.client, session, sql).await?;
        Ok(QueryResult::with_rows(rows))
    }

    async fn close(&self) -> ConnectorResult<()> {
        if let Some(session) = self.session.lock().await.take() {
            logout(&self.client, &session).await?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    const LOGIN_OK: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<soapenv:Envelope xmlns:soapenv="http://schemas.xmlsoap.org/soap/envelope/" xmlns="urn:partner.soap.sforce.com">
  <soapenv:Body>
    <loginResponse>
      <result>
        <metadataServerUrl>https://acme.my.salesforce.com/services/Soap/m/59.0/00D</metadataServerUrl>
        <serverUrl>https://acme.my.salesforce.com/services/Soap/u/59.0/00D</serverUrl>
        <sessionId>00D!AQ&amp;token</sessionId>
      </result>
    </loginResponse>
  </soapenv:Body>
</soapenv:Envelope>"#;

    const LOGIN_FAULT: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<soapenv:Envelope xmlns:soapenv="http://schemas.xmlsoap.org/soap/envelope/">
  <soapenv:Body>
    <soapenv:Fault>
      <faultcode>INVALID_LOGIN</faultcode>
      <faultstring>INVALID_LOGIN: Invalid username, password, security token; or user locked out.</faultstring>
    </soapenv:Fault>
  </soapenv:Body>
</soapenv:Envelope>"#;

    #[test]
    fn test_parse_login_response() {
        let session = parse_login_response(LOGIN_OK).unwrap();
        assert_eq!(session.session_id, "00D!AQ&token");
        assert_eq!(session.instance_url, "https://acme.my.salesforce.com");
        assert!(session.server_url.ends_with("/services/Soap/u/59.0/00D"));
    }

    #[test]
    fn test_parse_login_fault() {
        let err = parse_login_response(LOGIN_FAULT).unwrap_err();
        assert!(matches!(err, ConnectorError::Connection(ref msg) if msg.contains("INVALID_LOGIN")));
    }

    #[test]
    fn test_login_envelope_escapes_credentials() {
        let envelope = login_envelope("a<b@x.com", "p&ss");
        assert!(envelope.contains("a&lt;b@x.com"));
        assert!(envelope.contains("p&amp;ss"));
    }

    #[test]
    fn test_strip_attributes() {
        let record = json!({
            "attributes": {"type": "Account"},
            "Name": "Acme",
            "Owner": {"attributes": {"type": "User"}, "Name": "Ann"}
        });
        let Value::Object(record) = record else { unreachable!() };
        let stripped = strip_attributes(record);
        assert!(!stripped.contains_key("attributes"));
        assert_eq!(stripped["Owner"], json!({"Name": "Ann"}));
    }

    #[tokio::test]
    async fn test_unresponsive_login_times_out() {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            let mut held = Vec::new();
            while let Ok((socket, _)) = listener.accept().await {
                held.push(socket);
            }
        });
        let config = ConnectionConfig::new()
            .with("loginUrl", format!("http://{addr}"))
            .with("username", "ann@acme.com")
            .with("password", "secret");

        let result = tokio::time::timeout(
            CONNECT_TIMEOUT + Duration::from_secs(5),
            SalesforceConnector::new().test_connection(&config),
        )
        .await
        .expect("connection test exceeded its bound");

        assert!(!result.success);
        assert_eq!(result.details["timeoutSeconds"], CONNECT_TIMEOUT.as_secs());
        assert_eq!(result.details["loginUrl"], format!("http://{addr}"));
    }
}
