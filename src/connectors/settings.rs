//! Typed views over [`ConnectionConfig`] for each connector family

use serde::Deserialize;
use serde::de::DeserializeOwned;

use super::error::ConnectorError;
use crate::models::ConnectionConfig;
use crate::models::connection::deserialize_port;

/// Parse `config` into a typed settings struct
pub(crate) fn parse_settings<T: DeserializeOwned>(
    config: &ConnectionConfig,
) -> Result<T, ConnectorError> {
    config
        .parse()
        .map_err(|e| ConnectorError::Config(e.to_string()))
}

/// Settings shared by the SQL engines
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SqlSettings {
    #[serde(default)]
    pub host: Option<String>,
    #[serde(default, deserialize_with = "deserialize_port")]
    pub port: Option<u16>,
    #[serde(default, alias = "dbname")]
    pub database: Option<String>,
    #[serde(default, alias = "user")]
    pub username: Option<String>,
    #[serde(default)]
    pub password: Option<String>,
    /// Oracle service name; falls back to `database`
    #[serde(default, alias = "service_name")]
    pub service_name: Option<String>,
    /// SQL Server: accept self-signed certificates
    #[serde(default, alias = "trust_server_certificate")]
    pub trust_server_certificate: bool,
}

impl SqlSettings {
    /// Host name, or an error when absent
    pub fn host(&self) -> Result<&str, ConnectorError> {
        self.host
            .as_deref()
            .filter(|h| !h.trim().is_empty())
            .ok_or_else(|| ConnectorError::Config("host is required".to_string()))
    }

    /// Configured port or the engine default
    pub fn port_or(&self, default: u16) -> u16 {
        self.port.unwrap_or(default)
    }

    /// Username, empty when absent
    pub fn username(&self) -> &str {
        self.username.as_deref().unwrap_or_default()
    }

    /// Password, empty when absent
    pub fn password(&self) -> &str {
        self.password.as_deref().unwrap_or_default()
    }
}

/// ServiceNow instance credentials
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServiceNowSettings {
    /// Instance name (`acme`) or full base URL
    pub instance: String,
    pub username: String,
    pub password: String,
}

impl ServiceNowSettings {
    /// Base URL of the instance, without a trailing slash
    pub fn base_url(&self) -> String {
        let instance = self.instance.trim().trim_end_matches('/');
        if instance.starts_with("http://") || instance.starts_with("https://") {
            instance.to_string()
        } else if instance.contains('.') {
            format!("https://{instance}")
        } else {
            format!("https://{instance}.service-now.com")
        }
    }
}

/// Salesforce SOAP login credentials
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SalesforceSettings {
    #[serde(default = "default_login_url", alias = "login_url")]
    pub login_url: String,
    pub username: String,
    pub password: String,
    #[serde(default, alias = "security_token")]
    pub security_token: Option<String>,
}

fn default_login_url() -> String {
    "https://login.salesforce.com".to_string()
}

impl SalesforceSettings {
    /// Password with the security token appended, as the SOAP login expects
    pub fn login_password(&self) -> String {
        format!(
            "{}{}",
            self.password,
            self.security_token.as_deref().unwrap_or_default()
        )
    }
}

/// Flat file location and parsing options
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FileSettings {
    #[serde(alias = "file_path", alias = "path")]
    pub file_path: String,
    /// CSV field delimiter, a single character
    #[serde(default)]
    pub delimiter: Option<String>,
    /// Parse numbers and booleans out of CSV cells
    #[serde(default, alias = "coerce_types")]
    pub coerce_types: bool,
}

impl FileSettings {
    /// Delimiter byte, defaulting to `,`
    pub fn delimiter_byte(&self) -> Result<u8, ConnectorError> {
        match self.delimiter.as_deref() {
            None | Some("") => Ok(b','),
            Some("\\t") | Some("tab") => Ok(b'\t'),
            Some(d) if d.len() == 1 => Ok(d.as_bytes()[0]),
            Some(d) => Err(ConnectorError::Config(format!(
                "delimiter must be a single character, got '{d}'"
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn config(value: serde_json::Value) -> ConnectionConfig {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn test_sql_settings_port_string() {
        let settings: SqlSettings = parse_settings(&config(json!({
            "host": "db", "port": "6543", "database": "app", "username": "svc"
        })))
        .unwrap();
        assert_eq!(settings.port_or(5432), 6543);
        assert_eq!(settings.host().unwrap(), "db");
        assert_eq!(settings.password(), "");
    }

    #[test]
    fn test_sql_settings_requires_host() {
        let settings: SqlSettings = parse_settings(&config(json!({"port": 5432}))).unwrap();
        assert!(matches!(settings.host(), Err(ConnectorError::Config(_))));
        assert_eq!(settings.port_or(1), 5432);
    }

    #[test]
    fn test_servicenow_base_url() {
        let mut settings = ServiceNowSettings {
            instance: "acme".to_string(),
            username: "u".to_string(),
            password: "p".to_string(),
        };
        assert_eq!(settings.base_url(), "https://acme.service-now.com");
        settings.instance = "https://acme.example.com/".to_string();
        assert_eq!(settings.base_url(), "https://acme.example.com");
    }

    #[test]
    fn test_salesforce_defaults() {
        let settings: SalesforceSettings = parse_settings(&config(json!({
            "username": "u", "password": "p", "securityToken": "T"
        })))
        .unwrap();
        assert_eq!(settings.login_url, "https://login.salesforce.com");
        assert_eq!(settings.login_password(), "pT");
    }

    #[test]
    fn test_file_delimiter() {
        let settings: FileSettings =
            parse_settings(&config(json!({"filePath": "a.csv", "delimiter": ";"}))).unwrap();
        assert_eq!(settings.delimiter_byte().unwrap(), b';');
        let bad: FileSettings =
            parse_settings(&config(json!({"filePath": "a.csv", "delimiter": "::"}))).unwrap();
        assert!(bad.delimiter_byte().is_err());
    }
}
