//! Connection settings as stored alongside a task

use serde::de::{self, DeserializeOwned, Deserializer};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Keys whose values never appear in debug output or logs.
const SECRET_KEYS: &[&str] = &["password", "securityToken", "security_token", "token", "apiKey"];

/// Raw, connector-specific connection settings.
///
/// Stores keep these as a JSON object (or a JSON-encoded string of one). Each
/// connector parses the fields it needs with [`ConnectionConfig::parse`].
///
/// # Example
///
/// ```rust
/// use data_transfer_sdk::models::ConnectionConfig;
///
/// let config = ConnectionConfig::new()
///     .with("host", "db.internal")
///     .with("port", 5432)
///     .with("password", "hunter2");
///
/// assert_eq!(config.get_str("host"), Some("db.internal"));
/// assert!(!format!("{config:?}").contains("hunter2"));
/// ```
#[derive(Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct ConnectionConfig(Map<String, Value>);

impl ConnectionConfig {
    /// Create an empty configuration
    pub fn new() -> Self {
        Self::default()
    }

    /// Set a field, returning the updated configuration
    pub fn with(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.0.insert(key.into(), value.into());
        self
    }

    /// Get a raw field value
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    /// Get a string field
    pub fn get_str(&self, key: &str) -> Option<&str> {
        self.0.get(key).and_then(Value::as_str)
    }

    /// Borrow the underlying map
    pub fn as_map(&self) -> &Map<String, Value> {
        &self.0
    }

    /// Deserialize the settings into a connector-specific type
    pub fn parse<T: DeserializeOwned>(&self) -> Result<T, serde_json::Error> {
        serde_json::from_value(Value::Object(self.0.clone()))
    }

    /// Copy of the settings with secrets masked, safe to log
    pub fn redacted(&self) -> Map<String, Value> {
        self.0
            .iter()
            .map(|(key, value)| {
                let masked = if SECRET_KEYS.iter().any(|s| s.eq_ignore_ascii_case(key)) {
                    Value::String("***".to_string())
                } else {
                    value.clone()
                };
                (key.clone(), masked)
            })
            .collect()
    }
}

impl std::fmt::Debug for ConnectionConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("ConnectionConfig")
            .field(&self.redacted())
            .finish()
    }
}

impl From<Map<String, Value>> for ConnectionConfig {
    fn from(map: Map<String, Value>) -> Self {
        Self(map)
    }
}

impl<'de> Deserialize<'de> for ConnectionConfig {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        match Value::deserialize(deserializer)? {
            Value::Object(map) => Ok(Self(map)),
            Value::Null => Ok(Self::default()),
            Value::String(text) if text.trim().is_empty() => Ok(Self::default()),
            Value::String(text) => serde_json::from_str::<Map<String, Value>>(&text)
                .map(Self)
                .map_err(de::Error::custom),
            other => Err(de::Error::custom(format!(
                "expected connection settings object, found {other}"
            ))),
        }
    }
}

/// Deserialize a port given either as a number or a numeric string
pub(crate) fn deserialize_port<'de, D>(deserializer: D) -> Result<Option<u16>, D::Error>
where
    D: Deserializer<'de>,
{
    match Option::<Value>::deserialize(deserializer)? {
        None | Some(Value::Null) => Ok(None),
        Some(Value::Number(n)) => n
            .as_u64()
            .and_then(|p| u16::try_from(p).ok())
            .map(Some)
            .ok_or_else(|| de::Error::custom(format!("invalid port: {n}"))),
        Some(Value::String(s)) if s.trim().is_empty() => Ok(None),
        Some(Value::String(s)) => s
            .trim()
            .parse::<u16>()
            .map(Some)
            .map_err(|_| de::Error::custom(format!("invalid port: {s}"))),
        Some(other) => Err(de::Error::custom(format!("invalid port: {other}"))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[derive(Debug, Deserialize)]
    struct PortOnly {
        #[serde(default, deserialize_with = "deserialize_port")]
        port: Option<u16>,
    }

    #[test]
    fn test_config_from_json_string() {
        let config: ConnectionConfig =
            serde_json::from_value(json!("{\"host\":\"localhost\",\"port\":5432}")).unwrap();
        assert_eq!(config.get_str("host"), Some("localhost"));
        assert_eq!(config.get("port"), Some(&json!(5432)));
    }

    #[test]
    fn test_config_null_is_empty() {
        let config: ConnectionConfig = serde_json::from_value(Value::Null).unwrap();
        assert!(config.as_map().is_empty());
    }

    #[test]
    fn test_config_rejects_scalars() {
        let result: Result<ConnectionConfig, _> = serde_json::from_value(json!(42));
        assert!(result.is_err());
    }

    #[test]
    fn test_redacted_masks_secrets() {
        let config = ConnectionConfig::new()
            .with("username", "svc")
            .with("password", "secret")
            .with("securityToken", "tok");
        let redacted = config.redacted();
        assert_eq!(redacted["username"], json!("svc"));
        assert_eq!(redacted["password"], json!("***"));
        assert_eq!(redacted["securityToken"], json!("***"));
    }

    #[test]
    fn test_port_accepts_number_and_string() {
        let numeric: PortOnly = serde_json::from_value(json!({"port": 1521})).unwrap();
        let text: PortOnly = serde_json::from_value(json!({"port": "1433"})).unwrap();
        let missing: PortOnly = serde_json::from_value(json!({})).unwrap();
        assert_eq!(numeric.port, Some(1521));
        assert_eq!(text.port, Some(1433));
        assert_eq!(missing.port, None);
    }

    #[test]
    fn test_port_rejects_garbage() {
        let result: Result<PortOnly, _> = serde_json::from_value(json!({"port": "abc"}));
        assert!(result.is_err());
        let result: Result<PortOnly, _> = serde_json::from_value(json!({"port": 70000}));
        assert!(result.is_err());
    }
}
