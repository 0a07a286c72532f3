//! Parameterized SQL statements

use serde::Serialize;
use serde_json::Value;

/// SQL text with positional values.
///
/// Placeholders are always written in the canonical `$1, $2, ...` style;
/// connection handles rewrite them into the target driver's native syntax.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SqlStatement {
    pub sql: String,
    pub values: Vec<Value>,
}

impl SqlStatement {
    /// Statement with bound values
    pub fn new(sql: impl Into<String>, values: Vec<Value>) -> Self {
        Self {
            sql: sql.into(),
            values,
        }
    }

    /// Statement without parameters
    pub fn raw(sql: impl Into<String>) -> Self {
        Self::new(sql, Vec::new())
    }
}
