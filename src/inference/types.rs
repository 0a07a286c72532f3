//! Portable column types produced by the profiler

use serde::{Deserialize, Serialize};

/// Upper bound (inclusive) of the smallest integer width
pub const SMALL_INT_MAX: f64 = 32_767.0;
/// Upper bound (inclusive) of the medium integer width
pub const MEDIUM_INT_MAX: f64 = 2_147_483_647.0;
/// Largest scale kept for inferred decimals
pub const MAX_DECIMAL_SCALE: u32 = 4;

/// Coarse kind of an observed value
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TypeTag {
    String,
    Number,
    Boolean,
    Timestamp,
    Date,
    Object,
    Array,
}

/// Integer storage width chosen from the observed magnitude
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IntegerWidth {
    Small,
    Medium,
    Big,
}

impl IntegerWidth {
    /// Narrowest width holding every value up to `max_abs`
    pub fn for_magnitude(max_abs: f64) -> Self {
        if max_abs <= SMALL_INT_MAX {
            Self::Small
        } else if max_abs <= MEDIUM_INT_MAX {
            Self::Medium
        } else {
            Self::Big
        }
    }
}

/// Database-agnostic column type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum PortableType {
    Json,
    Timestamp,
    Date,
    Integer { width: IntegerWidth },
    Decimal { precision: u32, scale: u32 },
    Boolean,
    String { max_length: usize },
}

impl PortableType {
    /// Short token naming the type family
    pub fn token(&self) -> &'static str {
        match self {
            Self::Json => "json",
            Self::Timestamp => "timestamp",
            Self::Date => "date",
            Self::Integer { .. } => "integer",
            Self::Decimal { .. } => "decimal",
            Self::Boolean => "boolean",
            Self::String { .. } => "string",
        }
    }
}

impl std::fmt::Display for PortableType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Integer { width } => write!(f, "integer({width:?})"),
            Self::Decimal { precision, scale } => write!(f, "decimal({precision},{scale})"),
            Self::String { max_length } => write!(f, "string({max_length})"),
            other => write!(f, "{}", other.token()),
        }
    }
}

/// One profiled column: name, portable type, and the target's native type name
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InferredColumn {
    pub name: String,
    pub portable_type: PortableType,
    pub sql_type: String,
    pub nullable: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_integer_width_breakpoints() {
        assert_eq!(IntegerWidth::for_magnitude(0.0), IntegerWidth::Small);
        assert_eq!(IntegerWidth::for_magnitude(32_767.0), IntegerWidth::Small);
        assert_eq!(IntegerWidth::for_magnitude(32_768.0), IntegerWidth::Medium);
        assert_eq!(IntegerWidth::for_magnitude(40_000.0), IntegerWidth::Medium);
        assert_eq!(
            IntegerWidth::for_magnitude(2_147_483_647.0),
            IntegerWidth::Medium
        );
        assert_eq!(IntegerWidth::for_magnitude(2_147_483_648.0), IntegerWidth::Big);
    }

    #[test]
    fn test_portable_type_serialization() {
        let value = serde_json::to_value(PortableType::Decimal {
            precision: 18,
            scale: 2,
        })
        .unwrap();
        assert_eq!(value["type"], "decimal");
        assert_eq!(value["scale"], 2);
        assert_eq!(PortableType::Json.to_string(), "json");
    }
}
