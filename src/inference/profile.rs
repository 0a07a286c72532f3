//! Per-column statistics gathered while sampling

use std::collections::BTreeSet;

use serde::Serialize;
use serde_json::{Number, Value};

use super::formats::{is_date, is_timestamp};
use super::types::{IntegerWidth, MAX_DECIMAL_SCALE, PortableType, TypeTag};

const DEFAULT_DECIMAL_PRECISION: u32 = 18;
const MAX_DECIMAL_PRECISION: u32 = 38;

/// Observations for one column across the sampled rows
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ColumnProfile {
    pub name: String,
    pub tags: BTreeSet<TypeTag>,
    pub nullable: bool,
    pub max_length: usize,
    pub min: Option<f64>,
    pub max: Option<f64>,
    pub decimal_places: u32,
    /// Rows in which the key was present (null included)
    pub occurrences: usize,
}

impl ColumnProfile {
    /// Empty profile for a column
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    /// Record one value
    pub fn observe(&mut self, value: &Value) {
        self.occurrences += 1;
        match value {
            // Nulls contribute no type evidence.
            Value::Null => self.nullable = true,
            Value::Bool(_) => {
                self.tags.insert(TypeTag::Boolean);
            }
            Value::Number(n) => self.observe_number(n),
            Value::String(s) => {
                self.tags.insert(TypeTag::String);
                self.max_length = self.max_length.max(s.chars().count());
                if is_timestamp(s) {
                    self.tags.insert(TypeTag::Timestamp);
                } else if is_date(s) {
                    self.tags.insert(TypeTag::Date);
                }
            }
            Value::Array(_) => {
                self.tags.insert(TypeTag::Array);
            }
            Value::Object(_) => {
                self.tags.insert(TypeTag::Object);
            }
        }
    }

    fn observe_number(&mut self, n: &Number) {
        self.tags.insert(TypeTag::Number);
        if let Some(v) = n.as_f64() {
            self.min = Some(self.min.map_or(v, |m| m.min(v)));
            self.max = Some(self.max.map_or(v, |m| m.max(v)));
        }
        self.decimal_places = self.decimal_places.max(decimal_places(n));
    }

    /// Largest absolute numeric value seen
    pub fn max_abs(&self) -> f64 {
        let lo = self.min.map_or(0.0, f64::abs);
        let hi = self.max.map_or(0.0, f64::abs);
        lo.max(hi)
    }

    /// Resolve the portable type; first matching rule wins
    pub fn resolve(&self) -> PortableType {
        let has = |tag| self.tags.contains(&tag);

        if has(TypeTag::Object) || has(TypeTag::Array) {
            PortableType::Json
        } else if has(TypeTag::Timestamp) {
            PortableType::Timestamp
        } else if has(TypeTag::Date) {
            PortableType::Date
        } else if has(TypeTag::Number) {
            if self.decimal_places > 0 {
                let scale = self.decimal_places.min(MAX_DECIMAL_SCALE);
                let integer_digits = integer_digits(self.max_abs());
                let precision = (integer_digits + scale)
                    .max(DEFAULT_DECIMAL_PRECISION)
                    .min(MAX_DECIMAL_PRECISION);
                PortableType::Decimal { precision, scale }
            } else {
                PortableType::Integer {
                    width: IntegerWidth::for_magnitude(self.max_abs()),
                }
            }
        } else if has(TypeTag::Boolean) {
            PortableType::Boolean
        } else {
            PortableType::String {
                max_length: self.max_length,
            }
        }
    }
}

/// Digits after the decimal point, ignoring trailing zeros
fn decimal_places(n: &Number) -> u32 {
    if !n.is_f64() {
        return 0;
    }
    match n.as_f64() {
        Some(v) if v.fract() != 0.0 => {}
        _ => return 0,
    }

    let text = n.to_string().to_ascii_lowercase();
    let (mantissa, exponent) = match text.split_once('e') {
        Some((m, e)) => (m, e.parse::<i64>().unwrap_or(0)),
        None => (text.as_str(), 0),
    };
    let fraction = mantissa
        .split_once('.')
        .map_or(0, |(_, f)| f.trim_end_matches('0').len() as i64);

    u32::try_from((fraction - exponent).max(0)).unwrap_or(u32::MAX)
}

fn integer_digits(max_abs: f64) -> u32 {
    if max_abs < 1.0 {
        1
    } else {
        max_abs.log10().floor() as u32 + 1
    }
}
