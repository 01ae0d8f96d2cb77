use once_cell::sync::Lazy;
use regex::Regex;
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use serde::Serialize;
use serde_json::Value;
use std::fmt::{Display, Formatter};
use std::str::FromStr;

static ISO_DATE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^\d{4}-\d{2}-\d{2}").expect("iso date"));
static UK_DATE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^\d{2}/\d{2}/\d{4}").expect("uk date"));

/// A provider value after type inspection. Both the response mapper and the
/// schema inferencer classify through this one type so their notions of a
/// field's kind can never drift apart.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum TypedValue {
    Date(String),
    Integer(i64),
    Decimal(Decimal),
    Boolean(bool),
    Text(String),
    Json(Value),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ValueKind {
    Date,
    Integer,
    Decimal,
    Boolean,
    Text,
    Json,
}

impl Display for ValueKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            ValueKind::Date => "date",
            ValueKind::Integer => "integer",
            ValueKind::Decimal => "decimal",
            ValueKind::Boolean => "boolean",
            ValueKind::Text => "text",
            ValueKind::Json => "json",
        };
        write!(f, "{}", s)
    }
}

/// SQL column types emitted by schema inference.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum SqlType {
    #[serde(rename = "VARCHAR(255)")]
    Varchar,
    #[serde(rename = "TEXT")]
    Text,
    #[serde(rename = "INTEGER")]
    Integer,
    #[serde(rename = "DECIMAL(10,2)")]
    Decimal,
    #[serde(rename = "BOOLEAN")]
    Boolean,
    #[serde(rename = "DATE")]
    Date,
    #[serde(rename = "TIMESTAMP")]
    Timestamp,
    #[serde(rename = "JSONB")]
    Jsonb,
}

impl SqlType {
    pub fn as_sql(&self) -> &'static str {
        match self {
            SqlType::Varchar => "VARCHAR(255)",
            SqlType::Text => "TEXT",
            SqlType::Integer => "INTEGER",
            SqlType::Decimal => "DECIMAL(10,2)",
            SqlType::Boolean => "BOOLEAN",
            SqlType::Date => "DATE",
            SqlType::Timestamp => "TIMESTAMP",
            SqlType::Jsonb => "JSONB",
        }
    }
}

impl Display for SqlType {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_sql())
    }
}

impl TypedValue {
    pub fn kind(&self) -> ValueKind {
        match self {
            TypedValue::Date(_) => ValueKind::Date,
            TypedValue::Integer(_) => ValueKind::Integer,
            TypedValue::Decimal(_) => ValueKind::Decimal,
            TypedValue::Boolean(_) => ValueKind::Boolean,
            TypedValue::Text(_) => ValueKind::Text,
            TypedValue::Json(_) => ValueKind::Json,
        }
    }

    pub fn sql_type(&self) -> SqlType {
        match self.kind() {
            ValueKind::Date => SqlType::Date,
            ValueKind::Integer => SqlType::Integer,
            ValueKind::Decimal => SqlType::Decimal,
            ValueKind::Boolean => SqlType::Boolean,
            ValueKind::Text => SqlType::Varchar,
            ValueKind::Json => SqlType::Jsonb,
        }
    }

    /// Whether the value counts as "no data" for visibility purposes.
    pub fn is_empty(&self) -> bool {
        match self {
            TypedValue::Text(s) => s.trim().is_empty(),
            TypedValue::Json(Value::Null) => true,
            TypedValue::Json(Value::Array(items)) => items.is_empty(),
            _ => false,
        }
    }

    pub fn as_json(&self) -> Value {
        match self {
            TypedValue::Date(s) => Value::String(s.clone()),
            TypedValue::Integer(n) => Value::from(*n),
            TypedValue::Decimal(d) => d
                .to_f64()
                .and_then(serde_json::Number::from_f64)
                .map(Value::Number)
                .unwrap_or_else(|| Value::String(d.to_string())),
            TypedValue::Boolean(b) => Value::Bool(*b),
            TypedValue::Text(s) => Value::String(s.clone()),
            TypedValue::Json(v) => v.clone(),
        }
    }
}

/// Classify a raw JSON value by inspection.
///
/// Objects are not expanded here; callers recurse into them before
/// classifying the leaves. Arrays are deliberately kept opaque because their
/// lengths and shapes vary between vehicles.
pub fn classify(raw: &Value) -> TypedValue {
    match raw {
        Value::Null => TypedValue::Text(String::new()),
        Value::Bool(b) => TypedValue::Boolean(*b),
        Value::Number(n) => {
            if let Some(i) = n.as_i64() {
                TypedValue::Integer(i)
            } else {
                match Decimal::from_str(&n.to_string()) {
                    Ok(d) => TypedValue::Decimal(d),
                    Err(_) => TypedValue::Text(n.to_string()),
                }
            }
        }
        Value::String(s) => {
            if ISO_DATE.is_match(s) || UK_DATE.is_match(s) {
                TypedValue::Date(s.clone())
            } else {
                TypedValue::Text(s.clone())
            }
        }
        Value::Array(_) | Value::Object(_) => TypedValue::Json(raw.clone()),
    }
}

/// Default customer-facing label for an ingested field key.
///
/// Keys arrive namespaced `<provider>_<table>_<path>`; the first two
/// segments are routing, not meaning, so they are dropped before the rest is
/// split on underscores and camelCase boundaries and title-cased.
pub fn humanize_field_name(field_name: &str) -> String {
    let segments: Vec<&str> = field_name.split('_').collect();
    let meaningful: &[&str] = if segments.len() > 2 {
        &segments[2..]
    } else {
        &segments[..]
    };

    let mut words: Vec<String> = Vec::new();
    for segment in meaningful {
        for word in split_camel_case(segment) {
            let title = title_case(&word);
            // collapse stutter like "mot_motStatus" -> "Mot Status"
            if words.last().map(|w| w == &title) != Some(true) {
                words.push(title);
            }
        }
    }
    words.join(" ")
}

fn split_camel_case(s: &str) -> Vec<String> {
    let mut words = Vec::new();
    let mut current = String::new();
    for c in s.chars() {
        if c.is_uppercase() && !current.is_empty() {
            words.push(current.clone());
            current.clear();
        }
        current.push(c);
    }
    if !current.is_empty() {
        words.push(current);
    }
    words
}

fn title_case(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().collect::<String>() + &chars.as_str().to_lowercase(),
        None => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;
    use serde_json::json;

    #[test]
    fn classifies_dates_in_both_accepted_shapes() {
        assert_eq!(
            classify(&json!("2023-06-14")),
            TypedValue::Date("2023-06-14".into())
        );
        assert_eq!(
            classify(&json!("14/06/2023")),
            TypedValue::Date("14/06/2023".into())
        );
        // date-with-time still counts, matching is anchored at the start
        assert_eq!(
            classify(&json!("2023-06-14T10:30:00Z")).kind(),
            ValueKind::Date
        );
        assert_eq!(classify(&json!("14-06-2023")).kind(), ValueKind::Text);
    }

    #[test]
    fn classifies_numbers_by_fractional_part() {
        assert_eq!(classify(&json!(1450)), TypedValue::Integer(1450));
        assert_eq!(classify(&json!(-7)), TypedValue::Integer(-7));
        assert_eq!(classify(&json!(12.5)), TypedValue::Decimal(dec!(12.5)));
    }

    #[test]
    fn null_and_booleans() {
        assert_eq!(classify(&json!(null)), TypedValue::Text(String::new()));
        assert!(classify(&json!(null)).is_empty());
        assert_eq!(classify(&json!(true)), TypedValue::Boolean(true));
    }

    #[test]
    fn arrays_stay_opaque() {
        let v = classify(&json!([{"date": "2020-01-01"}, {"date": "2021-01-01"}]));
        assert_eq!(v.kind(), ValueKind::Json);
        assert_eq!(v.sql_type(), SqlType::Jsonb);
    }

    #[test]
    fn sql_types_line_up_with_kinds() {
        assert_eq!(classify(&json!("hello")).sql_type(), SqlType::Varchar);
        assert_eq!(classify(&json!(3)).sql_type(), SqlType::Integer);
        assert_eq!(classify(&json!(3.5)).sql_type(), SqlType::Decimal);
        assert_eq!(classify(&json!("2020-02-02")).sql_type(), SqlType::Date);
        assert_eq!(classify(&json!(false)).sql_type(), SqlType::Boolean);
    }

    #[test]
    fn humanizes_namespaced_keys() {
        assert_eq!(humanize_field_name("ccd_mot_motStatus"), "Mot Status");
        assert_eq!(humanize_field_name("ccd_mot_mot_motStatus"), "Mot Status");
        assert_eq!(
            humanize_field_name("ccd_vehicleregistration_year_of_manufacture"),
            "Year Of Manufacture"
        );
        assert_eq!(humanize_field_name("make"), "Make");
    }
}
