use common::types::{classify, SqlType};
use serde::Serialize;
use serde_json::Value;
use std::collections::BTreeMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ColumnSpec {
    #[serde(rename = "type")]
    pub sql_type: SqlType,
    pub required: bool,
}

/// A derived, regenerable column mapping for one provider table. Not
/// authoritative; rerun inference against a fresh sample at any time.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct InferredTableSchema {
    pub table_name: String,
    pub description: String,
    pub fields: BTreeMap<String, ColumnSpec>,
}

fn optional(sql_type: SqlType) -> ColumnSpec {
    ColumnSpec {
        sql_type,
        required: false,
    }
}

fn required(sql_type: SqlType) -> ColumnSpec {
    ColumnSpec {
        sql_type,
        required: true,
    }
}

/// Fields every `checkcar_*` table carries whatever the provider returns.
fn baseline_fields() -> BTreeMap<String, ColumnSpec> {
    let mut fields = BTreeMap::new();
    fields.insert("registration_number".into(), required(SqlType::Varchar));
    fields.insert("make".into(), optional(SqlType::Varchar));
    fields.insert("model".into(), optional(SqlType::Varchar));
    fields.insert("colour".into(), optional(SqlType::Varchar));
    fields.insert("fuel_type".into(), optional(SqlType::Varchar));
    fields.insert("year_of_manufacture".into(), optional(SqlType::Integer));
    fields.insert("engine_capacity".into(), optional(SqlType::Integer));
    fields.insert("co2_emissions".into(), optional(SqlType::Integer));
    fields.insert("created_at".into(), required(SqlType::Timestamp));
    fields.insert("updated_at".into(), required(SqlType::Timestamp));
    fields
}

/// Hand-maintained commonly-known fields per table, used when the provider
/// cannot be sampled. Degraded accuracy, never failure.
fn known_table_fields(table: &str) -> Vec<(&'static str, SqlType)> {
    match table {
        "vehicleregistration" => vec![
            ("date_of_first_registration", SqlType::Date),
            ("keeper_changes", SqlType::Integer),
            ("vin_last_five", SqlType::Varchar),
            ("tax_status", SqlType::Varchar),
            ("tax_due_date", SqlType::Date),
        ],
        "vehiclespecs" => vec![
            ("body_style", SqlType::Varchar),
            ("transmission", SqlType::Varchar),
            ("number_of_doors", SqlType::Integer),
            ("number_of_seats", SqlType::Integer),
            ("power_bhp", SqlType::Integer),
            ("top_speed_mph", SqlType::Integer),
            ("kerb_weight_kg", SqlType::Integer),
        ],
        "mot" => vec![
            ("mot_status", SqlType::Varchar),
            ("mot_due_date", SqlType::Date),
            ("latest_test_result", SqlType::Varchar),
            ("latest_test_date", SqlType::Date),
            ("test_history", SqlType::Jsonb),
            ("advisory_notes", SqlType::Text),
        ],
        "mileage" => vec![
            ("current_mileage", SqlType::Integer),
            ("average_annual_mileage", SqlType::Integer),
            ("mileage_anomaly", SqlType::Boolean),
            ("mileage_history", SqlType::Jsonb),
        ],
        "valuation" => vec![
            ("trade_value", SqlType::Decimal),
            ("retail_value", SqlType::Decimal),
            ("private_value", SqlType::Decimal),
            ("part_exchange_value", SqlType::Decimal),
            ("valuation_date", SqlType::Date),
        ],
        "vehicleimages" => vec![
            ("image_count", SqlType::Integer),
            ("image_urls", SqlType::Jsonb),
        ],
        "fueleconomy" => vec![
            ("urban_mpg", SqlType::Decimal),
            ("extra_urban_mpg", SqlType::Decimal),
            ("combined_mpg", SqlType::Decimal),
        ],
        "batterydata" => vec![
            ("battery_capacity_kwh", SqlType::Decimal),
            ("range_miles", SqlType::Integer),
            ("charge_time_hours", SqlType::Decimal),
        ],
        _ => vec![],
    }
}

/// Derive a column mapping for one table.
///
/// With a sample, the response is walked with the same recursion the
/// response mapper uses (one shared classifier) and leaf kinds become SQL
/// types. Without one, the known-field fallback applies. Either way a
/// `registration_number` column is guaranteed, since the table's supporting
/// index depends on it.
pub fn infer_schema(
    table: &str,
    description: &str,
    sample: Option<&Value>,
) -> InferredTableSchema {
    let mut fields = match sample {
        Some(raw) => {
            let mut fields = BTreeMap::new();
            walk(&mut fields, "", raw);
            fields.insert("created_at".into(), required(SqlType::Timestamp));
            fields.insert("updated_at".into(), required(SqlType::Timestamp));
            fields
        }
        None => {
            let mut fields = baseline_fields();
            for (name, sql_type) in known_table_fields(table) {
                fields.insert(name.to_string(), optional(sql_type));
            }
            fields
        }
    };

    fields
        .entry("registration_number".into())
        .or_insert_with(|| required(SqlType::Varchar));

    InferredTableSchema {
        table_name: table.to_string(),
        description: description.to_string(),
        fields,
    }
}

fn walk(out: &mut BTreeMap<String, ColumnSpec>, prefix: &str, value: &Value) {
    match value {
        Value::Object(map) => {
            for (key, child) in map {
                let name = if prefix.is_empty() {
                    key.clone()
                } else {
                    format!("{}_{}", prefix, key)
                };
                walk(out, &name, child);
            }
        }
        other => {
            let name = column_name(prefix);
            // a bare scalar at the root has no usable column name
            if !name.is_empty() {
                out.insert(name, optional(classify(other).sql_type()));
            }
        }
    }
}

/// camelCase paths become snake_case column names; anything that is not
/// alphanumeric collapses to an underscore.
pub fn column_name(path: &str) -> String {
    let mut out = String::with_capacity(path.len() + 4);
    let mut prev_lower = false;
    for c in path.chars() {
        if c.is_alphanumeric() {
            if c.is_uppercase() {
                if prev_lower {
                    out.push('_');
                }
                out.extend(c.to_lowercase());
                prev_lower = false;
            } else {
                out.push(c);
                prev_lower = c.is_lowercase() || c.is_numeric();
            }
        } else if !out.ends_with('_') {
            out.push('_');
            prev_lower = false;
        }
    }
    out.trim_matches('_').to_string()
}
