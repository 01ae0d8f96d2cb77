use common::types::{classify, TypedValue, ValueKind};
use fetcher::FetchResult;
use serde::Serialize;
use serde_json::Value;
use std::collections::BTreeMap;

/// When the same bare field name comes back from more than one table (the
/// provider repeats `make`, `model` and friends), the earliest table listed
/// here wins the bare name. Everything keeps its namespaced key regardless.
const TABLE_PRECEDENCE: [&str; 3] = ["vehicleregistration", "vehiclespecs", "valuation"];

/// One scalar or opaque blob lifted out of a nested provider response, under
/// its storage key `<provider>_<table>_<path>`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FlattenedField {
    pub key: String,
    pub value: TypedValue,
}

impl FlattenedField {
    pub fn kind(&self) -> ValueKind {
        self.value.kind()
    }
}

/// Flattens provider JSON into namespaced fields and merges multi-table
/// results into one wide record.
#[derive(Debug, Clone)]
pub struct ResponseMapper {
    prefix: String,
}

impl ResponseMapper {
    pub fn new(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
        }
    }

    /// Walk one table's response. Objects extend the key path, arrays stay
    /// opaque (their shapes vary between vehicles), scalars are classified
    /// by inspection.
    pub fn flatten(&self, table: &str, raw: &Value) -> Vec<FlattenedField> {
        let mut fields = Vec::new();
        let root = format!("{}_{}", self.prefix, table);
        walk(&mut fields, &root, raw);
        fields
    }

    /// Merge every fetched table into one record. All namespaced keys are
    /// always present; bare leaf names are additionally resolved with the
    /// fixed table precedence, so `make` means "make according to the most
    /// authoritative table that returned one".
    pub fn map_to_record(&self, result: &FetchResult) -> BTreeMap<String, TypedValue> {
        let mut record = BTreeMap::new();

        for table in ordered_tables(&result.tables_fetched) {
            let Some(raw) = result.data.get(&table) else {
                continue;
            };
            let namespaced_root = format!("{}_{}", self.prefix, table);
            for field in self.flatten(&table, raw) {
                if let Some(leaf) = bare_leaf(&field.key, &namespaced_root) {
                    record.entry(leaf).or_insert_with(|| field.value.clone());
                }
                record.insert(field.key, field.value);
            }
        }
        record
    }
}

fn walk(out: &mut Vec<FlattenedField>, prefix: &str, value: &Value) {
    match value {
        Value::Object(map) => {
            for (key, child) in map {
                walk(out, &format!("{}_{}", prefix, key), child);
            }
        }
        other => out.push(FlattenedField {
            key: prefix.to_string(),
            value: classify(other),
        }),
    }
}

/// Precedence tables first, then the rest in fetched order.
fn ordered_tables(fetched: &[String]) -> Vec<String> {
    let mut ordered: Vec<String> = TABLE_PRECEDENCE
        .iter()
        .filter(|t| fetched.iter().any(|f| f == *t))
        .map(|t| t.to_string())
        .collect();
    for table in fetched {
        if !ordered.contains(table) {
            ordered.push(table.clone());
        }
    }
    ordered
}

/// Final path segment of a namespaced key, or `None` for a bare root value.
fn bare_leaf(key: &str, namespaced_root: &str) -> Option<String> {
    let path = key.strip_prefix(namespaced_root)?.strip_prefix('_')?;
    path.rsplit('_').next().map(|s| s.to_string())
}
