use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Serialize;
use std::collections::HashMap;

/// One billable category of provider data. Immutable catalog entry; `cost`
/// is the authoritative default when live pricing is unavailable.
#[derive(Debug, Clone, Serialize)]
pub struct DataTableDescriptor {
    pub name: &'static str,
    pub label: &'static str,
    pub description: &'static str,
    pub cost: Decimal,
}

/// Live per-table pricing pulled from the provider, already normalised to
/// major currency units. Overrides [`DataTableDescriptor::cost`] for any
/// table it holds.
#[derive(Debug, Clone, Serialize)]
pub struct PricingSnapshot {
    pub table_costs: HashMap<String, Decimal>,
    pub fetched_at: DateTime<Utc>,
}

impl PricingSnapshot {
    pub fn new(table_costs: HashMap<String, Decimal>) -> Self {
        Self {
            table_costs,
            fetched_at: Utc::now(),
        }
    }
}
