use crate::{PricingResponse, VehicleDataApi};
use catalog::{PricingSnapshot, TableCatalog};
use parking_lot::RwLock;
use rust_decimal::Decimal;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::warn;

/// Keeps a best-effort cache of live per-table pricing and answers "what
/// would this table cost right now".
///
/// Refresh failures are absorbed: callers always get a price, falling back
/// to the catalog default when no live snapshot covers a table.
pub struct PricingSync {
    client: Option<Arc<dyn VehicleDataApi>>,
    catalog: TableCatalog,
    minor_units_per_major: Decimal,
    snapshot: RwLock<Option<PricingSnapshot>>,
}

impl PricingSync {
    pub fn new(
        client: Option<Arc<dyn VehicleDataApi>>,
        catalog: TableCatalog,
        minor_units_per_major: u32,
    ) -> Self {
        Self {
            client,
            catalog,
            minor_units_per_major: Decimal::from(minor_units_per_major.max(1)),
            snapshot: RwLock::new(None),
        }
    }

    /// Pull current pricing from the provider and cache it. Returns `None`
    /// on any transport or parse failure; the caller keeps working off
    /// catalog defaults.
    pub async fn refresh(&self) -> Option<PricingSnapshot> {
        let client = self.client.as_ref()?;
        match client.fetch_pricing().await {
            Ok(body) => {
                let snapshot = PricingSnapshot::new(self.normalise(body));
                *self.snapshot.write() = Some(snapshot.clone());
                Some(snapshot)
            }
            Err(err) => {
                warn!("pricing refresh failed, keeping catalog defaults: {}", err);
                None
            }
        }
    }

    /// Minor units (pence) to major units (pounds).
    fn normalise(&self, body: PricingResponse) -> HashMap<String, Decimal> {
        body.tables
            .into_iter()
            .map(|(table, amount)| (table, amount / self.minor_units_per_major))
            .collect()
    }

    pub fn current_snapshot(&self) -> Option<PricingSnapshot> {
        self.snapshot.read().clone()
    }

    /// Live cost when the snapshot covers the table, catalog default
    /// otherwise.
    pub fn table_cost_now(&self, name: &str) -> Decimal {
        if let Some(snapshot) = self.snapshot.read().as_ref() {
            if let Some(cost) = snapshot.table_costs.get(name) {
                return *cost;
            }
        }
        self.catalog.default_cost(name)
    }

    pub fn catalog(&self) -> &TableCatalog {
        &self.catalog
    }
}
