pub mod error;
pub mod models;

pub use error::CatalogError;
pub use models::*;

use rust_decimal::Decimal;
use rust_decimal_macros::dec;

/// Static registry of the data tables the provider offers. Read-only; the
/// fallback cost source whenever live pricing cannot be fetched.
#[derive(Debug, Clone)]
pub struct TableCatalog {
    tables: Vec<DataTableDescriptor>,
}

impl Default for TableCatalog {
    fn default() -> Self {
        Self::new()
    }
}

impl TableCatalog {
    pub fn new() -> Self {
        let tables = vec![
            DataTableDescriptor {
                name: "vehicleregistration",
                label: "Vehicle Registration",
                description: "DVLA registration details: make, model, colour, fuel, keeper dates",
                cost: dec!(0.15),
            },
            DataTableDescriptor {
                name: "vehiclespecs",
                label: "Vehicle Specifications",
                description: "Factory specification: dimensions, transmission, performance",
                cost: dec!(0.30),
            },
            DataTableDescriptor {
                name: "mot",
                label: "MOT History",
                description: "MOT test results, advisories and expiry dates",
                cost: dec!(0.20),
            },
            DataTableDescriptor {
                name: "mileage",
                label: "Mileage History",
                description: "Recorded odometer readings and anomaly flags",
                cost: dec!(0.10),
            },
            DataTableDescriptor {
                name: "valuation",
                label: "Valuation",
                description: "Trade, retail and private sale valuations",
                cost: dec!(0.45),
            },
            DataTableDescriptor {
                name: "vehicleimages",
                label: "Stock Images",
                description: "Manufacturer stock imagery for the derivative",
                cost: dec!(0.25),
            },
            DataTableDescriptor {
                name: "fueleconomy",
                label: "Fuel Economy",
                description: "Urban, extra-urban and combined consumption figures",
                cost: dec!(0.05),
            },
            DataTableDescriptor {
                name: "batterydata",
                label: "Battery Data",
                description: "EV battery capacity, range and charge times",
                cost: dec!(0.10),
            },
        ];
        Self { tables }
    }

    pub fn list(&self) -> &[DataTableDescriptor] {
        &self.tables
    }

    pub fn find(&self, name: &str) -> Option<&DataTableDescriptor> {
        self.tables.iter().find(|t| t.name == name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.find(name).is_some()
    }

    pub fn resolve(&self, name: &str) -> Result<&DataTableDescriptor, CatalogError> {
        self.find(name)
            .ok_or_else(|| CatalogError::not_found(format!("table '{}' not in catalog", name)))
    }

    /// Default cost for a table, zero for unknown names. Billing paths
    /// validate table names against the catalog first, so zero is only
    /// reachable from display code.
    pub fn default_cost(&self, name: &str) -> Decimal {
        self.find(name).map(|t| t.cost).unwrap_or(Decimal::ZERO)
    }
}
