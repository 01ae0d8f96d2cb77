use crate::error::VisibilityError;
use crate::models::FieldVisibility;
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::Arc;

/// Storage seam for visibility rows. The `(vehicle_id, field_name)`
/// uniqueness contract is enforced here, in one place, rather than relied
/// upon through whatever backs the store.
pub trait VisibilityRepo: Send + Sync {
    fn get(&self, vehicle_id: i64, field_name: &str) -> Option<FieldVisibility>;
    fn upsert(&self, row: FieldVisibility) -> Result<(), VisibilityError>;
    fn list_for_vehicle(&self, vehicle_id: i64) -> Vec<FieldVisibility>;
}

/// In-memory repository. The relational datastore is an external
/// collaborator; a SQL-backed implementation plugs in behind the same trait.
#[derive(Clone, Default)]
pub struct MemoryVisibilityRepo {
    inner: Arc<RwLock<HashMap<(i64, String), FieldVisibility>>>,
}

impl MemoryVisibilityRepo {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn row_count(&self) -> usize {
        self.inner.read().len()
    }
}

impl VisibilityRepo for MemoryVisibilityRepo {
    fn get(&self, vehicle_id: i64, field_name: &str) -> Option<FieldVisibility> {
        self.inner
            .read()
            .get(&(vehicle_id, field_name.to_string()))
            .cloned()
    }

    fn upsert(&self, row: FieldVisibility) -> Result<(), VisibilityError> {
        let crate::models::VehicleRef::Persisted(vehicle_id) = row.vehicle else {
            return Err(VisibilityError::storage(
                "refusing to persist visibility for a draft vehicle",
            ));
        };
        self.inner
            .write()
            .insert((vehicle_id, row.field_name.clone()), row);
        Ok(())
    }

    fn list_for_vehicle(&self, vehicle_id: i64) -> Vec<FieldVisibility> {
        let mut rows: Vec<FieldVisibility> = self
            .inner
            .read()
            .iter()
            .filter(|((id, _), _)| *id == vehicle_id)
            .map(|(_, row)| row.clone())
            .collect();
        rows.sort_by(|a, b| a.field_name.cmp(&b.field_name));
        rows
    }
}
