pub mod error;
pub mod models;
pub mod repo;

pub use error::VisibilityError;
pub use models::{BulkField, FieldCategory, FieldVisibility, VehicleRef};
pub use repo::{MemoryVisibilityRepo, VisibilityRepo};

use common::types::TypedValue;
use parking_lot::RwLock;
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use uuid::Uuid;

/// Per-vehicle, per-field control over what customers see.
///
/// Rows are created lazily when a field is first looked at, default hidden.
/// Persisted vehicles go through the repository; vehicles still being
/// drafted are tracked only in a session map and never hit storage.
pub struct VisibilityStore {
    repo: Arc<dyn VisibilityRepo>,
    primary_prefix: String,
    session: RwLock<HashMap<(Uuid, String), FieldVisibility>>,
}

impl VisibilityStore {
    pub fn new(repo: Arc<dyn VisibilityRepo>, primary_prefix: impl Into<String>) -> Self {
        Self {
            repo,
            primary_prefix: primary_prefix.into(),
            session: RwLock::new(HashMap::new()),
        }
    }

    fn category_for(&self, field_name: &str) -> FieldCategory {
        FieldCategory::from_field_key(field_name, &self.primary_prefix)
    }

    /// The stored row for `(vehicle, field)`, creating the hidden default
    /// if none exists yet.
    pub fn get_visibility(
        &self,
        vehicle: VehicleRef,
        field_name: &str,
    ) -> Result<FieldVisibility, VisibilityError> {
        match vehicle {
            VehicleRef::Persisted(id) => {
                if let Some(row) = self.repo.get(id, field_name) {
                    return Ok(row);
                }
                let row = FieldVisibility::hidden(vehicle, field_name, self.category_for(field_name));
                self.repo.upsert(row.clone())?;
                Ok(row)
            }
            VehicleRef::Draft(draft_id) => {
                let key = (draft_id, field_name.to_string());
                if let Some(row) = self.session.read().get(&key) {
                    return Ok(row.clone());
                }
                let row = FieldVisibility::hidden(vehicle, field_name, self.category_for(field_name));
                self.session.write().insert(key, row.clone());
                Ok(row)
            }
        }
    }

    /// Idempotent upsert keyed by `(vehicle, field)`: calling this twice
    /// with the same arguments leaves exactly one row, unchanged.
    pub fn set_visibility(
        &self,
        vehicle: VehicleRef,
        field_name: &str,
        is_visible: bool,
        display_name: Option<String>,
    ) -> Result<FieldVisibility, VisibilityError> {
        self.apply(
            vehicle,
            field_name,
            self.category_for(field_name),
            is_visible,
            display_name,
        )
    }

    fn apply(
        &self,
        vehicle: VehicleRef,
        field_name: &str,
        category: FieldCategory,
        is_visible: bool,
        display_name: Option<String>,
    ) -> Result<FieldVisibility, VisibilityError> {
        let row = FieldVisibility {
            vehicle,
            field_name: field_name.to_string(),
            category,
            is_visible,
            display_name: display_name
                .filter(|n| !n.trim().is_empty())
                .unwrap_or_else(|| common::types::humanize_field_name(field_name)),
        };
        match vehicle {
            VehicleRef::Persisted(_) => self.repo.upsert(row.clone())?,
            VehicleRef::Draft(draft_id) => {
                self.session
                    .write()
                    .insert((draft_id, field_name.to_string()), row.clone());
            }
        }
        Ok(row)
    }

    /// Bulk show/hide for one category. Entries whose `has_value` is false
    /// are skipped even when explicitly listed: visibility must never imply
    /// data that is not there. Returns how many rows were written.
    pub fn bulk_set_visibility(
        &self,
        vehicle: VehicleRef,
        category: FieldCategory,
        fields: &[BulkField],
        visible: bool,
    ) -> Result<usize, VisibilityError> {
        let mut applied = 0;
        for field in fields.iter().filter(|f| f.has_value) {
            self.apply(
                vehicle,
                &field.field_name,
                category,
                visible,
                field.display_name.clone(),
            )?;
            applied += 1;
        }
        Ok(applied)
    }

    /// Render-time filter: a field reaches the customer page only when it
    /// is flagged visible *and* the record still holds a non-empty value.
    pub fn visible_fields(
        &self,
        vehicle: VehicleRef,
        record: &BTreeMap<String, TypedValue>,
    ) -> Vec<(FieldVisibility, TypedValue)> {
        let rows = match vehicle {
            VehicleRef::Persisted(id) => self.repo.list_for_vehicle(id),
            VehicleRef::Draft(draft_id) => {
                let session = self.session.read();
                let mut rows: Vec<FieldVisibility> = session
                    .iter()
                    .filter(|((id, _), _)| *id == draft_id)
                    .map(|(_, row)| row.clone())
                    .collect();
                rows.sort_by(|a, b| a.field_name.cmp(&b.field_name));
                rows
            }
        };

        rows.into_iter()
            .filter(|row| row.is_visible)
            .filter_map(|row| {
                let value = record.get(&row.field_name)?;
                if value.is_empty() {
                    None
                } else {
                    Some((row, value.clone()))
                }
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store() -> (VisibilityStore, MemoryVisibilityRepo) {
        let repo = MemoryVisibilityRepo::new();
        let store = VisibilityStore::new(Arc::new(repo.clone()), "ccd");
        (store, repo)
    }

    #[test]
    fn lazy_default_is_hidden_with_a_humanized_name() {
        let (store, repo) = store();
        let row = store
            .get_visibility(VehicleRef::Persisted(7), "ccd_mot_mot_motStatus")
            .unwrap();
        assert!(!row.is_visible);
        assert_eq!(row.display_name, "Mot Status");
        assert_eq!(row.category, FieldCategory::PrimaryProvider);
        assert_eq!(repo.row_count(), 1);

        // a second read returns the same row without creating another
        store
            .get_visibility(VehicleRef::Persisted(7), "ccd_mot_mot_motStatus")
            .unwrap();
        assert_eq!(repo.row_count(), 1);
    }

    #[test]
    fn set_visibility_is_idempotent() {
        // Scenario D: toggling twice with identical arguments leaves one
        // unchanged row.
        let (store, repo) = store();
        let vehicle = VehicleRef::Persisted(7);

        let first = store
            .set_visibility(vehicle, "ccd_mot_mot_motStatus", true, Some("MOT Status".into()))
            .unwrap();
        let second = store
            .set_visibility(vehicle, "ccd_mot_mot_motStatus", true, Some("MOT Status".into()))
            .unwrap();

        assert_eq!(first, second);
        assert_eq!(repo.row_count(), 1);
        let stored = repo.get(7, "ccd_mot_mot_motStatus").unwrap();
        assert!(stored.is_visible);
        assert_eq!(stored.display_name, "MOT Status");
    }

    #[test]
    fn bulk_set_skips_fields_without_values() {
        let (store, repo) = store();
        let vehicle = VehicleRef::Persisted(3);
        let fields = vec![
            BulkField {
                field_name: "ccd_mot_mot_motStatus".into(),
                display_name: Some("MOT Status".into()),
                has_value: true,
            },
            BulkField {
                field_name: "ccd_mot_mot_motDueDate".into(),
                display_name: None,
                has_value: false,
            },
        ];

        let applied = store
            .bulk_set_visibility(vehicle, FieldCategory::PrimaryProvider, &fields, true)
            .unwrap();

        assert_eq!(applied, 1);
        assert_eq!(repo.row_count(), 1);
        assert!(repo.get(3, "ccd_mot_mot_motDueDate").is_none());
    }

    #[test]
    fn draft_vehicles_never_touch_the_repository() {
        let (store, repo) = store();
        let draft = VehicleRef::Draft(Uuid::new_v4());

        store
            .set_visibility(draft, "ccd_mot_mot_motStatus", true, None)
            .unwrap();
        let row = store.get_visibility(draft, "ccd_mot_mot_motStatus").unwrap();

        assert!(row.is_visible);
        assert_eq!(repo.row_count(), 0);
    }

    #[test]
    fn secondary_provider_fields_are_categorised_by_prefix() {
        let (store, _) = store();
        let row = store
            .get_visibility(VehicleRef::Persisted(1), "dvla_registration_taxStatus")
            .unwrap();
        assert_eq!(row.category, FieldCategory::SecondaryProvider);
    }

    #[test]
    fn visible_requires_both_flag_and_value() {
        let (store, _) = store();
        let vehicle = VehicleRef::Persisted(9);

        store
            .set_visibility(vehicle, "ccd_mot_mot_motStatus", true, None)
            .unwrap();
        store
            .set_visibility(vehicle, "ccd_mot_mot_advisories", true, None)
            .unwrap();
        store
            .set_visibility(vehicle, "ccd_mot_mot_expiry", false, None)
            .unwrap();

        let mut record = BTreeMap::new();
        record.insert(
            "ccd_mot_mot_motStatus".to_string(),
            TypedValue::Text("Valid".into()),
        );
        // flagged visible but the value has since gone empty
        record.insert(
            "ccd_mot_mot_advisories".to_string(),
            TypedValue::Text("".into()),
        );
        record.insert(
            "ccd_mot_mot_expiry".to_string(),
            TypedValue::Date("2025-03-01".into()),
        );

        let visible = store.visible_fields(vehicle, &record);
        assert_eq!(visible.len(), 1);
        assert_eq!(visible[0].0.field_name, "ccd_mot_mot_motStatus");
    }
}
