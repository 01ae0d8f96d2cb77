use common::types::humanize_field_name;
use serde::Serialize;
use uuid::Uuid;

/// A vehicle as the visibility store sees it: either saved with a real id,
/// or still being drafted. Draft visibility lives only in the current
/// session and is never persisted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum VehicleRef {
    Persisted(i64),
    Draft(Uuid),
}

impl VehicleRef {
    pub fn is_persisted(&self) -> bool {
        matches!(self, VehicleRef::Persisted(_))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum FieldCategory {
    PrimaryProvider,
    SecondaryProvider,
}

impl FieldCategory {
    /// Field keys are namespaced by provider, so the category falls out of
    /// the key prefix without touching storage.
    pub fn from_field_key(field_name: &str, primary_prefix: &str) -> Self {
        if field_name.starts_with(&format!("{}_", primary_prefix)) {
            FieldCategory::PrimaryProvider
        } else {
            FieldCategory::SecondaryProvider
        }
    }
}

/// Staff-controlled visibility of one ingested field on one vehicle.
/// Unique per `(vehicle, field_name)`; hidden by default.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FieldVisibility {
    pub vehicle: VehicleRef,
    pub field_name: String,
    pub category: FieldCategory,
    pub is_visible: bool,
    pub display_name: String,
}

impl FieldVisibility {
    /// The lazily-created default: invisible, with a humanized display name.
    pub fn hidden(vehicle: VehicleRef, field_name: &str, category: FieldCategory) -> Self {
        Self {
            vehicle,
            field_name: field_name.to_string(),
            category,
            is_visible: false,
            display_name: humanize_field_name(field_name),
        }
    }
}

/// One entry in a bulk show/hide request. `has_value` is the caller's
/// statement of whether the vehicle currently holds data for the field;
/// entries without a value are skipped even when explicitly listed.
#[derive(Debug, Clone)]
pub struct BulkField {
    pub field_name: String,
    pub display_name: Option<String>,
    pub has_value: bool,
}
