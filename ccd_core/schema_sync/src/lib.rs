pub mod ddl;
pub mod infer;

pub use ddl::to_ddl;
pub use infer::{infer_schema, ColumnSpec, InferredTableSchema};

use catalog::TableCatalog;
use provider_client::VehicleDataApi;
use serde::Serialize;
use std::sync::Arc;
use tracing::{info, warn};

/// Outcome of one schema synchronisation run. `errors` collects recoverable
/// per-step failures; `success` only goes false when nothing could be
/// attempted at all.
#[derive(Debug, Clone, Serialize)]
pub struct SchemaUpdateResult {
    pub success: bool,
    pub updates: Vec<String>,
    pub errors: Vec<String>,
}

/// Keeps the persistence schema aligned with whatever the provider actually
/// returns, by sampling each catalog table with a test registration and
/// falling back to the hand-maintained field sets when sampling fails.
pub struct SchemaSync {
    client: Option<Arc<dyn VehicleDataApi>>,
    catalog: TableCatalog,
    test_vrm: String,
}

impl SchemaSync {
    pub fn new(
        client: Option<Arc<dyn VehicleDataApi>>,
        catalog: TableCatalog,
        test_vrm: impl Into<String>,
    ) -> Self {
        Self {
            client,
            catalog,
            test_vrm: test_vrm.into(),
        }
    }

    /// Sample every catalog table and infer its schema. Per-table sampling
    /// failures degrade to the fallback schema for that table; they never
    /// abort the run.
    pub async fn collect_schemas(
        &self,
    ) -> Result<(Vec<InferredTableSchema>, Vec<String>, Vec<String>), SchemaUpdateResult> {
        let Some(client) = &self.client else {
            return Err(SchemaUpdateResult {
                success: false,
                updates: Vec::new(),
                errors: vec![
                    "provider credentials missing; schema sync aborted before sampling".into(),
                ],
            });
        };

        let mut schemas = Vec::new();
        let mut updates = Vec::new();
        let mut errors = Vec::new();

        for table in self.catalog.list() {
            match client.fetch_table(table.name, &self.test_vrm).await {
                Ok(sample) => {
                    let schema = infer_schema(table.name, table.description, Some(&sample));
                    updates.push(format!(
                        "inferred '{}' from a live sample ({} columns)",
                        table.name,
                        schema.fields.len()
                    ));
                    schemas.push(schema);
                }
                Err(err) => {
                    warn!("sampling '{}' failed: {}", table.name, err);
                    errors.push(format!("sampling '{}' failed: {}", table.name, err));
                    let schema = infer_schema(table.name, table.description, None);
                    updates.push(format!(
                        "used fallback fields for '{}' ({} columns)",
                        table.name,
                        schema.fields.len()
                    ));
                    schemas.push(schema);
                }
            }
        }

        Ok((schemas, updates, errors))
    }

    pub async fn sync_schema(&self) -> SchemaUpdateResult {
        let (schemas, mut updates, errors) = match self.collect_schemas().await {
            Ok(collected) => collected,
            Err(aborted) => return aborted,
        };

        let ddl = to_ddl(&schemas);
        updates.push(format!(
            "generated DDL for {} tables ({} bytes)",
            schemas.len(),
            ddl.len()
        ));
        info!(
            "schema sync completed: {} updates, {} errors",
            updates.len(),
            errors.len()
        );

        SchemaUpdateResult {
            success: true,
            updates,
            errors,
        }
    }

    /// The DDL for the current provider shape, for operators to review and
    /// apply out of band.
    pub async fn generate_ddl(&self) -> Result<String, SchemaUpdateResult> {
        let (schemas, _, _) = self.collect_schemas().await?;
        Ok(to_ddl(&schemas))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use common::config::ProviderConfig;
    use provider_client::VehicleDataClient;
    use serde_json::json;
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn sync_for(server: &MockServer) -> SchemaSync {
        let cfg = ProviderConfig {
            base_url: server.uri(),
            api_key: Some("test-key".into()),
            field_prefix: "ccd".into(),
            minor_units_per_major: 100,
            request_timeout_secs: 5,
            test_vrm: "AB12CDE".into(),
        };
        let client: Arc<dyn VehicleDataApi> =
            Arc::new(VehicleDataClient::from_config(&cfg).unwrap());
        SchemaSync::new(Some(client), TableCatalog::new(), "AB12CDE")
    }

    #[tokio::test]
    async fn missing_credentials_abort_immediately() {
        let sync = SchemaSync::new(None, TableCatalog::new(), "AB12CDE");
        let result = sync.sync_schema().await;
        assert!(!result.success);
        assert!(result.updates.is_empty());
        assert_eq!(result.errors.len(), 1);
    }

    #[tokio::test]
    async fn sampling_failures_degrade_per_table() {
        let server = MockServer::start().await;
        // only mot answers; every other table 500s
        Mock::given(method("GET"))
            .and(path("/vehicledata/mot"))
            .and(query_param("vrm", "AB12CDE"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(json!({"motStatus": "Valid"})),
            )
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;

        let sync = sync_for(&server);
        let result = sync.sync_schema().await;

        let table_count = TableCatalog::new().list().len();
        assert!(result.success);
        // one update per table plus the DDL summary
        assert_eq!(result.updates.len(), table_count + 1);
        assert_eq!(result.errors.len(), table_count - 1);
        assert!(result
            .updates
            .iter()
            .any(|u| u.contains("inferred 'mot' from a live sample")));
        assert!(result
            .updates
            .iter()
            .any(|u| u.contains("used fallback fields for 'mileage'")));
    }

    #[tokio::test]
    async fn ddl_generation_survives_a_dead_provider() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(503))
            .mount(&server)
            .await;

        let sync = sync_for(&server);
        let ddl = sync.generate_ddl().await.expect("ddl");
        assert!(ddl.contains("checkcar_vehicleregistration"));
        assert!(ddl.contains("checkcar_mileage"));
        assert!(ddl.contains("current_mileage INTEGER,"));
    }
}
