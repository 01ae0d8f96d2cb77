pub mod error;

pub use error::FetchError;

use parking_lot::Mutex;
use provider_client::{PricingSync, ProviderClientError, VehicleDataApi};
use rust_decimal::Decimal;
use serde::Serialize;
use serde_json::Value;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tracing::{info, warn};

/// Outcome of one multi-table lookup.
///
/// `cost` is the cost of the *requested* tables, computed before any call is
/// made: the provider bills per table call regardless of what comes back, so
/// the charge is fixed by the request, not the outcome. `tables_fetched` and
/// `data` say what was actually usable.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FetchResult {
    pub success: bool,
    pub data: HashMap<String, Value>,
    pub cost: Decimal,
    pub tables_fetched: Vec<String>,
    pub error: Option<String>,
}

/// The single choke point for billable provider calls.
pub struct FetchOrchestrator {
    client: Arc<dyn VehicleDataApi>,
    pricing: Arc<PricingSync>,
    in_flight: Mutex<HashSet<String>>,
}

/// Removes the registration from the in-flight set however the fetch ends.
struct InFlightGuard<'a> {
    set: &'a Mutex<HashSet<String>>,
    vrm: String,
}

impl Drop for InFlightGuard<'_> {
    fn drop(&mut self) {
        self.set.lock().remove(&self.vrm);
    }
}

/// Uppercase, whitespace stripped. The provider treats "ab12 cde" and
/// "AB12CDE" as the same mark.
pub fn normalize_registration(registration: &str) -> String {
    registration
        .chars()
        .filter(|c| !c.is_whitespace())
        .collect::<String>()
        .to_uppercase()
}

impl FetchOrchestrator {
    pub fn new(client: Arc<dyn VehicleDataApi>, pricing: Arc<PricingSync>) -> Self {
        Self {
            client,
            pricing,
            in_flight: Mutex::new(HashSet::new()),
        }
    }

    /// Fetch the selected tables for one registration, sequentially and in
    /// caller order. One table failing never aborts the batch; it is simply
    /// absent from `tables_fetched`.
    pub async fn fetch_vehicle_data(
        &self,
        registration: &str,
        tables: &[String],
    ) -> Result<FetchResult, FetchError> {
        let vrm = normalize_registration(registration);
        if vrm.is_empty() {
            return Err(FetchError::validation("registration must not be empty"));
        }
        if tables.is_empty() {
            return Err(FetchError::validation("no tables selected"));
        }
        for table in tables {
            if !self.pricing.catalog().contains(table) {
                return Err(FetchError::validation(format!(
                    "unknown table '{}'",
                    table
                )));
            }
        }

        let _guard = {
            let mut running = self.in_flight.lock();
            if !running.insert(vrm.clone()) {
                return Err(FetchError::already_in_flight(&vrm));
            }
            InFlightGuard {
                set: &self.in_flight,
                vrm: vrm.clone(),
            }
        };

        // Fixed by the request before anything is attempted.
        let cost: Decimal = tables.iter().map(|t| self.pricing.table_cost_now(t)).sum();

        // Sequential on purpose: one billable call in flight at a time keeps
        // cost attribution per call unambiguous.
        let mut outcomes: Vec<(String, Result<Value, ProviderClientError>)> =
            Vec::with_capacity(tables.len());
        for table in tables {
            let outcome = self.client.fetch_table(table, &vrm).await;
            outcomes.push((table.clone(), outcome));
        }

        let mut data = HashMap::new();
        let mut tables_fetched = Vec::new();
        for (table, outcome) in outcomes {
            match outcome {
                Ok(body) => {
                    tables_fetched.push(table.clone());
                    data.insert(table, body);
                }
                Err(err) => {
                    warn!("table '{}' failed for {}: {}", table, vrm, err);
                }
            }
        }

        let success = !tables_fetched.is_empty();
        let error = if success {
            None
        } else {
            Some("no requested table returned data".to_string())
        };

        info!(
            "lookup for {} fetched {}/{} tables at cost {}",
            vrm,
            tables_fetched.len(),
            tables.len(),
            cost
        );

        Ok(FetchResult {
            success,
            data,
            cost,
            tables_fetched,
            error,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use catalog::TableCatalog;
    use common::config::ProviderConfig;
    use matches::assert_matches;
    use provider_client::VehicleDataClient;
    use rust_decimal_macros::dec;
    use serde_json::json;
    use std::time::Duration;
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn orchestrator_for(server: &MockServer) -> Arc<FetchOrchestrator> {
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
        let pricing = Arc::new(PricingSync::new(
            Some(client.clone()),
            TableCatalog::new(),
            100,
        ));
        Arc::new(FetchOrchestrator::new(client, pricing))
    }

    fn tables(names: &[&str]) -> Vec<String> {
        names.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn registration_is_normalised() {
        assert_eq!(normalize_registration(" ab12 cde "), "AB12CDE");
        assert_eq!(normalize_registration("AB12CDE"), "AB12CDE");
        assert_eq!(normalize_registration("   "), "");
    }

    #[tokio::test]
    async fn validation_happens_before_any_network_call() {
        let server = MockServer::start().await;
        let orch = orchestrator_for(&server);

        let err = orch
            .fetch_vehicle_data("   ", &tables(&["mot"]))
            .await
            .unwrap_err();
        assert_matches!(err, FetchError::Validation { .. });

        let err = orch.fetch_vehicle_data("AB12CDE", &[]).await.unwrap_err();
        assert_matches!(err, FetchError::Validation { .. });

        let err = orch
            .fetch_vehicle_data("AB12CDE", &tables(&["notatable"]))
            .await
            .unwrap_err();
        assert_matches!(err, FetchError::Validation { .. });

        // nothing was billed
        assert!(server.received_requests().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn total_failure_still_carries_the_requested_cost() {
        // Scenario A: one table at catalog cost 0.15, call fails, cost stands.
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/vehicledata/vehicleregistration"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;

        let orch = orchestrator_for(&server);
        let result = orch
            .fetch_vehicle_data("AB12CDE", &tables(&["vehicleregistration"]))
            .await
            .unwrap();

        assert!(!result.success);
        assert_eq!(result.cost, dec!(0.15));
        assert!(result.tables_fetched.is_empty());
        assert!(result.data.is_empty());
        assert!(result.error.is_some());
    }

    #[tokio::test]
    async fn partial_failure_reports_what_was_usable() {
        // Scenario B: registration succeeds, mot fails; cost covers both.
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/vehicledata/vehicleregistration"))
            .and(query_param("vrm", "AB12CDE"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(json!({"make": "FORD"})),
            )
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/vehicledata/mot"))
            .respond_with(ResponseTemplate::new(503))
            .mount(&server)
            .await;

        let orch = orchestrator_for(&server);
        let result = orch
            .fetch_vehicle_data("ab12 cde", &tables(&["vehicleregistration", "mot"]))
            .await
            .unwrap();

        assert!(result.success);
        assert_eq!(result.tables_fetched, vec!["vehicleregistration"]);
        assert_eq!(result.cost, dec!(0.35));
        assert_eq!(result.data["vehicleregistration"]["make"], "FORD");
        assert!(!result.data.contains_key("mot"));
        assert!(result.error.is_none());
    }

    #[tokio::test]
    async fn tables_are_attempted_in_caller_order() {
        let server = MockServer::start().await;
        for table in ["mot", "mileage", "vehicleregistration"] {
            Mock::given(method("GET"))
                .and(path(format!("/vehicledata/{table}")))
                .respond_with(ResponseTemplate::new(200).set_body_json(json!({})))
                .mount(&server)
                .await;
        }

        let orch = orchestrator_for(&server);
        let result = orch
            .fetch_vehicle_data("AB12CDE", &tables(&["mot", "mileage", "vehicleregistration"]))
            .await
            .unwrap();
        assert_eq!(
            result.tables_fetched,
            vec!["mot", "mileage", "vehicleregistration"]
        );
    }

    #[tokio::test]
    async fn malformed_json_counts_as_that_tables_failure() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/vehicledata/mot"))
            .respond_with(ResponseTemplate::new(200).set_body_string("not json"))
            .mount(&server)
            .await;

        let orch = orchestrator_for(&server);
        let result = orch
            .fetch_vehicle_data("AB12CDE", &tables(&["mot"]))
            .await
            .unwrap();
        assert!(!result.success);
        assert_eq!(result.cost, dec!(0.20));
    }

    #[tokio::test]
    async fn concurrent_lookup_for_same_registration_is_rejected() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/vehicledata/mot"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(json!({}))
                    .set_delay(Duration::from_millis(400)),
            )
            .mount(&server)
            .await;

        let orch = orchestrator_for(&server);
        let first = {
            let orch = orch.clone();
            tokio::spawn(async move { orch.fetch_vehicle_data("AB12CDE", &tables(&["mot"])).await })
        };
        tokio::time::sleep(Duration::from_millis(100)).await;

        let err = orch
            .fetch_vehicle_data("ab12cde", &tables(&["mot"]))
            .await
            .unwrap_err();
        assert_matches!(err, FetchError::AlreadyInFlight { .. });

        // the original lookup completes, and the guard clears
        assert!(first.await.unwrap().unwrap().success);
        let result = orch
            .fetch_vehicle_data("AB12CDE", &tables(&["mot"]))
            .await
            .unwrap();
        assert!(result.success);
    }
}
