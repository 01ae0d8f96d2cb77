use std::collections::BTreeMap;
use std::sync::Arc;

use actix_cors::Cors;
use actix_web::middleware::Logger;
use actix_web::{web, App, HttpResponse, HttpServer, Responder};
use catalog::TableCatalog;
use chrono::Utc;
use common::config::AppConfig;
use fetcher::{FetchError, FetchOrchestrator};
use mapper::ResponseMapper;
use provider_client::{PricingSync, VehicleDataApi, VehicleDataClient};
use schema_sync::SchemaSync;
use serde::Deserialize;
use serde_json::{json, Value};

/// Everything the handlers need. Built once at startup; when the provider
/// key is missing the lookup paths degrade to explicit 500s while pricing
/// and the capability probe keep working off catalog defaults.
#[derive(Clone)]
pub struct AppState {
    orchestrator: Option<Arc<FetchOrchestrator>>,
    pricing: Arc<PricingSync>,
    schema_sync: Arc<SchemaSync>,
    mapper: ResponseMapper,
    catalog: TableCatalog,
}

impl AppState {
    pub fn from_config(cfg: &AppConfig) -> Self {
        let catalog = TableCatalog::new();
        let client: Option<Arc<dyn VehicleDataApi>> =
            match VehicleDataClient::from_config(&cfg.provider) {
                Ok(client) => Some(Arc::new(client)),
                Err(err) => {
                    log::warn!("provider client unavailable: {}", err);
                    None
                }
            };

        let pricing = Arc::new(PricingSync::new(
            client.clone(),
            catalog.clone(),
            cfg.provider.minor_units_per_major,
        ));
        let orchestrator = client
            .clone()
            .map(|c| Arc::new(FetchOrchestrator::new(c, pricing.clone())));
        let schema_sync = Arc::new(SchemaSync::new(
            client,
            catalog.clone(),
            cfg.provider.test_vrm.clone(),
        ));

        Self {
            orchestrator,
            pricing,
            schema_sync,
            mapper: ResponseMapper::new(cfg.provider.field_prefix.clone()),
            catalog,
        }
    }

    fn api_configured(&self) -> bool {
        self.orchestrator.is_some()
    }
}

#[derive(Debug, Deserialize)]
struct LookupRequest {
    registration: Option<String>,
    tables: Option<Vec<String>>,
}

async fn lookup_handler(
    state: web::Data<AppState>,
    body: web::Json<LookupRequest>,
) -> impl Responder {
    let registration = body.registration.as_deref().unwrap_or("").trim();
    let tables = body.tables.clone().unwrap_or_default();
    if registration.is_empty() || tables.is_empty() {
        return HttpResponse::BadRequest().json(json!({
            "success": false,
            "error": "registration and a non-empty table selection are required",
        }));
    }

    let Some(orchestrator) = &state.orchestrator else {
        return HttpResponse::InternalServerError().json(json!({
            "success": false,
            "error": "provider API key is not configured",
        }));
    };

    match orchestrator.fetch_vehicle_data(registration, &tables).await {
        Ok(result) => {
            let record = state.mapper.map_to_record(&result);
            let mapped: BTreeMap<String, Value> = record
                .into_iter()
                .map(|(key, value)| (key, value.as_json()))
                .collect();
            HttpResponse::Ok().json(json!({
                "success": result.success,
                "data": result.data,
                "mappedData": mapped,
                "cost": result.cost,
                "tablesFetched": result.tables_fetched,
                "error": result.error,
            }))
        }
        Err(err @ FetchError::Validation { .. }) => HttpResponse::BadRequest().json(json!({
            "success": false,
            "error": err.to_string(),
        })),
        Err(err @ FetchError::AlreadyInFlight { .. }) => HttpResponse::Conflict().json(json!({
            "success": false,
            "error": err.to_string(),
        })),
    }
}

async fn lookup_probe_handler(state: web::Data<AppState>) -> impl Responder {
    let tables: Vec<Value> = state
        .catalog
        .list()
        .iter()
        .map(|t| {
            json!({
                "name": t.name,
                "label": t.label,
                "cost": state.pricing.table_cost_now(t.name),
            })
        })
        .collect();

    HttpResponse::Ok().json(json!({
        "message": "vehicle data lookup",
        "timestamp": Utc::now().to_rfc3339(),
        "apiConfigured": state.api_configured(),
        "availableTables": tables,
    }))
}

async fn pricing_handler(state: web::Data<AppState>) -> impl Responder {
    match state.pricing.refresh().await {
        Some(snapshot) => HttpResponse::Ok().json(json!({
            "success": true,
            "pricing": {
                "tables": snapshot.table_costs,
                "lastUpdated": snapshot.fetched_at.to_rfc3339(),
            },
            "timestamp": Utc::now().to_rfc3339(),
        })),
        None => {
            // degrade to catalog defaults, never error on pricing alone
            let defaults: BTreeMap<&str, Value> = state
                .catalog
                .list()
                .iter()
                .map(|t| (t.name, json!(t.cost)))
                .collect();
            HttpResponse::Ok().json(json!({
                "success": true,
                "pricing": {
                    "tables": defaults,
                    "lastUpdated": Value::Null,
                },
                "note": "live pricing unavailable; showing catalog defaults",
                "timestamp": Utc::now().to_rfc3339(),
            }))
        }
    }
}

async fn sync_schema_handler(state: web::Data<AppState>) -> impl Responder {
    let result = state.schema_sync.sync_schema().await;
    if result.success {
        HttpResponse::Ok().json(result)
    } else {
        HttpResponse::InternalServerError().json(result)
    }
}

async fn health_handler() -> impl Responder {
    HttpResponse::Ok().finish()
}

#[derive(Debug, Clone)]
pub struct BackendConfig {
    pub addr: String,
}

pub fn init_logging() {
    let _ = env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .try_init();
}

pub fn configure_routes(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/api")
            .route("/lookup", web::post().to(lookup_handler))
            .route("/lookup", web::get().to(lookup_probe_handler))
            .route("/pricing", web::get().to(pricing_handler))
            .route("/sync-schema", web::post().to(sync_schema_handler)),
    )
    .route("/healthz", web::get().to(health_handler));
}

pub async fn run_backend(cfg: BackendConfig, state: AppState) -> std::io::Result<()> {
    let state = web::Data::new(state);

    log::info!("starting lookup backend on {}", cfg.addr);

    HttpServer::new(move || {
        let cors = Cors::default()
            .allow_any_origin()
            .allow_any_method()
            .allow_any_header()
            .max_age(3600);

        App::new()
            .wrap(Logger::default())
            .wrap(cors)
            .app_data(state.clone())
            .configure(configure_routes)
    })
    .bind(cfg.addr)?
    .run()
    .await
}

#[cfg(test)]
mod tests {
    use super::*;
    use actix_web::{test, App};
    use common::config::{ProviderConfig, WebConfig};
    use serde_json::json;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn app_config(base_url: &str, api_key: Option<&str>) -> AppConfig {
        AppConfig {
            provider: ProviderConfig {
                base_url: base_url.to_string(),
                api_key: api_key.map(|k| k.to_string()),
                field_prefix: "ccd".into(),
                minor_units_per_major: 100,
                request_timeout_secs: 5,
                test_vrm: "AB12CDE".into(),
            },
            web: WebConfig::default(),
        }
    }

    macro_rules! service {
        ($state:expr) => {
            test::init_service(
                App::new()
                    .app_data(web::Data::new($state))
                    .configure(configure_routes),
            )
            .await
        };
    }

    #[actix_web::test]
    async fn lookup_rejects_missing_fields() {
        let state = AppState::from_config(&app_config("http://127.0.0.1:9", Some("k")));
        let app = service!(state);

        let req = test::TestRequest::post()
            .uri("/api/lookup")
            .set_json(json!({"registration": "", "tables": ["mot"]}))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), 400);

        let req = test::TestRequest::post()
            .uri("/api/lookup")
            .set_json(json!({"registration": "AB12CDE"}))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), 400);
    }

    #[actix_web::test]
    async fn lookup_without_credentials_is_a_config_error() {
        let cfg = app_config("http://127.0.0.1:9", None);
        if std::env::var(common::config::API_KEY_ENV).is_ok() {
            return;
        }
        let app = service!(AppState::from_config(&cfg));

        let req = test::TestRequest::post()
            .uri("/api/lookup")
            .set_json(json!({"registration": "AB12CDE", "tables": ["mot"]}))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), 500);
        let body: Value = test::read_body_json(resp).await;
        assert_eq!(body["error"], "provider API key is not configured");
    }

    #[actix_web::test]
    async fn lookup_returns_data_and_mapped_record() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/vehicledata/vehicleregistration"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(json!({"make": "FORD", "yearOfManufacture": 2019})),
            )
            .mount(&server)
            .await;

        let app = service!(AppState::from_config(&app_config(&server.uri(), Some("k"))));
        let req = test::TestRequest::post()
            .uri("/api/lookup")
            .set_json(json!({"registration": "ab12 cde", "tables": ["vehicleregistration"]}))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), 200);

        let body: Value = test::read_body_json(resp).await;
        assert_eq!(body["success"], true);
        assert_eq!(body["tablesFetched"], json!(["vehicleregistration"]));
        assert_eq!(body["data"]["vehicleregistration"]["make"], "FORD");
        assert_eq!(body["mappedData"]["ccd_vehicleregistration_make"], "FORD");
        assert_eq!(body["mappedData"]["make"], "FORD");
    }

    #[actix_web::test]
    async fn probe_reports_capability_and_tables() {
        let cfg = app_config("http://127.0.0.1:9", Some("k"));
        let app = service!(AppState::from_config(&cfg));

        let req = test::TestRequest::get().uri("/api/lookup").to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), 200);

        let body: Value = test::read_body_json(resp).await;
        assert_eq!(body["apiConfigured"], true);
        let tables = body["availableTables"].as_array().unwrap();
        assert_eq!(tables.len(), 8);
        assert!(tables.iter().any(|t| t["name"] == "mot"));
    }

    #[actix_web::test]
    async fn pricing_degrades_to_catalog_defaults() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/pricing"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;

        let app = service!(AppState::from_config(&app_config(&server.uri(), Some("k"))));
        let req = test::TestRequest::get().uri("/api/pricing").to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), 200);

        let body: Value = test::read_body_json(resp).await;
        assert_eq!(body["success"], true);
        assert!(body["note"].is_string());
        assert_eq!(body["pricing"]["tables"]["mot"], json!(0.20));
    }

    #[actix_web::test]
    async fn sync_schema_without_credentials_is_500() {
        if std::env::var(common::config::API_KEY_ENV).is_ok() {
            return;
        }
        let app = service!(AppState::from_config(&app_config("http://127.0.0.1:9", None)));
        let req = test::TestRequest::post().uri("/api/sync-schema").to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), 500);

        let body: Value = test::read_body_json(resp).await;
        assert_eq!(body["success"], false);
        assert!(!body["errors"].as_array().unwrap().is_empty());
    }
}
