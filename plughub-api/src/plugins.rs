//! Plugin catalog endpoints.

use actix_web::{HttpRequest, HttpResponse, web};

use plughub_store_db::{DefaultVariant, PluginType};

use crate::config::Config;
use crate::etag::serve_cached;
use crate::{ServerResult, cache_control_no_store, some_or_404};

fn bad_plugin_type(raw: &str) -> HttpResponse {
    HttpResponse::BadRequest()
        .insert_header(cache_control_no_store())
        .body(format!("'{raw}' is not a valid plugin type"))
}

macro_rules! parse_type_or_400 {
    ($raw:expr) => {
        match $raw.parse::<PluginType>() {
            Ok(plugin_type) => plugin_type,
            Err(_) => return Ok(bad_plugin_type(&$raw)),
        }
    };
}

/// `GET /v1/plugins/index` — all plugins, all types.
pub(crate) async fn index_all(req: HttpRequest, settings: web::Data<Config>) -> ServerResult {
    let response = serve_cached(&req, &settings, "plugins:index", |db| {
        db.list_plugins(None).map(Some)
    })
    .await?;
    Ok(some_or_404!(response))
}

/// `GET /v1/plugins/{plugin_type}/index` — plugins of one type.
pub(crate) async fn index_type(
    path: web::Path<String>,
    req: HttpRequest,
    settings: web::Data<Config>,
) -> ServerResult {
    let raw = path.into_inner();
    let plugin_type = parse_type_or_400!(raw);
    let key = format!("plugins:index:{plugin_type}");
    let response = serve_cached(&req, &settings, &key, |db| {
        db.list_plugins(Some(plugin_type)).map(Some)
    })
    .await?;
    Ok(some_or_404!(response))
}

/// `GET /v1/plugins/stats` — visible plugin counts per type.
pub(crate) async fn stats(req: HttpRequest, settings: web::Data<Config>) -> ServerResult {
    let response = serve_cached(&req, &settings, "plugins:stats", |db| {
        db.plugin_stats().map(Some)
    })
    .await?;
    Ok(some_or_404!(response))
}

/// `GET /v1/plugins/{plugin_type}/{name}--{variant}` — full variant detail.
pub(crate) async fn variant_detail(
    path: web::Path<(String, String, String)>,
    req: HttpRequest,
    settings: web::Data<Config>,
) -> ServerResult {
    let (raw, name, variant) = path.into_inner();
    let plugin_type = parse_type_or_400!(raw);
    let key = format!("plugins:variant:{plugin_type}:{name}:{variant}");
    let response = serve_cached(&req, &settings, &key, |db| {
        db.get_variant(plugin_type, &name, &variant)
    })
    .await?;
    Ok(some_or_404!(response))
}

/// `GET /v1/plugins/{plugin_type}/{name}/default` — resolved default
/// variant. Distinct outcomes: 404 for an unknown plugin, 409 when no
/// deterministic answer exists.
pub(crate) async fn default_variant(
    path: web::Path<(String, String)>,
    req: HttpRequest,
    settings: web::Data<Config>,
) -> ServerResult {
    let (raw, name) = path.into_inner();
    let plugin_type = parse_type_or_400!(raw);

    let catalog = settings.catalog()?;
    let cache_key = format!(
        "{}:plugins:default:{plugin_type}:{name}",
        catalog.generation()
    );
    if let Some(payload) = settings.cache.get(&cache_key) {
        return Ok(crate::etag::payload_response(&req, &settings, &payload));
    }

    let outcome = {
        let db = catalog.db().await;
        db.resolve_default_variant(plugin_type, &name)
            .map_err(crate::error::ApiError::from)?
    };

    match outcome {
        None => Ok(HttpResponse::NotFound()
            .insert_header(cache_control_no_store())
            .body("unknown plugin")),
        Some(ambiguous @ DefaultVariant::Ambiguous { .. }) => Ok(HttpResponse::Conflict()
            .insert_header(cache_control_no_store())
            .json(ambiguous)),
        Some(resolved @ DefaultVariant::Resolved { .. }) => {
            let body = serde_json::to_vec(&resolved).map_err(crate::error::ApiError::from)?;
            let payload = settings.cache.insert(cache_key, body);
            Ok(crate::etag::payload_response(&req, &settings, &payload))
        }
    }
}

#[cfg(test)]
mod tests {
    use actix_web::http::StatusCode;
    use actix_web::http::header;
    use actix_web::{App, test, web};

    use plughub_store_db::{
        MaintainerRow, OpenMode, PluginRow, Snapshot, StoreDb, VariantRow, plugin_id, variant_id,
    };

    use super::*;
    use crate::catalog::Catalog;

    fn sample_snapshot() -> Snapshot {
        let t = PluginType::Extractors;
        Snapshot {
            maintainers: vec![MaintainerRow {
                id: "acme".into(),
                name: Some("Acme Corp".into()),
                url: None,
                org: None,
            }],
            plugins: vec![PluginRow {
                id: plugin_id(t, "tap-csv"),
                plugin_type: t,
                name: "tap-csv".into(),
                description: Some("CSV extractor".into()),
                logo_url: None,
                keywords: vec![],
                default_variant_id: Some(variant_id(t, "tap-csv", "acme")),
                pick_first: false,
                hidden: false,
            }],
            variants: vec![VariantRow {
                id: variant_id(t, "tap-csv", "acme"),
                plugin_id: plugin_id(t, "tap-csv"),
                name: "acme".into(),
                pip_url: Some("acme-tap-csv".into()),
                pin: None,
                docs_url: None,
                repo_url: "https://github.com/acme/tap-csv".into(),
                capabilities: vec!["catalog".into()],
                env_vars: vec![],
                original_names: vec![],
                superseded_by: None,
                maintainer_id: Some("acme".into()),
                hidden: false,
            }],
            settings: vec![],
            meta: vec![],
        }
    }

    fn test_config(dir: &tempfile::TempDir) -> Config {
        let db_path = dir.path().join("plugins.db");
        {
            let mut db = StoreDb::open(&db_path, OpenMode::Create).unwrap();
            db.create_schema().unwrap();
            db.import_snapshot(&sample_snapshot()).unwrap();
        }
        let mut config = Config::from_toml("").unwrap();
        config.db_path = db_path.clone();
        config.catalog = Some(Catalog::open(&db_path).unwrap());
        config
    }

    fn routes(cfg: &mut web::ServiceConfig) {
        cfg.route("/v1/plugins/index", web::get().to(index_all))
            .route("/v1/plugins/stats", web::get().to(stats))
            .route("/v1/plugins/{plugin_type}/index", web::get().to(index_type))
            .route(
                "/v1/plugins/{plugin_type}/{name}--{variant}",
                web::get().to(variant_detail),
            )
            .route(
                "/v1/plugins/{plugin_type}/{name}/default",
                web::get().to(default_variant),
            );
    }

    #[actix_web::test]
    async fn test_index_and_conditional_fetch() {
        let dir = tempfile::tempdir().unwrap();
        let app = test::init_service(
            App::new()
                .app_data(web::Data::new(test_config(&dir)))
                .configure(routes),
        )
        .await;

        let resp = test::call_service(
            &app,
            test::TestRequest::get()
                .uri("/v1/plugins/index")
                .to_request(),
        )
        .await;
        assert_eq!(resp.status(), StatusCode::OK);
        let etag = resp
            .headers()
            .get(header::ETAG)
            .unwrap()
            .to_str()
            .unwrap()
            .to_owned();
        assert!(etag.starts_with("\"sha256:"));

        // Unchanged payload + matching fingerprint → 304 without a body.
        let resp = test::call_service(
            &app,
            test::TestRequest::get()
                .uri("/v1/plugins/index")
                .insert_header((header::IF_NONE_MATCH, etag.clone()))
                .to_request(),
        )
        .await;
        assert_eq!(resp.status(), StatusCode::NOT_MODIFIED);

        // A stale fingerprint still gets the full payload.
        let resp = test::call_service(
            &app,
            test::TestRequest::get()
                .uri("/v1/plugins/index")
                .insert_header((header::IF_NONE_MATCH, "\"sha256:stale\""))
                .to_request(),
        )
        .await;
        assert_eq!(resp.status(), StatusCode::OK);
    }

    #[actix_web::test]
    async fn test_variant_detail_and_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let app = test::init_service(
            App::new()
                .app_data(web::Data::new(test_config(&dir)))
                .configure(routes),
        )
        .await;

        let resp = test::call_service(
            &app,
            test::TestRequest::get()
                .uri("/v1/plugins/extractors/tap-csv--acme")
                .to_request(),
        )
        .await;
        assert_eq!(resp.status(), StatusCode::OK);
        let body: serde_json::Value = test::read_body_json(resp).await;
        assert_eq!(body["variant"], "acme");
        assert_eq!(body["maintainer"]["name"], "Acme Corp");

        let resp = test::call_service(
            &app,
            test::TestRequest::get()
                .uri("/v1/plugins/extractors/tap-csv--ghost")
                .to_request(),
        )
        .await;
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);

        let resp = test::call_service(
            &app,
            test::TestRequest::get()
                .uri("/v1/plugins/widgets/index")
                .to_request(),
        )
        .await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    }

    #[actix_web::test]
    async fn test_default_variant_endpoint() {
        let dir = tempfile::tempdir().unwrap();
        let app = test::init_service(
            App::new()
                .app_data(web::Data::new(test_config(&dir)))
                .configure(routes),
        )
        .await;

        let resp = test::call_service(
            &app,
            test::TestRequest::get()
                .uri("/v1/plugins/extractors/tap-csv/default")
                .to_request(),
        )
        .await;
        assert_eq!(resp.status(), StatusCode::OK);
        let body: serde_json::Value = test::read_body_json(resp).await;
        assert_eq!(body["status"], "resolved");
        assert_eq!(body["variant"], "acme");

        let resp = test::call_service(
            &app,
            test::TestRequest::get()
                .uri("/v1/plugins/extractors/tap-ghost/default")
                .to_request(),
        )
        .await;
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    }

    /// Small payloads pin identity encoding; large ones are left to the
    /// compression middleware.
    #[actix_web::test]
    async fn test_compression_decision_header() {
        let dir = tempfile::tempdir().unwrap();
        let config = test_config(&dir);
        let app = test::init_service(
            App::new()
                .app_data(web::Data::new(config))
                .configure(routes),
        )
        .await;

        let resp = test::call_service(
            &app,
            test::TestRequest::get()
                .uri("/v1/plugins/index")
                .to_request(),
        )
        .await;
        // Sample payload is well below the 1 KiB default threshold.
        assert_eq!(
            resp.headers()
                .get(header::CONTENT_ENCODING)
                .and_then(|v| v.to_str().ok()),
            Some("identity")
        );

        let dir = tempfile::tempdir().unwrap();
        let mut config = test_config(&dir);
        config.compression_threshold = 1;
        let app = test::init_service(
            App::new()
                .app_data(web::Data::new(config))
                .configure(routes),
        )
        .await;
        let resp = test::call_service(
            &app,
            test::TestRequest::get()
                .uri("/v1/plugins/index")
                .to_request(),
        )
        .await;
        assert!(resp.headers().get(header::CONTENT_ENCODING).is_none());
    }
}
