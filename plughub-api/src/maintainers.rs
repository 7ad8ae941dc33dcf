//! Maintainer endpoints.

use actix_web::{HttpRequest, web};
use serde::Deserialize;

use crate::config::Config;
use crate::etag::serve_cached;
use crate::{ServerResult, some_or_404};

const DEFAULT_TOP_COUNT: usize = 10;
const MAX_TOP_COUNT: usize = 50;

#[derive(Debug, Deserialize)]
pub(crate) struct TopParams {
    count: Option<usize>,
}

/// `GET /v1/maintainers` — all maintainers, ordered by id.
pub(crate) async fn list(req: HttpRequest, settings: web::Data<Config>) -> ServerResult {
    let response = serve_cached(&req, &settings, "maintainers", |db| {
        db.list_maintainers().map(Some)
    })
    .await?;
    Ok(some_or_404!(response))
}

/// `GET /v1/maintainers/top?count=N` — maintainers ranked by maintained
/// variant count.
pub(crate) async fn top(
    param: web::Query<TopParams>,
    req: HttpRequest,
    settings: web::Data<Config>,
) -> ServerResult {
    let count = param
        .count
        .unwrap_or(DEFAULT_TOP_COUNT)
        .clamp(1, MAX_TOP_COUNT);
    let key = format!("maintainers:top:{count}");
    let response = serve_cached(&req, &settings, &key, |db| {
        db.top_maintainers(count).map(Some)
    })
    .await?;
    Ok(some_or_404!(response))
}

/// `GET /v1/maintainers/{id}` — one maintainer with their variants.
pub(crate) async fn detail(
    path: web::Path<String>,
    req: HttpRequest,
    settings: web::Data<Config>,
) -> ServerResult {
    let id = path.into_inner();
    let key = format!("maintainers:{id}");
    let response = serve_cached(&req, &settings, &key, |db| db.get_maintainer(&id)).await?;
    Ok(some_or_404!(response))
}

#[cfg(test)]
mod tests {
    use actix_web::http::StatusCode;
    use actix_web::{App, test, web};

    use plughub_store_db::{
        MaintainerRow, OpenMode, PluginRow, PluginType, Snapshot, StoreDb, VariantRow, plugin_id,
        variant_id,
    };

    use super::*;
    use crate::catalog::Catalog;

    fn test_config(dir: &tempfile::TempDir) -> Config {
        let t = PluginType::Extractors;
        let snapshot = Snapshot {
            maintainers: vec![
                MaintainerRow {
                    id: "acme".into(),
                    name: Some("Acme Corp".into()),
                    url: Some("https://acme.example".into()),
                    org: None,
                },
                MaintainerRow {
                    id: "umbrella".into(),
                    ..MaintainerRow::default()
                },
            ],
            plugins: vec![PluginRow {
                id: plugin_id(t, "tap-csv"),
                plugin_type: t,
                name: "tap-csv".into(),
                description: None,
                logo_url: None,
                keywords: vec![],
                default_variant_id: None,
                pick_first: false,
                hidden: false,
            }],
            variants: vec![VariantRow {
                id: variant_id(t, "tap-csv", "acme"),
                plugin_id: plugin_id(t, "tap-csv"),
                name: "acme".into(),
                pip_url: None,
                pin: None,
                docs_url: None,
                repo_url: "https://github.com/acme/tap-csv".into(),
                capabilities: vec![],
                env_vars: vec![],
                original_names: vec![],
                superseded_by: None,
                maintainer_id: Some("acme".into()),
                hidden: false,
            }],
            settings: vec![],
            meta: vec![],
        };

        let db_path = dir.path().join("plugins.db");
        {
            let mut db = StoreDb::open(&db_path, OpenMode::Create).unwrap();
            db.create_schema().unwrap();
            db.import_snapshot(&snapshot).unwrap();
        }
        let mut config = Config::from_toml("").unwrap();
        config.db_path = db_path.clone();
        config.catalog = Some(Catalog::open(&db_path).unwrap());
        config
    }

    fn routes(cfg: &mut web::ServiceConfig) {
        cfg.route("/v1/maintainers", web::get().to(list))
            .route("/v1/maintainers/top", web::get().to(top))
            .route("/v1/maintainers/{id}", web::get().to(detail));
    }

    #[actix_web::test]
    async fn test_list_and_detail() {
        let dir = tempfile::tempdir().unwrap();
        let app = test::init_service(
            App::new()
                .app_data(web::Data::new(test_config(&dir)))
                .configure(routes),
        )
        .await;

        let resp = test::call_service(
            &app,
            test::TestRequest::get().uri("/v1/maintainers").to_request(),
        )
        .await;
        assert_eq!(resp.status(), StatusCode::OK);
        let body: serde_json::Value = test::read_body_json(resp).await;
        assert_eq!(body[0]["id"], "acme");
        assert_eq!(body[1]["id"], "umbrella");

        let resp = test::call_service(
            &app,
            test::TestRequest::get()
                .uri("/v1/maintainers/acme")
                .to_request(),
        )
        .await;
        assert_eq!(resp.status(), StatusCode::OK);
        let body: serde_json::Value = test::read_body_json(resp).await;
        assert_eq!(body["variants"][0], "extractors.tap-csv.acme");

        let resp = test::call_service(
            &app,
            test::TestRequest::get()
                .uri("/v1/maintainers/nobody")
                .to_request(),
        )
        .await;
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    }

    #[actix_web::test]
    async fn test_top_ranking() {
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
                .uri("/v1/maintainers/top?count=3")
                .to_request(),
        )
        .await;
        assert_eq!(resp.status(), StatusCode::OK);
        let body: serde_json::Value = test::read_body_json(resp).await;
        assert_eq!(body[0]["id"], "acme");
        assert_eq!(body[0]["plugin_count"], 1);
    }
}
