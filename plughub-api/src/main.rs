#![warn(clippy::dbg_macro)]

use std::fmt::Display;
use std::time::Duration;

use actix_web::{App, HttpResponse, HttpServer, http, middleware, web};

use error::{ApiError, IoErrorContext, Result};

mod catalog;
mod config;
mod error;
mod etag;
mod health;
mod maintainers;
mod plugins;
mod version;

const CARGO_NAME: &str = env!("CARGO_PKG_NAME");
const CARGO_VERSION: &str = env!("CARGO_PKG_VERSION");

fn cache_control_max_age(max_age: u32) -> http::header::CacheControl {
    http::header::CacheControl(vec![http::header::CacheDirective::MaxAge(max_age)])
}

fn cache_control_max_age_1d() -> http::header::CacheControl {
    cache_control_max_age(24 * 60 * 60)
}

fn cache_control_no_store() -> http::header::CacheControl {
    http::header::CacheControl(vec![http::header::CacheDirective::NoStore])
}

macro_rules! some_or_404 {
    ($res:expr) => {
        match $res {
            Some(val) => val,
            None => {
                return Ok(actix_web::HttpResponse::NotFound()
                    .insert_header(crate::cache_control_no_store())
                    .body("not found"))
            }
        }
    };
}
pub(crate) use some_or_404;

#[derive(Debug)]
struct ServerError {
    err: ApiError,
}

impl Display for ServerError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.err)
    }
}

impl actix_web::error::ResponseError for ServerError {
    fn status_code(&self) -> actix_web::http::StatusCode {
        use actix_web::http::StatusCode;
        match &self.err {
            ApiError::Catalog(plughub_store_db::Error::UnknownPluginType(_)) => {
                StatusCode::BAD_REQUEST
            }
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<ApiError> for ServerError {
    fn from(err: ApiError) -> ServerError {
        ServerError { err }
    }
}

type ServerResult = std::result::Result<HttpResponse, ServerError>;

async fn inner_main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let mut config = config::load()?;
    config.catalog = Some(catalog::Catalog::open(&config.db_path)?);

    let c = web::Data::new(config);
    let config_data = c.clone();

    log::info!("listening on {}", c.bind);
    let server = HttpServer::new(move || {
        App::new()
            .wrap(middleware::Condition::new(
                config_data.enable_compression,
                middleware::Compress::default(),
            ))
            .app_data(config_data.clone())
            .route("/v1/plugins/index", web::get().to(plugins::index_all))
            .route("/v1/plugins/index", web::head().to(plugins::index_all))
            .route("/v1/plugins/stats", web::get().to(plugins::stats))
            .route(
                "/v1/plugins/{plugin_type}/index",
                web::get().to(plugins::index_type),
            )
            .route(
                "/v1/plugins/{plugin_type}/index",
                web::head().to(plugins::index_type),
            )
            .route(
                "/v1/plugins/{plugin_type}/{name}--{variant}",
                web::get().to(plugins::variant_detail),
            )
            .route(
                "/v1/plugins/{plugin_type}/{name}/default",
                web::get().to(plugins::default_variant),
            )
            .route("/v1/maintainers", web::get().to(maintainers::list))
            .route("/v1/maintainers/top", web::get().to(maintainers::top))
            .route("/v1/maintainers/{id}", web::get().to(maintainers::detail))
            .route("/version", web::get().to(version::get))
            .route("/health", web::get().to(health::get))
    })
    // default is 5 seconds, which is too small when doing mass requests on slow machines
    .client_request_timeout(Duration::from_secs(30))
    .workers(c.workers)
    .max_connection_rate(c.max_connection_rate)
    .bind(c.bind.clone())
    .io_context("Failed to bind server")?;

    server.run().await.io_context("Failed to start server")
}

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    inner_main().await.map_err(std::io::Error::other)
}
