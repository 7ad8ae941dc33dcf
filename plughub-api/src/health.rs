use actix_web::{HttpResponse, web};

use crate::ServerResult;
use crate::cache_control_no_store;
use crate::config::Config;

/// Liveness probe: verifies the snapshot is still queryable.
pub(crate) async fn get(settings: web::Data<Config>) -> ServerResult {
    let catalog = settings.catalog()?;
    {
        let db = catalog.db().await;
        db.plugin_stats().map_err(crate::error::ApiError::from)?;
    }
    Ok(HttpResponse::Ok()
        .insert_header(cache_control_no_store())
        .body("OK\n"))
}
