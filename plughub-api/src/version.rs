use actix_web::{HttpResponse, web};
use serde::Serialize;

use crate::config::Config;
use crate::{CARGO_NAME, CARGO_VERSION, ServerResult, cache_control_no_store};

#[derive(Serialize)]
struct Version<'a> {
    name: &'a str,
    version: &'a str,
    /// Generation id of the snapshot being served.
    generation: &'a str,
}

pub(crate) async fn get(settings: web::Data<Config>) -> ServerResult {
    let catalog = settings.catalog()?;
    Ok(HttpResponse::Ok()
        .insert_header(cache_control_no_store())
        .json(Version {
            name: CARGO_NAME,
            version: CARGO_VERSION,
            generation: catalog.generation(),
        }))
}
