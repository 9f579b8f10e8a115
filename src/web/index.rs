use crate::middleware::ClientCtx;
use actix_web::{get, Responder};
use askama_actix::{Template, TemplateToResponse};

pub(super) fn configure(conf: &mut actix_web::web::ServiceConfig) {
    conf.service(view_index);
}

#[derive(Template)]
#[template(path = "index.html")]
struct IndexTemplate {
    client: ClientCtx,
    site_name: String,
    description: String,
}

#[get("/")]
pub async fn view_index(client: ClientCtx) -> impl Responder {
    let site = crate::app_config::site();
    IndexTemplate {
        client,
        site_name: site.name,
        description: site.description,
    }
    .to_response()
}
