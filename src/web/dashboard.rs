use crate::app_config;
use crate::db::get_db_pool;
use crate::middleware::csrf::validate_csrf_token;
use crate::middleware::ClientCtx;
use crate::pdf::dashboard::dashboard_pdf;
use crate::survey::dashboard::{load_dashboard, Dashboard, Period};
use crate::web::{internal_error, pdf_attachment};
use actix_web::{get, post, web, Error, HttpResponse, Responder};
use askama::Template;
use askama_actix::TemplateToResponse;
use chrono::Utc;
use serde::Deserialize;

pub(super) fn configure(conf: &mut actix_web::web::ServiceConfig) {
    conf.service(view_dashboard).service(export_dashboard);
}

pub struct PeriodChoice {
    pub value: &'static str,
    pub label: &'static str,
    pub selected: bool,
}

#[derive(Template)]
#[template(path = "dashboard.html")]
pub struct DashboardTemplate {
    pub client: ClientCtx,
    pub dash: Dashboard,
    pub periods: Vec<PeriodChoice>,
}

#[derive(Deserialize)]
pub struct PeriodQuery {
    period: Option<String>,
}

#[derive(Deserialize)]
pub struct ExportForm {
    period: Option<String>,
    csrf_token: String,
}

fn period_of(value: &Option<String>) -> Period {
    value.as_deref().map(Period::parse).unwrap_or_default()
}

#[get("/dashboard")]
pub async fn view_dashboard(
    client: ClientCtx,
    query: web::Query<PeriodQuery>,
) -> Result<impl Responder, Error> {
    client.require_dashboard()?;

    let period = period_of(&query.period);
    let dash = load_dashboard(
        get_db_pool(),
        period,
        Utc::now().naive_utc(),
        &app_config::limits(),
    )
    .await
    .map_err(|e| internal_error("view_dashboard", e))?;

    let periods = [Period::Weekly, Period::Monthly, Period::Yearly]
        .iter()
        .map(|p| PeriodChoice {
            value: p.as_str(),
            label: p.label(),
            selected: *p == period,
        })
        .collect();

    Ok(DashboardTemplate {
        client,
        dash,
        periods,
    }
    .to_response())
}

#[post("/dashboard/pdf")]
pub async fn export_dashboard(
    client: ClientCtx,
    cookies: actix_session::Session,
    form: web::Form<ExportForm>,
) -> Result<HttpResponse, Error> {
    client.require_dashboard()?;
    validate_csrf_token(&cookies, &form.csrf_token)?;

    let now = Utc::now().naive_utc();
    let dash = load_dashboard(get_db_pool(), period_of(&form.period), now, &app_config::limits())
        .await
        .map_err(|e| internal_error("export_dashboard", e))?;
    let (filename, bytes) =
        dashboard_pdf(&dash, now).map_err(|e| internal_error("export_dashboard", e))?;

    Ok(pdf_attachment(&filename, bytes))
}
