//! Error pages rendered by the `ErrorHandlers` middleware.

use crate::middleware::ClientCtx;
use actix_web::body::BoxBody;
use actix_web::dev::ServiceResponse;
use actix_web::http::StatusCode;
use actix_web::middleware::ErrorHandlerResponse;
use actix_web::{HttpMessage, HttpResponse, Result};
use askama::Template;

#[derive(Template)]
#[template(path = "error.html")]
struct ErrorTemplate {
    client: ClientCtx,
    status: u16,
    title: &'static str,
    message: String,
    login_link: bool,
}

fn title_for(status: StatusCode) -> &'static str {
    match status {
        StatusCode::BAD_REQUEST => "Bad Request",
        StatusCode::UNAUTHORIZED => "Login Required",
        StatusCode::FORBIDDEN => "Access Denied",
        StatusCode::NOT_FOUND => "Not Found",
        _ => "Server Error",
    }
}

fn default_message(status: StatusCode) -> &'static str {
    match status {
        StatusCode::BAD_REQUEST => "The request could not be understood.",
        StatusCode::UNAUTHORIZED => "Please log in to continue.",
        StatusCode::FORBIDDEN => "You don't have access to this page.",
        StatusCode::NOT_FOUND => "The page you were looking for does not exist.",
        _ => "Something went wrong. Please try again later.",
    }
}

fn render<B>(res: ServiceResponse<B>) -> Result<ErrorHandlerResponse<B>> {
    let status = res.status();
    // Errors raised by handlers carry their own text; anything else gets a stock line.
    let message = res
        .response()
        .error()
        .map(|e| e.to_string())
        .filter(|m| !m.is_empty())
        .unwrap_or_else(|| default_message(status).to_owned());

    let (req, _) = res.into_parts();
    let client = ClientCtx::get_or_default_from_extensions(&mut req.extensions_mut());

    let page = ErrorTemplate {
        client,
        status: status.as_u16(),
        title: title_for(status),
        message,
        login_link: status == StatusCode::UNAUTHORIZED,
    };
    let response: HttpResponse<BoxBody> = match page.render() {
        Ok(body) => HttpResponse::build(status)
            .content_type("text/html; charset=utf-8")
            .body(body),
        Err(e) => {
            log::error!("Unable to render error page: {}", e);
            HttpResponse::build(status)
                .content_type("text/plain; charset=utf-8")
                .body(default_message(status))
        }
    };

    Ok(ErrorHandlerResponse::Response(
        ServiceResponse::new(req, response).map_into_right_body(),
    ))
}

pub fn render_400<B>(res: ServiceResponse<B>) -> Result<ErrorHandlerResponse<B>> {
    render(res)
}

pub fn render_401<B>(res: ServiceResponse<B>) -> Result<ErrorHandlerResponse<B>> {
    render(res)
}

pub fn render_403<B>(res: ServiceResponse<B>) -> Result<ErrorHandlerResponse<B>> {
    render(res)
}

pub fn render_404<B>(res: ServiceResponse<B>) -> Result<ErrorHandlerResponse<B>> {
    render(res)
}

pub fn render_500<B>(res: ServiceResponse<B>) -> Result<ErrorHandlerResponse<B>> {
    render(res)
}
