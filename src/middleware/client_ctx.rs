//! Per-request view of the visitor: who they are, their CSRF token, any
//! pending flash message and the CSP nonce for this page.

use crate::role::{ADMIN, SUPERVISOR};
use crate::user::Profile;
use actix_session::Session;
use actix_web::dev::{
    self, Extensions, Payload, Service, ServiceRequest, ServiceResponse, Transform,
};
use actix_web::http::header::{self, HeaderValue};
use actix_web::{web::Data, Error, FromRequest, HttpMessage, HttpRequest};
use futures::future::{ready, LocalBoxFuture, Ready};
use std::rc::Rc;
use std::time::{Duration, Instant};

#[derive(Clone, Debug)]
pub struct ClientCtxInner {
    /// None for guests, including respondents taking a public survey.
    pub client: Option<Profile>,
    pub nonce: String,
    pub csrf_token: String,
    /// One-shot message left by the previous request.
    pub flash: Option<String>,
    pub request_start: Instant,
}

impl Default for ClientCtxInner {
    fn default() -> Self {
        Self {
            client: None,
            nonce: Self::nonce(),
            csrf_token: String::new(),
            flash: None,
            request_start: Instant::now(),
        }
    }
}

impl ClientCtxInner {
    pub async fn from_session(session: &Session) -> Self {
        use crate::middleware::csrf::get_or_create_csrf_token;
        use crate::middleware::flash::take_flash;
        use crate::session::authenticate_client_by_session;

        let client = authenticate_client_by_session(session).await;
        let csrf_token = get_or_create_csrf_token(session).unwrap_or_else(|_| String::new());
        let flash = take_flash(session);

        ClientCtxInner {
            client,
            csrf_token,
            flash,
            ..Default::default()
        }
    }

    /// Fresh value for the `script-src 'nonce-…'` directive.
    pub fn nonce() -> String {
        let seed: [u8; 32] = rand::random();
        blake3::hash(&seed).to_hex()[..32].to_owned()
    }
}

/// Extractor handed to every handler. The middleware fills it in before
/// routing; handlers only read it.
#[derive(Clone, Debug)]
pub struct ClientCtx(Data<ClientCtxInner>);

impl Default for ClientCtx {
    fn default() -> Self {
        Self(Data::new(ClientCtxInner::default()))
    }
}

impl ClientCtx {
    /// Builds a context around a known profile, e.g. right after logout.
    pub fn from_profile(client: Option<Profile>) -> Self {
        Self(Data::new(ClientCtxInner {
            client,
            ..Default::default()
        }))
    }

    pub fn get_or_default_from_extensions(extensions: &mut Extensions) -> Self {
        match extensions.get::<Data<ClientCtxInner>>() {
            Some(cbox) => Self(cbox.clone()),
            None => {
                let cbox = Data::new(ClientCtxInner::default());
                extensions.insert(cbox.clone());
                Self(cbox)
            }
        }
    }

    pub fn get_id(&self) -> Option<i32> {
        self.0.client.as_ref().map(|u| u.id)
    }

    /// Display name for the header, "Guest" when logged out.
    pub fn get_name(&self) -> String {
        match &self.0.client {
            Some(user) => user.name.to_owned(),
            None => "Guest".to_owned(),
        }
    }

    pub fn get_csrf_token(&self) -> &str {
        &self.0.csrf_token
    }

    pub fn get_flash(&self) -> Option<&str> {
        self.0.flash.as_deref()
    }

    pub fn get_nonce(&self) -> &String {
        &self.0.nonce
    }

    pub fn is_user(&self) -> bool {
        self.0.client.is_some()
    }

    pub fn has_role(&self, role: &str) -> bool {
        self.0
            .client
            .as_ref()
            .map(|u| u.has_role(role))
            .unwrap_or(false)
    }

    pub fn is_admin(&self) -> bool {
        self.has_role(ADMIN)
    }

    /// Admins and supervisors may read the analytics dashboard.
    pub fn can_view_dashboard(&self) -> bool {
        self.is_admin() || self.has_role(SUPERVISOR)
    }

    /// Owners and admins may edit, delete and export a survey.
    pub fn can_manage_survey(&self, creator_id: i32) -> bool {
        self.is_admin() || self.get_id() == Some(creator_id)
    }

    /// Render time shown in the footer.
    pub fn request_time_as_string(&self) -> String {
        let elapsed: Duration = self.0.request_start.elapsed();
        match elapsed.as_millis() {
            0..=4 => format!("{}μs", elapsed.as_micros()),
            ms => format!("{}ms", ms),
        }
    }

    /// 401 for guests, otherwise the user id.
    pub fn require_login(&self) -> Result<i32, actix_web::Error> {
        self.get_id()
            .ok_or_else(|| actix_web::error::ErrorUnauthorized("Login required"))
    }

    /// Require the Admin role.
    pub fn require_admin(&self) -> Result<i32, actix_web::Error> {
        let user_id = self.require_login()?;
        if !self.is_admin() {
            return Err(actix_web::error::ErrorForbidden("Insufficient permissions"));
        }
        Ok(user_id)
    }

    pub fn require_dashboard(&self) -> Result<i32, actix_web::Error> {
        let user_id = self.require_login()?;
        if !self.can_view_dashboard() {
            return Err(actix_web::error::ErrorForbidden("Insufficient permissions"));
        }
        Ok(user_id)
    }

    /// Require ownership of a survey or the Admin role.
    pub fn require_survey_manager(&self, creator_id: i32) -> Result<i32, actix_web::Error> {
        let user_id = self.require_login()?;
        if !self.can_manage_survey(creator_id) {
            return Err(actix_web::error::ErrorForbidden(
                "You don't have access to this survey",
            ));
        }
        Ok(user_id)
    }
}

impl FromRequest for ClientCtx {
    type Error = Error;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _: &mut Payload) -> Self::Future {
        ready(Ok(ClientCtx::get_or_default_from_extensions(
            &mut req.extensions_mut(),
        )))
    }
}

impl<S: 'static, B> Transform<S, ServiceRequest> for ClientCtx
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error>,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<B>;
    type Error = Error;
    type InitError = ();
    type Transform = ClientCtxMiddleware<S>;
    type Future = Ready<Result<Self::Transform, Self::InitError>>;

    fn new_transform(&self, service: S) -> Self::Future {
        ready(Ok(ClientCtxMiddleware {
            service: Rc::new(service),
        }))
    }
}

/// Scripts run only when they carry the request nonce.
fn content_security_policy(nonce: &str) -> String {
    format!(
        "script-src 'nonce-{}' 'strict-dynamic'; object-src 'none'; base-uri 'self'",
        nonce
    )
}

pub struct ClientCtxMiddleware<S> {
    service: Rc<S>,
}

impl<S, B> Service<ServiceRequest> for ClientCtxMiddleware<S>
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<B>;
    type Error = Error;
    type Future = LocalBoxFuture<'static, Result<Self::Response, Self::Error>>;

    dev::forward_ready!(service);

    fn call(&self, req: ServiceRequest) -> Self::Future {
        let svc = self.service.clone();

        // The session extractor needs the bare HttpRequest.
        let (httpreq, payload) = req.into_parts();
        let session = Session::extract(&httpreq).into_inner();
        let req = ServiceRequest::from_parts(httpreq, payload);

        Box::pin(async move {
            let inner = match session {
                Ok(session) => ClientCtxInner::from_session(&session).await,
                Err(err) => {
                    log::error!("ClientCtx: cookie session unavailable: {}", err);
                    ClientCtxInner::default()
                }
            };
            let policy = content_security_policy(&inner.nonce);
            req.extensions_mut().insert(Data::new(inner));

            let mut res = svc.call(req).await?;
            match HeaderValue::from_str(&policy) {
                Ok(value) => {
                    res.headers_mut()
                        .insert(header::CONTENT_SECURITY_POLICY, value);
                }
                Err(e) => log::error!("Invalid Content-Security-Policy value: {}", e),
            }
            Ok(res)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn profile(id: i32, roles: &[&str]) -> Profile {
        Profile {
            id,
            name: format!("user{}", id),
            email: None,
            created_at: chrono::Utc::now().naive_utc(),
            roles: roles.iter().map(|r| r.to_string()).collect(),
        }
    }

    #[test]
    fn test_guest_has_no_access() {
        let ctx = ClientCtx::from_profile(None);
        assert!(!ctx.is_user());
        assert_eq!(ctx.get_name(), "Guest");
        assert!(ctx.require_login().is_err());
        assert!(!ctx.can_manage_survey(1));
        assert!(!ctx.can_view_dashboard());
    }

    #[test]
    fn test_owner_manages_own_survey_only() {
        let ctx = ClientCtx::from_profile(Some(profile(3, &[])));
        assert!(ctx.can_manage_survey(3));
        assert!(!ctx.can_manage_survey(4));
        assert!(ctx.require_survey_manager(4).is_err());
        assert!(ctx.require_admin().is_err());
    }

    #[test]
    fn test_admin_manages_every_survey() {
        let ctx = ClientCtx::from_profile(Some(profile(1, &[ADMIN])));
        assert!(ctx.can_manage_survey(99));
        assert!(ctx.can_view_dashboard());
        assert_eq!(ctx.require_admin().unwrap(), 1);
    }

    #[test]
    fn test_supervisor_sees_dashboard_but_not_admin() {
        let ctx = ClientCtx::from_profile(Some(profile(2, &[SUPERVISOR])));
        assert!(ctx.can_view_dashboard());
        assert!(!ctx.is_admin());
        assert!(!ctx.can_manage_survey(5));
    }

    #[test]
    fn test_nonce_differs_between_requests() {
        assert_ne!(ClientCtxInner::nonce(), ClientCtxInner::nonce());
    }
}
