//! Authentication gate.
//!
//! Mandatory middleware for every route that serves an authenticated
//! client. Per request: extract the session token through the configured
//! transport, validate signature and expiry, resolve the account, and
//! attach the resulting [`Principal`] to the request extensions. A miss
//! at any step ends the request with a generic 401; downstream handlers
//! never see a half-authenticated request.

use std::rc::Rc;
use std::sync::Arc;

use actix_web::{
    dev::{forward_ready, Service, ServiceRequest, ServiceResponse, Transform},
    Error, HttpMessage,
};
use futures::future::LocalBoxFuture;

use crate::accounts::{AccountStore, Principal};
use crate::auth::{transport::SessionTransport, validate_session_token};
use crate::configuration::AuthSettings;
use crate::error::AppError;

pub struct AuthenticationGate {
    settings: AuthSettings,
    store: Arc<dyn AccountStore>,
    transport: Arc<dyn SessionTransport>,
}

impl AuthenticationGate {
    pub fn new(
        settings: AuthSettings,
        store: Arc<dyn AccountStore>,
        transport: Arc<dyn SessionTransport>,
    ) -> Self {
        Self {
            settings,
            store,
            transport,
        }
    }
}

impl<S, B> Transform<S, ServiceRequest> for AuthenticationGate
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<B>;
    type Error = Error;
    type InitError = ();
    type Transform = AuthenticationGateService<S>;
    type Future = std::future::Ready<Result<Self::Transform, Self::InitError>>;

    fn new_transform(&self, service: S) -> Self::Future {
        std::future::ready(Ok(AuthenticationGateService {
            service: Rc::new(service),
            settings: self.settings.clone(),
            store: Arc::clone(&self.store),
            transport: Arc::clone(&self.transport),
        }))
    }
}

pub struct AuthenticationGateService<S> {
    service: Rc<S>,
    settings: AuthSettings,
    store: Arc<dyn AccountStore>,
    transport: Arc<dyn SessionTransport>,
}

impl<S, B> Service<ServiceRequest> for AuthenticationGateService<S>
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<B>;
    type Error = Error;
    type Future = LocalBoxFuture<'static, Result<Self::Response, Self::Error>>;

    forward_ready!(service);

    fn call(&self, req: ServiceRequest) -> Self::Future {
        let settings = self.settings.clone();
        let store = Arc::clone(&self.store);
        let transport = Arc::clone(&self.transport);
        let service = Rc::clone(&self.service);

        Box::pin(async move {
            let token = match transport.extract(&req) {
                Some(token) => token,
                None => {
                    tracing::warn!("Authentication failed: no token provided");
                    return Err(AppError::Unauthenticated.into());
                }
            };

            let claims = validate_session_token(&token, &settings)?;
            // A malformed subject is a token defect like any other.
            let account_id = claims.account_id().map_err(|_| {
                tracing::warn!("Authentication failed: malformed token subject");
                AppError::Unauthenticated
            })?;

            // A valid token for a deleted account is still a rejection.
            let account = store
                .find_by_id(account_id)
                .await?
                .ok_or(AppError::Unauthenticated)?;

            tracing::debug!(account_id = %account.id, "Authenticated principal resolved");
            req.extensions_mut().insert(Principal::from(&account));

            service.call(req).await
        })
    }
}
