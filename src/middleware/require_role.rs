//! Authorization gate.
//!
//! A pure predicate over the principal the authentication gate attached:
//! allow when the principal's role is in the declared set. A missing
//! principal is `Unauthenticated` (401), not `Forbidden` (403) — the two
//! outcomes stay distinguishable so a client can tell "log in first"
//! apart from "you may not do this".

use std::rc::Rc;

use actix_web::{
    dev::{forward_ready, Service, ServiceRequest, ServiceResponse, Transform},
    Error, HttpMessage,
};
use futures::future::LocalBoxFuture;

use crate::accounts::{Principal, Role};
use crate::error::AppError;

pub struct RequireRole {
    allowed: Vec<Role>,
}

impl RequireRole {
    pub fn new(allowed: &[Role]) -> Self {
        Self {
            allowed: allowed.to_vec(),
        }
    }
}

impl<S, B> Transform<S, ServiceRequest> for RequireRole
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<B>;
    type Error = Error;
    type InitError = ();
    type Transform = RequireRoleService<S>;
    type Future = std::future::Ready<Result<Self::Transform, Self::InitError>>;

    fn new_transform(&self, service: S) -> Self::Future {
        std::future::ready(Ok(RequireRoleService {
            service: Rc::new(service),
            allowed: self.allowed.clone(),
        }))
    }
}

pub struct RequireRoleService<S> {
    service: Rc<S>,
    allowed: Vec<Role>,
}

impl<S, B> Service<ServiceRequest> for RequireRoleService<S>
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
        let decision = match req.extensions().get::<Principal>() {
            None => {
                tracing::warn!("Authorization failed: no principal on request");
                Err(AppError::Unauthenticated)
            }
            Some(principal) if !self.allowed.contains(&principal.role) => {
                tracing::warn!(
                    account_id = %principal.id,
                    role = principal.role.as_str(),
                    "Authorization failed: role not permitted"
                );
                Err(AppError::Forbidden)
            }
            Some(_) => Ok(()),
        };

        match decision {
            Err(err) => Box::pin(async move { Err(err.into()) }),
            Ok(()) => {
                let service = Rc::clone(&self.service);
                Box::pin(async move { service.call(req).await })
            }
        }
    }
}
