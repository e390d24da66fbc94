/// JWT Authentication Middleware
///
/// Validates the access token from the Authorization header and injects the
/// authenticated subject into request extensions for route handlers.

use actix_web::{
    dev::{forward_ready, Service, ServiceRequest, ServiceResponse, Transform},
    Error, HttpMessage,
};
use futures::future::LocalBoxFuture;
use std::rc::Rc;

use crate::auth::{bearer_token, validate_access_token};
use crate::configuration::JwtSettings;

/// Subject of a validated access token, available as
/// `web::ReqData<AuthenticatedSubject>` behind [`JwtMiddleware`]
#[derive(Debug, Clone)]
pub struct AuthenticatedSubject(pub String);

/// JWT middleware for protecting routes
pub struct JwtMiddleware {
    jwt_config: JwtSettings,
}

impl JwtMiddleware {
    pub fn new(jwt_config: JwtSettings) -> Self {
        Self { jwt_config }
    }
}

impl<S, B> Transform<S, ServiceRequest> for JwtMiddleware
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<B>;
    type Error = Error;
    type InitError = ();
    type Transform = JwtMiddlewareService<S>;
    type Future = std::future::Ready<Result<Self::Transform, Self::InitError>>;

    fn new_transform(&self, service: S) -> Self::Future {
        std::future::ready(Ok(JwtMiddlewareService {
            service: Rc::new(service),
            jwt_config: self.jwt_config.clone(),
        }))
    }
}

pub struct JwtMiddlewareService<S> {
    service: Rc<S>,
    jwt_config: JwtSettings,
}

impl<S, B> Service<ServiceRequest> for JwtMiddlewareService<S>
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
        let subject = bearer_token(req.headers())
            .and_then(|token| validate_access_token(&token, self.jwt_config.secret_bytes()));

        match subject {
            Ok(subject) => {
                tracing::debug!(user_id = %subject, "Access token validated");
                req.extensions_mut().insert(AuthenticatedSubject(subject));

                let service = self.service.clone();
                Box::pin(async move { service.call(req).await })
            }
            Err(e) => {
                tracing::warn!(error = %e, path = %req.path(), "Rejected unauthenticated request");
                Box::pin(async move { Err(e.into()) })
            }
        }
    }
}
