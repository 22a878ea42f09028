use std::future::{ready, Ready};

use actix_web::{
    dev::{forward_ready, Service, ServiceRequest, ServiceResponse, Transform},
    web, Error, HttpMessage,
};
use futures_util::future::LocalBoxFuture;
use jsonwebtoken::{decode, DecodingKey, Validation};

use crate::{error::AppError, models::Claims, AppState};

/// Decodes the bearer access token when one is present and attaches the
/// caller identity to the request. Requests without credentials pass through
/// anonymously; handlers that mutate state reject them. Invalid or expired
/// tokens are rejected here with 401.
#[derive(Clone)]
pub struct ExtractIdentity {
    app_data: web::Data<AppState>,
}

impl ExtractIdentity {
    pub fn new(app_data: web::Data<AppState>) -> Self {
        Self { app_data }
    }
}

impl<S, B> Transform<S, ServiceRequest> for ExtractIdentity
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error>,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<B>;
    type Error = Error;
    type InitError = ();
    type Transform = ExtractIdentityMiddleware<S>;
    type Future = Ready<Result<Self::Transform, Self::InitError>>;

    fn new_transform(&self, service: S) -> Self::Future {
        ready(Ok(ExtractIdentityMiddleware {
            service,
            app_data: self.app_data.clone(),
        }))
    }
}

pub struct ExtractIdentityMiddleware<S> {
    service: S,
    app_data: web::Data<AppState>,
}

impl<S, B> Service<ServiceRequest> for ExtractIdentityMiddleware<S>
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error>,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<B>;
    type Error = Error;
    type Future = LocalBoxFuture<'static, Result<Self::Response, Self::Error>>;

    forward_ready!(service);

    fn call(&self, req: ServiceRequest) -> Self::Future {
        let auth_header = req
            .headers()
            .get("authorization")
            .and_then(|h| h.to_str().ok())
            .and_then(|s| s.strip_prefix("Bearer ").map(str::to_owned));

        if let Some(token) = auth_header {
            match decode::<Claims>(
                &token,
                &DecodingKey::from_secret(self.app_data.jwt_access_secret.as_bytes()),
                &Validation::default(),
            ) {
                Ok(data) => {
                    req.extensions_mut().insert(data.claims.user.clone());
                    let fut = self.service.call(req);
                    Box::pin(async move { fut.await })
                }
                Err(_) => Box::pin(async { Err(AppError::Unauthenticated.into()) }),
            }
        } else {
            let fut = self.service.call(req);
            Box::pin(async move { fut.await })
        }
    }
}
