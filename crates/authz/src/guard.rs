//! Extractors that authenticate the bearer token and enforce roles.
//!
//! Both read [`JwtKeys`] from the request extensions, installed by the router builder.

use std::sync::Arc;

use axum::extract::FromRequestParts;
use axum::http::{header::AUTHORIZATION, request::Parts};
use bookshelf_http::error::AppError;

use crate::{Claims, JwtKeys, Role};

/// An authenticated caller
#[derive(Debug, Clone)]
pub struct Principal(pub Claims);

impl Principal {
    pub fn email(&self) -> &str {
        &self.0.sub
    }

    pub fn require(&self, role: Role) -> Result<(), AppError> {
        if self.0.has_role(role) {
            Ok(())
        } else {
            tracing::debug!(user = %self.0.sub, required = role.as_str(), "role check failed");
            Err(AppError::forbidden(format!(
                "{} is required for this operation",
                role.as_str()
            )))
        }
    }
}

impl<S> FromRequestParts<S> for Principal
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let keys = parts
            .extensions
            .get::<Arc<JwtKeys>>()
            .cloned()
            .ok_or_else(|| anyhow::anyhow!("JWT keys are not installed on the router"))?;

        let token = parts
            .headers
            .get(AUTHORIZATION)
            .and_then(|value| value.to_str().ok())
            .and_then(|value| value.strip_prefix("Bearer "))
            .ok_or_else(|| AppError::unauthorized("missing bearer token"))?;

        let claims = keys.verify(token.trim()).map_err(|e| {
            tracing::debug!(error = %e, "bearer token rejected");
            AppError::unauthorized("invalid or expired token")
        })?;

        Ok(Principal(claims))
    }
}

/// A caller holding `ROLE_ADMIN`; anyone else gets 403
#[derive(Debug, Clone)]
pub struct AdminPrincipal(pub Principal);

impl<S> FromRequestParts<S> for AdminPrincipal
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let principal = Principal::from_request_parts(parts, state).await?;
        principal.require(Role::Admin)?;
        Ok(AdminPrincipal(principal))
    }
}
