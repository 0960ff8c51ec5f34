//! Resource protection middleware.
//!
//! Every protected route is wrapped with [`protection_middleware`] through a
//! [`Protection`] that names the kind of resource in the path and the scopes
//! the route requires. Tokens are resolved and membership re-queried on every
//! request.

use std::collections::HashMap;

use axum::{
    extract::{Path, Query, Request, State},
    http::Uri,
    middleware::Next,
    response::Response,
};
use service_core::error::AppError;

use crate::config::TokenSource;
use crate::models::AccessToken;
use crate::services::scope::{delegated_scopes, EffectiveScopes, MembershipRole};
use crate::AppState;

const TOKEN_PREFIX: &str = "token";

/// Kind of resource named by the request path.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProtectedResource {
    /// Organization in the `globalid` path parameter
    Organization,
    /// User in the `username` path parameter
    User,
}

#[derive(Clone)]
pub struct Protection {
    state: AppState,
    resource: ProtectedResource,
    required_scopes: &'static [&'static str],
}

impl Protection {
    pub fn organization(state: AppState, required_scopes: &'static [&'static str]) -> Self {
        Self {
            state,
            resource: ProtectedResource::Organization,
            required_scopes,
        }
    }

    pub fn user(state: AppState, required_scopes: &'static [&'static str]) -> Self {
        Self {
            state,
            resource: ProtectedResource::User,
            required_scopes,
        }
    }
}

/// Strip an optional `token` prefix and surrounding whitespace.
pub fn extract_access_token(raw: &str) -> Option<&str> {
    let trimmed = raw.trim();
    let value = match trimmed.strip_prefix(TOKEN_PREFIX) {
        Some(rest) if rest.is_empty() || rest.starts_with(char::is_whitespace) => rest.trim(),
        _ => trimmed,
    };
    (!value.is_empty()).then_some(value)
}

fn token_from_query(uri: &Uri, field: &str) -> Option<String> {
    let Query(params) = Query::<HashMap<String, String>>::try_from_uri(uri).ok()?;
    params
        .get(field)
        .and_then(|raw| extract_access_token(raw))
        .map(str::to_string)
}

fn token_from_request(req: &Request, source: TokenSource, field: &str) -> Option<String> {
    match source {
        TokenSource::Headers => req
            .headers()
            .get(field)
            .and_then(|value| value.to_str().ok())
            .and_then(extract_access_token)
            .map(str::to_string),
        TokenSource::QueryParameters => token_from_query(req.uri(), field),
    }
}

pub async fn protection_middleware(
    State(protection): State<Protection>,
    path: Option<Path<HashMap<String, String>>>,
    req: Request,
    next: Next,
) -> Result<Response, AppError> {
    let state = &protection.state;
    let security = &state.config.security;

    let Some(raw_token) = token_from_request(&req, security.token_source, &security.token_field)
    else {
        tracing::debug!(path = %req.uri().path(), "Request without access token");
        return Err(AppError::Unauthorized(anyhow::anyhow!(
            "Missing access token"
        )));
    };

    let token = state
        .tokens
        .resolve(&raw_token)
        .await
        .map_err(|e| {
            tracing::error!(error = %e, "Access token resolution failed");
            AppError::InternalError(anyhow::anyhow!("Access token resolution failed"))
        })?
        .ok_or_else(|| AppError::Unauthorized(anyhow::anyhow!("Invalid or expired access token")))?;

    let params = path.map(|Path(params)| params).unwrap_or_default();
    let scopes = match protection.resource {
        ProtectedResource::Organization => {
            organization_scopes(state, &token, params.get("globalid").map(String::as_str)).await?
        }
        ProtectedResource::User => user_scopes(&token, params.get("username").map(String::as_str)),
    };

    if !scopes.allows(protection.required_scopes) {
        tracing::warn!(
            username = %token.username,
            client_id = %token.client_id,
            required = ?protection.required_scopes,
            granted = ?scopes,
            "Insufficient scopes"
        );
        return Err(AppError::Forbidden(anyhow::anyhow!("Insufficient scopes")));
    }

    Ok(next.run(req).await)
}

async fn organization_scopes(
    state: &AppState,
    token: &AccessToken,
    global_id: Option<&str>,
) -> Result<EffectiveScopes, AppError> {
    let Some(global_id) = global_id else {
        return Ok(EffectiveScopes::single(token.scope.clone()));
    };
    if token.is_issued_for(global_id) {
        return Ok(EffectiveScopes::single(token.scope.clone()));
    }

    let role = membership_role(state, global_id, &token.username)
        .await
        .map_err(|e| {
            tracing::error!(globalid = %global_id, error = %e, "Membership lookup failed");
            AppError::InternalError(anyhow::anyhow!("Membership lookup failed"))
        })?;

    Ok(delegated_scopes(
        token,
        role,
        &state.config.security.admin_client_id,
    ))
}

async fn membership_role(
    state: &AppState,
    global_id: &str,
    username: &str,
) -> Result<MembershipRole, crate::services::StoreError> {
    if state.organizations.is_owner(global_id, username).await? {
        return Ok(MembershipRole::Owner);
    }
    if state.organizations.is_member(global_id, username).await? {
        return Ok(MembershipRole::Member);
    }
    Ok(MembershipRole::None)
}

fn user_scopes(token: &AccessToken, username: Option<&str>) -> EffectiveScopes {
    match username {
        Some(username) if username == token.username => {
            EffectiveScopes::single(token.scope.clone())
        }
        _ => EffectiveScopes::empty(),
    }
}
