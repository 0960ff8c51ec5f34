//! Organization handlers: creation, reads, updates and the hierarchy tree.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use service_core::error::AppError;

use crate::dtos::organization::{CreateOrganizationRequest, UpdateOrganizationRequest};
use crate::models::Organization;
use crate::services::OrganizationTreeNode;
use crate::utils::ValidatedJson;
use crate::AppState;

/// Create a root organization
#[utoipa::path(
    post,
    path = "/organizations",
    request_body = CreateOrganizationRequest,
    responses(
        (status = 201, description = "Organization created", body = Organization),
        (status = 400, description = "Invalid global id", body = crate::dtos::ErrorResponse),
        (status = 401, description = "Missing or invalid access token", body = crate::dtos::ErrorResponse),
        (status = 409, description = "Organization already exists", body = crate::dtos::ErrorResponse),
        (status = 500, description = "Internal server error", body = crate::dtos::ErrorResponse)
    ),
    tag = "Organizations",
    security(("access_token" = []))
)]
#[tracing::instrument(skip(state, req), fields(globalid = %req.globalid))]
pub async fn create_organization(
    State(state): State<AppState>,
    ValidatedJson(req): ValidatedJson<CreateOrganizationRequest>,
) -> Result<impl IntoResponse, AppError> {
    let organization = state.organization_service.create_root(req.into()).await?;
    Ok((StatusCode::CREATED, Json(organization)))
}

/// Create a sub-organization under an existing organization
#[utoipa::path(
    post,
    path = "/organizations/{globalid}/suborganizations",
    params(("globalid" = String, Path, description = "Parent organization global id")),
    request_body = CreateOrganizationRequest,
    responses(
        (status = 201, description = "Sub-organization created", body = Organization),
        (status = 400, description = "Global id does not extend the parent", body = crate::dtos::ErrorResponse),
        (status = 403, description = "Caller is not an owner of the parent", body = crate::dtos::ErrorResponse),
        (status = 404, description = "Parent organization not found", body = crate::dtos::ErrorResponse),
        (status = 409, description = "Organization already exists", body = crate::dtos::ErrorResponse)
    ),
    tag = "Organizations",
    security(("access_token" = []))
)]
#[tracing::instrument(skip(state, req), fields(globalid = %req.globalid))]
pub async fn create_sub_organization(
    State(state): State<AppState>,
    Path(parent): Path<String>,
    ValidatedJson(req): ValidatedJson<CreateOrganizationRequest>,
) -> Result<impl IntoResponse, AppError> {
    let organization = state
        .organization_service
        .create_sub(&parent, req.into())
        .await?;
    Ok((StatusCode::CREATED, Json(organization)))
}

#[utoipa::path(
    get,
    path = "/organizations/{globalid}",
    params(("globalid" = String, Path, description = "Organization global id")),
    responses(
        (status = 200, description = "Organization", body = Organization),
        (status = 403, description = "Insufficient scopes", body = crate::dtos::ErrorResponse),
        (status = 404, description = "Organization not found", body = crate::dtos::ErrorResponse)
    ),
    tag = "Organizations",
    security(("access_token" = []))
)]
pub async fn get_organization(
    State(state): State<AppState>,
    Path(global_id): Path<String>,
) -> Result<Json<Organization>, AppError> {
    Ok(Json(state.organization_service.get(&global_id).await?))
}

/// Replace the public keys and DNS names of an organization
#[utoipa::path(
    put,
    path = "/organizations/{globalid}",
    params(("globalid" = String, Path, description = "Organization global id")),
    request_body = UpdateOrganizationRequest,
    responses(
        (status = 200, description = "Organization updated", body = Organization),
        (status = 400, description = "Invalid DNS name", body = crate::dtos::ErrorResponse),
        (status = 403, description = "Global id cannot be changed", body = crate::dtos::ErrorResponse),
        (status = 404, description = "Organization not found", body = crate::dtos::ErrorResponse)
    ),
    tag = "Organizations",
    security(("access_token" = []))
)]
#[tracing::instrument(skip(state, req))]
pub async fn update_organization(
    State(state): State<AppState>,
    Path(global_id): Path<String>,
    ValidatedJson(req): ValidatedJson<UpdateOrganizationRequest>,
) -> Result<Json<Organization>, AppError> {
    let organization = state
        .organization_service
        .update(
            &global_id,
            req.globalid.as_deref(),
            req.public_keys,
            req.dns,
        )
        .await?;
    Ok(Json(organization))
}

/// Ancestors and descendants of an organization as a tree
#[utoipa::path(
    get,
    path = "/organizations/{globalid}/tree",
    params(("globalid" = String, Path, description = "Organization global id")),
    responses(
        (status = 200, description = "Organization tree", body = OrganizationTreeNode),
        (status = 404, description = "No organization in the hierarchy", body = crate::dtos::ErrorResponse),
        (status = 500, description = "Inconsistent hierarchy", body = crate::dtos::ErrorResponse)
    ),
    tag = "Organizations",
    security(("access_token" = []))
)]
pub async fn get_organization_tree(
    State(state): State<AppState>,
    Path(global_id): Path<String>,
) -> Result<Json<OrganizationTreeNode>, AppError> {
    Ok(Json(state.hierarchy.resolve(&global_id).await?))
}
