use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use service_core::error::AppError;

use crate::dtos::invitation::{InvitationResponse, MemberRequest};
use crate::models::InvitationRole;
use crate::utils::ValidatedJson;
use crate::AppState;

/// Invite a user to become a member
#[utoipa::path(
    post,
    path = "/organizations/{globalid}/members",
    params(("globalid" = String, Path, description = "Organization global id")),
    request_body = MemberRequest,
    responses(
        (status = 201, description = "Invitation created", body = crate::dtos::invitation::InvitationResponse),
        (status = 404, description = "Organization or user not found", body = crate::dtos::ErrorResponse),
        (status = 409, description = "Already a member or owner", body = crate::dtos::ErrorResponse)
    ),
    tag = "Membership",
    security(("access_token" = []))
)]
pub async fn add_member(
    State(state): State<AppState>,
    Path(global_id): Path<String>,
    ValidatedJson(req): ValidatedJson<MemberRequest>,
) -> Result<impl IntoResponse, AppError> {
    let invitation = state
        .invitation_service
        .invite(&global_id, &req.username, InvitationRole::Member)
        .await?;
    Ok((StatusCode::CREATED, Json(InvitationResponse::from(invitation))))
}

#[utoipa::path(
    delete,
    path = "/organizations/{globalid}/members/{username}",
    params(
        ("globalid" = String, Path, description = "Organization global id"),
        ("username" = String, Path, description = "Member to remove")
    ),
    responses(
        (status = 204, description = "Member removed"),
        (status = 404, description = "Organization not found", body = crate::dtos::ErrorResponse)
    ),
    tag = "Membership",
    security(("access_token" = []))
)]
pub async fn remove_member(
    State(state): State<AppState>,
    Path((global_id, username)): Path<(String, String)>,
) -> Result<StatusCode, AppError> {
    state
        .organization_service
        .remove_member(&global_id, &username)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Invite a user to become an owner
#[utoipa::path(
    post,
    path = "/organizations/{globalid}/owners",
    params(("globalid" = String, Path, description = "Organization global id")),
    request_body = MemberRequest,
    responses(
        (status = 201, description = "Invitation created", body = crate::dtos::invitation::InvitationResponse),
        (status = 404, description = "Organization or user not found", body = crate::dtos::ErrorResponse),
        (status = 409, description = "Already an owner", body = crate::dtos::ErrorResponse)
    ),
    tag = "Membership",
    security(("access_token" = []))
)]
pub async fn add_owner(
    State(state): State<AppState>,
    Path(global_id): Path<String>,
    ValidatedJson(req): ValidatedJson<MemberRequest>,
) -> Result<impl IntoResponse, AppError> {
    let invitation = state
        .invitation_service
        .invite(&global_id, &req.username, InvitationRole::Owner)
        .await?;
    Ok((StatusCode::CREATED, Json(InvitationResponse::from(invitation))))
}

/// Remove an owner. The last owner may be removed.
#[utoipa::path(
    delete,
    path = "/organizations/{globalid}/owners/{username}",
    params(
        ("globalid" = String, Path, description = "Organization global id"),
        ("username" = String, Path, description = "Owner to remove")
    ),
    responses(
        (status = 204, description = "Owner removed"),
        (status = 404, description = "Organization not found", body = crate::dtos::ErrorResponse)
    ),
    tag = "Membership",
    security(("access_token" = []))
)]
pub async fn remove_owner(
    State(state): State<AppState>,
    Path((global_id, username)): Path<(String, String)>,
) -> Result<StatusCode, AppError> {
    state
        .organization_service
        .remove_owner(&global_id, &username)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}
