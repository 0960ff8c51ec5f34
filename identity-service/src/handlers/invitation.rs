//! Invitation handlers.
//!
//! Owners list and cancel pending invitations of their organization; the
//! invited user accepts or rejects them under `/users/{username}`.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use service_core::error::AppError;

use crate::dtos::invitation::{InvitationResponse, PendingInvitationResponse};
use crate::models::InvitationRole;
use crate::AppState;

fn parse_role(role: &str) -> Result<InvitationRole, AppError> {
    InvitationRole::parse(role)
        .ok_or_else(|| AppError::BadRequest(anyhow::anyhow!("Unknown role: {}", role)))
}

#[utoipa::path(
    get,
    path = "/organizations/{globalid}/invitations",
    params(("globalid" = String, Path, description = "Organization global id")),
    responses(
        (status = 200, description = "Pending invitations", body = [PendingInvitationResponse]),
        (status = 403, description = "Caller is not an owner", body = crate::dtos::ErrorResponse)
    ),
    tag = "Invitations",
    security(("access_token" = []))
)]
pub async fn list_pending_invitations(
    State(state): State<AppState>,
    Path(global_id): Path<String>,
) -> Result<Json<Vec<PendingInvitationResponse>>, AppError> {
    let invitations = state
        .invitation_service
        .pending_for_organization(&global_id)
        .await?;
    Ok(Json(invitations.into_iter().map(Into::into).collect()))
}

/// Revoke every pending invitation of a user
#[utoipa::path(
    delete,
    path = "/organizations/{globalid}/invitations/{username}",
    params(
        ("globalid" = String, Path, description = "Organization global id"),
        ("username" = String, Path, description = "Invited user")
    ),
    responses(
        (status = 204, description = "Invitations cancelled"),
        (status = 404, description = "No pending invitation", body = crate::dtos::ErrorResponse)
    ),
    tag = "Invitations",
    security(("access_token" = []))
)]
pub async fn cancel_invitation(
    State(state): State<AppState>,
    Path((global_id, username)): Path<(String, String)>,
) -> Result<StatusCode, AppError> {
    state
        .invitation_service
        .cancel(&global_id, &username)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

#[utoipa::path(
    post,
    path = "/users/{username}/organizations/{globalid}/roles/{role}",
    params(
        ("username" = String, Path, description = "Invited user"),
        ("globalid" = String, Path, description = "Organization global id"),
        ("role" = String, Path, description = "member or owner")
    ),
    responses(
        (status = 200, description = "Invitation accepted", body = crate::dtos::invitation::InvitationResponse),
        (status = 404, description = "No pending invitation", body = crate::dtos::ErrorResponse),
        (status = 409, description = "Already an owner", body = crate::dtos::ErrorResponse)
    ),
    tag = "Invitations",
    security(("access_token" = []))
)]
pub async fn accept_invitation(
    State(state): State<AppState>,
    Path((username, global_id, role)): Path<(String, String, String)>,
) -> Result<Json<InvitationResponse>, AppError> {
    let role = parse_role(&role)?;
    let invitation = state
        .invitation_service
        .accept(&global_id, &username, role)
        .await?;
    Ok(Json(invitation.into()))
}

#[utoipa::path(
    delete,
    path = "/users/{username}/organizations/{globalid}/roles/{role}",
    params(
        ("username" = String, Path, description = "Invited user"),
        ("globalid" = String, Path, description = "Organization global id"),
        ("role" = String, Path, description = "member or owner")
    ),
    responses(
        (status = 204, description = "Invitation rejected"),
        (status = 404, description = "No pending invitation", body = crate::dtos::ErrorResponse)
    ),
    tag = "Invitations",
    security(("access_token" = []))
)]
pub async fn reject_invitation(
    State(state): State<AppState>,
    Path((username, global_id, role)): Path<(String, String, String)>,
) -> Result<StatusCode, AppError> {
    let role = parse_role(&role)?;
    state
        .invitation_service
        .reject(&global_id, &username, role)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}
