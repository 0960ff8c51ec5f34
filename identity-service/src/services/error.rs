use mongodb::error::{ErrorKind, WriteFailure};
use service_core::error::AppError;
use thiserror::Error;

/// MongoDB server code for a unique index violation.
const DUPLICATE_KEY_CODE: i32 = 11000;

/// Failure reported by a store adapter.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Duplicate key")]
    Duplicate,

    #[error("Database error: {0}")]
    Database(mongodb::error::Error),

    #[error("Store error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl From<mongodb::error::Error> for StoreError {
    fn from(err: mongodb::error::Error) -> Self {
        if is_duplicate_key(&err) {
            StoreError::Duplicate
        } else {
            StoreError::Database(err)
        }
    }
}

fn is_duplicate_key(err: &mongodb::error::Error) -> bool {
    match err.kind.as_ref() {
        ErrorKind::Write(WriteFailure::WriteError(write_error)) => {
            write_error.code == DUPLICATE_KEY_CODE
        }
        ErrorKind::BulkWrite(failure) => failure
            .write_errors
            .as_ref()
            .map(|errors| errors.iter().any(|e| e.code == DUPLICATE_KEY_CODE))
            .unwrap_or(false),
        ErrorKind::Command(command_error) => command_error.code == DUPLICATE_KEY_CODE,
        _ => false,
    }
}

/// Domain error raised by the identity services.
#[derive(Debug, Error)]
pub enum ServiceError {
    #[error("Organization not found: {0}")]
    OrganizationNotFound(String),

    #[error("User not found: {0}")]
    UserNotFound(String),

    #[error("No pending invitation for {user} in {organization}")]
    InvitationNotFound { organization: String, user: String },

    #[error("Invitation already pending for {user} in {organization}")]
    InvitationPending { organization: String, user: String },

    #[error("Organization already exists: {0}")]
    DuplicateOrganization(String),

    #[error("User {user} is already a member of {organization}")]
    AlreadyMember { organization: String, user: String },

    #[error("User {user} is already an owner of {organization}")]
    AlreadyOwner { organization: String, user: String },

    #[error("{0}")]
    Validation(String),

    #[error("Changing the global id is not allowed")]
    GlobalIdChanged,

    #[error("Inconsistent organization data: {0}")]
    Inconsistent(String),

    #[error("Missing shared secret: {0}")]
    MissingSecret(String),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("Internal error: {0}")]
    Internal(anyhow::Error),
}

impl From<ServiceError> for AppError {
    fn from(err: ServiceError) -> Self {
        match err {
            ServiceError::OrganizationNotFound(_)
            | ServiceError::UserNotFound(_)
            | ServiceError::InvitationNotFound { .. } => {
                AppError::NotFound(anyhow::anyhow!(err.to_string()))
            }
            ServiceError::DuplicateOrganization(_)
            | ServiceError::AlreadyMember { .. }
            | ServiceError::AlreadyOwner { .. }
            | ServiceError::InvitationPending { .. } => {
                AppError::Conflict(anyhow::anyhow!(err.to_string()))
            }
            ServiceError::Validation(msg) => AppError::BadRequest(anyhow::anyhow!(msg)),
            ServiceError::GlobalIdChanged => AppError::Forbidden(anyhow::anyhow!(err.to_string())),
            ServiceError::Inconsistent(_) | ServiceError::MissingSecret(_) => {
                AppError::InternalError(anyhow::anyhow!(err.to_string()))
            }
            ServiceError::Store(StoreError::Duplicate) => {
                AppError::Conflict(anyhow::anyhow!("Resource already exists"))
            }
            ServiceError::Store(StoreError::Database(e)) => AppError::DatabaseError(e.into()),
            ServiceError::Store(StoreError::Internal(e)) | ServiceError::Internal(e) => {
                AppError::InternalError(e)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::StatusCode;

    #[test]
    fn test_domain_errors_map_to_http_taxonomy() {
        let cases = [
            (
                ServiceError::OrganizationNotFound("acme".into()),
                StatusCode::NOT_FOUND,
            ),
            (ServiceError::UserNotFound("bob".into()), StatusCode::NOT_FOUND),
            (
                ServiceError::AlreadyOwner {
                    organization: "acme".into(),
                    user: "bob".into(),
                },
                StatusCode::CONFLICT,
            ),
            (
                ServiceError::Validation("bad id".into()),
                StatusCode::BAD_REQUEST,
            ),
            (ServiceError::GlobalIdChanged, StatusCode::FORBIDDEN),
            (
                ServiceError::Inconsistent("orphan".into()),
                StatusCode::INTERNAL_SERVER_ERROR,
            ),
            (
                ServiceError::Store(StoreError::Duplicate),
                StatusCode::CONFLICT,
            ),
            (
                ServiceError::Store(StoreError::Internal(anyhow::anyhow!("down"))),
                StatusCode::INTERNAL_SERVER_ERROR,
            ),
        ];

        for (err, expected) in cases {
            assert_eq!(AppError::from(err).status_code(), expected);
        }
    }
}
