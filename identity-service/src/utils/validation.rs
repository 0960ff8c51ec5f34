use axum::{
    extract::{FromRequest, Request},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::de::DeserializeOwned;
use validator::{Validate, ValidationError};

use crate::dtos::ErrorResponse;
use crate::models::organization::GLOBAL_ID_SEPARATOR;

pub const GLOBAL_ID_MIN_LEN: usize = 3;
pub const GLOBAL_ID_MAX_LEN: usize = 150;
pub const DNS_NAME_MIN_LEN: usize = 3;
pub const DNS_NAME_MAX_LEN: usize = 249;

pub struct ValidatedJson<T>(pub T);

#[axum::async_trait]
impl<T, S> FromRequest<S> for ValidatedJson<T>
where
    T: DeserializeOwned + Validate + 'static,
    S: Send + Sync,
{
    type Rejection = Response;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let Json(value) = Json::<T>::from_request(req, state).await.map_err(|e| {
            let err_resp = ErrorResponse {
                error: format!("Json parse error: {}", e),
            };
            (StatusCode::BAD_REQUEST, Json(err_resp)).into_response()
        })?;

        value.validate().map_err(|e| {
            let err_resp = ErrorResponse {
                error: format!("Validation error: {}", e),
            };
            (StatusCode::BAD_REQUEST, Json(err_resp)).into_response()
        })?;

        Ok(ValidatedJson(value))
    }
}

/// 3 to 150 characters, no empty dot-segments.
pub fn validate_global_id(global_id: &str) -> Result<(), ValidationError> {
    let len = global_id.chars().count();
    if !(GLOBAL_ID_MIN_LEN..=GLOBAL_ID_MAX_LEN).contains(&len) {
        let mut err = ValidationError::new("global_id_length");
        err.message = Some(
            format!(
                "global id must be between {} and {} characters",
                GLOBAL_ID_MIN_LEN, GLOBAL_ID_MAX_LEN
            )
            .into(),
        );
        return Err(err);
    }

    if global_id.split(GLOBAL_ID_SEPARATOR).any(str::is_empty) {
        let mut err = ValidationError::new("global_id_segment");
        err.message = Some("global id must not contain empty segments".into());
        return Err(err);
    }

    Ok(())
}

pub fn is_valid_dns_name(name: &str) -> bool {
    (DNS_NAME_MIN_LEN..=DNS_NAME_MAX_LEN).contains(&name.chars().count())
}

pub fn validate_dns_names(names: &[String]) -> Result<(), ValidationError> {
    if let Some(bad) = names.iter().find(|name| !is_valid_dns_name(name)) {
        let mut err = ValidationError::new("dns_name");
        err.message = Some(format!("invalid dns name: {}", bad).into());
        return Err(err);
    }
    Ok(())
}
