//! Request extractors that reject with the structured error envelope

use axum::extract::{rejection::JsonRejection, FromRequest, Request};
use axum::Json;
use docqa_common::errors::AppError;
use serde::de::DeserializeOwned;
use validator::Validate;

/// JSON body that is deserialized and validated before the handler runs
///
/// Malformed, incomplete, or invalid bodies become `AppError::Validation`,
/// so clients always receive the error envelope instead of axum's plain-text
/// rejection.
#[derive(Debug, Clone, Copy, Default)]
pub struct ValidatedJson<T>(pub T);

impl<T, S> FromRequest<S> for ValidatedJson<T>
where
    T: DeserializeOwned + Validate,
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let Json(value) = Json::<T>::from_request(req, state)
            .await
            .map_err(json_rejection)?;

        value.validate().map_err(|e| AppError::Validation {
            message: e.to_string(),
            field: e.field_errors().keys().next().map(|field| field.to_string()),
        })?;

        Ok(Self(value))
    }
}

fn json_rejection(rejection: JsonRejection) -> AppError {
    let message = rejection.body_text();
    AppError::Validation {
        field: missing_field(&message),
        message,
    }
}

/// Field name out of serde's "missing field `name`" message
fn missing_field(message: &str) -> Option<String> {
    let rest = message.split("missing field `").nth(1)?;
    rest.split('`').next().map(str::to_string)
}
