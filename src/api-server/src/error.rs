use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use polbind_authz::store::StoreError;
use polbind_authz::BindingError;
use serde_json::json;

pub type Result<T> = std::result::Result<T, ApiError>;

#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error(transparent)]
    Binding(#[from] BindingError),

    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("Bad request: {0}")]
    BadRequest(String),
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::ValidationError(_) | ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::Binding(err) => match err {
                BindingError::MissingPolicyReference
                | BindingError::ScopeMismatch { .. }
                | BindingError::InvalidInput(_) => StatusCode::BAD_REQUEST,
                BindingError::PolicyNotFound(_)
                | BindingError::BindingNotFound(_)
                | BindingError::IdentityNotFound(_) => StatusCode::NOT_FOUND,
                BindingError::StoreConflict(_)
                | BindingError::Store(StoreError::AlreadyExists(_)) => StatusCode::CONFLICT,
                BindingError::PartialSyncFailure(_) => StatusCode::BAD_GATEWAY,
                BindingError::Configuration(_)
                | BindingError::Evaluator(_)
                | BindingError::Store(_) => StatusCode::INTERNAL_SERVER_ERROR,
            },
        }
    }
}

impl From<validator::ValidationErrors> for ApiError {
    fn from(errors: validator::ValidationErrors) -> Self {
        ApiError::ValidationError(errors.to_string())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();

        let body = match &self {
            ApiError::Binding(BindingError::PartialSyncFailure(failures)) => Json(json!({
                "error": self.to_string(),
                "status": status.as_u16(),
                "failures": failures
                    .iter()
                    .map(|f| json!({
                        "policy_id": f.policy_id,
                        "phase": f.phase.to_string(),
                        "message": f.message,
                    }))
                    .collect::<Vec<_>>(),
            })),
            _ => Json(json!({
                "error": self.to_string(),
                "status": status.as_u16(),
            })),
        };

        (status, body).into_response()
    }
}
