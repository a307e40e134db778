//! Unified error handling for the dashboard service.
//!
//! Every handler returns `Result<_, AppError>`. Responses carry a JSON body
//! `{"error": <kind>, "message": <text>}`; server-side failures are reported
//! to Sentry and their details are never sent to the client.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;
use thiserror::Error;

use vitrine_core::Credits;

use crate::db::RepositoryError;
use crate::services::catalog::CatalogError;
use crate::services::cleanup::ConfirmationMismatch;
use crate::services::identity::IdentityError;
use crate::services::store_access::StoreAccessError;
use crate::services::store_provisioning::StoreCreationError;
use crate::services::themes::ThemeError;
use crate::storage::StorageError;

/// Application-level error type for the dashboard.
#[derive(Debug, Error)]
pub enum AppError {
    /// Invalid input.
    #[error("{0}")]
    Validation(String),

    /// The store URL is already taken.
    #[error("the store URL '{0}' is already taken")]
    DuplicateSlug(String),

    /// The owner cannot afford the operation.
    #[error("insufficient credits: {required} required, {balance} available")]
    InsufficientCredits {
        required: Credits,
        balance: Credits,
        shortfall: Credits,
    },

    /// The credit debit itself failed.
    #[error("credit deduction failed: {0}")]
    CreditDeductionFailed(String),

    /// Database operation failed.
    #[error("database error: {0}")]
    Persistence(#[source] RepositoryError),

    /// The uploaded file was rejected.
    #[error("upload rejected: {0}")]
    Upload(String),

    /// The file was accepted but storage could not keep it.
    #[error("upload failed: {0}")]
    UploadFailed(String),

    /// No authenticated user.
    #[error("authentication required")]
    AuthRequired,

    /// The user may not access this resource.
    #[error("you do not have access to this resource")]
    Forbidden,

    /// Resource not found.
    #[error("not found")]
    NotFound,

    /// Internal server error.
    #[error("internal error: {0}")]
    Internal(String),
}

impl AppError {
    const fn status(&self) -> StatusCode {
        match self {
            Self::Validation(_) | Self::Upload(_) => StatusCode::BAD_REQUEST,
            Self::DuplicateSlug(_) => StatusCode::CONFLICT,
            Self::InsufficientCredits { .. } => StatusCode::PAYMENT_REQUIRED,
            Self::AuthRequired => StatusCode::UNAUTHORIZED,
            Self::Forbidden => StatusCode::FORBIDDEN,
            Self::NotFound => StatusCode::NOT_FOUND,
            Self::UploadFailed(_) => StatusCode::BAD_GATEWAY,
            Self::CreditDeductionFailed(_) | Self::Persistence(_) | Self::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    const fn kind(&self) -> &'static str {
        match self {
            Self::Validation(_) => "validation",
            Self::DuplicateSlug(_) => "duplicate_slug",
            Self::InsufficientCredits { .. } => "insufficient_credits",
            Self::CreditDeductionFailed(_) => "credit_deduction_failed",
            Self::Persistence(_) => "persistence",
            Self::Upload(_) | Self::UploadFailed(_) => "upload",
            Self::AuthRequired => "auth_required",
            Self::Forbidden => "forbidden",
            Self::NotFound => "not_found",
            Self::Internal(_) => "internal",
        }
    }

    /// Whether this is a server-side failure.
    #[must_use]
    pub fn is_server_error(&self) -> bool {
        self.status().is_server_error()
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();

        if self.is_server_error() {
            let event_id = sentry::capture_error(&self);
            tracing::error!(
                error = %self,
                sentry_event_id = %event_id,
                "Request failed"
            );
        }

        // Don't expose internal error details to clients
        let message = match &self {
            Self::Persistence(_) | Self::Internal(_) => "Internal server error".to_string(),
            Self::CreditDeductionFailed(_) => {
                "Could not deduct credits; nothing was charged".to_string()
            }
            Self::UploadFailed(_) => "Could not store the file, please try again".to_string(),
            _ => self.to_string(),
        };

        let body = match &self {
            Self::InsufficientCredits {
                required,
                balance,
                shortfall,
            } => json!({
                "error": self.kind(),
                "message": message,
                "required": required,
                "balance": balance,
                "shortfall": shortfall,
            }),
            _ => json!({ "error": self.kind(), "message": message }),
        };

        (status, Json(body)).into_response()
    }
}

impl From<RepositoryError> for AppError {
    fn from(err: RepositoryError) -> Self {
        match err {
            RepositoryError::NotFound => Self::NotFound,
            RepositoryError::Conflict(message) => Self::Validation(message),
            other => Self::Persistence(other),
        }
    }
}

impl From<StoreCreationError> for AppError {
    fn from(err: StoreCreationError) -> Self {
        match err {
            StoreCreationError::Validation(message) => Self::Validation(message),
            StoreCreationError::DuplicateSlug(slug) => Self::DuplicateSlug(slug),
            StoreCreationError::InsufficientCredits {
                required,
                balance,
                shortfall,
            } => Self::InsufficientCredits {
                required,
                balance,
                shortfall,
            },
            StoreCreationError::CreditDeductionFailed(e) => {
                Self::CreditDeductionFailed(e.to_string())
            }
            StoreCreationError::Persistence(e) => Self::Persistence(e),
            refund @ StoreCreationError::RefundFailed { .. } => Self::Internal(refund.to_string()),
        }
    }
}

impl From<CatalogError> for AppError {
    fn from(err: CatalogError) -> Self {
        match err {
            CatalogError::Validation(message) => Self::Validation(message),
            CatalogError::Variants(e) => Self::Validation(e.to_string()),
            CatalogError::Categories(e) => Self::Validation(e.to_string()),
            CatalogError::Repository(e) => e.into(),
        }
    }
}

impl From<ThemeError> for AppError {
    fn from(err: ThemeError) -> Self {
        match err {
            ThemeError::Repository(e) => e.into(),
            other => Self::Validation(other.to_string()),
        }
    }
}

impl From<StoreAccessError> for AppError {
    fn from(err: StoreAccessError) -> Self {
        match err {
            StoreAccessError::Validation(message) => Self::Validation(message),
            StoreAccessError::InvalidCredentials => Self::Forbidden,
            StoreAccessError::Repository(e) => e.into(),
            other => Self::Internal(other.to_string()),
        }
    }
}

impl From<StorageError> for AppError {
    fn from(err: StorageError) -> Self {
        match err {
            StorageError::InvalidPath(path) => Self::Upload(format!("invalid path: {path}")),
            other => Self::UploadFailed(other.to_string()),
        }
    }
}

impl From<IdentityError> for AppError {
    fn from(err: IdentityError) -> Self {
        match err {
            IdentityError::InvalidToken | IdentityError::InvalidCredentials => Self::AuthRequired,
            other => Self::Internal(other.to_string()),
        }
    }
}

impl From<ConfirmationMismatch> for AppError {
    fn from(err: ConfirmationMismatch) -> Self {
        Self::Validation(err.to_string())
    }
}

impl From<tower_sessions::session::Error> for AppError {
    fn from(err: tower_sessions::session::Error) -> Self {
        Self::Internal(format!("session error: {err}"))
    }
}

/// Set the Sentry user context for the current request.
pub fn set_sentry_user(user_id: &str, email: Option<&str>) {
    sentry::configure_scope(|scope| {
        scope.set_user(Some(sentry::User {
            id: Some(user_id.to_owned()),
            email: email.map(String::from),
            ..Default::default()
        }));
    });
}
