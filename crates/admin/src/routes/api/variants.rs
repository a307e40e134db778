//! Variant preview: generate drafts for an attribute selection without
//! touching the database.

use axum::{Json, Router, routing::post};
use serde::{Deserialize, Serialize};

use vitrine_core::catalog::variants::{MAX_VARIANTS, combination_count};
use vitrine_core::catalog::{
    AttributeSelection, VariantDefaults, VariantDraft, VariantError, generate_variants,
    regenerate_variants,
};

use crate::error::AppError;
use crate::middleware::RequireUser;
use crate::state::AppState;

/// Build the variant preview router.
pub fn router() -> Router<AppState> {
    Router::new().route("/api/variants/preview", post(preview))
}

/// Attribute selection to expand.
#[derive(Debug, Deserialize)]
pub struct PreviewRequest {
    #[serde(default)]
    pub attributes: Vec<AttributeSelection>,
    #[serde(default)]
    pub defaults: VariantDefaults,
    /// Drafts from the form; matching combinations keep their values.
    #[serde(default)]
    pub previous: Option<Vec<VariantDraft>>,
}

/// The generated drafts.
#[derive(Debug, Serialize)]
pub struct PreviewResponse {
    pub count: usize,
    pub variants: Vec<VariantDraft>,
}

/// Expand attributes into variant drafts, keeping prior input if given.
///
/// # Errors
///
/// Returns `VariantError::TooMany` if the selection exceeds the variant limit.
pub fn preview_variants(request: &PreviewRequest) -> Result<Vec<VariantDraft>, VariantError> {
    let count = combination_count(&request.attributes);
    if count > MAX_VARIANTS {
        return Err(VariantError::TooMany {
            count,
            max: MAX_VARIANTS,
        });
    }

    Ok(match &request.previous {
        Some(previous) => regenerate_variants(previous, &request.attributes, &request.defaults),
        None => generate_variants(&request.attributes, &request.defaults),
    })
}

/// POST /api/variants/preview
///
/// # Errors
///
/// Returns a validation error if too many combinations would be generated.
pub async fn preview(
    RequireUser(_user): RequireUser,
    Json(request): Json<PreviewRequest>,
) -> Result<Json<PreviewResponse>, AppError> {
    let variants = preview_variants(&request).map_err(|e| AppError::Validation(e.to_string()))?;
    Ok(Json(PreviewResponse {
        count: variants.len(),
        variants,
    }))
}
