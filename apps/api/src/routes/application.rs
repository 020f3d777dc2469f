use axum::extract::multipart::MultipartRejection;
use axum::extract::{Multipart, State};
use axum::Json;

use crate::errors::AppError;
use crate::intake::process_application;
use crate::intake::upload::UploadError;
use crate::response::ApiResponse;
use crate::state::AppState;

const SUCCESS_MESSAGE: &str = "Application submitted successfully! We will be in touch soon.";

/// POST /enviar-candidatura
pub async fn handle_submit_application(
    State(state): State<AppState>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<Json<ApiResponse>, AppError> {
    let multipart = multipart.map_err(|e| UploadError::Malformed(e.body_text()))?;

    let form = state.uploads.accept(multipart).await?;
    process_application(form, state.mailer.as_ref(), &state.config.mail).await?;

    Ok(Json(ApiResponse::ok(SUCCESS_MESSAGE)))
}
