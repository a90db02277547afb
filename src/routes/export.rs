use axum::{
    extract::{Path, Query, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
};
use uuid::Uuid;

use crate::dto::quiz_dto::ViewQuery;
use crate::services::export_service::ExportService;
use crate::services::projection_service;
use crate::{error::Result, AppState};

/// Export the current quiz as a Word-compatible document.
/// Without a generated quiz there is nothing to export: `204 No Content`.
pub async fn export_quiz(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Query(query): Query<ViewQuery>,
) -> Result<Response> {
    let view = query.view_mode()?;
    let Some((quiz, images)) = state.sessions.current(id)? else {
        tracing::info!(session_id = %id, "Export requested without a quiz");
        return Ok(StatusCode::NO_CONTENT.into_response());
    };

    let projection = projection_service::project(&quiz, &images, view);
    let document = ExportService::export_document(&quiz, &projection);
    let disposition = format!("attachment; filename=\"{}\"", document.filename);

    Ok((
        StatusCode::OK,
        [
            (header::CONTENT_TYPE, document.content_type.to_string()),
            (header::CONTENT_DISPOSITION, disposition),
        ],
        document.body,
    )
        .into_response())
}
