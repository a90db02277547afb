use axum::{
    extract::{Multipart, Path, Query, State},
    http::StatusCode,
    response::{Html, IntoResponse, Response},
    Json,
};
use std::path::Path as StdPath;
use uuid::Uuid;
use validator::Validate;

use crate::dto::quiz_dto::{
    GenerateResponse, ImagesResponse, LevelPayload, ModePayload, QuestionTypePatch,
    QuestionTypeResponse, ReferenceUploadResponse, ViewFormat, ViewQuery,
};
use crate::models::quiz_config::QuizConfig;
use crate::services::projection_service;
use crate::services::session_service::SessionStatus;
use crate::{
    error::{Error, Result},
    AppState,
};

pub async fn create_session(State(state): State<AppState>) -> (StatusCode, Json<SessionStatus>) {
    (StatusCode::CREATED, Json(state.sessions.create()))
}

pub async fn get_session(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<SessionStatus>> {
    Ok(Json(state.sessions.status(id)?))
}

pub async fn delete_session(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode> {
    state.sessions.remove(id)?;
    tracing::info!(session_id = %id, "Session deleted");
    Ok(StatusCode::NO_CONTENT)
}

/// Replaces the whole draft configuration.
pub async fn update_config(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(payload): Json<QuizConfig>,
) -> Result<Json<QuizConfig>> {
    payload.validate()?;
    payload.check_catalog()?;

    let config = state.sessions.update_config(id, move |c| {
        *c = payload;
        c.clamp_image_count();
        Ok(c.clone())
    })?;
    Ok(Json(config))
}

pub async fn set_mode(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(payload): Json<ModePayload>,
) -> Result<Json<QuizConfig>> {
    let config = state.sessions.update_config(id, |c| {
        c.set_mode(payload.mode);
        Ok(c.clone())
    })?;
    tracing::info!(session_id = %id, mode = ?payload.mode, "Mode switched, question types reset");
    Ok(Json(config))
}

pub async fn set_level(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(payload): Json<LevelPayload>,
) -> Result<Json<QuizConfig>> {
    payload.validate()?;
    let config = state.sessions.update_config(id, |c| {
        c.set_level(payload.level.trim());
        Ok(c.clone())
    })?;
    Ok(Json(config))
}

pub async fn update_question_type(
    State(state): State<AppState>,
    Path((id, type_id)): Path<(Uuid, String)>,
    Json(payload): Json<QuestionTypePatch>,
) -> Result<Json<QuestionTypeResponse>> {
    payload.validate()?;
    let response = state.sessions.update_config(id, |c| {
        let entry = c
            .update_question_type(&type_id, payload.count, payload.active)?
            .clone();
        Ok(QuestionTypeResponse {
            entry,
            total_questions: c.total_active_question_count(),
        })
    })?;
    Ok(Json(response))
}

/// Accepts a plain-text reference document as multipart field `file`.
pub async fn upload_reference(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    mut multipart: Multipart,
) -> Result<Json<ReferenceUploadResponse>> {
    state.sessions.status(id)?;

    while let Some(field) = multipart.next_field().await.map_err(|e| {
        tracing::error!("Failed to get next field: {}", e);
        Error::BadRequest(e.to_string())
    })? {
        if field.name() != Some("file") {
            continue;
        }

        let file_name = field.file_name().unwrap_or_default().to_string();
        let content_type = field.content_type().map(str::to_string);
        if !is_plain_text(&file_name, content_type.as_deref()) {
            tracing::warn!(session_id = %id, file_name = %file_name, "Reference rejected: not plain text");
            return Err(Error::FileIngestion(
                "Only plain-text (.txt) reference files are supported".to_string(),
            ));
        }

        let data = field.bytes().await?;
        if data.len() > state.max_reference_bytes {
            return Err(Error::FileIngestion(format!(
                "Reference file exceeds {} bytes",
                state.max_reference_bytes
            )));
        }
        let text = String::from_utf8(data.to_vec())
            .map_err(|_| Error::FileIngestion("Reference file is not valid UTF-8".to_string()))?;

        let characters = text.chars().count();
        state.sessions.update_config(id, move |c| {
            c.summary_text = text;
            Ok(())
        })?;
        tracing::info!(session_id = %id, file_name = %file_name, characters, "Reference text loaded");

        return Ok(Json(ReferenceUploadResponse {
            file_name,
            characters,
        }));
    }

    Err(Error::BadRequest("Multipart field 'file' is required".to_string()))
}

fn is_plain_text(file_name: &str, content_type: Option<&str>) -> bool {
    let txt_extension = StdPath::new(file_name)
        .extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case("txt"));
    let text_mime = content_type
        .map(|ct| ct.split(';').next().unwrap_or_default().trim())
        .is_some_and(|ct| ct.eq_ignore_ascii_case("text/plain"));
    txt_extension || (file_name.is_empty() && text_mime)
}

pub async fn generate_quiz(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<GenerateResponse>> {
    let quiz = state.generation_service.generate(id).await?;
    Ok(Json(GenerateResponse {
        session_id: id,
        question_count: quiz.questions.len(),
        images_pending: quiz.metadata.include_images && quiz.metadata.image_count > 0,
        quiz: quiz.as_ref().clone(),
    }))
}

pub async fn get_quiz(State(state): State<AppState>, Path(id): Path<Uuid>) -> Result<Response> {
    match state.sessions.current(id)? {
        Some((quiz, _)) => Ok(Json(quiz.as_ref().clone()).into_response()),
        None => Err(no_quiz(id)),
    }
}

pub async fn get_images(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<ImagesResponse>> {
    let images = state.sessions.images(id)?;
    let pending = state.sessions.status(id)?.busy;
    Ok(Json(ImagesResponse { images, pending }))
}

/// Renders one of the three views of the current quiz.
pub async fn get_view(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Query(query): Query<ViewQuery>,
) -> Result<Response> {
    let view = query.view_mode()?;
    let (quiz, images) = state.sessions.current(id)?.ok_or_else(|| no_quiz(id))?;
    let node = projection_service::project(&quiz, &images, view);

    Ok(match query.format {
        ViewFormat::Html => Html(node.to_html()).into_response(),
        ViewFormat::Json => Json(node).into_response(),
    })
}

fn no_quiz(id: Uuid) -> Error {
    Error::NotFound(format!("Session {} has no generated quiz yet", id))
}
