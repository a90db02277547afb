use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use crate::error::{Error, Result};
use crate::models::catalog::{self, Archetype};
use crate::models::quiz_config::{AppMode, QuestionTypeEntry};
use crate::services::projection_service::ViewMode;

#[derive(Debug, Clone, Deserialize)]
pub struct ModePayload {
    pub mode: AppMode,
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct LevelPayload {
    #[validate(length(min = 1, max = 50))]
    pub level: String,
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct QuestionTypePatch {
    #[validate(range(max = 50, message = "At most 50 questions per type"))]
    pub count: Option<u32>,
    pub active: Option<bool>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ViewFormat {
    #[default]
    Html,
    Json,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ViewQuery {
    pub mode: Option<String>,
    #[serde(default)]
    pub format: ViewFormat,
}

impl ViewQuery {
    pub fn view_mode(&self) -> Result<ViewMode> {
        match self.mode.as_deref().map(str::trim) {
            None | Some("") => Ok(ViewMode::default()),
            Some(raw) => raw.parse().map_err(Error::BadRequest),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateResponse {
    pub session_id: Uuid,
    pub question_count: usize,
    pub images_pending: bool,
    pub quiz: crate::models::quiz::GeneratedQuiz,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReferenceUploadResponse {
    pub file_name: String,
    pub characters: usize,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ImagesResponse {
    pub images: crate::models::quiz::ImageMap,
    pub pending: bool,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GradeGroup {
    pub level: &'static str,
    pub grades: &'static [&'static str],
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CatalogResponse {
    pub school_question_types: &'static [Archetype],
    pub tutoring_question_types: &'static [Archetype],
    pub subjects: &'static [&'static str],
    pub assessment_types: &'static [&'static str],
    pub levels: Vec<GradeGroup>,
}

impl CatalogResponse {
    pub fn build() -> Self {
        Self {
            school_question_types: catalog::SCHOOL_ARCHETYPES,
            tutoring_question_types: catalog::TUTORING_ARCHETYPES,
            subjects: catalog::SCHOOL_SUBJECTS,
            assessment_types: catalog::ASSESSMENT_TYPES,
            levels: catalog::GRADE_MAPPING
                .iter()
                .map(|&(level, grades)| GradeGroup { level, grades })
                .collect(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct QuestionTypeResponse {
    #[serde(flatten)]
    pub entry: QuestionTypeEntry,
    #[serde(rename = "totalQuestions")]
    pub total_questions: u32,
}
