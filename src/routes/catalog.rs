use axum::Json;

use crate::dto::quiz_dto::CatalogResponse;

/// Question archetypes per mode, subjects, assessment types and grade mapping.
pub async fn get_catalog() -> Json<CatalogResponse> {
    Json(CatalogResponse::build())
}
