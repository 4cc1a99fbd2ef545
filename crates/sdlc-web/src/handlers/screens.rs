//! 화면 API 핸들러.

use axum::extract::{Path, State};
use axum::Json;
use sdlc_core::models::screen::{ProjectScreen, ScreenDefinition};
use serde::Deserialize;
use tracing::info;
use uuid::Uuid;

use super::require_text;
use crate::error::ApiError;
use crate::AppState;

/// 프로토타입 직접 저장 요청
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PrototypeRequest {
    pub html_content: String,
}

/// GET /api/projects/{id}/screens
pub async fn list_screens(
    State(state): State<AppState>,
    Path(project_id): Path<Uuid>,
) -> Result<Json<Vec<ProjectScreen>>, ApiError> {
    Ok(Json(state.store.screens(project_id).await?))
}

/// 화면 목록 전체 교체. 표시 순서는 요청 배열 순서를 따른다
///
/// POST /api/projects/{id}/screens
pub async fn replace_screens(
    State(state): State<AppState>,
    Path(project_id): Path<Uuid>,
    Json(definitions): Json<Vec<ScreenDefinition>>,
) -> Result<Json<Vec<ProjectScreen>>, ApiError> {
    for definition in &definitions {
        require_text("name", &definition.name)?;
    }
    let screens = state.store.replace_screens(project_id, &definitions).await?;
    info!(%project_id, count = screens.len(), "화면 목록 교체");
    Ok(Json(screens))
}

/// PUT /api/projects/{id}/screens/{screen_id}/prototype
pub async fn save_prototype(
    State(state): State<AppState>,
    Path((project_id, screen_id)): Path<(Uuid, Uuid)>,
    Json(body): Json<PrototypeRequest>,
) -> Result<Json<ProjectScreen>, ApiError> {
    let screen = state.store.screen(screen_id).await?;
    if screen.project_id != project_id {
        return Err(ApiError::NotFound(format!(
            "프로젝트 {project_id}에 화면 {screen_id} 없음"
        )));
    }
    let screen = state.store.save_prototype(screen_id, &body.html_content).await?;
    Ok(Json(screen))
}
