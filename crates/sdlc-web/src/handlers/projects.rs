//! 프로젝트/문서 API 핸들러.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use sdlc_core::models::project::{Project, ProjectArtifact, ProjectDocument};
use serde::Deserialize;
use tracing::info;
use uuid::Uuid;

use super::require_text;
use crate::error::ApiError;
use crate::AppState;

/// 프로젝트 생성 요청
#[derive(Debug, Deserialize)]
pub struct CreateProjectRequest {
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
}

/// 산출물 직접 저장 요청 (PRD, 디자인 시스템)
#[derive(Debug, Deserialize)]
pub struct ContentRequest {
    pub content: String,
}

/// 템플릿 선택 요청. `null`이면 선택 해제
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TemplateSelectionRequest {
    #[serde(default)]
    pub template_id: Option<String>,
}

/// 추출 완료된 문서 등록 요청
#[derive(Debug, Deserialize)]
pub struct DocumentRequest {
    pub filename: String,
    #[serde(default)]
    pub text: String,
}

/// POST /api/projects
pub async fn create_project(
    State(state): State<AppState>,
    Json(body): Json<CreateProjectRequest>,
) -> Result<(StatusCode, Json<Project>), ApiError> {
    require_text("name", &body.name)?;
    let project = state
        .store
        .create_project(Project::new(body.name.trim(), body.description))
        .await?;
    info!(project_id = %project.id, "프로젝트 생성");
    Ok((StatusCode::CREATED, Json(project)))
}

/// GET /api/projects
pub async fn list_projects(State(state): State<AppState>) -> Result<Json<Vec<Project>>, ApiError> {
    Ok(Json(state.store.list_projects().await?))
}

/// GET /api/projects/{id}
pub async fn get_project(
    State(state): State<AppState>,
    Path(project_id): Path<Uuid>,
) -> Result<Json<Project>, ApiError> {
    Ok(Json(state.store.project(project_id).await?))
}

/// PUT /api/projects/{id}/prd
pub async fn save_prd(
    State(state): State<AppState>,
    Path(project_id): Path<Uuid>,
    Json(body): Json<ContentRequest>,
) -> Result<Json<Project>, ApiError> {
    let project = state
        .store
        .save_artifact(project_id, ProjectArtifact::Prd, &body.content)
        .await?;
    Ok(Json(project))
}

/// PUT /api/projects/{id}/design-system
pub async fn save_design_system(
    State(state): State<AppState>,
    Path(project_id): Path<Uuid>,
    Json(body): Json<ContentRequest>,
) -> Result<Json<Project>, ApiError> {
    let project = state
        .store
        .save_artifact(project_id, ProjectArtifact::DesignSystem, &body.content)
        .await?;
    Ok(Json(project))
}

/// PUT /api/projects/{id}/template
pub async fn select_template(
    State(state): State<AppState>,
    Path(project_id): Path<Uuid>,
    Json(body): Json<TemplateSelectionRequest>,
) -> Result<Json<Project>, ApiError> {
    let template_id = body
        .template_id
        .map(|id| id.trim().to_string())
        .filter(|id| !id.is_empty());
    let project = state.store.select_template(project_id, template_id).await?;
    Ok(Json(project))
}

/// GET /api/projects/{id}/documents
pub async fn list_documents(
    State(state): State<AppState>,
    Path(project_id): Path<Uuid>,
) -> Result<Json<Vec<ProjectDocument>>, ApiError> {
    Ok(Json(state.store.documents(project_id).await?))
}

/// POST /api/projects/{id}/documents
pub async fn add_document(
    State(state): State<AppState>,
    Path(project_id): Path<Uuid>,
    Json(body): Json<DocumentRequest>,
) -> Result<(StatusCode, Json<ProjectDocument>), ApiError> {
    require_text("filename", &body.filename)?;
    let document = state
        .store
        .add_document(ProjectDocument::new(project_id, body.filename, body.text))
        .await?;
    Ok((StatusCode::CREATED, Json(document)))
}
