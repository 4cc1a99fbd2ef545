//! 프로젝트/화면/문서 저장소 포트.

use async_trait::async_trait;
use uuid::Uuid;

use crate::error::CoreError;
use crate::models::project::{Project, ProjectArtifact, ProjectDocument};
use crate::models::screen::{ProjectScreen, ScreenDefinition};
use crate::models::session::RemoteSession;

/// 프로젝트 저장소
///
/// 존재하지 않는 ID는 `CoreError::NotFound`.
#[async_trait]
pub trait ProjectStore: Send + Sync {
    async fn create_project(&self, project: Project) -> Result<Project, CoreError>;

    async fn list_projects(&self) -> Result<Vec<Project>, CoreError>;

    async fn project(&self, project_id: Uuid) -> Result<Project, CoreError>;

    /// 산출물 필드 기록 + 생성 시각 갱신
    async fn save_artifact(
        &self,
        project_id: Uuid,
        artifact: ProjectArtifact,
        content: &str,
    ) -> Result<Project, CoreError>;

    async fn select_template(
        &self,
        project_id: Uuid,
        template_id: Option<String>,
    ) -> Result<Project, CoreError>;

    async fn add_document(&self, document: ProjectDocument)
        -> Result<ProjectDocument, CoreError>;

    /// 업로드 순서대로
    async fn documents(&self, project_id: Uuid) -> Result<Vec<ProjectDocument>, CoreError>;

    /// `display_order` 순으로
    async fn screens(&self, project_id: Uuid) -> Result<Vec<ProjectScreen>, CoreError>;

    async fn screen(&self, screen_id: Uuid) -> Result<ProjectScreen, CoreError>;

    /// 프로젝트의 화면 전체 교체 (기존 프로토타입/세션 포함 삭제)
    async fn replace_screens(
        &self,
        project_id: Uuid,
        definitions: &[ScreenDefinition],
    ) -> Result<Vec<ProjectScreen>, CoreError>;

    /// 프로토타입 HTML + 생성 시각 기록
    async fn save_prototype(
        &self,
        screen_id: Uuid,
        html: &str,
    ) -> Result<ProjectScreen, CoreError>;

    /// 화면의 원격 세션 교체
    async fn save_agent_session(
        &self,
        screen_id: Uuid,
        session: RemoteSession,
    ) -> Result<(), CoreError>;
}
