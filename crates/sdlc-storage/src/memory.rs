//! 인메모리 프로젝트 저장소.
//!
//! 단일 프로세스 개발/테스트용. 재시작하면 데이터가 사라진다.

use async_trait::async_trait;
use chrono::Utc;
use parking_lot::RwLock;
use sdlc_core::error::CoreError;
use sdlc_core::models::project::{Project, ProjectArtifact, ProjectDocument};
use sdlc_core::models::screen::{ProjectScreen, ScreenDefinition};
use sdlc_core::models::session::RemoteSession;
use sdlc_core::ports::store::ProjectStore;
use std::collections::HashMap;
use tracing::debug;
use uuid::Uuid;

/// `ProjectStore` 인메모리 구현
#[derive(Default)]
pub struct MemoryProjectStore {
    projects: RwLock<HashMap<Uuid, Project>>,
    documents: RwLock<HashMap<Uuid, Vec<ProjectDocument>>>,
    screens: RwLock<HashMap<Uuid, ProjectScreen>>,
}

impl MemoryProjectStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn ensure_project(&self, project_id: Uuid) -> Result<(), CoreError> {
        if self.projects.read().contains_key(&project_id) {
            Ok(())
        } else {
            Err(CoreError::not_found("Project", project_id))
        }
    }

    fn update_project<F>(&self, project_id: Uuid, apply: F) -> Result<Project, CoreError>
    where
        F: FnOnce(&mut Project),
    {
        let mut projects = self.projects.write();
        let project = projects
            .get_mut(&project_id)
            .ok_or_else(|| CoreError::not_found("Project", project_id))?;
        apply(project);
        project.updated_at = Utc::now();
        Ok(project.clone())
    }

    fn update_screen<F>(&self, screen_id: Uuid, apply: F) -> Result<ProjectScreen, CoreError>
    where
        F: FnOnce(&mut ProjectScreen),
    {
        let mut screens = self.screens.write();
        let screen = screens
            .get_mut(&screen_id)
            .ok_or_else(|| CoreError::not_found("Screen", screen_id))?;
        apply(screen);
        Ok(screen.clone())
    }
}

#[async_trait]
impl ProjectStore for MemoryProjectStore {
    async fn create_project(&self, project: Project) -> Result<Project, CoreError> {
        self.projects.write().insert(project.id, project.clone());
        debug!(project_id = %project.id, "프로젝트 생성");
        Ok(project)
    }

    async fn list_projects(&self) -> Result<Vec<Project>, CoreError> {
        let mut projects: Vec<Project> = self.projects.read().values().cloned().collect();
        projects.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(projects)
    }

    async fn project(&self, project_id: Uuid) -> Result<Project, CoreError> {
        self.projects
            .read()
            .get(&project_id)
            .cloned()
            .ok_or_else(|| CoreError::not_found("Project", project_id))
    }

    async fn save_artifact(
        &self,
        project_id: Uuid,
        artifact: ProjectArtifact,
        content: &str,
    ) -> Result<Project, CoreError> {
        let now = Utc::now();
        let project = self.update_project(project_id, |p| match artifact {
            ProjectArtifact::Prd => {
                p.prd_content = Some(content.to_string());
                p.prd_generated_at = Some(now);
            }
            ProjectArtifact::DesignSystem => {
                p.design_system_content = Some(content.to_string());
                p.design_system_updated_at = Some(now);
            }
        })?;
        debug!(%project_id, ?artifact, len = content.len(), "산출물 저장");
        Ok(project)
    }

    async fn select_template(
        &self,
        project_id: Uuid,
        template_id: Option<String>,
    ) -> Result<Project, CoreError> {
        self.update_project(project_id, |p| p.template_id = template_id)
    }

    async fn add_document(
        &self,
        document: ProjectDocument,
    ) -> Result<ProjectDocument, CoreError> {
        self.ensure_project(document.project_id)?;
        self.documents
            .write()
            .entry(document.project_id)
            .or_default()
            .push(document.clone());
        Ok(document)
    }

    async fn documents(&self, project_id: Uuid) -> Result<Vec<ProjectDocument>, CoreError> {
        self.ensure_project(project_id)?;
        Ok(self
            .documents
            .read()
            .get(&project_id)
            .cloned()
            .unwrap_or_default())
    }

    async fn screens(&self, project_id: Uuid) -> Result<Vec<ProjectScreen>, CoreError> {
        self.ensure_project(project_id)?;
        let mut screens: Vec<ProjectScreen> = self
            .screens
            .read()
            .values()
            .filter(|s| s.project_id == project_id)
            .cloned()
            .collect();
        screens.sort_by_key(|s| s.display_order);
        Ok(screens)
    }

    async fn screen(&self, screen_id: Uuid) -> Result<ProjectScreen, CoreError> {
        self.screens
            .read()
            .get(&screen_id)
            .cloned()
            .ok_or_else(|| CoreError::not_found("Screen", screen_id))
    }

    async fn replace_screens(
        &self,
        project_id: Uuid,
        definitions: &[ScreenDefinition],
    ) -> Result<Vec<ProjectScreen>, CoreError> {
        self.ensure_project(project_id)?;

        let created: Vec<ProjectScreen> = definitions
            .iter()
            .enumerate()
            .map(|(i, def)| {
                let mut screen = ProjectScreen::from_definition(project_id, def);
                screen.display_order = i as u32;
                screen
            })
            .collect();

        let mut screens = self.screens.write();
        screens.retain(|_, s| s.project_id != project_id);
        for screen in &created {
            screens.insert(screen.id, screen.clone());
        }
        debug!(%project_id, count = created.len(), "화면 목록 교체");
        Ok(created)
    }

    async fn save_prototype(
        &self,
        screen_id: Uuid,
        html: &str,
    ) -> Result<ProjectScreen, CoreError> {
        self.update_screen(screen_id, |s| {
            s.prototype_content = Some(html.to_string());
            s.prototype_generated_at = Some(Utc::now());
        })
    }

    async fn save_agent_session(
        &self,
        screen_id: Uuid,
        session: RemoteSession,
    ) -> Result<(), CoreError> {
        self.update_screen(screen_id, |s| s.agent_session = Some(session))?;
        Ok(())
    }
}
