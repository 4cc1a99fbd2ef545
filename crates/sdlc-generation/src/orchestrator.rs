//! 생성 실행 상태 기계.
//!
//! 다섯 가지 산출물이 같은 흐름을 공유하며, 종류별 차이는
//! [`ArtifactSpec`](crate::artifact::ArtifactSpec) 표로 매개변수화된다.
//!
//! ```text
//! INITIALIZING → 사전 조건 → SESSION_CREATING → QUERYING → EXTRACTING → PERSISTING → COMPLETE
//!                    └──────────────┴───────────────┴──────────┴─────────────┴──→ FAILED
//! ```
//!
//! 실패는 `Err(GenerationError)`로 돌려주고, 종료 프레임 변환은
//! [`supervise`](crate::relay::supervise)가 맡는다.

use sdlc_core::config::AgentConfig;
use sdlc_core::error::CoreError;
use sdlc_core::models::progress::{ArtifactPayload, Completion};
use sdlc_core::models::project::{Project, ProjectArtifact};
use sdlc_core::models::screen::ProjectScreen;
use sdlc_core::models::session::{AgentEndpoint, RemoteSession};
use sdlc_core::models::template::TemplateMetadata;
use sdlc_core::ports::agent::AgentSessionClient;
use sdlc_core::ports::credentials::AccessTokenProvider;
use sdlc_core::ports::store::ProjectStore;
use sdlc_core::ports::template::TemplateCatalog;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::artifact::{ArtifactKind, ArtifactSpec, Checkpoint};
use crate::error::GenerationError;
use crate::extract::{extract, ExtractedArtifact};
use crate::prompt;
use crate::relay::ProgressRelay;

const NO_DOCUMENTS: &str = "No files uploaded for this project. Upload documents first.";
const NO_DOCUMENT_TEXT: &str = "No text could be extracted from the uploaded files.";
const NO_PRD: &str = "No PRD found. Generate a PRD in the Planning phase first.";
const NO_DESIGN_SYSTEM: &str = "No design system found. Complete the Design System step first.";
const FOREIGN_SCREEN: &str = "Screen does not belong to this project";
const NO_PROTOTYPE: &str = "No prototype found for this screen. Generate it first.";
const NO_INSTRUCTION: &str = "Refinement instruction is required.";

/// 템플릿 메타데이터가 없을 때 체크포인트에 쓰는 이름
const UNNAMED_TEMPLATE: &str = "selected template";

/// 생성 요청
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GenerationRequest {
    Requirements {
        project_id: Uuid,
    },
    DesignSystem {
        project_id: Uuid,
    },
    ScreenInventory {
        project_id: Uuid,
    },
    Prototype {
        project_id: Uuid,
        screen_id: Uuid,
    },
    Refinement {
        project_id: Uuid,
        screen_id: Uuid,
        instruction: String,
    },
}

impl GenerationRequest {
    pub fn kind(&self) -> ArtifactKind {
        match self {
            GenerationRequest::Requirements { .. } => ArtifactKind::Requirements,
            GenerationRequest::DesignSystem { .. } => ArtifactKind::DesignSystem,
            GenerationRequest::ScreenInventory { .. } => ArtifactKind::ScreenInventory,
            GenerationRequest::Prototype { .. } => ArtifactKind::Prototype,
            GenerationRequest::Refinement { .. } => ArtifactKind::Refinement,
        }
    }

    pub fn project_id(&self) -> Uuid {
        match self {
            GenerationRequest::Requirements { project_id }
            | GenerationRequest::DesignSystem { project_id }
            | GenerationRequest::ScreenInventory { project_id }
            | GenerationRequest::Prototype { project_id, .. }
            | GenerationRequest::Refinement { project_id, .. } => *project_id,
        }
    }
}

/// 실행이 사용하는 포트 묶음
#[derive(Clone)]
pub struct GenerationPorts {
    pub tokens: Arc<dyn AccessTokenProvider>,
    pub agent: Arc<dyn AgentSessionClient>,
    pub store: Arc<dyn ProjectStore>,
    pub templates: Arc<dyn TemplateCatalog>,
}

/// 사전 조건을 통과한 실행 재료
struct Prepared {
    /// 원격 질의의 `user_id` (프로젝트 ID)
    owner_id: String,
    /// 체크포인트 `{subject}` 치환값
    subject: String,
    /// 화면 단위 실행의 대상 화면
    screen: Option<ProjectScreen>,
    /// 새 세션에 보낼 메시지
    fresh_message: String,
    /// 재사용할 세션 ID와 그 세션에 보낼 메시지
    reuse: Option<(String, String)>,
}

/// 생성 실행 1회
pub struct GenerationRun {
    ports: GenerationPorts,
    agent_config: AgentConfig,
    relay: ProgressRelay,
    request: GenerationRequest,
    spec: &'static ArtifactSpec,
    pacing: Duration,
}

impl GenerationRun {
    pub fn new(
        ports: GenerationPorts,
        agent_config: AgentConfig,
        relay: ProgressRelay,
        request: GenerationRequest,
        pacing: Duration,
    ) -> Self {
        let spec = request.kind().spec();
        Self {
            ports,
            agent_config,
            relay,
            request,
            spec,
            pacing,
        }
    }

    /// 실행. 진행 프레임은 릴레이로, 결과는 반환값으로
    pub async fn execute(self) -> Result<Completion, GenerationError> {
        let run_id = self.relay.run_id();
        info!(%run_id, kind = ?self.spec.kind, project_id = %self.request.project_id(), "생성 실행 시작");

        if let Some(opening) = self.spec.opening() {
            self.checkpoint(opening, "").await;
        }

        // 설정 오류는 네트워크 호출 전에 실패
        let endpoint = self.agent_config.endpoint(self.spec.agent)?;
        let prepared = self.prepare().await?;
        let token = self.ports.tokens.access_token().await?.token;

        let (session_id, message, reused) = match &prepared.reuse {
            Some((session_id, message)) => {
                debug!(%run_id, %session_id, "기존 세션 재사용");
                (session_id.clone(), message.clone(), true)
            }
            None => {
                let session_id = self.open_session(&endpoint, &token, &prepared).await?;
                (session_id, prepared.fresh_message.clone(), false)
            }
        };

        for checkpoint in self.spec.preparing() {
            self.pace().await;
            self.checkpoint(checkpoint, &prepared.subject).await;
        }

        let raw = match self
            .ports
            .agent
            .query(&endpoint, &token, &session_id, &prepared.owner_id, &message)
            .await
        {
            Ok(raw) => raw,
            Err(err) if reused && !matches!(err, CoreError::UpstreamTimeout { .. }) => {
                warn!(%run_id, %session_id, error = %err, "세션 만료 추정, 새 세션으로 재시도");
                let session_id = self.open_session(&endpoint, &token, &prepared).await?;
                self.ports
                    .agent
                    .query(
                        &endpoint,
                        &token,
                        &session_id,
                        &prepared.owner_id,
                        &prepared.fresh_message,
                    )
                    .await?
            }
            Err(err) => return Err(err.into()),
        };
        debug!(%run_id, response_len = raw.len(), "에이전트 응답 수신");

        for checkpoint in self.spec.after_query {
            self.pace().await;
            self.checkpoint(checkpoint, &prepared.subject).await;
        }

        let artifact = extract(&raw, self.spec.shape).ok_or_else(|| {
            warn!(%run_id, preview = %preview(&raw), "응답에서 산출물 추출 실패");
            GenerationError::NoArtifact(self.spec.no_artifact_message.to_string())
        })?;

        self.ensure_live()?;
        self.persist(artifact, prepared.screen.as_ref()).await
    }

    // ============================================================
    // 사전 조건
    // ============================================================

    async fn prepare(&self) -> Result<Prepared, GenerationError> {
        let store = &self.ports.store;
        let project = store.project(self.request.project_id()).await?;
        let owner_id = project.id.to_string();

        match &self.request {
            GenerationRequest::Requirements { .. } => {
                let documents = store.documents(project.id).await?;
                if documents.is_empty() {
                    return Err(GenerationError::Precondition(NO_DOCUMENTS.into()));
                }
                let combined = prompt::combine_documents(&documents)
                    .ok_or_else(|| GenerationError::Precondition(NO_DOCUMENT_TEXT.into()))?;
                Ok(Prepared {
                    owner_id,
                    subject: project.name.clone(),
                    screen: None,
                    fresh_message: prompt::requirements_message(&combined),
                    reuse: None,
                })
            }
            GenerationRequest::DesignSystem { .. } => {
                let prd = require_prd(&project)?;
                let template = self.template_for(&project).await;
                let subject = template
                    .as_ref()
                    .map(|t| t.display_name().to_string())
                    .unwrap_or_else(|| UNNAMED_TEMPLATE.to_string());
                Ok(Prepared {
                    owner_id,
                    subject,
                    screen: None,
                    fresh_message: prompt::design_system_message(prd, template.as_ref()),
                    reuse: None,
                })
            }
            GenerationRequest::ScreenInventory { .. } => {
                let prd = require_prd(&project)?;
                Ok(Prepared {
                    owner_id,
                    subject: project.name.clone(),
                    screen: None,
                    fresh_message: prompt::screen_inventory_message(prd),
                    reuse: None,
                })
            }
            GenerationRequest::Prototype { screen_id, .. } => {
                let prd = require_prd(&project)?;
                let design_system = project
                    .design_system()
                    .ok_or_else(|| GenerationError::Precondition(NO_DESIGN_SYSTEM.into()))?;
                let screen = self.owned_screen(&project, *screen_id).await?;
                let fresh_message = prompt::prototype_message(
                    &screen,
                    prd,
                    design_system,
                    project.template_id.as_deref(),
                );
                Ok(Prepared {
                    owner_id,
                    subject: screen.name.clone(),
                    screen: Some(screen),
                    fresh_message,
                    reuse: None,
                })
            }
            GenerationRequest::Refinement {
                screen_id,
                instruction,
                ..
            } => {
                let screen = self.owned_screen(&project, *screen_id).await?;
                let current_html = screen
                    .prototype()
                    .ok_or_else(|| GenerationError::Precondition(NO_PROTOTYPE.into()))?;
                if instruction.trim().is_empty() {
                    return Err(GenerationError::Precondition(NO_INSTRUCTION.into()));
                }

                let fresh_message = prompt::refinement_replay_message(current_html, instruction);
                let reuse = screen
                    .agent_session
                    .as_ref()
                    .filter(|s| !s.session_id.trim().is_empty())
                    .map(|s| (s.session_id.clone(), prompt::refinement_message(instruction)));
                Ok(Prepared {
                    owner_id,
                    subject: screen.name.clone(),
                    fresh_message,
                    reuse,
                    screen: Some(screen),
                })
            }
        }
    }

    async fn owned_screen(
        &self,
        project: &Project,
        screen_id: Uuid,
    ) -> Result<ProjectScreen, GenerationError> {
        let screen = self.ports.store.screen(screen_id).await?;
        if screen.project_id != project.id {
            return Err(GenerationError::Precondition(FOREIGN_SCREEN.into()));
        }
        Ok(screen)
    }

    /// 선택된 템플릿 메타데이터. 읽기 실패는 템플릿 없이 진행
    async fn template_for(&self, project: &Project) -> Option<TemplateMetadata> {
        let template_id = project.template_id.as_deref()?;
        match self.ports.templates.metadata(template_id).await {
            Ok(Some(metadata)) => Some(metadata),
            Ok(None) => {
                warn!(template_id, "템플릿 메타데이터 없음");
                None
            }
            Err(e) => {
                warn!(template_id, error = %e, "템플릿 메타데이터 읽기 실패");
                None
            }
        }
    }

    // ============================================================
    // 세션 / 진행
    // ============================================================

    /// 새 세션 생성. 화면 단위 실행은 질의 전에 화면에 저장
    async fn open_session(
        &self,
        endpoint: &AgentEndpoint,
        token: &str,
        prepared: &Prepared,
    ) -> Result<String, GenerationError> {
        let session_id = self
            .ports
            .agent
            .create_session(endpoint, token, &prepared.owner_id)
            .await?;
        info!(run_id = %self.relay.run_id(), %session_id, agent = ?self.spec.agent, "원격 세션 생성");

        if let Some(screen) = prepared.screen.as_ref().filter(|_| self.spec.kind.is_screen_scoped()) {
            self.ensure_live()?;
            let session =
                RemoteSession::new(session_id.clone(), screen.id.to_string(), self.spec.agent);
            self.ports.store.save_agent_session(screen.id, session).await?;
        }
        Ok(session_id)
    }

    /// 상한 시간을 넘겨 취소된 실행은 저장 직전에 중단
    fn ensure_live(&self) -> Result<(), GenerationError> {
        if self.relay.is_cancelled() {
            warn!(run_id = %self.relay.run_id(), "취소된 실행, 결과를 저장하지 않음");
            return Err(GenerationError::Cancelled);
        }
        Ok(())
    }

    async fn checkpoint(&self, checkpoint: &Checkpoint, subject: &str) {
        self.relay
            .emit_progress(checkpoint.stage, checkpoint.percent, checkpoint.render(subject))
            .await;
    }

    async fn pace(&self) {
        if !self.pacing.is_zero() {
            tokio::time::sleep(self.pacing).await;
        }
    }

    // ============================================================
    // 저장
    // ============================================================

    async fn persist(
        &self,
        artifact: ExtractedArtifact,
        screen: Option<&ProjectScreen>,
    ) -> Result<Completion, GenerationError> {
        let store = &self.ports.store;
        let project_id = self.request.project_id();
        let message = self.spec.success_message.to_string();

        let completion = match (self.spec.kind, artifact, screen) {
            (ArtifactKind::Requirements, ExtractedArtifact::Text(content), _) => {
                store.save_artifact(project_id, ProjectArtifact::Prd, &content).await?;
                Completion {
                    message,
                    payload: ArtifactPayload::Content { content },
                }
            }
            (ArtifactKind::DesignSystem, ExtractedArtifact::Text(content), _) => {
                store
                    .save_artifact(project_id, ProjectArtifact::DesignSystem, &content)
                    .await?;
                Completion {
                    message,
                    payload: ArtifactPayload::Content { content },
                }
            }
            (ArtifactKind::ScreenInventory, ExtractedArtifact::Screens(definitions), _) => {
                let screens = store.replace_screens(project_id, &definitions).await?;
                Completion {
                    message: message.replace("{count}", &screens.len().to_string()),
                    payload: ArtifactPayload::Screens { screens },
                }
            }
            (ArtifactKind::Prototype, ExtractedArtifact::Markup { html, notes }, Some(screen)) => {
                store.save_prototype(screen.id, &html).await?;
                Completion {
                    message,
                    payload: ArtifactPayload::Prototype {
                        html_content: html,
                        design_notes: notes,
                    },
                }
            }
            (ArtifactKind::Refinement, ExtractedArtifact::Markup { html, .. }, Some(screen)) => {
                store.save_prototype(screen.id, &html).await?;
                Completion {
                    message,
                    payload: ArtifactPayload::Refinement { refined_html: html },
                }
            }
            (kind, _, _) => {
                return Err(CoreError::Internal(format!("{kind:?}: 산출물 형태 불일치")).into());
            }
        };

        debug!(run_id = %self.relay.run_id(), kind = ?self.spec.kind, "산출물 저장 완료");
        Ok(completion)
    }
}

fn require_prd(project: &Project) -> Result<&str, GenerationError> {
    project
        .prd()
        .ok_or_else(|| GenerationError::Precondition(NO_PRD.into()))
}

/// 로그용 응답 앞부분
fn preview(raw: &str) -> String {
    raw.chars().take(300).collect()
}
