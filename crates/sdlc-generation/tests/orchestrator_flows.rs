//! 생성 실행 흐름 통합 테스트.
//!
//! 인메모리 저장소 + 각본 에이전트로 전체 실행을 돌리고 SSE 프레임 열을 검사한다.

use async_trait::async_trait;
use chrono::{Duration as ChronoDuration, Utc};
use parking_lot::Mutex;
use sdlc_core::config::{AgentConfig, AgentResourceIds, RelayConfig};
use sdlc_core::error::CoreError;
use sdlc_core::models::project::{Project, ProjectArtifact, ProjectDocument};
use sdlc_core::models::screen::{ProjectScreen, ScreenDefinition};
use sdlc_core::models::session::{AgentEndpoint, AgentRole, RemoteSession};
use sdlc_core::ports::agent::AgentSessionClient;
use sdlc_core::ports::credentials::{AccessToken, AccessTokenProvider};
use sdlc_core::ports::store::ProjectStore;
use sdlc_generation::{GenerationPorts, GenerationRequest, GenerationService, RelayFrame, RelayStream};
use sdlc_storage::memory::MemoryProjectStore;
use sdlc_storage::templates::FileTemplateCatalog;
use std::collections::HashSet;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use uuid::Uuid;

// ============================================================
// 테스트 더블
// ============================================================

struct FixedToken;

#[async_trait]
impl AccessTokenProvider for FixedToken {
    async fn access_token(&self) -> Result<AccessToken, CoreError> {
        Ok(AccessToken {
            token: "test-token".to_string(),
            expires_at: Utc::now() + ChronoDuration::hours(1),
        })
    }
}

/// 정해진 응답을 돌려주는 에이전트. `stale` 세션으로의 질의는 404
#[derive(Default)]
struct ScriptedAgent {
    response: String,
    hang: bool,
    query_delay: Option<std::time::Duration>,
    session_delay: Option<std::time::Duration>,
    answered: AtomicUsize,
    stale: Mutex<HashSet<String>>,
    created: AtomicUsize,
    queries: Mutex<Vec<(String, String)>>,
}

impl ScriptedAgent {
    fn answering(response: &str) -> Arc<Self> {
        Arc::new(Self {
            response: response.to_string(),
            ..Default::default()
        })
    }

    fn hanging() -> Arc<Self> {
        Arc::new(Self {
            hang: true,
            ..Default::default()
        })
    }

    /// 응답은 하지만 `delay` 뒤에야 돌려준다
    fn late(response: &str, delay: std::time::Duration) -> Arc<Self> {
        Arc::new(Self {
            response: response.to_string(),
            query_delay: Some(delay),
            ..Default::default()
        })
    }

    /// 세션 생성이 `delay` 만큼 걸린다
    fn slow_sessions(response: &str, delay: std::time::Duration) -> Arc<Self> {
        Arc::new(Self {
            response: response.to_string(),
            session_delay: Some(delay),
            ..Default::default()
        })
    }

    fn answered(&self) -> usize {
        self.answered.load(Ordering::SeqCst)
    }

    fn mark_stale(&self, session_id: &str) {
        self.stale.lock().insert(session_id.to_string());
    }

    fn created(&self) -> usize {
        self.created.load(Ordering::SeqCst)
    }

    fn queries(&self) -> Vec<(String, String)> {
        self.queries.lock().clone()
    }
}

#[async_trait]
impl AgentSessionClient for ScriptedAgent {
    async fn create_session(
        &self,
        _endpoint: &AgentEndpoint,
        token: &str,
        _owner_id: &str,
    ) -> Result<String, CoreError> {
        assert_eq!(token, "test-token");
        if let Some(delay) = self.session_delay {
            tokio::time::sleep(delay).await;
        }
        let n = self.created.fetch_add(1, Ordering::SeqCst) + 1;
        Ok(format!("session-{n}"))
    }

    async fn query(
        &self,
        _endpoint: &AgentEndpoint,
        _token: &str,
        session_id: &str,
        _owner_id: &str,
        message: &str,
    ) -> Result<String, CoreError> {
        self.queries
            .lock()
            .push((session_id.to_string(), message.to_string()));
        if self.hang {
            std::future::pending::<()>().await;
        }
        if let Some(delay) = self.query_delay {
            tokio::time::sleep(delay).await;
        }
        if self.stale.lock().contains(session_id) {
            return Err(CoreError::UpstreamStatus {
                status: 404,
                body: "session not found".to_string(),
            });
        }
        self.answered.fetch_add(1, Ordering::SeqCst);
        Ok(self.response.clone())
    }
}

// ============================================================
// 헬퍼
// ============================================================

fn agent_config() -> AgentConfig {
    AgentConfig {
        project_id: "demo-project".to_string(),
        agents: AgentResourceIds {
            requirements: "1".to_string(),
            design_system: "2".to_string(),
            screen_extraction: "3".to_string(),
            screen_generation: "4".to_string(),
        },
        ..AgentConfig::default()
    }
}

fn relay_config() -> RelayConfig {
    RelayConfig {
        checkpoint_pacing_ms: 0,
        ..RelayConfig::default()
    }
}

fn service_with(
    store: Arc<MemoryProjectStore>,
    agent: Arc<ScriptedAgent>,
    agent_config: AgentConfig,
) -> GenerationService {
    let ports = GenerationPorts {
        tokens: Arc::new(FixedToken),
        agent,
        store,
        templates: Arc::new(FileTemplateCatalog::new(None)),
    };
    GenerationService::new(ports, agent_config, relay_config())
}

fn service(store: Arc<MemoryProjectStore>, agent: Arc<ScriptedAgent>) -> GenerationService {
    service_with(store, agent, agent_config())
}

async fn collect(mut stream: RelayStream) -> Vec<RelayFrame> {
    let mut frames = Vec::new();
    while let Some(frame) = stream.frames.recv().await {
        frames.push(frame);
    }
    frames
}

fn stages(frames: &[RelayFrame]) -> Vec<String> {
    frames.iter().map(|f| f.stage().to_string()).collect()
}

/// 퍼센트 비감소 + 종료 프레임은 정확히 하나이고 마지막
fn assert_well_formed(frames: &[RelayFrame]) {
    let percents: Vec<u64> = frames
        .iter()
        .filter(|f| !f.is_terminal())
        .map(|f| f.payload()["progress"].as_u64().unwrap())
        .collect();
    assert!(percents.windows(2).all(|w| w[0] <= w[1]), "{percents:?}");
    assert_eq!(frames.iter().filter(|f| f.is_terminal()).count(), 1);
    assert!(frames.last().unwrap().is_terminal());
}

fn error_message(frames: &[RelayFrame]) -> String {
    let payload = frames.last().unwrap().payload();
    assert_eq!(payload["event"], "ERROR");
    payload["message"].as_str().unwrap().to_string()
}

fn definition(name: &str) -> ScreenDefinition {
    ScreenDefinition {
        id: String::new(),
        name: name.to_string(),
        description: format!("{name} screen"),
        screen_type: Default::default(),
        epic_name: "Core".to_string(),
        complexity: Default::default(),
        user_role: "User".to_string(),
        notes: String::new(),
        display_order: 0,
    }
}

async fn project_with_prd(store: &MemoryProjectStore) -> Project {
    let project = store
        .create_project(Project::new("Shop", None))
        .await
        .unwrap();
    store
        .save_artifact(project.id, ProjectArtifact::Prd, "# PRD\nSell things.")
        .await
        .unwrap()
}

/// PRD + 디자인 시스템 + 화면 하나
async fn designed_project(store: &MemoryProjectStore) -> (Project, ProjectScreen) {
    let project = project_with_prd(store).await;
    let project = store
        .save_artifact(project.id, ProjectArtifact::DesignSystem, "# Design\nBlue.")
        .await
        .unwrap();
    let screens = store
        .replace_screens(project.id, &[definition("Login")])
        .await
        .unwrap();
    (project, screens[0].clone())
}

const PROTOTYPE_JSON: &str = r#"Here is the prototype:
```json
{"htmlContent":"<!DOCTYPE html><html><body>Login</body></html>","cssContent":"","designNotes":"Centered card."}
```"#;

const REFINED_HTML: &str = "<!DOCTYPE html><html><body>Blue button</body></html>";

// ============================================================
// 정상 흐름
// ============================================================

#[tokio::test]
async fn requirements_run_streams_checkpoints_then_persists() {
    let store = Arc::new(MemoryProjectStore::new());
    let project = store
        .create_project(Project::new("Shop", None))
        .await
        .unwrap();
    store
        .add_document(ProjectDocument::new(project.id, "brief.txt", "Build a shop."))
        .await
        .unwrap();
    let agent = ScriptedAgent::answering("# Requirements\n\nUsers can buy.");

    let stream = service(store.clone(), agent.clone()).start(GenerationRequest::Requirements {
        project_id: project.id,
    });
    assert_eq!(stream.event_name, "progress");
    let frames = collect(stream).await;

    assert_well_formed(&frames);
    assert_eq!(
        stages(&frames),
        [
            "INITIALIZING",
            "READING_DOCUMENTS",
            "ANALYZING_REQUIREMENTS",
            "DRAFTING_PRD",
            "FINALIZING",
            "COMPLETE"
        ]
    );
    let done = frames.last().unwrap().payload();
    assert_eq!(done["progress"], 100);
    assert_eq!(done["message"], "Requirements document generated.");
    assert_eq!(done["content"], "# Requirements\n\nUsers can buy.");

    let saved = store.project(project.id).await.unwrap();
    assert_eq!(saved.prd(), Some("# Requirements\n\nUsers can buy."));
    assert!(saved.prd_generated_at.is_some());

    let queries = agent.queries();
    assert_eq!(queries.len(), 1);
    assert!(queries[0].1.contains("=== brief.txt ===\nBuild a shop."));
}

#[tokio::test]
async fn screen_inventory_replaces_screens_with_real_ids() {
    let store = Arc::new(MemoryProjectStore::new());
    let project = project_with_prd(&store).await;
    let agent = ScriptedAgent::answering(
        "```json\n[{\"name\":\"Login\",\"screenType\":\"AUTH\"},{\"name\":\"Catalog\",\"screenType\":\"list\"}]\n```",
    );

    let frames = collect(
        service(store.clone(), agent).start(GenerationRequest::ScreenInventory {
            project_id: project.id,
        }),
    )
    .await;

    assert_well_formed(&frames);
    let done = frames.last().unwrap().payload();
    assert_eq!(done["message"], "Found 2 screens.");
    assert_eq!(done["screens"][0]["screenType"], "auth");

    let persisted = store.screens(project.id).await.unwrap();
    assert_eq!(persisted.len(), 2);
    assert_eq!(done["screens"][0]["id"], persisted[0].id.to_string());
    assert_eq!(persisted[1].name, "Catalog");
}

#[tokio::test]
async fn prototype_run_persists_session_and_markup() {
    let store = Arc::new(MemoryProjectStore::new());
    let (project, screen) = designed_project(&store).await;
    let agent = ScriptedAgent::answering(PROTOTYPE_JSON);

    let frames = collect(service(store.clone(), agent.clone()).start(
        GenerationRequest::Prototype {
            project_id: project.id,
            screen_id: screen.id,
        },
    ))
    .await;

    assert_well_formed(&frames);
    assert!(frames
        .iter()
        .any(|f| f.payload()["message"] == "Analyzing screen requirements for \"Login\"..."));
    let done = frames.last().unwrap().payload();
    assert_eq!(done["htmlContent"], "<!DOCTYPE html><html><body>Login</body></html>");
    assert_eq!(done["designNotes"], "Centered card.");

    let saved = store.screen(screen.id).await.unwrap();
    assert_eq!(saved.prototype(), Some("<!DOCTYPE html><html><body>Login</body></html>"));
    let session = saved.agent_session.unwrap();
    assert_eq!(session.session_id, "session-1");
    assert_eq!(session.owner_entity_id, screen.id.to_string());
    assert_eq!(session.created_for_agent, AgentRole::ScreenGeneration);
}

// ============================================================
// 수정 + 세션 복구
// ============================================================

async fn prototyped_screen(store: &MemoryProjectStore, session_id: Option<&str>) -> (Project, ProjectScreen) {
    let (project, screen) = designed_project(store).await;
    store
        .save_prototype(screen.id, "<!DOCTYPE html><html><body>Login</body></html>")
        .await
        .unwrap();
    if let Some(session_id) = session_id {
        store
            .save_agent_session(
                screen.id,
                RemoteSession::new(
                    session_id.to_string(),
                    screen.id.to_string(),
                    AgentRole::ScreenGeneration,
                ),
            )
            .await
            .unwrap();
    }
    (project, screen)
}

fn refinement(project: &Project, screen: &ProjectScreen) -> GenerationRequest {
    GenerationRequest::Refinement {
        project_id: project.id,
        screen_id: screen.id,
        instruction: "Make the button blue".to_string(),
    }
}

#[tokio::test]
async fn refinement_reuses_persisted_session() {
    let store = Arc::new(MemoryProjectStore::new());
    let (project, screen) = prototyped_screen(&store, Some("session-old")).await;
    let agent = ScriptedAgent::answering(REFINED_HTML);

    let stream = service(store.clone(), agent.clone()).start(refinement(&project, &screen));
    assert_eq!(stream.event_name, "refine");
    let frames = collect(stream).await;

    assert_well_formed(&frames);
    assert_eq!(
        stages(&frames),
        ["THINKING", "REFINING", "FINALIZING", "COMPLETE"]
    );
    assert_eq!(frames.last().unwrap().payload()["refinedHtml"], REFINED_HTML);
    assert_eq!(agent.created(), 0);

    let queries = agent.queries();
    assert_eq!(queries.len(), 1);
    assert_eq!(queries[0].0, "session-old");
    assert!(queries[0].1.starts_with("Make the button blue\n\nReturn ONLY"));
}

#[tokio::test]
async fn stale_session_is_replaced_once_and_context_replayed() {
    let store = Arc::new(MemoryProjectStore::new());
    let (project, screen) = prototyped_screen(&store, Some("session-old")).await;
    let agent = ScriptedAgent::answering(REFINED_HTML);
    agent.mark_stale("session-old");

    let frames = collect(service(store.clone(), agent.clone()).start(refinement(&project, &screen))).await;

    assert_well_formed(&frames);
    let done = frames.last().unwrap().payload();
    assert_eq!(done["event"], "COMPLETE");
    assert_eq!(done["message"], "Prototype updated.");
    assert_eq!(agent.created(), 1);

    let queries = agent.queries();
    assert_eq!(queries.len(), 2);
    assert_eq!(queries[1].0, "session-1");
    assert!(queries[1]
        .1
        .starts_with("Here is the current prototype HTML you previously generated:\n\n<!DOCTYPE html>"));
    assert!(queries[1]
        .1
        .contains("Now apply the following change: Make the button blue"));

    let saved = store.screen(screen.id).await.unwrap();
    assert_eq!(saved.agent_session.as_ref().unwrap().session_id, "session-1");
    assert_eq!(saved.prototype(), Some(REFINED_HTML));
}

#[tokio::test]
async fn second_failure_after_recovery_is_terminal() {
    let store = Arc::new(MemoryProjectStore::new());
    let (project, screen) = prototyped_screen(&store, Some("session-old")).await;
    let agent = ScriptedAgent::answering(REFINED_HTML);
    agent.mark_stale("session-old");
    agent.mark_stale("session-1");

    let frames = collect(service(store.clone(), agent.clone()).start(refinement(&project, &screen))).await;

    assert_well_formed(&frames);
    let message = error_message(&frames);
    assert!(message.starts_with("Generation failed: "), "{message}");
    assert!(message.contains("404"));
    assert_eq!(agent.created(), 1);
    assert_eq!(agent.queries().len(), 2);

    // 프로토타입은 그대로
    let saved = store.screen(screen.id).await.unwrap();
    assert_eq!(saved.prototype(), Some("<!DOCTYPE html><html><body>Login</body></html>"));
}

#[tokio::test]
async fn first_refinement_opens_session_with_replay() {
    let store = Arc::new(MemoryProjectStore::new());
    let (project, screen) = prototyped_screen(&store, None).await;
    let agent = ScriptedAgent::answering(REFINED_HTML);

    let frames = collect(service(store.clone(), agent.clone()).start(refinement(&project, &screen))).await;

    assert_well_formed(&frames);
    assert_eq!(agent.created(), 1);
    let queries = agent.queries();
    assert_eq!(queries.len(), 1);
    assert!(queries[0].1.starts_with("Here is the current prototype HTML"));
    assert_eq!(
        store.screen(screen.id).await.unwrap().agent_session.unwrap().session_id,
        "session-1"
    );
}

// ============================================================
// 실패 경로
// ============================================================

#[tokio::test]
async fn precondition_failures_carry_specific_messages() {
    let store = Arc::new(MemoryProjectStore::new());
    let agent = ScriptedAgent::answering("unused");
    let svc = service(store.clone(), agent.clone());

    let empty = store
        .create_project(Project::new("Empty", None))
        .await
        .unwrap();
    let frames = collect(svc.start(GenerationRequest::Requirements {
        project_id: empty.id,
    }))
    .await;
    assert_eq!(stages(&frames), ["INITIALIZING", "ERROR"]);
    assert_eq!(
        error_message(&frames),
        "No files uploaded for this project. Upload documents first."
    );

    store
        .add_document(ProjectDocument::new(empty.id, "scan.pdf", "  \n "))
        .await
        .unwrap();
    let frames = collect(svc.start(GenerationRequest::Requirements {
        project_id: empty.id,
    }))
    .await;
    assert_eq!(
        error_message(&frames),
        "No text could be extracted from the uploaded files."
    );

    for request in [
        GenerationRequest::DesignSystem {
            project_id: empty.id,
        },
        GenerationRequest::ScreenInventory {
            project_id: empty.id,
        },
    ] {
        let frames = collect(svc.start(request)).await;
        assert_eq!(
            error_message(&frames),
            "No PRD found. Generate a PRD in the Planning phase first."
        );
    }

    let prd_only = project_with_prd(&store).await;
    let orphan = store
        .replace_screens(prd_only.id, &[definition("Orphan")])
        .await
        .unwrap();
    let frames = collect(svc.start(GenerationRequest::Prototype {
        project_id: prd_only.id,
        screen_id: orphan[0].id,
    }))
    .await;
    assert_eq!(
        error_message(&frames),
        "No design system found. Complete the Design System step first."
    );

    let (other_project, _) = designed_project(&store).await;
    let frames = collect(svc.start(GenerationRequest::Prototype {
        project_id: other_project.id,
        screen_id: orphan[0].id,
    }))
    .await;
    assert_eq!(error_message(&frames), "Screen does not belong to this project");

    let frames = collect(svc.start(GenerationRequest::Refinement {
        project_id: prd_only.id,
        screen_id: orphan[0].id,
        instruction: "Make it pop".to_string(),
    }))
    .await;
    assert_eq!(
        error_message(&frames),
        "No prototype found for this screen. Generate it first."
    );

    let (project, screen) = prototyped_screen(&store, None).await;
    let frames = collect(svc.start(GenerationRequest::Refinement {
        project_id: project.id,
        screen_id: screen.id,
        instruction: "   ".to_string(),
    }))
    .await;
    assert_eq!(error_message(&frames), "Refinement instruction is required.");

    assert_eq!(agent.created(), 0);
    assert!(agent.queries().is_empty());
}

#[tokio::test]
async fn unusable_response_is_no_artifact() {
    let store = Arc::new(MemoryProjectStore::new());
    let project = project_with_prd(&store).await;
    let agent = ScriptedAgent::answering("I could not find any screens in this document.");

    let frames = collect(
        service(store.clone(), agent).start(GenerationRequest::ScreenInventory {
            project_id: project.id,
        }),
    )
    .await;

    assert_well_formed(&frames);
    assert_eq!(
        error_message(&frames),
        "Agent returned no screens. Please try again or check your PRD content."
    );
    assert!(store.screens(project.id).await.unwrap().is_empty());
}

#[tokio::test]
async fn missing_agent_configuration_fails_before_network() {
    let store = Arc::new(MemoryProjectStore::new());
    let project = project_with_prd(&store).await;
    let agent = ScriptedAgent::answering("unused");

    let frames = collect(
        service_with(store, agent.clone(), AgentConfig::default()).start(
            GenerationRequest::DesignSystem {
                project_id: project.id,
            },
        ),
    )
    .await;

    assert!(error_message(&frames).starts_with("Generation failed: agent is not configured"));
    assert_eq!(agent.created(), 0);
}

#[tokio::test]
async fn unknown_project_fails_generically() {
    let store = Arc::new(MemoryProjectStore::new());
    let frames = collect(
        service(store, ScriptedAgent::answering("unused")).start(GenerationRequest::Requirements {
            project_id: Uuid::new_v4(),
        }),
    )
    .await;
    assert_well_formed(&frames);
    assert!(error_message(&frames).starts_with("Generation failed: "));
}

#[tokio::test(start_paused = true)]
async fn never_returning_upstream_times_out_after_five_minutes() {
    let store = Arc::new(MemoryProjectStore::new());
    let project = project_with_prd(&store).await;
    let agent = ScriptedAgent::hanging();

    let frames = collect(
        service(store.clone(), agent.clone()).start(GenerationRequest::DesignSystem {
            project_id: project.id,
        }),
    )
    .await;

    assert_well_formed(&frames);
    assert_eq!(error_message(&frames), "Agent timed out after 5 minutes");
    assert_eq!(agent.queries().len(), 1);
    assert!(store.project(project.id).await.unwrap().design_system().is_none());
}

#[tokio::test(start_paused = true)]
async fn late_answer_after_timeout_is_not_persisted() {
    let store = Arc::new(MemoryProjectStore::new());
    let project = project_with_prd(&store).await;
    let agent = ScriptedAgent::late("# Late design system", std::time::Duration::from_secs(360));

    let frames = collect(
        service(store.clone(), agent.clone()).start(GenerationRequest::DesignSystem {
            project_id: project.id,
        }),
    )
    .await;

    assert_well_formed(&frames);
    assert_eq!(error_message(&frames), "Agent timed out after 5 minutes");

    // 중단되지 않은 작업이 늦게 끝날 때까지 진행
    tokio::time::sleep(std::time::Duration::from_secs(120)).await;
    assert_eq!(agent.answered(), 1);
    assert!(store.project(project.id).await.unwrap().design_system().is_none());
}

#[tokio::test(start_paused = true)]
async fn session_opened_after_timeout_is_not_attached_to_screen() {
    let store = Arc::new(MemoryProjectStore::new());
    let (project, screen) = designed_project(&store).await;
    let agent = ScriptedAgent::slow_sessions(PROTOTYPE_JSON, std::time::Duration::from_secs(360));

    let frames = collect(service(store.clone(), agent.clone()).start(
        GenerationRequest::Prototype {
            project_id: project.id,
            screen_id: screen.id,
        },
    ))
    .await;

    assert_eq!(error_message(&frames), "Agent timed out after 5 minutes");

    tokio::time::sleep(std::time::Duration::from_secs(120)).await;
    assert_eq!(agent.created(), 1);
    assert!(agent.queries().is_empty());
    let saved = store.screen(screen.id).await.unwrap();
    assert!(saved.agent_session.is_none());
    assert!(saved.prototype().is_none());
}

#[tokio::test]
async fn refinement_rejects_html_fragment_and_keeps_prototype() {
    let store = Arc::new(MemoryProjectStore::new());
    let (project, screen) = prototyped_screen(&store, Some("session-old")).await;
    let agent = ScriptedAgent::answering(
        r#"{"htmlContent":"<button class=\"blue\">Buy</button>","designNotes":"bluer"}"#,
    );

    let frames = collect(service(store.clone(), agent).start(refinement(&project, &screen))).await;

    assert_well_formed(&frames);
    assert_eq!(
        error_message(&frames),
        "Agent returned an unusable prototype. Please try again."
    );
    let saved = store.screen(screen.id).await.unwrap();
    assert_eq!(saved.prototype(), Some("<!DOCTYPE html><html><body>Login</body></html>"));
}

#[tokio::test]
async fn rerunning_inventory_discards_prototypes_and_sessions() {
    let store = Arc::new(MemoryProjectStore::new());
    let (project, screen) = prototyped_screen(&store, Some("session-old")).await;
    let agent = ScriptedAgent::answering(r#"[{"name":"Login","screenType":"auth"}]"#);

    let frames = collect(service(store.clone(), agent).start(
        GenerationRequest::ScreenInventory {
            project_id: project.id,
        },
    ))
    .await;
    assert_well_formed(&frames);

    let screens = store.screens(project.id).await.unwrap();
    assert_eq!(screens.len(), 1);
    assert_eq!(screens[0].name, "Login");
    assert_ne!(screens[0].id, screen.id);
    assert!(screens[0].prototype().is_none());
    assert!(screens[0].agent_session.is_none());
    assert!(store.screen(screen.id).await.is_err());
}
