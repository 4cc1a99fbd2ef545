//! 어댑터 생성 (DI 와이어링).
//!
//! `AppConfig` 하나로 저장소, 템플릿 카탈로그, 자격증명, 에이전트 클라이언트,
//! 생성 서비스를 만들어 `AppState`로 묶는다.

use async_trait::async_trait;
use sdlc_core::config::AppConfig;
use sdlc_core::error::CoreError;
use sdlc_core::ports::credentials::{AccessToken, AccessTokenProvider};
use sdlc_generation::{GenerationPorts, GenerationService};
use sdlc_network::agent_client::VertexAgentClient;
use sdlc_network::auth::TokenManager;
use sdlc_storage::memory::MemoryProjectStore;
use sdlc_storage::templates::FileTemplateCatalog;
use sdlc_web::AppState;
use std::sync::Arc;
use tracing::{info, warn};

/// 자격증명이 없을 때의 대체 공급자. 매 실행을 설정 에러로 끝낸다.
struct UnavailableCredentials {
    reason: String,
}

#[async_trait]
impl AccessTokenProvider for UnavailableCredentials {
    async fn access_token(&self) -> Result<AccessToken, CoreError> {
        Err(CoreError::Config(self.reason.clone()))
    }
}

/// 자격증명 공급자 생성
///
/// 자격증명이 잘못되어도 서버는 뜬다. 프로젝트 API는 그대로 쓰이고
/// 생성 실행만 ERROR 프레임으로 끝난다.
fn token_provider(config: &AppConfig) -> Arc<dyn AccessTokenProvider> {
    match TokenManager::from_config(&config.credentials) {
        Ok(manager) => Arc::new(manager),
        Err(e) => {
            warn!("자격증명 초기화 실패, 생성 기능 비활성: {e}");
            let reason = match e {
                CoreError::Config(msg) => msg,
                other => other.to_string(),
            };
            Arc::new(UnavailableCredentials { reason })
        }
    }
}

/// 설정으로 웹 서버 상태 구성
pub fn build_state(config: &AppConfig) -> Result<AppState, CoreError> {
    let store = Arc::new(MemoryProjectStore::new());
    let templates = Arc::new(FileTemplateCatalog::new(config.templates.dir.clone()));
    let agent = Arc::new(VertexAgentClient::new(&config.agent)?);

    let ports = GenerationPorts {
        tokens: token_provider(config),
        agent,
        store: store.clone(),
        templates,
    };
    let generator = GenerationService::new(ports, config.agent.clone(), config.relay.clone());

    info!(
        max_concurrent_runs = config.relay.max_concurrent_runs,
        timeout_secs = config.relay.timeout_secs,
        templates = config.templates.dir.is_some(),
        "생성 서비스 준비"
    );
    Ok(AppState::new(store, generator))
}
