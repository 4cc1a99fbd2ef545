//! 생성 서비스. HTTP 계층의 진입점.

use sdlc_core::config::{AgentConfig, RelayConfig};
use std::sync::Arc;
use tokio::sync::Semaphore;
use tracing::{debug, info};

use crate::error::GenerationError;
use crate::orchestrator::{GenerationPorts, GenerationRequest, GenerationRun};
use crate::relay::{supervise, ProgressRelay, RelayStream};

/// 생성 실행을 시작하고 진행 스트림을 돌려준다
#[derive(Clone)]
pub struct GenerationService {
    ports: GenerationPorts,
    agent_config: AgentConfig,
    relay_config: RelayConfig,
    permits: Arc<Semaphore>,
}

impl GenerationService {
    pub fn new(ports: GenerationPorts, agent_config: AgentConfig, relay_config: RelayConfig) -> Self {
        let permits = Arc::new(Semaphore::new(relay_config.max_concurrent_runs.max(1)));
        Self {
            ports,
            agent_config,
            relay_config,
            permits,
        }
    }

    pub fn relay_config(&self) -> &RelayConfig {
        &self.relay_config
    }

    /// 실행 시작. 즉시 반환하며 실행은 백그라운드 태스크에서 진행된다.
    ///
    /// 동시 실행 슬롯 대기 시간도 릴레이 상한 시간에 포함된다.
    pub fn start(&self, request: GenerationRequest) -> RelayStream {
        let spec = request.kind().spec();
        let (relay, stream) =
            ProgressRelay::channel(spec.event_name, self.relay_config.channel_capacity);
        info!(run_id = %stream.run_id, kind = ?spec.kind, "생성 요청 접수");

        let run = GenerationRun::new(
            self.ports.clone(),
            self.agent_config.clone(),
            relay.clone(),
            request,
            self.relay_config.checkpoint_pacing(),
        );
        let permits = Arc::clone(&self.permits);
        let run_id = stream.run_id;

        supervise(relay, self.relay_config.timeout(), async move {
            let _permit = permits.acquire_owned().await.map_err(|e| {
                GenerationError::Core(sdlc_core::error::CoreError::Internal(format!(
                    "실행 슬롯 획득 실패: {e}"
                )))
            })?;
            debug!(%run_id, "실행 슬롯 획득");
            run.execute().await
        });

        stream
    }
}
