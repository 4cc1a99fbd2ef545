//! 원격 에이전트 세션 클라이언트 포트.

use async_trait::async_trait;

use crate::error::CoreError;
use crate::models::session::AgentEndpoint;

/// 원격 에이전트와의 세션 기반 대화
///
/// 구현체: `VertexAgentClient` (HTTP + SSE)
#[async_trait]
pub trait AgentSessionClient: Send + Sync {
    /// `owner_id`를 위한 새 세션 할당 → 세션 ID
    ///
    /// 응답에서 식별자를 얻지 못하면 기본값 없이 실패한다.
    async fn create_session(
        &self,
        endpoint: &AgentEndpoint,
        token: &str,
        owner_id: &str,
    ) -> Result<String, CoreError>;

    /// 한 턴 질의 → 스트림 프레임을 이어 붙인 전체 응답 텍스트
    async fn query(
        &self,
        endpoint: &AgentEndpoint,
        token: &str,
        session_id: &str,
        owner_id: &str,
        message: &str,
    ) -> Result<String, CoreError>;
}
