//! 원격 에이전트 세션 모델.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// 원격 에이전트 패밀리
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum AgentRole {
    /// 업로드 문서 → 요구사항 문서(PRD)
    Requirements,
    /// PRD → 디자인 시스템
    DesignSystem,
    /// PRD → 화면 목록
    ScreenExtraction,
    /// 화면 정의 → HTML 프로토타입 (생성/수정 공용)
    ScreenGeneration,
}

impl AgentRole {
    /// 설정 키 (`agent.agents.<key>`)
    pub fn config_key(&self) -> &'static str {
        match self {
            AgentRole::Requirements => "requirements",
            AgentRole::DesignSystem => "design_system",
            AgentRole::ScreenExtraction => "screen_extraction",
            AgentRole::ScreenGeneration => "screen_generation",
        }
    }
}

/// 에이전트 리소스 하나의 주소
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AgentEndpoint {
    pub role: AgentRole,
    /// `.../reasoningEngines/{id}` 까지의 리소스 URL
    pub resource_url: String,
}

impl AgentEndpoint {
    /// 제어 호출 엔드포인트 (세션 생성)
    pub fn query_url(&self) -> String {
        format!("{}:query", self.resource_url)
    }

    /// 스트리밍 질의 엔드포인트
    pub fn stream_query_url(&self) -> String {
        format!("{}:streamQuery", self.resource_url)
    }
}

/// 원격 에이전트와의 대화 핸들.
///
/// 소유 엔티티(화면)에 평범한 데이터로 저장되며, 무효 판정 시 통째로 교체된다.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RemoteSession {
    /// 에이전트가 발급한 세션 ID
    pub session_id: String,
    /// 대화 대상 엔티티 ID
    pub owner_entity_id: String,
    /// 세션을 발급한 에이전트 패밀리
    pub created_for_agent: AgentRole,
    pub created_at: DateTime<Utc>,
}

impl RemoteSession {
    pub fn new(session_id: String, owner_entity_id: String, agent: AgentRole) -> Self {
        Self {
            session_id,
            owner_entity_id,
            created_for_agent: agent,
            created_at: Utc::now(),
        }
    }
}
