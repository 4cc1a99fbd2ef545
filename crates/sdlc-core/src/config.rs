//! 애플리케이션 설정 구조체.
//!
//! 웹 서버, 원격 에이전트 엔드포인트, 자격증명, 진행 릴레이, 템플릿 카탈로그 설정을
//! 정의한다. `config` crate를 통해 파일/환경변수에서 로드 ([`crate::config_manager`]).

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

use crate::error::CoreError;
use crate::models::session::{AgentEndpoint, AgentRole};

/// 최상위 애플리케이션 설정
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// 웹 서버 설정
    #[serde(default)]
    pub web: WebConfig,
    /// 원격 에이전트 설정
    #[serde(default)]
    pub agent: AgentConfig,
    /// 에이전트 플랫폼 자격증명
    #[serde(default)]
    pub credentials: CredentialConfig,
    /// 진행 릴레이 설정
    #[serde(default)]
    pub relay: RelayConfig,
    /// 디자인 템플릿 카탈로그 설정
    #[serde(default)]
    pub templates: TemplateConfig,
}

impl AppConfig {
    /// 기본 설정 생성
    pub fn default_config() -> Self {
        Self::default()
    }

    /// 값 범위 검증. 에이전트 리소스 누락은 실행 시점에 확인한다.
    pub fn validate(&self) -> Result<(), CoreError> {
        if self.relay.timeout_secs == 0 {
            return Err(CoreError::Validation {
                field: "relay.timeout_secs".to_string(),
                message: "0보다 커야 합니다".to_string(),
            });
        }
        if self.relay.channel_capacity == 0 {
            return Err(CoreError::Validation {
                field: "relay.channel_capacity".to_string(),
                message: "0보다 커야 합니다".to_string(),
            });
        }
        if self.relay.max_concurrent_runs == 0 {
            return Err(CoreError::Validation {
                field: "relay.max_concurrent_runs".to_string(),
                message: "0보다 커야 합니다".to_string(),
            });
        }
        if self.agent.query_timeout_secs == 0 || self.agent.create_timeout_secs == 0 {
            return Err(CoreError::Validation {
                field: "agent.*_timeout_secs".to_string(),
                message: "타임아웃은 0보다 커야 합니다".to_string(),
            });
        }
        Ok(())
    }
}

// ============================================================
// 웹 서버 설정
// ============================================================

/// 웹 서버 설정
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WebConfig {
    /// 웹 서버 포트 (기본: 8080)
    #[serde(default = "default_web_port")]
    pub port: u16,
    /// 외부 접근 허용 여부 (false: 127.0.0.1 only)
    #[serde(default)]
    pub allow_external: bool,
}

impl Default for WebConfig {
    fn default() -> Self {
        Self {
            port: default_web_port(),
            allow_external: false,
        }
    }
}

fn default_web_port() -> u16 {
    8080
}

// ============================================================
// 원격 에이전트 설정
// ============================================================

/// 에이전트 패밀리별 리소스 ID (reasoning engine ID)
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AgentResourceIds {
    #[serde(default)]
    pub requirements: String,
    #[serde(default)]
    pub design_system: String,
    #[serde(default)]
    pub screen_extraction: String,
    #[serde(default)]
    pub screen_generation: String,
}

/// 원격 에이전트 플랫폼 설정
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentConfig {
    /// 클라우드 프로젝트 ID
    #[serde(default)]
    pub project_id: String,
    /// 리전 (예: us-central1)
    #[serde(default = "default_location")]
    pub location: String,
    /// API 호스트 재정의 (비어 있으면 `https://{location}-aiplatform.googleapis.com`)
    #[serde(default)]
    pub api_base_url: Option<String>,
    /// 패밀리별 에이전트 리소스 ID
    #[serde(default)]
    pub agents: AgentResourceIds,
    /// 연결 수립 타임아웃 (초)
    #[serde(default = "default_connect_timeout_secs")]
    pub connect_timeout_secs: u64,
    /// 세션 생성 호출 타임아웃 (초)
    #[serde(default = "default_create_timeout_secs")]
    pub create_timeout_secs: u64,
    /// 질의 호출 총 타임아웃 (초)
    #[serde(default = "default_query_timeout_secs")]
    pub query_timeout_secs: u64,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            project_id: String::new(),
            location: default_location(),
            api_base_url: None,
            agents: AgentResourceIds::default(),
            connect_timeout_secs: default_connect_timeout_secs(),
            create_timeout_secs: default_create_timeout_secs(),
            query_timeout_secs: default_query_timeout_secs(),
        }
    }
}

impl AgentConfig {
    /// 역할별 리소스 ID
    pub fn resource_id(&self, role: AgentRole) -> &str {
        match role {
            AgentRole::Requirements => &self.agents.requirements,
            AgentRole::DesignSystem => &self.agents.design_system,
            AgentRole::ScreenExtraction => &self.agents.screen_extraction,
            AgentRole::ScreenGeneration => &self.agents.screen_generation,
        }
    }

    /// 역할에 해당하는 에이전트 엔드포인트 구성
    ///
    /// 프로젝트/리소스 ID가 비어 있으면 네트워크 호출 전에 `CoreError::Config`를 반환한다.
    pub fn endpoint(&self, role: AgentRole) -> Result<AgentEndpoint, CoreError> {
        let project = self.project_id.trim();
        if project.is_empty() {
            return Err(CoreError::Config("agent.project_id 미설정".to_string()));
        }
        let location = self.location.trim();
        if location.is_empty() {
            return Err(CoreError::Config("agent.location 미설정".to_string()));
        }
        let resource_id = self.resource_id(role).trim();
        if resource_id.is_empty() {
            return Err(CoreError::Config(format!(
                "agent.agents.{} 미설정",
                role.config_key()
            )));
        }

        let base = match self.api_base_url.as_deref().map(str::trim) {
            Some(url) if !url.is_empty() => url.trim_end_matches('/').to_string(),
            _ => format!("https://{location}-aiplatform.googleapis.com"),
        };

        Ok(AgentEndpoint {
            role,
            resource_url: format!(
                "{base}/v1/projects/{project}/locations/{location}/reasoningEngines/{resource_id}"
            ),
        })
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_secs)
    }

    pub fn create_timeout(&self) -> Duration {
        Duration::from_secs(self.create_timeout_secs)
    }

    pub fn query_timeout(&self) -> Duration {
        Duration::from_secs(self.query_timeout_secs)
    }
}

fn default_location() -> String {
    "us-central1".to_string()
}

fn default_connect_timeout_secs() -> u64 {
    30
}

fn default_create_timeout_secs() -> u64 {
    120
}

fn default_query_timeout_secs() -> u64 {
    300
}

// ============================================================
// 자격증명 설정
// ============================================================

/// 에이전트 플랫폼 자격증명 설정
///
/// 우선순위: `access_token` → `json` → `file` → `GOOGLE_APPLICATION_CREDENTIALS` → 메타데이터 서버
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CredentialConfig {
    /// 고정 액세스 토큰 (갱신하지 않음)
    #[serde(default)]
    pub access_token: Option<String>,
    /// 인라인 자격증명 JSON
    #[serde(default)]
    pub json: Option<String>,
    /// 자격증명 JSON 파일 경로
    #[serde(default)]
    pub file: Option<PathBuf>,
    /// 메타데이터 서버 사용 여부 (클라우드 런타임 내부)
    #[serde(default)]
    pub use_metadata_server: bool,
    /// OAuth2 토큰 엔드포인트
    #[serde(default = "default_token_uri")]
    pub token_uri: String,
    /// 메타데이터 서버 주소
    #[serde(default = "default_metadata_url")]
    pub metadata_url: String,
    /// 요청 스코프
    #[serde(default = "default_scope")]
    pub scope: String,
}

impl Default for CredentialConfig {
    fn default() -> Self {
        Self {
            access_token: None,
            json: None,
            file: None,
            use_metadata_server: false,
            token_uri: default_token_uri(),
            metadata_url: default_metadata_url(),
            scope: default_scope(),
        }
    }
}

fn default_token_uri() -> String {
    "https://oauth2.googleapis.com/token".to_string()
}

fn default_metadata_url() -> String {
    "http://metadata.google.internal".to_string()
}

fn default_scope() -> String {
    "https://www.googleapis.com/auth/cloud-platform".to_string()
}

// ============================================================
// 진행 릴레이 설정
// ============================================================

/// 진행 릴레이(SSE) 설정
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RelayConfig {
    /// 실행 1회의 최대 시간 (초). 초과 시 ERROR 프레임 합성
    #[serde(default = "default_relay_timeout_secs")]
    pub timeout_secs: u64,
    /// SSE keep-alive 간격 (초)
    #[serde(default = "default_keep_alive_secs")]
    pub keep_alive_secs: u64,
    /// 프레임 채널 용량
    #[serde(default = "default_channel_capacity")]
    pub channel_capacity: usize,
    /// 동시 실행 상한
    #[serde(default = "default_max_concurrent_runs")]
    pub max_concurrent_runs: usize,
    /// 체크포인트 사이 표시용 지연 (밀리초)
    #[serde(default = "default_checkpoint_pacing_ms")]
    pub checkpoint_pacing_ms: u64,
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            timeout_secs: default_relay_timeout_secs(),
            keep_alive_secs: default_keep_alive_secs(),
            channel_capacity: default_channel_capacity(),
            max_concurrent_runs: default_max_concurrent_runs(),
            checkpoint_pacing_ms: default_checkpoint_pacing_ms(),
        }
    }
}

impl RelayConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    pub fn keep_alive(&self) -> Duration {
        Duration::from_secs(self.keep_alive_secs)
    }

    pub fn checkpoint_pacing(&self) -> Duration {
        Duration::from_millis(self.checkpoint_pacing_ms)
    }
}

fn default_relay_timeout_secs() -> u64 {
    300
}

fn default_keep_alive_secs() -> u64 {
    15
}

fn default_channel_capacity() -> usize {
    64
}

fn default_max_concurrent_runs() -> usize {
    16
}

fn default_checkpoint_pacing_ms() -> u64 {
    400
}

// ============================================================
// 템플릿 카탈로그 설정
// ============================================================

/// 디자인 템플릿 카탈로그 설정
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TemplateConfig {
    /// `{dir}/{templateId}/metadata.json` 루트. 없으면 템플릿 없이 생성
    #[serde(default)]
    pub dir: Option<PathBuf>,
}
