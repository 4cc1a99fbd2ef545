//! SDLC Assist 핵심 에러 타입.
//!
//! 모든 어댑터 crate는 자체 에러 타입에서 `#[from] CoreError`로 래핑한다.

use thiserror::Error;

/// 코어 레이어 에러.
/// 설정, 원격 에이전트 전송, 저장소 조회 등 도메인 공통 에러를 정의한다.
#[derive(Debug, Error)]
pub enum CoreError {
    /// JSON 직렬화/역직렬화 실패
    #[error("직렬화 에러: {0}")]
    Serialization(#[from] serde_json::Error),

    /// 설정값 오류 (자격증명/엔드포인트 누락 등). 재시도하지 않는다.
    #[error("설정 에러: {0}")]
    Config(String),

    /// 필드 유효성 검증 실패
    #[error("유효성 검증 실패 ({field}): {message}")]
    Validation {
        /// 검증 실패한 필드명
        field: String,
        /// 실패 사유
        message: String,
    },

    /// 인증 실패 (토큰 발급 거부 등)
    #[error("인증 에러: {0}")]
    Auth(String),

    /// 리소스를 찾을 수 없음
    #[error("{resource_type} 미발견: {id}")]
    NotFound {
        /// 리소스 종류 (예: "Project", "Screen")
        resource_type: String,
        /// 리소스 식별자
        id: String,
    },

    /// 네트워크 에러 (연결 실패, 스트림 중단)
    #[error("네트워크 에러: {0}")]
    Network(String),

    /// 원격 에이전트가 2xx 이외의 상태를 반환
    #[error("에이전트 응답 에러 ({status}): {body}")]
    UpstreamStatus {
        /// HTTP 상태 코드
        status: u16,
        /// 원본 응답 본문 (진단용)
        body: String,
    },

    /// 원격 호출 총 시간 초과
    #[error("에이전트 응답 타임아웃: {timeout_secs}초 초과")]
    UpstreamTimeout {
        /// 적용된 타임아웃 (초)
        timeout_secs: u64,
    },

    /// 원격 응답 형식이 계약과 다름
    #[error("잘못된 에이전트 응답: {0}")]
    MalformedResponse(String),

    /// 내부 에러 (예상치 못한 상황)
    #[error("내부 에러: {0}")]
    Internal(String),

    /// I/O 에러
    #[error("I/O 에러: {0}")]
    Io(#[from] std::io::Error),
}

impl CoreError {
    /// `NotFound` 생성 헬퍼
    pub fn not_found(resource_type: &str, id: impl ToString) -> Self {
        Self::NotFound {
            resource_type: resource_type.to_string(),
            id: id.to_string(),
        }
    }

    /// 원격 전송 계층에서 발생한 에러인지 여부
    pub fn is_transport(&self) -> bool {
        matches!(
            self,
            CoreError::Network(_)
                | CoreError::UpstreamStatus { .. }
                | CoreError::UpstreamTimeout { .. }
                | CoreError::MalformedResponse(_)
        )
    }
}
