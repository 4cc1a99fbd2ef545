//! 생성 실행 에러.

use sdlc_core::error::CoreError;
use thiserror::Error;

/// 생성 실행 1회의 실패 사유
#[derive(Debug, Error)]
pub enum GenerationError {
    /// 선행 산출물 누락 등. 메시지를 그대로 사용자에게 보여준다.
    #[error("사전 조건 불충족: {0}")]
    Precondition(String),

    /// 에이전트 응답에서 쓸 수 있는 산출물을 찾지 못함
    #[error("산출물 없음: {0}")]
    NoArtifact(String),

    /// 상한 시간 초과로 취소된 실행. 아무것도 저장하지 않는다.
    #[error("실행 취소됨")]
    Cancelled,

    /// 설정/전송/저장소 에러
    #[error(transparent)]
    Core(#[from] CoreError),
}

impl GenerationError {
    /// ERROR 프레임에 실을 사용자용 메시지
    pub fn user_message(&self) -> String {
        match self {
            GenerationError::Precondition(msg) | GenerationError::NoArtifact(msg) => msg.clone(),
            GenerationError::Cancelled => "Generation was cancelled".to_string(),
            GenerationError::Core(CoreError::UpstreamTimeout { timeout_secs }) => format!(
                "Generation failed: agent did not respond within {timeout_secs} seconds"
            ),
            GenerationError::Core(CoreError::Config(msg)) => {
                format!("Generation failed: agent is not configured ({msg})")
            }
            GenerationError::Core(err) => format!("Generation failed: {err}"),
        }
    }
}
