//! 생성 실행의 진행/종료 모델.
//!
//! 어떤 것도 저장되지 않으며 실행 1회의 SSE 스트림 위에만 존재한다.

use serde::Serialize;

use super::screen::ProjectScreen;

/// 진행 프레임 하나
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProgressEvent {
    /// 대문자 단계 토큰 (예: `INITIALIZING`)
    #[serde(rename = "event")]
    pub stage: String,
    /// 0..=100, 실행 내에서 감소하지 않음
    #[serde(rename = "progress")]
    pub percent: u8,
    pub message: String,
}

/// 완료 프레임에 실리는 산출물별 키
#[derive(Debug, Clone, Serialize)]
#[serde(untagged)]
pub enum ArtifactPayload {
    /// 자유 텍스트 (PRD, 디자인 시스템)
    Content { content: String },
    /// 저장된 화면 목록
    Screens { screens: Vec<ProjectScreen> },
    /// 프로토타입 HTML + 설명
    Prototype {
        #[serde(rename = "htmlContent")]
        html_content: String,
        #[serde(rename = "designNotes")]
        design_notes: String,
    },
    /// 수정된 HTML
    Refinement {
        #[serde(rename = "refinedHtml")]
        refined_html: String,
    },
}

/// 성공 종료 결과
#[derive(Debug, Clone, Serialize)]
pub struct Completion {
    pub message: String,
    #[serde(flatten)]
    pub payload: ArtifactPayload,
}

/// 실행 1회의 종료 결과 (정확히 하나)
#[derive(Debug, Clone)]
pub enum TerminalResult {
    Completion(Completion),
    Failure { message: String },
}
