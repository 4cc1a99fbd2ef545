//! # sdlc-generation
//!
//! 산출물 생성 오케스트레이션.
//!
//! 원격 에이전트 세션을 열고 질의한 뒤, 응답에서 산출물을 추출해 저장하고,
//! 그 과정을 진행 릴레이(SSE 프레임)로 클라이언트에 흘려보낸다.
//!
//! ## 모듈
//! - `artifact`: 산출물 종류별 전략 표 (에이전트, 체크포인트, 메시지)
//! - `extract`: 응답 텍스트 → 산출물 (펜스/설명문 내성)
//! - `orchestrator`: 실행 상태 기계 (`GenerationRun`)
//! - `prompt`: 에이전트 메시지 조립
//! - `relay`: 진행 릴레이, 종료 보장 감독
//! - `service`: 동시 실행 제한 + 실행 시작 진입점

pub mod artifact;
pub mod error;
pub mod extract;
pub mod orchestrator;
pub mod prompt;
pub mod relay;
pub mod service;

pub use orchestrator::{GenerationPorts, GenerationRequest};
pub use relay::{RelayFrame, RelayStream};
pub use service::GenerationService;
