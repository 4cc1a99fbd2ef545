//! # sdlc-network
//!
//! 원격 에이전트 플랫폼 네트워크 어댑터.
//! 액세스 토큰 발급/갱신, 세션 생성, SSE 스트림 질의, 프레임 디코딩을 담당한다.
//!
//! ## 사용 예시
//!
//! ```rust,ignore
//! use sdlc_network::agent_client::VertexAgentClient;
//! use sdlc_network::auth::TokenManager;
//!
//! let tokens = TokenManager::from_config(&config.credentials)?;
//! let agent = VertexAgentClient::new(&config.agent)?;
//! ```

pub mod agent_client;
pub mod auth;
pub mod frame;
