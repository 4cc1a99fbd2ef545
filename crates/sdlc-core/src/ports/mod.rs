//! Hexagonal Architecture 포트 인터페이스.
//!
//! 어댑터 crate(`sdlc-network`, `sdlc-storage`)가 구현하고
//! `sdlc-generation`이 `Arc<dyn ...>`로 소비한다.

pub mod agent;
pub mod credentials;
pub mod store;
pub mod template;
