//! 도메인 모델.

pub mod progress;
pub mod project;
pub mod screen;
pub mod session;
pub mod template;
