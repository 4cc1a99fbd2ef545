//! # sdlc-storage
//!
//! 저장소 어댑터.
//!
//! ## 모듈
//! - `memory`: 프로젝트/문서/화면 인메모리 저장소 (`ProjectStore` 구현)
//! - `templates`: 디자인 템플릿 메타데이터 파일 카탈로그 (`TemplateCatalog` 구현)

pub mod memory;
pub mod templates;
