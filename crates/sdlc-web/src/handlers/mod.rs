//! API 핸들러 모듈.

pub mod generation;
pub mod health;
pub mod projects;
pub mod screens;

use crate::error::ApiError;

/// 필수 문자열 필드 검사
pub(crate) fn require_text(field: &str, value: &str) -> Result<(), ApiError> {
    if value.trim().is_empty() {
        return Err(ApiError::BadRequest(format!("{field} 필드가 비어 있음")));
    }
    Ok(())
}
