//! 디자인 템플릿 카탈로그 포트.

use async_trait::async_trait;

use crate::error::CoreError;
use crate::models::template::TemplateMetadata;

/// 템플릿 메타데이터 조회. 없는 템플릿은 `Ok(None)`
#[async_trait]
pub trait TemplateCatalog: Send + Sync {
    async fn metadata(&self, template_id: &str) -> Result<Option<TemplateMetadata>, CoreError>;
}
