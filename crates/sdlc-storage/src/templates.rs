//! 파일 기반 디자인 템플릿 카탈로그.
//!
//! `{root}/{templateId}/metadata.json` 을 읽는다.

use async_trait::async_trait;
use sdlc_core::error::CoreError;
use sdlc_core::models::template::TemplateMetadata;
use sdlc_core::ports::template::TemplateCatalog;
use std::path::PathBuf;
use tracing::debug;

/// 메타데이터 파일 이름
const METADATA_FILE: &str = "metadata.json";

/// `TemplateCatalog` 파일 구현. 루트가 없으면 항상 `None`
pub struct FileTemplateCatalog {
    root: Option<PathBuf>,
}

impl FileTemplateCatalog {
    pub fn new(root: Option<PathBuf>) -> Self {
        Self { root }
    }
}

#[async_trait]
impl TemplateCatalog for FileTemplateCatalog {
    async fn metadata(&self, template_id: &str) -> Result<Option<TemplateMetadata>, CoreError> {
        let Some(root) = &self.root else {
            return Ok(None);
        };

        let id = template_id.trim();
        if id.is_empty() || id.contains(['/', '\\']) || id.contains("..") {
            return Err(CoreError::Validation {
                field: "templateId".to_string(),
                message: format!("허용되지 않는 템플릿 ID: {template_id}"),
            });
        }

        let path = root.join(id).join(METADATA_FILE);
        let raw = match tokio::fs::read_to_string(&path).await {
            Ok(raw) => raw,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!(path = %path.display(), "템플릿 메타데이터 없음");
                return Ok(None);
            }
            Err(e) => return Err(e.into()),
        };

        let mut metadata: TemplateMetadata = serde_json::from_str(&raw)?;
        if metadata.id.is_empty() {
            metadata.id = id.to_string();
        }
        Ok(Some(metadata))
    }
}
