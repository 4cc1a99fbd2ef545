//! 디자인 템플릿 메타데이터.

use serde::{Deserialize, Serialize};

/// `templates/{id}/metadata.json` 내용
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TemplateMetadata {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub tag: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub prompt_hint: String,
    /// 자유 형식 디자인 토큰
    #[serde(default)]
    pub design_tokens: serde_json::Value,
    #[serde(default)]
    pub components: Vec<String>,
}

impl TemplateMetadata {
    /// 진행 메시지용 표시 이름
    pub fn display_name(&self) -> &str {
        if self.name.trim().is_empty() {
            &self.id
        } else {
            &self.name
        }
    }
}
