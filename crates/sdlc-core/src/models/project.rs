//! 프로젝트, 업로드 문서 모델.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// 프로젝트. 생성 산출물(PRD, 디자인 시스템)을 필드로 보관
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Project {
    pub id: Uuid,
    pub name: String,
    pub description: Option<String>,
    /// 선택된 디자인 템플릿 ID
    pub template_id: Option<String>,
    pub prd_content: Option<String>,
    pub prd_generated_at: Option<DateTime<Utc>>,
    pub design_system_content: Option<String>,
    pub design_system_updated_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Project {
    pub fn new(name: impl Into<String>, description: Option<String>) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
            description,
            template_id: None,
            prd_content: None,
            prd_generated_at: None,
            design_system_content: None,
            design_system_updated_at: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// 비어 있지 않은 PRD
    pub fn prd(&self) -> Option<&str> {
        non_blank(self.prd_content.as_deref())
    }

    /// 비어 있지 않은 디자인 시스템
    pub fn design_system(&self) -> Option<&str> {
        non_blank(self.design_system_content.as_deref())
    }
}

/// 프로젝트 단위 산출물 필드 키
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ProjectArtifact {
    /// 요구사항 문서
    Prd,
    /// 디자인 시스템 문서
    DesignSystem,
}

/// 업로드된 문서 (텍스트 추출 완료 상태)
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectDocument {
    pub id: Uuid,
    pub project_id: Uuid,
    pub filename: String,
    pub extracted_text: String,
    pub uploaded_at: DateTime<Utc>,
}

impl ProjectDocument {
    pub fn new(project_id: Uuid, filename: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            project_id,
            filename: filename.into(),
            extracted_text: text.into(),
            uploaded_at: Utc::now(),
        }
    }
}

pub(crate) fn non_blank(value: Option<&str>) -> Option<&str> {
    value.filter(|v| !v.trim().is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blank_prd_counts_as_missing() {
        let mut project = Project::new("demo", None);
        assert!(project.prd().is_none());
        project.prd_content = Some("   \n".to_string());
        assert!(project.prd().is_none());
        project.prd_content = Some("# PRD".to_string());
        assert_eq!(project.prd(), Some("# PRD"));
    }

    #[test]
    fn camel_case_wire_names() {
        let project = Project::new("demo", Some("desc".into()));
        let json = serde_json::to_value(&project).unwrap();
        assert!(json.get("prdContent").is_some());
        assert!(json.get("designSystemUpdatedAt").is_some());
        assert!(json.get("templateId").is_some());
    }
}
