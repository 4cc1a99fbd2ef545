//! 화면 정의 모델.
//!
//! 열거형 필드(화면 유형, 복잡도)는 대소문자 무시로 정규화하며,
//! 알 수 없는 값은 기본값으로 대체한다 (레코드 전체를 실패시키지 않음).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::session::RemoteSession;

/// 화면 유형 (닫힌 집합)
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase", from = "String")]
pub enum ScreenType {
    Dashboard,
    #[default]
    List,
    Detail,
    Form,
    Modal,
    Settings,
    Auth,
    Report,
    Wizard,
    Empty,
}

impl ScreenType {
    /// 자유 문자열을 정규화. `login`/`register`는 `auth`로 취급
    pub fn normalize(raw: &str) -> Self {
        match raw.trim().to_ascii_lowercase().as_str() {
            "dashboard" => Self::Dashboard,
            "list" => Self::List,
            "detail" => Self::Detail,
            "form" => Self::Form,
            "modal" => Self::Modal,
            "settings" => Self::Settings,
            "auth" | "login" | "register" => Self::Auth,
            "report" => Self::Report,
            "wizard" => Self::Wizard,
            "empty" => Self::Empty,
            _ => Self::default(),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Dashboard => "dashboard",
            Self::List => "list",
            Self::Detail => "detail",
            Self::Form => "form",
            Self::Modal => "modal",
            Self::Settings => "settings",
            Self::Auth => "auth",
            Self::Report => "report",
            Self::Wizard => "wizard",
            Self::Empty => "empty",
        }
    }
}

impl From<String> for ScreenType {
    fn from(raw: String) -> Self {
        Self::normalize(&raw)
    }
}

/// 화면 구현 복잡도
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase", from = "String")]
pub enum Complexity {
    Low,
    #[default]
    Medium,
    High,
}

impl Complexity {
    pub fn normalize(raw: &str) -> Self {
        match raw.trim().to_ascii_lowercase().as_str() {
            "low" => Self::Low,
            "medium" => Self::Medium,
            "high" => Self::High,
            _ => Self::default(),
        }
    }
}

impl From<String> for Complexity {
    fn from(raw: String) -> Self {
        Self::normalize(&raw)
    }
}

/// 에이전트가 추출했거나 클라이언트가 보낸 화면 정의
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScreenDefinition {
    /// 추출 직후에는 `temp-{i}`
    #[serde(default)]
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub screen_type: ScreenType,
    #[serde(default)]
    pub epic_name: String,
    #[serde(default)]
    pub complexity: Complexity,
    #[serde(default)]
    pub user_role: String,
    #[serde(default)]
    pub notes: String,
    #[serde(default)]
    pub display_order: u32,
}

/// 프로젝트에 저장된 화면
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectScreen {
    pub id: Uuid,
    pub project_id: Uuid,
    pub name: String,
    pub description: String,
    pub screen_type: ScreenType,
    pub epic_name: String,
    pub complexity: Complexity,
    pub user_role: String,
    pub notes: String,
    pub display_order: u32,
    pub prototype_content: Option<String>,
    pub prototype_generated_at: Option<DateTime<Utc>>,
    /// 프로토타입 생성에 사용한 원격 세션 (역참조, 소유 아님)
    pub agent_session: Option<RemoteSession>,
    pub created_at: DateTime<Utc>,
}

impl ProjectScreen {
    /// 정의로부터 새 화면 레코드 생성
    pub fn from_definition(project_id: Uuid, def: &ScreenDefinition) -> Self {
        Self {
            id: Uuid::new_v4(),
            project_id,
            name: def.name.clone(),
            description: def.description.clone(),
            screen_type: def.screen_type,
            epic_name: def.epic_name.clone(),
            complexity: def.complexity,
            user_role: def.user_role.clone(),
            notes: def.notes.clone(),
            display_order: def.display_order,
            prototype_content: None,
            prototype_generated_at: None,
            agent_session: None,
            created_at: Utc::now(),
        }
    }

    /// 비어 있지 않은 프로토타입 HTML
    pub fn prototype(&self) -> Option<&str> {
        super::project::non_blank(self.prototype_content.as_deref())
    }

    /// 에이전트 프롬프트용 정의 뷰
    pub fn definition(&self) -> ScreenDefinition {
        ScreenDefinition {
            id: self.id.to_string(),
            name: self.name.clone(),
            description: self.description.clone(),
            screen_type: self.screen_type,
            epic_name: self.epic_name.clone(),
            complexity: self.complexity,
            user_role: self.user_role.clone(),
            notes: self.notes.clone(),
            display_order: self.display_order,
        }
    }
}
