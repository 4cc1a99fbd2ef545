//! 산출물 종류별 실행 전략 표.

use sdlc_core::models::session::AgentRole;

use crate::extract::ExpectedShape;

/// 생성 산출물 종류
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ArtifactKind {
    Requirements,
    DesignSystem,
    ScreenInventory,
    Prototype,
    Refinement,
}

/// 진행 체크포인트 (단계 토큰, 퍼센트, 메시지)
///
/// 메시지의 `{subject}`는 실행 시 템플릿/화면 이름으로 치환된다.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Checkpoint {
    pub stage: &'static str,
    pub percent: u8,
    pub message: &'static str,
}

impl Checkpoint {
    const fn new(stage: &'static str, percent: u8, message: &'static str) -> Self {
        Self {
            stage,
            percent,
            message,
        }
    }

    pub fn render(&self, subject: &str) -> String {
        self.message.replace("{subject}", subject)
    }
}

/// 종류별 고정 매개변수
#[derive(Debug)]
pub struct ArtifactSpec {
    pub kind: ArtifactKind,
    pub agent: AgentRole,
    /// SSE 이벤트 이름
    pub event_name: &'static str,
    pub shape: ExpectedShape,
    /// 첫 항목이 시작 체크포인트
    pub before_query: &'static [Checkpoint],
    pub after_query: &'static [Checkpoint],
    pub no_artifact_message: &'static str,
    pub success_message: &'static str,
}

const EMPTY_RESPONSE: &str = "Agent returned empty response. Please try again.";

static REQUIREMENTS: ArtifactSpec = ArtifactSpec {
    kind: ArtifactKind::Requirements,
    agent: AgentRole::Requirements,
    event_name: "progress",
    shape: ExpectedShape::Text,
    before_query: &[
        Checkpoint::new("INITIALIZING", 5, "Initializing requirements analysis..."),
        Checkpoint::new("READING_DOCUMENTS", 15, "Reading uploaded documents..."),
        Checkpoint::new("ANALYZING_REQUIREMENTS", 40, "Analyzing requirements..."),
    ],
    after_query: &[
        Checkpoint::new("DRAFTING_PRD", 85, "Drafting requirements document..."),
        Checkpoint::new("FINALIZING", 95, "Finalizing document..."),
    ],
    no_artifact_message: EMPTY_RESPONSE,
    success_message: "Requirements document generated.",
};

static DESIGN_SYSTEM: ArtifactSpec = ArtifactSpec {
    kind: ArtifactKind::DesignSystem,
    agent: AgentRole::DesignSystem,
    event_name: "progress",
    shape: ExpectedShape::Text,
    before_query: &[
        Checkpoint::new("INITIALIZING", 5, "Initializing design system generation..."),
        Checkpoint::new("ANALYZING_PRD", 20, "Analyzing PRD for UI requirements..."),
        Checkpoint::new("EXTRACTING_DOMAIN", 35, "Extracting domain-specific patterns..."),
        Checkpoint::new("APPLYING_TEMPLATE", 50, "Applying {subject} design tokens..."),
    ],
    after_query: &[
        Checkpoint::new("GENERATING_COLORS", 65, "Generating color palette..."),
        Checkpoint::new("GENERATING_TYPOGRAPHY", 75, "Defining typography scale..."),
        Checkpoint::new("GENERATING_COMPONENTS", 85, "Specifying component patterns..."),
        Checkpoint::new("FINALIZING", 95, "Finalizing design system..."),
    ],
    no_artifact_message: EMPTY_RESPONSE,
    success_message: "Design system generated.",
};

static SCREEN_INVENTORY: ArtifactSpec = ArtifactSpec {
    kind: ArtifactKind::ScreenInventory,
    agent: AgentRole::ScreenExtraction,
    event_name: "progress",
    shape: ExpectedShape::ScreenArray,
    before_query: &[
        Checkpoint::new("INITIALIZING", 5, "Initializing screen extraction..."),
        Checkpoint::new("READING_PRD", 15, "Reading PRD content..."),
        Checkpoint::new("ANALYZING_EPICS", 30, "Analyzing epics and user stories..."),
        Checkpoint::new("EXTRACTING_FLOWS", 50, "Extracting user flows..."),
    ],
    after_query: &[
        Checkpoint::new("IDENTIFYING_SCREENS", 65, "Identifying screens..."),
        Checkpoint::new("CLASSIFYING_SCREENS", 80, "Classifying screen types..."),
        Checkpoint::new("FINALIZING", 92, "Finalizing screen inventory..."),
    ],
    no_artifact_message: "Agent returned no screens. Please try again or check your PRD content.",
    // 화면 수를 넣어 실행 시 조립
    success_message: "Found {count} screens.",
};

static PROTOTYPE: ArtifactSpec = ArtifactSpec {
    kind: ArtifactKind::Prototype,
    agent: AgentRole::ScreenGeneration,
    event_name: "progress",
    shape: ExpectedShape::MarkupDocument,
    before_query: &[
        Checkpoint::new("INITIALIZING", 5, "Initializing prototype generation..."),
        Checkpoint::new("LOADING_CONTEXT", 15, "Loading PRD and design system..."),
        Checkpoint::new("ANALYZING_SCREEN", 30, "Analyzing screen requirements for \"{subject}\"..."),
        Checkpoint::new("GENERATING", 50, "Generating HTML prototype..."),
    ],
    after_query: &[
        Checkpoint::new("APPLYING_STYLES", 75, "Applying design system styles..."),
        Checkpoint::new("FINALIZING", 92, "Finalizing prototype..."),
    ],
    no_artifact_message: "Agent returned empty prototype. Please try again.",
    success_message: "Prototype generated.",
};

static REFINEMENT: ArtifactSpec = ArtifactSpec {
    kind: ArtifactKind::Refinement,
    agent: AgentRole::ScreenGeneration,
    event_name: "refine",
    shape: ExpectedShape::CompleteDocument,
    before_query: &[
        Checkpoint::new("THINKING", 0, "Connecting to agent..."),
        Checkpoint::new("REFINING", 40, "Applying your changes to \"{subject}\"..."),
    ],
    after_query: &[Checkpoint::new("FINALIZING", 90, "Finalizing updated prototype...")],
    no_artifact_message: "Agent returned an unusable prototype. Please try again.",
    success_message: "Prototype updated.",
};

impl ArtifactKind {
    pub fn spec(self) -> &'static ArtifactSpec {
        match self {
            ArtifactKind::Requirements => &REQUIREMENTS,
            ArtifactKind::DesignSystem => &DESIGN_SYSTEM,
            ArtifactKind::ScreenInventory => &SCREEN_INVENTORY,
            ArtifactKind::Prototype => &PROTOTYPE,
            ArtifactKind::Refinement => &REFINEMENT,
        }
    }

    /// 세션을 화면에 저장하는 종류인지
    pub fn is_screen_scoped(self) -> bool {
        matches!(self, ArtifactKind::Prototype | ArtifactKind::Refinement)
    }
}

impl ArtifactSpec {
    /// 시작 체크포인트 (사전 조건 검사 전에 방출)
    pub fn opening(&self) -> Option<&Checkpoint> {
        self.before_query.first()
    }

    /// 시작 체크포인트 이후의 질의 전 체크포인트
    pub fn preparing(&self) -> &[Checkpoint] {
        self.before_query.get(1..).unwrap_or_default()
    }
}
