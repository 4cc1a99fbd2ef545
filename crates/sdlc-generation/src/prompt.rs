//! 에이전트에 보낼 메시지 조립.

use sdlc_core::models::project::ProjectDocument;
use sdlc_core::models::screen::ProjectScreen;
use sdlc_core::models::template::TemplateMetadata;
use serde_json::{json, Value};
use std::fmt::Write;

/// 수정 메시지 뒤에 붙는 HTML 전용 응답 지시
pub const HTML_ONLY_SUFFIX: &str = "\n\nReturn ONLY the complete updated HTML document. No explanation. \
No markdown code fences. Start with <!DOCTYPE html> and end with </html>.";

/// 템플릿이 없을 때의 템플릿 ID
const DEFAULT_TEMPLATE_ID: &str = "default";

/// 비어 있지 않은 문서를 `=== 파일명 ===` 블록으로 합침. 전부 비면 `None`
pub fn combine_documents(documents: &[ProjectDocument]) -> Option<String> {
    let combined = documents
        .iter()
        .filter(|doc| !doc.extracted_text.trim().is_empty())
        .map(|doc| format!("=== {} ===\n{}", doc.filename, doc.extracted_text))
        .collect::<Vec<_>>()
        .join("\n\n");
    (!combined.trim().is_empty()).then_some(combined)
}

pub fn requirements_message(combined_documents: &str) -> String {
    format!(
        "Generate a comprehensive Product Requirements Document (PRD) based on the following \
uploaded project documents. Format the output as clean Markdown.\n\n{combined_documents}"
    )
}

pub fn design_system_message(prd: &str, template: Option<&TemplateMetadata>) -> String {
    let mut msg =
        String::from("Generate a comprehensive design system document for the following project.\n\n");

    if let Some(template) = template {
        let _ = write!(msg, "SELECTED TEMPLATE: {}", template.display_name());
        if !template.tag.trim().is_empty() {
            let _ = write!(msg, " ({})", template.tag);
        }
        msg.push('\n');
        if !template.description.trim().is_empty() {
            let _ = writeln!(msg, "{}", template.description);
        }
        msg.push('\n');

        if !template.prompt_hint.trim().is_empty() {
            let _ = write!(msg, "DESIGN GUIDANCE:\n{}\n\n", template.prompt_hint);
        }

        if let Value::Object(tokens) = &template.design_tokens {
            msg.push_str("DESIGN TOKENS:\n");
            for (key, value) in tokens {
                let rendered = match value {
                    Value::String(s) => s.clone(),
                    other => other.to_string(),
                };
                let _ = writeln!(msg, "  {key}: {rendered}");
            }
            msg.push('\n');
        }

        if !template.components.is_empty() {
            let _ = write!(msg, "COMPONENT LIBRARY: {}\n\n", template.components.join(", "));
        }
    }

    let _ = write!(msg, "PROJECT PRD:\n{prd}\n\n");
    msg.push_str(
        "Please generate a comprehensive design system document in Markdown format with sections for: \
Color System, Typography, Component Specifications, Layout Patterns, and Implementation Guidelines.",
    );
    msg
}

pub fn screen_inventory_message(prd: &str) -> String {
    format!(
        "PRD Content:\n{prd}\n\n\
Instructions: Analyze the PRD above and identify every distinct UI screen that needs to be designed \
and prototyped. Return ONLY a valid JSON array where each element has these exact fields:\n\
- name: short screen name (e.g., \"User Dashboard\")\n\
- description: what this screen does (1-2 sentences)\n\
- screenType: one of: dashboard, list, detail, form, modal, settings, auth, report, wizard, empty\n\
- epicName: which PRD epic this screen belongs to\n\
- complexity: low, medium, or high\n\
- userRole: primary user role that uses this screen\n\
- notes: any special implementation notes (may be empty string)\n\n\
Return ONLY the JSON array with no additional text, no markdown, no explanations.\n"
    )
}

pub fn prototype_message(
    screen: &ProjectScreen,
    prd: &str,
    design_system: &str,
    template_id: Option<&str>,
) -> String {
    let definition = json!({
        "id": screen.id.to_string(),
        "name": screen.name,
        "description": screen.description,
        "screenType": screen.screen_type.as_str(),
        "epicName": screen.epic_name,
        "complexity": screen.complexity,
        "userRole": screen.user_role,
        "notes": screen.notes,
    });
    let screen_json = serde_json::to_string_pretty(&definition)
        .unwrap_or_else(|_| definition.to_string());
    let template_id = template_id.unwrap_or(DEFAULT_TEMPLATE_ID);

    format!(
        "SCREEN DEFINITION:\n{screen_json}\n\n\
PRD CONTENT:\n{prd}\n\n\
DESIGN SYSTEM:\n{design_system}\n\n\
TEMPLATE ID: {template_id}\n\n\
Generate the HTML prototype for the screen definition above. \
Return ONLY a JSON object (no markdown, no preamble) with these exact fields:\n\
- htmlContent: complete standalone HTML page with inline CSS\n\
- cssContent: the full CSS (also embedded in htmlContent)\n\
- designNotes: 2-3 sentence explanation of key design decisions\n"
    )
}

/// 기존 세션에 보내는 수정 지시
pub fn refinement_message(instruction: &str) -> String {
    format!("{}{HTML_ONLY_SUFFIX}", instruction.trim())
}

/// 새 세션에 보내는 수정 지시 (현재 HTML 재전달)
pub fn refinement_replay_message(current_html: &str, instruction: &str) -> String {
    format!(
        "Here is the current prototype HTML you previously generated:\n\n{current_html}\n\n\
Now apply the following change: {}{HTML_ONLY_SUFFIX}",
        instruction.trim()
    )
}
