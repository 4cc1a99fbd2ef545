//! 에이전트 응답 추출기.
//!
//! 누적된 응답 텍스트에서 기대 형태(텍스트, JSON 배열, HTML 문서)를 꺼낸다.
//! 코드 펜스와 앞뒤 설명문을 견디며, 잘못된 응답에도 패닉/에러 없이 `None`
//! (산출물 없음)으로 떨어진다. 부분적으로 채운 결과는 만들지 않는다.

use sdlc_core::models::screen::{Complexity, ScreenDefinition, ScreenType};
use serde_json::{Map, Value};

/// 마크다운 코드 펜스
const FENCE: &str = "```";

/// 실행이 기대하는 응답 형태
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExpectedShape {
    /// 자유 텍스트 (마크다운 문서)
    Text,
    /// 화면 정의 JSON 배열
    ScreenArray,
    /// `{htmlContent, designNotes}` 객체 또는 HTML 원문
    MarkupDocument,
    /// `MarkupDocument`와 같되 `htmlContent`가 완전한 HTML 문서여야 함
    /// (기존 프로토타입을 통째로 교체하는 수정 실행)
    CompleteDocument,
}

/// 추출된 산출물
#[derive(Debug, Clone, PartialEq)]
pub enum ExtractedArtifact {
    Text(String),
    Screens(Vec<ScreenDefinition>),
    Markup { html: String, notes: String },
}

/// 응답 텍스트에서 산출물 추출. `None` = 산출물 없음
pub fn extract(raw: &str, shape: ExpectedShape) -> Option<ExtractedArtifact> {
    match shape {
        // 문서 본문 안의 코드 블록은 내용의 일부이므로 펜스를 벗기지 않는다
        ExpectedShape::Text => {
            let text = raw.trim();
            (!text.is_empty()).then(|| ExtractedArtifact::Text(text.to_string()))
        }
        ExpectedShape::ScreenArray => extract_screens(strip_code_fence(raw)).map(ExtractedArtifact::Screens),
        ExpectedShape::MarkupDocument => extract_markup(strip_code_fence(raw), false)
            .map(|(html, notes)| ExtractedArtifact::Markup { html, notes }),
        ExpectedShape::CompleteDocument => extract_markup(strip_code_fence(raw), true)
            .map(|(html, notes)| ExtractedArtifact::Markup { html, notes }),
    }
}

/// 첫 번째 ```…``` 블록의 내용. 닫는 펜스가 없으면 원문 그대로
pub fn strip_code_fence(text: &str) -> &str {
    let Some(open) = text.find(FENCE) else {
        return text.trim();
    };
    let after = &text[open + FENCE.len()..];

    // ```json / ```html 같은 언어 태그 줄은 건너뜀
    let body_start = match after.find('\n') {
        Some(newline) if is_language_tag(after[..newline].trim()) => newline + 1,
        _ => 0,
    };
    let body = &after[body_start..];

    match body.find(FENCE) {
        Some(close) => body[..close].trim(),
        None => text.trim(),
    }
}

fn is_language_tag(line: &str) -> bool {
    line.chars()
        .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '+' | '.'))
}

// ============================================================
// 배열 (화면 목록)
// ============================================================

fn extract_screens(text: &str) -> Option<Vec<ScreenDefinition>> {
    let start = text.find('[')?;
    let end = text.rfind(']')?;
    if end < start {
        return None;
    }

    let value: Value = serde_json::from_str(&text[start..=end]).ok()?;
    let records = value.as_array()?;
    if records.is_empty() {
        return None;
    }

    records
        .iter()
        .enumerate()
        .map(|(i, record)| screen_from_record(i, record.as_object()?))
        .collect()
}

fn screen_from_record(index: usize, record: &Map<String, Value>) -> Option<ScreenDefinition> {
    let name = field(record, &["name"])
        .filter(|n| !n.trim().is_empty())
        .unwrap_or_else(|| format!("Screen {}", index + 1));

    Some(ScreenDefinition {
        id: format!("temp-{index}"),
        name,
        description: field(record, &["description"]).unwrap_or_default(),
        screen_type: ScreenType::normalize(
            &field(record, &["screenType", "screen_type"]).unwrap_or_default(),
        ),
        epic_name: field(record, &["epicName", "epic_name"]).unwrap_or_default(),
        complexity: Complexity::normalize(&field(record, &["complexity"]).unwrap_or_default()),
        user_role: field(record, &["userRole", "user_role"]).unwrap_or_default(),
        notes: field(record, &["notes"]).unwrap_or_default(),
        display_order: u32::try_from(index).ok()?,
    })
}

/// 별칭 중 처음 존재하는 필드. 문자열이 아닌 스칼라는 문자열화, null은 없음
fn field(record: &Map<String, Value>, keys: &[&str]) -> Option<String> {
    keys.iter()
        .filter_map(|key| record.get(*key))
        .find(|value| !value.is_null())
        .map(|value| match value {
            Value::String(s) => s.clone(),
            other => other.to_string(),
        })
}

// ============================================================
// 객체 / HTML 문서
// ============================================================

fn extract_markup(text: &str, whole_document: bool) -> Option<(String, String)> {
    if let Some(object) = parse_object(text) {
        let html = field(&object, &["htmlContent", "html_content"]).filter(|h| !h.trim().is_empty());
        if let Some(html) = html {
            if whole_document && !is_html_document(&html) {
                return None;
            }
            let notes = field(&object, &["designNotes", "design_notes"]).unwrap_or_default();
            return Some((html, notes));
        }
    }

    // JSON 봉투 없이 HTML 원문으로 온 경우
    is_html_document(text).then(|| (text.to_string(), String::new()))
}

fn is_html_document(text: &str) -> bool {
    let lowered = text.to_ascii_lowercase();
    lowered.contains("<!doctype") || lowered.contains("<html")
}

/// 통째 파싱 → 실패 시 첫 `{`부터 짝 맞는 `}`까지 파싱
fn parse_object(text: &str) -> Option<Map<String, Value>> {
    if let Ok(Value::Object(object)) = serde_json::from_str::<Value>(text) {
        return Some(object);
    }

    let start = text.find('{')?;
    let end = matching_brace(text, start)?;
    match serde_json::from_str::<Value>(&text[start..=end]) {
        Ok(Value::Object(object)) => Some(object),
        _ => None,
    }
}

/// `start`의 `{`와 짝이 맞는 `}` 위치. 문자열 리터럴 안의 중괄호는 세지 않는다.
fn matching_brace(text: &str, start: usize) -> Option<usize> {
    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;

    for (offset, byte) in text.as_bytes()[start..].iter().enumerate() {
        if in_string {
            match byte {
                _ if escaped => escaped = false,
                b'\\' => escaped = true,
                b'"' => in_string = false,
                _ => {}
            }
            continue;
        }
        match byte {
            b'"' => in_string = true,
            b'{' => depth += 1,
            b'}' => {
                depth = depth.checked_sub(1)?;
                if depth == 0 {
                    return Some(start + offset);
                }
            }
            _ => {}
        }
    }
    None
}
