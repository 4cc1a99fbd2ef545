//! 스트림 프레임 디코더.
//!
//! 에이전트 배포마다 프레임 스키마가 달라서, 알려진 형태를 순서대로 시도하고
//! 처음으로 비어 있지 않은 텍스트를 반환한다. 어떤 형태에도 맞지 않는 프레임
//! (종료 사유 알림 등 제어 프레임)은 `None`이며 에러가 아니다.

use serde_json::Value;
use tracing::trace;

/// 형태 하나를 검사하는 순수 함수
type ShapeProbe = fn(&Value) -> Option<String>;

/// 검사 순서 (먼저 맞는 것이 이김)
const SHAPE_PROBES: &[(&str, ShapeProbe)] = &[
    ("output", output_string),
    ("output.content.parts", output_content_parts),
    ("output.text", output_text),
    ("content.parts", content_parts),
    ("candidates", candidates),
    ("text", top_level_text),
];

/// 프레임 JSON 문자열 디코드
///
/// JSON이 아니면 `Err`. 호출자가 로그 후 건너뛴다.
pub fn decode_frame(data: &str) -> Result<Option<String>, serde_json::Error> {
    let value: Value = serde_json::from_str(data)?;
    Ok(decode_value(&value))
}

/// 파싱된 프레임에서 텍스트 추출
pub fn decode_value(frame: &Value) -> Option<String> {
    SHAPE_PROBES.iter().find_map(|(shape, probe)| {
        let text = probe(frame).filter(|text| !text.is_empty())?;
        trace!(shape, len = text.len(), "프레임 형태 일치");
        Some(text)
    })
}

fn output_string(frame: &Value) -> Option<String> {
    frame.get("output")?.as_str().map(str::to_string)
}

fn output_content_parts(frame: &Value) -> Option<String> {
    join_parts(frame.get("output")?.get("content")?.get("parts")?)
}

fn output_text(frame: &Value) -> Option<String> {
    frame
        .get("output")?
        .get("text")?
        .as_str()
        .map(str::to_string)
}

fn content_parts(frame: &Value) -> Option<String> {
    join_parts(frame.get("content")?.get("parts")?)
}

/// 모든 후보의 parts를 배열 순서대로 이어 붙임
fn candidates(frame: &Value) -> Option<String> {
    let joined: String = frame
        .get("candidates")?
        .as_array()?
        .iter()
        .filter_map(|c| join_parts(c.get("content")?.get("parts")?))
        .collect();
    Some(joined)
}

fn top_level_text(frame: &Value) -> Option<String> {
    frame.get("text")?.as_str().map(str::to_string)
}

/// `parts[].text` 연결. 배열이 아니면 `None`
fn join_parts(parts: &Value) -> Option<String> {
    let joined: String = parts
        .as_array()?
        .iter()
        .filter_map(|part| part.get("text").and_then(Value::as_str))
        .collect();
    Some(joined)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn decode(data: &str) -> Option<String> {
        decode_frame(data).unwrap()
    }

    #[test]
    fn output_as_string() {
        assert_eq!(decode(r#"{"output":"hello"}"#).as_deref(), Some("hello"));
    }

    #[test]
    fn output_content_parts_concatenated() {
        let frame = r#"{"output":{"content":{"parts":[{"text":"ab"},{"inline_data":{}},{"text":"cd"}]}}}"#;
        assert_eq!(decode(frame).as_deref(), Some("abcd"));
    }

    #[test]
    fn output_text_field() {
        assert_eq!(
            decode(r#"{"output":{"text":"nested"}}"#).as_deref(),
            Some("nested")
        );
    }

    #[test]
    fn top_level_content_parts() {
        let frame = r#"{"content":{"role":"model","parts":[{"text":"x"},{"text":"y"}]},"author":"agent"}"#;
        assert_eq!(decode(frame).as_deref(), Some("xy"));
    }

    #[test]
    fn candidates_concatenated_in_order() {
        let frame = r#"{"candidates":[
            {"content":{"parts":[{"text":"first "}]}},
            {"content":{"parts":[{"text":"second"}]}}
        ]}"#;
        assert_eq!(decode(frame).as_deref(), Some("first second"));
    }

    #[test]
    fn bare_text() {
        assert_eq!(decode(r#"{"text":"plain"}"#).as_deref(), Some("plain"));
    }

    #[test]
    fn empty_match_falls_through_to_next_shape() {
        // output.content.parts가 비어 있으면 다음 형태(text)로 넘어간다
        let frame = r#"{"output":{"content":{"parts":[]}},"text":"fallback"}"#;
        assert_eq!(decode(frame).as_deref(), Some("fallback"));
    }

    #[test]
    fn earlier_shape_wins() {
        let frame = r#"{"output":"from-output","text":"from-text"}"#;
        assert_eq!(decode(frame).as_deref(), Some("from-output"));
    }

    #[test]
    fn control_frames_are_none() {
        assert_eq!(decode(r#"{"finish_reason":"STOP"}"#), None);
        assert_eq!(decode(r#"{"actions":{"state_delta":{}}}"#), None);
        assert_eq!(decode(r#"{"output":{"usage":{"tokens":3}}}"#), None);
        assert_eq!(decode("[]"), None);
    }

    #[test]
    fn non_json_is_error() {
        assert!(decode_frame("not json").is_err());
    }
}
