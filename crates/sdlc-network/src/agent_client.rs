//! 원격 에이전트 세션 클라이언트.
//!
//! `AgentSessionClient` 포트 구현. 제어 엔드포인트(`:query`)로 세션을 만들고
//! 스트리밍 엔드포인트(`:streamQuery`)의 SSE 프레임을 이어 붙여 한 턴의 응답을 만든다.

use async_trait::async_trait;
use eventsource_stream::{EventStreamError, Eventsource};
use futures::StreamExt;
use sdlc_core::config::AgentConfig;
use sdlc_core::error::CoreError;
use sdlc_core::models::session::AgentEndpoint;
use sdlc_core::ports::agent::AgentSessionClient;
use serde_json::{json, Value};
use std::ops::ControlFlow;
use std::time::Duration;
use tracing::{debug, info, trace, warn};

use crate::frame::decode_frame;

/// 조기 종료 신호
const DONE_SENTINEL: &str = "[DONE]";

/// 로그에 남길 응답 본문 최대 길이
const LOG_BODY_LIMIT: usize = 500;

/// HTTP + SSE 기반 에이전트 클라이언트
pub struct VertexAgentClient {
    client: reqwest::Client,
    create_timeout: Duration,
    query_timeout: Duration,
}

impl VertexAgentClient {
    /// 설정의 타임아웃으로 클라이언트 생성
    pub fn new(config: &AgentConfig) -> Result<Self, CoreError> {
        let client = reqwest::Client::builder()
            .connect_timeout(config.connect_timeout())
            .build()
            .map_err(|e| CoreError::Network(format!("HTTP 클라이언트 빌드 실패: {e}")))?;

        Ok(Self {
            client,
            create_timeout: config.create_timeout(),
            query_timeout: config.query_timeout(),
        })
    }

    /// 전송 에러 매핑. 총 시간 초과는 별도 변형으로 구분한다.
    fn transport_error(err: reqwest::Error, timeout: Duration) -> CoreError {
        if err.is_timeout() {
            CoreError::UpstreamTimeout {
                timeout_secs: timeout.as_secs(),
            }
        } else {
            CoreError::Network(format!("에이전트 요청 실패: {err}"))
        }
    }

    /// 2xx 이외 상태는 상태 코드 + 원본 본문을 담은 에러
    async fn check_response(
        resp: reqwest::Response,
        timeout: Duration,
    ) -> Result<reqwest::Response, CoreError> {
        let status = resp.status();
        if status.is_success() {
            return Ok(resp);
        }

        let body = resp
            .text()
            .await
            .map_err(|e| Self::transport_error(e, timeout))?;
        let preview: String = body.chars().take(LOG_BODY_LIMIT).collect();
        warn!(status = status.as_u16(), body = %preview, "에이전트 에러 응답");

        Err(CoreError::UpstreamStatus {
            status: status.as_u16(),
            body,
        })
    }
}

#[async_trait]
impl AgentSessionClient for VertexAgentClient {
    async fn create_session(
        &self,
        endpoint: &AgentEndpoint,
        token: &str,
        owner_id: &str,
    ) -> Result<String, CoreError> {
        let body = json!({
            "class_method": "create_session",
            "input": { "user_id": owner_id },
        });

        debug!(agent = ?endpoint.role, owner_id, "에이전트 세션 생성 요청");
        let resp = self
            .client
            .post(endpoint.query_url())
            .bearer_auth(token)
            .timeout(self.create_timeout)
            .json(&body)
            .send()
            .await
            .map_err(|e| Self::transport_error(e, self.create_timeout))?;

        let resp = Self::check_response(resp, self.create_timeout).await?;
        let text = resp
            .text()
            .await
            .map_err(|e| Self::transport_error(e, self.create_timeout))?;
        let value: Value = serde_json::from_str(&text).map_err(|e| {
            CoreError::MalformedResponse(format!("세션 생성 응답이 JSON이 아님: {e}"))
        })?;

        let session_id = session_id_from(&value).ok_or_else(|| {
            let preview: String = text.chars().take(LOG_BODY_LIMIT).collect();
            CoreError::MalformedResponse(format!("세션 생성 응답에 세션 ID 없음: {preview}"))
        })?;

        info!(agent = ?endpoint.role, owner_id, session_id = %session_id, "에이전트 세션 생성");
        Ok(session_id)
    }

    async fn query(
        &self,
        endpoint: &AgentEndpoint,
        token: &str,
        session_id: &str,
        owner_id: &str,
        message: &str,
    ) -> Result<String, CoreError> {
        let body = json!({
            "input": {
                "session_id": session_id,
                "user_id": owner_id,
                "message": message,
            }
        });

        debug!(
            agent = ?endpoint.role,
            session_id,
            message_len = message.len(),
            "에이전트 질의 시작"
        );
        let resp = self
            .client
            .post(endpoint.stream_query_url())
            .bearer_auth(token)
            .timeout(self.query_timeout)
            .json(&body)
            .send()
            .await
            .map_err(|e| Self::transport_error(e, self.query_timeout))?;

        let resp = Self::check_response(resp, self.query_timeout).await?;

        let mut events = resp.bytes_stream().eventsource();
        let mut text = String::new();
        while let Some(event) = events.next().await {
            let event = event.map_err(|e| match e {
                EventStreamError::Transport(e) => Self::transport_error(e, self.query_timeout),
                other => CoreError::MalformedResponse(format!("SSE 스트림 파싱 실패: {other}")),
            })?;
            if append_frame_data(&mut text, &event.data).is_break() {
                debug!("[DONE] 수신, 스트림 조기 종료");
                break;
            }
        }

        info!(
            agent = ?endpoint.role,
            session_id,
            response_len = text.len(),
            "에이전트 질의 완료"
        );
        Ok(text)
    }
}

/// 세션 생성 응답에서 ID 추출: `output.id` → 문자열 `output` 순
fn session_id_from(value: &Value) -> Option<String> {
    let output = value.get("output")?;
    let nested = output.get("id").and_then(|id| match id {
        Value::String(s) => Some(s.trim().to_string()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    });
    nested
        .filter(|id| !id.is_empty())
        .or_else(|| output.as_str().map(|s| s.trim().to_string()))
        .filter(|id| !id.is_empty())
}

/// 프레임 data 하나를 누적. `[DONE]`이면 `Break`
///
/// 디코드 실패 프레임은 로그 후 건너뛴다. data 하나에 JSON 여러 줄이
/// 이어져 온 경우 줄 단위로 다시 시도한다.
fn append_frame_data(acc: &mut String, data: &str) -> ControlFlow<()> {
    let data = data.trim();
    if data.is_empty() {
        return ControlFlow::Continue(());
    }
    if data == DONE_SENTINEL {
        return ControlFlow::Break(());
    }

    match decode_frame(data) {
        Ok(Some(fragment)) => acc.push_str(&fragment),
        Ok(None) => trace!("텍스트 없는 제어 프레임 건너뜀"),
        Err(_) if data.contains('\n') => {
            for line in data.lines() {
                if append_frame_data(acc, line).is_break() {
                    return ControlFlow::Break(());
                }
            }
        }
        Err(e) => {
            let preview: String = data.chars().take(120).collect();
            warn!(error = %e, frame = %preview, "프레임 디코드 실패, 건너뜀");
        }
    }
    ControlFlow::Continue(())
}
