//! 생성 진행 SSE 핸들러.
//!
//! 핸들러는 실행을 시작하고 즉시 스트림을 반환한다. 실패(사전 조건 포함)는
//! HTTP 상태 코드가 아니라 스트림의 ERROR 프레임으로 전달된다.

use axum::extract::{Path, State};
use axum::http::header::{self, HeaderName};
use axum::response::sse::{Event, KeepAlive, Sse};
use axum::response::IntoResponse;
use axum::Json;
use sdlc_generation::{GenerationRequest, RelayStream};
use serde::Deserialize;
use std::convert::Infallible;
use std::time::Duration;
use tokio_stream::wrappers::ReceiverStream;
use tokio_stream::StreamExt;
use tracing::debug;
use uuid::Uuid;

use crate::AppState;

/// 프록시 버퍼링 비활성화 헤더
const X_ACCEL_BUFFERING: &str = "x-accel-buffering";

/// 수정 요청 본문
#[derive(Debug, Deserialize)]
pub struct RefineRequest {
    #[serde(default)]
    pub message: String,
}

/// 요구사항 문서 생성
///
/// GET /api/projects/{id}/analyze/stream
pub async fn generate_requirements(
    State(state): State<AppState>,
    Path(project_id): Path<Uuid>,
) -> impl IntoResponse {
    start(&state, GenerationRequest::Requirements { project_id })
}

/// 디자인 시스템 생성
///
/// GET /api/projects/{id}/design-system/generate
pub async fn generate_design_system(
    State(state): State<AppState>,
    Path(project_id): Path<Uuid>,
) -> impl IntoResponse {
    start(&state, GenerationRequest::DesignSystem { project_id })
}

/// 화면 목록 추출
///
/// GET /api/projects/{id}/screens/extract
pub async fn extract_screens(
    State(state): State<AppState>,
    Path(project_id): Path<Uuid>,
) -> impl IntoResponse {
    start(&state, GenerationRequest::ScreenInventory { project_id })
}

/// 화면 프로토타입 생성
///
/// GET /api/projects/{id}/screens/{screen_id}/generate
pub async fn generate_prototype(
    State(state): State<AppState>,
    Path((project_id, screen_id)): Path<(Uuid, Uuid)>,
) -> impl IntoResponse {
    start(
        &state,
        GenerationRequest::Prototype {
            project_id,
            screen_id,
        },
    )
}

/// 프로토타입 수정 (`refine` 이벤트)
///
/// POST /api/projects/{id}/screens/{screen_id}/refine
pub async fn refine_prototype(
    State(state): State<AppState>,
    Path((project_id, screen_id)): Path<(Uuid, Uuid)>,
    Json(body): Json<RefineRequest>,
) -> impl IntoResponse {
    start(
        &state,
        GenerationRequest::Refinement {
            project_id,
            screen_id,
            instruction: body.message,
        },
    )
}

fn start(state: &AppState, request: GenerationRequest) -> impl IntoResponse {
    let stream = state.generator.start(request);
    relay_response(stream, state.keep_alive)
}

/// 릴레이 스트림 → SSE 응답. 응답이 해제되면 수신 측도 해제된다.
fn relay_response(stream: RelayStream, keep_alive: Duration) -> impl IntoResponse {
    let RelayStream {
        run_id,
        event_name,
        frames,
    } = stream;
    debug!(%run_id, event_name, "SSE 스트림 연결");

    let events = ReceiverStream::new(frames).map(move |frame| {
        Ok::<_, Infallible>(
            Event::default()
                .event(event_name)
                .data(frame.payload().to_string()),
        )
    });

    let headers = [
        (header::CACHE_CONTROL, "no-cache"),
        (HeaderName::from_static(X_ACCEL_BUFFERING), "no"),
    ];
    let sse = Sse::new(events).keep_alive(KeepAlive::new().interval(keep_alive).text("ping"));
    (headers, sse)
}
