//! 진행 릴레이.
//!
//! 클라이언트 SSE 스트림 하나를 소유한다. 진행 프레임을 보내고, 종료 프레임
//! (COMPLETE 또는 ERROR)은 실행마다 정확히 한 번만 보낸 뒤 스트림을 닫는다.
//!
//! - 전송은 `tokio::sync::Mutex`로 직렬화되어 방출 순서가 유지되고,
//!   종료 프레임 이후에는 아무것도 전달되지 않는다.
//! - [`supervise`]가 작업을 상한 시간 안에서 실행하고, 어떤 경로로 끝나든
//!   종료 프레임과 `close()`를 보장한다. 감독 태스크 자체가 취소되면
//!   [`RelayGuard`]의 `Drop`이 마무리한다.

use sdlc_core::models::progress::{Completion, ProgressEvent, TerminalResult};
use serde_json::{json, Value};
use std::future::Future;
use std::sync::atomic::{AtomicBool, AtomicU8, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, Mutex};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::error::GenerationError;

/// 완료 프레임 단계 토큰
pub const COMPLETE_STAGE: &str = "COMPLETE";

/// 실패 프레임 단계 토큰
pub const ERROR_STAGE: &str = "ERROR";

/// 작업이 패닉으로 끝났을 때의 메시지
const UNEXPECTED_MESSAGE: &str = "Generation failed: unexpected error";

/// 감독 태스크가 중단됐을 때의 메시지
const ABORTED_MESSAGE: &str = "Generation was interrupted";

/// 스트림 프레임 하나
#[derive(Debug, Clone)]
pub enum RelayFrame {
    Progress(ProgressEvent),
    Terminal(TerminalResult),
}

impl RelayFrame {
    pub fn is_terminal(&self) -> bool {
        matches!(self, RelayFrame::Terminal(_))
    }

    /// 단계 토큰 (`event` 키 값)
    pub fn stage(&self) -> &str {
        match self {
            RelayFrame::Progress(event) => &event.stage,
            RelayFrame::Terminal(TerminalResult::Completion(_)) => COMPLETE_STAGE,
            RelayFrame::Terminal(TerminalResult::Failure { .. }) => ERROR_STAGE,
        }
    }

    /// SSE data로 나갈 JSON
    pub fn payload(&self) -> Value {
        match self {
            RelayFrame::Progress(event) => json!({
                "event": event.stage,
                "progress": event.percent,
                "message": event.message,
            }),
            RelayFrame::Terminal(TerminalResult::Completion(completion)) => {
                let mut payload = match serde_json::to_value(completion) {
                    Ok(Value::Object(map)) => map,
                    _ => serde_json::Map::new(),
                };
                payload.insert("event".into(), COMPLETE_STAGE.into());
                payload.insert("progress".into(), 100.into());
                payload
                    .entry("message")
                    .or_insert_with(|| completion.message.clone().into());
                Value::Object(payload)
            }
            RelayFrame::Terminal(TerminalResult::Failure { message }) => json!({
                "event": ERROR_STAGE,
                "message": message,
            }),
        }
    }
}

/// 수신 측. 웹 계층이 SSE로 변환한다
pub struct RelayStream {
    pub run_id: Uuid,
    /// SSE 이벤트 이름 (`progress` / `refine`)
    pub event_name: &'static str,
    pub frames: mpsc::Receiver<RelayFrame>,
}

struct RelayInner {
    run_id: Uuid,
    event_name: &'static str,
    sender: Mutex<Option<mpsc::Sender<RelayFrame>>>,
    terminated: AtomicBool,
    closed: AtomicBool,
    cancelled: AtomicBool,
    last_percent: AtomicU8,
}

/// 송신 측 핸들 (복제 가능)
#[derive(Clone)]
pub struct ProgressRelay {
    inner: Arc<RelayInner>,
}

impl ProgressRelay {
    /// 릴레이와 수신 스트림 쌍 생성
    pub fn channel(event_name: &'static str, capacity: usize) -> (Self, RelayStream) {
        let (tx, rx) = mpsc::channel(capacity.max(1));
        let run_id = Uuid::new_v4();
        let relay = Self {
            inner: Arc::new(RelayInner {
                run_id,
                event_name,
                sender: Mutex::new(Some(tx)),
                terminated: AtomicBool::new(false),
                closed: AtomicBool::new(false),
                cancelled: AtomicBool::new(false),
                last_percent: AtomicU8::new(0),
            }),
        };
        let stream = RelayStream {
            run_id,
            event_name,
            frames: rx,
        };
        (relay, stream)
    }

    pub fn run_id(&self) -> Uuid {
        self.inner.run_id
    }

    pub fn event_name(&self) -> &'static str {
        self.inner.event_name
    }

    pub fn is_closed(&self) -> bool {
        self.inner.closed.load(Ordering::SeqCst)
    }

    pub fn is_terminated(&self) -> bool {
        self.inner.terminated.load(Ordering::SeqCst)
    }

    /// 실행 취소 표시. 상한 시간 초과 때만 설정되며, 클라이언트 연결
    /// 끊김은 취소가 아니다 (결과는 계속 저장된다).
    pub fn cancel(&self) {
        self.inner.cancelled.store(true, Ordering::SeqCst);
    }

    /// 취소된 실행은 어떤 상태도 저장하지 않아야 한다
    pub fn is_cancelled(&self) -> bool {
        self.inner.cancelled.load(Ordering::SeqCst)
    }

    /// 진행 프레임 방출. 퍼센트는 이전 값 미만으로 내려가지 않는다.
    pub async fn emit_progress(&self, stage: &str, percent: u8, message: impl Into<String>) {
        let mut slot = self.inner.sender.lock().await;
        if self.is_terminated() || slot.is_none() {
            debug!(run_id = %self.inner.run_id, stage, "종료된 릴레이, 진행 프레임 무시");
            return;
        }

        let requested = percent.min(100);
        let previous = self.inner.last_percent.fetch_max(requested, Ordering::SeqCst);
        let event = ProgressEvent {
            stage: stage.to_string(),
            percent: requested.max(previous),
            message: message.into(),
        };
        debug!(run_id = %self.inner.run_id, stage, percent = event.percent, "진행");
        self.deliver(&mut slot, RelayFrame::Progress(event)).await;
    }

    /// 성공 종료 프레임. 이미 종료됐으면 `false`
    pub async fn emit_completion(&self, completion: Completion) -> bool {
        self.emit_terminal(TerminalResult::Completion(completion))
            .await
    }

    /// 실패 종료 프레임. 이미 종료됐으면 `false`
    pub async fn emit_failure(&self, message: impl Into<String>) -> bool {
        self.emit_terminal(TerminalResult::Failure {
            message: message.into(),
        })
        .await
    }

    /// 스트림 닫기. 처음 닫을 때만 `true`
    pub async fn close(&self) -> bool {
        let mut slot = self.inner.sender.lock().await;
        slot.take();
        let first = !self.inner.closed.swap(true, Ordering::SeqCst);
        if first {
            debug!(run_id = %self.inner.run_id, "릴레이 종료");
        }
        first
    }

    async fn emit_terminal(&self, result: TerminalResult) -> bool {
        let mut slot = self.inner.sender.lock().await;
        if self.inner.terminated.swap(true, Ordering::SeqCst) {
            warn!(run_id = %self.inner.run_id, "종료 프레임 중복, 무시");
            return false;
        }
        self.deliver(&mut slot, RelayFrame::Terminal(result)).await;
        true
    }

    /// 전송 실패(수신 측 해제)는 전송 에러로 보고 릴레이를 닫는다
    async fn deliver(&self, slot: &mut Option<mpsc::Sender<RelayFrame>>, frame: RelayFrame) {
        let Some(tx) = slot.as_ref() else {
            return;
        };
        if tx.send(frame).await.is_err() {
            warn!(run_id = %self.inner.run_id, "클라이언트 연결 끊김, 릴레이 종료");
            self.inner.terminated.store(true, Ordering::SeqCst);
            self.inner.closed.store(true, Ordering::SeqCst);
            slot.take();
        }
    }

    /// 동기 마무리 (Drop 경로). 잠금을 얻지 못하면 `false`
    fn finalize_now(&self, message: &str) -> bool {
        let Ok(mut slot) = self.inner.sender.try_lock() else {
            return false;
        };
        if !self.inner.terminated.swap(true, Ordering::SeqCst) {
            if let Some(tx) = slot.as_ref() {
                let frame = RelayFrame::Terminal(TerminalResult::Failure {
                    message: message.to_string(),
                });
                if let Err(e) = tx.try_send(frame) {
                    warn!(run_id = %self.inner.run_id, error = %e, "실패 프레임 합성 실패");
                }
            }
        }
        slot.take();
        self.inner.closed.store(true, Ordering::SeqCst);
        true
    }
}

/// 릴레이가 닫히지 않은 채 해제되면 실패 프레임을 합성하고 닫는다
pub struct RelayGuard {
    relay: ProgressRelay,
}

impl RelayGuard {
    pub fn new(relay: ProgressRelay) -> Self {
        Self { relay }
    }
}

impl Drop for RelayGuard {
    fn drop(&mut self) {
        if self.relay.is_closed() {
            return;
        }
        warn!(run_id = %self.relay.run_id(), "릴레이가 닫히지 않은 채 해제됨");
        if self.relay.finalize_now(ABORTED_MESSAGE) {
            return;
        }
        // 다른 방출이 잠금을 쥐고 있으면 비동기로 마무리
        if let Ok(handle) = tokio::runtime::Handle::try_current() {
            let relay = self.relay.clone();
            handle.spawn(async move {
                relay.emit_failure(ABORTED_MESSAGE).await;
                relay.close().await;
            });
        }
    }
}

/// 상한 시간 초과 메시지
pub fn timeout_message(ceiling: Duration) -> String {
    let secs = ceiling.as_secs();
    if secs >= 60 && secs % 60 == 0 {
        let minutes = secs / 60;
        let unit = if minutes == 1 { "minute" } else { "minutes" };
        format!("Agent timed out after {minutes} {unit}")
    } else {
        format!("Agent timed out after {secs} seconds")
    }
}

/// 작업을 별도 태스크로 실행하고 결과를 종료 프레임으로 변환
///
/// 상한 시간이 지나면 작업 태스크는 그대로 두고(중단하지 않음) 릴레이를
/// 취소 표시한 뒤 타임아웃 실패를 보낸다. 늦게 도착한 결과는 저장되지
/// 않고, 종료된 릴레이에 의해 버려진다.
pub fn supervise<F>(relay: ProgressRelay, ceiling: Duration, work: F) -> JoinHandle<()>
where
    F: Future<Output = Result<Completion, GenerationError>> + Send + 'static,
{
    tokio::spawn(async move {
        let guard = RelayGuard::new(relay.clone());
        let run_id = relay.run_id();
        let worker = tokio::spawn(work);

        match tokio::time::timeout(ceiling, worker).await {
            Ok(Ok(Ok(completion))) => {
                info!(%run_id, "생성 완료");
                relay.emit_completion(completion).await;
            }
            Ok(Ok(Err(err))) => {
                warn!(%run_id, error = %err, "생성 실패");
                relay.emit_failure(err.user_message()).await;
            }
            Ok(Err(join_err)) => {
                error!(%run_id, error = %join_err, "생성 작업 비정상 종료");
                relay.emit_failure(UNEXPECTED_MESSAGE).await;
            }
            Err(_) => {
                warn!(%run_id, ceiling_secs = ceiling.as_secs(), "릴레이 상한 시간 초과");
                relay.cancel();
                relay.emit_failure(timeout_message(ceiling)).await;
            }
        }

        relay.close().await;
        drop(guard);
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use sdlc_core::error::CoreError;
    use sdlc_core::models::progress::ArtifactPayload;

    async fn drain(stream: &mut RelayStream) -> Vec<RelayFrame> {
        let mut frames = Vec::new();
        while let Some(frame) = stream.frames.recv().await {
            frames.push(frame);
        }
        frames
    }

    fn completion(text: &str) -> Completion {
        Completion {
            message: "done".to_string(),
            payload: ArtifactPayload::Content {
                content: text.to_string(),
            },
        }
    }

    fn percents(frames: &[RelayFrame]) -> Vec<u8> {
        frames
            .iter()
            .filter_map(|f| match f {
                RelayFrame::Progress(e) => Some(e.percent),
                _ => None,
            })
            .collect()
    }

    #[tokio::test]
    async fn percent_never_decreases() {
        let (relay, mut stream) = ProgressRelay::channel("progress", 16);
        relay.emit_progress("A", 30, "a").await;
        relay.emit_progress("B", 10, "b").await;
        relay.emit_progress("C", 250, "c").await;
        relay.close().await;

        let frames = drain(&mut stream).await;
        assert_eq!(percents(&frames), [30, 30, 100]);
    }

    #[tokio::test]
    async fn single_terminal_and_nothing_after_it() {
        let (relay, mut stream) = ProgressRelay::channel("progress", 16);
        relay.emit_progress("INITIALIZING", 5, "start").await;
        assert!(relay.emit_completion(completion("x")).await);
        assert!(!relay.emit_failure("late").await);
        relay.emit_progress("LATE", 99, "ignored").await;
        assert!(relay.close().await);
        assert!(!relay.close().await);

        let frames = drain(&mut stream).await;
        assert_eq!(frames.len(), 2);
        assert!(frames[1].is_terminal());
        assert_eq!(frames[1].stage(), COMPLETE_STAGE);
    }

    #[tokio::test]
    async fn payload_shapes() {
        let progress = RelayFrame::Progress(ProgressEvent {
            stage: "GENERATING".into(),
            percent: 50,
            message: "Generating...".into(),
        });
        assert_eq!(
            progress.payload(),
            json!({"event":"GENERATING","progress":50,"message":"Generating..."})
        );

        let done = RelayFrame::Terminal(TerminalResult::Completion(Completion {
            message: "Prototype updated.".into(),
            payload: ArtifactPayload::Refinement {
                refined_html: "<html></html>".into(),
            },
        }));
        let payload = done.payload();
        assert_eq!(payload["event"], "COMPLETE");
        assert_eq!(payload["progress"], 100);
        assert_eq!(payload["refinedHtml"], "<html></html>");
        assert_eq!(payload["message"], "Prototype updated.");

        let failed = RelayFrame::Terminal(TerminalResult::Failure {
            message: "boom".into(),
        });
        assert_eq!(failed.payload(), json!({"event":"ERROR","message":"boom"}));
    }

    #[tokio::test]
    async fn supervise_success_path() {
        let (relay, mut stream) = ProgressRelay::channel("progress", 16);
        let worker_relay = relay.clone();
        supervise(relay, Duration::from_secs(5), async move {
            worker_relay.emit_progress("WORKING", 40, "working").await;
            Ok(completion("body"))
        })
        .await
        .unwrap();

        let frames = drain(&mut stream).await;
        assert_eq!(frames.len(), 2);
        assert_eq!(frames[1].payload()["content"], "body");
    }

    #[tokio::test]
    async fn supervise_failure_uses_user_message() {
        let (relay, mut stream) = ProgressRelay::channel("progress", 16);
        supervise(relay, Duration::from_secs(5), async {
            Err(GenerationError::Core(CoreError::UpstreamStatus {
                status: 502,
                body: "bad gateway".into(),
            }))
        })
        .await
        .unwrap();

        let frames = drain(&mut stream).await;
        assert_eq!(frames.len(), 1);
        let payload = frames[0].payload();
        assert_eq!(payload["event"], "ERROR");
        assert!(payload["message"]
            .as_str()
            .unwrap()
            .starts_with("Generation failed:"));
    }

    #[tokio::test]
    async fn supervise_panic_still_terminates() {
        let (relay, mut stream) = ProgressRelay::channel("progress", 16);
        supervise(relay, Duration::from_secs(5), async {
            if true {
                panic!("worker exploded");
            }
            Ok(completion("never"))
        })
        .await
        .unwrap();

        let frames = drain(&mut stream).await;
        assert_eq!(frames.len(), 1);
        assert_eq!(frames[0].payload()["message"], UNEXPECTED_MESSAGE);
    }

    #[tokio::test(start_paused = true)]
    async fn ceiling_synthesizes_timeout_frame() {
        let (relay, mut stream) = ProgressRelay::channel("progress", 16);
        let worker_relay = relay.clone();
        let watched = relay.clone();
        supervise(relay, Duration::from_secs(300), async move {
            worker_relay.emit_progress("QUERYING", 50, "waiting").await;
            std::future::pending::<()>().await;
            Ok(completion("never"))
        })
        .await
        .unwrap();

        let frames = drain(&mut stream).await;
        let terminals: Vec<&RelayFrame> = frames.iter().filter(|f| f.is_terminal()).collect();
        assert_eq!(terminals.len(), 1);
        assert!(watched.is_cancelled());
        assert_eq!(
            frames.last().unwrap().payload(),
            json!({"event":"ERROR","message":"Agent timed out after 5 minutes"})
        );
    }

    #[tokio::test]
    async fn finished_runs_are_not_cancelled() {
        let (relay, mut stream) = ProgressRelay::channel("progress", 16);
        let watched = relay.clone();
        supervise(relay, Duration::from_secs(300), async { Ok(completion("done")) })
            .await
            .unwrap();

        drain(&mut stream).await;
        assert!(!watched.is_cancelled());
    }

    #[tokio::test]
    async fn dropped_receiver_does_not_cancel() {
        let (relay, stream) = ProgressRelay::channel("progress", 1);
        drop(stream);
        relay.emit_progress("A", 10, "a").await;
        assert!(relay.is_closed());
        assert!(!relay.is_cancelled());
    }

    #[tokio::test]
    async fn dropped_receiver_makes_emits_noops() {
        let (relay, stream) = ProgressRelay::channel("progress", 1);
        drop(stream);
        relay.emit_progress("A", 10, "a").await;
        assert!(relay.is_closed());
        assert!(!relay.emit_completion(completion("x")).await);
    }

    #[tokio::test]
    async fn guard_finalizes_unclosed_relay() {
        let (relay, mut stream) = ProgressRelay::channel("refine", 4);
        relay.emit_progress("THINKING", 0, "Connecting to agent...").await;
        drop(RelayGuard::new(relay.clone()));

        let frames = drain(&mut stream).await;
        assert_eq!(frames.len(), 2);
        assert_eq!(frames[1].payload()["message"], ABORTED_MESSAGE);
        assert!(relay.is_closed());
    }

    #[test]
    fn timeout_message_wording() {
        assert_eq!(
            timeout_message(Duration::from_secs(300)),
            "Agent timed out after 5 minutes"
        );
        assert_eq!(
            timeout_message(Duration::from_secs(60)),
            "Agent timed out after 1 minute"
        );
        assert_eq!(
            timeout_message(Duration::from_secs(45)),
            "Agent timed out after 45 seconds"
        );
    }
}
