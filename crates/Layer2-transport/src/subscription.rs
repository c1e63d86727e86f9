//! Subscription - 구독 핸들과 전송 측 컨텍스트
//!
//! 두 전송 방식이 공유하는 상태 머신:
//!
//! ```text
//! Idle → Connecting → Streaming → { Completed | Errored | Cancelled }
//! ```
//!
//! 종료 상태는 compare-and-swap으로 단 한 번만 기록되며, 기록되는 순간
//! 구독의 `CancellationToken`이 취소되어 진행 중인 네트워크 작업이 중단된다.

use futures::Stream;
use std::future::Future;
use std::pin::Pin;
use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::Arc;
use std::task::{Context, Poll};
use std::time::Duration;
use tasklog_foundation::{Error, LogEvent, Ordinal, Result, StreamConfig, StreamRequest, TaskId};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

// ============================================================================
// StreamPhase
// ============================================================================

/// 구독 상태
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
#[repr(u8)]
pub enum StreamPhase {
    Idle = 0,
    Connecting = 1,
    Streaming = 2,
    Completed = 3,
    Errored = 4,
    Cancelled = 5,
}

impl StreamPhase {
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Errored | Self::Cancelled)
    }

    fn from_u8(value: u8) -> Self {
        match value {
            0 => Self::Idle,
            1 => Self::Connecting,
            2 => Self::Streaming,
            3 => Self::Completed,
            4 => Self::Errored,
            _ => Self::Cancelled,
        }
    }
}

impl std::fmt::Display for StreamPhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::Idle => "idle",
            Self::Connecting => "connecting",
            Self::Streaming => "streaming",
            Self::Completed => "completed",
            Self::Errored => "errored",
            Self::Cancelled => "cancelled",
        };
        f.write_str(name)
    }
}

/// 구독 핸들과 전송 태스크가 공유하는 상태
#[derive(Debug)]
struct SharedState {
    phase: AtomicU8,
    token: CancellationToken,
}

impl SharedState {
    fn new() -> Self {
        Self {
            phase: AtomicU8::new(StreamPhase::Idle as u8),
            token: CancellationToken::new(),
        }
    }

    fn phase(&self) -> StreamPhase {
        StreamPhase::from_u8(self.phase.load(Ordering::SeqCst))
    }

    /// 비종료 상태 전진 (역행 불가, 종료 후 무시)
    fn advance(&self, next: StreamPhase) -> bool {
        debug_assert!(!next.is_terminal());
        self.phase
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |current| {
                let current = StreamPhase::from_u8(current);
                (!current.is_terminal() && current < next).then_some(next as u8)
            })
            .is_ok()
    }

    /// 종료 상태 기록 - 처음 호출한 쪽만 true
    fn close(&self, terminal: StreamPhase) -> bool {
        debug_assert!(terminal.is_terminal());
        let won = self
            .phase
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |current| {
                (!StreamPhase::from_u8(current).is_terminal()).then_some(terminal as u8)
            })
            .is_ok();
        self.token.cancel();
        won
    }
}

// ============================================================================
// StreamOptions
// ============================================================================

/// 구독 공통 옵션
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StreamOptions {
    /// 구독당 버퍼링할 이벤트 수
    pub channel_capacity: usize,

    /// 순번 역행 시 구독 실패 처리
    pub strict_ordering: bool,
}

impl Default for StreamOptions {
    fn default() -> Self {
        Self {
            channel_capacity: tasklog_foundation::config::DEFAULT_CHANNEL_CAPACITY,
            strict_ordering: false,
        }
    }
}

impl From<&StreamConfig> for StreamOptions {
    fn from(config: &StreamConfig) -> Self {
        Self {
            channel_capacity: config.channel_capacity.max(1),
            strict_ordering: config.strict_ordering,
        }
    }
}

// ============================================================================
// Subscription (구독자 측)
// ============================================================================

/// 로그 스트림 구독 핸들
///
/// `Stream<Item = Result<LogEvent>>`로 소비한다. 에러 항목은 항상 마지막이며,
/// 취소 후에는 버퍼에 남은 이벤트도 버리고 즉시 `None`을 반환한다.
/// 핸들을 drop하면 구독이 취소된다.
#[derive(Debug)]
pub struct Subscription {
    request: StreamRequest,
    rx: mpsc::Receiver<Result<LogEvent>>,
    state: Arc<SharedState>,
    last_ordinal: Option<Ordinal>,
}

impl Subscription {
    /// 구독 핸들과 전송 측 컨텍스트 한 쌍 생성
    ///
    /// 전송 구현은 컨텍스트를 자신의 태스크로 옮기고, 핸들은 호출자에게 돌려준다.
    pub fn channel(
        request: StreamRequest,
        options: StreamOptions,
        transport: &'static str,
    ) -> (Self, StreamContext) {
        let (tx, rx) = mpsc::channel(options.channel_capacity.max(1));
        let state = Arc::new(SharedState::new());

        let context = StreamContext {
            request: request.clone(),
            tx,
            state: Arc::clone(&state),
            options,
            transport,
            last_forwarded: None,
            forwarded: 0,
        };

        let subscription = Self {
            request,
            rx,
            state,
            last_ordinal: None,
        };

        (subscription, context)
    }

    pub fn task_id(&self) -> &TaskId {
        &self.request.task_id
    }

    pub fn phase(&self) -> StreamPhase {
        self.state.phase()
    }

    pub fn is_closed(&self) -> bool {
        self.state.phase().is_terminal()
    }

    /// 구독 취소 (멱등)
    pub fn cancel(&self) {
        if self.state.close(StreamPhase::Cancelled) {
            info!("Subscription for task {} cancelled", self.request.task_id);
        }
    }

    /// 호출자에게 전달된 가장 큰 순번
    pub fn last_ordinal(&self) -> Option<Ordinal> {
        self.last_ordinal.or(self.request.after)
    }

    /// 마지막 전달 지점부터 이어받는 새 요청
    pub fn resume_request(&self) -> StreamRequest {
        self.request.clone().resume_from(self.last_ordinal())
    }
}

impl Stream for Subscription {
    type Item = Result<LogEvent>;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        if self.state.phase() == StreamPhase::Cancelled {
            return Poll::Ready(None);
        }

        let item = match self.rx.poll_recv(cx) {
            Poll::Ready(item) => item,
            Poll::Pending => return Poll::Pending,
        };

        if let Some(Ok(event)) = &item {
            let id = event.id;
            if self.last_ordinal.map_or(true, |last| id > last) {
                self.last_ordinal = Some(id);
            }
        }

        Poll::Ready(item)
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        if self.state.close(StreamPhase::Cancelled) {
            debug!("Subscription for task {} dropped", self.request.task_id);
        }
    }
}

// ============================================================================
// StreamContext (전송 측)
// ============================================================================

/// 전송 태스크가 구독자에게 이벤트를 전달하는 통로
#[derive(Debug)]
pub struct StreamContext {
    request: StreamRequest,
    tx: mpsc::Sender<Result<LogEvent>>,
    state: Arc<SharedState>,
    options: StreamOptions,
    transport: &'static str,
    last_forwarded: Option<Ordinal>,
    forwarded: u64,
}

impl StreamContext {
    pub fn request(&self) -> &StreamRequest {
        &self.request
    }

    pub fn phase(&self) -> StreamPhase {
        self.state.phase()
    }

    pub fn is_closed(&self) -> bool {
        self.state.phase().is_terminal()
    }

    /// 지금까지 전달한 이벤트 수
    pub fn forwarded(&self) -> u64 {
        self.forwarded
    }

    pub fn mark_connecting(&self) {
        if self.state.advance(StreamPhase::Connecting) {
            debug!("[{}] task {} connecting", self.transport, self.request.task_id);
        }
    }

    pub fn mark_streaming(&self) {
        if self.state.advance(StreamPhase::Streaming) {
            info!("[{}] task {} streaming", self.transport, self.request.task_id);
        }
    }

    /// 구독이 닫히면 완료되는 future
    pub async fn cancelled(&self) {
        self.state.token.cancelled().await
    }

    /// 구독이 닫히면 즉시 `SubscriptionClosed`로 중단
    pub async fn until_closed<F: Future>(&self, fut: F) -> Result<F::Output> {
        tokio::select! {
            biased;
            _ = self.state.token.cancelled() => Err(Error::SubscriptionClosed),
            output = fut => Ok(output),
        }
    }

    /// 취소 가능한 대기
    pub async fn sleep(&self, duration: Duration) -> Result<()> {
        self.until_closed(tokio::time::sleep(duration)).await
    }

    /// 이벤트 전달
    ///
    /// - 재개 커서(`after`) 이하의 순번은 조용히 건너뜀
    /// - 순번 역행: 기본은 경고 후 전달, strict 모드면 구독 실패
    pub async fn forward(&mut self, event: LogEvent) -> Result<()> {
        if self.is_closed() {
            return Err(Error::SubscriptionClosed);
        }

        if let Some(after) = self.request.after {
            if event.id <= after {
                debug!(
                    "[{}] skipping event {} at or before resume cursor {}",
                    self.transport, event.id, after
                );
                return Ok(());
            }
        }

        if let Some(previous) = self.last_forwarded {
            if event.id < previous {
                if self.options.strict_ordering {
                    return Err(Error::OrdinalRegression {
                        previous: previous.value(),
                        received: event.id.value(),
                    });
                }
                warn!(
                    "[{}] task {} ordinal went backwards: {} after {}",
                    self.transport, self.request.task_id, event.id, previous
                );
            }
        }

        let id = event.id;
        let sent = tokio::select! {
            biased;
            _ = self.state.token.cancelled() => return Err(Error::SubscriptionClosed),
            sent = self.tx.send(Ok(event)) => sent,
        };
        // 수신 측이 사라짐 = 구독 drop
        sent.map_err(|_| Error::SubscriptionClosed)?;

        if self.last_forwarded.map_or(true, |last| id > last) {
            self.last_forwarded = Some(id);
        }
        self.forwarded += 1;
        Ok(())
    }

    /// 정상 완료로 구독 종료
    pub fn complete(&self) -> bool {
        let won = self.state.close(StreamPhase::Completed);
        if won {
            info!(
                "[{}] task {} completed after {} events",
                self.transport, self.request.task_id, self.forwarded
            );
        }
        won
    }

    /// 에러로 구독 종료 - 에러는 한 번만 구독자에게 전달됨
    pub async fn fail(&self, err: Error) {
        if !self.state.close(StreamPhase::Errored) {
            debug!(
                "[{}] dropping error for closed subscription: {}",
                self.transport, err
            );
            return;
        }
        error!("[{}] task {} failed: {}", self.transport, self.request.task_id, err);
        let _ = self.tx.send(Err(err)).await;
    }

    /// 전송 루프 결과로 구독 마무리
    pub async fn finish(self, outcome: Result<()>) {
        match outcome {
            Ok(()) => {
                self.complete();
            }
            Err(Error::SubscriptionClosed) => {
                debug!(
                    "[{}] task {} loop stopped ({})",
                    self.transport,
                    self.request.task_id,
                    self.phase()
                );
            }
            Err(err) => self.fail(err).await,
        }
    }
}
