//! Polling transport - 커서 기반 pull 구독
//!
//! 상태 없는 배치 endpoint 위에서 연속 스트림을 흉내 낸다.
//!
//! ```text
//! loop {
//!     GET {base}/v2/tasks/{id}/events?after={cursor}
//!     ├─ 실패 (네트워크 / non-2xx) → retry_interval 대기 후 같은 요청 재시도 (무한)
//!     └─ 성공 → 배치 순서대로: 커서 전진 → 전달 → completion이면 종료
//! }
//! ```
//!
//! completion은 recoverable 여부와 관계없이 항상 종료 이벤트다.

use crate::endpoint;
use crate::http::{HttpRequest, RequestClient};
use crate::r#trait::LogTransport;
use crate::resolver::BaseUrlResolver;
use crate::subscription::{StreamContext, StreamOptions, Subscription};
use std::sync::Arc;
use std::time::Duration;
use tasklog_foundation::config::{DEFAULT_POLL_RETRY_MS, DEFAULT_SERVICE_NAME};
use tasklog_foundation::{LogEvent, Ordinal, Result, StreamRequest, TransportMode};
use tracing::{debug, info, warn};

const TRANSPORT_NAME: &str = "polling";

/// polling 커서 - 관측한 최대 순번 (역행하지 않음)
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Cursor(Option<Ordinal>);

impl Cursor {
    pub fn new(start: Option<Ordinal>) -> Self {
        Self(start)
    }

    pub fn position(&self) -> Option<Ordinal> {
        self.0
    }

    pub fn advance(&mut self, ordinal: Ordinal) {
        if self.0.map_or(true, |current| ordinal > current) {
            self.0 = Some(ordinal);
        }
    }
}

/// polling 전송
pub struct PollingTransport {
    resolver: Arc<dyn BaseUrlResolver>,
    http: Arc<dyn RequestClient>,
    service_name: String,
    retry_interval: Duration,
    empty_batch_delay: Duration,
    request_timeout: Option<Duration>,
    options: StreamOptions,
}

impl PollingTransport {
    pub fn new(resolver: Arc<dyn BaseUrlResolver>, http: Arc<dyn RequestClient>) -> Self {
        Self {
            resolver,
            http,
            service_name: DEFAULT_SERVICE_NAME.to_string(),
            retry_interval: Duration::from_millis(DEFAULT_POLL_RETRY_MS),
            empty_batch_delay: Duration::ZERO,
            request_timeout: None,
            options: StreamOptions::default(),
        }
    }

    pub fn with_service_name(mut self, name: impl Into<String>) -> Self {
        self.service_name = name.into();
        self
    }

    /// fetch 실패 후 재시도 간격
    pub fn with_retry_interval(mut self, interval: Duration) -> Self {
        self.retry_interval = interval;
        self
    }

    /// 빈 배치 후 다음 요청까지의 간격
    pub fn with_empty_batch_delay(mut self, delay: Duration) -> Self {
        self.empty_batch_delay = delay;
        self
    }

    pub fn with_request_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.request_timeout = timeout;
        self
    }

    pub fn with_options(mut self, options: StreamOptions) -> Self {
        self.options = options;
        self
    }
}

impl LogTransport for PollingTransport {
    fn mode(&self) -> TransportMode {
        TransportMode::Polling
    }

    fn subscribe(&self, request: StreamRequest) -> Subscription {
        let (subscription, mut ctx) =
            Subscription::channel(request, self.options, TRANSPORT_NAME);

        let session = PollingSession {
            resolver: Arc::clone(&self.resolver),
            http: Arc::clone(&self.http),
            service_name: self.service_name.clone(),
            retry_interval: self.retry_interval,
            empty_batch_delay: self.empty_batch_delay,
            request_timeout: self.request_timeout,
        };

        tokio::spawn(async move {
            let outcome = session.run(&mut ctx).await;
            ctx.finish(outcome).await;
        });

        subscription
    }
}

/// 구독 하나의 polling 루프 상태
struct PollingSession {
    resolver: Arc<dyn BaseUrlResolver>,
    http: Arc<dyn RequestClient>,
    service_name: String,
    retry_interval: Duration,
    empty_batch_delay: Duration,
    request_timeout: Option<Duration>,
}

impl PollingSession {
    async fn run(self, ctx: &mut StreamContext) -> Result<()> {
        ctx.mark_connecting();

        // 구독 수명 동안 한 번만 resolve
        let base = ctx
            .until_closed(self.resolver.resolve(&self.service_name))
            .await??;
        let task_id = ctx.request().task_id.clone();
        let mut cursor = Cursor::new(ctx.request().after);
        let mut attempt: u64 = 0;

        info!("Polling events for task {} from {}", task_id, base);

        loop {
            if ctx.is_closed() {
                return Ok(());
            }

            let url = endpoint::events_url(&base, &task_id, cursor.position())?;
            let request = HttpRequest::get(url).timeout(self.request_timeout);

            let fetched = ctx
                .until_closed(self.http.issue(request))
                .await?
                .and_then(|response| response.error_for_status());

            let response = match fetched {
                Ok(response) => response,
                Err(e) if e.is_retryable_fetch() => {
                    attempt += 1;
                    warn!(
                        "Polling task {} failed (attempt {}), retrying in {:?}: {}",
                        task_id, attempt, self.retry_interval, e
                    );
                    ctx.sleep(self.retry_interval).await?;
                    continue;
                }
                Err(e) => return Err(e),
            };
            attempt = 0;

            let batch: Vec<LogEvent> = response.json("events")?;
            ctx.mark_streaming();
            debug!(
                "Task {} batch of {} events after {:?}",
                task_id,
                batch.len(),
                cursor.position().map(|c| c.value())
            );

            if batch.is_empty() {
                if !self.empty_batch_delay.is_zero() {
                    ctx.sleep(self.empty_batch_delay).await?;
                }
                continue;
            }

            for event in batch {
                cursor.advance(event.id);
                let is_completion = event.is_completion();
                ctx.forward(event).await?;

                // completion 이후 같은 배치의 나머지는 버림
                if is_completion {
                    ctx.complete();
                    return Ok(());
                }
            }
        }
    }
}
