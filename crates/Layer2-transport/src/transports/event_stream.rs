//! Event Stream transport - Server-Sent Events 기반 push 구독
//!
//! 구독당 하나의 SSE 연결을 유지하고, 이름 붙은 프레임(`log`, `completion`, 기타)을
//! `LogEvent`로 변환하여 전달한다.
//!
//! - 파싱 실패는 치명적: 에러 1회 전달 후 구독 종료
//! - `completion`: 전달 후, recoverable 태스크가 아니면 구독 종료 + 연결 중단
//! - 자동 재연결 없음 (reqwest-eventsource 재시도 정책 `Never`)

use crate::endpoint;
use crate::r#trait::LogTransport;
use crate::resolver::BaseUrlResolver;
use crate::subscription::{StreamContext, StreamOptions, Subscription};
use futures::{Stream, StreamExt};
use reqwest::header::ACCEPT;
use reqwest::Client;
use reqwest_eventsource::{retry, Event, EventSource};
use std::pin::Pin;
use std::sync::Arc;
use tasklog_foundation::config::DEFAULT_SERVICE_NAME;
use tasklog_foundation::{Error, LogEvent, Result, StreamRequest, TransportMode};
use tracing::{debug, info};
use url::Url;

const TRANSPORT_NAME: &str = "eventstream";

/// SSE 프레임 이름
pub const COMPLETION_FRAME: &str = "completion";

// ============================================================================
// Frame source
// ============================================================================

/// 연결에서 수신한 프레임
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SseFrame {
    /// 연결 수립
    Open,
    /// 이름 붙은 이벤트 + 문자열 페이로드
    Message { event: String, data: String },
}

impl SseFrame {
    pub fn message(event: impl Into<String>, data: impl Into<String>) -> Self {
        Self::Message {
            event: event.into(),
            data: data.into(),
        }
    }
}

/// 프레임 스트림 - drop하면 연결이 끊긴다
pub type FrameStream = Pin<Box<dyn Stream<Item = Result<SseFrame>> + Send>>;

/// push 연결을 여는 협력자
pub trait EventSourceConnector: Send + Sync {
    fn open(&self, url: Url) -> Result<FrameStream>;
}

/// reqwest-eventsource 기반 구현
#[derive(Debug, Clone, Default)]
pub struct ReqwestEventSourceConnector {
    client: Client,
}

impl ReqwestEventSourceConnector {
    pub fn new(client: Client) -> Self {
        Self { client }
    }
}

impl EventSourceConnector for ReqwestEventSourceConnector {
    fn open(&self, url: Url) -> Result<FrameStream> {
        let request = self.client.get(url).header(ACCEPT, "text/event-stream");
        let mut source = EventSource::new(request).map_err(|e| {
            Error::TransportConnect(format!("Failed to create event stream request: {}", e))
        })?;
        source.set_retry_policy(Box::new(retry::Never));

        Ok(Box::pin(async_stream::stream! {
            while let Some(event) = source.next().await {
                match event {
                    Ok(Event::Open) => yield Ok(SseFrame::Open),
                    Ok(Event::Message(message)) => {
                        yield Ok(SseFrame::Message {
                            event: message.event,
                            data: message.data,
                        });
                    }
                    Err(reqwest_eventsource::Error::StreamEnded) => break,
                    Err(e) => {
                        source.close();
                        yield Err(map_eventsource_error(e));
                        break;
                    }
                }
            }
        }))
    }
}

fn map_eventsource_error(err: reqwest_eventsource::Error) -> Error {
    use reqwest_eventsource::Error as EsError;

    match err {
        EsError::InvalidStatusCode(status, _) => {
            Error::TransportConnect(format!("Event stream rejected with HTTP {}", status))
        }
        EsError::InvalidContentType(content_type, _) => Error::TransportConnect(format!(
            "Event stream returned content type {:?}",
            content_type
        )),
        EsError::Transport(e) => Error::TransportConnect(format!("Event stream dropped: {}", e)),
        EsError::Utf8(e) => Error::frame_parse("stream", e),
        EsError::Parser(e) => Error::frame_parse("stream", e),
        other => Error::TransportConnect(other.to_string()),
    }
}

/// 프레임 페이로드를 `LogEvent`로 파싱
pub fn parse_frame(event: &str, data: &str) -> Result<LogEvent> {
    serde_json::from_str(data).map_err(|e| Error::frame_parse(event, e))
}

// ============================================================================
// EventStreamTransport
// ============================================================================

/// SSE 전송
pub struct EventStreamTransport {
    resolver: Arc<dyn BaseUrlResolver>,
    connector: Arc<dyn EventSourceConnector>,
    service_name: String,
    options: StreamOptions,
}

impl EventStreamTransport {
    pub fn new(
        resolver: Arc<dyn BaseUrlResolver>,
        connector: Arc<dyn EventSourceConnector>,
    ) -> Self {
        Self {
            resolver,
            connector,
            service_name: DEFAULT_SERVICE_NAME.to_string(),
            options: StreamOptions::default(),
        }
    }

    pub fn with_service_name(mut self, name: impl Into<String>) -> Self {
        self.service_name = name.into();
        self
    }

    pub fn with_options(mut self, options: StreamOptions) -> Self {
        self.options = options;
        self
    }
}

impl LogTransport for EventStreamTransport {
    fn mode(&self) -> TransportMode {
        TransportMode::EventStream
    }

    fn subscribe(&self, request: StreamRequest) -> Subscription {
        let (subscription, mut ctx) =
            Subscription::channel(request, self.options, TRANSPORT_NAME);

        let session = EventStreamSession {
            resolver: Arc::clone(&self.resolver),
            connector: Arc::clone(&self.connector),
            service_name: self.service_name.clone(),
        };

        tokio::spawn(async move {
            let outcome = session.run(&mut ctx).await;
            ctx.finish(outcome).await;
        });

        subscription
    }
}

/// 구독 하나의 연결 상태
struct EventStreamSession {
    resolver: Arc<dyn BaseUrlResolver>,
    connector: Arc<dyn EventSourceConnector>,
    service_name: String,
}

impl EventStreamSession {
    async fn run(self, ctx: &mut StreamContext) -> Result<()> {
        ctx.mark_connecting();

        let base = ctx
            .until_closed(self.resolver.resolve(&self.service_name))
            .await??;
        let request = ctx.request().clone();
        let url = endpoint::eventstream_url(&base, &request.task_id, request.after)?;

        info!("Opening event stream: {}", url);
        let mut frames = self.connector.open(url)?;
        let mut saw_completion = false;

        loop {
            let frame = match ctx.until_closed(frames.next()).await? {
                Some(frame) => frame?,
                None if saw_completion => {
                    debug!("Event stream for {} closed by server after completion", request.task_id);
                    return Ok(());
                }
                None => {
                    return Err(Error::TransportConnect(
                        "Event stream ended before completion".to_string(),
                    ));
                }
            };

            let (event, data) = match frame {
                SseFrame::Open => {
                    ctx.mark_streaming();
                    continue;
                }
                SseFrame::Message { event, data } => (event, data),
            };

            ctx.mark_streaming();
            if data.is_empty() {
                debug!("Ignoring '{}' frame without payload", event);
                continue;
            }

            let log_event = parse_frame(&event, &data)?;
            ctx.forward(log_event).await?;

            if event == COMPLETION_FRAME {
                if request.is_task_recoverable {
                    debug!("Task {} is recoverable, keeping stream open", request.task_id);
                    saw_completion = true;
                    continue;
                }
                ctx.complete();
                drop(frames);
                return Ok(());
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resolver::StaticResolver;
    use crate::subscription::StreamPhase;
    use futures::stream;
    use parking_lot::Mutex;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::task::{Context, Poll};
    use std::time::Duration;

    /// 연결이 끊겼는지(drop) 기록하는 프레임 스트림
    struct Tracked {
        inner: FrameStream,
        dropped: Arc<AtomicBool>,
    }

    impl Stream for Tracked {
        type Item = Result<SseFrame>;

        fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
            self.inner.as_mut().poll_next(cx)
        }
    }

    impl Drop for Tracked {
        fn drop(&mut self) {
            self.dropped.store(true, Ordering::SeqCst);
        }
    }

    /// 미리 정한 프레임을 내보내는 커넥터
    struct ScriptedConnector {
        frames: Mutex<Option<Vec<Result<SseFrame>>>>,
        /// 스크립트 이후 연결을 열어 둘지
        hold_open: bool,
        opened: Mutex<Vec<Url>>,
        dropped: Arc<AtomicBool>,
    }

    impl ScriptedConnector {
        fn new(frames: Vec<Result<SseFrame>>, hold_open: bool) -> Arc<Self> {
            Arc::new(Self {
                frames: Mutex::new(Some(frames)),
                hold_open,
                opened: Mutex::new(Vec::new()),
                dropped: Arc::new(AtomicBool::new(false)),
            })
        }
    }

    impl EventSourceConnector for ScriptedConnector {
        fn open(&self, url: Url) -> Result<FrameStream> {
            self.opened.lock().push(url);
            let frames = self.frames.lock().take().unwrap_or_default();
            let scripted = stream::iter(frames);
            let inner: FrameStream = if self.hold_open {
                Box::pin(scripted.chain(stream::pending()))
            } else {
                Box::pin(scripted)
            };
            Ok(Box::pin(Tracked {
                inner,
                dropped: Arc::clone(&self.dropped),
            }))
        }
    }

    fn log(id: u64) -> Result<SseFrame> {
        Ok(SseFrame::message("log", format!(r#"{{"id":{},"type":"log","message":"line {}"}}"#, id, id)))
    }

    fn completion(id: u64) -> Result<SseFrame> {
        Ok(SseFrame::message("completion", format!(r#"{{"id":{},"type":"completion"}}"#, id)))
    }

    fn transport(connector: Arc<ScriptedConnector>) -> EventStreamTransport {
        let resolver = Arc::new(StaticResolver::parse("http://logs.test").unwrap());
        EventStreamTransport::new(resolver, connector)
    }

    async fn ids(sub: &mut Subscription, n: usize) -> Vec<u64> {
        let mut out = Vec::new();
        for _ in 0..n {
            let event = sub.next().await.expect("stream ended").expect("stream error");
            out.push(event.id.value());
        }
        out
    }

    #[tokio::test]
    async fn test_completion_closes_non_recoverable_stream() {
        let connector = ScriptedConnector::new(
            vec![Ok(SseFrame::Open), log(1), log(2), completion(3), log(4)],
            true,
        );
        let mut sub = transport(Arc::clone(&connector)).subscribe(StreamRequest::new("t1"));

        let received: Vec<u64> = sub.by_ref().map(|e| e.unwrap().id.value()).collect().await;

        assert_eq!(received, vec![1, 2, 3]);
        assert_eq!(sub.phase(), StreamPhase::Completed);
        assert!(connector.dropped.load(Ordering::SeqCst));
        assert_eq!(
            connector.opened.lock()[0].as_str(),
            "http://logs.test/v2/tasks/t1/eventstream"
        );
    }

    #[tokio::test]
    async fn test_recoverable_completion_keeps_stream_open() {
        let connector = ScriptedConnector::new(vec![log(1), completion(2), log(3)], true);
        let mut sub = transport(Arc::clone(&connector))
            .subscribe(StreamRequest::new("t1").recoverable(true));

        assert_eq!(ids(&mut sub, 3).await, vec![1, 2, 3]);
        assert!(!sub.is_closed());
        assert!(!connector.dropped.load(Ordering::SeqCst));

        sub.cancel();
        assert!(sub.next().await.is_none());
        tokio::time::timeout(Duration::from_secs(1), async {
            while !connector.dropped.load(Ordering::SeqCst) {
                tokio::task::yield_now().await;
            }
        })
        .await
        .expect("connection should be dropped after cancel");
    }

    #[tokio::test]
    async fn test_recoverable_stream_ending_after_completion_completes() {
        let connector = ScriptedConnector::new(vec![log(1), completion(2)], false);
        let mut sub = transport(connector).subscribe(StreamRequest::new("t1").recoverable(true));

        let items: Vec<_> = sub.by_ref().collect().await;
        assert_eq!(items.len(), 2);
        assert!(items.iter().all(|i| i.is_ok()));
        assert_eq!(sub.phase(), StreamPhase::Completed);
    }

    #[tokio::test]
    async fn test_malformed_payload_is_fatal() {
        let connector = ScriptedConnector::new(
            vec![log(1), Ok(SseFrame::message("log", "{not json")), log(3)],
            true,
        );
        let mut sub = transport(connector).subscribe(StreamRequest::new("t1"));

        let items: Vec<_> = sub.by_ref().collect().await;
        assert_eq!(items.len(), 2);
        assert_eq!(items[0].as_ref().unwrap().id.value(), 1);
        assert!(matches!(items[1], Err(Error::FrameParse { ref event, .. }) if event == "log"));
        assert_eq!(sub.phase(), StreamPhase::Errored);
    }

    #[tokio::test]
    async fn test_unknown_frame_names_are_forwarded() {
        let connector = ScriptedConnector::new(
            vec![
                Ok(SseFrame::message("progress", r#"{"id":1,"type":"progress","pct":40}"#)),
                Ok(SseFrame::message("heartbeat", "")),
                completion(2),
            ],
            false,
        );
        let sub = transport(connector).subscribe(StreamRequest::new("t1"));

        let events: Vec<LogEvent> = sub.map(|e| e.unwrap()).collect().await;
        assert_eq!(events.len(), 2);
        assert_eq!(events[0].kind.as_str(), "progress");
        assert!(events[1].is_completion());
    }

    #[tokio::test]
    async fn test_transport_error_closes_subscription() {
        let connector = ScriptedConnector::new(
            vec![log(1), Err(Error::TransportConnect("reset by peer".into()))],
            true,
        );
        let mut sub = transport(connector).subscribe(StreamRequest::new("t1"));

        let items: Vec<_> = sub.by_ref().collect().await;
        assert_eq!(items.len(), 2);
        assert!(matches!(items[1], Err(Error::TransportConnect(_))));
        assert_eq!(sub.phase(), StreamPhase::Errored);
    }

    #[tokio::test]
    async fn test_premature_end_is_an_error() {
        let connector = ScriptedConnector::new(vec![log(1)], false);
        let sub = transport(connector).subscribe(StreamRequest::new("t1"));

        let items: Vec<_> = sub.collect().await;
        assert!(matches!(items.last(), Some(Err(Error::TransportConnect(_)))));
    }

    #[tokio::test]
    async fn test_resume_cursor_is_sent_and_enforced() {
        let connector = ScriptedConnector::new(vec![log(5), log(6), completion(7)], false);
        let sub = transport(Arc::clone(&connector)).subscribe(StreamRequest::new("t1").after(5u64));

        let received: Vec<u64> = sub.map(|e| e.unwrap().id.value()).collect().await;
        assert_eq!(received, vec![6, 7]);
        assert_eq!(connector.opened.lock()[0].query(), Some("after=5"));
    }

    #[tokio::test]
    async fn test_unresolvable_service_fails() {
        let connector = ScriptedConnector::new(vec![], true);
        let transport = EventStreamTransport::new(Arc::new(StaticResolver::default()), connector);
        let items: Vec<_> = transport.subscribe(StreamRequest::new("t1")).collect().await;
        assert_eq!(items.len(), 1);
        assert!(matches!(items[0], Err(Error::TransportConnect(_))));
    }
}
