//! # tasklog-client
//!
//! 원격 태스크의 실시간 로그를 구독하는 클라이언트 파사드.
//! 호출자는 push(SSE)인지 pull(polling)인지 알 필요 없이 하나의
//! 순서 보장 이벤트 스트림을 받는다.
//!
//! ## 사용 예
//!
//! ```ignore
//! use futures::StreamExt;
//! use tasklog_client::LogStreamClient;
//! use tasklog_foundation::StreamRequest;
//!
//! let client = LogStreamClient::load()?;
//! let mut logs = client.subscribe(StreamRequest::new("task-42").recoverable(false));
//!
//! while let Some(event) = logs.next().await {
//!     let event = event?;
//!     println!("{} {}", event.id, event.message().unwrap_or_default());
//! }
//!
//! // 끊긴 지점부터 다시 구독
//! let resumed = client.subscribe(logs.resume_request());
//! ```

pub mod client;

pub use client::LogStreamClient;

// 호출자가 transport crate를 직접 의존하지 않아도 되도록
pub use tasklog_foundation::{
    Error, EventKind, LogEvent, Ordinal, Result, StreamConfig, StreamRequest, TaskId,
    TransportMode,
};
pub use tasklog_transport::{StreamPhase, Subscription};
