//! # tasklog-transport
//!
//! Log stream transports for Tasklog.
//! 한 태스크의 로그를 순서가 보장된 단일 이벤트 시퀀스로 만들어 준다.
//!
//! ## Features
//! - SSE event stream (push) - `EventStreamTransport`
//! - Cursor-based polling (pull) with fixed-interval retry - `PollingTransport`
//! - 공통 구독 핸들: 완료 / 에러 / 취소 의미가 두 전송에서 동일
//! - 취소 토큰으로 진행 중인 네트워크 작업 중단

pub mod endpoint;
pub mod http;
pub mod resolver;
pub mod subscription;
pub mod transports;
pub mod r#trait;

// Core trait and handle
pub use r#trait::LogTransport;
pub use subscription::{StreamContext, StreamOptions, StreamPhase, Subscription};

// Collaborators
pub use http::{HttpRequest, HttpResponse, ReqwestClient, RequestClient};
pub use resolver::{BaseUrlResolver, CachingResolver, StaticResolver};

// Transport implementations
pub use transports::event_stream::{
    EventSourceConnector, EventStreamTransport, FrameStream, ReqwestEventSourceConnector, SseFrame,
};
pub use transports::polling::{Cursor, PollingTransport};
