//! # tasklog-foundation
//!
//! Foundation layer for Tasklog:
//! - Event: 로그 이벤트 모델 (LogEvent, Ordinal, EventKind)
//! - Request: 구독 요청 (TaskId, StreamRequest)
//! - Config: 전송 방식 및 재시도 설정 (StreamConfig, ConfigLoader)
//! - Error: 공용 에러 타입
//!
//! ## 아키텍처
//!
//! ```text
//! ┌──────────────────────────────────────────────┐
//! │  LogStreamClient (Layer3)                     │
//! │            │ subscribe(StreamRequest)         │
//! │     ┌──────┴───────┐                          │
//! │     ▼              ▼                          │
//! │  EventStream    Polling      (Layer2)         │
//! │  (SSE push)     (cursor pull)                 │
//! │     └──────┬───────┘                          │
//! │            ▼                                  │
//! │   Subscription ── LogEvent (Layer1)           │
//! └──────────────────────────────────────────────┘
//! ```

pub mod config;
pub mod request;
pub mod error;
pub mod event;

// ============================================================================
// Error
// ============================================================================
pub use error::{Error, Result};

// ============================================================================
// Model
// ============================================================================
pub use request::{StreamRequest, TaskId};
pub use event::{EventKind, LogEvent, Ordinal};

// ============================================================================
// Config
// ============================================================================
pub use config::{ConfigLoader, StreamConfig, TransportMode};
