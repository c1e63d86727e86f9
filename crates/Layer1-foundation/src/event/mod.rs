//! Event Model - 태스크 로그 이벤트
//!
//! - `Ordinal`: 태스크 내 단조 증가 순번 (재개 커서의 기준)
//! - `EventKind`: `log` | `completion` | 기타
//! - `LogEvent`: 수신 후 불변인 로그 이벤트

mod types;

pub use types::{EventKind, LogEvent, Ordinal};
