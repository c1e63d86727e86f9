//! Transport implementations
//!
//! - `event_stream`: SSE push 연결
//! - `polling`: 커서 기반 pull 루프

pub mod event_stream;
pub mod polling;
