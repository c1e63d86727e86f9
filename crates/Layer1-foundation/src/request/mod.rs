//! Request Module - 구독 요청 타입
//!
//! - `TaskId`: 원격 태스크 식별자
//! - `StreamRequest`: 태스크 ID + 재개 커서 + recoverable 플래그

mod types;

pub use types::{StreamRequest, TaskId};
