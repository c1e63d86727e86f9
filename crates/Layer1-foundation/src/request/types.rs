//! Request Types - 구독 요청 타입
//!
//! 모든 레이어에서 공통으로 사용하는 타입들

use crate::event::Ordinal;
use serde::{Deserialize, Serialize};
use std::fmt;

// ============================================================================
// TaskId
// ============================================================================

/// 원격 태스크 식별자 (불투명 문자열)
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TaskId(String);

impl TaskId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for TaskId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

impl From<String> for TaskId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

impl fmt::Display for TaskId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

// ============================================================================
// StreamRequest
// ============================================================================

/// 로그 스트림 구독 요청
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StreamRequest {
    pub task_id: TaskId,

    /// 이 순번 "이후"부터 재개 (None이면 처음부터)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub after: Option<Ordinal>,

    /// true면 completion 이벤트가 event stream 구독을 닫지 않음
    #[serde(default)]
    pub is_task_recoverable: bool,
}

impl StreamRequest {
    pub fn new(task_id: impl Into<TaskId>) -> Self {
        Self {
            task_id: task_id.into(),
            after: None,
            is_task_recoverable: false,
        }
    }

    // 빌더
    pub fn after(mut self, ordinal: impl Into<Ordinal>) -> Self {
        self.after = Some(ordinal.into());
        self
    }

    pub fn resume_from(mut self, ordinal: Option<Ordinal>) -> Self {
        self.after = ordinal;
        self
    }

    pub fn recoverable(mut self, recoverable: bool) -> Self {
        self.is_task_recoverable = recoverable;
        self
    }
}
