//! Error types for Tasklog
//!
//! 로그 스트리밍 관련 모든 에러를 중앙에서 관리

use thiserror::Error;

/// Result type alias
pub type Result<T> = std::result::Result<T, Error>;

/// Tasklog 에러 타입
#[derive(Error, Debug)]
pub enum Error {
    // ========================================================================
    // 전송 관련
    // ========================================================================
    /// 연결 실패 또는 연결 유실
    #[error("Transport connect error: {0}")]
    TransportConnect(String),

    /// 페이로드가 올바른 LogEvent JSON이 아님
    #[error("Frame parse error ({event}): {message}")]
    FrameParse { event: String, message: String },

    /// 1회성 호출의 non-2xx 응답
    #[error("Upstream returned HTTP {status}: {message}")]
    UpstreamStatus { status: u16, message: String },

    #[error("Ordinal regression: received {received} after {previous}")]
    OrdinalRegression { previous: u64, received: u64 },

    /// 이미 닫힌 구독 (구독자에게 전달되지 않음)
    #[error("Subscription closed")]
    SubscriptionClosed,

    // ========================================================================
    // 설정 관련
    // ========================================================================
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    // ========================================================================
    // 외부 에러 변환
    // ========================================================================
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML error: {0}")]
    Toml(#[from] toml::de::Error),
}

impl Error {
    /// 프레임 파싱 에러 생성 헬퍼
    pub fn frame_parse(event: impl Into<String>, message: impl ToString) -> Self {
        Error::FrameParse {
            event: event.into(),
            message: message.to_string(),
        }
    }

    /// polling 루프가 재시도해야 하는 fetch 단계 에러인지 확인
    ///
    /// 그 외 에러는 구독을 종료시킨다.
    pub fn is_retryable_fetch(&self) -> bool {
        matches!(
            self,
            Error::TransportConnect(_) | Error::UpstreamStatus { .. }
        )
    }
}
