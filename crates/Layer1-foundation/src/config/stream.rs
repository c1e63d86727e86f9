//! Stream Config - 로그 스트림 클라이언트 설정
//!
//! 전송 방식은 클라이언트 인스턴스 단위로 고정된다 (호출마다 바꾸지 않음).

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::time::Duration;
use url::Url;

/// 기본 서비스 이름
pub const DEFAULT_SERVICE_NAME: &str = "tasks";

/// polling 실패 후 재시도 간격 기본값 (ms)
pub const DEFAULT_POLL_RETRY_MS: u64 = 1000;

/// 구독당 버퍼링할 이벤트 수 기본값
pub const DEFAULT_CHANNEL_CAPACITY: usize = 64;

// ============================================================================
// TransportMode
// ============================================================================

/// 로그 전송 방식
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransportMode {
    /// push 기반 Server-Sent Events
    #[default]
    EventStream,
    /// pull 기반 커서 polling
    Polling,
}

impl TransportMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::EventStream => "eventstream",
            Self::Polling => "polling",
        }
    }
}

impl FromStr for TransportMode {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "eventstream" | "event-stream" | "sse" => Ok(Self::EventStream),
            "polling" | "poll" => Ok(Self::Polling),
            other => Err(format!(
                "unknown transport '{}', expected 'eventstream' or 'polling'",
                other
            )),
        }
    }
}

impl fmt::Display for TransportMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ============================================================================
// StreamConfig
// ============================================================================

/// 로그 스트림 클라이언트 설정
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StreamConfig {
    /// 전송 방식
    pub transport: TransportMode,

    /// resolver에 전달할 논리 서비스 이름
    pub service_name: String,

    /// 정적 base URL (기본 resolver용)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub base_url: Option<String>,

    /// polling fetch 실패 후 재시도 간격 (ms)
    pub poll_retry_interval_ms: u64,

    /// 빈 배치 후 다음 poll까지 대기 (ms, 0이면 즉시)
    pub empty_batch_delay_ms: u64,

    /// 구독당 이벤트 버퍼 크기
    pub channel_capacity: usize,

    /// 배치/1회성 요청 타임아웃 (초)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub request_timeout_secs: Option<u64>,

    /// 순번 역행을 치명적 에러로 취급
    pub strict_ordering: bool,
}

impl Default for StreamConfig {
    fn default() -> Self {
        Self {
            transport: TransportMode::default(),
            service_name: DEFAULT_SERVICE_NAME.to_string(),
            base_url: None,
            poll_retry_interval_ms: DEFAULT_POLL_RETRY_MS,
            empty_batch_delay_ms: 0,
            channel_capacity: DEFAULT_CHANNEL_CAPACITY,
            request_timeout_secs: None,
            strict_ordering: false,
        }
    }
}

impl StreamConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn validate(&self) -> Result<()> {
        if self.channel_capacity == 0 {
            return Err(Error::Config("channel_capacity must be at least 1".to_string()));
        }
        if self.service_name.trim().is_empty() {
            return Err(Error::Config("service_name must not be empty".to_string()));
        }
        if let Some(base) = &self.base_url {
            Url::parse(base)
                .map_err(|e| Error::Config(format!("invalid base_url '{}': {}", base, e)))?;
        }
        Ok(())
    }

    // effective 값들
    pub fn poll_retry_interval(&self) -> Duration {
        Duration::from_millis(self.poll_retry_interval_ms)
    }

    pub fn empty_batch_delay(&self) -> Duration {
        Duration::from_millis(self.empty_batch_delay_ms)
    }

    pub fn request_timeout(&self) -> Option<Duration> {
        self.request_timeout_secs.map(Duration::from_secs)
    }

    // 빌더
    pub fn transport(mut self, mode: TransportMode) -> Self {
        self.transport = mode;
        self
    }

    pub fn base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = Some(url.into());
        self
    }

    pub fn poll_retry_interval_ms(mut self, ms: u64) -> Self {
        self.poll_retry_interval_ms = ms;
        self
    }

    pub fn strict_ordering(mut self, strict: bool) -> Self {
        self.strict_ordering = strict;
        self
    }

    /// 부분 설정 병합 (지정된 필드만 덮어씀)
    pub fn merge(&mut self, other: PartialStreamConfig) {
        if let Some(v) = other.transport {
            self.transport = v;
        }
        if let Some(v) = other.service_name {
            self.service_name = v;
        }
        if other.base_url.is_some() {
            self.base_url = other.base_url;
        }
        if let Some(v) = other.poll_retry_interval_ms {
            self.poll_retry_interval_ms = v;
        }
        if let Some(v) = other.empty_batch_delay_ms {
            self.empty_batch_delay_ms = v;
        }
        if let Some(v) = other.channel_capacity {
            self.channel_capacity = v;
        }
        if other.request_timeout_secs.is_some() {
            self.request_timeout_secs = other.request_timeout_secs;
        }
        if let Some(v) = other.strict_ordering {
            self.strict_ordering = v;
        }
    }
}

/// 설정 파일 한 개의 내용 (모든 필드 선택)
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct PartialStreamConfig {
    pub transport: Option<TransportMode>,
    pub service_name: Option<String>,
    pub base_url: Option<String>,
    pub poll_retry_interval_ms: Option<u64>,
    pub empty_batch_delay_ms: Option<u64>,
    pub channel_capacity: Option<usize>,
    pub request_timeout_secs: Option<u64>,
    pub strict_ordering: Option<bool>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = StreamConfig::default();
        assert_eq!(config.transport, TransportMode::EventStream);
        assert_eq!(config.poll_retry_interval(), Duration::from_secs(1));
        assert_eq!(config.empty_batch_delay(), Duration::ZERO);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_transport_mode_parsing() {
        assert_eq!("polling".parse::<TransportMode>(), Ok(TransportMode::Polling));
        assert_eq!("SSE".parse::<TransportMode>(), Ok(TransportMode::EventStream));
        assert!("websocket".parse::<TransportMode>().is_err());
    }

    #[test]
    fn test_merge_only_overrides_present_fields() {
        let mut config = StreamConfig::default().base_url("http://a.example");
        config.merge(PartialStreamConfig {
            transport: Some(TransportMode::Polling),
            poll_retry_interval_ms: Some(250),
            ..Default::default()
        });

        assert_eq!(config.transport, TransportMode::Polling);
        assert_eq!(config.poll_retry_interval_ms, 250);
        assert_eq!(config.base_url.as_deref(), Some("http://a.example"));
        assert_eq!(config.channel_capacity, DEFAULT_CHANNEL_CAPACITY);
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        let mut config = StreamConfig::default();
        config.channel_capacity = 0;
        assert!(config.validate().is_err());

        let config = StreamConfig::default().base_url("not a url");
        assert!(matches!(config.validate(), Err(Error::Config(_))));
    }
}
