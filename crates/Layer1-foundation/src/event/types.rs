//! Event Types - 태스크 로그 스트림의 이벤트 타입 정의
//!
//! 두 전송 방식(event stream, polling) 모두 동일한 `LogEvent`를 만들어 낸다.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;
use std::str::FromStr;

// ============================================================================
// Ordinal
// ============================================================================

/// 태스크 내 이벤트 순번
///
/// 서버는 숫자 또는 숫자 문자열로 보낼 수 있으며, 항상 숫자로 정규화된다.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "RawOrdinal", into = "u64")]
pub struct Ordinal(u64);

impl Ordinal {
    pub const fn new(value: u64) -> Self {
        Self(value)
    }

    pub fn value(&self) -> u64 {
        self.0
    }
}

impl From<u64> for Ordinal {
    fn from(value: u64) -> Self {
        Self(value)
    }
}

impl From<Ordinal> for u64 {
    fn from(ordinal: Ordinal) -> Self {
        ordinal.0
    }
}

impl FromStr for Ordinal {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.trim()
            .parse::<u64>()
            .map(Self)
            .map_err(|_| format!("invalid ordinal: {:?}", s))
    }
}

impl fmt::Display for Ordinal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// 와이어 상의 순번 표현 (숫자 | 문자열)
#[derive(Deserialize)]
#[serde(untagged)]
enum RawOrdinal {
    Number(u64),
    Text(String),
}

impl TryFrom<RawOrdinal> for Ordinal {
    type Error = String;

    fn try_from(raw: RawOrdinal) -> Result<Self, Self::Error> {
        match raw {
            RawOrdinal::Number(n) => Ok(Self(n)),
            RawOrdinal::Text(s) => s.parse(),
        }
    }
}

// ============================================================================
// Event Kind
// ============================================================================

/// 이벤트 종류
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum EventKind {
    /// 일반 로그 라인
    Log,
    /// 태스크 완료 신호
    Completion,
    /// 그 외 이름 (그대로 전달)
    Other(String),
}

impl EventKind {
    pub fn as_str(&self) -> &str {
        match self {
            Self::Log => "log",
            Self::Completion => "completion",
            Self::Other(name) => name,
        }
    }

    pub fn is_completion(&self) -> bool {
        matches!(self, Self::Completion)
    }
}

impl From<String> for EventKind {
    fn from(name: String) -> Self {
        match name.as_str() {
            "log" => Self::Log,
            "completion" => Self::Completion,
            _ => Self::Other(name),
        }
    }
}

impl From<&str> for EventKind {
    fn from(name: &str) -> Self {
        Self::from(name.to_string())
    }
}

impl From<EventKind> for String {
    fn from(kind: EventKind) -> Self {
        match kind {
            EventKind::Other(name) => name,
            other => other.as_str().to_string(),
        }
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_str())
    }
}

// ============================================================================
// LogEvent
// ============================================================================

/// 태스크 로그 이벤트
///
/// `id`와 `type`을 제외한 나머지 필드는 `payload`에 그대로 보존된다.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogEvent {
    pub id: Ordinal,

    #[serde(rename = "type")]
    pub kind: EventKind,

    #[serde(flatten)]
    pub payload: Map<String, Value>,
}

impl LogEvent {
    pub fn new(id: impl Into<Ordinal>, kind: impl Into<EventKind>) -> Self {
        Self {
            id: id.into(),
            kind: kind.into(),
            payload: Map::new(),
        }
    }

    /// 페이로드 필드 추가 (빌더)
    pub fn with_field(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.payload.insert(key.into(), value.into());
        self
    }

    pub fn is_completion(&self) -> bool {
        self.kind.is_completion()
    }

    /// 사람이 읽을 메시지 (`message` 또는 `line` 필드)
    pub fn message(&self) -> Option<&str> {
        self.payload
            .get("message")
            .or_else(|| self.payload.get("line"))
            .and_then(Value::as_str)
    }
}
