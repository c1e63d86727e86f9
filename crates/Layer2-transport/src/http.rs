//! HTTP request primitive
//!
//! "요청 발행 후 JSON 파싱 또는 실패" 만을 담당하는 얇은 계층.
//! 네트워크 수준 실패(`Err`)와 non-2xx 응답(`Ok` + status)을 구분한다.

use async_trait::async_trait;
use reqwest::header::{HeaderName, HeaderValue, ACCEPT};
use reqwest::{Client, Method, StatusCode};
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::time::Duration;
use tasklog_foundation::{Error, Result};
use tracing::debug;
use url::Url;

// ============================================================================
// HttpRequest / HttpResponse
// ============================================================================

/// 발행할 요청
#[derive(Debug, Clone)]
pub struct HttpRequest {
    pub method: Method,
    pub url: Url,
    pub headers: Vec<(String, String)>,
    pub body: Option<Value>,
    pub timeout: Option<Duration>,
}

impl HttpRequest {
    pub fn new(method: Method, url: Url) -> Self {
        Self {
            method,
            url,
            headers: Vec::new(),
            body: None,
            timeout: None,
        }
    }

    pub fn get(url: Url) -> Self {
        Self::new(Method::GET, url)
    }

    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    pub fn json(mut self, body: Value) -> Self {
        self.body = Some(body);
        self
    }

    pub fn timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }
}

/// 수신한 응답 (본문은 전부 읽은 상태)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpResponse {
    pub status: u16,
    pub body: String,
}

impl HttpResponse {
    pub fn new(status: u16, body: impl Into<String>) -> Self {
        Self {
            status,
            body: body.into(),
        }
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    pub fn text(&self) -> &str {
        &self.body
    }

    /// 본문을 JSON으로 파싱 - 실패 시 `FrameParse`
    pub fn json<T: DeserializeOwned>(&self, what: &str) -> Result<T> {
        serde_json::from_str(&self.body).map_err(|e| Error::frame_parse(what, e))
    }

    /// non-2xx를 `UpstreamStatus`로 변환
    pub fn error_for_status(self) -> Result<Self> {
        if self.is_success() {
            return Ok(self);
        }
        Err(Error::UpstreamStatus {
            status: self.status,
            message: translate_error_body(self.status, &self.body),
        })
    }
}

/// 에러 본문에서 사람이 읽을 메시지 추출
///
/// `{"message"}`, `{"error"}`, `{"error": {"message"}}`, `{"detail"}` 순으로 찾고,
/// 없으면 본문 텍스트, 그것도 비어 있으면 표준 status 문구.
pub fn translate_error_body(status: u16, body: &str) -> String {
    if let Ok(json) = serde_json::from_str::<Value>(body) {
        let found = ["message", "error", "detail"].iter().find_map(|key| {
            json.get(key).and_then(|v| {
                v.as_str()
                    .map(str::to_string)
                    .or_else(|| v.get("message").and_then(Value::as_str).map(str::to_string))
            })
        });
        if let Some(message) = found {
            return message;
        }
    }

    let trimmed = body.trim();
    if !trimmed.is_empty() {
        return trimmed.to_string();
    }

    StatusCode::from_u16(status)
        .ok()
        .and_then(|s| s.canonical_reason())
        .unwrap_or("Unknown status")
        .to_string()
}

// ============================================================================
// RequestClient
// ============================================================================

/// 요청 발행 primitive
#[async_trait]
pub trait RequestClient: Send + Sync {
    /// 네트워크 실패는 `Err(TransportConnect)`, 그 외 모든 status는 `Ok`
    async fn issue(&self, request: HttpRequest) -> Result<HttpResponse>;
}

/// reqwest 기반 구현
#[derive(Debug, Clone, Default)]
pub struct ReqwestClient {
    client: Client,
}

impl ReqwestClient {
    pub fn new() -> Result<Self> {
        let client = Client::builder()
            .build()
            .map_err(|e| Error::Config(format!("Failed to create HTTP client: {}", e)))?;
        Ok(Self { client })
    }

    pub fn with_client(client: Client) -> Self {
        Self { client }
    }

    pub fn client(&self) -> &Client {
        &self.client
    }
}

#[async_trait]
impl RequestClient for ReqwestClient {
    async fn issue(&self, request: HttpRequest) -> Result<HttpResponse> {
        debug!("{} {}", request.method, request.url);

        let mut builder = self
            .client
            .request(request.method, request.url)
            .header(ACCEPT, "application/json");

        for (name, value) in &request.headers {
            let name = HeaderName::from_bytes(name.as_bytes())
                .map_err(|e| Error::InvalidInput(format!("header name '{}': {}", name, e)))?;
            let value = HeaderValue::from_str(value)
                .map_err(|e| Error::InvalidInput(format!("header value for {}: {}", name, e)))?;
            builder = builder.header(name, value);
        }

        if let Some(body) = &request.body {
            builder = builder.json(body);
        }

        if let Some(timeout) = request.timeout {
            builder = builder.timeout(timeout);
        }

        let response = builder
            .send()
            .await
            .map_err(|e| Error::TransportConnect(format!("Failed to send request: {}", e)))?;

        let status = response.status().as_u16();
        let body = response
            .text()
            .await
            .map_err(|e| Error::TransportConnect(format!("Failed to read response body: {}", e)))?;

        Ok(HttpResponse { status, body })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_success_range() {
        assert!(HttpResponse::new(200, "").is_success());
        assert!(HttpResponse::new(204, "").is_success());
        assert!(!HttpResponse::new(304, "").is_success());
        assert!(!HttpResponse::new(503, "").is_success());
    }

    #[test]
    fn test_error_body_translation() {
        assert_eq!(
            translate_error_body(404, r#"{"message":"task not found"}"#),
            "task not found"
        );
        assert_eq!(
            translate_error_body(400, r#"{"error":{"message":"bad cursor"}}"#),
            "bad cursor"
        );
        assert_eq!(translate_error_body(502, "  upstream down \n"), "upstream down");
        assert_eq!(translate_error_body(503, ""), "Service Unavailable");
    }

    #[test]
    fn test_error_for_status() {
        let err = HttpResponse::new(409, r#"{"detail":"already cancelled"}"#)
            .error_for_status()
            .unwrap_err();
        match err {
            Error::UpstreamStatus { status, message } => {
                assert_eq!(status, 409);
                assert_eq!(message, "already cancelled");
            }
            other => panic!("unexpected error: {other}"),
        }

        assert!(HttpResponse::new(200, "[]").error_for_status().is_ok());
    }

    #[test]
    fn test_json_failure_is_frame_parse() {
        let response = HttpResponse::new(200, "not json");
        let result: Result<Vec<Value>> = response.json("events");
        assert!(matches!(result, Err(Error::FrameParse { .. })));
    }
}
