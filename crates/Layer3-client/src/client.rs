//! Log Stream Client - 전송 방식을 감춘 구독 진입점
//!
//! 전송 방식은 설정 시점에 한 번 정해진다. 두 전송은 서버 endpoint와 실패 특성이
//! 다르므로 런타임에 다른 쪽으로 자동 전환하지 않는다.

use std::sync::Arc;
use tasklog_foundation::{
    ConfigLoader, Error, LogEvent, Ordinal, Result, StreamConfig, StreamRequest, TaskId,
    TransportMode,
};
use tasklog_transport::endpoint;
use tasklog_transport::{
    BaseUrlResolver, CachingResolver, EventSourceConnector, EventStreamTransport, HttpRequest,
    LogTransport, PollingTransport, ReqwestClient, ReqwestEventSourceConnector, RequestClient,
    StaticResolver, StreamOptions, Subscription,
};
use tracing::{debug, info};

/// 로그 스트림 파사드
pub struct LogStreamClient {
    config: StreamConfig,
    resolver: Arc<dyn BaseUrlResolver>,
    http: Arc<dyn RequestClient>,
    transport: Arc<dyn LogTransport>,
}

impl LogStreamClient {
    /// 협력자를 직접 주입하여 생성
    pub fn new(
        config: StreamConfig,
        resolver: Arc<dyn BaseUrlResolver>,
        http: Arc<dyn RequestClient>,
        connector: Arc<dyn EventSourceConnector>,
    ) -> Result<Self> {
        config.validate()?;

        let options = StreamOptions::from(&config);
        let transport: Arc<dyn LogTransport> = match config.transport {
            TransportMode::EventStream => Arc::new(
                EventStreamTransport::new(Arc::clone(&resolver), connector)
                    .with_service_name(config.service_name.clone())
                    .with_options(options),
            ),
            TransportMode::Polling => Arc::new(
                PollingTransport::new(Arc::clone(&resolver), Arc::clone(&http))
                    .with_service_name(config.service_name.clone())
                    .with_retry_interval(config.poll_retry_interval())
                    .with_empty_batch_delay(config.empty_batch_delay())
                    .with_request_timeout(config.request_timeout())
                    .with_options(options),
            ),
        };

        info!("Log stream client using {} transport", config.transport);

        Ok(Self {
            config,
            resolver,
            http,
            transport,
        })
    }

    /// 설정만으로 생성 (reqwest + 정적 base URL)
    pub fn from_config(config: StreamConfig) -> Result<Self> {
        let base_url = config.base_url.as_deref().ok_or_else(|| {
            Error::Config("base_url is required (set TASKLOG_BASE_URL or config.toml)".to_string())
        })?;
        let resolver = CachingResolver::new(StaticResolver::parse(base_url)?);

        let client = reqwest::Client::builder()
            .build()
            .map_err(|e| Error::Config(format!("Failed to create HTTP client: {}", e)))?;

        Self::new(
            config,
            Arc::new(resolver),
            Arc::new(ReqwestClient::with_client(client.clone())),
            Arc::new(ReqwestEventSourceConnector::new(client)),
        )
    }

    /// 설정 파일 + 환경변수를 읽어 생성
    pub fn load() -> Result<Self> {
        let working_dir = std::env::current_dir()?;
        let config = ConfigLoader::new(&working_dir).load()?;
        Self::from_config(config)
    }

    pub fn mode(&self) -> TransportMode {
        self.transport.mode()
    }

    pub fn config(&self) -> &StreamConfig {
        &self.config
    }

    /// 태스크 로그 구독
    ///
    /// 선택된 전송의 구독 핸들을 그대로 돌려준다. tokio 런타임 안에서 호출해야 한다.
    pub fn subscribe(&self, request: StreamRequest) -> Subscription {
        debug!(
            "Subscribing to task {} (after {:?}, recoverable {}) via {}",
            request.task_id,
            request.after.map(|a| a.value()),
            request.is_task_recoverable,
            self.mode()
        );
        self.transport.subscribe(request)
    }

    /// 이벤트 배치 1회 조회 (재시도 없음)
    ///
    /// non-2xx 응답은 `UpstreamStatus`로 변환된다.
    pub async fn fetch_events(
        &self,
        task_id: &TaskId,
        after: Option<Ordinal>,
    ) -> Result<Vec<LogEvent>> {
        let base = self.resolver.resolve(&self.config.service_name).await?;
        let url = endpoint::events_url(&base, task_id, after)?;
        let request = HttpRequest::get(url).timeout(self.config.request_timeout());

        let response = self.http.issue(request).await?.error_for_status()?;
        response.json("events")
    }
}
