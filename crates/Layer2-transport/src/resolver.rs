//! Base URL resolution
//!
//! 논리 서비스 이름 → base URL. 구독 간에 공유되는 유일한 자원이며,
//! `CachingResolver`가 서비스 이름 단위로 캐시한다.

use async_trait::async_trait;
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::Arc;
use tasklog_foundation::{Error, Result};
use tracing::debug;
use url::Url;

/// 서비스 이름으로 base URL을 찾는 협력자
#[async_trait]
pub trait BaseUrlResolver: Send + Sync {
    async fn resolve(&self, service: &str) -> Result<Url>;
}

#[async_trait]
impl<R: BaseUrlResolver + ?Sized> BaseUrlResolver for Arc<R> {
    async fn resolve(&self, service: &str) -> Result<Url> {
        (**self).resolve(service).await
    }
}

// ============================================================================
// StaticResolver
// ============================================================================

/// 설정에 고정된 base URL
#[derive(Debug, Clone, Default)]
pub struct StaticResolver {
    default: Option<Url>,
    services: HashMap<String, Url>,
}

impl StaticResolver {
    /// 모든 서비스에 같은 base URL
    pub fn new(base: Url) -> Self {
        Self {
            default: Some(base),
            services: HashMap::new(),
        }
    }

    pub fn parse(base: &str) -> Result<Self> {
        let url = Url::parse(base)
            .map_err(|e| Error::Config(format!("invalid base URL '{}': {}", base, e)))?;
        Ok(Self::new(url))
    }

    /// 서비스별 base URL (빌더)
    pub fn with_service(mut self, service: impl Into<String>, base: Url) -> Self {
        self.services.insert(service.into(), base);
        self
    }
}

#[async_trait]
impl BaseUrlResolver for StaticResolver {
    async fn resolve(&self, service: &str) -> Result<Url> {
        self.services
            .get(service)
            .or(self.default.as_ref())
            .cloned()
            .ok_or_else(|| {
                Error::TransportConnect(format!("no base URL configured for service '{}'", service))
            })
    }
}

// ============================================================================
// CachingResolver
// ============================================================================

/// 서비스 이름별로 결과를 기억하는 resolver
pub struct CachingResolver<R> {
    inner: R,
    cache: RwLock<HashMap<String, Url>>,
}

impl<R: BaseUrlResolver> CachingResolver<R> {
    pub fn new(inner: R) -> Self {
        Self {
            inner,
            cache: RwLock::new(HashMap::new()),
        }
    }

    pub fn cached(&self, service: &str) -> Option<Url> {
        self.cache.read().get(service).cloned()
    }

    /// 캐시 무효화 (다음 resolve에서 다시 조회)
    pub fn invalidate(&self, service: &str) {
        self.cache.write().remove(service);
    }
}

#[async_trait]
impl<R: BaseUrlResolver> BaseUrlResolver for CachingResolver<R> {
    async fn resolve(&self, service: &str) -> Result<Url> {
        if let Some(url) = self.cached(service) {
            return Ok(url);
        }

        let url = self.inner.resolve(service).await?;
        debug!("Resolved service '{}' to {}", service, url);
        self.cache.write().insert(service.to_string(), url.clone());
        Ok(url)
    }
}
