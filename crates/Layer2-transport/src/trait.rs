//! Transport trait
//!
//! 두 전송 방식(push event stream, pull polling)은 같은 능력
//! "순서가 보장된 이벤트 구독"의 서로 다른 구현이다.

use crate::subscription::Subscription;
use tasklog_foundation::{StreamRequest, TransportMode};

/// 로그 전송 trait
///
/// `subscribe`는 전송 루프를 tokio 태스크로 띄우므로 런타임 안에서 호출해야 한다.
pub trait LogTransport: Send + Sync {
    /// 이 구현의 전송 방식
    fn mode(&self) -> TransportMode;

    /// 구독 시작 - 반환된 핸들이 유일한 소유자
    fn subscribe(&self, request: StreamRequest) -> Subscription;
}
