//! Config - 로그 스트림 클라이언트 설정
//!
//! - `stream.rs` - StreamConfig, TransportMode
//! - `loader.rs` - TOML 파일 + 환경변수 병합 로더

mod loader;
mod stream;

pub use loader::{
    apply_env_overrides, load_config_from_file, ConfigLoader, CONFIG_DIR_NAME, CONFIG_FILE_NAME,
    ENV_BASE_URL, ENV_POLL_RETRY_MS, ENV_SERVICE_NAME, ENV_TRANSPORT,
};
pub use stream::{
    PartialStreamConfig, StreamConfig, TransportMode, DEFAULT_CHANNEL_CAPACITY,
    DEFAULT_POLL_RETRY_MS, DEFAULT_SERVICE_NAME,
};
