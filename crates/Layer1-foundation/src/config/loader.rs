//! Configuration Loader
//!
//! ## 검색 우선순위
//!
//! 1. User-level: `~/.tasklog/config.toml`
//! 2. Project-level: `.tasklog/config.toml`
//! 3. 환경변수 (`TASKLOG_*`)
//!
//! 각 레벨의 설정이 이전 레벨을 필드 단위로 오버라이드합니다.

use super::stream::{PartialStreamConfig, StreamConfig};
use crate::{Error, Result};
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// 설정 폴더 이름
pub const CONFIG_DIR_NAME: &str = ".tasklog";

/// 설정 파일명
pub const CONFIG_FILE_NAME: &str = "config.toml";

// 환경변수 이름
pub const ENV_TRANSPORT: &str = "TASKLOG_TRANSPORT";
pub const ENV_BASE_URL: &str = "TASKLOG_BASE_URL";
pub const ENV_SERVICE_NAME: &str = "TASKLOG_SERVICE_NAME";
pub const ENV_POLL_RETRY_MS: &str = "TASKLOG_POLL_RETRY_MS";

/// 설정 파일 경로 정보
#[derive(Debug, Clone)]
struct ConfigPath {
    path: PathBuf,
    /// 우선순위 (높을수록 우선)
    priority: u8,
    description: &'static str,
}

/// 설정 로더
pub struct ConfigLoader {
    search_paths: Vec<ConfigPath>,
}

impl ConfigLoader {
    /// 새 로더 생성 (기본 검색 경로)
    pub fn new(working_dir: &Path) -> Self {
        let mut paths = Vec::new();

        if let Some(home) = dirs::home_dir() {
            paths.push(ConfigPath {
                path: home.join(CONFIG_DIR_NAME).join(CONFIG_FILE_NAME),
                priority: 10,
                description: "User settings",
            });
        }

        paths.push(ConfigPath {
            path: working_dir.join(CONFIG_DIR_NAME).join(CONFIG_FILE_NAME),
            priority: 20,
            description: "Project settings",
        });

        paths.sort_by_key(|p| p.priority);

        Self { search_paths: paths }
    }

    /// 커스텀 검색 경로로 생성 (뒤쪽이 우선)
    pub fn with_paths(paths: Vec<PathBuf>) -> Self {
        let search_paths = paths
            .into_iter()
            .enumerate()
            .map(|(i, path)| ConfigPath {
                path,
                priority: i as u8,
                description: "Custom",
            })
            .collect();

        Self { search_paths }
    }

    /// 모든 파일 + 환경변수를 병합하여 로드
    pub fn load(&self) -> Result<StreamConfig> {
        let mut config = self.load_files()?;
        apply_env_overrides(&mut config, |key| std::env::var(key).ok())?;
        config.validate()?;
        Ok(config)
    }

    /// 파일만 병합 (환경변수 미적용)
    pub fn load_files(&self) -> Result<StreamConfig> {
        let mut merged = StreamConfig::default();

        for config_path in &self.search_paths {
            if !config_path.path.exists() {
                debug!("No settings at {}", config_path.path.display());
                continue;
            }
            match load_config_from_file(&config_path.path) {
                Ok(partial) => {
                    info!(
                        "Loaded {} from: {}",
                        config_path.description,
                        config_path.path.display()
                    );
                    merged.merge(partial);
                }
                Err(e) => {
                    warn!(
                        "Failed to load settings from {}: {}",
                        config_path.path.display(),
                        e
                    );
                    return Err(e);
                }
            }
        }

        Ok(merged)
    }
}

/// 단일 TOML 파일 로드
pub fn load_config_from_file(path: &Path) -> Result<PartialStreamConfig> {
    let content = std::fs::read_to_string(path)?;
    Ok(toml::from_str(&content)?)
}

/// 환경변수 오버라이드 적용
pub fn apply_env_overrides<F>(config: &mut StreamConfig, lookup: F) -> Result<()>
where
    F: Fn(&str) -> Option<String>,
{
    if let Some(mode) = lookup(ENV_TRANSPORT) {
        config.transport = mode
            .parse()
            .map_err(|e| Error::Config(format!("{}: {}", ENV_TRANSPORT, e)))?;
    }

    if let Some(url) = lookup(ENV_BASE_URL) {
        config.base_url = Some(url);
    }

    if let Some(name) = lookup(ENV_SERVICE_NAME) {
        config.service_name = name;
    }

    if let Some(ms) = lookup(ENV_POLL_RETRY_MS) {
        config.poll_retry_interval_ms = ms
            .trim()
            .parse()
            .map_err(|_| Error::Config(format!("{} must be a number, got '{}'", ENV_POLL_RETRY_MS, ms)))?;
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::TransportMode;
    use std::collections::HashMap;
    use tempfile::TempDir;

    fn write(dir: &Path, name: &str, content: &str) -> PathBuf {
        let path = dir.join(name);
        std::fs::write(&path, content).unwrap();
        path
    }

    #[test]
    fn test_later_files_override_earlier() {
        let dir = TempDir::new().unwrap();
        let user = write(
            dir.path(),
            "user.toml",
            "transport = \"polling\"\nbase_url = \"http://user.example\"\n",
        );
        let project = write(dir.path(), "project.toml", "base_url = \"http://project.example\"\n");

        let config = ConfigLoader::with_paths(vec![user, project])
            .load_files()
            .unwrap();

        assert_eq!(config.transport, TransportMode::Polling);
        assert_eq!(config.base_url.as_deref(), Some("http://project.example"));
    }

    #[test]
    fn test_missing_files_are_skipped() {
        let dir = TempDir::new().unwrap();
        let config = ConfigLoader::with_paths(vec![dir.path().join("absent.toml")])
            .load_files()
            .unwrap();
        assert_eq!(config, StreamConfig::default());
    }

    #[test]
    fn test_invalid_toml_is_an_error() {
        let dir = TempDir::new().unwrap();
        let bad = write(dir.path(), "bad.toml", "transport = [");
        let result = ConfigLoader::with_paths(vec![bad]).load_files();
        assert!(matches!(result, Err(Error::Toml(_))));
    }

    #[test]
    fn test_env_overrides() {
        let env: HashMap<&str, &str> = [
            (ENV_TRANSPORT, "polling"),
            (ENV_POLL_RETRY_MS, "50"),
            (ENV_SERVICE_NAME, "task-logs"),
        ]
        .into_iter()
        .collect();

        let mut config = StreamConfig::default();
        apply_env_overrides(&mut config, |k| env.get(k).map(|v| v.to_string())).unwrap();

        assert_eq!(config.transport, TransportMode::Polling);
        assert_eq!(config.poll_retry_interval_ms, 50);
        assert_eq!(config.service_name, "task-logs");
    }

    #[test]
    fn test_env_override_rejects_garbage() {
        let mut config = StreamConfig::default();
        let result = apply_env_overrides(&mut config, |k| {
            (k == ENV_POLL_RETRY_MS).then(|| "soon".to_string())
        });
        assert!(matches!(result, Err(Error::Config(_))));
    }
}
