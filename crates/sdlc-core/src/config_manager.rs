//! 설정 로드.
//!
//! 기본값 → 설정 파일(TOML/JSON/YAML) → `SDLC_` 환경변수 순으로 계층을 쌓는다.
//! 예: `SDLC_AGENT__PROJECT_ID=my-project`, `SDLC_RELAY__TIMEOUT_SECS=120`

use config::{Config, Environment, File};
use directories::ProjectDirs;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

use crate::config::AppConfig;
use crate::error::CoreError;

/// 환경변수 접두사
pub const ENV_PREFIX: &str = "SDLC";

/// 기본 설정 파일 이름
const CONFIG_FILE_NAME: &str = "config.toml";

/// 설정 관리자. 로드된 설정과 그 출처를 보관
#[derive(Debug, Clone)]
pub struct ConfigManager {
    config: AppConfig,
    source: Option<PathBuf>,
}

impl ConfigManager {
    /// 설정 로드
    ///
    /// `path`가 없으면 플랫폼 설정 디렉토리의 `config.toml`을 (존재할 때만) 사용한다.
    pub fn load(path: Option<&Path>) -> Result<Self, CoreError> {
        let source = match path {
            Some(p) => Some(p.to_path_buf()),
            None => Self::default_config_path().filter(|p| p.exists()),
        };
        let env = Environment::with_prefix(ENV_PREFIX)
            .prefix_separator("_")
            .separator("__")
            .try_parsing(true);

        let config = Self::build(source.as_deref(), env)?;
        match &source {
            Some(p) => info!("설정 로드: {}", p.display()),
            None => info!("설정 파일 없음, 기본값 + 환경변수 사용"),
        }
        Ok(Self { config, source })
    }

    /// 계층 구성 후 역직렬화 + 검증
    fn build(path: Option<&Path>, env: Environment) -> Result<AppConfig, CoreError> {
        let defaults = Config::try_from(&AppConfig::default_config())
            .map_err(|e| CoreError::Config(format!("기본 설정 직렬화 실패: {e}")))?;

        let mut builder = Config::builder().add_source(defaults);
        if let Some(path) = path {
            debug!(path = %path.display(), "설정 파일 계층 추가");
            builder = builder.add_source(File::from(path).required(true));
        }

        let config: AppConfig = builder
            .add_source(env)
            .build()
            .and_then(Config::try_deserialize)
            .map_err(|e| CoreError::Config(format!("설정 로드 실패: {e}")))?;

        config.validate()?;
        Ok(config)
    }

    /// 현재 설정
    pub fn get(&self) -> &AppConfig {
        &self.config
    }

    /// 설정 소유권 반환
    pub fn into_config(self) -> AppConfig {
        self.config
    }

    /// 사용된 설정 파일 경로
    pub fn source(&self) -> Option<&Path> {
        self.source.as_deref()
    }

    /// 플랫폼별 기본 설정 파일 경로
    ///
    /// - macOS: `~/Library/Application Support/dev.sdlc-assist.sdlc-assist/config.toml`
    /// - Linux: `~/.config/sdlc-assist/config.toml`
    pub fn default_config_path() -> Option<PathBuf> {
        ProjectDirs::from("dev", "sdlc-assist", "sdlc-assist")
            .map(|dirs| dirs.config_dir().join(CONFIG_FILE_NAME))
    }
}
