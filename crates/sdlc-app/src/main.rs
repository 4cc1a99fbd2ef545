//! # sdlc-app
//!
//! SDLC Assist 서버 바이너리 진입점.
//! 설정 로드, DI 와이어링, 웹 서버 라이프사이클.

mod lifecycle;
mod wiring;

use anyhow::{Context, Result};
use clap::Parser;
use sdlc_core::config_manager::ConfigManager;
use sdlc_web::WebServer;
use std::path::PathBuf;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use crate::lifecycle::LifecycleManager;

/// SDLC Assist API 서버
///
/// 프로젝트 산출물 생성 진행 상황을 SSE로 중계한다
#[derive(Parser, Debug)]
#[command(name = "sdlc-assist")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// 설정 파일 경로 (기본: 플랫폼 설정 디렉토리의 config.toml)
    #[arg(long, short = 'c')]
    config: Option<PathBuf>,

    /// 웹 서버 포트 (설정 파일 값 재정의)
    #[arg(long, short = 'p')]
    port: Option<u16>,

    /// 외부 접근 허용 (0.0.0.0 바인드)
    #[arg(long)]
    allow_external: bool,

    /// 디자인 템플릿 디렉토리 (설정 파일 값 재정의)
    #[arg(long)]
    templates_dir: Option<PathBuf>,

    /// 로그 레벨 (trace, debug, info, warn, error)
    #[arg(long, short = 'l', default_value = "info")]
    log_level: String,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let log_filter = format!(
        "sdlc_assist={},sdlc_app={},sdlc_core={},sdlc_network={},sdlc_storage={},sdlc_generation={},sdlc_web={},tower_http={}",
        args.log_level,
        args.log_level,
        args.log_level,
        args.log_level,
        args.log_level,
        args.log_level,
        args.log_level,
        args.log_level
    );
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&log_filter)),
        )
        .init();

    info!("SDLC Assist 시작 (v{})", env!("CARGO_PKG_VERSION"));

    // ── 설정 로드 ──
    let manager = ConfigManager::load(args.config.as_deref()).context("설정 로드 실패")?;
    let mut config = manager.into_config();
    if let Some(port) = args.port {
        config.web.port = port;
    }
    if args.allow_external {
        config.web.allow_external = true;
    }
    if let Some(dir) = args.templates_dir {
        config.templates.dir = Some(dir);
    }

    // ── 어댑터 생성 (DI 와이어링) ──
    let state = wiring::build_state(&config).context("어댑터 초기화 실패")?;

    // ── 서버 실행 ──
    let lifecycle = LifecycleManager::new();
    let server = WebServer::new(state, config.web.clone());
    info!("API 주소: {}", server.url());

    let mut server_task = tokio::spawn(server.run(lifecycle.subscribe()));
    let result = tokio::select! {
        _ = lifecycle.wait_for_signal() => server_task.await,
        result = &mut server_task => result,
    };

    match result {
        Ok(Ok(())) => {}
        Ok(Err(e)) => {
            error!("API 서버 에러: {e}");
            return Err(e).context("API 서버 실행 실패");
        }
        Err(e) => return Err(e).context("API 서버 태스크 실패"),
    }

    info!("SDLC Assist 종료");
    Ok(())
}
