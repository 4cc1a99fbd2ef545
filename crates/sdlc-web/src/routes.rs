//! API 라우트 정의.

use axum::routing::{get, post, put};
use axum::Router;

use crate::handlers;
use crate::AppState;

/// API 라우트 생성 (`/api` 아래에 중첩)
pub fn api_routes() -> Router<AppState> {
    Router::new()
        .route("/health", get(handlers::health::health))
        // 프로젝트
        .route(
            "/projects",
            get(handlers::projects::list_projects).post(handlers::projects::create_project),
        )
        .route("/projects/{id}", get(handlers::projects::get_project))
        .route("/projects/{id}/prd", put(handlers::projects::save_prd))
        .route(
            "/projects/{id}/design-system",
            put(handlers::projects::save_design_system),
        )
        .route(
            "/projects/{id}/template",
            put(handlers::projects::select_template),
        )
        // 업로드 문서
        .route(
            "/projects/{id}/documents",
            get(handlers::projects::list_documents).post(handlers::projects::add_document),
        )
        // 화면
        .route(
            "/projects/{id}/screens",
            get(handlers::screens::list_screens).post(handlers::screens::replace_screens),
        )
        .route(
            "/projects/{id}/screens/{screen_id}/prototype",
            put(handlers::screens::save_prototype),
        )
        // 생성 스트림 (SSE)
        .route(
            "/projects/{id}/analyze/stream",
            get(handlers::generation::generate_requirements),
        )
        .route(
            "/projects/{id}/design-system/generate",
            get(handlers::generation::generate_design_system),
        )
        .route(
            "/projects/{id}/screens/extract",
            get(handlers::generation::extract_screens),
        )
        .route(
            "/projects/{id}/screens/{screen_id}/generate",
            get(handlers::generation::generate_prototype),
        )
        .route(
            "/projects/{id}/screens/{screen_id}/refine",
            post(handlers::generation::refine_prototype),
        )
}
