use crate::{handlers, state::AppState};
use axum::{
    middleware::{from_fn, from_fn_with_state},
    routing::{delete, get, post},
    Router,
};
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use warden_middleware::{authenticate, require_permission};

/// 创建 API 路由
pub fn create_router(state: AppState) -> Router {
    Router::new()
        // 公开接口
        .route("/user/login", post(handlers::login))
        .route("/user/logout", post(handlers::logout))
        .route("/api/health", get(handlers::health))
        .route("/health", get(handlers::health))

        // 登录后可用
        .route("/user/getInfo", get(handlers::get_info))

        // 在线会话管理
        .route(
            "/monitor/online",
            get(handlers::list_online).route_layer(from_fn(require_permission("R|online"))),
        )
        .route(
            "/monitor/online/:session",
            delete(handlers::force_logout).route_layer(from_fn(require_permission("D|online"))),
        )

        // 添加中间件
        .layer(from_fn_with_state(state.auth.clone(), authenticate))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
