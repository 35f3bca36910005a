use axum::{
    extract::{Path, State},
    Extension, Json,
};
use chrono::Utc;
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::info;
use warden_middleware::{auth::redact, AuthContext};

use crate::error::{ApiError, Result};
use crate::state::AppState;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginRequest {
    pub user_name: String,
    pub password: String,
}

/// 登录
pub async fn login(State(state): State<AppState>, Json(req): Json<LoginRequest>) -> Result<Json<Value>> {
    let user_name = req.user_name.trim();
    if user_name.is_empty() || req.password.is_empty() {
        return Err(ApiError::BadRequest("userName and password are required".to_string()));
    }

    let payload = state.payloads.login(user_name, &req.password).await?;
    let issued = state.sessions.open(&payload).await?;

    Ok(Json(json!({ "token": issued.token })))
}

/// 注销，未登录时同样返回成功
pub async fn logout(
    State(state): State<AppState>,
    context: Option<Extension<AuthContext>>,
) -> Result<Json<Value>> {
    if let Some(Extension(context)) = context.filter(|Extension(c)| !c.anonymous) {
        state.sessions.close(&context.session).await?;
    }
    Ok(Json(json!({ "msg": "ok" })))
}

/// 当前用户信息
pub async fn get_info(
    State(state): State<AppState>,
    Extension(context): Extension<AuthContext>,
) -> Result<Json<Value>> {
    let payload = state
        .sessions
        .store()
        .read(&context.session)
        .await?
        .ok_or_else(|| ApiError::Unauthorized("Session expired".to_string()))?;

    Ok(Json(json!({
        "userInfo": payload.user_info,
        "roles": payload.roles,
        "permissions": payload.permissions,
    })))
}

/// 在线会话列表
pub async fn list_online(State(state): State<AppState>) -> Result<Json<Value>> {
    let sessions = state.sessions.live_sessions().await?;
    Ok(Json(json!({
        "total": sessions.len(),
        "rows": sessions,
    })))
}

/// 强制下线
pub async fn force_logout(
    State(state): State<AppState>,
    Extension(context): Extension<AuthContext>,
    Path(session): Path<String>,
) -> Result<Json<Value>> {
    state.sessions.evict(&[session.clone()]).await?;
    info!(
        operator = context.user_id,
        session = %redact(&session),
        "Session force-logged out"
    );
    Ok(Json(json!({ "msg": "ok" })))
}

/// 健康检查
pub async fn health(State(state): State<AppState>) -> Json<Value> {
    let db = state.identity.status().await;
    Json(json!({
        "status": "ok",
        "db": db,
        "timestamp": Utc::now().to_rfc3339(),
    }))
}
