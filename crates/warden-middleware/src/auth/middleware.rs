use axum::{
    body::Body,
    extract::{Query, Request, State},
    http::{header, HeaderMap, Method},
    middleware::Next,
    response::Response,
};
use serde_json::Value;
use std::collections::{HashMap, HashSet};
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use tracing::{debug, info, warn};

use super::{permission::satisfies, redact, AuthContext, AuthError, Claims};
use crate::session::{DirtySignal, PayloadBuilder, SessionManager, SessionPayload};

/// 读取请求体以获取 `type` 字段时的大小上限
const MAX_INSPECTED_BODY: usize = 2 * 1024 * 1024;

/// 请求中携带权限子类型的字段名
const SUBTYPE_FIELD: &str = "type";

/// 认证中间件共享状态
#[derive(Clone)]
pub struct AuthState {
    pub sessions: Arc<SessionManager>,
    pub dirty: Arc<dyn DirtySignal>,
    pub payloads: Arc<dyn PayloadBuilder>,
    /// 不要求会话在线的路由
    pub allowlist: Arc<HashSet<String>>,
    /// 白名单路由上没有有效凭证时是否注入匿名身份
    pub anonymous_fallback: bool,
}

impl AuthState {
    /// 受保护路由：校验凭证、会话在线、滑动续期、按需重建权限
    async fn admit(&self, token: &str, path: &str) -> Result<AuthContext, AuthError> {
        let claims = self.sessions.jwt().verify(token).map_err(|err| {
            warn!(path = %path, token = %redact(token), "Token verification failed");
            err
        })?;

        let store = self.sessions.store();
        if !store.is_live(&claims.session).await? {
            self.discard(&claims.session).await;
            warn!(
                path = %path,
                user_id = claims.user_id,
                session = %redact(&claims.session),
                "Session expired"
            );
            return Err(AuthError::AuthExpired);
        }

        store.refresh(&claims.session, self.sessions.ttl()).await?;

        let payload = if self.dirty.is_dirty(claims.user_id).await? {
            self.rebuild(&claims).await?
        } else {
            match store.read(&claims.session).await? {
                Some(payload) => payload,
                None => {
                    warn!(
                        path = %path,
                        session = %redact(&claims.session),
                        "Session vanished after refresh"
                    );
                    return Err(AuthError::AuthExpired);
                }
            }
        };

        Ok(AuthContext::from_session(&claims, &payload))
    }

    /// 重建会话内容：先完整计算，再一次性覆盖写入，最后清除标记
    async fn rebuild(&self, claims: &Claims) -> Result<SessionPayload, AuthError> {
        let store = self.sessions.store();

        let Some(payload) = self.payloads.build(claims.user_id).await? else {
            self.discard(&claims.session).await;
            warn!(user_id = claims.user_id, "User no longer exists, session destroyed");
            return Err(AuthError::AuthExpired);
        };

        // 计算期间会话可能已被注销或清理，不能重新写回
        let replaced = store
            .replace(&claims.session, &payload, self.sessions.ttl())
            .await?;
        if !replaced {
            warn!(
                user_id = claims.user_id,
                session = %redact(&claims.session),
                "Session ended during rebuild"
            );
            return Err(AuthError::AuthExpired);
        }
        self.dirty.clear(claims.user_id).await?;

        info!(
            user_id = claims.user_id,
            roles = ?payload.roles,
            permissions = payload.permissions.len(),
            "Session permissions rebuilt"
        );
        Ok(payload)
    }

    /// 删除会话，失败只记录日志
    async fn discard(&self, session: &str) {
        if let Err(err) = self.sessions.store().destroy(&[session.to_string()]).await {
            warn!(session = %redact(session), error = %err, "Failed to destroy session");
        }
    }

    /// 白名单路由：凭证有效则按会话内容注入，不检查在线也不续期；
    /// 否则按配置注入匿名身份
    async fn public_identity(&self, token: Option<&str>, path: &str) -> Option<AuthContext> {
        let claims = match token.map(|t| self.sessions.jwt().verify(t)) {
            Some(Ok(claims)) => claims,
            Some(Err(_)) => {
                debug!(path = %path, "Ignoring invalid token on public route");
                return self.anonymous_fallback.then(AuthContext::anonymous);
            }
            None => return self.anonymous_fallback.then(AuthContext::anonymous),
        };

        match self.sessions.store().read(&claims.session).await {
            Ok(Some(payload)) => Some(AuthContext::from_session(&claims, &payload)),
            Ok(None) => Some(AuthContext::from_claims(&claims)),
            Err(err) => {
                warn!(path = %path, error = %err, "Failed to read session on public route");
                Some(AuthContext::from_claims(&claims))
            }
        }
    }
}

/// 认证中间件
pub async fn authenticate(
    State(state): State<AuthState>,
    mut req: Request,
    next: Next,
) -> Result<Response, AuthError> {
    let path = req.uri().path().to_string();
    let token = bearer_token(req.headers());

    let context = if state.allowlist.contains(&path) {
        state.public_identity(token.as_deref(), &path).await
    } else {
        let Some(token) = token else {
            warn!(path = %path, "Missing bearer token");
            return Err(AuthError::TokenInvalid);
        };
        Some(state.admit(&token, &path).await?)
    };

    if let Some(context) = context {
        req.extensions_mut().insert(context);
    }

    Ok(next.run(req).await)
}

/// 权限检查中间件生成器
///
/// 所需权限为单独的动作时，请求中的 `type` 字段（GET 取查询参数，
/// 携带 JSON 请求体时优先取请求体）作为子类型参与匹配。
pub fn require_permission(
    permission: &'static str,
) -> impl Fn(Request, Next) -> Pin<Box<dyn Future<Output = Result<Response, AuthError>> + Send>> + Clone
{
    move |req: Request, next: Next| {
        Box::pin(async move {
            let (req, subtype) = extract_subtype(req).await?;

            let context = req
                .extensions()
                .get::<AuthContext>()
                .ok_or(AuthError::TokenInvalid)?;

            if context.anonymous && mutates_state(req.method()) {
                warn!(
                    path = %req.uri().path(),
                    method = %req.method(),
                    "Anonymous identity rejected on state-changing request"
                );
                return Err(AuthError::PermissionDenied);
            }

            if !satisfies(&context.permissions, permission, subtype.as_deref()) {
                warn!(
                    path = %req.uri().path(),
                    user_id = context.user_id,
                    required = permission,
                    subtype = ?subtype,
                    "Permission denied"
                );
                return Err(AuthError::PermissionDenied);
            }

            Ok(next.run(req).await)
        })
    }
}

fn bearer_token(headers: &HeaderMap) -> Option<String> {
    headers
        .get(header::AUTHORIZATION)
        .and_then(|h| h.to_str().ok())
        .and_then(|h| h.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .map(str::to_string)
}

fn mutates_state(method: &Method) -> bool {
    !matches!(*method, Method::GET | Method::HEAD | Method::OPTIONS)
}

/// 取出请求中的 `type` 字段，读取过的请求体会原样放回
async fn extract_subtype(req: Request) -> Result<(Request, Option<String>), AuthError> {
    let from_query = Query::<HashMap<String, String>>::try_from_uri(req.uri())
        .ok()
        .and_then(|Query(params)| params.get(SUBTYPE_FIELD).cloned())
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty());

    if !carries_json(&req) {
        return Ok((req, from_query));
    }

    let (parts, body) = req.into_parts();
    let bytes = axum::body::to_bytes(body, MAX_INSPECTED_BODY)
        .await
        .map_err(|err| AuthError::Internal(anyhow::anyhow!("failed to read body: {err}")))?;

    let from_body = serde_json::from_slice::<Value>(&bytes)
        .ok()
        .and_then(|value| value.get(SUBTYPE_FIELD).and_then(subtype_value));

    let req = Request::from_parts(parts, Body::from(bytes));
    Ok((req, from_body.or(from_query)))
}

fn carries_json(req: &Request) -> bool {
    matches!(*req.method(), Method::POST | Method::PUT | Method::PATCH)
        && req
            .headers()
            .get(header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .is_some_and(|v| v.starts_with("application/json"))
}

fn subtype_value(value: &Value) -> Option<String> {
    let raw = match value {
        Value::String(s) => s.trim().to_string(),
        Value::Number(n) => n.to_string(),
        _ => return None,
    };
    (!raw.is_empty()).then_some(raw)
}
