use async_trait::async_trait;
use std::collections::BTreeSet;
use std::sync::Arc;
use tracing::{debug, info};
use warden_middleware::{AuthError, PayloadBuilder, RoleInfo, SessionPayload, UserProfile, ADMIN_WILDCARD};

use crate::backend::{BackendAdapter, PinnedBackend};
use crate::credentials::check_credentials;
use crate::error::Result;
use crate::resolver::resolve_with;
use crate::{RoleRow, UserRow};

/// 管理员角色 key，持有该角色即拥有全部权限
pub const ADMIN_ROLE_KEY: &str = "admin";

/// 从身份库构建会话内容
///
/// 同一次构建中的所有查询使用同一个库。
pub struct SessionPayloadBuilder {
    backend: Arc<BackendAdapter>,
}

impl SessionPayloadBuilder {
    pub fn new(backend: Arc<BackendAdapter>) -> Self {
        Self { backend }
    }

    pub fn backend(&self) -> &Arc<BackendAdapter> {
        &self.backend
    }

    /// 按用户 ID 构建，用户不存在时返回 None
    pub async fn build_payload(&self, user_id: i64) -> Result<Option<SessionPayload>> {
        let mut pinned = self.backend.pin().await;
        let Some(user) = pinned.user_by_id(user_id).await? else {
            debug!(user_id = user_id, "User no longer exists");
            return Ok(None);
        };

        let payload = assemble(&mut pinned, user).await?;
        Ok(Some(payload))
    }

    /// 校验凭证并构建会话内容
    pub async fn login(&self, user_name: &str, password: &str) -> Result<SessionPayload> {
        let mut pinned = self.backend.pin().await;
        let user = check_credentials(&mut pinned, user_name, password).await?;
        let payload = assemble(&mut pinned, user).await?;

        info!(
            user_id = payload.user_info.user_id,
            mode = %pinned.mode(),
            "User authenticated"
        );
        Ok(payload)
    }
}

#[async_trait]
impl PayloadBuilder for SessionPayloadBuilder {
    async fn build(&self, user_id: i64) -> std::result::Result<Option<SessionPayload>, AuthError> {
        Ok(self.build_payload(user_id).await?)
    }
}

async fn assemble(backend: &mut PinnedBackend<'_>, user: UserRow) -> Result<SessionPayload> {
    let roles = backend.roles_for_user(user.user_id).await?;
    let is_admin = roles.iter().any(|role| role.role_key == ADMIN_ROLE_KEY);

    let permissions = if is_admin {
        BTreeSet::from([ADMIN_WILDCARD.to_string()])
    } else {
        let role_ids: Vec<i64> = roles.iter().map(|role| role.role_id).collect();
        resolve_with(backend, &role_ids).await?
    };

    let role_keys = role_keys(&roles);
    Ok(SessionPayload::new(profile(user, roles), role_keys, permissions))
}

fn role_keys(roles: &[RoleRow]) -> Vec<String> {
    let mut keys: Vec<String> = Vec::with_capacity(roles.len());
    for role in roles {
        if !keys.contains(&role.role_key) {
            keys.push(role.role_key.clone());
        }
    }
    keys
}

fn profile(user: UserRow, roles: Vec<RoleRow>) -> UserProfile {
    UserProfile {
        user_id: user.user_id,
        user_name: user.user_name,
        nick_name: user.nick_name,
        email: user.email,
        department: user.department,
        active: user.status.is_active(),
        roles: roles
            .into_iter()
            .map(|role| RoleInfo {
                role_id: role.role_id,
                role_name: role.role_name,
                role_key: role.role_key,
            })
            .collect(),
    }
}
