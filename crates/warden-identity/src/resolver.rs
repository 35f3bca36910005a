use std::collections::BTreeSet;
use std::sync::Arc;
use tracing::debug;
use warden_middleware::auth::split_permissions;

use crate::backend::{BackendAdapter, PinnedBackend};
use crate::error::Result;

/// 角色 -> 菜单 -> 权限串 的解析器
pub struct PermissionResolver {
    backend: Arc<BackendAdapter>,
}

impl PermissionResolver {
    pub fn new(backend: Arc<BackendAdapter>) -> Self {
        Self { backend }
    }

    /// 解析一组角色的权限并集
    pub async fn resolve_for_roles(&self, role_ids: &[i64]) -> Result<BTreeSet<String>> {
        let mut pinned = self.backend.pin().await;
        resolve_with(&mut pinned, role_ids).await
    }
}

/// 在已固定模式的适配器上解析权限
///
/// 非正数与重复的角色 ID 被忽略；菜单 `perms` 按 `,` 拆分、去空白、丢弃空串。
pub async fn resolve_with(backend: &mut PinnedBackend<'_>, role_ids: &[i64]) -> Result<BTreeSet<String>> {
    let role_ids = normalize_ids(role_ids);
    if role_ids.is_empty() {
        return Ok(BTreeSet::new());
    }

    let links = backend.role_menus(&role_ids).await?;
    let menu_ids = normalize_ids(&links.iter().map(|link| link.menu_id).collect::<Vec<_>>());
    if menu_ids.is_empty() {
        return Ok(BTreeSet::new());
    }

    let permissions: BTreeSet<String> = backend
        .menus(&menu_ids)
        .await?
        .iter()
        .flat_map(|menu| split_permissions(menu.perms.as_deref()))
        .collect();

    debug!(
        roles = role_ids.len(),
        menus = menu_ids.len(),
        permissions = permissions.len(),
        mode = %backend.mode(),
        "Permissions resolved"
    );
    Ok(permissions)
}

fn normalize_ids(ids: &[i64]) -> Vec<i64> {
    ids.iter()
        .copied()
        .filter(|id| *id > 0)
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect()
}
