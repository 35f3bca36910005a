//! 权限变更通知
//!
//! 修改用户-角色或角色-菜单关系后调用，把受影响的用户写入待刷新集合。
use std::sync::Arc;
use tracing::info;
use warden_middleware::DirtySignal;

use crate::backend::BackendAdapter;
use crate::error::Result;

pub struct ChangeNotifier {
    backend: Arc<BackendAdapter>,
    dirty: Arc<dyn DirtySignal>,
}

impl ChangeNotifier {
    pub fn new(backend: Arc<BackendAdapter>, dirty: Arc<dyn DirtySignal>) -> Self {
        Self { backend, dirty }
    }

    /// 用户的角色被修改
    pub async fn users_changed(&self, user_ids: &[i64]) -> Result<Vec<i64>> {
        let mut users = user_ids.to_vec();
        users.sort_unstable();
        users.dedup();
        self.mark(users, "user roles").await
    }

    /// 角色的菜单被修改，通知持有这些角色的用户
    pub async fn roles_changed(&self, role_ids: &[i64]) -> Result<Vec<i64>> {
        let users = self.backend.users_for_roles(role_ids).await?;
        self.mark(users, "role menus").await
    }

    /// 菜单的权限串被修改，通知经由角色关联到这些菜单的用户
    pub async fn menus_changed(&self, menu_ids: &[i64]) -> Result<Vec<i64>> {
        let users = self.backend.users_for_menus(menu_ids).await?;
        self.mark(users, "menu perms").await
    }

    async fn mark(&self, users: Vec<i64>, cause: &'static str) -> Result<Vec<i64>> {
        if users.is_empty() {
            return Ok(users);
        }
        self.dirty.mark(&users).await?;
        info!(count = users.len(), cause = cause, "Users flagged for session refresh");
        Ok(users)
    }
}
