use anyhow::Result;
use async_trait::async_trait;
use sea_orm::{ColumnTrait, Condition, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder};
use std::collections::BTreeSet;

use super::IdentityStore;
use crate::db::primary::{sys_menu, sys_role, sys_role_menu, sys_user, sys_user_role};
use crate::{MenuRow, RoleMenuRow, RoleRow, UserRow};

/// 主库查询
pub struct PrimaryStore {
    db: DatabaseConnection,
}

impl PrimaryStore {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }
}

/// `del_flag` 为空或 '0' 视为未删除
fn not_deleted(column: impl ColumnTrait) -> Condition {
    Condition::any().add(column.is_null()).add(column.eq("0"))
}

#[async_trait]
impl IdentityStore for PrimaryStore {

    async fn user_by_id(&self, user_id: i64) -> Result<Option<UserRow>> {
        let user = sys_user::Entity::find_by_id(user_id)
            .filter(not_deleted(sys_user::Column::DelFlag))
            .one(&self.db)
            .await?;
        Ok(user.map(UserRow::from))
    }

    async fn user_by_name(&self, user_name: &str) -> Result<Option<UserRow>> {
        let user = sys_user::Entity::find()
            .filter(sys_user::Column::UserName.eq(user_name))
            .filter(not_deleted(sys_user::Column::DelFlag))
            .one(&self.db)
            .await?;
        Ok(user.map(UserRow::from))
    }

    async fn roles_for_user(&self, user_id: i64) -> Result<Vec<RoleRow>> {
        // 单次关联查询
        let roles = sys_role::Entity::find()
            .inner_join(sys_user_role::Entity)
            .filter(sys_user_role::Column::UserId.eq(user_id))
            .filter(not_deleted(sys_role::Column::DelFlag))
            .order_by_asc(sys_role::Column::RoleId)
            .all(&self.db)
            .await?;
        Ok(roles.into_iter().map(RoleRow::from).collect())
    }

    async fn role_menus(&self, role_ids: &[i64]) -> Result<Vec<RoleMenuRow>> {
        let links = sys_role_menu::Entity::find()
            .filter(sys_role_menu::Column::RoleId.is_in(role_ids.to_vec()))
            .all(&self.db)
            .await?;
        Ok(links.into_iter().map(RoleMenuRow::from).collect())
    }

    async fn menus(&self, menu_ids: &[i64]) -> Result<Vec<MenuRow>> {
        let menus = sys_menu::Entity::find()
            .filter(sys_menu::Column::MenuId.is_in(menu_ids.to_vec()))
            .order_by_asc(sys_menu::Column::MenuId)
            .all(&self.db)
            .await?;
        Ok(menus.into_iter().map(MenuRow::from).collect())
    }

    async fn users_for_roles(&self, role_ids: &[i64]) -> Result<Vec<i64>> {
        let links = sys_user_role::Entity::find()
            .filter(sys_user_role::Column::RoleId.is_in(role_ids.to_vec()))
            .all(&self.db)
            .await?;
        let users: BTreeSet<i64> = links.into_iter().map(|link| link.user_id).collect();
        Ok(users.into_iter().collect())
    }

    async fn roles_for_menus(&self, menu_ids: &[i64]) -> Result<Vec<i64>> {
        let links = sys_role_menu::Entity::find()
            .filter(sys_role_menu::Column::MenuId.is_in(menu_ids.to_vec()))
            .all(&self.db)
            .await?;
        let roles: BTreeSet<i64> = links.into_iter().map(|link| link.role_id).collect();
        Ok(roles.into_iter().collect())
    }
}
