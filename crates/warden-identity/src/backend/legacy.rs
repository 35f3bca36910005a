use anyhow::Result;
use async_trait::async_trait;
use sea_orm::{ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder};
use std::collections::BTreeSet;

use super::IdentityStore;
use crate::db::legacy::{menu, role, role_menu, user, user_role};
use crate::{MenuRow, RoleMenuRow, RoleRow, UserRow};

/// 旧库查询
pub struct LegacyStore {
    db: DatabaseConnection,
}

impl LegacyStore {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }
}

#[async_trait]
impl IdentityStore for LegacyStore {

    async fn user_by_id(&self, user_id: i64) -> Result<Option<UserRow>> {
        let user = user::Entity::find_by_id(user_id)
            .filter(user::Column::DeletedAt.is_null())
            .one(&self.db)
            .await?;
        Ok(user.map(UserRow::from))
    }

    async fn user_by_name(&self, user_name: &str) -> Result<Option<UserRow>> {
        let user = user::Entity::find()
            .filter(user::Column::UserName.eq(user_name))
            .filter(user::Column::DeletedAt.is_null())
            .one(&self.db)
            .await?;
        Ok(user.map(UserRow::from))
    }

    async fn roles_for_user(&self, user_id: i64) -> Result<Vec<RoleRow>> {
        // 先取关系再取角色
        let links = user_role::Entity::find()
            .filter(user_role::Column::UserId.eq(user_id))
            .all(&self.db)
            .await?;
        let role_ids: BTreeSet<i64> = links.into_iter().map(|link| link.role_id).collect();
        if role_ids.is_empty() {
            return Ok(Vec::new());
        }

        let roles = role::Entity::find()
            .filter(role::Column::RoleId.is_in(role_ids))
            .order_by_asc(role::Column::RoleId)
            .all(&self.db)
            .await?;
        Ok(roles.into_iter().map(RoleRow::from).collect())
    }

    async fn role_menus(&self, role_ids: &[i64]) -> Result<Vec<RoleMenuRow>> {
        let links = role_menu::Entity::find()
            .filter(role_menu::Column::RoleId.is_in(role_ids.to_vec()))
            .all(&self.db)
            .await?;
        Ok(links.into_iter().map(RoleMenuRow::from).collect())
    }

    async fn menus(&self, menu_ids: &[i64]) -> Result<Vec<MenuRow>> {
        let menus = menu::Entity::find()
            .filter(menu::Column::MenuId.is_in(menu_ids.to_vec()))
            .order_by_asc(menu::Column::MenuId)
            .all(&self.db)
            .await?;
        Ok(menus.into_iter().map(MenuRow::from).collect())
    }

    async fn users_for_roles(&self, role_ids: &[i64]) -> Result<Vec<i64>> {
        let links = user_role::Entity::find()
            .filter(user_role::Column::RoleId.is_in(role_ids.to_vec()))
            .all(&self.db)
            .await?;
        let users: BTreeSet<i64> = links.into_iter().map(|link| link.user_id).collect();
        Ok(users.into_iter().collect())
    }

    async fn roles_for_menus(&self, menu_ids: &[i64]) -> Result<Vec<i64>> {
        let links = role_menu::Entity::find()
            .filter(role_menu::Column::MenuId.is_in(menu_ids.to_vec()))
            .all(&self.db)
            .await?;
        let roles: BTreeSet<i64> = links.into_iter().map(|link| link.role_id).collect();
        Ok(roles.into_iter().collect())
    }
}
