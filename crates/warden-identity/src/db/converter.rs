use super::{legacy, primary};
use crate::{AccountStatus, BackendMode, MenuRow, RoleMenuRow, RoleRow, UserRow};

/// 主库实体到统一行结构的转换
impl From<primary::sys_user::Model> for UserRow {
    fn from(model: primary::sys_user::Model) -> Self {
        Self {
            user_id: model.user_id,
            user_name: model.user_name,
            nick_name: model.nick_name,
            email: model.email,
            department: None,
            status: AccountStatus::from_code(model.status.as_deref(), BackendMode::Primary),
            password_hash: model.password,
        }
    }
}

impl From<primary::sys_role::Model> for RoleRow {
    fn from(model: primary::sys_role::Model) -> Self {
        Self {
            role_id: model.role_id,
            role_name: model.role_name,
            role_key: model.role_key,
        }
    }
}

impl From<primary::sys_role_menu::Model> for RoleMenuRow {
    fn from(model: primary::sys_role_menu::Model) -> Self {
        Self {
            role_id: model.role_id,
            menu_id: model.menu_id,
        }
    }
}

impl From<primary::sys_menu::Model> for MenuRow {
    fn from(model: primary::sys_menu::Model) -> Self {
        Self {
            menu_id: model.menu_id,
            menu_name: model.menu_name,
            perms: model.perms,
        }
    }
}

/// 旧库实体到统一行结构的转换
impl From<legacy::user::Model> for UserRow {
    fn from(model: legacy::user::Model) -> Self {
        Self {
            user_id: model.user_id,
            user_name: model.user_name,
            nick_name: None,
            email: model.email,
            department: model.department,
            status: AccountStatus::from_code(model.status.as_deref(), BackendMode::Legacy),
            password_hash: model.password,
        }
    }
}

impl From<legacy::role::Model> for RoleRow {
    fn from(model: legacy::role::Model) -> Self {
        Self {
            role_id: model.role_id,
            role_name: model.role_name,
            role_key: model.role_key,
        }
    }
}

impl From<legacy::role_menu::Model> for RoleMenuRow {
    fn from(model: legacy::role_menu::Model) -> Self {
        Self {
            role_id: model.role_id,
            menu_id: model.menu_id,
        }
    }
}

impl From<legacy::menu::Model> for MenuRow {
    fn from(model: legacy::menu::Model) -> Self {
        Self {
            menu_id: model.menu_id,
            menu_name: model.menu_name,
            perms: model.perms,
        }
    }
}
