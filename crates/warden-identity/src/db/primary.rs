//! 主库实体（Postgres）
//!
//! 软删除使用 `del_flag`，'0' 表示未删除；关系表使用复合主键。
use sea_orm::entity::prelude::*;

/// 用户实体
pub mod sys_user {
    use super::*;

    #[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
    #[sea_orm(table_name = "sys_user")]
    pub struct Model {
        #[sea_orm(primary_key, auto_increment = false)]
        pub user_id: i64,
        pub user_name: String,
        pub nick_name: Option<String>,
        pub email: Option<String>,
        pub password: String,
        pub status: Option<String>,
        pub del_flag: Option<String>,
    }

    #[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
    pub enum Relation {}

    impl ActiveModelBehavior for ActiveModel {}
}

/// 角色实体
pub mod sys_role {
    use super::*;

    #[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
    #[sea_orm(table_name = "sys_role")]
    pub struct Model {
        #[sea_orm(primary_key, auto_increment = false)]
        pub role_id: i64,
        pub role_name: String,
        pub role_key: String,
        pub status: Option<String>,
        pub del_flag: Option<String>,
    }

    #[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
    pub enum Relation {
        #[sea_orm(has_many = "super::sys_user_role::Entity")]
        UserRole,
    }

    impl Related<super::sys_user_role::Entity> for Entity {
        fn to() -> RelationDef {
            Relation::UserRole.def()
        }
    }

    impl ActiveModelBehavior for ActiveModel {}
}

/// 菜单实体，`perms` 为逗号分隔的权限串
pub mod sys_menu {
    use super::*;

    #[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
    #[sea_orm(table_name = "sys_menu")]
    pub struct Model {
        #[sea_orm(primary_key, auto_increment = false)]
        pub menu_id: i64,
        pub menu_name: String,
        pub parent_id: Option<i64>,
        pub perms: Option<String>,
    }

    #[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
    pub enum Relation {}

    impl ActiveModelBehavior for ActiveModel {}
}

/// 用户-角色关系
pub mod sys_user_role {
    use super::*;

    #[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
    #[sea_orm(table_name = "sys_user_role")]
    pub struct Model {
        #[sea_orm(primary_key, auto_increment = false)]
        pub user_id: i64,
        #[sea_orm(primary_key, auto_increment = false)]
        pub role_id: i64,
    }

    #[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
    pub enum Relation {
        #[sea_orm(
            belongs_to = "super::sys_role::Entity",
            from = "Column::RoleId",
            to = "super::sys_role::Column::RoleId"
        )]
        Role,
    }

    impl Related<super::sys_role::Entity> for Entity {
        fn to() -> RelationDef {
            Relation::Role.def()
        }
    }

    impl ActiveModelBehavior for ActiveModel {}
}

/// 角色-菜单关系
pub mod sys_role_menu {
    use super::*;

    #[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
    #[sea_orm(table_name = "sys_role_menu")]
    pub struct Model {
        #[sea_orm(primary_key, auto_increment = false)]
        pub role_id: i64,
        #[sea_orm(primary_key, auto_increment = false)]
        pub menu_id: i64,
    }

    #[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
    pub enum Relation {}

    impl ActiveModelBehavior for ActiveModel {}
}
