#![allow(dead_code)]

use sea_orm::{ConnectionTrait, Database, DatabaseConnection, DbErr, Statement};
use std::sync::Arc;
use std::time::Duration;
use warden_identity::{hash_password, BackendAdapter, BackendOptions};

pub const PASSWORD: &str = "secret123";

/// 空的 SQLite 内存数据库
pub async fn empty_db() -> DatabaseConnection {
    Database::connect("sqlite::memory:").await.unwrap()
}

/// 按主库结构建表并写入测试数据
pub async fn primary_db(password_hash: &str) -> DatabaseConnection {
    let db = empty_db().await;
    run(&db, PRIMARY_SCHEMA).await.unwrap();

    let users = [
        (1, "root", "0", "0"),
        (7, "alice", "0", "0"),
        (8, "bob", "0", "0"),
        (9, "carol", "0", "2"),
        (10, "dave", "1", "0"),
    ];
    for (id, name, status, del_flag) in users {
        exec(
            &db,
            format!(
                "INSERT INTO sys_user (user_id, user_name, email, password, status, del_flag) \
                 VALUES ({id}, '{name}', '{name}@example.com', '{password_hash}', '{status}', '{del_flag}')"
            ),
        )
        .await
        .unwrap();
    }

    for (id, name, key) in ROLES {
        exec(&db, format!(
            "INSERT INTO sys_role (role_id, role_name, role_key, status, del_flag) VALUES ({id}, '{name}', '{key}', '0', '0')"
        ))
        .await
        .unwrap();
    }
    for (id, name, perms) in MENUS {
        exec(&db, format!("INSERT INTO sys_menu (menu_id, menu_name, perms) VALUES ({id}, '{name}', {})", sql_opt(perms)))
            .await
            .unwrap();
    }
    for (user_id, role_id) in USER_ROLES {
        exec(&db, format!("INSERT INTO sys_user_role (user_id, role_id) VALUES ({user_id}, {role_id})"))
            .await
            .unwrap();
    }
    for (role_id, menu_id) in ROLE_MENUS {
        exec(&db, format!("INSERT INTO sys_role_menu (role_id, menu_id) VALUES ({role_id}, {menu_id})"))
            .await
            .unwrap();
    }

    db
}

/// 按旧库结构建表并写入同样的数据
pub async fn legacy_db(password_hash: &str) -> DatabaseConnection {
    let db = empty_db().await;
    run(&db, LEGACY_SCHEMA).await.unwrap();

    let users = [
        (1, "root", "1", None),
        (7, "alice", "1", None),
        (8, "bob", "1", None),
        (9, "carol", "1", Some("2024-01-01 00:00:00")),
        (10, "dave", "0", None),
    ];
    for (id, name, status, deleted_at) in users {
        exec(
            &db,
            format!(
                "INSERT INTO user (user_id, user_name, email, password, status, deleted_at) \
                 VALUES ({id}, '{name}', '{name}@example.com', '{password_hash}', '{status}', {})",
                sql_opt(deleted_at)
            ),
        )
        .await
        .unwrap();
    }

    for (id, name, key) in ROLES {
        exec(&db, format!(
            "INSERT INTO role (role_id, role_name, role_key, status) VALUES ({id}, '{name}', '{key}', '1')"
        ))
        .await
        .unwrap();
    }
    for (id, name, perms) in MENUS {
        exec(&db, format!("INSERT INTO sys_menu (menu_id, menu_name, perms) VALUES ({id}, '{name}', {})", sql_opt(perms)))
            .await
            .unwrap();
    }
    for (user_id, role_id) in USER_ROLES {
        exec(&db, format!("INSERT INTO user_role (user_id, role_id) VALUES ({user_id}, {role_id})"))
            .await
            .unwrap();
    }
    for (role_id, menu_id) in ROLE_MENUS {
        exec(&db, format!("INSERT INTO role_menu (role_id, menu_id) VALUES ({role_id}, {menu_id})"))
            .await
            .unwrap();
    }

    db
}

/// 主库模式（两个库都有数据）
pub async fn primary_adapter(password_hash: &str) -> Arc<BackendAdapter> {
    let primary = primary_db(password_hash).await;
    let legacy = legacy_db(password_hash).await;
    Arc::new(BackendAdapter::new(Some(primary), legacy, options()))
}

/// 旧库模式（未配置主库）
pub async fn legacy_adapter(password_hash: &str) -> Arc<BackendAdapter> {
    let legacy = legacy_db(password_hash).await;
    Arc::new(BackendAdapter::new(None, legacy, options()))
}

pub fn options() -> BackendOptions {
    BackendOptions {
        query_timeout: Duration::from_secs(2),
        ..Default::default()
    }
}

pub fn password_hash() -> String {
    hash_password(PASSWORD).unwrap()
}

pub async fn exec(db: &DatabaseConnection, sql: String) -> Result<(), DbErr> {
    db.execute(Statement::from_string(db.get_database_backend(), sql)).await?;
    Ok(())
}

async fn run(db: &DatabaseConnection, script: &[&str]) -> Result<(), DbErr> {
    for sql in script {
        exec(db, sql.to_string()).await?;
    }
    Ok(())
}

fn sql_opt(value: Option<&str>) -> String {
    match value {
        Some(v) => format!("'{v}'"),
        None => "NULL".to_string(),
    }
}

const ROLES: [(i64, &str, &str); 3] = [(1, "Administrator", "admin"), (2, "Viewer", "viewer"), (3, "Editor", "editor")];

const MENUS: [(i64, &str, Option<&str>); 4] = [
    (10, "users", Some("R|user")),
    (11, "user-edit", Some("C|user, U|user")),
    (12, "online", Some("R|online,D|online")),
    (13, "directory", None),
];

const USER_ROLES: [(i64, i64); 6] = [(1, 1), (7, 2), (8, 2), (8, 3), (9, 2), (10, 2)];

const ROLE_MENUS: [(i64, i64); 5] = [(1, 12), (2, 10), (2, 13), (3, 10), (3, 11)];

pub const PRIMARY_SCHEMA: &[&str] = &[
    "CREATE TABLE sys_user (
        user_id INTEGER PRIMARY KEY,
        user_name TEXT NOT NULL,
        nick_name TEXT,
        email TEXT,
        password TEXT NOT NULL,
        status TEXT,
        del_flag TEXT
    )",
    "CREATE TABLE sys_role (
        role_id INTEGER PRIMARY KEY,
        role_name TEXT NOT NULL,
        role_key TEXT NOT NULL,
        status TEXT,
        del_flag TEXT
    )",
    "CREATE TABLE sys_menu (
        menu_id INTEGER PRIMARY KEY,
        menu_name TEXT NOT NULL,
        parent_id INTEGER,
        perms TEXT
    )",
    "CREATE TABLE sys_user_role (
        user_id INTEGER NOT NULL,
        role_id INTEGER NOT NULL,
        PRIMARY KEY (user_id, role_id)
    )",
    "CREATE TABLE sys_role_menu (
        role_id INTEGER NOT NULL,
        menu_id INTEGER NOT NULL,
        PRIMARY KEY (role_id, menu_id)
    )",
];

pub const LEGACY_SCHEMA: &[&str] = &[
    "CREATE TABLE user (
        user_id INTEGER PRIMARY KEY,
        user_name TEXT NOT NULL,
        password TEXT NOT NULL,
        email TEXT,
        department TEXT,
        status TEXT,
        deleted_at TEXT
    )",
    "CREATE TABLE role (
        role_id INTEGER PRIMARY KEY,
        role_name TEXT NOT NULL,
        role_key TEXT NOT NULL,
        status TEXT
    )",
    "CREATE TABLE sys_menu (
        menu_id INTEGER PRIMARY KEY,
        menu_name TEXT NOT NULL,
        perms TEXT
    )",
    "CREATE TABLE user_role (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        user_id INTEGER NOT NULL,
        role_id INTEGER NOT NULL
    )",
    "CREATE TABLE role_menu (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        role_id INTEGER NOT NULL,
        menu_id INTEGER NOT NULL
    )",
];
