use serde::{Deserialize, Serialize};
use std::fmt;

/// 身份库运行模式
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BackendMode {
    /// 主库（Postgres，sys_* 表）
    Primary,
    /// 旧库（MySQL，user/role/user_role/role_menu 表）
    Legacy,
}

impl BackendMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            BackendMode::Primary => "primary",
            BackendMode::Legacy => "legacy",
        }
    }

    /// 另一个库
    pub fn other(self) -> Self {
        match self {
            BackendMode::Primary => BackendMode::Legacy,
            BackendMode::Legacy => BackendMode::Primary,
        }
    }
}

impl fmt::Display for BackendMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// 账号状态
///
/// 两个库用不同的取值表示启用：主库为 '0'，旧库为 '1'。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AccountStatus {
    Active,
    Disabled,
}

impl AccountStatus {
    pub fn from_code(code: Option<&str>, mode: BackendMode) -> Self {
        let active = match mode {
            BackendMode::Primary => "0",
            BackendMode::Legacy => "1",
        };
        match code.map(str::trim) {
            Some(c) if c == active => AccountStatus::Active,
            _ => AccountStatus::Disabled,
        }
    }

    pub fn is_active(&self) -> bool {
        matches!(self, AccountStatus::Active)
    }
}

/// 统一后的用户行
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserRow {
    pub user_id: i64,
    pub user_name: String,
    pub nick_name: Option<String>,
    pub email: Option<String>,
    pub department: Option<String>,
    pub status: AccountStatus,
    pub password_hash: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoleRow {
    pub role_id: i64,
    pub role_name: String,
    pub role_key: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct RoleMenuRow {
    pub role_id: i64,
    pub menu_id: i64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MenuRow {
    pub menu_id: i64,
    pub menu_name: String,
    /// 以 `,` 分隔的权限串，可能为空
    pub perms: Option<String>,
}

/// 身份库状态报告
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BackendStatus {
    pub mode: BackendMode,
    pub primary_configured: bool,
    pub primary_available: bool,
    pub primary_tables_ok: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_codes_differ_per_mode() {
        assert_eq!(AccountStatus::from_code(Some("0"), BackendMode::Primary), AccountStatus::Active);
        assert_eq!(AccountStatus::from_code(Some("1"), BackendMode::Primary), AccountStatus::Disabled);
        assert_eq!(AccountStatus::from_code(Some("1"), BackendMode::Legacy), AccountStatus::Active);
        assert_eq!(AccountStatus::from_code(Some("0"), BackendMode::Legacy), AccountStatus::Disabled);
        assert_eq!(AccountStatus::from_code(None, BackendMode::Legacy), AccountStatus::Disabled);
    }

    #[test]
    fn test_mode_display() {
        assert_eq!(BackendMode::Primary.to_string(), "primary");
        assert_eq!(BackendMode::Legacy.other(), BackendMode::Primary);
        assert_eq!(serde_json::to_string(&BackendMode::Legacy).unwrap(), "\"legacy\"");
    }
}
