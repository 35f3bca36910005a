use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

use crate::auth::{AuthError, ADMIN_WILDCARD};

/// 会话内容，登录和权限刷新时整体写入，不做局部修改
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionPayload {
    pub login_time: DateTime<Utc>,
    pub user_info: UserProfile,
    /// 角色 key 列表
    pub roles: Vec<String>,
    pub permissions: Vec<String>,
}

/// 用户资料（不含密码）
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserProfile {
    pub user_id: i64,
    pub user_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub nick_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub department: Option<String>,
    pub active: bool,
    #[serde(default)]
    pub roles: Vec<RoleInfo>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoleInfo {
    pub role_id: i64,
    pub role_name: String,
    pub role_key: String,
}

impl SessionPayload {
    pub fn new(user_info: UserProfile, roles: Vec<String>, permissions: BTreeSet<String>) -> Self {
        Self {
            login_time: Utc::now(),
            user_info,
            roles,
            permissions: permissions.into_iter().collect(),
        }
    }

    pub fn permission_set(&self) -> BTreeSet<String> {
        self.permissions.iter().cloned().collect()
    }

    pub fn is_admin(&self) -> bool {
        self.permissions.iter().any(|p| p == ADMIN_WILDCARD)
    }
}

/// 根据身份库重新构建会话内容
///
/// 返回 `Ok(None)` 表示用户已不存在。
#[async_trait]
pub trait PayloadBuilder: Send + Sync {
    async fn build(&self, user_id: i64) -> Result<Option<SessionPayload>, AuthError>;
}


#[cfg(test)]
mod tests {
    use super::fixtures::payload;
    use super::*;

    #[test]
    fn test_payload_json_shape() {
        let session = payload(7, &["viewer"], &["R|user", "C|user"]);
        let json = serde_json::to_value(&session).unwrap();

        assert!(json.get("loginTime").is_some());
        assert_eq!(json["userInfo"]["userId"], 7);
        assert_eq!(json["roles"][0], "viewer");
        assert_eq!(json["permissions"].as_array().unwrap().len(), 2);

        let back: SessionPayload = serde_json::from_value(json).unwrap();
        assert_eq!(back, session);
    }

    #[test]
    fn test_admin_detection() {
        assert!(payload(1, &["admin"], &[ADMIN_WILDCARD]).is_admin());
        assert!(!payload(2, &["viewer"], &["R|user"]).is_admin());
    }
}
