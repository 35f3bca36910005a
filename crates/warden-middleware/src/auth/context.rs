use serde::Serialize;
use std::collections::BTreeSet;

use super::{Claims, ADMIN_WILDCARD};
use crate::session::SessionPayload;

/// 白名单路由在没有有效凭证时使用的匿名身份
const ANONYMOUS_USER_ID: i64 = 1;
const ANONYMOUS_USER_NAME: &str = "test_user";
const ANONYMOUS_SESSION: &str = "test_session";

/// 认证通过后注入到请求 extensions 中的身份信息
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthContext {
    pub user_id: i64,
    pub user_name: String,
    pub session: String,
    pub roles: Vec<String>,
    pub permissions: BTreeSet<String>,
    /// 是否为白名单路由上的匿名身份
    #[serde(skip)]
    pub anonymous: bool,
}

impl AuthContext {
    /// 由凭证和会话内容组装
    pub fn from_session(claims: &Claims, payload: &SessionPayload) -> Self {
        Self {
            user_id: claims.user_id,
            user_name: claims.user_name.clone(),
            session: claims.session.clone(),
            roles: payload.roles.clone(),
            permissions: payload.permission_set(),
            anonymous: false,
        }
    }

    /// 仅由凭证组装（白名单路由上会话已不存在时）
    pub fn from_claims(claims: &Claims) -> Self {
        Self {
            user_id: claims.user_id,
            user_name: claims.user_name.clone(),
            session: claims.session.clone(),
            roles: Vec::new(),
            permissions: BTreeSet::new(),
            anonymous: false,
        }
    }

    /// 匿名身份，持有通配权限，只能用于不修改状态的公开接口
    pub fn anonymous() -> Self {
        Self {
            user_id: ANONYMOUS_USER_ID,
            user_name: ANONYMOUS_USER_NAME.to_string(),
            session: ANONYMOUS_SESSION.to_string(),
            roles: Vec::new(),
            permissions: BTreeSet::from([ADMIN_WILDCARD.to_string()]),
            anonymous: true,
        }
    }
}
