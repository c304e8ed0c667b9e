//! 身份模块
//!
//! 认证在上游网关完成；本服务只信任网关注入的身份头：
//! - `x-user-id` — 用户 ID（i64）
//! - `x-user-name` — 显示名
//! - `x-user-roles` — 逗号分隔的角色（USER / STAFF / ADMIN）
//!
//! [`require_auth`] 解析身份头并注入 [`CurrentUser`]；
//! [`require_staff`] 在此之上要求 STAFF 或 ADMIN。

pub mod middleware;

pub use middleware::{require_auth, require_staff};

use serde::{Deserialize, Serialize};

/// 网关角色名
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Role {
    User,
    Staff,
    Admin,
}

impl Role {
    /// Parse a role token from the gateway header; unknown tokens are dropped.
    pub fn parse(value: &str) -> Option<Role> {
        match value.trim().to_uppercase().as_str() {
            "USER" => Some(Role::User),
            "STAFF" => Some(Role::Staff),
            "ADMIN" => Some(Role::Admin),
            _ => None,
        }
    }
}

/// 当前用户上下文（由 require_auth 注入请求扩展）
#[derive(Debug, Clone)]
pub struct CurrentUser {
    pub id: i64,
    pub name: String,
    pub roles: Vec<Role>,
}

impl CurrentUser {
    /// STAFF 或 ADMIN
    pub fn is_privileged(&self) -> bool {
        self.roles
            .iter()
            .any(|r| matches!(r, Role::Staff | Role::Admin))
    }

    /// 本人或特权角色
    pub fn can_access_order(&self, owner_id: i64) -> bool {
        self.id == owner_id || self.is_privileged()
    }
}
