//! 认证中间件
//!
//! 从网关身份头还原 [`CurrentUser`] 并注入请求扩展。
//! 头缺失或格式错误一律 401；角色不满足 403。

use axum::{
    extract::Request,
    http::HeaderMap,
    middleware::Next,
    response::Response,
};

use super::{CurrentUser, Role};
use crate::security_log;
use crate::utils::AppError;

const HEADER_USER_ID: &str = "x-user-id";
const HEADER_USER_NAME: &str = "x-user-name";
const HEADER_USER_ROLES: &str = "x-user-roles";

/// 认证中间件 - 要求网关身份头
///
/// # 跳过认证的路径
///
/// - `OPTIONS *` (CORS 预检)
/// - 非 `/api/` 路径（如 `/health`）
pub async fn require_auth(mut req: Request, next: Next) -> Result<Response, AppError> {
    // 允许 CORS 预检的 OPTIONS 请求 (跳过认证)
    if req.method() == http::Method::OPTIONS {
        return Ok(next.run(req).await);
    }

    // 非 API 路由跳过认证 (让它们正常返回 404)
    if !req.uri().path().starts_with("/api/") {
        return Ok(next.run(req).await);
    }

    let Some(user) = extract_user(req.headers()) else {
        security_log!("WARN", "auth_missing", uri = format!("{:?}", req.uri()));
        return Err(AppError::not_authenticated());
    };

    req.extensions_mut().insert(user);
    Ok(next.run(req).await)
}

/// 员工中间件 - 要求 STAFF 或 ADMIN 角色（KDS、退款入口）
pub async fn require_staff(req: Request, next: Next) -> Result<Response, AppError> {
    let user = req
        .extensions()
        .get::<CurrentUser>()
        .ok_or_else(AppError::not_authenticated)?;

    if !user.is_privileged() {
        security_log!(
            "WARN",
            "staff_required",
            user_id = user.id,
            user_name = user.name.clone()
        );
        return Err(AppError::new(shared::ErrorCode::RoleRequired));
    }

    Ok(next.run(req).await)
}

/// 解析网关身份头；id 缺失或非法返回 None
fn extract_user(headers: &HeaderMap) -> Option<CurrentUser> {
    let id = headers
        .get(HEADER_USER_ID)?
        .to_str()
        .ok()?
        .trim()
        .parse::<i64>()
        .ok()?;

    let name = headers
        .get(HEADER_USER_NAME)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default()
        .to_string();

    let roles: Vec<Role> = headers
        .get(HEADER_USER_ROLES)
        .and_then(|v| v.to_str().ok())
        .map(|v| v.split(',').filter_map(Role::parse).collect())
        .unwrap_or_default();

    Some(CurrentUser { id, name, roles })
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    fn headers(id: &str, roles: &str) -> HeaderMap {
        let mut map = HeaderMap::new();
        map.insert(HEADER_USER_ID, HeaderValue::from_str(id).unwrap());
        map.insert(HEADER_USER_NAME, HeaderValue::from_static("tester"));
        map.insert(HEADER_USER_ROLES, HeaderValue::from_str(roles).unwrap());
        map
    }

    #[test]
    fn test_extract_user_parses_headers() {
        let user = extract_user(&headers("42", "USER,STAFF")).unwrap();
        assert_eq!(user.id, 42);
        assert_eq!(user.name, "tester");
        assert_eq!(user.roles, vec![Role::User, Role::Staff]);
    }

    #[test]
    fn test_extract_user_requires_numeric_id() {
        assert!(extract_user(&headers("abc", "USER")).is_none());
        assert!(extract_user(&HeaderMap::new()).is_none());
    }

    #[test]
    fn test_extract_user_drops_unknown_roles() {
        let user = extract_user(&headers("1", "user, superhero ,ADMIN")).unwrap();
        assert_eq!(user.roles, vec![Role::User, Role::Admin]);
    }
}
