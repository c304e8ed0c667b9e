//! HTTP API 模块
//!
//! 每个资源一个子模块，`router()` 负责挂载 `/api/<resource>` 前缀；
//! 员工路由在子模块内通过 [`crate::auth::require_staff`] 保护。

pub mod health;
pub mod kds;
pub mod orders;
pub mod payments;
pub mod points;
pub mod vouchers;
