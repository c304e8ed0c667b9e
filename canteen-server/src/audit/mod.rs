//! 审计日志模块 — 财务操作的操作留痕
//!
//! # 架构
//!
//! ```text
//! 敏感操作触发
//!   └─ AuditService::log() → mpsc → AuditWorker → SQLite (audit_log 表)
//! ```
//!
//! 写入为 fire-and-forget：失败只记日志，绝不反馈到业务请求。
//! 订单创建/取消、支付、超卖等关键事件都会留下一条带 JSON 详情的记录。

pub mod diff;
pub mod service;
pub mod storage;
pub mod types;
pub mod worker;

pub use diff::{create_diff, create_snapshot};
pub use service::{AuditLogRequest, AuditService};
pub use storage::AuditStorage;
pub use types::{AuditAction, AuditEntry};
pub use worker::AuditWorker;
