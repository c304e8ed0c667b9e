//! 审计日志类型定义

use serde::{Deserialize, Serialize};

/// 审计操作类型（枚举，非自由文本）
///
/// 按领域分组，确保每个敏感操作都有明确的类型标识。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "snake_case")]
#[sqlx(rename_all = "snake_case")]
pub enum AuditAction {
    // ═══ 订单 ═══
    /// 订单创建
    OrderCreated,
    /// 订单取消（用户或员工操作）
    OrderCancelled,
    /// 订单超时自动取消（回收任务）
    OrderAutoCancelled,
    /// 后厨开始制作
    OrderStarted,
    /// 出餐完成，等待取餐
    OrderReady,
    /// 已取餐
    OrderPickedUp,

    // ═══ 支付（财务关键）═══
    /// 创建支付意向
    PaymentIntentCreated,
    /// 支付成交
    PaymentCaptured,
    /// 退款
    PaymentRefunded,

    // ═══ 代金券 ═══
    /// 配额竞争落败，成交时发现超卖（需人工复核）
    VoucherOversold,
}

impl std::fmt::Display for AuditAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:?}", self)
    }
}

/// 审计日志条目（只追加，无更新/删除接口）
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct AuditEntry {
    pub id: i64,
    /// 操作类型
    pub action: AuditAction,
    /// 实体类型（如 "order", "voucher"）
    pub entity_type: String,
    /// 实体 ID
    pub entity_id: String,
    /// 操作人 ID（系统事件为 None）
    pub actor_id: Option<i64>,
    /// 操作人名称
    pub actor_name: Option<String>,
    /// 结构化详情（JSON）
    pub detail: serde_json::Value,
    /// 时间戳（Unix 毫秒）
    pub created_at: i64,
}
