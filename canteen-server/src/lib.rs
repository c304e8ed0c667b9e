//! Canteen Server - 食堂订餐后台
//!
//! # 架构概述
//!
//! 核心是订单-支付-代金券-积分工作流：下单（可选代金券预留）、
//! 取消、支付 intent/capture/refund、券核销、积分累积，以及自动
//! 取消超时未支付订单的后台回收任务。
//!
//! # 模块结构
//!
//! ```text
//! canteen-server/src/
//! ├── core/          # 配置、状态、服务器、后台任务
//! ├── auth/          # 网关身份头解析、权限中间件
//! ├── api/           # HTTP 路由和处理器
//! ├── orders/        # 订单生命周期 + 回收任务
//! ├── vouchers/      # 代金券两阶段兑换
//! ├── payments/      # 支付网关
//! ├── points/        # 积分累积
//! ├── audit/         # 审计日志管线
//! ├── notify/        # 站内通知写入口
//! ├── db/            # SQLite 连接池 + 仓储
//! └── utils/         # 日志、校验等工具
//! ```

pub mod api;
pub mod audit;
pub mod auth;
pub mod core;
pub mod db;
pub mod notify;
pub mod orders;
pub mod payments;
pub mod points;
pub mod utils;
pub mod vouchers;

// Re-export 公共类型
pub use auth::CurrentUser;
pub use core::{Config, Server, ServerState};
pub use utils::{ApiResponse, AppError, AppResult, ErrorCategory, ErrorCode};

// Re-export logger functions
pub use utils::logger::{init_logger, init_logger_with_file};

// Audit logging macro - 转发给 AuditService（mpsc 异步落库）
#[macro_export]
macro_rules! audit_log {
    ($service:expr, $action:expr, $entity_type:expr, $entity_id:expr,
     actor_id = $actor_id:expr, actor_name = $actor_name:expr,
     details = $details:expr) => {
        $service
            .log($action, $entity_type, $entity_id, $actor_id, $actor_name, $details)
            .await
    };
}

// Security logging macro - 支持 tracing 格式说明符
#[macro_export]
macro_rules! security_log {
    ($level:expr, $event:expr, $($key:ident = $value:expr),* $(,)?) => {
        tracing::info!(
            target: "security",
            level = $level,
            event = $event,
            timestamp = chrono::Local::now().to_rfc3339(),
            $($key = $value),*
        );
    };
}

/// 设置运行环境：dotenv、工作目录、日志
pub fn setup_environment() -> std::io::Result<()> {
    dotenv::dotenv().ok();

    let work_dir = std::env::var("WORK_DIR").unwrap_or_else(|_| "/var/lib/canteen".into());
    let log_dir = format!("{work_dir}/logs");
    std::fs::create_dir_all(&log_dir)?;

    let level = std::env::var("LOG_LEVEL").ok();
    utils::logger::init_logger_with_file(level.as_deref(), Some(&log_dir));
    Ok(())
}

pub fn print_banner() {
    println!(
        r#"
   ______            __
  / ____/___ _____  / /____  ___  ____
 / /   / __ `/ __ \/ __/ _ \/ _ \/ __ \
/ /___/ /_/ / / / / /_/  __/  __/ / / /
\____/\__,_/_/ /_/\__/\___/\___/_/ /_/
    "#
    );
}
