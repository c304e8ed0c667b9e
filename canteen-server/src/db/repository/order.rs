//! Order Repository
//!
//! 订单从不删除，取消是状态迁移。状态类写操作全部走条件 UPDATE，
//! 由 rows_affected 判定竞争结果。

use super::{RepoError, RepoResult};
use shared::models::{KdsTicket, Order, OrderLine, OrderStatus, OrderSummary, PaymentStatus};
use sqlx::SqlitePool;

const SELECT_ORDER: &str = "SELECT id, user_id, subtotal, discount, total, status, payment_status, payment_method, payment_ref, voucher_code, eta_minutes, note, created_at, paid_at FROM orders";

const SELECT_LINE: &str =
    "SELECT id, order_id, item_id, name, unit_price, quantity, note FROM order_line";

const SELECT_SUMMARY: &str = "SELECT id, subtotal, discount, total, status, payment_status, payment_method, created_at FROM orders";

const SELECT_TICKET: &str =
    "SELECT id, status, payment_status, total, created_at FROM orders";

pub async fn insert(tx: &mut sqlx::Transaction<'_, sqlx::Sqlite>, order: &Order) -> RepoResult<()> {
    sqlx::query(
        "INSERT INTO orders (id, user_id, subtotal, discount, total, status, payment_status, payment_method, payment_ref, voucher_code, eta_minutes, note, created_at, paid_at) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14)",
    )
    .bind(order.id)
    .bind(order.user_id)
    .bind(order.subtotal)
    .bind(order.discount)
    .bind(order.total)
    .bind(order.status)
    .bind(order.payment_status)
    .bind(&order.payment_method)
    .bind(&order.payment_ref)
    .bind(&order.voucher_code)
    .bind(order.eta_minutes)
    .bind(&order.note)
    .bind(order.created_at)
    .bind(order.paid_at)
    .execute(&mut **tx)
    .await?;
    Ok(())
}

pub async fn insert_lines(
    tx: &mut sqlx::Transaction<'_, sqlx::Sqlite>,
    lines: &[OrderLine],
) -> RepoResult<()> {
    for line in lines {
        sqlx::query(
            "INSERT INTO order_line (id, order_id, item_id, name, unit_price, quantity, note) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
        )
        .bind(line.id)
        .bind(line.order_id)
        .bind(line.item_id)
        .bind(&line.name)
        .bind(line.unit_price)
        .bind(line.quantity)
        .bind(&line.note)
        .execute(&mut **tx)
        .await?;
    }
    Ok(())
}

pub async fn find_by_id(pool: &SqlitePool, id: i64) -> RepoResult<Option<Order>> {
    let order = sqlx::query_as::<_, Order>(&format!("{SELECT_ORDER} WHERE id = ?"))
        .bind(id)
        .fetch_optional(pool)
        .await?;
    Ok(order)
}

/// Same as [`find_by_id`] but inside the caller's transaction.
pub async fn find_by_id_tx(
    tx: &mut sqlx::Transaction<'_, sqlx::Sqlite>,
    id: i64,
) -> RepoResult<Option<Order>> {
    let order = sqlx::query_as::<_, Order>(&format!("{SELECT_ORDER} WHERE id = ?"))
        .bind(id)
        .fetch_optional(&mut **tx)
        .await?;
    Ok(order)
}

pub async fn find_lines(pool: &SqlitePool, order_id: i64) -> RepoResult<Vec<OrderLine>> {
    let lines = sqlx::query_as::<_, OrderLine>(&format!(
        "{SELECT_LINE} WHERE order_id = ? ORDER BY id"
    ))
    .bind(order_id)
    .fetch_all(pool)
    .await?;
    Ok(lines)
}

pub async fn find_by_user(
    pool: &SqlitePool,
    user_id: i64,
    limit: i64,
    offset: i64,
) -> RepoResult<Vec<OrderSummary>> {
    let orders = sqlx::query_as::<_, OrderSummary>(&format!(
        "{SELECT_SUMMARY} WHERE user_id = ? ORDER BY created_at DESC LIMIT ? OFFSET ?"
    ))
    .bind(user_id)
    .bind(limit)
    .bind(offset)
    .fetch_all(pool)
    .await?;
    Ok(orders)
}

/// Kitchen queue, oldest first. Without a filter only live tickets
/// (PENDING / IN_PROGRESS / READY) are returned.
pub async fn find_kitchen_queue(
    pool: &SqlitePool,
    status: Option<OrderStatus>,
) -> RepoResult<Vec<KdsTicket>> {
    let tickets = match status {
        Some(status) => {
            sqlx::query_as::<_, KdsTicket>(&format!(
                "{SELECT_TICKET} WHERE status = ? ORDER BY created_at ASC"
            ))
            .bind(status)
            .fetch_all(pool)
            .await?
        }
        None => {
            sqlx::query_as::<_, KdsTicket>(&format!(
                "{SELECT_TICKET} WHERE status IN ('PENDING', 'IN_PROGRESS', 'READY') ORDER BY created_at ASC"
            ))
            .fetch_all(pool)
            .await?
        }
    };
    Ok(tickets)
}

/// Conditional status transition; false when the order was not in `from`.
pub async fn transition_status(
    tx: &mut sqlx::Transaction<'_, sqlx::Sqlite>,
    id: i64,
    from: OrderStatus,
    to: OrderStatus,
) -> RepoResult<bool> {
    let rows = sqlx::query("UPDATE orders SET status = ?1 WHERE id = ?2 AND status = ?3")
        .bind(to)
        .bind(id)
        .bind(from)
        .execute(&mut **tx)
        .await?;
    Ok(rows.rows_affected() > 0)
}

pub async fn set_payment_method(
    tx: &mut sqlx::Transaction<'_, sqlx::Sqlite>,
    id: i64,
    method: &str,
) -> RepoResult<()> {
    let rows = sqlx::query("UPDATE orders SET payment_method = ?1 WHERE id = ?2")
        .bind(method)
        .bind(id)
        .execute(&mut **tx)
        .await?;
    if rows.rows_affected() == 0 {
        return Err(RepoError::NotFound(format!("Order {id} not found")));
    }
    Ok(())
}

/// Atomic UNPAID→PAID flip. Exactly one of two racing captures sees `true`;
/// everything gated on it (capture row, voucher commit, points) stays
/// exactly-once. A CANCELLED order never flips — a capture racing the
/// reclaimer sweep loses here.
pub async fn flip_paid(
    tx: &mut sqlx::Transaction<'_, sqlx::Sqlite>,
    id: i64,
    payment_ref: Option<&str>,
    paid_at: i64,
) -> RepoResult<bool> {
    let rows = sqlx::query(
        "UPDATE orders SET payment_status = ?1, payment_ref = COALESCE(?2, payment_ref), paid_at = ?3 WHERE id = ?4 AND payment_status = ?5 AND status != ?6",
    )
    .bind(PaymentStatus::Paid)
    .bind(payment_ref)
    .bind(paid_at)
    .bind(id)
    .bind(PaymentStatus::Unpaid)
    .bind(OrderStatus::Cancelled)
    .execute(&mut **tx)
    .await?;
    Ok(rows.rows_affected() > 0)
}

/// Flip to REFUNDED; false when the order was already REFUNDED.
pub async fn mark_refunded(
    tx: &mut sqlx::Transaction<'_, sqlx::Sqlite>,
    id: i64,
) -> RepoResult<bool> {
    let rows = sqlx::query(
        "UPDATE orders SET payment_status = ?1 WHERE id = ?2 AND payment_status != ?1",
    )
    .bind(PaymentStatus::Refunded)
    .bind(id)
    .execute(&mut **tx)
    .await?;
    Ok(rows.rows_affected() > 0)
}

/// Orders the reclaimer should cancel: PENDING, UNPAID and created at or
/// before the cutoff.
pub async fn find_reclaimable(
    tx: &mut sqlx::Transaction<'_, sqlx::Sqlite>,
    cutoff: i64,
) -> RepoResult<Vec<Order>> {
    let orders = sqlx::query_as::<_, Order>(&format!(
        "{SELECT_ORDER} WHERE status = ?1 AND payment_status = ?2 AND created_at <= ?3"
    ))
    .bind(OrderStatus::Pending)
    .bind(PaymentStatus::Unpaid)
    .bind(cutoff)
    .fetch_all(&mut **tx)
    .await?;
    Ok(orders)
}
