//! Payment Domain
//!
//! 支付状态机：UNPAID →(capture)→ PAID →(refund)→ REFUNDED。
//! intent 不改变支付状态，只产出签名的展示载荷和一条 INTENT 流水；
//! capture 的条件翻转是整条链路 exactly-once 的根（流水、券核销、
//! 积分都挂在它后面）。没有真实 PSP——这里就是收款台本身。

pub mod gateway;
