//! 审计详情 JSON 辅助
//!
//! 快照：实体序列化为 JSON 整体落库。
//! diff：比较更新前后的顶层字段，只记录发生变化的字段。

use serde::Serialize;
use serde_json::{Value, json};

/// 实体快照（创建类事件的 detail）
pub fn create_snapshot<T: Serialize>(entity: &T, label: &str) -> Value {
    let value = serde_json::to_value(entity).unwrap_or(Value::Null);
    json!({ label: value })
}

/// 顶层字段 diff（更新类事件的 detail）
///
/// 两边都序列化为 JSON 对象后逐字段比较；非对象输入退化为快照对。
pub fn create_diff<T: Serialize>(old: &T, new: &T, label: &str) -> Value {
    let old_value = serde_json::to_value(old).unwrap_or(Value::Null);
    let new_value = serde_json::to_value(new).unwrap_or(Value::Null);

    match (&old_value, &new_value) {
        (Value::Object(old_map), Value::Object(new_map)) => {
            let mut changes = serde_json::Map::new();
            for (key, new_field) in new_map {
                let old_field = old_map.get(key).unwrap_or(&Value::Null);
                if old_field != new_field {
                    changes.insert(
                        key.clone(),
                        json!({ "from": old_field, "to": new_field }),
                    );
                }
            }
            json!({ label: Value::Object(changes) })
        }
        _ => json!({ label: { "from": old_value, "to": new_value } }),
    }
}
