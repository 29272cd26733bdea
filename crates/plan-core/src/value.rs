//! 宽松的 JSON 读取工具
//!
//! 历史格式中的数值可能缺失、为字符串或类型错误。这里的读取函数
//! 永远不会失败，只返回 `Option` 或空集合，由调用方决定默认值。

use crate::math::Point2;
use serde_json::Value;

/// 读取数值：接受 JSON 数字和可解析为数字的字符串，拒绝 NaN/无穷
pub fn number(value: &Value) -> Option<f64> {
    let n = match value {
        Value::Number(n) => n.as_f64()?,
        Value::String(s) => s.trim().parse::<f64>().ok()?,
        _ => return None,
    };
    n.is_finite().then_some(n)
}

/// 读取对象字段上的数值
pub fn num_field(obj: &Value, key: &str) -> Option<f64> {
    obj.get(key).and_then(number)
}

/// 按顺序尝试多个键，返回第一个可用的数值
pub fn first_num(obj: &Value, keys: &[&str]) -> Option<f64> {
    keys.iter().find_map(|k| num_field(obj, k))
}

/// 读取整数字段（浮点数向零取整）
pub fn int_field(obj: &Value, key: &str) -> Option<i64> {
    match obj.get(key)? {
        Value::Number(n) => n.as_i64().or_else(|| n.as_f64().map(|f| f as i64)),
        other => number(other).map(|f| f as i64),
    }
}

/// 读取字符串字段；数字会被转换为字符串（历史数据中 id 可能是数字）
pub fn str_field(obj: &Value, key: &str) -> Option<String> {
    match obj.get(key)? {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

/// 读取数组字段，缺失或类型错误时返回空切片
pub fn array_field<'a>(obj: &'a Value, key: &str) -> &'a [Value] {
    match obj.get(key) {
        Some(Value::Array(items)) => items.as_slice(),
        _ => &[],
    }
}

/// 读取对象字段
pub fn obj_field<'a>(obj: &'a Value, key: &str) -> Option<&'a Value> {
    obj.get(key).filter(|v| v.is_object())
}

/// 读取一个点：支持 `[x, y]` 和 `{ "x": .., "y": .. }` 两种写法，
/// 非数值坐标按 0 处理
pub fn point(value: &Value) -> Option<Point2> {
    match value {
        Value::Array(items) if items.len() >= 2 => Some(Point2::new(
            number(&items[0]).unwrap_or(0.0),
            number(&items[1]).unwrap_or(0.0),
        )),
        Value::Object(_) => Some(Point2::new(
            num_field(value, "x").unwrap_or(0.0),
            num_field(value, "y").unwrap_or(0.0),
        )),
        _ => None,
    }
}

/// 读取点列表，跳过无法识别的条目
pub fn points(value: Option<&Value>) -> Vec<Point2> {
    match value {
        Some(Value::Array(items)) => items.iter().filter_map(point).collect(),
        _ => Vec::new(),
    }
}
