//! 从生成器回复文本中提取平面 JSON
//!
//! 回复可能是纯 JSON，也可能把 JSON 包在 Markdown 代码块里
//! （```` ```json ... ``` ````）。只取第一个代码块，语言标记不区分大小写。

use crate::error::FileError;
use crate::native::parse_value;
use plan_core::model::BuildingPlan;
use plan_core::normalize::normalize;
use plan_core::validate::validate;
use serde_json::Value;

const FENCE: &str = "```";
const LANG: &str = "json";

/// 去掉代码块围栏，返回其中的 JSON 文本
pub fn strip_code_fence(text: &str) -> &str {
    let text = text.trim();
    let Some(start) = text.find(FENCE) else {
        return text;
    };
    let body = &text[start + FENCE.len()..];
    let body = match body.get(..LANG.len()) {
        Some(tag) if tag.eq_ignore_ascii_case(LANG) => &body[LANG.len()..],
        _ => body,
    };
    match body.find(FENCE) {
        Some(end) => body[..end].trim(),
        None => text,
    }
}

/// 提取原始 JSON 值
pub fn extract_value(text: &str) -> Result<Value, FileError> {
    parse_value(strip_code_fence(text))
}

/// 提取并归一化平面文档
pub fn extract_json(text: &str) -> Result<BuildingPlan, FileError> {
    let value = extract_value(text)?;
    Ok(normalize(&value))
}

/// 提取、归一化并校验；第二项为违规列表，空表示通过
pub fn extract_and_validate(text: &str) -> Result<(BuildingPlan, Vec<String>), FileError> {
    let plan = extract_json(text)?;
    let errors = validate(&plan);
    if !errors.is_empty() {
        tracing::debug!("Extracted plan has {} validation error(s)", errors.len());
    }
    Ok((plan, errors))
}
