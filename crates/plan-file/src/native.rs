//! 平面文档的 JSON 读写
//!
//! 读取接受任何受支持的历史格式，读取后立即归一化；
//! 保存总是写出规范化的 `1.0` 文档（缩进格式，便于比对）。

use crate::error::FileError;
use plan_core::model::BuildingPlan;
use plan_core::normalize::{detect_format, normalize, SchemaFormat};
use serde_json::Value;
use std::fs::File;
use std::io::{BufReader, BufWriter, Write};
use std::path::Path;

/// 解析 JSON 文本；顶层必须是对象
pub fn parse_value(text: &str) -> Result<Value, FileError> {
    let value: Value = serde_json::from_str(text)?;
    ensure_object(value)
}

/// 从字符串解析并归一化
pub fn parse_str(text: &str) -> Result<BuildingPlan, FileError> {
    Ok(normalize(&parse_value(text)?))
}

/// 从字节解析并归一化
pub fn parse_slice(bytes: &[u8]) -> Result<BuildingPlan, FileError> {
    let value: Value = serde_json::from_slice(bytes)?;
    Ok(normalize(&ensure_object(value)?))
}

/// 读取原始 JSON（未归一化），用于格式识别
pub fn load_value(path: &Path) -> Result<Value, FileError> {
    let file = File::open(path)?;
    let value: Value = serde_json::from_reader(BufReader::new(file))?;
    ensure_object(value)
}

/// 从文件加载文档
pub fn load_path(path: &Path) -> Result<BuildingPlan, FileError> {
    let raw = load_value(path)?;
    let format = detect_format(&raw);
    if format == SchemaFormat::Unknown {
        tracing::warn!("Unrecognized plan format in {}, using defaults", path.display());
    }

    let plan = normalize(&raw);
    tracing::info!(
        "Loaded {} plan with {} levels from {}",
        format,
        plan.levels().len(),
        path.display()
    );
    Ok(plan)
}

/// 保存规范化文档
pub fn save_path(plan: &BuildingPlan, path: &Path) -> Result<(), FileError> {
    let file = File::create(path)?;
    let mut writer = BufWriter::new(file);
    serde_json::to_writer_pretty(&mut writer, plan)?;
    writer.write_all(b"\n")?;
    writer.flush()?;

    tracing::info!(
        "Saved {} levels, {} derived wall sets to {}",
        plan.levels().len(),
        plan.derived.walls_by_level.len(),
        path.display()
    );
    Ok(())
}

fn ensure_object(value: Value) -> Result<Value, FileError> {
    if value.is_object() {
        Ok(value)
    } else {
        Err(FileError::InvalidFormat(
            "top-level JSON value must be an object".to_string(),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use plan_core::walls::regenerate_all;

    const TWO_ROOMS: &str = r#"{
        "units": "mm",
        "floors": [{
            "id": "f1",
            "footprint": { "width": 8000, "depth": 6000 },
            "rooms": [
                { "id": "stue", "polygon": [[0, 0], [4000, 0], [4000, 6000], [0, 6000]] },
                { "id": "bad", "polygon": [[4000, 0], [8000, 0], [8000, 6000], [4000, 6000]] }
            ]
        }]
    }"#;

    #[test]
    fn test_save_load_roundtrip() {
        let dir = tempfile::tempdir().expect("Failed to create temp dir");
        let file_path = dir.path().join("plan.json");

        let mut plan = parse_str(TWO_ROOMS).expect("Failed to parse");
        regenerate_all(&mut plan);
        save_path(&plan, &file_path).expect("Failed to save");

        let loaded = load_path(&file_path).expect("Failed to load");
        assert_eq!(loaded, plan);
        assert_eq!(loaded.walls_for_level("f1").len(), 1);
    }

    #[test]
    fn test_rejects_non_object() {
        assert!(matches!(parse_str("[1, 2, 3]"), Err(FileError::InvalidFormat(_))));
        assert!(matches!(parse_str("{ not json"), Err(FileError::Json(_))));
        assert!(parse_slice(TWO_ROOMS.as_bytes()).is_ok());
    }

    #[test]
    fn test_missing_file() {
        let dir = tempfile::tempdir().expect("Failed to create temp dir");
        let result = load_path(&dir.path().join("missing.json"));
        assert!(matches!(result, Err(FileError::Io(_))));
    }
}
