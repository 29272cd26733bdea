//! 示例文档目录
//!
//! 每个示例键对应 `samples/` 目录下的一个文件，覆盖全部历史格式。

use crate::error::FileError;
use crate::native::load_path;
use plan_core::model::BuildingPlan;
use std::path::{Path, PathBuf};

/// 默认示例
pub const DEFAULT_SAMPLE: &str = "v0.3";

const SAMPLES: &[(&str, &str)] = &[
    ("v0", "plan.v0.single.json"),
    ("v0.3", "plan.v0.3.two_floors_roof.json"),
    ("v0.3-asym-pitch", "plan.v0.3.asymmetric_roof.json"),
    ("v0.3-asym-eave", "plan.v0.3.asymmetric_equal_eave.json"),
    ("v0.4-L", "plan.v0.4.L-house.json"),
    ("v0.4-T", "plan.v0.4.T-house.json"),
    ("v0.4-H", "plan.v0.4.H-house.json"),
    ("v0.5", "plan.v0.5.rooms_first_sloped.json"),
    ("v1", "plan.v1.two_floors_rooms_walls_stairs.json"),
];

/// 示例目录
#[derive(Debug, Clone)]
pub struct SampleCatalog {
    dir: PathBuf,
}

impl SampleCatalog {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// 所有示例键
    pub fn keys() -> impl Iterator<Item = &'static str> {
        SAMPLES.iter().map(|(key, _)| *key)
    }

    pub fn file_name(key: &str) -> Option<&'static str> {
        SAMPLES.iter().find(|(k, _)| *k == key).map(|(_, file)| *file)
    }

    /// 示例文件路径；未知键回退到默认示例
    pub fn path(&self, key: &str) -> PathBuf {
        let file = Self::file_name(key).unwrap_or_else(|| {
            tracing::warn!("Unknown sample \"{}\", falling back to {}", key, DEFAULT_SAMPLE);
            Self::default_file()
        });
        self.dir.join(file)
    }

    fn default_file() -> &'static str {
        SAMPLES
            .iter()
            .find(|(k, _)| *k == DEFAULT_SAMPLE)
            .map_or(SAMPLES[0].1, |(_, file)| *file)
    }

    /// 加载并归一化示例；`None` 使用默认示例
    pub fn load(&self, key: Option<&str>) -> Result<BuildingPlan, FileError> {
        let key = key.unwrap_or(DEFAULT_SAMPLE);
        let path = self.path(key);
        if !path.is_file() {
            return Err(FileError::NotFound(format!("{key} ({})", path.display())));
        }
        tracing::debug!("Loading sample {}", key);
        load_path(&path)
    }
}
