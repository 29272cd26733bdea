//! 房屋平面文件读写
//!
//! 负责 JSON 文档的加载与保存、从生成器回复中提取文档，以及示例目录。
//! 所有读取路径都会先归一化，调用方拿到的总是规范化的 [`BuildingPlan`]。
//!
//! [`BuildingPlan`]: plan_core::model::BuildingPlan

pub mod error;
pub mod extract;
pub mod native;
pub mod samples;

pub use error::FileError;
pub use extract::{extract_and_validate, extract_json};
pub use native::{load_path, parse_str, save_path};
pub use samples::{SampleCatalog, DEFAULT_SAMPLE};
