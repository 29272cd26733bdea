//! 房屋平面几何引擎
//!
//! 把声明式、带版本的建筑平面文档转换为具体的几何事实：
//! 派生墙体、屋顶坡面参数和校验结果。所有渲染器和校验器都只消费这些结果。
//!
//! # 数据流
//!
//! ```text
//! 原始 JSON → normalize → BuildingPlan ─┬→ walls（派生墙体）
//!                                        ├→ roof（屋顶求解）
//!                                        └→ validate（校验）
//! ```
//!
//! 所有计算都是纯函数，单位统一为毫米。
//!
//! # 示例
//!
//! ```rust
//! use plan_core::prelude::*;
//! use serde_json::json;
//!
//! let raw = json!({
//!     "units": "mm",
//!     "floors": [{
//!         "id": "f1",
//!         "footprint": { "width": 8000, "depth": 6000 },
//!         "rooms": [
//!             { "id": "stue", "polygon": [[0, 0], [4000, 0], [4000, 6000], [0, 6000]] },
//!             { "id": "bad", "polygon": [[4000, 0], [8000, 0], [8000, 6000], [4000, 6000]] }
//!         ]
//!     }],
//!     "roof": { "type": "gable", "pitch_degrees": 35 }
//! });
//!
//! let mut plan = normalize(&raw);
//! regenerate_all(&mut plan);
//! assert_eq!(plan.walls_for_level("f1").len(), 1);
//!
//! let roof = solve_gable_roof(plan.roof.as_ref().unwrap(), 8000.0, 6000.0).unwrap();
//! println!("Ridge height: {:.0} mm", roof.ridge_height_mm);
//!
//! assert!(validate(&plan).is_empty());
//! ```

pub mod materials;
pub mod math;
pub mod model;
pub mod normalize;
pub mod roof;
pub mod session;
pub mod validate;
pub mod value;
pub mod walls;

pub mod prelude {
    //! 常用类型的便捷导入
    pub use crate::math::{BoundingBox2, Point2};
    pub use crate::model::{
        Block, BodyKind, BuildingPlan, Floor, Footprint, LevelRef, Opening, OpeningKind,
        PlanBody, PlanDefaults, RidgeDirection, RidgeMode, Roof, Room, Wall, WallSide,
        WallSpec, WallType,
    };
    pub use crate::normalize::{detect_format, normalize, SchemaFormat};
    pub use crate::roof::{solve_gable_roof, ElevationView, RoofGeometry, RoofSide, RoofSideName};
    pub use crate::session::{EditError, PlanSession};
    pub use crate::validate::{validate, validate_detailed, Violation, ViolationKind};
    pub use crate::walls::{derive_walls, level_key, regenerate_all, regenerate_level, LevelContext};
}
