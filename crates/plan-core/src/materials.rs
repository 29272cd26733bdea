//! 默认材质库与墙体规则
//!
//! 新建文档和旧格式迁移时使用。

use crate::model::{Material, MaterialAssignment, WallRule, WallRules};

/// 默认材质 id
pub const DEFAULT_FLOOR_MATERIAL: &str = "default_floor";
pub const DEFAULT_WALL_MATERIAL: &str = "default_wall";
pub const DEFAULT_CEILING_MATERIAL: &str = "default_ceiling";
pub const DEFAULT_ROOF_MATERIAL: &str = "default_roof";

/// 室内隔墙默认厚度
pub const INTERIOR_WALL_THICKNESS_MM: f64 = 98.0;

/// 户间墙默认厚度
pub const BETWEEN_UNITS_WALL_THICKNESS_MM: f64 = 200.0;

/// 默认材质库：每个类别一条
pub fn default_material_library() -> Vec<Material> {
    vec![
        Material::new(DEFAULT_FLOOR_MATERIAL, "Standard floor", "floor", "#d4a574"),
        Material::new(DEFAULT_WALL_MATERIAL, "Standard wall", "wall", "#c4b8a8"),
        Material::new(
            DEFAULT_CEILING_MATERIAL,
            "Standard ceiling (interior)",
            "ceiling",
            "#e8e8e8",
        ),
        Material::new(DEFAULT_ROOF_MATERIAL, "Standard roof (exterior)", "roof", "#8b4513"),
    ]
}

impl Default for MaterialAssignment {
    fn default() -> Self {
        Self {
            floor: DEFAULT_FLOOR_MATERIAL.to_string(),
            wall: DEFAULT_WALL_MATERIAL.to_string(),
            ceiling: DEFAULT_CEILING_MATERIAL.to_string(),
            roof: DEFAULT_ROOF_MATERIAL.to_string(),
        }
    }
}

impl Default for WallRules {
    fn default() -> Self {
        Self {
            interior: WallRule {
                thickness_mm: INTERIOR_WALL_THICKNESS_MM,
            },
            between_units: WallRule {
                thickness_mm: BETWEEN_UNITS_WALL_THICKNESS_MM,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_library_covers_assignment() {
        let library = default_material_library();
        let assignment = MaterialAssignment::default();
        for id in [
            &assignment.floor,
            &assignment.wall,
            &assignment.ceiling,
            &assignment.roof,
        ] {
            assert!(library.iter().any(|m| &m.id == id), "missing {id}");
        }
    }
}
