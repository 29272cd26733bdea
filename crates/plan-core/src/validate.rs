//! 平面校验
//!
//! 检查结构和几何约束，收集全部违规项后一次返回，不在第一条处停止。
//! 校验只读取文档，不修改任何内容；同一输入总是得到同一顺序的结果。

use crate::model::{
    Block, BuildingPlan, Floor, Footprint, OpeningKind, PlanBody, Roof, WallSpec,
};
use crate::walls::{level_key, room_outline_key};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;

/// 轮廓尺寸上限
pub const MAX_DIMENSION_MM: f64 = 100_000.0;

pub const MIN_PITCH_DEGREES: f64 = 5.0;
pub const MAX_PITCH_DEGREES: f64 = 60.0;
pub const MAX_OVERHANG_MM: f64 = 2000.0;
pub const MIN_ROOF_THICKNESS_MM: f64 = 10.0;
pub const MAX_ROOF_THICKNESS_MM: f64 = 500.0;

/// 违规类别
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ViolationKind {
    /// 数值超出允许范围
    OutOfRange,
    /// 几何关系不成立
    GeometryViolation,
    /// 顶点数不足等退化输入
    DegenerateInput,
    /// 必需字段缺失
    MissingField,
}

/// 一条违规记录
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Violation {
    pub kind: ViolationKind,
    /// 位置路径，如 `blocks[0].floors[1].openings[2]`
    pub location: String,
    pub message: String,
}

impl fmt::Display for Violation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.location.is_empty() {
            f.write_str(&self.message)
        } else {
            write!(f, "{}: {}", self.location, self.message)
        }
    }
}

/// 校验文档，返回可读的违规消息
pub fn validate(plan: &BuildingPlan) -> Vec<String> {
    validate_detailed(plan).iter().map(ToString::to_string).collect()
}

/// 校验文档，返回结构化违规记录
pub fn validate_detailed(plan: &BuildingPlan) -> Vec<Violation> {
    let mut v = Validator::default();

    match plan.units.as_deref() {
        Some("mm") => {}
        Some(other) => v.push(
            ViolationKind::OutOfRange,
            "units",
            format!("units must be \"mm\", got \"{other}\""),
        ),
        None => v.push(ViolationKind::MissingField, "units", "units missing"),
    }

    match &plan.body {
        PlanBody::Floors(floors) => {
            for (i, floor) in floors.iter().enumerate() {
                let loc = format!("floors[{i}]");
                v.check_floor(plan, &loc, None, floor);
            }
        }
        PlanBody::Blocks(blocks) => {
            for (i, block) in blocks.iter().enumerate() {
                let loc = format!("blocks[{i}]");
                v.check_footprint(&format!("{loc}.footprint"), &block.footprint);
                for (j, floor) in block.floors.iter().enumerate() {
                    v.check_floor(plan, &format!("{loc}.floors[{j}]"), Some(block), floor);
                }
                if let Some(roof) = &block.roof {
                    v.check_roof(
                        &format!("{loc}.roof"),
                        roof,
                        block.footprint.width,
                        block.footprint.depth,
                    );
                }
            }
        }
    }

    if let Some(roof) = &plan.roof {
        // 顶层屋顶按最大的楼层轮廓检查
        let (width, depth) = plan
            .floors()
            .unwrap_or(&[])
            .iter()
            .filter_map(|f| f.footprint.as_ref())
            .chain(plan.blocks().unwrap_or(&[]).iter().map(|b| &b.footprint))
            .fold((0.0_f64, 0.0_f64), |(w, d), fp| (w.max(fp.width), d.max(fp.depth)));
        v.check_roof("roof", roof, width, depth);
    }

    v.violations
}

#[derive(Default)]
struct Validator {
    violations: Vec<Violation>,
}

impl Validator {
    fn push(
        &mut self,
        kind: ViolationKind,
        location: impl Into<String>,
        message: impl Into<String>,
    ) {
        self.violations.push(Violation {
            kind,
            location: location.into(),
            message: message.into(),
        });
    }

    fn check_footprint(&mut self, loc: &str, footprint: &Footprint) {
        for (name, value) in [("width", footprint.width), ("depth", footprint.depth)] {
            if !(1.0..=MAX_DIMENSION_MM).contains(&value) {
                self.push(
                    ViolationKind::OutOfRange,
                    loc,
                    format!("{name} must be 1-{MAX_DIMENSION_MM} mm, got {value}"),
                );
            }
        }
    }

    fn check_wall(&mut self, loc: &str, wall: &WallSpec, footprint: Option<&Footprint>) {
        if wall.thickness_mm <= 0.0 {
            self.push(ViolationKind::OutOfRange, loc, "thickness must be > 0");
        }
        if wall.height_mm <= 0.0 {
            self.push(ViolationKind::OutOfRange, loc, "height must be > 0");
        }
        if let Some(fp) = footprint {
            let min_side = fp.width.min(fp.depth);
            if wall.thickness_mm > 0.0 && min_side > 0.0 && wall.thickness_mm * 2.0 >= min_side {
                self.push(
                    ViolationKind::GeometryViolation,
                    loc,
                    format!(
                        "thickness*2 must be < min(width, depth): {} * 2 >= {}",
                        wall.thickness_mm, min_side
                    ),
                );
            }
        }
    }

    fn check_floor(
        &mut self,
        plan: &BuildingPlan,
        loc: &str,
        block: Option<&Block>,
        floor: &Floor,
    ) {
        let footprint = match (&floor.footprint, block) {
            (Some(fp), _) => {
                self.check_footprint(&format!("{loc}.footprint"), fp);
                Some(fp)
            }
            (None, Some(block)) => Some(&block.footprint),
            (None, None) => {
                self.push(
                    ViolationKind::MissingField,
                    format!("{loc}.footprint"),
                    "footprint missing",
                );
                None
            }
        };

        let wall = floor
            .wall
            .or_else(|| block.and_then(|b| b.wall))
            .unwrap_or(plan.defaults.wall);
        self.check_wall(&format!("{loc}.wall"), &wall, footprint);

        for (i, opening) in floor.openings.iter().enumerate() {
            let oloc = format!("{loc}.openings[{i}]");
            let start = opening.start_mm();

            let wall_length = if let Some(side) = opening.wall {
                footprint.map(|fp| fp.side_length(side))
            } else if let Some(wall_id) = &opening.wall_id {
                match floor.find_wall_path(wall_id) {
                    Some(path) => Some(path.length_mm()),
                    None => {
                        self.push(
                            ViolationKind::MissingField,
                            &oloc,
                            format!("wall path \"{wall_id}\" not found"),
                        );
                        None
                    }
                }
            } else {
                Some(0.0)
            };

            if opening.width <= 0.0 {
                self.push(ViolationKind::OutOfRange, &oloc, "width must be > 0");
            }
            if let Some(length) = wall_length {
                if start + opening.width > length {
                    self.push(
                        ViolationKind::GeometryViolation,
                        &oloc,
                        format!(
                            "offset + width exceeds wall length: {} + {} > {}",
                            start, opening.width, length
                        ),
                    );
                }
            }
            if opening.kind == OpeningKind::Window && !opening.sill.is_some_and(|s| s >= 0.0) {
                self.push(ViolationKind::OutOfRange, &oloc, "window sill must be >= 0");
            }
        }

        let mut seen_ids = HashSet::new();
        let mut seen_outlines: Vec<(Vec<(i64, i64)>, &str)> = Vec::new();
        for (i, room) in floor.rooms.iter().enumerate() {
            let rloc = format!("{loc}.rooms[{i}]");
            if room.polygon.len() < 3 {
                self.push(
                    ViolationKind::DegenerateInput,
                    &rloc,
                    format!("room \"{}\" polygon needs at least 3 points", room.id),
                );
            }
            if !seen_ids.insert(room.id.as_str()) {
                self.push(
                    ViolationKind::GeometryViolation,
                    &rloc,
                    format!("duplicate room id \"{}\"", room.id),
                );
            }
            if let Some(outline) = room_outline_key(room) {
                if let Some((_, other)) = seen_outlines.iter().find(|(o, _)| *o == outline) {
                    self.push(
                        ViolationKind::GeometryViolation,
                        &rloc,
                        format!("room \"{}\" has the same outline as room \"{}\"", room.id, other),
                    );
                } else {
                    seen_outlines.push((outline, room.id.as_str()));
                }
            }
        }

        for (i, path) in floor.walls.iter().enumerate() {
            if path.path.len() < 2 {
                self.push(
                    ViolationKind::DegenerateInput,
                    format!("{loc}.walls[{i}]"),
                    format!("wall \"{}\" path needs at least 2 points", path.id),
                );
            }
        }

        tracing::trace!(
            "Checked level {}",
            level_key(block.map(|b| b.id.as_str()), &floor.id)
        );
    }

    fn check_roof(&mut self, loc: &str, roof: &Roof, width: f64, depth: f64) {
        if !roof.is_gable() {
            self.push(
                ViolationKind::OutOfRange,
                loc,
                format!("type must be \"gable\", got \"{}\"", roof.kind),
            );
        }

        match roof.pitch_degrees {
            Some(p) if (MIN_PITCH_DEGREES..=MAX_PITCH_DEGREES).contains(&p) => {}
            Some(p) => self.push(
                ViolationKind::OutOfRange,
                loc,
                format!("pitch_degrees must be {MIN_PITCH_DEGREES}-{MAX_PITCH_DEGREES}, got {p}"),
            ),
            None => self.push(
                ViolationKind::MissingField,
                loc,
                format!("pitch_degrees missing (must be {MIN_PITCH_DEGREES}-{MAX_PITCH_DEGREES})"),
            ),
        }

        if let Some(overhang) = roof.overhang_mm {
            if !(0.0..=MAX_OVERHANG_MM).contains(&overhang) {
                self.push(
                    ViolationKind::OutOfRange,
                    loc,
                    format!("overhang_mm must be 0-{MAX_OVERHANG_MM}, got {overhang}"),
                );
            }
        }
        if let Some(thickness) = roof.thickness_mm {
            if !(MIN_ROOF_THICKNESS_MM..=MAX_ROOF_THICKNESS_MM).contains(&thickness) {
                self.push(
                    ViolationKind::OutOfRange,
                    loc,
                    format!(
                        "thickness_mm must be {MIN_ROOF_THICKNESS_MM}-{MAX_ROOF_THICKNESS_MM}, got {thickness}"
                    ),
                );
            }
        }

        if roof.is_gable() {
            let span = match roof.ridge_direction {
                crate::model::RidgeDirection::X => depth,
                crate::model::RidgeDirection::Y => width,
            };
            let half = span / 2.0;
            if half > 0.0 {
                let overhang = roof.overhang_mm.unwrap_or(crate::roof::DEFAULT_OVERHANG_MM);
                let max_offset = half - overhang;
                if roof.ridge_offset_mm.abs() >= max_offset {
                    self.push(
                        ViolationKind::GeometryViolation,
                        loc,
                        format!(
                            "ridge_offset_mm ({}) must be < {} mm",
                            roof.ridge_offset_mm,
                            max_offset.floor()
                        ),
                    );
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::math::Point2;
    use crate::model::{Opening, Room, WallPath, WallSide};

    fn single_floor(width: f64, depth: f64) -> BuildingPlan {
        let mut floor = Floor::new("f1", 0);
        floor.footprint = Some(Footprint::new(width, depth));
        let mut plan = BuildingPlan::empty();
        plan.body = PlanBody::Floors(vec![floor]);
        plan
    }

    fn floor_mut(plan: &mut BuildingPlan) -> &mut Floor {
        plan.find_floor_mut(None, "f1").unwrap()
    }

    fn door(wall: WallSide, offset: f64, width: f64) -> Opening {
        Opening {
            id: "d1".to_string(),
            kind: OpeningKind::Door,
            wall: Some(wall),
            wall_id: None,
            at_mm: None,
            offset,
            width,
            height: 2100.0,
            sill: None,
            swing: None,
        }
    }

    #[test]
    fn test_valid_plan_has_no_violations() {
        let mut plan = single_floor(8000.0, 6000.0);
        plan.roof = Some(Roof::gable(35.0));
        floor_mut(&mut plan).openings.push(door(WallSide::Left, 1000.0, 900.0));
        assert!(validate(&plan).is_empty(), "{:?}", validate(&plan));
    }

    #[test]
    fn test_zero_width_reported() {
        let plan = single_floor(0.0, 6000.0);
        let errors = validate(&plan);
        assert_eq!(errors.len(), 1);
        assert!(errors[0].starts_with("floors[0].footprint: width"));
    }

    #[test]
    fn test_thick_wall_reported() {
        let mut plan = single_floor(8000.0, 6000.0);
        floor_mut(&mut plan).wall = Some(WallSpec {
            thickness_mm: 3500.0,
            height_mm: 2700.0,
        });
        let violations = validate_detailed(&plan);
        assert_eq!(violations.len(), 1);
        assert_eq!(violations[0].kind, ViolationKind::GeometryViolation);
        assert_eq!(violations[0].location, "floors[0].wall");
        assert!(violations[0].message.contains("thickness*2"));
    }

    #[test]
    fn test_units_checked() {
        let mut plan = single_floor(8000.0, 6000.0);
        plan.units = None;
        assert_eq!(validate(&plan), vec!["units: units missing".to_string()]);
        plan.units = Some("cm".to_string());
        assert_eq!(validate_detailed(&plan)[0].kind, ViolationKind::OutOfRange);
    }

    #[test]
    fn test_openings() {
        let mut plan = single_floor(8000.0, 6000.0);
        let floor = floor_mut(&mut plan);
        floor.openings.push(door(WallSide::Left, 5500.0, 900.0));
        let mut window = door(WallSide::Front, 0.0, 1200.0);
        window.kind = OpeningKind::Window;
        floor.openings.push(window);
        floor.walls.push(WallPath {
            id: "w1".to_string(),
            path: vec![Point2::new(0.0, 0.0), Point2::new(2000.0, 0.0)],
            thickness_mm: None,
            height_mm: None,
        });
        let mut on_path = door(WallSide::Front, 0.0, 900.0);
        on_path.wall = None;
        on_path.wall_id = Some("w1".to_string());
        on_path.at_mm = Some(1500.0);
        floor.openings.push(on_path);

        let errors = validate(&plan);
        assert_eq!(errors.len(), 3, "{errors:?}");
        assert!(errors[0].starts_with("floors[0].openings[0]: offset + width"));
        assert!(errors[1].contains("sill"));
        assert!(errors[2].starts_with("floors[0].openings[2]"));
    }

    #[test]
    fn test_missing_footprint_still_checks_rooms() {
        let mut plan = single_floor(8000.0, 6000.0);
        let floor = floor_mut(&mut plan);
        floor.footprint = None;
        floor.rooms.push(Room::new("r1", vec![Point2::new(0.0, 0.0)]));
        let violations = validate_detailed(&plan);
        assert_eq!(violations.len(), 2);
        assert_eq!(violations[0].kind, ViolationKind::MissingField);
        assert_eq!(violations[1].kind, ViolationKind::DegenerateInput);
    }

    #[test]
    fn test_duplicate_rooms() {
        let mut plan = single_floor(8000.0, 6000.0);
        let floor = floor_mut(&mut plan);
        floor.rooms.push(Room::rect("a", 0.0, 0.0, 3000.0, 3000.0));
        floor.rooms.push(Room::rect("a", 3000.0, 0.0, 3000.0, 3000.0));
        floor.rooms.push(Room::rect("b", 0.0, 0.0, 3000.0, 3000.0));
        let errors = validate(&plan);
        assert_eq!(errors.len(), 2, "{errors:?}");
        assert!(errors[0].contains("duplicate room id"));
        assert!(errors[1].contains("same outline"));
    }

    #[test]
    fn test_roof_ranges() {
        let mut plan = single_floor(10000.0, 8000.0);
        let mut roof = Roof::gable(70.0);
        roof.overhang_mm = Some(2500.0);
        roof.thickness_mm = Some(5.0);
        plan.roof = Some(roof);
        let violations = validate_detailed(&plan);
        assert_eq!(violations.len(), 3, "{violations:?}");
        assert!(violations.iter().all(|v| v.location == "roof"));

        let mut roof = Roof::gable(35.0);
        roof.ridge_offset_mm = 3500.0;
        plan.roof = Some(roof);
        let errors = validate(&plan);
        assert_eq!(errors, vec!["roof: ridge_offset_mm (3500) must be < 3500 mm".to_string()]);

        plan.roof = Some(Roof {
            pitch_degrees: None,
            ..Roof::gable(35.0)
        });
        assert_eq!(validate_detailed(&plan)[0].kind, ViolationKind::MissingField);
    }

    #[test]
    fn test_block_roof_uses_block_footprint() {
        let mut block_roof = Roof::gable(30.0);
        block_roof.ridge_direction = crate::model::RidgeDirection::Y;
        block_roof.ridge_offset_mm = 1200.0;
        let block = Block {
            id: "A".to_string(),
            name: None,
            position: Default::default(),
            footprint: Footprint::new(3000.0, 9000.0),
            wall: None,
            materials: Default::default(),
            floors: vec![Floor::new("f1", 0)],
            roof: Some(block_roof),
        };
        let mut plan = BuildingPlan::empty();
        plan.body = PlanBody::Blocks(vec![block]);
        let errors = validate(&plan);
        assert_eq!(
            errors,
            vec!["blocks[0].roof: ridge_offset_mm (1200) must be < 1000 mm".to_string()]
        );
    }

    #[test]
    fn test_deterministic() {
        let mut plan = single_floor(0.0, -1.0);
        plan.roof = Some(Roof::gable(1.0));
        assert_eq!(validate(&plan), validate(&plan));
    }
}
