//! 文档摘要：格式、楼层、派生墙体、屋顶几何与校验结果

use plan_core::math::{polygon_centroid, polygon_signed_area, Point2};
use plan_core::model::{Block, BuildingPlan, Floor, PlanBody, Roof, Room, Wall};
use plan_core::normalize::SchemaFormat;
use plan_core::roof::{solve_gable_roof, ElevationView, RoofGeometry};
use plan_core::validate::validate;
use plan_core::walls::LevelContext;
use serde::Serialize;
use std::fmt;

#[derive(Debug, Serialize)]
pub struct LevelSummary {
    pub key: String,
    pub name: String,
    pub rooms: usize,
    pub walls: usize,
}

/// 房间标注：面积与标注位置
#[derive(Debug, Serialize)]
pub struct RoomSummary {
    pub id: String,
    pub name: Option<String>,
    pub area_m2: f64,
    pub label_at: Point2,
}

/// 某一立面中屋顶的可见高度
#[derive(Debug, Serialize)]
pub struct ElevationRise {
    pub view: ElevationView,
    /// 看向坡面时为坡面高差，看向山墙时为山墙三角形高度
    pub rise_mm: f64,
    pub slope: bool,
    /// 山墙立面中屋脊相对立面中线的偏移
    #[serde(skip_serializing_if = "Option::is_none")]
    pub apex_offset_mm: Option<f64>,
}

#[derive(Debug, Serialize)]
pub struct RoofSummary {
    /// `roof` 或 `blocks[i].roof`
    pub location: String,
    /// 墙顶标高
    pub wall_top_mm: f64,
    pub geometry: RoofGeometry,
    pub elevations: Vec<ElevationRise>,
}

#[derive(Debug, Serialize)]
pub struct PlanReport {
    pub format: String,
    pub name: Option<String>,
    pub levels: Vec<LevelSummary>,
    pub selected_level: Option<String>,
    pub rooms: Vec<RoomSummary>,
    pub walls: Vec<Wall>,
    pub roofs: Vec<RoofSummary>,
    pub errors: Vec<String>,
}

impl PlanReport {
    /// 汇总一份已派生墙体的文档；`level` 为缓存键，缺省取第一层
    pub fn build(format: SchemaFormat, plan: &BuildingPlan, level: Option<&str>) -> Self {
        let levels: Vec<LevelSummary> = plan
            .levels()
            .into_iter()
            .map(|l| LevelSummary {
                rooms: plan
                    .find_floor(l.block_id.as_deref(), &l.level_id)
                    .map_or(0, |f| f.rooms.len()),
                walls: plan.walls_for_level(&l.key).len(),
                key: l.key,
                name: l.name,
            })
            .collect();

        let selected_level = match level {
            Some(key) => Some(key.to_string()),
            None => levels.first().map(|l| l.key.clone()),
        };
        let walls = selected_level
            .as_deref()
            .map(|key| plan.walls_for_level(key).to_vec())
            .unwrap_or_default();
        let rooms = selected_level
            .as_deref()
            .and_then(|key| plan.levels().into_iter().find(|l| l.key == key))
            .and_then(|l| plan.find_floor(l.block_id.as_deref(), &l.level_id))
            .map(|floor| floor.rooms.iter().map(room_summary).collect())
            .unwrap_or_default();

        Self {
            format: format.to_string(),
            name: plan.name.clone(),
            levels,
            selected_level,
            rooms,
            walls,
            roofs: roof_summaries(plan),
            errors: validate(plan),
        }
    }

    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }
}

fn room_summary(room: &Room) -> RoomSummary {
    RoomSummary {
        id: room.id.clone(),
        name: room.name.clone(),
        area_m2: polygon_signed_area(&room.polygon).abs() / 1_000_000.0,
        label_at: polygon_centroid(&room.polygon),
    }
}

fn roof_summaries(plan: &BuildingPlan) -> Vec<RoofSummary> {
    let mut roofs = Vec::new();

    if let PlanBody::Blocks(blocks) = &plan.body {
        for (i, block) in blocks.iter().enumerate() {
            if let Some(roof) = &block.roof {
                let top = wall_top_mm(plan, Some(block), &block.floors);
                roofs.extend(summarize(
                    format!("blocks[{i}].roof"),
                    roof,
                    block.footprint.width,
                    block.footprint.depth,
                    top,
                ));
            }
        }
    }

    if let Some(roof) = &plan.roof {
        let (width, depth, top) = match &plan.body {
            PlanBody::Floors(floors) => {
                let (w, d) = floors
                    .iter()
                    .filter_map(|f| f.footprint.as_ref())
                    .fold((0.0_f64, 0.0_f64), |(w, d), fp| {
                        (w.max(fp.width), d.max(fp.depth))
                    });
                (w, d, wall_top_mm(plan, None, floors))
            }
            PlanBody::Blocks(blocks) => {
                let (w, d) = blocks
                    .iter()
                    .fold((0.0_f64, 0.0_f64), |(w, d), b| {
                        (w.max(b.footprint.width), d.max(b.footprint.depth))
                    });
                let top = blocks
                    .iter()
                    .map(|b| wall_top_mm(plan, Some(b), &b.floors))
                    .fold(0.0, f64::max);
                (w, d, top)
            }
        };
        roofs.extend(summarize("roof".to_string(), roof, width, depth, top));
    }

    roofs
}

fn summarize(
    location: String,
    roof: &Roof,
    width: f64,
    depth: f64,
    top: f64,
) -> Option<RoofSummary> {
    let geometry = solve_gable_roof(roof, width, depth)?;
    let gable = geometry.gable_end();
    let elevations = ElevationView::ALL
        .iter()
        .map(|&view| {
            if geometry.is_viewing_slope(view) {
                ElevationRise {
                    view,
                    rise_mm: geometry.visible_rise_mm(view),
                    slope: true,
                    apex_offset_mm: None,
                }
            } else {
                ElevationRise {
                    view,
                    rise_mm: gable.rise_mm,
                    slope: false,
                    apex_offset_mm: Some(gable.apex_offset_mm),
                }
            }
        })
        .collect();

    Some(RoofSummary {
        location,
        wall_top_mm: top,
        geometry,
        elevations,
    })
}

/// 最高一层的墙顶标高
fn wall_top_mm(plan: &BuildingPlan, block: Option<&Block>, floors: &[Floor]) -> f64 {
    floors
        .iter()
        .map(|f| f.elevation_mm + LevelContext::for_floor(plan, block, f).height_mm)
        .fold(0.0, f64::max)
}

impl fmt::Display for PlanReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Format: {}", self.format)?;
        if let Some(name) = &self.name {
            writeln!(f, "Name: {name}")?;
        }

        writeln!(f, "Levels ({}):", self.levels.len())?;
        for level in &self.levels {
            writeln!(
                f,
                "  {:<16} {:<20} rooms={} walls={}",
                level.key, level.name, level.rooms, level.walls
            )?;
        }

        if let Some(key) = &self.selected_level {
            writeln!(f, "Rooms on {key} ({}):", self.rooms.len())?;
            for room in &self.rooms {
                writeln!(
                    f,
                    "  {:<16} {:>7.2} m2 at ({:.0}, {:.0})",
                    room.id, room.area_m2, room.label_at.x, room.label_at.y
                )?;
            }
            writeln!(f, "Walls on {key} ({}):", self.walls.len())?;
            for wall in &self.walls {
                writeln!(
                    f,
                    "  {} {:?} -> {:?} {:.0} mm {} [{} | {}] {}",
                    wall.id,
                    (wall.a.x, wall.a.y),
                    (wall.b.x, wall.b.y),
                    wall.thickness_mm,
                    wall.wall_type.as_str(),
                    wall.room_ids[0],
                    wall.room_ids[1],
                    wall.material_id
                )?;
            }
        }

        for roof in &self.roofs {
            let g = &roof.geometry;
            writeln!(
                f,
                "Roof {}: ridge {:.0} mm above wall top {:.0} mm, overhang {:.0} mm",
                roof.location, g.ridge_height_mm, roof.wall_top_mm, g.overhang_mm
            )?;
            for (i, side) in g.sides.iter().enumerate() {
                writeln!(
                    f,
                    "  {:?}: run {:.0} mm, rise {:.0} mm, pitch {:.1}°, eave at {:.0} mm",
                    side.side,
                    side.distance_mm,
                    side.rise_mm,
                    side.pitch_rad.to_degrees(),
                    g.eave_elevation_mm(i, roof.wall_top_mm).unwrap_or(f64::NAN)
                )?;
            }
            for e in &roof.elevations {
                match e.apex_offset_mm {
                    Some(offset) => writeln!(
                        f,
                        "  view {:?}: gable rise {:.0} mm, apex offset {:.0} mm",
                        e.view, e.rise_mm, offset
                    )?,
                    None => writeln!(f, "  view {:?}: slope rise {:.0} mm", e.view, e.rise_mm)?,
                }
            }
        }

        if self.errors.is_empty() {
            writeln!(f, "Validation: OK")
        } else {
            writeln!(f, "Validation: {} error(s)", self.errors.len())?;
            for error in &self.errors {
                writeln!(f, "  - {error}")?;
            }
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use plan_core::normalize::{detect_format, normalize};
    use plan_core::walls::regenerate_all;
    use serde_json::json;

    fn report(raw: serde_json::Value, level: Option<&str>) -> PlanReport {
        let mut plan = normalize(&raw);
        regenerate_all(&mut plan);
        PlanReport::build(detect_format(&raw), &plan, level)
    }

    #[test]
    fn test_floors_report() {
        let r = report(
            json!({
                "units": "mm",
                "floors": [
                    { "id": "f1", "footprint": { "width": 10000, "depth": 8000 }, "height_mm": 2700,
                      "rooms": [
                        { "id": "a", "polygon": [[0, 0], [5000, 0], [5000, 8000], [0, 8000]] },
                        { "id": "b", "polygon": [[5000, 0], [10000, 0], [10000, 8000], [5000, 8000]] }
                      ] },
                    { "id": "f2", "elevation_mm": 2900, "height_mm": 2500, "footprint": { "width": 10000, "depth": 8000 } }
                ],
                "roof": { "type": "gable", "pitch_degrees": 35 }
            }),
            None,
        );

        assert_eq!(r.format, "v0.3");
        assert_eq!(r.selected_level.as_deref(), Some("f1"));
        assert_eq!(r.walls.len(), 1);
        assert_eq!(r.levels[0].rooms, 2);
        assert!(r.is_valid(), "{:?}", r.errors);

        assert_eq!(r.rooms.len(), 2);
        assert!((r.rooms[0].area_m2 - 40.0).abs() < 1e-9);
        let label = r.rooms[1].label_at;
        assert!((label.x - 7500.0).abs() < 1e-6 && (label.y - 4000.0).abs() < 1e-6);

        let roof = &r.roofs[0];
        assert_eq!(roof.location, "roof");
        assert!((roof.wall_top_mm - 5400.0).abs() < 1e-9);
        let north = &roof.elevations[0];
        assert!(north.slope);
        assert!((north.rise_mm - roof.geometry.sides[1].rise_mm).abs() < 1e-9);
        assert!(!roof.elevations[2].slope);

        let text = r.to_string();
        assert!(text.contains("Format: v0.3"));
        assert!(text.contains("Rooms on f1 (2):"));
        assert!(text.contains("Validation: OK"));
    }

    #[test]
    fn test_block_roofs_and_errors() {
        let r = report(
            json!({
                "blocks": [
                    { "id": "main", "footprint": { "width": 12000, "depth": 8000 }, "floors": [{ "id": "f1" }],
                      "roof": { "type": "gable", "pitch_degrees": 35 } },
                    { "id": "wing", "footprint": { "width": 6000, "depth": 5000 }, "floors": [{ "id": "f1" }],
                      "roof": { "type": "flat" } }
                ]
            }),
            Some("wing:f1"),
        );

        assert_eq!(r.format, "v0.4");
        assert_eq!(r.selected_level.as_deref(), Some("wing:f1"));
        assert_eq!(r.roofs.len(), 1);
        assert_eq!(r.roofs[0].location, "blocks[0].roof");
        assert!(!r.is_valid());
        assert!(r.errors.iter().any(|e| e == "units: units missing"));
        assert!(r.errors.iter().any(|e| e.starts_with("blocks[1].roof")));
    }

    #[test]
    fn test_gable_views_follow_offset_ridge() {
        let r = report(
            json!({
                "units": "mm",
                "floors": [{ "id": "f1", "footprint": { "width": 10000, "depth": 8000 } }],
                "roof": {
                    "type": "gable", "pitch_degrees": 30, "overhang_mm": 500,
                    "ridge_direction": "x", "ridge_offset_mm": 1000
                }
            }),
            None,
        );

        let roof = &r.roofs[0];
        let gable = roof.geometry.gable_end();
        let east = roof
            .elevations
            .iter()
            .find(|e| e.view == ElevationView::East)
            .unwrap();
        assert!(!east.slope);
        assert!((east.rise_mm - gable.rise_mm).abs() < 1e-9);
        assert!((east.rise_mm - 3175.4).abs() < 0.1);
        assert_eq!(east.apex_offset_mm, Some(1000.0));
        assert!(r.to_string().contains("apex offset 1000 mm"));
    }
}
