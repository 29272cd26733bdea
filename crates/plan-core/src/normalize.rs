//! 格式归一化
//!
//! 把五种历史文档形状统一转换为 [`BuildingPlan`]：
//!
//! | 格式 | 识别方式 |
//! |------|----------|
//! | v1 | `version` 以 `"1"` 开头 |
//! | v0.5 | `version` 以 `"0.5"` 开头，房间优先的 `buildings[]` / `levels[]` |
//! | v0.4 | 非空 `blocks[]` |
//! | v0.3 / v0.2 | `floors[]`，有无顶层 `roof` |
//! | v0 | 单个 `footprint` 对象 |
//!
//! 归一化是全函数：缺失或类型错误的字段取默认值，绝不失败。
//! 输出总是 `version = "1.0"`，并且对自身的序列化结果幂等。

use crate::materials::default_material_library;
use crate::math::BoundingBox2;
use crate::model::*;
use crate::value::{
    array_field, first_num, int_field, num_field, obj_field, points, str_field,
};
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt;

/// 识别出的输入格式
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SchemaFormat {
    V1,
    V05,
    V04Blocks,
    V03FloorsRoof,
    V02Floors,
    V0Footprint,
    /// 无法识别，按空文档处理
    Unknown,
}

impl SchemaFormat {
    pub fn as_str(&self) -> &'static str {
        match self {
            SchemaFormat::V1 => "v1",
            SchemaFormat::V05 => "v0.5",
            SchemaFormat::V04Blocks => "v0.4",
            SchemaFormat::V03FloorsRoof => "v0.3",
            SchemaFormat::V02Floors => "v0.2",
            SchemaFormat::V0Footprint => "v0",
            SchemaFormat::Unknown => "unknown",
        }
    }
}

impl fmt::Display for SchemaFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// 识别文档格式（按顺序，先匹配者胜）
pub fn detect_format(raw: &Value) -> SchemaFormat {
    if !raw.is_object() {
        return SchemaFormat::Unknown;
    }

    let version = str_field(raw, "version").unwrap_or_default();
    if version.starts_with('1') {
        return SchemaFormat::V1;
    }
    if version.starts_with("0.5") {
        return SchemaFormat::V05;
    }
    if !array_field(raw, "blocks").is_empty() {
        return SchemaFormat::V04Blocks;
    }
    if raw.get("floors").is_some_and(Value::is_array) {
        return if raw.get("roof").is_some_and(|r| !r.is_null()) {
            SchemaFormat::V03FloorsRoof
        } else {
            SchemaFormat::V02Floors
        };
    }
    if obj_field(raw, "footprint").is_some() {
        return SchemaFormat::V0Footprint;
    }
    SchemaFormat::Unknown
}

/// 归一化任意受支持的文档
pub fn normalize(raw: &Value) -> BuildingPlan {
    let format = detect_format(raw);
    let defaults = read_defaults(raw);

    let body = match format {
        SchemaFormat::V1 => {
            let blocks = raw.get("blocks").and_then(Value::as_array);
            let has_floors = raw.get("floors").is_some_and(Value::is_array);
            match blocks {
                Some(items) if !items.is_empty() || !has_floors => {
                    PlanBody::Blocks(read_blocks(items, &defaults))
                }
                _ => PlanBody::Floors(read_floors(array_field(raw, "floors"), &defaults)),
            }
        }
        SchemaFormat::V05 => PlanBody::Floors(read_rooms_first(raw, &defaults)),
        SchemaFormat::V04Blocks => {
            PlanBody::Blocks(read_blocks(array_field(raw, "blocks"), &defaults))
        }
        SchemaFormat::V03FloorsRoof | SchemaFormat::V02Floors => {
            PlanBody::Floors(read_floors(array_field(raw, "floors"), &defaults))
        }
        SchemaFormat::V0Footprint => PlanBody::Floors(vec![read_single_footprint(raw, &defaults)]),
        SchemaFormat::Unknown => PlanBody::Floors(Vec::new()),
    };

    let mut material_library: Vec<Material> = array_field(raw, "materialLibrary")
        .iter()
        .filter_map(read_material)
        .collect();
    if material_library.is_empty() {
        material_library = default_material_library();
    }

    tracing::debug!("Normalized {} document", format);

    BuildingPlan {
        version: CANONICAL_VERSION.to_string(),
        units: str_field(raw, "units"),
        name: str_field(raw, "name"),
        defaults,
        material_library,
        body,
        roof: raw.get("roof").and_then(read_roof),
        derived: read_derived(raw),
    }
}

fn read_defaults(raw: &Value) -> PlanDefaults {
    let mut defaults = PlanDefaults::default();
    let Some(obj) = obj_field(raw, "defaults") else {
        return defaults;
    };

    if let Some(wall) = obj_field(obj, "wall") {
        defaults.wall = read_wall_spec(wall, WallSpec::default());
    }
    if let Some(materials) = obj_field(obj, "materials") {
        let m = &mut defaults.materials;
        for (key, slot) in [
            ("floor", &mut m.floor),
            ("wall", &mut m.wall),
            ("ceiling", &mut m.ceiling),
            ("roof", &mut m.roof),
        ] {
            if let Some(id) = str_field(materials, key) {
                *slot = id;
            }
        }
    }
    if let Some(rules) = obj_field(obj, "wallRules") {
        let r = &mut defaults.wall_rules;
        for (key, rule) in [("interior", &mut r.interior), ("betweenUnits", &mut r.between_units)] {
            let thickness = rules
                .get(key)
                .and_then(|v| first_num(v, &["thicknessMm", "thickness_mm"]));
            if let Some(t) = thickness {
                rule.thickness_mm = t;
            }
        }
    }
    defaults
}

/// 墙体规格：兼容 `{thickness, height}` 与 `{thickness_mm, height_mm}`
fn read_wall_spec(value: &Value, fallback: WallSpec) -> WallSpec {
    WallSpec {
        thickness_mm: first_num(value, &["thickness_mm", "thickness"])
            .unwrap_or(fallback.thickness_mm),
        height_mm: first_num(value, &["height_mm", "height"]).unwrap_or(fallback.height_mm),
    }
}

fn read_footprint(value: &Value) -> Footprint {
    let polygon = points(value.get("polygon"));
    let bbox = BoundingBox2::from_points(polygon.iter().copied());
    Footprint {
        width: first_num(value, &["width", "width_mm"]).unwrap_or_else(|| bbox.width()),
        depth: first_num(value, &["depth", "depth_mm"]).unwrap_or_else(|| bbox.height()),
        polygon: (!polygon.is_empty()).then_some(polygon),
    }
}

fn read_surface_materials(value: Option<&Value>) -> SurfaceMaterials {
    let Some(m) = value.filter(|v| v.is_object()) else {
        return SurfaceMaterials::default();
    };
    SurfaceMaterials {
        floor: str_field(m, "floor"),
        wall: str_field(m, "wall"),
        ceiling: str_field(m, "ceiling"),
    }
}

fn read_material(value: &Value) -> Option<Material> {
    let id = str_field(value, "id")?;
    Some(Material {
        name: str_field(value, "name").unwrap_or_else(|| id.clone()),
        category: str_field(value, "category").unwrap_or_default(),
        color: str_field(value, "color").unwrap_or_else(|| "#cccccc".to_string()),
        id,
    })
}

fn read_opening(value: &Value, index: usize) -> Opening {
    let kind = match str_field(value, "type").as_deref() {
        Some("window") => OpeningKind::Window,
        _ => OpeningKind::Door,
    };

    // `wall` 可能是外墙方位，也可能是墙体路径 id
    let wall_ref = str_field(value, "wall");
    let wall = wall_ref.as_deref().and_then(WallSide::parse);
    let wall_id = str_field(value, "wall_id")
        .or_else(|| str_field(value, "wallId"))
        .or_else(|| wall_ref.filter(|w| wall.is_none() && !w.is_empty()));

    Opening {
        id: str_field(value, "id").unwrap_or_else(|| format!("o{index}")),
        kind,
        wall,
        wall_id,
        at_mm: first_num(value, &["at_mm", "atMm"]),
        offset: first_num(value, &["offset", "offset_mm"]).unwrap_or(0.0),
        width: first_num(value, &["width", "width_mm"]).unwrap_or(900.0),
        height: first_num(value, &["height", "height_mm"]).unwrap_or(match kind {
            OpeningKind::Door => 2100.0,
            OpeningKind::Window => 1200.0,
        }),
        sill: first_num(value, &["sill", "sill_mm"]),
        swing: str_field(value, "swing"),
    }
}

fn read_room(value: &Value, index: usize) -> Room {
    Room {
        id: str_field(value, "id").unwrap_or_else(|| format!("r{index}")),
        name: str_field(value, "name"),
        polygon: points(value.get("polygon")),
        floor_finish: str_field(value, "floor_finish").or_else(|| str_field(value, "floorFinish")),
        ceiling_height_mm: first_num(value, &["ceiling_height_mm", "ceilingHeightMm"]),
        wall_thickness_mm: first_num(value, &["wall_thickness_mm", "wallThicknessMm"]),
        unit_id: str_field(value, "unitId").or_else(|| str_field(value, "unit_id")),
        materials: read_surface_materials(value.get("materials")),
    }
}

fn read_wall_path(value: &Value, index: usize) -> WallPath {
    let path = match value.get("path") {
        Some(p) => points(Some(p)),
        None => points(value.get("points")),
    };
    WallPath {
        id: str_field(value, "id").unwrap_or_else(|| format!("w{index}")),
        path,
        thickness_mm: first_num(value, &["thickness_mm", "thickness"]),
        height_mm: first_num(value, &["height_mm", "height"]),
    }
}

fn read_stair(value: &Value, index: usize) -> Stair {
    let riser_count = ["riser_count", "riserCount", "risers"]
        .iter()
        .find_map(|k| int_field(value, k))
        .and_then(|n| u32::try_from(n).ok());

    Stair {
        id: str_field(value, "id").unwrap_or_else(|| format!("s{index}")),
        name: str_field(value, "name"),
        from_level_id: str_field(value, "from_level_id")
            .or_else(|| str_field(value, "fromLevelId")),
        to_level_id: str_field(value, "to_level_id").or_else(|| str_field(value, "toLevelId")),
        rise_mm: first_num(value, &["rise_mm", "riseMm", "rise"]),
        run_mm: first_num(value, &["run_mm", "runMm", "run"]),
        riser_count,
        tread_mm: first_num(value, &["tread_mm", "treadMm", "tread"]),
        width_mm: first_num(value, &["width_mm", "widthMm", "width"]),
        polygon: points(value.get("polygon")),
    }
}

fn read_void(value: &Value, index: usize) -> Void {
    Void {
        id: str_field(value, "id").unwrap_or_else(|| format!("v{index}")),
        polygon: points(value.get("polygon")),
    }
}

fn read_roof(value: &Value) -> Option<Roof> {
    if !value.is_object() {
        return None;
    }
    let ridge_direction = match str_field(value, "ridge_direction") {
        None => RidgeDirection::X,
        Some(d) if d.eq_ignore_ascii_case("x") => RidgeDirection::X,
        Some(_) => RidgeDirection::Y,
    };
    let ridge_mode = match str_field(value, "ridge_mode") {
        None => RidgeMode::EqualPitch,
        Some(m) if m.eq_ignore_ascii_case("equal_pitch") => RidgeMode::EqualPitch,
        Some(_) => RidgeMode::EqualEave,
    };

    Some(Roof {
        kind: str_field(value, "type").unwrap_or_default(),
        pitch_degrees: first_num(value, &["pitch_degrees", "pitchDegrees"]),
        overhang_mm: first_num(value, &["overhang_mm", "overhangMm"]),
        thickness_mm: first_num(value, &["thickness_mm", "thicknessMm"]),
        ridge_direction,
        ridge_offset_mm: num_field(value, "ridge_offset_mm").unwrap_or(0.0),
        ridge_mode,
        eave_height_mode: str_field(value, "eave_height_mode"),
    })
}

fn read_floor(value: &Value, index: usize, defaults: &PlanDefaults) -> Floor {
    let id = str_field(value, "id").unwrap_or_else(|| format!("f{index}"));
    Floor {
        name: str_field(value, "name").unwrap_or_else(|| id.clone()),
        level: int_field(value, "level").unwrap_or(index as i64),
        elevation_mm: first_num(value, &["elevation_mm", "elevation"]).unwrap_or(0.0),
        height_mm: first_num(value, &["height_mm", "heightMm"]),
        footprint: obj_field(value, "footprint").map(read_footprint),
        wall: obj_field(value, "wall").map(|w| read_wall_spec(w, defaults.wall)),
        openings: indexed(array_field(value, "openings"), read_opening),
        rooms: indexed(array_field(value, "rooms"), read_room),
        walls: indexed(array_field(value, "walls"), read_wall_path),
        stairs: indexed(array_field(value, "stairs"), read_stair),
        voids: indexed(array_field(value, "voids"), read_void),
        id,
    }
}

fn read_floors(items: &[Value], defaults: &PlanDefaults) -> Vec<Floor> {
    items
        .iter()
        .enumerate()
        .filter(|(_, v)| v.is_object())
        .map(|(i, v)| read_floor(v, i, defaults))
        .collect()
}

fn read_blocks(items: &[Value], defaults: &PlanDefaults) -> Vec<Block> {
    items
        .iter()
        .enumerate()
        .filter(|(_, v)| v.is_object())
        .map(|(i, v)| {
            let floors = read_floors(array_field(v, "floors"), defaults);
            // 翼楼缺少轮廓时借用首层轮廓
            let footprint = obj_field(v, "footprint")
                .map(read_footprint)
                .or_else(|| floors.first().and_then(|f| f.footprint.clone()))
                .unwrap_or_default();
            let position = obj_field(v, "position")
                .map(|p| BlockPosition {
                    x: num_field(p, "x").unwrap_or(0.0),
                    z: first_num(p, &["z", "y"]).unwrap_or(0.0),
                })
                .unwrap_or_default();

            Block {
                id: str_field(v, "id").unwrap_or_else(|| format!("b{i}")),
                name: str_field(v, "name"),
                position,
                footprint,
                wall: obj_field(v, "wall").map(|w| read_wall_spec(w, defaults.wall)),
                materials: read_surface_materials(v.get("materials")),
                floors,
                roof: v.get("roof").and_then(read_roof),
            }
        })
        .collect()
}

/// v0.5：房间优先格式，只读取第一栋建筑
fn read_rooms_first(raw: &Value, defaults: &PlanDefaults) -> Vec<Floor> {
    let empty = Value::Null;
    let building = array_field(raw, "buildings").first().unwrap_or(&empty);

    array_field(raw, "levels")
        .iter()
        .enumerate()
        .filter(|(_, v)| v.is_object())
        .map(|(i, level)| {
            let id = str_field(level, "id").unwrap_or_else(|| format!("f{i}"));
            let footprint_el = on_level(building, "footprints", &id).into_iter().next();

            let stairs = array_field(building, "stairs")
                .iter()
                .filter(|s| {
                    first_str(s, &["fromLevelId", "from_level_id"]).as_deref() == Some(id.as_str())
                })
                .enumerate()
                .map(|(si, s)| read_stair(s, si))
                .collect();

            Floor {
                name: str_field(level, "name").unwrap_or_else(|| id.clone()),
                level: int_field(level, "level").unwrap_or(i as i64),
                elevation_mm: first_num(level, &["elevation", "elevation_mm"]).unwrap_or(0.0),
                height_mm: first_num(level, &["height_mm", "heightMm", "height"]),
                footprint: footprint_el.map(read_footprint),
                wall: footprint_el
                    .and_then(|fp| obj_field(fp, "outerWall"))
                    .map(|w| read_wall_spec(w, defaults.wall)),
                openings: enumerate_refs(on_level(building, "openings", &id), read_opening),
                rooms: enumerate_refs(on_level(building, "rooms", &id), read_room),
                walls: Vec::new(),
                stairs,
                voids: enumerate_refs(on_level(building, "voids", &id), read_void),
                id,
            }
        })
        .collect()
}

/// v0：单个轮廓包装为合成楼层 `f0`
fn read_single_footprint(raw: &Value, defaults: &PlanDefaults) -> Floor {
    let mut floor = Floor::new("f0", 0);
    floor.name = "Etasje".to_string();
    floor.footprint = obj_field(raw, "footprint").map(read_footprint);
    floor.wall = obj_field(raw, "wall").map(|w| read_wall_spec(w, defaults.wall));
    floor.openings = indexed(array_field(raw, "openings"), read_opening);
    floor.rooms = indexed(array_field(raw, "rooms"), read_room);
    floor
}

/// 已有的派生缓存，无法解析的条目丢弃
fn read_derived(raw: &Value) -> DerivedCache {
    let mut walls_by_level = BTreeMap::new();
    let by_level = obj_field(raw, "derived")
        .and_then(|d| obj_field(d, "wallsByLevel"))
        .and_then(Value::as_object);

    if let Some(map) = by_level {
        for (key, walls) in map {
            let parsed: Vec<Wall> = walls
                .as_array()
                .map(|items| {
                    items
                        .iter()
                        .filter_map(|w| serde_json::from_value(w.clone()).ok())
                        .collect()
                })
                .unwrap_or_default();
            walls_by_level.insert(key.clone(), parsed);
        }
    }
    DerivedCache { walls_by_level }
}

fn on_level<'a>(building: &'a Value, key: &str, level_id: &str) -> Vec<&'a Value> {
    array_field(building, key)
        .iter()
        .filter(|item| str_field(item, "levelId").as_deref() == Some(level_id))
        .collect()
}

fn first_str(value: &Value, keys: &[&str]) -> Option<String> {
    keys.iter().find_map(|k| str_field(value, k))
}

fn indexed<T>(items: &[Value], read: impl Fn(&Value, usize) -> T) -> Vec<T> {
    items
        .iter()
        .enumerate()
        .filter(|(_, v)| v.is_object())
        .map(|(i, v)| read(v, i))
        .collect()
}

fn enumerate_refs<T>(items: Vec<&Value>, read: impl Fn(&Value, usize) -> T) -> Vec<T> {
    items.into_iter().enumerate().map(|(i, v)| read(v, i)).collect()
}
