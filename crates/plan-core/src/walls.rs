//! 派生墙体推导
//!
//! 房间不声明哪些边是墙。两个房间共享同一条边时，这条边就是一面内墙：
//!
//! 1. 每个房间多边形的每条边（首尾相接）吸附到 5 mm 网格，
//!    端点按字典序排列，得到与方向无关的 [`SegmentKey`]
//! 2. 按键分组，记录不同的房间 id
//! 3. 恰好被两个房间共享的键生成一面 [`Wall`]
//!
//! 结果按键排序，与房间顺序无关。墙体 id 由内容哈希得到，
//! 同一输入总是生成同一 id。

use crate::math::Point2;
use crate::model::{Block, BuildingPlan, Floor, PlanBody, PlanDefaults, Room, Wall, WallType};
use rustc_hash::{FxHashMap, FxHasher};
use std::collections::BTreeSet;
use std::fmt;
use std::hash::Hasher;

/// 端点吸附网格
pub const SNAP_GRID_MM: f64 = 5.0;

/// 墙体推导参数
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WallInferenceParams {
    /// 端点吸附网格（毫米）
    pub snap_grid_mm: f64,
}

impl Default for WallInferenceParams {
    fn default() -> Self {
        Self {
            snap_grid_mm: SNAP_GRID_MM,
        }
    }
}

/// 四舍五入到网格，0.5 向正无穷取整
pub fn snap_coord(value: f64, grid: f64) -> i64 {
    ((value / grid + 0.5).floor() * grid) as i64
}

/// 规范线段键
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SegmentKey {
    pub a: (i64, i64),
    pub b: (i64, i64),
}

impl SegmentKey {
    pub fn new(p: Point2, q: Point2, grid: f64) -> Self {
        let p = (snap_coord(p.x, grid), snap_coord(p.y, grid));
        let q = (snap_coord(q.x, grid), snap_coord(q.y, grid));
        if p <= q {
            Self { a: p, b: q }
        } else {
            Self { a: q, b: p }
        }
    }

    /// 吸附后长度为零
    pub fn is_degenerate(&self) -> bool {
        self.a == self.b
    }

    pub fn start(&self) -> Point2 {
        Point2::new(self.a.0 as f64, self.a.1 as f64)
    }

    pub fn end(&self) -> Point2 {
        Point2::new(self.b.0 as f64, self.b.1 as f64)
    }
}

impl fmt::Display for SegmentKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{},{},{},{}", self.a.0, self.a.1, self.b.0, self.b.1)
    }
}

/// 推导一层墙体所需的上下文
#[derive(Debug, Clone)]
pub struct LevelContext<'a> {
    /// 派生缓存键
    pub level_key: String,
    pub defaults: &'a PlanDefaults,
    /// 翼楼墙体材质
    pub block_material: Option<&'a str>,
    /// 墙高
    pub height_mm: f64,
}

impl<'a> LevelContext<'a> {
    pub fn new(level_key: impl Into<String>, defaults: &'a PlanDefaults) -> Self {
        Self {
            level_key: level_key.into(),
            defaults,
            block_material: None,
            height_mm: defaults.wall.height_mm,
        }
    }

    /// 墙高依次取：楼层高度、楼层墙体、翼楼墙体、文档默认值
    pub fn for_floor(plan: &'a BuildingPlan, block: Option<&'a Block>, floor: &Floor) -> Self {
        let height_mm = floor
            .height_mm
            .or_else(|| floor.wall.map(|w| w.height_mm))
            .or_else(|| block.and_then(|b| b.wall).map(|w| w.height_mm))
            .unwrap_or(plan.defaults.wall.height_mm);

        Self {
            level_key: level_key(block.map(|b| b.id.as_str()), &floor.id),
            defaults: &plan.defaults,
            block_material: block.and_then(|b| b.materials.wall.as_deref()),
            height_mm,
        }
    }
}

/// 派生缓存键：翼楼为 `"block:level"`，单体建筑为楼层 id
pub fn level_key(block_id: Option<&str>, level_id: &str) -> String {
    match block_id {
        Some(block_id) => format!("{block_id}:{level_id}"),
        None => level_id.to_string(),
    }
}

/// 内容寻址的墙体 id
pub fn wall_id(
    level_key: &str,
    segment: &SegmentKey,
    thickness_mm: f64,
    wall_type: WallType,
) -> String {
    let mut hasher = FxHasher::default();
    hasher.write(
        format!("{level_key}|{segment}|{thickness_mm}|{}", wall_type.as_str()).as_bytes(),
    );
    let sanitized: String = level_key
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() { c } else { '_' })
        .collect();
    format!("W_{}_{}", sanitized, to_base36(hasher.finish()))
}

fn to_base36(mut n: u64) -> String {
    const DIGITS: &[u8; 36] = b"0123456789abcdefghijklmnopqrstuvwxyz";
    if n == 0 {
        return "0".to_string();
    }
    let mut buf = Vec::new();
    while n > 0 {
        buf.push(DIGITS[(n % 36) as usize]);
        n /= 36;
    }
    buf.reverse();
    String::from_utf8_lossy(&buf).into_owned()
}

/// 推导一层的墙体
pub fn derive_walls(ctx: &LevelContext<'_>, rooms: &[Room]) -> Vec<Wall> {
    derive_walls_with(ctx, rooms, &WallInferenceParams::default())
}

pub fn derive_walls_with(
    ctx: &LevelContext<'_>,
    rooms: &[Room],
    params: &WallInferenceParams,
) -> Vec<Wall> {
    let mut shared: FxHashMap<SegmentKey, Vec<&str>> = FxHashMap::default();

    for room in rooms.iter().filter(|r| r.polygon.len() >= 3) {
        let n = room.polygon.len();
        for i in 0..n {
            let key =
                SegmentKey::new(room.polygon[i], room.polygon[(i + 1) % n], params.snap_grid_mm);
            if key.is_degenerate() {
                continue;
            }
            let ids = shared.entry(key).or_default();
            if !ids.contains(&room.id.as_str()) {
                ids.push(room.id.as_str());
            }
        }
    }

    let mut keys: Vec<(SegmentKey, [&str; 2])> = shared
        .into_iter()
        .filter_map(|(key, mut ids)| {
            if ids.len() != 2 {
                return None;
            }
            ids.sort_unstable();
            Some((key, [ids[0], ids[1]]))
        })
        .collect();
    keys.sort_by(|x, y| x.0.cmp(&y.0));

    keys.into_iter()
        .map(|(key, [id_a, id_b])| build_wall(ctx, rooms, key, id_a, id_b))
        .collect()
}

fn build_wall(
    ctx: &LevelContext<'_>,
    rooms: &[Room],
    key: SegmentKey,
    id_a: &str,
    id_b: &str,
) -> Wall {
    let room_a = rooms.iter().find(|r| r.id == id_a);
    let room_b = rooms.iter().find(|r| r.id == id_b);

    let wall_type = match (
        room_a.and_then(|r| r.unit_id.as_deref()),
        room_b.and_then(|r| r.unit_id.as_deref()),
    ) {
        (Some(ua), Some(ub)) if ua != ub => WallType::BetweenUnits,
        _ => WallType::Interior,
    };

    let thickness_mm = room_a
        .and_then(|r| r.wall_thickness_mm)
        .or_else(|| room_b.and_then(|r| r.wall_thickness_mm))
        .unwrap_or(ctx.defaults.wall_rules.rule(wall_type).thickness_mm);

    let mut material_id = ctx.defaults.materials.wall.as_str();
    if let Some(m) = ctx.block_material {
        material_id = m;
    }
    if let Some(m) = room_a.and_then(|r| r.materials.wall.as_deref()) {
        material_id = m;
    }
    if wall_type == WallType::BetweenUnits {
        if let Some(m) = ctx.block_material {
            material_id = m;
        }
    }

    Wall {
        id: wall_id(&ctx.level_key, &key, thickness_mm, wall_type),
        level_id: ctx.level_key.clone(),
        a: key.start(),
        b: key.end(),
        thickness_mm,
        wall_type,
        room_ids: [id_a.to_string(), id_b.to_string()],
        material_id: material_id.to_string(),
        height_mm: ctx.height_mm,
    }
}

/// 推导指定楼层的墙体
pub fn derive_walls_for_floor(
    plan: &BuildingPlan,
    block: Option<&Block>,
    floor: &Floor,
) -> Vec<Wall> {
    let ctx = LevelContext::for_floor(plan, block, floor);
    derive_walls(&ctx, &floor.rooms)
}

/// 重新生成一层的派生墙体并整体覆盖缓存；楼层不存在时返回 `false`
pub fn regenerate_level(plan: &mut BuildingPlan, block_id: Option<&str>, level_id: &str) -> bool {
    let walls = {
        let block = match block_id {
            Some(id) => match plan.find_block(id) {
                Some(block) => Some(block),
                None => return false,
            },
            None => None,
        };
        let Some(floor) = plan.find_floor(block_id, level_id) else {
            return false;
        };
        derive_walls_for_floor(plan, block, floor)
    };

    let key = level_key(block_id, level_id);
    tracing::debug!("Regenerated {} derived walls for level {}", walls.len(), key);
    plan.derived.walls_by_level.insert(key, walls);
    true
}

/// 重新生成所有楼层的派生墙体，缓存整体替换
pub fn regenerate_all(plan: &mut BuildingPlan) {
    let mut walls_by_level = std::collections::BTreeMap::new();
    match &plan.body {
        PlanBody::Floors(floors) => {
            for floor in floors {
                walls_by_level.insert(
                    level_key(None, &floor.id),
                    derive_walls_for_floor(plan, None, floor),
                );
            }
        }
        PlanBody::Blocks(blocks) => {
            for block in blocks {
                for floor in &block.floors {
                    walls_by_level.insert(
                        level_key(Some(&block.id), &floor.id),
                        derive_walls_for_floor(plan, Some(block), floor),
                    );
                }
            }
        }
    }
    tracing::debug!("Regenerated derived walls for {} levels", walls_by_level.len());
    plan.derived.walls_by_level = walls_by_level;
}

/// 房间轮廓指纹：吸附后的顶点集合，与起点和方向无关
pub fn room_outline_key(room: &Room) -> Option<Vec<(i64, i64)>> {
    if room.polygon.len() < 3 {
        return None;
    }
    let vertices: BTreeSet<(i64, i64)> = room
        .polygon
        .iter()
        .map(|p| (snap_coord(p.x, SNAP_GRID_MM), snap_coord(p.y, SNAP_GRID_MM)))
        .collect();
    Some(vertices.into_iter().collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::WallSpec;

    fn two_rooms() -> Vec<Room> {
        vec![
            Room::rect("stue", 0.0, 0.0, 4000.0, 3000.0),
            Room::rect("kjokken", 4000.0, 0.0, 3000.0, 3000.0),
        ]
    }

    #[test]
    fn test_snap_half_up() {
        assert_eq!(snap_coord(2.5, 5.0), 5);
        assert_eq!(snap_coord(2.4, 5.0), 0);
        assert_eq!(snap_coord(-2.5, 5.0), 0);
        assert_eq!(snap_coord(-2.6, 5.0), -5);
        assert_eq!(snap_coord(4001.0, 5.0), 4000);
    }

    #[test]
    fn test_segment_key_direction_independent() {
        let p = Point2::new(4000.0, 3000.0);
        let q = Point2::new(4001.0, 0.0);
        let k1 = SegmentKey::new(p, q, SNAP_GRID_MM);
        let k2 = SegmentKey::new(q, p, SNAP_GRID_MM);
        assert_eq!(k1, k2);
        assert_eq!(k1.to_string(), "4000,0,4000,3000");
    }

    #[test]
    fn test_shared_edge_becomes_interior_wall() {
        let defaults = PlanDefaults::default();
        let ctx = LevelContext::new("f1", &defaults);
        let walls = derive_walls(&ctx, &two_rooms());

        assert_eq!(walls.len(), 1);
        let wall = &walls[0];
        assert_eq!(wall.a, Point2::new(4000.0, 0.0));
        assert_eq!(wall.b, Point2::new(4000.0, 3000.0));
        assert_eq!(wall.wall_type, WallType::Interior);
        assert_eq!(wall.thickness_mm, 98.0);
        assert_eq!(wall.room_ids, ["kjokken".to_string(), "stue".to_string()]);
        assert_eq!(wall.material_id, "default_wall");
        assert_eq!(wall.height_mm, 2700.0);
        assert_eq!(wall.level_id, "f1");
        assert!(wall.id.starts_with("W_f1_"));
    }

    #[test]
    fn test_room_order_does_not_matter() {
        let defaults = PlanDefaults::default();
        let ctx = LevelContext::new("A:f1", &defaults);
        let mut rooms = two_rooms();
        rooms.push(Room::rect("bad", 0.0, 3000.0, 4000.0, 2000.0));
        let forward = derive_walls(&ctx, &rooms);
        rooms.reverse();
        let backward = derive_walls(&ctx, &rooms);
        assert_eq!(forward, backward);
        assert_eq!(forward.len(), 2);
        assert!(forward[0].id.starts_with("W_A_f1_"));
    }

    #[test]
    fn test_empty_and_degenerate_input() {
        let defaults = PlanDefaults::default();
        let ctx = LevelContext::new("f1", &defaults);
        assert!(derive_walls(&ctx, &[]).is_empty());

        let sliver = Room::new(
            "sliver",
            vec![Point2::new(0.0, 0.0), Point2::new(1.0, 0.0), Point2::new(1.0, 1.0)],
        );
        let line = Room::new("line", vec![Point2::new(0.0, 0.0), Point2::new(4000.0, 0.0)]);
        assert!(derive_walls(&ctx, &[sliver, line]).is_empty());
    }

    #[test]
    fn test_between_units_rules_and_overrides() {
        let mut defaults = PlanDefaults::default();
        defaults.wall = WallSpec {
            thickness_mm: 250.0,
            height_mm: 2500.0,
        };
        let mut ctx = LevelContext::new("A:f1", &defaults);
        ctx.block_material = Some("brick");

        let mut rooms = two_rooms();
        rooms[0].unit_id = Some("u1".to_string());
        rooms[1].unit_id = Some("u2".to_string());
        rooms[1].materials.wall = Some("gips".to_string());

        let walls = derive_walls(&ctx, &rooms);
        assert_eq!(walls[0].wall_type, WallType::BetweenUnits);
        assert_eq!(walls[0].thickness_mm, 200.0);
        assert_eq!(walls[0].material_id, "brick");

        // 同一单元：内墙，取排序后第一个房间（kjokken）的材质
        rooms[1].unit_id = Some("u1".to_string());
        rooms[0].wall_thickness_mm = Some(150.0);
        let walls = derive_walls(&ctx, &rooms);
        assert_eq!(walls[0].wall_type, WallType::Interior);
        assert_eq!(walls[0].material_id, "gips");
        assert_eq!(walls[0].thickness_mm, 150.0);
    }

    #[test]
    fn test_wall_id_is_content_addressed() {
        let key = SegmentKey::new(Point2::new(0.0, 0.0), Point2::new(0.0, 3000.0), SNAP_GRID_MM);
        let id1 = wall_id("A:f1", &key, 98.0, WallType::Interior);
        let id2 = wall_id("A:f1", &key, 98.0, WallType::Interior);
        let id3 = wall_id("A:f1", &key, 200.0, WallType::Interior);
        assert_eq!(id1, id2);
        assert_ne!(id1, id3);
        assert_eq!(to_base36(35), "z");
        assert_eq!(to_base36(36), "10");
    }

    #[test]
    fn test_regenerate_level_overwrites_cache() {
        let mut floor = Floor::new("f1", 0);
        floor.rooms = two_rooms();
        floor.height_mm = Some(2400.0);
        let mut plan = BuildingPlan::empty();
        plan.body = PlanBody::Floors(vec![floor]);
        plan.derived.walls_by_level.insert("f1".to_string(), Vec::new());

        assert!(regenerate_level(&mut plan, None, "f1"));
        assert_eq!(plan.walls_for_level("f1").len(), 1);
        assert_eq!(plan.walls_for_level("f1")[0].height_mm, 2400.0);
        assert!(!regenerate_level(&mut plan, None, "missing"));
        assert!(!regenerate_level(&mut plan, Some("A"), "f1"));
    }

    #[test]
    fn test_outline_key_ignores_start_vertex() {
        let a = Room::rect("a", 0.0, 0.0, 3000.0, 3000.0);
        let mut b = a.clone();
        b.polygon.rotate_left(2);
        assert_eq!(room_outline_key(&a), room_outline_key(&b));
        assert_eq!(room_outline_key(&Room::new("x", Vec::new())), None);
    }
}
