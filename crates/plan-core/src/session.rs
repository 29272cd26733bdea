//! 编辑会话
//!
//! [`PlanSession`] 持有当前文档和选中的楼层，所有编辑都经由它完成。
//! 影响几何的编辑在返回前会重新生成受影响楼层的派生墙体，
//! 因此缓存与房间始终一致。

use crate::math::Point2;
use crate::model::{BlockPosition, BuildingPlan, LevelRef, Room, Wall};
use crate::normalize::normalize;
use crate::validate::validate;
use crate::walls::{level_key, regenerate_all, regenerate_level};
use serde_json::Value;

/// 拖拽吸附参数
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DragParams {
    /// 网格间距（毫米）
    pub grid_mm: f64,
    /// 吸附到其他翼楼边缘的最大距离
    pub snap_distance_mm: f64,
}

impl Default for DragParams {
    fn default() -> Self {
        Self {
            grid_mm: 100.0,
            snap_distance_mm: 120.0,
        }
    }
}

/// 当前选中的楼层
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Cursor {
    pub block_id: Option<String>,
    pub level_id: Option<String>,
}

/// 编辑错误
#[derive(Debug, thiserror::Error)]
pub enum EditError {
    #[error("Level '{0}' not found")]
    LevelNotFound(String),

    #[error("Room '{0}' not found")]
    RoomNotFound(String),

    #[error("Block '{0}' not found")]
    BlockNotFound(String),

    #[error("Invalid path: {0}")]
    InvalidPath(String),

    #[error("Derived data is read-only: {0}")]
    ReadOnly(String),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// 编辑会话
#[derive(Debug, Clone)]
pub struct PlanSession {
    plan: BuildingPlan,
    cursor: Cursor,
    drag: DragParams,
}

impl PlanSession {
    /// 接管已归一化的文档，重新生成全部派生墙体并选中第一层
    pub fn new(mut plan: BuildingPlan) -> Self {
        regenerate_all(&mut plan);
        let mut session = Self {
            plan,
            cursor: Cursor::default(),
            drag: DragParams::default(),
        };
        session.reset_cursor();
        session
    }

    /// 归一化任意格式的文档并开始会话
    pub fn load(raw: &Value) -> Self {
        Self::new(normalize(raw))
    }

    pub fn with_drag_params(mut self, drag: DragParams) -> Self {
        self.drag = drag;
        self
    }

    pub fn plan(&self) -> &BuildingPlan {
        &self.plan
    }

    pub fn into_plan(self) -> BuildingPlan {
        self.plan
    }

    pub fn cursor(&self) -> &Cursor {
        &self.cursor
    }

    pub fn levels(&self) -> Vec<LevelRef> {
        self.plan.levels()
    }

    pub fn select_level(
        &mut self,
        block_id: Option<&str>,
        level_id: &str,
    ) -> Result<(), EditError> {
        if self.plan.find_floor(block_id, level_id).is_none() {
            return Err(EditError::LevelNotFound(level_key(block_id, level_id)));
        }
        self.cursor = Cursor {
            block_id: block_id.map(str::to_string),
            level_id: Some(level_id.to_string()),
        };
        Ok(())
    }

    /// 当前楼层；光标失效时为 `None`
    pub fn active_level(&self) -> Option<LevelRef> {
        let level_id = self.cursor.level_id.as_deref()?;
        let block_id = self.cursor.block_id.as_deref();
        self.levels()
            .into_iter()
            .find(|l| l.block_id.as_deref() == block_id && l.level_id == level_id)
    }

    /// 当前楼层的派生墙体
    pub fn active_walls(&self) -> &[Wall] {
        match self.cursor.level_id.as_deref() {
            Some(level_id) => self
                .plan
                .walls_for_level(&level_key(self.cursor.block_id.as_deref(), level_id)),
            None => &[],
        }
    }

    /// 平移房间：位移吸附到网格，翼楼内的房间夹在翼楼轮廓内
    pub fn move_room(
        &mut self,
        block_id: Option<&str>,
        level_id: &str,
        room_id: &str,
        dx: f64,
        dy: f64,
    ) -> Result<(), EditError> {
        let dx = snap_to_grid(dx, self.drag.grid_mm);
        let dy = snap_to_grid(dy, self.drag.grid_mm);
        let bounds = match block_id {
            Some(id) => {
                let block = self
                    .plan
                    .find_block(id)
                    .ok_or_else(|| EditError::BlockNotFound(id.to_string()))?;
                Some((block.footprint.width, block.footprint.depth))
            }
            None => None,
        };

        let room = self.room_mut(block_id, level_id, room_id)?;
        for p in &mut room.polygon {
            let mut x = p.x + dx;
            let mut y = p.y + dy;
            if let Some((w, d)) = bounds {
                x = x.min(w).max(0.0);
                y = y.min(d).max(0.0);
            }
            *p = Point2::new(x, y);
        }

        regenerate_level(&mut self.plan, block_id, level_id);
        Ok(())
    }

    /// 替换房间轮廓
    pub fn set_room_polygon(
        &mut self,
        block_id: Option<&str>,
        level_id: &str,
        room_id: &str,
        polygon: Vec<Point2>,
    ) -> Result<(), EditError> {
        self.room_mut(block_id, level_id, room_id)?.polygon = polygon;
        regenerate_level(&mut self.plan, block_id, level_id);
        Ok(())
    }

    /// 移动翼楼：先吸附到其他翼楼的边缘，再吸附到网格
    pub fn move_block(
        &mut self,
        block_id: &str,
        x: f64,
        z: f64,
    ) -> Result<BlockPosition, EditError> {
        let blocks = self
            .plan
            .blocks()
            .ok_or_else(|| EditError::BlockNotFound(block_id.to_string()))?;
        let this = blocks
            .iter()
            .find(|b| b.id == block_id)
            .ok_or_else(|| EditError::BlockNotFound(block_id.to_string()))?;

        let mut edges_x = Vec::new();
        let mut edges_z = Vec::new();
        for other in blocks.iter().filter(|b| b.id != block_id) {
            edges_x.extend([other.position.x, other.position.x + other.footprint.width]);
            edges_z.extend([other.position.z, other.position.z + other.footprint.depth]);
        }

        let grid = self.drag.grid_mm;
        let reach = self.drag.snap_distance_mm;
        let position = BlockPosition {
            x: snap_to_grid(snap_to_edges(x, this.footprint.width, &edges_x, reach), grid),
            z: snap_to_grid(snap_to_edges(z, this.footprint.depth, &edges_z, reach), grid),
        };

        let level_ids: Vec<String> = this.floors.iter().map(|f| f.id.clone()).collect();
        if let Some(block) = self
            .plan
            .blocks_mut()
            .and_then(|blocks| blocks.iter_mut().find(|b| b.id == block_id))
        {
            block.position = position;
        }
        for level_id in &level_ids {
            regenerate_level(&mut self.plan, Some(block_id), level_id);
        }
        Ok(position)
    }

    /// 按点分路径读取文档中的值，如 `blocks.0.floors.1.rooms.2`
    pub fn get_value_at(&self, path: &str) -> Result<Value, EditError> {
        let doc = serde_json::to_value(&self.plan)?;
        doc.pointer(&json_pointer(path))
            .cloned()
            .ok_or_else(|| EditError::InvalidPath(path.to_string()))
    }

    /// 按点分路径替换文档中的值，之后重新归一化并重新生成派生墙体
    pub fn replace_value_at(&mut self, path: &str, value: Value) -> Result<(), EditError> {
        let segments = path_segments(path);
        if segments.first().is_some_and(|s| *s == "derived") {
            return Err(EditError::ReadOnly(path.to_string()));
        }

        let mut doc = serde_json::to_value(&self.plan)?;
        let slot = doc
            .pointer_mut(&json_pointer(path))
            .ok_or_else(|| EditError::InvalidPath(path.to_string()))?;
        *slot = value;

        self.plan = normalize(&doc);
        match affected_level(&self.plan, &segments) {
            Some((block_id, level_id)) => {
                regenerate_level(&mut self.plan, block_id.as_deref(), &level_id);
                let keys: Vec<String> = self.plan.levels().into_iter().map(|l| l.key).collect();
                self.plan
                    .derived
                    .walls_by_level
                    .retain(|key, _| keys.contains(key));
            }
            None => regenerate_all(&mut self.plan),
        }

        if self.active_level().is_none() {
            self.reset_cursor();
        }
        tracing::debug!("Replaced value at {}", path);
        Ok(())
    }

    pub fn validate(&self) -> Vec<String> {
        validate(&self.plan)
    }

    fn reset_cursor(&mut self) {
        self.cursor = match self.plan.levels().into_iter().next() {
            Some(level) => Cursor {
                block_id: level.block_id,
                level_id: Some(level.level_id),
            },
            None => Cursor::default(),
        };
    }

    fn room_mut(
        &mut self,
        block_id: Option<&str>,
        level_id: &str,
        room_id: &str,
    ) -> Result<&mut Room, EditError> {
        let floor = self
            .plan
            .find_floor_mut(block_id, level_id)
            .ok_or_else(|| EditError::LevelNotFound(level_key(block_id, level_id)))?;
        floor
            .rooms
            .iter_mut()
            .find(|r| r.id == room_id)
            .ok_or_else(|| EditError::RoomNotFound(room_id.to_string()))
    }
}

/// 四舍五入到网格
fn snap_to_grid(value: f64, grid: f64) -> f64 {
    if grid <= 0.0 {
        return value;
    }
    (value / grid + 0.5).floor() * grid
}

/// 近边或远边落在 `reach` 以内时贴齐最近的边缘
fn snap_to_edges(start: f64, size: f64, edges: &[f64], reach: f64) -> f64 {
    edges
        .iter()
        .flat_map(|&e| [e, e - size])
        .map(|candidate| (candidate, (candidate - start).abs()))
        .filter(|(_, dist)| *dist <= reach)
        .min_by(|a, b| a.1.total_cmp(&b.1))
        .map_or(start, |(candidate, _)| candidate)
}

/// `blocks.0.floors[1]` → `["blocks", "0", "floors", "1"]`
fn path_segments(path: &str) -> Vec<&str> {
    path.split(['.', '[', ']'])
        .filter(|s| !s.is_empty())
        .collect()
}

fn json_pointer(path: &str) -> String {
    path_segments(path)
        .iter()
        .map(|s| format!("/{}", s.replace('~', "~0").replace('/', "~1")))
        .collect()
}

/// 路径指向某一楼层内部时返回该楼层
fn affected_level(plan: &BuildingPlan, segments: &[&str]) -> Option<(Option<String>, String)> {
    match segments {
        ["blocks", bi, "floors", fi, ..] => {
            let block = plan.blocks()?.get(bi.parse::<usize>().ok()?)?;
            let floor = block.floors.get(fi.parse::<usize>().ok()?)?;
            Some((Some(block.id.clone()), floor.id.clone()))
        }
        ["floors", fi, ..] => {
            let floor = plan.floors()?.get(fi.parse::<usize>().ok()?)?;
            Some((None, floor.id.clone()))
        }
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn block_plan() -> Value {
        json!({
            "version": "1.0",
            "units": "mm",
            "blocks": [
                { "id": "A", "position": { "x": 0, "z": 0 }, "footprint": { "width": 8000, "depth": 6000 },
                  "floors": [{ "id": "f1", "name": "1. etasje", "rooms": [
                      { "id": "stue", "polygon": [[0, 0], [4000, 0], [4000, 6000], [0, 6000]] },
                      { "id": "kjokken", "polygon": [[4000, 0], [8000, 0], [8000, 6000], [4000, 6000]] }
                  ] }] },
                { "id": "B", "position": { "x": 9000, "z": 0 }, "footprint": { "width": 5000, "depth": 4000 },
                  "floors": [{ "id": "f1" }] }
            ]
        })
    }

    #[test]
    fn test_load_selects_first_level() {
        let session = PlanSession::load(&block_plan());
        assert_eq!(session.cursor().block_id.as_deref(), Some("A"));
        assert_eq!(session.cursor().level_id.as_deref(), Some("f1"));
        assert_eq!(session.active_walls().len(), 1);
        assert_eq!(session.levels().len(), 2);
    }

    #[test]
    fn test_select_level() {
        let mut session = PlanSession::load(&block_plan());
        session.select_level(Some("B"), "f1").unwrap();
        assert!(session.active_walls().is_empty());
        assert!(matches!(
            session.select_level(None, "f1"),
            Err(EditError::LevelNotFound(_))
        ));
        assert_eq!(session.active_level().unwrap().key, "B:f1");
    }

    #[test]
    fn test_move_room_snaps_and_regenerates() {
        let mut session = PlanSession::load(&block_plan());
        session.move_room(Some("A"), "f1", "kjokken", 1040.0, 0.0).unwrap();

        let floor = session.plan().find_floor(Some("A"), "f1").unwrap();
        let kitchen = &floor.rooms[1];
        // 位移吸附到 1000，右侧被翼楼轮廓夹住
        assert_eq!(kitchen.polygon[0], Point2::new(5000.0, 0.0));
        assert_eq!(kitchen.polygon[1], Point2::new(8000.0, 0.0));
        assert!(session.active_walls().is_empty());

        assert!(matches!(
            session.move_room(Some("A"), "f1", "bad", 0.0, 0.0),
            Err(EditError::RoomNotFound(_))
        ));
    }

    #[test]
    fn test_move_block_snaps_to_edges() {
        let mut session = PlanSession::load(&block_plan());
        // B 的左边缘贴到 A 的右边缘 8000
        let pos = session.move_block("B", 8090.0, 30.0).unwrap();
        assert_eq!(pos, BlockPosition { x: 8000.0, z: 0.0 });

        // A 的右边缘 (x + 8000) 贴到 B 的左边缘
        let pos = session.move_block("A", -110.0, 2040.0).unwrap();
        assert_eq!(pos.x, 0.0);
        assert_eq!(pos.z, 2000.0);
        assert!(matches!(session.move_block("Z", 0.0, 0.0), Err(EditError::BlockNotFound(_))));
    }

    #[test]
    fn test_replace_value_regenerates_level() {
        let mut session = PlanSession::load(&block_plan());
        session
            .replace_value_at(
                "blocks.0.floors.0.rooms.1",
                json!({ "id": "kjokken", "unitId": "u2", "polygon": [[4000, 0], [8000, 0], [8000, 6000], [4000, 6000]] }),
            )
            .unwrap();
        session
            .replace_value_at(
                "blocks[0].floors[0].rooms[0]",
                json!({ "id": "stue", "unitId": "u1", "polygon": [[0, 0], [4000, 0], [4000, 6000], [0, 6000]] }),
            )
            .unwrap();
        let walls = session.active_walls();
        assert_eq!(walls.len(), 1);
        assert_eq!(walls[0].wall_type, crate::model::WallType::BetweenUnits);
        assert_eq!(session.get_value_at("blocks.0.floors.0.rooms.0.unitId").unwrap(), json!("u1"));
    }

    #[test]
    fn test_replace_value_guards() {
        let mut session = PlanSession::load(&block_plan());
        assert!(matches!(
            session.replace_value_at("derived.wallsByLevel", json!({})),
            Err(EditError::ReadOnly(_))
        ));
        assert!(matches!(
            session.replace_value_at("blocks.7.name", json!("x")),
            Err(EditError::InvalidPath(_))
        ));
    }

    #[test]
    fn test_replace_whole_body_resets_cursor() {
        let mut session = PlanSession::load(&block_plan());
        session
            .replace_value_at("blocks", json!([{ "id": "C", "floors": [{ "id": "g1" }] }]))
            .unwrap();
        assert_eq!(session.cursor().block_id.as_deref(), Some("C"));
        assert_eq!(session.plan().derived.walls_by_level.len(), 1);
    }

    #[test]
    fn test_snap_helpers() {
        assert_eq!(snap_to_grid(149.0, 100.0), 100.0);
        assert_eq!(snap_to_grid(150.0, 100.0), 200.0);
        assert_eq!(snap_to_grid(-150.0, 100.0), -100.0);
        assert_eq!(snap_to_edges(5000.0, 1000.0, &[8000.0], 120.0), 5000.0);
        assert_eq!(json_pointer("blocks[0].floors.1"), "/blocks/0/floors/1");
    }
}
