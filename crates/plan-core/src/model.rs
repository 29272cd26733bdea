//! 规范化的建筑平面模型
//!
//! 所有历史格式经过 [`crate::normalize`] 之后都落在这里定义的结构上。
//! 长度单位一律为毫米。
//!
//! 文档主体是一个带标签的联合体 [`PlanBody`]：要么是单体建筑的
//! `floors[]`，要么是多个翼楼的 `blocks[]`，二者互斥。

use crate::math::{path_length, Point2};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// 规范化后的文档版本
pub const CANONICAL_VERSION: &str = "1.0";

/// 默认外墙厚度
pub const DEFAULT_WALL_THICKNESS_MM: f64 = 200.0;

/// 默认墙高
pub const DEFAULT_WALL_HEIGHT_MM: f64 = 2700.0;

/// 建筑平面文档（根）
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BuildingPlan {
    pub version: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub units: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    #[serde(default)]
    pub defaults: PlanDefaults,

    #[serde(rename = "materialLibrary", default)]
    pub material_library: Vec<Material>,

    /// 楼层或翼楼
    #[serde(flatten)]
    pub body: PlanBody,

    /// 单体建筑的屋顶
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub roof: Option<Roof>,

    /// 派生数据缓存
    #[serde(default)]
    pub derived: DerivedCache,
}

/// 文档主体
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PlanBody {
    Floors(Vec<Floor>),
    Blocks(Vec<Block>),
}

/// 文档主体的判别值
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BodyKind {
    Floors,
    Blocks,
}

/// 指向某一楼层的引用
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LevelRef {
    /// 所属翼楼（单体建筑为 `None`）
    pub block_id: Option<String>,
    pub level_id: String,
    pub name: String,
    /// 派生缓存键
    pub key: String,
}

impl BuildingPlan {
    /// 空文档（单体建筑，无楼层）
    pub fn empty() -> Self {
        Self {
            version: CANONICAL_VERSION.to_string(),
            units: Some("mm".to_string()),
            name: None,
            defaults: PlanDefaults::default(),
            material_library: crate::materials::default_material_library(),
            body: PlanBody::Floors(Vec::new()),
            roof: None,
            derived: DerivedCache::default(),
        }
    }

    pub fn body_kind(&self) -> BodyKind {
        match self.body {
            PlanBody::Floors(_) => BodyKind::Floors,
            PlanBody::Blocks(_) => BodyKind::Blocks,
        }
    }

    pub fn floors(&self) -> Option<&[Floor]> {
        match &self.body {
            PlanBody::Floors(floors) => Some(floors),
            PlanBody::Blocks(_) => None,
        }
    }

    pub fn blocks(&self) -> Option<&[Block]> {
        match &self.body {
            PlanBody::Blocks(blocks) => Some(blocks),
            PlanBody::Floors(_) => None,
        }
    }

    pub fn blocks_mut(&mut self) -> Option<&mut Vec<Block>> {
        match &mut self.body {
            PlanBody::Blocks(blocks) => Some(blocks),
            PlanBody::Floors(_) => None,
        }
    }

    pub fn find_block(&self, block_id: &str) -> Option<&Block> {
        self.blocks()?.iter().find(|b| b.id == block_id)
    }

    /// 查找楼层；`block_id` 为 `None` 时在单体建筑的 `floors[]` 中查找
    pub fn find_floor(&self, block_id: Option<&str>, level_id: &str) -> Option<&Floor> {
        match (&self.body, block_id) {
            (PlanBody::Floors(floors), None) => floors.iter().find(|f| f.id == level_id),
            (PlanBody::Blocks(blocks), Some(bid)) => blocks
                .iter()
                .find(|b| b.id == bid)?
                .floors
                .iter()
                .find(|f| f.id == level_id),
            _ => None,
        }
    }

    pub fn find_floor_mut(&mut self, block_id: Option<&str>, level_id: &str) -> Option<&mut Floor> {
        match (&mut self.body, block_id) {
            (PlanBody::Floors(floors), None) => floors.iter_mut().find(|f| f.id == level_id),
            (PlanBody::Blocks(blocks), Some(bid)) => blocks
                .iter_mut()
                .find(|b| b.id == bid)?
                .floors
                .iter_mut()
                .find(|f| f.id == level_id),
            _ => None,
        }
    }

    /// 按文档顺序列出所有楼层
    pub fn levels(&self) -> Vec<LevelRef> {
        match &self.body {
            PlanBody::Floors(floors) => floors
                .iter()
                .map(|f| LevelRef {
                    block_id: None,
                    level_id: f.id.clone(),
                    name: f.name.clone(),
                    key: crate::walls::level_key(None, &f.id),
                })
                .collect(),
            PlanBody::Blocks(blocks) => blocks
                .iter()
                .flat_map(|b| {
                    b.floors.iter().map(move |f| LevelRef {
                        block_id: Some(b.id.clone()),
                        level_id: f.id.clone(),
                        name: f.name.clone(),
                        key: crate::walls::level_key(Some(&b.id), &f.id),
                    })
                })
                .collect(),
        }
    }

    /// 某一楼层缓存的派生墙体
    pub fn walls_for_level(&self, key: &str) -> &[Wall] {
        self.derived
            .walls_by_level
            .get(key)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }
}

/// 文档级默认值
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct PlanDefaults {
    #[serde(default)]
    pub wall: WallSpec,

    #[serde(default)]
    pub materials: MaterialAssignment,

    #[serde(rename = "wallRules", default)]
    pub wall_rules: WallRules,
}

/// 墙体厚度与高度
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct WallSpec {
    pub thickness_mm: f64,
    pub height_mm: f64,
}

impl Default for WallSpec {
    fn default() -> Self {
        Self {
            thickness_mm: DEFAULT_WALL_THICKNESS_MM,
            height_mm: DEFAULT_WALL_HEIGHT_MM,
        }
    }
}

/// 按类别分配的材质 id
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MaterialAssignment {
    pub floor: String,
    pub wall: String,
    pub ceiling: String,
    pub roof: String,
}

/// 各墙型的厚度规则
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WallRules {
    pub interior: WallRule,

    #[serde(rename = "betweenUnits")]
    pub between_units: WallRule,
}

impl WallRules {
    pub fn rule(&self, wall_type: WallType) -> &WallRule {
        match wall_type {
            WallType::Interior => &self.interior,
            WallType::BetweenUnits => &self.between_units,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct WallRule {
    #[serde(rename = "thicknessMm")]
    pub thickness_mm: f64,
}

/// 材质库条目
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Material {
    pub id: String,
    pub name: String,
    pub category: String,
    pub color: String,
}

impl Material {
    pub fn new(
        id: impl Into<String>,
        name: impl Into<String>,
        category: impl Into<String>,
        color: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            category: category.into(),
            color: color.into(),
        }
    }
}

/// 房间/翼楼上的材质覆盖
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct SurfaceMaterials {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub floor: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub wall: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ceiling: Option<String>,
}

impl SurfaceMaterials {
    pub fn is_empty(&self) -> bool {
        self.floor.is_none() && self.wall.is_none() && self.ceiling.is_none()
    }
}

/// 矩形轮廓
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct Footprint {
    pub width: f64,
    pub depth: f64,

    /// 原始多边形（rooms-first 格式）
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub polygon: Option<Vec<Point2>>,
}

impl Footprint {
    pub fn new(width: f64, depth: f64) -> Self {
        Self {
            width,
            depth,
            polygon: None,
        }
    }

    /// 指定外墙的长度
    pub fn side_length(&self, side: WallSide) -> f64 {
        match side {
            WallSide::Front | WallSide::Back => self.width,
            WallSide::Left | WallSide::Right => self.depth,
        }
    }
}

/// 翼楼在总平面中的位置
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, Default)]
pub struct BlockPosition {
    pub x: f64,
    pub z: f64,
}

/// 翼楼：独立定位的矩形建筑体
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Block {
    pub id: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    #[serde(default)]
    pub position: BlockPosition,

    #[serde(default)]
    pub footprint: Footprint,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub wall: Option<WallSpec>,

    #[serde(default, skip_serializing_if = "SurfaceMaterials::is_empty")]
    pub materials: SurfaceMaterials,

    #[serde(default)]
    pub floors: Vec<Floor>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub roof: Option<Roof>,
}

/// 楼层
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Floor {
    pub id: String,
    pub name: String,
    pub level: i64,
    pub elevation_mm: f64,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub height_mm: Option<f64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub footprint: Option<Footprint>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub wall: Option<WallSpec>,

    #[serde(default)]
    pub openings: Vec<Opening>,

    #[serde(default)]
    pub rooms: Vec<Room>,

    /// 显式绘制的墙体路径
    #[serde(default)]
    pub walls: Vec<WallPath>,

    #[serde(default)]
    pub stairs: Vec<Stair>,

    #[serde(default)]
    pub voids: Vec<Void>,
}

impl Floor {
    pub fn new(id: impl Into<String>, level: i64) -> Self {
        let id = id.into();
        Self {
            name: id.clone(),
            id,
            level,
            elevation_mm: 0.0,
            height_mm: None,
            footprint: None,
            wall: None,
            openings: Vec::new(),
            rooms: Vec::new(),
            walls: Vec::new(),
            stairs: Vec::new(),
            voids: Vec::new(),
        }
    }

    pub fn find_wall_path(&self, id: &str) -> Option<&WallPath> {
        self.walls.iter().find(|w| w.id == id)
    }
}

/// 房间
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Room {
    pub id: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    pub polygon: Vec<Point2>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub floor_finish: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ceiling_height_mm: Option<f64>,

    /// 覆盖墙体规则的厚度
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub wall_thickness_mm: Option<f64>,

    /// 所属住户单元
    #[serde(rename = "unitId", default, skip_serializing_if = "Option::is_none")]
    pub unit_id: Option<String>,

    #[serde(default, skip_serializing_if = "SurfaceMaterials::is_empty")]
    pub materials: SurfaceMaterials,
}

impl Room {
    pub fn new(id: impl Into<String>, polygon: Vec<Point2>) -> Self {
        Self {
            id: id.into(),
            name: None,
            polygon,
            floor_finish: None,
            ceiling_height_mm: None,
            wall_thickness_mm: None,
            unit_id: None,
            materials: SurfaceMaterials::default(),
        }
    }

    /// 轴对齐矩形房间
    pub fn rect(id: impl Into<String>, x: f64, y: f64, width: f64, depth: f64) -> Self {
        Self::new(
            id,
            vec![
                Point2::new(x, y),
                Point2::new(x + width, y),
                Point2::new(x + width, y + depth),
                Point2::new(x, y + depth),
            ],
        )
    }
}

/// 派生墙体类型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum WallType {
    Interior,
    BetweenUnits,
}

impl WallType {
    pub fn as_str(&self) -> &'static str {
        match self {
            WallType::Interior => "interior",
            WallType::BetweenUnits => "betweenUnits",
        }
    }
}

/// 派生墙体：由两个相邻房间的公共边推导，不可手工编辑
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Wall {
    pub id: String,
    pub level_id: String,
    pub a: Point2,
    pub b: Point2,
    pub thickness_mm: f64,
    pub wall_type: WallType,
    /// 两个房间 id，已排序
    pub room_ids: [String; 2],
    pub material_id: String,
    pub height_mm: f64,
}

impl Wall {
    pub fn length_mm(&self) -> f64 {
        (self.b - self.a).norm()
    }
}

/// 显式墙体路径
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WallPath {
    pub id: String,
    pub path: Vec<Point2>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub thickness_mm: Option<f64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub height_mm: Option<f64>,
}

impl WallPath {
    pub fn length_mm(&self) -> f64 {
        path_length(&self.path)
    }
}

/// 外墙方位
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WallSide {
    Front,
    Back,
    Left,
    Right,
}

impl WallSide {
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "front" => Some(WallSide::Front),
            "back" => Some(WallSide::Back),
            "left" => Some(WallSide::Left),
            "right" => Some(WallSide::Right),
            _ => None,
        }
    }
}

/// 开口类型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum OpeningKind {
    #[default]
    Door,
    Window,
}

/// 门窗开口
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Opening {
    pub id: String,

    #[serde(rename = "type")]
    pub kind: OpeningKind,

    /// 外墙方位
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub wall: Option<WallSide>,

    /// 所在墙体路径
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub wall_id: Option<String>,

    /// 沿墙体路径的位置
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub at_mm: Option<f64>,

    pub offset: f64,
    pub width: f64,
    pub height: f64,

    /// 窗台高度（仅窗）
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sill: Option<f64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub swing: Option<String>,
}

impl Opening {
    /// 沿所在墙的起始位置
    pub fn start_mm(&self) -> f64 {
        if self.wall.is_none() {
            self.at_mm.unwrap_or(self.offset)
        } else {
            self.offset
        }
    }
}

/// 屋脊方向
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum RidgeDirection {
    /// 屋脊沿东西向（X 轴）
    #[default]
    X,
    /// 屋脊沿南北向（Y 轴）
    Y,
}

/// 屋脊偏移时的平衡方式
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum RidgeMode {
    /// 两坡同角度，檐口高度不同
    #[default]
    EqualPitch,
    /// 两侧檐口同高，坡度不同
    EqualEave,
}

/// 屋顶参数（仅支持双坡）
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Roof {
    /// 原样保留，只有 `"gable"` 可求解
    #[serde(rename = "type")]
    pub kind: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pitch_degrees: Option<f64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub overhang_mm: Option<f64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub thickness_mm: Option<f64>,

    #[serde(default)]
    pub ridge_direction: RidgeDirection,

    #[serde(default)]
    pub ridge_offset_mm: f64,

    #[serde(default)]
    pub ridge_mode: RidgeMode,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub eave_height_mode: Option<String>,
}

impl Roof {
    pub fn gable(pitch_degrees: f64) -> Self {
        Self {
            kind: "gable".to_string(),
            pitch_degrees: Some(pitch_degrees),
            overhang_mm: None,
            thickness_mm: None,
            ridge_direction: RidgeDirection::X,
            ridge_offset_mm: 0.0,
            ridge_mode: RidgeMode::EqualPitch,
            eave_height_mode: None,
        }
    }

    pub fn is_gable(&self) -> bool {
        self.kind == "gable"
    }
}

/// 楼梯
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Stair {
    pub id: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub from_level_id: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub to_level_id: Option<String>,

    /// 总高差
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rise_mm: Option<f64>,

    /// 水平投影总长
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub run_mm: Option<f64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub riser_count: Option<u32>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tread_mm: Option<f64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub width_mm: Option<f64>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub polygon: Vec<Point2>,
}

impl Stair {
    /// 单级踏步高度
    pub fn riser_height_mm(&self) -> Option<f64> {
        match (self.rise_mm, self.riser_count) {
            (Some(rise), Some(count)) if count > 0 => Some(rise / count as f64),
            _ => None,
        }
    }

    /// 水平总长：显式给出时直接使用，否则按踏面数（踢面数 - 1）推算
    pub fn total_run_mm(&self) -> Option<f64> {
        if self.run_mm.is_some() {
            return self.run_mm;
        }
        match (self.tread_mm, self.riser_count) {
            (Some(tread), Some(count)) if count > 0 => Some(tread * (count - 1) as f64),
            _ => None,
        }
    }
}

/// 楼梯井等楼板开洞
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Void {
    pub id: String,
    pub polygon: Vec<Point2>,
}

/// 派生数据缓存，按楼层键整体覆盖
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct DerivedCache {
    #[serde(rename = "wallsByLevel", default)]
    pub walls_by_level: BTreeMap<String, Vec<Wall>>,
}
