//! 双坡屋顶求解
//!
//! 平面图、立面图和三维模型共用同一份 [`RoofGeometry`]，保证三者数值一致。
//!
//! 屋脊沿 X 轴时两个坡面分别朝北、南，到屋脊的水平距离为
//! `depth/2 ± ridge_offset`；沿 Y 轴时为西、东，使用 `width`。
//!
//! 两种平衡方式：
//! - [`RidgeMode::EqualPitch`]：两坡同角度，脊高取较长一侧，檐口高度不同
//! - [`RidgeMode::EqualEave`]：两侧檐口同高，各坡角度由脊高反算
//!
//! 所有长度为毫米，角度为弧度。

use crate::model::{Roof, RidgeDirection, RidgeMode};
use serde::{Deserialize, Serialize};

/// 默认坡度（度）
pub const DEFAULT_PITCH_DEGREES: f64 = 35.0;

/// 默认挑檐（毫米）
pub const DEFAULT_OVERHANG_MM: f64 = 500.0;

/// 坡面朝向
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RoofSideName {
    North,
    South,
    West,
    East,
}

/// 单个坡面
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RoofSide {
    pub side: RoofSideName,
    /// 檐口（墙外皮）到屋脊的水平距离
    pub distance_mm: f64,
    /// 檐口到屋脊的高差
    pub rise_mm: f64,
    /// 坡度
    pub pitch_rad: f64,
}

/// 求解结果
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RoofGeometry {
    pub ridge_direction: RidgeDirection,
    pub ridge_mode: RidgeMode,
    /// 名义坡度
    pub nominal_pitch_rad: f64,
    pub overhang_mm: f64,
    pub ridge_offset_mm: f64,
    pub width_mm: f64,
    pub depth_mm: f64,
    /// 屋脊高出墙顶的高度
    pub ridge_height_mm: f64,
    /// `[A, B]`：屋脊沿 X 时为 `[北, 南]`，沿 Y 时为 `[西, 东]`
    pub sides: [RoofSide; 2],
}

/// 立面视图方向
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ElevationView {
    North,
    South,
    East,
    West,
}

impl ElevationView {
    pub const ALL: [ElevationView; 4] = [
        ElevationView::North,
        ElevationView::South,
        ElevationView::East,
        ElevationView::West,
    ];
}

/// 山墙立面中的屋顶三角形
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GableEnd {
    /// 屋脊到较低一侧挑檐末端的高差
    pub rise_mm: f64,
    /// 屋脊相对立面中线的水平偏移
    pub apex_offset_mm: f64,
}

/// 求解双坡屋顶；非 `gable` 类型或尺寸无效时返回 `None`
pub fn solve_gable_roof(roof: &Roof, width_mm: f64, depth_mm: f64) -> Option<RoofGeometry> {
    if !roof.is_gable() {
        return None;
    }

    let pitch = roof.pitch_degrees.unwrap_or(DEFAULT_PITCH_DEGREES).to_radians();
    let overhang_mm = roof.overhang_mm.unwrap_or(DEFAULT_OVERHANG_MM);
    let offset = roof.ridge_offset_mm;

    let (span, names) = match roof.ridge_direction {
        RidgeDirection::X => (depth_mm, [RoofSideName::North, RoofSideName::South]),
        RidgeDirection::Y => (width_mm, [RoofSideName::West, RoofSideName::East]),
    };
    let dist_a = span / 2.0 + offset;
    let dist_b = span / 2.0 - offset;

    if !(dist_a > 0.0 && dist_b > 0.0) {
        tracing::warn!(
            "Ridge offset {} mm leaves no slope on a {} mm span",
            offset,
            span
        );
        return None;
    }

    let tan_p = pitch.tan();
    let (ridge_height_mm, side_a, side_b) = match roof.ridge_mode {
        RidgeMode::EqualPitch => {
            let ridge = tan_p * dist_a.max(dist_b);
            (
                ridge,
                (tan_p * dist_a, pitch),
                (tan_p * dist_b, pitch),
            )
        }
        RidgeMode::EqualEave => {
            let ridge = (tan_p * dist_a).max(tan_p * dist_b);
            (
                ridge,
                (ridge, (ridge / dist_a).atan()),
                (ridge, (ridge / dist_b).atan()),
            )
        }
    };

    let geometry = RoofGeometry {
        ridge_direction: roof.ridge_direction,
        ridge_mode: roof.ridge_mode,
        nominal_pitch_rad: pitch,
        overhang_mm,
        ridge_offset_mm: offset,
        width_mm,
        depth_mm,
        ridge_height_mm,
        sides: [
            RoofSide {
                side: names[0],
                distance_mm: dist_a,
                rise_mm: side_a.0,
                pitch_rad: side_a.1,
            },
            RoofSide {
                side: names[1],
                distance_mm: dist_b,
                rise_mm: side_b.0,
                pitch_rad: side_b.1,
            },
        ],
    };

    if !geometry.is_finite() {
        tracing::warn!("Roof geometry is not finite for pitch {} rad", pitch);
        return None;
    }
    Some(geometry)
}

impl RoofGeometry {
    fn is_finite(&self) -> bool {
        self.ridge_height_mm.is_finite()
            && self.overhang_mm.is_finite()
            && self
                .sides
                .iter()
                .all(|s| s.rise_mm.is_finite() && s.pitch_rad.is_finite())
    }

    /// 按朝向查找坡面
    pub fn side(&self, name: RoofSideName) -> Option<&RoofSide> {
        self.sides.iter().find(|s| s.side == name)
    }

    /// 屋脊标高；`top_mm` 为墙顶标高
    pub fn ridge_elevation_mm(&self, top_mm: f64) -> f64 {
        top_mm + self.ridge_height_mm
    }

    /// 檐口标高（墙外皮处）
    pub fn eave_elevation_mm(&self, side_index: usize, top_mm: f64) -> Option<f64> {
        let side = self.sides.get(side_index)?;
        Some(self.ridge_elevation_mm(top_mm) - side.rise_mm)
    }

    /// 墙外皮到屋脊的坡面长度
    pub fn slope_length_mm(&self, side_index: usize) -> Option<f64> {
        let side = self.sides.get(side_index)?;
        Some(side.distance_mm / side.pitch_rad.cos())
    }

    /// 挑檐部分的坡面长度
    pub fn overhang_slope_length_mm(&self, side_index: usize) -> Option<f64> {
        let side = self.sides.get(side_index)?;
        Some(self.overhang_mm / side.pitch_rad.cos())
    }

    /// 挑檐末端标高
    pub fn eave_with_overhang_elevation_mm(&self, side_index: usize, top_mm: f64) -> Option<f64> {
        let side = self.sides.get(side_index)?;
        let eave = self.eave_elevation_mm(side_index, top_mm)?;
        Some(eave - self.overhang_mm * side.pitch_rad.tan())
    }

    /// 该视图是否看到坡面（长边）
    pub fn is_viewing_slope(&self, view: ElevationView) -> bool {
        is_viewing_slope(self.ridge_direction, view)
    }

    /// 山墙立面的三角形，取自求解结果
    pub fn gable_end(&self) -> GableEnd {
        let ridge = self.ridge_elevation_mm(0.0);
        let lowest_tip = (0..self.sides.len())
            .filter_map(|i| self.eave_with_overhang_elevation_mm(i, 0.0))
            .fold(ridge, f64::min);
        GableEnd {
            rise_mm: ridge - lowest_tip,
            apex_offset_mm: self.ridge_offset_mm,
        }
    }

    /// 立面图中可见的坡面高差；看向山墙时为 0
    ///
    /// 从北看见的是南坡，反之亦然；东西同理。
    pub fn visible_rise_mm(&self, view: ElevationView) -> f64 {
        let name = match (self.ridge_direction, view) {
            (RidgeDirection::X, ElevationView::North) => RoofSideName::South,
            (RidgeDirection::X, ElevationView::South) => RoofSideName::North,
            (RidgeDirection::Y, ElevationView::East) => RoofSideName::West,
            (RidgeDirection::Y, ElevationView::West) => RoofSideName::East,
            _ => return 0.0,
        };
        self.side(name).map_or(0.0, |s| s.rise_mm)
    }
}

/// 屋脊方向与视图方向是否看向坡面
pub fn is_viewing_slope(ridge_direction: RidgeDirection, view: ElevationView) -> bool {
    matches!(
        (ridge_direction, view),
        (RidgeDirection::X, ElevationView::North | ElevationView::South)
            | (RidgeDirection::Y, ElevationView::East | ElevationView::West)
    )
}
