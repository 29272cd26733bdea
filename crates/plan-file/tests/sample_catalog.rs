//! 随仓库发布的示例文档：全部可加载、可派生墙体且通过校验

use plan_core::prelude::*;
use plan_file::{SampleCatalog, DEFAULT_SAMPLE};
use std::path::PathBuf;

fn catalog() -> SampleCatalog {
    SampleCatalog::new(PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("../../samples"))
}

fn load(key: &str) -> BuildingPlan {
    let mut plan = catalog()
        .load(Some(key))
        .unwrap_or_else(|e| panic!("sample {key}: {e}"));
    regenerate_all(&mut plan);
    plan
}

#[test]
fn test_all_samples_are_valid() {
    for key in SampleCatalog::keys() {
        let plan = load(key);
        assert!(!plan.levels().is_empty(), "sample {key} has no levels");
        let errors = validate(&plan);
        assert!(errors.is_empty(), "sample {key}: {errors:?}");
    }
}

#[test]
fn test_default_sample() {
    let plan = catalog().load(None).unwrap();
    assert_eq!(DEFAULT_SAMPLE, "v0.3");
    assert_eq!(plan.levels().len(), 2);
    assert!(plan.roof.as_ref().is_some_and(Roof::is_gable));
}

#[test]
fn test_block_samples_have_block_levels() {
    for (key, blocks) in [("v0.4-L", 2), ("v0.4-T", 2), ("v0.4-H", 3)] {
        let plan = load(key);
        assert_eq!(plan.body_kind(), BodyKind::Blocks);
        assert_eq!(plan.blocks().unwrap().len(), blocks);
        assert!(plan.levels().iter().all(|l| l.block_id.is_some()));
    }
}

#[test]
fn test_rooms_first_sample_walls() {
    let plan = load("v0.5");
    assert_eq!(plan.walls_for_level("L1").len(), 3);
    assert_eq!(plan.walls_for_level("L2").len(), 1);

    let ground = plan.find_floor(None, "L1").unwrap();
    assert_eq!(ground.wall.unwrap().thickness_mm, 250.0);
    assert_eq!(ground.stairs.len(), 1);
}

#[test]
fn test_two_unit_sample_walls() {
    let plan = load("v1");
    let walls = plan.walls_for_level("f1");
    assert_eq!(walls.len(), 4);
    let between = walls
        .iter()
        .filter(|w| w.wall_type == WallType::BetweenUnits)
        .count();
    assert_eq!(between, 2);
    assert_eq!(plan.walls_for_level("f2")[0].wall_type, WallType::BetweenUnits);
}

#[test]
fn test_asymmetric_samples() {
    let pitch = load("v0.3-asym-pitch");
    let eave = load("v0.3-asym-eave");
    let solve = |plan: &BuildingPlan| {
        solve_gable_roof(plan.roof.as_ref().unwrap(), 10000.0, 8000.0).unwrap()
    };

    let geom = solve(&pitch);
    assert!((geom.sides[0].pitch_rad - geom.sides[1].pitch_rad).abs() < 1e-9);
    assert!(geom.sides[0].rise_mm != geom.sides[1].rise_mm);

    let geom = solve(&eave);
    assert!((geom.sides[0].rise_mm - geom.sides[1].rise_mm).abs() < 1e-9);
    assert!(geom.sides[0].pitch_rad != geom.sides[1].pitch_rad);
}
