//! Proptest strategies for core types and player input.

use proptest::prelude::*;
use sahara_core::buildings::{BuildingKind, CellPos, GRID_SIZE};
use sahara_core::caravan::CaravanKind;
use sahara_core::hex::HexCoord;
use sahara_core::math::Fixed;
use sahara_core::resources::ResourceKind;
use sahara_core::tech::TechBranch;

use crate::fixtures::WorldAction;

/// Hex within a generous map range.
pub fn arb_hex() -> impl Strategy<Value = HexCoord> {
    (-500i32..500, -500i32..500).prop_map(|(q, r)| HexCoord::new(q, r))
}

/// Hex anywhere in the usable coordinate domain.
pub fn arb_any_hex() -> impl Strategy<Value = HexCoord> {
    let axis = -HexCoord::LIMIT..=HexCoord::LIMIT;
    (axis.clone(), axis).prop_map(|(q, r)| HexCoord::new(q, r))
}

/// Hex close to camp.
pub fn arb_near_hex() -> impl Strategy<Value = HexCoord> {
    (-12i32..=12, -12i32..=12).prop_map(|(q, r)| HexCoord::new(q, r))
}

/// Any caravan kind.
pub fn arb_caravan_kind() -> impl Strategy<Value = CaravanKind> {
    prop::sample::select(CaravanKind::ALL.to_vec())
}

/// Any resource.
pub fn arb_resource() -> impl Strategy<Value = ResourceKind> {
    prop::sample::select(ResourceKind::ALL.to_vec())
}

/// Any building kind.
pub fn arb_building_kind() -> impl Strategy<Value = BuildingKind> {
    prop::sample::select(BuildingKind::ALL.to_vec())
}

/// Any tech branch.
pub fn arb_branch() -> impl Strategy<Value = TechBranch> {
    prop::sample::select(TechBranch::ALL.to_vec())
}

/// Camp cell, including a band just outside the grid.
pub fn arb_cell() -> impl Strategy<Value = CellPos> {
    (-1i32..=GRID_SIZE, -1i32..=GRID_SIZE).prop_map(|(x, y)| CellPos::new(x, y))
}

/// Loot value, including the edges.
pub fn arb_loot_value() -> impl Strategy<Value = u32> {
    prop_oneof![Just(0u32), Just(u32::MAX), 0u32..20_000]
}

/// Generation rate in accumulator units per second.
pub fn arb_rate() -> impl Strategy<Value = Fixed> {
    (0i32..5_000).prop_map(|milli| Fixed::from_num(milli) / Fixed::from_num(1000))
}

/// Tick length, including the values the world must shrug off.
pub fn arb_dt() -> impl Strategy<Value = f64> {
    prop_oneof![
        4 => 0.0f64..3_600.0,
        1 => Just(f64::NAN),
        1 => Just(-10.0),
        1 => Just(1.0e9),
    ]
}

/// One player input.
pub fn arb_action() -> impl Strategy<Value = WorldAction> {
    prop_oneof![
        3 => arb_dt().prop_map(WorldAction::Tick),
        2 => arb_near_hex().prop_map(WorldAction::Scout),
        2 => (0usize..8, -5i64..60, prop::collection::vec(0usize..5, 0..4))
            .prop_map(|(target, squad, heroes)| WorldAction::Raid { target, squad, heroes }),
        2 => (arb_cell(), arb_building_kind()).prop_map(|(p, k)| WorldAction::Build(p, k)),
        1 => arb_cell().prop_map(WorldAction::Upgrade),
        1 => (arb_branch(), 0u8..5).prop_map(|(b, t)| WorldAction::Research(b, t)),
        1 => Just(WorldAction::Recruit),
    ]
}

/// A script of player inputs.
pub fn arb_action_sequence(max_len: usize) -> impl Strategy<Value = Vec<WorldAction>> {
    prop::collection::vec(arb_action(), 0..max_len)
}
