//! Integration tests for the constraint registry and its host binding.

use std::collections::BTreeSet;

use weft_math::Vec3;
use weft_mesh::generators::quad_grid;
use weft_mesh::TriangleMesh;
use weft_solver::{
    AnimationPose, ClothConfig, ClothConstraints, ClothSetup, ConstraintHost, ConstraintInit, ConstraintKind,
    ConstraintRule, EvolutionConfig, Formulation, ParticleBuffer, PbdEvolution, SharedPose, TetherMode, VolumeModel,
};
use weft_types::constants::DEFAULT_DT as DT;
use weft_types::{ParticleRange, WeftError, WeftResult};

fn grid() -> TriangleMesh {
    quad_grid(2, 2, 1.0, 1.0)
}

fn pinned_grid(mesh: &TriangleMesh, pinned: &[usize]) -> ParticleBuffer {
    let mut flags = vec![false; mesh.vertex_count()];
    for &i in pinned {
        flags[i] = true;
    }
    ParticleBuffer::from_mesh(mesh, 1.0, &flags).unwrap()
}

fn pose_of(mesh: &TriangleMesh) -> SharedPose {
    AnimationPose::new(mesh.positions(), vec![Vec3::Z; mesh.vertex_count()]).shared()
}

fn registry(mesh: &TriangleMesh) -> ClothConstraints {
    ClothConstraints::new(ParticleRange::new(0, mesh.vertex_count()), pose_of(mesh))
}

fn host(particles: ParticleBuffer) -> PbdEvolution {
    PbdEvolution::new(particles, EvolutionConfig::debug())
}

// ─── Slot counting ────────────────────────────────────────────

#[test]
fn slot_counts_match_installed_closures() {
    let mesh = grid();
    let particles = pinned_grid(&mesh, &[0, 2]);
    let setup = ClothSetup::from_mesh(&mesh);
    let mut cloth = registry(&mesh);

    cloth.set_edge_constraints(&particles, &setup.surface_elements, 1.0, false).unwrap();
    cloth.set_bending_constraints(&particles, &setup.bending_edges, 0.5, true).unwrap();
    cloth.set_area_constraints(&particles, &setup.surface_elements, 1.0, false).unwrap();
    cloth
        .set_long_range_constraints(&particles, &setup.neighbor_map, 1.0, 1.0, TetherMode::Geodesic, true)
        .unwrap();
    cloth
        .set_self_collision_constraints(&setup.surface_elements, &BTreeSet::new(), 0.01)
        .unwrap();

    assert_eq!(cloth.num_constraint_inits(), 3);
    assert_eq!(cloth.num_constraint_rules(), 5);

    let mut evolution = host(particles);
    cloth.create_rules(&mut evolution).unwrap();
    assert_eq!(evolution.init_slot_count(), 3);
    assert_eq!(evolution.rule_slot_count(), 5);

    let range = cloth.host_range().unwrap();
    assert_eq!(range.init_offset, Some(0));
    assert_eq!(range.rule_offset, 0);
}

#[test]
fn standard_only_registry_allocates_no_init_range() {
    let mesh = grid();
    let particles = pinned_grid(&mesh, &[]);
    let mut cloth = registry(&mesh);
    cloth.set_edge_constraints(&particles, &mesh.triangles(), 1.0, false).unwrap();

    let mut evolution = host(particles);
    cloth.create_rules(&mut evolution).unwrap();
    assert_eq!(cloth.host_range().unwrap().init_offset, None);
    assert_eq!(evolution.init_slot_count(), 0);
    assert_eq!(evolution.rule_slot_count(), 1);
}

#[test]
fn reregistration_replaces_the_slot() {
    let mesh = grid();
    let particles = pinned_grid(&mesh, &[]);
    let mut cloth = registry(&mesh);

    cloth.set_edge_constraints(&particles, &mesh.triangles(), 1.0, false).unwrap();
    assert_eq!(cloth.slots()[0].len, 16);

    cloth.set_edge_constraints(&particles, &[[3, 4, 6]], 0.5, true).unwrap();
    let slots = cloth.slots();
    assert_eq!(slots.len(), 1);
    assert_eq!(slots[0].kind, ConstraintKind::EdgeDistance);
    assert_eq!(slots[0].formulation, Formulation::Extended);
    assert_eq!(slots[0].len, 3);
    assert_eq!(cloth.num_constraint_rules(), 1);
    assert_eq!(cloth.num_constraint_inits(), 1);

    cloth.set_edge_constraints(&particles, &mesh.triangles(), 1.0, false).unwrap();
    assert_eq!(cloth.num_constraint_inits(), 0);
}

#[test]
fn replacement_keeps_registration_position() {
    let mesh = grid();
    let particles = pinned_grid(&mesh, &[]);
    let setup = ClothSetup::from_mesh(&mesh);
    let mut cloth = registry(&mesh);

    cloth.set_edge_constraints(&particles, &setup.surface_elements, 1.0, false).unwrap();
    cloth.set_bending_constraints(&particles, &setup.bending_edges, 0.5, false).unwrap();
    cloth.set_edge_constraints(&particles, &setup.surface_elements, 0.8, false).unwrap();

    assert_eq!(
        cloth.rule_kinds(),
        vec![ConstraintKind::EdgeDistance, ConstraintKind::BendingSpring]
    );
}

#[test]
fn fully_kinematic_topology_still_counts_one_rule() {
    let mesh = grid();
    let all: Vec<usize> = (0..mesh.vertex_count()).collect();
    let particles = pinned_grid(&mesh, &all);
    let mut cloth = registry(&mesh);

    cloth.set_edge_constraints(&particles, &mesh.triangles(), 1.0, false).unwrap();
    assert_eq!(cloth.slots()[0].len, 0);
    assert_eq!(cloth.num_constraint_rules(), 1);

    let before: Vec<Vec3> = (0..particles.len()).map(|i| particles.position(i)).collect();
    let mut evolution = host(particles);
    cloth.create_rules(&mut evolution).unwrap();
    cloth.enable(&mut evolution, true).unwrap();
    evolution.apply_rules(DT);

    for (i, p) in before.iter().enumerate() {
        assert_eq!(evolution.particles().position(i), *p);
    }
}

// ─── Ordering ─────────────────────────────────────────────────

#[test]
fn rule_order_follows_registration_regardless_of_init() {
    let mesh = grid();
    let particles = pinned_grid(&mesh, &[]);
    let mut cloth = registry(&mesh);

    cloth
        .set_self_collision_constraints(&mesh.triangles(), &BTreeSet::new(), 0.01)
        .unwrap();
    cloth.set_shape_target_constraints(0.5).unwrap();
    cloth.set_edge_constraints(&particles, &mesh.triangles(), 1.0, true).unwrap();

    assert_eq!(
        cloth.rule_kinds(),
        vec![
            ConstraintKind::SelfCollisionSpring,
            ConstraintKind::ShapeTarget,
            ConstraintKind::EdgeDistance
        ]
    );
    assert_eq!(
        cloth.init_kinds(),
        vec![ConstraintKind::SelfCollisionSpring, ConstraintKind::EdgeDistance]
    );
}

/// Runs one rule sweep over two free particles with a spring and a shape
/// target registered in the given order.
fn two_particle_sweep(spring_first: bool) -> (Vec3, Vec3) {
    let particles = ParticleBuffer::new(vec![Vec3::ZERO, Vec3::X], &[1.0, 1.0]).unwrap();
    let pose = AnimationPose::new(vec![Vec3::ZERO, Vec3::new(3.0, 0.0, 0.0)], vec![Vec3::Y; 2]).shared();
    let mut cloth = ClothConstraints::new(ParticleRange::new(0, 2), pose);

    if spring_first {
        cloth.set_bending_constraints(&particles, &[[0, 1]], 1.0, false).unwrap();
        cloth.set_shape_target_constraints(0.5).unwrap();
    } else {
        cloth.set_shape_target_constraints(0.5).unwrap();
        cloth.set_bending_constraints(&particles, &[[0, 1]], 1.0, false).unwrap();
    }

    let mut evolution = host(particles);
    cloth.create_rules(&mut evolution).unwrap();
    cloth.enable(&mut evolution, true).unwrap();
    evolution.apply_rules(DT);
    (evolution.particles().position(0), evolution.particles().position(1))
}

#[test]
fn registration_order_changes_the_result() {
    // Spring already at rest, then the shape pull.
    let (a0, a1) = two_particle_sweep(true);
    assert!((a0 - Vec3::ZERO).length() < 1e-6);
    assert!((a1 - Vec3::new(2.0, 0.0, 0.0)).length() < 1e-6);

    // Shape pull stretches the spring, which then splits the correction.
    let (b0, b1) = two_particle_sweep(false);
    assert!((b0 - Vec3::new(0.5, 0.0, 0.0)).length() < 1e-6);
    assert!((b1 - Vec3::new(1.5, 0.0, 0.0)).length() < 1e-6);
}

// ─── Lifecycle assertions ─────────────────────────────────────

#[test]
#[should_panic(expected = "create_rules must only be called once")]
fn create_rules_twice_panics() {
    let mesh = grid();
    let particles = pinned_grid(&mesh, &[]);
    let mut cloth = registry(&mesh);
    cloth.set_edge_constraints(&particles, &mesh.triangles(), 1.0, false).unwrap();

    let mut evolution = host(particles);
    cloth.create_rules(&mut evolution).unwrap();
    let _ = cloth.create_rules(&mut evolution);
}

#[test]
#[should_panic(expected = "no constraints registered")]
fn create_rules_with_nothing_registered_panics() {
    let mesh = grid();
    let mut cloth = registry(&mesh);
    let mut evolution = host(pinned_grid(&mesh, &[]));
    let _ = cloth.create_rules(&mut evolution);
}

#[test]
#[should_panic(expected = "Stiffness must lie in (0, 1]")]
fn zero_stiffness_panics() {
    let mesh = grid();
    let particles = pinned_grid(&mesh, &[]);
    let mut cloth = registry(&mesh);
    let _ = cloth.set_edge_constraints(&particles, &mesh.triangles(), 0.0, false);
}

#[test]
#[should_panic(expected = "Stiffness must lie in (0, 1]")]
fn stiffness_above_one_panics() {
    let mesh = grid();
    let mut cloth = registry(&mesh);
    let _ = cloth.set_shape_target_constraints(1.5);
}

#[test]
#[should_panic(expected = "Constraints cannot be registered after create_rules")]
fn registration_after_create_rules_panics() {
    let mesh = grid();
    let particles = pinned_grid(&mesh, &[]);
    let mut cloth = registry(&mesh);
    cloth.set_edge_constraints(&particles, &mesh.triangles(), 1.0, false).unwrap();

    let mut evolution = host(particles.clone());
    cloth.create_rules(&mut evolution).unwrap();
    let _ = cloth.set_area_constraints(&particles, &mesh.triangles(), 1.0, false);
}

#[test]
#[should_panic(expected = "enable called before create_rules")]
fn enable_before_create_rules_panics() {
    let mesh = grid();
    let particles = pinned_grid(&mesh, &[]);
    let mut cloth = registry(&mesh);
    cloth.set_edge_constraints(&particles, &mesh.triangles(), 1.0, false).unwrap();

    let mut evolution = host(particles);
    let _ = cloth.enable(&mut evolution, true);
}

// ─── Data errors ──────────────────────────────────────────────

#[test]
fn index_outside_range_is_rejected() {
    let mesh = grid();
    let particles = pinned_grid(&mesh, &[]);
    let mut cloth = ClothConstraints::new(ParticleRange::new(0, 4), pose_of(&mesh));

    let result = cloth.set_edge_constraints(&particles, &[[0, 1, 7]], 1.0, false);
    assert!(matches!(result, Err(WeftError::InvalidTopology(_))));
    assert_eq!(cloth.num_constraint_rules(), 0);
}

#[test]
fn weight_map_length_is_checked() {
    let mesh = grid();
    let mut cloth = registry(&mesh);

    let result = cloth.set_maximum_distance_constraints(&[1.0; 3]);
    assert!(matches!(result, Err(WeftError::InvalidParameter(_))));

    let result = cloth.set_backstop_constraints(&[0.0; 9], &[1.0; 8], false);
    assert!(matches!(result, Err(WeftError::InvalidParameter(_))));
}

#[test]
fn short_pose_is_rejected() {
    let mesh = grid();
    let pose = AnimationPose::new(vec![Vec3::ZERO; 4], vec![Vec3::Z; 4]).shared();
    let mut cloth = ClothConstraints::new(ParticleRange::new(0, mesh.vertex_count()), pose);

    let result = cloth.set_anim_drive_constraints(&[1.0; 9]);
    assert!(matches!(result, Err(WeftError::InvalidParameter(_))));
}

#[test]
fn nonpositive_thickness_is_rejected() {
    let mesh = grid();
    let mut cloth = registry(&mesh);
    let result = cloth.set_self_collision_constraints(&mesh.triangles(), &BTreeSet::new(), 0.0);
    assert!(matches!(result, Err(WeftError::InvalidParameter(_))));
}

#[test]
fn range_larger_than_buffer_is_rejected() {
    let mesh = grid();
    let particles = pinned_grid(&mesh, &[]);
    let mut cloth = ClothConstraints::new(ParticleRange::new(4, 9), pose_of(&mesh));
    let result = cloth.set_edge_constraints(&particles, &[[4, 5, 6]], 1.0, false);
    assert!(matches!(result, Err(WeftError::InvalidParameter(_))));
}

// ─── Enable and live parameters ───────────────────────────────

#[test]
fn enable_toggles_both_ranges() {
    let mesh = grid();
    let particles = pinned_grid(&mesh, &[0]);
    let mut cloth = registry(&mesh);
    cloth.set_edge_constraints(&particles, &mesh.triangles(), 1.0, true).unwrap();

    let mut evolution = host(particles);
    cloth.create_rules(&mut evolution).unwrap();
    let range = cloth.host_range().unwrap();
    let init_offset = range.init_offset.unwrap();

    assert_eq!(evolution.is_init_range_active(init_offset), Some(false));
    assert_eq!(evolution.is_rule_range_active(range.rule_offset), Some(false));

    cloth.enable(&mut evolution, true).unwrap();
    assert_eq!(evolution.is_init_range_active(init_offset), Some(true));
    assert_eq!(evolution.is_rule_range_active(range.rule_offset), Some(true));

    cloth.enable(&mut evolution, false).unwrap();
    assert_eq!(evolution.is_init_range_active(init_offset), Some(false));
    assert_eq!(evolution.is_rule_range_active(range.rule_offset), Some(false));
}

#[test]
fn sphere_radii_multiplier_is_applied_live() {
    let particles = ParticleBuffer::new(vec![Vec3::ZERO], &[1.0]).unwrap();
    let pose = AnimationPose::new(vec![Vec3::ZERO], vec![Vec3::Y]).shared();
    let mut cloth = ClothConstraints::new(ParticleRange::new(0, 1), pose);
    cloth.set_maximum_distance_constraints(&[1.0]).unwrap();

    let mut evolution = host(particles);
    cloth.create_rules(&mut evolution).unwrap();
    cloth.enable(&mut evolution, true).unwrap();

    cloth.set_sphere_radii_multiplier(2.0);
    evolution.particles_mut().set_position(0, Vec3::new(5.0, 0.0, 0.0));
    evolution.apply_rules(DT);
    assert!((evolution.particles().position(0) - Vec3::new(2.0, 0.0, 0.0)).length() < 1e-6);

    // Clamped to zero at the update site, not at the setter.
    cloth.set_sphere_radii_multiplier(-1.0);
    assert_eq!(cloth.sphere_radii_multiplier(), -1.0);
    evolution.apply_rules(DT);
    assert!(evolution.particles().position(0).length() < 1e-6);
}

#[test]
fn anim_drive_stiffness_is_applied_live() {
    let particles = ParticleBuffer::new(vec![Vec3::new(2.0, 0.0, 0.0)], &[1.0]).unwrap();
    let pose = AnimationPose::new(vec![Vec3::ZERO], vec![Vec3::Y]).shared();
    let mut cloth = ClothConstraints::new(ParticleRange::new(0, 1), pose);
    cloth.set_anim_drive_constraints(&[1.0]).unwrap();

    let mut evolution = host(particles);
    cloth.create_rules(&mut evolution).unwrap();
    cloth.enable(&mut evolution, true).unwrap();

    // Default stiffness is zero.
    evolution.apply_rules(DT);
    assert_eq!(evolution.particles().position(0), Vec3::new(2.0, 0.0, 0.0));

    cloth.set_anim_drive_spring_stiffness(0.5);
    evolution.apply_rules(DT);
    assert!((evolution.particles().position(0) - Vec3::X).length() < 1e-6);

    cloth.set_anim_drive_spring_stiffness(4.0);
    evolution.apply_rules(DT);
    assert!(evolution.particles().position(0).length() < 1e-6);
}

#[test]
fn animated_pose_updates_reach_constraints() {
    let particles = ParticleBuffer::new(vec![Vec3::ZERO], &[1.0]).unwrap();
    let pose = AnimationPose::new(vec![Vec3::ZERO], vec![Vec3::Y]).shared();
    let mut cloth = ClothConstraints::new(ParticleRange::new(0, 1), pose);
    cloth.set_shape_target_constraints(1.0).unwrap();

    let mut evolution = host(particles);
    cloth.create_rules(&mut evolution).unwrap();
    cloth.enable(&mut evolution, true).unwrap();

    cloth.pose().borrow_mut().positions[0] = Vec3::new(0.0, 2.0, 0.0);
    evolution.apply_rules(DT);
    assert!((evolution.particles().position(0) - Vec3::new(0.0, 2.0, 0.0)).length() < 1e-6);
}

// ─── Configure ────────────────────────────────────────────────

#[test]
fn configure_registers_in_canonical_order() {
    let mesh = grid();
    let n = mesh.vertex_count();
    let particles = pinned_grid(&mesh, &[0, 2]);
    let setup = ClothSetup::from_mesh(&mesh)
        .with_max_distances(vec![1.0; n])
        .with_backstop(vec![0.0; n], vec![0.5; n])
        .with_anim_drive_multipliers(vec![1.0; n]);
    let config = ClothConfig {
        area_stiffness: Some(1.0),
        volume_stiffness: Some(0.5),
        volume_model: VolumeModel::ThinShell,
        shape_target_stiffness: Some(0.1),
        self_collision_thickness: Some(0.01),
        anim_drive_stiffness: 0.3,
        ..Default::default()
    };

    let mut cloth = registry(&mesh);
    cloth.configure(&particles, &setup, &config).unwrap();

    assert_eq!(
        cloth.rule_kinds(),
        vec![
            ConstraintKind::EdgeDistance,
            ConstraintKind::BendingSpring,
            ConstraintKind::AreaSpring,
            ConstraintKind::VolumeThinShell,
            ConstraintKind::LongRangeTether,
            ConstraintKind::MaxDistanceSphere,
            ConstraintKind::BackstopSphere,
            ConstraintKind::AnimDrive,
            ConstraintKind::ShapeTarget,
            ConstraintKind::SelfCollisionSpring,
        ]
    );
    assert_eq!(cloth.init_kinds(), vec![ConstraintKind::SelfCollisionSpring]);
    assert_eq!(cloth.anim_drive_spring_stiffness(), 0.3);
}

#[test]
fn configure_rejects_invalid_config() {
    let mesh = grid();
    let particles = pinned_grid(&mesh, &[]);
    let config = ClothConfig {
        edge_stiffness: Some(2.0),
        ..Default::default()
    };

    let mut cloth = registry(&mesh);
    let result = cloth.configure(&particles, &ClothSetup::from_mesh(&mesh), &config);
    assert!(matches!(result, Err(WeftError::InvalidConfig(_))));
    assert_eq!(cloth.num_constraint_rules(), 0);
}

#[test]
fn two_cloths_share_one_host() {
    let mesh = grid();
    let n = mesh.vertex_count();
    let mut positions = mesh.positions();
    positions.extend(mesh.positions().into_iter().map(|p| p + Vec3::new(5.0, 0.0, 0.0)));
    let particles = ParticleBuffer::new(positions, &vec![1.0; 2 * n]).unwrap();
    let pose = AnimationPose::new(vec![Vec3::ZERO; 2 * n], vec![Vec3::Z; 2 * n]).shared();

    let first_setup = ClothSetup::from_mesh(&mesh);
    let second_setup = ClothSetup::from_mesh(&mesh).with_offset(n as u32);
    let config = ClothConfig::debug();

    let mut first = ClothConstraints::new(ParticleRange::new(0, n), pose.clone());
    let mut second = ClothConstraints::new(ParticleRange::new(n, n), pose);
    first.configure(&particles, &first_setup, &config).unwrap();
    second.configure(&particles, &second_setup, &config).unwrap();

    let mut evolution = host(particles);
    first.create_rules(&mut evolution).unwrap();
    second.create_rules(&mut evolution).unwrap();
    assert_eq!(first.host_range().unwrap().rule_offset, 0);
    assert_eq!(second.host_range().unwrap().rule_offset, 1);

    first.enable(&mut evolution, true).unwrap();
    assert_eq!(evolution.apply_rules(DT), 1);

    second.enable(&mut evolution, true).unwrap();
    first.enable(&mut evolution, false).unwrap();
    assert_eq!(evolution.apply_rules(DT), 1);
}

#[test]
fn host_rejects_unknown_range() {
    let mesh = grid();
    let mut evolution = host(pinned_grid(&mesh, &[]));
    let result = evolution.activate_constraint_rule_range(3, true);
    assert!(matches!(result, Err(WeftError::HostRange(_))));

    let result = evolution.set_constraint_rule(0, Box::new(|_: &mut ParticleBuffer, _: f32| {}));
    assert!(matches!(result, Err(WeftError::HostRange(_))));
}

/// Host that hands out ranges but refuses every rule closure.
#[derive(Default)]
struct RejectingHost {
    ranges_allocated: usize,
}

impl ConstraintHost for RejectingHost {
    fn add_constraint_init_range(&mut self, _count: usize, _active: bool) -> WeftResult<usize> {
        self.ranges_allocated += 1;
        Ok(0)
    }

    fn add_constraint_rule_range(&mut self, _count: usize, _active: bool) -> WeftResult<usize> {
        self.ranges_allocated += 1;
        Ok(0)
    }

    fn set_constraint_init(&mut self, _index: usize, _init: ConstraintInit) -> WeftResult<()> {
        Ok(())
    }

    fn set_constraint_rule(&mut self, index: usize, _rule: ConstraintRule) -> WeftResult<()> {
        Err(WeftError::HostRange(format!("Rule slot {index} is locked")))
    }

    fn activate_constraint_init_range(&mut self, _offset: usize, _active: bool) -> WeftResult<()> {
        Ok(())
    }

    fn activate_constraint_rule_range(&mut self, _offset: usize, _active: bool) -> WeftResult<()> {
        Ok(())
    }
}

#[test]
fn failed_create_rules_cannot_be_retried() {
    let mesh = grid();
    let particles = pinned_grid(&mesh, &[]);
    let mut cloth = registry(&mesh);
    cloth.set_edge_constraints(&particles, &mesh.triangles(), 1.0, false).unwrap();

    let mut rejecting = RejectingHost::default();
    let result = cloth.create_rules(&mut rejecting);
    assert!(matches!(result, Err(WeftError::HostRange(_))));
    assert_eq!(cloth.host_range(), None);
    assert_eq!(rejecting.ranges_allocated, 1);

    let retry = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| cloth.create_rules(&mut rejecting)));
    assert!(retry.is_err());
    assert_eq!(rejecting.ranges_allocated, 1);
}

#[test]
#[should_panic(expected = "Constraints cannot be registered after create_rules")]
fn registration_after_failed_create_rules_panics() {
    let mesh = grid();
    let particles = pinned_grid(&mesh, &[]);
    let mut cloth = registry(&mesh);
    cloth.set_edge_constraints(&particles, &mesh.triangles(), 1.0, false).unwrap();

    let _ = cloth.create_rules(&mut RejectingHost::default());
    cloth.set_shape_target_constraints(0.5).unwrap();
}
