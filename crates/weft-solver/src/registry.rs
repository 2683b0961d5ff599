//! Constraint registry: one per cloth.
//!
//! The registry turns topology and weight maps into constraint instances,
//! keeps them in registration order, and installs them into the host's
//! callback ranges exactly once.
//!
//! ```text
//! let mut cloth = ClothConstraints::new(range, pose);
//! cloth.set_edge_constraints(particles, &triangles, 1.0, false)?;
//! cloth.set_long_range_constraints(particles, &neighbors, 1.0, 1.0, TetherMode::Geodesic, false)?;
//! cloth.create_rules(&mut host)?;
//! cloth.enable(&mut host, true)?;
//! ```
//!
//! Setting the same family twice replaces its slot in place. Registration
//! errors caused by data (indices, array lengths, pose size) are returned as
//! [`WeftError`]; misuse of the lifecycle (bad stiffness, building twice,
//! registering after building) panics.

use std::cell::RefCell;
use std::collections::{BTreeMap, BTreeSet};
use std::rc::Rc;

use serde::{Deserialize, Serialize};
use tracing::{debug, info};
use weft_types::{ParticleRange, WeftError, WeftResult};

use crate::config::{BendingModel, ClothConfig, VolumeModel};
use crate::constraint::{ClothConstraint, ConstraintKind, Formulation, LiveParameter, SharedConstraint, SharedPose};
use crate::constraints::{
    AnimDriveConstraint, AxialSpringConstraints, BendingElementConstraints, LongRangeConstraints,
    SelfCollisionConstraints, ShapeConstraints, SphericalBackstopConstraint, SphericalConstraint, SpringConstraints,
    TetherMode, VolumeConstraint,
};
use crate::host::{ConstraintHost, HostRange};
use crate::particles::ParticleBuffer;
use crate::setup::ClothSetup;

/// Summary of one registered family.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SlotInfo {
    pub kind: ConstraintKind,
    pub formulation: Formulation,
    pub has_init: bool,
    /// Active tuples after kinematic stripping.
    pub len: usize,
}

struct ConstraintSlot {
    kind: ConstraintKind,
    formulation: Formulation,
    has_init: bool,
    constraint: SharedConstraint,
}

/// The constraints of one cloth, bound to a particle range and an animation pose.
pub struct ClothConstraints {
    range: ParticleRange,
    pose: SharedPose,
    slots: Vec<ConstraintSlot>,
    num_constraint_inits: usize,
    num_constraint_rules: usize,
    /// Set as soon as `create_rules` starts talking to a host, even if it fails.
    rules_requested: bool,
    host_range: Option<HostRange>,
    sphere_radii_multiplier: LiveParameter,
    anim_drive_stiffness: LiveParameter,
}

impl ClothConstraints {
    /// Bind a registry to `range`. The pose is indexed by global particle index.
    pub fn new(range: ParticleRange, pose: SharedPose) -> Self {
        Self {
            range,
            pose,
            slots: Vec::new(),
            num_constraint_inits: 0,
            num_constraint_rules: 0,
            rules_requested: false,
            host_range: None,
            sphere_radii_multiplier: LiveParameter::new(1.0),
            anim_drive_stiffness: LiveParameter::new(0.0),
        }
    }

    // ─── Registration ───

    /// Distance springs along every unique edge of the surface triangles.
    pub fn set_edge_constraints(
        &mut self,
        particles: &ParticleBuffer,
        surface_elements: &[[u32; 3]],
        stiffness: f32,
        use_xpbd: bool,
    ) -> WeftResult<()> {
        self.begin_registration(stiffness);
        self.check_particles(particles)?;
        self.check_indices(surface_elements.iter().flatten(), "surface element")?;

        let springs = SpringConstraints::from_surface_elements(
            particles,
            surface_elements,
            stiffness,
            Formulation::from_extended(use_xpbd),
            true,
        );
        let stripped = springs.stripped_count();
        self.insert_slot(ConstraintKind::EdgeDistance, springs, stripped);
        Ok(())
    }

    /// Distance springs across the wing vertices of each interior edge.
    pub fn set_bending_constraints(
        &mut self,
        particles: &ParticleBuffer,
        bending_edges: &[[u32; 2]],
        stiffness: f32,
        use_xpbd: bool,
    ) -> WeftResult<()> {
        self.begin_registration(stiffness);
        self.check_particles(particles)?;
        self.check_indices(bending_edges.iter().flatten(), "bending edge")?;

        let springs =
            SpringConstraints::new(particles, bending_edges, stiffness, Formulation::from_extended(use_xpbd), true);
        let stripped = springs.stripped_count();
        self.insert_slot(ConstraintKind::BendingSpring, springs, stripped);
        Ok(())
    }

    /// Dihedral bending elements `[v0, v1, wing_a, wing_b]`. Always standard.
    pub fn set_bending_element_constraints(
        &mut self,
        particles: &ParticleBuffer,
        bending_elements: &[[u32; 4]],
        stiffness: f32,
    ) -> WeftResult<()> {
        self.begin_registration(stiffness);
        self.check_particles(particles)?;
        self.check_indices(bending_elements.iter().flatten(), "bending element")?;

        let elements = BendingElementConstraints::new(particles, bending_elements, stiffness);
        let stripped = elements.stripped_count();
        self.insert_slot(ConstraintKind::BendingElement, elements, stripped);
        Ok(())
    }

    /// Axial area springs, one per surface triangle.
    pub fn set_area_constraints(
        &mut self,
        particles: &ParticleBuffer,
        surface_elements: &[[u32; 3]],
        stiffness: f32,
        use_xpbd: bool,
    ) -> WeftResult<()> {
        self.begin_registration(stiffness);
        self.check_particles(particles)?;
        self.check_indices(surface_elements.iter().flatten(), "surface element")?;

        let springs =
            AxialSpringConstraints::new(particles, surface_elements, stiffness, Formulation::from_extended(use_xpbd));
        let stripped = springs.stripped_count();
        self.insert_slot(ConstraintKind::AreaSpring, springs, stripped);
        Ok(())
    }

    /// Thin-shell volume: distance springs across double bending edges.
    pub fn set_thin_shell_volume_constraints(
        &mut self,
        particles: &ParticleBuffer,
        double_bending_edges: &[[u32; 2]],
        stiffness: f32,
        use_xpbd: bool,
    ) -> WeftResult<()> {
        self.begin_registration(stiffness);
        self.check_particles(particles)?;
        self.check_indices(double_bending_edges.iter().flatten(), "double bending edge")?;

        let springs = SpringConstraints::new(
            particles,
            double_bending_edges,
            stiffness,
            Formulation::from_extended(use_xpbd),
            true,
        );
        let stripped = springs.stripped_count();
        self.insert_slot(ConstraintKind::VolumeThinShell, springs, stripped);
        Ok(())
    }

    /// Enclosed volume of a closed surface.
    pub fn set_volume_constraints(
        &mut self,
        particles: &ParticleBuffer,
        surface_elements: &[[u32; 3]],
        stiffness: f32,
    ) -> WeftResult<()> {
        self.begin_registration(stiffness);
        self.check_particles(particles)?;
        self.check_indices(surface_elements.iter().flatten(), "surface element")?;

        let volume = VolumeConstraint::new(particles, surface_elements, stiffness);
        self.insert_slot(ConstraintKind::VolumeTet, volume, 0);
        Ok(())
    }

    /// Tethers from dynamic particles to up to four kinematic islands.
    pub fn set_long_range_constraints(
        &mut self,
        particles: &ParticleBuffer,
        neighbor_map: &BTreeMap<u32, BTreeSet<u32>>,
        stiffness: f32,
        limit_scale: f32,
        mode: TetherMode,
        use_xpbd: bool,
    ) -> WeftResult<()> {
        self.begin_registration(stiffness);
        self.check_particles(particles)?;
        self.check_indices(
            neighbor_map.iter().flat_map(|(v, ring)| std::iter::once(v).chain(ring)),
            "neighbour map",
        )?;
        if !(limit_scale.is_finite() && limit_scale > 0.0) {
            return Err(WeftError::InvalidParameter(format!(
                "Tether limit scale must be positive, got {limit_scale}"
            )));
        }

        let tethers = LongRangeConstraints::new(
            particles,
            neighbor_map,
            stiffness,
            limit_scale,
            mode,
            Formulation::from_extended(use_xpbd),
        );
        self.insert_slot(ConstraintKind::LongRangeTether, tethers, 0);
        Ok(())
    }

    /// Per-particle maximum distance from the animated position.
    ///
    /// The radii are scaled by the live multiplier set through
    /// [`Self::set_sphere_radii_multiplier`].
    pub fn set_maximum_distance_constraints(&mut self, max_distances: &[f32]) -> WeftResult<()> {
        self.begin_registration(1.0);
        self.check_weight_map(max_distances, "max distance")?;
        self.check_pose()?;

        let spheres = SphericalConstraint::new(
            self.range,
            Rc::clone(&self.pose),
            max_distances.to_vec(),
            self.sphere_radii_multiplier.clone(),
        );
        self.insert_slot(ConstraintKind::MaxDistanceSphere, spheres, 0);
        Ok(())
    }

    /// Backstop spheres behind the animated surface.
    pub fn set_backstop_constraints(
        &mut self,
        distances: &[f32],
        radii: &[f32],
        use_legacy_backstop: bool,
    ) -> WeftResult<()> {
        self.begin_registration(1.0);
        self.check_weight_map(distances, "backstop distance")?;
        self.check_weight_map(radii, "backstop radius")?;
        self.check_pose()?;

        let backstop = SphericalBackstopConstraint::new(
            self.range,
            Rc::clone(&self.pose),
            distances.to_vec(),
            radii.to_vec(),
            use_legacy_backstop,
        );
        self.insert_slot(ConstraintKind::BackstopSphere, backstop, 0);
        Ok(())
    }

    /// Soft drive toward the animated pose, scaled per particle.
    ///
    /// The overall stiffness is the live value set through
    /// [`Self::set_anim_drive_spring_stiffness`].
    pub fn set_anim_drive_constraints(&mut self, multipliers: &[f32]) -> WeftResult<()> {
        self.begin_registration(1.0);
        self.check_weight_map(multipliers, "anim drive multiplier")?;
        self.check_pose()?;

        let drive = AnimDriveConstraint::new(
            self.range,
            Rc::clone(&self.pose),
            multipliers.to_vec(),
            self.anim_drive_stiffness.clone(),
        );
        self.insert_slot(ConstraintKind::AnimDrive, drive, 0);
        Ok(())
    }

    /// Pull toward the pose positions with a fixed stiffness.
    pub fn set_shape_target_constraints(&mut self, stiffness: f32) -> WeftResult<()> {
        self.begin_registration(stiffness);
        self.check_pose()?;

        let shape = ShapeConstraints::new(self.range, Rc::clone(&self.pose), stiffness);
        self.insert_slot(ConstraintKind::ShapeTarget, shape, 0);
        Ok(())
    }

    /// Self-collision between particles of the range closer than `thickness`.
    ///
    /// Particles sharing a triangle, and every pair in `disabled_pairs`
    /// (unordered), never collide.
    pub fn set_self_collision_constraints(
        &mut self,
        triangles: &[[u32; 3]],
        disabled_pairs: &BTreeSet<[u32; 2]>,
        thickness: f32,
    ) -> WeftResult<()> {
        self.begin_registration(1.0);
        self.check_indices(triangles.iter().flatten(), "collision triangle")?;
        self.check_indices(disabled_pairs.iter().flatten(), "disabled pair")?;
        if !(thickness.is_finite() && thickness > 0.0) {
            return Err(WeftError::InvalidParameter(format!(
                "Self-collision thickness must be positive, got {thickness}"
            )));
        }

        let collisions = SelfCollisionConstraints::new(self.range, triangles, disabled_pairs, thickness);
        self.insert_slot(ConstraintKind::SelfCollisionSpring, collisions, 0);
        Ok(())
    }

    /// Register every family enabled in `config`, in canonical order.
    pub fn configure(&mut self, particles: &ParticleBuffer, setup: &ClothSetup, config: &ClothConfig) -> WeftResult<()> {
        config.validate()?;
        let use_xpbd = config.use_xpbd;

        if let Some(k) = config.edge_stiffness {
            self.set_edge_constraints(particles, &setup.surface_elements, k, use_xpbd)?;
        }
        if let Some(k) = config.bending_stiffness {
            match config.bending_model {
                BendingModel::Springs => self.set_bending_constraints(particles, &setup.bending_edges, k, use_xpbd)?,
                BendingModel::Elements => self.set_bending_element_constraints(particles, &setup.bending_elements, k)?,
            }
        }
        if let Some(k) = config.area_stiffness {
            self.set_area_constraints(particles, &setup.surface_elements, k, use_xpbd)?;
        }
        if let Some(k) = config.volume_stiffness {
            match config.volume_model {
                VolumeModel::ThinShell => {
                    self.set_thin_shell_volume_constraints(particles, &setup.double_bending_edges, k, use_xpbd)?
                }
                VolumeModel::Enclosed => self.set_volume_constraints(particles, &setup.surface_elements, k)?,
            }
        }
        if let Some(k) = config.tether_stiffness {
            self.set_long_range_constraints(
                particles,
                &setup.neighbor_map,
                k,
                config.tether_limit_scale,
                config.tether_mode,
                use_xpbd,
            )?;
        }
        if let Some(max_distances) = &setup.max_distances {
            self.set_sphere_radii_multiplier(config.max_distances_multiplier);
            self.set_maximum_distance_constraints(max_distances)?;
        }
        if let (Some(distances), Some(radii)) = (&setup.backstop_distances, &setup.backstop_radii) {
            self.set_backstop_constraints(distances, radii, config.use_legacy_backstop)?;
        }
        if let Some(multipliers) = &setup.anim_drive_multipliers {
            self.set_anim_drive_spring_stiffness(config.anim_drive_stiffness);
            self.set_anim_drive_constraints(multipliers)?;
        }
        if let Some(k) = config.shape_target_stiffness {
            self.set_shape_target_constraints(k)?;
        }
        if let Some(thickness) = config.self_collision_thickness {
            self.set_self_collision_constraints(&setup.surface_elements, &setup.disabled_collision_pairs, thickness)?;
        }
        Ok(())
    }

    // ─── Host binding ───

    /// Allocate the init and rule ranges in `host` and install one callback
    /// per slot, in registration order. Both ranges start inactive.
    ///
    /// # Panics
    ///
    /// If called twice, or with nothing registered. A call that returned an
    /// error still counts: the host may hold partially filled ranges.
    pub fn create_rules(&mut self, host: &mut dyn ConstraintHost) -> WeftResult<()> {
        assert!(!self.rules_requested, "create_rules must only be called once");
        assert!(self.num_constraint_rules > 0, "create_rules called with no constraints registered");
        self.rules_requested = true;

        let init_view: Vec<&ConstraintSlot> = self.slots.iter().filter(|slot| slot.has_init).collect();
        let rule_view: Vec<&ConstraintSlot> = self.slots.iter().collect();
        assert_eq!(init_view.len(), self.num_constraint_inits, "Init view disagrees with the init count");
        assert_eq!(rule_view.len(), self.num_constraint_rules, "Rule view disagrees with the rule count");

        let init_offset = if init_view.is_empty() {
            None
        } else {
            Some(host.add_constraint_init_range(init_view.len(), false)?)
        };
        let rule_offset = host.add_constraint_rule_range(rule_view.len(), false)?;

        let mut inits_written = 0;
        if let Some(offset) = init_offset {
            for slot in &init_view {
                let constraint = Rc::clone(&slot.constraint);
                host.set_constraint_init(
                    offset + inits_written,
                    Box::new(move |particles: &ParticleBuffer| constraint.borrow_mut().init(particles)),
                )?;
                inits_written += 1;
            }
        }

        let mut rules_written = 0;
        for slot in &rule_view {
            let constraint = Rc::clone(&slot.constraint);
            host.set_constraint_rule(
                rule_offset + rules_written,
                Box::new(move |particles: &mut ParticleBuffer, dt: f32| {
                    let mut constraint = constraint.borrow_mut();
                    constraint.update_live_parameters();
                    constraint.apply(particles, dt);
                }),
            )?;
            rules_written += 1;
        }

        assert_eq!(inits_written, self.num_constraint_inits, "Init closure count mismatch");
        assert_eq!(rules_written, self.num_constraint_rules, "Rule closure count mismatch");

        self.host_range = Some(HostRange {
            init_offset,
            rule_offset,
        });
        info!(
            offset = self.range.offset,
            count = self.range.count,
            init_offset = ?init_offset,
            inits = inits_written,
            rule_offset,
            rules = rules_written,
            "Created constraint rules"
        );
        Ok(())
    }

    /// Activate or deactivate both ranges together.
    ///
    /// # Panics
    ///
    /// If called before [`Self::create_rules`].
    pub fn enable(&self, host: &mut dyn ConstraintHost, enabled: bool) -> WeftResult<()> {
        let Some(host_range) = self.host_range else {
            panic!("enable called before create_rules");
        };

        if let Some(offset) = host_range.init_offset {
            host.activate_constraint_init_range(offset, enabled)?;
        }
        host.activate_constraint_rule_range(host_range.rule_offset, enabled)?;
        debug!(offset = self.range.offset, enabled, "Toggled cloth constraints");
        Ok(())
    }

    // ─── Live parameters ───

    /// Max-distance radius multiplier, clamped to `>= 0` when applied.
    pub fn set_sphere_radii_multiplier(&self, multiplier: f32) {
        self.sphere_radii_multiplier.set(multiplier);
    }

    /// Anim-drive stiffness, clamped to `[0, 1]` when applied.
    pub fn set_anim_drive_spring_stiffness(&self, stiffness: f32) {
        self.anim_drive_stiffness.set(stiffness);
    }

    pub fn sphere_radii_multiplier(&self) -> f32 {
        self.sphere_radii_multiplier.get()
    }

    pub fn anim_drive_spring_stiffness(&self) -> f32 {
        self.anim_drive_stiffness.get()
    }

    // ─── Introspection ───

    pub fn num_constraint_inits(&self) -> usize {
        self.num_constraint_inits
    }

    pub fn num_constraint_rules(&self) -> usize {
        self.num_constraint_rules
    }

    pub fn particle_range(&self) -> ParticleRange {
        self.range
    }

    /// The animation pose shared with pose-driven constraints.
    pub fn pose(&self) -> &SharedPose {
        &self.pose
    }

    /// Offsets installed by [`Self::create_rules`], if it has run.
    pub fn host_range(&self) -> Option<HostRange> {
        self.host_range
    }

    /// Registered families in registration order.
    pub fn slots(&self) -> Vec<SlotInfo> {
        self.slots
            .iter()
            .map(|slot| SlotInfo {
                kind: slot.kind,
                formulation: slot.formulation,
                has_init: slot.has_init,
                len: slot.constraint.borrow().len(),
            })
            .collect()
    }

    /// Kinds in init-range order.
    pub fn init_kinds(&self) -> Vec<ConstraintKind> {
        self.slots.iter().filter(|slot| slot.has_init).map(|slot| slot.kind).collect()
    }

    /// Kinds in rule-range order.
    pub fn rule_kinds(&self) -> Vec<ConstraintKind> {
        self.slots.iter().map(|slot| slot.kind).collect()
    }

    // ─── Internals ───

    fn begin_registration(&self, stiffness: f32) {
        assert!(
            !self.rules_requested,
            "Constraints cannot be registered after create_rules"
        );
        assert!(
            stiffness > 0.0 && stiffness <= 1.0,
            "Stiffness must lie in (0, 1], got {stiffness}"
        );
    }

    fn insert_slot<C: ClothConstraint + 'static>(&mut self, kind: ConstraintKind, constraint: C, stripped: usize) {
        let formulation = constraint.formulation();
        let has_init = constraint.has_init();
        let len = constraint.len();
        let slot = ConstraintSlot {
            kind,
            formulation,
            has_init,
            constraint: Rc::new(RefCell::new(constraint)),
        };

        if let Some(existing) = self.slots.iter_mut().find(|s| s.kind == kind) {
            self.num_constraint_inits -= usize::from(existing.has_init);
            self.num_constraint_rules -= 1;
            *existing = slot;
            debug!(kind = kind.name(), "Replaced constraint slot");
        } else {
            self.slots.push(slot);
        }
        self.num_constraint_inits += usize::from(has_init);
        self.num_constraint_rules += 1;

        debug!(
            kind = kind.name(),
            formulation = ?formulation,
            tuples = len,
            stripped,
            "Registered constraints"
        );
    }

    fn check_particles(&self, particles: &ParticleBuffer) -> WeftResult<()> {
        if self.range.end() > particles.len() {
            return Err(WeftError::InvalidParameter(format!(
                "Particle range [{}, {}) exceeds buffer of {} particles",
                self.range.offset,
                self.range.end(),
                particles.len()
            )));
        }
        Ok(())
    }

    fn check_indices<'a>(&self, indices: impl IntoIterator<Item = &'a u32>, what: &str) -> WeftResult<()> {
        for &index in indices {
            if !self.range.contains(index as usize) {
                return Err(WeftError::InvalidTopology(format!(
                    "{what} index {index} outside particle range [{}, {})",
                    self.range.offset,
                    self.range.end()
                )));
            }
        }
        Ok(())
    }

    fn check_weight_map(&self, values: &[f32], what: &str) -> WeftResult<()> {
        if values.len() != self.range.count {
            return Err(WeftError::InvalidParameter(format!(
                "{what} array length ({}) != particle count ({})",
                values.len(),
                self.range.count
            )));
        }
        Ok(())
    }

    fn check_pose(&self) -> WeftResult<()> {
        let pose_len = self.pose.borrow().len();
        if pose_len < self.range.end() {
            return Err(WeftError::InvalidParameter(format!(
                "Animation pose covers {pose_len} particles, range ends at {}",
                self.range.end()
            )));
        }
        Ok(())
    }
}
