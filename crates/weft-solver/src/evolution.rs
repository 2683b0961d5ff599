//! Reference host engine: owns the particles and runs the substep loop.
//!
//! Each substep:
//! 1. `save_previous`
//! 2. every active init callback, in slot order
//! 3. `predict` (gravity + velocity)
//! 4. `iterations` sweeps over every active rule callback, in slot order
//! 5. `update_velocities`, then damping

use std::time::Instant;

use tracing::trace;
use weft_types::{WeftError, WeftResult};

use crate::config::EvolutionConfig;
use crate::host::{ConstraintHost, ConstraintInit, ConstraintRule};
use crate::particles::ParticleBuffer;

/// Result of one substep.
#[derive(Debug, Clone)]
pub struct SubstepResult {
    /// Init callbacks invoked.
    pub init_calls: usize,
    /// Rule callbacks invoked, summed over all iterations.
    pub rule_calls: usize,
    /// Wall-clock time for this substep (seconds).
    pub wall_time: f64,
}

#[derive(Debug, Clone, Copy)]
struct CallbackRange {
    offset: usize,
    count: usize,
    active: bool,
}

/// Particle engine with activatable init/rule callback ranges.
pub struct PbdEvolution {
    particles: ParticleBuffer,
    config: EvolutionConfig,
    inits: Vec<ConstraintInit>,
    rules: Vec<ConstraintRule>,
    init_ranges: Vec<CallbackRange>,
    rule_ranges: Vec<CallbackRange>,
    substep_count: u64,
}

impl PbdEvolution {
    pub fn new(particles: ParticleBuffer, config: EvolutionConfig) -> Self {
        Self {
            particles,
            config,
            inits: Vec::new(),
            rules: Vec::new(),
            init_ranges: Vec::new(),
            rule_ranges: Vec::new(),
            substep_count: 0,
        }
    }

    pub fn particles(&self) -> &ParticleBuffer {
        &self.particles
    }

    pub fn particles_mut(&mut self) -> &mut ParticleBuffer {
        &mut self.particles
    }

    pub fn config(&self) -> &EvolutionConfig {
        &self.config
    }

    /// Number of allocated init slots across all ranges.
    pub fn init_slot_count(&self) -> usize {
        self.inits.len()
    }

    /// Number of allocated rule slots across all ranges.
    pub fn rule_slot_count(&self) -> usize {
        self.rules.len()
    }

    /// Substeps advanced so far.
    pub fn substep_count(&self) -> u64 {
        self.substep_count
    }

    /// Whether the init range starting at `offset` is active.
    pub fn is_init_range_active(&self, offset: usize) -> Option<bool> {
        self.init_ranges.iter().find(|r| r.offset == offset).map(|r| r.active)
    }

    /// Whether the rule range starting at `offset` is active.
    pub fn is_rule_range_active(&self, offset: usize) -> Option<bool> {
        self.rule_ranges.iter().find(|r| r.offset == offset).map(|r| r.active)
    }

    /// Run every active init callback once. Returns the number invoked.
    pub fn apply_inits(&mut self) -> usize {
        let Self {
            particles,
            inits,
            init_ranges,
            ..
        } = self;
        let particles: &ParticleBuffer = particles;

        let mut calls = 0;
        for range in init_ranges.iter().filter(|r| r.active) {
            for init in &mut inits[range.offset..range.offset + range.count] {
                init(particles);
                calls += 1;
            }
        }
        calls
    }

    /// Run one sweep of every active rule callback. Returns the number invoked.
    pub fn apply_rules(&mut self, dt: f32) -> usize {
        let Self {
            particles,
            rules,
            rule_ranges,
            ..
        } = self;

        let mut calls = 0;
        for range in rule_ranges.iter().filter(|r| r.active) {
            for rule in &mut rules[range.offset..range.offset + range.count] {
                rule(particles, dt);
                calls += 1;
            }
        }
        calls
    }

    /// Advance one substep of length `dt`.
    pub fn advance_one_substep(&mut self, dt: f32) -> SubstepResult {
        let start = Instant::now();

        self.particles.save_previous();
        let init_calls = self.apply_inits();
        self.particles.predict(dt, self.config.gravity);

        let mut rule_calls = 0;
        for _ in 0..self.config.iterations {
            rule_calls += self.apply_rules(dt);
        }

        self.particles.update_velocities(dt);
        if self.config.damping > 0.0 {
            self.particles.damp_velocities(self.config.damping);
        }

        self.substep_count += 1;
        trace!(
            substep = self.substep_count,
            dt,
            init_calls,
            rule_calls,
            "Advanced substep"
        );

        SubstepResult {
            init_calls,
            rule_calls,
            wall_time: start.elapsed().as_secs_f64(),
        }
    }

    /// Advance a frame of length `frame_dt`, split into `substeps` equal substeps.
    pub fn advance(&mut self, frame_dt: f32) -> Vec<SubstepResult> {
        let substeps = self.config.substeps.max(1);
        let dt = frame_dt / substeps as f32;
        (0..substeps).map(|_| self.advance_one_substep(dt)).collect()
    }

    fn find_range<'a>(ranges: &'a mut [CallbackRange], offset: usize, phase: &str) -> WeftResult<&'a mut CallbackRange> {
        ranges.iter_mut().find(|r| r.offset == offset).ok_or_else(|| {
            WeftError::HostRange(format!("No {phase} range starts at offset {offset}"))
        })
    }
}

impl ConstraintHost for PbdEvolution {
    fn add_constraint_init_range(&mut self, count: usize, active: bool) -> WeftResult<usize> {
        let offset = self.inits.len();
        self.inits
            .extend((0..count).map(|_| Box::new(|_: &ParticleBuffer| {}) as ConstraintInit));
        self.init_ranges.push(CallbackRange {
            offset,
            count,
            active,
        });
        Ok(offset)
    }

    fn add_constraint_rule_range(&mut self, count: usize, active: bool) -> WeftResult<usize> {
        let offset = self.rules.len();
        self.rules
            .extend((0..count).map(|_| Box::new(|_: &mut ParticleBuffer, _: f32| {}) as ConstraintRule));
        self.rule_ranges.push(CallbackRange {
            offset,
            count,
            active,
        });
        Ok(offset)
    }

    fn set_constraint_init(&mut self, index: usize, init: ConstraintInit) -> WeftResult<()> {
        let count = self.inits.len();
        let slot = self
            .inits
            .get_mut(index)
            .ok_or_else(|| WeftError::HostRange(format!("Init slot {index} out of bounds ({count} allocated)")))?;
        *slot = init;
        Ok(())
    }

    fn set_constraint_rule(&mut self, index: usize, rule: ConstraintRule) -> WeftResult<()> {
        let count = self.rules.len();
        let slot = self
            .rules
            .get_mut(index)
            .ok_or_else(|| WeftError::HostRange(format!("Rule slot {index} out of bounds ({count} allocated)")))?;
        *slot = rule;
        Ok(())
    }

    fn activate_constraint_init_range(&mut self, offset: usize, active: bool) -> WeftResult<()> {
        Self::find_range(&mut self.init_ranges, offset, "init")?.active = active;
        Ok(())
    }

    fn activate_constraint_rule_range(&mut self, offset: usize, active: bool) -> WeftResult<()> {
        Self::find_range(&mut self.rule_ranges, offset, "rule")?.active = active;
        Ok(())
    }
}
