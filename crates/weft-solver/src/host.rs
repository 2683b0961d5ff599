//! Host binding: the callback-range interface of the simulation engine.
//!
//! The registry never drives particles itself. It allocates two contiguous
//! ranges of callback slots in the host, fills them in registration order and
//! toggles them together:
//!
//! ```text
//! let init_offset = host.add_constraint_init_range(num_inits, false)?;
//! let rule_offset = host.add_constraint_rule_range(num_rules, false)?;
//! host.set_constraint_init(init_offset + i, init_i)?;
//! host.set_constraint_rule(rule_offset + j, rule_j)?;
//! host.activate_constraint_init_range(init_offset, true)?;
//! host.activate_constraint_rule_range(rule_offset, true)?;
//! ```

use serde::{Deserialize, Serialize};
use weft_types::WeftResult;

use crate::particles::ParticleBuffer;

/// Per-substep init callback, run before integration.
pub type ConstraintInit = Box<dyn FnMut(&ParticleBuffer)>;

/// Per-iteration rule callback, run after integration.
pub type ConstraintRule = Box<dyn FnMut(&mut ParticleBuffer, f32)>;

/// Trait implemented by the simulation engine that owns the particles.
///
/// Range offsets returned by the `add_*` methods identify the range in the
/// `activate_*` calls.
pub trait ConstraintHost {
    /// Allocate `count` contiguous init slots. Returns the first slot index.
    fn add_constraint_init_range(&mut self, count: usize, active: bool) -> WeftResult<usize>;

    /// Allocate `count` contiguous rule slots. Returns the first slot index.
    fn add_constraint_rule_range(&mut self, count: usize, active: bool) -> WeftResult<usize>;

    /// Install the init callback at slot `index`.
    fn set_constraint_init(&mut self, index: usize, init: ConstraintInit) -> WeftResult<()>;

    /// Install the rule callback at slot `index`.
    fn set_constraint_rule(&mut self, index: usize, rule: ConstraintRule) -> WeftResult<()>;

    /// Toggle the init range starting at `offset`.
    fn activate_constraint_init_range(&mut self, offset: usize, active: bool) -> WeftResult<()>;

    /// Toggle the rule range starting at `offset`.
    fn activate_constraint_rule_range(&mut self, offset: usize, active: bool) -> WeftResult<()>;
}

/// Offsets of the two ranges a registry installed into its host.
///
/// `init_offset` is `None` when no registered family declares an init phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct HostRange {
    pub init_offset: Option<usize>,
    pub rule_offset: usize,
}
