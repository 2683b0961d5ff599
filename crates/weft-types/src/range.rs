//! Particle ranges into the host engine's shared particle buffer.

use std::ops::Range;

use serde::{Deserialize, Serialize};

/// Half-open interval `[offset, offset + count)` into the particle buffer.
///
/// Bounds against the buffer itself are validated by the host engine,
/// not here.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct ParticleRange {
    /// First particle index of the range.
    pub offset: usize,
    /// Number of particles in the range.
    pub count: usize,
}

impl ParticleRange {
    /// Creates a range starting at `offset` spanning `count` particles.
    pub fn new(offset: usize, count: usize) -> Self {
        Self { offset, count }
    }

    /// One past the last particle index.
    #[inline]
    pub fn end(&self) -> usize {
        self.offset + self.count
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.count == 0
    }

    /// Returns true if the global particle index lies inside the range.
    #[inline]
    pub fn contains(&self, index: usize) -> bool {
        index >= self.offset && index < self.end()
    }

    /// Converts a global particle index into an index local to the range.
    #[inline]
    pub fn local(&self, index: usize) -> usize {
        index - self.offset
    }

    /// Iterates over the global particle indices of the range.
    pub fn indices(&self) -> Range<usize> {
        self.offset..self.end()
    }
}
