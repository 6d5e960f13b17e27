//! Per-identifier random streams.
//!
//! Every vertex and every edge-producing endpoint draws from its own
//! `SmallRng`, seeded from the run seed, a stream tag, a stable key of the
//! type or relation name, and the identifier. Regeneration is therefore
//! independent of execution order, worker assignment and partition count.

use rand::{SeedableRng, rngs::SmallRng};

use crate::{QualifiedName, canonical::stable_key};

/// SplitMix64 increment (the 64-bit golden ratio).
const SEED_SPACING: u64 = 0x9E37_79B9_7F4A_7C15;
const SPLITMIX_MULT_A: u64 = 0xBF58_476D_1CE4_E5B9;
const SPLITMIX_MULT_B: u64 = 0x94D0_49BB_1331_11EB;

/// Which draws a stream feeds.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum StreamTag {
    /// Vertex properties.
    Vertex = 1,
    /// Edges originating at a relation's domain vertex.
    DomainEdges = 2,
    /// Edges contributed by a relation's range vertex.
    RangeEdges = 3,
}

/// Stable 64-bit key of a type or relation name.
pub(crate) fn name_key(name: &QualifiedName) -> u64 {
    stable_key(&[name.namespace(), name.local_name()])
}

/// Opens the stream for `(seed, tag, key, id)`.
pub(crate) fn open(seed: u64, tag: StreamTag, key: u64, id: u64) -> SmallRng {
    let mut state = splitmix64(seed ^ (tag as u64).wrapping_mul(SEED_SPACING));
    state = splitmix64(state ^ key);
    state = splitmix64(state ^ id);
    SmallRng::seed_from_u64(state)
}

#[inline]
const fn splitmix64(mut state: u64) -> u64 {
    state = state.wrapping_add(SEED_SPACING);
    state = (state ^ (state >> 30)).wrapping_mul(SPLITMIX_MULT_A);
    state = (state ^ (state >> 27)).wrapping_mul(SPLITMIX_MULT_B);
    state ^ (state >> 31)
}
