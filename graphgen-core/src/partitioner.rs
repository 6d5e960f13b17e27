//! Relative vertex-type weights and their conversion into absolute counts.

use std::{
    cmp::Reverse,
    collections::BTreeMap,
    num::NonZeroU64,
};

use crate::{
    QualifiedName,
    canonical::{Canonical, CanonicalEncoder},
    error::ConfigurationError,
};

/// Maps vertex types to relative weights.
///
/// Sizes are allocated with the largest-remainder method: every type first
/// receives the floor of its exact share, then the leftover vertices go one
/// each to the types with the largest fractional remainders. Ties are broken
/// by ascending type name, so every caller computes the same split without
/// communicating.
///
/// # Examples
/// ```
/// use graphgen_core::{Partitioner, QualifiedName};
///
/// let mut partitioner = Partitioner::new();
/// partitioner.put(QualifiedName::parse("Monkey"), 1)?;
/// partitioner.put(QualifiedName::parse("Weasel"), 2)?;
///
/// let sizes = partitioner.partition_sizes(10)?;
/// assert_eq!(sizes[&QualifiedName::parse("Monkey")], 3);
/// assert_eq!(sizes[&QualifiedName::parse("Weasel")], 7);
/// assert_eq!(sizes.values().sum::<u64>(), 10);
/// # Ok::<(), graphgen_core::ConfigurationError>(())
/// ```
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Partitioner {
    weights: BTreeMap<QualifiedName, NonZeroU64>,
}

impl Partitioner {
    /// Creates an empty partitioner.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the weight of `vertex_type`, replacing any previous weight.
    ///
    /// # Errors
    /// Returns [`ConfigurationError::ZeroWeight`] when `weight` is zero.
    pub fn put(&mut self, vertex_type: QualifiedName, weight: u64) -> Result<(), ConfigurationError> {
        let weight = NonZeroU64::new(weight).ok_or_else(|| ConfigurationError::ZeroWeight {
            vertex_type: vertex_type.to_arc(),
        })?;
        self.weights.insert(vertex_type, weight);
        Ok(())
    }

    /// Returns the weight of `vertex_type`, if present.
    #[must_use]
    pub fn weight(&self, vertex_type: &QualifiedName) -> Option<u64> {
        self.weights.get(vertex_type).map(|weight| weight.get())
    }

    /// Iterates `(vertex type, weight)` pairs in name order.
    pub fn iter(&self) -> impl Iterator<Item = (&QualifiedName, u64)> {
        self.weights.iter().map(|(name, weight)| (name, weight.get()))
    }

    /// Returns the number of weighted vertex types.
    #[must_use]
    pub fn len(&self) -> usize {
        self.weights.len()
    }

    /// Returns whether no vertex type has a weight.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.weights.is_empty()
    }

    /// Splits `total` vertices across the weighted types.
    ///
    /// The returned sizes always sum to `total` exactly.
    ///
    /// # Errors
    /// Returns [`ConfigurationError::EmptyPartitioner`] when `total > 0` and
    /// there are no weights.
    #[expect(
        clippy::integer_division,
        clippy::integer_division_remainder_used,
        reason = "Largest-remainder apportionment splits each share into floor and remainder."
    )]
    pub fn partition_sizes(
        &self,
        total: u64,
    ) -> Result<BTreeMap<QualifiedName, u64>, ConfigurationError> {
        if self.weights.is_empty() {
            if total == 0 {
                return Ok(BTreeMap::new());
            }
            return Err(ConfigurationError::EmptyPartitioner { total });
        }

        let weight_sum: u128 = self.weights.values().map(|w| u128::from(w.get())).sum();
        let total_wide = u128::from(total);

        let mut sizes = BTreeMap::new();
        let mut remainders = Vec::with_capacity(self.weights.len());
        let mut allocated: u128 = 0;
        for (name, weight) in &self.weights {
            let exact = total_wide * u128::from(weight.get());
            let floor = exact / weight_sum;
            allocated += floor;
            remainders.push((exact % weight_sum, name));
            // `floor <= total`, so the narrowing cannot fail.
            sizes.insert(name.clone(), u64::try_from(floor).unwrap_or(u64::MAX));
        }

        // Fewer leftovers than types: each remainder is < weight_sum and the
        // remainders sum to `leftover * weight_sum`.
        let leftover = usize::try_from(total_wide - allocated).unwrap_or(usize::MAX);
        remainders.sort_by_key(|&(remainder, name)| (Reverse(remainder), name));
        for (_, name) in remainders.into_iter().take(leftover) {
            if let Some(size) = sizes.get_mut(name) {
                *size += 1;
            }
        }
        Ok(sizes)
    }
}

impl Canonical for Partitioner {
    fn encode(&self, encoder: &mut CanonicalEncoder) {
        encoder.section("partitioner");
        encoder.count(self.weights.len());
        for (name, weight) in &self.weights {
            name.encode(encoder);
            encoder.u64(weight.get());
        }
    }
}

impl<'a> IntoIterator for &'a Partitioner {
    type Item = (&'a QualifiedName, u64);
    type IntoIter = Box<dyn Iterator<Item = Self::Item> + 'a>;

    fn into_iter(self) -> Self::IntoIter {
        Box::new(self.iter())
    }
}
