//! Property generators attached to vertex and relation types.

use std::{collections::BTreeMap, fmt};

use rand::{
    Rng,
    distributions::{Alphanumeric, Bernoulli, Distribution},
};

use crate::{
    QualifiedName,
    canonical::{Canonical, CanonicalEncoder},
    error::ConfigurationError,
};

/// A generated property value.
///
/// Values are totally ordered so write requests can be compared as
/// multisets in determinism checks.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum PropertyValue {
    /// A boolean flag.
    Boolean(bool),
    /// A signed integer.
    Integer(i64),
    /// A UTF-8 string.
    Text(String),
}

impl fmt::Display for PropertyValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Boolean(value) => write!(f, "{value}"),
            Self::Integer(value) => write!(f, "{value}"),
            Self::Text(value) => f.write_str(value),
        }
    }
}

impl Canonical for PropertyValue {
    fn encode(&self, encoder: &mut CanonicalEncoder) {
        match self {
            Self::Boolean(value) => {
                encoder.str("boolean");
                encoder.bool(*value);
            }
            Self::Integer(value) => {
                encoder.str("integer");
                encoder.i64(*value);
            }
            Self::Text(value) => {
                encoder.str("text");
                encoder.str(value);
            }
        }
    }
}

/// How a single property value is drawn.
#[derive(Clone, Debug, PartialEq)]
pub enum PropertyGenerator {
    /// Always the same value.
    Constant(PropertyValue),
    /// An integer drawn uniformly from `min..=max`.
    UniformInteger {
        /// Inclusive lower bound.
        min: i64,
        /// Inclusive upper bound.
        max: i64,
    },
    /// `true` with the given probability.
    Boolean {
        /// Probability of `true`, within `[0, 1]`.
        probability: f64,
    },
    /// A random ASCII alphanumeric string.
    Alphanumeric {
        /// Number of characters.
        length: usize,
    },
}

impl PropertyGenerator {
    fn validate(&self, property: &QualifiedName) -> Result<(), ConfigurationError> {
        let reason = match self {
            Self::UniformInteger { min, max } if min > max => "min must not exceed max",
            Self::Boolean { probability } if !(0.0..=1.0).contains(probability) => {
                "probability must be within [0, 1]"
            }
            _ => return Ok(()),
        };
        Err(ConfigurationError::InvalidPropertyGenerator {
            property: property.to_arc(),
            reason,
        })
    }

    /// Draws one value.
    pub fn generate<R: Rng + ?Sized>(&self, rng: &mut R) -> PropertyValue {
        match self {
            Self::Constant(value) => value.clone(),
            Self::UniformInteger { min, max } => PropertyValue::Integer(rng.gen_range(*min..=*max)),
            Self::Boolean { probability } => {
                let flag = Bernoulli::new(*probability).map_or(false, |b| b.sample(rng));
                PropertyValue::Boolean(flag)
            }
            Self::Alphanumeric { length } => PropertyValue::Text(
                rng.sample_iter(Alphanumeric)
                    .take(*length)
                    .map(char::from)
                    .collect(),
            ),
        }
    }
}

impl Canonical for PropertyGenerator {
    fn encode(&self, encoder: &mut CanonicalEncoder) {
        match self {
            Self::Constant(value) => {
                encoder.str("constant");
                value.encode(encoder);
            }
            Self::UniformInteger { min, max } => {
                encoder.str("uniform_integer");
                encoder.i64(*min);
                encoder.i64(*max);
            }
            Self::Boolean { probability } => {
                encoder.str("boolean");
                encoder.f64(*probability);
            }
            Self::Alphanumeric { length } => {
                encoder.str("alphanumeric");
                encoder.count(*length);
            }
        }
    }
}

/// Property generators for one vertex or relation type, ordered by key.
///
/// # Examples
/// ```
/// use graphgen_core::{PropertyGenerator, PropertyModel, PropertyValue};
/// use rand::{SeedableRng, rngs::SmallRng};
///
/// let model = PropertyModel::new()
///     .with("age", PropertyGenerator::UniformInteger { min: 1, max: 30 })?
///     .with("kind", PropertyGenerator::Constant(PropertyValue::Text("ape".into())))?;
///
/// let values = model.generate(&mut SmallRng::seed_from_u64(1));
/// assert_eq!(values.len(), 2);
/// assert_eq!(values[1].1, PropertyValue::Text("ape".into()));
/// # Ok::<(), graphgen_core::ConfigurationError>(())
/// ```
#[derive(Clone, Debug, Default, PartialEq)]
pub struct PropertyModel {
    generators: BTreeMap<QualifiedName, PropertyGenerator>,
}

impl PropertyModel {
    /// Creates a model with no properties.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds or replaces the generator for `key`.
    ///
    /// # Errors
    /// Returns [`ConfigurationError::InvalidPropertyGenerator`] when the
    /// generator parameters are unusable.
    pub fn insert(
        &mut self,
        key: impl Into<QualifiedName>,
        generator: PropertyGenerator,
    ) -> Result<(), ConfigurationError> {
        let key = key.into();
        generator.validate(&key)?;
        self.generators.insert(key, generator);
        Ok(())
    }

    /// Builder form of [`PropertyModel::insert`].
    ///
    /// # Errors
    /// See [`PropertyModel::insert`].
    pub fn with(
        mut self,
        key: impl Into<QualifiedName>,
        generator: PropertyGenerator,
    ) -> Result<Self, ConfigurationError> {
        self.insert(key, generator)?;
        Ok(self)
    }

    /// Iterates generators in key order.
    pub fn iter(&self) -> impl Iterator<Item = (&QualifiedName, &PropertyGenerator)> {
        self.generators.iter()
    }

    /// Returns whether the model has no properties.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.generators.is_empty()
    }

    /// Draws every property in key order.
    pub fn generate<R: Rng + ?Sized>(&self, rng: &mut R) -> Vec<(QualifiedName, PropertyValue)> {
        self.generators
            .iter()
            .map(|(key, generator)| (key.clone(), generator.generate(rng)))
            .collect()
    }
}

impl Canonical for PropertyModel {
    fn encode(&self, encoder: &mut CanonicalEncoder) {
        encoder.count(self.generators.len());
        for (key, generator) in &self.generators {
            key.encode(encoder);
            generator.encode(encoder);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::{SeedableRng, rngs::SmallRng};
    use rstest::rstest;

    #[rstest]
    #[case::inverted_range(PropertyGenerator::UniformInteger { min: 5, max: 4 })]
    #[case::probability_above_one(PropertyGenerator::Boolean { probability: 1.5 })]
    #[case::nan_probability(PropertyGenerator::Boolean { probability: f64::NAN })]
    fn insert_rejects_unusable_generators(#[case] generator: PropertyGenerator) {
        let err = PropertyModel::new()
            .with("p", generator)
            .expect_err("generator is invalid");
        assert_eq!(err.code().as_str(), "CONFIG_INVALID_PROPERTY");
    }

    #[test]
    fn uniform_integers_stay_in_bounds() {
        let generator = PropertyGenerator::UniformInteger { min: -3, max: 3 };
        let mut rng = SmallRng::seed_from_u64(5);
        for _ in 0..500 {
            match generator.generate(&mut rng) {
                PropertyValue::Integer(value) => assert!((-3..=3).contains(&value)),
                other => panic!("unexpected value {other:?}"),
            }
        }
    }

    #[test]
    fn alphanumeric_strings_have_requested_length() {
        let generator = PropertyGenerator::Alphanumeric { length: 12 };
        let PropertyValue::Text(text) = generator.generate(&mut SmallRng::seed_from_u64(8)) else {
            panic!("expected text");
        };
        assert_eq!(text.len(), 12);
        assert!(text.chars().all(|c| c.is_ascii_alphanumeric()));
    }

    #[rstest]
    #[case(0.0, false)]
    #[case(1.0, true)]
    fn certain_booleans_are_fixed(#[case] probability: f64, #[case] expected: bool) {
        let generator = PropertyGenerator::Boolean { probability };
        let mut rng = SmallRng::seed_from_u64(2);
        assert!((0..50).all(|_| generator.generate(&mut rng) == PropertyValue::Boolean(expected)));
    }

    #[test]
    fn generation_follows_key_order_and_replays() {
        let model = PropertyModel::new()
            .with("zeta", PropertyGenerator::Alphanumeric { length: 4 })
            .and_then(|m| m.with("alpha", PropertyGenerator::UniformInteger { min: 0, max: 9 }))
            .expect("valid model");
        let first = model.generate(&mut SmallRng::seed_from_u64(77));
        let second = model.generate(&mut SmallRng::seed_from_u64(77));
        assert_eq!(first, second);
        let keys: Vec<_> = first.iter().map(|(key, _)| key.to_string()).collect();
        assert_eq!(keys, ["alpha", "zeta"]);
    }
}
