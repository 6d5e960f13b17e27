//! Synthetic models and request batches.

use std::sync::Arc;

use graphgen_core::{
    DegreeDistribution, EdgeModel, EntityType, GraphModel, Incidence, PropertyGenerator,
    PropertyModel, PropertyValue, QualifiedName, RelationType, VertexRef, VertexWrite,
    VocabularyBuilder, WriteRequest,
};
use rand::{Rng, SeedableRng, distributions::Alphanumeric, distributions::Standard, rngs::SmallRng};

use crate::error::BenchSetupError;

/// Seed used for all synthetic data in the benchmarks.
pub const SEED: u64 = 42;

const NAMESPACE: &str = "bench";

/// Builds a model of `type_count` equally weighted types where type `i`
/// relates to type `i + 1`, wrapping around at the end.
///
/// Every vertex carries a 12-character label and every edge an integer
/// weight, so enumeration cost includes property generation.
///
/// # Errors
/// Returns [`BenchSetupError::ZeroValue`] when `type_count` is zero.
pub fn ring_model(type_count: usize) -> Result<GraphModel, BenchSetupError> {
    if type_count == 0 {
        return Err(BenchSetupError::ZeroValue {
            context: "type_count",
        });
    }
    let type_name = |index: usize| format!("T{index}");
    let next = |index: usize| if index + 1 == type_count { 0 } else { index + 1 };
    let relation_name = |index: usize| format!("r{index}");

    let mut vocabulary = VocabularyBuilder::new(NAMESPACE);
    for index in 0..type_count {
        vocabulary = vocabulary
            .entity(EntityType::new(type_name(index).as_str()))
            .relation(RelationType::new(
                relation_name(index).as_str(),
                type_name(index).as_str(),
                type_name(next(index)).as_str(),
            ));
    }

    let labels = PropertyModel::new().with("label", PropertyGenerator::Alphanumeric { length: 12 })?;
    let weights = PropertyModel::new().with("weight", PropertyGenerator::UniformInteger { min: 1, max: 100 })?;
    let mut builder = GraphModel::builder(Arc::new(vocabulary.build()?));
    for index in 0..type_count {
        builder = builder
            .weight(type_name(index).as_str(), 1)
            .vertex_properties(type_name(index).as_str(), labels.clone())
            .edge(
                relation_name(index).as_str(),
                EdgeModel::new(
                    Incidence::new(
                        type_name(index).as_str(),
                        0.9,
                        DegreeDistribution::log_normal(1.0, 0.5)?,
                    )?,
                    Incidence::new(
                        type_name(next(index)).as_str(),
                        0.2,
                        DegreeDistribution::Constant(1),
                    )?,
                ),
            )
            .edge_properties(relation_name(index).as_str(), weights.clone());
    }
    Ok(builder.build()?)
}

/// Produces `count` vertex writes with random identifiers and labels.
#[must_use]
pub fn vertex_requests(count: usize, seed: u64) -> Vec<WriteRequest> {
    let mut rng = SmallRng::seed_from_u64(seed);
    let vertex_type = QualifiedName::new(NAMESPACE, "T0");
    let label = QualifiedName::new(NAMESPACE, "label");
    (0..count)
        .map(|_| {
            let id: u64 = rng.sample(Standard);
            let text: String = (&mut rng)
                .sample_iter(Alphanumeric)
                .take(12)
                .map(char::from)
                .collect();
            WriteRequest::Vertex(VertexWrite {
                vertex: VertexRef {
                    vertex_type: vertex_type.clone(),
                    id,
                },
                properties: vec![(label.clone(), PropertyValue::Text(text))],
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(1)]
    #[case(4)]
    fn ring_models_build(#[case] type_count: usize) {
        let model = ring_model(type_count).expect("ring model is valid");
        assert_eq!(model.partitioner().len(), type_count);
        assert_eq!(model.edge_models().len(), type_count);
    }

    #[test]
    fn empty_rings_are_rejected() {
        assert!(matches!(
            ring_model(0),
            Err(BenchSetupError::ZeroValue { context: "type_count" })
        ));
    }

    #[test]
    fn request_batches_are_reproducible() {
        let first = vertex_requests(16, SEED);
        assert_eq!(first.len(), 16);
        assert_eq!(first, vertex_requests(16, SEED));
        assert_ne!(first, vertex_requests(16, SEED + 1));
    }
}
