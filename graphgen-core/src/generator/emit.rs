//! Turns a model, seed and partition into write requests.

use std::collections::BTreeMap;

use rand::{Rng, seq::index};

use super::{
    partition::owned_range,
    stream::{self, StreamTag},
};
use crate::{
    EdgeModel, EdgeWrite, GraphModel, Incidence, PropertyModel, QualifiedName, VertexRef,
    VertexWrite, WriteRequest,
};

/// Everything one partition needs to enumerate its requests.
pub(crate) struct PartitionScope<'a> {
    pub(crate) model: &'a GraphModel,
    pub(crate) seed: u64,
    pub(crate) populations: &'a BTreeMap<QualifiedName, u64>,
    pub(crate) partition: usize,
    pub(crate) partition_count: usize,
}

impl PartitionScope<'_> {
    fn population(&self, vertex_type: &QualifiedName) -> u64 {
        self.populations.get(vertex_type).copied().unwrap_or(0)
    }

    /// Emits one vertex request per owned vertex, type by type.
    pub(crate) fn emit_vertices<E>(
        &self,
        sink: &mut impl FnMut(WriteRequest) -> Result<(), E>,
    ) -> Result<u64, E> {
        let mut emitted = 0;
        for (vertex_type, &population) in self.populations {
            let properties = self.model.vertex_properties(vertex_type);
            let key = stream::name_key(vertex_type);
            for id in owned_range(population, self.partition, self.partition_count) {
                let properties = properties
                    .map(|model| model.generate(&mut stream::open(self.seed, StreamTag::Vertex, key, id)))
                    .unwrap_or_default();
                sink(WriteRequest::Vertex(VertexWrite {
                    vertex: VertexRef {
                        vertex_type: vertex_type.clone(),
                        id,
                    },
                    properties,
                }))?;
                emitted += 1;
            }
        }
        Ok(emitted)
    }

    /// Emits the edges originating at owned vertices, relation by relation.
    pub(crate) fn emit_edges<E>(
        &self,
        sink: &mut impl FnMut(WriteRequest) -> Result<(), E>,
    ) -> Result<u64, E> {
        let mut emitted = 0;
        for (relation, edge) in self.model.edge_models() {
            let domain_population = self.population(edge.domain.vertex_type());
            let range_population = self.population(edge.range.vertex_type());
            // The range side only reciprocates a contributing domain side.
            if domain_population == 0 || range_population == 0 || !edge.domain.contributes() {
                continue;
            }
            let relation_edges = RelationEdges {
                relation,
                edge,
                properties: self.model.edge_properties(relation),
                key: stream::name_key(relation),
                seed: self.seed,
            };
            let owned = owned_range(domain_population, self.partition, self.partition_count);
            emitted += relation_edges.emit_side(Side::Domain, owned, range_population, &mut *sink)?;
            if edge.range.contributes() {
                let owned = owned_range(range_population, self.partition, self.partition_count);
                emitted += relation_edges.emit_side(Side::Range, owned, domain_population, &mut *sink)?;
            }
        }
        Ok(emitted)
    }
}

#[derive(Clone, Copy)]
enum Side {
    Domain,
    Range,
}

struct RelationEdges<'a> {
    relation: &'a QualifiedName,
    edge: &'a EdgeModel,
    properties: Option<&'a PropertyModel>,
    key: u64,
    seed: u64,
}

impl RelationEdges<'_> {
    /// Emits the edges contributed by the owned vertices of one side.
    ///
    /// Each owned vertex decides participation, samples its degree and picks
    /// that many distinct partners from the opposite population. Edges stay
    /// directed from domain to range whichever side contributes them.
    fn emit_side<E>(
        &self,
        side: Side,
        owned: std::ops::Range<u64>,
        partner_population: u64,
        sink: &mut impl FnMut(WriteRequest) -> Result<(), E>,
    ) -> Result<u64, E> {
        let (incidence, tag) = match side {
            Side::Domain => (&self.edge.domain, StreamTag::DomainEdges),
            Side::Range => (&self.edge.range, StreamTag::RangeEdges),
        };
        let mut emitted = 0;
        for id in owned {
            let mut rng = stream::open(self.seed, tag, self.key, id);
            for partner in sample_partners(&mut rng, incidence, partner_population) {
                let (out_id, in_id) = match side {
                    Side::Domain => (id, partner),
                    Side::Range => (partner, id),
                };
                let properties = self
                    .properties
                    .map(|model| model.generate(&mut rng))
                    .unwrap_or_default();
                sink(WriteRequest::Edge(EdgeWrite {
                    relation: self.relation.clone(),
                    out_vertex: VertexRef {
                        vertex_type: self.edge.domain.vertex_type().clone(),
                        id: out_id,
                    },
                    in_vertex: VertexRef {
                        vertex_type: self.edge.range.vertex_type().clone(),
                        id: in_id,
                    },
                    properties,
                }))?;
                emitted += 1;
            }
        }
        Ok(emitted)
    }
}

/// Participation draw, degree draw and distinct partner selection.
fn sample_partners<R: Rng + ?Sized>(rng: &mut R, incidence: &Incidence, population: u64) -> Vec<u64> {
    if !rng.gen_bool(incidence.probability()) {
        return Vec::new();
    }
    let degree = incidence.degree().sample(rng).min(population);
    let length = usize::try_from(population).unwrap_or(usize::MAX);
    let amount = usize::try_from(degree).unwrap_or(length).min(length);
    index::sample(rng, length, amount)
        .into_iter()
        .map(|partner| partner as u64)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::DegreeDistribution;
    use rand::{SeedableRng, rngs::SmallRng};
    use rstest::rstest;
    use std::collections::BTreeSet;

    fn incidence(probability: f64, degree: DegreeDistribution) -> Incidence {
        Incidence::new("t.A", probability, degree).expect("valid probability")
    }

    #[rstest]
    #[case(5, 100, 5)]
    #[case(50, 7, 7)]
    #[case(3, 3, 3)]
    fn partners_are_distinct_and_clamped(
        #[case] degree: u64,
        #[case] population: u64,
        #[case] expected: usize,
    ) {
        let incidence = incidence(1.0, DegreeDistribution::Constant(degree));
        let mut rng = SmallRng::seed_from_u64(4);
        let partners = sample_partners(&mut rng, &incidence, population);
        assert_eq!(partners.len(), expected);
        let distinct: BTreeSet<_> = partners.iter().copied().collect();
        assert_eq!(distinct.len(), expected);
        assert!(partners.iter().all(|&p| p < population));
    }

    #[test]
    fn zero_probability_never_participates() {
        let incidence = incidence(0.0, DegreeDistribution::Constant(4));
        let mut rng = SmallRng::seed_from_u64(4);
        assert!((0..100).all(|_| sample_partners(&mut rng, &incidence, 10).is_empty()));
    }
}
