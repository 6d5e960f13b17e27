//! The fingerprinted graph model.
//!
//! A [`GraphModel`] is immutable once built. Every name it holds has been
//! resolved against its vocabulary, so models written with unqualified and
//! fully qualified names are the same model and share a [`ContentHash`].

use std::{collections::BTreeMap, sync::Arc};

use crate::{
    ContentHash, DegreeDistribution, Partitioner, PropertyModel, QualifiedName, Vocabulary,
    canonical::{Canonical, CanonicalEncoder},
    error::ConfigurationError,
};

const HASH_DOMAIN: &str = "graphgen.graph-model.v1";

/// One endpoint of a relation's edge model.
#[derive(Clone, Debug, PartialEq)]
pub struct Incidence {
    vertex_type: QualifiedName,
    probability: f64,
    degree: DegreeDistribution,
}

impl Incidence {
    /// Creates an incidence for `vertex_type`.
    ///
    /// `probability` is the fraction of vertices that participate and
    /// `degree` is the number of edges each participating vertex receives.
    ///
    /// # Errors
    /// Returns [`ConfigurationError::InvalidProbability`] when `probability`
    /// is not within `[0, 1]`.
    pub fn new(
        vertex_type: impl Into<QualifiedName>,
        probability: f64,
        degree: DegreeDistribution,
    ) -> Result<Self, ConfigurationError> {
        let vertex_type = vertex_type.into();
        if !(0.0..=1.0).contains(&probability) {
            return Err(ConfigurationError::InvalidProbability {
                vertex_type: vertex_type.to_arc(),
                value: probability,
            });
        }
        Ok(Self {
            vertex_type,
            probability,
            degree,
        })
    }

    /// Vertex type at this endpoint.
    #[must_use]
    pub fn vertex_type(&self) -> &QualifiedName {
        &self.vertex_type
    }

    /// Probability that a vertex participates.
    #[must_use]
    pub const fn probability(&self) -> f64 {
        self.probability
    }

    /// Degree of a participating vertex.
    #[must_use]
    pub const fn degree(&self) -> &DegreeDistribution {
        &self.degree
    }

    /// Returns whether this endpoint can produce edges at all.
    #[must_use]
    pub fn contributes(&self) -> bool {
        self.probability > 0.0 && !self.degree.is_always_zero()
    }
}

impl Canonical for Incidence {
    fn encode(&self, encoder: &mut CanonicalEncoder) {
        self.vertex_type.encode(encoder);
        encoder.f64(self.probability);
        self.degree.encode(encoder);
    }
}

/// The `(domain, range)` incidence pair of one relation.
#[derive(Clone, Debug, PartialEq)]
pub struct EdgeModel {
    /// The `from` endpoint.
    pub domain: Incidence,
    /// The `to` endpoint.
    pub range: Incidence,
}

impl EdgeModel {
    /// Pairs a domain and a range incidence.
    #[must_use]
    pub const fn new(domain: Incidence, range: Incidence) -> Self {
        Self { domain, range }
    }
}

/// Immutable description of the graph to generate.
///
/// Build one with [`GraphModelBuilder`].
#[derive(Clone, Debug)]
pub struct GraphModel {
    vocabulary: Arc<Vocabulary>,
    partitioner: Partitioner,
    edges: BTreeMap<QualifiedName, EdgeModel>,
    vertex_properties: BTreeMap<QualifiedName, PropertyModel>,
    edge_properties: BTreeMap<QualifiedName, PropertyModel>,
    hash: ContentHash,
}

impl GraphModel {
    /// Starts a model over `vocabulary`.
    #[must_use]
    pub fn builder(vocabulary: Arc<Vocabulary>) -> GraphModelBuilder {
        GraphModelBuilder::new(vocabulary)
    }

    /// The vocabulary the model's names resolve against.
    #[must_use]
    pub fn vocabulary(&self) -> &Arc<Vocabulary> {
        &self.vocabulary
    }

    /// The vertex-type weights.
    #[must_use]
    pub fn partitioner(&self) -> &Partitioner {
        &self.partitioner
    }

    /// Edge models keyed by resolved relation name.
    #[must_use]
    pub fn edge_models(&self) -> &BTreeMap<QualifiedName, EdgeModel> {
        &self.edges
    }

    /// Property model for a resolved vertex type, if any.
    #[must_use]
    pub fn vertex_properties(&self, vertex_type: &QualifiedName) -> Option<&PropertyModel> {
        self.vertex_properties.get(vertex_type)
    }

    /// Property model for a resolved relation type, if any.
    #[must_use]
    pub fn edge_properties(&self, relation: &QualifiedName) -> Option<&PropertyModel> {
        self.edge_properties.get(relation)
    }

    /// Content fingerprint of the model.
    ///
    /// Equal configurations hash equally however they were built; any
    /// semantic change yields a different hash.
    #[must_use]
    pub const fn hash(&self) -> ContentHash {
        self.hash
    }

    fn compute_hash(&self) -> ContentHash {
        let mut encoder = CanonicalEncoder::new(HASH_DOMAIN);
        self.vocabulary.encode(&mut encoder);
        self.partitioner.encode(&mut encoder);

        encoder.section("edges");
        encoder.count(self.edges.len());
        for (relation, edge) in &self.edges {
            relation.encode(&mut encoder);
            edge.domain.encode(&mut encoder);
            edge.range.encode(&mut encoder);
        }

        for (section, models) in [
            ("vertex_properties", &self.vertex_properties),
            ("edge_properties", &self.edge_properties),
        ] {
            encoder.section(section);
            encoder.count(models.len());
            for (key, model) in models {
                key.encode(&mut encoder);
                model.encode(&mut encoder);
            }
        }
        encoder.finish()
    }
}

impl PartialEq for GraphModel {
    fn eq(&self, other: &Self) -> bool {
        self.hash == other.hash
    }
}

impl Eq for GraphModel {}

/// Collects and validates the parts of a [`GraphModel`].
///
/// # Examples
/// ```
/// use std::sync::Arc;
/// use graphgen_core::{
///     DegreeDistribution, EdgeModel, EntityType, GraphModel, Incidence, RelationType,
///     VocabularyBuilder,
/// };
///
/// let vocabulary = Arc::new(
///     VocabularyBuilder::new("zoo")
///         .entity(EntityType::new("Monkey"))
///         .entity(EntityType::new("Weasel"))
///         .relation(RelationType::new("chased", "Monkey", "Weasel"))
///         .build()?,
/// );
/// let chased = EdgeModel::new(
///     Incidence::new("Monkey", 0.9543, DegreeDistribution::log_normal(0.7813873, 1.0293729)?)?,
///     Incidence::new("Weasel", 1.0, DegreeDistribution::Constant(1))?,
/// );
///
/// let model = GraphModel::builder(Arc::clone(&vocabulary))
///     .weight("Monkey", 1)
///     .weight("Weasel", 1)
///     .edge("chased", chased.clone())
///     .build()?;
/// let again = GraphModel::builder(vocabulary)
///     .weight("zoo.Weasel", 1)
///     .weight("zoo.Monkey", 1)
///     .edge("zoo.chased", chased)
///     .build()?;
/// assert_eq!(model.hash(), again.hash());
/// # Ok::<(), graphgen_core::ConfigurationError>(())
/// ```
#[derive(Clone, Debug)]
#[must_use]
pub struct GraphModelBuilder {
    vocabulary: Arc<Vocabulary>,
    weights: Vec<(QualifiedName, u64)>,
    edges: Vec<(QualifiedName, EdgeModel)>,
    vertex_properties: Vec<(QualifiedName, PropertyModel)>,
    edge_properties: Vec<(QualifiedName, PropertyModel)>,
}

impl GraphModelBuilder {
    /// Starts an empty model over `vocabulary`.
    pub fn new(vocabulary: Arc<Vocabulary>) -> Self {
        Self {
            vocabulary,
            weights: Vec::new(),
            edges: Vec::new(),
            vertex_properties: Vec::new(),
            edge_properties: Vec::new(),
        }
    }

    /// Sets the relative weight of a vertex type; later calls overwrite
    /// earlier ones for the same type.
    pub fn weight(mut self, vertex_type: impl Into<QualifiedName>, weight: u64) -> Self {
        self.weights.push((vertex_type.into(), weight));
        self
    }

    /// Copies every weight from an existing partitioner.
    pub fn partitioner(mut self, partitioner: &Partitioner) -> Self {
        self.weights
            .extend(partitioner.iter().map(|(name, weight)| (name.clone(), weight)));
        self
    }

    /// Sets the edge model of a relation.
    pub fn edge(mut self, relation: impl Into<QualifiedName>, model: EdgeModel) -> Self {
        self.edges.push((relation.into(), model));
        self
    }

    /// Sets the property model of a vertex type.
    pub fn vertex_properties(
        mut self,
        vertex_type: impl Into<QualifiedName>,
        model: PropertyModel,
    ) -> Self {
        self.vertex_properties.push((vertex_type.into(), model));
        self
    }

    /// Sets the property model of a relation.
    pub fn edge_properties(
        mut self,
        relation: impl Into<QualifiedName>,
        model: PropertyModel,
    ) -> Self {
        self.edge_properties.push((relation.into(), model));
        self
    }

    /// Resolves every name and computes the content hash.
    ///
    /// # Errors
    /// Returns a [`ConfigurationError`] when a weight is zero, a name does
    /// not resolve to the expected kind of vocabulary item, or an edge
    /// model's endpoint types are not compatible with the relation's
    /// declared endpoints.
    pub fn build(self) -> Result<GraphModel, ConfigurationError> {
        let vocabulary = self.vocabulary;
        let entity = |name: &QualifiedName| {
            vocabulary
                .resolve_entity(name)
                .map(|entity| entity.name().clone())
        };

        let mut partitioner = Partitioner::new();
        for (vertex_type, weight) in self.weights {
            partitioner.put(entity(&vertex_type)?, weight)?;
        }

        let mut edges = BTreeMap::new();
        for (relation, model) in self.edges {
            let declared = vocabulary.resolve_relation(&relation)?;
            let domain = resolve_endpoint(&vocabulary, declared.name(), "domain", declared.from(), model.domain)?;
            let range = resolve_endpoint(&vocabulary, declared.name(), "range", declared.to(), model.range)?;
            edges.insert(declared.name().clone(), EdgeModel::new(domain, range));
        }

        let mut vertex_properties = BTreeMap::new();
        for (vertex_type, model) in self.vertex_properties {
            vertex_properties.insert(entity(&vertex_type)?, model);
        }

        let mut edge_properties = BTreeMap::new();
        for (relation, model) in self.edge_properties {
            let declared = vocabulary.resolve_relation(&relation)?;
            edge_properties.insert(declared.name().clone(), model);
        }

        let mut model = GraphModel {
            vocabulary,
            partitioner,
            edges,
            vertex_properties,
            edge_properties,
            hash: ContentHash::from_bytes([0; 32]),
        };
        model.hash = model.compute_hash();
        Ok(model)
    }
}

fn resolve_endpoint(
    vocabulary: &Vocabulary,
    relation: &QualifiedName,
    side: &'static str,
    expected: &QualifiedName,
    incidence: Incidence,
) -> Result<Incidence, ConfigurationError> {
    let actual = vocabulary.resolve_entity(&incidence.vertex_type)?.name().clone();
    if !vocabulary.is_a(&actual, expected) {
        return Err(ConfigurationError::IncompatibleEndpoint {
            relation: relation.to_arc(),
            side,
            expected: expected.to_arc(),
            actual: actual.to_arc(),
        });
    }
    Ok(Incidence {
        vertex_type: actual,
        ..incidence
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{EntityType, PropertyGenerator, RelationType, VocabularyBuilder};
    use rstest::{fixture, rstest};

    #[fixture]
    fn vocabulary() -> Arc<Vocabulary> {
        Arc::new(
            VocabularyBuilder::new("test")
                .entity(EntityType::new("core.Thing"))
                .entity(EntityType::new("Monkey").extending("core.Thing"))
                .entity(EntityType::new("Weasel").extending("core.Thing"))
                .entity(EntityType::new("MulberryBush"))
                .relation(RelationType::new("chased", "Monkey", "Weasel"))
                .relation(RelationType::new("popped", "Weasel", "Monkey"))
                .relation(RelationType::new("touched", "core.Thing", "core.Thing"))
                .build()
                .expect("vocabulary is valid"),
        )
    }

    fn incidence(vertex_type: &str, probability: f64, degree: DegreeDistribution) -> Incidence {
        Incidence::new(vertex_type, probability, degree).expect("probability is valid")
    }

    fn log_normal(log_mean: f64, log_sd: f64) -> DegreeDistribution {
        DegreeDistribution::log_normal(log_mean, log_sd).expect("parameters are valid")
    }

    fn chased(domain_probability: f64, degree: DegreeDistribution) -> EdgeModel {
        EdgeModel::new(
            incidence("Monkey", domain_probability, degree),
            incidence("Weasel", 1.0, DegreeDistribution::Constant(1)),
        )
    }

    fn base(vocabulary: &Arc<Vocabulary>) -> GraphModelBuilder {
        GraphModel::builder(Arc::clone(vocabulary))
            .weight("Monkey", 1)
            .weight("Weasel", 1)
            .edge("chased", chased(0.9543, log_normal(0.7813873, 1.0293729)))
    }

    fn hash_of(builder: GraphModelBuilder) -> ContentHash {
        builder.build().expect("model is valid").hash()
    }

    #[rstest]
    fn hash_follows_every_semantic_change(vocabulary: Arc<Vocabulary>) {
        let original = hash_of(base(&vocabulary));
        assert_eq!(original, hash_of(base(&vocabulary)));

        let with_bush = hash_of(base(&vocabulary).weight("MulberryBush", 5));
        assert_ne!(original, with_bush);
        assert_eq!(with_bush, hash_of(base(&vocabulary).weight("MulberryBush", 5)));

        let heavier_bush = hash_of(base(&vocabulary).weight("MulberryBush", 7));
        assert_ne!(with_bush, heavier_bush);

        let certain = GraphModel::builder(Arc::clone(&vocabulary))
            .weight("Monkey", 1)
            .weight("Weasel", 1)
            .weight("MulberryBush", 7)
            .edge("chased", chased(1.0, log_normal(0.7813873, 1.0293729)));
        let halved = GraphModel::builder(Arc::clone(&vocabulary))
            .weight("Monkey", 1)
            .weight("Weasel", 1)
            .weight("MulberryBush", 7)
            .edge("chased", chased(0.5, log_normal(0.7813873, 1.0293729)));
        let certain = hash_of(certain);
        assert_ne!(certain, heavier_bush);
        assert_ne!(certain, hash_of(halved));

        let reshaped = hash_of(
            GraphModel::builder(Arc::clone(&vocabulary))
                .weight("Monkey", 1)
                .weight("Weasel", 1)
                .weight("MulberryBush", 7)
                .edge("chased", chased(1.0, log_normal(0.5, 1.0293729))),
        );
        assert_ne!(certain, reshaped);

        let popped = EdgeModel::new(
            incidence("Weasel", 0.25, DegreeDistribution::Constant(2)),
            incidence("Monkey", 1.0, DegreeDistribution::Constant(1)),
        );
        let with_popped = hash_of(base(&vocabulary).weight("MulberryBush", 7).edge("popped", popped));
        assert_ne!(heavier_bush, with_popped);
    }

    #[rstest]
    fn hash_ignores_insertion_order_and_name_spelling(vocabulary: Arc<Vocabulary>) {
        let popped = || {
            EdgeModel::new(
                incidence("Weasel", 0.25, DegreeDistribution::Constant(2)),
                incidence("test.Monkey", 1.0, DegreeDistribution::Constant(1)),
            )
        };
        let forward = GraphModel::builder(Arc::clone(&vocabulary))
            .weight("Monkey", 1)
            .weight("Weasel", 3)
            .edge("chased", chased(0.5, DegreeDistribution::Constant(2)))
            .edge("popped", popped());
        let backward = GraphModel::builder(Arc::clone(&vocabulary))
            .edge("test.popped", popped())
            .edge("test.chased", chased(0.5, DegreeDistribution::Constant(2)))
            .weight("test.Weasel", 3)
            .weight("test.Monkey", 1);
        assert_eq!(hash_of(forward), hash_of(backward));
    }

    #[rstest]
    fn property_models_participate_in_the_hash(vocabulary: Arc<Vocabulary>) {
        let ages = |max| {
            PropertyModel::new()
                .with("age", PropertyGenerator::UniformInteger { min: 0, max })
                .expect("valid generator")
        };
        let young = hash_of(base(&vocabulary).vertex_properties("Monkey", ages(10)));
        let old = hash_of(base(&vocabulary).vertex_properties("Monkey", ages(90)));
        assert_ne!(young, old);
        assert_ne!(young, hash_of(base(&vocabulary)));
        assert_ne!(
            hash_of(base(&vocabulary).vertex_properties("Weasel", ages(10))),
            hash_of(base(&vocabulary).edge_properties("chased", ages(10)))
        );
    }

    #[rstest]
    fn endpoints_may_be_subtypes_of_the_declared_types(vocabulary: Arc<Vocabulary>) {
        let touched = EdgeModel::new(
            incidence("Monkey", 1.0, DegreeDistribution::Constant(1)),
            incidence("Weasel", 1.0, DegreeDistribution::Constant(0)),
        );
        let model = GraphModel::builder(vocabulary)
            .weight("Monkey", 1)
            .edge("touched", touched)
            .build()
            .expect("subtypes are compatible");
        let edge = &model.edge_models()[&QualifiedName::new("test", "touched")];
        assert_eq!(edge.domain.vertex_type(), &QualifiedName::new("test", "Monkey"));
    }

    #[rstest]
    #[case::unknown_partition_key(
        |b: GraphModelBuilder| b.weight("Giraffe", 1),
        "CONFIG_UNRESOLVED_ENTITY_TYPE"
    )]
    #[case::relation_as_partition_key(
        |b: GraphModelBuilder| b.weight("chased", 1),
        "CONFIG_UNRESOLVED_ENTITY_TYPE"
    )]
    #[case::zero_weight(|b: GraphModelBuilder| b.weight("Monkey", 0), "CONFIG_ZERO_WEIGHT")]
    #[case::unknown_relation(
        |b: GraphModelBuilder| b.edge("bit", chased(1.0, DegreeDistribution::Constant(1))),
        "CONFIG_UNRESOLVED_RELATION_TYPE"
    )]
    #[case::reversed_endpoints(
        |b: GraphModelBuilder| b.edge("popped", chased(1.0, DegreeDistribution::Constant(1))),
        "CONFIG_INCOMPATIBLE_ENDPOINT"
    )]
    #[case::unknown_property_owner(
        |b: GraphModelBuilder| b.vertex_properties("Giraffe", PropertyModel::new()),
        "CONFIG_UNRESOLVED_ENTITY_TYPE"
    )]
    fn build_rejects_unresolvable_models(
        vocabulary: Arc<Vocabulary>,
        #[case] change: fn(GraphModelBuilder) -> GraphModelBuilder,
        #[case] code: &str,
    ) {
        let err = change(GraphModel::builder(vocabulary))
            .build()
            .expect_err("model is invalid");
        assert_eq!(err.code().as_str(), code);
    }

    #[rstest]
    #[case(-0.1)]
    #[case(1.01)]
    #[case(f64::NAN)]
    fn incidence_rejects_probabilities_outside_unit_interval(#[case] probability: f64) {
        let err = Incidence::new("Monkey", probability, DegreeDistribution::Constant(1))
            .expect_err("probability is invalid");
        assert_eq!(err.code().as_str(), "CONFIG_INVALID_PROBABILITY");
    }

    #[test]
    fn zero_degree_or_probability_does_not_contribute() {
        assert!(!incidence("A", 0.0, DegreeDistribution::Constant(3)).contributes());
        assert!(!incidence("A", 1.0, DegreeDistribution::Constant(0)).contributes());
        assert!(incidence("A", 0.1, DegreeDistribution::Constant(1)).contributes());
    }
}
