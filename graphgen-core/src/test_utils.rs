//! Shared test utilities for `graphgen-core`.

use std::sync::{Arc, Mutex, PoisonError};

use graphgen_test_support::proptest_profile::ProptestRunProfile;
use proptest::test_runner::Config as ProptestConfig;

use crate::{
    Backend, DegreeDistribution, EdgeModel, EdgeWrite, EntityType, GraphModel, Incidence,
    PropertyGenerator, PropertyModel, RelationType, Status, VertexWrite, Vocabulary,
    VocabularyBuilder, WriteRequest, error::BackendError,
};

/// Builds a proptest configuration from the shared run profile.
#[must_use]
pub(crate) fn suite_proptest_config(default_cases: u32) -> ProptestConfig {
    let profile = ProptestRunProfile::load(default_cases, false);
    ProptestConfig {
        cases: profile.cases(),
        fork: profile.fork(),
        ..ProptestConfig::default()
    }
}

/// [`Backend`] that keeps every write it receives.
#[derive(Default)]
pub(crate) struct RecordingBackend {
    writes: Mutex<Vec<WriteRequest>>,
    lifecycle: Mutex<Vec<&'static str>>,
    refuse_init: bool,
}

impl RecordingBackend {
    /// A backend whose `init` fails.
    pub(crate) fn refusing_init() -> Self {
        Self {
            refuse_init: true,
            ..Self::default()
        }
    }

    /// Lifecycle calls received so far.
    pub(crate) fn lifecycle(&self) -> Vec<&'static str> {
        self.lifecycle
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    fn note(&self, call: &'static str) {
        self.lifecycle
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(call);
    }

    /// Everything written so far, in arrival order.
    pub(crate) fn writes(&self) -> Vec<WriteRequest> {
        self.writes
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Everything written so far, sorted for multiset comparison.
    pub(crate) fn sorted_writes(&self) -> Vec<WriteRequest> {
        let mut writes = self.writes();
        writes.sort();
        writes
    }

    fn push(&self, request: WriteRequest) -> Status {
        self.writes
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(request);
        Status::Ok
    }
}

impl Backend for RecordingBackend {
    fn name(&self) -> &str {
        "recording"
    }

    fn init(&self) -> Result<(), BackendError> {
        self.note("init");
        if self.refuse_init {
            return Err(BackendError::Lifecycle {
                backend: Arc::from("recording"),
                operation: "init",
                message: Arc::from("refused"),
            });
        }
        Ok(())
    }

    fn cleanup(&self) -> Result<(), BackendError> {
        self.note("cleanup");
        Ok(())
    }

    fn write_vertex(&self, write: &VertexWrite) -> Status {
        self.push(WriteRequest::Vertex(write.clone()))
    }

    fn write_edge(&self, write: &EdgeWrite) -> Status {
        self.push(WriteRequest::Edge(write.clone()))
    }
}

/// The `test` vocabulary: monkeys chase weasels, weasels pop monkeys.
pub(crate) fn zoo_vocabulary() -> Arc<Vocabulary> {
    Arc::new(
        VocabularyBuilder::new("test")
            .entity(EntityType::new("Monkey"))
            .entity(EntityType::new("Weasel"))
            .entity(EntityType::new("MulberryBush"))
            .relation(RelationType::new("chased", "Monkey", "Weasel"))
            .relation(RelationType::new("popped", "Weasel", "Monkey"))
            .relation(RelationType::new("circled", "Monkey", "MulberryBush"))
            .build()
            .expect("zoo vocabulary is valid"),
    )
}

/// A model exercising both edge sides, log-normal degrees and properties.
pub(crate) fn zoo_model() -> Arc<GraphModel> {
    let incidence = |vertex_type: &str, probability: f64, degree: DegreeDistribution| {
        Incidence::new(vertex_type, probability, degree).expect("probability is valid")
    };
    let chased = EdgeModel::new(
        incidence(
            "Monkey",
            0.9543,
            DegreeDistribution::log_normal(0.7813873, 1.0293729).expect("valid parameters"),
        ),
        incidence("Weasel", 1.0, DegreeDistribution::Constant(0)),
    );
    let popped = EdgeModel::new(
        incidence("Weasel", 0.5, DegreeDistribution::Constant(2)),
        incidence("Monkey", 0.25, DegreeDistribution::Constant(1)),
    );
    let circled = EdgeModel::new(
        incidence("Monkey", 0.3, DegreeDistribution::Constant(1)),
        incidence("MulberryBush", 0.0, DegreeDistribution::Constant(4)),
    );
    let monkey_properties = PropertyModel::new()
        .with("age", PropertyGenerator::UniformInteger { min: 1, max: 40 })
        .and_then(|model| model.with("name", PropertyGenerator::Alphanumeric { length: 6 }))
        .expect("valid property model");
    let edge_properties = PropertyModel::new()
        .with("fierce", PropertyGenerator::Boolean { probability: 0.5 })
        .expect("valid property model");
    Arc::new(
        GraphModel::builder(zoo_vocabulary())
            .weight("Monkey", 3)
            .weight("Weasel", 2)
            .weight("MulberryBush", 1)
            .edge("chased", chased)
            .edge("popped", popped)
            .edge("circled", circled)
            .vertex_properties("Monkey", monkey_properties)
            .edge_properties("chased", edge_properties)
            .build()
            .expect("zoo model is valid"),
    )
}
