//! Helpers shared by the integration tests.

use std::sync::{Arc, Mutex, PoisonError};

use graphgen_core::{
    Backend, DegreeDistribution, EdgeModel, EdgeWrite, EntityType, GraphModel, Incidence,
    RelationType, Status, VertexWrite, Vocabulary, VocabularyBuilder, WriteRequest,
};

/// Keeps every write it receives.
#[derive(Default)]
pub struct Collecting {
    writes: Mutex<Vec<WriteRequest>>,
}

impl Collecting {
    #[must_use]
    pub fn sorted(&self) -> Vec<WriteRequest> {
        let mut writes = self
            .writes
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone();
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

impl Backend for Collecting {
    fn name(&self) -> &str {
        "collecting"
    }

    fn write_vertex(&self, write: &VertexWrite) -> Status {
        self.push(write.clone().into())
    }

    fn write_edge(&self, write: &EdgeWrite) -> Status {
        self.push(write.clone().into())
    }
}

#[must_use]
pub fn social_vocabulary() -> Arc<Vocabulary> {
    Arc::new(
        VocabularyBuilder::new("social")
            .entity(EntityType::new("Agent"))
            .entity(EntityType::new("Person").extending("Agent"))
            .entity(EntityType::new("Post"))
            .relation(RelationType::new("knows", "Person", "Person"))
            .relation(RelationType::new("wrote", "Agent", "Post"))
            .build()
            .expect("social vocabulary is valid"),
    )
}

#[must_use]
pub fn social_model() -> GraphModel {
    GraphModel::builder(social_vocabulary())
        .weight("Person", 4)
        .weight("Post", 6)
        .edge(
            "knows",
            EdgeModel::new(
                Incidence::new(
                    "Person",
                    0.8,
                    DegreeDistribution::log_normal(1.0, 0.5).expect("valid parameters"),
                )
                .expect("valid probability"),
                Incidence::new("Person", 0.1, DegreeDistribution::Constant(1))
                    .expect("valid probability"),
            ),
        )
        .edge(
            "wrote",
            EdgeModel::new(
                Incidence::new("Person", 1.0, DegreeDistribution::Constant(3))
                    .expect("valid probability"),
                Incidence::new("Post", 0.0, DegreeDistribution::Constant(0))
                    .expect("valid probability"),
            ),
        )
        .build()
        .expect("social model is valid")
}
