//! JSON model files.
//!
//! A model file carries an inline vocabulary next to the generation model:
//!
//! ```json
//! {
//!   "vocabulary": {
//!     "name": "zoo",
//!     "entities": [{ "name": "Monkey" }, { "name": "Weasel" }],
//!     "relations": [{ "name": "chased", "from": "Monkey", "to": "Weasel" }]
//!   },
//!   "weights": { "Monkey": 3, "Weasel": 2 },
//!   "edges": {
//!     "chased": {
//!       "domain": { "type": "Monkey", "probability": 0.9,
//!                   "degree": { "log_normal": { "log_mean": 0.8, "log_sd": 1.0 } } },
//!       "range": { "type": "Weasel", "probability": 0.0, "degree": { "constant": 0 } }
//!     }
//!   },
//!   "vertex_properties": { "Monkey": { "age": { "uniform_integer": { "min": 1, "max": 40 } } } }
//! }
//! ```

use std::{collections::BTreeMap, fs, path::Path, sync::Arc};

use graphgen_core::{
    ConfigurationError, DegreeDistribution, EdgeModel, EntityType, GraphModel, Incidence,
    PropertyGenerator, PropertyModel, PropertyValue, RelationType, VocabularyBuilder,
};
use serde::Deserialize;

use super::CliError;

/// Top-level model file document.
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ModelFile {
    /// Inline vocabulary.
    pub vocabulary: VocabularyDef,
    /// Relative vertex weights by entity type.
    pub weights: BTreeMap<String, u64>,
    /// Edge models by relation type.
    #[serde(default)]
    pub edges: BTreeMap<String, EdgeDef>,
    /// Property models by entity type.
    #[serde(default)]
    pub vertex_properties: BTreeMap<String, BTreeMap<String, GeneratorDef>>,
    /// Property models by relation type.
    #[serde(default)]
    pub edge_properties: BTreeMap<String, BTreeMap<String, GeneratorDef>>,
}

/// Vocabulary section.
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct VocabularyDef {
    /// Namespace of unqualified definitions.
    pub name: String,
    /// Entity types.
    #[serde(default)]
    pub entities: Vec<EntityDef>,
    /// Relation types.
    #[serde(default)]
    pub relations: Vec<RelationDef>,
}

/// One entity type.
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct EntityDef {
    /// Type name.
    pub name: String,
    /// Parent types.
    #[serde(default)]
    pub extends: Vec<String>,
}

/// One relation type.
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RelationDef {
    /// Relation name.
    pub name: String,
    /// Domain entity type.
    pub from: String,
    /// Range entity type.
    pub to: String,
}

/// Both incidences of a relation.
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct EdgeDef {
    /// Domain-side incidence.
    pub domain: IncidenceDef,
    /// Range-side incidence.
    pub range: IncidenceDef,
}

/// One endpoint's participation.
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct IncidenceDef {
    /// Vertex type of this endpoint.
    #[serde(rename = "type")]
    pub vertex_type: String,
    /// Chance a vertex takes part.
    pub probability: f64,
    /// Degree of a participating vertex.
    pub degree: DegreeDef,
}

/// Degree distribution.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "snake_case", deny_unknown_fields)]
pub enum DegreeDef {
    /// A fixed degree.
    Constant(u64),
    /// A rounded log-normal degree.
    LogNormal {
        /// Mean of the underlying normal.
        log_mean: f64,
        /// Standard deviation of the underlying normal.
        log_sd: f64,
    },
}

/// Property generator.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "snake_case", deny_unknown_fields)]
pub enum GeneratorDef {
    /// A fixed value.
    Constant(ValueDef),
    /// An inclusive integer range.
    UniformInteger {
        /// Lower bound.
        min: i64,
        /// Upper bound.
        max: i64,
    },
    /// A biased coin.
    Boolean {
        /// Probability of `true`.
        probability: f64,
    },
    /// A random alphanumeric string.
    Alphanumeric {
        /// Number of characters.
        length: usize,
    },
}

/// A literal property value.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub enum ValueDef {
    /// JSON boolean.
    Boolean(bool),
    /// JSON integer.
    Integer(i64),
    /// JSON string.
    Text(String),
}

impl DegreeDef {
    fn build(&self) -> Result<DegreeDistribution, ConfigurationError> {
        match *self {
            Self::Constant(degree) => Ok(DegreeDistribution::Constant(degree)),
            Self::LogNormal { log_mean, log_sd } => DegreeDistribution::log_normal(log_mean, log_sd),
        }
    }
}

impl IncidenceDef {
    fn build(&self) -> Result<Incidence, ConfigurationError> {
        Incidence::new(self.vertex_type.as_str(), self.probability, self.degree.build()?)
    }
}

impl GeneratorDef {
    fn build(&self) -> PropertyGenerator {
        match self {
            Self::Constant(value) => PropertyGenerator::Constant(match value {
                ValueDef::Boolean(flag) => PropertyValue::Boolean(*flag),
                ValueDef::Integer(number) => PropertyValue::Integer(*number),
                ValueDef::Text(text) => PropertyValue::Text(text.clone()),
            }),
            Self::UniformInteger { min, max } => PropertyGenerator::UniformInteger {
                min: *min,
                max: *max,
            },
            Self::Boolean { probability } => PropertyGenerator::Boolean {
                probability: *probability,
            },
            Self::Alphanumeric { length } => PropertyGenerator::Alphanumeric { length: *length },
        }
    }
}

fn property_model(
    generators: &BTreeMap<String, GeneratorDef>,
) -> Result<PropertyModel, ConfigurationError> {
    let mut model = PropertyModel::new();
    for (key, generator) in generators {
        model.insert(key.as_str(), generator.build())?;
    }
    Ok(model)
}

impl ModelFile {
    /// Parses a model document.
    ///
    /// # Errors
    /// Returns the `serde_json` error for malformed documents.
    pub fn parse(text: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(text)
    }

    /// Validates the document and builds the model.
    ///
    /// # Errors
    /// Returns the first [`ConfigurationError`] found by the vocabulary or
    /// model builders.
    pub fn build(&self) -> Result<GraphModel, ConfigurationError> {
        let vocabulary = self
            .vocabulary
            .entities
            .iter()
            .fold(VocabularyBuilder::new(&self.vocabulary.name), |builder, def| {
                let entity = def
                    .extends
                    .iter()
                    .fold(EntityType::new(def.name.as_str()), |entity, parent| {
                        entity.extending(parent.as_str())
                    });
                builder.entity(entity)
            });
        let vocabulary = self
            .vocabulary
            .relations
            .iter()
            .fold(vocabulary, |builder, def| {
                builder.relation(RelationType::new(
                    def.name.as_str(),
                    def.from.as_str(),
                    def.to.as_str(),
                ))
            })
            .build()?;

        let mut builder = GraphModel::builder(Arc::new(vocabulary));
        for (vertex_type, &weight) in &self.weights {
            builder = builder.weight(vertex_type.as_str(), weight);
        }
        for (relation, edge) in &self.edges {
            builder = builder.edge(
                relation.as_str(),
                EdgeModel::new(edge.domain.build()?, edge.range.build()?),
            );
        }
        for (vertex_type, generators) in &self.vertex_properties {
            builder = builder.vertex_properties(vertex_type.as_str(), property_model(generators)?);
        }
        for (relation, generators) in &self.edge_properties {
            builder = builder.edge_properties(relation.as_str(), property_model(generators)?);
        }
        builder.build()
    }
}

/// Reads and builds the model at `path`.
///
/// # Errors
/// Returns [`CliError::Io`], [`CliError::ModelFile`] or a configuration
/// error wrapped in [`CliError::Core`].
pub fn load_model(path: &Path) -> Result<GraphModel, CliError> {
    let text = fs::read_to_string(path).map_err(|source| CliError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let file = ModelFile::parse(&text).map_err(|source| CliError::ModelFile {
        path: path.to_path_buf(),
        source,
    })?;
    Ok(file.build().map_err(graphgen_core::GraphGenError::from)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use graphgen_core::{ConfigurationErrorCode, QualifiedName};
    use rstest::rstest;

    const ZOO: &str = r#"{
        "vocabulary": {
            "name": "zoo",
            "entities": [
                { "name": "Animal" },
                { "name": "Monkey", "extends": ["Animal"] },
                { "name": "Weasel", "extends": ["Animal"] }
            ],
            "relations": [{ "name": "chased", "from": "Animal", "to": "Weasel" }]
        },
        "weights": { "Monkey": 3, "Weasel": 2 },
        "edges": {
            "chased": {
                "domain": { "type": "Monkey", "probability": 0.9,
                            "degree": { "log_normal": { "log_mean": 0.8, "log_sd": 1.0 } } },
                "range": { "type": "Weasel", "probability": 0.0, "degree": { "constant": 0 } }
            }
        },
        "vertex_properties": {
            "Monkey": {
                "age": { "uniform_integer": { "min": 1, "max": 40 } },
                "kind": { "constant": "primate" }
            }
        },
        "edge_properties": { "chased": { "fierce": { "boolean": { "probability": 0.5 } } } }
    }"#;

    #[test]
    fn a_complete_document_builds() {
        let model = ModelFile::parse(ZOO)
            .expect("document parses")
            .build()
            .expect("model is valid");
        let monkey = QualifiedName::new("zoo", "Monkey");
        assert_eq!(model.partitioner().weight(&monkey), Some(3));
        assert_eq!(model.edge_models().len(), 1);
        let properties = model.vertex_properties(&monkey).expect("monkeys have properties");
        assert_eq!(properties.iter().count(), 2);
        assert!(model
            .edge_properties(&QualifiedName::new("zoo", "chased"))
            .is_some());
    }

    #[test]
    fn unknown_fields_are_rejected() {
        let err = ModelFile::parse(r#"{ "vocabulary": { "name": "x" }, "weights": {}, "extra": 1 }"#)
            .expect_err("extra is not a field");
        assert!(err.to_string().contains("extra"));
    }

    #[rstest]
    #[case(r#""probability": 0.9"#, r#""probability": 1.9"#, ConfigurationErrorCode::InvalidProbability)]
    #[case(r#""Monkey": 3"#, r#""Monkey": 0"#, ConfigurationErrorCode::ZeroWeight)]
    #[case(r#""from": "Animal""#, r#""from": "Gorilla""#, ConfigurationErrorCode::UnresolvedEntityType)]
    #[case(r#""min": 1"#, r#""min": 50"#, ConfigurationErrorCode::InvalidPropertyGenerator)]
    fn invalid_documents_report_configuration_codes(
        #[case] original: &str,
        #[case] replacement: &str,
        #[case] expected: ConfigurationErrorCode,
    ) {
        let text = ZOO.replacen(original, replacement, 1);
        let err = ModelFile::parse(&text)
            .expect("document parses")
            .build()
            .expect_err("document is invalid");
        assert_eq!(err.code(), expected);
    }
}
