//! Entity and relation type definitions the graph model refers to.
//!
//! Schema files are parsed elsewhere; this module only holds the validated
//! result and answers the name-resolution questions the model asks.

use std::{
    collections::{BTreeMap, BTreeSet},
    sync::Arc,
};

use crate::{
    QualifiedName,
    canonical::{Canonical, CanonicalEncoder},
    error::ConfigurationError,
};

/// A vertex type, optionally inheriting from other entity types.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EntityType {
    name: QualifiedName,
    extends: Vec<QualifiedName>,
}

impl EntityType {
    /// Declares an entity type with no parents.
    #[must_use]
    pub fn new(name: impl Into<QualifiedName>) -> Self {
        Self {
            name: name.into(),
            extends: Vec::new(),
        }
    }

    /// Adds a parent type.
    #[must_use]
    pub fn extending(mut self, parent: impl Into<QualifiedName>) -> Self {
        self.extends.push(parent.into());
        self
    }

    /// Returns the type's name.
    #[must_use]
    pub fn name(&self) -> &QualifiedName {
        &self.name
    }

    /// Returns the direct parents of this type.
    #[must_use]
    pub fn extends(&self) -> &[QualifiedName] {
        &self.extends
    }
}

/// A relation type connecting a `from` entity type to a `to` entity type.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RelationType {
    name: QualifiedName,
    from: QualifiedName,
    to: QualifiedName,
}

impl RelationType {
    /// Declares a relation type.
    #[must_use]
    pub fn new(
        name: impl Into<QualifiedName>,
        from: impl Into<QualifiedName>,
        to: impl Into<QualifiedName>,
    ) -> Self {
        Self {
            name: name.into(),
            from: from.into(),
            to: to.into(),
        }
    }

    /// Returns the relation's name.
    #[must_use]
    pub fn name(&self) -> &QualifiedName {
        &self.name
    }

    /// Returns the entity type edges start from.
    #[must_use]
    pub fn from(&self) -> &QualifiedName {
        &self.from
    }

    /// Returns the entity type edges point to.
    #[must_use]
    pub fn to(&self) -> &QualifiedName {
        &self.to
    }
}

/// A validated, immutable set of entity and relation types.
///
/// # Examples
/// ```
/// use graphgen_core::{EntityType, QualifiedName, RelationType, VocabularyBuilder};
///
/// let vocabulary = VocabularyBuilder::new("zoo")
///     .entity(EntityType::new("core.Thing"))
///     .entity(EntityType::new("Monkey").extending("core.Thing"))
///     .entity(EntityType::new("Weasel").extending("core.Thing"))
///     .relation(RelationType::new("chased", "Monkey", "Weasel"))
///     .build()?;
///
/// let monkey = vocabulary.resolve_entity(&QualifiedName::parse("Monkey"))?;
/// assert_eq!(monkey.name().to_string(), "zoo.Monkey");
/// assert!(vocabulary.is_a(monkey.name(), &QualifiedName::parse("core.Thing")));
/// # Ok::<(), graphgen_core::ConfigurationError>(())
/// ```
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Vocabulary {
    name: Arc<str>,
    entities: BTreeMap<QualifiedName, EntityType>,
    relations: BTreeMap<QualifiedName, RelationType>,
}

impl Vocabulary {
    /// Returns the vocabulary's name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Iterates entity types in name order.
    pub fn entity_types(&self) -> impl Iterator<Item = &EntityType> {
        self.entities.values()
    }

    /// Iterates relation types in name order.
    pub fn relation_types(&self) -> impl Iterator<Item = &RelationType> {
        self.relations.values()
    }

    /// Resolves `name` to an entity type.
    ///
    /// # Errors
    /// Returns [`ConfigurationError::UnresolvedEntityType`] when nothing
    /// matches and [`ConfigurationError::AmbiguousName`] when an unqualified
    /// name matches several namespaces.
    pub fn resolve_entity(&self, name: &QualifiedName) -> Result<&EntityType, ConfigurationError> {
        lookup(&self.entities, name)?.ok_or_else(|| ConfigurationError::UnresolvedEntityType {
            name: name.to_arc(),
            vocabulary: Arc::clone(&self.name),
        })
    }

    /// Resolves `name` to a relation type.
    ///
    /// # Errors
    /// Returns [`ConfigurationError::UnresolvedRelationType`] when nothing
    /// matches and [`ConfigurationError::AmbiguousName`] when an unqualified
    /// name matches several namespaces.
    pub fn resolve_relation(
        &self,
        name: &QualifiedName,
    ) -> Result<&RelationType, ConfigurationError> {
        lookup(&self.relations, name)?.ok_or_else(|| ConfigurationError::UnresolvedRelationType {
            name: name.to_arc(),
            vocabulary: Arc::clone(&self.name),
        })
    }

    /// Returns whether `child` is `ancestor` or inherits from it transitively.
    ///
    /// Both names are resolved first; unresolvable names are never related.
    #[must_use]
    pub fn is_a(&self, child: &QualifiedName, ancestor: &QualifiedName) -> bool {
        let (Ok(child), Ok(ancestor)) = (self.resolve_entity(child), self.resolve_entity(ancestor))
        else {
            return false;
        };
        let target = ancestor.name();
        let mut stack = vec![child.name()];
        let mut seen = BTreeSet::new();
        while let Some(current) = stack.pop() {
            if current == target {
                return true;
            }
            if !seen.insert(current) {
                continue;
            }
            if let Some(entity) = self.entities.get(current) {
                stack.extend(entity.extends.iter());
            }
        }
        false
    }
}

impl Canonical for Vocabulary {
    fn encode(&self, encoder: &mut CanonicalEncoder) {
        encoder.section("vocabulary");
        encoder.str(&self.name);
        encoder.count(self.entities.len());
        for entity in self.entities.values() {
            entity.name.encode(encoder);
            encoder.count(entity.extends.len());
            let parents: BTreeSet<_> = entity.extends.iter().collect();
            for parent in parents {
                parent.encode(encoder);
            }
        }
        encoder.count(self.relations.len());
        for relation in self.relations.values() {
            relation.name.encode(encoder);
            relation.from.encode(encoder);
            relation.to.encode(encoder);
        }
    }
}

/// Collects definitions and validates them into a [`Vocabulary`].
///
/// Unqualified names passed to the builder are placed in the vocabulary's
/// own namespace, which is its name.
#[derive(Clone, Debug)]
pub struct VocabularyBuilder {
    name: Arc<str>,
    entities: Vec<EntityType>,
    relations: Vec<RelationType>,
}

impl VocabularyBuilder {
    /// Starts an empty vocabulary named `name`.
    #[must_use]
    pub fn new(name: impl AsRef<str>) -> Self {
        Self {
            name: Arc::from(name.as_ref()),
            entities: Vec::new(),
            relations: Vec::new(),
        }
    }

    /// Adds an entity type.
    #[must_use]
    pub fn entity(mut self, entity: EntityType) -> Self {
        self.entities.push(entity);
        self
    }

    /// Adds a relation type.
    #[must_use]
    pub fn relation(mut self, relation: RelationType) -> Self {
        self.relations.push(relation);
        self
    }

    /// Validates the definitions.
    ///
    /// # Errors
    /// Returns [`ConfigurationError::DuplicateDefinition`] for repeated names,
    /// an unresolved or ambiguous error for dangling `extends`, `from` or `to`
    /// references, and [`ConfigurationError::InheritanceCycle`] when an entity
    /// inherits from itself.
    pub fn build(self) -> Result<Vocabulary, ConfigurationError> {
        let namespace = Arc::clone(&self.name);
        let mut entities = BTreeMap::new();
        for entity in self.entities {
            let name = entity.name.in_namespace(&namespace);
            if entities.contains_key(&name) {
                return Err(ConfigurationError::DuplicateDefinition { name: name.to_arc() });
            }
            entities.insert(name.clone(), EntityType { name, ..entity });
        }

        let mut vocabulary = Vocabulary {
            name: self.name,
            entities,
            relations: BTreeMap::new(),
        };

        let mut resolved_entities = BTreeMap::new();
        for (name, entity) in &vocabulary.entities {
            let extends = entity
                .extends
                .iter()
                .map(|parent| Ok(vocabulary.resolve_entity(parent)?.name.clone()))
                .collect::<Result<Vec<_>, ConfigurationError>>()?;
            resolved_entities.insert(
                name.clone(),
                EntityType {
                    name: name.clone(),
                    extends,
                },
            );
        }
        vocabulary.entities = resolved_entities;
        detect_cycles(&vocabulary.entities)?;

        for relation in self.relations {
            let name = relation.name.in_namespace(&namespace);
            if vocabulary.relations.contains_key(&name) {
                return Err(ConfigurationError::DuplicateDefinition { name: name.to_arc() });
            }
            let from = vocabulary.resolve_entity(&relation.from)?.name.clone();
            let to = vocabulary.resolve_entity(&relation.to)?.name.clone();
            vocabulary
                .relations
                .insert(name.clone(), RelationType { name, from, to });
        }

        Ok(vocabulary)
    }
}

fn lookup<'a, T>(
    definitions: &'a BTreeMap<QualifiedName, T>,
    name: &QualifiedName,
) -> Result<Option<&'a T>, ConfigurationError> {
    if let Some(found) = definitions.get(name) {
        return Ok(Some(found));
    }
    if name.is_qualified() {
        return Ok(None);
    }
    let mut matches = definitions
        .iter()
        .filter(|(candidate, _)| candidate.local_name() == name.local_name());
    let first = matches.next();
    if matches.next().is_some() {
        return Err(ConfigurationError::AmbiguousName { name: name.to_arc() });
    }
    Ok(first.map(|(_, definition)| definition))
}

fn detect_cycles(entities: &BTreeMap<QualifiedName, EntityType>) -> Result<(), ConfigurationError> {
    #[derive(Clone, Copy, PartialEq)]
    enum Mark {
        Visiting,
        Done,
    }

    fn visit<'a>(
        name: &'a QualifiedName,
        entities: &'a BTreeMap<QualifiedName, EntityType>,
        marks: &mut BTreeMap<&'a QualifiedName, Mark>,
    ) -> Result<(), ConfigurationError> {
        match marks.get(name) {
            Some(Mark::Done) => return Ok(()),
            Some(Mark::Visiting) => {
                return Err(ConfigurationError::InheritanceCycle { name: name.to_arc() });
            }
            None => {}
        }
        marks.insert(name, Mark::Visiting);
        if let Some(entity) = entities.get(name) {
            for parent in &entity.extends {
                visit(parent, entities, marks)?;
            }
        }
        marks.insert(name, Mark::Done);
        Ok(())
    }

    let mut marks = BTreeMap::new();
    for name in entities.keys() {
        visit(name, entities, &mut marks)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::{fixture, rstest};

    #[fixture]
    fn zoo() -> Vocabulary {
        VocabularyBuilder::new("test")
            .entity(EntityType::new("core.Thing"))
            .entity(EntityType::new("Monkey").extending("core.Thing"))
            .entity(EntityType::new("Weasel").extending("core.Thing"))
            .entity(EntityType::new("MulberryBush"))
            .relation(RelationType::new("chased", "Monkey", "Weasel"))
            .relation(RelationType::new("popped", "Weasel", "Monkey"))
            .build()
            .expect("zoo vocabulary is valid")
    }

    #[rstest]
    fn unqualified_names_resolve_into_vocabulary_namespace(zoo: Vocabulary) {
        let weasel = zoo
            .resolve_entity(&QualifiedName::parse("Weasel"))
            .expect("Weasel resolves");
        assert_eq!(weasel.name(), &QualifiedName::new("test", "Weasel"));
        let chased = zoo
            .resolve_relation(&QualifiedName::parse("chased"))
            .expect("chased resolves");
        assert_eq!(chased.from(), &QualifiedName::new("test", "Monkey"));
        assert_eq!(chased.to(), &QualifiedName::new("test", "Weasel"));
    }

    #[rstest]
    fn inheritance_is_transitive_and_reflexive(zoo: Vocabulary) {
        let monkey = QualifiedName::parse("Monkey");
        assert!(zoo.is_a(&monkey, &QualifiedName::parse("core.Thing")));
        assert!(zoo.is_a(&monkey, &monkey));
        assert!(!zoo.is_a(&QualifiedName::parse("MulberryBush"), &monkey));
    }

    #[rstest]
    fn unknown_names_fail_to_resolve(zoo: Vocabulary) {
        let err = zoo
            .resolve_entity(&QualifiedName::parse("Giraffe"))
            .expect_err("Giraffe is not defined");
        assert!(matches!(err, ConfigurationError::UnresolvedEntityType { .. }));
    }

    #[test]
    fn ambiguous_unqualified_names_are_rejected() {
        let vocabulary = VocabularyBuilder::new("test")
            .entity(EntityType::new("a.Node"))
            .entity(EntityType::new("b.Node"))
            .build()
            .expect("distinct namespaces are allowed");
        let err = vocabulary
            .resolve_entity(&QualifiedName::parse("Node"))
            .expect_err("unqualified Node is ambiguous");
        assert!(matches!(err, ConfigurationError::AmbiguousName { .. }));
    }

    #[rstest]
    #[case::duplicate(
        VocabularyBuilder::new("v").entity(EntityType::new("A")).entity(EntityType::new("v.A")),
        "CONFIG_DUPLICATE_DEFINITION"
    )]
    #[case::dangling_parent(
        VocabularyBuilder::new("v").entity(EntityType::new("A").extending("Missing")),
        "CONFIG_UNRESOLVED_ENTITY_TYPE"
    )]
    #[case::dangling_endpoint(
        VocabularyBuilder::new("v")
            .entity(EntityType::new("A"))
            .relation(RelationType::new("r", "A", "Missing")),
        "CONFIG_UNRESOLVED_ENTITY_TYPE"
    )]
    #[case::cycle(
        VocabularyBuilder::new("v")
            .entity(EntityType::new("A").extending("B"))
            .entity(EntityType::new("B").extending("A")),
        "CONFIG_INHERITANCE_CYCLE"
    )]
    fn build_rejects_invalid_definitions(#[case] builder: VocabularyBuilder, #[case] code: &str) {
        let err = builder.build().expect_err("definitions are invalid");
        assert_eq!(err.code().as_str(), code);
    }
}
