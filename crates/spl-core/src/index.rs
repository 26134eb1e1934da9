//! Entity interning and relation lookup tables.
//!
//! Built once when an engine is initialized; read-only afterwards.

use std::collections::HashMap;
use std::sync::Arc;

use thiserror::Error;

use crate::relation::ConnectorPattern;

/// Dense index of an entity inside one engine.
pub type EntityId = usize;

/// Dense index of a connector pattern inside one engine's direction table.
pub type PatternId = usize;

/// A name listed twice when interning entities.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("duplicate entity `{0}`")]
pub struct DuplicateName(pub String);

#[derive(Clone, Debug, Default)]
pub struct EntityTable {
    names: Vec<String>,
    ids: HashMap<String, EntityId>,
}

impl EntityTable {
    /// Intern names in order, failing on the first repeated name.
    pub fn from_names<I, S>(names: I) -> Result<Self, DuplicateName>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut table = Self::default();
        for name in names {
            let name = name.into();
            if table.ids.contains_key(&name) {
                return Err(DuplicateName(name));
            }
            table.ids.insert(name.clone(), table.names.len());
            table.names.push(name);
        }
        Ok(table)
    }

    pub fn id(&self, name: &str) -> Option<EntityId> {
        self.ids.get(name).copied()
    }

    pub fn name(&self, id: EntityId) -> &str {
        &self.names[id]
    }

    pub fn names(&self) -> &[String] {
        &self.names
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }
}

/// A relation with interned endpoints and its shared direction vector.
#[derive(Clone, Debug)]
pub struct Relation {
    pub left: EntityId,
    pub right: EntityId,
    pub pattern: PatternId,
    pub direction: Arc<[f64]>,
    pub negated: bool,
    pub weight: f64,
}

/// Which side of a relation an entity sits on, as seen from an incidence entry.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Side {
    Left,
    Right,
}

#[derive(Clone, Copy, Debug)]
pub struct Incidence {
    pub relation: usize,
    pub side: Side,
}

#[derive(Clone, Debug)]
pub struct RelationIndex {
    relations: Vec<Relation>,
    patterns: Vec<ConnectorPattern>,
    incident: Vec<Vec<Incidence>>,
    by_pattern: Vec<Vec<usize>>,
    pattern_entities: Vec<Vec<EntityId>>,
}

impl RelationIndex {
    /// Build the lookup tables. Callers guarantee every endpoint is `< entity_count` and
    /// every pattern id is `< patterns.len()`.
    pub fn build(
        entity_count: usize,
        patterns: Vec<ConnectorPattern>,
        relations: Vec<Relation>,
    ) -> Self {
        let mut incident = vec![Vec::new(); entity_count];
        let mut by_pattern = vec![Vec::new(); patterns.len()];
        let mut pattern_entities: Vec<Vec<EntityId>> = vec![Vec::new(); patterns.len()];

        for (idx, rel) in relations.iter().enumerate() {
            // A self-relation is incident twice, once per side.
            incident[rel.left].push(Incidence {
                relation: idx,
                side: Side::Left,
            });
            incident[rel.right].push(Incidence {
                relation: idx,
                side: Side::Right,
            });
            by_pattern[rel.pattern].push(idx);
            let touched = &mut pattern_entities[rel.pattern];
            for entity in [rel.left, rel.right] {
                if !touched.contains(&entity) {
                    touched.push(entity);
                }
            }
        }

        Self {
            relations,
            patterns,
            incident,
            by_pattern,
            pattern_entities,
        }
    }

    pub fn relation(&self, idx: usize) -> &Relation {
        &self.relations[idx]
    }

    pub fn relations(&self) -> &[Relation] {
        &self.relations
    }

    pub fn incident(&self, entity: EntityId) -> &[Incidence] {
        self.incident.get(entity).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn relations_for_pattern(&self, pattern: PatternId) -> &[usize] {
        self.by_pattern.get(pattern).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Entities touched by any relation of `pattern`, in first-appearance order
    /// (left before right).
    pub fn entities_for_pattern(&self, pattern: PatternId) -> &[EntityId] {
        self.pattern_entities
            .get(pattern)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    pub fn pattern(&self, id: PatternId) -> &ConnectorPattern {
        &self.patterns[id]
    }

    pub fn pattern_count(&self) -> usize {
        self.patterns.len()
    }

    pub fn len(&self) -> usize {
        self.relations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.relations.is_empty()
    }
}
