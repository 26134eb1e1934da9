use std::sync::Arc;

use crate::index::{EntityId, PatternId};

/// One candidate position for an entity.
#[derive(Clone, Debug)]
pub struct PreyAgent {
    pub entity: EntityId,
    pub position: Vec<f64>,
    pub velocity: Vec<f64>,
    pub energy: f64,
    pub age: u32,
}

impl PreyAgent {
    pub fn new(entity: EntityId, position: Vec<f64>, energy: f64) -> Self {
        let dims = position.len();
        Self {
            entity,
            position,
            velocity: vec![0.0; dims],
            energy,
            age: 0,
        }
    }
}

/// A constraint enforcer bound to one connector pattern for its whole life.
#[derive(Clone, Debug)]
pub struct PredatorAgent {
    pub pattern: PatternId,
    /// Shared with every relation and predator using the same pattern.
    pub direction: Arc<[f64]>,
    pub position: Vec<f64>,
    pub velocity: Vec<f64>,
    pub energy: f64,
    pub age: u32,
}

impl PredatorAgent {
    pub fn new(pattern: PatternId, direction: Arc<[f64]>, position: Vec<f64>, energy: f64) -> Self {
        let dims = position.len();
        Self {
            pattern,
            direction,
            position,
            velocity: vec![0.0; dims],
            energy,
            age: 0,
        }
    }

    /// Offspring keep the parent's pattern and share its direction.
    pub fn offspring(&self, position: Vec<f64>, energy: f64) -> Self {
        Self::new(self.pattern, Arc::clone(&self.direction), position, energy)
    }
}
