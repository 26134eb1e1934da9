use std::collections::BTreeMap;
use std::time::Instant;

use rand_chacha::ChaCha12Rng;
use thiserror::Error;
use tracing::{debug, info, trace};

use crate::agent::{PredatorAgent, PreyAgent};
use crate::config::{EngineConfig, EngineConfigError};
use crate::constants::UNIT_NORM_TOLERANCE;
use crate::geometry;
use crate::index::{EntityId, EntityTable, Relation, RelationIndex};
use crate::metrics::{self, EntitySpread, PopulationStats, RunSummary};
use crate::relation::{ConnectorDirections, ConnectorEntry, ConnectorPattern, RelationSpec};
use crate::rng;
use crate::violation::{self, PartnerMeans};
use crate::{PopulationMap, PositionMap};

#[derive(Clone, Debug)]
pub struct StepTimings {
    /// Predator and prey decisions (phases 1-2).
    pub decision_us: u64,
    /// Movement and capture (phases 3-4).
    pub movement_us: u64,
    /// Energy, death, reproduction, aging and annealing (phases 5-9).
    pub lifecycle_us: u64,
    pub total_us: u64,
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum EngineInitError {
    #[error(transparent)]
    Config(#[from] EngineConfigError),
    #[error("entity list must not be empty")]
    NoEntities,
    #[error("duplicate entity `{0}`")]
    DuplicateEntity(String),
    #[error("relation references unknown entity `{0}`")]
    UnknownEntity(String),
    #[error("relation `{left}` -> `{right}` has invalid weight {weight}; must be finite and non-negative")]
    InvalidWeight {
        left: String,
        right: String,
        weight: f64,
    },
    #[error("no direction vector for connector pattern `{0}`")]
    MissingDirection(ConnectorPattern),
    #[error("direction for `{pattern}` has {actual} dimensions, expected {expected}")]
    DirectionDimensionMismatch {
        pattern: ConnectorPattern,
        expected: usize,
        actual: usize,
    },
    #[error("direction for `{pattern}` is not unit length (norm {norm})")]
    DirectionNotUnit { pattern: ConnectorPattern, norm: f64 },
    #[error("duplicate direction entry for connector pattern `{0}`")]
    DuplicateDirection(ConnectorPattern),
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ExperimentError {
    #[error("sample_every must be positive")]
    InvalidSampleEvery,
    #[error("steps ({actual}) exceed supported maximum ({max})")]
    TooManySteps { max: usize, actual: usize },
    #[error("sample count ({actual}) exceeds supported maximum ({max})")]
    TooManySamples { max: usize, actual: usize },
}

/// Predator-prey equilibrium solver over a fixed set of entities and relations.
pub struct Engine {
    config: EngineConfig,
    entities: EntityTable,
    index: RelationIndex,
    populations: Vec<Vec<PreyAgent>>,
    predators: Vec<PredatorAgent>,
    rng: ChaCha12Rng,
    temperature: f64,
    step_index: usize,
    births_last_step: usize,
    deaths_last_step: usize,
    captures_last_step: usize,
    total_births: usize,
    total_deaths: usize,
    total_captures: usize,
}

impl Engine {
    pub const MAX_EXPERIMENT_STEPS: usize = 1_000_000;
    pub const MAX_EXPERIMENT_SAMPLES: usize = 50_000;

    /// Validate inputs, intern entities, index relations and seed both populations.
    pub fn new(
        entities: &[String],
        relations: &[RelationSpec],
        directions: &ConnectorDirections,
        config: EngineConfig,
    ) -> Result<Self, EngineInitError> {
        config.validate()?;
        if entities.is_empty() {
            return Err(EngineInitError::NoEntities);
        }
        let table = EntityTable::from_names(entities.iter().cloned())
            .map_err(|e| EngineInitError::DuplicateEntity(e.0))?;

        let dims = config.dimensions;
        for (pattern, direction) in directions.iter() {
            if direction.len() != dims {
                return Err(EngineInitError::DirectionDimensionMismatch {
                    pattern: pattern.clone(),
                    expected: dims,
                    actual: direction.len(),
                });
            }
            let norm = geometry::norm(direction);
            if !norm.is_finite() || (norm - 1.0).abs() > UNIT_NORM_TOLERANCE {
                return Err(EngineInitError::DirectionNotUnit {
                    pattern: pattern.clone(),
                    norm,
                });
            }
        }

        let mut interned = Vec::with_capacity(relations.len());
        for spec in relations {
            let left = table
                .id(&spec.left)
                .ok_or_else(|| EngineInitError::UnknownEntity(spec.left.clone()))?;
            let right = table
                .id(&spec.right)
                .ok_or_else(|| EngineInitError::UnknownEntity(spec.right.clone()))?;
            if !spec.weight.is_finite() || spec.weight < 0.0 {
                return Err(EngineInitError::InvalidWeight {
                    left: spec.left.clone(),
                    right: spec.right.clone(),
                    weight: spec.weight,
                });
            }
            let (pattern, direction) = directions
                .position(&spec.pattern)
                .zip(directions.get(&spec.pattern))
                .ok_or_else(|| EngineInitError::MissingDirection(spec.pattern.clone()))?;
            interned.push(Relation {
                left,
                right,
                pattern,
                direction: direction.clone(),
                negated: spec.negated,
                weight: spec.weight,
            });
        }

        let patterns: Vec<ConnectorPattern> = directions.iter().map(|(p, _)| p.clone()).collect();
        let index = RelationIndex::build(table.len(), patterns, interned);

        let mut rng = rng::create_rng(config.seed);
        let populations: Vec<Vec<PreyAgent>> = (0..table.len())
            .map(|entity| {
                (0..config.population_size)
                    .map(|_| {
                        let position = rng::gaussian_vector(&mut rng, dims, config.prey_init_spread);
                        PreyAgent::new(entity, position, config.initial_energy)
                    })
                    .collect()
            })
            .collect();

        let mut predators = Vec::new();
        if !directions.is_empty() {
            let per_pattern = (config.num_predators / directions.len()).max(1);
            for (pattern_id, (_, direction)) in directions.iter().enumerate() {
                for _ in 0..per_pattern {
                    let position =
                        rng::gaussian_vector(&mut rng, dims, config.predator_init_spread);
                    predators.push(PredatorAgent::new(
                        pattern_id,
                        direction.clone(),
                        position,
                        config.initial_energy,
                    ));
                }
            }
        }

        debug!(
            entities = table.len(),
            relations = index.len(),
            patterns = index.pattern_count(),
            prey = table.len() * config.population_size,
            predators = predators.len(),
            "engine initialized"
        );

        Ok(Self {
            temperature: config.initial_temperature,
            config,
            entities: table,
            index,
            populations,
            predators,
            rng,
            step_index: 0,
            births_last_step: 0,
            deaths_last_step: 0,
            captures_last_step: 0,
            total_births: 0,
            total_deaths: 0,
            total_captures: 0,
        })
    }

    /// Like [`Engine::new`], taking the direction table in its serialized form.
    pub fn from_direction_entries(
        entities: &[String],
        relations: &[RelationSpec],
        entries: Vec<ConnectorEntry>,
        config: EngineConfig,
    ) -> Result<Self, EngineInitError> {
        let directions =
            ConnectorDirections::from_entries(entries).map_err(EngineInitError::DuplicateDirection)?;
        Self::new(entities, relations, &directions, config)
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn entities(&self) -> &[String] {
        self.entities.names()
    }

    pub fn relation_index(&self) -> &RelationIndex {
        &self.index
    }

    pub fn prey(&self, entity: &str) -> Option<&[PreyAgent]> {
        self.entities
            .id(entity)
            .map(|id| self.populations[id].as_slice())
    }

    pub fn predators(&self) -> &[PredatorAgent] {
        &self.predators
    }

    pub fn temperature(&self) -> f64 {
        self.temperature
    }

    /// Number of completed steps.
    pub fn step_index(&self) -> usize {
        self.step_index
    }

    pub fn prey_count(&self) -> usize {
        self.populations.iter().map(Vec::len).sum()
    }

    pub fn predator_count(&self) -> usize {
        self.predators.len()
    }

    pub fn population_stats(&self) -> PopulationStats {
        let sizes = self.populations.iter().map(Vec::len);
        PopulationStats {
            step: self.step_index,
            entity_count: self.populations.len(),
            prey_count: self.prey_count(),
            predator_count: self.predators.len(),
            min_entity_population: sizes.clone().min().unwrap_or(0),
            max_entity_population: sizes.max().unwrap_or(0),
            temperature: self.temperature,
            total_births: self.total_births,
            total_deaths: self.total_deaths,
            total_captures: self.total_captures,
        }
    }

    fn partner_means(&self) -> PartnerMeans {
        PartnerMeans::from_populations(&self.populations, self.config.dimensions)
    }

    fn violation_at(&self, entity: EntityId, position: &[f64], means: &PartnerMeans) -> f64 {
        violation::violation(
            entity,
            position,
            means,
            &self.index,
            self.config.displacement_frame,
        )
    }

    /// Violation of every prey against one snapshot of partner means.
    fn prey_violations(&self, means: &PartnerMeans) -> Vec<Vec<f64>> {
        self.populations
            .iter()
            .enumerate()
            .map(|(entity, members)| {
                members
                    .iter()
                    .map(|prey| self.violation_at(entity, &prey.position, means))
                    .collect()
            })
            .collect()
    }

    /// Violation of `position` if it were a member of `entity`, against current means.
    pub fn violation_of(&self, entity: &str, position: &[f64]) -> Option<f64> {
        let id = self.entities.id(entity)?;
        let means = self.partner_means();
        Some(self.violation_at(id, position, &means))
    }

    /// Mean over entities of the violation at each entity's mean position.
    ///
    /// Infinite when no entity has live members.
    pub fn mean_violation(&self) -> f64 {
        let means = self.partner_means();
        let mut total = 0.0;
        let mut count = 0usize;
        for entity in 0..self.populations.len() {
            if let Some(mean) = means.get(entity) {
                total += self.violation_at(entity, mean, &means);
                count += 1;
            }
        }
        if count == 0 {
            f64::INFINITY
        } else {
            total / count as f64
        }
    }

    pub fn mean_positions(&self) -> PositionMap {
        let means = self.partner_means();
        (0..self.populations.len())
            .filter_map(|entity| {
                means
                    .get(entity)
                    .map(|m| (self.entities.name(entity).to_string(), m.to_vec()))
            })
            .collect()
    }

    /// Lowest-violation member per entity; the earliest member wins ties.
    pub fn best_positions(&self) -> PositionMap {
        let means = self.partner_means();
        let mut out = BTreeMap::new();
        for (entity, members) in self.populations.iter().enumerate() {
            let mut best: Option<(f64, &PreyAgent)> = None;
            for prey in members {
                let v = self.violation_at(entity, &prey.position, &means);
                if best.map_or(true, |(bv, _)| v < bv) {
                    best = Some((v, prey));
                }
            }
            if let Some((_, prey)) = best {
                out.insert(self.entities.name(entity).to_string(), prey.position.clone());
            }
        }
        out
    }

    pub fn all_positions(&self) -> PopulationMap {
        self.populations
            .iter()
            .enumerate()
            .map(|(entity, members)| {
                (
                    self.entities.name(entity).to_string(),
                    members.iter().map(|p| p.position.clone()).collect(),
                )
            })
            .collect()
    }

    /// Per-entity diversity of the current populations.
    pub fn population_spread(&self) -> Vec<EntitySpread> {
        metrics::population_spread(&self.all_positions())
    }

    /// The `i`-th member of every entity, falling back to the first member for entities
    /// with fewer than `i + 1` members. Entities without members are omitted.
    pub fn configuration(&self, i: usize) -> PositionMap {
        self.populations
            .iter()
            .enumerate()
            .filter_map(|(entity, members)| {
                members
                    .get(i)
                    .or_else(|| members.first())
                    .map(|p| (self.entities.name(entity).to_string(), p.position.clone()))
            })
            .collect()
    }

    /// Number of distinct configurations: the smallest live population. Matches
    /// [`crate::setops::configuration_count`] over [`Engine::all_positions`].
    pub fn configuration_count(&self) -> usize {
        self.populations.iter().map(Vec::len).min().unwrap_or(0)
    }

    /// Run `steps` steps, logging progress every `log_interval_steps`.
    pub fn train(&mut self, steps: usize) {
        let interval = self.config.log_interval_steps;
        for i in 1..=steps {
            self.step();
            if interval > 0 && i % interval == 0 {
                info!(
                    step = i,
                    total = steps,
                    prey = self.prey_count(),
                    predators = self.predators.len(),
                    mean_violation = self.mean_violation(),
                    temperature = self.temperature,
                    "training progress"
                );
            }
        }
    }

    /// Train for the configured default number of steps.
    pub fn train_default(&mut self) {
        self.train(self.config.steps);
    }

    pub fn run_experiment(&mut self, steps: usize, sample_every: usize) -> RunSummary {
        self.try_run_experiment(steps, sample_every)
            .unwrap_or_else(|e| panic!("{e}"))
    }

    pub fn try_run_experiment(
        &mut self,
        steps: usize,
        sample_every: usize,
    ) -> Result<RunSummary, ExperimentError> {
        if sample_every == 0 {
            return Err(ExperimentError::InvalidSampleEvery);
        }
        if steps > Self::MAX_EXPERIMENT_STEPS {
            return Err(ExperimentError::TooManySteps {
                max: Self::MAX_EXPERIMENT_STEPS,
                actual: steps,
            });
        }
        let estimated_samples = if steps == 0 {
            0
        } else {
            ((steps - 1) / sample_every) + 1
        };
        if estimated_samples > Self::MAX_EXPERIMENT_SAMPLES {
            return Err(ExperimentError::TooManySamples {
                max: Self::MAX_EXPERIMENT_SAMPLES,
                actual: estimated_samples,
            });
        }

        let births_before = self.total_births;
        let deaths_before = self.total_deaths;
        let captures_before = self.total_captures;
        let mut samples = Vec::with_capacity(estimated_samples);
        for step in 1..=steps {
            self.step();
            if step % sample_every == 0 || step == steps {
                samples.push(metrics::collect_step_metrics(
                    step,
                    &self.populations,
                    &self.predators,
                    self.mean_violation(),
                    self.temperature,
                    self.births_last_step,
                    self.deaths_last_step,
                    self.captures_last_step,
                ));
            }
        }
        Ok(RunSummary {
            schema_version: 1,
            steps,
            sample_every,
            final_prey_count: self.prey_count(),
            final_predator_count: self.predators.len(),
            final_mean_violation: metrics::finite_or_none(self.mean_violation()),
            samples,
            total_births: self.total_births - births_before,
            total_deaths: self.total_deaths - deaths_before,
            total_captures: self.total_captures - captures_before,
        })
    }

    /// Advance the system by one step.
    pub fn step(&mut self) -> StepTimings {
        let total_start = Instant::now();
        self.births_last_step = 0;
        self.deaths_last_step = 0;
        self.captures_last_step = 0;

        let t0 = Instant::now();
        let means = self.partner_means();
        let violations = self.prey_violations(&means);
        self.step_predator_decision_phase(&violations);
        self.step_prey_decision_phase(&means, &violations);
        let decision_us = t0.elapsed().as_micros() as u64;

        let t1 = Instant::now();
        self.step_movement_phase();
        self.step_capture_phase();
        let movement_us = t1.elapsed().as_micros() as u64;

        let t2 = Instant::now();
        self.step_energy_phase();
        self.step_death_phase();
        self.step_reproduction_phase();
        self.step_aging_phase();
        self.step_annealing_phase();
        let lifecycle_us = t2.elapsed().as_micros() as u64;

        trace!(
            step = self.step_index,
            captures = self.captures_last_step,
            deaths = self.deaths_last_step,
            births = self.births_last_step,
            "step complete"
        );

        StepTimings {
            decision_us,
            movement_us,
            lifecycle_us,
            total_us: total_start.elapsed().as_micros() as u64,
        }
    }
}

mod phases;
#[cfg(test)]
mod tests;
