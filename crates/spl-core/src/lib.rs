pub mod agent;
pub mod config;
pub mod constants;
pub mod engine;
pub mod evaluation;
pub mod geometry;
pub mod index;
pub mod lexicon;
pub mod metrics;
pub mod relation;
pub mod resolver;
pub mod rng;
pub mod setops;
pub mod violation;

pub use config::{DisplacementFrame, EngineConfig, EngineConfigError};
pub use engine::{Engine, EngineInitError, ExperimentError, StepTimings};
pub use lexicon::Lexicon;
pub use metrics::{EntitySpread, PopulationStats, RunSummary, StepMetrics};
pub use relation::{ConnectorDirections, ConnectorEntry, ConnectorPattern, RelationSpec};
pub use resolver::{Answer, Resolver, ResolverConfig};

/// Entity name → single position.
pub type PositionMap = std::collections::BTreeMap<String, Vec<f64>>;

/// Entity name → every member position of its population.
pub type PopulationMap = std::collections::BTreeMap<String, Vec<Vec<f64>>>;
