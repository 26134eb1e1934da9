use serde::{Deserialize, Serialize};

/// How the displacement between an entity and its relation partner is measured.
#[derive(Clone, Copy, Debug, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum DisplacementFrame {
    /// Measure along the relation orientation (right minus left). The left entity sees
    /// `partner_mean - position`, the right entity sees `position - partner_mean`.
    #[default]
    Oriented,
    /// Always `partner_mean - position`, regardless of which side the entity is on.
    PartnerRelative,
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct EngineConfig {
    /// Deterministic seed for reproducible runs.
    pub seed: u64,
    /// Dimensionality of the embedding space.
    pub dimensions: usize,
    /// Prey created per entity at initialization.
    pub population_size: usize,
    /// Predator budget split evenly across connector patterns (at least one each).
    pub num_predators: usize,
    /// Default training length used by `Engine::train_default`.
    pub steps: usize,
    pub prey_speed: f64,
    pub predator_speed: f64,
    /// Prey notice predators strictly inside this radius.
    pub perception_radius: f64,
    /// Predators capture violating prey strictly inside this radius.
    pub capture_radius: f64,
    /// Fraction of a captured prey's energy transferred to the predator.
    pub capture_efficiency: f64,
    /// Energy given to every agent at creation (initial and offspring).
    pub initial_energy: f64,
    /// Per-step energy cost for prey.
    pub living_cost: f64,
    /// Per-step energy cost for predators.
    pub predator_living_cost: f64,
    /// Per-step energy gain for prey on the solution surface (before living cost).
    pub surface_energy_rate: f64,
    /// Violation at or below which a position counts as solved.
    pub surface_threshold: f64,
    /// Energy above which an agent reproduces.
    pub reproduce_threshold: f64,
    /// Energy a parent pays per offspring.
    pub reproduce_cost: f64,
    /// Standard deviation of the Gaussian offset applied to offspring positions.
    pub mutation_rate: f64,
    pub initial_temperature: f64,
    /// Multiplicative annealing factor applied once per step.
    pub temperature_decay: f64,
    pub minimum_temperature: f64,
    /// Hard cap on prey per entity; offspring beyond it are discarded.
    pub max_prey_per_entity: usize,
    /// Hard cap on the number of predators.
    pub max_predators: usize,
    /// Captures never reduce an entity's population below this count.
    pub capture_survival_floor: usize,
    /// Starvation never reduces an entity's population below this count.
    pub starvation_survival_floor: usize,
    /// Standard deviation of initial prey coordinates.
    pub prey_init_spread: f64,
    /// Standard deviation of initial predator coordinates.
    pub predator_init_spread: f64,
    pub displacement_frame: DisplacementFrame,
    /// Training progress is logged every this many steps (0 = silent).
    pub log_interval_steps: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            seed: 42,
            dimensions: 8,
            population_size: 30,
            num_predators: 30,
            steps: 300,
            prey_speed: 0.06,
            predator_speed: 0.04,
            perception_radius: 3.0,
            capture_radius: 1.5,
            capture_efficiency: 0.3,
            initial_energy: 100.0,
            living_cost: 0.1,
            predator_living_cost: 0.5,
            surface_energy_rate: 1.5,
            surface_threshold: 0.001,
            reproduce_threshold: 150.0,
            reproduce_cost: 50.0,
            mutation_rate: 0.1,
            initial_temperature: 1.0,
            temperature_decay: 0.995,
            minimum_temperature: 0.01,
            max_prey_per_entity: 100,
            max_predators: 100,
            capture_survival_floor: 5,
            starvation_survival_floor: 3,
            prey_init_spread: 1.0,
            predator_init_spread: 2.0,
            displacement_frame: DisplacementFrame::Oriented,
            log_interval_steps: 100,
        }
    }
}

macro_rules! define_engine_config_error {
    (
        $(
            $variant:ident $( { $($field:ident : $type:ty),* } )? => $fmt:literal $(, $arg:expr)*
        );* $(;)?
    ) => {
        #[derive(Debug, Clone, PartialEq)]
        pub enum EngineConfigError {
            $(
                $variant $( { $($field : $type),* } )?,
            )*
        }

        impl std::fmt::Display for EngineConfigError {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                match self {
                    $(
                        Self::$variant $( { $($field),* } )? => write!(f, $fmt $(, $arg)*),
                    )*
                }
            }
        }
    };
}

define_engine_config_error! {
    InvalidDimensions => "dimensions must be greater than 0";
    TooManyDimensions { max: usize, actual: usize } => "dimensions ({actual}) exceed supported maximum ({max})";
    InvalidPopulationSize => "population_size must be greater than 0";
    PopulationExceedsCap { population: usize, cap: usize } => "population_size ({population}) exceeds max_prey_per_entity ({cap})";
    InvalidSurvivalFloor { floor: usize, population: usize } => "survival floors must be within [1, population_size]; got {floor} with population_size {population}";
    InvalidPreySpeed => "prey_speed must be finite and non-negative";
    InvalidPredatorSpeed => "predator_speed must be finite and non-negative";
    InvalidPerceptionRadius => "perception_radius must be finite and non-negative";
    InvalidCaptureRadius => "capture_radius must be finite and non-negative";
    InvalidCaptureEfficiency => "capture_efficiency must be finite and within [0,1]";
    InvalidInitialEnergy => "initial_energy must be finite and positive";
    InvalidLivingCost => "living_cost must be finite and non-negative";
    InvalidPredatorLivingCost => "predator_living_cost must be finite and non-negative";
    InvalidSurfaceEnergyRate => "surface_energy_rate must be finite and non-negative";
    InvalidSurfaceThreshold => "surface_threshold must be finite and non-negative";
    InvalidReproduceThreshold => "reproduce_threshold must be finite and positive";
    InvalidReproduceCost => "reproduce_cost must be finite and positive";
    InvalidMutationRate => "mutation_rate must be finite and non-negative";
    InvalidTemperature => "temperatures must be finite with initial_temperature >= minimum_temperature >= 0";
    InvalidTemperatureDecay => "temperature_decay must be finite and within (0,1]";
    InvalidInitSpread => "prey_init_spread and predator_init_spread must be finite and non-negative";
}

impl std::error::Error for EngineConfigError {}

impl EngineConfig {
    pub const MAX_DIMENSIONS: usize = crate::constants::MAX_DIMENSIONS;

    /// Smallest population any entity can be reduced to by captures or starvation.
    pub fn survival_floor(&self) -> usize {
        self.capture_survival_floor
            .min(self.starvation_survival_floor)
    }

    pub fn validate(&self) -> Result<(), EngineConfigError> {
        self.validate_space()?;
        self.validate_populations()?;
        self.validate_motion()?;
        self.validate_energy()?;
        self.validate_annealing()?;
        Ok(())
    }

    fn validate_space(&self) -> Result<(), EngineConfigError> {
        if self.dimensions == 0 {
            return Err(EngineConfigError::InvalidDimensions);
        }
        if self.dimensions > Self::MAX_DIMENSIONS {
            return Err(EngineConfigError::TooManyDimensions {
                max: Self::MAX_DIMENSIONS,
                actual: self.dimensions,
            });
        }
        if !(self.prey_init_spread.is_finite()
            && self.prey_init_spread >= 0.0
            && self.predator_init_spread.is_finite()
            && self.predator_init_spread >= 0.0)
        {
            return Err(EngineConfigError::InvalidInitSpread);
        }
        Ok(())
    }

    fn validate_populations(&self) -> Result<(), EngineConfigError> {
        if self.population_size == 0 {
            return Err(EngineConfigError::InvalidPopulationSize);
        }
        if self.population_size > self.max_prey_per_entity {
            return Err(EngineConfigError::PopulationExceedsCap {
                population: self.population_size,
                cap: self.max_prey_per_entity,
            });
        }
        for floor in [self.capture_survival_floor, self.starvation_survival_floor] {
            if floor == 0 || floor > self.population_size {
                return Err(EngineConfigError::InvalidSurvivalFloor {
                    floor,
                    population: self.population_size,
                });
            }
        }
        Ok(())
    }

    fn validate_motion(&self) -> Result<(), EngineConfigError> {
        if !(self.prey_speed.is_finite() && self.prey_speed >= 0.0) {
            return Err(EngineConfigError::InvalidPreySpeed);
        }
        if !(self.predator_speed.is_finite() && self.predator_speed >= 0.0) {
            return Err(EngineConfigError::InvalidPredatorSpeed);
        }
        if !(self.perception_radius.is_finite() && self.perception_radius >= 0.0) {
            return Err(EngineConfigError::InvalidPerceptionRadius);
        }
        if !(self.capture_radius.is_finite() && self.capture_radius >= 0.0) {
            return Err(EngineConfigError::InvalidCaptureRadius);
        }
        if !(self.mutation_rate.is_finite() && self.mutation_rate >= 0.0) {
            return Err(EngineConfigError::InvalidMutationRate);
        }
        Ok(())
    }

    fn validate_energy(&self) -> Result<(), EngineConfigError> {
        if !(self.capture_efficiency.is_finite() && (0.0..=1.0).contains(&self.capture_efficiency))
        {
            return Err(EngineConfigError::InvalidCaptureEfficiency);
        }
        if !(self.initial_energy.is_finite() && self.initial_energy > 0.0) {
            return Err(EngineConfigError::InvalidInitialEnergy);
        }
        if !(self.living_cost.is_finite() && self.living_cost >= 0.0) {
            return Err(EngineConfigError::InvalidLivingCost);
        }
        if !(self.predator_living_cost.is_finite() && self.predator_living_cost >= 0.0) {
            return Err(EngineConfigError::InvalidPredatorLivingCost);
        }
        if !(self.surface_energy_rate.is_finite() && self.surface_energy_rate >= 0.0) {
            return Err(EngineConfigError::InvalidSurfaceEnergyRate);
        }
        if !(self.surface_threshold.is_finite() && self.surface_threshold >= 0.0) {
            return Err(EngineConfigError::InvalidSurfaceThreshold);
        }
        if !(self.reproduce_threshold.is_finite() && self.reproduce_threshold > 0.0) {
            return Err(EngineConfigError::InvalidReproduceThreshold);
        }
        if !(self.reproduce_cost.is_finite() && self.reproduce_cost > 0.0) {
            return Err(EngineConfigError::InvalidReproduceCost);
        }
        Ok(())
    }

    fn validate_annealing(&self) -> Result<(), EngineConfigError> {
        if !(self.initial_temperature.is_finite()
            && self.minimum_temperature.is_finite()
            && self.minimum_temperature >= 0.0
            && self.initial_temperature >= self.minimum_temperature)
        {
            return Err(EngineConfigError::InvalidTemperature);
        }
        if !(self.temperature_decay.is_finite()
            && self.temperature_decay > 0.0
            && self.temperature_decay <= 1.0)
        {
            return Err(EngineConfigError::InvalidTemperatureDecay);
        }
        Ok(())
    }
}
