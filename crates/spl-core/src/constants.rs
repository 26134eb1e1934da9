/// Largest supported dimensionality of the embedding space.
pub const MAX_DIMENSIONS: usize = 1024;

/// Norms below this are treated as zero when normalizing.
pub const NORM_EPSILON: f64 = 1e-10;

/// Accepted deviation from unit length for supplied connector directions.
pub const UNIT_NORM_TOLERANCE: f64 = 1e-6;

/// Step used by the forward finite-difference gradient estimate.
pub const GRADIENT_EPSILON: f64 = 0.01;

/// Share of the flee vector when a violating prey both flees and improves.
pub const FLEE_BLEND: f64 = 0.5;

/// Speed fraction for violating prey following the gradient with no predator near.
pub const GRADIENT_SPEED_FRACTION: f64 = 0.5;

/// Speed fraction for prey drifting on the solution surface.
pub const SURFACE_DRIFT_FRACTION: f64 = 0.1;

/// Per-dimension noise scale applied on top of temperature.
pub const TEMPERATURE_NOISE_SCALE: f64 = 0.05;
