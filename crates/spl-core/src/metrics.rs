use serde::{Deserialize, Serialize};

use crate::agent::{PredatorAgent, PreyAgent};
use crate::geometry;
use crate::PopulationMap;

/// Entities with fewer members than this get no spread estimate.
pub const MIN_SPREAD_POPULATION: usize = 3;
const PRINCIPAL_AXIS_ITERATIONS: usize = 100;

/// One sample of a training run.
///
/// `mean_violation` is `None` when no entity had live members at sample time.
#[derive(Clone, Debug, Serialize, Deserialize, Default, PartialEq)]
#[serde(default)]
pub struct StepMetrics {
    pub step: usize,
    pub prey_count: usize,
    pub predator_count: usize,
    pub mean_violation: Option<f64>,
    pub temperature: f64,
    pub birth_count: usize,
    pub death_count: usize,
    pub capture_count: usize,
    pub mean_prey_energy: f64,
    pub mean_predator_energy: f64,
}

fn default_schema_version() -> u32 {
    1
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct RunSummary {
    #[serde(default = "default_schema_version")]
    pub schema_version: u32,
    pub steps: usize,
    pub sample_every: usize,
    pub final_prey_count: usize,
    pub final_predator_count: usize,
    pub final_mean_violation: Option<f64>,
    pub samples: Vec<StepMetrics>,
    #[serde(default)]
    pub total_births: usize,
    #[serde(default)]
    pub total_deaths: usize,
    #[serde(default)]
    pub total_captures: usize,
}

#[derive(Clone, Debug, Serialize, Deserialize, Default, PartialEq)]
pub struct PopulationStats {
    pub step: usize,
    pub entity_count: usize,
    pub prey_count: usize,
    pub predator_count: usize,
    pub min_entity_population: usize,
    pub max_entity_population: usize,
    pub temperature: f64,
    pub total_births: usize,
    pub total_deaths: usize,
    pub total_captures: usize,
}

/// Diversity of one entity's population.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct EntitySpread {
    pub entity: String,
    pub population: usize,
    /// Standard deviation of the members projected onto their principal axis.
    pub principal_spread: f64,
    /// Root mean squared distance of the members from their centroid.
    pub centroid_rms: f64,
}

/// Spread of every entity with at least [`MIN_SPREAD_POPULATION`] members.
pub fn population_spread(populations: &PopulationMap) -> Vec<EntitySpread> {
    populations
        .iter()
        .filter(|(_, members)| members.len() >= MIN_SPREAD_POPULATION)
        .filter_map(|(entity, members)| {
            let dims = members.first()?.len();
            let centroid = geometry::mean(members.iter().map(Vec::as_slice), dims)?;
            let centered: Vec<Vec<f64>> = members
                .iter()
                .map(|m| geometry::sub(m, &centroid))
                .collect();
            let n = centered.len() as f64;
            let axis = principal_axis(&centered);
            let principal_spread = match axis {
                Some(axis) => {
                    let var = centered
                        .iter()
                        .map(|c| geometry::dot(c, &axis).powi(2))
                        .sum::<f64>()
                        / n;
                    var.sqrt()
                }
                None => 0.0,
            };
            let centroid_rms =
                (centered.iter().map(|c| geometry::dot(c, c)).sum::<f64>() / n).sqrt();
            Some(EntitySpread {
                entity: entity.clone(),
                population: members.len(),
                principal_spread,
                centroid_rms,
            })
        })
        .collect()
}

/// Leading eigenvector of the covariance of `centered`, by power iteration started from
/// the farthest member. `None` when every member sits on the centroid.
fn principal_axis(centered: &[Vec<f64>]) -> Option<Vec<f64>> {
    let start = centered
        .iter()
        .max_by(|a, b| geometry::norm(a).total_cmp(&geometry::norm(b)))?;
    if geometry::norm(start) <= crate::constants::NORM_EPSILON {
        return None;
    }
    let mut axis = geometry::normalized(start);
    for _ in 0..PRINCIPAL_AXIS_ITERATIONS {
        let mut next = vec![0.0; axis.len()];
        for c in centered {
            let weight = geometry::dot(c, &axis);
            for (n, x) in next.iter_mut().zip(c) {
                *n += weight * x;
            }
        }
        if geometry::norm(&next) <= crate::constants::NORM_EPSILON {
            break;
        }
        axis = geometry::normalized(&next);
    }
    Some(axis)
}

pub(crate) fn finite_or_none(value: f64) -> Option<f64> {
    value.is_finite().then_some(value)
}

fn mean_energy(energies: impl Iterator<Item = f64>) -> f64 {
    let (sum, n) = energies.fold((0.0, 0usize), |(s, n), e| (s + e, n + 1));
    if n == 0 {
        0.0
    } else {
        sum / n as f64
    }
}

#[allow(clippy::too_many_arguments)]
pub(crate) fn collect_step_metrics(
    step: usize,
    populations: &[Vec<PreyAgent>],
    predators: &[PredatorAgent],
    mean_violation: f64,
    temperature: f64,
    birth_count: usize,
    death_count: usize,
    capture_count: usize,
) -> StepMetrics {
    StepMetrics {
        step,
        prey_count: populations.iter().map(Vec::len).sum(),
        predator_count: predators.len(),
        mean_violation: finite_or_none(mean_violation),
        temperature,
        birth_count,
        death_count,
        capture_count,
        mean_prey_energy: mean_energy(populations.iter().flatten().map(|p| p.energy)),
        mean_predator_energy: mean_energy(predators.iter().map(|p| p.energy)),
    }
}
