use super::super::Engine;
use crate::constants::{
    FLEE_BLEND, GRADIENT_SPEED_FRACTION, SURFACE_DRIFT_FRACTION, TEMPERATURE_NOISE_SCALE,
};
use crate::geometry;
use crate::rng;
use crate::violation::{self, PartnerMeans};

impl Engine {
    /// Steer each predator toward the worst-placed prey among the entities its pattern
    /// touches, or in a random direction when nothing there is violating.
    pub(in crate::engine) fn step_predator_decision_phase(&mut self, violations: &[Vec<f64>]) {
        let dims = self.config.dimensions;
        let speed = self.config.predator_speed;
        let threshold = self.config.surface_threshold;

        for predator in self.predators.iter_mut() {
            let mut worst: Option<(f64, &[f64])> = None;
            for &entity in self.index.entities_for_pattern(predator.pattern) {
                for (prey, &v) in self.populations[entity].iter().zip(&violations[entity]) {
                    if worst.map_or(true, |(wv, _)| v > wv) {
                        worst = Some((v, prey.position.as_slice()));
                    }
                }
            }

            predator.velocity = match worst {
                Some((v, target)) if v > threshold => {
                    let mut heading = geometry::sub(target, &predator.position);
                    geometry::normalize_in_place(&mut heading);
                    geometry::scaled(&heading, speed)
                }
                _ => geometry::scaled(&rng::random_unit_vector(&mut self.rng, dims), speed),
            };
        }
    }

    /// Prey flee the nearest perceived predator while descending their violation,
    /// drift down the gradient when unthreatened, or wander once on the surface.
    /// Every prey then gets temperature-scaled noise.
    pub(in crate::engine) fn step_prey_decision_phase(
        &mut self,
        means: &PartnerMeans,
        violations: &[Vec<f64>],
    ) {
        let dims = self.config.dimensions;
        let speed = self.config.prey_speed;
        let perception = self.config.perception_radius;
        let threshold = self.config.surface_threshold;
        let frame = self.config.displacement_frame;
        let noise_scale = self.temperature * TEMPERATURE_NOISE_SCALE;

        for (entity, members) in self.populations.iter_mut().enumerate() {
            for (prey, &v) in members.iter_mut().zip(&violations[entity]) {
                let nearest = self
                    .predators
                    .iter()
                    .map(|p| (geometry::distance(&p.position, &prey.position), p))
                    .filter(|(d, _)| *d < perception)
                    .min_by(|a, b| a.0.total_cmp(&b.0))
                    .map(|(_, p)| p);

                let mut velocity = if v > threshold {
                    let improve = violation::improvement_direction_from(
                        v,
                        entity,
                        &prey.position,
                        means,
                        &self.index,
                        frame,
                    );
                    match nearest {
                        Some(predator) => {
                            let mut flee = geometry::sub(&prey.position, &predator.position);
                            geometry::normalize_in_place(&mut flee);
                            let mut combined: Vec<f64> = flee
                                .iter()
                                .zip(&improve)
                                .map(|(f, g)| FLEE_BLEND * f + (1.0 - FLEE_BLEND) * g)
                                .collect();
                            geometry::normalize_in_place(&mut combined);
                            geometry::scaled(&combined, speed)
                        }
                        None => geometry::scaled(&improve, speed * GRADIENT_SPEED_FRACTION),
                    }
                } else {
                    geometry::scaled(
                        &rng::random_unit_vector(&mut self.rng, dims),
                        speed * SURFACE_DRIFT_FRACTION,
                    )
                };

                let noise = rng::gaussian_vector(&mut self.rng, dims, noise_scale);
                geometry::add_assign(&mut velocity, &noise);
                prey.velocity = velocity;
            }
        }
    }
}
