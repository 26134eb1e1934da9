use super::super::Engine;
use crate::geometry;

impl Engine {
    /// Apply velocities, predators first.
    pub(in crate::engine) fn step_movement_phase(&mut self) {
        for predator in &mut self.predators {
            geometry::add_assign(&mut predator.position, &predator.velocity);
        }
        for prey in self.populations.iter_mut().flatten() {
            geometry::add_assign(&mut prey.position, &prey.velocity);
        }
    }
}
