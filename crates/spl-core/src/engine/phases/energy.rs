use super::super::Engine;

impl Engine {
    /// Surface prey gain energy, everyone else pays upkeep. Uses the post-capture snapshot.
    pub(in crate::engine) fn step_energy_phase(&mut self) {
        let means = self.partner_means();
        let violations = self.prey_violations(&means);
        let threshold = self.config.surface_threshold;
        let surface_gain = self.config.surface_energy_rate - self.config.living_cost;
        let living_cost = self.config.living_cost;

        for (members, vs) in self.populations.iter_mut().zip(&violations) {
            for (prey, &v) in members.iter_mut().zip(vs) {
                if v < threshold {
                    prey.energy += surface_gain;
                } else {
                    prey.energy -= living_cost;
                }
            }
        }

        let predator_cost = self.config.predator_living_cost;
        for predator in &mut self.predators {
            predator.energy -= predator_cost;
        }
    }
}
