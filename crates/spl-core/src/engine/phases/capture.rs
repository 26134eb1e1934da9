use super::super::Engine;
use crate::geometry;

impl Engine {
    /// Predators, in order, capture violating prey inside the capture radius.
    ///
    /// Violations come from the post-move snapshot. A prey is captured at most once, and
    /// only while its entity stays above the capture floor; removals are applied as one
    /// batch per entity after every predator has hunted.
    pub(in crate::engine) fn step_capture_phase(&mut self) {
        let means = self.partner_means();
        let violations = self.prey_violations(&means);
        let radius = self.config.capture_radius;
        let threshold = self.config.surface_threshold;
        let efficiency = self.config.capture_efficiency;
        let floor = self.config.capture_survival_floor;

        let mut captured: Vec<Vec<bool>> = self
            .populations
            .iter()
            .map(|members| vec![false; members.len()])
            .collect();
        let mut remaining: Vec<usize> = self.populations.iter().map(Vec::len).collect();
        let mut capture_count = 0usize;

        for predator in self.predators.iter_mut() {
            for (entity, members) in self.populations.iter().enumerate() {
                for (i, prey) in members.iter().enumerate() {
                    if remaining[entity] <= floor {
                        break;
                    }
                    if captured[entity][i] || violations[entity][i] <= threshold {
                        continue;
                    }
                    if geometry::distance(&predator.position, &prey.position) < radius {
                        predator.energy += prey.energy * efficiency;
                        captured[entity][i] = true;
                        remaining[entity] -= 1;
                        capture_count += 1;
                    }
                }
            }
        }

        if capture_count == 0 {
            return;
        }
        for (members, flags) in self.populations.iter_mut().zip(&captured) {
            let mut flags = flags.iter();
            members.retain(|_| !flags.next().copied().unwrap_or(false));
        }
        self.captures_last_step += capture_count;
        self.total_captures += capture_count;
    }
}
