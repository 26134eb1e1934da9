use super::super::Engine;
use crate::agent::PreyAgent;
use crate::geometry;
use crate::rng;

impl Engine {
    /// Remove starved agents. Prey go most-starved first and never below the starvation
    /// floor; predators have no floor.
    pub(in crate::engine) fn step_death_phase(&mut self) {
        let floor = self.config.starvation_survival_floor;
        let mut deaths = 0usize;

        for members in &mut self.populations {
            let mut starved: Vec<usize> = (0..members.len())
                .filter(|&i| members[i].energy <= 0.0)
                .collect();
            if starved.is_empty() {
                continue;
            }
            starved.sort_by(|&a, &b| members[a].energy.total_cmp(&members[b].energy));
            starved.truncate(members.len().saturating_sub(floor));
            if starved.is_empty() {
                continue;
            }

            let mut doomed = vec![false; members.len()];
            for &i in &starved {
                doomed[i] = true;
            }
            let mut flags = doomed.into_iter();
            members.retain(|_| !flags.next().unwrap_or(false));
            deaths += starved.len();
        }

        let before = self.predators.len();
        self.predators.retain(|p| p.energy > 0.0);
        deaths += before - self.predators.len();

        self.deaths_last_step += deaths;
        self.total_deaths += deaths;
    }

    /// Well-fed agents spawn one mutated child each, until the population cap is hit.
    pub(in crate::engine) fn step_reproduction_phase(&mut self) {
        let dims = self.config.dimensions;
        let threshold = self.config.reproduce_threshold;
        let cost = self.config.reproduce_cost;
        let mutation = self.config.mutation_rate;
        let child_energy = self.config.initial_energy;
        let mut births = 0usize;

        let prey_cap = self.config.max_prey_per_entity;
        for members in &mut self.populations {
            let existing = members.len();
            let mut offspring = Vec::new();
            for parent in members.iter_mut() {
                if parent.energy > threshold && existing + offspring.len() < prey_cap {
                    let mut position = parent.position.clone();
                    geometry::add_assign(
                        &mut position,
                        &rng::gaussian_vector(&mut self.rng, dims, mutation),
                    );
                    offspring.push(PreyAgent::new(parent.entity, position, child_energy));
                    parent.energy -= cost;
                }
            }
            births += offspring.len();
            members.extend(offspring);
        }

        let predator_cap = self.config.max_predators;
        let existing = self.predators.len();
        let mut offspring = Vec::new();
        for parent in self.predators.iter_mut() {
            if parent.energy > threshold && existing + offspring.len() < predator_cap {
                let mut position = parent.position.clone();
                geometry::add_assign(
                    &mut position,
                    &rng::gaussian_vector(&mut self.rng, dims, mutation),
                );
                offspring.push(parent.offspring(position, child_energy));
                parent.energy -= cost;
            }
        }
        births += offspring.len();
        self.predators.extend(offspring);

        self.births_last_step += births;
        self.total_births += births;
    }

    pub(in crate::engine) fn step_aging_phase(&mut self) {
        for prey in self.populations.iter_mut().flatten() {
            prey.age = prey.age.saturating_add(1);
        }
        for predator in &mut self.predators {
            predator.age = predator.age.saturating_add(1);
        }
    }

    pub(in crate::engine) fn step_annealing_phase(&mut self) {
        self.temperature =
            (self.temperature * self.config.temperature_decay).max(self.config.minimum_temperature);
        self.step_index = self.step_index.saturating_add(1);
    }
}
