use std::sync::Arc;

use super::*;
use crate::config::DisplacementFrame;
use crate::setops;

fn names(list: &[&str]) -> Vec<String> {
    list.iter().map(|s| s.to_string()).collect()
}

fn is_a() -> ConnectorPattern {
    ConnectorPattern::new(["is", "a"])
}

fn axis(dims: usize, k: usize) -> Vec<f64> {
    let mut v = vec![0.0; dims];
    v[k] = 1.0;
    v
}

fn axis_directions(dims: usize) -> ConnectorDirections {
    let mut table = ConnectorDirections::new();
    table.insert(is_a(), axis(dims, 0));
    table
}

fn small_config() -> EngineConfig {
    EngineConfig {
        dimensions: 4,
        population_size: 10,
        num_predators: 4,
        ..EngineConfig::default()
    }
}

fn pair_engine(negated: bool, config: EngineConfig) -> Engine {
    let mut relation = RelationSpec::new("dog", "animal", is_a());
    relation.negated = negated;
    let dims = config.dimensions;
    Engine::new(
        &names(&["dog", "animal"]),
        &[relation],
        &axis_directions(dims),
        config,
    )
    .unwrap()
}

fn id(engine: &Engine, name: &str) -> EntityId {
    engine.entities.id(name).unwrap()
}

fn place_all(engine: &mut Engine, name: &str, position: &[f64]) {
    let entity = id(engine, name);
    for prey in &mut engine.populations[entity] {
        prey.position = position.to_vec();
    }
}

#[test]
fn new_rejects_empty_entity_list() {
    let result = Engine::new(&[], &[], &ConnectorDirections::new(), small_config());
    assert!(matches!(result, Err(EngineInitError::NoEntities)));
}

#[test]
fn new_rejects_duplicate_entity() {
    let result = Engine::new(
        &names(&["dog", "dog"]),
        &[],
        &ConnectorDirections::new(),
        small_config(),
    );
    assert_eq!(
        result.err(),
        Some(EngineInitError::DuplicateEntity("dog".into()))
    );
}

#[test]
fn new_rejects_unknown_entity() {
    let result = Engine::new(
        &names(&["dog"]),
        &[RelationSpec::new("dog", "animal", is_a())],
        &axis_directions(4),
        small_config(),
    );
    assert_eq!(
        result.err(),
        Some(EngineInitError::UnknownEntity("animal".into()))
    );
}

#[test]
fn new_rejects_relation_without_direction() {
    let result = Engine::new(
        &names(&["dog", "animal"]),
        &[RelationSpec::new("dog", "animal", ConnectorPattern::new(["has"]))],
        &axis_directions(4),
        small_config(),
    );
    assert_eq!(
        result.err(),
        Some(EngineInitError::MissingDirection(ConnectorPattern::new([
            "has"
        ])))
    );
}

#[test]
fn new_rejects_bad_directions() {
    let entities = names(&["dog", "animal"]);

    let mut wrong_dims = ConnectorDirections::new();
    wrong_dims.insert(is_a(), axis(3, 0));
    assert!(matches!(
        Engine::new(&entities, &[], &wrong_dims, small_config()),
        Err(EngineInitError::DirectionDimensionMismatch {
            expected: 4,
            actual: 3,
            ..
        })
    ));

    let mut not_unit = ConnectorDirections::new();
    not_unit.insert(is_a(), vec![2.0, 0.0, 0.0, 0.0]);
    assert!(matches!(
        Engine::new(&entities, &[], &not_unit, small_config()),
        Err(EngineInitError::DirectionNotUnit { .. })
    ));
}

#[test]
fn new_rejects_duplicate_direction_entries() {
    let entries = vec![
        ConnectorEntry {
            pattern: is_a(),
            direction: axis(4, 0),
        },
        ConnectorEntry {
            pattern: is_a(),
            direction: axis(4, 1),
        },
    ];
    let result =
        Engine::from_direction_entries(&names(&["dog"]), &[], entries, small_config());
    assert_eq!(result.err(), Some(EngineInitError::DuplicateDirection(is_a())));
}

#[test]
fn new_rejects_invalid_weight() {
    for weight in [-1.0, f64::NAN, f64::INFINITY] {
        let result = Engine::new(
            &names(&["dog", "animal"]),
            &[RelationSpec::new("dog", "animal", is_a()).with_weight(weight)],
            &axis_directions(4),
            small_config(),
        );
        assert!(matches!(result, Err(EngineInitError::InvalidWeight { .. })));
    }
}

#[test]
fn new_propagates_config_errors() {
    let config = EngineConfig {
        dimensions: 0,
        ..small_config()
    };
    let result = Engine::new(&names(&["dog"]), &[], &ConnectorDirections::new(), config);
    assert_eq!(
        result.err(),
        Some(EngineInitError::Config(EngineConfigError::InvalidDimensions))
    );
}

#[test]
fn init_error_display_includes_context() {
    let err = EngineInitError::DirectionDimensionMismatch {
        pattern: is_a(),
        expected: 8,
        actual: 3,
    };
    assert_eq!(
        err.to_string(),
        "direction for `is a` has 3 dimensions, expected 8"
    );
    let err: EngineInitError = EngineConfigError::InvalidPopulationSize.into();
    assert_eq!(err.to_string(), "population_size must be greater than 0");
}

#[test]
fn initialization_seeds_populations_and_predators() {
    let engine = pair_engine(false, small_config());
    assert_eq!(engine.prey("dog").unwrap().len(), 10);
    assert_eq!(engine.prey("animal").unwrap().len(), 10);
    assert!(engine.prey("cat").is_none());
    assert_eq!(engine.predator_count(), 4);
    assert!(engine
        .predators()
        .iter()
        .all(|p| p.pattern == 0 && p.energy == engine.config().initial_energy));
    assert_eq!(engine.temperature(), 1.0);
    assert_eq!(engine.step_index(), 0);
}

#[test]
fn predators_are_split_across_patterns_with_at_least_one_each() {
    let mut table = ConnectorDirections::new();
    for (k, word) in ["is", "has", "can", "makes"].iter().enumerate() {
        table.insert(ConnectorPattern::new([*word]), axis(4, k));
    }
    let config = EngineConfig {
        num_predators: 10,
        ..small_config()
    };
    let engine = Engine::new(&names(&["dog"]), &[], &table, config.clone()).unwrap();
    // 10 / 4 = 2 per pattern
    assert_eq!(engine.predator_count(), 8);

    let config = EngineConfig {
        num_predators: 1,
        ..config
    };
    let engine = Engine::new(&names(&["dog"]), &[], &table, config).unwrap();
    assert_eq!(engine.predator_count(), 4);
}

#[test]
fn no_patterns_means_no_predators() {
    let engine = Engine::new(
        &names(&["dog", "cat"]),
        &[],
        &ConnectorDirections::new(),
        small_config(),
    )
    .unwrap();
    assert_eq!(engine.predator_count(), 0);
}

#[test]
fn predators_share_direction_with_relations() {
    let engine = pair_engine(false, small_config());
    let relation_dir = &engine.relation_index().relation(0).direction;
    assert!(engine
        .predators()
        .iter()
        .all(|p| Arc::ptr_eq(&p.direction, relation_dir)));
}

#[test]
fn step_advances_counter_and_reports_timings() {
    let mut engine = pair_engine(false, small_config());
    let t = engine.step();
    assert_eq!(engine.step_index(), 1);
    assert!(t.total_us >= t.decision_us);
    assert!(t.total_us >= t.lifecycle_us);
}

#[test]
fn idle_pattern_predators_wander_at_full_speed() {
    let mut table = axis_directions(4);
    table.insert(ConnectorPattern::new(["has"]), axis(4, 1));
    let mut engine = Engine::new(
        &names(&["dog", "animal"]),
        &[RelationSpec::new("dog", "animal", is_a())],
        &table,
        small_config(),
    )
    .unwrap();
    let means = engine.partner_means();
    let violations = engine.prey_violations(&means);
    engine.step_predator_decision_phase(&violations);
    let speed = engine.config.predator_speed;
    for predator in engine.predators.iter().filter(|p| p.pattern == 1) {
        assert!((geometry::norm(&predator.velocity) - speed).abs() < 1e-9);
    }
}

#[test]
fn predator_heads_for_worst_prey() {
    let mut engine = pair_engine(false, small_config());
    place_all(&mut engine, "animal", &[0.0, 0.0, 0.0, 0.0]);
    place_all(&mut engine, "dog", &[0.0, 0.0, 0.0, 0.0]);
    // dog #4 sits far on the wrong side of its partner
    let dog = id(&engine, "dog");
    engine.populations[dog][3].position = vec![0.0, 3.0, 0.0, 0.0];
    engine.populations[dog][4].position = vec![4.0, 0.0, 0.0, 0.0];
    for predator in &mut engine.predators {
        predator.position = vec![0.0; 4];
    }

    let means = engine.partner_means();
    let violations = engine.prey_violations(&means);
    engine.step_predator_decision_phase(&violations);

    let speed = engine.config.predator_speed;
    for predator in &engine.predators {
        assert!((predator.velocity[0] - speed).abs() < 1e-9);
    }
}

#[test]
fn capture_respects_floor_and_batches_per_entity() {
    let mut engine = pair_engine(false, small_config());
    let dims = engine.config.dimensions;
    place_all(&mut engine, "animal", &vec![0.0; dims]);
    place_all(&mut engine, "dog", &axis(dims, 0).iter().map(|x| x * 5.0).collect::<Vec<_>>());
    let dog = id(&engine, "dog");
    for (i, prey) in engine.populations[dog].iter_mut().enumerate() {
        prey.energy = i as f64 + 1.0;
    }
    for (k, predator) in engine.predators.iter_mut().enumerate() {
        predator.position = if k == 0 {
            axis(dims, 0).iter().map(|x| x * 5.0).collect()
        } else {
            vec![1000.0; dims]
        };
    }

    engine.step_capture_phase();

    let floor = engine.config.capture_survival_floor;
    assert_eq!(engine.populations[dog].len(), floor);
    assert_eq!(engine.prey("animal").unwrap().len(), 10);
    assert_eq!(engine.captures_last_step, 10 - floor);
    // lowest indices go first; energy is only paid for removed prey
    let survivors: Vec<f64> = engine.populations[dog].iter().map(|p| p.energy).collect();
    assert_eq!(survivors, vec![6.0, 7.0, 8.0, 9.0, 10.0]);
    let gained = engine.predators[0].energy - engine.config.initial_energy;
    assert!((gained - 0.3 * 15.0).abs() < 1e-9);
}

#[test]
fn capture_spares_prey_on_the_surface() {
    let mut engine = pair_engine(false, small_config());
    let dims = engine.config.dimensions;
    place_all(&mut engine, "dog", &vec![0.0; dims]);
    place_all(&mut engine, "animal", &axis(dims, 0).iter().map(|x| x * 0.5).collect::<Vec<_>>());
    for predator in &mut engine.predators {
        predator.position = vec![0.0; dims];
    }
    engine.step_capture_phase();
    assert_eq!(engine.prey_count(), 20);
    assert_eq!(engine.captures_last_step, 0);
}

#[test]
fn energy_phase_rewards_surface_and_charges_upkeep() {
    let mut engine = pair_engine(false, small_config());
    let dims = engine.config.dimensions;
    place_all(&mut engine, "dog", &vec![0.0; dims]);
    place_all(&mut engine, "animal", &vec![-1.0; dims]);
    engine.step_energy_phase();

    let cfg = engine.config.clone();
    for prey in engine.prey("dog").unwrap() {
        assert!((prey.energy - (cfg.initial_energy - cfg.living_cost)).abs() < 1e-9);
    }

    let mut engine = Engine::new(
        &names(&["dog"]),
        &[],
        &axis_directions(dims),
        small_config(),
    )
    .unwrap();
    engine.step_energy_phase();
    let expected = cfg.initial_energy + cfg.surface_energy_rate - cfg.living_cost;
    assert!(engine
        .prey("dog")
        .unwrap()
        .iter()
        .all(|p| (p.energy - expected).abs() < 1e-9));
    assert!(engine
        .predators()
        .iter()
        .all(|p| (p.energy - (cfg.initial_energy - cfg.predator_living_cost)).abs() < 1e-9));
}

#[test]
fn death_removes_most_starved_first_down_to_floor() {
    let mut engine = pair_engine(false, small_config());
    let dog = id(&engine, "dog");
    for (i, prey) in engine.populations[dog].iter_mut().enumerate() {
        prey.energy = if i == 0 { 50.0 } else { -(i as f64) };
    }
    engine.predators[0].energy = 0.0;

    engine.step_death_phase();

    let mut left: Vec<f64> = engine.populations[dog].iter().map(|p| p.energy).collect();
    left.sort_by(|a, b| a.total_cmp(b));
    assert_eq!(left, vec![-2.0, -1.0, 50.0]);
    assert_eq!(engine.predator_count(), 3);
    assert_eq!(engine.deaths_last_step, 7 + 1);
}

#[test]
fn reproduction_stops_at_cap() {
    let config = EngineConfig {
        max_prey_per_entity: 12,
        ..small_config()
    };
    let mut engine = pair_engine(false, config);
    let dog = id(&engine, "dog");
    for prey in &mut engine.populations[dog] {
        prey.energy = 200.0;
    }
    engine.predators[0].energy = 200.0;

    engine.step_reproduction_phase();

    let members = &engine.populations[dog];
    assert_eq!(members.len(), 12);
    assert_eq!(members[0].energy, 150.0);
    assert_eq!(members[1].energy, 150.0);
    assert_eq!(members[2].energy, 200.0);
    assert_eq!(members[11].energy, engine.config.initial_energy);
    assert_eq!(members[11].age, 0);
    assert_eq!(engine.predator_count(), 5);
    assert!(Arc::ptr_eq(
        &engine.predators[4].direction,
        &engine.predators[0].direction
    ));
    assert_eq!(engine.births_last_step, 3);
}

#[test]
fn populations_stay_within_bounds_every_step() {
    let entities = names(&["dog", "cat", "animal", "pet", "fish"]);
    let relations = vec![
        RelationSpec::new("dog", "animal", is_a()),
        RelationSpec::new("cat", "animal", is_a()),
        RelationSpec::new("fish", "animal", is_a()),
        RelationSpec::new("dog", "pet", ConnectorPattern::new(["can", "be"])),
        RelationSpec::new("fish", "cat", ConnectorPattern::new(["is", "not"])).negated(),
    ];
    let directions = ConnectorDirections::from_relation_frequencies(&relations, 1, 6, 9);
    let config = EngineConfig {
        dimensions: 6,
        max_prey_per_entity: 40,
        reproduce_threshold: 101.0,
        reproduce_cost: 1.0,
        ..EngineConfig::default()
    };
    let mut engine = Engine::new(&entities, &relations, &directions, config).unwrap();
    let floor = engine.config.survival_floor();
    let cap = engine.config.max_prey_per_entity;
    for _ in 0..150 {
        engine.step();
        for members in &engine.populations {
            assert!(members.len() >= floor && members.len() <= cap);
        }
        assert!(engine.predator_count() <= engine.config.max_predators);
    }
}

#[test]
fn temperature_anneals_monotonically_to_floor() {
    let config = EngineConfig {
        temperature_decay: 0.9,
        ..small_config()
    };
    let mut engine = pair_engine(false, config);
    let mut last = engine.temperature();
    for _ in 0..100 {
        engine.step();
        assert!(engine.temperature() <= last);
        assert!(engine.temperature() >= engine.config.minimum_temperature);
        last = engine.temperature();
    }
    assert_eq!(engine.temperature(), engine.config.minimum_temperature);
}

#[test]
fn identical_seeds_give_identical_runs() {
    let mut a = pair_engine(false, small_config());
    let mut b = pair_engine(false, small_config());
    a.train(40);
    b.train(40);
    assert_eq!(a.all_positions(), b.all_positions());
    assert_eq!(a.population_stats(), b.population_stats());

    let mut c = pair_engine(
        false,
        EngineConfig {
            seed: 7,
            ..small_config()
        },
    );
    c.train(40);
    assert_ne!(a.all_positions(), c.all_positions());
}

#[test]
fn training_can_be_resumed() {
    let mut once = pair_engine(false, small_config());
    once.train(30);
    let mut twice = pair_engine(false, small_config());
    twice.train(10);
    twice.train(20);
    assert_eq!(once.step_index(), twice.step_index());
    assert_eq!(once.all_positions(), twice.all_positions());
}

#[test]
fn no_relations_means_zero_violation_everywhere() {
    let mut engine = Engine::new(
        &names(&["dog", "cat"]),
        &[],
        &ConnectorDirections::new(),
        small_config(),
    )
    .unwrap();
    engine.train(50);
    assert_eq!(engine.mean_violation(), 0.0);
    for (name, members) in engine.all_positions() {
        for position in members {
            assert_eq!(engine.violation_of(&name, &position), Some(0.0));
        }
    }
    assert_eq!(engine.predator_count(), 0);
    for members in &engine.populations {
        assert!(members.len() <= engine.config.max_prey_per_entity);
    }
}

#[test]
fn aggregates_cover_every_populated_entity() {
    let mut engine = pair_engine(false, small_config());
    engine.train(5);
    let means = engine.mean_positions();
    let best = engine.best_positions();
    let all = engine.all_positions();
    assert_eq!(means.keys().collect::<Vec<_>>(), vec!["animal", "dog"]);
    assert_eq!(best.len(), 2);
    assert_eq!(all["dog"].len(), engine.prey("dog").unwrap().len());
    for (name, position) in &best {
        let v = engine.violation_of(name, position).unwrap();
        for member in &all[name] {
            assert!(v <= engine.violation_of(name, member).unwrap());
        }
    }
}

#[test]
fn configuration_falls_back_to_first_member() {
    let mut engine = pair_engine(false, small_config());
    let dog = id(&engine, "dog");
    engine.populations[dog].truncate(3);
    let fifth = engine.configuration(5);
    assert_eq!(fifth["dog"], engine.populations[dog][0].position);
    let animal = id(&engine, "animal");
    assert_eq!(fifth["animal"], engine.populations[animal][5].position);
    assert_eq!(engine.configuration_count(), 3);
}

#[test]
fn configuration_count_matches_population_map() {
    let mut engine = pair_engine(false, small_config());
    for members in &mut engine.populations {
        let extra: Vec<PreyAgent> = members.iter().take(2).cloned().collect();
        members.extend(extra);
    }
    // both populations grew past population_size
    assert_eq!(engine.configuration_count(), 12);
    assert_eq!(
        engine.configuration_count(),
        setops::configuration_count(&engine.all_positions())
    );
}

#[test]
fn mean_violation_is_infinite_without_members() {
    let mut engine = pair_engine(false, small_config());
    for members in &mut engine.populations {
        members.clear();
    }
    assert!(engine.mean_violation().is_infinite());
    assert!(engine.mean_positions().is_empty());
}

#[test]
fn run_experiment_samples_and_rejects_bad_arguments() {
    let mut engine = pair_engine(false, small_config());
    assert_eq!(
        engine.try_run_experiment(10, 0).unwrap_err(),
        ExperimentError::InvalidSampleEvery
    );
    assert!(matches!(
        engine.try_run_experiment(Engine::MAX_EXPERIMENT_STEPS + 1, 1),
        Err(ExperimentError::TooManySteps { .. })
    ));

    let summary = engine.try_run_experiment(10, 4).unwrap();
    let steps: Vec<usize> = summary.samples.iter().map(|s| s.step).collect();
    assert_eq!(steps, vec![4, 8, 10]);
    assert_eq!(summary.final_prey_count, engine.prey_count());
    assert!(summary.final_mean_violation.is_some());
    assert_eq!(engine.step_index(), 10);
}

#[test]
fn engine_is_send() {
    fn assert_send<T: Send>() {}
    assert_send::<Engine>();
}

#[test]
fn plain_relation_converges_to_preferred_offset() {
    let config = EngineConfig {
        num_predators: 1,
        ..EngineConfig::default()
    };
    let mut engine = pair_engine(false, config);
    engine.train(600);

    let means = engine.mean_positions();
    let offset = means["animal"][0] - means["dog"][0];
    // levels off near 0.53 / 0.01 rather than reaching the surface threshold
    assert!((offset - 0.5).abs() < 0.06, "offset {offset}");
    assert!(engine.mean_violation() < 0.02, "{}", engine.mean_violation());
}

#[test]
fn negated_relation_pushes_members_apart() {
    let mut engine = pair_engine(true, EngineConfig::default());
    engine.train(400);

    // The population means stay close together; only the best members separate.
    let threshold = engine.config.surface_threshold;
    let means = engine.mean_positions();
    for (name, position) in engine.best_positions() {
        let v = engine.violation_of(&name, &position).unwrap();
        assert!(v <= threshold, "{name}: {v}");

        let partner = if name == "dog" { "animal" } else { "dog" };
        let gap = (means[partner][0] - position[0]).abs();
        assert!(gap >= violation::NEGATION_MARGIN - threshold, "{name}: gap {gap}");
    }
}

#[test]
fn partner_relative_frame_is_selectable() {
    let config = EngineConfig {
        displacement_frame: DisplacementFrame::PartnerRelative,
        ..small_config()
    };
    let mut engine = pair_engine(false, config);
    let dims = engine.config.dimensions;
    place_all(&mut engine, "dog", &vec![0.0; dims]);
    place_all(&mut engine, "animal", &axis(dims, 0).iter().map(|x| x * 0.5).collect::<Vec<_>>());
    // dog sees +0.5, animal sees -0.5 under the partner-relative frame
    let dog_v = engine.violation_of("dog", &vec![0.0; dims]).unwrap();
    let animal_v = engine
        .violation_of("animal", &axis(dims, 0).iter().map(|x| x * 0.5).collect::<Vec<_>>())
        .unwrap();
    assert!(dog_v.abs() < 1e-12);
    assert!((animal_v - 1.0).abs() < 1e-12);
}
