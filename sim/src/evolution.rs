use crate::{Agent, SimError};
use rand::Rng;
use shared::{Controller, EvolutionConfig, MutationKind, SelectionStrategy};
use uuid::Uuid;

/// A mutated controller waiting to be placed into the next generation.
#[derive(Debug, Clone)]
pub struct Offspring<C> {
    pub controller: C,
    pub parent_id: Option<Uuid>,
}

/// Assign each retired agent its share of the generation's total age.
///
/// When nobody aged at all every agent gets `1 / n`, so the values still
/// form a probability distribution.
pub fn assign_fitness<C>(retired: &mut [Agent<C>]) {
    if retired.is_empty() {
        return;
    }

    let total_age: u64 = retired.iter().map(|a| a.age).sum();
    if total_age == 0 {
        let uniform = 1.0 / retired.len() as f64;
        for agent in retired.iter_mut() {
            agent.fitness = uniform;
        }
        return;
    }

    for agent in retired.iter_mut() {
        agent.fitness = agent.age as f64 / total_age as f64;
    }
}

/// Roulette-wheel selection over fitness values summing to one.
///
/// Draws `r` from `(0, 1]` and walks the agents in order, subtracting each
/// fitness until `r` drops to zero or below. Rounding can leave a sliver of
/// `r` after the walk, in which case the last agent is chosen.
pub fn select_parent<'a, C, R: Rng + ?Sized>(
    retired: &'a [Agent<C>],
    rng: &mut R,
) -> Result<&'a Agent<C>, SimError> {
    let last = retired.last().ok_or(SimError::EmptyGeneration)?;

    let mut r = 1.0 - rng.gen::<f64>();
    for agent in retired {
        r -= agent.fitness;
        if r <= 0.0 {
            return Ok(agent);
        }
    }

    Ok(last)
}

/// The fittest retired agent; ties go to the earliest in order
pub fn fittest<C>(retired: &[Agent<C>]) -> Result<&Agent<C>, SimError> {
    let mut ranked: Vec<&Agent<C>> = retired.iter().collect();
    ranked.sort_by(|a, b| b.fitness.total_cmp(&a.fitness));
    ranked.first().copied().ok_or(SimError::EmptyGeneration)
}

/// Perturb a single weight according to the mutation settings
pub fn perturb<R: Rng + ?Sized>(weight: f64, config: &EvolutionConfig, rng: &mut R) -> f64 {
    if rng.gen::<f64>() >= config.mutation_probability {
        return weight;
    }

    let offset = match config.mutation_kind {
        MutationKind::Additive => rng.gen::<f64>() * config.mutation_magnitude,
        MutationKind::Symmetric => (rng.gen::<f64>() * 2.0 - 1.0) * config.mutation_magnitude,
    };
    weight + offset
}

/// Clone and mutate a parent's controller into a fresh, independent one
pub fn reproduce<C: Controller, R: Rng + ?Sized>(
    parent: &C,
    config: &EvolutionConfig,
    rng: &mut R,
) -> C {
    let mut child = parent.clone();
    child.mutate(&mut |weight| perturb(weight, config, rng));
    child
}

/// Build the next population from a fully retired, fitness-scored generation
pub fn next_generation<C: Controller, R: Rng + ?Sized>(
    retired: &[Agent<C>],
    config: &EvolutionConfig,
    rng: &mut R,
) -> Result<Vec<Offspring<C>>, SimError> {
    if retired.is_empty() {
        return Err(SimError::EmptyGeneration);
    }

    let mut offspring = Vec::with_capacity(config.population_size);
    match config.selection {
        SelectionStrategy::Roulette => {
            for _ in 0..config.population_size {
                let parent = select_parent(retired, rng)?;
                offspring.push(Offspring {
                    controller: reproduce(&parent.controller, config, rng),
                    parent_id: Some(parent.id),
                });
            }
        }
        SelectionStrategy::Fittest => {
            let parent = fittest(retired)?;
            for _ in 0..config.population_size {
                offspring.push(Offspring {
                    controller: reproduce(&parent.controller, config, rng),
                    parent_id: Some(parent.id),
                });
            }
        }
    }

    Ok(offspring)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;
    use shared::{AgentConfig, NeuralNet, Shape};

    fn retired_with_ages(ages: &[u64]) -> Vec<Agent<NeuralNet>> {
        let mut rng = StdRng::seed_from_u64(21);
        let shape = Shape {
            inputs: 4,
            hidden: 4,
            outputs: 1,
        };
        ages.iter()
            .map(|&age| {
                let controller = NeuralNet::random(shape, &mut rng);
                let mut agent = Agent::spawn(controller, None, &AgentConfig::default(), &mut rng);
                agent.age = age;
                agent.alive = false;
                agent
            })
            .collect()
    }

    #[test]
    fn test_fitness_is_share_of_total_age() {
        let mut retired = retired_with_ages(&[10, 30, 60]);
        assign_fitness(&mut retired);

        assert!((retired[0].fitness - 0.1).abs() < 1e-12);
        assert!((retired[1].fitness - 0.3).abs() < 1e-12);
        assert!((retired[2].fitness - 0.6).abs() < 1e-12);
    }

    #[test]
    fn test_zero_total_age_gives_uniform_fitness() {
        let mut retired = retired_with_ages(&[0, 0, 0, 0]);
        assign_fitness(&mut retired);

        assert!(retired.iter().all(|a| a.fitness == 0.25));
    }

    #[test]
    fn test_selection_on_empty_generation_fails() {
        let mut rng = StdRng::seed_from_u64(1);
        let retired: Vec<Agent<NeuralNet>> = Vec::new();

        assert!(matches!(
            select_parent(&retired, &mut rng),
            Err(SimError::EmptyGeneration)
        ));
        assert!(matches!(fittest(&retired), Err(SimError::EmptyGeneration)));
        assert!(matches!(
            next_generation(&retired, &EvolutionConfig::default(), &mut rng),
            Err(SimError::EmptyGeneration)
        ));
    }

    #[test]
    fn test_dominant_agent_is_almost_always_selected() {
        let mut retired = retired_with_ages(&[1, 1, 9998, 0]);
        assign_fitness(&mut retired);
        let dominant = retired[2].id;

        let mut rng = StdRng::seed_from_u64(99);
        let picks = (0..10_000)
            .filter(|_| select_parent(&retired, &mut rng).unwrap().id == dominant)
            .count();

        assert!(picks > 9_950, "dominant agent picked {picks} times");
    }

    #[test]
    fn test_selection_roughly_follows_fitness() {
        let mut retired = retired_with_ages(&[25, 75]);
        assign_fitness(&mut retired);

        let mut rng = StdRng::seed_from_u64(5);
        let picks = (0..20_000)
            .filter(|_| select_parent(&retired, &mut rng).unwrap().id == retired[1].id)
            .count();

        let share = picks as f64 / 20_000.0;
        assert!((share - 0.75).abs() < 0.02, "share was {share}");
    }

    #[test]
    fn test_fittest_prefers_earliest_on_ties() {
        let mut retired = retired_with_ages(&[5, 50, 50, 1]);
        assign_fitness(&mut retired);

        assert_eq!(fittest(&retired).unwrap().id, retired[1].id);
    }

    #[test]
    fn test_additive_mutation_never_decreases() {
        let config = EvolutionConfig {
            mutation_probability: 1.0,
            mutation_magnitude: 0.5,
            mutation_kind: MutationKind::Additive,
            ..Default::default()
        };
        let mut rng = StdRng::seed_from_u64(17);

        for _ in 0..1000 {
            let out = perturb(1.0, &config, &mut rng);
            assert!((1.0..1.5).contains(&out));
        }
    }

    #[test]
    fn test_symmetric_mutation_goes_both_ways() {
        let config = EvolutionConfig {
            mutation_probability: 1.0,
            mutation_magnitude: 0.5,
            mutation_kind: MutationKind::Symmetric,
            ..Default::default()
        };
        let mut rng = StdRng::seed_from_u64(17);
        let samples: Vec<f64> = (0..1000).map(|_| perturb(0.0, &config, &mut rng)).collect();

        assert!(samples.iter().all(|v| (-0.5..0.5).contains(v)));
        assert!(samples.iter().any(|v| *v < 0.0));
        assert!(samples.iter().any(|v| *v > 0.0));
    }

    #[test]
    fn test_zero_probability_leaves_weights_alone() {
        let config = EvolutionConfig {
            mutation_probability: 0.0,
            ..Default::default()
        };
        let mut rng = StdRng::seed_from_u64(3);
        let retired = retired_with_ages(&[1]);

        let child = reproduce(&retired[0].controller, &config, &mut rng);
        assert_eq!(child, retired[0].controller);
    }

    #[test]
    fn test_reproduce_does_not_alias_parent() {
        let config = EvolutionConfig {
            mutation_probability: 1.0,
            ..Default::default()
        };
        let mut rng = StdRng::seed_from_u64(3);
        let retired = retired_with_ages(&[1]);
        let before = retired[0].controller.parameters();

        let child = reproduce(&retired[0].controller, &config, &mut rng);

        assert_eq!(retired[0].controller.parameters(), before);
        assert_ne!(child.parameters(), before);
    }

    #[test]
    fn test_fittest_strategy_uses_single_parent() {
        let config = EvolutionConfig {
            population_size: 8,
            selection: SelectionStrategy::Fittest,
            ..Default::default()
        };
        let mut retired = retired_with_ages(&[3, 40, 7]);
        assign_fitness(&mut retired);
        let mut rng = StdRng::seed_from_u64(8);

        let offspring = next_generation(&retired, &config, &mut rng).unwrap();
        assert_eq!(offspring.len(), 8);
        assert!(offspring.iter().all(|o| o.parent_id == Some(retired[1].id)));
    }

    #[test]
    fn test_roulette_strategy_fills_population() {
        let config = EvolutionConfig {
            population_size: 12,
            ..Default::default()
        };
        let mut retired = retired_with_ages(&[3, 40, 7]);
        assign_fitness(&mut retired);
        let mut rng = StdRng::seed_from_u64(8);

        let offspring = next_generation(&retired, &config, &mut rng).unwrap();
        let parents: Vec<Uuid> = retired.iter().map(|a| a.id).collect();
        assert_eq!(offspring.len(), 12);
        assert!(offspring
            .iter()
            .all(|o| o.parent_id.is_some_and(|id| parents.contains(&id))));
    }

    proptest! {
        #[test]
        fn fitness_forms_a_distribution(ages in proptest::collection::vec(0u64..10_000, 1..60)) {
            let mut retired = retired_with_ages(&ages);
            assign_fitness(&mut retired);

            let sum: f64 = retired.iter().map(|a| a.fitness).sum();
            prop_assert!((sum - 1.0).abs() < 1e-9);
            prop_assert!(retired.iter().all(|a| a.fitness >= 0.0 && a.fitness <= 1.0));
        }
    }
}
