//! Derivative-free global minimization
//!
//! Differential evolution over a box-bounded search space. The cost surface
//! produced by matching a scan against a distance field is non-smooth and
//! full of local minima, so a population-based search is used instead of
//! anything gradient-shaped. The whole search is a pure function of the
//! cost closure, the bounds, and the RNG seed.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use thiserror::Error;

use crate::config::SearchConfig;

/// Reasons a search can fail to produce a usable minimum
#[derive(Debug, Error)]
pub enum OptimizeError {
    /// Every candidate evaluated to a non-finite cost, so the population
    /// never found footing anywhere in the search space.
    #[error("cost function returned no finite value for any candidate")]
    NoFiniteCost,

    /// The population energy spread never fell under the tolerance within
    /// the generation budget.
    #[error("search did not converge within {generations} generations")]
    DidNotConverge { generations: usize },
}

/// Best candidate found by a converged search
#[derive(Debug, Clone, Copy)]
pub struct Minimum<const D: usize> {
    pub point: [f64; D],
    pub cost: f64,
    pub generations: usize,
}

/// Differential-evolution minimizer (DE/rand/1/bin)
#[derive(Debug, Clone)]
pub struct DifferentialEvolution {
    config: SearchConfig,
}

impl DifferentialEvolution {
    pub fn new(config: SearchConfig) -> Self {
        DifferentialEvolution { config }
    }

    /// Minimize `cost` inside `bounds`.
    ///
    /// Candidates with infinite cost are legal and simply lose every
    /// selection; they must never make the search panic. Success means the
    /// population converged, not merely that the budget ran out: a search
    /// that exhausts its generations without converging reports an error so
    /// the caller can retry rather than trust a noisy answer.
    pub fn minimize<const D: usize, F>(
        &self,
        bounds: &[(f64, f64); D],
        cost: F,
    ) -> Result<Minimum<D>, OptimizeError>
    where
        F: Fn(&[f64; D]) -> f64,
    {
        let cfg = &self.config;
        let mut rng = match cfg.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };

        // population size of at least 4 is needed for rand/1 mutation
        let population_size = cfg.population.max(4);

        let mut population: Vec<[f64; D]> = (0..population_size)
            .map(|_| {
                let mut candidate = [0.0; D];
                for (value, &(low, high)) in candidate.iter_mut().zip(bounds) {
                    *value = rng.gen_range(low..=high);
                }
                candidate
            })
            .collect();
        let mut costs: Vec<f64> = population.iter().map(|c| cost(c)).collect();

        for generation in 1..=cfg.max_generations {
            for i in 0..population_size {
                let (a, b, c) = pick_distinct(&mut rng, population_size, i);

                let mut trial = population[i];
                let forced = rng.gen_range(0..D);
                for d in 0..D {
                    if d == forced || rng.gen::<f64>() < cfg.crossover_probability {
                        let mutant = population[a][d]
                            + cfg.differential_weight * (population[b][d] - population[c][d]);
                        trial[d] = mutant.clamp(bounds[d].0, bounds[d].1);
                    }
                }

                let trial_cost = cost(&trial);
                if trial_cost <= costs[i] {
                    population[i] = trial;
                    costs[i] = trial_cost;
                }
            }

            if let Some(best) = self.converged(&costs) {
                return Ok(Minimum {
                    point: population[best],
                    cost: costs[best],
                    generations: generation,
                });
            }
        }

        if costs.iter().all(|c| !c.is_finite()) {
            Err(OptimizeError::NoFiniteCost)
        } else {
            Err(OptimizeError::DidNotConverge {
                generations: cfg.max_generations,
            })
        }
    }

    /// Convergence check on the population energies: the spread must fall
    /// under `tolerance` relative to the mean, and every member must hold a
    /// finite cost. Returns the index of the best member once converged.
    fn converged(&self, costs: &[f64]) -> Option<usize> {
        if costs.iter().any(|c| !c.is_finite()) {
            return None;
        }

        let mean = costs.iter().sum::<f64>() / costs.len() as f64;
        let variance =
            costs.iter().map(|c| (c - mean) * (c - mean)).sum::<f64>() / costs.len() as f64;
        let spread = variance.sqrt();

        if spread > self.config.absolute_tolerance + self.config.tolerance * mean.abs() {
            return None;
        }

        costs
            .iter()
            .enumerate()
            .min_by(|(_, x), (_, y)| x.total_cmp(y))
            .map(|(i, _)| i)
    }
}

/// Three distinct population indices, all different from `exclude`
fn pick_distinct(rng: &mut StdRng, population_size: usize, exclude: usize) -> (usize, usize, usize) {
    let mut pick = |taken: &[usize]| loop {
        let candidate = rng.gen_range(0..population_size);
        if candidate != exclude && !taken.contains(&candidate) {
            return candidate;
        }
    };

    let a = pick(&[]);
    let b = pick(&[a]);
    let c = pick(&[a, b]);
    (a, b, c)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn search_config(seed: u64) -> SearchConfig {
        SearchConfig {
            population: 30,
            max_generations: 600,
            tolerance: 0.01,
            absolute_tolerance: 1e-3,
            seed: Some(seed),
            ..SearchConfig::default()
        }
    }

    #[test]
    fn finds_the_minimum_of_a_shifted_bowl() {
        let de = DifferentialEvolution::new(search_config(7));
        let bounds = [(-10.0, 10.0), (-10.0, 10.0), (-10.0, 10.0)];
        let minimum = de
            .minimize(&bounds, |p| {
                5.0 + (p[0] - 2.0).powi(2) + (p[1] + 3.0).powi(2) + (p[2] - 0.5).powi(2)
            })
            .unwrap();

        assert!((minimum.point[0] - 2.0).abs() < 0.3);
        assert!((minimum.point[1] + 3.0).abs() < 0.3);
        assert!((minimum.point[2] - 0.5).abs() < 0.3);
        assert!(minimum.cost < 5.3);
        assert!(minimum.generations <= 600);
    }

    #[test]
    fn respects_bounds() {
        let de = DifferentialEvolution::new(search_config(11));
        let bounds = [(0.0, 1.0), (5.0, 6.0)];
        // minimum at the lower corner of the box
        let minimum = de.minimize(&bounds, |p| p[0] + p[1]).unwrap();

        assert!(minimum.point[0] >= 0.0 && minimum.point[0] <= 1.0);
        assert!(minimum.point[1] >= 5.0 && minimum.point[1] <= 6.0);
        assert!(minimum.cost < 5.1);
    }

    #[test]
    fn all_infinite_costs_fail_without_panicking() {
        let de = DifferentialEvolution::new(search_config(3));
        let bounds = [(-1.0, 1.0)];
        let result = de.minimize(&bounds, |_| f64::INFINITY);

        assert!(matches!(result, Err(OptimizeError::NoFiniteCost)));
    }

    #[test]
    fn identical_seeds_reproduce_the_same_minimum() {
        let bounds = [(-5.0, 5.0), (-5.0, 5.0)];
        let run = || {
            DifferentialEvolution::new(search_config(42))
                .minimize(&bounds, |p| 1.0 + p[0].powi(2) + p[1].powi(2))
                .unwrap()
        };
        let first = run();
        let second = run();
        assert_eq!(first.point, second.point);
    }
}
