pub mod generator;
pub mod tree;

use crate::config::{Config, ConfigError, GaConfig};
use crate::evaluation::fitness::{FitnessEvaluator, FitnessReport};
use crate::evolution::generator::TreeGenerator;
use crate::evolution::tree::ProgramTree;
use log::{debug, info, warn};
use rand::prelude::*;
use rand::rngs::StdRng;
use rand::seq::index::sample;
use rayon::iter::{IntoParallelRefIterator, ParallelIterator};
use std::cmp::Ordering;

/// Fitness of an individual that has not been evaluated yet.
const UNEVALUATED: f64 = f64::NEG_INFINITY;

/// A program born during evolution together with its score.
#[derive(Debug, Clone, PartialEq)]
pub struct Individual {
    pub tree: ProgramTree,
    /// Mean episode fitness, `NEG_INFINITY` until evaluated
    pub fitness: f64,
}

impl Individual {
    pub fn new(tree: ProgramTree) -> Self {
        Self {
            tree,
            fitness: UNEVALUATED,
        }
    }

    pub fn is_evaluated(&self) -> bool {
        self.fitness != UNEVALUATED
    }

    /// Single-character encoding of the program, restorable with `str::parse`.
    pub fn encode(&self) -> String {
        self.tree.encode()
    }

    pub fn node_count(&self) -> usize {
        self.tree.node_count()
    }
}

fn by_fitness(a: &Individual, b: &Individual) -> Ordering {
    a.fitness.partial_cmp(&b.fitness).unwrap_or(Ordering::Equal)
}

/// Summary of one generation, recorded after its evaluation.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GenerationStats {
    /// Zero-based generation index
    pub generation: usize,
    pub average_fitness: f64,
    /// Population standard deviation of the fitness values
    pub std_fitness: f64,
    pub best_fitness: f64,
    pub worst_fitness: f64,
    pub average_nodes: f64,
    /// Episodes cut short by an execution fault during this generation's evaluation
    pub aborted_runs: usize,
}

/// Struct associated with the `evaluate_population` function, counts what happened while
/// scoring the individuals that still needed it.
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq)]
pub struct PopulationEvaluationReport {
    pub evaluated: usize,
    pub aborted_runs: usize,
}

/// Everything a finished run hands back.
#[derive(Debug, Clone)]
pub struct EvolutionReport {
    /// Last generation, sorted best first
    pub final_population: Vec<Individual>,
    /// One entry per generation, in order
    pub stats: Vec<GenerationStats>,
    /// Best individual seen over the whole run
    pub best: Option<Individual>,
}

/// Per-generation hook for logging or visualisation. The engine never depends on what it does.
pub trait GenerationObserver {
    fn on_generation(&mut self, stats: &GenerationStats, best: &Individual);
}

impl<F> GenerationObserver for F
where
    F: FnMut(&GenerationStats, &Individual),
{
    fn on_generation(&mut self, stats: &GenerationStats, best: &Individual) {
        self(stats, best)
    }
}

/// Drives the generational loop: initialise, evaluate, keep the best-ever elite, select,
/// recombine, mutate, replace.
///
/// All randomness flows from one `StdRng` seeded with `ga.seed`. Evaluation runs in parallel,
/// each individual getting its own stream seeded from the master one in population order, so
/// a seed reproduces a run exactly whatever the thread count.
#[derive(Clone)]
pub struct EvolutionEngine<'a> {
    config: &'a GaConfig,
    evaluator: FitnessEvaluator<'a>,
    generator: TreeGenerator<'a>,
    population: Vec<Individual>,
    /// Best-ever individual, survives every generation untouched
    best: Option<Individual>,
    rng: StdRng,
    /// Operator calls this generation that ran out of attempts
    fallbacks: usize,
}

impl<'a> EvolutionEngine<'a> {
    /// Creates a new engine borrowing an already validated configuration.
    pub fn new(config: &'a Config) -> Self {
        Self {
            config: &config.ga,
            evaluator: FitnessEvaluator::new(&config.arena, &config.simulation),
            generator: TreeGenerator::new(&config.ga),
            population: Vec::with_capacity(config.ga.population_size),
            best: None,
            rng: StdRng::seed_from_u64(config.ga.seed),
            fallbacks: 0,
        }
    }

    pub fn population(&self) -> &[Individual] {
        &self.population
    }

    /// The surviving elite, `None` before anything was evaluated.
    pub fn best_individual(&self) -> Option<&Individual> {
        self.best.as_ref()
    }

    pub fn evaluator(&self) -> FitnessEvaluator<'a> {
        self.evaluator
    }

    /// Runs the configured number of generations.
    pub fn evolve(&mut self) -> EvolutionReport {
        self.evolve_with_observer(&mut |_: &GenerationStats, _: &Individual| {})
    }

    /// Runs the configured number of generations, calling `observer` after each one.
    ///
    /// The returned population is the last evaluated generation, no offspring are bred after
    /// the final one.
    ///
    /// # Arguments
    /// * `&mut self` - The EvolutionEngine that will orchestrate the evolution process
    /// * `observer` - Hook handed each generation's stats and the best-ever individual
    ///
    /// # Returns
    /// * `EvolutionReport` - The final population sorted best first, one `GenerationStats`
    ///   per generation and the best individual of the whole run
    pub fn evolve_with_observer<O: GenerationObserver + ?Sized>(
        &mut self,
        observer: &mut O,
    ) -> EvolutionReport {
        info!(
            "Initializing population of size {}...",
            self.config.population_size
        );
        self.initialize_population();

        let mut stats = Vec::with_capacity(self.config.num_generations);
        for generation in 0..self.config.num_generations {
            info!(
                "--- Starting Generation {}/{} ---",
                generation + 1,
                self.config.num_generations
            );

            let report = self.evaluate_population();
            self.update_best();
            let generation_stats = self.generation_stats(generation, report);
            info!(
                "Gen {}: Best Fitness={:.4} | Avg Fitness={:.4} | Std Fitness={:.4} | Worst Fitness={:.4} | Avg Nodes={:.1} | Aborted Runs={}",
                generation + 1,
                generation_stats.best_fitness,
                generation_stats.average_fitness,
                generation_stats.std_fitness,
                generation_stats.worst_fitness,
                generation_stats.average_nodes,
                generation_stats.aborted_runs
            );
            if let Some(best) = &self.best {
                observer.on_generation(&generation_stats, best);
            }
            stats.push(generation_stats);

            if generation + 1 < self.config.num_generations {
                self.population = self.next_generation();
            }
        }

        // Only does work when no generation ran at all
        self.evaluate_population();
        self.update_best();
        self.population.sort_by(|a, b| by_fitness(b, a));

        info!("Evolution complete.");
        EvolutionReport {
            final_population: self.population.clone(),
            stats,
            best: self.best.clone(),
        }
    }

    /// Fills the population with ramped half-and-half trees, none of them evaluated.
    pub fn initialize_population(&mut self) {
        self.population = self
            .generator
            .initial_population(&mut self.rng, self.config.population_size)
            .into_iter()
            .map(Individual::new)
            .collect();
        self.best = None;
    }

    /// Scores every individual that has no fitness yet.
    ///
    /// Seeds are drawn from the master stream sequentially in index order before the parallel
    /// section starts, and results are written back by index.
    ///
    /// # Arguments
    /// * `&mut self` - The `EvolutionEngine` whose population is evaluated in-place
    ///
    /// # Returns
    /// * `PopulationEvaluationReport` - How many individuals were scored and how many of their
    ///   episodes were aborted by execution faults
    pub fn evaluate_population(&mut self) -> PopulationEvaluationReport {
        let work_items: Vec<(usize, u64)> = self
            .population
            .iter()
            .enumerate()
            .filter(|(_, ind)| !ind.is_evaluated())
            .map(|(i, _)| (i, self.rng.random()))
            .collect();

        if work_items.is_empty() {
            return PopulationEvaluationReport::default();
        }

        let population = &self.population;
        let evaluator = self.evaluator;
        let results: Vec<(usize, FitnessReport)> = work_items
            .par_iter()
            .map(|&(i, seed)| {
                let mut rng = StdRng::seed_from_u64(seed);
                (i, evaluator.evaluate(&population[i].tree, &mut rng))
            })
            .collect();

        let mut report = PopulationEvaluationReport {
            evaluated: results.len(),
            aborted_runs: 0,
        };
        for (i, fitness) in results {
            self.population[i].fitness = fitness.fitness;
            report.aborted_runs += fitness.aborted_runs;
        }

        if report.aborted_runs > 0 {
            warn!(
                "{} episodes aborted on execution faults this generation",
                report.aborted_runs
            );
        }
        report
    }

    fn update_best(&mut self) {
        let Some(champion) = self
            .population
            .iter()
            .filter(|ind| ind.is_evaluated())
            .max_by(|a, b| by_fitness(a, b))
        else {
            return;
        };
        let improved = self
            .best
            .as_ref()
            .is_none_or(|best| champion.fitness > best.fitness);
        if improved {
            info!(
                "New best individual: fitness {:.4}, {} nodes: {}",
                champion.fitness,
                champion.node_count(),
                champion.tree
            );
            self.best = Some(champion.clone());
        }
    }

    fn generation_stats(
        &self,
        generation: usize,
        report: PopulationEvaluationReport,
    ) -> GenerationStats {
        let size = self.population.len().max(1) as f64;
        let fitnesses = self.population.iter().map(|ind| ind.fitness);
        let average_fitness = fitnesses.clone().sum::<f64>() / size;
        let variance = fitnesses
            .clone()
            .map(|f| (f - average_fitness).powi(2))
            .sum::<f64>()
            / size;
        GenerationStats {
            generation,
            average_fitness,
            std_fitness: variance.sqrt(),
            best_fitness: fitnesses.clone().fold(f64::NEG_INFINITY, f64::max),
            worst_fitness: fitnesses.fold(f64::INFINITY, f64::min),
            average_nodes: self
                .population
                .iter()
                .map(Individual::node_count)
                .sum::<usize>() as f64
                / size,
            aborted_runs: report.aborted_runs,
        }
    }

    /// Breeds the replacement population: the elite first, then offspring of tournament
    /// winners taken in pairs until the population is full.
    fn next_generation(&mut self) -> Vec<Individual> {
        let size = self.config.population_size;
        let mut next_generation = Vec::with_capacity(size);

        // Preserve it for next generation (exploitation)
        if let Some(best) = &self.best {
            next_generation.push(best.clone());
        }

        self.fallbacks = 0;
        let parents = self.select_parents();
        for pair in parents.chunks(2) {
            if next_generation.len() >= size {
                break;
            }
            // An odd winner out is paired with itself
            let first = self.population[pair[0]].tree.clone();
            let second = self.population[pair[pair.len() - 1]].tree.clone();

            let mut children = if self.rng.random_bool(self.config.crossover_rate) {
                self.crossover(&first, &second)
            } else {
                [first, second]
            };
            for child in children.iter_mut() {
                if self.rng.random_bool(self.config.mutation_rate) {
                    self.mutate(child);
                }
            }

            let remaining_slots = size - next_generation.len();
            next_generation.extend(
                children
                    .into_iter()
                    .take(remaining_slots)
                    .map(Individual::new),
            );
        }

        if self.fallbacks > 0 {
            warn!(
                "{} crossover/mutation calls found no offspring within bounds after {} attempts",
                self.fallbacks, self.config.max_operator_attempts
            );
        }
        next_generation
    }

    /// Indices of `population_size` tournament winners.
    fn select_parents(&mut self) -> Vec<usize> {
        (0..self.config.population_size)
            .map(|_| self.tournament())
            .collect()
    }

    /// One k-way tournament. Contestants are distinct within a tournament, and every
    /// tournament draws afresh from the whole population.
    ///
    /// Drawing without replacement is what makes a tournament of the whole population always
    /// return its fittest member; with replacement a size-N tournament could miss it.
    fn tournament(&mut self) -> usize {
        let k = self.config.tournament_size.clamp(1, self.population.len());
        sample(&mut self.rng, self.population.len(), k)
            .into_iter()
            .max_by(|&a, &b| by_fitness(&self.population[a], &self.population[b]))
            .unwrap_or(0)
    }

    /// Subtree-swap crossover. Crossover points are drawn uniformly over both parents and
    /// redrawn while either child breaks the tree limits. When every attempt fails the
    /// parents come back unchanged.
    fn crossover(&mut self, first: &ProgramTree, second: &ProgramTree) -> [ProgramTree; 2] {
        let limits = self.generator.limits();
        for _ in 0..self.config.max_operator_attempts {
            let i = self.rng.random_range(0..first.node_count());
            let j = self.rng.random_range(0..second.node_count());
            let (Some(from_first), Some(from_second)) = (first.subtree(i), second.subtree(j))
            else {
                continue;
            };

            let mut child1 = first.clone();
            let mut child2 = second.clone();
            if child1.replace_subtree(i, from_second.clone()).is_err()
                || child2.replace_subtree(j, from_first.clone()).is_err()
            {
                continue;
            }
            if limits.admits(&child1) && limits.admits(&child2) {
                return [child1, child2];
            }
        }
        debug!("Crossover attempts exhausted, keeping parents {first} and {second}");
        self.fallbacks += 1;
        [first.clone(), second.clone()]
    }

    /// Mutates `tree` in place, shrinking it with probability `shrink_rate` and replacing a
    /// subtree otherwise.
    fn mutate(&mut self, tree: &mut ProgramTree) {
        if self.rng.random_bool(self.config.shrink_rate) {
            self.shrink(tree);
        } else {
            self.replace_with_grown(tree);
        }
    }

    /// Shrink mutation: a random function node is replaced by one of its own children.
    /// The result is never larger than the input, so it always fits the limits. A lone
    /// terminal has nothing to shrink and is left as it is.
    fn shrink(&mut self, tree: &mut ProgramTree) {
        let functions: Vec<usize> = (0..tree.node_count())
            .filter(|&i| tree.subtree(i).is_some_and(|node| !node.children().is_empty()))
            .collect();
        let Some(&index) = functions.choose(&mut self.rng) else {
            return;
        };
        let Some(child) = tree
            .subtree(index)
            .and_then(|node| node.children().choose(&mut self.rng))
            .cloned()
        else {
            return;
        };
        // The child came out of a well-formed tree, so the swap cannot be refused
        let _ = tree.replace_subtree(index, child);
    }

    /// Subtree mutation: a random node is replaced by a freshly grown subtree. Redrawn while
    /// the result breaks the tree limits, left unchanged when every attempt fails.
    fn replace_with_grown(&mut self, tree: &mut ProgramTree) {
        let limits = self.generator.limits();
        for _ in 0..self.config.max_operator_attempts {
            let index = self.rng.random_range(0..tree.node_count());
            let replacement = self.generator.mutation_subtree(&mut self.rng);
            let mut candidate = tree.clone();
            if candidate.replace_subtree(index, replacement).is_ok() && limits.admits(&candidate)
            {
                *tree = candidate;
                return;
            }
        }
        debug!("Mutation attempts exhausted, keeping {tree}");
        self.fallbacks += 1;
    }
}

/// Runs a whole evolution with the four headline parameters overridden on top of `config`.
///
/// The merged configuration is validated first, an impossible combination is reported before
/// any work is done.
///
/// # Arguments
/// * `config` - Base configuration supplying the arena, the episode and the remaining GA parameters
/// * `population_size` - Number of individuals per generation
/// * `generations` - Number of generations to run, zero only evaluates the initial population
/// * `crossover_rate` - Probability that a parent pair is recombined
/// * `mutation_rate` - Probability that an offspring is mutated
///
/// # Returns
/// * `Result<EvolutionReport, ConfigError>` - The finished run, or the validation error
pub fn run_evolution(
    config: &Config,
    population_size: usize,
    generations: usize,
    crossover_rate: f64,
    mutation_rate: f64,
) -> Result<EvolutionReport, ConfigError> {
    let mut config = config.clone();
    config.ga.population_size = population_size;
    config.ga.num_generations = generations;
    config.ga.crossover_rate = crossover_rate;
    config.ga.mutation_rate = mutation_rate;
    config.validate()?;

    let mut engine = EvolutionEngine::new(&config);
    Ok(engine.evolve())
}
