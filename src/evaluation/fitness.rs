use crate::arena::Arena;
use crate::config::{ArenaConfig, SimulationConfig};
use crate::evaluation::trajectory::Trajectory;
use crate::evolution::tree::{Node, ProgramTree};
use crate::vm::engine::VirtualMachine;
use log::debug;
use rand::Rng;

/// Reward per hit, before the gap penalty is subtracted.
pub const HIT_REWARD: f64 = 1500.0;

/// Outcome of a single episode.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct EpisodeOutcome {
    pub fitness: f64,
    pub hits: usize,
    pub penalty: f64,
    pub bounce_substeps: usize,
    /// The program faulted and the episode was cut short
    pub aborted: bool,
}

/// Aggregated result of evaluating one individual over every configured run.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct FitnessReport {
    /// Mean per-run fitness
    pub fitness: f64,
    /// Hits summed over all runs
    pub hits: usize,
    pub aborted_runs: usize,
    pub bounce_substeps: usize,
}

/// Scores programs by letting them drive the robot through fresh episodes.
///
/// The evaluator only borrows configuration. Every call builds its own [`Arena`] and
/// [`VirtualMachine`], so evaluations can run side by side on different threads.
#[derive(Debug, Clone, Copy)]
pub struct FitnessEvaluator<'a> {
    arena: &'a ArenaConfig,
    simulation: &'a SimulationConfig,
}

impl<'a> FitnessEvaluator<'a> {
    pub fn new(arena: &'a ArenaConfig, simulation: &'a SimulationConfig) -> Self {
        Self { arena, simulation }
    }

    /// Mean fitness of `tree` over `runs` independent episodes, each starting from a fresh
    /// random placement drawn from `rng`.
    pub fn evaluate<R: Rng + ?Sized>(&self, tree: &ProgramTree, rng: &mut R) -> FitnessReport {
        let mut arena = Arena::new(self.arena, self.simulation);
        let mut vm = VirtualMachine::new();
        let mut report = FitnessReport::default();
        let mut total = 0.0;

        for _ in 0..self.simulation.runs {
            arena.reset(rng);
            let outcome = self.play_episode(tree.root(), &mut arena, &mut vm, None);
            total += outcome.fitness;
            report.hits += outcome.hits;
            report.bounce_substeps += outcome.bounce_substeps;
            if outcome.aborted {
                report.aborted_runs += 1;
            }
        }

        report.fitness = if self.simulation.runs == 0 {
            0.0
        } else {
            total / self.simulation.runs as f64
        };
        debug!(
            "Evaluated {} ({} nodes): fitness {:.3}, {} hits over {} runs, {} aborted",
            tree,
            tree.node_count(),
            report.fitness,
            report.hits,
            self.simulation.runs,
            report.aborted_runs
        );
        report
    }

    /// Replays one episode from a fresh placement and records where everything went.
    pub fn trace<R: Rng + ?Sized>(
        &self,
        tree: &ProgramTree,
        rng: &mut R,
    ) -> (Trajectory, EpisodeOutcome) {
        let mut arena = Arena::new(self.arena, self.simulation);
        let mut vm = VirtualMachine::new();
        let mut trajectory = Trajectory::new();
        arena.reset(rng);
        let outcome = self.play_episode(tree.root(), &mut arena, &mut vm, Some(&mut trajectory));
        (trajectory, outcome)
    }

    /// Runs the configured number of decision ticks on an already placed arena.
    ///
    /// After every tick a robot within `hit_distance` of the ball scores a hit. The gap since
    /// the previous hit, scaled by the starting distance, is charged as penalty and the ball
    /// is struck along the robot's heading. A faulting program ends the episode with whatever
    /// it had scored so far.
    pub fn play_episode(
        &self,
        root: &Node,
        arena: &mut Arena,
        vm: &mut VirtualMachine,
        mut trajectory: Option<&mut Trajectory>,
    ) -> EpisodeOutcome {
        // Placement puts the actors on distinct integer cells, so this is at least 1
        let initial_distance = arena.distance().max(1.0);
        let mut outcome = EpisodeOutcome::default();
        let mut last_hit = 0;

        if let Some(trajectory) = trajectory.as_deref_mut() {
            trajectory.record(arena);
        }

        for step in 0..self.simulation.steps {
            if let Err(e) = vm.execute(root, arena) {
                debug!("Program faulted at step {}: {}", step, e);
                outcome.aborted = true;
                break;
            }

            if arena.distance() <= self.simulation.hit_distance {
                outcome.hits += 1;
                outcome.penalty += (step - last_hit) as f64 / initial_distance;
                last_hit = step;
                outcome.bounce_substeps += arena.strike_ball();
                if let Some(trajectory) = trajectory.as_deref_mut() {
                    trajectory.record_hit(step);
                }
            }

            if let Some(trajectory) = trajectory.as_deref_mut() {
                trajectory.record(arena);
            }
        }

        outcome.fitness = HIT_REWARD * outcome.hits as f64 - outcome.penalty;
        outcome
    }
}
