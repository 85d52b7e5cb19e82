use crate::config::GaConfig;
use crate::evolution::tree::{Node, ProgramTree, TreeLimits};
use crate::vm::op::{FunctionKind, TerminalKind};
use log::warn;
use rand::Rng;
use rand::prelude::IndexedRandom;

/// Chance that `grow` stops at a terminal once the minimum depth is reached,
/// i.e. the share of terminals in the vocabulary.
const TERMINAL_RATIO: f64 =
    TerminalKind::ALL.len() as f64 / (TerminalKind::ALL.len() + FunctionKind::ALL.len()) as f64;

/// Which shape a freshly generated tree takes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GrowthMethod {
    /// Every branch reaches exactly the target depth
    Full,
    /// Branches may stop early once past the minimum depth
    Grow,
}

/// Builds random program trees within the run's bounds.
#[derive(Debug, Clone)]
pub struct TreeGenerator<'a> {
    config: &'a GaConfig,
    limits: TreeLimits,
}

fn random_terminal<R: Rng + ?Sized>(rng: &mut R) -> TerminalKind {
    *TerminalKind::ALL
        .choose(rng)
        .unwrap_or(&TerminalKind::MoveForward)
}

fn random_function<R: Rng + ?Sized>(rng: &mut R) -> FunctionKind {
    *FunctionKind::ALL.choose(rng).unwrap_or(&FunctionKind::Seq2)
}

impl<'a> TreeGenerator<'a> {
    pub fn new(config: &'a GaConfig) -> Self {
        Self {
            config,
            limits: TreeLimits::from(config),
        }
    }

    pub fn limits(&self) -> TreeLimits {
        self.limits
    }

    /// Generates a subtree whose leaves sit at depth `height` (`Full`), or at most `height`
    /// with terminals allowed from `min_depth` on (`Grow`).
    pub fn generate<R: Rng + ?Sized>(
        &self,
        rng: &mut R,
        method: GrowthMethod,
        min_depth: usize,
        height: usize,
    ) -> Node {
        self.generate_at(rng, method, min_depth, height, 0)
    }

    fn generate_at<R: Rng + ?Sized>(
        &self,
        rng: &mut R,
        method: GrowthMethod,
        min_depth: usize,
        height: usize,
        depth: usize,
    ) -> Node {
        let leaf = match method {
            GrowthMethod::Full => depth >= height,
            GrowthMethod::Grow => {
                depth >= height || (depth >= min_depth && rng.random_bool(TERMINAL_RATIO))
            }
        };
        if leaf {
            return Node::Terminal(random_terminal(rng));
        }
        let kind = random_function(rng);
        let children = (0..kind.arity())
            .map(|_| self.generate_at(rng, method, min_depth, height, depth + 1))
            .collect();
        Node::Function { kind, children }
    }

    /// One member of a ramped half-and-half population: a fair coin picks `Full` or `Grow`,
    /// the height is drawn from the configured initial range. Trees over the node limit are
    /// thrown away and redrawn; when every attempt fails a lone terminal is used.
    pub fn ramped_half_and_half<R: Rng + ?Sized>(&self, rng: &mut R) -> ProgramTree {
        let min_depth = self.config.init_min_depth;
        let max_depth = self.config.init_max_depth;
        for _ in 0..self.config.max_operator_attempts {
            let method = if rng.random_bool(0.5) {
                GrowthMethod::Full
            } else {
                GrowthMethod::Grow
            };
            let height = rng.random_range(min_depth..=max_depth);
            if let Some(tree) = self.bounded(self.generate(rng, method, min_depth, height)) {
                return tree;
            }
        }
        warn!(
            "Could not generate a tree within {} nodes after {} attempts, using a single terminal",
            self.limits.max_nodes, self.config.max_operator_attempts
        );
        self.fallback(rng)
    }

    /// Fresh subtree for mutation, grown up to the configured mutation depth.
    pub fn mutation_subtree<R: Rng + ?Sized>(&self, rng: &mut R) -> Node {
        let height = rng.random_range(0..=self.config.mutation_max_depth);
        self.generate(rng, GrowthMethod::Grow, 0, height)
    }

    pub fn initial_population<R: Rng + ?Sized>(&self, rng: &mut R, size: usize) -> Vec<ProgramTree> {
        (0..size).map(|_| self.ramped_half_and_half(rng)).collect()
    }

    fn bounded(&self, root: Node) -> Option<ProgramTree> {
        ProgramTree::new(root)
            .ok()
            .filter(|tree| self.limits.admits(tree))
    }

    fn fallback<R: Rng + ?Sized>(&self, rng: &mut R) -> ProgramTree {
        ProgramTree::leaf(random_terminal(rng))
    }
}
