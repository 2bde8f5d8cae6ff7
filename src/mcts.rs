pub mod state;
pub mod tree;

pub use state::State;
pub use tree::Tree;

use crate::error::Error;
use clap::ValueEnum;
use log::{debug, info, warn};
use std::rc::Rc;

pub type Reward = f64;

/// How the final recommendation is picked from the root's children.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum BestChildPolicy {
    /// Highest empirical mean reward
    #[default]
    MeanReward,
    /// Most simulations through the child
    MostVisits,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SearchSettings {
    pub iterations: usize,
    pub exploration_constant: f64,
    /// Random steps a rollout may take before it is scored as a loss. `None` lets a
    /// rollout run until the oracle produces a final answer.
    pub max_rollout_depth: Option<usize>,
    pub policy: BestChildPolicy,
    /// Seed for rollout randomness. Entropy is used when absent.
    pub seed: Option<u64>,
}

impl Default for SearchSettings {
    fn default() -> Self {
        SearchSettings {
            iterations: 4,
            exploration_constant: 2.0_f64.sqrt(),
            max_rollout_depth: Some(8),
            policy: BestChildPolicy::MeanReward,
            seed: None,
        }
    }
}

/// Outcome of a full search run. Kept even when an iteration failed, so whatever
/// statistics were gathered can still be reported.
#[derive(Debug)]
pub struct SearchReport<StateType: State> {
    pub completed_iterations: usize,
    pub best: Option<Rc<StateType>>,
    pub failure: Option<Error>,
    pub tree: Tree<StateType>,
}

impl<StateType: State> SearchReport<StateType> {
    pub fn succeeded(&self) -> bool {
        self.failure.is_none()
    }
}

///
/// Runs `settings.iterations` iterations against `root`, then picks the best child.
///
/// Stops at the first failing iteration. The best child is still chosen from the
/// statistics of the iterations that completed.
///
pub fn calculate_best_child<StateType: State>(
    root: &Rc<StateType>,
    ground_truth: f64,
    settings: &SearchSettings,
) -> SearchReport<StateType> {
    let mut tree = Tree::new(settings.clone());
    let mut completed_iterations = 0;
    let mut failure = None;

    for iteration in 0..settings.iterations {
        debug!("Starting iteration {}", iteration);
        match tree.iterate(root, ground_truth) {
            Ok(reward) => {
                completed_iterations += 1;
                info!(
                    "Iteration {} finished with reward {}",
                    iteration + 1,
                    reward
                );
            }
            Err(err) => {
                warn!(
                    "Iteration {} failed after {} completed: {}",
                    iteration + 1,
                    completed_iterations,
                    err
                );
                failure = Some(err);
                break;
            }
        }
    }

    tree.trace_log_children(root, 0);

    let best = match tree.choose(root) {
        Ok(best) => Some(best),
        Err(err) => {
            warn!("No best child could be chosen: {}", err);
            if failure.is_none() {
                failure = Some(err);
            }
            None
        }
    };

    SearchReport {
        completed_iterations,
        best,
        failure,
        tree,
    }
}
