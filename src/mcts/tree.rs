use super::state::State;
use super::{BestChildPolicy, Reward, SearchSettings};
use crate::error::{Error, Result};
use log::{debug, trace, warn};
use rand::rngs::StdRng;
use rand::SeedableRng;
use std::collections::{HashMap, HashSet};
use std::rc::Rc;

///
/// Search statistics for one run over one root.
///
/// Nodes are never mutated by the tree: visit counts, rewards and the realized
/// children all live here, keyed by node identity.
///
#[derive(Debug)]
pub struct Tree<StateType: State> {
    settings: SearchSettings,
    visit_count: HashMap<Rc<StateType>, u32>,
    total_reward: HashMap<Rc<StateType>, f64>,
    children: HashMap<Rc<StateType>, Vec<Rc<StateType>>>,
    explored: HashSet<Rc<StateType>>,
    rng: StdRng,
}

impl<StateType: State> Tree<StateType> {
    pub fn new(settings: SearchSettings) -> Tree<StateType> {
        let rng = match settings.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        Tree {
            settings,
            visit_count: HashMap::new(),
            total_reward: HashMap::new(),
            children: HashMap::new(),
            explored: HashSet::new(),
            rng,
        }
    }

    pub fn settings(&self) -> &SearchSettings {
        &self.settings
    }

    pub fn visit_count(&self, node: &Rc<StateType>) -> u32 {
        self.visit_count.get(node).copied().unwrap_or(0)
    }

    pub fn total_reward(&self, node: &Rc<StateType>) -> f64 {
        self.total_reward.get(node).copied().unwrap_or(0.0)
    }

    /// Running mean reward, `None` until a simulation has passed through the node.
    pub fn mean_reward(&self, node: &Rc<StateType>) -> Option<f64> {
        match self.visit_count(node) {
            0 => None,
            visits => Some(self.total_reward(node) / visits as f64),
        }
    }

    /// Children the tree has attached to `node`, in the order they were produced.
    pub fn children_of(&self, node: &Rc<StateType>) -> &[Rc<StateType>] {
        self.children.get(node).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn is_explored(&self, node: &Rc<StateType>) -> bool {
        self.explored.contains(node)
    }

    ///
    /// One select, expand, simulate and backpropagate cycle.
    ///
    /// Returns the reward of the simulation. An oracle failure aborts the iteration
    /// before any statistics are touched.
    ///
    pub fn iterate(&mut self, root: &Rc<StateType>, ground_truth: f64) -> Result<Reward> {
        let leaf = self.selection(root);
        self.expansion(&leaf)?;
        let reward = self.play_out(&leaf, ground_truth)?;
        self.propagate_reward(root, &leaf, reward);
        Ok(reward)
    }

    ///
    /// Descends from `root` while the current node is explored and not terminal.
    ///
    pub fn selection(&self, root: &Rc<StateType>) -> Rc<StateType> {
        let mut node = root.clone();
        loop {
            if !self.is_explored(&node) || node.terminal() {
                return node;
            }
            match self.uct_select(&node) {
                Some(child) => node = child,
                None => {
                    warn!("Explored node has no children: {:?}", node);
                    return node;
                }
            }
        }
    }

    ///
    /// The realized child of `node` with the highest UCB score. Unvisited children
    /// score infinity; ties go to the first child seen.
    ///
    pub fn uct_select(&self, node: &Rc<StateType>) -> Option<Rc<StateType>> {
        let parent_visits = self.visit_count(node) as f64;
        let mut best: Option<(&Rc<StateType>, f64)> = None;
        for child in self.children_of(node) {
            let ucb = self.ucb(parent_visits, child);
            if best.map_or(true, |(_, best_ucb)| ucb > best_ucb) {
                best = Some((child, ucb));
            }
        }
        debug!("UCB pick: {:?}", best);
        best.map(|(child, _)| child.clone())
    }

    fn ucb(&self, parent_visits: f64, child: &Rc<StateType>) -> f64 {
        let visit_count = self.visit_count(child) as f64;
        if visit_count == 0.0 {
            return f64::INFINITY;
        }
        let q: f64 = self.total_reward(child) / visit_count;
        let u: f64 = (parent_visits.ln() / visit_count).sqrt();
        let constant = self.settings.exploration_constant;
        let ucb = q + constant * u;
        trace!(
            "UCB node: {:?}, total_reward: {}, visit_count: {}, parent_visits: {}, q: {}, u: {}, c: {} ucb: {}",
            child,
            self.total_reward(child),
            visit_count,
            parent_visits,
            q,
            u,
            constant,
            ucb
        );
        ucb
    }

    ///
    /// Materializes every child of `node` unless it is terminal or already explored.
    ///
    pub fn expansion(&mut self, node: &Rc<StateType>) -> Result<()> {
        if node.terminal() || self.is_explored(node) {
            return Ok(());
        }
        let children = node.find_children()?;
        trace!("Expanded {:?} into {} children", node, children.len());
        self.children.insert(node.clone(), children);
        self.explored.insert(node.clone());
        Ok(())
    }

    ///
    /// Random descent from `node` to a terminal node, scored against `ground_truth`.
    ///
    /// When the configured depth is exhausted first the rollout scores 0.
    ///
    pub fn play_out(&mut self, node: &Rc<StateType>, ground_truth: f64) -> Result<Reward> {
        let mut cur_node = node.clone();
        let mut depth = 0;
        while !cur_node.terminal() {
            if let Some(max_depth) = self.settings.max_rollout_depth {
                if depth >= max_depth {
                    warn!(
                        "Rollout stopped after {} steps without a final answer",
                        depth
                    );
                    return Ok(0.0);
                }
            }
            cur_node = cur_node.find_random_child(&mut self.rng)?;
            depth += 1;
        }
        let reward = cur_node.reward(ground_truth)?;
        trace!("Reward is {:?} after {} rollout steps", reward, depth);
        Ok(reward)
    }

    ///
    /// Adds one visit and `reward` to `leaf` and every ancestor up to `root`.
    ///
    pub fn propagate_reward(&mut self, root: &Rc<StateType>, leaf: &Rc<StateType>, reward: Reward) {
        let mut cur_node = leaf.clone();
        loop {
            *self.visit_count.entry(cur_node.clone()).or_insert(0) += 1;
            *self.total_reward.entry(cur_node.clone()).or_insert(0.0) += reward;
            if &cur_node == root {
                break;
            }
            match cur_node.parent() {
                Some(parent) => cur_node = parent,
                None => {
                    warn!("Reached a parentless node before the root while propagating");
                    break;
                }
            }
        }
    }

    ///
    /// The best realized child of `root` under the configured policy.
    ///
    /// Children nobody has visited are never picked while a visited one exists.
    /// A root without realized children yields a fresh random child.
    ///
    pub fn choose(&mut self, root: &Rc<StateType>) -> Result<Rc<StateType>> {
        if root.terminal() {
            return Err(Error::Precondition("choose called on a terminal node"));
        }
        if self.children_of(root).is_empty() {
            debug!("Root has no realized children; picking a random one");
            return root.find_random_child(&mut self.rng);
        }
        let policy = self.settings.policy;
        let mut best: Option<(&Rc<StateType>, f64)> = None;
        for child in self.children_of(root) {
            let score = match (policy, self.visit_count(child)) {
                (_, 0) => f64::NEG_INFINITY,
                (BestChildPolicy::MeanReward, visits) => self.total_reward(child) / visits as f64,
                (BestChildPolicy::MostVisits, visits) => visits as f64,
            };
            if best.map_or(true, |(_, best_score)| score > best_score) {
                best = Some((child, score));
            }
        }
        debug!("Chose {:?}", best);
        best.map(|(child, _)| child.clone())
            .ok_or(Error::Precondition("root has no children to choose from"))
    }

    pub fn trace_log_children(&self, node: &Rc<StateType>, level: usize) {
        if !log::log_enabled!(log::Level::Trace) {
            return;
        }
        for child in self.children_of(node) {
            trace!("{} {:?}", "         |-".repeat(level), child);
            trace!(
                "{} {:.6} {}",
                "         | ".repeat(level),
                self.total_reward(child),
                self.visit_count(child)
            );
            if let Some(mean) = self.mean_reward(child) {
                trace!("{} {:.6}", "         | ".repeat(level), mean);
            }
            self.trace_log_children(child, level + 1);
        }
    }
}
