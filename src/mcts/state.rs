use super::Reward;
use crate::error::Result;
use rand::Rng;
use std::fmt::Debug;
use std::hash::Hash;
use std::rc::Rc;

///
/// What the search engine needs from a node in the tree.
///
/// Nodes are shared through `Rc` and compared by identity (`Eq` + `Hash`), so the
/// engine can keep its statistics keyed by node without the node knowing about them.
///
pub trait State: Debug + Eq + Hash + Sized {
    /// All successors of this node. Computed once and cached by the node; a failure
    /// leaves nothing cached.
    fn find_children(self: &Rc<Self>) -> Result<Vec<Rc<Self>>>;

    /// A single random successor, used by rollouts. Does not touch the cached children.
    fn find_random_child<R: Rng + ?Sized>(self: &Rc<Self>, rng: &mut R) -> Result<Rc<Self>>;

    fn terminal(&self) -> bool;

    /// Only valid on terminal nodes.
    fn reward(&self, ground_truth: f64) -> Result<Reward>;

    /// Non-owning back-link; `None` for the root.
    fn parent(&self) -> Option<Rc<Self>>;
}
