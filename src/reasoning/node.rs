use super::final_answer;
use super::persona::Persona;
use crate::error::{Error, Result};
use crate::mcts::{Reward, State};
use crate::oracle::Oracle;
use log::{debug, info};
use rand::seq::SliceRandom;
use rand::Rng;
use std::cell::OnceCell;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::rc::{Rc, Weak};
use std::sync::atomic::{AtomicU64, Ordering};

static NEXT_NODE_ID: AtomicU64 = AtomicU64::new(0);

///
/// One step of the conversation: the transcript so far plus what this node's
/// persona said next.
///
/// Everything but the children cache is fixed at construction. Nodes compare
/// and hash by identity.
///
pub struct Node {
    id: u64,
    persona: Persona,
    previous_state: String,
    output: String,
    state: String,
    parent: Weak<Node>,
    oracle: Rc<Oracle>,
    children: OnceCell<Vec<Rc<Node>>>,
}

impl Node {
    /// The root of a search: the problem statement, with no oracle call.
    pub fn root(question: impl Into<String>, oracle: Rc<Oracle>) -> Rc<Node> {
        let question = question.into();
        Rc::new(Node {
            id: NEXT_NODE_ID.fetch_add(1, Ordering::Relaxed),
            persona: Persona::Question,
            previous_state: question.clone(),
            output: question.clone(),
            state: question,
            parent: Weak::new(),
            oracle,
            children: OnceCell::new(),
        })
    }

    ///
    /// Asks the oracle for `persona`'s next step after `parent`'s transcript.
    ///
    pub fn contribute(parent: &Rc<Node>, persona: Persona) -> Result<Rc<Node>> {
        let previous_state = parent.state.clone();
        let prompt = format!("{}\n{}", previous_state, persona.tag());
        let output = parent.oracle.get_completion(&prompt)?;
        debug!("{} contributed: {}", persona, output);
        let state = format!("{}{}", prompt, output);
        Ok(Rc::new(Node {
            id: NEXT_NODE_ID.fetch_add(1, Ordering::Relaxed),
            persona,
            previous_state,
            output,
            state,
            parent: Rc::downgrade(parent),
            oracle: parent.oracle.clone(),
            children: OnceCell::new(),
        }))
    }

    pub fn persona(&self) -> Persona {
        self.persona
    }

    /// Transcript this node was generated from.
    pub fn previous_state(&self) -> &str {
        &self.previous_state
    }

    /// What this node's persona said.
    pub fn output(&self) -> &str {
        &self.output
    }

    /// Full transcript up to and including this node's contribution.
    pub fn state(&self) -> &str {
        &self.state
    }

    /// Personas from the root down to this node.
    pub fn lineage(&self) -> Vec<Persona> {
        let mut lineage = vec![self.persona];
        let mut cur_node = self.parent.upgrade();
        while let Some(node) = cur_node {
            lineage.push(node.persona);
            cur_node = node.parent.upgrade();
        }
        lineage.reverse();
        lineage
    }

    /// The final answer this node states, if it states one.
    pub fn answer(&self) -> Option<&str> {
        final_answer(&self.output)
    }
}

impl State for Node {
    fn find_children(self: &Rc<Self>) -> Result<Vec<Rc<Self>>> {
        if let Some(children) = self.children.get() {
            return Ok(children.clone());
        }
        let children = Persona::CONTRIBUTORS
            .iter()
            .map(|persona| Node::contribute(self, *persona))
            .collect::<Result<Vec<_>>>()?;
        Ok(self.children.get_or_init(|| children).clone())
    }

    fn find_random_child<R: Rng + ?Sized>(self: &Rc<Self>, rng: &mut R) -> Result<Rc<Self>> {
        let persona = *Persona::CONTRIBUTORS
            .choose(rng)
            .ok_or(Error::Precondition("no contributing personas"))?;
        Node::contribute(self, persona)
    }

    fn terminal(&self) -> bool {
        self.answer().is_some()
    }

    fn reward(&self, ground_truth: f64) -> Result<Reward> {
        let answer = self
            .answer()
            .ok_or(Error::Precondition("reward called on a non-terminal node"))?;
        let prediction: f64 = answer.parse().map_err(|_| Error::MalformedAnswer {
            text: answer.to_string(),
        })?;
        info!("Solving path: {}", self.state);
        if prediction == ground_truth {
            Ok(1.0)
        } else {
            Ok(0.0)
        }
    }

    fn parent(&self) -> Option<Rc<Self>> {
        self.parent.upgrade()
    }
}

impl PartialEq for Node {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for Node {}

impl Hash for Node {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

impl fmt::Debug for Node {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Node")
            .field("id", &self.id)
            .field("persona", &self.persona)
            .field("output", &self.output)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::oracle::RetryPolicy;
    use crate::test::scripted_backend::ScriptedBackend;
    use rand::rngs::StdRng;
    use rand::SeedableRng;
    use std::time::Duration;

    fn oracle(backend: ScriptedBackend) -> Rc<Oracle> {
        Rc::new(Oracle::new(
            backend,
            RetryPolicy {
                max_retries: 1,
                retry_delay: Duration::ZERO,
            },
        ))
    }

    /// Each persona answers with its own line; Smart always finishes.
    fn persona_backend() -> ScriptedBackend {
        ScriptedBackend::new(|prompt| {
            Ok(if prompt.ends_with(Persona::Smart.tag()) {
                "Final answer: 4".to_string()
            } else if prompt.ends_with(Persona::Funny.tag()) {
                "Two pairs walk into a bar.".to_string()
            } else {
                "Is it a fish?".to_string()
            })
        })
    }

    #[test]
    fn test_root_makes_no_oracle_call() {
        let backend = persona_backend();
        let calls = backend.calls();
        let root = Node::root("What is 2+2?", oracle(backend));

        assert_eq!(root.state(), "What is 2+2?");
        assert_eq!(root.output(), "What is 2+2?");
        assert_eq!(root.persona(), Persona::Question);
        assert!(root.parent().is_none());
        assert_eq!(calls.get(), 0);
    }

    #[test]
    fn test_children_are_one_per_persona_and_cached() {
        let backend = persona_backend();
        let calls = backend.calls();
        let root = Node::root("What is 2+2?", oracle(backend));

        let children = root.find_children().unwrap();
        let personas: Vec<Persona> = children.iter().map(|child| child.persona()).collect();
        assert_eq!(personas, Persona::CONTRIBUTORS.to_vec());
        assert_eq!(calls.get(), 3);

        assert_eq!(root.find_children().unwrap(), children);
        assert_eq!(calls.get(), 3);
    }

    #[test]
    fn test_child_transcript_extends_parent_state() {
        let root = Node::root("What is 2+2?", oracle(persona_backend()));
        let children = root.find_children().unwrap();
        let smart = &children[2];

        assert_eq!(smart.previous_state(), root.state());
        assert_eq!(smart.state(), "What is 2+2?\nSmart Man: Final answer: 4");
        assert_eq!(smart.parent(), Some(root.clone()));
        assert_eq!(smart.lineage(), vec![Persona::Question, Persona::Smart]);

        let grandchild = children[0].find_children().unwrap()[1].clone();
        assert_eq!(
            grandchild.state(),
            "What is 2+2?\nSilly Man: Is it a fish?\nFunny Man: Two pairs walk into a bar."
        );
    }

    #[test]
    fn test_failed_expansion_caches_nothing() {
        let backend = ScriptedBackend::new(|prompt| {
            if prompt.ends_with(Persona::Funny.tag()) {
                Err(crate::error::BackendError::Other("overloaded".to_string()))
            } else {
                Ok("thinking".to_string())
            }
        });
        let calls = backend.calls();
        let root = Node::root("What is 2+2?", oracle(backend));

        assert!(matches!(root.find_children(), Err(Error::Oracle(_))));
        assert!(root.children.get().is_none());
        assert_eq!(calls.get(), 2);
    }

    #[test]
    fn test_random_child_bypasses_cache() {
        let backend = persona_backend();
        let calls = backend.calls();
        let root = Node::root("What is 2+2?", oracle(backend));
        let mut rng = StdRng::seed_from_u64(3);

        let child = root.find_random_child(&mut rng).unwrap();
        assert!(Persona::CONTRIBUTORS.contains(&child.persona()));
        assert_eq!(child.parent(), Some(root.clone()));
        assert!(root.children.get().is_none());
        assert_eq!(calls.get(), 1);
    }

    #[test]
    fn test_terminal_detection_is_stable_and_free() {
        let backend = persona_backend();
        let calls = backend.calls();
        let root = Node::root("What is 2+2?", oracle(backend));
        let children = root.find_children().unwrap();

        for child in &children {
            assert_eq!(child.terminal(), child.terminal());
        }
        assert!(!children[0].terminal());
        assert!(!children[1].terminal());
        assert!(children[2].terminal());
        assert_eq!(calls.get(), 3);
    }

    fn answered(answer: &'static str) -> Rc<Node> {
        let root = Node::root(
            "q",
            oracle(ScriptedBackend::new(move |_| Ok(answer.to_string()))),
        );
        Node::contribute(&root, Persona::Smart).unwrap()
    }

    #[test]
    fn test_reward_exact_match() {
        assert_eq!(answered("Final answer: 5").reward(5.0).unwrap(), 1.0);
        assert_eq!(answered("final ANSWER: 5.0").reward(5.0).unwrap(), 1.0);
        assert_eq!(answered("Final answer: 5.2").reward(5.0).unwrap(), 0.0);
        assert_eq!(answered("Final answer: -5").reward(5.0).unwrap(), 0.0);
    }

    #[test]
    fn test_reward_on_non_terminal_node_fails() {
        let node = answered("Let's count on our fingers.");
        assert!(matches!(node.reward(5.0), Err(Error::Precondition(_))));
    }

    #[test]
    fn test_question_with_answer_marker_is_terminal() {
        let root = Node::root("Final answer: 3", oracle(persona_backend()));
        assert!(root.terminal());
        assert_eq!(root.reward(3.0).unwrap(), 1.0);
    }
}
