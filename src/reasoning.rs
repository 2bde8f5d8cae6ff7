//! Multi-persona reasoning transcripts as search states.
//!
//! Each node is one persona's contribution to a shared transcript. A node whose
//! text carries a `Final answer: <number>` marker ends the conversation.

pub mod node;
pub mod persona;

pub use node::Node;
pub use persona::Persona;

use regex::Regex;
use std::sync::LazyLock;

static FINAL_ANSWER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)final answer:\s*([-+]?\d+(?:\.\d+)?)").expect("Invalid final answer regex")
});

/// The numeral following the first final-answer marker in `text`, if any.
pub fn final_answer(text: &str) -> Option<&str> {
    FINAL_ANSWER
        .captures(text)
        .and_then(|captures| captures.get(1))
        .map(|numeral| numeral.as_str())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_final_answer_is_case_insensitive() {
        assert_eq!(final_answer("so... FINAL ANSWER: 12"), Some("12"));
        assert_eq!(final_answer("final answer:7"), Some("7"));
    }

    #[test]
    fn test_final_answer_accepts_signs_and_decimals() {
        assert_eq!(final_answer("Final answer: -3.25 apples"), Some("-3.25"));
        assert_eq!(final_answer("Final answer: +8"), Some("+8"));
    }

    #[test]
    fn test_final_answer_requires_a_number() {
        assert_eq!(final_answer("Final answer: four"), None);
        assert_eq!(final_answer("The answer is 4"), None);
    }
}
