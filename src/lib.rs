pub mod error;
pub mod mcts;
pub mod oracle;
pub mod problem;
pub mod reasoning;
pub mod report;
