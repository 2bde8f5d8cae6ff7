//! Human-readable summary of a finished (or aborted) run.

use crate::mcts::SearchReport;
use crate::oracle::{Pricing, TokenUsage};
use crate::reasoning::{Node, Persona};
use chrono::{DateTime, Local};
use log::{error, info};

pub struct RunSummary<'a> {
    pub report: &'a SearchReport<Node>,
    pub usage: TokenUsage,
    pub pricing: Option<Pricing>,
    pub started_at: DateTime<Local>,
    pub finished_at: DateTime<Local>,
}

impl RunSummary<'_> {
    pub fn log(&self) {
        let report = self.report;
        if let Some(failure) = &report.failure {
            error!(
                "Run stopped after {} completed iterations: {}",
                report.completed_iterations, failure
            );
        }
        match &report.best {
            Some(best) => {
                info!("Best next node: ");
                info!("{}", best.state());
                info!(
                    "Path: {} (mean reward {:.3} over {} visits)",
                    lineage_label(&best.lineage()),
                    report.tree.mean_reward(best).unwrap_or(0.0),
                    report.tree.visit_count(best)
                );
            }
            None => info!("No best next node could be determined"),
        }
        info!(
            "Completed {} of {} iterations",
            report.completed_iterations,
            report.tree.settings().iterations
        );
        info!("Token usage: {}", self.usage);
        if let Some(pricing) = &self.pricing {
            info!("Estimated cost: {:.4}", self.usage.cost(pricing));
        }
        info!(
            "Started {} and took {:.1}s",
            self.started_at.format("%Y-%m-%d %H:%M:%S"),
            (self.finished_at - self.started_at).num_milliseconds() as f64 / 1000.0
        );
    }
}

/// `Question > Silly > Smart`
pub fn lineage_label(lineage: &[Persona]) -> String {
    lineage
        .iter()
        .map(|persona| persona.to_string())
        .collect::<Vec<_>>()
        .join(" > ")
}
