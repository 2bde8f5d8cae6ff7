use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// A question together with the number that answers it.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Problem {
    pub question: String,
    pub ground_truth: f64,
}

#[derive(Error, Debug)]
pub enum ProblemError {
    #[error("failed to read {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse problem: {0}")]
    Json(#[from] serde_json::Error),
}

impl Problem {
    pub fn load(path: impl AsRef<Path>) -> Result<Problem, ProblemError> {
        let path = path.as_ref();
        let contents = fs::read_to_string(path).map_err(|source| ProblemError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Problem::from_json(&contents)
    }

    pub fn from_json(json: &str) -> Result<Problem, ProblemError> {
        Ok(serde_json::from_str(json)?)
    }
}
