//! Error types shared by the search engine, the reasoning nodes and the oracle.

use thiserror::Error;

/// Errors raised while searching the reasoning tree.
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum Error {
    #[error(transparent)]
    Oracle(#[from] OracleError),

    #[error("precondition violated: {0}")]
    Precondition(&'static str),

    #[error("final answer marker found but '{text}' is not a number")]
    MalformedAnswer { text: String },
}

/// The completion could not be produced within the configured attempts.
#[derive(Error, Debug)]
#[error("completion failed after {attempts} attempt(s): {source}")]
pub struct OracleError {
    pub attempts: u32,
    #[source]
    pub source: BackendError,
}

/// A single failed request against a chat backend.
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum BackendError {
    #[error("http request failed: {0}")]
    Http(#[from] ureq::Error),

    #[error("response contained no message content")]
    EmptyResponse,

    #[error("{0}")]
    Other(String),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
