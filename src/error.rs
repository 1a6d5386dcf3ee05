//! Error type shared by every stage of the recalculation.
//!
//! All variants are fatal for a run: there is no partial-result mode.

use thiserror::Error;

/// Errors that can occur while reading, pruning or scoring trees.
#[derive(Error, Debug)]
pub enum Error {
    /// Malformed Newick text.
    #[error("Malformed tree at position {position}: {message} (near `{snippet}`)")]
    Format {
        message: String,
        position: usize,
        snippet: String,
    },

    /// The caller handed over something the algorithms cannot work with
    /// (empty selection, mismatched leaf sets, no replicates, ...).
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// A leaf or node lookup missed.
    #[error("Not found: {0}")]
    NotFound(String),

    /// A consistency check on already validated data failed.
    #[error("Invariant violated: {0}")]
    InvariantViolation(String),

    /// Any error tied to one record of the bootstrap file.
    #[error("Bootstrap tree no. {index}: {source}")]
    Replicate {
        index: usize,
        #[source]
        source: Box<Error>,
    },

    /// The taxon selection pattern does not compile.
    #[error("Invalid taxon pattern: {0}")]
    Pattern(#[from] regex::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    /// Attach the index of the bootstrap tree this error belongs to.
    pub fn in_replicate(self, index: usize) -> Self {
        Error::Replicate {
            index,
            source: Box::new(self),
        }
    }

    /// Process exit status used by the command line tool.
    pub fn exit_code(&self) -> i32 {
        match self {
            Error::Format { .. } => 2,
            Error::InvalidInput(_) | Error::Pattern(_) => 3,
            Error::Io(_) => 4,
            Error::Replicate { source, .. } => source.exit_code(),
            Error::NotFound(_) | Error::InvariantViolation(_) => 1,
        }
    }
}
