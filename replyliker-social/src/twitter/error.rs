use crate::twitter::types::PostId;
use replyliker_http::{HttpError, StatusCode};
use thiserror::Error;

/// Reply traversal failure. A failed page aborts the whole traversal; the ids
/// gathered up to that point are attached for diagnostics only.
#[derive(Debug, Error)]
pub enum CollectError {
    #[error(
        "fetching page {page} of replies to {focal} failed ({} replies collected before the failure)",
        .collected.len()
    )]
    Fetch {
        focal: PostId,
        page: usize,
        collected: Vec<PostId>,
        #[source]
        source: HttpError,
    },
}

impl CollectError {
    pub fn status(&self) -> Option<StatusCode> {
        match self {
            CollectError::Fetch { source, .. } => source.status(),
        }
    }

    pub fn collected(&self) -> &[PostId] {
        match self {
            CollectError::Fetch { collected, .. } => collected,
        }
    }
}

/// A single like that did not go through.
#[derive(Debug, Error)]
pub enum LikeError {
    #[error(transparent)]
    Transport(#[from] HttpError),
    /// The service answered 2xx but reported GraphQL errors.
    #[error("like rejected: {0}")]
    Rejected(String),
}
