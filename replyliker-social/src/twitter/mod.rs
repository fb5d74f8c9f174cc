//! X (Twitter) web API integration.
//!
//! - [`types`]: identifiers, the `TweetDetail` response model and [`ReplySet`]
//! - [`extract`]: pure `page -> (ids, cursor)` extraction
//! - [`traits`]: the page-fetch and like capabilities
//! - [`client`]: [`XWebApi`], the authenticated implementation of both
//! - [`collector`] / [`dispatcher`]: the reply traversal and the bulk like pass
pub mod client;
pub mod collector;
pub mod dispatcher;
pub mod error;
pub mod extract;
pub mod traits;
pub mod types;

pub use client::XWebApi;
pub use collector::ReplyCollector;
pub use dispatcher::{DispatchReport, LikeDispatcher};
pub use error::{CollectError, LikeError};
pub use traits::{Liker, PageSource};
pub use types::{Cursor, PostId, ReplySet};

#[cfg(test)]
pub(crate) mod testing;
