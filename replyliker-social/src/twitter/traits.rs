use crate::twitter::error::LikeError;
use crate::twitter::types::{ConversationPage, Cursor, PostId};
use async_trait::async_trait;
use replyliker_http::HttpError;

/// Fetches one page of the conversation below a focal post.
#[async_trait]
pub trait PageSource: Send + Sync {
    /// `cursor` is `None` for the first page. Non-success responses must come
    /// back as an error carrying the status code.
    async fn fetch_page(
        &self,
        focal: &PostId,
        cursor: Option<&Cursor>,
    ) -> Result<ConversationPage, HttpError>;
}

/// Performs one remote "like".
#[async_trait]
pub trait Liker: Send + Sync {
    async fn like(&self, id: &PostId) -> Result<(), LikeError>;
}
