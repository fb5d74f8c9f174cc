//! Scripted collaborators for unit tests.
use crate::pacing::Pacer;
use crate::twitter::error::LikeError;
use crate::twitter::traits::{Liker, PageSource};
use crate::twitter::types::{ConversationPage, Cursor, PostId};
use async_trait::async_trait;
use replyliker_http::{HttpError, StatusCode};
use serde_json::{Value, json};
use std::collections::{HashSet, VecDeque};
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

/// Build a `TweetDetail`-shaped page holding `ids` (one module each) and an
/// optional bottom cursor.
pub fn page(ids: &[&str], cursor: Option<&str>) -> ConversationPage {
    let mut entries: Vec<Value> = ids
        .iter()
        .map(|id| {
            json!({
                "entryId": format!("conversationthread-{id}"),
                "content": {
                    "entryType": "TimelineTimelineModule",
                    "items": [{ "item": { "itemContent": {
                        "itemType": "TimelineTweet",
                        "tweet_results": { "result": { "__typename": "Tweet", "rest_id": id } }
                    }}}]
                }
            })
        })
        .collect();
    if let Some(value) = cursor {
        entries.push(json!({
            "entryId": "cursor-bottom-0",
            "content": {
                "entryType": "TimelineTimelineItem",
                "itemContent": {
                    "itemType": "TimelineTimelineCursor",
                    "value": value,
                    "cursorType": "Bottom"
                }
            }
        }));
    }
    serde_json::from_value(json!({
        "data": { "threaded_conversation_with_injections_v2": {
            "instructions": [{ "type": "TimelineAddEntries", "entries": entries }]
        }}
    }))
    .unwrap()
}

pub fn api_error(status: StatusCode) -> HttpError {
    HttpError::Api {
        status,
        message: "scripted failure".into(),
        request_id: "-".into(),
    }
}

/// Serves pre-scripted responses in order and records the cursors requested.
#[derive(Default)]
pub struct ScriptedSource {
    responses: Mutex<VecDeque<Result<ConversationPage, HttpError>>>,
    pub requests: Mutex<Vec<Option<String>>>,
}

impl ScriptedSource {
    pub fn new(responses: Vec<Result<ConversationPage, HttpError>>) -> Self {
        Self {
            responses: Mutex::new(responses.into()),
            requests: Mutex::new(Vec::new()),
        }
    }

    pub fn requested_cursors(&self) -> Vec<Option<String>> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl PageSource for ScriptedSource {
    async fn fetch_page(
        &self,
        _focal: &PostId,
        cursor: Option<&Cursor>,
    ) -> Result<ConversationPage, HttpError> {
        self.requests
            .lock()
            .unwrap()
            .push(cursor.map(|c| c.as_str().to_string()));
        self.responses
            .lock()
            .unwrap()
            .pop_front()
            .expect("page requested beyond the scripted fixture")
    }
}

/// Counts pauses instead of sleeping.
#[derive(Default)]
pub struct CountingPacer {
    pub pauses: AtomicUsize,
}

impl CountingPacer {
    pub fn count(&self) -> usize {
        self.pauses.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Pacer for CountingPacer {
    async fn pause(&self) {
        self.pauses.fetch_add(1, Ordering::SeqCst);
    }
}

/// Likes everything except the ids listed in `failing`; records call order.
#[derive(Default)]
pub struct RecordingLiker {
    failing: HashSet<String>,
    pub calls: Mutex<Vec<String>>,
}

impl RecordingLiker {
    pub fn failing(ids: &[&str]) -> Self {
        Self {
            failing: ids.iter().map(|s| s.to_string()).collect(),
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl Liker for RecordingLiker {
    async fn like(&self, id: &PostId) -> Result<(), LikeError> {
        self.calls.lock().unwrap().push(id.as_str().to_string());
        if self.failing.contains(id.as_str()) {
            return Err(LikeError::Transport(api_error(StatusCode::FORBIDDEN)));
        }
        Ok(())
    }
}
