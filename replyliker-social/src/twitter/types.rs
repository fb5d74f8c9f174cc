use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::Value;
use std::collections::HashSet;
use std::fmt;

/// Opaque post identifier (`rest_id`). Compared by exact string equality.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PostId(pub String);

impl PostId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for PostId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for PostId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl From<String> for PostId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

/// Opaque continuation token returned by a bottom cursor entry.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Cursor(pub String);

impl Cursor {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// First 20 characters, enough to tell cursors apart in logs.
    pub fn preview(&self) -> &str {
        match self.0.char_indices().nth(20) {
            Some((idx, _)) => &self.0[..idx],
            None => &self.0,
        }
    }
}

/// Unique reply ids in first-seen order.
///
/// Only the collector inside this crate grows a set; callers get it read-only.
///
/// ```
/// use replyliker_social::twitter::{PostId, ReplySet};
///
/// let set: ReplySet = ["1", "2", "1"].into_iter().map(PostId::from).collect();
/// assert_eq!(set.len(), 2);
/// assert_eq!(set.iter().map(PostId::as_str).collect::<Vec<_>>(), ["1", "2"]);
/// ```
#[derive(Debug, Clone, Default)]
pub struct ReplySet {
    ids: Vec<PostId>,
    seen: HashSet<PostId>,
}

impl ReplySet {
    /// Append `id` unless already present; returns whether it was new.
    pub(crate) fn insert(&mut self, id: PostId) -> bool {
        if self.seen.contains(&id) {
            return false;
        }
        self.seen.insert(id.clone());
        self.ids.push(id);
        true
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    pub fn contains(&self, id: &PostId) -> bool {
        self.seen.contains(id)
    }

    pub fn iter(&self) -> std::slice::Iter<'_, PostId> {
        self.ids.iter()
    }

    pub fn as_slice(&self) -> &[PostId] {
        &self.ids
    }

    pub fn into_vec(self) -> Vec<PostId> {
        self.ids
    }
}

impl FromIterator<PostId> for ReplySet {
    fn from_iter<I: IntoIterator<Item = PostId>>(iter: I) -> Self {
        let mut set = ReplySet::default();
        for id in iter {
            set.insert(id);
        }
        set
    }
}

impl<'a> IntoIterator for &'a ReplySet {
    type Item = &'a PostId;
    type IntoIter = std::slice::Iter<'a, PostId>;

    fn into_iter(self) -> Self::IntoIter {
        self.ids.iter()
    }
}

impl Serialize for ReplySet {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_seq(&self.ids)
    }
}

// ==============================
// TweetDetail response model
// ==============================
//
// The web API's object graph is deep and shifts without notice. Every field is
// optional and sub-objects that fail to decode are treated as absent, so a
// page only fails to decode when the body is not a JSON object at all.

/// One decoded `TweetDetail` response.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ConversationPage {
    #[serde(default, deserialize_with = "lenient")]
    pub data: Option<ConversationData>,
    /// GraphQL errors reported alongside (or instead of) data.
    #[serde(default, deserialize_with = "lenient_vec")]
    pub errors: Vec<GraphqlError>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ConversationData {
    #[serde(default, deserialize_with = "lenient")]
    pub threaded_conversation_with_injections_v2: Option<ThreadedConversation>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ThreadedConversation {
    #[serde(default, deserialize_with = "lenient_vec")]
    pub instructions: Vec<Instruction>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type")]
pub enum Instruction {
    TimelineAddEntries {
        #[serde(default, deserialize_with = "lenient_vec")]
        entries: Vec<TimelineEntry>,
    },
    #[serde(other)]
    Other,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct TimelineEntry {
    #[serde(rename = "entryId", default)]
    pub entry_id: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    pub content: Option<EntryContent>,
}

/// Entry payload, discriminated by `entryType`.
///
/// Any entry other than a module may carry an `itemContent`, so unknown entry
/// types keep theirs instead of being discarded.
#[derive(Debug, Clone, Deserialize)]
#[serde(from = "RawEntryContent")]
pub enum EntryContent {
    /// A conversation module; replies live in its items.
    Module { items: Vec<ModuleItem> },
    /// A single item: the focal tweet, or a cursor marker.
    Item { item_content: Option<ItemContent> },
    Other {
        entry_type: Option<String>,
        item_content: Option<ItemContent>,
    },
}

impl EntryContent {
    /// `itemContent` of a non-module entry.
    pub fn item_content(&self) -> Option<&ItemContent> {
        match self {
            Self::Module { .. } => None,
            Self::Item { item_content } | Self::Other { item_content, .. } => {
                item_content.as_ref()
            }
        }
    }
}

#[derive(Deserialize)]
struct RawEntryContent {
    #[serde(rename = "entryType", default)]
    entry_type: Option<String>,
    #[serde(default, deserialize_with = "lenient_vec")]
    items: Vec<ModuleItem>,
    #[serde(rename = "itemContent", default, deserialize_with = "lenient")]
    item_content: Option<ItemContent>,
}

impl From<RawEntryContent> for EntryContent {
    fn from(raw: RawEntryContent) -> Self {
        match raw.entry_type.as_deref() {
            Some("TimelineTimelineModule") => Self::Module { items: raw.items },
            Some("TimelineTimelineItem") => Self::Item {
                item_content: raw.item_content,
            },
            _ => Self::Other {
                entry_type: raw.entry_type,
                item_content: raw.item_content,
            },
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ModuleItem {
    #[serde(rename = "entryId", default)]
    pub entry_id: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    pub item: Option<ModuleItemBody>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ModuleItemBody {
    #[serde(rename = "itemContent", default, deserialize_with = "lenient")]
    pub item_content: Option<ItemContent>,
}

/// `itemContent` of either a tweet (`TimelineTweet`) or a cursor
/// (`TimelineTimelineCursor`). Fields of both shapes are optional so the
/// accessors decide what the item holds.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ItemContent {
    #[serde(rename = "itemType", default)]
    pub item_type: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    pub tweet_results: Option<TweetResults>,
    #[serde(rename = "cursorType", default)]
    pub cursor_type: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    pub value: Option<String>,
}

impl ItemContent {
    /// Identifier of the tweet carried by this item, if any.
    pub fn tweet_id(&self) -> Option<PostId> {
        self.tweet_results
            .as_ref()?
            .result
            .as_ref()?
            .rest_id()
            .map(PostId::from)
    }

    /// Continuation token when this item is a non-empty bottom cursor.
    pub fn bottom_cursor(&self) -> Option<Cursor> {
        if self.cursor_type.as_deref() != Some("Bottom") {
            return None;
        }
        self.value
            .as_deref()
            .filter(|v| !v.is_empty())
            .map(Cursor::new)
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct TweetResults {
    #[serde(default, deserialize_with = "lenient")]
    pub result: Option<TweetResult>,
}

/// A `Tweet`, or a `TweetWithVisibilityResults` wrapper holding one in `tweet`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TweetResult {
    #[serde(rename = "__typename", default)]
    pub typename: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    pub rest_id: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    pub tweet: Option<Box<TweetResult>>,
}

impl TweetResult {
    pub fn rest_id(&self) -> Option<&str> {
        match self.rest_id.as_deref().filter(|id| !id.is_empty()) {
            Some(id) => Some(id),
            None => self.tweet.as_ref()?.rest_id(),
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct GraphqlError {
    #[serde(default)]
    pub message: String,
    #[serde(default)]
    pub code: Option<i64>,
}

// ==============================
// FavoriteTweet response model
// ==============================

/// `{"data":{"favorite_tweet":"Done"}}` on success; `errors` otherwise.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct FavoriteResponse {
    #[serde(default, deserialize_with = "lenient")]
    pub data: Option<FavoriteData>,
    #[serde(default, deserialize_with = "lenient_vec")]
    pub errors: Vec<GraphqlError>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct FavoriteData {
    #[serde(default, deserialize_with = "lenient")]
    pub favorite_tweet: Option<String>,
}

/// Decode a field, turning anything malformed into `None`.
fn lenient<'de, D, T>(d: D) -> Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned,
{
    let raw = Option::<Value>::deserialize(d)?;
    Ok(raw.and_then(|v| serde_json::from_value(v).ok()))
}

/// Decode an array field, dropping elements that do not decode.
fn lenient_vec<'de, D, T>(d: D) -> Result<Vec<T>, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned,
{
    match Option::<Value>::deserialize(d)? {
        Some(Value::Array(items)) => Ok(items
            .into_iter()
            .filter_map(|v| serde_json::from_value(v).ok())
            .collect()),
        _ => Ok(Vec::new()),
    }
}
