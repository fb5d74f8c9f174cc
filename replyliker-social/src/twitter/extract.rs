//! Pure extraction of reply ids and the continuation cursor from a page.
use crate::twitter::types::{ConversationPage, Cursor, EntryContent, Instruction, PostId};

/// What one page contributes to the traversal.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PageSummary {
    /// Ids found in conversation modules, in page order (may repeat).
    pub ids: Vec<PostId>,
    /// Bottom cursor; `None` means this is the last page.
    pub cursor: Option<Cursor>,
}

/// Walk every `TimelineAddEntries` instruction of `page`.
///
/// Reply ids come only from module entries; the focal tweet itself arrives as
/// a plain item and is not reported here. A bottom cursor counts on any
/// non-module entry, whatever its `entryType`, and when more than one is
/// present the last one wins. Missing fields never fail, they just
/// contribute nothing.
pub fn summarize(page: &ConversationPage) -> PageSummary {
    let mut summary = PageSummary::default();

    let instructions = page
        .data
        .as_ref()
        .and_then(|d| d.threaded_conversation_with_injections_v2.as_ref())
        .map(|c| c.instructions.as_slice())
        .unwrap_or_default();

    for instruction in instructions {
        let Instruction::TimelineAddEntries { entries } = instruction else {
            continue;
        };
        for entry in entries {
            let Some(content) = &entry.content else {
                continue;
            };
            if let EntryContent::Module { items } = content {
                summary.ids.extend(
                    items
                        .iter()
                        .filter_map(|i| i.item.as_ref()?.item_content.as_ref()?.tweet_id()),
                );
            } else if let Some(cursor) = content.item_content().and_then(|c| c.bottom_cursor()) {
                summary.cursor = Some(cursor);
            }
        }
    }

    summary
}
