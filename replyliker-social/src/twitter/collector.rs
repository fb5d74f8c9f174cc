//! Cursor-driven traversal of every reply below a focal post.
//!
//! One page is in flight at a time, and consecutive requests are separated by
//! the pacer. The loop stops on the first page without a bottom cursor. A
//! failed fetch aborts the traversal with [`CollectError::Fetch`]; a partial
//! set is never returned as success.
use crate::pacing::Pacer;
use crate::twitter::error::CollectError;
use crate::twitter::extract::{PageSummary, summarize};
use crate::twitter::traits::PageSource;
use crate::twitter::types::{Cursor, PostId, ReplySet};
use std::sync::Arc;

pub struct ReplyCollector {
    source: Arc<dyn PageSource>,
    pacer: Arc<dyn Pacer>,
}

impl ReplyCollector {
    pub fn new(source: Arc<dyn PageSource>, pacer: Arc<dyn Pacer>) -> Self {
        Self { source, pacer }
    }

    /// Gather the unique reply ids of `focal`, in first-seen order, never
    /// including `focal` itself.
    pub async fn collect(&self, focal: &PostId) -> Result<ReplySet, CollectError> {
        let mut replies = ReplySet::default();
        let mut cursor: Option<Cursor> = None;
        let mut more = true;
        let mut page = 0usize;

        tracing::info!(focal = %focal, "collect.start");

        while more {
            page += 1;
            tracing::debug!(
                page,
                cursor = cursor.as_ref().map(Cursor::preview).unwrap_or("(initial)"),
                "collect.page.request"
            );

            let fetched = match self.source.fetch_page(focal, cursor.as_ref()).await {
                Ok(fetched) => fetched,
                Err(source) => {
                    tracing::warn!(
                        page,
                        status = ?source.status(),
                        collected = replies.len(),
                        error = %source,
                        "collect.page.failed"
                    );
                    return Err(CollectError::Fetch {
                        focal: focal.clone(),
                        page,
                        collected: replies.into_vec(),
                        source,
                    });
                }
            };

            let PageSummary { ids, cursor: next } = summarize(&fetched);
            let seen = ids.len();
            let mut added = 0usize;
            for id in ids {
                if id != *focal && replies.insert(id) {
                    added += 1;
                }
            }

            more = next.is_some();
            if let Some(next) = next {
                cursor = Some(next);
            }

            tracing::debug!(
                page,
                seen,
                added,
                total = replies.len(),
                has_more = more,
                "collect.page.done"
            );

            if more {
                self.pacer.pause().await;
            }
        }

        tracing::info!(focal = %focal, pages = page, replies = replies.len(), "collect.done");
        Ok(replies)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::twitter::testing::{CountingPacer, ScriptedSource, api_error, page};
    use replyliker_http::{HttpError, StatusCode};

    fn collector(source: &Arc<ScriptedSource>, pacer: &Arc<CountingPacer>) -> ReplyCollector {
        ReplyCollector::new(source.clone(), pacer.clone())
    }

    fn as_strs(set: &ReplySet) -> Vec<&str> {
        set.iter().map(PostId::as_str).collect()
    }

    #[tokio::test]
    async fn two_pages_collapse_duplicates_in_order() {
        let source = Arc::new(ScriptedSource::new(vec![
            Ok(page(&["A", "B"], Some("X"))),
            Ok(page(&["B", "C"], None)),
        ]));
        let pacer = Arc::new(CountingPacer::default());

        let replies = collector(&source, &pacer)
            .collect(&PostId::from("F"))
            .await
            .unwrap();

        assert_eq!(as_strs(&replies), ["A", "B", "C"]);
        assert_eq!(source.requested_cursors(), [None, Some("X".to_string())]);
        assert_eq!(pacer.count(), 1);
    }

    #[tokio::test]
    async fn transport_failure_aborts_the_run() {
        let source = Arc::new(ScriptedSource::new(vec![
            Ok(page(&["A", "B"], Some("X"))),
            Err(api_error(StatusCode::TOO_MANY_REQUESTS)),
        ]));
        let pacer = Arc::new(CountingPacer::default());

        let err = collector(&source, &pacer)
            .collect(&PostId::from("F"))
            .await
            .unwrap_err();

        assert_eq!(err.status(), Some(StatusCode::TOO_MANY_REQUESTS));
        assert_eq!(err.collected(), [PostId::from("A"), PostId::from("B")]);
        let CollectError::Fetch {
            page: failed_page, ..
        } = err;
        assert_eq!(failed_page, 2);
    }

    #[tokio::test]
    async fn first_page_failure_carries_nothing() {
        let source = Arc::new(ScriptedSource::new(vec![Err(HttpError::Network(
            "connection reset".into(),
        ))]));
        let pacer = Arc::new(CountingPacer::default());

        let err = collector(&source, &pacer)
            .collect(&PostId::from("F"))
            .await
            .unwrap_err();
        assert!(err.collected().is_empty());
        assert_eq!(err.status(), None);
        assert_eq!(pacer.count(), 0);
    }

    #[tokio::test]
    async fn focal_id_is_never_collected() {
        let source = Arc::new(ScriptedSource::new(vec![
            Ok(page(&["F", "A"], Some("X"))),
            Ok(page(&["A", "F"], None)),
        ]));
        let pacer = Arc::new(CountingPacer::default());

        let replies = collector(&source, &pacer)
            .collect(&PostId::from("F"))
            .await
            .unwrap();
        assert_eq!(as_strs(&replies), ["A"]);
        assert!(!replies.contains(&PostId::from("F")));
    }

    #[tokio::test]
    async fn empty_page_with_cursor_keeps_going() {
        let source = Arc::new(ScriptedSource::new(vec![
            Ok(page(&[], Some("c1"))),
            Ok(page(&[], Some("c2"))),
            Ok(page(&["A"], None)),
        ]));
        let pacer = Arc::new(CountingPacer::default());

        let replies = collector(&source, &pacer)
            .collect(&PostId::from("F"))
            .await
            .unwrap();
        assert_eq!(as_strs(&replies), ["A"]);
        assert_eq!(
            source.requested_cursors(),
            [None, Some("c1".to_string()), Some("c2".to_string())]
        );
        assert_eq!(pacer.count(), 2);
    }

    #[tokio::test]
    async fn ids_without_cursor_end_after_that_page() {
        let source = Arc::new(ScriptedSource::new(vec![Ok(page(&["A", "B", "A"], None))]));
        let pacer = Arc::new(CountingPacer::default());

        let replies = collector(&source, &pacer)
            .collect(&PostId::from("F"))
            .await
            .unwrap();
        assert_eq!(as_strs(&replies), ["A", "B"]);
        assert_eq!(source.requested_cursors().len(), 1);
        assert_eq!(pacer.count(), 0);
    }

    #[tokio::test]
    async fn ordered_union_over_many_pages() {
        let pages: Vec<(&[&str], Option<&str>)> = vec![
            (&["1", "2", "3"][..], Some("a")),
            (&["3", "4"][..], Some("b")),
            (&[][..], Some("c")),
            (&["5", "1", "6"][..], Some("d")),
            (&["6", "7"][..], None),
        ];
        let source = Arc::new(ScriptedSource::new(
            pages.iter().map(|(ids, c)| Ok(page(ids, *c))).collect(),
        ));
        let pacer = Arc::new(CountingPacer::default());

        let replies = collector(&source, &pacer)
            .collect(&PostId::from("0"))
            .await
            .unwrap();
        assert_eq!(as_strs(&replies), ["1", "2", "3", "4", "5", "6", "7"]);
        assert_eq!(pacer.count(), 4);
    }
}
