//! Sequential "like" pass over a collected [`ReplySet`].
use crate::pacing::Pacer;
use crate::twitter::traits::Liker;
use crate::twitter::types::{PostId, ReplySet};
use serde::Serialize;
use std::sync::Arc;

/// Outcome of one dispatch pass.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct DispatchReport {
    /// Like calls actually issued.
    pub attempted: usize,
    pub liked: usize,
    /// Ids whose like failed, with the reason.
    pub failed: Vec<(PostId, String)>,
    /// Ids not attempted (the focal post).
    pub skipped: usize,
    pub dry_run: bool,
}

pub struct LikeDispatcher {
    liker: Arc<dyn Liker>,
    pacer: Arc<dyn Pacer>,
    dry_run: bool,
}

impl LikeDispatcher {
    pub fn new(liker: Arc<dyn Liker>, pacer: Arc<dyn Pacer>) -> Self {
        Self {
            liker,
            pacer,
            dry_run: false,
        }
    }

    /// Log what would be liked instead of calling the liker.
    pub fn with_dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }

    /// Like every id in `replies` except `focal`, one at a time with a pause
    /// between calls. A failed like is logged and recorded; it never stops
    /// the remaining ones.
    pub async fn dispatch(&self, focal: &PostId, replies: &ReplySet) -> DispatchReport {
        let targets: Vec<&PostId> = replies.iter().filter(|id| *id != focal).collect();
        let mut report = DispatchReport {
            skipped: replies.len() - targets.len(),
            dry_run: self.dry_run,
            ..DispatchReport::default()
        };

        if self.dry_run {
            for id in &targets {
                tracing::info!(post = %id, "like.dry_run");
            }
            return report;
        }

        tracing::info!(targets = targets.len(), "like.start");
        for (i, id) in targets.into_iter().enumerate() {
            if i > 0 {
                self.pacer.pause().await;
            }
            report.attempted += 1;
            match self.liker.like(id).await {
                Ok(()) => {
                    report.liked += 1;
                    tracing::info!(post = %id, "like.ok");
                }
                Err(err) => {
                    tracing::warn!(post = %id, error = %err, "like.failed");
                    report.failed.push((id.clone(), err.to_string()));
                }
            }
        }

        tracing::info!(
            attempted = report.attempted,
            liked = report.liked,
            failed = report.failed.len(),
            "like.done"
        );
        report
    }
}
