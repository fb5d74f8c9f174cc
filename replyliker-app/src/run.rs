use anyhow::{Context, Result};
use replyliker_config::Settings;
use replyliker_social::pacing::RandomPacer;
use replyliker_social::twitter::{LikeDispatcher, PostId, ReplyCollector, ReplySet, XWebApi};
use serde::Serialize;
use std::sync::Arc;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    Like,
    DryRun,
    CollectOnly,
}

#[derive(Serialize)]
struct Collected<'a> {
    focal: &'a PostId,
    count: usize,
    replies: &'a ReplySet,
}

/// Collect the replies to the configured post, then like them unless `mode`
/// says otherwise. A failed page fetch ends the run before any like.
pub async fn run(settings: &Settings, mode: Mode) -> Result<()> {
    let focal = PostId::from(settings.tweet_id.as_str());
    let api = Arc::new(XWebApi::from_settings(settings).context("building the X web client")?);
    let pacer = Arc::new(RandomPacer::from_settings(&settings.pacing)?);

    let replies = ReplyCollector::new(api.clone(), pacer.clone())
        .collect(&focal)
        .await
        .with_context(|| format!("collecting replies to {focal}"))?;
    eprintln!("Collected {} unique replies to {focal}", replies.len());

    if mode == Mode::CollectOnly {
        let out = Collected {
            focal: &focal,
            count: replies.len(),
            replies: &replies,
        };
        println!("{}", serde_json::to_string_pretty(&out)?);
        return Ok(());
    }

    let report = LikeDispatcher::new(api, pacer)
        .with_dry_run(mode == Mode::DryRun)
        .dispatch(&focal, &replies)
        .await;
    println!("{}", serde_json::to_string_pretty(&report)?);

    if !report.failed.is_empty() {
        tracing::warn!(failed = report.failed.len(), "run.finished_with_failed_likes");
    }
    Ok(())
}
