use anyhow::{Context, Result};
use clap::Parser;
use replyliker_common::observability::{LogConfig, LogFormat, init_logging};
use replyliker_config::ReplyLikerConfigLoader;
use run::Mode;
use std::ffi::OsString;
use std::path::{Path, PathBuf};
mod run;

const DEFAULT_CONFIG: &str = "replyliker.yaml";

#[derive(Parser, Debug)]
#[command(name = "replyliker")]
#[command(about = "Collect every reply under an X post and like each one")]
struct Args {
    /// Settings file. Without this flag `replyliker.yaml` is read if present.
    #[arg(short, long, env = "REPLYLIKER_CONFIG")]
    config: Option<PathBuf>,

    /// Focal post id; wins over TWEET_ID and the settings file.
    #[arg(long)]
    tweet_id: Option<String>,

    /// Collect and report, but send no likes.
    #[arg(long)]
    dry_run: bool,

    /// Print the collected reply ids as JSON and stop.
    #[arg(long, conflicts_with = "dry_run")]
    collect_only: bool,

    #[arg(long, default_value = "text")]
    log_format: LogFormat,

    #[arg(long)]
    log_dir: Option<PathBuf>,
}

impl Args {
    fn mode(&self) -> Mode {
        if self.collect_only {
            Mode::CollectOnly
        } else if self.dry_run {
            Mode::DryRun
        } else {
            Mode::Like
        }
    }
}

/// Load `.env` (the working directory's, or `env_file`) and then parse
/// `argv`, so `env`-backed flags can come from the file.
fn parse_args<I, T>(env_file: Option<&Path>, argv: I) -> Result<Args, clap::Error>
where
    I: IntoIterator<Item = T>,
    T: Into<OsString> + Clone,
{
    match env_file {
        Some(path) => dotenv::from_path(path).ok(),
        None => dotenv::dotenv().ok().map(|_| ()),
    };
    Args::try_parse_from(argv)
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = parse_args(None, std::env::args_os()).unwrap_or_else(|e| e.exit());

    let log_path = init_logging(LogConfig {
        log_dir: args.log_dir.clone(),
        emit_stderr: true,
        format: args.log_format,
    })?;
    tracing::debug!(path = %log_path.display(), "logging.ready");

    let mut loader = match &args.config {
        Some(path) => ReplyLikerConfigLoader::new().with_file(path),
        None => ReplyLikerConfigLoader::new().with_optional_file(DEFAULT_CONFIG),
    };
    if let Some(id) = &args.tweet_id {
        loader = loader.with_tweet_id(id)?;
    }
    let settings = loader.load().context("loading settings")?;

    run::run(&settings, args.mode()).await
}
