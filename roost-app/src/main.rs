use anyhow::{Context, Result};
use clap::Parser;
use cli::{Cli, Command};
use roost_cache::{CacheService, EntityBatch};
use roost_common::Response;
use roost_common::observability::{LogConfig, LogFormat, init_logging};
use roost_config::{LoggingConfig, RoostConfig, RoostConfigLoader};
use roost_social::twitter::{Credentials, Cursor, HttpFetcher, TweetService};
use serde::Serialize;
use std::process::ExitCode;
use tracing::{info, warn};

mod cli;

#[tokio::main]
async fn main() -> Result<ExitCode> {
    let cli = Cli::parse();

    // Env wins over the file.
    let cfg: RoostConfig = RoostConfigLoader::new()
        .with_optional_file(&cli.config)
        .load()
        .with_context(|| format!("loading {}", cli.config.display()))?;

    let log_path = init_logging(log_config(&cfg.logging, cli.verbose))?;
    info!(log=%log_path.display(), command=?cli.command, "roost.start");

    let fetcher = HttpFetcher::new(
        &cfg.twitter.base_url,
        Credentials {
            auth_token: cfg.twitter.auth_token.clone(),
            csrf_token: cfg.twitter.csrf_token.clone(),
            cookie: cfg.twitter.cookie.clone(),
        },
    )?;
    let service = TweetService::new(fetcher);

    let outcome = match &cli.command {
        Command::Tweets(args) => {
            let res = service.list_tweets(&args.filter(), &args.cursor()).await;
            Outcome::new(res, |page| page.items.clone().into())
        }
        Command::Tweet { id } => {
            let res = service.get_tweet_by_id(id).await;
            Outcome::new(res, |tweet| tweet.clone().into())
        }
        Command::Likers(args) => {
            let res = service
                .get_tweet_likers(&args.id, args.count, &Cursor::from(args.cursor.as_str()))
                .await;
            Outcome::new(res, |page| page.items.clone().into())
        }
        Command::Retweeters(args) => {
            let res = service
                .get_tweet_retweeters(&args.id, args.count, &Cursor::from(args.cursor.as_str()))
                .await;
            Outcome::new(res, |page| page.items.clone().into())
        }
        Command::Replies { id, cursor } => {
            let res = service
                .get_tweet_replies(id, &Cursor::from(cursor.as_str()))
                .await;
            Outcome::new(res, |page| page.items.clone().into())
        }
    }?;

    println!("{}", outcome.json);

    if cli.cache {
        if let Some(batch) = outcome.batch {
            store(&cfg, batch).await?;
        }
    }

    Ok(if outcome.success {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    })
}

/// Printed response plus what to cache from it.
struct Outcome {
    json: String,
    success: bool,
    batch: Option<EntityBatch>,
}

impl Outcome {
    fn new<T: Serialize>(res: Response<T>, batch: impl FnOnce(&T) -> EntityBatch) -> Result<Self> {
        let json = serde_json::to_string_pretty(&res)?;
        let batch = res.success().then(|| batch(res.data()));
        Ok(Self {
            json,
            success: res.success(),
            batch,
        })
    }
}

async fn store(cfg: &RoostConfig, batch: EntityBatch) -> Result<()> {
    if batch.is_empty() {
        return Ok(());
    }
    let cache = CacheService::connect(&cfg.cache)?;
    let count = batch.len();
    let receipt = cache.write(batch).await;
    if !receipt.acknowledged() {
        warn!(items = count, url = %cfg.cache.url, "roost.cache.rejected");
        eprintln!("cache write was not acknowledged");
        return Ok(());
    }
    match receipt.index_complete().await {
        Ok(indexed) => info!(items = count, indexed, "roost.cache.ok"),
        Err(err) => warn!(items = count, error = %err, "roost.cache.index_failed"),
    }
    Ok(())
}

fn log_config(logging: &LoggingConfig, verbose: bool) -> LogConfig {
    let defaults = LogConfig::default();
    LogConfig {
        log_dir: logging.dir.clone(),
        emit_stderr: logging.stderr || verbose,
        format: logging
            .format
            .as_deref()
            .map(LogFormat::from_name)
            .unwrap_or(defaults.format),
        default_filter: logging.filter.clone().unwrap_or_else(|| {
            if verbose {
                "debug".to_string()
            } else {
                defaults.default_filter.clone()
            }
        }),
        ..defaults
    }
}
