use chrono::NaiveDate;
use clap::{Args, Parser, Subcommand};
use roost_social::twitter::{Cursor, TweetFilter};
use std::path::PathBuf;

/// Fetch tweets and their audiences, optionally caching what comes back.
#[derive(Debug, Parser)]
#[command(name = "roost", version, about)]
pub struct Cli {
    /// Configuration file; skipped when absent.
    #[arg(long, short, global = true, env = "ROOST_CONFIG", default_value = "roost.yaml")]
    pub config: PathBuf,

    /// Store fetched entities in the configured cache.
    #[arg(long, global = true)]
    pub cache: bool,

    /// Also log to stderr, at debug level unless a filter is configured.
    #[arg(long, short, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Search tweets.
    Tweets(SearchArgs),
    /// Look up a single tweet.
    Tweet { id: String },
    /// Users who liked a tweet.
    Likers(AudienceArgs),
    /// Users who retweeted a tweet.
    Retweeters(AudienceArgs),
    /// Replies under a tweet.
    Replies {
        id: String,
        #[arg(long, default_value = "")]
        cursor: String,
    },
}

#[derive(Debug, Args)]
pub struct SearchArgs {
    /// Words that must appear in the tweet.
    pub words: Vec<String>,
    #[arg(long = "hashtag")]
    pub hashtags: Vec<String>,
    #[arg(long = "from")]
    pub from_users: Vec<String>,
    #[arg(long = "to")]
    pub to_users: Vec<String>,
    #[arg(long = "mention")]
    pub mentions: Vec<String>,
    /// Earliest day, `YYYY-MM-DD`.
    #[arg(long)]
    pub since: Option<NaiveDate>,
    /// Latest day, `YYYY-MM-DD`.
    #[arg(long)]
    pub until: Option<NaiveDate>,
    /// Include tweets with links.
    #[arg(long)]
    pub links: bool,
    /// Include replies.
    #[arg(long)]
    pub replies: bool,
    #[arg(long)]
    pub count: Option<u32>,
    #[arg(long, default_value = "")]
    pub cursor: String,
}

impl SearchArgs {
    pub fn filter(&self) -> TweetFilter {
        TweetFilter {
            words: self.words.clone(),
            hashtags: self.hashtags.clone(),
            from_users: self.from_users.clone(),
            to_users: self.to_users.clone(),
            mentions: self.mentions.clone(),
            start_date: self.since,
            end_date: self.until,
            links: self.links,
            replies: self.replies,
            count: self.count,
        }
    }

    pub fn cursor(&self) -> Cursor {
        Cursor::from(self.cursor.as_str())
    }
}

#[derive(Debug, Args)]
pub struct AudienceArgs {
    pub id: String,
    #[arg(long, default_value_t = 20)]
    pub count: u32,
    #[arg(long, default_value = "")]
    pub cursor: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn search_flags_build_a_filter() {
        let cli = Cli::parse_from([
            "roost", "--cache", "tweets", "rust", "--hashtag", "tokio", "--from", "ferris",
            "--since", "2024-01-01", "--count", "5", "--cursor", "abc",
        ]);
        assert!(cli.cache);
        let Command::Tweets(args) = cli.command else {
            panic!("expected tweets");
        };
        let filter = args.filter();
        assert_eq!(filter.words, ["rust"]);
        assert_eq!(filter.hashtags, ["tokio"]);
        assert_eq!(filter.start_date, NaiveDate::from_ymd_opt(2024, 1, 1));
        assert_eq!(filter.count, Some(5));
        assert_eq!(args.cursor().as_str(), "abc");
    }

    #[test]
    fn audience_count_defaults() {
        let cli = Cli::parse_from(["roost", "likers", "123"]);
        match cli.command {
            Command::Likers(args) => {
                assert_eq!(args.id, "123");
                assert_eq!(args.count, 20);
                assert!(args.cursor.is_empty());
            }
            other => panic!("unexpected {other:?}"),
        }
    }
}
