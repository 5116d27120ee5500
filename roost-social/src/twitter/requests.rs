//! Request URL builders for the upstream endpoints.
//!
//! Each builder is a pure function of its parameters; the only thing the fetch
//! service relies on is that the returned [`Url`] is a valid request target.
use crate::twitter::types::Cursor;
use chrono::NaiveDate;
use serde_json::{json, Value};
use url::{ParseError, Url};

const ADAPTIVE_SEARCH_PATH: &str = "i/api/2/search/adaptive.json";
const TWEET_DETAIL_PATH: &str = "i/api/graphql/xOhkmRac04YFZmOzU9PJHg/TweetDetail";
const FAVORITERS_PATH: &str = "i/api/graphql/vcTrPlh9ovFDQejz22q9vg/Favoriters";
const RETWEETERS_PATH: &str = "i/api/graphql/0BoJlKAxoNPQUHRftlwZ2w/Retweeters";

const DEFAULT_SEARCH_COUNT: u32 = 20;

/// Search filter for [`tweets_url`]. Empty fields are left out of the query.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TweetFilter {
    pub words: Vec<String>,
    pub hashtags: Vec<String>,
    pub from_users: Vec<String>,
    pub to_users: Vec<String>,
    pub mentions: Vec<String>,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    /// Include tweets containing links.
    pub links: bool,
    /// Include replies.
    pub replies: bool,
    pub count: Option<u32>,
}

impl TweetFilter {
    /// Render the filter as an advanced-search query string.
    ///
    /// ```
    /// use roost_social::twitter::TweetFilter;
    ///
    /// let filter = TweetFilter {
    ///     words: vec!["rust".into()],
    ///     hashtags: vec!["async".into(), "tokio".into()],
    ///     from_users: vec!["ferris".into()],
    ///     links: true,
    ///     ..Default::default()
    /// };
    /// assert_eq!(filter.to_query(), "rust (#async OR #tokio) (from:ferris) -filter:replies");
    /// ```
    pub fn to_query(&self) -> String {
        let mut parts: Vec<String> = Vec::new();
        if !self.words.is_empty() {
            parts.push(self.words.join(" "));
        }
        push_any(&mut parts, &self.hashtags, "#");
        push_any(&mut parts, &self.from_users, "from:");
        push_any(&mut parts, &self.to_users, "to:");
        push_any(&mut parts, &self.mentions, "@");
        if let Some(start) = self.start_date {
            parts.push(format!("since:{}", start.format("%Y-%m-%d")));
        }
        if let Some(end) = self.end_date {
            parts.push(format!("until:{}", end.format("%Y-%m-%d")));
        }
        if !self.links {
            parts.push("-filter:links".to_string());
        }
        if !self.replies {
            parts.push("-filter:replies".to_string());
        }
        parts.join(" ")
    }
}

fn push_any(parts: &mut Vec<String>, values: &[String], prefix: &str) {
    if values.is_empty() {
        return;
    }
    let alternatives: Vec<String> = values
        .iter()
        .map(|v| format!("{prefix}{}", v.trim_start_matches(prefix)))
        .collect();
    parts.push(format!("({})", alternatives.join(" OR ")));
}

fn graphql_features() -> Value {
    json!({
        "responsive_web_graphql_exclude_directive_enabled": true,
        "verified_phone_label_enabled": false,
        "responsive_web_graphql_timeline_navigation_enabled": true,
        "tweetypie_unmention_optimization_enabled": true,
        "longform_notetweets_consumption_enabled": true,
        "responsive_web_enhance_cards_enabled": false
    })
}

fn graphql_url(base: &Url, path: &str, mut variables: Value, cursor: &Cursor) -> Result<Url, ParseError> {
    if !cursor.is_empty() {
        variables["cursor"] = Value::String(cursor.as_str().to_string());
    }
    let mut url = base.join(path)?;
    url.query_pairs_mut()
        .append_pair("variables", &variables.to_string())
        .append_pair("features", &graphql_features().to_string());
    Ok(url)
}

/// Adaptive search listing; tweets come back keyed by id under `globalObjects.tweets`.
pub fn tweets_url(base: &Url, filter: &TweetFilter, cursor: &Cursor) -> Result<Url, ParseError> {
    let mut url = base.join(ADAPTIVE_SEARCH_PATH)?;
    {
        let mut q = url.query_pairs_mut();
        q.append_pair("q", &filter.to_query())
            .append_pair("tweet_search_mode", "live")
            .append_pair("query_source", "typed_query")
            .append_pair("tweet_mode", "extended")
            .append_pair(
                "count",
                &filter.count.unwrap_or(DEFAULT_SEARCH_COUNT).to_string(),
            );
        if !cursor.is_empty() {
            q.append_pair("cursor", cursor.as_str());
        }
    }
    Ok(url)
}

pub fn tweet_details_url(base: &Url, tweet_id: &str) -> Result<Url, ParseError> {
    tweet_replies_url(base, tweet_id, &Cursor::default())
}

pub fn tweet_replies_url(base: &Url, tweet_id: &str, cursor: &Cursor) -> Result<Url, ParseError> {
    graphql_url(
        base,
        TWEET_DETAIL_PATH,
        json!({
            "focalTweetId": tweet_id,
            "with_rux_injections": false,
            "includePromotedContent": false,
            "withCommunity": true,
            "withBirdwatchNotes": false,
            "withVoice": false,
            "withV2Timeline": true
        }),
        cursor,
    )
}

pub fn tweet_likes_url(
    base: &Url,
    tweet_id: &str,
    count: u32,
    cursor: &Cursor,
) -> Result<Url, ParseError> {
    graphql_url(
        base,
        FAVORITERS_PATH,
        json!({ "tweetId": tweet_id, "count": count, "includePromotedContent": false }),
        cursor,
    )
}

pub fn tweet_retweets_url(
    base: &Url,
    tweet_id: &str,
    count: u32,
    cursor: &Cursor,
) -> Result<Url, ParseError> {
    graphql_url(
        base,
        RETWEETERS_PATH,
        json!({ "tweetId": tweet_id, "count": count, "includePromotedContent": false }),
        cursor,
    )
}
