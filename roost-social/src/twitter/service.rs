//! Content fetch service: one upstream call per operation, turned into a typed page.
//!
//! Every operation follows the same shape: build the request URL, fetch once,
//! check that the payload root is present and non-empty, read the `Bottom`
//! cursor, then classify entries by their `entryId` and parse the ones that
//! match. Failures never escape as errors; they come back as a negative
//! [`Response`].
use crate::twitter::fetcher::{FetchError, Fetcher, HttpFetcher};
use crate::twitter::requests::{self, TweetFilter};
use crate::twitter::types::{Cursor, FromRaw, Page, Tweet, User};
use roost_common::json::{filter_json, find_json_key, is_empty_payload};
use roost_common::{ErrorKind, Response};
use serde_json::{json, Value};
use url::Url;

const USER_ENTRY_MARKER: &str = "user";
const REPLY_ENTRY_MARKER: &str = "conversationthread";

pub struct TweetService<F = HttpFetcher> {
    fetcher: F,
}

impl<F: Fetcher> TweetService<F> {
    pub fn new(fetcher: F) -> Self {
        Self { fetcher }
    }

    /// Tweets matching `filter`, one page at a time.
    pub async fn list_tweets(&self, filter: &TweetFilter, cursor: &Cursor) -> Response<Page<Tweet>> {
        let url = requests::tweets_url(self.fetcher.base_url(), filter, cursor);
        self.run("tweets.list", url, extract_tweet_list).await
    }

    /// A single tweet by id.
    pub async fn get_tweet_by_id(&self, tweet_id: &str) -> Response<Tweet> {
        let url = requests::tweet_details_url(self.fetcher.base_url(), tweet_id);
        self.run("tweets.details", url, |res| extract_tweet_details(res, tweet_id))
            .await
    }

    /// Users who liked a tweet.
    pub async fn get_tweet_likers(
        &self,
        tweet_id: &str,
        count: u32,
        cursor: &Cursor,
    ) -> Response<Page<User>> {
        let url = requests::tweet_likes_url(self.fetcher.base_url(), tweet_id, count, cursor);
        self.run("tweets.likers", url, |res| {
            extract_user_timeline(res, "favoriters_timeline")
        })
        .await
    }

    /// Users who retweeted a tweet.
    pub async fn get_tweet_retweeters(
        &self,
        tweet_id: &str,
        count: u32,
        cursor: &Cursor,
    ) -> Response<Page<User>> {
        let url = requests::tweet_retweets_url(self.fetcher.base_url(), tweet_id, count, cursor);
        self.run("tweets.retweeters", url, |res| {
            extract_user_timeline(res, "retweeters_timeline")
        })
        .await
    }

    /// Replies in the conversation under a tweet.
    pub async fn get_tweet_replies(&self, tweet_id: &str, cursor: &Cursor) -> Response<Page<Tweet>> {
        let url = requests::tweet_replies_url(self.fetcher.base_url(), tweet_id, cursor);
        self.run("tweets.replies", url, extract_replies).await
    }

    async fn run<T, X>(
        &self,
        op: &'static str,
        url: Result<Url, url::ParseError>,
        extract: X,
    ) -> Response<T>
    where
        T: Default,
        X: FnOnce(&Value) -> Result<Response<T>, FetchError>,
    {
        let outcome = match url {
            Ok(url) => match self.fetcher.fetch_data(&url).await {
                Ok(res) => extract(&res),
                Err(err) => Err(err),
            },
            Err(err) => Err(err.into()),
        };
        match outcome {
            Ok(response) => {
                if response.success() {
                    tracing::debug!(op, "tweets.fetch.ok");
                } else {
                    tracing::info!(op, kind=%response.error().kind(), "tweets.fetch.not_found");
                }
                response
            }
            Err(err) => {
                tracing::warn!(op, error=%err, "tweets.fetch.failed");
                Response::fatal(err.to_string())
            }
        }
    }
}

/// Value of the first `cursorType == "Bottom"` object, or an empty cursor.
fn bottom_cursor(value: &Value) -> Cursor {
    filter_json(value, &[("cursorType", json!("Bottom"))])
        .and_then(|c| c.get("value"))
        .and_then(Value::as_str)
        .map(Cursor::from)
        .unwrap_or_default()
}

fn entries(res: &Value) -> Result<&Vec<Value>, FetchError> {
    find_json_key(res, "entries")
        .ok_or(FetchError::MissingKey("entries"))?
        .as_array()
        .ok_or(FetchError::Shape("entries"))
}

fn entry_matches(entry: &Value, marker: &str) -> bool {
    entry
        .get("entryId")
        .and_then(Value::as_str)
        .is_some_and(|id| id.contains(marker))
}

/// Parse the `result` object of every entry whose id contains `marker`.
fn classify<T: FromRaw>(entries: &[Value], marker: &str) -> Vec<T> {
    entries
        .iter()
        .filter(|entry| entry_matches(entry, marker))
        .map(|entry| T::from_raw(find_json_key(entry, "result").unwrap_or(&Value::Null)))
        .collect()
}

/// Tweets come out in the order the payload lists them. Ids are far above the
/// array-index range, so no numeric reordering of keys is applied.
fn extract_tweet_list(res: &Value) -> Result<Response<Page<Tweet>>, FetchError> {
    let next = bottom_cursor(res);
    let tweets = find_json_key(res, "tweets").ok_or(FetchError::MissingKey("tweets"))?;
    if is_empty_payload(tweets) {
        return Ok(Response::fail(ErrorKind::NoTweetsFound, Page::default()));
    }
    let map = tweets.as_object().ok_or(FetchError::Shape("tweets"))?;

    let items = map
        .iter()
        .map(|(key, raw)| {
            let id = raw.get("id_str").and_then(Value::as_str).unwrap_or(key);
            Tweet::from_parts(id, raw)
        })
        .collect();
    Ok(Response::ok(Page { items, next }))
}

fn extract_tweet_details(res: &Value, tweet_id: &str) -> Result<Response<Tweet>, FetchError> {
    let data = res.get("data").ok_or(FetchError::MissingKey("data"))?;
    if is_empty_payload(data) {
        return Ok(Response::fail(ErrorKind::TweetNotFound, Tweet::default()));
    }
    let found = entries(res)?
        .iter()
        .find(|entry| entry_matches(entry, tweet_id))
        .and_then(|entry| find_json_key(entry, "result"));
    match found {
        Some(raw) => Ok(Response::ok(Tweet::from_raw(raw))),
        None => Ok(Response::fail(ErrorKind::TweetNotFound, Tweet::default())),
    }
}

fn extract_user_timeline(
    res: &Value,
    timeline: &'static str,
) -> Result<Response<Page<User>>, FetchError> {
    let root = res
        .get("data")
        .and_then(|d| d.get(timeline))
        .ok_or(FetchError::MissingKey(timeline))?;
    if is_empty_payload(root) {
        return Ok(Response::fail(ErrorKind::TweetNotFound, Page::default()));
    }
    let entries = entries(root)?;
    Ok(Response::ok(Page {
        next: bottom_cursor_in(entries),
        items: classify(entries, USER_ENTRY_MARKER),
    }))
}

fn bottom_cursor_in(entries: &[Value]) -> Cursor {
    entries
        .iter()
        .map(bottom_cursor)
        .find(|c| !c.is_empty())
        .unwrap_or_default()
}

fn extract_replies(res: &Value) -> Result<Response<Page<Tweet>>, FetchError> {
    let data = res.get("data").ok_or(FetchError::MissingKey("data"))?;
    if is_empty_payload(data) {
        return Ok(Response::fail(ErrorKind::TweetNotFound, Page::default()));
    }
    let entries = entries(res)?;
    Ok(Response::ok(Page {
        next: bottom_cursor_in(entries),
        items: classify(entries, REPLY_ENTRY_MARKER),
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use roost_http::HttpError;
    use std::sync::Mutex;

    struct StubFetcher {
        base: Url,
        reply: Option<Value>,
        seen: Mutex<Vec<Url>>,
    }

    impl StubFetcher {
        fn replying(reply: Value) -> Self {
            Self {
                base: Url::parse("https://twitter.com").unwrap(),
                reply: Some(reply),
                seen: Mutex::new(Vec::new()),
            }
        }

        fn failing() -> Self {
            Self {
                reply: None,
                ..Self::replying(Value::Null)
            }
        }
    }

    #[async_trait]
    impl Fetcher for StubFetcher {
        async fn fetch_data(&self, url: &Url) -> Result<Value, FetchError> {
            self.seen.lock().unwrap().push(url.clone());
            self.reply
                .clone()
                .ok_or_else(|| HttpError::Network("connection refused".into()).into())
        }

        fn base_url(&self) -> &Url {
            &self.base
        }
    }

    fn user_entry(id: &str, rest_id: &str) -> Value {
        json!({
            "entryId": id,
            "content": { "itemContent": { "user_results": { "result": {
                "rest_id": rest_id,
                "legacy": { "screen_name": format!("u{rest_id}") }
            } } } }
        })
    }

    fn cursor_entry(kind: &str, value: &str) -> Value {
        json!({
            "entryId": format!("cursor-{}-0", kind.to_lowercase()),
            "content": { "entryType": "TimelineTimelineCursor", "cursorType": kind, "value": value }
        })
    }

    fn likers_response(entries: Vec<Value>) -> Value {
        json!({ "data": { "favoriters_timeline": { "timeline": {
            "instructions": [ { "type": "TimelineAddEntries", "entries": entries } ]
        } } } })
    }

    #[tokio::test]
    async fn fetch_failure_is_fatal_for_every_operation() {
        let svc = TweetService::new(StubFetcher::failing());
        let c = Cursor::default();

        let list = svc.list_tweets(&TweetFilter::default(), &c).await;
        assert_eq!(list.error().kind(), ErrorKind::FatalError);
        assert!(!list.success());
        assert_eq!(list.data(), &Page::default());

        let one = svc.get_tweet_by_id("1").await;
        assert_eq!(one.error().kind(), ErrorKind::FatalError);
        assert_eq!(one.data(), &Tweet::default());

        for r in [
            svc.get_tweet_likers("1", 10, &c).await,
            svc.get_tweet_retweeters("1", 10, &c).await,
        ] {
            assert_eq!(r.error().kind(), ErrorKind::FatalError);
            assert!(r.data().items.is_empty());
        }
        let replies = svc.get_tweet_replies("1", &c).await;
        assert_eq!(replies.error().kind(), ErrorKind::FatalError);
        assert!(replies.error().message().unwrap().contains("connection refused"));
    }

    #[tokio::test]
    async fn empty_roots_are_not_found() {
        let c = Cursor::default();
        let svc = TweetService::new(StubFetcher::replying(
            json!({ "globalObjects": { "tweets": {} } }),
        ));
        let list = svc.list_tweets(&TweetFilter::default(), &c).await;
        assert!(!list.success());
        assert_eq!(list.error().kind(), ErrorKind::NoTweetsFound);
        assert!(list.data().items.is_empty());
        assert!(list.data().next.is_empty());

        let svc = TweetService::new(StubFetcher::replying(
            json!({ "data": { "favoriters_timeline": {} } }),
        ));
        let likers = svc.get_tweet_likers("1", 20, &c).await;
        assert_eq!(likers.error().kind(), ErrorKind::TweetNotFound);
        assert!(likers.data().next.is_empty());

        let svc = TweetService::new(StubFetcher::replying(
            json!({ "data": { "retweeters_timeline": {} } }),
        ));
        let rts = svc.get_tweet_retweeters("1", 20, &c).await;
        assert_eq!(rts.error().kind(), ErrorKind::TweetNotFound);

        let svc = TweetService::new(StubFetcher::replying(json!({ "data": {} })));
        assert_eq!(
            svc.get_tweet_replies("1", &c).await.error().kind(),
            ErrorKind::TweetNotFound
        );
        assert_eq!(
            svc.get_tweet_by_id("1").await.error().kind(),
            ErrorKind::TweetNotFound
        );
    }

    #[tokio::test]
    async fn likers_keep_only_user_entries() {
        let svc = TweetService::new(StubFetcher::replying(likers_response(vec![
            user_entry("user-123", "123"),
            json!({ "entryId": "tweet-456", "content": { "result": { "rest_id": "456", "legacy": {} } } }),
            cursor_entry("Bottom", "next-page"),
        ])));
        let r = svc.get_tweet_likers("9", 20, &Cursor::default()).await;
        assert!(r.success());
        assert_eq!(r.error().kind(), ErrorKind::NoError);
        let page = r.into_data();
        assert_eq!(page.items.len(), 1);
        assert_eq!(page.items[0].id, "123");
        assert_eq!(page.items[0].user_name, "u123");
        assert_eq!(page.next.as_str(), "next-page");
    }

    #[tokio::test]
    async fn bottom_cursor_wins_over_top() {
        let svc = TweetService::new(StubFetcher::replying(json!({ "data": { "retweeters_timeline": {
            "timeline": { "instructions": [ { "entries": [
                cursor_entry("Top", "A"),
                user_entry("user-1", "1"),
                cursor_entry("Bottom", "B")
            ] } ] }
        } } })));
        let r = svc.get_tweet_retweeters("9", 20, &Cursor::default()).await;
        assert_eq!(r.data().next.as_str(), "B");
        assert_eq!(r.data().items.len(), 1);
    }

    #[tokio::test]
    async fn missing_bottom_cursor_is_empty() {
        let svc = TweetService::new(StubFetcher::replying(likers_response(vec![user_entry(
            "user-1", "1",
        )])));
        let r = svc.get_tweet_likers("9", 20, &Cursor::default()).await;
        assert!(r.success());
        assert!(r.data().next.is_empty());
    }

    #[tokio::test]
    async fn list_tweets_reads_id_keyed_container() {
        let svc = TweetService::new(StubFetcher::replying(json!({
            "globalObjects": { "tweets": {
                "11": { "id_str": "11", "full_text": "first", "user_id_str": "1" },
                "12": { "id_str": "12", "full_text": "second", "user_id_str": "2" }
            } },
            "timeline": { "instructions": [ { "addEntries": { "entries": [
                { "entryId": "sq-cursor-bottom", "content": { "operation": { "cursor": {
                    "value": "cursor123", "cursorType": "Bottom"
                } } } }
            ] } } ] }
        })));
        let filter = TweetFilter {
            words: vec!["rust".into()],
            ..Default::default()
        };
        let r = svc.list_tweets(&filter, &Cursor::from("")).await;
        assert!(r.success());
        let page = r.into_data();
        assert_eq!(page.items.len(), 2);
        assert_eq!(page.next.as_str(), "cursor123");
        assert_eq!(page.items[0].id, "11");
        assert_eq!(page.items[1].text, "second");
    }

    #[tokio::test]
    async fn list_tweets_keep_payload_order() {
        let svc = TweetService::new(StubFetcher::replying(json!({
            "globalObjects": { "tweets": {
                "1700000000000000002": { "full_text": "newer" },
                "1700000000000000001": { "full_text": "older" },
                "9": { "full_text": "short id" }
            } }
        })));
        let page = svc
            .list_tweets(&TweetFilter::default(), &Cursor::default())
            .await
            .into_data();
        let ids: Vec<&str> = page.items.iter().map(|t| t.id.as_str()).collect();
        assert_eq!(ids, ["1700000000000000002", "1700000000000000001", "9"]);
        assert!(page.next.is_empty());
    }

    #[tokio::test]
    async fn replies_keep_conversation_threads() {
        let svc = TweetService::new(StubFetcher::replying(json!({ "data": {
            "threaded_conversation_with_injections_v2": { "instructions": [ { "entries": [
                { "entryId": "tweet-1", "content": { "itemContent": { "tweet_results": { "result": {
                    "rest_id": "1", "legacy": { "full_text": "root" } } } } } },
                { "entryId": "conversationthread-2", "content": { "items": [ { "item": { "itemContent": {
                    "tweet_results": { "result": { "rest_id": "2", "legacy": { "full_text": "reply" } } }
                } } } ] } },
                { "entryId": "conversationthread-3", "content": {} },
                cursor_entry("Bottom", "more")
            ] } ] }
        } })));
        let r = svc.get_tweet_replies("1", &Cursor::default()).await;
        let page = r.into_data();
        assert_eq!(page.items.len(), 2);
        assert_eq!(page.items[0].text, "reply");
        assert_eq!(page.items[1], Tweet::default());
        assert_eq!(page.next.as_str(), "more");
    }

    #[tokio::test]
    async fn tweet_details_pick_the_focal_entry() {
        let fetcher = StubFetcher::replying(json!({ "data": {
            "threaded_conversation_with_injections_v2": { "instructions": [ { "entries": [
                { "entryId": "tweet-5", "content": { "itemContent": { "tweet_results": { "result": {
                    "rest_id": "5", "legacy": { "full_text": "parent" } } } } } },
                { "entryId": "tweet-6", "content": { "itemContent": { "tweet_results": { "result": {
                    "rest_id": "6", "legacy": { "full_text": "focal" } } } } } }
            ] } ] }
        } }));
        let svc = TweetService::new(fetcher);
        let found = svc.get_tweet_by_id("6").await;
        assert!(found.success());
        assert_eq!(found.data().text, "focal");

        let missing = svc.get_tweet_by_id("7").await;
        assert_eq!(missing.error().kind(), ErrorKind::TweetNotFound);

        let urls = svc.fetcher.seen.lock().unwrap();
        assert_eq!(urls.len(), 2);
        assert!(urls[0].path().ends_with("/TweetDetail"));
    }

    #[tokio::test]
    async fn malformed_payload_is_fatal() {
        let svc = TweetService::new(StubFetcher::replying(json!({ "errors": [ { "message": "x" } ] })));
        let r = svc.get_tweet_likers("1", 20, &Cursor::default()).await;
        assert_eq!(r.error().kind(), ErrorKind::FatalError);
        assert!(r.error().message().unwrap().contains("favoriters_timeline"));
    }
}
