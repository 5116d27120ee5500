use roost_common::ErrorKind;
use roost_http::HttpClient;
use roost_social::twitter::{Credentials, Cursor, HttpFetcher, TweetFilter, TweetService};
use serde_json::json;
use wiremock::matchers::{header, method, path, path_regex, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn service_for(server: &MockServer) -> TweetService<HttpFetcher> {
    let credentials = Credentials {
        auth_token: "AAAA".into(),
        csrf_token: "ct0-token".into(),
        cookie: "auth_token=abc; ct0=ct0-token".into(),
    };
    let client = HttpClient::new(&server.uri())
        .expect("mock url")
        .with_retries(0);
    let fetcher = HttpFetcher::new(&server.uri(), credentials)
        .expect("valid credentials")
        .with_client(client);
    TweetService::new(fetcher)
}

#[tokio::test]
async fn lists_tweets_over_http() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/i/api/2/search/adaptive.json"))
        .and(query_param("q", "rust -filter:links -filter:replies"))
        .and(header("authorization", "Bearer AAAA"))
        .and(header("x-csrf-token", "ct0-token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "globalObjects": { "tweets": {
                "1": { "id_str": "1", "full_text": "one" },
                "2": { "id_str": "2", "full_text": "two" }
            } },
            "timeline": { "instructions": [ { "addEntries": { "entries": [
                { "entryId": "sq-cursor-bottom", "content": { "operation": { "cursor": {
                    "value": "cursor123", "cursorType": "Bottom" } } } }
            ] } } ] }
        })))
        .expect(1)
        .mount(&server)
        .await;

    let filter = TweetFilter {
        words: vec!["rust".into()],
        ..Default::default()
    };
    let r = service_for(&server).list_tweets(&filter, &Cursor::default()).await;
    assert!(r.success());
    assert_eq!(r.data().items.len(), 2);
    assert_eq!(r.data().next.as_str(), "cursor123");
}

#[tokio::test]
async fn upstream_errors_become_fatal_responses() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path_regex(r"/Favoriters$"))
        .respond_with(ResponseTemplate::new(401).set_body_json(json!({
            "errors": [ { "message": "Could not authenticate you" } ]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let r = service_for(&server)
        .get_tweet_likers("42", 20, &Cursor::default())
        .await;
    assert!(!r.success());
    assert_eq!(r.error().kind(), ErrorKind::FatalError);
    assert!(r.error().message().unwrap().contains("Could not authenticate you"));
    assert!(r.data().items.is_empty());
}

#[tokio::test]
async fn unreachable_server_is_fatal() {
    let server = MockServer::start().await;
    let svc = service_for(&server);
    drop(server);

    let r = svc.get_tweet_by_id("1").await;
    assert_eq!(r.error().kind(), ErrorKind::FatalError);
}
