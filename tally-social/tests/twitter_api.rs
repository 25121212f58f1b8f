use serde_json::json;
use tally_social::twitter::TwitterApi;
use tally_social::{Continuation, ConversationQuery, Cursor, SocialError, SocialPlatform};
use time::macros::datetime;
use wiremock::matchers::{header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn api(server: &MockServer) -> TwitterApi {
    TwitterApi::with_base_url(&server.uri(), "test-bearer".to_string()).unwrap()
}

#[tokio::test]
async fn first_page_carries_query_fields_and_window() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/2/tweets/search/recent"))
        .and(header("authorization", "Bearer test-bearer"))
        .and(query_param("query", "conversation_id:1473394217284255744"))
        .and(query_param("max_results", "100"))
        .and(query_param("tweet.fields", "author_id,created_at,conversation_id"))
        .and(query_param("start_time", "2021-12-21T00:00:00Z"))
        .and(query_param("end_time", "2021-12-22T12:00:00Z"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "data": [
                { "id": "11", "text": "CatalanDAO", "author_id": "a1" },
                { "id": "10", "text": "dataverse", "author_id": "a2" }
            ],
            "meta": { "result_count": 2, "next_token": "tok-2" }
        })))
        .expect(1)
        .mount(&server)
        .await;

    let query = ConversationQuery::new("1473394217284255744", 100).with_window(
        Some(datetime!(2021-12-21 0:00 UTC)),
        Some(datetime!(2021-12-22 12:00 UTC)),
    );
    let page = api(&server).search_conversation(&query).await.unwrap();

    assert_eq!(page.posts.len(), 2);
    assert_eq!(page.result_count, 2);
    assert_eq!(page.next, Cursor::from_token(Some("tok-2".into())));
}

#[tokio::test]
async fn continuation_is_threaded_verbatim() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/2/tweets/search/recent"))
        .and(query_param("next_token", "b26v89c19zqg8o3f"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "meta": { "result_count": 0, "next_token": "" }
        })))
        .expect(1)
        .mount(&server)
        .await;

    let mut query = ConversationQuery::new("1", 50);
    query.continuation = Continuation::Token(Cursor::from_token(Some("b26v89c19zqg8o3f".into())).unwrap());
    let page = api(&server).search_conversation(&query).await.unwrap();

    assert!(page.posts.is_empty());
    assert!(page.next.is_none(), "empty token means no more pages");
}

#[tokio::test]
async fn oldest_id_watermark_is_sent_as_until_id() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/2/tweets/search/recent"))
        .and(query_param("until_id", "1473400000000000000"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "meta": { "result_count": 0 } })))
        .expect(1)
        .mount(&server)
        .await;

    let mut query = ConversationQuery::new("1", 10);
    query.continuation = Continuation::Until("1473400000000000000".into());
    api(&server).search_conversation(&query).await.unwrap();
}

#[tokio::test]
async fn lookup_joins_ids_and_requests_metrics() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/2/users"))
        .and(header("authorization", "Bearer test-bearer"))
        .and(query_param("ids", "1,2,3"))
        .and(query_param("user.fields", "name,public_metrics"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "data": [
                { "id": "1", "username": "one", "name": "One", "public_metrics": { "followers_count": 10 } },
                { "id": "2", "username": "two", "name": "Two", "public_metrics": { "followers_count": 9 } }
            ],
            "errors": [ { "value": "3", "title": "Not Found Error" } ]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let ids: Vec<String> = ["1", "2", "3"].iter().map(|s| s.to_string()).collect();
    let users = api(&server).lookup_users(&ids).await.unwrap();

    assert_eq!(users.len(), 2);
    assert_eq!(users[0].followers(), 10);
    assert_eq!(users[1].followers(), 9);
}

#[tokio::test]
async fn lookup_rejects_oversized_batches_without_calling_out() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let ids: Vec<String> = (0..101).map(|i| i.to_string()).collect();
    let err = api(&server).lookup_users(&ids).await.unwrap_err();
    assert!(matches!(err, SocialError::InvalidRequest(_)));
}

#[tokio::test]
async fn unauthorized_surfaces_as_http_error() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/2/users"))
        .respond_with(ResponseTemplate::new(401).set_body_json(json!({
            "title": "Unauthorized", "type": "about:blank", "status": 401, "detail": "Unauthorized"
        })))
        .expect(1)
        .mount(&server)
        .await;

    let err = api(&server)
        .lookup_users(&["1".to_string()])
        .await
        .unwrap_err();
    match err {
        SocialError::Http(http) => assert_eq!(http.status().map(|s| s.as_u16()), Some(401)),
        other => panic!("unexpected error: {other:?}"),
    }
}
