mod common;

use async_trait::async_trait;
use common::{page, FakePlatform};
use std::sync::Mutex;
use tally_core::{scan, PaginationMode, ScanRequest};
use tally_social::{
    Continuation, ConversationPage, ConversationQuery, Cursor, SocialError, SocialPlatform, Tweet,
    User,
};

fn posts(prefix: &str, n: usize, text: &str) -> Vec<Tweet> {
    (0..n)
        .map(|i| Tweet::new(format!("{prefix}{i}"), format!("{prefix}-author{i}"), text))
        .collect()
}

#[tokio::test]
async fn short_page_ends_scan_even_with_a_token() {
    let platform = FakePlatform::with_pages(vec![
        page(posts("a", 30, "catalandao"), Some("more")),
        page(posts("b", 10, "catalandao"), None),
    ]);

    let out = scan(&platform, &ScanRequest::new("1", 100), "catalandao", "dataverse")
        .await
        .unwrap();

    assert_eq!(platform.search_calls().len(), 1);
    assert_eq!(out.voters.first.len(), 30);
    assert_eq!(out.pages, 1);
}

#[tokio::test]
async fn full_pages_follow_tokens_until_absent() {
    let platform = FakePlatform::with_pages(vec![
        page(posts("a", 10, "dataverse"), Some("t1")),
        page(posts("b", 10, "dataverse"), Some("t2")),
        page(posts("c", 10, "dataverse"), None),
    ]);

    let out = scan(&platform, &ScanRequest::new("1", 10), "catalandao", "dataverse")
        .await
        .unwrap();

    let calls = platform.search_calls();
    assert_eq!(calls.len(), 3);
    assert!(calls.iter().all(|(_, size)| *size == 10));
    assert_eq!(
        calls[2].0,
        Continuation::Token(Cursor::from_token(Some("t2".into())).unwrap())
    );
    assert_eq!(out.voters.second.len(), 30);
}

#[tokio::test]
async fn empty_token_counts_as_exhausted() {
    let platform = FakePlatform::with_pages(vec![
        page(posts("a", 10, "gm"), Some("")),
        page(posts("b", 10, "catalandao"), None),
    ]);

    let out = scan(&platform, &ScanRequest::new("1", 10), "catalandao", "dataverse")
        .await
        .unwrap();

    assert_eq!(platform.search_calls().len(), 1);
    assert_eq!(out.voters.total(), 0);
}

/// Serves a conversation the way recent search does: newest first, honouring
/// `until_id`, truncated to the requested page size.
struct Timeline {
    posts: Vec<Tweet>,
    searches: Mutex<Vec<Continuation>>,
}

impl Timeline {
    fn new(n: u64) -> Self {
        let posts = (0..n)
            .rev()
            .map(|i| Tweet::new((1_000 + i).to_string(), format!("voter{i}"), "catalandao"))
            .collect();
        Self {
            posts,
            searches: Mutex::new(Vec::new()),
        }
    }
}

#[async_trait]
impl SocialPlatform for Timeline {
    async fn search_conversation(
        &self,
        query: &ConversationQuery,
    ) -> Result<ConversationPage, SocialError> {
        self.searches.lock().unwrap().push(query.continuation.clone());
        let until = match &query.continuation {
            Continuation::Until(id) => Some(id.parse::<u64>().unwrap()),
            _ => None,
        };
        let posts: Vec<Tweet> = self
            .posts
            .iter()
            .filter(|p| until.is_none_or(|u| p.id.parse::<u64>().unwrap() < u))
            .take(query.page_size() as usize)
            .cloned()
            .collect();
        Ok(page(posts, None))
    }

    async fn lookup_users(&self, _ids: &[String]) -> Result<Vec<User>, SocialError> {
        Ok(Vec::new())
    }
}

#[tokio::test]
async fn until_id_mode_walks_back_through_the_whole_conversation() {
    let timeline = Timeline::new(150);
    let request = ScanRequest::new("1", 100).with_pagination(PaginationMode::UntilId);

    let out = scan(&timeline, &request, "catalandao", "dataverse")
        .await
        .unwrap();

    assert_eq!(out.voters.first.len(), 150);
    assert_eq!(out.posts, 150);
    assert_eq!(
        *timeline.searches.lock().unwrap(),
        vec![Continuation::Start, Continuation::Until("1050".into())]
    );
}

#[tokio::test]
async fn until_id_mode_stops_on_an_empty_page() {
    let timeline = Timeline::new(200);
    let request = ScanRequest::new("1", 100).with_pagination(PaginationMode::UntilId);

    let out = scan(&timeline, &request, "catalandao", "dataverse")
        .await
        .unwrap();

    assert_eq!(out.voters.first.len(), 200);
    assert_eq!(out.pages, 3);
    assert_eq!(
        timeline.searches.lock().unwrap().last(),
        Some(&Continuation::Until("1000".into()))
    );
}

#[tokio::test]
async fn until_id_mode_stops_when_watermark_does_not_move() {
    let stuck = || posts("", 10, "dataverse");
    let platform = FakePlatform::with_pages(vec![
        page(stuck(), None),
        page(stuck(), None),
        page(stuck(), None),
    ]);
    let request = ScanRequest::new("1", 10).with_pagination(PaginationMode::UntilId);

    let out = scan(&platform, &request, "catalandao", "dataverse")
        .await
        .unwrap();

    let calls = platform.search_calls();
    assert_eq!(calls.len(), 2);
    assert_eq!(calls[1].0, Continuation::Until("0".into()));
    assert_eq!(out.voters.second.len(), 10);
}

#[tokio::test]
async fn repeat_authors_across_pages_are_counted_once() {
    let repeat = |id: &str, text: &str| Tweet::new(id, "same-author", text);
    let mut first = posts("a", 9, "noise");
    first.push(repeat("a-x", "catalandao"));
    let platform = FakePlatform::with_pages(vec![
        page(first, Some("t1")),
        page(vec![repeat("b-x", "dataverse"), repeat("b-y", "catalandao")], None),
    ]);

    let out = scan(&platform, &ScanRequest::new("1", 10), "catalandao", "dataverse")
        .await
        .unwrap();

    assert_eq!(out.voters.first, vec!["same-author"]);
    assert!(out.voters.second.is_empty());
}
