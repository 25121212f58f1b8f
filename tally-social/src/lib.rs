//! Social platform access for the tally pipeline.
//!
//! [`SocialPlatform`] is the seam the scanner and verifier are written
//! against: one paginated conversation search and one batched user lookup.
//! [`twitter::TwitterApi`] is the production implementation; tests plug in
//! in-memory fakes.
//!
//! Pagination is explicit. A page either carries a [`Cursor`] or it does not,
//! and an empty token from the server normalizes to "no more pages".
use async_trait::async_trait;
use tally_http::HttpError;
use time::OffsetDateTime;

pub mod twitter;

pub use twitter::types::{Tweet, User};

/// Bounds imposed by the recent-search endpoint on `max_results`.
pub const MIN_PAGE_SIZE: u32 = 10;
pub const MAX_PAGE_SIZE: u32 = 100;
/// Most ids a single user lookup accepts.
pub const MAX_LOOKUP_IDS: usize = 100;

#[derive(thiserror::Error, Debug)]
pub enum SocialError {
    #[error(transparent)]
    Http(#[from] HttpError),

    #[error("invalid request: {0}")]
    InvalidRequest(String),
}

/// Opaque continuation token returned by a paginated endpoint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Cursor(String);

impl Cursor {
    /// `None` and `Some("")` both mean the listing is exhausted.
    ///
    /// ```
    /// use tally_social::Cursor;
    ///
    /// assert!(Cursor::from_token(None).is_none());
    /// assert!(Cursor::from_token(Some(String::new())).is_none());
    /// assert_eq!(Cursor::from_token(Some("abc".into())).unwrap().as_str(), "abc");
    /// ```
    pub fn from_token(token: Option<String>) -> Option<Self> {
        token.filter(|t| !t.is_empty()).map(Cursor)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// Where the next search request resumes from.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum Continuation {
    #[default]
    Start,
    /// Server supplied `next_token`, passed back verbatim.
    Token(Cursor),
    /// `until_id` watermark: the oldest post id seen so far. Search returns
    /// newest first, so this walks backwards through the conversation.
    Until(String),
}

#[derive(Debug, Clone)]
pub struct ConversationQuery {
    pub conversation_id: String,
    page_size: u32,
    pub continuation: Continuation,
    pub start_time: Option<OffsetDateTime>,
    pub end_time: Option<OffsetDateTime>,
}

impl ConversationQuery {
    /// `page_size` is clamped into the endpoint's accepted range.
    ///
    /// ```
    /// use tally_social::ConversationQuery;
    ///
    /// assert_eq!(ConversationQuery::new("1", 500).page_size(), 100);
    /// assert_eq!(ConversationQuery::new("1", 0).page_size(), 10);
    /// ```
    pub fn new(conversation_id: impl Into<String>, page_size: u32) -> Self {
        Self {
            conversation_id: conversation_id.into(),
            page_size: page_size.clamp(MIN_PAGE_SIZE, MAX_PAGE_SIZE),
            continuation: Continuation::Start,
            start_time: None,
            end_time: None,
        }
    }

    pub fn with_window(
        mut self,
        start_time: Option<OffsetDateTime>,
        end_time: Option<OffsetDateTime>,
    ) -> Self {
        self.start_time = start_time;
        self.end_time = end_time;
        self
    }

    pub fn page_size(&self) -> u32 {
        self.page_size
    }

    /// Search expression selecting every post of the conversation.
    pub fn search_expression(&self) -> String {
        format!("conversation_id:{}", self.conversation_id)
    }
}

#[derive(Debug, Clone, Default)]
pub struct ConversationPage {
    pub posts: Vec<Tweet>,
    pub next: Option<Cursor>,
    /// Count reported by the server; falls back to `posts.len()`.
    pub result_count: usize,
}

#[async_trait]
pub trait SocialPlatform: Send + Sync {
    /// Fetch one page of posts belonging to a conversation.
    async fn search_conversation(
        &self,
        query: &ConversationQuery,
    ) -> Result<ConversationPage, SocialError>;

    /// Resolve up to [`MAX_LOOKUP_IDS`] users with their public metrics.
    async fn lookup_users(&self, ids: &[String]) -> Result<Vec<User>, SocialError>;
}
