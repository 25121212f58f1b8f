//! Conversation scan: walks every page of a conversation and sorts authors
//! into two keyword categories.
//!
//! An author is counted once across both categories. The first keyword wins
//! when a post mentions both, and a post that matches neither keyword leaves
//! its author free to be classified by a later post.
use crate::window::{TimeWindow, WindowError};
use std::collections::HashSet;
use tally_social::{Continuation, ConversationQuery, SocialError, SocialPlatform, Tweet};

/// Case-insensitive substring matcher for one keyword.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeywordMatcher {
    needle: String,
}

impl KeywordMatcher {
    pub fn new(keyword: &str) -> Self {
        Self {
            needle: keyword.to_lowercase(),
        }
    }

    /// `text` must already be lower-cased.
    fn matches_lowered(&self, text: &str) -> bool {
        text.contains(&self.needle)
    }

    pub fn matches(&self, text: &str) -> bool {
        self.matches_lowered(&text.to_lowercase())
    }
}

/// How the scan advances from one page to the next.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum PaginationMode {
    /// Thread the server's `next_token` back verbatim.
    #[default]
    NextToken,
    /// Walk backwards with the oldest id seen as an `until_id` watermark.
    UntilId,
}

/// Author ids per category, in first-seen order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct VoterSets {
    pub first: Vec<String>,
    pub second: Vec<String>,
}

impl VoterSets {
    pub fn total(&self) -> usize {
        self.first.len() + self.second.len()
    }
}

/// Accumulators for a single scan; owned by the caller of [`scan`].
#[derive(Debug)]
pub struct ScanSession {
    first: KeywordMatcher,
    second: KeywordMatcher,
    seen: HashSet<String>,
    voters: VoterSets,
    pages: usize,
    posts: usize,
}

impl ScanSession {
    pub fn new(keyword_a: &str, keyword_b: &str) -> Self {
        Self {
            first: KeywordMatcher::new(keyword_a),
            second: KeywordMatcher::new(keyword_b),
            seen: HashSet::new(),
            voters: VoterSets::default(),
            pages: 0,
            posts: 0,
        }
    }

    /// Classify every post of one page.
    pub fn absorb(&mut self, posts: &[Tweet]) {
        self.pages += 1;
        self.posts += posts.len();

        for post in posts {
            let Some(author) = post.author_id.as_deref() else {
                tracing::trace!(post_id = %post.id, "post without author_id skipped");
                continue;
            };
            if self.seen.contains(author) {
                continue;
            }

            let text = post.text.to_lowercase();
            let bucket = if self.first.matches_lowered(&text) {
                &mut self.voters.first
            } else if self.second.matches_lowered(&text) {
                &mut self.voters.second
            } else {
                continue;
            };
            bucket.push(author.to_string());
            self.seen.insert(author.to_string());
        }
    }

    pub fn voters(&self) -> &VoterSets {
        &self.voters
    }

    pub fn pages(&self) -> usize {
        self.pages
    }

    pub fn finish(self) -> ScanOutcome {
        ScanOutcome {
            voters: self.voters,
            pages: self.pages,
            posts: self.posts,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ScanOutcome {
    pub voters: VoterSets,
    pub pages: usize,
    pub posts: usize,
}

#[derive(thiserror::Error, Debug)]
#[error("conversation scan failed after {pages} page(s): {source}")]
pub struct ScanError {
    pub pages: usize,
    /// Voters collected from the pages that did succeed.
    pub partial: VoterSets,
    #[source]
    pub source: SocialError,
}

/// Post ids are decimal snowflakes: a shorter id is older, equal lengths
/// compare by digits.
fn older(a: &str, b: &str) -> bool {
    (a.len(), a) < (b.len(), b)
}

fn oldest_id(posts: &[Tweet]) -> Option<&str> {
    posts
        .iter()
        .map(|p| p.id.as_str())
        .reduce(|acc, id| if older(id, acc) { id } else { acc })
}

/// Everything needed to walk one conversation.
#[derive(Debug, Clone)]
pub struct ScanRequest {
    query: ConversationQuery,
    pagination: PaginationMode,
}

impl ScanRequest {
    pub fn new(conversation_id: impl Into<String>, page_size: u32) -> Self {
        Self {
            query: ConversationQuery::new(conversation_id, page_size),
            pagination: PaginationMode::default(),
        }
    }

    pub fn with_pagination(mut self, pagination: PaginationMode) -> Self {
        self.pagination = pagination;
        self
    }

    pub fn with_window(mut self, window: &TimeWindow) -> Result<Self, WindowError> {
        let (start, end) = window.to_offsets()?;
        self.query = self.query.with_window(start, end);
        Ok(self)
    }

    pub fn conversation_id(&self) -> &str {
        &self.query.conversation_id
    }

    /// Page size after clamping to what the endpoint accepts.
    pub fn page_size(&self) -> u32 {
        self.query.page_size()
    }

    pub fn pagination(&self) -> PaginationMode {
        self.pagination
    }
}

/// Walk every page of the conversation and collect voters for both keywords.
///
/// Stops when the server hands back no continuation, or when a page comes
/// back shorter than requested. Recent search may under-fill a page and still
/// send a `next_token`; posts behind such a page are not fetched.
pub async fn scan<C>(
    client: &C,
    request: &ScanRequest,
    keyword_a: &str,
    keyword_b: &str,
) -> Result<ScanOutcome, ScanError>
where
    C: SocialPlatform + ?Sized,
{
    let mut session = ScanSession::new(keyword_a, keyword_b);
    let mut query = request.query.clone();
    let page_size = query.page_size() as usize;

    loop {
        let page = match client.search_conversation(&query).await {
            Ok(page) => page,
            Err(source) => {
                return Err(ScanError {
                    pages: session.pages(),
                    partial: session.finish().voters,
                    source,
                });
            }
        };

        let fetched = page.posts.len();
        session.absorb(&page.posts);
        tracing::debug!(
            page = session.pages(),
            fetched,
            result_count = page.result_count,
            first = session.voters().first.len(),
            second = session.voters().second.len(),
            "scan.page"
        );

        if fetched < page_size {
            break;
        }
        query.continuation = match request.pagination {
            PaginationMode::NextToken => match page.next {
                Some(cursor) => Continuation::Token(cursor),
                None => break,
            },
            PaginationMode::UntilId => {
                let before = match &query.continuation {
                    Continuation::Until(id) => Some(id.as_str()),
                    _ => None,
                };
                match oldest_id(&page.posts) {
                    Some(id) if before.is_none_or(|b| older(id, b)) => {
                        Continuation::Until(id.to_string())
                    }
                    // Watermark did not move; another request would loop.
                    _ => break,
                }
            }
        };
    }

    let outcome = session.finish();
    tracing::info!(
        conversation_id = %request.conversation_id(),
        pages = outcome.pages,
        posts = outcome.posts,
        first = outcome.voters.first.len(),
        second = outcome.voters.second.len(),
        "scan.done"
    );
    Ok(outcome)
}
