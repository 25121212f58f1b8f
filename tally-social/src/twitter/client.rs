//! Thin wrapper around the Twitter/X v2 recent-search and user-lookup APIs.
//!
//! Handles auth and request parameter shaping before delegating to the
//! shared HTTP client. Calls are never retried; callers decide what a failure
//! means for the run.
use crate::twitter::types::{ApiProblem, SearchResponse, UsersResponse};
use crate::{
    Continuation, ConversationPage, ConversationQuery, Cursor, MAX_LOOKUP_IDS, SocialError,
    SocialPlatform, User,
};
use async_trait::async_trait;
use std::borrow::Cow;
use std::time::Duration;
use tally_http::{Auth, HttpClient, RequestOpts};
use time::format_description::well_known::Rfc3339;
use time::{OffsetDateTime, UtcOffset};

pub const DEFAULT_BASE_URL: &str = "https://api.twitter.com";

const SEARCH_PATH: &str = "2/tweets/search/recent";
const USERS_PATH: &str = "2/users";
const TWEET_FIELDS: &str = "author_id,created_at,conversation_id";
const USER_FIELDS: &str = "name,public_metrics";

#[derive(Clone)]
pub struct TwitterApi {
    http: HttpClient,
    bearer: String,
}

impl TwitterApi {
    pub fn new(bearer_token: String) -> Result<Self, SocialError> {
        Self::with_base_url(DEFAULT_BASE_URL, bearer_token)
    }

    pub fn with_base_url(base: &str, bearer_token: String) -> Result<Self, SocialError> {
        let http = HttpClient::new(base)?;
        Ok(Self {
            http,
            bearer: bearer_token,
        })
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.http = self.http.with_timeout(timeout);
        self
    }

    /// One page of `GET /2/tweets/search/recent` for the conversation.
    pub async fn recent_search(
        &self,
        query: &ConversationQuery,
    ) -> Result<SearchResponse, SocialError> {
        let mut params: Vec<(&str, Cow<'_, str>)> = vec![
            ("query", query.search_expression().into()),
            ("max_results", query.page_size().to_string().into()),
            ("tweet.fields", TWEET_FIELDS.into()),
        ];

        match &query.continuation {
            Continuation::Start => {}
            Continuation::Token(cursor) => params.push(("next_token", cursor.as_str().into())),
            Continuation::Until(id) => params.push(("until_id", id.as_str().into())),
        }
        if let Some(start) = query.start_time {
            params.push(("start_time", format_timestamp(start)?.into()));
        }
        if let Some(end) = query.end_time {
            params.push(("end_time", format_timestamp(end)?.into()));
        }

        let resp: SearchResponse = self
            .http
            .get_json(
                SEARCH_PATH,
                RequestOpts {
                    auth: Some(Auth::Bearer(&self.bearer)),
                    query: Some(params),
                    ..Default::default()
                },
            )
            .await?;

        log_problems("search", resp.errors.as_deref());
        tracing::debug!(
            conversation_id = %query.conversation_id,
            returned = resp.data.as_ref().map(Vec::len).unwrap_or(0),
            next_token = ?resp.meta.as_ref().and_then(|m| m.next_token.as_deref()),
            "twitter.search.page"
        );
        Ok(resp)
    }

    /// `GET /2/users?ids=...` with follower metrics.
    pub async fn users_by_ids(&self, ids: &[String]) -> Result<UsersResponse, SocialError> {
        if ids.len() > MAX_LOOKUP_IDS {
            return Err(SocialError::InvalidRequest(format!(
                "user lookup accepts at most {MAX_LOOKUP_IDS} ids, got {}",
                ids.len()
            )));
        }

        let joined = ids.join(",");
        let params: Vec<(&str, Cow<'_, str>)> = vec![
            ("ids", joined.into()),
            ("user.fields", USER_FIELDS.into()),
        ];

        let resp: UsersResponse = self
            .http
            .get_json(
                USERS_PATH,
                RequestOpts {
                    auth: Some(Auth::Bearer(&self.bearer)),
                    query: Some(params),
                    ..Default::default()
                },
            )
            .await?;

        log_problems("users", resp.errors.as_deref());
        Ok(resp)
    }
}

#[async_trait]
impl SocialPlatform for TwitterApi {
    async fn search_conversation(
        &self,
        query: &ConversationQuery,
    ) -> Result<ConversationPage, SocialError> {
        let SearchResponse { data, meta, .. } = self.recent_search(query).await?;
        let posts = data.unwrap_or_default();
        let meta = meta.unwrap_or_default();
        Ok(ConversationPage {
            result_count: meta
                .result_count
                .map(|n| n as usize)
                .unwrap_or(posts.len()),
            next: Cursor::from_token(meta.next_token),
            posts,
        })
    }

    async fn lookup_users(&self, ids: &[String]) -> Result<Vec<User>, SocialError> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        Ok(self.users_by_ids(ids).await?.data.unwrap_or_default())
    }
}

/// RFC 3339 in UTC at whole-second precision, as the search API expects.
fn format_timestamp(ts: OffsetDateTime) -> Result<String, SocialError> {
    ts.to_offset(UtcOffset::UTC)
        .replace_nanosecond(0)
        .map_err(|e| SocialError::InvalidRequest(e.to_string()))?
        .format(&Rfc3339)
        .map_err(|e| SocialError::InvalidRequest(format!("unformattable timestamp: {e}")))
}

fn log_problems(endpoint: &str, problems: Option<&[ApiProblem]>) {
    for p in problems.unwrap_or_default() {
        tracing::debug!(
            endpoint,
            value = ?p.value,
            title = ?p.title,
            detail = ?p.detail,
            "twitter.partial_error"
        );
    }
}
