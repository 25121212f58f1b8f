#![allow(dead_code)]

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::{Mutex, OnceLock};
use tally_common::observability::{init_logging, LogConfig};
use tally_http::HttpError;
use tally_social::{
    Continuation, ConversationPage, ConversationQuery, Cursor, SocialError, SocialPlatform, Tweet,
    User,
};

static INIT_PATH: OnceLock<std::path::PathBuf> = OnceLock::new();

pub fn init_test_tracing() {
    let _ = INIT_PATH.get_or_init(|| {
        let config = LogConfig {
            app_name: "tally-tests",
            log_dir: Some(std::env::temp_dir().join("tally-tests")),
            default_filter: "debug".to_string(),
            ..LogConfig::default()
        };
        init_logging(config).unwrap_or_default()
    });
}

pub fn page(posts: Vec<Tweet>, next: Option<&str>) -> ConversationPage {
    ConversationPage {
        result_count: posts.len(),
        posts,
        next: Cursor::from_token(next.map(str::to_string)),
    }
}

pub fn failure(status: u16) -> SocialError {
    SocialError::Http(HttpError::Api {
        status: reqwest_status(status),
        message: "boom".into(),
        request_id: "-".into(),
    })
}

fn reqwest_status(code: u16) -> tally_http::StatusCode {
    tally_http::StatusCode::from_u16(code).expect("valid status")
}

/// In-memory platform: pages are served in call order, users resolve from a
/// follower table (unknown ids resolve with zero followers).
#[derive(Default)]
pub struct FakePlatform {
    pages: Vec<ConversationPage>,
    followers: HashMap<String, u64>,
    fail_search_at: Option<usize>,
    fail_lookup_at: Option<usize>,
    pub searches: Mutex<Vec<(Continuation, u32)>>,
    pub lookups: Mutex<Vec<Vec<String>>>,
}

impl FakePlatform {
    pub fn with_pages(pages: Vec<ConversationPage>) -> Self {
        Self {
            pages,
            ..Self::default()
        }
    }

    pub fn follower(mut self, id: &str, count: u64) -> Self {
        self.followers.insert(id.to_string(), count);
        self
    }

    /// Zero-based index of the search call that fails.
    pub fn fail_search_at(mut self, call: usize) -> Self {
        self.fail_search_at = Some(call);
        self
    }

    /// Zero-based index of the lookup call that fails.
    pub fn fail_lookup_at(mut self, call: usize) -> Self {
        self.fail_lookup_at = Some(call);
        self
    }

    pub fn search_calls(&self) -> Vec<(Continuation, u32)> {
        self.searches.lock().unwrap().clone()
    }

    pub fn lookup_calls(&self) -> Vec<Vec<String>> {
        self.lookups.lock().unwrap().clone()
    }
}

#[async_trait]
impl SocialPlatform for FakePlatform {
    async fn search_conversation(
        &self,
        query: &ConversationQuery,
    ) -> Result<ConversationPage, SocialError> {
        let mut calls = self.searches.lock().unwrap();
        let idx = calls.len();
        calls.push((query.continuation.clone(), query.page_size()));
        if self.fail_search_at == Some(idx) {
            return Err(failure(503));
        }
        Ok(self.pages.get(idx).cloned().unwrap_or_default())
    }

    async fn lookup_users(&self, ids: &[String]) -> Result<Vec<User>, SocialError> {
        let mut calls = self.lookups.lock().unwrap();
        let idx = calls.len();
        calls.push(ids.to_vec());
        if self.fail_lookup_at == Some(idx) {
            return Err(failure(429));
        }
        Ok(ids
            .iter()
            .map(|id| User::with_followers(id.clone(), *self.followers.get(id).unwrap_or(&0)))
            .collect())
    }
}
