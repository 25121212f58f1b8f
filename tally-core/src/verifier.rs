//! Follower verification: batched user lookups gated by the rate limiter.
use crate::rate::{RateLimiter, RatePolicy};
use tally_social::{SocialError, SocialPlatform, User, MAX_LOOKUP_IDS};

pub const DEFAULT_BATCH_SIZE: usize = 50;

/// `true` when the user's follower count reaches the threshold.
pub fn qualifies(user: &User, threshold: u64) -> bool {
    user.followers() >= threshold
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Verification {
    pub qualifying: u64,
    pub batches: usize,
    /// Users the platform actually returned (suspended/deleted ones drop out).
    pub resolved: usize,
}

#[derive(thiserror::Error, Debug)]
#[error("follower lookup failed after {batches_completed} batch(es): {source}")]
pub struct VerifyError {
    pub batches_completed: usize,
    pub qualifying_so_far: u64,
    #[source]
    pub source: SocialError,
}

/// Counts authors meeting a follower threshold.
///
/// One verifier can serve several id lists; the rate limiter is shared, so
/// spacing between lookups holds across lists too.
pub struct FollowerVerifier<'a, C: ?Sized> {
    client: &'a C,
    batch_size: usize,
    limiter: RateLimiter,
}

impl<'a, C> FollowerVerifier<'a, C>
where
    C: SocialPlatform + ?Sized,
{
    pub fn new(client: &'a C, batch_size: usize, policy: RatePolicy) -> Self {
        Self {
            client,
            batch_size: batch_size.clamp(1, MAX_LOOKUP_IDS),
            limiter: RateLimiter::new(policy),
        }
    }

    pub fn batch_size(&self) -> usize {
        self.batch_size
    }

    pub async fn count_qualifying(
        &mut self,
        ids: &[String],
        threshold: u64,
    ) -> Result<Verification, VerifyError> {
        let mut result = Verification::default();

        for batch in ids.chunks(self.batch_size) {
            self.limiter.acquire(1).await;

            let users = self
                .client
                .lookup_users(batch)
                .await
                .map_err(|source| VerifyError {
                    batches_completed: result.batches,
                    qualifying_so_far: result.qualifying,
                    source,
                })?;

            let hits = users.iter().filter(|u| qualifies(u, threshold)).count() as u64;
            result.batches += 1;
            result.resolved += users.len();
            result.qualifying += hits;
            tracing::debug!(
                batch = result.batches,
                requested = batch.len(),
                returned = users.len(),
                hits,
                "verify.batch"
            );
        }

        tracing::info!(
            ids = ids.len(),
            batches = result.batches,
            resolved = result.resolved,
            qualifying = result.qualifying,
            threshold,
            qps = self.limiter.policy().qps,
            "verify.done"
        );
        Ok(result)
    }
}
