mod common;

use common::FakePlatform;
use std::time::Duration;
use tally_core::{FollowerVerifier, RatePolicy};
use tokio::time::Instant;

fn ids(n: usize) -> Vec<String> {
    (0..n).map(|i| format!("u{i}")).collect()
}

#[tokio::test(start_paused = true)]
async fn issues_ceil_n_over_batch_size_lookups() {
    for (n, expected) in [(0, 0), (1, 1), (50, 1), (51, 2), (120, 3)] {
        let platform = FakePlatform::default();
        let mut verifier = FollowerVerifier::new(&platform, 50, RatePolicy::ONE_PER_SECOND);

        let result = verifier.count_qualifying(&ids(n), 0).await.unwrap();

        let calls = platform.lookup_calls();
        assert_eq!(calls.len(), expected, "n={n}");
        assert_eq!(result.batches, expected);
        assert!(calls.iter().all(|b| b.len() <= 50));
        assert_eq!(calls.concat(), ids(n), "ids are submitted in order");
    }
}

#[tokio::test(start_paused = true)]
async fn threshold_boundary_counts() {
    let platform = FakePlatform::default()
        .follower("u0", 9)
        .follower("u1", 10)
        .follower("u2", 11);
    let mut verifier = FollowerVerifier::new(&platform, 50, RatePolicy::ONE_PER_SECOND);

    let result = verifier.count_qualifying(&ids(3), 10).await.unwrap();

    assert_eq!(result.qualifying, 2);
    assert_eq!(result.resolved, 3);
}

#[tokio::test(start_paused = true)]
async fn batches_are_spaced_by_the_rate_limit() {
    let platform = FakePlatform::default();
    let mut verifier = FollowerVerifier::new(&platform, 50, RatePolicy::ONE_PER_SECOND);
    let t0 = Instant::now();

    verifier.count_qualifying(&ids(150), 0).await.unwrap();

    let elapsed = t0.elapsed();
    assert!(elapsed >= Duration::from_secs(2), "elapsed {elapsed:?}");
    assert!(elapsed < Duration::from_secs(3), "elapsed {elapsed:?}");
}

#[tokio::test(start_paused = true)]
async fn failure_reports_partial_progress() {
    let platform = FakePlatform::default()
        .follower("u0", 100)
        .follower("u60", 100)
        .fail_lookup_at(1);
    let mut verifier = FollowerVerifier::new(&platform, 50, RatePolicy::ONE_PER_SECOND);

    let err = verifier.count_qualifying(&ids(120), 10).await.unwrap_err();

    assert_eq!(err.batches_completed, 1);
    assert_eq!(err.qualifying_so_far, 1);
    assert_eq!(platform.lookup_calls().len(), 2, "no retry after failure");
}

#[tokio::test(start_paused = true)]
async fn oversized_batch_setting_is_capped() {
    let platform = FakePlatform::default();
    let verifier = FollowerVerifier::new(&platform, 500, RatePolicy::ONE_PER_SECOND);
    assert_eq!(verifier.batch_size(), 100);
}
