//! Conversation voter tally.
//!
//! Two sequential stages run against a [`tally_social::SocialPlatform`]:
//!
//! 1. [`scanner`] pages through a conversation and sorts authors into two
//!    keyword categories, each author counted at most once.
//! 2. [`verifier`] looks those authors up in rate-limited batches and counts
//!    the ones whose follower count meets a threshold.
//!
//! [`tally::run`] wires both stages together and writes the report lines.
pub mod rate;
pub mod scanner;
pub mod tally;
pub mod verifier;
pub mod window;

pub use rate::{RateLimiter, RatePolicy};
pub use scanner::{scan, PaginationMode, ScanError, ScanOutcome, ScanRequest, ScanSession, VoterSets};
pub use tally::{run, Category, TallyError, TallyPlan, TallyReport};
pub use verifier::{FollowerVerifier, Verification, VerifyError};
pub use window::{TimeWindow, WindowError};
