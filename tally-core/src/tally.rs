//! End-to-end run: scan the conversation, report raw counts, verify
//! followers for both categories, report valid counts.
use crate::rate::RatePolicy;
use crate::scanner::{scan, ScanError, ScanRequest};
use crate::verifier::{FollowerVerifier, VerifyError};
use std::io::Write;
use tally_social::SocialPlatform;

/// One keyword and the labels used when reporting it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Category {
    pub keyword: String,
    pub label: String,
    pub valid_label: String,
}

impl Category {
    pub fn new(
        keyword: impl Into<String>,
        label: impl Into<String>,
        valid_label: impl Into<String>,
    ) -> Self {
        Self {
            keyword: keyword.into(),
            label: label.into(),
            valid_label: valid_label.into(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct TallyPlan {
    pub scan: ScanRequest,
    pub categories: [Category; 2],
    pub threshold: u64,
    pub batch_size: usize,
    pub rate: RatePolicy,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TallyReport {
    pub found: [usize; 2],
    pub valid: [u64; 2],
    pub pages: usize,
    pub posts: usize,
}

#[derive(thiserror::Error, Debug)]
pub enum TallyError {
    #[error(transparent)]
    Scan(#[from] ScanError),

    #[error("verifying {label} voters: {source}")]
    Verify {
        label: String,
        /// Qualifying counts of categories that finished before the failure.
        completed: Vec<(String, u64)>,
        #[source]
        source: VerifyError,
    },

    #[error("writing report: {0}")]
    Output(#[from] std::io::Error),
}

pub fn found_line(label: &str, count: usize) -> String {
    format!("total {label} voters found: {count}")
}

pub fn valid_line(valid_label: &str, count: u64) -> String {
    format!("{valid_label} valid voters: {count}")
}

/// Run the whole tally, writing the four report lines to `out`.
///
/// Found counts are written as soon as the scan completes; valid counts only
/// once both verification passes succeed.
pub async fn run<C, W>(client: &C, plan: &TallyPlan, out: &mut W) -> Result<TallyReport, TallyError>
where
    C: SocialPlatform + ?Sized,
    W: Write,
{
    let [first, second] = &plan.categories;
    let scanned = scan(client, &plan.scan, &first.keyword, &second.keyword).await?;

    let lists = [&scanned.voters.first, &scanned.voters.second];
    let mut report = TallyReport {
        found: [lists[0].len(), lists[1].len()],
        pages: scanned.pages,
        posts: scanned.posts,
        ..TallyReport::default()
    };

    for (category, found) in plan.categories.iter().zip(report.found) {
        writeln!(out, "{}", found_line(&category.label, found))?;
    }
    out.flush()?;

    let mut verifier = FollowerVerifier::new(client, plan.batch_size, plan.rate);
    for (idx, (category, ids)) in plan.categories.iter().zip(lists).enumerate() {
        let verified = verifier
            .count_qualifying(ids, plan.threshold)
            .await
            .map_err(|source| TallyError::Verify {
                label: category.label.clone(),
                completed: plan.categories[..idx]
                    .iter()
                    .zip(report.valid)
                    .map(|(c, n)| (c.valid_label.clone(), n))
                    .collect(),
                source,
            })?;
        report.valid[idx] = verified.qualifying;
    }

    for (category, valid) in plan.categories.iter().zip(report.valid) {
        writeln!(out, "{}", valid_line(&category.valid_label, valid))?;
    }
    out.flush()?;

    Ok(report)
}
