use anyhow::{Context, Result};
use clap::Parser;
use std::io::Write;
use std::time::Duration;
use tally_common::observability::init_logging;
use tally_core::{TallyError, TimeWindow, run};
use tally_social::twitter::TwitterApi;

mod cli;
mod plan;

use cli::Args;

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    let args = Args::parse();

    // 1) Config: file, then env, then flags
    let mut cfg = args.load_config()?;
    args.apply(&mut cfg);

    let log_path = init_logging(plan::log_config(&cfg.logging))?;
    tracing::debug!(log = %log_path.display(), "logging initialised");

    // 2) Everything that can fail locally fails before the first request
    let window = TimeWindow::from_flags(args.start_date.as_deref(), args.end_date.as_deref())?;
    let token = cfg
        .twitter
        .bearer_token()
        .context("no bearer token: pass --token, set TWITTER_BEARER_TOKEN or twitter.bearer_token")?
        .to_string();
    let plan = plan::build_plan(&cfg, &window)?;

    let client = TwitterApi::with_base_url(&cfg.twitter.base_url, token)?
        .with_timeout(Duration::from_secs(cfg.twitter.timeout_secs));

    tracing::info!(
        conversation_id = %plan.scan.conversation_id(),
        threshold = plan.threshold,
        qps = plan.rate.qps,
        burst = plan.rate.burst,
        windowed = !window.is_unbounded(),
        "tally.start"
    );

    // 3) Run; stdout only ever carries the report lines
    let stdout = std::io::stdout();
    let mut out = stdout.lock();
    match run(&client, &plan, &mut out).await {
        Ok(report) => {
            tracing::info!(
                pages = report.pages,
                posts = report.posts,
                found = ?report.found,
                valid = ?report.valid,
                "tally.done"
            );
            Ok(())
        }
        Err(err) => {
            let _ = out.flush();
            log_partial(&err);
            Err(err.into())
        }
    }
}

fn log_partial(err: &TallyError) {
    match err {
        TallyError::Scan(scan) => tracing::error!(
            pages = scan.pages,
            first = scan.partial.first.len(),
            second = scan.partial.second.len(),
            error = %scan.source,
            "scan aborted"
        ),
        TallyError::Verify {
            label,
            completed,
            source,
        } => tracing::error!(
            category = %label,
            completed = ?completed,
            batches = source.batches_completed,
            qualifying_so_far = source.qualifying_so_far,
            error = %source.source,
            "verification aborted"
        ),
        TallyError::Output(e) => tracing::error!(error = %e, "report write failed"),
    }
}
