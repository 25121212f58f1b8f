use anyhow::{Result, bail};
use tally_common::observability::LogConfig;
use tally_config::{LoggingConfig, Pagination, TallyConfig};
use tally_core::{Category, PaginationMode, RatePolicy, ScanRequest, TallyPlan, TimeWindow};

pub fn log_config(logging: &LoggingConfig) -> LogConfig {
    LogConfig {
        app_name: "tally",
        log_dir: logging.dir.clone(),
        emit_stderr: logging.stderr,
        format: logging.format,
        default_filter: logging.filter.clone(),
    }
}

fn pagination(p: Pagination) -> PaginationMode {
    match p {
        Pagination::NextToken => PaginationMode::NextToken,
        Pagination::UntilId => PaginationMode::UntilId,
    }
}

/// Translate merged configuration plus the parsed window into a run plan.
pub fn build_plan(cfg: &TallyConfig, window: &TimeWindow) -> Result<TallyPlan> {
    let [a, b] = cfg.scan.categories.as_slice() else {
        bail!(
            "expected exactly two keyword categories, found {}",
            cfg.scan.categories.len()
        );
    };

    let scan = ScanRequest::new(cfg.scan.conversation_id.clone(), cfg.scan.page_size)
        .with_pagination(pagination(cfg.scan.pagination))
        .with_window(window)?;

    Ok(TallyPlan {
        scan,
        categories: [
            Category::new(&a.keyword, &a.label, a.valid_label()),
            Category::new(&b.keyword, &b.label, b.valid_label()),
        ],
        threshold: cfg.verify.threshold,
        batch_size: cfg.verify.batch_size,
        rate: RatePolicy {
            qps: cfg.verify.rate.qps,
            burst: cfg.verify.rate.burst,
        },
    })
}
