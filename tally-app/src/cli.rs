use clap::Parser;
use std::path::PathBuf;
use tally_config::{ConfigError, TallyConfig, TallyConfigLoader};
use tally_core::window::FLAG_LAYOUT;

const DEFAULT_CONFIG_FILE: &str = "tally.yaml";

#[derive(Parser, Debug)]
#[command(name = "tally")]
#[command(about = "Count keyword voters in a Twitter conversation and check their follower counts")]
pub struct Args {
    /// Twitter API bearer token
    #[arg(long, env = "TWITTER_BEARER_TOKEN", hide_env_values = true)]
    pub token: Option<String>,

    /// Conversation id to scan
    #[arg(long)]
    pub id: Option<String>,

    /// Minimum follower count for a valid voter
    #[arg(long)]
    pub threshold: Option<u64>,

    #[arg(long, value_name = "TIME", help = format!("Window start, e.g. \"{FLAG_LAYOUT}\""))]
    pub start_date: Option<String>,

    #[arg(long, value_name = "TIME", help = format!("Window end, e.g. \"{FLAG_LAYOUT}\""))]
    pub end_date: Option<String>,

    /// YAML config file (defaults to ./tally.yaml when present)
    #[arg(long, value_name = "PATH")]
    pub config: Option<PathBuf>,
}

impl Args {
    pub fn load_config(&self) -> Result<TallyConfig, ConfigError> {
        let loader = match &self.config {
            Some(path) => TallyConfigLoader::new().with_file(path),
            None => TallyConfigLoader::new().with_optional_file(DEFAULT_CONFIG_FILE),
        };
        loader.load()
    }

    /// Flags win over everything loaded from file or environment.
    pub fn apply(&self, cfg: &mut TallyConfig) {
        if let Some(token) = &self.token {
            cfg.twitter.bearer_token = Some(token.clone());
        }
        if let Some(id) = &self.id {
            cfg.scan.conversation_id = id.clone();
        }
        if let Some(threshold) = self.threshold {
            cfg.verify.threshold = threshold;
        }
    }
}
