use anyhow::{anyhow, Result};
use clap::Parser;
use std::env;

use crate::adapter::Dataset;

/// Riskcat - NFR Record Browser
///
/// Terminal UI for browsing non-financial-risk records and materializing
/// derived attributes on demand.
/// Configuration priority: CLI args > Environment variables > Defaults
#[derive(Parser, Debug)]
#[command(name = "riskcat")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "NFR Record Browser", long_about = None)]
pub struct CliArgs {
    /// Base URL of the dashboard API
    #[arg(long, env = "API_BASE_URL")]
    pub api_base_url: Option<String>,

    /// Per-request timeout in milliseconds (1000-60000)
    #[arg(long, env = "HTTP_TIMEOUT_MS")]
    pub http_timeout_ms: Option<u64>,

    /// Records per page in the paged view (1-200)
    #[arg(long, env = "PAGE_SIZE")]
    pub page_size: Option<usize>,

    /// Maximum results returned by an identifier search (1-100)
    #[arg(long, env = "SEARCH_LIMIT")]
    pub search_limit: Option<usize>,

    /// Target UI rendering FPS (1-120)
    #[arg(long, env = "RENDER_FPS")]
    pub render_fps: Option<u32>,

    /// Dataset shown at startup: controls, external-loss, internal-loss, issues
    #[arg(short, long, env = "DATASET", value_parser = clap::value_parser!(Dataset))]
    pub dataset: Option<Dataset>,

    /// Session identifier sent with every request (generated when absent)
    #[arg(long, env = "SESSION_ID")]
    pub session_id: Option<String>,

    /// User identifier sent with every request (generated when absent)
    #[arg(long, env = "USER_ID")]
    pub user_id: Option<String>,

    /// Print the resolved configuration to stderr at startup
    #[arg(long, env = "VERBOSE")]
    pub verbose: bool,
}

#[derive(Clone, Debug)]
pub struct Config {
    pub api_base_url: String,
    pub http_timeout_ms: u64,
    pub page_size: usize,
    pub search_limit: usize,
    pub render_fps: u32,
    pub dataset: Dataset,
    pub session_id: Option<String>,
    pub user_id: Option<String>,
    pub verbose: bool,
}

/// Validate that a value is within a given range (inclusive)
fn validate_in_range<T>(val: T, min: T, max: T, name: &str) -> Result<T>
where
    T: PartialOrd + std::fmt::Display + Copy,
{
    if val < min || val > max {
        Err(anyhow!("{name} must be in range [{min}, {max}], got {val}"))
    } else {
        Ok(val)
    }
}

/// Validate URL format (basic check)
fn validate_url(url: &str, name: &str) -> Result<()> {
    if url.is_empty() {
        return Err(anyhow!("{name} cannot be empty"));
    }
    if url.starts_with("http://") || url.starts_with("https://") {
        Ok(())
    } else {
        Err(anyhow!("{name} must start with http:// or https://"))
    }
}

/// Load configuration from CLI args and environment variables
/// Priority: CLI args > Environment variables > Defaults
pub fn load() -> Result<Config> {
    let args = CliArgs::parse();
    from_args(args)
}

fn from_args(args: CliArgs) -> Result<Config> {
    let api_base_url = args
        .api_base_url
        .or_else(|| env::var("API_BASE_URL").ok())
        .unwrap_or_else(|| "http://127.0.0.1:8000".to_string());
    validate_url(&api_base_url, "API_BASE_URL")?;

    let http_timeout_ms = args
        .http_timeout_ms
        .or_else(|| env::var("HTTP_TIMEOUT_MS").ok().and_then(|s| s.parse().ok()))
        .unwrap_or(8000);
    let http_timeout_ms = validate_in_range(http_timeout_ms, 1000, 60000, "HTTP_TIMEOUT_MS")?;

    let page_size = args
        .page_size
        .or_else(|| env::var("PAGE_SIZE").ok().and_then(|s| s.parse().ok()))
        .unwrap_or(20);
    let page_size = validate_in_range(page_size, 1, 200, "PAGE_SIZE")?;

    let search_limit = args
        .search_limit
        .or_else(|| env::var("SEARCH_LIMIT").ok().and_then(|s| s.parse().ok()))
        .unwrap_or(25);
    let search_limit = validate_in_range(search_limit, 1, 100, "SEARCH_LIMIT")?;

    let render_fps = args
        .render_fps
        .or_else(|| env::var("RENDER_FPS").ok().and_then(|s| s.parse().ok()))
        .unwrap_or(30);
    let render_fps = validate_in_range(render_fps, 1, 120, "RENDER_FPS")?;

    let dataset = args
        .dataset
        .or_else(|| env::var("DATASET").ok().and_then(|s| s.parse().ok()))
        .unwrap_or(Dataset::Controls);

    Ok(Config {
        api_base_url,
        http_timeout_ms,
        page_size,
        search_limit,
        render_fps,
        dataset,
        session_id: args.session_id.or_else(|| env::var("SESSION_ID").ok()),
        user_id: args.user_id.or_else(|| env::var("USER_ID").ok()),
        verbose: args.verbose,
    })
}

/// Print current configuration (useful for debugging)
impl Config {
    pub fn print_summary(&self) {
        eprintln!("Riskcat Configuration:");
        eprintln!("  API Base URL: {}", self.api_base_url);
        eprintln!("  HTTP Timeout: {}ms", self.http_timeout_ms);
        eprintln!("  Page Size: {}", self.page_size);
        eprintln!("  Search Limit: {}", self.search_limit);
        eprintln!("  Render FPS: {}", self.render_fps);
        eprintln!("  Dataset: {}", self.dataset.label());
        if self.session_id.is_some() {
            eprintln!("  Session Id: configured");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn empty_args() -> CliArgs {
        CliArgs {
            api_base_url: None,
            http_timeout_ms: None,
            page_size: None,
            search_limit: None,
            render_fps: None,
            dataset: None,
            session_id: None,
            user_id: None,
            verbose: false,
        }
    }

    #[test]
    fn cli_overrides_defaults() {
        let cfg = from_args(CliArgs {
            api_base_url: Some("https://nfr.internal:8443".into()),
            http_timeout_ms: Some(12000),
            page_size: Some(50),
            dataset: Some(Dataset::Issues),
            ..empty_args()
        })
        .unwrap();
        assert_eq!(cfg.api_base_url, "https://nfr.internal:8443");
        assert_eq!(cfg.http_timeout_ms, 12000);
        assert_eq!(cfg.page_size, 50);
        assert_eq!(cfg.dataset, Dataset::Issues);
        // Untouched settings keep their defaults
        assert_eq!(cfg.search_limit, 25);
        assert_eq!(cfg.render_fps, 30);
        assert!(!cfg.verbose);
    }

    #[test]
    fn verbose_flag_passes_through() {
        let cfg = from_args(CliArgs { verbose: true, ..empty_args() }).unwrap();
        assert!(cfg.verbose);
    }

    #[test]
    fn out_of_range_values_are_rejected() {
        assert!(from_args(CliArgs { http_timeout_ms: Some(500), ..empty_args() }).is_err());
        assert!(from_args(CliArgs { page_size: Some(0), ..empty_args() }).is_err());
        assert!(from_args(CliArgs { page_size: Some(999), ..empty_args() }).is_err());
        assert!(from_args(CliArgs { render_fps: Some(200), ..empty_args() }).is_err());
    }

    #[test]
    fn bad_base_url_is_rejected() {
        let err = from_args(CliArgs {
            api_base_url: Some("ftp://nope".into()),
            ..empty_args()
        })
        .unwrap_err();
        assert!(err.to_string().contains("API_BASE_URL"));
    }

    #[test]
    fn validate_in_range_bounds_are_inclusive() {
        assert!(validate_in_range(1000u64, 1000, 60000, "X").is_ok());
        assert!(validate_in_range(60000u64, 1000, 60000, "X").is_ok());
        assert!(validate_in_range(60001u64, 1000, 60000, "X").is_err());
    }
}
