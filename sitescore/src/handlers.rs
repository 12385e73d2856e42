use anyhow::{Context, bail};
use clap::ArgMatches;
use colored::Colorize;
use sitescore_core::crawl::{AuditOptions, execute_audit};
use sitescore_core::report::{AuditReport, ReportFormat, render, save_report};
use sitescore_core::scoring::ScoringConfig;
use sitescore_scanner::CrawlConfig;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{Level, info, warn};
use url::Url;

/// Parse a single line as a URL, trying to add https:// if needed
pub fn parse_url_line(line: &str) -> Option<String> {
    let line = line.trim();
    if line.is_empty() {
        return None;
    }

    if let Ok(url) = Url::parse(line)
        && matches!(url.scheme(), "http" | "https")
        && url.host_str().is_some()
    {
        return Some(line.to_string());
    }

    let with_scheme = format!("https://{}", line);
    match Url::parse(&with_scheme) {
        Ok(url) if url.host_str().is_some_and(|h| !h.is_empty()) => Some(with_scheme),
        _ => None,
    }
}

/// Reads a scoring override file. Keys left out keep their defaults.
pub fn load_weights(path: &Path) -> anyhow::Result<ScoringConfig> {
    let content = fs::read_to_string(path)
        .with_context(|| format!("Failed to read weights file {}", path.display()))?;
    let config = ScoringConfig::from_json(&content)
        .with_context(|| format!("Invalid weights file {}", path.display()))?;

    if config.score_floor > config.base_score {
        bail!(
            "score_floor ({}) must not exceed base_score ({})",
            config.score_floor,
            config.base_score
        );
    }
    if !config.site_score_scale.is_finite() || config.site_score_scale < 0.0 {
        bail!("site_score_scale must be a non-negative number");
    }

    Ok(config)
}

pub fn crawl_config_from_args(args: &ArgMatches) -> CrawlConfig {
    let defaults = CrawlConfig::default();
    CrawlConfig::default()
        .with_max_pages(args.get_one::<usize>("max-pages").copied().unwrap_or(defaults.max_pages))
        .with_concurrency(
            args.get_one::<usize>("threads")
                .copied()
                .unwrap_or(defaults.concurrency)
                .max(1),
        )
        .with_requests_per_second(
            args.get_one::<u32>("rps")
                .copied()
                .unwrap_or(defaults.requests_per_second),
        )
        .with_request_timeout(
            args.get_one::<u64>("timeout")
                .map(|secs| Duration::from_secs(*secs))
                .unwrap_or(defaults.request_timeout),
        )
        .with_respect_robots(!args.get_flag("ignore-robots"))
}

/// Installs the fmt subscriber. Logs go to stderr so stdout stays a clean report.
pub fn init_tracing(verbose: bool, quiet: bool) {
    let level = if verbose {
        Level::DEBUG
    } else if quiet {
        Level::WARN
    } else {
        Level::INFO
    };
    let _ = tracing_subscriber::fmt()
        .with_max_level(level)
        .with_target(false)
        .with_writer(std::io::stderr)
        .try_init();
}

fn print_divider() {
    eprintln!("{}", "═".repeat(60).bright_blue().bold());
}

pub fn print_banner() {
    print_divider();
    eprintln!(
        "{}  {}",
        "  SITESCORE".bright_white().bold(),
        format!("v{}  polite SEO crawler and auditor", env!("CARGO_PKG_VERSION")).bright_black()
    );
    print_divider();
    eprintln!();
}

fn print_summary(report: &AuditReport) {
    let stats = &report.site_stats;
    eprintln!(
        "{} Audited {} pages of {} in {:.1}s",
        "✓".green().bold(),
        stats.total_pages,
        report.base_domain.bright_white(),
        report.crawl_stats.duration_secs
    );
    eprintln!(
        "{} Site score {:.2}, {} unique issues ({} occurrences)",
        "→".blue(),
        stats.average_score,
        stats.total_issues,
        stats.total_findings
    );
    if report.page_cap_reached {
        eprintln!(
            "{} Page limit reached; raise --max-pages to audit more of the site",
            "⚠".yellow().bold()
        );
    }
}

pub async fn handle_audit(args: &ArgMatches, quiet: bool) -> anyhow::Result<()> {
    let raw_url = args
        .get_one::<String>("url")
        .context("--url is required")?;
    let Some(url) = parse_url_line(raw_url) else {
        bail!("'{}' is not a valid URL", raw_url);
    };

    let format: ReportFormat = args
        .get_one::<String>("format")
        .map(|f| f.parse::<ReportFormat>())
        .transpose()
        .map_err(anyhow::Error::msg)?
        .unwrap_or(ReportFormat::Text);

    let scoring = match args.get_one::<PathBuf>("weights") {
        Some(path) => load_weights(path)?,
        None => ScoringConfig::default(),
    };
    let crawl = crawl_config_from_args(args);

    if !quiet {
        eprintln!("{} Auditing {}", "→".blue(), url.bright_white());
        eprintln!(
            "{} Max pages: {}  Workers: {}  Rate: {} req/s  robots.txt: {}",
            "→".blue(),
            crawl.max_pages,
            crawl.concurrency,
            crawl.requests_per_second,
            if crawl.respect_robots { "respected" } else { "ignored" }
        );
        eprintln!();
    }
    if !crawl.respect_robots {
        warn!("robots.txt rules will be ignored");
    }

    let token = CancellationToken::new();
    let ctrl_c_token = token.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Interrupted, finishing in-flight requests");
            ctrl_c_token.cancel();
        }
    });

    let mut options = AuditOptions::new(url);
    options.crawl = crawl;
    options.scoring = scoring;
    options.show_progress = !quiet;
    options.cancellation = Some(token);

    let report = execute_audit(options).await?;

    let output = args.get_one::<PathBuf>("output");
    let rendered = render(&report, format, output.is_none())?;

    match output {
        Some(path) => {
            save_report(&rendered, path)
                .with_context(|| format!("Failed to write report to {}", path.display()))?;
            info!("Report written to {}", path.display());
            if !quiet {
                eprintln!("{} Report saved to {}", "✓".green().bold(), path.display());
            }
        }
        None => print!("{}", rendered),
    }

    if !quiet {
        print_summary(&report);
    }

    Ok(())
}
