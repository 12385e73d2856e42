use sitescore::handlers::*;
use sitescore::extract_url_path;
use sitescore_core::scoring::IssueKey;
use std::io::Write;
use std::time::Duration;
use tempfile::NamedTempFile;

#[test]
fn test_parse_url_line_with_scheme() {
    let result = parse_url_line("https://example.com");
    assert_eq!(result, Some("https://example.com".to_string()));

    let result = parse_url_line("http://example.com/blog");
    assert_eq!(result, Some("http://example.com/blog".to_string()));
}

#[test]
fn test_parse_url_line_without_scheme() {
    let result = parse_url_line("example.com");
    assert_eq!(result, Some("https://example.com".to_string()));
}

#[test]
fn test_parse_url_line_host_and_port() {
    let result = parse_url_line("localhost:8080");
    assert_eq!(result, Some("https://localhost:8080".to_string()));
}

#[test]
fn test_parse_url_line_invalid() {
    assert_eq!(parse_url_line("not a valid url!!!"), None);
    assert_eq!(parse_url_line("   "), None);
}

#[test]
fn test_extract_url_path() {
    assert_eq!(extract_url_path("https://example.com/api/users"), "/api/users");
    assert_eq!(extract_url_path("https://example.com/"), "/");
    assert_eq!(extract_url_path("https://example.com"), "/");
}

#[test]
fn test_load_weights_partial_override() -> Result<(), Box<dyn std::error::Error>> {
    let mut temp_file = NamedTempFile::new()?;
    writeln!(
        temp_file,
        r#"{{"site_score_scale": 0.7, "weights": {{"missing_title": -10, "orphan_page": -1}}}}"#
    )?;

    let config = load_weights(temp_file.path())?;

    assert_eq!(config.site_score_scale, 0.7);
    assert_eq!(config.base_score, 100);
    assert_eq!(config.score_floor, 20);
    assert_eq!(config.weight(IssueKey::MissingTitle), -10);
    assert_eq!(config.weight(IssueKey::OrphanPage), -1);
    assert_eq!(config.weight(IssueKey::NotHttps), -15);
    Ok(())
}

#[test]
fn test_load_weights_rejects_bad_files() {
    let mut garbage = NamedTempFile::new().unwrap();
    writeln!(garbage, "not json").unwrap();
    assert!(load_weights(garbage.path()).is_err());

    let mut unknown_key = NamedTempFile::new().unwrap();
    writeln!(unknown_key, r#"{{"weights": {{"made_up_issue": -3}}}}"#).unwrap();
    assert!(load_weights(unknown_key.path()).is_err());

    let mut inverted = NamedTempFile::new().unwrap();
    writeln!(inverted, r#"{{"base_score": 10, "score_floor": 50}}"#).unwrap();
    let err = load_weights(inverted.path()).unwrap_err();
    assert!(err.to_string().contains("score_floor"));
}

#[test]
fn test_load_weights_missing_file() {
    let dir = tempfile::tempdir().unwrap();
    let err = load_weights(&dir.path().join("nope.json")).unwrap_err();
    assert!(err.to_string().contains("Failed to read weights file"));
}

#[test]
fn test_crawl_config_from_args() {
    let cmd = clap::Command::new("audit")
        .arg(clap::arg!(--"max-pages" <N>).value_parser(clap::value_parser!(usize)))
        .arg(clap::arg!(--"threads" <N>).value_parser(clap::value_parser!(usize)))
        .arg(clap::arg!(--"rps" <N>).value_parser(clap::value_parser!(u32)))
        .arg(clap::arg!(--"timeout" <SECS>).value_parser(clap::value_parser!(u64)))
        .arg(clap::arg!(--"ignore-robots"));

    let matches = cmd
        .try_get_matches_from([
            "audit",
            "--max-pages",
            "5",
            "--threads",
            "0",
            "--rps",
            "7",
            "--timeout",
            "3",
            "--ignore-robots",
        ])
        .unwrap();

    let config = crawl_config_from_args(&matches);
    assert_eq!(config.max_pages, 5);
    assert_eq!(config.concurrency, 1);
    assert_eq!(config.requests_per_second, 7);
    assert_eq!(config.request_timeout, Duration::from_secs(3));
    assert!(!config.respect_robots);
}
