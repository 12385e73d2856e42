use crate::CLAP_STYLING;
use clap::{arg, command};
use std::path::PathBuf;

pub(crate) fn command_argument_builder() -> clap::Command {
    clap::Command::new("sitescore")
        .version(env!("CARGO_PKG_VERSION"))
        .bin_name("sitescore")
        .styles(CLAP_STYLING)
        .arg(
            arg!(-q --"quiet" "Suppress banner and non-essential output")
                .required(false)
                .global(true),
        )
        .arg(
            arg!(-v --"verbose" "Enable debug logging")
                .required(false)
                .global(true)
                .conflicts_with("quiet"),
        )
        .subcommand_required(false)
        .subcommand(
            command!("audit")
                .about(
                    "Crawl a site politely and score every page for technical and on-page SEO \
                issues.",
                )
                .arg(
                    arg!(-u --"url" <URL>)
                        .required(true)
                        .help("The site to audit. https:// is assumed when no scheme is given"),
                )
                .arg(
                    arg!(-m --"max-pages" <N>)
                        .required(false)
                        .help("Maximum number of pages to fetch")
                        .value_parser(clap::value_parser!(usize))
                        .default_value("50"),
                )
                .arg(
                    arg!(-t --"threads" <N>)
                        .required(false)
                        .help("Number of concurrent workers")
                        .value_parser(clap::value_parser!(usize))
                        .default_value("10"),
                )
                .arg(
                    arg!(--"rps" <N>)
                        .required(false)
                        .help("Maximum requests per second across all workers")
                        .value_parser(clap::value_parser!(u32).range(1..))
                        .default_value("2"),
                )
                .arg(
                    arg!(--"timeout" <SECS>)
                        .required(false)
                        .help("Per-request timeout in seconds")
                        .value_parser(clap::value_parser!(u64).range(1..))
                        .default_value("30"),
                )
                .arg(arg!(--"ignore-robots" "Crawl pages disallowed by robots.txt").required(false))
                .arg(
                    arg!(-f --"format" <FORMAT>)
                        .required(false)
                        .help("Report format")
                        .value_parser(["text", "json"])
                        .default_value("text"),
                )
                .arg(
                    arg!(-o --"output" <PATH>)
                        .required(false)
                        .help("Write the report to a file instead of stdout")
                        .value_parser(clap::value_parser!(PathBuf)),
                )
                .arg(
                    arg!(-w --"weights" <PATH>)
                        .required(false)
                        .help("JSON file overriding scoring weights, base score, floor or scale")
                        .value_parser(clap::value_parser!(PathBuf)),
                ),
        )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_command_is_well_formed() {
        command_argument_builder().debug_assert();
    }

    #[test]
    fn test_audit_defaults() {
        let matches = command_argument_builder()
            .try_get_matches_from(["sitescore", "audit", "-u", "ex.com"])
            .unwrap();
        let (name, audit) = matches.subcommand().unwrap();
        assert_eq!(name, "audit");
        assert_eq!(audit.get_one::<usize>("max-pages"), Some(&50));
        assert_eq!(audit.get_one::<u32>("rps"), Some(&2));
        assert_eq!(audit.get_one::<String>("format").map(String::as_str), Some("text"));
        assert!(!audit.get_flag("ignore-robots"));
    }

    #[test]
    fn test_audit_requires_url() {
        assert!(command_argument_builder()
            .try_get_matches_from(["sitescore", "audit"])
            .is_err());
    }
}
