//! CLI argument parsing module
//!
//! The command line is a thin consumer of the library's query interface;
//! it builds specs and options, runs the batch query, and renders.

use clap::{Arg, ArgMatches, Command};
use log::error;

use crate::config::{BatchOptions, Browser, QueryOptions};
use crate::cookie::{CookieSpec, ExportedCookie, WILDCARD};
use crate::error::{CrumbError, Result};
use crate::exit_code::{exit_code_for_error, FOUND, NO_RECORDS};
use crate::platform;

/// Main entry point for the CLI application
pub fn run() {
    let app = create_app();
    let matches = app.get_matches();

    match run_with_args(&matches) {
        Ok(found) => {
            std::process::exit(if found { FOUND } else { NO_RECORDS });
        }
        Err(e) => {
            error!("query failed: {}", e);
            eprintln!("crumb: {}", e);
            std::process::exit(exit_code_for_error(&e));
        }
    }
}

fn run_with_args(matches: &ArgMatches) -> Result<bool> {
    let specs = build_specs_from_args(matches)?;
    let options = build_options_from_args(matches)?;
    let as_json = matches
        .get_one::<String>("output")
        .map(String::as_str)
        == Some("json");

    let rt = tokio::runtime::Runtime::new()
        .map_err(|e| CrumbError::Config(format!("Failed to create async runtime: {}", e)))?;
    let cookies = rt.block_on(crate::query_all(&specs, &options))?;

    render(&cookies, as_json)?;
    Ok(!cookies.is_empty())
}

fn render(cookies: &[ExportedCookie], as_json: bool) -> Result<()> {
    if as_json {
        println!("{}", serde_json::to_string_pretty(cookies)?);
    } else {
        for cookie in cookies {
            println!("{}", cookie.value);
        }
    }
    Ok(())
}

/// Create the CLI application structure
fn create_app() -> Command {
    Command::new("crumb")
        .version(crate::VERSION)
        .about("Extract and decrypt cookies from locally installed browsers")
        .arg(
            Arg::new("name")
                .help("Cookie name to look up ('%' matches any)")
                .required_unless_present("all")
                .index(1),
        )
        .arg(
            Arg::new("domain")
                .short('d')
                .long("domain")
                .value_name("DOMAIN")
                .help("Domain pattern; matches the host and its subdomains")
                .conflicts_with("url"),
        )
        .arg(
            Arg::new("url")
                .short('u')
                .long("url")
                .value_name("URL")
                .help("Derive domain patterns from a URL, host first"),
        )
        .arg(
            Arg::new("browser")
                .short('b')
                .long("browser")
                .value_name("BROWSER")
                .help("Only read this browser (chrome, firefox, safari, ...)"),
        )
        .arg(
            Arg::new("store")
                .long("store")
                .value_name("FILE")
                .help("Read this store file instead of discovering profiles"),
        )
        .arg(
            Arg::new("profile")
                .short('p')
                .long("profile")
                .value_name("NAME")
                .help("Only read stores from this profile"),
        )
        .arg(
            Arg::new("force")
                .short('f')
                .long("force")
                .help("Close a browser that holds its store locked")
                .action(clap::ArgAction::SetTrue),
        )
        .arg(
            Arg::new("all")
                .long("all")
                .help("Dump every record instead of filtering by spec")
                .action(clap::ArgAction::SetTrue),
        )
        .arg(
            Arg::new("include-expired")
                .long("include-expired")
                .help("Keep records whose expiry has passed")
                .action(clap::ArgAction::SetTrue),
        )
        .arg(
            Arg::new("no-dedup")
                .long("no-dedup")
                .help("Keep duplicate (name, domain) records")
                .action(clap::ArgAction::SetTrue),
        )
        .arg(
            Arg::new("strict")
                .long("strict")
                .help("Fail on the first store or browser error")
                .action(clap::ArgAction::SetTrue),
        )
        .arg(
            Arg::new("concurrency")
                .long("concurrency")
                .value_name("N")
                .help("Concurrently processed specs")
                .default_value("4"),
        )
        .arg(
            Arg::new("output")
                .short('o')
                .long("output")
                .value_name("FORMAT")
                .value_parser(["value", "json"])
                .default_value("value")
                .help("Output format"),
        )
}

fn build_specs_from_args(matches: &ArgMatches) -> Result<Vec<CookieSpec>> {
    let name = matches
        .get_one::<String>("name")
        .cloned()
        .unwrap_or_else(|| WILDCARD.to_string());

    if let Some(url) = matches.get_one::<String>("url") {
        return CookieSpec::for_url(name, url);
    }

    let domain = matches
        .get_one::<String>("domain")
        .cloned()
        .unwrap_or_else(|| WILDCARD.to_string());
    Ok(vec![CookieSpec::new(name, domain)])
}

fn build_options_from_args(matches: &ArgMatches) -> Result<BatchOptions> {
    let browser = match matches.get_one::<String>("browser") {
        Some(value) => Some(value.parse::<Browser>().map_err(|_| {
            CrumbError::Config(format!("Unsupported browser: {}", value))
        })?),
        None => None,
    };

    let store = match matches.get_one::<String>("store") {
        Some(path) => Some(platform::expand_path(path)?),
        None => None,
    };

    let concurrency = matches
        .get_one::<String>("concurrency")
        .map(String::as_str)
        .unwrap_or("4")
        .parse::<usize>()
        .map_err(|_| CrumbError::Config("Invalid concurrency value".to_string()))?;

    Ok(BatchOptions {
        query: QueryOptions {
            store,
            browser,
            profile: matches.get_one::<String>("profile").cloned(),
            force: matches.get_flag("force"),
            include_expired: matches.get_flag("include-expired"),
            include_all: matches.get_flag("all"),
        },
        deduplicate: !matches.get_flag("no-dedup"),
        continue_on_error: !matches.get_flag("strict"),
        concurrency,
    })
}

#[cfg(test)]
mod tests {
    use super::{build_options_from_args, build_specs_from_args, create_app};
    use crate::config::Browser;

    fn matches_from(args: &[&str]) -> clap::ArgMatches {
        create_app().try_get_matches_from(args).expect("matches")
    }

    #[test]
    fn specs_default_to_wildcard_domain() {
        let matches = matches_from(&["crumb", "sid"]);
        let specs = build_specs_from_args(&matches).expect("specs");
        assert_eq!(specs.len(), 1);
        assert_eq!(specs[0].name, "sid");
        assert_eq!(specs[0].domain, "%");
    }

    #[test]
    fn url_expands_into_ordered_specs() {
        let matches = matches_from(&["crumb", "sid", "--url", "https://api.example.com/v1"]);
        let specs = build_specs_from_args(&matches).expect("specs");
        let domains: Vec<&str> = specs.iter().map(|s| s.domain.as_str()).collect();
        assert_eq!(domains, ["api.example.com", "example.com"]);
    }

    #[test]
    fn all_flag_releases_the_name_requirement() {
        let matches = matches_from(&["crumb", "--all"]);
        let specs = build_specs_from_args(&matches).expect("specs");
        assert_eq!(specs[0].name, "%");
        let options = build_options_from_args(&matches).expect("options");
        assert!(options.query.include_all);
    }

    #[test]
    fn name_is_required_without_all() {
        assert!(create_app().try_get_matches_from(["crumb"]).is_err());
    }

    #[test]
    fn browser_filter_parses() {
        let matches = matches_from(&["crumb", "sid", "-b", "firefox"]);
        let options = build_options_from_args(&matches).expect("options");
        assert_eq!(options.query.browser, Some(Browser::Firefox));

        let matches = matches_from(&["crumb", "sid", "-b", "netscape"]);
        assert!(build_options_from_args(&matches).is_err());
    }

    #[test]
    fn strict_and_no_dedup_invert_batch_defaults() {
        let matches = matches_from(&["crumb", "sid", "--strict", "--no-dedup"]);
        let options = build_options_from_args(&matches).expect("options");
        assert!(!options.continue_on_error);
        assert!(!options.deduplicate);
    }

    #[test]
    fn domain_conflicts_with_url() {
        assert!(create_app()
            .try_get_matches_from(["crumb", "sid", "-d", "x.com", "-u", "http://x.com"])
            .is_err());
    }
}
