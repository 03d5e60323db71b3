//! Builders for crawler must-match expressions that keep a crawl on its start sites.
//!
//! `regex` matches in linear time, so a plain `https?` gives the same cost
//! guarantee a possessive `https?+` would give a backtracking engine.

use std::collections::HashSet;
use url::Url;

use crate::application::policy::patterns::MATCH_ALL;

/// Expression matching every page on the hosts of `urls`, with or without `www.`.
pub fn site_filter<'a, I>(urls: I) -> String
where
    I: IntoIterator<Item = &'a Url>,
{
    join_unique(urls.into_iter().map(must_match_full_domain))
}

/// Expression matching every page below the paths of `urls`.
pub fn subpath_filter<'a, I>(urls: I) -> String
where
    I: IntoIterator<Item = &'a Url>,
{
    join_unique(urls.into_iter().map(must_match_subpath))
}

pub fn must_match_full_domain(url: &Url) -> String {
    match host_prefix(url) {
        Some(prefix) => format!("{}.*", prefix),
        None => format!("{}.*", regex::escape(url.scheme())),
    }
}

pub fn must_match_subpath(url: &Url) -> String {
    match host_prefix(url) {
        Some(prefix) => format!("{}{}.*", prefix, regex::escape(url.path())),
        None => format!("{}.*", regex::escape(url.scheme())),
    }
}

fn host_prefix(url: &Url) -> Option<String> {
    let host = url.host_str()?;
    let host = host.strip_prefix("www.").unwrap_or(host);
    let scheme = match url.scheme() {
        "http" | "https" => "https?".to_string(),
        other => regex::escape(other),
    };
    Some(format!(r"{}://(www\.)?{}", scheme, regex::escape(host)))
}

// Keeps first-seen order; an empty input matches everything.
fn join_unique(filters: impl Iterator<Item = String>) -> String {
    let mut seen = HashSet::new();
    let unique: Vec<String> = filters.filter(|f| seen.insert(f.clone())).collect();
    if unique.is_empty() {
        MATCH_ALL.to_string()
    } else {
        unique.join("|")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::policy::patterns::FilterPattern;

    fn urls(raw: &[&str]) -> Vec<Url> {
        raw.iter().map(|u| Url::parse(u).unwrap()).collect()
    }

    #[test]
    fn site_filter_deduplicates_hosts() {
        let urls = urls(&[
            "https://www.example.com/a",
            "https://www.example.com/b",
            "http://example.com/c",
        ]);
        assert_eq!(site_filter(&urls), r"https?://(www\.)?example\.com.*");
    }

    #[test]
    fn site_filter_joins_hosts_in_order() {
        let urls = urls(&["https://b.org/", "http://a.net/x"]);
        assert_eq!(site_filter(&urls), r"https?://(www\.)?b\.org.*|https?://(www\.)?a\.net.*");
    }

    #[test]
    fn empty_input_matches_all() {
        assert_eq!(site_filter(&Vec::<Url>::new()), ".*");
        assert_eq!(subpath_filter(&Vec::<Url>::new()), ".*");
    }

    #[test]
    fn subpath_filter_keeps_path_prefix() {
        let urls = urls(&["https://www.example.com/docs/v1", "https://example.com/docs/v1"]);
        let filter = subpath_filter(&urls);
        assert_eq!(filter, r"https?://(www\.)?example\.com/docs/v1.*");

        let pattern = FilterPattern::compile(&filter);
        assert!(pattern.is_match("http://www.example.com/docs/v1/intro"));
        assert!(!pattern.is_match("https://example.com/blog"));
    }

    #[test]
    fn other_schemes_stay_literal() {
        let ftp = Url::parse("ftp://files.example.com/pub").unwrap();
        assert_eq!(must_match_full_domain(&ftp), r"ftp://(www\.)?files\.example\.com.*");

        let data = Url::parse("data:text/plain,hello").unwrap();
        assert_eq!(must_match_full_domain(&data), "data.*");
    }

    #[test]
    fn generated_site_filter_compiles_and_matches() {
        let filter = site_filter(&urls(&["https://www.example.com/"]));
        let pattern = FilterPattern::compile(&filter);
        assert!(!pattern.is_fallback());
        assert!(pattern.is_match("http://example.com/anything"));
        assert!(pattern.is_match("https://WWW.example.com/"));
        assert!(!pattern.is_match("https://example.org/"));
        assert!(!pattern.is_match("https://exampleXcom/"));
    }
}
