use serde::Serialize;
use std::fmt;
use tracing::debug;
use url::Url;

use crate::domain::crawl_profile::CrawlProfile;
use crate::infrastructure::geo::CountryResolver;
use crate::utils::error::{PolicyError, Result};

/// A URL a crawler worker wants to load
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CrawlCandidate {
    pub url: String,
    /// Domain the page counts against
    pub domain: String,
    /// Address the host resolved to, if known
    pub ip: Option<String>,
    /// Country of the host, if known
    pub country: Option<String>,
    /// Link depth at which the URL was discovered
    pub depth: u32,
}

impl CrawlCandidate {
    pub fn new(url: impl Into<String>, domain: impl Into<String>, depth: u32) -> Self {
        Self {
            url: url.into(),
            domain: domain.into(),
            ip: None,
            country: None,
            depth,
        }
    }

    /// Candidate for `url`, counted against the URL's host.
    pub fn parse(url: &str, depth: u32) -> Result<Self> {
        let domain = extract_domain(url)?;
        Ok(Self::new(url, domain, depth))
    }

    pub fn with_ip(mut self, ip: impl Into<String>) -> Self {
        self.ip = Some(ip.into());
        self
    }

    pub fn with_country(mut self, country: impl Into<String>) -> Self {
        self.country = Some(country.into());
        self
    }

    /// Fill in the country from `resolver` unless one is already set. The address
    /// is tried before the domain.
    pub fn resolve_country(mut self, resolver: &dyn CountryResolver) -> Self {
        if self.country.is_none() {
            self.country = self
                .ip
                .as_deref()
                .and_then(|ip| resolver.country_of(ip))
                .or_else(|| resolver.country_of(&self.domain));
        }
        self
    }
}

/// Extract the host a URL's pages are counted against
pub fn extract_domain(url: &str) -> Result<String> {
    let parsed_url = Url::parse(url).map_err(|e| PolicyError::InvalidInput(format!("Invalid URL: {}, error: {}", url, e)))?;

    parsed_url.host_str()
        .map(|h| h.to_string())
        .ok_or_else(|| PolicyError::InvalidInput(format!("URL has no host: {}", url)))
}

/// Why a candidate may not be crawled
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CrawlRejection {
    UrlMustMatch,
    UrlMustNotMatch,
    IpMustMatch,
    IpMustNotMatch,
    CountryMustMatch,
    DepthLimit,
    DomainQuota,
}

impl fmt::Display for CrawlRejection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let reason = match self {
            CrawlRejection::UrlMustMatch => "url does not match the crawler must-match filter",
            CrawlRejection::UrlMustNotMatch => "url matches the crawler must-not-match filter",
            CrawlRejection::IpMustMatch => "ip does not match the crawler must-match filter",
            CrawlRejection::IpMustNotMatch => "ip matches the crawler must-not-match filter",
            CrawlRejection::CountryMustMatch => "host is not in an allowed country",
            CrawlRejection::DepthLimit => "url is deeper than the crawl depth",
            CrawlRejection::DomainQuota => "domain page quota is exhausted",
        };
        f.write_str(reason)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CrawlDecision {
    Accept,
    Reject(CrawlRejection),
}

impl CrawlDecision {
    pub fn is_accepted(&self) -> bool {
        matches!(self, CrawlDecision::Accept)
    }
}

impl fmt::Display for CrawlDecision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CrawlDecision::Accept => f.write_str("accept"),
            CrawlDecision::Reject(reason) => write!(f, "reject: {}", reason),
        }
    }
}

/// Why a fetched document may not be indexed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum IndexRejection {
    UrlMustMatch,
    UrlMustNotMatch,
    ContentMustMatch,
    ContentMustNotMatch,
}

impl fmt::Display for IndexRejection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let reason = match self {
            IndexRejection::UrlMustMatch => "url does not match the index must-match filter",
            IndexRejection::UrlMustNotMatch => "url matches the index must-not-match filter",
            IndexRejection::ContentMustMatch => "content does not match the index must-match filter",
            IndexRejection::ContentMustNotMatch => "content matches the index must-not-match filter",
        };
        f.write_str(reason)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum IndexDecision {
    Accept,
    Reject(IndexRejection),
}

impl IndexDecision {
    pub fn is_accepted(&self) -> bool {
        matches!(self, IndexDecision::Accept)
    }
}

impl fmt::Display for IndexDecision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IndexDecision::Accept => f.write_str("accept"),
            IndexDecision::Reject(reason) => write!(f, "reject: {}", reason),
        }
    }
}

impl CrawlProfile {
    /// Crawl-time decision for `candidate` without recording anything.
    ///
    /// Registers the candidate's domain at zero if it was not seen before.
    pub fn crawl_decision(&self, candidate: &CrawlCandidate) -> CrawlDecision {
        if let Err(reason) = self.check_crawl_filters(candidate) {
            return CrawlDecision::Reject(reason);
        }
        if !self.dom_max_pages().admits(self.domains().count(&candidate.domain)) {
            return CrawlDecision::Reject(CrawlRejection::DomainQuota);
        }
        CrawlDecision::Accept
    }

    /// Crawl-time decision that also counts an accepted candidate against its
    /// domain. The quota check and the count are one atomic step.
    pub fn admit(&self, candidate: &CrawlCandidate) -> CrawlDecision {
        let decision = match self.check_crawl_filters(candidate) {
            Err(reason) => CrawlDecision::Reject(reason),
            Ok(()) if self.domains().try_acquire(&candidate.domain, self.dom_max_pages()) => CrawlDecision::Accept,
            Ok(()) => CrawlDecision::Reject(CrawlRejection::DomainQuota),
        };
        if let CrawlDecision::Reject(reason) = decision {
            debug!(profile = self.handle(), url = %candidate.url, %reason, "Rejected crawl candidate");
        }
        decision
    }

    /// Whether a URL found at `depth` is within the crawl depth, or exempt from it.
    pub fn depth_allows(&self, url: &str, depth: u32) -> bool {
        depth <= self.depth() || self.no_depth_limit_match().is_match(url)
    }

    fn check_crawl_filters(&self, candidate: &CrawlCandidate) -> std::result::Result<(), CrawlRejection> {
        let url = candidate.url.as_str();
        // An unknown address is checked as the empty string, so a restrictive
        // must-match filter rejects it.
        let ip = candidate.ip.as_deref().unwrap_or_default();

        if !self.url_must_match().is_match(url) {
            return Err(CrawlRejection::UrlMustMatch);
        }
        if self.url_must_not_match().is_match(url) {
            return Err(CrawlRejection::UrlMustNotMatch);
        }
        if !self.ip_must_match().is_match(ip) {
            return Err(CrawlRejection::IpMustMatch);
        }
        if self.ip_must_not_match().is_match(ip) {
            return Err(CrawlRejection::IpMustNotMatch);
        }

        let countries = self.country_must_match();
        if !countries.is_empty() {
            let allowed = candidate
                .country
                .as_deref()
                .is_some_and(|country| countries.iter().any(|c| c.eq_ignore_ascii_case(country)));
            if !allowed {
                return Err(CrawlRejection::CountryMustMatch);
            }
        }

        if !self.depth_allows(url, candidate.depth) {
            return Err(CrawlRejection::DepthLimit);
        }
        Ok(())
    }

    /// Index-time decision for a fetched and parsed document.
    pub fn index_decision(&self, url: &str, content: &str) -> IndexDecision {
        let decision = if !self.index_url_must_match().is_match(url) {
            IndexDecision::Reject(IndexRejection::UrlMustMatch)
        } else if self.index_url_must_not_match().is_match(url) {
            IndexDecision::Reject(IndexRejection::UrlMustNotMatch)
        } else if !self.index_content_must_match().is_match(content) {
            IndexDecision::Reject(IndexRejection::ContentMustMatch)
        } else if self.index_content_must_not_match().is_match(content) {
            IndexDecision::Reject(IndexRejection::ContentMustNotMatch)
        } else {
            IndexDecision::Accept
        };
        if let IndexDecision::Reject(reason) = decision {
            debug!(profile = self.handle(), url, %reason, "Document not indexed");
        }
        decision
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::crawl_profile::ProfileParams;
    use crate::domain::page_quota::PageQuota;
    use crate::infrastructure::geo::StaticCountryResolver;

    fn profile(params: ProfileParams) -> CrawlProfile {
        CrawlProfile::new(params).unwrap()
    }

    #[test]
    fn extracts_domain_from_url() {
        assert_eq!(extract_domain("https://Docs.Example.com/a?b").unwrap(), "docs.example.com");
        assert!(extract_domain("not a url").is_err());
        assert!(extract_domain("mailto:someone@example.com").is_err());
    }

    #[test]
    fn filters_are_checked_in_order() {
        let p = profile(ProfileParams {
            crawler_url_must_match: Some(r"https?://example\.com/.*".into()),
            crawler_url_must_not_match: Some(r".*\.pdf".into()),
            crawler_ip_must_not_match: Some(r"10\..*".into()),
            depth: 3,
            ..ProfileParams::new("ordered")
        });

        let outside = CrawlCandidate::parse("https://other.org/", 0).unwrap();
        assert_eq!(p.crawl_decision(&outside), CrawlDecision::Reject(CrawlRejection::UrlMustMatch));

        let pdf = CrawlCandidate::parse("https://example.com/a.PDF", 0).unwrap();
        assert_eq!(p.crawl_decision(&pdf), CrawlDecision::Reject(CrawlRejection::UrlMustNotMatch));

        let private = CrawlCandidate::parse("https://example.com/", 0).unwrap().with_ip("10.1.2.3");
        assert_eq!(p.crawl_decision(&private), CrawlDecision::Reject(CrawlRejection::IpMustNotMatch));

        let fine = CrawlCandidate::parse("https://example.com/", 0).unwrap().with_ip("93.184.216.34");
        assert!(p.crawl_decision(&fine).is_accepted());
    }

    #[test]
    fn country_list_restricts_hosts() {
        let p = profile(ProfileParams {
            crawler_country_must_match: Some("DE,at".into()),
            ..ProfileParams::new("countries")
        });
        let resolver = StaticCountryResolver::new();

        let german = CrawlCandidate::parse("http://beispiel.de/", 0).unwrap().resolve_country(&resolver);
        assert_eq!(german.country.as_deref(), Some("DE"));
        assert!(p.crawl_decision(&german).is_accepted());

        let austrian = CrawlCandidate::parse("http://x.com/", 0).unwrap().with_country("AT");
        assert!(p.crawl_decision(&austrian).is_accepted());

        let unknown = CrawlCandidate::parse("http://example.com/", 0).unwrap().resolve_country(&resolver);
        assert_eq!(
            p.crawl_decision(&unknown),
            CrawlDecision::Reject(CrawlRejection::CountryMustMatch)
        );
    }

    #[test]
    fn admit_counts_accepted_pages_only() {
        let p = profile(ProfileParams {
            crawler_url_must_not_match: Some(".*/private/.*".into()),
            dom_max_pages: PageQuota::Limit(2),
            ..ProfileParams::new("admit")
        });
        let private = CrawlCandidate::parse("http://a.com/private/x", 0).unwrap();
        let public = CrawlCandidate::parse("http://a.com/public", 0).unwrap();

        assert!(!p.admit(&private).is_accepted());
        assert_eq!(p.domains().count("a.com"), 0);
        assert!(p.admit(&public).is_accepted());
        assert!(p.admit(&public).is_accepted());
        assert_eq!(p.admit(&public), CrawlDecision::Reject(CrawlRejection::DomainQuota));
        assert_eq!(p.domains().count("a.com"), 2);
    }

    #[test]
    fn index_filters_are_independent_of_crawl_filters() {
        let p = profile(ProfileParams {
            crawler_url_must_match: Some("http://a\\.com/.*".into()),
            index_url_must_match: Some("http://a\\.com/docs/.*".into()),
            index_content_must_not_match: Some("(?s).*lorem ipsum.*".into()),
            ..ProfileParams::new("index")
        });
        let candidate = CrawlCandidate::parse("http://a.com/blog/1", 0).unwrap();
        assert!(p.crawl_decision(&candidate).is_accepted());
        assert_eq!(
            p.index_decision("http://a.com/blog/1", "text"),
            IndexDecision::Reject(IndexRejection::UrlMustMatch)
        );
        assert_eq!(
            p.index_decision("http://a.com/docs/1", "Some\nLOREM IPSUM here"),
            IndexDecision::Reject(IndexRejection::ContentMustNotMatch)
        );
        assert!(p.index_decision("http://a.com/docs/1", "useful").is_accepted());
    }
}
