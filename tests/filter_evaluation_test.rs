use url::Url;

use crawl_policy_engine::application::policy::evaluation::{
    CrawlCandidate, CrawlDecision, CrawlRejection, IndexDecision, IndexRejection,
};
use crawl_policy_engine::application::policy::patterns::FilterPattern;
use crawl_policy_engine::application::policy::url_filters::{site_filter, subpath_filter};
use crawl_policy_engine::domain::crawl_profile::{CrawlProfile, ProfileParams};
use crawl_policy_engine::domain::page_quota::PageQuota;

fn candidate(url: &str, depth: u32) -> CrawlCandidate {
    CrawlCandidate::parse(url, depth).unwrap()
}

#[test]
fn test_depth_limit_rejects_deep_urls() {
    let profile = CrawlProfile::new(ProfileParams {
        depth: 2,
        ..ProfileParams::new("depth")
    })
    .unwrap();

    assert!(profile.crawl_decision(&candidate("http://a.com/x", 2)).is_accepted());
    assert_eq!(
        profile.crawl_decision(&candidate("http://a.com/x", 3)),
        CrawlDecision::Reject(CrawlRejection::DepthLimit)
    );
}

#[test]
fn test_no_depth_limit_filter_overrides_depth() {
    let profile = CrawlProfile::new(ProfileParams {
        depth: 2,
        crawler_no_depth_limit_match: Some(r".*/archive/.*".into()),
        ..ProfileParams::new("override")
    })
    .unwrap();

    assert!(profile.crawl_decision(&candidate("http://a.com/archive/2001", 3)).is_accepted());
    assert!(profile.crawl_decision(&candidate("http://a.com/archive/2001", 50)).is_accepted());
    assert!(!profile.crawl_decision(&candidate("http://a.com/news/1", 3)).is_accepted());
}

#[test]
fn test_domain_quota_rejects_sixth_page() {
    let profile = CrawlProfile::new(ProfileParams {
        dom_max_pages: PageQuota::Limit(5),
        ..ProfileParams::new("quota")
    })
    .unwrap();

    for page in 0..5 {
        let url = format!("http://busy.com/{}", page);
        assert!(profile.admit(&candidate(&url, 0)).is_accepted());
    }
    assert_eq!(profile.domains().count("busy.com"), 5);
    assert_eq!(
        profile.crawl_decision(&candidate("http://busy.com/5", 0)),
        CrawlDecision::Reject(CrawlRejection::DomainQuota)
    );
    assert_eq!(
        profile.admit(&candidate("http://busy.com/5", 0)),
        CrawlDecision::Reject(CrawlRejection::DomainQuota)
    );
    assert!(profile.admit(&candidate("http://quiet.com/", 0)).is_accepted());
}

#[test]
fn test_quota_counts_follow_external_increments() {
    let profile = CrawlProfile::new(ProfileParams {
        dom_max_pages: PageQuota::Limit(2),
        ..ProfileParams::new("manual")
    })
    .unwrap();
    let page = candidate("http://a.com/", 0);

    assert!(profile.crawl_decision(&page).is_accepted());
    profile.domains().increment("a.com");
    profile.domains().increment("a.com");
    assert!(!profile.crawl_decision(&page).is_accepted());
}

#[test]
fn test_broken_filters_reject_instead_of_admitting() {
    let profile = CrawlProfile::new(ProfileParams {
        crawler_url_must_match: Some("(http".into()),
        ..ProfileParams::new("broken-include")
    })
    .unwrap();
    assert_eq!(
        profile.crawl_decision(&candidate("http://a.com/", 0)),
        CrawlDecision::Reject(CrawlRejection::UrlMustMatch)
    );

    // A broken exclusion excludes nothing, the remaining filters still apply.
    let profile = CrawlProfile::new(ProfileParams {
        crawler_url_must_match: Some(r"http://a\.com/.*".into()),
        crawler_url_must_not_match: Some("[".into()),
        ..ProfileParams::new("broken-exclude")
    })
    .unwrap();
    assert!(profile.url_must_not_match().is_fallback());
    assert!(profile.crawl_decision(&candidate("http://a.com/", 0)).is_accepted());
    assert!(!profile.crawl_decision(&candidate("http://b.com/", 0)).is_accepted());
}

#[test]
fn test_restored_profile_makes_same_decisions() {
    let original = CrawlProfile::new(ProfileParams {
        crawler_url_must_match: Some(r"https?://(www\.)?example\.(com|org)/.*".into()),
        crawler_url_must_not_match: Some(r".*\?.*".into()),
        crawler_ip_must_not_match: Some(r"127\..*".into()),
        crawler_no_depth_limit_match: Some(r".*/sitemap.*".into()),
        index_url_must_not_match: Some(r".*/tag/.*".into()),
        index_content_must_match: Some(r"(?s).*\bpolicy\b.*".into()),
        depth: 1,
        ..ProfileParams::new("round-trip")
    })
    .unwrap();
    let restored = CrawlProfile::from_map(original.to_map());

    let candidates = [
        ("https://example.com/", 0, "93.184.216.34"),
        ("https://www.example.org/a/b", 1, "93.184.216.34"),
        ("https://example.com/deep", 4, "93.184.216.34"),
        ("https://example.com/sitemap.xml", 9, "93.184.216.34"),
        ("https://example.com/?q=1", 0, "93.184.216.34"),
        ("https://example.com/", 0, "127.0.0.1"),
        ("https://example.net/", 0, "93.184.216.34"),
    ];
    for (url, depth, ip) in candidates {
        let c = candidate(url, depth).with_ip(ip);
        assert_eq!(original.crawl_decision(&c), restored.crawl_decision(&c), "{}", url);
    }

    let documents = [
        ("https://example.com/a", "our privacy policy"),
        ("https://example.com/tag/x", "policy"),
        ("https://example.com/b", "nothing relevant"),
        ("https://example.com/c", "Multi\nline POLICY text"),
    ];
    for (url, content) in documents {
        assert_eq!(original.index_decision(url, content), restored.index_decision(url, content), "{}", url);
    }
}

#[test]
fn test_crawl_without_index() {
    let profile = CrawlProfile::new(ProfileParams {
        index_url_must_match: Some(r".*/articles/.*".into()),
        index_content_must_not_match: Some(r"(?s).*sponsored.*".into()),
        ..ProfileParams::new("narrow-index")
    })
    .unwrap();

    assert!(profile.crawl_decision(&candidate("http://news.com/home", 0)).is_accepted());
    assert_eq!(
        profile.index_decision("http://news.com/home", "headlines"),
        IndexDecision::Reject(IndexRejection::UrlMustMatch)
    );
    assert_eq!(
        profile.index_decision("http://news.com/articles/1", "a Sponsored post"),
        IndexDecision::Reject(IndexRejection::ContentMustNotMatch)
    );
    assert_eq!(profile.index_decision("http://news.com/articles/2", "report"), IndexDecision::Accept);
}

#[test]
fn test_site_filter_scopes_a_crawl() {
    let seeds: Vec<Url> = ["https://www.example.com/", "https://www.example.com/about"]
        .iter()
        .map(|u| Url::parse(u).unwrap())
        .collect();
    let filter = site_filter(&seeds);
    assert_eq!(filter, r"https?://(www\.)?example\.com.*");

    let profile = CrawlProfile::new(ProfileParams {
        crawler_url_must_match: Some(filter),
        ..ProfileParams::new("site")
    })
    .unwrap();
    assert!(profile.crawl_decision(&candidate("http://example.com/contact", 0)).is_accepted());
    assert!(!profile.crawl_decision(&candidate("https://elsewhere.com/", 0)).is_accepted());
}

#[test]
fn test_subpath_filter_matches_below_seed_path() {
    let seeds = vec![Url::parse("https://docs.example.com/guide/").unwrap()];
    let pattern = FilterPattern::compile(&subpath_filter(&seeds));
    assert!(pattern.is_match("https://docs.example.com/guide/install"));
    assert!(!pattern.is_match("https://docs.example.com/api/"));
}
